//! Server error taxonomy
//!
//! Protocol-misuse errors are answered on the link and leave the window
//! usable; resource failures abort construction of the one window that
//! hit them. Nothing here is retried automatically.

use thiserror::Error;

use crate::window::WindowId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    /// `BeginUpdate` arrived with no update message outstanding
    #[error("window {0}: begin_update with no update requested")]
    NoUpdateRequested(WindowId),

    /// A second `BeginUpdate` arrived before the matching `EndUpdate`
    #[error("window {0}: update already in progress")]
    AlreadyInUpdate(WindowId),

    /// `EndUpdate` arrived outside an update
    #[error("window {0}: end_update outside an update")]
    NotInUpdate(WindowId),

    /// Detaching would leave the stack empty
    #[error("window {0}: sole member cannot detach from its stack")]
    LastStackMember(WindowId),

    #[error("window {0}: unknown window")]
    UnknownWindow(WindowId),

    /// Decorator construction failed; the window is refused
    #[error("decorator construction failed: {0}")]
    DecoratorFailed(String),
}
