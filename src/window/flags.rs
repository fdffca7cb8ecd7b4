//! Window flags, look and feel
//!
//! Bitfield flags for per-window state plus the look/feel enumerations
//! consulted by the decorator.

use bitflags::bitflags;

// The look enum is part of the client protocol
pub use strata_ipc::WindowLook;

bitflags! {
    /// Per-window behavior flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        const NOT_MOVABLE        = 1 << 0;
        const NOT_RESIZABLE      = 1 << 1;
        const NOT_CLOSABLE       = 1 << 2;
        const NOT_ZOOMABLE       = 1 << 3;
        const NOT_MINIMIZABLE    = 1 << 4;
        const AVOID_FOCUS        = 1 << 5;
        const ACCEPT_FIRST_CLICK = 1 << 6;
    }
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Interaction behavior of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFeel {
    /// Ordinary application window
    #[default]
    Normal,
    /// Stays in front of its application's other windows
    Floating,
    /// Blocks input to its application's other windows
    Modal,
}
