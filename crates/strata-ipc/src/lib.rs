//! Strata IPC Protocol
//!
//! Shared message types for communication between the `strata` display
//! server and its client sessions. Geometry notifications are sent
//! fire-and-forget; the repaint handshake is three messages: a
//! server→client update-pending notification, a client begin-update
//! request answered with `UpdateGranted`, and a client end-update
//! request with no reply.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Socket path for session connections
pub fn socket_path() -> std::path::PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/run/user/{}", unsafe { libc::getuid() }));
    std::path::PathBuf::from(runtime_dir).join("strata.sock")
}

/// Decoration style a client may request for its window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLook {
    /// Full titlebar and resizable border
    #[default]
    Titled,
    /// Border only, no tab
    Bordered,
    /// No decoration at all
    NoBorder,
}

// ============================================================================
// Server → Client Events
// ============================================================================

/// Events sent from the server to a client session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A window was created for this session
    WindowCreated { window: u32 },

    /// A window was destroyed
    WindowDestroyed { window: u32 },

    /// Stale content is waiting; the client should send `BeginUpdate`
    UpdatePending { window: u32 },

    /// Answer to `BeginUpdate`: the client may now paint, constrained to
    /// the granted area; `views` lists the sub-views intersecting it and
    /// `expose` tells the client to repaint the background first
    UpdateGranted {
        window: u32,
        origin_x: i32,
        origin_y: i32,
        width: i32,
        height: i32,
        expose: bool,
        views: Vec<u32>,
    },

    /// `BeginUpdate` arrived with no update outstanding
    UpdateDenied { window: u32 },

    /// The window frame moved
    Moved { window: u32, x: i32, y: i32 },

    /// The window frame was resized
    Resized { window: u32, width: i32, height: i32 },

    /// Focus was gained or lost
    Activated { window: u32, focused: bool },

    /// The window changed workspace
    WorkspaceChanged { window: u32, workspace: u32 },

    /// The window was minimized or restored
    MinimizeChanged { window: u32, minimized: bool },
}

// ============================================================================
// Client → Server Requests
// ============================================================================

/// Requests sent from a client session to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Create a window (hidden until `ShowWindow`); an omitted look
    /// falls back to the server's configured default
    CreateWindow {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        title: String,
        #[serde(default)]
        look: Option<WindowLook>,
    },

    /// Destroy a window and detach it from its stack
    DestroyWindow { window: u32 },

    /// Show or hide a window
    ShowWindow { window: u32, shown: bool },

    /// Move a window by a screen-space delta
    MoveWindowBy { window: u32, dx: i32, dy: i32 },

    /// Resize a window by a delta (clamped to its size limits)
    ResizeWindowBy { window: u32, dx: i32, dy: i32 },

    /// Acknowledge a pending update and start painting
    BeginUpdate { window: u32 },

    /// Painting finished; composite and start the next round if needed
    EndUpdate { window: u32 },

    /// Explicitly invalidate window-space rectangles `[x, y, w, h]`
    InvalidateRegion { window: u32, rects: Vec<[i32; 4]> },

    /// Change the tab title
    SetTitle { window: u32, title: String },

    /// Register a sub-view with a window-space frame
    AddView {
        window: u32,
        view: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    /// Unregister a sub-view
    RemoveView { window: u32, view: u32 },
}

// ============================================================================
// Message Framing
// ============================================================================

/// A framed message with length prefix for reliable socket reads
#[derive(Debug)]
pub struct FramedMessage {
    pub data: Vec<u8>,
}

impl FramedMessage {
    /// Create a new framed message from serializable data
    pub fn new<T: Serialize>(msg: &T) -> anyhow::Result<Self> {
        let data = serde_json::to_vec(msg)?;
        Ok(Self { data })
    }

    /// Encode message with length prefix (4 bytes, big-endian)
    pub fn encode(&self) -> Vec<u8> {
        let len = self.data.len() as u32;
        let mut buf = Vec::with_capacity(4 + self.data.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Write the framed message to a blocking stream
    pub fn write_to<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        writer.write_all(&self.encode())?;
        writer.flush()?;
        Ok(())
    }

    /// Read one framed message from a blocking stream
    pub fn read_from<R: Read>(reader: &mut R) -> anyhow::Result<Self> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        Ok(Self { data })
    }

    /// Decode a server event from bytes
    pub fn decode_server_event(data: &[u8]) -> anyhow::Result<ServerEvent> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Decode a client request from bytes
    pub fn decode_client_request(data: &[u8]) -> anyhow::Result<ClientRequest> {
        Ok(serde_json::from_slice(data)?)
    }
}
