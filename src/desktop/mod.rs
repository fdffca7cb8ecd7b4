//! Desktop arbiter — global stacking order and occlusion
//!
//! The desktop is the sole authority over z-order and clipping. It owns
//! the clipping lock: a readers-writer lock acquired exclusively for
//! every operation here (stacking changes, geometry changes, occlusion
//! recompute) and in shared mode by window threads for the span of their
//! redraw/update operations via `with_window_shared`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::config::Config;
use crate::decorator::DecorManager;
use crate::error::ServerError;
use crate::region::{Rect, Region};
use crate::window::flags::{WindowFeel, WindowFlags, WindowLook};
use crate::window::stack::SharedStack;
use crate::window::{ClientLink, Window, WindowId, WindowTask};

struct DesktopState {
    windows: HashMap<WindowId, Arc<Window>>,
    /// Paint order, bottom to top (front-most last)
    stacking_order: Vec<WindowId>,
    focused_window: Option<WindowId>,
    current_workspace: u32,
}

/// The desktop-wide arbiter
pub struct Desktop {
    decor_manager: DecorManager,
    screen_frame: Rect,
    next_window_id: AtomicU32,
    /// The clipping lock: exclusive for the desktop's phases, shared for
    /// window-thread redraw/update spans
    state: RwLock<DesktopState>,
}

impl Desktop {
    pub fn new(config: &Config) -> Self {
        info!(
            width = config.screen.width,
            height = config.screen.height,
            "desktop ready"
        );
        Self {
            decor_manager: DecorManager::new(config.decorator.clone()),
            screen_frame: Rect::from_xywh(0, 0, config.screen.width, config.screen.height),
            next_window_id: AtomicU32::new(1),
            state: RwLock::new(DesktopState {
                windows: HashMap::new(),
                stacking_order: Vec::new(),
                focused_window: None,
                current_workspace: 0,
            }),
        }
    }

    pub fn decor_manager(&self) -> &DecorManager {
        &self.decor_manager
    }

    pub fn screen_frame(&self) -> Rect {
        self.screen_frame
    }

    // ========================================================================
    // Window lifecycle (exclusive lock)
    // ========================================================================

    /// Create a window (hidden) and register it front-most
    #[allow(clippy::too_many_arguments)]
    pub fn create_window(
        &self,
        frame: Rect,
        title: &str,
        look: WindowLook,
        feel: WindowFeel,
        flags: WindowFlags,
        stack: Option<SharedStack>,
        client: ClientLink,
        waker: Sender<WindowTask>,
    ) -> Result<Arc<Window>, ServerError> {
        let id = self.next_window_id.fetch_add(1, Ordering::Relaxed);
        let window = Arc::new(Window::new(
            id,
            frame,
            title,
            look,
            feel,
            flags,
            stack,
            &self.decor_manager,
            client,
            waker,
        )?);

        let mut state = self.state.write().unwrap();
        state.windows.insert(id, window.clone());
        state.stacking_order.push(id);
        debug!(window = id, title, "window created");
        Ok(window)
    }

    /// Destroy a window: detach it from its stack (dissolving the stack
    /// if it was the last member) and redistribute the exposed area
    pub fn remove_window(&self, id: WindowId) -> Result<(), ServerError> {
        let mut state = self.state.write().unwrap();
        let window = state
            .windows
            .remove(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        state.stacking_order.retain(|&w| w != id);
        if state.focused_window == Some(id) {
            state.focused_window = None;
        }
        window.release_from_stack();
        debug!(window = id, "window removed");
        self.rebuild_clipping(&state);
        Ok(())
    }

    pub fn show_window(&self, id: WindowId) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        window.set_hidden(false);
        self.rebuild_clipping(&state);
        Ok(())
    }

    pub fn hide_window(&self, id: WindowId) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        window.set_hidden(true);
        self.rebuild_clipping(&state);
        Ok(())
    }

    pub fn minimize_window(&self, id: WindowId, minimized: bool) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        window.set_minimized(minimized);
        self.rebuild_clipping(&state);
        Ok(())
    }

    // ========================================================================
    // Stacking and focus (exclusive lock)
    // ========================================================================

    /// Raise a window to the front, and to the top of its tab stack
    pub fn raise_window_to_front(&self, id: WindowId) -> Result<(), ServerError> {
        let mut state = self.state.write().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?
            .clone();
        state.stacking_order.retain(|&w| w != id);
        state.stacking_order.push(id);
        if let Some(stack) = window.stack() {
            stack.lock().unwrap().move_to_top_layer(id);
        }
        debug!(window = id, "raised to front");
        self.rebuild_clipping(&state);
        Ok(())
    }

    /// Move focus; the previous holder is notified it lost it
    pub fn set_focus_window(&self, id: WindowId) -> Result<(), ServerError> {
        let mut state = self.state.write().unwrap();
        if !state.windows.contains_key(&id) {
            return Err(ServerError::UnknownWindow(id));
        }
        if state.focused_window == Some(id) {
            return Ok(());
        }
        if let Some(previous) = state.focused_window.take() {
            if let Some(window) = state.windows.get(&previous) {
                window.set_focus(false);
            }
        }
        state.windows[&id].set_focus(true);
        state.focused_window = Some(id);
        Ok(())
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.state.read().unwrap().focused_window
    }

    /// Switch workspace; windows on other workspaces lose their clipping
    pub fn set_current_workspace(&self, workspace: u32) {
        let mut state = self.state.write().unwrap();
        state.current_workspace = workspace;
        self.rebuild_clipping(&state);
    }

    // ========================================================================
    // Desktop-mediated geometry (exclusive lock)
    // ========================================================================

    /// Move a window — or, with `move_stack`, its whole tab group — by a
    /// screen-space delta
    pub fn move_window_by(
        &self,
        id: WindowId,
        dx: i32,
        dy: i32,
        move_stack: bool,
    ) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let targets = self.group_targets(&state, id, move_stack)?;
        for window in &targets {
            window.move_by(dx, dy);
        }
        self.rebuild_clipping(&state);
        Ok(())
    }

    /// Resize a window (or tab group); newly exposed strips are marked
    /// dirty on the window itself, and occlusion is rebuilt for everyone
    pub fn resize_window_by(
        &self,
        id: WindowId,
        dx: i32,
        dy: i32,
        resize_stack: bool,
    ) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let targets = self.group_targets(&state, id, resize_stack)?;
        for window in &targets {
            let dirty = window.resize_by(dx, dy);
            if !dirty.is_empty() {
                window.process_dirty_region(&dirty);
            }
        }
        self.rebuild_clipping(&state);
        Ok(())
    }

    /// Explicit client invalidation; `region` is in window space
    pub fn invalidate_window(&self, id: WindowId, region: &Region) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        let frame = window.frame();
        let mut screen_region = region.clone();
        screen_region.offset_by(frame.left, frame.top);
        window.mark_dirty(&screen_region);
        Ok(())
    }

    /// Retitle the window's tab; decorator mutation, so exclusive
    pub fn set_window_title(&self, id: WindowId, title: &str) -> Result<(), ServerError> {
        let state = self.state.write().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        window.set_title(title);
        Ok(())
    }

    /// Recompute occlusion and push new clipping to every window
    pub fn rebuild_and_redraw_after_window_change(&self) {
        let state = self.state.write().unwrap();
        self.rebuild_clipping(&state);
    }

    // ========================================================================
    // Shared-mode entry point for window threads
    // ========================================================================

    /// Run `f` against a window while holding the clipping lock in
    /// shared mode. This is the span window threads use for
    /// `redraw_dirty_region`, `begin_update` and `end_update`; shared
    /// holders touch only their own window's private state, so they
    /// serialize against the desktop's exclusive phases but never
    /// against each other.
    pub fn with_window_shared<R>(
        &self,
        id: WindowId,
        f: impl FnOnce(&Window) -> R,
    ) -> Result<R, ServerError> {
        let state = self.state.read().unwrap();
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        Ok(f(window))
    }

    pub fn window_count(&self) -> usize {
        self.state.read().unwrap().windows.len()
    }

    /// Current paint order, bottom to top (diagnostics)
    pub fn stacking_order(&self) -> Vec<WindowId> {
        self.state.read().unwrap().stacking_order.clone()
    }

    // ========================================================================
    // Occlusion
    // ========================================================================

    /// Front to back: each window gets the screen minus everything
    /// painted in front of it; newly exposed area is marked dirty with
    /// an expose cause.
    fn rebuild_clipping(&self, state: &DesktopState) {
        let screen = Region::from_rect(self.screen_frame);
        let empty = Region::new();
        let mut occluded = Region::new();

        for &id in state.stacking_order.iter().rev() {
            let Some(window) = state.windows.get(&id) else {
                continue;
            };
            let on_workspace = window.workspace() == state.current_workspace;
            if window.is_hidden() || window.is_minimized() || !on_workspace {
                window.set_clipping(&empty);
                continue;
            }

            let mut available = screen.clone();
            available.exclude(&occluded);
            let exposed = window.set_clipping(&available);
            if !exposed.is_empty() {
                window.process_dirty_region(&exposed);
            }
            occluded.include(&window.full_region());
        }
    }

    fn group_targets(
        &self,
        state: &DesktopState,
        id: WindowId,
        whole_stack: bool,
    ) -> Result<Vec<Arc<Window>>, ServerError> {
        let window = state
            .windows
            .get(&id)
            .ok_or(ServerError::UnknownWindow(id))?;
        if !whole_stack {
            return Ok(vec![window.clone()]);
        }
        let Some(stack) = window.stack() else {
            return Ok(vec![window.clone()]);
        };
        let members: Vec<WindowId> = stack.lock().unwrap().insertion_order().to_vec();
        Ok(members
            .iter()
            .filter_map(|member| state.windows.get(member).cloned())
            .collect())
    }
}
