//! Window entity and the redraw state machine
//!
//! A `Window` owns the geometry and region bookkeeping for one on-screen
//! window (or one pane of a tab stack): its frame, the cached
//! border/content/visible regions, the dirty region, and the pair of
//! update sessions driving the asynchronous repaint handshake with the
//! window's client-side counterpart.
//!
//! Threading: the desktop arbiter mutates windows while holding the
//! clipping lock exclusively; each window's own thread calls
//! `redraw_dirty_region`/`begin_update`/`end_update` while holding it
//! shared. A window's mutable state sits behind its private mutex, so
//! two window threads running under the shared lock never race each
//! other — they only serialize against the desktop's exclusive phases.

pub mod flags;
pub mod stack;
pub mod update_session;

use std::sync::mpsc::Sender;
use std::sync::Mutex;

use tracing::{debug, warn};

use strata_ipc::ServerEvent;

use crate::decorator::{DecorManager, SizeLimits};
use crate::error::ServerError;
use crate::region::{Rect, Region, RegionPool};

use flags::{WindowFeel, WindowFlags, WindowLook};
use stack::{SharedStack, WindowStack};
use update_session::{UpdateCause, UpdateSessions};

pub type WindowId = u32;

/// Work items drained by a window's own thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTask {
    /// The dirty region went empty→non-empty; run a redraw pass
    Redraw,
    /// The client acknowledged a pending update
    BeginUpdate,
    /// The client finished painting
    EndUpdate,
    /// The window is going away; the thread should exit
    Quit,
}

/// Fire-and-forget message link to the window's client session
#[derive(Debug, Clone)]
pub struct ClientLink {
    tx: Sender<ServerEvent>,
}

impl ClientLink {
    pub fn new(tx: Sender<ServerEvent>) -> Self {
        Self { tx }
    }

    /// Send an event; a gone client is logged, never an error
    pub fn send(&self, event: ServerEvent) {
        if self.tx.send(event).is_err() {
            debug!("client link closed, event dropped");
        }
    }
}

/// A sub-view registered by the client, with a window-space frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewInfo {
    pub id: u32,
    pub frame: Rect,
}

/// Answer to a successful `begin_update`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
    /// The round covers freshly exposed area, so the client should
    /// repaint the background before its content
    pub expose: bool,
    /// Sub-views intersecting the granted dirty area
    pub views: Vec<u32>,
}

/// A lazily recomputed region: mutation clears the flag, readers
/// recompute on demand
#[derive(Debug, Default)]
struct CachedRegion {
    region: Region,
    valid: bool,
}

impl CachedRegion {
    fn invalidate(&mut self) {
        self.valid = false;
    }

    fn set(&mut self, region: Region) {
        self.region = region;
        self.valid = true;
    }
}

struct WindowInner {
    title: String,
    frame: Rect,
    look: WindowLook,
    feel: WindowFeel,
    flags: WindowFlags,
    size_limits: SizeLimits,
    hidden: bool,
    minimized: bool,
    focused: bool,
    workspace: u32,
    views: Vec<ViewInfo>,

    /// Tab group this window belongs to; shared with sibling tabs and
    /// destroyed when the last member releases it
    stack: Option<SharedStack>,

    // Cached regions, screen space. Mutations clear validity flags;
    // readers recompute lazily.
    border_region: CachedRegion,
    content_region: CachedRegion,
    visible_region: Region,
    visible_content_region: CachedRegion,
    effective_drawing_region: CachedRegion,

    /// Area known stale but not yet scheduled into a session
    dirty_region: Region,
    dirty_cause: UpdateCause,

    sessions: UpdateSessions,
    update_requested: bool,
    in_update: bool,

    pool: RegionPool,
    waker: Sender<WindowTask>,
}

/// One application window (or one pane of a tab stack)
pub struct Window {
    id: WindowId,
    client: ClientLink,
    inner: Mutex<WindowInner>,
}

impl Window {
    /// Create a window, hidden, attached to `stack` (a brand-new stack
    /// with a fresh decorator is created if none is supplied).
    ///
    /// Decorator construction failure aborts this one window only.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: WindowId,
        frame: Rect,
        title: &str,
        look: WindowLook,
        feel: WindowFeel,
        flags: WindowFlags,
        stack: Option<SharedStack>,
        decor_manager: &DecorManager,
        client: ClientLink,
        waker: Sender<WindowTask>,
    ) -> Result<Self, ServerError> {
        let stack = match stack {
            Some(stack) => stack,
            None => {
                let decorator = decor_manager
                    .new_decorator(look)
                    .map_err(|e| ServerError::DecoratorFailed(e.to_string()))?;
                WindowStack::new_shared(Some(decorator))
            }
        };
        {
            let mut guard = stack.lock().unwrap();
            guard.add_window(id, None, title);
            if let Some(decorator) = guard.decorator_mut() {
                decorator.set_frame(frame);
            }
        }

        Ok(Self {
            id,
            client,
            inner: Mutex::new(WindowInner {
                title: title.to_owned(),
                frame,
                look,
                feel,
                flags,
                size_limits: SizeLimits::default(),
                hidden: true,
                minimized: false,
                focused: false,
                workspace: 0,
                views: Vec::new(),
                stack: Some(stack),
                border_region: CachedRegion::default(),
                content_region: CachedRegion::default(),
                visible_region: Region::new(),
                visible_content_region: CachedRegion::default(),
                effective_drawing_region: CachedRegion::default(),
                dirty_region: Region::new(),
                dirty_cause: UpdateCause::empty(),
                sessions: UpdateSessions::new(),
                update_requested: false,
                in_update: false,
                pool: RegionPool::new(),
                waker,
            }),
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn frame(&self) -> Rect {
        self.inner.lock().unwrap().frame
    }

    pub fn title(&self) -> String {
        self.inner.lock().unwrap().title.clone()
    }

    pub fn look(&self) -> WindowLook {
        self.inner.lock().unwrap().look
    }

    pub fn feel(&self) -> WindowFeel {
        self.inner.lock().unwrap().feel
    }

    pub fn flags(&self) -> WindowFlags {
        self.inner.lock().unwrap().flags
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.lock().unwrap().hidden
    }

    pub fn is_minimized(&self) -> bool {
        self.inner.lock().unwrap().minimized
    }

    pub fn is_focused(&self) -> bool {
        self.inner.lock().unwrap().focused
    }

    pub fn workspace(&self) -> u32 {
        self.inner.lock().unwrap().workspace
    }

    /// On screen: shown, not minimized, and granted visible pixels
    pub fn is_visible(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        !inner.hidden && !inner.minimized && !inner.visible_region.is_empty()
    }

    pub fn visible_region(&self) -> Region {
        self.inner.lock().unwrap().visible_region.clone()
    }

    pub fn visible_content_region(&self) -> Region {
        let mut inner = self.inner.lock().unwrap();
        self.update_visible_content_region(&mut inner);
        inner.visible_content_region.region.clone()
    }

    pub fn dirty_region(&self) -> Region {
        self.inner.lock().unwrap().dirty_region.clone()
    }

    pub fn is_update_requested(&self) -> bool {
        self.inner.lock().unwrap().update_requested
    }

    pub fn is_in_update(&self) -> bool {
        self.inner.lock().unwrap().in_update
    }

    pub fn stack(&self) -> Option<SharedStack> {
        self.inner.lock().unwrap().stack.clone()
    }

    /// The window's footprint: content plus decoration, screen space
    pub fn full_region(&self) -> Region {
        let mut inner = self.inner.lock().unwrap();
        self.compute_full_region(&mut inner)
    }

    /// Pending repaint area of the in-flight session pair (diagnostics)
    pub fn pending_update_region(&self) -> Region {
        self.inner.lock().unwrap().sessions.pending().dirty_region().clone()
    }

    pub fn current_update_region(&self) -> Region {
        self.inner.lock().unwrap().sessions.current().dirty_region().clone()
    }

    // ========================================================================
    // Desktop-thread operations (exclusive clipping lock held by caller)
    // ========================================================================

    /// Recompute the visible region as "full window area ∩ available";
    /// returns the newly exposed area the desktop should mark dirty.
    pub fn set_clipping(&self, available: &Region) -> Region {
        let mut inner = self.inner.lock().unwrap();
        let full = self.compute_full_region(&mut inner);

        let mut new_visible = inner.pool.get_region_copy(&full);
        new_visible.intersect_with(available);

        let mut exposed = inner.pool.get_region_copy(&new_visible);
        exposed.exclude(&inner.visible_region);

        let old = std::mem::replace(&mut inner.visible_region, new_visible);
        inner.pool.recycle(old);

        // Dependent caches are recomputed on demand, not eagerly
        inner.visible_content_region.invalidate();
        inner.effective_drawing_region.invalidate();
        exposed
    }

    /// Translate the frame, every currently valid cached region, the
    /// dirty region and both update sessions. Invalid caches are left
    /// untouched; they are recomputed from the new frame on demand.
    pub fn move_by(&self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.frame = inner.frame.offset_by(dx, dy);

        if inner.border_region.valid {
            inner.border_region.region.offset_by(dx, dy);
        }
        if inner.content_region.valid {
            inner.content_region.region.offset_by(dx, dy);
        }
        if inner.visible_content_region.valid {
            inner.visible_content_region.region.offset_by(dx, dy);
        }
        if inner.effective_drawing_region.valid {
            inner.effective_drawing_region.region.offset_by(dx, dy);
        }
        inner.visible_region.offset_by(dx, dy);
        inner.dirty_region.offset_by(dx, dy);
        // In-flight repaint requests keep tracking the right pixels
        inner.sessions.move_by(dx, dy);

        self.update_decorator_frame(&mut inner);

        let (x, y) = (inner.frame.left, inner.frame.top);
        drop(inner);
        self.client.send(ServerEvent::Moved {
            window: self.id,
            x,
            y,
        });
    }

    /// Resize the frame by a delta, clamped to the size limits; returns
    /// the area that now needs repainting (new content strips plus the
    /// decoration before and after).
    pub fn resize_by(&self, dx: i32, dy: i32) -> Region {
        let mut inner = self.inner.lock().unwrap();
        let limits = self.combined_size_limits(&inner);
        let old_frame = inner.frame;
        let (width, height) = limits.clamp(old_frame.width() + dx, old_frame.height() + dy);
        if width == old_frame.width() && height == old_frame.height() {
            return Region::new();
        }

        let old_full = self.compute_full_region(&mut inner);

        inner.frame.right = inner.frame.left + width;
        inner.frame.bottom = inner.frame.top + height;

        // Everything frame-derived goes stale
        inner.border_region.invalidate();
        inner.content_region.invalidate();
        inner.visible_content_region.invalidate();
        inner.effective_drawing_region.invalidate();

        self.update_decorator_frame(&mut inner);

        let new_full = self.compute_full_region(&mut inner);
        let new_frame = inner.frame;

        // Dirty: old and new footprint, minus the content pixels common
        // to both frames (those did not change)
        let mut dirty = inner.pool.get_region_copy(&old_full);
        dirty.include(&new_full);
        if let Some(unchanged) = old_frame.intersection(&new_frame) {
            dirty.exclude_rect(&unchanged);
        }

        drop(inner);
        self.client.send(ServerEvent::Resized {
            window: self.id,
            width,
            height,
        });
        dirty
    }

    /// Union newly exposed area into the dirty region. Edge-triggered:
    /// the window thread is woken exactly once per empty→non-empty
    /// transition; redundant calls while already dirty do not re-wake.
    pub fn process_dirty_region(&self, region: &Region) {
        self.process_dirty_region_caused(region, UpdateCause::EXPOSE);
    }

    /// Explicit invalidation by a content change
    pub fn mark_dirty(&self, region: &Region) {
        self.process_dirty_region_caused(region, UpdateCause::REQUEST);
    }

    fn process_dirty_region_caused(&self, region: &Region, cause: UpdateCause) {
        let mut inner = self.inner.lock().unwrap();
        let full = self.compute_full_region(&mut inner);

        let mut clipped = inner.pool.get_region_copy(region);
        clipped.intersect_with(&full);
        if clipped.is_empty() {
            inner.pool.recycle(clipped);
            return;
        }

        let was_empty = inner.dirty_region.is_empty();
        inner.dirty_region.include(&clipped);
        inner.dirty_cause |= cause;
        inner.pool.recycle(clipped);

        if was_empty {
            debug!(window = self.id, "dirty region non-empty, waking redraw");
            if inner.waker.send(WindowTask::Redraw).is_err() {
                warn!(window = self.id, "window thread gone, redraw dropped");
            }
        }
    }

    /// Show or hide; the desktop rebuilds clipping afterwards. Hiding
    /// discards any accumulated dirt — a hidden window repaints from
    /// scratch on its next exposure.
    pub fn set_hidden(&self, hidden: bool) {
        let mut inner = self.inner.lock().unwrap();
        if inner.hidden == hidden {
            return;
        }
        inner.hidden = hidden;
        if hidden {
            inner.dirty_region.clear();
            inner.dirty_cause = UpdateCause::empty();
        }
    }

    pub fn set_minimized(&self, minimized: bool) {
        let mut inner = self.inner.lock().unwrap();
        if inner.minimized == minimized {
            return;
        }
        inner.minimized = minimized;
        drop(inner);
        self.client.send(ServerEvent::MinimizeChanged {
            window: self.id,
            minimized,
        });
    }

    /// Focus change; repaints the decoration and notifies the client
    pub fn set_focus(&self, focused: bool) {
        let mut inner = self.inner.lock().unwrap();
        if inner.focused == focused {
            return;
        }
        inner.focused = focused;
        if let Some(tab) = self.tab_position(&inner) {
            if let Some(stack) = inner.stack.clone() {
                let mut guard = stack.lock().unwrap();
                if let Some(decorator) = guard.decorator_mut() {
                    decorator.set_focus(tab, focused);
                }
            }
        }
        let border = self.compute_border_region(&mut inner);
        drop(inner);
        self.process_dirty_region_caused(&border, UpdateCause::REQUEST);
        self.client.send(ServerEvent::Activated {
            window: self.id,
            focused,
        });
    }

    pub fn set_title(&self, title: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.title = title.to_owned();
        if let Some(tab) = self.tab_position(&inner) {
            if let Some(stack) = inner.stack.clone() {
                let mut guard = stack.lock().unwrap();
                if let Some(decorator) = guard.decorator_mut() {
                    decorator.set_title(tab, title);
                }
            }
        }
        let border = self.compute_border_region(&mut inner);
        drop(inner);
        self.process_dirty_region_caused(&border, UpdateCause::REQUEST);
    }

    /// Change the decoration look in place; the border footprint before
    /// and after needs repainting
    pub fn set_look(&self, look: WindowLook) {
        let mut inner = self.inner.lock().unwrap();
        if inner.look == look {
            return;
        }
        let old_border = self.compute_border_region(&mut inner);
        inner.look = look;
        if let Some(stack) = inner.stack.clone() {
            let mut guard = stack.lock().unwrap();
            if let Some(decorator) = guard.decorator_mut() {
                decorator.set_look(look);
            }
        }
        inner.border_region.invalidate();
        inner.visible_content_region.invalidate();
        inner.effective_drawing_region.invalidate();
        let mut dirty = self.compute_border_region(&mut inner);
        dirty.include(&old_border);
        drop(inner);
        self.process_dirty_region_caused(&dirty, UpdateCause::REQUEST);
    }

    /// Update behavior flags; the decorator is told so it can adjust
    /// its size limits and widgetry
    pub fn set_flags(&self, flags: WindowFlags) {
        let mut inner = self.inner.lock().unwrap();
        if inner.flags == flags {
            return;
        }
        inner.flags = flags;
        if let Some(stack) = inner.stack.clone() {
            let mut guard = stack.lock().unwrap();
            if let Some(decorator) = guard.decorator_mut() {
                decorator.set_flags(flags);
            }
        }
    }

    pub fn set_workspace(&self, workspace: u32) {
        let mut inner = self.inner.lock().unwrap();
        if inner.workspace == workspace {
            return;
        }
        inner.workspace = workspace;
        drop(inner);
        self.client.send(ServerEvent::WorkspaceChanged {
            window: self.id,
            workspace,
        });
    }

    pub fn set_size_limits(&self, limits: SizeLimits) {
        self.inner.lock().unwrap().size_limits = limits;
    }

    pub fn add_view(&self, view: ViewInfo) {
        self.inner.lock().unwrap().views.push(view);
    }

    pub fn remove_view(&self, view: u32) {
        self.inner
            .lock()
            .unwrap()
            .views
            .retain(|v| v.id != view);
    }

    // ========================================================================
    // Stack membership (exclusive clipping lock held by caller)
    // ========================================================================

    /// Leave the current stack for a brand-new one of our own. Rejected
    /// for the sole member: a stack is never left empty.
    pub fn detach_from_stack(&self, decor_manager: &DecorManager) -> Result<(), ServerError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(old_stack) = inner.stack.clone() else {
            return Err(ServerError::UnknownWindow(self.id));
        };
        {
            let guard = old_stack.lock().unwrap();
            if guard.window_count() <= 1 {
                return Err(ServerError::LastStackMember(self.id));
            }
        }

        let decorator = decor_manager
            .new_decorator(inner.look)
            .map_err(|e| ServerError::DecoratorFailed(e.to_string()))?;
        let new_stack = WindowStack::new_shared(Some(decorator));
        {
            let mut guard = new_stack.lock().unwrap();
            guard.add_window(self.id, None, &inner.title);
            if let Some(decorator) = guard.decorator_mut() {
                decorator.set_frame(inner.frame);
            }
        }

        old_stack.lock().unwrap().remove_window(self.id);
        inner.stack = Some(new_stack);
        inner.border_region.invalidate();
        inner.visible_content_region.invalidate();
        inner.effective_drawing_region.invalidate();
        Ok(())
    }

    /// Join another stack (tab drag). The old stack dissolves with our
    /// handle if we were its sole member.
    pub fn attach_to_stack(&self, stack: SharedStack, position: Option<usize>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(old_stack) = inner.stack.take() {
            let mut guard = old_stack.lock().unwrap();
            if guard.window_count() > 1 {
                guard.remove_window(self.id);
            }
        }
        stack.lock().unwrap().add_window(self.id, position, &inner.title);
        inner.stack = Some(stack);
        inner.border_region.invalidate();
        inner.visible_content_region.invalidate();
        inner.effective_drawing_region.invalidate();
    }

    /// Final detach on destruction: leave the stack (dissolving it with
    /// our handle if we were the last member) and drop the region caches.
    pub fn release_from_stack(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stack) = inner.stack.take() {
            let mut guard = stack.lock().unwrap();
            if guard.window_count() > 1 {
                guard.remove_window(self.id);
            }
        }
        inner.border_region = CachedRegion::default();
        inner.content_region = CachedRegion::default();
        inner.visible_region.clear();
        inner.visible_content_region = CachedRegion::default();
        inner.effective_drawing_region = CachedRegion::default();
        inner.dirty_region.clear();
    }

    // ========================================================================
    // Window-thread operations (shared clipping lock held by caller)
    // ========================================================================

    /// Repaint the decoration synchronously, hand the visible dirty
    /// content to the update machinery, and clear the dirty region.
    pub fn redraw_dirty_region(&self) {
        let mut inner = self.inner.lock().unwrap();
        let inner = &mut *inner;
        if inner.dirty_region.is_empty() {
            return;
        }
        if inner.hidden {
            inner.dirty_region.clear();
            inner.dirty_cause = UpdateCause::empty();
            return;
        }

        // Border first: the decorator paints it right away
        let border = self.compute_border_region(inner);
        let mut border_dirty = inner.pool.get_region_copy(&inner.dirty_region);
        border_dirty.intersect_with(&border);
        if !border_dirty.is_empty() {
            if let Some(stack) = inner.stack.clone() {
                let mut guard = stack.lock().unwrap();
                if let Some(decorator) = guard.decorator_mut() {
                    decorator.draw(&border_dirty);
                }
            }
        }
        inner.pool.recycle(border_dirty);

        // Content goes through the client round-trip
        self.update_visible_content_region(inner);
        let mut content_dirty = inner.pool.get_region_copy(&inner.dirty_region);
        content_dirty.intersect_with(&inner.visible_content_region.region);

        let cause = inner.dirty_cause;
        inner.dirty_region.clear();
        inner.dirty_cause = UpdateCause::empty();

        self.trigger_content_redraw(inner, &content_dirty, cause);
        inner.pool.recycle(content_dirty);
    }

    /// Move dirty content into the pending session and request an
    /// update round if none is outstanding
    fn trigger_content_redraw(&self, inner: &mut WindowInner, dirty: &Region, cause: UpdateCause) {
        if dirty.is_empty() {
            return;
        }
        self.transfer_to_update_session(inner, dirty, cause);
    }

    fn transfer_to_update_session(
        &self,
        inner: &mut WindowInner,
        dirty: &Region,
        cause: UpdateCause,
    ) {
        let pending = inner.sessions.pending_mut();
        pending.set_used(true);
        pending.include(dirty);
        pending.add_cause(cause);

        // The pending session now claims these pixels; out-of-band
        // drawing must not touch them until the round completes
        inner.effective_drawing_region.invalidate();

        if !inner.update_requested {
            inner.update_requested = true;
            debug!(window = self.id, "requesting client update");
            self.client.send(ServerEvent::UpdatePending { window: self.id });
        }
    }

    /// Client acknowledged the pending request: swap sessions, constrain
    /// the now-current one to visible content, and report what to paint.
    ///
    /// At most one update round is in flight per window; a second
    /// `begin_update` before the matching `end_update` fails.
    pub fn begin_update(&self) -> Result<UpdateInfo, ServerError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.update_requested {
            return Err(ServerError::NoUpdateRequested(self.id));
        }
        if inner.in_update {
            return Err(ServerError::AlreadyInUpdate(self.id));
        }

        inner.sessions.swap();
        inner.in_update = true;
        inner.effective_drawing_region.invalidate();

        // Constrain the round to pixels that are still visible content
        self.update_visible_content_region(&mut inner);
        let visible_content = inner.visible_content_region.region.clone();
        let current = inner.sessions.current_mut();
        current.set_used(true);
        let mut overshoot = current.dirty_region().clone();
        overshoot.exclude(&visible_content);
        current.exclude(&overshoot);

        let constrained = current.dirty_region().clone();
        let expose = current.is_expose();
        let frame = inner.frame;
        let views = inner
            .views
            .iter()
            .filter(|v| {
                let screen_frame = v.frame.offset_by(frame.left, frame.top);
                constrained.intersects_rect(&screen_frame)
            })
            .map(|v| v.id)
            .collect();

        Ok(UpdateInfo {
            origin_x: frame.left,
            origin_y: frame.top,
            width: frame.width(),
            height: frame.height(),
            expose,
            views,
        })
    }

    /// Client finished painting: retire the current session and start
    /// the next round immediately if dirt accumulated meanwhile.
    /// Returns whether a new round was started.
    pub fn end_update(&self) -> Result<bool, ServerError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.in_update {
            return Err(ServerError::NotInUpdate(self.id));
        }

        // Compositing the finished area to the front buffer is the
        // renderer's business; account for it here
        debug!(
            window = self.id,
            area = inner.sessions.current().dirty_region().area(),
            expose = inner.sessions.current().is_expose(),
            request = inner.sessions.current().is_request(),
            "update round complete"
        );

        inner.sessions.current_mut().set_used(false);
        inner.in_update = false;
        inner.effective_drawing_region.invalidate();

        if inner.sessions.pending().is_used() {
            // A second wave of dirt arrived while the client painted
            debug!(window = self.id, "pending dirt, next round starts now");
            self.client.send(ServerEvent::UpdatePending { window: self.id });
            Ok(true)
        } else {
            inner.update_requested = false;
            Ok(false)
        }
    }

    /// The region the client is currently authorized to paint into.
    ///
    /// Outside an update: visible content minus whatever the pending
    /// session has already claimed, so out-of-band drawing cannot race a
    /// not-yet-acknowledged repaint. Inside an update: exactly the
    /// current session's dirty region.
    pub fn effective_drawing_region(&self, view: Option<u32>) -> Region {
        let mut inner = self.inner.lock().unwrap();
        let inner = &mut *inner;
        if !inner.effective_drawing_region.valid {
            self.update_visible_content_region(inner);
            let mut region = inner
                .pool
                .get_region_copy(&inner.visible_content_region.region);
            if inner.in_update {
                region.intersect_with(inner.sessions.current().dirty_region());
            } else if inner.sessions.pending().is_used() {
                region.exclude(inner.sessions.pending().dirty_region());
            }
            inner.effective_drawing_region.set(region);
        }

        let mut result = inner.effective_drawing_region.region.clone();
        if let Some(view) = view {
            let frame = inner.frame;
            match inner.views.iter().find(|v| v.id == view) {
                Some(v) => {
                    result.intersect_with_rect(&v.frame.offset_by(frame.left, frame.top));
                }
                None => result.clear(),
            }
        }
        result
    }

    // ========================================================================
    // Region cache maintenance
    // ========================================================================

    fn compute_border_region(&self, inner: &mut WindowInner) -> Region {
        if !inner.border_region.valid {
            let footprint = match inner.stack.clone() {
                Some(stack) => stack
                    .lock()
                    .unwrap()
                    .decorator()
                    .map(|d| d.footprint())
                    .unwrap_or_default(),
                None => Region::new(),
            };
            inner.border_region.set(footprint);
        }
        inner.border_region.region.clone()
    }

    fn compute_content_region(&self, inner: &mut WindowInner) -> Region {
        if !inner.content_region.valid {
            let region = Region::from_rect(inner.frame);
            inner.content_region.set(region);
        }
        inner.content_region.region.clone()
    }

    fn compute_full_region(&self, inner: &mut WindowInner) -> Region {
        let mut full = self.compute_content_region(inner);
        full.include(&self.compute_border_region(inner));
        full
    }

    fn update_visible_content_region(&self, inner: &mut WindowInner) {
        if inner.visible_content_region.valid {
            return;
        }
        let content = self.compute_content_region(inner);
        let mut region = inner.pool.get_region_copy(&inner.visible_region);
        region.intersect_with(&content);
        inner.visible_content_region.set(region);
    }

    fn combined_size_limits(&self, inner: &WindowInner) -> SizeLimits {
        let mut limits = inner.size_limits;
        if let Some(stack) = inner.stack.clone() {
            if let Some(decorator) = stack.lock().unwrap().decorator() {
                let extra = decorator.size_limits();
                limits.min_width = limits.min_width.max(extra.min_width);
                limits.min_height = limits.min_height.max(extra.min_height);
                limits.max_width = limits.max_width.min(extra.max_width);
                limits.max_height = limits.max_height.min(extra.max_height);
            }
        }
        limits
    }

    /// The shared decoration tracks the stack's front member
    fn update_decorator_frame(&self, inner: &mut WindowInner) {
        if let Some(stack) = inner.stack.clone() {
            let mut guard = stack.lock().unwrap();
            if guard.top_layer_window() == Some(self.id) {
                let frame = inner.frame;
                if let Some(decorator) = guard.decorator_mut() {
                    decorator.set_frame(frame);
                }
            }
        }
    }

    fn tab_position(&self, inner: &WindowInner) -> Option<usize> {
        let stack = inner.stack.as_ref()?;
        let guard = stack.lock().unwrap();
        guard.insertion_order().iter().position(|&w| w == self.id)
    }
}
