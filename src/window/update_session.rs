//! Update sessions — one accumulate-then-flush cycle of dirty area
//!
//! A window owns exactly two sessions addressed as *current* and
//! *pending*. Dirty content accumulates in the pending session; when the
//! client acknowledges an update request the roles swap and the
//! now-current session constrains what the client may paint. The storage
//! is a fixed two-slot array plus an index flag; `UpdateSessions::swap`
//! is the only place the addressing changes.

use bitflags::bitflags;

use crate::region::Region;

bitflags! {
    /// Why a session's dirty area needs repainting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateCause: u8 {
        /// Newly revealed by an occlusion change
        const EXPOSE  = 1 << 0;
        /// Explicitly invalidated by a content change
        const REQUEST = 1 << 1;
    }
}

/// Dirty-region accumulator bound to one client repaint round-trip
#[derive(Debug, Default)]
pub struct UpdateSession {
    dirty_region: Region,
    in_use: bool,
    cause: UpdateCause,
}

impl UpdateSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `region` into the session's dirty area
    pub fn include(&mut self, region: &Region) {
        self.dirty_region.include(region);
    }

    /// Subtract `region`, so two live sessions never claim the same pixels
    pub fn exclude(&mut self, region: &Region) {
        self.dirty_region.exclude(region);
    }

    /// Translate the dirty area when the owning window moves, so an
    /// in-flight repaint keeps tracking the right screen pixels
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.dirty_region.offset_by(dx, dy);
    }

    pub fn dirty_region(&self) -> &Region {
        &self.dirty_region
    }

    pub fn is_used(&self) -> bool {
        self.in_use
    }

    /// Marking a session unused is the sole way it becomes empty again
    pub fn set_used(&mut self, used: bool) {
        self.in_use = used;
        if !used {
            self.dirty_region.clear();
            self.cause = UpdateCause::empty();
        }
    }

    pub fn add_cause(&mut self, cause: UpdateCause) {
        self.cause |= cause;
    }

    pub fn is_expose(&self) -> bool {
        self.cause.contains(UpdateCause::EXPOSE)
    }

    pub fn is_request(&self) -> bool {
        self.cause.contains(UpdateCause::REQUEST)
    }
}

/// The current/pending session pair
///
/// Slot storage is stable; only the index flag moves. Exactly one
/// session is ever addressed as current (in-flight) and one as pending
/// (accumulating).
#[derive(Debug, Default)]
pub struct UpdateSessions {
    slots: [UpdateSession; 2],
    current: usize,
}

impl UpdateSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &UpdateSession {
        &self.slots[self.current]
    }

    pub fn current_mut(&mut self) -> &mut UpdateSession {
        &mut self.slots[self.current]
    }

    pub fn pending(&self) -> &UpdateSession {
        &self.slots[1 - self.current]
    }

    pub fn pending_mut(&mut self) -> &mut UpdateSession {
        &mut self.slots[1 - self.current]
    }

    /// Swap the current/pending roles; the only place addressing changes
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Translate both sessions when the owning window moves
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        for slot in &mut self.slots {
            slot.move_by(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Rect;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::from_rect(Rect::from_xywh(x, y, w, h))
    }

    #[test]
    fn test_set_used_false_clears_region_and_cause() {
        let mut session = UpdateSession::new();
        session.include(&region(0, 0, 10, 10));
        session.add_cause(UpdateCause::EXPOSE | UpdateCause::REQUEST);
        session.set_used(true);

        session.set_used(false);
        assert!(session.dirty_region().is_empty());
        assert!(!session.is_expose());
        assert!(!session.is_request());
        assert!(!session.is_used());
    }

    #[test]
    fn test_exclude_removes_claimed_pixels() {
        let mut session = UpdateSession::new();
        session.include(&region(0, 0, 20, 10));
        session.exclude(&region(10, 0, 10, 10));
        assert_eq!(session.dirty_region().area(), 100);
    }

    #[test]
    fn test_move_by_tracks_window_motion() {
        let mut session = UpdateSession::new();
        session.include(&region(0, 0, 10, 10));
        session.move_by(5, 7);
        assert_eq!(
            session.dirty_region().frame(),
            Rect::from_xywh(5, 7, 10, 10)
        );
    }

    #[test]
    fn test_cause_bits() {
        let mut session = UpdateSession::new();
        assert!(!session.is_expose());
        session.add_cause(UpdateCause::EXPOSE);
        assert!(session.is_expose());
        assert!(!session.is_request());
        session.add_cause(UpdateCause::REQUEST);
        assert!(session.is_request());
    }

    #[test]
    fn test_swap_flips_roles_and_keeps_storage() {
        let mut sessions = UpdateSessions::new();
        sessions.pending_mut().include(&region(0, 0, 10, 10));
        assert!(sessions.current().dirty_region().is_empty());

        sessions.swap();
        assert_eq!(sessions.current().dirty_region().area(), 100);
        assert!(sessions.pending().dirty_region().is_empty());

        sessions.swap();
        assert_eq!(sessions.pending().dirty_region().area(), 100);
    }
}
