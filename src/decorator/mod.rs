//! Window decorations (borders, tabs) for the Strata server
//!
//! Rendering and hit-testing policy live behind the `Decorator` trait;
//! the clipping core only consults the decoration footprint and size
//! limits. One decorator instance is shared by every window of a tab
//! stack and is replaced wholesale when the look changes.

use anyhow::Result;
use tracing::debug;

use crate::config::DecoratorConfig;
use crate::region::{Rect, Region};
use crate::window::flags::{WindowFlags, WindowLook};

/// Min/max size constraints a window's frame is clamped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            min_width: 1,
            max_width: i32::MAX,
            min_height: 1,
            max_height: i32::MAX,
        }
    }
}

impl SizeLimits {
    /// Clamp a proposed width/height into the allowed range
    pub fn clamp(&self, width: i32, height: i32) -> (i32, i32) {
        (
            width.clamp(self.min_width, self.max_width),
            height.clamp(self.min_height, self.max_height),
        )
    }
}

/// Pluggable border/tab renderer and hit-tester
///
/// The core treats this as an opaque collaborator: it pushes geometry
/// and tab changes in, and reads the footprint and size limits back out.
pub trait Decorator: Send {
    /// Decoration pixels (screen space) for the current frame and look
    fn footprint(&self) -> Region;

    /// Extra constraints the decoration imposes on the content frame
    fn size_limits(&self) -> SizeLimits;

    /// The content frame this decoration wraps
    fn set_frame(&mut self, frame: Rect);

    fn set_look(&mut self, look: WindowLook);

    /// Behavior flags of the owning window (resizability etc.)
    fn set_flags(&mut self, flags: WindowFlags);

    fn set_title(&mut self, tab: usize, title: &str);

    fn set_focus(&mut self, tab: usize, focused: bool);

    /// Insert a tab; `position` past the end appends
    fn add_tab(&mut self, position: usize, title: &str);

    fn remove_tab(&mut self, tab: usize);

    fn move_tab(&mut self, from: usize, to: usize);

    fn tab_count(&self) -> usize;

    /// Synchronously repaint the part of the decoration inside `dirty`
    fn draw(&mut self, dirty: &Region);
}

/// Stock decorator: a plain titlebar strip plus a uniform border ring
#[derive(Debug)]
pub struct DefaultDecorator {
    frame: Rect,
    look: WindowLook,
    flags: WindowFlags,
    tabs: Vec<Tab>,
    titlebar_height: i32,
    border_width: i32,
}

#[derive(Debug, Clone)]
struct Tab {
    title: String,
    focused: bool,
}

impl DefaultDecorator {
    /// A fresh decorator carries no tabs; one is added per attached window
    pub fn new(look: WindowLook, config: &DecoratorConfig) -> Self {
        Self {
            frame: Rect::default(),
            look,
            flags: WindowFlags::empty(),
            tabs: Vec::new(),
            titlebar_height: config.titlebar_height,
            border_width: config.border_width,
        }
    }

    fn titlebar_height(&self) -> i32 {
        match self.look {
            WindowLook::Titled => self.titlebar_height,
            WindowLook::Bordered | WindowLook::NoBorder => 0,
        }
    }

    fn border_width(&self) -> i32 {
        match self.look {
            WindowLook::Titled | WindowLook::Bordered => self.border_width,
            WindowLook::NoBorder => 0,
        }
    }
}

impl Decorator for DefaultDecorator {
    fn footprint(&self) -> Region {
        let border = self.border_width();
        let titlebar = self.titlebar_height();
        if border == 0 && titlebar == 0 {
            return Region::new();
        }
        let outer = Rect::new(
            self.frame.left - border,
            self.frame.top - border - titlebar,
            self.frame.right + border,
            self.frame.bottom + border,
        );
        let mut region = Region::from_rect(outer);
        region.exclude_rect(&self.frame);
        region
    }

    fn size_limits(&self) -> SizeLimits {
        // A non-resizable window is locked to its current frame
        if self.flags.contains(WindowFlags::NOT_RESIZABLE) {
            return SizeLimits {
                min_width: self.frame.width(),
                max_width: self.frame.width(),
                min_height: self.frame.height(),
                max_height: self.frame.height(),
            };
        }
        // The titlebar must fit at least one tab
        SizeLimits {
            min_width: (self.titlebar_height() * 2).max(1),
            min_height: 1,
            ..SizeLimits::default()
        }
    }

    fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn set_look(&mut self, look: WindowLook) {
        self.look = look;
    }

    fn set_flags(&mut self, flags: WindowFlags) {
        self.flags = flags;
    }

    fn set_title(&mut self, tab: usize, title: &str) {
        if let Some(t) = self.tabs.get_mut(tab) {
            t.title = title.to_owned();
        }
    }

    fn set_focus(&mut self, tab: usize, focused: bool) {
        if let Some(t) = self.tabs.get_mut(tab) {
            t.focused = focused;
        }
    }

    fn add_tab(&mut self, position: usize, title: &str) {
        let position = position.min(self.tabs.len());
        self.tabs.insert(
            position,
            Tab {
                title: title.to_owned(),
                focused: false,
            },
        );
    }

    fn remove_tab(&mut self, tab: usize) {
        if tab < self.tabs.len() {
            self.tabs.remove(tab);
        }
    }

    fn move_tab(&mut self, from: usize, to: usize) {
        if from < self.tabs.len() && to < self.tabs.len() && from != to {
            let tab = self.tabs.remove(from);
            self.tabs.insert(to, tab);
        }
    }

    fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    fn draw(&mut self, dirty: &Region) {
        // Rasterization is the renderer's business; account for the work
        // so the redraw protocol stays observable in logs.
        debug!(
            rects = dirty.count_rects(),
            tabs = self.tabs.len(),
            "decorator redraw"
        );
    }
}

/// Context object handing out decorator instances
///
/// Constructed once at server startup and passed by reference into
/// window construction; there is no process-wide registry.
#[derive(Debug, Clone)]
pub struct DecorManager {
    config: DecoratorConfig,
}

impl DecorManager {
    pub fn new(config: DecoratorConfig) -> Self {
        Self { config }
    }

    /// Look applied when a client does not request one
    pub fn default_look(&self) -> WindowLook {
        self.config.default_look
    }

    /// Build a decorator for `look`. Failure aborts that one window,
    /// never the server.
    pub fn new_decorator(&self, look: WindowLook) -> Result<Box<dyn Decorator>> {
        Ok(Box::new(DefaultDecorator::new(look, &self.config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> DecorManager {
        DecorManager::new(DecoratorConfig::default())
    }

    #[test]
    fn test_footprint_excludes_content_frame() {
        let mut decorator = manager().new_decorator(WindowLook::Titled).unwrap();
        let frame = Rect::from_xywh(100, 100, 200, 150);
        decorator.set_frame(frame);

        let border = DecoratorConfig::default().border_width;
        let footprint = decorator.footprint();
        assert!(!footprint.is_empty());
        // Content pixels are not decoration pixels
        assert!(!footprint.contains_point(150, 150));
        // The titlebar strip above the frame is
        assert!(footprint.contains_point(150, 100 - border - 1));
        // As is the left border
        assert!(footprint.contains_point(100 - border, 150));
    }

    #[test]
    fn test_no_border_look_has_empty_footprint() {
        let mut decorator = manager().new_decorator(WindowLook::NoBorder).unwrap();
        decorator.set_frame(Rect::from_xywh(0, 0, 100, 100));
        assert!(decorator.footprint().is_empty());
    }

    #[test]
    fn test_tab_management() {
        let mut decorator = manager().new_decorator(WindowLook::Titled).unwrap();
        assert_eq!(decorator.tab_count(), 0);

        decorator.add_tab(0, "first");
        decorator.add_tab(1, "second");
        decorator.add_tab(99, "third"); // out of range appends
        assert_eq!(decorator.tab_count(), 3);

        decorator.move_tab(2, 0);
        decorator.remove_tab(1);
        assert_eq!(decorator.tab_count(), 2);
    }

    #[test]
    fn test_not_resizable_locks_size_limits() {
        let mut decorator = manager().new_decorator(WindowLook::Titled).unwrap();
        decorator.set_frame(Rect::from_xywh(0, 0, 300, 200));
        decorator.set_flags(WindowFlags::NOT_RESIZABLE);

        let limits = decorator.size_limits();
        assert_eq!(limits.clamp(1000, 1000), (300, 200));
        assert_eq!(limits.clamp(10, 10), (300, 200));
    }

    #[test]
    fn test_size_limits_clamp() {
        let limits = SizeLimits {
            min_width: 50,
            max_width: 500,
            min_height: 40,
            max_height: 400,
        };
        assert_eq!(limits.clamp(10, 1000), (50, 400));
        assert_eq!(limits.clamp(200, 200), (200, 200));
    }
}
