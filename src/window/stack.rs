//! Tab stacks — ordered window groups sharing one decoration
//!
//! A stack keeps two orderings over the same member set: *insertion
//! order* (tab position, reordered by drag) and *layer order* (paint
//! order, front member last). The stack itself is a dumb ordered-pair
//! container: it allows emptying, and the "never observable empty"
//! invariant is enforced one layer up by `Window::detach_from_stack`.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::decorator::Decorator;

use super::WindowId;

/// Handle shared by every window of one tab group; the stack is
/// destroyed when the last member releases its handle
pub type SharedStack = Arc<Mutex<WindowStack>>;

/// An ordered group of windows sharing one decoration
pub struct WindowStack {
    /// Tab order (reordered by drag)
    insertion_order: Vec<WindowId>,
    /// Paint order, front-most member last
    layer_order: Vec<WindowId>,
    /// The single decoration shared by all members
    decorator: Option<Box<dyn Decorator>>,
}

impl WindowStack {
    pub fn new(decorator: Option<Box<dyn Decorator>>) -> Self {
        Self {
            insertion_order: Vec::new(),
            layer_order: Vec::new(),
            decorator,
        }
    }

    /// Wrap a fresh stack in its shared handle
    pub fn new_shared(decorator: Option<Box<dyn Decorator>>) -> SharedStack {
        Arc::new(Mutex::new(Self::new(decorator)))
    }

    pub fn window_count(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn insertion_order(&self) -> &[WindowId] {
        &self.insertion_order
    }

    pub fn layer_order(&self) -> &[WindowId] {
        &self.layer_order
    }

    /// The front-most member in paint order
    pub fn top_layer_window(&self) -> Option<WindowId> {
        self.layer_order.last().copied()
    }

    /// Insert `window` into both orderings; `position` of `None` appends
    pub fn add_window(&mut self, window: WindowId, position: Option<usize>, title: &str) {
        let position = position
            .unwrap_or(self.insertion_order.len())
            .min(self.insertion_order.len());
        self.insertion_order.insert(position, window);
        self.layer_order.push(window);
        if let Some(decorator) = self.decorator.as_mut() {
            decorator.add_tab(position, title);
        }
        debug!(window, position, members = self.window_count(), "stack add");
    }

    /// Remove `window` from both orderings
    ///
    /// Emptying the stack is allowed here; callers guard against it.
    pub fn remove_window(&mut self, window: WindowId) -> bool {
        let Some(tab) = self.insertion_order.iter().position(|&w| w == window) else {
            return false;
        };
        self.insertion_order.remove(tab);
        self.layer_order.retain(|&w| w != window);
        if let Some(decorator) = self.decorator.as_mut() {
            decorator.remove_tab(tab);
        }
        debug!(window, members = self.window_count(), "stack remove");
        true
    }

    /// Relocate `window` to the front of the paint order (tab activated)
    pub fn move_to_top_layer(&mut self, window: WindowId) -> bool {
        if !self.layer_order.contains(&window) {
            return false;
        }
        self.layer_order.retain(|&w| w != window);
        self.layer_order.push(window);
        true
    }

    /// Reorder the insertion order (tab reordering by drag)
    pub fn move_window(&mut self, from: usize, to: usize) -> bool {
        if from >= self.insertion_order.len() || to >= self.insertion_order.len() {
            return false;
        }
        if from != to {
            let window = self.insertion_order.remove(from);
            self.insertion_order.insert(to, window);
            if let Some(decorator) = self.decorator.as_mut() {
                decorator.move_tab(from, to);
            }
        }
        true
    }

    pub fn decorator(&self) -> Option<&dyn Decorator> {
        self.decorator.as_deref()
    }

    pub fn decorator_mut(&mut self) -> Option<&mut (dyn Decorator + 'static)> {
        self.decorator.as_deref_mut()
    }

    /// Replace the shared decoration; the previous one is destroyed
    pub fn set_decorator(&mut self, decorator: Option<Box<dyn Decorator>>) {
        self.decorator = decorator;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoratorConfig;
    use crate::decorator::DecorManager;
    use crate::window::flags::WindowLook;

    fn stack_with_decorator() -> WindowStack {
        let manager = DecorManager::new(DecoratorConfig::default());
        let decorator = manager.new_decorator(WindowLook::Titled).unwrap();
        let mut stack = WindowStack::new(Some(decorator));
        stack.add_window(1, None, "first");
        stack
    }

    #[test]
    fn test_orderings_stay_in_sync() {
        let mut stack = WindowStack::new(None);
        stack.add_window(1, None, "a");
        stack.add_window(2, None, "b");
        stack.add_window(3, Some(1), "c");

        assert_eq!(stack.insertion_order(), &[1, 3, 2]);
        assert_eq!(stack.layer_order(), &[1, 2, 3]);

        assert!(stack.remove_window(3));
        assert_eq!(stack.insertion_order(), &[1, 2]);
        assert_eq!(stack.layer_order(), &[1, 2]);
    }

    #[test]
    fn test_remove_unknown_window_fails() {
        let mut stack = WindowStack::new(None);
        stack.add_window(1, None, "a");
        assert!(!stack.remove_window(42));
        assert_eq!(stack.window_count(), 1);
    }

    #[test]
    fn test_move_to_top_layer() {
        let mut stack = WindowStack::new(None);
        stack.add_window(1, None, "a");
        stack.add_window(2, None, "b");
        stack.add_window(3, None, "c");

        assert!(stack.move_to_top_layer(1));
        assert_eq!(stack.layer_order(), &[2, 3, 1]);
        assert_eq!(stack.top_layer_window(), Some(1));
        // Insertion order is untouched by activation
        assert_eq!(stack.insertion_order(), &[1, 2, 3]);

        assert!(!stack.move_to_top_layer(42));
    }

    #[test]
    fn test_move_window_reorders_tabs_only() {
        let mut stack = WindowStack::new(None);
        stack.add_window(1, None, "a");
        stack.add_window(2, None, "b");
        stack.add_window(3, None, "c");

        assert!(stack.move_window(0, 2));
        assert_eq!(stack.insertion_order(), &[2, 3, 1]);
        assert_eq!(stack.layer_order(), &[1, 2, 3]);

        assert!(!stack.move_window(0, 5));
    }

    #[test]
    fn test_decorator_tab_tracking() {
        let mut stack = stack_with_decorator();
        stack.add_window(2, None, "second");
        assert_eq!(stack.decorator().unwrap().tab_count(), 2);

        stack.remove_window(1);
        assert_eq!(stack.decorator().unwrap().tab_count(), 1);
    }

    #[test]
    fn test_replacing_decorator_drops_previous() {
        let mut stack = stack_with_decorator();
        stack.set_decorator(None);
        assert!(stack.decorator().is_none());
    }
}
