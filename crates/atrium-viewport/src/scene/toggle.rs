use std::cell::RefCell;
use std::rc::Rc;

/// A boolean visibility flag with synchronous observers.
///
/// Observers are explicit registrations, not implicit reactivity: `set`
/// invokes every watcher in registration order, once, and only on an actual
/// transition. Setting the current value again is a no-op.
pub struct VisibilityToggle {
    value: bool,
    watchers: Vec<Box<dyn FnMut(bool)>>,
}

impl VisibilityToggle {
    pub fn new(initial: bool) -> Self {
        Self {
            value: initial,
            watchers: Vec::new(),
        }
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// Transitions the flag. Returns `true` if the value changed (and the
    /// watchers ran).
    pub fn set(&mut self, value: bool) -> bool {
        if value == self.value {
            return false;
        }
        self.value = value;
        for watcher in &mut self.watchers {
            watcher(value);
        }
        true
    }

    /// Registers a watcher. It is not invoked for the current value; callers
    /// apply the initial state explicitly.
    pub fn watch<F>(&mut self, watcher: F)
    where
        F: FnMut(bool) + 'static,
    {
        self.watchers.push(Box::new(watcher));
    }

    /// Detaches every watcher. Later `set` calls still flip the flag but no
    /// longer mutate derived state — used during teardown.
    pub fn clear_watchers(&mut self) {
        self.watchers.clear();
    }
}

/// Shared read/write handle to a [`VisibilityToggle`].
///
/// This is the debug overlay's binding surface: the panel holds clones and
/// mutates visibility without going through the coordinator.
#[derive(Clone)]
pub struct ToggleHandle {
    inner: Rc<RefCell<VisibilityToggle>>,
}

impl ToggleHandle {
    pub fn new(initial: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(VisibilityToggle::new(initial))),
        }
    }

    pub fn get(&self) -> bool {
        self.inner.borrow().value()
    }

    pub fn set(&self, value: bool) -> bool {
        self.inner.borrow_mut().set(value)
    }

    pub fn watch<F>(&self, watcher: F)
    where
        F: FnMut(bool) + 'static,
    {
        self.inner.borrow_mut().watch(watcher);
    }

    pub fn clear_watchers(&self) {
        self.inner.borrow_mut().clear_watchers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn set_same_value_is_a_no_op() {
        let hits = Rc::new(RefCell::new(0));
        let mut toggle = VisibilityToggle::new(false);
        let h = Rc::clone(&hits);
        toggle.watch(move |_| *h.borrow_mut() += 1);

        assert!(!toggle.set(false));
        assert_eq!(*hits.borrow(), 0);

        assert!(toggle.set(true));
        assert!(!toggle.set(true));
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn watchers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut toggle = VisibilityToggle::new(false);
        for tag in [1, 2, 3] {
            let order = Rc::clone(&order);
            toggle.watch(move |v| order.borrow_mut().push((tag, v)));
        }
        toggle.set(true);
        assert_eq!(*order.borrow(), vec![(1, true), (2, true), (3, true)]);
    }

    #[test]
    fn cleared_watchers_no_longer_fire() {
        let hits = Rc::new(RefCell::new(0));
        let handle = ToggleHandle::new(false);
        let h = Rc::clone(&hits);
        handle.watch(move |_| *h.borrow_mut() += 1);

        handle.clear_watchers();
        assert!(handle.set(true));
        assert_eq!(*hits.borrow(), 0);
        assert!(handle.get());
    }
}
