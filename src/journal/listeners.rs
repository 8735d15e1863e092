//! Registry of abort callbacks.

use std::collections::BTreeMap;
use std::fmt;

/// Token returned on registration; removes the listener again.
pub type ListenerToken = u64;

/// Callbacks run on abort, in registration order.
///
/// Tokens are handed out in increasing order, so iterating the map by key
/// is iterating by registration.
#[derive(Default)]
pub struct AbortListeners {
    next_token: ListenerToken,
    listeners: BTreeMap<ListenerToken, Box<dyn FnMut()>>,
}

impl AbortListeners {
    pub fn add(&mut self, listener: Box<dyn FnMut()>) -> ListenerToken {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.insert(token, listener);
        token
    }

    /// Returns `false` if the token was unknown or already removed.
    pub fn remove(&mut self, token: ListenerToken) -> bool {
        self.listeners.remove(&token).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke every listener once. Listeners stay registered.
    pub fn notify(&mut self) {
        for listener in self.listeners.values_mut() {
            listener();
        }
    }
}

impl fmt::Debug for AbortListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortListeners")
            .field("next_token", &self.next_token)
            .field("tokens", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notify_in_registration_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = AbortListeners::default();

        for name in ["first", "second", "third"] {
            let calls = Rc::clone(&calls);
            registry.add(Box::new(move || calls.borrow_mut().push(name)));
        }
        registry.notify();

        assert_eq!(*calls.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let calls = Rc::new(RefCell::new(0));
        let mut registry = AbortListeners::default();

        let counter = Rc::clone(&calls);
        let token = registry.add(Box::new(move || *counter.borrow_mut() += 1));
        assert!(registry.remove(token));
        assert!(!registry.remove(token));

        registry.notify();
        assert_eq!(*calls.borrow(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tokens_are_not_reused() {
        let mut registry = AbortListeners::default();
        let a = registry.add(Box::new(|| {}));
        registry.remove(a);
        let b = registry.add(Box::new(|| {}));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 1);
    }
}
