//! Action dispatcher
//!
//! Delivery is synchronous and ordered: the store sees an action before any
//! observer, and every handler sees actions in dispatch order. Handlers
//! cannot dispatch; they only get `&Action`.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::action::Action;

/// Anything that reacts to actions
pub trait ActionHandler {
    fn handle_action(&mut self, action: &Action);
}

/// Fans actions out to a store and registered observers
pub struct ActionDispatcher<S: ActionHandler> {
    store: S,
    handlers: Vec<Box<dyn ActionHandler + Send>>,
}

impl<S: ActionHandler> ActionDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: Vec::new(),
        }
    }

    /// Register an observer after the store and earlier observers
    pub fn add_handler(&mut self, handler: Box<dyn ActionHandler + Send>) {
        self.handlers.push(handler);
    }

    /// Deliver an action to the store, then to each observer
    pub fn dispatch(&mut self, action: &Action) {
        trace!("dispatch {}", action.name());
        self.store.handle_action(action);
        for handler in self.handlers.iter_mut() {
            handler.handle_action(action);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
