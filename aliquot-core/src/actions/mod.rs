//! Actions and their dispatch
//!
//! Every state change in the engine is an [`Action`]. Actions go through an
//! [`ActionDispatcher`], which hands each one to the state store first and
//! then to any registered observers, in registration order.

pub mod action;
pub mod dispatcher;

pub use action::{Action, CommandTransition, CommandUpdate};
pub use dispatcher::{ActionDispatcher, ActionHandler};
