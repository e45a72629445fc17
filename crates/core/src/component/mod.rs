//! Extension methods registered against sender and value type keys, resolved by
//! most-specific overload instead of static typing.

mod error;
mod manager;
mod method;
mod resolve;
mod types;

pub use error::ComponentError;
pub use manager::{CallOutcome, ComponentManager, ComponentResult, PendingCall};
pub use method::{
    ComponentArg, ComponentCall, ComponentContainer, ComponentHandler, ComponentMethod, Object,
    SyncPolicy,
};
pub use types::{TypeGraph, TypeKey};
