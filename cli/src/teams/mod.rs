//! Teams operations: Graph resource models and the request dispatcher.

pub mod dispatcher;
pub mod models;

pub use dispatcher::{Dispatch, RequestDispatcher, SkipReason, DEFAULT_MESSAGE_COUNT};
pub use models::{Channel, ChannelMessage, Delivery, Team};
