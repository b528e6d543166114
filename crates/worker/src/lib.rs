pub mod dispatcher;
pub mod poller;
pub mod pruner;
pub mod reconciler;
pub mod resolver;
pub mod store;
pub mod ticker;
pub mod transport;
