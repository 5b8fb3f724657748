//! Listener side of the server: binding, accepting and handing transports
//! to connections.

pub mod acceptor;
pub mod listener;

pub use acceptor::{Acceptor, PlainAcceptor};
pub use listener::{Server, ServerBuilder};
