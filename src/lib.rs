//! Wicket - embeddable HTTP/1.x server engine
//!
//! Core library for request parsing, connection handling and the listener.

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use error::Error;
pub use http::connection::{Connection, ConnectionState};
pub use http::handler::{CloseOnUpgrade, Handler, UpgradeHandler};
pub use http::request::Request;
pub use http::response::{Response, ResponseError, StatusCode};
pub use server::{Acceptor, PlainAcceptor, Server};
