//! HTTP/1.x protocol implementation.
//!
//! This module implements the per-connection engine: parsing, dispatch,
//! keep-alive and upgrade handoff.
//!
//! # Architecture
//!
//! - **`parser`**: Incremental request parser producing head/body events
//! - **`headers`**: Case-insensitive, multi-valued header map
//! - **`request`**: The request slot handed to application code
//! - **`body`**: Streaming request body
//! - **`response`**: Application-facing response with its write-state machine
//! - **`writer`**: Serializes response frames onto the wire
//! - **`handler`**: Dispatch and upgrade traits
//! - **`connection`**: The connection state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!   ┌──▶ │ AwaitingRequest  │ ← Parse the next request head
//!   │    └──────┬───────────┘
//!   │           │ Head complete ──────── Upgrade ──▶ Upgraded
//!   │           ▼
//!   │    ┌──────────────────┐
//!   │    │  ReceivingBody   │ ← Forward body chunks to the application
//!   │    └──────┬───────────┘
//!   │           │ Request complete
//!   │           ▼
//!   │    ┌───────────────────────┐
//!   │    │ AwaitingAppCompletion │ ← Buffer pipelined bytes, write frames
//!   │    └──────┬────────────────┘
//!   │           │ Response ended
//!   │           ├─ Close → Closing
//!   └── KeepAlive
//! ```
//!
//! # Example
//!
//! ```ignore
//! use wicket::{Handler, Request, Response, Server};
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     async fn handle(&self, _request: &mut Request, mut response: Response) {
//!         let _ = response.set_header("Content-Type", "text/plain");
//!         let _ = response.end_with("Hello World\n");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(Hello);
//!     server.listen(std::net::Ipv4Addr::UNSPECIFIED.into(), 8080).await;
//!     tokio::signal::ctrl_c().await.ok();
//! }
//! ```

pub mod body;
pub mod connection;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
