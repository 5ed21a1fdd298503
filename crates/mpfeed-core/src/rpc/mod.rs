//! RPC surface used by the browser UI and the CLI
//!
//! Requests travel over `POST /rpc`; the dispatcher itself is transport
//! independent.

mod client;
mod handler;
mod protocol;

pub use client::RpcClient;
pub use handler::handle_request;
pub use protocol::*;
