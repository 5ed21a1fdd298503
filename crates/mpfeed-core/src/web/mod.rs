//! HTTP surface: feed documents, OPML download and the RPC endpoint

mod error;
mod handlers;
mod router;
mod server;

pub use error::{ApiError, ErrorCode};
pub use router::{create_health_router, create_router};
pub use server::WebServer;
