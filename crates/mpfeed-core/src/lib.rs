pub mod backup;
pub mod config;
pub mod error;
pub mod feed;
pub mod platform;
pub mod rpc;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod sync;
pub mod web;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use rpc::RpcClient;
pub use state::AppState;
pub use web::WebServer;
