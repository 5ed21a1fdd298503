//! Request handlers

mod feeds;
mod opml;
mod rpc;

pub use feeds::get_feed;
pub use opml::get_opml;
pub use rpc::rpc;
