//! HTTP endpoints

pub mod msearch;
pub mod passthrough;

pub use msearch::msearch_handler;
pub use passthrough::passthrough_handler;
