//! Host side of framegrid: configuration, logging, HTTP image access and the
//! highlight extraction service client.

pub mod config;
pub mod logging;
pub mod service;
pub mod source;
