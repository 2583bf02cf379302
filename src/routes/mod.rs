//! HTTP invocation surface.

pub mod health;
pub mod proxy;
pub mod static_files;
