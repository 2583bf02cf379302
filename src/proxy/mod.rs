pub mod context;
pub mod executor;
pub mod response_builder;
pub mod service;
pub mod types;

pub use context::RequestContext;
pub use executor::{execute_request, execute_request_cancellable, DEFAULT_TIMEOUT_MS, MAX_REDIRECTS};
pub use response_builder::{build_response, is_binary_content, version_to_string, ResponseBuildParams};
pub use service::{HttpProxyService, ProxyService, ProxyServiceExt};
pub use types::*;
