//! Proxy service abstraction.
//!
//! Lets the invocation surfaces depend on a trait instead of the concrete
//! executor, so tests can substitute a canned implementation.

use super::executor::execute_request;
use super::types::{ProxyRequest, ProxyResponse};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Executes proxy requests.
pub trait ProxyService: Send + Sync {
    fn execute(
        &self,
        request: ProxyRequest,
    ) -> Pin<Box<dyn Future<Output = ProxyResponse> + Send + '_>>;
}

/// Default implementation backed by the request execution engine.
#[derive(Default, Clone)]
pub struct HttpProxyService;

impl HttpProxyService {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl ProxyService for HttpProxyService {
    fn execute(
        &self,
        request: ProxyRequest,
    ) -> Pin<Box<dyn Future<Output = ProxyResponse> + Send + '_>> {
        Box::pin(execute_request(request))
    }
}

/// Convenience constructors for the common request shapes.
pub trait ProxyServiceExt: ProxyService {
    fn get(&self, url: &str) -> Pin<Box<dyn Future<Output = ProxyResponse> + Send + '_>> {
        self.execute(ProxyRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: Default::default(),
            body: None,
            timeout: None,
        })
    }

    fn post(
        &self,
        url: &str,
        body: Option<String>,
    ) -> Pin<Box<dyn Future<Output = ProxyResponse> + Send + '_>> {
        self.execute(ProxyRequest {
            method: "POST".to_string(),
            url: url.to_string(),
            headers: Default::default(),
            body,
            timeout: None,
        })
    }
}

impl<T: ProxyService + ?Sized> ProxyServiceExt for T {}
