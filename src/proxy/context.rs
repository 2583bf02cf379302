//! Request target state across a redirect chain.

use crate::error::ProxyError;
use url::Url;

/// Target of the current hop: scheme flavour, endpoint and request URI.
///
/// Created from the caller's URL, advanced by each `Location` header, and
/// dropped when the execution ends. The canonical URL it rebuilds omits the
/// port when it matches the scheme default.
#[derive(Debug, Clone)]
pub struct RequestContext {
    url: String,
    host: String,
    port: u16,
    path: String,
    is_tls: bool,
}

fn default_port(is_tls: bool) -> u16 {
    if is_tls {
        443
    } else {
        80
    }
}

fn request_uri(parsed: &Url) -> String {
    let path = match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    };
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

// Url::host_str keeps the brackets around IPv6 literals; the dialler and the
// TLS server name want the bare address.
fn bare_host(parsed: &Url) -> Option<String> {
    let host = parsed.host_str()?;
    Some(host.trim_start_matches('[').trim_end_matches(']').to_string())
}

impl RequestContext {
    /// Parses the initial URL.
    ///
    /// Rejects URLs without a host and schemes other than `http`/`https`.
    pub fn new(raw_url: &str) -> Result<Self, ProxyError> {
        let parsed =
            Url::parse(raw_url).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;

        let is_tls = match parsed.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(ProxyError::InvalidUrl(format!(
                    "unsupported scheme: {}",
                    other
                )))
            }
        };

        let host = bare_host(&parsed)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ProxyError::InvalidUrl("URL has no host".to_string()))?;

        Ok(Self {
            url: raw_url.to_string(),
            host,
            port: parsed.port().unwrap_or(default_port(is_tls)),
            path: request_uri(&parsed),
            is_tls,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Origin-form request URI (path plus query).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    /// Host header value: the port is appended only when non-default.
    pub fn host_header(&self) -> String {
        if self.port == default_port(self.is_tls) {
            self.host.clone()
        } else {
            format!("{}:{}", self.bracketed_host(), self.port)
        }
    }

    fn bracketed_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// Advances the context along a `Location` header and returns the next
    /// absolute URL.
    ///
    /// Absolute locations are re-parsed with the port defaulted by scheme.
    /// Root-relative locations replace path and query. Anything else is
    /// treated as relative to the root by prefixing `/`; resolution against
    /// the current request path is deliberately not performed.
    pub fn update_from_redirect(&mut self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            let Ok(parsed) = Url::parse(location) else {
                // Unparsable absolute target: report it as-is and keep dialling
                // the previous endpoint.
                self.url = location.to_string();
                return self.url.clone();
            };

            self.is_tls = parsed.scheme() == "https";
            if let Some(host) = bare_host(&parsed).filter(|h| !h.is_empty()) {
                self.host = host;
            }
            self.port = parsed.port().unwrap_or(default_port(self.is_tls));
            self.path = request_uri(&parsed);
        } else if location.starts_with('/') {
            self.path = location.to_string();
        } else {
            self.path = format!("/{}", location);
        }

        self.url = self.rebuild_url();
        self.url.clone()
    }

    fn rebuild_url(&self) -> String {
        let scheme = if self.is_tls { "https" } else { "http" };
        let authority = if self.port == default_port(self.is_tls) {
            self.bracketed_host()
        } else {
            format!("{}:{}", self.bracketed_host(), self.port)
        };
        format!("{}://{}{}", scheme, authority, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_port_and_path() {
        let ctx = RequestContext::new("http://example.com").unwrap();
        assert_eq!(ctx.host(), "example.com");
        assert_eq!(ctx.port(), 80);
        assert_eq!(ctx.path(), "/");
        assert!(!ctx.is_tls());

        let ctx = RequestContext::new("https://example.com/a/b?q=1").unwrap();
        assert_eq!(ctx.port(), 443);
        assert_eq!(ctx.path(), "/a/b?q=1");
        assert!(ctx.is_tls());
    }

    #[test]
    fn test_new_keeps_explicit_port() {
        let ctx = RequestContext::new("http://example.com:8080/x").unwrap();
        assert_eq!(ctx.port(), 8080);
        assert_eq!(ctx.host_header(), "example.com:8080");
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert_eq!(
            RequestContext::new("not a url").unwrap_err().code(),
            "INVALID_URL"
        );
        assert_eq!(
            RequestContext::new("ftp://example.com/file").unwrap_err().code(),
            "INVALID_URL"
        );
        assert_eq!(
            RequestContext::new("http:///missing-host").unwrap_err().code(),
            "INVALID_URL"
        );
    }

    #[test]
    fn test_ipv6_host_is_unbracketed() {
        let ctx = RequestContext::new("http://[::1]:8080/").unwrap();
        assert_eq!(ctx.host(), "::1");
        assert_eq!(ctx.host_header(), "[::1]:8080");
    }

    #[test]
    fn test_absolute_redirect() {
        let mut ctx = RequestContext::new("http://a.test/start").unwrap();
        let next = ctx.update_from_redirect("https://b.test/landing?x=2");
        assert_eq!(next, "https://b.test/landing?x=2");
        assert_eq!(ctx.host(), "b.test");
        assert_eq!(ctx.port(), 443);
        assert!(ctx.is_tls());
    }

    #[test]
    fn test_absolute_redirect_defaults_port_by_scheme() {
        let mut ctx = RequestContext::new("http://a.test:8080/start").unwrap();
        let next = ctx.update_from_redirect("http://a.test/next");
        assert_eq!(next, "http://a.test/next");
        assert_eq!(ctx.port(), 80);
    }

    #[test]
    fn test_root_relative_redirect_keeps_endpoint() {
        let mut ctx = RequestContext::new("http://a.test:8080/start?q=1").unwrap();
        let next = ctx.update_from_redirect("/next?q=2");
        assert_eq!(next, "http://a.test:8080/next?q=2");
        assert_eq!(ctx.host(), "a.test");
        assert_eq!(ctx.port(), 8080);
    }

    #[test]
    fn test_bare_relative_redirect_is_rooted() {
        let mut ctx = RequestContext::new("https://a.test/deep/path").unwrap();
        let next = ctx.update_from_redirect("other");
        assert_eq!(next, "https://a.test/other");
        assert_eq!(ctx.path(), "/other");
    }

    #[test]
    fn test_canonical_url_omits_default_port() {
        let mut ctx = RequestContext::new("http://a.test/start").unwrap();
        let next = ctx.update_from_redirect("http://b.test:80/x");
        assert_eq!(next, "http://b.test/x");
    }
}
