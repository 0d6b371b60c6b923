//! Remote sources the render stream may fetch
//!
//! `/render/:key?url=` makes the server open an outbound request, so only
//! URLs under a configured base are accepted. The server's own origin is
//! always allowed, which keeps the simulated token endpoints usable.

use reqwest::Url;
use std::net::SocketAddr;

/// Base URLs a remote fragment source must live under
#[derive(Debug, Clone, Default)]
pub struct UpstreamPolicy {
    bases: Vec<Url>,
}

impl UpstreamPolicy {
    /// Build from configured bases plus the server's own address
    ///
    /// Entries that don't parse as URLs are skipped with a warning.
    pub fn new(configured: &[String], bind_addr: SocketAddr) -> Self {
        let mut bases: Vec<Url> = configured
            .iter()
            .filter_map(|raw| match Url::parse(raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Ignoring allowed upstream {:?}: {}", raw, e);
                    None
                }
            })
            .collect();

        let mut own = vec![bind_addr];
        if bind_addr.ip().is_unspecified() {
            own.push(SocketAddr::from(([127, 0, 0, 1], bind_addr.port())));
        }
        bases.extend(
            own.into_iter()
                .filter_map(|addr| Url::parse(&format!("http://{}/", addr)).ok()),
        );

        Self { bases }
    }

    /// Whether `url` falls under one of the allowed bases
    pub fn allows(&self, url: &Url) -> bool {
        self.bases.iter().any(|base| {
            base.scheme() == url.scheme()
                && base.host_str() == url.host_str()
                && base.port_or_known_default() == url.port_or_known_default()
                && url.path().starts_with(base.path())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(bases: &[&str]) -> UpstreamPolicy {
        let configured: Vec<String> = bases.iter().map(|b| b.to_string()).collect();
        UpstreamPolicy::new(&configured, "127.0.0.1:8000".parse().unwrap())
    }

    fn allows(policy: &UpstreamPolicy, url: &str) -> bool {
        policy.allows(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_own_origin_is_always_allowed() {
        let policy = policy(&[]);
        assert!(allows(&policy, "http://127.0.0.1:8000/simulated_token_stream?text=hi"));
        assert!(!allows(&policy, "http://127.0.0.1:8001/simulated_token_stream"));
        assert!(!allows(&policy, "http://169.254.169.254/latest/meta-data/"));
    }

    #[test]
    fn test_configured_base_limits_path() {
        let policy = policy(&["https://models.example.com/v1/stream/"]);
        assert!(allows(&policy, "https://models.example.com/v1/stream/chat"));
        assert!(!allows(&policy, "https://models.example.com/admin"));
        assert!(!allows(&policy, "http://models.example.com/v1/stream/chat"));
        assert!(!allows(&policy, "https://models.example.com.evil.net/v1/stream/chat"));
    }

    #[test]
    fn test_unspecified_bind_allows_loopback() {
        let policy = UpstreamPolicy::new(&[], "0.0.0.0:9000".parse().unwrap());
        assert!(allows(&policy, "http://127.0.0.1:9000/simulated_with_tokenizer"));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let policy = policy(&["not a url"]);
        assert!(!allows(&policy, "http://localhost/"));
        assert!(allows(&policy, "http://127.0.0.1:8000/"));
    }
}
