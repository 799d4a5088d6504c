//! Endpoint resolution with a time-bounded reachability cache
//!
//! Both backend services can be configured with a LAN-local URL alongside
//! their public one. LAN reachability is intermittent (sleeping NAS, VPN
//! state) and probing is expensive, so resolution results are cached for a
//! short TTL and refreshed lazily. A failed probe degrades to the public
//! URL; it never surfaces as an error.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Timeout for the local reachability probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a resolution result stays valid
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Local/public URL pair for one logical service, supplied by the
/// configuration collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub local_url: Option<String>,
    pub public_url: String,
    /// Path probed on the local URL to establish reachability; must answer
    /// 2xx without credentials
    pub probe_path: String,
}

#[derive(Debug, Clone)]
struct ResolvedEndpoint {
    url: String,
    is_local: bool,
    expires_at: Instant,
}

/// Reachability check for a candidate local URL.
///
/// Non-2xx responses and all transport failures (timeout, DNS, refused)
/// count as unreachable; the probe itself never errors.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Probe implementation backed by a plain GET with [`PROBE_TIMEOUT`]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "local probe failed");
                false
            }
        }
    }
}

/// Resolves which URL of a local/public pair to use, caching per pair.
///
/// One resolver instance is constructed per session and injected into the
/// orchestrator; the cache is its only state. `invalidate` must be called
/// whenever the owning configuration changes.
pub struct EndpointResolver {
    probe: Box<dyn Probe>,
    cache: Mutex<HashMap<(String, String), ResolvedEndpoint>>,
    ttl: Duration,
}

impl EndpointResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_probe(Box::new(HttpProbe::new(client)))
    }

    pub fn with_probe(probe: Box<dyn Probe>) -> Self {
        Self {
            probe,
            cache: Mutex::new(HashMap::new()),
            ttl: CACHE_TTL,
        }
    }

    #[cfg(test)]
    fn with_probe_and_ttl(probe: Box<dyn Probe>, ttl: Duration) -> Self {
        Self {
            probe,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Resolve the URL to use for a service. Infallible: an unreachable
    /// local URL degrades to the public one.
    pub async fn resolve(&self, endpoints: &ServiceEndpoints) -> String {
        let public = endpoints.public_url.trim_end_matches('/').to_string();

        let local = match &endpoints.local_url {
            Some(local) if !local.trim_end_matches('/').is_empty() => {
                local.trim_end_matches('/').to_string()
            }
            // No local URL configured: nothing to probe, nothing to cache
            _ => return public,
        };

        let key = (local.clone(), public.clone());
        if let Some(entry) = self.cache.lock().get(&key) {
            if Instant::now() < entry.expires_at {
                return entry.url.clone();
            }
        }

        // Duplicate probes in a race window are acceptable; the lock is
        // never held across the await.
        let probe_url = format!("{}{}", local, endpoints.probe_path);
        let reachable = self.probe.is_reachable(&probe_url).await;

        let url = if reachable { local } else { public };
        info!(url = %url, is_local = reachable, "resolved service endpoint");

        self.cache.lock().insert(
            key,
            ResolvedEndpoint {
                url: url.clone(),
                is_local: reachable,
                expires_at: Instant::now() + self.ttl,
            },
        );

        url
    }

    /// Drop all cached resolutions. Called when the owning configuration
    /// changes so stale endpoints are never reused.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock();
        if !cache.is_empty() {
            debug!(entries = cache.len(), "clearing resolved endpoint cache");
            cache.clear();
        }
    }

    /// Whether the last resolution for this pair chose the local URL.
    /// `None` when nothing is cached.
    pub fn cached_is_local(&self, endpoints: &ServiceEndpoints) -> Option<bool> {
        let local = endpoints.local_url.as_deref()?.trim_end_matches('/').to_string();
        let public = endpoints.public_url.trim_end_matches('/').to_string();
        self.cache
            .lock()
            .get(&(local, public))
            .map(|entry| entry.is_local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedProbe {
        reachable: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Probe for FixedProbe {
        async fn is_reachable(&self, _url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    fn endpoints(local: Option<&str>, public: &str) -> ServiceEndpoints {
        ServiceEndpoints {
            local_url: local.map(String::from),
            public_url: public.to_string(),
            probe_path: "/ping".to_string(),
        }
    }

    #[tokio::test]
    async fn test_no_local_url_skips_probe_and_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = EndpointResolver::with_probe(Box::new(FixedProbe {
            reachable: true,
            calls: calls.clone(),
        }));

        let pair = endpoints(None, "https://media.example.com/");
        assert_eq!(resolver.resolve(&pair).await, "https://media.example.com");
        assert_eq!(resolver.resolve(&pair).await, "https://media.example.com");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.cached_is_local(&pair), None);
    }

    #[tokio::test]
    async fn test_reachable_local_is_cached_within_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = EndpointResolver::with_probe(Box::new(FixedProbe {
            reachable: true,
            calls: calls.clone(),
        }));

        let pair = endpoints(Some("http://192.168.1.5:8096/"), "https://media.example.com");
        assert_eq!(resolver.resolve(&pair).await, "http://192.168.1.5:8096");
        assert_eq!(resolver.resolve(&pair).await, "http://192.168.1.5:8096");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "second call must hit the cache");
        assert_eq!(resolver.cached_is_local(&pair), Some(true));
    }

    #[tokio::test]
    async fn test_unreachable_local_degrades_to_public() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = EndpointResolver::with_probe(Box::new(FixedProbe {
            reachable: false,
            calls: calls.clone(),
        }));

        let pair = endpoints(Some("http://192.168.1.5:8096"), "https://media.example.com");
        assert_eq!(resolver.resolve(&pair).await, "https://media.example.com");
        assert_eq!(resolver.cached_is_local(&pair), Some(false));
    }

    #[tokio::test]
    async fn test_expired_entry_reprobes_and_falls_back() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = EndpointResolver::with_probe_and_ttl(
            Box::new(FixedProbe {
                reachable: false,
                calls: calls.clone(),
            }),
            Duration::from_millis(10),
        );

        let pair = endpoints(Some("http://nas.lan:8096"), "https://media.example.com");
        resolver.resolve(&pair).await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(resolver.resolve(&pair).await, "https://media.example.com");
        assert_eq!(calls.load(Ordering::SeqCst), 2, "expiry must trigger a re-probe");
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = EndpointResolver::with_probe(Box::new(FixedProbe {
            reachable: true,
            calls: calls.clone(),
        }));

        let pair = endpoints(Some("http://nas.lan:8096"), "https://media.example.com");
        resolver.resolve(&pair).await;
        resolver.invalidate();
        resolver.resolve(&pair).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_trailing_slashes_are_stripped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = EndpointResolver::with_probe(Box::new(FixedProbe {
            reachable: true,
            calls: calls.clone(),
        }));

        let pair = endpoints(Some("http://nas.lan:8096///"), "https://media.example.com/");
        assert_eq!(resolver.resolve(&pair).await, "http://nas.lan:8096");
    }
}
