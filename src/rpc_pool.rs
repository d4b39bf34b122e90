// src/rpc_pool.rs
//
// Endpoint selection over a static, ordered list of public JSON-RPC endpoints.
// Each candidate is liveness-probed with `eth_blockNumber`; the first one that
// answers wins. Nothing is cached: every pipeline attempt selects again.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::middleware::Middleware;
use ethers::prelude::{Http, Provider};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Builds clients for endpoint URLs and probes their liveness.
#[async_trait]
pub trait EndpointConnector: Send + Sync {
    type Client: Send + Sync;

    /// Constructs a client bound to `url`. No network I/O.
    fn connect(&self, url: &str) -> Result<Self::Client>;

    /// Fetches the current block height through `client`.
    async fn probe(&self, client: &Self::Client) -> Result<u64>;
}

/// Production connector: one fresh `Provider<Http>` per endpoint attempt.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    probe_timeout: Duration,
}

impl HttpConnector {
    pub fn new(probe_timeout: Duration) -> Self {
        Self { probe_timeout }
    }
}

#[async_trait]
impl EndpointConnector for HttpConnector {
    type Client = Arc<Provider<Http>>;

    fn connect(&self, url: &str) -> Result<Self::Client> {
        let provider = Provider::<Http>::try_from(url)
            .map_err(|e| anyhow!("Failed to create provider from {}: {}", url, e))?;
        Ok(Arc::new(provider))
    }

    async fn probe(&self, client: &Self::Client) -> Result<u64> {
        let block = tokio::time::timeout(self.probe_timeout, client.get_block_number())
            .await
            .map_err(|_| anyhow!("eth_blockNumber timed out after {:?}", self.probe_timeout))??;
        Ok(block.as_u64())
    }
}

/// A live connection chosen for one pipeline attempt.
#[derive(Debug, Clone)]
pub struct RpcConnection<C> {
    pub client: C,
    pub endpoint: String,
    /// Position of `endpoint` in the configured list.
    pub index: usize,
    /// Wall-clock latency of the liveness probe.
    pub latency_ms: u64,
    /// Endpoints ahead of this one that failed during this run.
    pub fallbacks_attempted: usize,
    /// Height returned by the liveness probe.
    pub block_number: u64,
}

/// Errores de selección de endpoint
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("All {attempted} RPC endpoints failed (last error: {last_error})")]
    Exhausted { attempted: usize, last_error: String },
}

impl SelectionError {
    pub fn attempted(&self) -> usize {
        match self {
            SelectionError::Exhausted { attempted, .. } => *attempted,
        }
    }
}

/// Probes `endpoints[start..]` in order and returns the first live connection.
///
/// `fallbacks_attempted` on the result equals its index: every endpoint ahead of it
/// either failed its probe here or failed the full pipeline in an earlier attempt.
pub async fn select_endpoint<C: EndpointConnector>(
    connector: &C,
    endpoints: &[String],
    start: usize,
) -> Result<RpcConnection<C::Client>, SelectionError> {
    let mut last_error = String::from("no endpoints configured");

    for (index, url) in endpoints.iter().enumerate().skip(start) {
        debug!("[RpcSelector] Probing endpoint {}/{}: {}", index + 1, endpoints.len(), url);

        let client = match connector.connect(url) {
            Ok(client) => client,
            Err(e) => {
                warn!("❌ [RpcSelector] Could not build client for {}: {:#}", url, e);
                last_error = format!("{:#}", e);
                continue;
            }
        };

        let start_time = Instant::now();
        match connector.probe(&client).await {
            Ok(block_number) => {
                let latency_ms = start_time.elapsed().as_millis() as u64;
                info!(
                    "✅ [RpcSelector] Connected to {} (block {}, latency {}ms, {} fallbacks)",
                    url, block_number, latency_ms, index
                );
                return Ok(RpcConnection {
                    client,
                    endpoint: url.clone(),
                    index,
                    latency_ms,
                    fallbacks_attempted: index,
                    block_number,
                });
            }
            Err(e) => {
                warn!(
                    "❌ [RpcSelector] Liveness probe failed for {} after {:?}: {:#}",
                    url,
                    start_time.elapsed(),
                    e
                );
                last_error = format!("{:#}", e);
            }
        }
    }

    Err(SelectionError::Exhausted {
        attempted: endpoints.len(),
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeConnector {
        dead: HashSet<String>,
        unparseable: HashSet<String>,
        probed: Mutex<Vec<String>>,
    }

    impl FakeConnector {
        fn new(dead: &[&str]) -> Self {
            Self {
                dead: dead.iter().map(|s| s.to_string()).collect(),
                unparseable: HashSet::new(),
                probed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EndpointConnector for FakeConnector {
        type Client = String;

        fn connect(&self, url: &str) -> Result<String> {
            if self.unparseable.contains(url) {
                return Err(anyhow!("bad url"));
            }
            Ok(url.to_string())
        }

        async fn probe(&self, client: &String) -> Result<u64> {
            self.probed.lock().unwrap().push(client.clone());
            if self.dead.contains(client) {
                Err(anyhow!("connection refused"))
            } else {
                Ok(19_000_000)
            }
        }
    }

    fn endpoints() -> Vec<String> {
        vec!["rpc-a", "rpc-b", "rpc-c", "rpc-d"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_first_live_endpoint_wins() {
        let connector = FakeConnector::new(&[]);
        let conn = select_endpoint(&connector, &endpoints(), 0).await.unwrap();
        assert_eq!(conn.endpoint, "rpc-a");
        assert_eq!(conn.fallbacks_attempted, 0);
        assert_eq!(conn.block_number, 19_000_000);
        assert_eq!(connector.probed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_skips_dead_endpoints_and_counts_fallbacks() {
        let connector = FakeConnector::new(&["rpc-a", "rpc-b"]);
        let conn = select_endpoint(&connector, &endpoints(), 0).await.unwrap();
        assert_eq!(conn.endpoint, "rpc-c");
        assert_eq!(conn.index, 2);
        assert_eq!(conn.fallbacks_attempted, 2);
    }

    #[tokio::test]
    async fn test_unbuildable_client_is_skipped() {
        let mut connector = FakeConnector::new(&[]);
        connector.unparseable.insert("rpc-a".to_string());
        let conn = select_endpoint(&connector, &endpoints(), 0).await.unwrap();
        assert_eq!(conn.endpoint, "rpc-b");
        assert_eq!(*connector.probed.lock().unwrap(), vec!["rpc-b".to_string()]);
    }

    #[tokio::test]
    async fn test_start_index_skips_earlier_endpoints() {
        let connector = FakeConnector::new(&[]);
        let conn = select_endpoint(&connector, &endpoints(), 3).await.unwrap();
        assert_eq!(conn.endpoint, "rpc-d");
        assert_eq!(conn.fallbacks_attempted, 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempted_count() {
        let connector = FakeConnector::new(&["rpc-a", "rpc-b", "rpc-c", "rpc-d"]);
        let err = select_endpoint(&connector, &endpoints(), 0).await.unwrap_err();
        assert_eq!(err.attempted(), 4);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_http_connector_rejects_malformed_url() {
        let connector = HttpConnector::new(Duration::from_secs(1));
        assert!(connector.connect("not a url").is_err());
        assert!(connector.connect("https://eth.llamarpc.com").is_ok());
    }
}
