//! # Pipeline-level Fallback
//!
//! Runs "select endpoint → load contracts → full computation" as one unit and loops
//! it across the ordered endpoint list. Nothing computed against endpoint N is reused
//! when endpoint N+1 is tried: the computation restarts from scratch.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! TryEndpoint(i) ──selector exhausted──────────────▶ Exhausted
//!        │
//!        ├─ computation Ok on endpoint j ──────────▶ Success
//!        └─ computation Err on endpoint j ─────────▶ TryEndpoint(j + 1)
//! ```

use anyhow::Result;
use log::{error, info, warn};
use std::future::Future;

use crate::rpc_pool::{select_endpoint, EndpointConnector, RpcConnection, SelectionError};

/// State of the fallback loop.
#[derive(Debug)]
pub enum FallbackState<T> {
    TryEndpoint(usize),
    Success(T),
    Exhausted { attempted: usize, last_error: String },
}

/// Errores del wrapper de fallback
#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("All {attempted} RPC endpoints failed the fork-risk pipeline (last error: {last_error})")]
    AllEndpointsFailed { attempted: usize, last_error: String },
}

impl FallbackError {
    pub fn attempted(&self) -> usize {
        match self {
            FallbackError::AllEndpointsFailed { attempted, .. } => *attempted,
        }
    }
}

/// Transition after one computation attempt on the endpoint at `index`.
pub fn next_state<T>(index: usize, total: usize, outcome: Result<T>) -> FallbackState<T> {
    match outcome {
        Ok(value) => FallbackState::Success(value),
        Err(e) if index + 1 >= total => FallbackState::Exhausted {
            attempted: total,
            last_error: format!("{:#}", e),
        },
        Err(_) => FallbackState::TryEndpoint(index + 1),
    }
}

/// Drives the state machine until success or exhaustion.
///
/// `compute` receives the connection by value; it owns everything it builds from it.
pub async fn run_with_fallback<C, T, F, Fut>(
    connector: &C,
    endpoints: &[String],
    mut compute: F,
) -> Result<T, FallbackError>
where
    C: EndpointConnector,
    F: FnMut(RpcConnection<C::Client>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = endpoints.len();
    let mut state = FallbackState::TryEndpoint(0);

    loop {
        state = match state {
            FallbackState::TryEndpoint(start) => {
                match select_endpoint(connector, endpoints, start).await {
                    Ok(connection) => {
                        let index = connection.index;
                        let endpoint = connection.endpoint.clone();
                        info!(
                            "[Pipeline] Running computation on endpoint {}/{} ({})",
                            index + 1,
                            total,
                            endpoint
                        );
                        let outcome = compute(connection).await;
                        if let Err(e) = &outcome {
                            warn!(
                                "❌ [Pipeline] Computation failed on {}, falling back: {:#}",
                                endpoint, e
                            );
                        }
                        next_state(index, total, outcome)
                    }
                    Err(SelectionError::Exhausted {
                        attempted,
                        last_error,
                    }) => FallbackState::Exhausted {
                        attempted,
                        last_error,
                    },
                }
            }
            FallbackState::Success(value) => return Ok(value),
            FallbackState::Exhausted {
                attempted,
                last_error,
            } => {
                error!(
                    "❌ [Pipeline] Exhausted all {} endpoints: {}",
                    attempted, last_error
                );
                return Err(FallbackError::AllEndpointsFailed {
                    attempted,
                    last_error,
                });
            }
        };
    }
}
