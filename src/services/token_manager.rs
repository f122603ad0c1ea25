// services/token_manager.rs
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::{AppError, Result};
use crate::models::token::{AuthResponse, Credential, TokenStatus};

/// How often the refresh task wakes up.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// A token this close to expiry is refreshed on the next tick.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(5 * 60);

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Performs the OAuth credential exchange.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn request_token(&self) -> Result<AuthResponse>;
}

/// Owns the OAuth credential used for every gateway call.
///
/// Clones share the same credential. Writers replace the whole value, so a
/// reader sees either the previous or the new credential.
#[derive(Clone)]
pub struct TokenManager {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    credential: Arc<RwLock<Credential>>,
}

impl TokenManager {
    pub fn new(source: Arc<dyn TokenSource>, clock: Arc<dyn Clock>) -> Self {
        TokenManager {
            source,
            clock,
            credential: Arc::new(RwLock::new(Credential::default())),
        }
    }

    /// Exchanges the configured secrets for a new token.
    ///
    /// On any failure the current credential is left as it is and the error
    /// is logged; the returned error is informational only.
    pub async fn fetch_token(&self) -> Result<()> {
        info!("🔄 Attempting to fetch OAuth token...");

        let response = match self.source.request_token().await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ OAuth token fetch failed: {}", e);
                return Err(e);
            }
        };

        let (token, expires_at) = match (response.access_token, response.expires_at) {
            (Some(token), Some(expires_at)) if !token.is_empty() => (token, expires_at),
            _ => {
                error!("❌ Invalid OAuth response format: missing access_token or expires_at");
                return Err(AppError::upstream(
                    "OAuth response missing access_token or expires_at",
                    None,
                ));
            }
        };

        let expiry_millis = expires_at.saturating_mul(1000);
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Credential::new(token, expiry_millis);

        match DateTime::<Utc>::from_timestamp_millis(expiry_millis) {
            Some(expiry) => info!("✅ Token fetched successfully, expires at {}", expiry.to_rfc3339()),
            None => info!("✅ Token fetched successfully, expires at {}ms", expiry_millis),
        }
        Ok(())
    }

    /// The current token, or `None` when absent or expired.
    pub fn get_token(&self) -> Option<String> {
        let now = self.clock.now_millis();
        let token = self.snapshot().usable_token(now).map(str::to_string);
        if token.is_none() {
            warn!("⚠️ Token is not available or expired");
        }
        token
    }

    pub fn token_status(&self) -> Option<TokenStatus> {
        let now = self.clock.now_millis();
        let credential = self.snapshot();
        let token = credential.usable_token(now)?;
        let expiry = credential.expiry_timestamp_millis?;

        Some(TokenStatus {
            access_token: token.to_string(),
            expires_in: (expiry - now) / 1000,
        })
    }

    pub fn needs_refresh(&self) -> bool {
        self.snapshot()
            .needs_refresh(self.clock.now_millis(), REFRESH_WINDOW.as_millis() as i64)
    }

    pub fn snapshot(&self) -> Credential {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetches once immediately, then checks every [`REFRESH_INTERVAL`] and
    /// refetches when the credential is absent or inside [`REFRESH_WINDOW`].
    /// Runs until `shutdown` is cancelled.
    pub fn spawn_refresh_task(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let manager = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Token refresh task stopped before the first fetch");
                    return;
                }
                _ = manager.fetch_token() => {}
            }

            let mut ticker =
                tokio::time::interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        info!("Token refresh task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if manager.needs_refresh() {
                            info!("🔄 Token refresh triggered");
                            // failures are logged by fetch_token
                            let _ = manager.fetch_token().await;
                        }
                    }
                }
            }
        })
    }
}
