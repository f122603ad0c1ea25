// config.rs
use std::env;

use reqwest::Url;
use serde_json::json;

const DEFAULT_PORT: u16 = 5000;
const SANDBOX_BASE_URL: &str = "https://api-preprod.phonepe.com/apis/pg-sandbox";
const PRODUCTION_AUTH_BASE_URL: &str = "https://api.phonepe.com/apis/identity-manager";
const PRODUCTION_PG_BASE_URL: &str = "https://api.phonepe.com/apis/pg";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub client_version: Option<String>,
    pub grant_type: Option<String>,
    pub phonepe_environment: String,
    pub backend_url: String,
    pub frontend_url: String,
    pub merchant_user_id: String,
    pub callback_username: Option<String>,
    pub callback_password: Option<String>,
    pub port: u16,
    pub host: String,
}

/// Upstream endpoints for the selected PhonePe environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonePeUrls {
    pub auth_url: String,
    pub pay_url: String,
    pub status_base_url: String,
}

impl PhonePeUrls {
    /// The order id is pushed as a single percent-encoded path segment.
    pub fn status_url(&self, merchant_order_id: &str) -> Option<Url> {
        let mut url = Url::parse(&self.status_base_url).ok()?;
        url.path_segments_mut()
            .ok()?
            .push(merchant_order_id)
            .push("status");
        Some(url)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("PORT '{}' is not a valid port, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        AppConfig {
            client_id: get("CLIENT_ID"),
            client_secret: get("CLIENT_SECRET"),
            client_version: get("CLIENT_VERSION"),
            grant_type: get("GRANT_TYPE"),
            phonepe_environment: get("PHONEPE_ENVIRONMENT")
                .unwrap_or_else(|| "sandbox".to_string()),
            backend_url: get("REDIRECT_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", DEFAULT_PORT)),
            frontend_url: get("FRONTEND_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            merchant_user_id: get("MERCHANT_USER_ID").unwrap_or_else(|| "MUID2345".to_string()),
            callback_username: get("CALLBACK_USERNAME"),
            callback_password: get("CALLBACK_PASSWORD"),
            port,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        }
    }

    /// Names of the OAuth secrets that are not set.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("CLIENT_ID", &self.client_id),
            ("CLIENT_SECRET", &self.client_secret),
            ("CLIENT_VERSION", &self.client_version),
            ("GRANT_TYPE", &self.grant_type),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_production(&self) -> bool {
        self.phonepe_environment == "production"
    }

    pub fn phonepe_urls(&self) -> PhonePeUrls {
        let (auth_base, pg_base) = if self.is_production() {
            (PRODUCTION_AUTH_BASE_URL, PRODUCTION_PG_BASE_URL)
        } else {
            (SANDBOX_BASE_URL, SANDBOX_BASE_URL)
        };

        PhonePeUrls {
            auth_url: format!("{}/v1/oauth/token", auth_base),
            pay_url: format!("{}/checkout/v2/pay", pg_base),
            status_base_url: format!("{}/checkout/v2/order", pg_base),
        }
    }

    pub fn payment_redirect_url(&self, merchant_order_id: &str) -> String {
        format!("{}/api/redirect/{}", self.backend_url, merchant_order_id)
    }

    pub fn callback_verification_enabled(&self) -> bool {
        self.callback_username.is_some() && self.callback_password.is_some()
    }

    pub fn config_info(&self) -> serde_json::Value {
        json!({
            "environment": self.phonepe_environment,
            "is_production": self.is_production(),
            "backend_url": self.backend_url,
            "frontend_url": self.frontend_url,
            "client_id_set": self.client_id.is_some(),
            "client_secret_set": self.client_secret.is_some(),
            "client_version_set": self.client_version.is_some(),
            "grant_type_set": self.grant_type.is_some(),
            "callback_verification": self.callback_verification_enabled(),
            "port": self.port,
            "host": self.host,
        })
    }
}
