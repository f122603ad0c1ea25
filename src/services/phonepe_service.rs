// services/phonepe_service.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info};

use crate::config::{AppConfig, PhonePeUrls};
use crate::errors::{AppError, Result};
use crate::models::payment::{CreatePaymentResponse, OrderStatusResponse, PaymentRequest};
use crate::models::token::AuthResponse;
use crate::services::token_manager::TokenSource;

/// Bound for every upstream call, the OAuth exchange included.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// The two authenticated PhonePe checkout calls.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        token: &str,
        request: &PaymentRequest,
    ) -> Result<CreatePaymentResponse>;

    async fn order_status(&self, token: &str, merchant_order_id: &str) -> Result<OrderStatusResponse>;
}

#[derive(Debug, Clone)]
pub struct PhonePeService {
    config: AppConfig,
    urls: PhonePeUrls,
    client: Client,
}

impl PhonePeService {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpClientError(e.to_string()))?;

        Ok(PhonePeService {
            urls: config.phonepe_urls(),
            config,
            client,
        })
    }

    fn credential_form(&self) -> Result<[(&'static str, String); 4]> {
        let missing = self.config.missing_credentials();
        if !missing.is_empty() {
            return Err(AppError::ConfigMissing(missing.join(", ")));
        }

        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        Ok([
            ("client_id", value(&self.config.client_id)),
            ("client_secret", value(&self.config.client_secret)),
            ("client_version", value(&self.config.client_version)),
            ("grant_type", value(&self.config.grant_type)),
        ])
    }
}

fn authorization(token: &str) -> String {
    format!("O-Bearer {}", token)
}

/// Turns a non-2xx response into an `UpstreamError` carrying the body, and
/// parses a 2xx body as `T`.
async fn read_response<T: DeserializeOwned>(response: Response, operation: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        error!("{} failed: {} - {}", operation, status, body);
        let payload = serde_json::from_str::<Value>(&body)
            .unwrap_or_else(|_| Value::String(body.clone()));
        return Err(AppError::upstream(
            format!("{} failed: {}", operation, status),
            Some(payload),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        error!("{} returned an unexpected body: {} - {}", operation, e, body);
        AppError::upstream(format!("{} returned an unexpected body", operation), None)
    })
}

#[async_trait]
impl TokenSource for PhonePeService {
    async fn request_token(&self) -> Result<AuthResponse> {
        let form = self.credential_form()?;

        info!("Requesting OAuth token from {}", self.urls.auth_url);
        let response = self
            .client
            .post(&self.urls.auth_url)
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .timeout(UPSTREAM_TIMEOUT)
            .send()
            .await?;

        info!("OAuth response received: {}", response.status());
        read_response(response, "PhonePe OAuth").await
    }
}

#[async_trait]
impl PaymentGateway for PhonePeService {
    async fn create_payment(
        &self,
        token: &str,
        request: &PaymentRequest,
    ) -> Result<CreatePaymentResponse> {
        info!(
            "Creating PhonePe payment {} for {} paise",
            request.merchant_order_id, request.amount
        );

        let response = self
            .client
            .post(&self.urls.pay_url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, authorization(token))
            .json(request)
            .send()
            .await?;

        read_response(response, "PhonePe create payment").await
    }

    async fn order_status(&self, token: &str, merchant_order_id: &str) -> Result<OrderStatusResponse> {
        info!("Fetching PhonePe order status for {}", merchant_order_id);

        let url = self
            .urls
            .status_url(merchant_order_id)
            .ok_or_else(|| AppError::upstream("PhonePe status URL could not be built", None))?;

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, authorization(token))
            .send()
            .await?;

        read_response(response, "PhonePe order status").await
    }
}
