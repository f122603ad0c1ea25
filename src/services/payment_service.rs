// services/payment_service.rs
use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::payment::{
    to_major_units, to_minor_units, CallbackEvent, MerchantUrls, MetaInfo, PaymentFlow,
    PaymentForm, PaymentInitiated, PaymentRequest, PaymentState, StatusOutcome,
    DEFAULT_FLOW_MESSAGE, EXPIRE_AFTER_SECONDS, PAYMENT_FLOW_TYPE,
};
use crate::services::callback_verifier::CallbackVerifier;
use crate::services::phonepe_service::PaymentGateway;
use crate::services::token_manager::TokenManager;

const PAYMENT_FAILED_MESSAGE: &str = "An error occurred while processing your payment.";
const STATUS_FAILED_MESSAGE: &str = "Failed to fetch payment status.";
const UNEXPECTED_STATUS_MESSAGE: &str = "Unexpected response from payment gateway.";
/// PhonePe's limit for `merchantOrderId`.
const MAX_ORDER_ID_LEN: usize = 63;

/// Validates local requests, calls the gateway with the current token and
/// maps gateway answers to local outcomes.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    tokens: TokenManager,
    verifier: CallbackVerifier,
    config: AppConfig,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        tokens: TokenManager,
        verifier: CallbackVerifier,
        config: AppConfig,
    ) -> Self {
        PaymentService {
            gateway,
            tokens,
            verifier,
            config,
        }
    }

    pub async fn initiate_payment(&self, form: PaymentForm) -> Result<PaymentInitiated> {
        let missing = form.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::missing_parameter(missing.join(", ")));
        }

        let token = self.tokens.get_token().ok_or(AppError::AuthUnavailable)?;

        let merchant_order_id = Uuid::new_v4().simple().to_string();
        let amount = to_minor_units(form.amount.unwrap_or_default());
        let request = PaymentRequest {
            merchant_order_id: merchant_order_id.clone(),
            amount,
            expire_after: EXPIRE_AFTER_SECONDS,
            meta_info: MetaInfo {
                merchant_user_id: self.config.merchant_user_id.clone(),
                full_name: form.full_name(),
                mobile_number: form.mobile_number.clone().unwrap_or_default(),
                email: form.email.clone().unwrap_or_default(),
            },
            payment_flow: PaymentFlow {
                flow_type: PAYMENT_FLOW_TYPE.to_string(),
                message: form
                    .product_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FLOW_MESSAGE.to_string()),
                merchant_urls: MerchantUrls {
                    redirect_url: self.config.payment_redirect_url(&merchant_order_id),
                },
            },
        };

        match self.gateway.create_payment(&token, &request).await {
            Ok(response) => {
                info!(
                    "Payment {} created for {} paise (PhonePe order {:?}, state {:?})",
                    merchant_order_id, amount, response.order_id, response.state
                );
                Ok(PaymentInitiated {
                    success: true,
                    redirect_url: response.redirect_url,
                    merchant_order_id,
                })
            }
            Err(AppError::UpstreamError { message, payload }) => {
                error!("Payment error for {}: {}", merchant_order_id, message);
                Err(AppError::upstream(
                    PAYMENT_FAILED_MESSAGE,
                    payload.or(Some(Value::String(message))),
                ))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn query_status(&self, merchant_order_id: &str) -> Result<StatusOutcome> {
        let merchant_order_id = merchant_order_id.trim();
        if merchant_order_id.is_empty() {
            return Err(AppError::missing_parameter("merchantOrderId"));
        }
        if !is_valid_order_id(merchant_order_id) {
            warn!("Rejected malformed merchant order id {:?}", merchant_order_id);
            return Err(AppError::invalid_format(
                "merchantOrderId may only contain letters, digits, '_' and '-'.",
            ));
        }

        let token = self.tokens.get_token().ok_or(AppError::AuthUnavailable)?;

        let status = self
            .gateway
            .order_status(&token, merchant_order_id)
            .await
            .map_err(|e| {
                error!("Status error for {}: {}", merchant_order_id, e);
                AppError::upstream(STATUS_FAILED_MESSAGE, None)
            })?;

        match (status.state, status.amount) {
            (Some(PaymentState::Completed), Some(amount)) => {
                info!("Payment {} completed", merchant_order_id);
                let amount = to_major_units(amount).to_string();
                let redirect_url = self.frontend_url(
                    "success",
                    &[("merchantOrderId", merchant_order_id), ("amount", amount.as_str())],
                )?;
                Ok(StatusOutcome::Completed { redirect_url })
            }
            (Some(PaymentState::Failed), _) => {
                info!("Payment {} failed", merchant_order_id);
                let redirect_url =
                    self.frontend_url("failure", &[("merchantOrderId", merchant_order_id)])?;
                Ok(StatusOutcome::Failed { redirect_url })
            }
            (Some(PaymentState::Pending), _) => Ok(StatusOutcome::Pending),
            (state, amount) => {
                warn!(
                    "Unexpected status for {}: state={:?} amount={:?}",
                    merchant_order_id, state, amount
                );
                Err(AppError::upstream(UNEXPECTED_STATUS_MESSAGE, None))
            }
        }
    }

    /// Checks the callback's authorization header (when configured) and the
    /// presence of `event` and `payload`. Nothing is stored.
    pub fn receive_callback(&self, authorization: Option<&str>, body: Value) -> Result<CallbackEvent> {
        info!("Callback URL hit");
        self.verifier.verify(authorization).map_err(|e| {
            warn!("Rejected callback with a bad authorization header");
            e
        })?;

        let event = body.get("event").filter(|v| is_present(v));
        let payload = body.get("payload").filter(|v| is_present(v));

        let (Some(event), Some(payload)) = (event, payload) else {
            warn!("Invalid callback data format: {}", body);
            return Err(AppError::invalid_format(
                "'event' and 'payload' are required.",
            ));
        };

        let event = match event {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        };
        info!("Callback data received: event={} payload={}", event, payload);

        Ok(CallbackEvent {
            event,
            payload: payload.clone(),
        })
    }

    fn frontend_url(&self, page: &str, params: &[(&str, &str)]) -> Result<String> {
        let base = format!("{}/{}", self.config.frontend_url, page);
        Url::parse_with_params(&base, params)
            .map(String::from)
            .map_err(|e| AppError::ConfigMissing(format!("FRONTEND_URL is not a valid URL: {}", e)))
    }
}

fn is_valid_order_id(id: &str) -> bool {
    id.len() <= MAX_ORDER_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Null, false, zero and empty strings count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
