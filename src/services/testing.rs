//! Test doubles for the token and gateway seams.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::models::payment::{
    CreatePaymentResponse, OrderStatusResponse, PaymentRequest, PaymentState,
};
use crate::models::token::AuthResponse;
use crate::services::phonepe_service::PaymentGateway;
use crate::services::token_manager::{Clock, TokenSource};

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        ManualClock(AtomicI64::new(now_millis))
    }

    pub fn set(&self, now_millis: i64) {
        self.0.store(now_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub enum TokenScript {
    Token { access_token: String, expires_at: i64 },
    Malformed,
    Fail,
}

impl TokenScript {
    pub fn token(access_token: &str, expires_at: i64) -> Self {
        TokenScript::Token {
            access_token: access_token.to_string(),
            expires_at,
        }
    }
}

pub struct ScriptedTokenSource {
    script: Mutex<TokenScript>,
    calls: AtomicUsize,
}

impl ScriptedTokenSource {
    pub fn new(script: TokenScript) -> Self {
        ScriptedTokenSource {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, script: TokenScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for ScriptedTokenSource {
    async fn request_token(&self) -> Result<AuthResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().clone() {
            TokenScript::Token {
                access_token,
                expires_at,
            } => Ok(AuthResponse {
                access_token: Some(access_token),
                expires_at: Some(expires_at),
            }),
            TokenScript::Malformed => Ok(AuthResponse::default()),
            TokenScript::Fail => Err(AppError::upstream("connection refused", None)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatusScript {
    Status(OrderStatusResponse),
    Fail,
}

impl StatusScript {
    pub fn state(state: Option<PaymentState>, amount: i64) -> Self {
        StatusScript::Status(OrderStatusResponse {
            state,
            amount: Some(amount),
        })
    }
}

/// Records every call and answers from a script.
pub struct FakeGateway {
    pub payments: Mutex<Vec<(String, PaymentRequest)>>,
    pub status_calls: Mutex<Vec<(String, String)>>,
    fail_payments: AtomicBool,
    status: Mutex<StatusScript>,
}

impl FakeGateway {
    pub fn new() -> Self {
        FakeGateway {
            payments: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            fail_payments: AtomicBool::new(false),
            status: Mutex::new(StatusScript::state(Some(PaymentState::Pending), 0)),
        }
    }

    pub fn fail_payments(&self) {
        self.fail_payments.store(true, Ordering::SeqCst);
    }

    pub fn set_status(&self, script: StatusScript) {
        *self.status.lock().unwrap() = script;
    }

    pub fn call_count(&self) -> usize {
        self.payments.lock().unwrap().len() + self.status_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment(
        &self,
        token: &str,
        request: &PaymentRequest,
    ) -> Result<CreatePaymentResponse> {
        self.payments
            .lock()
            .unwrap()
            .push((token.to_string(), request.clone()));

        if self.fail_payments.load(Ordering::SeqCst) {
            return Err(AppError::upstream(
                "PhonePe create payment failed: 400 Bad Request",
                Some(json!({ "code": "BAD_REQUEST", "message": "Invalid amount" })),
            ));
        }

        Ok(CreatePaymentResponse {
            order_id: Some("OMO123".to_string()),
            state: Some("PENDING".to_string()),
            redirect_url: Some(format!(
                "https://mercury-uat.phonepe.com/transact/uat_v2?token={}",
                request.merchant_order_id
            )),
        })
    }

    async fn order_status(&self, token: &str, merchant_order_id: &str) -> Result<OrderStatusResponse> {
        self.status_calls
            .lock()
            .unwrap()
            .push((token.to_string(), merchant_order_id.to_string()));

        match self.status.lock().unwrap().clone() {
            StatusScript::Status(status) => Ok(status),
            StatusScript::Fail => Err(AppError::upstream("timed out", None)),
        }
    }
}
