use std::sync::Arc;

use crate::services::payment_service::PaymentService;
use crate::services::token_manager::TokenManager;

#[derive(Clone)]
pub struct AppState {
    pub token_manager: TokenManager,
    pub payment_service: Arc<PaymentService>,
    pub environment: String,
}

impl AppState {
    pub fn new(token_manager: TokenManager, payment_service: PaymentService) -> Self {
        AppState {
            token_manager,
            payment_service: Arc::new(payment_service),
            environment: "sandbox".to_string(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }
}
