use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::payment_handlers;
use crate::handlers::token_handlers;
use crate::state::AppState;

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        // GET /api/token - cached OAuth token and seconds to expiry
        .route("/token", get(token_handlers::token_status))
        // POST /api/payment - start a PhonePe checkout
        .route("/payment", post(payment_handlers::initiate_payment))
        // GET /api/redirect/:merchantOrderId - PhonePe sends the shopper here
        .route(
            "/redirect/:merchant_order_id",
            get(payment_handlers::payment_redirect),
        )
        // POST /api/callback - asynchronous PhonePe notifications
        .route("/callback", post(payment_handlers::payment_callback))
}
