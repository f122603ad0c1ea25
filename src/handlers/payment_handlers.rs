// handlers/payment_handlers.rs
use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;

use crate::errors::{AppError, Result};
use crate::models::payment::{PaymentForm, PaymentInitiated, StatusOutcome};
use crate::state::AppState;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Reads a JSON body, or a urlencoded one when the client says so.
async fn json_or_form<T: DeserializeOwned>(request: Request) -> Result<T> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.starts_with(FORM_CONTENT_TYPE));

    if is_form {
        let Form(body) = Form::<T>::from_request(request, &())
            .await
            .map_err(|e| AppError::invalid_format(e.body_text()))?;
        Ok(body)
    } else {
        let Json(body) = Json::<T>::from_request(request, &())
            .await
            .map_err(|e| AppError::invalid_format(e.body_text()))?;
        Ok(body)
    }
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<PaymentInitiated>> {
    let form: PaymentForm = json_or_form(request).await?;
    info!("Received payment request");

    let initiated = state.payment_service.initiate_payment(form).await?;
    Ok(Json(initiated))
}

/// Where PhonePe sends the shopper back after checkout. Resolves the order
/// state and forwards the browser to the frontend.
pub async fn payment_redirect(
    State(state): State<AppState>,
    Path(merchant_order_id): Path<String>,
) -> Result<Response> {
    let response = match state.payment_service.query_status(&merchant_order_id).await? {
        StatusOutcome::Completed { redirect_url } | StatusOutcome::Failed { redirect_url } => {
            (StatusCode::FOUND, [(header::LOCATION, redirect_url)]).into_response()
        }
        StatusOutcome::Pending => (
            StatusCode::OK,
            Json(json!({
                "status": "pending",
                "message": "Payment is still pending. Please try again later.",
            })),
        )
            .into_response(),
    };
    Ok(response)
}

pub async fn payment_callback(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body: Value = json_or_form(request).await?;

    state
        .payment_service
        .receive_callback(authorization.as_deref(), body)?;

    Ok(Json(json!({
        "message": "Callback data received successfully"
    })))
}
