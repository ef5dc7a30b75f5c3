use axum::{extract::State, Json};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::{AppError, AppErrorKind, AppResult, InfrastructureError};
use crate::payments::amount::to_minor_units;
use crate::payments::methods::{find as find_method, PaymentMethod};
use crate::payments::types::{
    ApiResponse, CreatePayment, InquiryData, PayData, PayRequest, PaymentRecord,
    PaymentRequestRef, PaymentStatus, StatusUpdate,
};

/// Page the gateway sends the buyer back to, carrying `paymentRequestId`.
pub fn return_url(base: &str, payment_request_id: &str) -> AppResult<String> {
    let mut url = reqwest::Url::parse(base).map_err(|e| {
        AppError::new(AppErrorKind::Infrastructure(
            InfrastructureError::Configuration {
                message: format!("invalid redirect url {}: {}", base, e),
            },
        ))
    })?;
    url.query_pairs_mut()
        .append_pair("paymentRequestId", payment_request_id);
    Ok(url.into())
}

fn required_id(request: &PaymentRequestRef) -> AppResult<&str> {
    let id = request.payment_request_id.trim();
    if id.is_empty() {
        return Err(AppError::missing_field("paymentRequestId"));
    }
    Ok(id)
}

/// `POST /payment/pay`
pub async fn pay(
    State(state): State<AppState>,
    Json(request): Json<PayRequest>,
) -> AppResult<Json<ApiResponse<PayData>>> {
    let method = request.payment_method_type.trim();
    if method.is_empty() {
        return Err(AppError::missing_field("paymentMethodType"));
    }
    if find_method(&state.catalogue, method).is_none() {
        return Err(AppError::unsupported_method(method));
    }
    if request.currency.trim().is_empty() {
        return Err(AppError::missing_field("currency"));
    }

    let currency = request.currency.trim().to_ascii_uppercase();
    let amount_minor = to_minor_units(&request.amount_value, &currency)?;
    let payment_request_id = Uuid::new_v4().to_string();
    let redirect_url = return_url(&state.checkout.redirect_url, &payment_request_id)?;

    let created = state
        .gateway
        .create_payment(CreatePayment {
            payment_request_id: payment_request_id.clone(),
            reference_order_id: Uuid::new_v4().to_string(),
            amount_minor,
            currency: currency.clone(),
            payment_method_type: method.to_string(),
            terminal_type: request.terminal_type.clone(),
            os_type: request.os_type.clone(),
            order_description: state.checkout.order_description.clone(),
            buyer_id: state.checkout.buyer_id.clone(),
            notify_url: state.checkout.notify_url.clone(),
            redirect_url,
        })
        .await
        .map_err(|e| AppError::from(e).for_payment(&payment_request_id))?;

    let now = Utc::now();
    let inserted = state
        .store
        .insert(&PaymentRecord {
            payment_request_id: payment_request_id.clone(),
            amount_minor,
            currency: currency.clone(),
            payment_method_type: Some(method.to_string()),
            status: PaymentStatus::Processing,
            result_code: Some(created.result_code.clone()),
            redirect_url: Some(created.normal_url.clone()),
            created_at: now,
            updated_at: now,
        })
        .await;

    // A notification or inquiry may have recorded the request first
    match inserted {
        Ok(_) => {}
        Err(e) if e.is_constraint_violation() => {
            warn!(
                "Payment {} was recorded before creation finished, keeping stored status",
                payment_request_id
            );
        }
        Err(e) => return Err(AppError::from(e).for_payment(&payment_request_id)),
    }

    info!(
        "Created payment {}: {} {} via {}",
        payment_request_id, request.amount_value, currency, method
    );

    Ok(Json(ApiResponse::success(
        payment_request_id,
        PayData {
            normal_url: created.normal_url,
        },
    )))
}

/// `POST /payment/inquiryPayment`
pub async fn inquiry_payment(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequestRef>,
) -> AppResult<Json<ApiResponse<InquiryData>>> {
    let id = required_id(&request)?;

    let inquiry = state
        .gateway
        .inquire_payment(id)
        .await
        .map_err(|e| AppError::from(e).for_payment(id))?;

    if inquiry.status.is_storable() {
        let mut update = StatusUpdate::new(id, inquiry.status);
        update.result_code = inquiry.result_code.clone();
        // Store failures are logged only; the gateway answer is still returned
        if let Err(e) = state.store.apply_status(&update).await {
            warn!("Failed to record status {} for {}: {}", inquiry.status, id, e);
        }
    }

    Ok(Json(ApiResponse::success(
        id,
        InquiryData {
            payment_status: inquiry.status,
        },
    )))
}

/// `POST /payment/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequestRef>,
) -> AppResult<Json<ApiResponse<InquiryData>>> {
    let id = required_id(&request)?;

    state
        .gateway
        .cancel_payment(id)
        .await
        .map_err(|e| AppError::from(e).for_payment(id))?;

    state
        .store
        .apply_status(&StatusUpdate::new(id, PaymentStatus::Cancelled))
        .await
        .map_err(|e| AppError::from(e).for_payment(id))?;

    info!("Cancelled payment {}", id);

    Ok(Json(ApiResponse::success(
        id,
        InquiryData {
            payment_status: PaymentStatus::Cancelled,
        },
    )))
}

/// `GET /payment/methods`
pub async fn methods(State(state): State<AppState>) -> Json<Vec<PaymentMethod>> {
    Json(state.catalogue.as_ref().clone())
}
