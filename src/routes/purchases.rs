use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    middleware, Extension,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    errors::HandlerError,
    middlewares::{require_user, UserId},
    models::{purchase::PurchaseView, PlainSuccessResponse},
    state::AppState,
};

use super::SweepResponse;

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    OpenApiRouter::new()
        .routes(routes!(my_purchases))
        .routes(routes!(complete_payment))
        .routes(routes!(sweep_expired_payments))
        .layer(middleware::from_fn(require_user))
}

/// The caller's purchases, latest first.
#[utoipa::path(
    get,
    path = "/",
    tag = "Purchase",
    responses(
        (status = OK, description = "Caller's purchases", body = Vec<PurchaseView>),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn my_purchases(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PurchaseView>>, HandlerError> {
    let purchases = state.purchases.by_buyer(&user.0).await?;
    Ok(Json(purchases))
}

/// Buyer asserts payment of an auction win before the deadline.
#[utoipa::path(
    post,
    path = "/{purchaseId}/complete",
    tag = "Purchase",
    params(
        ("purchaseId" = String, Path, description = "Purchase to complete"),
    ),
    responses(
        (status = OK, description = "Payment recorded", body = PlainSuccessResponse),
        (status = CONFLICT, description = "Payment window closed", body = HandlerError),
        (status = FORBIDDEN, description = "Not the purchase's buyer", body = HandlerError),
        (status = NOT_FOUND, description = "Purchase not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn complete_payment(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(purchase_id): Path<String>,
) -> Result<PlainSuccessResponse, HandlerError> {
    state.purchases.complete_payment(&purchase_id, &user.0).await?;
    Ok(PlainSuccessResponse::ok("Payment completed"))
}

/// Expire pending payments past their deadline and release their listings.
/// Idempotent; the scheduler runs the same sweep on a timer.
#[utoipa::path(
    post,
    path = "/sweep-expired",
    tag = "Purchase",
    responses(
        (status = OK, description = "Number of purchases expired", body = SweepResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn sweep_expired_payments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepResponse>, HandlerError> {
    let processed = state.expiry.sweep().await?;
    Ok(Json(SweepResponse { processed }))
}
