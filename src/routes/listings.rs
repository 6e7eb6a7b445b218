use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    middleware, Extension,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    errors::HandlerError,
    identity::display_label,
    middlewares::{require_user, UserId},
    models::{
        listing::{AddListingRequest, Listing, ListingStatus, SaleType, UpdateListingRequest},
        purchase::{Purchase, PurchaseStatus, PurchaseView},
        PlainSuccessResponse,
    },
    notify::notify_best_effort,
    state::AppState,
};

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    let protected = OpenApiRouter::new()
        .routes(routes!(add_listing))
        .routes(routes!(update_listing, delete_listing))
        .routes(routes!(purchase_listing))
        .layer(middleware::from_fn(require_user));

    OpenApiRouter::new()
        .routes(routes!(get_listing))
        .merge(protected)
}

/// Create a listing under the calling artist.
#[utoipa::path(
    put,
    path = "/",
    tag = "Listing",
    request_body = AddListingRequest,
    responses(
        (status = OK, description = "Listing created", body = Listing),
        (status = BAD_REQUEST, description = "Missing price, starting bid or end time", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn add_listing(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddListingRequest>,
) -> Result<Json<Listing>, HandlerError> {
    let artist_name = display_label(state.identity.as_ref(), &user.0).await;
    let listing = state
        .listings
        .create(&user.0, Some(artist_name), payload)
        .await?;
    Ok(Json(listing))
}

/// Get a listing by id.
#[utoipa::path(
    get,
    path = "/{listingId}",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing to get"),
    ),
    responses(
        (status = OK, description = "Returns the listing", body = Listing),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
) -> Result<Json<Listing>, HandlerError> {
    let listing = state
        .listings
        .find(&listing_id)
        .await?
        .ok_or(HandlerError::not_found())?;
    Ok(Json(listing))
}

/// Update a draft or inactive listing.
#[utoipa::path(
    post,
    path = "/{listingId}",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing to update"),
    ),
    request_body = UpdateListingRequest,
    responses(
        (status = OK, description = "Listing updated", body = PlainSuccessResponse),
        (status = BAD_REQUEST, description = "Listing is live or request empty", body = HandlerError),
        (status = FORBIDDEN, description = "Not the listing's artist", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn update_listing(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<PlainSuccessResponse, HandlerError> {
    state.listings.update(&listing_id, &user.0, payload).await?;
    Ok(PlainSuccessResponse::ok("Listing updated"))
}

/// Delete a draft or inactive listing.
#[utoipa::path(
    delete,
    path = "/{listingId}",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing to delete"),
    ),
    responses(
        (status = OK, description = "Listing deleted", body = PlainSuccessResponse),
        (status = BAD_REQUEST, description = "Listing is live", body = HandlerError),
        (status = FORBIDDEN, description = "Not the listing's artist", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn delete_listing(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
) -> Result<PlainSuccessResponse, HandlerError> {
    state.listings.delete(&listing_id, &user.0).await?;
    Ok(PlainSuccessResponse::ok("Listing deleted"))
}

/// Buy a fixed-price listing outright. Races against other buyers and a
/// concurrent settlement resolve through the sale finalizer: at most one
/// caller ever sees success.
#[utoipa::path(
    post,
    path = "/{listingId}/purchase",
    tag = "Listing",
    params(
        ("listingId" = String, Path, description = "Listing to purchase"),
    ),
    responses(
        (status = OK, description = "Purchase recorded", body = PurchaseView),
        (status = BAD_REQUEST, description = "Not purchasable", body = HandlerError),
        (status = CONFLICT, description = "Already sold", body = HandlerError),
        (status = FORBIDDEN, description = "Own listing", body = HandlerError),
        (status = NOT_FOUND, description = "Listing not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn purchase_listing(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
) -> Result<Json<PurchaseView>, HandlerError> {
    let listing = state
        .listings
        .find(&listing_id)
        .await?
        .ok_or(HandlerError::not_found())?;
    if listing.artist_id == user.0 {
        return Err(HandlerError::forbidden(
            "You cannot purchase your own artwork",
        ));
    }
    if listing.sale_type == SaleType::Auction {
        return Err(HandlerError::bad_request(
            "Auction listings are sold through bidding",
        ));
    }
    match listing.status {
        ListingStatus::Active => {}
        ListingStatus::Sold => {
            return Err(HandlerError::conflict("Artwork already sold, please refresh"));
        }
        _ => return Err(HandlerError::bad_request("Listing is not active")),
    }
    let price = listing
        .price
        .ok_or_else(|| HandlerError::bad_request("Listing has no price"))?;

    if !state.finalizer.mark_sold(&listing_id).await? {
        return Err(HandlerError::conflict("Artwork already sold, please refresh"));
    }

    let now = state.clock.now_millis();
    let purchase = Purchase {
        artwork_id: listing_id.clone(),
        buyer_id: user.0.clone(),
        seller_id: listing.artist_id.clone(),
        price,
        status: PurchaseStatus::Completed,
        payment_method: Some("DIRECT".to_string()),
        transaction_id: Some(format!("DIRECT_{}_{}", listing_id, now)),
        notes: None,
        payment_deadline: None,
        payment_expired: false,
        paid_at: Some(now),
        created_at: now,
    };
    let purchase_id = state.purchases.create(&purchase).await?;

    notify_best_effort(
        state.notifier.as_ref(),
        &user.0,
        &listing_id,
        "Thank you for your purchase! Your receipt and purchase details are now available.",
    )
    .await;
    notify_best_effort(
        state.notifier.as_ref(),
        &listing.artist_id,
        &listing_id,
        "Your artwork has been sold. View the purchase details in your dashboard.",
    )
    .await;

    Ok(Json(PurchaseView {
        purchase_id,
        purchase,
    }))
}
