use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    middleware,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    auction::{bidding::BidOutcome, settlement::SettleOutcome},
    errors::HandlerError,
    middlewares::{require_user, UserId},
    models::{
        bid::{BidResponse, BidderEntry, BidderSort, PlaceBidRequest, UserBidEntry},
        listing::Listing,
        PlainSuccessResponse,
    },
    state::AppState,
};

use super::SweepResponse;

pub fn router() -> OpenApiRouter<Arc<AppState>> {
    let protected = OpenApiRouter::new()
        .routes(routes!(place_bid))
        .routes(routes!(get_auction_bidders))
        .routes(routes!(settle_auction))
        .routes(routes!(sweep_auctions))
        .routes(routes!(my_bids))
        .layer(middleware::from_fn(require_user));

    OpenApiRouter::new()
        .routes(routes!(get_auctions))
        .merge(protected)
}

/// Browse all auctions, running ones first.
#[utoipa::path(
    get,
    path = "/",
    tag = "Auction",
    responses(
        (status = OK, description = "Returns all auctions, active before sold", body = Vec<Listing>),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_auctions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Listing>>, HandlerError> {
    let auctions = state.listings.auctions().await?;
    Ok(Json(auctions))
}

/// Place a bid on an auction.
#[utoipa::path(
    post,
    path = "/{auctionId}/bids",
    tag = "Auction",
    params(
        ("auctionId" = String, Path, description = "Auction to bid on"),
    ),
    request_body = PlaceBidRequest,
    responses(
        (status = OK, description = "Bid accepted", body = BidResponse),
        (status = BAD_REQUEST, description = "Bid rejected", body = BidResponse),
        (status = FORBIDDEN, description = "Own-auction bid rejected", body = BidResponse),
        (status = NOT_FOUND, description = "Auction not found", body = BidResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn place_bid(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<String>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<Response, HandlerError> {
    let outcome = state
        .bidding
        .place_bid(&auction_id, &user.0, payload.amount)
        .await?;

    match outcome {
        BidOutcome::Accepted {
            new_current_bid,
            bid_count,
        } => Ok(Json(BidResponse {
            success: true,
            new_current_bid: Some(new_current_bid),
            bid_count: Some(bid_count),
            error_reason: None,
        })
        .into_response()),
        BidOutcome::Rejected(rejection) => Ok((
            rejection.status(),
            Json(BidResponse {
                success: false,
                new_current_bid: None,
                bid_count: None,
                error_reason: Some(rejection.reason()),
            }),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BiddersQuery {
    sort_by: Option<BidderSort>,
}

/// List everyone who bid on an auction, for the artist.
#[utoipa::path(
    get,
    path = "/{auctionId}/bidders",
    tag = "Auction",
    params(
        ("auctionId" = String, Path, description = "Auction to inspect"),
        ("sortBy" = Option<String>, Query, description = "amount (highest first) or latest (default)"),
    ),
    responses(
        (status = OK, description = "Bidders with their standing", body = Vec<BidderEntry>),
        (status = FORBIDDEN, description = "Not the auction's artist", body = HandlerError),
        (status = NOT_FOUND, description = "Auction not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn get_auction_bidders(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<String>,
    Query(query): Query<BiddersQuery>,
) -> Result<Json<Vec<BidderEntry>>, HandlerError> {
    let listing = state
        .listings
        .find(&auction_id)
        .await?
        .ok_or(HandlerError::not_found())?;
    if listing.artist_id != user.0 {
        return Err(HandlerError::forbidden(
            "You can only view bidders on your own auctions",
        ));
    }

    let bidders = state
        .bidding
        .bidders(&auction_id, query.sort_by.unwrap_or_default())
        .await?;
    Ok(Json(bidders))
}

/// Settle an auction on demand, without waiting for the sweep.
#[utoipa::path(
    post,
    path = "/{auctionId}/settle",
    tag = "Auction",
    params(
        ("auctionId" = String, Path, description = "Auction to settle"),
    ),
    responses(
        (status = OK, description = "Settlement outcome", body = PlainSuccessResponse),
        (status = FORBIDDEN, description = "Not the auction's artist", body = HandlerError),
        (status = NOT_FOUND, description = "Auction not found", body = HandlerError),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn settle_auction(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<String>,
) -> Result<PlainSuccessResponse, HandlerError> {
    let listing = state
        .listings
        .find(&auction_id)
        .await?
        .ok_or(HandlerError::not_found())?;
    if listing.artist_id != user.0 {
        return Err(HandlerError::forbidden("You can only end your own auctions"));
    }

    let message = match state.settlement.settle(&auction_id).await? {
        SettleOutcome::NotFound => return Err(HandlerError::not_found()),
        SettleOutcome::Settled { .. } => "Auction settled",
        SettleOutcome::NoBids => "Auction ended with no bids",
        SettleOutcome::AlreadySettled | SettleOutcome::RaceLost => "Auction already settled",
    };
    Ok(PlainSuccessResponse::ok(message))
}

/// Settle every auction whose end time has passed. Idempotent; the scheduler
/// runs the same sweep on a timer.
#[utoipa::path(
    post,
    path = "/sweep",
    tag = "Auction",
    responses(
        (status = OK, description = "Number of auctions processed", body = SweepResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn sweep_auctions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepResponse>, HandlerError> {
    let processed = state.settlement.sweep_ended().await?;
    Ok(Json(SweepResponse { processed }))
}

/// The caller's bidding history, latest first.
#[utoipa::path(
    get,
    path = "/my-bids",
    tag = "Auction",
    responses(
        (status = OK, description = "Caller's bids joined with listing details", body = Vec<UserBidEntry>),
        (status = INTERNAL_SERVER_ERROR, description = "Handler errors", body = HandlerError),
    ),
)]
async fn my_bids(
    Extension(user): Extension<UserId>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserBidEntry>>, HandlerError> {
    let bids = state.bidding.user_bids(&user.0).await?;
    Ok(Json(bids))
}
