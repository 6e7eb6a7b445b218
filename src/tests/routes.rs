use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use crate::{
    create_service,
    models::{
        bid::{BidResponse, BidderEntry, PlaceBidRequest},
        listing::ListingStatus,
        purchase::PurchaseView,
    },
    routes::SweepResponse,
};

use super::*;

#[tokio::test]
async fn test_oneshot() -> Result<(), Error> {
    let (state, _) = test_state();
    let service = create_service(state);
    let request = Request::builder().uri("/v1/").body(Body::empty())?;

    let response = service.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn place_bid_over_http() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    let service = create_service(state.clone());
    let req = build_request(
        "POST",
        "/v1/auctions/a1/bids",
        "alice",
        Some(PlaceBidRequest { amount: 15_000 }),
    )?;
    let resp = service.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: BidResponse = parse_resp(resp).await?;
    assert!(body.success);
    assert_eq!(body.new_current_bid, Some(15_000));
    assert_eq!(body.bid_count, Some(1));

    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.current_bid, Some(15_000));
    Ok(())
}

#[tokio::test]
async fn place_bid_requires_identity() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    let service = create_service(state);
    let req = Request::builder()
        .method("POST")
        .uri("/v1/auctions/a1/bids")
        .header("Content-Type", "application/json")
        .body(Body::new(serde_json::to_string(&PlaceBidRequest {
            amount: 15_000,
        })?))?;
    let resp = service.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn rejected_bid_reports_reason() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    state.bidding.place_bid("a1", "alice", 15_000).await?;

    let service = create_service(state);
    let req = build_request(
        "POST",
        "/v1/auctions/a1/bids",
        "bob",
        Some(PlaceBidRequest { amount: 15_000 }),
    )?;
    let resp = service.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: BidResponse = parse_resp(resp).await?;
    assert!(!body.success);
    assert!(body
        .error_reason
        .as_deref()
        .is_some_and(|r| r.contains("higher than the current bid")));
    Ok(())
}

#[tokio::test]
async fn bidders_endpoint_is_artist_only() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    state.bidding.place_bid("a1", "alice", 15_000).await?;
    state.bidding.place_bid("a1", "bob", 20_000).await?;

    let service = create_service(state.clone());
    let req = build_request::<()>("GET", "/v1/auctions/a1/bidders?sortBy=amount", "artist", None)?;
    let resp = service.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let bidders: Vec<BidderEntry> = parse_resp(resp).await?;
    assert_eq!(bidders.len(), 2);
    assert_eq!(bidders[0].bidder_id, "bob");

    let service = create_service(state);
    let req = build_request::<()>("GET", "/v1/auctions/a1/bidders", "alice", None)?;
    let resp = service.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn direct_purchase_over_http() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &fixed_price_listing("f1", "artist", 5_000)).await?;

    let service = create_service(state.clone());
    let req = build_request::<()>("POST", "/v1/listings/f1/purchase", "alice", None)?;
    let resp = service.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: PurchaseView = parse_resp(resp).await?;
    assert_eq!(view.purchase.buyer_id, "alice");
    assert_eq!(view.purchase.price, 5_000);

    assert_eq!(load_listing(&state, "f1").await?.status, ListingStatus::Sold);

    // The loser of the race gets a conflict, not a not-found.
    let service = create_service(state);
    let req = build_request::<()>("POST", "/v1/listings/f1/purchase", "bob", None)?;
    let resp = service.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn sweep_endpoint_reports_processed_count() -> Result<(), Error> {
    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    state.bidding.place_bid("a1", "alice", 15_000).await?;

    clock.set(T0 + 2 * HOUR_MS);
    let service = create_service(state.clone());
    let req = build_request::<()>("POST", "/v1/auctions/sweep", "ops", None)?;
    let resp = service.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let sweep: SweepResponse = parse_resp(resp).await?;
    assert_eq!(sweep.processed, 1);

    assert_eq!(load_listing(&state, "a1").await?.status, ListingStatus::Sold);
    Ok(())
}
