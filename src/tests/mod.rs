mod bidding;
mod routes;
mod scheduler;

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::Request,
    response::Response,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use ulid::Ulid;

use crate::{
    clock::ManualClock,
    constants::{ARTWORK_COLLECTION, BID_COLLECTION, MESSAGE_COLLECTION, USER_COLLECTION},
    models::{
        bid::BidRecord,
        listing::{Listing, ListingStatus, SaleType},
        message::Message,
        purchase::Purchase,
    },
    state::AppState,
    store::{from_document, to_document, MemoryStore, QueryOptions},
};

type Error = Box<dyn std::error::Error + Send + Sync>;

/// 2024-01-01 00:00:00 UTC, in millis.
const T0: u64 = 1_704_067_200_000;

const HOUR_MS: u64 = 60 * 60 * 1000;

fn test_state() -> (Arc<AppState>, ManualClock) {
    let clock = ManualClock::new(T0);
    let state = AppState::with_parts(
        Arc::new(MemoryStore::new()),
        Arc::new(clock.clone()),
    );
    (Arc::new(state), clock)
}

fn auction_listing(id: &str, artist_id: &str, starting_bid: u64, end_time: u64) -> Listing {
    Listing {
        id: id.to_string(),
        title: format!("Artwork {}", id),
        description: None,
        artist_id: artist_id.to_string(),
        artist_name: None,
        sale_type: SaleType::Auction,
        status: ListingStatus::Active,
        price: None,
        starting_bid: Some(starting_bid),
        current_bid: None,
        bid_count: 0,
        highest_bidder_id: None,
        last_bid_time: None,
        auction_end_time: Some(end_time),
        winner_id: None,
        winner_name: None,
        winning_bid_amount: None,
        ended_at: None,
        sold_at: None,
        created_at: T0 - HOUR_MS,
        updated_at: T0 - HOUR_MS,
    }
}

fn fixed_price_listing(id: &str, artist_id: &str, price: u64) -> Listing {
    Listing {
        sale_type: SaleType::FixedPrice,
        price: Some(price),
        starting_bid: None,
        auction_end_time: None,
        ..auction_listing(id, artist_id, 0, 0)
    }
}

async fn seed_listing(state: &AppState, listing: &Listing) -> Result<(), Error> {
    state
        .store
        .put(ARTWORK_COLLECTION, &listing.id, to_document(listing)?)
        .await?;
    Ok(())
}

async fn seed_user(state: &AppState, id: &str, display_name: &str) -> Result<(), Error> {
    state
        .store
        .put(
            USER_COLLECTION,
            id,
            to_document(&json!({ "displayName": display_name }))?,
        )
        .await?;
    Ok(())
}

/// Write a ledger entry directly, bypassing the engine. Used to model
/// out-of-order or cache-divergent histories.
async fn seed_bid(
    state: &AppState,
    auction_id: &str,
    bidder_id: &str,
    amount: u64,
    at: u64,
) -> Result<(), Error> {
    let record = BidRecord {
        auction_id: auction_id.to_string(),
        bidder_id: bidder_id.to_string(),
        bidder_name: format!("Bidder {}", bidder_id),
        bid_amount: amount,
        previous_bid: 0,
        created_at: at,
    };
    state
        .store
        .put(BID_COLLECTION, &Ulid::new().to_string(), to_document(&record)?)
        .await?;
    Ok(())
}

async fn load_listing(state: &AppState, id: &str) -> Result<Listing, Error> {
    let doc = state
        .store
        .get(ARTWORK_COLLECTION, id)
        .await?
        .ok_or("listing missing")?;
    Ok(from_document(doc)?)
}

async fn ledger_for(state: &AppState, auction_id: &str) -> Result<Vec<BidRecord>, Error> {
    let rows = state
        .store
        .query(
            BID_COLLECTION,
            &[("auctionId", json!(auction_id))],
            &QueryOptions::default(),
        )
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for (_, doc) in rows {
        out.push(from_document(doc)?);
    }
    Ok(out)
}

async fn purchases_for(state: &AppState, artwork_id: &str) -> Result<Vec<(String, Purchase)>, Error> {
    let rows = state
        .store
        .query(
            crate::constants::PURCHASE_COLLECTION,
            &[("artworkId", json!(artwork_id))],
            &QueryOptions::default(),
        )
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for (id, doc) in rows {
        out.push((id, from_document(doc)?));
    }
    Ok(out)
}

async fn messages_for(state: &AppState, user_id: &str) -> Result<Vec<Message>, Error> {
    let rows = state
        .store
        .query(
            MESSAGE_COLLECTION,
            &[("receiverId", json!(user_id))],
            &QueryOptions::default(),
        )
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for (_, doc) in rows {
        out.push(from_document(doc)?);
    }
    Ok(out)
}

async fn parse_resp<T: DeserializeOwned>(resp: Response<Body>) -> Result<T, Error> {
    let body = resp.into_body();
    let limit = body.size_hint().upper().unwrap_or(u64::MAX) as usize;
    let data = axum::body::to_bytes(body, limit).await?;
    let res: T = serde_json::from_slice(&data)?;

    Ok(res)
}

fn build_request<T: Serialize>(
    method: &str,
    uri: &str,
    user_id: &str,
    body: Option<T>,
) -> Result<Request<Body>, Error> {
    let req = match body {
        Some(v) => {
            let content = serde_json::to_string(&v)?;
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("X-User-Id", user_id)
                .body(Body::new(content))
        }
        None => Request::builder()
            .method(method)
            .uri(uri)
            .header("X-User-Id", user_id)
            .body(Body::empty()),
    }?;
    Ok(req)
}
