use std::sync::Arc;

use serde_json::json;
use ulid::Ulid;

use crate::{
    clock::Clock,
    constants::ARTWORK_COLLECTION,
    errors::HandlerError,
    models::listing::{
        AddListingRequest, Listing, ListingStatus, SaleType, UpdateListingRequest,
    },
    store::{from_document, to_document, DocumentStore, QueryOptions, SortDirection},
};

/// CRUD and query layer over artwork listing documents.
///
/// Status transitions to SOLD/INACTIVE are not made here; those belong to the
/// finalizer, settlement and expiry paths, which go through the store's
/// transaction primitive.
#[derive(Clone)]
pub struct ListingRepository {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ListingRepository {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn find(&self, listing_id: &str) -> Result<Option<Listing>, HandlerError> {
        match self.store.get(ARTWORK_COLLECTION, listing_id).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn create(
        &self,
        artist_id: &str,
        artist_name: Option<String>,
        req: AddListingRequest,
    ) -> Result<Listing, HandlerError> {
        match req.sale_type {
            SaleType::FixedPrice if req.price.is_none() => {
                return Err(HandlerError::bad_request(
                    "Fixed-price listings need a price",
                ));
            }
            SaleType::Auction if req.starting_bid.is_none() => {
                return Err(HandlerError::bad_request("Auctions need a starting bid"));
            }
            SaleType::Auction if req.auction_end_time.is_none() => {
                return Err(HandlerError::bad_request("Auctions need an end time"));
            }
            _ => {}
        }
        let now = self.clock.now_millis();
        if req
            .auction_end_time
            .is_some_and(|end| req.sale_type == SaleType::Auction && end <= now)
        {
            return Err(HandlerError::bad_request(
                "Auction end time must be in the future",
            ));
        }

        let listing = Listing {
            id: Ulid::new().to_string(),
            title: req.title,
            description: req.description,
            artist_id: artist_id.to_string(),
            artist_name,
            sale_type: req.sale_type,
            status: ListingStatus::Active,
            price: req.price,
            starting_bid: req.starting_bid,
            current_bid: None,
            bid_count: 0,
            highest_bidder_id: None,
            last_bid_time: None,
            auction_end_time: req.auction_end_time,
            winner_id: None,
            winner_name: None,
            winning_bid_amount: None,
            ended_at: None,
            sold_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store
            .put(ARTWORK_COLLECTION, &listing.id, to_document(&listing)?)
            .await?;
        Ok(listing)
    }

    /// Merge-update of display fields, allowed only while the listing is not
    /// live. These are not safety-critical, so no transaction is needed.
    pub async fn update(
        &self,
        listing_id: &str,
        artist_id: &str,
        req: UpdateListingRequest,
    ) -> Result<(), HandlerError> {
        if req == UpdateListingRequest::default() {
            return Err(HandlerError::bad_request(
                "Must have at least 1 field to update.",
            ));
        }
        let listing = self.find(listing_id).await?.ok_or(HandlerError::not_found())?;
        if listing.artist_id != artist_id {
            return Err(HandlerError::forbidden("You can only edit your own listings"));
        }
        if !matches!(
            listing.status,
            ListingStatus::Draft | ListingStatus::Inactive
        ) {
            return Err(HandlerError::bad_request(
                "Only draft or inactive listings can be edited",
            ));
        }

        let mut fields = serde_json::Map::new();
        if let Some(title) = req.title {
            fields.insert("title".to_string(), json!(title));
        }
        if let Some(description) = req.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(price) = req.price {
            fields.insert("price".to_string(), json!(price));
        }
        if let Some(starting_bid) = req.starting_bid {
            fields.insert("startingBid".to_string(), json!(starting_bid));
        }
        if let Some(end) = req.auction_end_time {
            fields.insert("auctionEndTime".to_string(), json!(end));
        }
        fields.insert("updatedAt".to_string(), json!(self.clock.now_millis()));

        self.store
            .merge(ARTWORK_COLLECTION, listing_id, fields)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, listing_id: &str, artist_id: &str) -> Result<(), HandlerError> {
        let listing = self.find(listing_id).await?.ok_or(HandlerError::not_found())?;
        if listing.artist_id != artist_id {
            return Err(HandlerError::forbidden(
                "You can only delete your own listings",
            ));
        }
        if !matches!(
            listing.status,
            ListingStatus::Draft | ListingStatus::Inactive
        ) {
            return Err(HandlerError::bad_request(
                "Only draft or inactive listings can be deleted",
            ));
        }
        self.store.delete(ARTWORK_COLLECTION, listing_id).await?;
        Ok(())
    }

    /// Auction browse view: running auctions first (ending soonest on top),
    /// then recently sold ones.
    pub async fn auctions(&self) -> Result<Vec<Listing>, HandlerError> {
        let active = self
            .store
            .query(
                ARTWORK_COLLECTION,
                &[
                    ("saleType", json!(SaleType::Auction)),
                    ("status", json!(ListingStatus::Active)),
                ],
                &QueryOptions::ordered("auctionEndTime", SortDirection::Asc),
            )
            .await?;
        let sold = self
            .store
            .query(
                ARTWORK_COLLECTION,
                &[
                    ("saleType", json!(SaleType::Auction)),
                    ("status", json!(ListingStatus::Sold)),
                ],
                &QueryOptions::ordered("soldAt", SortDirection::Desc),
            )
            .await?;

        let mut out = Vec::with_capacity(active.len() + sold.len());
        for (id, doc) in active.into_iter().chain(sold) {
            match from_document::<Listing>(doc) {
                Ok(listing) => out.push(listing),
                Err(e) => tracing::warn!("Skipping malformed listing {}: {}", id, e),
            }
        }
        Ok(out)
    }
}
