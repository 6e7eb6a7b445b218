use crate::{
    auction::bidding::{BidOutcome, BidRejection},
    models::listing::ListingStatus,
};

use super::*;

#[tokio::test]
async fn bid_below_starting_bid_is_rejected() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    let outcome = state.bidding.place_bid("a1", "buyer", 9_000).await?;
    assert_eq!(
        outcome,
        BidOutcome::Rejected(BidRejection::TooLow { floor: 10_000 })
    );

    let outcome = state.bidding.place_bid("a1", "buyer", 10_000).await?;
    assert_eq!(
        outcome,
        BidOutcome::Rejected(BidRejection::TooLow { floor: 10_000 })
    );

    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.current_bid, None);
    assert_eq!(listing.bid_count, 0);
    assert!(ledger_for(&state, "a1").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn accepted_bid_updates_cache_and_ledger() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    seed_user(&state, "buyer", "Jane Doe").await?;

    let outcome = state.bidding.place_bid("a1", "buyer", 15_000).await?;
    assert_eq!(
        outcome,
        BidOutcome::Accepted {
            new_current_bid: 15_000,
            bid_count: 1
        }
    );

    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.current_bid, Some(15_000));
    assert_eq!(listing.bid_count, 1);
    assert_eq!(listing.highest_bidder_id.as_deref(), Some("buyer"));
    assert_eq!(listing.last_bid_time, Some(T0));

    let ledger = ledger_for(&state, "a1").await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].bid_amount, 15_000);
    assert_eq!(ledger[0].previous_bid, 10_000);
    assert_eq!(ledger[0].bidder_name, "Jane Doe");
    Ok(())
}

#[tokio::test]
async fn tie_with_current_bid_is_rejected() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    assert!(matches!(
        state.bidding.place_bid("a1", "alice", 15_000).await?,
        BidOutcome::Accepted { .. }
    ));
    assert_eq!(
        state.bidding.place_bid("a1", "bob", 15_000).await?,
        BidOutcome::Rejected(BidRejection::TooLow { floor: 15_000 })
    );

    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.highest_bidder_id.as_deref(), Some("alice"));
    assert_eq!(listing.bid_count, 1);
    Ok(())
}

#[tokio::test]
async fn artist_cannot_bid_on_own_auction() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    let outcome = state.bidding.place_bid("a1", "artist", 20_000).await?;
    assert_eq!(outcome, BidOutcome::Rejected(BidRejection::OwnListing));

    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.highest_bidder_id, None);
    Ok(())
}

#[tokio::test]
async fn bid_after_end_time_is_rejected() -> Result<(), Error> {
    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    // Status still says ACTIVE; only the wall clock has passed the end.
    clock.set(T0 + 2 * HOUR_MS);
    let outcome = state.bidding.place_bid("a1", "buyer", 20_000).await?;
    assert_eq!(outcome, BidOutcome::Rejected(BidRejection::Ended));
    Ok(())
}

#[tokio::test]
async fn bid_on_inactive_listing_is_rejected() -> Result<(), Error> {
    let (state, _) = test_state();
    let mut listing = auction_listing("a1", "artist", 10_000, T0 + HOUR_MS);
    listing.status = ListingStatus::Inactive;
    seed_listing(&state, &listing).await?;

    let outcome = state.bidding.place_bid("a1", "buyer", 20_000).await?;
    assert_eq!(outcome, BidOutcome::Rejected(BidRejection::NotActive));
    Ok(())
}

#[tokio::test]
async fn bid_on_fixed_price_listing_is_rejected() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &fixed_price_listing("f1", "artist", 5_000)).await?;

    let outcome = state.bidding.place_bid("f1", "buyer", 20_000).await?;
    assert_eq!(outcome, BidOutcome::Rejected(BidRejection::NotAuction));
    Ok(())
}

#[tokio::test]
async fn bid_on_unknown_listing_is_rejected() -> Result<(), Error> {
    let (state, _) = test_state();
    let outcome = state.bidding.place_bid("nope", "buyer", 20_000).await?;
    assert_eq!(outcome, BidOutcome::Rejected(BidRejection::NotFound));
    Ok(())
}

#[tokio::test]
async fn concurrent_equal_bids_admit_exactly_one() -> Result<(), Error> {
    let (state, _) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    let first = state.bidding.clone();
    let second = state.bidding.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.place_bid("a1", "alice", 20_000).await }),
        tokio::spawn(async move { second.place_bid("a1", "bob", 20_000).await }),
    );
    let outcomes = [a??, b??];

    let accepted = outcomes
        .iter()
        .filter(|o| matches!(o, BidOutcome::Accepted { .. }))
        .count();
    assert_eq!(accepted, 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, BidOutcome::Rejected(BidRejection::TooLow { floor: 20_000 }))));

    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.current_bid, Some(20_000));
    assert_eq!(listing.bid_count, 1);
    assert_eq!(ledger_for(&state, "a1").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn outbid_then_higher_bid_accepted() -> Result<(), Error> {
    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    assert!(matches!(
        state.bidding.place_bid("a1", "alice", 15_000).await?,
        BidOutcome::Accepted { .. }
    ));
    clock.advance(1_000);
    assert!(matches!(
        state.bidding.place_bid("a1", "bob", 12_000).await?,
        BidOutcome::Rejected(BidRejection::TooLow { floor: 15_000 })
    ));
    clock.advance(1_000);
    assert_eq!(
        state.bidding.place_bid("a1", "bob", 20_000).await?,
        BidOutcome::Accepted {
            new_current_bid: 20_000,
            bid_count: 2
        }
    );

    let ledger = ledger_for(&state, "a1").await?;
    assert_eq!(ledger.len(), 2);
    let listing = load_listing(&state, "a1").await?;
    assert_eq!(listing.highest_bidder_id.as_deref(), Some("bob"));
    Ok(())
}

#[tokio::test]
async fn bidders_view_sorts_and_labels() -> Result<(), Error> {
    use crate::models::bid::{BidStatus, BidderSort};

    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;

    state.bidding.place_bid("a1", "alice", 15_000).await?;
    clock.advance(1_000);
    state.bidding.place_bid("a1", "bob", 20_000).await?;

    let by_amount = state.bidding.bidders("a1", BidderSort::Amount).await?;
    assert_eq!(by_amount.len(), 2);
    assert_eq!(by_amount[0].bidder_id, "bob");
    assert_eq!(by_amount[0].bid_status, BidStatus::Highest);
    assert_eq!(by_amount[1].bidder_id, "alice");
    assert_eq!(by_amount[1].bid_status, BidStatus::Outbid);

    let by_latest = state.bidding.bidders("a1", BidderSort::Latest).await?;
    assert_eq!(by_latest[0].bidder_id, "bob");

    // Once the auction settles, the top label flips to WINNING.
    clock.set(T0 + 2 * HOUR_MS);
    state.settlement.settle("a1").await?;
    let after_end = state.bidding.bidders("a1", BidderSort::Amount).await?;
    assert_eq!(after_end[0].bid_status, BidStatus::Winning);
    Ok(())
}

#[tokio::test]
async fn user_bids_join_listing_details() -> Result<(), Error> {
    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    seed_listing(&state, &auction_listing("a2", "artist", 5_000, T0 + HOUR_MS)).await?;

    state.bidding.place_bid("a1", "alice", 15_000).await?;
    clock.advance(1_000);
    state.bidding.place_bid("a2", "alice", 6_000).await?;

    let bids = state.bidding.user_bids("alice").await?;
    assert_eq!(bids.len(), 2);
    // Latest first.
    assert_eq!(bids[0].auction_id, "a2");
    assert_eq!(bids[0].title, "Artwork a2");
    assert_eq!(bids[1].auction_id, "a1");
    assert_eq!(bids[1].current_bid, Some(15_000));
    Ok(())
}
