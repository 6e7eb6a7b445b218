use std::time::Duration;

use crate::{
    auction::scheduler::AuctionScheduler,
    models::{listing::ListingStatus, purchase::PurchaseStatus},
};

use super::*;

fn scheduler_for(state: &AppState, delay: Duration, period: Duration) -> AuctionScheduler {
    AuctionScheduler::new(state.settlement.clone(), state.expiry.clone(), delay, period)
}

#[tokio::test]
async fn run_once_drives_both_sweeps() -> Result<(), Error> {
    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    state.bidding.place_bid("a1", "alice", 15_000).await?;

    let scheduler = scheduler_for(&state, Duration::ZERO, Duration::from_secs(60));

    // First pass settles the ended auction.
    clock.set(T0 + 2 * HOUR_MS);
    scheduler.run_once().await;
    assert_eq!(load_listing(&state, "a1").await?.status, ListingStatus::Sold);

    // Second pass, a day later, expires the unpaid purchase.
    clock.set(T0 + 2 * HOUR_MS + 25 * HOUR_MS);
    scheduler.run_once().await;
    let purchases = purchases_for(&state, "a1").await?;
    assert_eq!(purchases[0].1.status, PurchaseStatus::Expired);
    assert_eq!(
        load_listing(&state, "a1").await?.status,
        ListingStatus::Inactive
    );
    Ok(())
}

#[tokio::test]
async fn background_task_ticks_and_stops() -> Result<(), Error> {
    let (state, clock) = test_state();
    seed_listing(&state, &auction_listing("a1", "artist", 10_000, T0 + HOUR_MS)).await?;
    state.bidding.place_bid("a1", "alice", 15_000).await?;
    clock.set(T0 + 2 * HOUR_MS);

    let scheduler = scheduler_for(&state, Duration::ZERO, Duration::from_millis(10));
    scheduler.start();

    // Give the timer a few ticks to pick up the ended auction.
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if load_listing(&state, "a1").await?.status == ListingStatus::Sold {
            break;
        }
    }
    assert_eq!(load_listing(&state, "a1").await?.status, ListingStatus::Sold);

    scheduler.stop().await;
    Ok(())
}
