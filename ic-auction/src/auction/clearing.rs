use crate::error::AuctionError;
use crate::types::{CAPACITY_EPSILON, Price, Quantity};

use super::bids::{Bid, BidBook};

// === SINGLE PERIOD CLEARING ===

#[derive(Clone, Debug, PartialEq)]
pub struct PeriodClearing {
    /// Accepted capacity per bid, in the order the bids were given.
    pub accepted: Vec<Quantity>,
    pub clearing_price: Price,
}

impl PeriodClearing {
    fn nothing_accepted(bid_count: usize) -> Self {
        Self {
            accepted: vec![0.0; bid_count],
            clearing_price: 0.0,
        }
    }

    pub fn total_accepted(&self) -> Quantity {
        self.accepted.iter().sum()
    }
}

/// Clear one period's capacity auction by merit order.
///
/// Bids are ranked by price, highest first; equal prices rank by generator id,
/// so the outcome does not depend on the order bids were submitted in. Bids are
/// accepted in full while they fit. The bid that reaches `capacity_offered`
/// gets exactly the remainder and everything ranked below it gets nothing.
///
/// The marginal bid sets the clearing price only when the auction is scarce,
/// i.e. total bid capacity exceeds `capacity_offered`. Otherwise every bid fits
/// and the price is 0, including when the last bid fills capacity exactly.
///
/// Zero capacity, all-zero bid capacities and all-zero bid prices clear to
/// nothing at price 0. Negative or non-finite prices and capacities count as 0.
pub fn clear_period(bids: &[Bid], capacity_offered: Quantity) -> PeriodClearing {
    let bids: Vec<Bid> = bids.iter().map(Bid::sanitized).collect();
    let capacity = if capacity_offered.is_finite() {
        capacity_offered.max(0.0)
    } else {
        0.0
    };

    if capacity <= 0.0
        || bids.iter().all(|b| b.capacity <= 0.0)
        || bids.iter().all(|b| b.price <= 0.0)
    {
        return PeriodClearing::nothing_accepted(bids.len());
    }

    let total_bid: Quantity = bids.iter().map(|b| b.capacity).sum();
    let scarce = total_bid > capacity + CAPACITY_EPSILON;

    // Merit order: price descending, generator id ascending on ties.
    let mut merit: Vec<usize> = (0..bids.len()).collect();
    merit.sort_by(|&a, &b| {
        bids[b]
            .price
            .total_cmp(&bids[a].price)
            .then(bids[a].generator.cmp(&bids[b].generator))
    });

    let mut result = PeriodClearing::nothing_accepted(bids.len());
    let mut running = 0.0;

    for idx in merit {
        let remaining = capacity - running;
        if remaining <= CAPACITY_EPSILON {
            break;
        }

        let bid = &bids[idx];
        if bid.capacity < remaining - CAPACITY_EPSILON {
            result.accepted[idx] = bid.capacity;
            running += bid.capacity;
            continue;
        }

        // Marginal bid: takes whatever is left.
        result.accepted[idx] = remaining.min(bid.capacity);
        if scarce {
            result.clearing_price = bid.price;
        }
        break;
    }

    result
}

// === FULL DAY ===

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DayClearing {
    pub periods: Vec<PeriodClearing>,
}

impl DayClearing {
    pub fn clearing_prices(&self) -> Vec<Price> {
        self.periods.iter().map(|p| p.clearing_price).collect()
    }

    /// Capacity accepted for the `bid_index`-th bid of period `period_index`.
    pub fn accepted(&self, period_index: usize, bid_index: usize) -> Quantity {
        self.periods
            .get(period_index)
            .and_then(|p| p.accepted.get(bid_index))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Clear every period independently.
pub fn clear_day(book: &BidBook, capacity_offered: &[Quantity]) -> Result<DayClearing, AuctionError> {
    if book.len() != capacity_offered.len() {
        return Err(AuctionError::PeriodMismatch {
            bid_periods: book.len(),
            capacity_periods: capacity_offered.len(),
        });
    }

    let periods = book
        .periods
        .iter()
        .zip(capacity_offered)
        .map(|(bids, &capacity)| clear_period(bids, capacity))
        .collect();

    Ok(DayClearing { periods })
}
