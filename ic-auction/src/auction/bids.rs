use crate::types::{GeneratorId, Price, Quantity};

// === BIDS ===

/// One generator's offer for capacity in one period.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bid {
    pub generator: GeneratorId,
    pub price: Price,
    pub capacity: Quantity,
}

impl Bid {
    /// Negative or non-finite inputs are recorded as zero.
    pub fn new(generator: GeneratorId, price: Price, capacity: Quantity) -> Self {
        Self {
            generator,
            price: non_negative(price),
            capacity: non_negative(capacity),
        }
    }

    /// Copy with negative or non-finite fields set to zero. Fields are public,
    /// so a bid may not have gone through [`Bid::new`].
    pub fn sanitized(&self) -> Self {
        Self::new(self.generator, self.price, self.capacity)
    }
}

fn non_negative(x: f64) -> f64 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}

/// A full day of bids: `periods[p]` holds every generator's bid for period `p`.
#[derive(Clone, Debug, Default)]
pub struct BidBook {
    pub periods: Vec<Vec<Bid>>,
}

impl BidBook {
    pub fn with_periods(count: usize) -> Self {
        Self {
            periods: vec![Vec::new(); count],
        }
    }

    pub fn push(&mut self, period_index: usize, bid: Bid) {
        self.periods[period_index].push(bid);
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}
