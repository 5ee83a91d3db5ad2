//! Merit-order clearing invariants over randomly generated bid books.
//!
//! Prices are drawn on a coarse grid so ties and zero prices come up often.

use ic_auction::{Bid, BidBook, GeneratorId, clear_day, clear_period};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EPS: f64 = 1e-9;

// === FIXTURES ===

fn random_book(rng: &mut StdRng) -> Vec<Bid> {
    let n = rng.random_range(0..7);
    (0..n)
        .map(|g| {
            let price = rng.random_range(0..12) as f64 * 5.0;
            let capacity = if rng.random_bool(0.15) {
                0.0
            } else {
                rng.random_range(1.0..80.0)
            };
            Bid::new(GeneratorId(g), price, capacity)
        })
        .collect()
}

fn random_capacity(rng: &mut StdRng) -> f64 {
    if rng.random_bool(0.1) {
        0.0
    } else {
        rng.random_range(1.0..250.0)
    }
}

// === PROPERTIES ===

#[test]
fn accepted_capacity_never_exceeds_offer() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..2_000 {
        let bids = random_book(&mut rng);
        let capacity = random_capacity(&mut rng);
        let result = clear_period(&bids, capacity);

        assert_eq!(result.accepted.len(), bids.len());
        assert!(
            result.total_accepted() <= capacity + EPS,
            "accepted {} > offered {capacity}",
            result.total_accepted()
        );
        for (bid, &accepted) in bids.iter().zip(&result.accepted) {
            assert!(accepted >= 0.0 && accepted <= bid.capacity + EPS);
        }
    }
}

#[test]
fn undersubscribed_or_empty_auctions_clear_at_zero() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2_000 {
        let bids = random_book(&mut rng);
        let capacity = random_capacity(&mut rng);
        let total: f64 = bids.iter().map(|b| b.capacity).sum();
        let result = clear_period(&bids, capacity);

        if capacity == 0.0 || total <= capacity {
            assert_eq!(result.clearing_price, 0.0, "bids {bids:?} capacity {capacity}");
        }
        let any_priced = bids.iter().any(|b| b.price > 0.0);
        if capacity > 0.0 && total <= capacity && any_priced {
            // Everything fits: every bid is taken in full.
            for (bid, &accepted) in bids.iter().zip(&result.accepted) {
                assert!((accepted - bid.capacity).abs() < EPS);
            }
        }
    }
}

#[test]
fn clearing_price_sits_between_winners_and_losers() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut scarce_cases = 0;
    for _ in 0..2_000 {
        let bids = random_book(&mut rng);
        let capacity = random_capacity(&mut rng);
        let result = clear_period(&bids, capacity);

        let highest = bids.iter().map(|b| b.price).fold(0.0, f64::max);
        assert!(result.clearing_price <= highest);

        for (bid, &accepted) in bids.iter().zip(&result.accepted) {
            if accepted > EPS {
                assert!(
                    result.clearing_price <= bid.price,
                    "winner {bid:?} pays more than it bid: {}",
                    result.clearing_price
                );
            }
        }

        let total: f64 = bids.iter().map(|b| b.capacity).sum();
        let degenerate = bids.iter().all(|b| b.price <= 0.0);
        if capacity > 0.0 && total > capacity + EPS && !degenerate {
            scarce_cases += 1;
            for (bid, &accepted) in bids.iter().zip(&result.accepted) {
                if bid.capacity > 0.0 && accepted <= 0.0 {
                    assert!(
                        result.clearing_price >= bid.price,
                        "loser {bid:?} outbid the clearing price {}",
                        result.clearing_price
                    );
                }
            }
        }
    }
    assert!(scarce_cases > 100, "only {scarce_cases} scarce books generated");
}

#[test]
fn submission_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..500 {
        let bids = random_book(&mut rng);
        let capacity = random_capacity(&mut rng);
        let mut reversed = bids.clone();
        reversed.reverse();

        let a = clear_period(&bids, capacity);
        let b = clear_period(&reversed, capacity);
        assert_eq!(a.clearing_price, b.clearing_price);
        assert!((a.total_accepted() - b.total_accepted()).abs() < EPS);

        // Same generator gets the same capacity either way.
        for (i, &accepted) in a.accepted.iter().enumerate() {
            let j = bids.len() - 1 - i;
            assert!((accepted - b.accepted[j]).abs() < EPS);
        }
    }
}

#[test]
fn worked_example_two_generators() {
    let bids = vec![
        Bid::new(GeneratorId(0), 50.0, 60.0),
        Bid::new(GeneratorId(1), 30.0, 60.0),
    ];
    let result = clear_period(&bids, 100.0);
    assert_eq!(result.accepted, vec![60.0, 40.0]);
    assert_eq!(result.clearing_price, 30.0);
}

#[test]
fn periods_clear_independently() {
    let mut rng = StdRng::seed_from_u64(31);
    let books: Vec<Vec<Bid>> = (0..48).map(|_| random_book(&mut rng)).collect();
    let capacities: Vec<f64> = (0..48).map(|_| random_capacity(&mut rng)).collect();

    let day = clear_day(
        &BidBook {
            periods: books.clone(),
        },
        &capacities,
    )
    .unwrap();

    for (p, (bids, &capacity)) in books.iter().zip(&capacities).enumerate() {
        assert_eq!(day.periods[p], clear_period(bids, capacity));
    }
}
