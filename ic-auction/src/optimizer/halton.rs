// Low-discrepancy points for the initial probes of a search.

use rand::Rng;

/// Halton sequence in `[0, 1)^d` with an optional random shift
/// (Cranley-Patterson rotation), so repeated searches probe different points.
#[derive(Debug, Clone)]
pub struct Halton {
    bases: Vec<u64>,
    shift: Vec<f64>,
    index: u64,
}

impl Halton {
    pub fn new(dimensions: usize) -> Self {
        Self {
            bases: first_primes(dimensions),
            shift: vec![0.0; dimensions],
            index: 0,
        }
    }

    pub fn shifted<R: Rng + ?Sized>(dimensions: usize, rng: &mut R) -> Self {
        let mut halton = Self::new(dimensions);
        halton.shift = (0..dimensions).map(|_| rng.random::<f64>()).collect();
        halton
    }

    pub fn dimensions(&self) -> usize {
        self.bases.len()
    }

    pub fn next_point(&mut self) -> Vec<f64> {
        self.index += 1;
        self.bases
            .iter()
            .zip(&self.shift)
            .map(|(&base, &shift)| (radical_inverse(self.index, base) + shift).fract())
            .collect()
    }
}

fn radical_inverse(index: u64, base: u64) -> f64 {
    let mut result = 0.0;
    let mut f = 1.0 / base as f64;
    let mut i = index;
    while i > 0 {
        result += f * (i % base) as f64;
        i /= base;
        f /= base as f64;
    }
    result
}

fn first_primes(n: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2u64;
    while primes.len() < n {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}
