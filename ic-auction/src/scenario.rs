//! Correlated (domestic, foreign) price scenarios around the forecast means.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::forecast::{DayForecast, PeriodForecast};
use crate::types::{GeneratorId, PricePair};

/// Lower Cholesky factor of a 2x2 price-error covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CholeskyFactor {
    l11: f64,
    l21: f64,
    l22: f64,
}

impl CholeskyFactor {
    pub fn new(domestic_stdev: f64, foreign_stdev: f64, correlation: f64) -> Self {
        let rho = correlation.clamp(-1.0, 1.0);
        Self {
            l11: domestic_stdev,
            l21: rho * foreign_stdev,
            l22: foreign_stdev * (1.0 - rho * rho).max(0.0).sqrt(),
        }
    }

    pub fn from_forecast(forecast: &PeriodForecast) -> Self {
        Self::new(
            forecast.domestic_stdev,
            forecast.foreign_stdev,
            forecast.correlation,
        )
    }

    /// Map two independent standard normals to a correlated error pair.
    pub fn apply(&self, z1: f64, z2: f64) -> (f64, f64) {
        (self.l11 * z1, self.l21 * z1 + self.l22 * z2)
    }
}

/// One period's draw: the realized prices and every generator's private signal.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodScenario {
    pub realized: PricePair,
    /// `signals[g]` is what generator `g` sees when pricing its bid.
    pub signals: Vec<PricePair>,
}

impl PeriodScenario {
    pub fn signal(&self, generator: GeneratorId) -> PricePair {
        self.signals
            .get(generator.index())
            .copied()
            .unwrap_or(self.realized)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DayScenario {
    pub periods: Vec<PeriodScenario>,
}

/// Draws `generators + 1` correlated price pairs per period. The first pair is
/// the realized outcome used for settlement, the rest are generator signals.
/// Negative prices are left as drawn.
#[derive(Clone, Copy, Debug)]
pub struct PriceScenarioGenerator {
    generators: usize,
}

impl PriceScenarioGenerator {
    pub fn new(generators: usize) -> Self {
        Self { generators }
    }

    pub fn draw_period<R: Rng + ?Sized>(
        &self,
        forecast: &PeriodForecast,
        rng: &mut R,
    ) -> PeriodScenario {
        let factor = CholeskyFactor::from_forecast(forecast);
        let mut sample = || {
            let z1: f64 = rng.sample(StandardNormal);
            let z2: f64 = rng.sample(StandardNormal);
            let (dd, df) = factor.apply(z1, z2);
            PricePair::new(forecast.mean.domestic + dd, forecast.mean.foreign + df)
        };

        let realized = sample();
        let signals = (0..self.generators).map(|_| sample()).collect();
        PeriodScenario { realized, signals }
    }

    pub fn draw_day<R: Rng + ?Sized>(&self, forecast: &DayForecast, rng: &mut R) -> DayScenario {
        DayScenario {
            periods: forecast
                .periods
                .iter()
                .map(|p| self.draw_period(p, rng))
                .collect(),
        }
    }

    /// Zero-noise scenario: every pair equals the forecast means.
    pub fn at_mean(&self, forecast: &DayForecast) -> DayScenario {
        DayScenario {
            periods: forecast
                .periods
                .iter()
                .map(|p| PeriodScenario {
                    realized: p.mean,
                    signals: vec![p.mean; self.generators],
                })
                .collect(),
        }
    }
}
