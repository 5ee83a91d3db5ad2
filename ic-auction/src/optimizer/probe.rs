use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::error::OptimizerError;

use super::halton::Halton;
use super::{Bounds, EvaluationBudget, Optimum, StrategyOptimizer, Tracker, prepare_start};

/// Incumbent, then space-filling probes, then adaptive local refinement.
///
/// Refinement perturbs the best point found so far with Gaussian steps scaled
/// by each dimension's width. The step grows after an improvement and shrinks
/// after a miss; once it collapses below `min_step` it restarts at
/// `initial_step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeRefine {
    /// Initial step as a fraction of each dimension's width.
    pub initial_step: f64,
    pub max_step: f64,
    pub min_step: f64,
    pub grow: f64,
    pub shrink: f64,
}

impl Default for ProbeRefine {
    fn default() -> Self {
        Self {
            initial_step: 0.25,
            max_step: 0.5,
            min_step: 1e-3,
            grow: 1.2,
            shrink: 0.7,
        }
    }
}

impl StrategyOptimizer for ProbeRefine {
    fn name(&self) -> &'static str {
        "probe_refine"
    }

    fn maximize(
        &self,
        objective: &mut dyn FnMut(&[f64]) -> f64,
        bounds: &Bounds,
        start: &[f64],
        budget: EvaluationBudget,
        rng: &mut StdRng,
    ) -> Result<Optimum, OptimizerError> {
        if budget.total() == 0 {
            return Err(OptimizerError::EmptyBudget);
        }
        let start = prepare_start(bounds, start)?;
        let mut tracker = Tracker::new(objective);

        tracker.eval(&start);

        let mut halton = Halton::shifted(bounds.dimensions(), rng);
        for _ in 0..budget.probes {
            let x = bounds.from_unit(&halton.next_point());
            tracker.eval(&x);
        }

        let mut step = self.initial_step;
        for _ in 0..budget.iterations {
            let Some((centre, best)) = tracker.best().map(|(x, v)| (x.to_vec(), v)) else {
                // Nothing finite yet: keep sampling the box.
                let x = bounds.from_unit(&halton.next_point());
                tracker.eval(&x);
                continue;
            };

            let mut candidate: Vec<f64> = centre
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    let z: f64 = rng.sample(StandardNormal);
                    c + step * bounds.width(i) * z
                })
                .collect();
            bounds.clamp(&mut candidate);

            if tracker.eval(&candidate) > best {
                step = (step * self.grow).min(self.max_step);
            } else {
                step *= self.shrink;
                if step < self.min_step {
                    step = self.initial_step;
                }
            }
        }

        tracker.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn unit_box(dimensions: usize) -> Bounds {
        Bounds::new(vec![-5.0; dimensions], vec![5.0; dimensions]).unwrap()
    }

    #[test]
    fn finds_interior_maximum_of_smooth_bowl() {
        let mut objective = |x: &[f64]| -(x[0] - 1.5).powi(2) - (x[1] + 2.0).powi(2);
        let budget = EvaluationBudget {
            probes: 10,
            iterations: 200,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let optimum = ProbeRefine::default()
            .maximize(&mut objective, &unit_box(2), &[0.0, 0.0], budget, &mut rng)
            .unwrap();

        assert!((optimum.x[0] - 1.5).abs() < 0.3, "{:?}", optimum.x);
        assert!((optimum.x[1] + 2.0).abs() < 0.3, "{:?}", optimum.x);
        assert_eq!(optimum.evaluations, 211);
    }

    #[test]
    fn never_worse_than_start_and_stays_in_bounds() {
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 10.0]).unwrap();
        let mut seen_outside = false;
        let mut objective = |x: &[f64]| {
            if !bounds.contains(x) {
                seen_outside = true;
            }
            // Flat almost everywhere, like a clearing-based utility.
            if x[0] > 0.9 { 1.0 } else { 0.0 }
        };
        let budget = EvaluationBudget {
            probes: 3,
            iterations: 10,
        };
        let mut rng = StdRng::seed_from_u64(2);
        let optimum = ProbeRefine::default()
            .maximize(&mut objective, &bounds, &[0.95, 5.0], budget, &mut rng)
            .unwrap();
        assert_eq!(optimum.value, 1.0);
        assert!(!seen_outside);
    }

    #[test]
    fn empty_budget_and_all_nan_are_failures() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut objective = |_: &[f64]| f64::NAN;
        let err = ProbeRefine::default()
            .maximize(
                &mut objective,
                &unit_box(2),
                &[0.0, 0.0],
                EvaluationBudget {
                    probes: 0,
                    iterations: 0,
                },
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, OptimizerError::EmptyBudget);

        let err = ProbeRefine::default()
            .maximize(
                &mut objective,
                &unit_box(2),
                &[0.0, 0.0],
                EvaluationBudget {
                    probes: 2,
                    iterations: 3,
                },
                &mut rng,
            )
            .unwrap_err();
        assert_eq!(err, OptimizerError::NoFiniteEvaluation { evaluations: 6 });
    }

    #[test]
    fn same_seed_same_search() {
        let budget = EvaluationBudget {
            probes: 4,
            iterations: 12,
        };
        let run = |seed: u64| {
            let mut objective = |x: &[f64]| (x[0] * 3.0).sin() + x[1].cos();
            ProbeRefine::default()
                .maximize(
                    &mut objective,
                    &unit_box(2),
                    &[0.0, 0.0],
                    budget,
                    &mut StdRng::seed_from_u64(seed),
                )
                .unwrap()
        };
        assert_eq!(run(9), run(9));
    }
}
