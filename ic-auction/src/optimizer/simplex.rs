use rand::rngs::StdRng;

use crate::error::OptimizerError;

use super::{Bounds, EvaluationBudget, Optimum, StrategyOptimizer, Tracker, prepare_start};

/// Nelder-Mead simplex search with every trial point projected into the box.
///
/// The start point is one vertex; the others step `initial_scale` of the width
/// along each axis. The search succeeds once vertex values agree within
/// `f_tolerance` (relative) and either the vertices lie within `x_tolerance`
/// of the best (in units of the box width) or a shrink step left the values
/// flat. A flat simplex at the end of the budget also counts as converged,
/// since Monte Carlo utilities under a fixed seed are piecewise constant and a
/// plateau never narrows on its own. Running out of budget with the vertex
/// values still spread is `NotConverged`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NelderMead {
    pub initial_scale: f64,
    pub x_tolerance: f64,
    pub f_tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            initial_scale: 0.1,
            x_tolerance: 1e-4,
            f_tolerance: 1e-6,
        }
    }
}

type Vertex = (Vec<f64>, f64);

/// Minimise the negated objective; -inf utilities become +inf costs.
fn cost(tracker: &mut Tracker<'_>, x: &[f64]) -> f64 {
    -tracker.eval(x)
}

impl NelderMead {
    fn initial_simplex(&self, bounds: &Bounds, start: &[f64]) -> Vec<Vec<f64>> {
        let mut points = vec![start.to_vec()];
        for i in 0..bounds.dimensions() {
            let mut x = start.to_vec();
            let step = self.initial_scale * bounds.width(i);
            x[i] = if x[i] + step <= bounds.upper[i] {
                x[i] + step
            } else {
                x[i] - step
            };
            points.push(x);
        }
        points
    }

    /// Largest vertex distance from the best vertex, per unit of box width.
    fn diameter(bounds: &Bounds, simplex: &[Vertex]) -> f64 {
        let best = &simplex[0].0;
        simplex[1..]
            .iter()
            .flat_map(|(x, _)| {
                x.iter().enumerate().map(move |(i, v)| {
                    let width = bounds.width(i);
                    if width > 0.0 {
                        (v - best[i]).abs() / width
                    } else {
                        0.0
                    }
                })
            })
            .fold(0.0, f64::max)
    }
}

impl StrategyOptimizer for NelderMead {
    fn name(&self) -> &'static str {
        "nelder_mead"
    }

    fn maximize(
        &self,
        objective: &mut dyn FnMut(&[f64]) -> f64,
        bounds: &Bounds,
        start: &[f64],
        budget: EvaluationBudget,
        _rng: &mut StdRng,
    ) -> Result<Optimum, OptimizerError> {
        let limit = budget.total();
        if limit == 0 {
            return Err(OptimizerError::EmptyBudget);
        }
        let start = prepare_start(bounds, start)?;
        let n = bounds.dimensions();
        if limit < n + 1 {
            return Err(OptimizerError::NotConverged {
                evaluations: 0,
                spread: f64::INFINITY,
            });
        }

        let mut tracker = Tracker::new(objective);
        let mut shrunk_while_flat = false;

        let mut simplex: Vec<Vertex> = Vec::with_capacity(n + 1);
        for x in self.initial_simplex(bounds, &start) {
            let c = cost(&mut tracker, &x);
            simplex.push((x, c));
        }

        let project = |mut x: Vec<f64>| {
            bounds.clamp(&mut x);
            x
        };

        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let best = simplex[0].1;
            let worst = simplex[n].1;
            let spread = worst - best;

            let flat = spread.is_finite() && spread <= self.f_tolerance * (1.0 + best.abs());
            if !flat {
                shrunk_while_flat = false;
            }
            if flat && (shrunk_while_flat || Self::diameter(bounds, &simplex) <= self.x_tolerance) {
                return tracker.finish();
            }
            if tracker.evaluations >= limit {
                if flat {
                    return tracker.finish();
                }
                let evaluations = tracker.evaluations;
                tracker.finish()?;
                return Err(OptimizerError::NotConverged {
                    evaluations,
                    spread,
                });
            }

            let centroid: Vec<f64> = (0..n)
                .map(|i| simplex[..n].iter().map(|(x, _)| x[i]).sum::<f64>() / n as f64)
                .collect();
            let along = |t: f64| -> Vec<f64> {
                project(
                    centroid
                        .iter()
                        .zip(&simplex[n].0)
                        .map(|(c, w)| c + t * (c - w))
                        .collect(),
                )
            };

            let reflected = along(1.0);
            let fr = cost(&mut tracker, &reflected);

            if fr < best {
                if tracker.evaluations >= limit {
                    simplex[n] = (reflected, fr);
                    continue;
                }
                let expanded = along(2.0);
                let fe = cost(&mut tracker, &expanded);
                simplex[n] = if fe < fr {
                    (expanded, fe)
                } else {
                    (reflected, fr)
                };
                continue;
            }

            if fr < simplex[n - 1].1 {
                simplex[n] = (reflected, fr);
                continue;
            }

            if tracker.evaluations >= limit {
                continue;
            }
            let (contracted, threshold) = if fr < worst {
                (along(0.5), fr)
            } else {
                (along(-0.5), worst)
            };
            let fc = cost(&mut tracker, &contracted);
            if fc < threshold {
                simplex[n] = (contracted, fc);
                continue;
            }

            // Shrink towards the best vertex.
            shrunk_while_flat = flat;
            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                if tracker.evaluations >= limit {
                    break;
                }
                let x = project(
                    anchor
                        .iter()
                        .zip(&vertex.0)
                        .map(|(a, v)| a + 0.5 * (v - a))
                        .collect(),
                );
                let c = cost(&mut tracker, &x);
                *vertex = (x, c);
            }
        }
    }
}
