use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::ballistics::{Solution, Trajectory};
use crate::table::RangeTableStore;

pub const DEFAULT_SOLUTION_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct FiringQuery {
    pub weapon: String,
    pub trajectory: Trajectory,
    pub distance: f64,
    /// Altitude difference in meters, already signed by the caller's convention.
    pub altitude_delta: f64,
}

impl FiringQuery {
    pub fn new(weapon: impl Into<String>, trajectory: Trajectory, distance: f64, altitude_delta: f64) -> Self {
        Self {
            weapon: weapon.into(),
            trajectory,
            distance,
            altitude_delta,
        }
    }
}

/// Which charges to try for one trajectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargePlan {
    Charges(Vec<u32>),
    /// The weapon is configured to never fire this trajectory.
    Unsupported,
    /// No tables on disk.
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "solutions", rename_all = "snake_case")]
pub enum TrajectoryOutcome {
    Solutions(Vec<Solution>),
    Unsupported,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireSolutions {
    pub weapon: String,
    pub distance: f64,
    pub altitude_delta: f64,
    pub low: TrajectoryOutcome,
    pub high: TrajectoryOutcome,
}

impl FireSolutions {
    pub fn outcome(&self, trajectory: Trajectory) -> &TrajectoryOutcome {
        match trajectory {
            Trajectory::Low => &self.low,
            Trajectory::High => &self.high,
        }
    }
}

/// Walks the charges of a weapon and interpolates a solution for each one
/// whose table covers the requested distance.
#[derive(Clone)]
pub struct SolutionFinder {
    store: Arc<RangeTableStore>,
}

impl SolutionFinder {
    pub fn new(store: Arc<RangeTableStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RangeTableStore {
        &self.store
    }

    /// Returns at most `limit` solutions in charge iteration order.
    ///
    /// `charges` overrides discovery and is tried in the order given. Missing
    /// tables and tables that do not cover the distance are skipped; an empty
    /// result is the only failure signal.
    pub fn find_solutions(&self, query: &FiringQuery, limit: usize, charges: Option<&[u32]>) -> Vec<Solution> {
        let mut solutions = Vec::new();
        if limit == 0 {
            return solutions;
        }

        let discovered;
        let charges = match charges {
            Some(charges) => charges,
            None => {
                discovered = match self.store.available_charges(&query.weapon, query.trajectory) {
                    Ok(charges) => charges,
                    Err(e) => {
                        warn!("charge discovery failed for {} {}: {e}", query.weapon, query.trajectory);
                        Vec::new()
                    }
                };
                &discovered
            }
        };

        for &charge in charges {
            let table = match self.store.load_rows(&query.weapon, query.trajectory, charge) {
                Ok(table) => table,
                Err(e) if e.is_not_found() => {
                    debug!("skipping charge {charge}: {e}");
                    continue;
                }
                Err(e) => {
                    warn!("skipping charge {charge}: {e}");
                    continue;
                }
            };
            if !table.supports_range(query.distance) {
                debug!("charge {charge} does not cover {} m", query.distance);
                continue;
            }
            match table.calculate(query.distance, query.altitude_delta) {
                Ok(solution) => solutions.push(solution),
                Err(e) => {
                    debug!("skipping charge {charge}: {e}");
                    continue;
                }
            }
            if solutions.len() >= limit {
                break;
            }
        }
        solutions
    }

    pub fn find_solution(&self, query: &FiringQuery) -> Option<Solution> {
        self.find_solutions(query, 1, None).into_iter().next()
    }

    /// Configured override for the weapon if any, otherwise the charges on disk.
    pub fn resolve_charges(&self, weapon: &str, trajectory: Trajectory) -> ChargePlan {
        if let Some(charges) = self.store.registry().charges_override(weapon, trajectory) {
            return if charges.is_empty() {
                ChargePlan::Unsupported
            } else {
                ChargePlan::Charges(charges.to_vec())
            };
        }
        match self.store.available_charges(weapon, trajectory) {
            Ok(charges) if !charges.is_empty() => ChargePlan::Charges(charges),
            Ok(_) => ChargePlan::NoData,
            Err(e) => {
                warn!("charge discovery failed for {weapon} {trajectory}: {e}");
                ChargePlan::NoData
            }
        }
    }

    /// Solutions for one trajectory using the weapon's configured charges.
    pub fn solve_trajectory(
        &self,
        weapon: &str,
        trajectory: Trajectory,
        distance: f64,
        altitude_delta: f64,
        limit: usize,
    ) -> TrajectoryOutcome {
        match self.resolve_charges(weapon, trajectory) {
            ChargePlan::Charges(charges) => {
                let query = FiringQuery::new(weapon, trajectory, distance, altitude_delta);
                TrajectoryOutcome::Solutions(self.find_solutions(&query, limit, Some(&charges)))
            }
            ChargePlan::Unsupported => TrajectoryOutcome::Unsupported,
            ChargePlan::NoData => TrajectoryOutcome::NoData,
        }
    }

    /// Low and high trajectory solutions for one target.
    pub fn solve(&self, weapon: &str, distance: f64, altitude_delta: f64, limit: usize) -> FireSolutions {
        FireSolutions {
            weapon: weapon.to_string(),
            distance,
            altitude_delta,
            low: self.solve_trajectory(weapon, Trajectory::Low, distance, altitude_delta, limit),
            high: self.solve_trajectory(weapon, Trajectory::High, distance, altitude_delta, limit),
        }
    }
}
