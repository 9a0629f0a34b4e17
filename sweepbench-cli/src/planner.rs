//! Sweep Planner
//!
//! Expands axis lists into the ordered sequence of configuration points.
//!
//! Ordering: fanout is the outer axis (when present) and clients the inner
//! one, each in the order given. Every point is repeated `runs` times by the
//! driver.

use crate::executor::SweepError;
use sweepbench_core::ConfigPoint;
use sweepbench_report::WorkloadColumns;

/// Validated sweep plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    /// Columns fixed for the whole sweep
    pub workload: WorkloadColumns,
    /// Client counts, in order
    pub clients: Vec<u32>,
    /// Fanout values for the two-axis sweep
    pub fanouts: Option<Vec<u32>>,
    /// Repetitions per point
    pub runs: u32,
}

/// Points sharing one fanout value (or the whole single-axis sweep)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanGroup {
    /// Fanout shared by every point, `None` for the single-axis sweep
    pub fanout: Option<u32>,
    /// Points in execution order
    pub points: Vec<ConfigPoint>,
}

impl SweepPlan {
    /// Single-axis sweep over client counts
    pub fn clients(
        workload: WorkloadColumns,
        clients: Vec<u32>,
        runs: u32,
    ) -> Result<Self, SweepError> {
        validate("clients", &clients, runs)?;
        Ok(Self {
            workload,
            clients,
            fanouts: None,
            runs,
        })
    }

    /// Two-axis sweep: every fanout value crossed with every client count
    pub fn fanout(
        workload: WorkloadColumns,
        fanouts: Vec<u32>,
        clients: Vec<u32>,
        runs: u32,
    ) -> Result<Self, SweepError> {
        validate("fanout", &fanouts, runs)?;
        validate("clients", &clients, runs)?;
        Ok(Self {
            workload,
            clients,
            fanouts: Some(fanouts),
            runs,
        })
    }

    /// Points grouped by fanout, in execution order
    pub fn groups(&self) -> Vec<PlanGroup> {
        match &self.fanouts {
            None => vec![PlanGroup {
                fanout: None,
                points: self.clients.iter().map(|&c| ConfigPoint::clients(c)).collect(),
            }],
            Some(fanouts) => fanouts
                .iter()
                .map(|&fanout| PlanGroup {
                    fanout: Some(fanout),
                    points: self
                        .clients
                        .iter()
                        .map(|&c| ConfigPoint::with_fanout(c, fanout))
                        .collect(),
                })
                .collect(),
        }
    }

    /// All points in execution order
    pub fn points(&self) -> Vec<ConfigPoint> {
        self.groups().into_iter().flat_map(|g| g.points).collect()
    }

    /// Number of benchmark executions the sweep will perform
    pub fn total_runs(&self) -> u64 {
        let fanouts = self.fanouts.as_ref().map_or(1, Vec::len) as u64;
        fanouts * self.clients.len() as u64 * u64::from(self.runs)
    }

    /// Whether this is the two-axis sweep
    pub fn is_fanout(&self) -> bool {
        self.fanouts.is_some()
    }
}

fn validate(axis: &'static str, values: &[u32], runs: u32) -> Result<(), SweepError> {
    if values.is_empty() {
        return Err(SweepError::EmptyAxis(axis));
    }
    if runs == 0 {
        return Err(SweepError::ZeroRuns);
    }
    Ok(())
}
