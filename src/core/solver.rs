use tracing::{debug, trace};

pub const COST_TOLERANCE: f64 = 0.5;
pub const MAX_BISECTION_ITERATIONS: u32 = 80;
pub const MAX_DOUBLINGS: u32 = 32;
/// Upper bound of the search bracket, in euros per year. Keeps the bracket
/// finite when the target is close to `f64::MAX`.
pub const MAX_SEARCH_DONATION: f64 = 1e15;

#[derive(Debug, Clone, Copy)]
pub struct NetCostSearch {
    pub target_annual: f64,
    pub cap20: f64,
    pub taxable_income: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetCostOutcome {
    /// Bisection ran; `converged` is false when the iteration budget ran out
    /// before the cost landed within tolerance.
    Solved { converged: bool, iterations: u32 },
    /// Even the largest donation tried costs less than the target.
    UnreachableHigh { max_cost: f64 },
    /// A zero donation already costs more than the target.
    UnreachableLow { min_cost: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetCostSolution {
    pub donation: f64,
    pub outcome: NetCostOutcome,
}

/// Finds the annual donation whose net cost matches `search.target_annual`.
///
/// `cost_at` must be non-decreasing in the donation; the search relies on it
/// to decide which half of the bracket to keep.
pub fn solve_net_cost<F>(search: NetCostSearch, cost_at: F) -> NetCostSolution
where
    F: Fn(f64) -> f64,
{
    let target = search.target_annual;
    let low = 0.0;
    let mut high = (search.cap20 * 2.0)
        .max(target * 3.0 + 1000.0)
        .max(1000.0)
        .min(MAX_SEARCH_DONATION);

    let low_cost = cost_at(low);
    let mut high_cost = cost_at(high);

    let max_high = (search.taxable_income * 0.5 + target + 1000.0).min(MAX_SEARCH_DONATION);
    let mut doublings = 0;
    while high_cost < target && high < max_high && doublings < MAX_DOUBLINGS {
        high = (high * 2.0).min(MAX_SEARCH_DONATION);
        high_cost = cost_at(high);
        doublings += 1;
    }

    if high_cost < target {
        debug!(
            target_annual = target,
            high,
            high_cost,
            "net cost target above reachable range"
        );
        return NetCostSolution {
            donation: high,
            outcome: NetCostOutcome::UnreachableHigh {
                max_cost: high_cost,
            },
        };
    }
    if low_cost > target {
        debug!(
            target_annual = target,
            low_cost,
            "net cost target below reachable range"
        );
        return NetCostSolution {
            donation: low,
            outcome: NetCostOutcome::UnreachableLow { min_cost: low_cost },
        };
    }

    let mut lo = low;
    let mut hi = high;
    let mut donation = 0.0;
    let mut converged = false;
    let mut it = 0;
    while it < MAX_BISECTION_ITERATIONS {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let mid_cost = cost_at(mid);
        donation = mid;
        if (mid_cost - target).abs() <= COST_TOLERANCE {
            converged = true;
            break;
        }
        if mid_cost < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    trace!(
        target_annual = target,
        donation,
        iterations = it,
        converged,
        "net cost bisection finished"
    );

    NetCostSolution {
        donation: donation.max(0.0),
        outcome: NetCostOutcome::Solved {
            converged,
            iterations: it,
        },
    }
}
