mod engine;
mod solver;
mod tax_table;
mod types;

pub use engine::{BaseComputation, ShareSplit, calculate, compute_bases, round2, sanitize_inputs};
pub use solver::{NetCostOutcome, NetCostSearch, NetCostSolution, solve_net_cost};
pub use tax_table::{default_tax_config, resolve_tax_config, tax_configs};
pub use types::{
    CalculationDetails, CalculationResult, CapUsage, Costs, DonationBreakdown, Frequency, Inputs,
    Notice, Objective, ObjectiveKind, ObjectiveState, SanitizedInputs, TaxConfig, VoucherSplit,
    Warning,
};
