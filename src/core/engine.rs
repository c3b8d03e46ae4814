use super::solver::{NetCostOutcome, NetCostSearch, solve_net_cost};
use super::tax_table::{default_tax_config, resolve_tax_config};
use super::types::{
    CalculationDetails, CalculationResult, CapUsage, Costs, DonationBreakdown, Inputs, Notice,
    Objective, ObjectiveState, SanitizedInputs, TaxConfig, VoucherSplit, Warning,
};

const SPLIT_TOLERANCE: f64 = 1e-4;
const VOUCHER_USAGE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseComputation {
    pub details: CalculationDetails,
    pub cap20: f64,
    pub cap75_usage: f64,
    pub cap20_usage: f64,
}

/// Normalized employer/employee shares of the meal-voucher funding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareSplit {
    pub employee_rate: f64,
    pub employer_rate: f64,
    pub is_valid: bool,
}

impl ShareSplit {
    /// Takes percentages. A split that does not add up to 100% is flagged but
    /// still rescaled proportionally.
    pub fn from_percentages(employer_pct: f64, employee_pct: f64) -> Self {
        let employee = employee_pct / 100.0;
        let employer = employer_pct / 100.0;
        let sum = employee + employer;
        let (employee_rate, employer_rate) = if sum > 0.0 {
            (employee / sum, employer / sum)
        } else {
            (0.0, 0.0)
        };
        Self {
            employee_rate,
            employer_rate,
            is_valid: (sum - 1.0).abs() < SPLIT_TOLERANCE,
        }
    }
}

/// Net cost of a candidate annual donation, split between cash and vouchers.
#[derive(Debug, Clone, Copy)]
struct CostModel {
    config: TaxConfig,
    taxable_income: f64,
    tr_nominal: f64,
    split: ShareSplit,
}

#[derive(Debug, Clone, Copy)]
struct CostBreakdown {
    tr_used: f64,
    cash: f64,
    employee_part: f64,
    employer_part: f64,
    before_reduction: f64,
    bases: BaseComputation,
}

impl CostBreakdown {
    fn after_reduction(&self) -> f64 {
        self.before_reduction - self.bases.details.reduction
    }
}

impl CostModel {
    fn breakdown(&self, donation: f64) -> CostBreakdown {
        let tr_used = self.tr_nominal.min(donation.max(0.0));
        let cash = (donation - tr_used).max(0.0);
        let employee_part = tr_used * self.split.employee_rate;
        CostBreakdown {
            tr_used,
            cash,
            employee_part,
            employer_part: tr_used * self.split.employer_rate,
            before_reduction: cash + employee_part,
            bases: compute_bases(donation, &self.config, self.taxable_income),
        }
    }

    fn net_cost(&self, donation: f64) -> f64 {
        self.breakdown(donation).after_reduction()
    }
}

pub fn calculate(inputs: &Inputs) -> CalculationResult {
    let inputs = sanitize_inputs(inputs);
    let config = resolve_tax_config(inputs.year);
    let multiplier = inputs.frequency.multiplier();

    let split = ShareSplit::from_percentages(inputs.tr_employer_rate, inputs.tr_employee_rate);
    let tr_nominal = if inputs.expert_mode {
        inputs.tr_face_value * inputs.tr_quantity * multiplier
    } else {
        0.0
    };
    let model = CostModel {
        config,
        taxable_income: inputs.taxable_income,
        tr_nominal,
        split,
    };

    let resolution = resolve_donation(&inputs, &config, multiplier, |d| model.net_cost(d));
    let donation = resolution.donation;
    let mut warnings = resolution.warnings;

    let cost = model.breakdown(donation);
    let bases = cost.bases;
    let after_reduction = cost.after_reduction();
    let including_employer = inputs
        .expert_mode
        .then(|| round2(after_reduction + cost.employer_part));

    let mut info_messages = Vec::new();
    if bases.details.report > 0.0 {
        info_messages.push(Notice::Report);
    }
    if tr_nominal > 0.0 && cost.tr_used < tr_nominal - VOUCHER_USAGE_EPS {
        info_messages.push(Notice::TrNotFullyUsed);
    }

    if !split.is_valid && inputs.expert_mode {
        warnings.push(Warning::TrSplitInvalid);
    }
    if bases.details.base_total_before20 > bases.cap20 {
        warnings.push(Warning::Cap20Reached);
    }

    let steps = calculation_steps(donation, &config, inputs.taxable_income, &bases);

    CalculationResult {
        config,
        multiplier,
        donation: DonationBreakdown {
            total: round2(donation),
            total_periodic: round2(donation / multiplier),
            cash: round2(cost.cash),
            tr_nominal: round2(tr_nominal),
            tr_used: round2(cost.tr_used),
        },
        tr: VoucherSplit {
            enabled: inputs.expert_mode,
            face_value: inputs.tr_face_value,
            quantity: inputs.tr_quantity,
            employee_part: round2(cost.employee_part),
            employer_part: round2(cost.employer_part),
            employee_rate: split.employee_rate,
            employer_rate: split.employer_rate,
            is_split_valid: split.is_valid,
        },
        costs: Costs {
            before_reduction: round2(cost.before_reduction),
            after_reduction: round2(after_reduction),
            including_employer,
        },
        caps: CapUsage {
            cap75: config.cap75_amount,
            cap20: round2(bases.cap20),
            cap75_usage: bases.cap75_usage,
            cap20_usage: bases.cap20_usage,
        },
        details: round_details(&bases.details),
        warnings,
        info_messages,
        objective: resolution.objective,
        steps,
        inputs,
    }
}

pub fn sanitize_inputs(inputs: &Inputs) -> SanitizedInputs {
    let objective = match inputs.objective.unwrap_or(Objective::MaxAdvantage) {
        Objective::MaxAdvantage => Objective::MaxAdvantage,
        Objective::DonationTarget { amount } => Objective::DonationTarget {
            amount: non_negative(amount),
        },
        Objective::NetCostTarget { cost } => Objective::NetCostTarget {
            cost: non_negative(cost),
        },
    };

    SanitizedInputs {
        year: sanitize_year(inputs.year),
        taxable_income: non_negative(inputs.taxable_income),
        frequency: inputs.frequency,
        objective,
        expert_mode: inputs.expert_mode,
        tr_face_value: non_negative(inputs.tr_face_value),
        tr_quantity: non_negative(inputs.tr_quantity),
        tr_employer_rate: clamp_or_min(inputs.tr_employer_rate, 0.0, 100.0),
        tr_employee_rate: clamp_or_min(inputs.tr_employee_rate, 0.0, 100.0),
    }
}

fn sanitize_year(raw: f64) -> i32 {
    let rounded = raw.round();
    if !rounded.is_finite() || rounded == 0.0 {
        return default_tax_config().year;
    }
    rounded as i32
}

fn non_negative(value: f64) -> f64 {
    clamp_or_min(value, 0.0, f64::INFINITY)
}

fn clamp_or_min(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

pub fn compute_bases(donation: f64, config: &TaxConfig, taxable_income: f64) -> BaseComputation {
    let cap75 = config.cap75_amount;
    let cap20 = taxable_income * config.cap20_rate;

    let base75 = cap75.min(donation);
    let base66_theoretical = (donation - base75).max(0.0);
    let base_total_before20 = base75 + base66_theoretical;
    let base_total_retained = base_total_before20.min(cap20);
    let base66 = (base_total_retained - base75).max(0.0);
    let report = (base_total_before20 - cap20).max(0.0);
    let reduction = base75 * config.rate75 + base66 * config.rate66;

    BaseComputation {
        details: CalculationDetails {
            base75,
            base66_theoretical,
            base_total_before20,
            base_total_retained,
            base66,
            reduction,
            report,
        },
        cap20,
        cap75_usage: usage_ratio(base75, cap75),
        cap20_usage: usage_ratio(base_total_retained, cap20),
    }
}

fn usage_ratio(used: f64, cap: f64) -> f64 {
    if cap == 0.0 {
        return 0.0;
    }
    (used / cap).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
struct DonationResolution {
    donation: f64,
    objective: ObjectiveState,
    warnings: Vec<Warning>,
}

fn resolve_donation<F>(
    inputs: &SanitizedInputs,
    config: &TaxConfig,
    multiplier: f64,
    cost_at: F,
) -> DonationResolution
where
    F: Fn(f64) -> f64,
{
    let cap20 = inputs.taxable_income * config.cap20_rate;
    let mut objective = ObjectiveState::for_kind(inputs.objective.kind());
    let mut warnings = Vec::new();

    let donation = match inputs.objective {
        Objective::MaxAdvantage => cap20,
        Objective::DonationTarget { amount } => {
            let annual = amount * multiplier;
            objective.target_annual = Some(annual);
            objective.target_periodic = Some(amount);
            annual
        }
        Objective::NetCostTarget { cost } => {
            let target_annual = cost * multiplier;
            objective.target_annual = Some(target_annual);
            objective.target_periodic = Some(cost);

            let solution = solve_net_cost(
                NetCostSearch {
                    target_annual,
                    cap20,
                    taxable_income: inputs.taxable_income,
                },
                cost_at,
            );
            match solution.outcome {
                NetCostOutcome::Solved { .. } => {}
                NetCostOutcome::UnreachableHigh { max_cost } => {
                    objective.achieved = false;
                    objective.max_cost_annual = Some(max_cost);
                    warnings.push(Warning::ObjectiveUnreachable);
                }
                NetCostOutcome::UnreachableLow { min_cost } => {
                    objective.achieved = false;
                    objective.min_cost_annual = Some(min_cost);
                    warnings.push(Warning::ObjectiveUnreachableLow);
                }
            }
            solution.donation
        }
    };

    DonationResolution {
        donation,
        objective,
        warnings,
    }
}

fn calculation_steps(
    donation: f64,
    config: &TaxConfig,
    taxable_income: f64,
    bases: &BaseComputation,
) -> Vec<String> {
    let d = &bases.details;
    let cap20 = bases.cap20;
    vec![
        format!(
            "Base 75% = min({:.2}, {:.2}) = {:.2}",
            config.cap75_amount, donation, d.base75
        ),
        format!(
            "Base 66% théorique = max(0, {:.2} − {:.2}) = {:.2}",
            donation, d.base75, d.base66_theoretical
        ),
        format!(
            "Plafond global 20% = {:.2} × {:.0}% = {:.2}",
            taxable_income,
            config.cap20_rate * 100.0,
            cap20
        ),
        format!(
            "Base retenue avant 20% = {:.2} + {:.2} = {:.2}",
            d.base75, d.base66_theoretical, d.base_total_before20
        ),
        format!(
            "Base retenue après 20% = min({:.2}, {:.2}) = {:.2}",
            d.base_total_before20, cap20, d.base_total_retained
        ),
        format!(
            "Base 66% finale = max(0, {:.2} − {:.2}) = {:.2}",
            d.base_total_retained, d.base75, d.base66
        ),
        format!(
            "Réduction = {:.2} × {:.0}% + {:.2} × {:.0}% = {:.2}",
            d.base75,
            config.rate75 * 100.0,
            d.base66,
            config.rate66 * 100.0,
            d.reduction
        ),
    ]
}

fn round_details(details: &CalculationDetails) -> CalculationDetails {
    CalculationDetails {
        base75: round2(details.base75),
        base66_theoretical: round2(details.base66_theoretical),
        base_total_before20: round2(details.base_total_before20),
        base_total_retained: round2(details.base_total_retained),
        base66: round2(details.base66),
        reduction: round2(details.reduction),
        report: round2(details.report),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
