use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Frequency {
    #[default]
    Once,
    Monthly,
}

impl Frequency {
    /// Anything other than `monthly` is treated as a one-off donation.
    pub fn from_label(label: &str) -> Self {
        if label == "monthly" {
            Frequency::Monthly
        } else {
            Frequency::Once
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Frequency::Once => 1.0,
            Frequency::Monthly => 12.0,
        }
    }
}

impl From<String> for Frequency {
    fn from(value: String) -> Self {
        Frequency::from_label(&value)
    }
}

/// What the donor is trying to achieve. Amounts are per period
/// (per donation for `once`, per month for `monthly`).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Objective {
    MaxAdvantage,
    DonationTarget {
        #[serde(default)]
        amount: f64,
    },
    NetCostTarget {
        #[serde(default)]
        cost: f64,
    },
}

impl Objective {
    /// The objective of the given kind with a zero target.
    pub fn from_kind(kind: ObjectiveKind) -> Self {
        match kind {
            ObjectiveKind::MaxAdvantage => Objective::MaxAdvantage,
            ObjectiveKind::DonationTarget => Objective::DonationTarget { amount: 0.0 },
            ObjectiveKind::NetCostTarget => Objective::NetCostTarget { cost: 0.0 },
        }
    }

    pub fn kind(&self) -> ObjectiveKind {
        match self {
            Objective::MaxAdvantage => ObjectiveKind::MaxAdvantage,
            Objective::DonationTarget { .. } => ObjectiveKind::DonationTarget,
            Objective::NetCostTarget { .. } => ObjectiveKind::NetCostTarget,
        }
    }

    /// Replaces the target of the matching variant. `amount` only applies to
    /// a donation target and `cost` only to a net-cost target.
    pub fn with_targets(self, amount: Option<f64>, cost: Option<f64>) -> Self {
        match self {
            Objective::MaxAdvantage => Objective::MaxAdvantage,
            Objective::DonationTarget { amount: current } => Objective::DonationTarget {
                amount: amount.unwrap_or(current),
            },
            Objective::NetCostTarget { cost: current } => Objective::NetCostTarget {
                cost: cost.unwrap_or(current),
            },
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    MaxAdvantage,
    DonationTarget,
    NetCostTarget,
}

/// Caller-supplied record, before sanitization. Every field may be out of
/// range; `calculate` clamps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Inputs {
    pub year: f64,
    pub taxable_income: f64,
    pub frequency: Frequency,
    pub objective: Option<Objective>,
    pub expert_mode: bool,
    pub tr_face_value: f64,
    pub tr_quantity: f64,
    /// Percentage, 0-100.
    pub tr_employer_rate: f64,
    /// Percentage, 0-100.
    pub tr_employee_rate: f64,
}

impl Inputs {
    /// Layers command-line or query overrides onto the objective. A kind that
    /// differs from the current one starts from a zero target; the same kind
    /// keeps its target unless `amount`/`cost` replaces it.
    pub fn override_objective(
        &mut self,
        kind: Option<ObjectiveKind>,
        amount: Option<f64>,
        cost: Option<f64>,
    ) {
        if let Some(kind) = kind {
            if self.objective.map(|o| o.kind()) != Some(kind) {
                self.objective = Some(Objective::from_kind(kind));
            }
        }
        self.objective = self.objective.map(|o| o.with_targets(amount, cost));
    }
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            year: 2025.0,
            taxable_income: 0.0,
            frequency: Frequency::Once,
            objective: Some(Objective::MaxAdvantage),
            expert_mode: false,
            tr_face_value: 8.5,
            tr_quantity: 0.0,
            tr_employer_rate: 60.0,
            tr_employee_rate: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedInputs {
    pub year: i32,
    pub taxable_income: f64,
    pub frequency: Frequency,
    pub objective: Objective,
    pub expert_mode: bool,
    pub tr_face_value: f64,
    pub tr_quantity: f64,
    pub tr_employer_rate: f64,
    pub tr_employee_rate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxConfig {
    pub year: i32,
    pub cap75_amount: f64,
    pub cap20_rate: f64,
    pub rate75: f64,
    pub rate66: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    ObjectiveUnreachable,
    ObjectiveUnreachableLow,
    TrSplitInvalid,
    Cap20Reached,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Report,
    TrNotFullyUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationBreakdown {
    pub total: f64,
    pub total_periodic: f64,
    pub cash: f64,
    pub tr_nominal: f64,
    pub tr_used: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSplit {
    pub enabled: bool,
    pub face_value: f64,
    pub quantity: f64,
    pub employee_part: f64,
    pub employer_part: f64,
    pub employee_rate: f64,
    pub employer_rate: f64,
    pub is_split_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Costs {
    pub before_reduction: f64,
    pub after_reduction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub including_employer: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapUsage {
    pub cap75: f64,
    pub cap20: f64,
    pub cap75_usage: f64,
    pub cap20_usage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationDetails {
    pub base75: f64,
    pub base66_theoretical: f64,
    pub base_total_before20: f64,
    pub base_total_retained: f64,
    pub base66: f64,
    pub reduction: f64,
    pub report: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveState {
    #[serde(rename = "type")]
    pub kind: ObjectiveKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_annual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_periodic: Option<f64>,
    pub achieved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cost_annual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_annual: Option<f64>,
}

impl ObjectiveState {
    pub fn for_kind(kind: ObjectiveKind) -> Self {
        Self {
            kind,
            target_annual: None,
            target_periodic: None,
            achieved: true,
            min_cost_annual: None,
            max_cost_annual: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub inputs: SanitizedInputs,
    pub config: TaxConfig,
    pub multiplier: f64,
    pub donation: DonationBreakdown,
    pub tr: VoucherSplit,
    pub costs: Costs,
    pub caps: CapUsage,
    pub details: CalculationDetails,
    pub warnings: Vec<Warning>,
    pub info_messages: Vec<Notice>,
    pub objective: ObjectiveState,
    pub steps: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs_with(objective: Option<Objective>) -> Inputs {
        Inputs {
            objective,
            ..Inputs::default()
        }
    }

    #[test]
    fn amount_replaces_existing_donation_target() {
        let mut inputs = inputs_with(Some(Objective::DonationTarget { amount: 500.0 }));
        inputs.override_objective(None, Some(700.0), None);
        assert_eq!(
            inputs.objective,
            Some(Objective::DonationTarget { amount: 700.0 })
        );
    }

    #[test]
    fn cost_does_not_touch_donation_target() {
        let mut inputs = inputs_with(Some(Objective::DonationTarget { amount: 500.0 }));
        inputs.override_objective(None, None, Some(90.0));
        assert_eq!(
            inputs.objective,
            Some(Objective::DonationTarget { amount: 500.0 })
        );
    }

    #[test]
    fn same_kind_keeps_target_and_new_kind_starts_from_zero() {
        let mut inputs = inputs_with(Some(Objective::NetCostTarget { cost: 250.0 }));
        inputs.override_objective(Some(ObjectiveKind::NetCostTarget), None, None);
        assert_eq!(inputs.objective, Some(Objective::NetCostTarget { cost: 250.0 }));

        inputs.override_objective(Some(ObjectiveKind::DonationTarget), None, None);
        assert_eq!(
            inputs.objective,
            Some(Objective::DonationTarget { amount: 0.0 })
        );
    }

    #[test]
    fn targets_are_ignored_for_max_advantage() {
        let mut inputs = Inputs::default();
        inputs.override_objective(None, Some(700.0), Some(90.0));
        assert_eq!(inputs.objective, Some(Objective::MaxAdvantage));
    }
}
