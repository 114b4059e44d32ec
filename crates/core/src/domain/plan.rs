use serde::{Deserialize, Serialize};

use super::scalar::{opt_string_or_number, string_list};

/// Risk tag the simulator reserves for plans that exceed the available budget.
pub const OVER_BUDGET_RISK: &str = "OVER_BUDGET";

/// Output of the plan call.
///
/// `plan` is opaque to the client and is passed through unmodified to the
/// simulate and execute calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    #[serde(default)]
    pub plan: serde_json::Value,
    #[serde(default, alias = "missingFields", deserialize_with = "string_list")]
    pub missing_fields: Vec<String>,
    #[serde(default, alias = "preview_summary", alias = "previewSummary")]
    pub preview: String,
    #[serde(default, deserialize_with = "string_list")]
    pub warnings: Vec<String>,
    #[serde(default, alias = "planHash", skip_serializing_if = "Option::is_none")]
    pub plan_hash: Option<String>,
}

impl PlanResult {
    pub fn new(plan: serde_json::Value) -> Self {
        Self {
            plan,
            missing_fields: Vec::new(),
            preview: String::new(),
            warnings: Vec::new(),
            plan_hash: None,
        }
    }

    pub fn with_missing_fields(mut self, fields: Vec<String>) -> Self {
        self.missing_fields = fields;
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = preview.into();
        self
    }

    /// A plan is complete when the planner reports no missing required fields.
    pub fn is_complete(&self) -> bool {
        self.missing_fields.is_empty()
    }
}

/// Output of the simulate call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(
        default,
        alias = "est_budget",
        alias = "estBudget",
        deserialize_with = "opt_string_or_number"
    )]
    pub budget: Option<String>,
    #[serde(
        default,
        alias = "est_fees",
        alias = "estFees",
        deserialize_with = "opt_string_or_number"
    )]
    pub fees: Option<String>,
    #[serde(
        default,
        alias = "est_burn",
        alias = "estBurn",
        deserialize_with = "opt_string_or_number"
    )]
    pub burn: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub risks: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub blockers: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub confirmations: Vec<String>,
}

impl SimulationResult {
    /// Execution must not proceed when the simulator reports any blocker or
    /// flags the plan as over budget.
    pub fn is_blocking(&self) -> bool {
        !self.blockers.is_empty() || self.is_over_budget()
    }

    pub fn is_over_budget(&self) -> bool {
        self.risks
            .iter()
            .any(|risk| risk.eq_ignore_ascii_case(OVER_BUDGET_RISK))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_result_completeness() {
        let plan = PlanResult::new(json!({"kind": "label"}));
        assert!(plan.is_complete());

        let plan = plan.with_missing_fields(vec!["deadline".to_string()]);
        assert!(!plan.is_complete());
    }

    #[test]
    fn test_plan_result_decodes_wire_aliases() {
        let plan: PlanResult = serde_json::from_value(json!({
            "plan": {"reward": "45"},
            "missing_fields": null,
            "preview_summary": "Label 500 images",
            "planHash": "0xplan"
        }))
        .unwrap();

        assert!(plan.is_complete());
        assert_eq!(plan.preview, "Label 500 images");
        assert_eq!(plan.plan_hash.as_deref(), Some("0xplan"));
        assert_eq!(plan.plan["reward"], "45");
    }

    #[test]
    fn test_simulation_blocking_rules() {
        let clear = SimulationResult::default();
        assert!(!clear.is_blocking());

        let blocked = SimulationResult {
            blockers: vec!["DEADLINE_TOO_SHORT".to_string()],
            ..Default::default()
        };
        assert!(blocked.is_blocking());

        let over_budget = SimulationResult {
            risks: vec!["over_budget".to_string()],
            ..Default::default()
        };
        assert!(over_budget.is_blocking());
        assert!(over_budget.is_over_budget());

        let risky = SimulationResult {
            risks: vec!["LOW_REWARD".to_string()],
            ..Default::default()
        };
        assert!(!risky.is_blocking());
    }

    #[test]
    fn test_simulation_accepts_numeric_amounts() {
        let sim: SimulationResult = serde_json::from_value(json!({
            "est_budget": 45,
            "est_fees": "0.9",
            "risks": [],
            "blockers": [],
            "confirmations": ["Reward escrowed"]
        }))
        .unwrap();

        assert_eq!(sim.budget.as_deref(), Some("45"));
        assert_eq!(sim.fees.as_deref(), Some("0.9"));
        assert!(sim.burn.is_none());
        assert_eq!(sim.confirmations.len(), 1);
    }
}
