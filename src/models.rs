use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One prediction, as returned to the caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub confidence: String,
    pub outcome: String,
}

impl PredictionResponse {
    /// Builds a response from a predicted label and the probability the
    /// pipeline assigned to that label.
    pub fn new(label: usize, probability: f64) -> Self {
        PredictionResponse {
            confidence: format!("{:.2}%", probability * 100.0),
            outcome: outcome_label(label).to_string(),
        }
    }
}

/// Label 0 means the applicant repays; anything non-zero is treated as a
/// default. The mapping is deliberately permissive about labels above 1.
pub fn outcome_label(label: usize) -> &'static str {
    if label == 0 {
        "Likely to pay back"
    } else {
        "Likely to default (not pay back)"
    }
}

/// Documentation object served on `GET /predict`.
pub fn predict_info() -> Value {
    json!({
        "message": "Please send a POST request to this endpoint with a JSON body to get the prediction",
        "example_payload": {
            "status": "no_checking_account",
            "duration": 60,
            "credit_history": "critical_account_other_credits_existing",
            "purpose": "retraining",
            "amount": 10000,
            "savings": "unknown_no_savings_account",
            "employment_duration": "unemployed",
            "installment_rate": 6,
            "personal_status_sex": "male_single",
            "other_debtors": "guarantor",
            "present_residence": 1,
            "property": "unknown_no_property",
            "age": 25,
            "other_installment_plans": "bank",
            "housing": "rent",
            "number_credits": 5,
            "job": "unemployed_unskilled_non_resident",
            "people_liable": 6,
            "telephone": "yes",
            "foreign_worker": "yes"
        }
    })
}
