//! The loaded prediction pipeline: artifact deserialization, feature encoding,
//! classification and probability estimation.
//!
//! The artifact is produced offline by the training side; this module only
//! consumes it. The schema mirrors what the trainer exports: an ordered list of
//! feature specs (how each raw column is encoded) and the fitted logistic
//! regression over the encoded columns.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// One input row, as it arrives from the JSON body.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("record {row} is not a JSON object")]
    NotAnObject { row: usize },

    #[error("record {row} is missing feature '{name}'")]
    MissingFeature { row: usize, name: String },

    #[error("feature '{name}' in record {row} has the wrong type (expected {expected})")]
    WrongType {
        row: usize,
        name: String,
        expected: &'static str,
    },

    #[error("feature '{name}' in record {row} has unseen category '{value}'")]
    UnseenCategory {
        row: usize,
        name: String,
        value: String,
    },
}

/// How one raw feature maps onto encoded model columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum FeatureSpec {
    /// Standardized numeric column: `(x - mean) / std`.
    Numeric { name: String, mean: f64, std: f64 },
    /// One-hot encoded categorical column. A value outside `categories`
    /// fails the batch, matching the trainer's strict encoder.
    Categorical { name: String, categories: Vec<String> },
}

impl FeatureSpec {
    fn name(&self) -> &str {
        match self {
            FeatureSpec::Numeric { name, .. } => name,
            FeatureSpec::Categorical { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            FeatureSpec::Numeric { .. } => 1,
            FeatureSpec::Categorical { categories, .. } => categories.len(),
        }
    }

    fn encode_into(&self, row: usize, record: &Record, out: &mut Vec<f64>) -> Result<(), PipelineError> {
        let value = record.get(self.name()).ok_or_else(|| PipelineError::MissingFeature {
            row,
            name: self.name().to_string(),
        })?;

        match self {
            FeatureSpec::Numeric { name, mean, std } => {
                let x = value.as_f64().ok_or_else(|| PipelineError::WrongType {
                    row,
                    name: name.clone(),
                    expected: "number",
                })?;
                out.push((x - mean) / std);
            }
            FeatureSpec::Categorical { name, categories } => {
                let s = value.as_str().ok_or_else(|| PipelineError::WrongType {
                    row,
                    name: name.clone(),
                    expected: "string",
                })?;
                let hit = categories.iter().position(|c| c == s).ok_or_else(|| {
                    PipelineError::UnseenCategory {
                        row,
                        name: name.clone(),
                        value: s.to_string(),
                    }
                })?;
                for i in 0..categories.len() {
                    out.push(if i == hit { 1.0 } else { 0.0 });
                }
            }
        }
        Ok(())
    }
}

/// Fitted logistic regression over the encoded columns.
#[derive(Debug, Clone, Deserialize)]
struct LogisticModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    fn positive_probability(&self, encoded: &[f64]) -> f64 {
        let logit: f64 = self
            .weights
            .iter()
            .zip(encoded)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        1.0 / (1.0 + (-logit).exp())
    }
}

/// Pre-trained credit default pipeline. Loaded once at startup and never
/// mutated afterwards, so sharing it read-only across workers is safe.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    features: Vec<FeatureSpec>,
    model: LogisticModel,
}

impl Pipeline {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| anyhow::anyhow!("cannot open pipeline artifact {:?}: {}", path.as_ref(), e))?;
        let pipeline: Pipeline = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("cannot parse pipeline artifact {:?}: {}", path.as_ref(), e))?;

        let expected: usize = pipeline.features.iter().map(FeatureSpec::width).sum();
        if expected != pipeline.model.weights.len() {
            anyhow::bail!(
                "pipeline artifact is inconsistent: {} encoded columns but {} weights",
                expected,
                pipeline.model.weights.len()
            );
        }
        Ok(pipeline)
    }

    fn encode(&self, row: usize, record: &Record) -> Result<Vec<f64>, PipelineError> {
        let mut encoded = Vec::with_capacity(self.model.weights.len());
        for spec in &self.features {
            spec.encode_into(row, record, &mut encoded)?;
        }
        Ok(encoded)
    }

    /// Predicted class label per record, input order preserved.
    pub fn classify(&self, records: &[Record]) -> Result<Vec<usize>, PipelineError> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let p1 = self.model.positive_probability(&self.encode(i, r)?);
                Ok(usize::from(p1 >= 0.5))
            })
            .collect()
    }

    /// Per-class probability vector `[p0, p1]` per record, input order preserved.
    pub fn predict_proba(&self, records: &[Record]) -> Result<Vec<Vec<f64>>, PipelineError> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let p1 = self.model.positive_probability(&self.encode(i, r)?);
                Ok(vec![1.0 - p1, p1])
            })
            .collect()
    }
}

/// Small three-feature pipeline used by handler and pipeline tests.
#[cfg(test)]
pub(crate) fn test_pipeline() -> Pipeline {
    serde_json::from_value(serde_json::json!({
        "features": [
            { "type": "categorical", "name": "status", "categories": ["no_checking_account", "positive_balance"] },
            { "type": "numeric", "name": "duration", "mean": 20.0, "std": 12.0 },
            { "type": "numeric", "name": "age", "mean": 35.0, "std": 11.0 }
        ],
        "model": {
            "weights": [0.8, -0.6, 0.05, -0.02],
            "intercept": -0.3
        }
    }))
    .unwrap()
}
