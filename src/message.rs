//! Turns a classification result into reply text.

use crate::classifier::ClassificationResult;
use crate::error::ComposeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait MessageComposer: Send + Sync {
    fn compose(&self, result: &ClassificationResult) -> Result<String, ComposeError>;
}

/// Reply templates for one predicted label.
///
/// `{label}` and `{confidence}` are substituted; confidence renders as a
/// percentage, e.g. `93.0%`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTemplate {
    pub text: String,
    /// Used instead of `text` when the confidence is below the threshold.
    #[serde(default)]
    pub unsure: Option<String>,
}

impl LabelTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            unsure: None,
        }
    }

    pub fn with_unsure(mut self, unsure: impl Into<String>) -> Self {
        self.unsure = Some(unsure.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct TemplateComposer {
    labels: BTreeMap<String, LabelTemplate>,
    fallback: Option<String>,
    unsure_threshold: f64,
}

impl TemplateComposer {
    pub fn new(
        labels: BTreeMap<String, LabelTemplate>,
        fallback: Option<String>,
        unsure_threshold: f64,
    ) -> Self {
        Self {
            labels,
            fallback,
            unsure_threshold,
        }
    }
}

impl MessageComposer for TemplateComposer {
    fn compose(&self, result: &ClassificationResult) -> Result<String, ComposeError> {
        let confidence = parse_confidence(&result.confidence)?;

        let template = match self.labels.get(&result.pred) {
            Some(label) if confidence < self.unsure_threshold => {
                label.unsure.as_deref().unwrap_or(&label.text)
            }
            Some(label) => label.text.as_str(),
            None => self
                .fallback
                .as_deref()
                .ok_or_else(|| ComposeError::UnknownLabel(result.pred.clone()))?,
        };

        Ok(render(template, &result.pred, confidence))
    }
}

fn parse_confidence(raw: &str) -> Result<f64, ComposeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|c| (0.0..=1.0).contains(c))
        .ok_or_else(|| ComposeError::InvalidConfidence(raw.to_string()))
}

fn render(template: &str, label: &str, confidence: f64) -> String {
    template
        .replace("{label}", label)
        .replace("{confidence}", &format!("{:.1}%", confidence * 100.0))
}
