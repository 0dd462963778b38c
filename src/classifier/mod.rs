pub mod http;

use crate::error::ClassifierError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpClassifier;

/// Prediction returned by the remote image classifier.
///
/// Both fields arrive as strings; the confidence is only parsed when the
/// reply text is composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub pred: String,
    pub confidence: String,
}

impl ClassificationResult {
    pub fn new(pred: impl Into<String>, confidence: impl Into<String>) -> Self {
        Self {
            pred: pred.into(),
            confidence: confidence.into(),
        }
    }
}

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn predict(&self, image: Vec<u8>) -> Result<ClassificationResult, ClassifierError>;
}
