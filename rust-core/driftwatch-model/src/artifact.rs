// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! JSON model artifacts.
//!
//! Two model families are supported: a linear model and a tree ensemble
//! whose trees use the flat node layout exported by common random-forest
//! implementations (node 0 is the root, `x[feature] <= threshold` goes left).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ModelError, Regressor};

/// `y = intercept + Σ coefficients[i] * x[i]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    fn validate(&self) -> Result<(), ModelError> {
        if self.features.len() != self.coefficients.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} features but {} coefficients",
                self.features.len(),
                self.coefficients.len()
            )));
        }
        Ok(())
    }
}

impl Regressor for LinearModel {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    fn name(&self) -> &str {
        "linear"
    }
}

/// One node of a regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A regression tree in flat node layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Children must point forward, which also rules out cycles
    fn validate(&self, feature_count: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidArtifact("tree has no nodes".to_string()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= feature_count {
                    return Err(ModelError::InvalidArtifact(format!(
                        "node {} splits on feature {} of {}",
                        i, feature, feature_count
                    )));
                }
                for child in [left, right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(ModelError::InvalidArtifact(format!(
                            "node {} has out-of-order child {}",
                            i, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Averaging ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestModel {
    pub features: Vec<String>,
    pub trees: Vec<Tree>,
}

impl ForestModel {
    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::InvalidArtifact("forest has no trees".to_string()));
        }
        for tree in &self.trees {
            tree.validate(self.features.len())?;
        }
        Ok(())
    }
}

impl Regressor for ForestModel {
    fn features(&self) -> &[String] {
        &self.features
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    fn name(&self) -> &str {
        "forest"
    }
}

/// Model family, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Linear(LinearModel),
    Forest(ForestModel),
}

/// A model plus the metadata needed to feed it from a frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelArtifact {
    #[serde(flatten)]
    pub model: ModelSpec,
    /// Category → number maps for categorical features
    #[serde(default)]
    pub encodings: HashMap<String, HashMap<String, f64>>,
    /// Require the model to consume every schema feature
    #[serde(default)]
    pub strict: bool,
}

impl ModelArtifact {
    /// Parse and validate an artifact from JSON text
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Read, parse and validate an artifact file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let artifact = Self::from_json(&json)?;
        debug!(
            path = %path.display(),
            kind = artifact.regressor().name(),
            features = artifact.regressor().features().len(),
            "loaded model artifact"
        );
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        match &self.model {
            ModelSpec::Linear(m) => m.validate(),
            ModelSpec::Forest(m) => m.validate(),
        }
    }

    /// Borrow the model as a [`Regressor`]
    pub fn regressor(&self) -> &dyn Regressor {
        match &self.model {
            ModelSpec::Linear(m) => m,
            ModelSpec::Forest(m) => m,
        }
    }

    /// Take the model out as a shareable [`Regressor`]
    pub fn into_regressor(self) -> std::sync::Arc<dyn Regressor> {
        match self.model {
            ModelSpec::Linear(m) => std::sync::Arc::new(m),
            ModelSpec::Forest(m) => std::sync::Arc::new(m),
        }
    }
}
