// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Predictor adapter: frame in, scored frame out.

use std::collections::HashMap;
use std::sync::Arc;

use driftwatch_frame::{canonical_category, Column, ColumnKind, Frame, Schema};
use tracing::debug;

use crate::{ModelArtifact, ModelError, Regressor};

/// Applies a regressor to the feature columns of a window
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn Regressor>,
    /// (column, kind) in model feature order
    inputs: Vec<(String, ColumnKind)>,
    encodings: HashMap<String, HashMap<String, f64>>,
    prediction_column: String,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.model.name())
            .field("inputs", &self.inputs)
            .field("prediction_column", &self.prediction_column)
            .finish()
    }
}

impl Predictor {
    /// Bind a model to a schema.
    ///
    /// Every model feature must be a schema feature.
    pub fn new(model: Arc<dyn Regressor>, schema: &Schema) -> Result<Self, ModelError> {
        let mut inputs = Vec::with_capacity(model.features().len());
        for feature in model.features() {
            let is_feature = schema.features().any(|f| f == feature);
            let kind = schema
                .kind_of(feature)
                .filter(|_| is_feature)
                .ok_or_else(|| ModelError::UnknownFeature(feature.clone()))?;
            inputs.push((feature.clone(), kind));
        }

        Ok(Self {
            model,
            inputs,
            encodings: HashMap::new(),
            prediction_column: schema.prediction.clone(),
        })
    }

    /// Bind an artifact, honouring its encodings and `strict` flag
    pub fn from_artifact(artifact: ModelArtifact, schema: &Schema) -> Result<Self, ModelError> {
        if artifact.strict {
            let consumed = artifact.regressor().features();
            if let Some(unused) = schema.features().find(|f| !consumed.iter().any(|c| c == f)) {
                return Err(ModelError::UnusedFeature(unused.to_string()));
            }
        }
        let encodings = artifact.encodings.clone();
        Ok(Self::new(artifact.into_regressor(), schema)?.with_encodings(encodings))
    }

    /// Category maps per column. Keys are matched in canonical spelling,
    /// like the frame's labels.
    pub fn with_encodings(mut self, encodings: HashMap<String, HashMap<String, f64>>) -> Self {
        self.encodings = encodings
            .into_iter()
            .map(|(column, map)| {
                let map = map
                    .into_iter()
                    .map(|(label, value)| (canonical_category(&label), value))
                    .collect();
                (column, map)
            })
            .collect();
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn prediction_column(&self) -> &str {
        &self.prediction_column
    }

    /// Return a copy of `window` with the prediction column set.
    ///
    /// Non-finite model outputs are stored as missing predictions.
    pub fn predict(&self, window: &Frame) -> Result<Frame, ModelError> {
        let predictions = self.score(window)?;
        let mut scored = window.clone();
        scored.insert(self.prediction_column.clone(), Column::Numeric(predictions))?;
        Ok(scored)
    }

    /// One prediction per row of `window`, in row order
    pub fn score(&self, window: &Frame) -> Result<Vec<Option<f64>>, ModelError> {
        let matrix = self.feature_matrix(window)?;
        let predictions = self.model.predict(&matrix);
        debug!(
            model = self.model.name(),
            rows = predictions.len(),
            "scored window"
        );
        Ok(predictions
            .into_iter()
            .map(|p| p.is_finite().then_some(p))
            .collect())
    }

    fn feature_matrix(&self, window: &Frame) -> Result<Vec<Vec<f64>>, ModelError> {
        let mut matrix = vec![Vec::with_capacity(self.inputs.len()); window.len()];

        for (name, kind) in &self.inputs {
            if !window.has_column(name) {
                return Err(ModelError::MissingFeature(name.clone()));
            }
            match kind {
                ColumnKind::Numeric => {
                    for (row, cell) in window.numeric(name)?.iter().enumerate() {
                        let value = cell.filter(|v| !v.is_nan()).ok_or_else(|| {
                            ModelError::MissingValue {
                                column: name.clone(),
                                row,
                            }
                        })?;
                        matrix[row].push(value);
                    }
                }
                ColumnKind::Categorical => {
                    for (row, cell) in window.categorical(name)?.iter().enumerate() {
                        let category = cell.as_deref().ok_or_else(|| ModelError::MissingValue {
                            column: name.clone(),
                            row,
                        })?;
                        matrix[row].push(self.encode(name, category)?);
                    }
                }
            }
        }

        Ok(matrix)
    }

    fn encode(&self, column: &str, category: &str) -> Result<f64, ModelError> {
        let mapped = match self.encodings.get(column) {
            Some(map) => map.get(category).copied(),
            None => category.parse::<f64>().ok(),
        };
        mapped.ok_or_else(|| ModelError::UnencodableCategory {
            column: column.to_string(),
            value: category.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearModel;

    fn schema() -> Schema {
        Schema::new(
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
            "prediction",
            "y",
            "date",
        )
        .unwrap()
    }

    fn linear(features: &[&str], coefficients: &[f64]) -> Arc<dyn Regressor> {
        Arc::new(LinearModel {
            features: features.iter().map(|f| f.to_string()).collect(),
            coefficients: coefficients.to_vec(),
            intercept: 1.0,
        })
    }

    fn window() -> Frame {
        Frame::new(2)
            .with_column("a", Column::Numeric(vec![Some(1.0), Some(2.0)]))
            .unwrap()
            .with_column("b", Column::Numeric(vec![Some(10.0), Some(20.0)]))
            .unwrap()
            .with_column("c", Column::Categorical(vec![Some("3".into()), Some("4".into())]))
            .unwrap()
    }

    #[test]
    fn test_predict_appends_prediction_column() {
        let predictor = Predictor::new(linear(&["a", "b", "c"], &[1.0, 0.1, 2.0]), &schema()).unwrap();
        let scored = predictor.predict(&window()).unwrap();

        // 1 + a + 0.1 b + 2 c
        assert_eq!(
            scored.numeric("prediction").unwrap(),
            &[Some(1.0 + 1.0 + 1.0 + 6.0), Some(1.0 + 2.0 + 2.0 + 8.0)]
        );
        assert_eq!(scored.numeric("a").unwrap(), window().numeric("a").unwrap());
    }

    #[test]
    fn test_feature_order_follows_model() {
        let predictor = Predictor::new(linear(&["b", "a"], &[1.0, 0.0]), &schema()).unwrap();
        let scores = predictor.score(&window()).unwrap();
        assert_eq!(scores, vec![Some(11.0), Some(21.0)]);
    }

    #[test]
    fn test_unknown_feature_is_configuration_error() {
        let err = Predictor::new(linear(&["a", "zzz"], &[1.0, 1.0]), &schema()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownFeature(ref f) if f == "zzz"));
        assert!(err.is_configuration());

        // the target is in the schema but is not a feature
        let err = Predictor::new(linear(&["y"], &[1.0]), &schema()).unwrap_err();
        assert!(matches!(err, ModelError::UnknownFeature(_)));
    }

    #[test]
    fn test_strict_artifact_requires_all_features() {
        let json = r#"{"kind": "linear", "features": ["a"], "coefficients": [1.0],
                       "intercept": 0.0, "strict": true}"#;
        let artifact = ModelArtifact::from_json(json).unwrap();
        let err = Predictor::from_artifact(artifact, &schema()).unwrap_err();
        assert!(matches!(err, ModelError::UnusedFeature(ref f) if f == "b"));
    }

    #[test]
    fn test_missing_feature_column() {
        let predictor = Predictor::new(linear(&["a"], &[1.0]), &schema()).unwrap();
        let err = predictor.predict(&Frame::new(0)).unwrap_err();
        assert!(matches!(err, ModelError::MissingFeature(ref f) if f == "a"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_value_is_reported() {
        let predictor = Predictor::new(linear(&["a"], &[1.0]), &schema()).unwrap();
        let frame = Frame::new(2)
            .with_column("a", Column::Numeric(vec![Some(1.0), None]))
            .unwrap();
        let err = predictor.score(&frame).unwrap_err();
        assert!(matches!(err, ModelError::MissingValue { row: 1, .. }));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_encodings() {
        let mut map = HashMap::new();
        map.insert("c".to_string(), HashMap::from([("3".to_string(), 100.0)]));
        let predictor = Predictor::new(linear(&["c"], &[1.0]), &schema())
            .unwrap()
            .with_encodings(map);

        let err = predictor.score(&window()).unwrap_err();
        assert!(matches!(err, ModelError::UnencodableCategory { ref value, .. } if value == "4"));

        let first = window().take_rows(&[0]);
        assert_eq!(predictor.score(&first).unwrap(), vec![Some(101.0)]);
    }

    #[test]
    fn test_encoding_keys_match_any_numeric_spelling() {
        let mut map = HashMap::new();
        map.insert(
            "c".to_string(),
            HashMap::from([("3.0".to_string(), 1.0), ("4.00".to_string(), 2.0)]),
        );
        let predictor = Predictor::new(linear(&["c"], &[1.0]), &schema())
            .unwrap()
            .with_encodings(map);

        // intercept 1 plus the encoded label
        assert_eq!(predictor.score(&window()).unwrap(), vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_non_finite_prediction_is_missing() {
        let predictor = Predictor::new(linear(&["a"], &[f64::INFINITY]), &schema()).unwrap();
        let frame = Frame::new(2)
            .with_column("a", Column::Numeric(vec![Some(1.0), Some(0.0)]))
            .unwrap();
        // inf * 1 = inf, inf * 0 = NaN
        assert_eq!(predictor.score(&frame).unwrap(), vec![None, None]);
    }

    #[test]
    fn test_empty_window() {
        let predictor = Predictor::new(linear(&["a"], &[1.0]), &schema()).unwrap();
        let frame = Frame::new(0)
            .with_column("a", Column::Numeric(vec![]))
            .unwrap();
        let scored = predictor.predict(&frame).unwrap();
        assert_eq!(scored.len(), 0);
        assert!(scored.has_column("prediction"));
    }
}
