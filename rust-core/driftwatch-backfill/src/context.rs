// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Preloaded, read-only run state.
//!
//! The reference snapshot, the predictor and the raw historical data are
//! loaded once and shared by every bucket.

use std::sync::Arc;

use driftwatch_frame::{Column, CsvSource, Frame, FrameError, ReferenceSnapshot, Schema};
use driftwatch_model::{ModelArtifact, ModelError, Predictor};
use tracing::{debug, info};

use crate::config::{BackfillConfig, ConfigError};
use crate::error::BackfillError;

/// Everything a bucket needs besides its own rows
#[derive(Debug, Clone)]
pub struct MonitoringContext {
    schema: Arc<Schema>,
    reference: ReferenceSnapshot,
    predictor: Predictor,
    data: Arc<Frame>,
    fill_missing_with_zero: bool,
}

impl MonitoringContext {
    /// Assemble a context from frames already in memory.
    ///
    /// A reference without a prediction column is scored here, once. The
    /// fill policy is applied to a scoring copy only, so the reference
    /// feature values used for drift stay as loaded.
    pub fn new(
        schema: Schema,
        mut reference: Frame,
        data: Frame,
        predictor: Predictor,
        fill_missing_with_zero: bool,
    ) -> Result<Self, ConfigError> {
        schema.validate()?;
        if predictor.prediction_column() != schema.prediction {
            return Err(ConfigError::Invalid(format!(
                "predictor writes {} but the schema expects {}",
                predictor.prediction_column(),
                schema.prediction
            )));
        }
        if data.timestamps().is_none() {
            return Err(FrameError::MissingColumn(schema.timestamp.clone()).into());
        }
        data.require_columns([schema.target.as_str()])?;

        if !reference.has_column(&schema.prediction) {
            let mut scoring = reference.clone();
            if fill_missing_with_zero {
                scoring.fill_missing_with_zero();
            }
            let predictions = predictor.score(&scoring)?;
            reference.insert(schema.prediction.clone(), Column::Numeric(predictions))?;
            debug!(rows = reference.len(), "scored reference data");
        }

        let schema = Arc::new(schema);
        let reference = ReferenceSnapshot::new(schema.clone(), reference)?;

        Ok(Self {
            schema,
            reference,
            predictor,
            data: Arc::new(data),
            fill_missing_with_zero,
        })
    }

    /// Load reference data, historical data and the model named by `config`
    pub async fn load(config: &BackfillConfig) -> Result<Self, BackfillError> {
        let schema = config.schema.clone();

        let reference = CsvSource::new(&config.reference_path)
            .load(&schema)
            .await
            .map_err(|e| BackfillError::from_frame(&config.reference_path, e))?;
        let data = CsvSource::new(&config.data_path)
            .load(&schema)
            .await
            .map_err(|e| BackfillError::from_frame(&config.data_path, e))?;

        let artifact = ModelArtifact::from_path(&config.model_path).map_err(|e| match e {
            ModelError::Io(source) => BackfillError::Io {
                path: config.model_path.clone(),
                source,
            },
            other => ConfigError::Model(other).into(),
        })?;
        let predictor = Predictor::from_artifact(artifact, &schema).map_err(ConfigError::from)?;

        info!(
            reference_rows = reference.len(),
            data_rows = data.len(),
            model = predictor.model_name(),
            "loaded monitoring inputs"
        );

        Ok(Self::new(
            schema,
            reference,
            data,
            predictor,
            config.fill_missing_with_zero,
        )?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn reference(&self) -> &ReferenceSnapshot {
        &self.reference
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// Full historical dataset, in source order
    pub fn data(&self) -> &Frame {
        &self.data
    }

    pub fn fill_missing_with_zero(&self) -> bool {
        self.fill_missing_with_zero
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use driftwatch_model::LinearModel;

    fn schema() -> Schema {
        Schema::new(vec!["x".to_string()], vec![], "prediction", "y", "date").unwrap()
    }

    fn predictor(schema: &Schema) -> Predictor {
        let model = LinearModel {
            features: vec!["x".to_string()],
            coefficients: vec![2.0],
            intercept: 0.0,
        };
        Predictor::new(Arc::new(model), schema).unwrap()
    }

    fn data() -> Frame {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Frame::with_timestamps((0..3).map(|h| start + Duration::hours(h)).collect())
            .with_column("x", Column::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]))
            .unwrap()
            .with_column("y", Column::Numeric(vec![Some(2.0), Some(4.0), Some(6.0)]))
            .unwrap()
    }

    #[test]
    fn test_reference_is_scored_on_a_filled_copy() {
        let schema = schema();
        let reference = Frame::new(2)
            .with_column("x", Column::Numeric(vec![Some(1.5), None]))
            .unwrap();

        let context =
            MonitoringContext::new(schema.clone(), reference, data(), predictor(&schema), true)
                .unwrap();

        let frame = context.reference().frame();
        assert_eq!(frame.numeric("prediction").unwrap(), &[Some(3.0), Some(0.0)]);
        // stored feature values keep their missing cell
        assert_eq!(frame.numeric("x").unwrap(), &[Some(1.5), None]);
    }

    #[test]
    fn test_reference_missing_values_without_fill() {
        let schema = schema();
        let reference = Frame::new(1)
            .with_column("x", Column::Numeric(vec![None]))
            .unwrap();

        let err = MonitoringContext::new(schema.clone(), reference, data(), predictor(&schema), false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Model(ModelError::MissingValue { .. })));
    }

    #[test]
    fn test_existing_reference_predictions_are_kept() {
        let schema = schema();
        let reference = Frame::new(1)
            .with_column("x", Column::Numeric(vec![Some(1.0)]))
            .unwrap()
            .with_column("prediction", Column::Numeric(vec![Some(42.0)]))
            .unwrap();

        let context =
            MonitoringContext::new(schema.clone(), reference, data(), predictor(&schema), true)
                .unwrap();
        assert_eq!(
            context.reference().frame().numeric("prediction").unwrap(),
            &[Some(42.0)]
        );
    }

    #[test]
    fn test_data_needs_timestamps_and_target() {
        let schema = schema();
        let reference = Frame::new(1)
            .with_column("x", Column::Numeric(vec![Some(1.0)]))
            .unwrap();

        let untimed = Frame::new(1)
            .with_column("x", Column::Numeric(vec![Some(1.0)]))
            .unwrap()
            .with_column("y", Column::Numeric(vec![Some(1.0)]))
            .unwrap();
        let err = MonitoringContext::new(
            schema.clone(),
            reference.clone(),
            untimed,
            predictor(&schema),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Frame(FrameError::MissingColumn(ref c)) if c == "date"));

        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let no_target = Frame::with_timestamps(vec![start])
            .with_column("x", Column::Numeric(vec![Some(1.0)]))
            .unwrap();
        let err = MonitoringContext::new(schema.clone(), reference, no_target, predictor(&schema), true)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Frame(FrameError::MissingColumn(ref c)) if c == "y"));
    }
}
