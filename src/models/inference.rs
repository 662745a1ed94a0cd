//! Churn classifier inference

use crate::config::AppConfig;
use crate::feature_encoder::FeatureVector;
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::types::prediction::ChurnLabel;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Binary classifier over the canonical feature vector.
///
/// Loaded once at startup and shared read-only by every request.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<ChurnLabel>;
}

/// ONNX Runtime backed classifier for the exported gradient-boosted model
pub struct InferenceEngine {
    /// Running a session needs exclusive access; the model is never mutated
    model: Mutex<LoadedModel>,
    /// Churn cutoff when only probabilities are available
    decision_threshold: f64,
}

impl InferenceEngine {
    /// Create a new inference engine from configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::from_path(
            &config.model.path,
            config.model.onnx_threads,
            config.model.decision_threshold,
        )
    }

    /// Create inference engine for a specific model file
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        onnx_threads: usize,
        decision_threshold: f64,
    ) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads)?;
        let model = loader.load_model(path)?;

        info!(decision_threshold, "Inference engine initialized");

        Ok(Self {
            model: Mutex::new(model),
            decision_threshold,
        })
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    /// Run the model on one feature vector
    fn run(&self, features: &[f32]) -> Result<ChurnLabel> {
        use ort::value::Tensor;

        // Shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut model = lock_model(&self.model);
        let LoadedModel {
            session,
            input_name,
            label_output,
            probability_output,
        } = &mut *model;

        let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;

        let class = label_output
            .as_deref()
            .and_then(|name| outputs.get(name))
            .and_then(|output| output.try_extract_tensor::<i64>().ok())
            .and_then(|(_, data)| data.first().copied());

        let probability = match probability_output.as_deref().and_then(|name| outputs.get(name)) {
            Some(output) if class.is_none() => read_probability(output)?,
            _ => None,
        };
        debug!(?class, ?probability, "Read model outputs");

        decide_label(class, probability, self.decision_threshold)
            .ok_or_else(|| anyhow::anyhow!("Model returned no readable label or probability"))
    }
}

impl Classifier for InferenceEngine {
    fn predict(&self, features: &FeatureVector) -> Result<ChurnLabel> {
        self.run(features.as_slice())
    }
}

/// A panic in an earlier run poisons the lock but leaves the session usable
fn lock_model<T>(model: &Mutex<T>) -> MutexGuard<'_, T> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The integer label wins when the export has one; otherwise the churn
/// probability is compared against the threshold
fn decide_label(
    class: Option<i64>,
    probability: Option<f64>,
    threshold: f64,
) -> Option<ChurnLabel> {
    match (class, probability) {
        (Some(class), _) => Some(ChurnLabel::from_class(class)),
        (None, Some(prob)) => Some(label_from_probability(prob, threshold)),
        (None, None) => None,
    }
}

/// Strictly above the threshold is churn
fn label_from_probability(prob: f64, threshold: f64) -> ChurnLabel {
    if prob > threshold {
        ChurnLabel::Churn
    } else {
        ChurnLabel::NoChurn
    }
}

/// Churn probability from a tensor or a seq(map) output
fn read_probability(output: &ort::value::DynValue) -> Result<Option<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        if let Some(prob) = churn_probability_from_tensor(&dims, data) {
            return Ok(Some(prob));
        }
    }

    if DynSequenceValueType::can_downcast(&output.dtype()) {
        return extract_from_sequence_map(output).map(Some);
    }

    Ok(None)
}

/// Class-1 probability from a `[batch, classes]`, `[classes]` or single-value tensor
fn churn_probability_from_tensor(dims: &[i64], data: &[f32]) -> Option<f64> {
    let classes = dims.last().copied().unwrap_or(data.len() as i64);
    let value = if classes >= 2 {
        data.get(1)
    } else {
        data.first()
    };
    value.map(|&v| v as f64)
}

/// Class-1 probability from seq(map(int64, float)), as emitted by ZipMap exports
fn extract_from_sequence_map(output: &ort::value::DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

    if let Some((_, prob)) = kv_pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = kv_pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *prob as f64);
    }

    Err(anyhow::anyhow!("No probability found in map"))
}
