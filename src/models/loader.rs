//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loaded ONNX classifier with resolved input/output names
pub struct LoadedModel {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Integer class label output, when the export carries one
    pub label_output: Option<String>,
    /// Class probability output, when the export carries one
    pub probability_output: Option<String>,
}

/// Loader for the churn classifier artifact
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load the classifier from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "features".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let (label_output, probability_output) = resolve_outputs(&output_names);

        if label_output.is_none() && probability_output.is_none() {
            anyhow::bail!(
                "Model {} exposes no label or probability output (outputs: {:?})",
                path.display(),
                output_names
            );
        }

        info!(
            input = %input_name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            session,
            input_name,
            label_output,
            probability_output,
        })
    }
}

/// Pick the label and probability outputs from an exported graph's output names.
///
/// Gradient-boosting exports name them `label`/`probabilities` (or
/// `output_label`/`output_probability`); a lone unnamed output is read as probabilities.
fn resolve_outputs(names: &[String]) -> (Option<String>, Option<String>) {
    let label = names.iter().find(|n| n.contains("label")).cloned();
    let probability = names
        .iter()
        .find(|n| n.contains("prob"))
        .cloned()
        .or_else(|| {
            names
                .iter()
                .find(|n| Some(*n) != label.as_ref())
                .cloned()
        });
    (label, probability)
}
