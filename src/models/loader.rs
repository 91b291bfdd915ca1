//! ONNX model loader

use crate::models::runtime::{InferenceSession, SessionLoader};
use crate::types::{InputTensor, ModelOutput};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputValue};
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model file name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Declared input names
    pub input_names: Vec<String>,
}

impl LoadedModel {
    /// Fail early when the model does not declare an input we are about to feed it
    fn check_inputs(&self, inputs: &[InputTensor]) -> Result<()> {
        if let Some(missing) = undeclared_input(&self.input_names, inputs) {
            anyhow::bail!(
                "Model '{}' has no input '{}' (declared: {:?})",
                self.name,
                missing,
                self.input_names
            );
        }
        Ok(())
    }
}

fn undeclared_input(declared: &[String], inputs: &[InputTensor]) -> Option<&'static str> {
    inputs
        .iter()
        .map(|input| input.name)
        .find(|name| !declared.iter().any(|d| d == name))
}

impl InferenceSession for LoadedModel {
    fn run(&mut self, inputs: Vec<InputTensor>) -> Result<Vec<ModelOutput>> {
        self.check_inputs(&inputs)?;

        let mut values: Vec<(String, SessionInputValue<'static>)> =
            Vec::with_capacity(inputs.len());
        for input in inputs {
            let shape = vec![input.shape[0] as i64, input.shape[1] as i64];
            let tensor = Tensor::from_array((shape, input.data))
                .context(format!("Failed to create input tensor '{}'", input.name))?;
            values.push((input.name.to_string(), SessionInputValue::from(tensor)));
        }

        let outputs = self.session.run(values)?;

        let mut results = Vec::with_capacity(outputs.len());
        for (name, output) in outputs.iter() {
            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .context(format!("Output '{}' is not a float tensor", name))?;
            debug!(model = %self.name, output = %name, shape = ?shape, "Extracted output tensor");
            results.push(ModelOutput::new(name, data.to_vec()));
        }

        Ok(results)
    }
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().with_name("bert-qa").commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        info!(
            model = %name,
            path = %path.display(),
            threads = self.onnx_threads,
            "Loading ONNX model"
        );

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        if output_names.len() != 2 {
            tracing::warn!(
                model = %name,
                outputs = ?output_names,
                "Expected start/end logit outputs; decoding uses the first and last"
            );
        }

        info!(
            model = %name,
            inputs = ?input_names,
            outputs = ?output_names,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            session,
            input_names,
        })
    }
}

impl SessionLoader for ModelLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn InferenceSession>> {
        Ok(Box::new(self.load_model(path)?))
    }
}
