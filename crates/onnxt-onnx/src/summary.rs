//! Human-readable model reports.

use crate::generated;
use crate::loader::LoadedModel;
use crate::types::ir_version_string;
use std::fmt::{self, Write as _};

const RULE: &str = "----------------------------------------------------------------";

/// Header fields of an ONNX model
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelInfo {
    /// Path the model was read from, if it came from a file
    pub input_file: Option<String>,
    pub ir_version: i64,
    /// Version of the first opset import, 0 when there is none
    pub opset_version: i64,
    pub producer_name: String,
    pub producer_version: String,
    pub domain: String,
    pub model_version: i64,
    pub doc_string: String,
    pub graph_name: String,
}

impl ModelInfo {
    pub(crate) fn from_proto(
        input_file: Option<String>,
        model: &generated::ModelProto,
        graph_name: &str,
    ) -> Self {
        Self {
            input_file,
            ir_version: model.ir_version,
            opset_version: model.opset_import.first().map_or(0, |o| o.version),
            producer_name: model.producer_name.clone(),
            producer_version: model.producer_version.clone(),
            domain: model.domain.clone(),
            model_version: model.model_version,
            doc_string: model.doc_string.clone(),
            graph_name: graph_name.to_string(),
        }
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "Input filename:   {}",
            self.input_file.as_deref().unwrap_or("<memory>")
        )?;
        writeln!(f, "ONNX IR version:  {}", ir_version_string(self.ir_version))?;
        writeln!(f, "Opset version:    {}", self.opset_version)?;
        writeln!(f, "Producer name:    {}", self.producer_name)?;
        writeln!(f, "Producer version: {}", self.producer_version)?;
        writeln!(f, "Domain:           {}", self.domain)?;
        writeln!(f, "Model version:    {}", self.model_version)?;
        writeln!(f, "Doc string:       {}", self.doc_string)?;
        write!(f, "{RULE}")
    }
}

/// List graph inputs, initializers, nodes and outputs of `model`, one per line.
pub fn layer_listing(model: &LoadedModel) -> String {
    let mut out = String::new();

    for input in model.inputs() {
        let _ = writeln!(out, "input  {} {} {}", input.name, input.data_type, input.dims);
    }
    for name in model.initializer_names() {
        if let Some(weights) = model.weights(name) {
            let _ = writeln!(out, "weight {} {} {}", name, weights.dtype, weights.shape);
        }
    }
    for fold in model.folded_nodes() {
        let _ = writeln!(
            out,
            "folded [{}] {}: {} -> {} perm {}",
            fold.index, fold.name, fold.input, fold.output, fold.perm
        );
    }
    for node in model.nodes() {
        let _ = writeln!(
            out,
            "node   [{}] {} ({}): {} -> {}",
            node.index,
            node.name,
            node.op_type,
            node.inputs.join(", "),
            node.outputs.join(", ")
        );
    }
    for output in model.outputs() {
        let _ = writeln!(out, "output {} {} {}", output.name, output.data_type, output.dims);
    }

    out
}
