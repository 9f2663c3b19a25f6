use crate::config::ImportConfig;
use crate::context::{ImportContext, UnsupportedNode};
use crate::error::{OnnxError, Result};
use crate::generated;
use crate::summary::ModelInfo;
use crate::types::{dims_from_shape_proto, ir_version_string, shape_proto_from_dims, DataTypeMapper};
use crate::weights::{convert_onnx_weights, weights_to_tensor_proto};
use onnxt_core::{
    is_transpose_required, DataType, DiagnosticSink, Dims, Permutation, Severity, ShapedWeights,
    TracingSink,
};
use prost::Message;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Newest ONNX IR version this schema was written against
pub const IR_VERSION: i64 = 11;

/// Recommended ONNX opset version
const RECOMMENDED_OPSET_VERSION: i64 = 13;

/// Loads ONNX models with the default configuration
pub struct ModelLoader;

impl ModelLoader {
    /// Load an ONNX model from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<LoadedModel> {
        Importer::new(ImportConfig::default()).import_file(path)
    }

    /// Load an ONNX model from bytes
    pub fn load_from_bytes(bytes: &[u8]) -> Result<LoadedModel> {
        Importer::new(ImportConfig::default()).import_bytes(bytes)
    }
}

/// Configurable model import
pub struct Importer {
    config: ImportConfig,
    sink: Box<dyn DiagnosticSink>,
    source: Option<String>,
}

impl Importer {
    /// Importer reporting diagnostics through `tracing`
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            sink: Box::new(TracingSink::default()),
            source: None,
        }
    }

    /// Replace the diagnostic sink
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Import a model file. External data resolves against the file's
    /// directory unless the configuration names one.
    pub fn import_file<P: AsRef<Path>>(mut self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        info!("Loading ONNX model from: {:?}", path);
        if self.config.base_dir.is_none() {
            self.config.base_dir = path.parent().map(Path::to_path_buf);
        }
        self.source = Some(path.display().to_string());
        let bytes = fs::read(path)?;
        self.import_bytes(&bytes)
    }

    /// Import a serialized model
    pub fn import_bytes(self, bytes: &[u8]) -> Result<LoadedModel> {
        let model_proto = generated::ModelProto::decode(bytes)?;
        self.convert_model(model_proto)
    }

    fn convert_model(self, mut model_proto: generated::ModelProto) -> Result<LoadedModel> {
        let ir_version = model_proto.ir_version;
        if ir_version < self.config.min_ir_version {
            return Err(OnnxError::UnsupportedIrVersion {
                version: ir_version,
                min_version: self.config.min_ir_version,
            });
        }
        info!("ONNX model IR version: {}", ir_version_string(ir_version));

        let source = self.source;
        let mut ctx = ImportContext::with_sink(self.config, self.sink);
        if ir_version > IR_VERSION {
            ctx.log(
                Severity::Warning,
                &format!(
                    "ONNX model has a newer ir_version ({}) than this parser was built against ({})",
                    ir_version_string(ir_version),
                    ir_version_string(IR_VERSION)
                ),
            );
        }

        if let Some(opset) = model_proto.opset_import.first() {
            if opset.version < RECOMMENDED_OPSET_VERSION {
                warn!(
                    "ONNX opset version {} is older than recommended {}",
                    opset.version, RECOMMENDED_OPSET_VERSION
                );
            } else {
                info!("ONNX opset version: {}", opset.version);
            }
        }

        let graph_proto = model_proto
            .graph
            .take()
            .ok_or_else(|| OnnxError::ParseError("Model has no graph".to_string()))?;
        info!("Converting ONNX graph: {}", graph_proto.name);

        for init in &graph_proto.initializer {
            debug!("Loading initializer: {}", init.name);
            let weights = convert_onnx_weights(init, &mut ctx)?;
            ctx.register_weights(init.name.clone(), weights);
        }

        let mut inputs = Vec::new();
        for input in &graph_proto.input {
            // Older IR versions list initializers as graph inputs.
            if ctx.has_weights(&input.name) {
                continue;
            }
            let Some((dims, data_type)) = shape_and_type_from_value_info(input)? else {
                continue;
            };
            debug!("Input: {} with shape {}, type {}", input.name, dims, data_type);
            inputs.push(TensorInfo {
                name: input.name.clone(),
                dims,
                data_type,
            });
        }

        let mut outputs = Vec::new();
        for output in &graph_proto.output {
            let Some((dims, data_type)) = shape_and_type_from_value_info(output)? else {
                continue;
            };
            debug!("Output: {} with shape {}, type {}", output.name, dims, data_type);
            outputs.push(TensorInfo {
                name: output.name.clone(),
                dims,
                data_type,
            });
        }

        let mut nodes = Vec::with_capacity(graph_proto.node.len());
        for (index, node_proto) in graph_proto.node.iter().enumerate() {
            let name = if node_proto.name.is_empty() {
                format!("node_{}", index)
            } else {
                node_proto.name.clone()
            };
            debug!("Processing node: {} ({})", name, node_proto.op_type);

            let mut attributes = HashMap::new();
            for attr in &node_proto.attribute {
                let value = convert_attribute(attr, &mut ctx)?;
                attributes.insert(attr.name.clone(), value);
            }

            nodes.push(NodeInfo {
                index,
                name,
                op_type: node_proto.op_type.clone(),
                inputs: node_proto.input.clone(),
                outputs: node_proto.output.clone(),
                attributes,
            });
        }

        let folded = if ctx.config().fold_transposes {
            fold_transposes(&mut ctx, &mut nodes)
        } else {
            Vec::new()
        };

        let info = ModelInfo::from_proto(source, &model_proto, &graph_proto.name);

        Ok(LoadedModel {
            model_proto,
            graph_proto,
            info,
            inputs,
            outputs,
            nodes,
            folded,
            transposed: HashSet::new(),
            ctx,
        })
    }
}

/// Replace `Transpose` nodes fed by initializers with transposed initializers.
///
/// A node whose weights cannot be transposed is reported as unsupported and
/// kept in the graph.
fn fold_transposes(ctx: &mut ImportContext, nodes: &mut Vec<NodeInfo>) -> Vec<FoldedNode> {
    let mut folded = Vec::new();
    let mut kept = Vec::with_capacity(nodes.len());

    for node in nodes.drain(..) {
        let foldable = node.op_type == "Transpose"
            && node.inputs.len() == 1
            && node.outputs.len() == 1
            && ctx.has_weights(&node.inputs[0]);
        if !foldable {
            kept.push(node);
            continue;
        }

        match fold_transpose(ctx, &node) {
            Ok(fold) => {
                debug!("Folded {} into initializer {}", node.name, fold.output);
                folded.push(fold);
            }
            Err(err) => {
                ctx.mark_unsupported(node.name.clone(), node.op_type.clone(), err.to_string());
                kept.push(node);
            }
        }
    }

    *nodes = kept;
    folded
}

fn fold_transpose(ctx: &mut ImportContext, node: &NodeInfo) -> Result<FoldedNode> {
    let input = &node.inputs[0];
    let output = &node.outputs[0];
    let weights = ctx
        .weights(input)
        .cloned()
        .ok_or_else(|| OnnxError::UnknownInitializer(input.clone()))?;

    let perm = match node.attributes.get("perm") {
        Some(NodeAttribute::Ints(order)) => Permutation::from_i64(order)?,
        Some(_) => {
            return Err(OnnxError::InvalidAttribute {
                name: "perm".to_string(),
                reason: "expected a list of ints".to_string(),
            })
        }
        None => Permutation::reversed(weights.shape.rank())?,
    };

    let physical = is_transpose_required(&weights.shape, &perm);
    let transposed = ctx.transpose_weights(&weights, &perm)?;
    ctx.register_weights(output.clone(), transposed);

    Ok(FoldedNode {
        index: node.index,
        name: node.name.clone(),
        input: input.clone(),
        output: output.clone(),
        perm,
        physical,
    })
}

/// Convert ONNX AttributeProto to NodeAttribute
fn convert_attribute(
    attr: &generated::AttributeProto,
    ctx: &mut ImportContext,
) -> Result<NodeAttribute> {
    use generated::attribute_proto::AttributeType;

    let attr_type = AttributeType::try_from(attr.r#type).unwrap_or(AttributeType::Undefined);

    match attr_type {
        AttributeType::Float => Ok(NodeAttribute::Float(attr.f)),
        AttributeType::Int => Ok(NodeAttribute::Int(attr.i)),
        AttributeType::String => Ok(NodeAttribute::String(
            String::from_utf8_lossy(&attr.s).to_string(),
        )),
        AttributeType::Tensor => {
            let tensor = attr.t.as_ref().ok_or_else(|| OnnxError::InvalidAttribute {
                name: attr.name.clone(),
                reason: "Tensor attribute has no value".to_string(),
            })?;
            Ok(NodeAttribute::Tensor(convert_onnx_weights(tensor, ctx)?))
        }
        AttributeType::Floats => Ok(NodeAttribute::Floats(attr.floats.clone())),
        AttributeType::Ints => Ok(NodeAttribute::Ints(attr.ints.clone())),
        AttributeType::Strings => Ok(NodeAttribute::Strings(
            attr.strings
                .iter()
                .map(|s| String::from_utf8_lossy(s).to_string())
                .collect(),
        )),
        other => {
            warn!("Unsupported attribute type: {:?}", other);
            Ok(NodeAttribute::Unsupported(format!("{:?}", other)))
        }
    }
}

/// Extract shape and data type from ValueInfoProto.
///
/// Sequence, map, optional, sparse and opaque values carry no dense layout
/// and yield `None`.
fn shape_and_type_from_value_info(
    value_info: &generated::ValueInfoProto,
) -> Result<Option<(Dims, DataType)>> {
    let type_proto = value_info
        .r#type
        .as_ref()
        .ok_or_else(|| OnnxError::ParseError(format!("ValueInfo {} has no type", value_info.name)))?;

    let tensor_type = match &type_proto.value {
        Some(generated::type_proto::Value::TensorType(t)) => t,
        Some(other) => {
            debug!("Skipping {}: not a dense tensor ({:?})", value_info.name, other);
            return Ok(None);
        }
        None => {
            return Err(OnnxError::ParseError(format!(
                "Type of {} is not a tensor type",
                value_info.name
            )));
        }
    };

    let data_type = DataTypeMapper::from_onnx(tensor_type.elem_type)?;
    let dims = match &tensor_type.shape {
        Some(shape) => dims_from_shape_proto(shape)?,
        None => Dims::scalar(),
    };
    Ok(Some((dims, data_type)))
}

/// Attribute value of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAttribute {
    /// Single float
    Float(f32),
    /// Single integer
    Int(i64),
    /// UTF-8 string
    String(String),
    /// Constant tensor, imported into the arena
    Tensor(ShapedWeights),
    /// List of floats
    Floats(Vec<f32>),
    /// List of integers
    Ints(Vec<i64>),
    /// List of strings
    Strings(Vec<String>),
    /// Attribute kind that is carried through but not interpreted
    Unsupported(String),
}

/// Name, shape and type of a graph input or output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub dims: Dims,
    pub data_type: DataType,
}

/// A graph node that survived import
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Position in the original graph
    pub index: usize,
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub attributes: HashMap<String, NodeAttribute>,
}

/// A `Transpose` node replaced by a transposed initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedNode {
    /// Position in the original graph
    pub index: usize,
    pub name: String,
    /// Initializer consumed by the node
    pub input: String,
    /// Initializer that now carries the node's output
    pub output: String,
    pub perm: Permutation,
    /// False when only unit axes moved and the bytes were reused as-is
    pub physical: bool,
}

/// A model imported into an arena, ready to be inspected or rewritten
pub struct LoadedModel {
    model_proto: generated::ModelProto,
    graph_proto: generated::GraphProto,
    info: ModelInfo,
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
    nodes: Vec<NodeInfo>,
    folded: Vec<FoldedNode>,
    /// Initializers replaced through `transpose_initializer`
    transposed: HashSet<String>,
    ctx: ImportContext,
}

impl LoadedModel {
    /// Header information about the model
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Get input tensor information
    pub fn inputs(&self) -> &[TensorInfo] {
        &self.inputs
    }

    /// Get output tensor information
    pub fn outputs(&self) -> &[TensorInfo] {
        &self.outputs
    }

    /// Nodes still present in the graph
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    /// Transpose nodes folded into initializers
    pub fn folded_nodes(&self) -> &[FoldedNode] {
        &self.folded
    }

    /// Nodes the importer could not convert
    pub fn unsupported_nodes(&self) -> &[UnsupportedNode] {
        self.ctx.unsupported_nodes()
    }

    /// Names of all initializers, including folded outputs
    pub fn initializer_names(&self) -> &[String] {
        self.ctx.weight_names()
    }

    /// Initializer weights by name
    pub fn weights(&self, name: &str) -> Option<&ShapedWeights> {
        self.ctx.weights(name)
    }

    /// Import context owning every weight buffer
    pub fn context(&self) -> &ImportContext {
        &self.ctx
    }

    /// Transpose an initializer in place of the original.
    ///
    /// Anything consuming the initializer sees the permuted layout afterwards,
    /// so this is only meaningful for weights the caller will re-declare.
    pub fn transpose_initializer(&mut self, name: &str, perm: &Permutation) -> Result<()> {
        let weights = self
            .ctx
            .weights(name)
            .cloned()
            .ok_or_else(|| OnnxError::UnknownInitializer(name.to_string()))?;
        let transposed = self.ctx.transpose_weights(&weights, perm)?;
        info!(
            "Transposed initializer {} from {} to {}",
            name, weights.shape, transposed.shape
        );
        self.ctx.register_weights(name, transposed);
        self.transposed.insert(name.to_string());
        Ok(())
    }

    /// Rebuild a `ModelProto` reflecting folded and transposed initializers.
    ///
    /// Initializers that were not rewritten are emitted as they were read,
    /// except that external data is inlined.
    pub fn to_model_proto(&self) -> Result<generated::ModelProto> {
        let folded_indices: HashSet<usize> = self.folded.iter().map(|f| f.index).collect();

        let mut used: HashSet<&str> = self
            .nodes
            .iter()
            .flat_map(|n| n.inputs.iter().map(String::as_str))
            .collect();
        used.extend(self.graph_proto.output.iter().map(|o| o.name.as_str()));
        let dropped: HashSet<&str> = self
            .folded
            .iter()
            .map(|f| f.input.as_str())
            .filter(|name| !used.contains(name))
            .collect();

        let mut graph = self.graph_proto.clone();
        graph.node = self
            .graph_proto
            .node
            .iter()
            .enumerate()
            .filter(|(index, _)| !folded_indices.contains(index))
            .map(|(_, node)| node.clone())
            .collect();

        let originals: HashMap<&str, &generated::TensorProto> = self
            .graph_proto
            .initializer
            .iter()
            .map(|t| (t.name.as_str(), t))
            .collect();

        graph.initializer = self
            .ctx
            .weight_names()
            .iter()
            .filter(|name| !dropped.contains(name.as_str()))
            .map(|name| {
                let original = originals.get(name.as_str()).copied();
                let rewritten = self.transposed.contains(name)
                    || self.folded.iter().any(|f| &f.output == name);
                match original {
                    Some(tensor)
                        if !rewritten
                            && tensor.data_location()
                                != generated::tensor_proto::DataLocation::External =>
                    {
                        Ok(tensor.clone())
                    }
                    _ => {
                        let weights = self
                            .ctx
                            .weights(name)
                            .ok_or_else(|| OnnxError::UnknownInitializer(name.clone()))?;
                        let mut tensor = weights_to_tensor_proto(name, weights, &self.ctx)?;
                        if let Some(original) = original {
                            tensor.doc_string = original.doc_string.clone();
                            tensor.metadata_props = original.metadata_props.clone();
                        }
                        Ok(tensor)
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        // Keep initializer declarations among graph inputs in step with the
        // rewritten weights.
        graph.input.retain(|input| !dropped.contains(input.name.as_str()));
        for input in &mut graph.input {
            if !self.transposed.contains(&input.name) {
                continue;
            }
            let Some(weights) = self.ctx.weights(&input.name) else {
                continue;
            };
            if let Some(generated::type_proto::Value::TensorType(tensor_type)) = input
                .r#type
                .as_mut()
                .and_then(|t| t.value.as_mut())
            {
                tensor_type.shape = Some(shape_proto_from_dims(&weights.shape));
            }
        }

        let mut model = self.model_proto.clone();
        model.graph = Some(graph);
        Ok(model)
    }

    /// Serialize the rewritten model
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        Ok(self.to_model_proto()?.encode_to_vec())
    }

    /// Write the rewritten model to `path`
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.encode_to_vec()?;
        fs::write(path.as_ref(), bytes)?;
        info!("Wrote ONNX model to {:?}", path.as_ref());
        Ok(())
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("info", &self.info)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("nodes", &self.nodes.len())
            .field("folded", &self.folded)
            .field("context", &self.ctx)
            .finish()
    }
}
