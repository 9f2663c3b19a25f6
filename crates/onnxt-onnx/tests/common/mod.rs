//! Protobuf builders shared by the integration tests.
#![allow(dead_code)]

use onnxt_onnx::onnx_proto::*;

pub const FLOAT: i32 = 1;
pub const INT64: i32 = 7;
pub const ATTR_INTS: i32 = 7;

pub fn dim_value(val: i64) -> tensor_shape_proto::Dimension {
    tensor_shape_proto::Dimension {
        denotation: String::new(),
        value: Some(tensor_shape_proto::dimension::Value::DimValue(val)),
    }
}

pub fn dim_param(name: &str) -> tensor_shape_proto::Dimension {
    tensor_shape_proto::Dimension {
        denotation: String::new(),
        value: Some(tensor_shape_proto::dimension::Value::DimParam(
            name.to_string(),
        )),
    }
}

pub fn tensor_type(elem_type: i32, dims: Vec<i64>) -> TypeProto {
    TypeProto {
        denotation: String::new(),
        value: Some(type_proto::Value::TensorType(type_proto::Tensor {
            elem_type,
            shape: Some(TensorShapeProto {
                dim: dims.into_iter().map(dim_value).collect(),
            }),
        })),
    }
}

pub fn value_info(name: &str, elem_type: i32, dims: Vec<i64>) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(tensor_type(elem_type, dims)),
        ..Default::default()
    }
}

pub fn float_initializer(name: &str, dims: Vec<i64>, values: Vec<f32>) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims,
        data_type: FLOAT,
        float_data: values,
        ..Default::default()
    }
}

pub fn transpose_node(name: &str, input: &str, output: &str, perm: Option<Vec<i64>>) -> NodeProto {
    NodeProto {
        name: name.to_string(),
        op_type: "Transpose".to_string(),
        input: vec![input.to_string()],
        output: vec![output.to_string()],
        attribute: perm
            .map(|ints| {
                vec![AttributeProto {
                    name: "perm".to_string(),
                    r#type: ATTR_INTS,
                    ints,
                    ..Default::default()
                }]
            })
            .unwrap_or_default(),
        ..Default::default()
    }
}

pub fn model(graph: GraphProto) -> ModelProto {
    ModelProto {
        ir_version: 7,
        producer_name: "test".to_string(),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: 13,
        }],
        graph: Some(graph),
        ..Default::default()
    }
}

pub fn graph(
    nodes: Vec<NodeProto>,
    initializers: Vec<TensorProto>,
    outputs: Vec<ValueInfoProto>,
) -> GraphProto {
    GraphProto {
        name: "test_graph".to_string(),
        node: nodes,
        initializer: initializers,
        output: outputs,
        ..Default::default()
    }
}
