use crate::error::{OnnxError, Result};
use crate::generated;
use onnxt_core::{DataType, Dims, DYNAMIC_DIM, MAX_DIMS};

/// Maps ONNX element type codes to onnxt data types
pub struct DataTypeMapper;

impl DataTypeMapper {
    pub fn from_onnx(onnx_type: i32) -> Result<DataType> {
        match onnx_type {
            1 => Ok(DataType::F32),   // FLOAT
            2 => Ok(DataType::U8),    // UINT8
            3 => Ok(DataType::I8),    // INT8
            4 => Ok(DataType::U16),   // UINT16
            5 => Ok(DataType::I16),   // INT16
            6 => Ok(DataType::I32),   // INT32
            7 => Ok(DataType::I64),   // INT64
            9 => Ok(DataType::Bool),  // BOOL
            10 => Ok(DataType::F16),  // FLOAT16
            11 => Ok(DataType::F64),  // DOUBLE
            12 => Ok(DataType::U32),  // UINT32
            16 => Ok(DataType::BF16), // BFLOAT16
            _ => Err(OnnxError::TypeConversionError(format!(
                "Unsupported ONNX data type: {}",
                onnx_type
            ))),
        }
    }

    pub fn to_onnx(data_type: DataType) -> i32 {
        match data_type {
            DataType::F32 => 1,
            DataType::U8 => 2,
            DataType::I8 => 3,
            DataType::U16 => 4,
            DataType::I16 => 5,
            DataType::I32 => 6,
            DataType::I64 => 7,
            DataType::Bool => 9,
            DataType::F16 => 10,
            DataType::F64 => 11,
            DataType::U32 => 12,
            DataType::BF16 => 16,
        }
    }
}

/// Convert an ONNX shape into [`Dims`].
///
/// Symbolic dimensions and negative values become [`DYNAMIC_DIM`].
pub fn dims_from_shape_proto(shape: &generated::TensorShapeProto) -> Result<Dims> {
    use generated::tensor_shape_proto::dimension::Value;

    if shape.dim.len() > MAX_DIMS {
        return Err(OnnxError::ParseError(format!(
            "shape of rank {} exceeds the maximum of {}",
            shape.dim.len(),
            MAX_DIMS
        )));
    }

    let extents: Vec<i64> = shape
        .dim
        .iter()
        .map(|d| match d.value {
            Some(Value::DimValue(v)) if v >= 0 => v,
            _ => DYNAMIC_DIM,
        })
        .collect();
    Ok(Dims::new(&extents)?)
}

/// Shape proto for a set of dims, the inverse of [`dims_from_shape_proto`].
pub fn shape_proto_from_dims(dims: &Dims) -> generated::TensorShapeProto {
    use generated::tensor_shape_proto::{dimension::Value, Dimension};

    generated::TensorShapeProto {
        dim: dims
            .as_slice()
            .iter()
            .map(|&d| Dimension {
                denotation: String::new(),
                value: (d != DYNAMIC_DIM).then_some(Value::DimValue(d)),
            })
            .collect(),
    }
}

/// Format a packed ONNX IR version as `major.minor.patch`.
pub fn ir_version_string(ir_version: i64) -> String {
    let major = ir_version / 1_000_000;
    let minor = ir_version % 1_000_000 / 10_000;
    let patch = ir_version % 10_000;
    format!("{major}.{minor}.{patch}")
}
