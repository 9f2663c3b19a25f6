//! Conversion between ONNX `TensorProto` payloads and arena weights.

use crate::context::ImportContext;
use crate::error::{OnnxError, Result};
use crate::generated;
use crate::types::DataTypeMapper;
use onnxt_core::{DataType, Dims, ShapedWeights};
use std::fs;
use std::path::{Component, Path};
use tracing::debug;

/// Decode an initializer into the import arena.
///
/// Reads `raw_data`, the typed repeated fields, or an external file,
/// and names the resulting weights after the tensor.
pub fn convert_onnx_weights(
    tensor: &generated::TensorProto,
    ctx: &mut ImportContext,
) -> Result<ShapedWeights> {
    let dtype = DataTypeMapper::from_onnx(tensor.data_type)?;
    let shape = Dims::new(&tensor.dims)?;
    if !shape.is_static() {
        return Err(OnnxError::ParseError(format!(
            "initializer '{}' has negative dimensions {:?}",
            tensor.name, tensor.dims
        )));
    }
    let expected = shape.byte_len(dtype.size_in_bytes())?;

    let bytes = if tensor.data_location() == generated::tensor_proto::DataLocation::External {
        read_external_data(tensor, ctx)?
    } else if !tensor.raw_data.is_empty() {
        tensor.raw_data.clone()
    } else {
        typed_payload(tensor, dtype)?
    };

    if bytes.len() != expected {
        return Err(OnnxError::ParseError(format!(
            "initializer '{}' of shape {} and type {} needs {} bytes but holds {}",
            tensor.name,
            shape,
            dtype,
            expected,
            bytes.len()
        )));
    }

    debug!(
        name = %tensor.name,
        shape = %shape,
        dtype = %dtype,
        bytes = expected,
        "imported initializer"
    );
    let weights = ctx.import_bytes(dtype, shape, bytes)?;
    Ok(weights.with_name(tensor.name.clone()))
}

/// Encode weights back into a `TensorProto` carrying `raw_data`.
pub fn weights_to_tensor_proto(
    name: &str,
    weights: &ShapedWeights,
    ctx: &ImportContext,
) -> Result<generated::TensorProto> {
    let raw_data = if weights.is_present() {
        ctx.values(weights)?.to_vec()
    } else {
        Vec::new()
    };
    Ok(generated::TensorProto {
        name: name.to_string(),
        dims: weights.shape.as_slice().to_vec(),
        data_type: DataTypeMapper::to_onnx(weights.dtype),
        raw_data,
        ..Default::default()
    })
}

fn typed_payload(tensor: &generated::TensorProto, dtype: DataType) -> Result<Vec<u8>> {
    let name = tensor.name.as_str();
    match dtype {
        DataType::F32 => Ok(le_bytes(&tensor.float_data, f32::to_le_bytes)),
        DataType::F64 => Ok(le_bytes(&tensor.double_data, f64::to_le_bytes)),
        DataType::I64 => Ok(le_bytes(&tensor.int64_data, i64::to_le_bytes)),
        DataType::I32 => Ok(le_bytes(&tensor.int32_data, i32::to_le_bytes)),
        DataType::U32 => narrowed(name, dtype, &tensor.uint64_data, |v| {
            u32::try_from(v).ok().map(u32::to_le_bytes)
        }),
        // 16-bit payloads sit in the low bits of int32_data.
        DataType::F16 | DataType::BF16 | DataType::U16 => {
            narrowed(name, dtype, &tensor.int32_data, |v| {
                u16::try_from(v).ok().map(u16::to_le_bytes)
            })
        }
        DataType::I16 => narrowed(name, dtype, &tensor.int32_data, |v| {
            i16::try_from(v).ok().map(i16::to_le_bytes)
        }),
        DataType::U8 => narrowed(name, dtype, &tensor.int32_data, |v| {
            u8::try_from(v).ok().map(u8::to_le_bytes)
        }),
        DataType::I8 => narrowed(name, dtype, &tensor.int32_data, |v| {
            i8::try_from(v).ok().map(i8::to_le_bytes)
        }),
        DataType::Bool => narrowed(name, dtype, &tensor.int32_data, |v| match v {
            0 | 1 => Some([v as u8]),
            _ => None,
        }),
    }
}

fn le_bytes<T: Copy, const N: usize>(values: &[T], encode: impl Fn(T) -> [u8; N]) -> Vec<u8> {
    values.iter().flat_map(|&v| encode(v)).collect()
}

/// Encode wide proto values into a narrower element type, rejecting any
/// value the element type cannot hold.
fn narrowed<T, const N: usize>(
    name: &str,
    dtype: DataType,
    values: &[T],
    encode: impl Fn(T) -> Option<[u8; N]>,
) -> Result<Vec<u8>>
where
    T: Copy + std::fmt::Display,
{
    let mut bytes = Vec::with_capacity(values.len() * N);
    for &v in values {
        let encoded = encode(v).ok_or_else(|| {
            OnnxError::ParseError(format!(
                "initializer '{name}' holds {v}, which is out of range for {dtype}"
            ))
        })?;
        bytes.extend_from_slice(&encoded);
    }
    Ok(bytes)
}

fn read_external_data(tensor: &generated::TensorProto, ctx: &ImportContext) -> Result<Vec<u8>> {
    let config = ctx.config();
    if !config.allow_external_data {
        return Err(OnnxError::ExternalData(format!(
            "initializer '{}' uses external data, which is disabled",
            tensor.name
        )));
    }

    let mut location = None;
    let mut offset = 0u64;
    let mut length = None;
    for entry in &tensor.external_data {
        match entry.key.as_str() {
            "location" => location = Some(entry.value.as_str()),
            "offset" => offset = parse_external_number(&tensor.name, "offset", &entry.value)?,
            "length" => length = Some(parse_external_number(&tensor.name, "length", &entry.value)?),
            _ => {}
        }
    }

    let location = location.ok_or_else(|| {
        OnnxError::ExternalData(format!("initializer '{}' has no location", tensor.name))
    })?;
    let relative = Path::new(location);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(OnnxError::ExternalData(format!(
            "location '{location}' of initializer '{}' leaves the model directory",
            tensor.name
        )));
    }
    let base_dir = config.base_dir.as_deref().ok_or_else(|| {
        OnnxError::ExternalData(format!(
            "initializer '{}' uses external data but no base directory is known",
            tensor.name
        ))
    })?;

    let path = base_dir.join(relative);
    let file = fs::read(&path)?;
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let end = match length {
        Some(len) => start.saturating_add(usize::try_from(len).unwrap_or(usize::MAX)),
        None => file.len(),
    };
    let slice = file.get(start..end).ok_or_else(|| {
        OnnxError::ExternalData(format!(
            "range {start}..{end} is outside {} ({} bytes)",
            path.display(),
            file.len()
        ))
    })?;
    debug!(path = %path.display(), offset = start, bytes = slice.len(), "read external data");
    Ok(slice.to_vec())
}

fn parse_external_number(tensor: &str, key: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        OnnxError::ExternalData(format!(
            "initializer '{tensor}' has invalid {key} '{value}'"
        ))
    })
}
