//! Constant values carried by [`Resource::Constant`](super::Resource::Constant).

use serde::{Deserialize, Serialize};

/// A small immediate value: fill patterns, counts, push constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConstantValue {
    U32(u32),
    I32(i32),
    F32(f32),
    UVec4([u32; 4]),
    Vec4([f32; 4]),
}

impl Default for ConstantValue {
    fn default() -> Self {
        Self::U32(0)
    }
}

impl ConstantValue {
    /// Little-endian byte pattern of the value, as written by a fill.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::U32(v) => bytemuck::bytes_of(v).to_vec(),
            Self::I32(v) => bytemuck::bytes_of(v).to_vec(),
            Self::F32(v) => bytemuck::bytes_of(v).to_vec(),
            Self::UVec4(v) => bytemuck::cast_slice::<u32, u8>(v).to_vec(),
            Self::Vec4(v) => bytemuck::cast_slice::<f32, u8>(v).to_vec(),
        }
    }

    /// Scalar unsigned value, if this constant holds a non-negative integer.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Self::U32(v) => Some(v),
            Self::I32(v) => u32::try_from(v).ok(),
            _ => None,
        }
    }

    /// Interpret the value as a 3D extent (element or group counts).
    pub fn as_extent(&self) -> Option<[u32; 3]> {
        match *self {
            Self::UVec4([x, y, z, _]) => Some([x, y, z]),
            _ => self.as_u32().map(|v| [v, 1, 1]),
        }
    }
}
