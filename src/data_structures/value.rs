//! Metadata value types from `EXT_structural_metadata`.

use serde::{Deserialize, Serialize};

/// The element type of a metadata property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Boolean,
    String,
    Enum,
}

impl MetadataType {
    /// Number of numeric components in one element. Booleans, strings and
    /// enums count as one.
    pub fn component_count(self) -> usize {
        match self {
            MetadataType::Vec2 => 2,
            MetadataType::Vec3 => 3,
            MetadataType::Vec4 | MetadataType::Mat2 => 4,
            MetadataType::Mat3 => 9,
            MetadataType::Mat4 => 16,
            _ => 1,
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(
            self,
            MetadataType::Vec2 | MetadataType::Vec3 | MetadataType::Vec4
        )
    }

    pub fn is_matrix(self) -> bool {
        matches!(
            self,
            MetadataType::Mat2 | MetadataType::Mat3 | MetadataType::Mat4
        )
    }
}

/// The numeric component type of a scalar, vector, matrix or enum property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::Int8 | ComponentType::Uint8 => 1,
            ComponentType::Int16 | ComponentType::Uint16 => 2,
            ComponentType::Int32 | ComponentType::Uint32 | ComponentType::Float32 => 4,
            ComponentType::Int64 | ComponentType::Uint64 | ComponentType::Float64 => 8,
        }
    }

    /// Reads one little-endian component. `bytes` must hold at least
    /// [`byte_size`](Self::byte_size) bytes.
    pub fn read(self, bytes: &[u8]) -> Option<Number> {
        let bytes = bytes.get(..self.byte_size())?;
        let number = match self {
            ComponentType::Int8 => Number::Int(bytes[0] as i8 as i64),
            ComponentType::Uint8 => Number::Uint(bytes[0] as u64),
            ComponentType::Int16 => Number::Int(i16::from_le_bytes(bytes.try_into().ok()?) as i64),
            ComponentType::Uint16 => {
                Number::Uint(u16::from_le_bytes(bytes.try_into().ok()?) as u64)
            }
            ComponentType::Int32 => Number::Int(i32::from_le_bytes(bytes.try_into().ok()?) as i64),
            ComponentType::Uint32 => {
                Number::Uint(u32::from_le_bytes(bytes.try_into().ok()?) as u64)
            }
            ComponentType::Int64 => Number::Int(i64::from_le_bytes(bytes.try_into().ok()?)),
            ComponentType::Uint64 => Number::Uint(u64::from_le_bytes(bytes.try_into().ok()?)),
            ComponentType::Float32 => {
                Number::Float(f32::from_le_bytes(bytes.try_into().ok()?) as f64)
            }
            ComponentType::Float64 => Number::Float(f64::from_le_bytes(bytes.try_into().ok()?)),
        };
        Some(number)
    }
}

/// Full type of a property: element type, component type and arrayness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueType {
    pub ty: MetadataType,
    pub component_type: Option<ComponentType>,
    pub is_array: bool,
}

impl ValueType {
    pub fn new(ty: MetadataType, component_type: Option<ComponentType>) -> Self {
        Self {
            ty,
            component_type,
            is_array: false,
        }
    }

    pub fn array_of(ty: MetadataType, component_type: Option<ComponentType>) -> Self {
        Self {
            ty,
            component_type,
            is_array: true,
        }
    }

    /// Size in bytes of one element in a tightly packed value buffer. Booleans
    /// and strings are not byte-addressed and return `None`.
    pub fn element_byte_size(&self) -> Option<usize> {
        match self.ty {
            MetadataType::Boolean | MetadataType::String => None,
            ty => Some(ty.component_count() * self.component_type?.byte_size()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Uint(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

/// A single metadata value read from a property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Boolean(bool),
    Number(Number),
    Vector(Vec<Number>),
    /// Column-major matrix components.
    Matrix(Vec<Number>),
    String(String),
    Array(Vec<MetadataValue>),
}

impl MetadataValue {
    /// Numeric components of a non-array value, booleans as 0/1. Strings
    /// and arrays have no numeric components.
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            MetadataValue::Boolean(b) => Some(vec![if *b { 1.0 } else { 0.0 }]),
            MetadataValue::Number(n) => Some(vec![n.as_f64()]),
            MetadataValue::Vector(v) | MetadataValue::Matrix(v) => {
                Some(v.iter().map(|n| n.as_f64()).collect())
            }
            MetadataValue::String(_) | MetadataValue::Array(_) => None,
        }
    }
}
