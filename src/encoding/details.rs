//! How a metadata property is laid out in an encoded texture.

use serde::{Deserialize, Serialize};

use crate::data_structures::value::{ComponentType, MetadataType, MetadataValue, ValueType};

/// Shape of one encoded texel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodedType {
    #[default]
    None,
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl EncodedType {
    pub fn component_count(self) -> usize {
        match self {
            EncodedType::None => 0,
            EncodedType::Scalar => 1,
            EncodedType::Vec2 => 2,
            EncodedType::Vec3 => 3,
            EncodedType::Vec4 => 4,
        }
    }

    /// Channels actually stored per texel. Vec3 is padded to four channels.
    pub fn texel_channels(self) -> usize {
        match self {
            EncodedType::Vec3 => 4,
            other => other.component_count(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodedComponentType {
    #[default]
    None,
    Uint8,
    Float,
}

impl EncodedComponentType {
    pub fn byte_size(self) -> usize {
        match self {
            EncodedComponentType::None => 0,
            EncodedComponentType::Uint8 => 1,
            EncodedComponentType::Float => 4,
        }
    }

    /// Appends one component. Uint8 keeps the integral part of values in
    /// [0, 255] and writes 0 for anything else; Float narrows to 32 bits.
    pub fn write(self, out: &mut Vec<u8>, value: f64) {
        match self {
            EncodedComponentType::None => {}
            EncodedComponentType::Uint8 => {
                let value = value.trunc();
                out.push(if (0.0..=255.0).contains(&value) {
                    value as u8
                } else {
                    0
                });
            }
            EncodedComponentType::Float => {
                out.extend_from_slice(bytemuck::bytes_of(&(value as f32)));
            }
        }
    }
}

/// How source values are converted to the encoded component type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodedConversion {
    /// The property is not encoded.
    #[default]
    None,
    /// Values are converted numerically; strings are parsed as numbers or, when
    /// encoded as Uint8 scalars, laid out as byte runs.
    Coerce,
    /// Strings are parsed as CSS-style colours.
    ParseColorFromString,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetadataEncodingDetails {
    #[serde(rename = "type")]
    pub ty: EncodedType,
    pub component_type: EncodedComponentType,
    pub conversion: EncodedConversion,
    /// Declared maximum array length, or string length in bytes. Longer values
    /// are truncated. When absent, the longest value in the column is used.
    pub max_length: Option<u32>,
}

impl MetadataEncodingDetails {
    pub fn new(
        ty: EncodedType,
        component_type: EncodedComponentType,
        conversion: EncodedConversion,
    ) -> Self {
        Self {
            ty,
            component_type,
            conversion,
            max_length: None,
        }
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn has_valid_type(&self) -> bool {
        self.conversion != EncodedConversion::None
            && self.ty != EncodedType::None
            && self.component_type != EncodedComponentType::None
    }

    /// Whether any encoding exists for `value_type`. Matrices and arrays of
    /// strings do not fit in a texel, whatever an override asks for.
    pub fn can_encode(value_type: &ValueType) -> bool {
        let string_array = value_type.ty == MetadataType::String && value_type.is_array;
        !value_type.ty.is_matrix() && !string_array
    }

    /// The encoding that loses the least for a source type.
    ///
    /// 8-bit unsigned sources stay 8-bit; every other numeric source becomes
    /// 32-bit float, which loses precision for 32- and 64-bit integers and
    /// doubles. Matrices and arrays of strings have no encoding.
    pub fn best_fit(value_type: &ValueType) -> Self {
        let component = match value_type.component_type {
            Some(ComponentType::Uint8) => EncodedComponentType::Uint8,
            Some(_) => EncodedComponentType::Float,
            None => EncodedComponentType::None,
        };
        let (ty, component) = match value_type.ty {
            MetadataType::Boolean => (EncodedType::Scalar, EncodedComponentType::Uint8),
            MetadataType::Scalar | MetadataType::Enum => (EncodedType::Scalar, component),
            MetadataType::Vec2 => (EncodedType::Vec2, component),
            MetadataType::Vec3 => (EncodedType::Vec3, component),
            MetadataType::Vec4 => (EncodedType::Vec4, component),
            MetadataType::String if !value_type.is_array => {
                (EncodedType::Scalar, EncodedComponentType::Uint8)
            }
            _ => return Self::default(),
        };
        Self::new(ty, component, EncodedConversion::Coerce)
    }

    pub fn pixel_format(&self) -> Option<wgpu::TextureFormat> {
        use wgpu::TextureFormat as F;
        let format = match (self.ty, self.component_type) {
            (EncodedType::Scalar, EncodedComponentType::Uint8) => F::R8Uint,
            (EncodedType::Vec2, EncodedComponentType::Uint8) => F::Rg8Uint,
            (EncodedType::Vec3 | EncodedType::Vec4, EncodedComponentType::Uint8) => F::Rgba8Uint,
            (EncodedType::Scalar, EncodedComponentType::Float) => F::R32Float,
            (EncodedType::Vec2, EncodedComponentType::Float) => F::Rg32Float,
            (EncodedType::Vec3 | EncodedType::Vec4, EncodedComponentType::Float) => F::Rgba32Float,
            _ => return None,
        };
        Some(format)
    }

    /// Whether a string property is laid out byte by byte across texels rather
    /// than converted to one number or colour per feature.
    pub fn is_byte_run(&self, value_type: &ValueType) -> bool {
        value_type.ty == MetadataType::String
            && self.conversion == EncodedConversion::Coerce
            && self.component_type == EncodedComponentType::Uint8
    }

    /// Converts one non-array value into the components of one texel, padded or
    /// truncated to the encoded component count. Unconvertible values become 0.
    pub fn texel_components(&self, value: &MetadataValue) -> Vec<f64> {
        let count = self.ty.component_count();
        let mut components = match (self.conversion, value) {
            (EncodedConversion::ParseColorFromString, MetadataValue::String(s)) => {
                match parse_color(s) {
                    Some(rgba) if self.component_type == EncodedComponentType::Uint8 => {
                        rgba.iter().map(|c| (c * 255.0).round()).collect()
                    }
                    Some(rgba) => rgba.to_vec(),
                    None => Vec::new(),
                }
            }
            (_, MetadataValue::String(s)) => s.trim().parse::<f64>().into_iter().collect(),
            (_, value) => value.components().unwrap_or_default(),
        };
        components.resize(count, 0.0);
        components
    }
}

/// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)` into RGBA
/// components in [0, 1].
pub fn parse_color(color: &str) -> Option<[f64; 4]> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        let digits: Vec<u32> = hex
            .chars()
            .map(|c| c.to_digit(16))
            .collect::<Option<_>>()?;
        let rgb = match digits.as_slice() {
            [r, g, b] => [r * 17, g * 17, b * 17],
            [r1, r0, g1, g0, b1, b0] => [r1 * 16 + r0, g1 * 16 + g0, b1 * 16 + b0],
            _ => return None,
        };
        return Some([
            rgb[0] as f64 / 255.0,
            rgb[1] as f64 / 255.0,
            rgb[2] as f64 / 255.0,
            1.0,
        ]);
    }
    let (args, has_alpha) = if let Some(rest) = color.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else {
        (color.strip_prefix("rgb(")?.strip_suffix(')')?, false)
    };
    let values: Vec<f64> = args
        .split(',')
        .map(|v| v.trim().parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match (values.as_slice(), has_alpha) {
        ([r, g, b], false) => Some([r / 255.0, g / 255.0, b / 255.0, 1.0]),
        ([r, g, b, a], true) => Some([r / 255.0, g / 255.0, b / 255.0, a.clamp(0.0, 1.0)]),
        _ => None,
    }
}
