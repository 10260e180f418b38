//! Structural metadata of a glTF model (`EXT_structural_metadata`).
//!
//! Property table columns keep the binary layout of the glTF buffer views they
//! come from: little-endian values, bit-packed booleans, byte offsets for
//! variable-length arrays and string offsets for strings. The typed reader
//! [`PropertyTableProperty::get`] turns a row back into a [`MetadataValue`].

use std::{ops::Range, sync::Arc};

use crate::data_structures::{
    image::ImageData,
    value::{ComponentType, MetadataType, MetadataValue, Number, ValueType},
};

/// Side values applied to a property in the shader rather than on the CPU.
/// These are taken verbatim from the source and never recomputed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyValueDetails {
    pub offset: Option<MetadataValue>,
    pub scale: Option<MetadataValue>,
    pub no_data: Option<MetadataValue>,
    pub default_value: Option<MetadataValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyTablePropertyStatus {
    Valid,
    ErrorInvalidProperty,
    ErrorInvalidPropertyData,
}

/// One column of a property table.
#[derive(Clone, Debug)]
pub struct PropertyTableProperty {
    pub name: String,
    pub value_type: ValueType,
    /// Element count of a fixed-length array property.
    pub array_count: Option<usize>,
    /// Number of rows.
    pub size: usize,
    pub values: Vec<u8>,
    pub array_offsets: Option<Vec<u64>>,
    pub string_offsets: Option<Vec<u64>>,
    pub details: PropertyValueDetails,
}

impl PropertyTableProperty {
    pub fn new(name: impl Into<String>, value_type: ValueType, size: usize, values: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value_type,
            array_count: None,
            size,
            values,
            array_offsets: None,
            string_offsets: None,
            details: PropertyValueDetails::default(),
        }
    }

    /// Builds a numeric column from tightly packed components, e.g. `&[f32]`
    /// for a `Vec3`/`Float32` property holding three floats per row. Array
    /// columns are built with [`new`](Self::new) since their row count does not
    /// follow from the component count.
    pub fn from_numbers<T: bytemuck::Pod>(
        name: impl Into<String>,
        value_type: ValueType,
        components: &[T],
    ) -> Self {
        let per_row = value_type.ty.component_count().max(1);
        let size = components.len() / per_row;
        Self::new(
            name,
            value_type,
            size,
            bytemuck::cast_slice(components).to_vec(),
        )
    }

    /// Builds a bit-packed boolean column.
    pub fn from_booleans(name: impl Into<String>, values: &[bool]) -> Self {
        let mut bits = vec![0u8; values.len().div_ceil(8)];
        for (i, _) in values.iter().enumerate().filter(|(_, v)| **v) {
            bits[i / 8] |= 1 << (i % 8);
        }
        Self::new(
            name,
            ValueType::new(MetadataType::Boolean, None),
            values.len(),
            bits,
        )
    }

    /// Builds a string column with `u64` string offsets.
    pub fn from_strings(name: impl Into<String>, values: &[&str]) -> Self {
        let mut bytes = Vec::new();
        let mut offsets = Vec::with_capacity(values.len() + 1);
        offsets.push(0);
        for value in values {
            bytes.extend_from_slice(value.as_bytes());
            offsets.push(bytes.len() as u64);
        }
        let mut property = Self::new(
            name,
            ValueType::new(MetadataType::String, None),
            values.len(),
            bytes,
        );
        property.string_offsets = Some(offsets);
        property
    }

    pub fn with_array_count(mut self, count: usize) -> Self {
        self.array_count = Some(count);
        self
    }

    pub fn with_array_offsets(mut self, offsets: Vec<u64>) -> Self {
        self.array_offsets = Some(offsets);
        self
    }

    pub fn with_string_offsets(mut self, offsets: Vec<u64>) -> Self {
        self.string_offsets = Some(offsets);
        self
    }

    pub fn with_details(mut self, details: PropertyValueDetails) -> Self {
        self.details = details;
        self
    }

    pub fn status(&self) -> PropertyTablePropertyStatus {
        let ty = self.value_type;
        let numeric = !matches!(ty.ty, MetadataType::Boolean | MetadataType::String);
        if numeric && ty.component_type.is_none() {
            return PropertyTablePropertyStatus::ErrorInvalidProperty;
        }
        if ty.ty == MetadataType::String && self.string_offsets.is_none() {
            return PropertyTablePropertyStatus::ErrorInvalidProperty;
        }
        if ty.is_array {
            match (self.array_count, &self.array_offsets) {
                (Some(0), _) | (None, None) => {
                    return PropertyTablePropertyStatus::ErrorInvalidProperty;
                }
                (None, Some(offsets)) if offsets.len() < self.size + 1 => {
                    return PropertyTablePropertyStatus::ErrorInvalidPropertyData;
                }
                _ => {}
            }
        }
        if self.has_valid_data() {
            PropertyTablePropertyStatus::Valid
        } else {
            PropertyTablePropertyStatus::ErrorInvalidPropertyData
        }
    }

    fn has_valid_data(&self) -> bool {
        let element_count = if self.size == 0 {
            0
        } else {
            match self.element_range(self.size - 1) {
                Some(range) => range.end,
                None => return false,
            }
        };
        match self.value_type.ty {
            MetadataType::Boolean => element_count <= self.values.len() * 8,
            MetadataType::String => match &self.string_offsets {
                Some(offsets) => offsets
                    .get(element_count)
                    .is_some_and(|&end| end as usize <= self.values.len()),
                None => false,
            },
            _ => match self.value_type.element_byte_size() {
                Some(element_size) => element_count * element_size <= self.values.len(),
                None => false,
            },
        }
    }

    /// Element indices making up `row`. For non-array properties this is a single
    /// element.
    fn element_range(&self, row: usize) -> Option<Range<usize>> {
        if !self.value_type.is_array {
            return Some(row..row + 1);
        }
        if let Some(count) = self.array_count {
            return Some(row * count..(row + 1) * count);
        }
        let offsets = self.array_offsets.as_ref()?;
        let start = *offsets.get(row)? as usize;
        let end = *offsets.get(row + 1)? as usize;
        if end < start {
            return None;
        }
        match self.value_type.ty {
            // Bit offsets for booleans, string indices for strings.
            MetadataType::Boolean | MetadataType::String => Some(start..end),
            _ => {
                let element_size = self.value_type.element_byte_size()?;
                Some(start / element_size..end / element_size)
            }
        }
    }

    fn read_element(&self, index: usize) -> Option<MetadataValue> {
        let ty = self.value_type;
        match ty.ty {
            MetadataType::Boolean => {
                let byte = self.values.get(index / 8)?;
                Some(MetadataValue::Boolean((byte >> (index % 8)) & 1 == 1))
            }
            MetadataType::String => {
                let offsets = self.string_offsets.as_ref()?;
                let start = *offsets.get(index)? as usize;
                let end = *offsets.get(index + 1)? as usize;
                let bytes = self.values.get(start..end)?;
                Some(MetadataValue::String(
                    String::from_utf8_lossy(bytes).into_owned(),
                ))
            }
            MetadataType::Scalar | MetadataType::Enum => {
                let component_type = ty.component_type?;
                let start = index * component_type.byte_size();
                let number = component_type.read(self.values.get(start..)?)?;
                Some(MetadataValue::Number(number))
            }
            vector_or_matrix => {
                let components = self.read_components(index, vector_or_matrix.component_count())?;
                if vector_or_matrix.is_matrix() {
                    Some(MetadataValue::Matrix(components))
                } else {
                    Some(MetadataValue::Vector(components))
                }
            }
        }
    }

    fn read_components(&self, index: usize, count: usize) -> Option<Vec<Number>> {
        let component_type: ComponentType = self.value_type.component_type?;
        let size = component_type.byte_size();
        let start = index * count * size;
        (0..count)
            .map(|c| component_type.read(self.values.get(start + c * size..)?))
            .collect()
    }

    /// Reads the raw value of `row`, without offset/scale or no-data handling.
    pub fn get(&self, row: usize) -> Option<MetadataValue> {
        if row >= self.size || self.status() != PropertyTablePropertyStatus::Valid {
            return None;
        }
        if !self.value_type.is_array {
            return self.read_element(row);
        }
        let elements = self
            .element_range(row)?
            .map(|i| self.read_element(i))
            .collect::<Option<Vec<_>>>()?;
        Some(MetadataValue::Array(elements))
    }

    /// Number of elements in the array at `row`; 0 for non-array properties.
    pub fn array_size(&self, row: usize) -> usize {
        if !self.value_type.is_array || row >= self.size {
            return 0;
        }
        self.element_range(row).map_or(0, |r| r.len())
    }
}

#[derive(Clone, Debug, Default)]
pub struct PropertyTable {
    pub name: Option<String>,
    pub class_name: String,
    pub count: usize,
    pub properties: Vec<PropertyTableProperty>,
}

impl PropertyTable {
    pub fn property(&self, name: &str) -> Option<&PropertyTableProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Status of `property` as a column of this table. A column must hold
    /// exactly one row per feature of the table.
    pub fn property_status(
        &self,
        property: &PropertyTableProperty,
    ) -> PropertyTablePropertyStatus {
        if property.size != self.count {
            return PropertyTablePropertyStatus::ErrorInvalidPropertyData;
        }
        property.status()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyTexturePropertyStatus {
    Valid,
    ErrorInvalidProperty,
    ErrorUnsupportedProperty,
    ErrorInvalidTexture,
    ErrorInvalidTexCoordSetIndex,
    ErrorInvalidChannels,
}

/// A property whose values live in the channels of an image.
#[derive(Clone, Debug)]
pub struct PropertyTextureProperty {
    pub name: String,
    pub value_type: ValueType,
    pub array_count: Option<usize>,
    pub image: Option<Arc<ImageData>>,
    pub channels: Vec<u8>,
    pub tex_coord_set_index: i64,
    pub details: PropertyValueDetails,
}

impl PropertyTextureProperty {
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        image: Option<Arc<ImageData>>,
        channels: Vec<u8>,
        tex_coord_set_index: i64,
    ) -> Self {
        Self {
            name: name.into(),
            value_type,
            array_count: None,
            image,
            channels,
            tex_coord_set_index,
            details: PropertyValueDetails::default(),
        }
    }

    pub fn with_array_count(mut self, count: usize) -> Self {
        self.array_count = Some(count);
        self
    }

    pub fn with_details(mut self, details: PropertyValueDetails) -> Self {
        self.details = details;
        self
    }

    pub fn status(&self) -> PropertyTexturePropertyStatus {
        let ty = self.value_type;
        if matches!(ty.ty, MetadataType::Boolean | MetadataType::String) || ty.ty.is_matrix() {
            return PropertyTexturePropertyStatus::ErrorUnsupportedProperty;
        }
        if ty.is_array && self.array_count.is_none() {
            return PropertyTexturePropertyStatus::ErrorUnsupportedProperty;
        }
        let Some(element_size) = ty.element_byte_size() else {
            return PropertyTexturePropertyStatus::ErrorInvalidProperty;
        };
        let Some(image) = &self.image else {
            return PropertyTexturePropertyStatus::ErrorInvalidTexture;
        };
        if self.tex_coord_set_index < 0 {
            return PropertyTexturePropertyStatus::ErrorInvalidTexCoordSetIndex;
        }
        let value_size = element_size * self.array_count.unwrap_or(1);
        let channel_bytes = self.channels.len() * image.bytes_per_channel as usize;
        if self.channels.is_empty()
            || self.channels.len() > 4
            || self.channels.iter().any(|&c| c >= image.channels)
            || channel_bytes != value_size
        {
            return PropertyTexturePropertyStatus::ErrorInvalidChannels;
        }
        PropertyTexturePropertyStatus::Valid
    }
}

#[derive(Clone, Debug, Default)]
pub struct PropertyTexture {
    pub name: Option<String>,
    pub class_name: String,
    pub properties: Vec<PropertyTextureProperty>,
}

impl PropertyTexture {
    pub fn property(&self, name: &str) -> Option<&PropertyTextureProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Model-wide metadata: every property table and property texture.
#[derive(Clone, Debug, Default)]
pub struct ModelMetadata {
    pub property_tables: Vec<PropertyTable>,
    pub property_textures: Vec<PropertyTexture>,
}

/// Per-primitive metadata references into the model's metadata.
#[derive(Clone, Debug, Default)]
pub struct PrimitiveMetadata {
    pub property_texture_indices: Vec<usize>,
}
