//! Encoding of property tables into one texture per property.
//!
//! Every feature owns `stride` consecutive texels, row-major from texel (0, 0):
//! feature `f` starts at texel index `f * stride`, found at
//! `(index % width, index / width)`. Plain values use a stride of 1. Arrays use
//! one texel per element, and strings laid out as byte runs pack one byte per
//! component. Both are padded to their maximum length and truncated beyond it.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Result, anyhow, ensure};
use log::{debug, warn};

use crate::{
    config::EncoderConfig,
    data_structures::{
        metadata::{PropertyTable, PropertyTablePropertyStatus, PropertyTableProperty},
        texture::{TexturePixels, TextureSlot, TextureUpload},
        value::{MetadataValue, ValueType},
    },
    encoding::{
        MATERIAL_PROPERTY_DEFAULT_VALUE_SUFFIX, MATERIAL_PROPERTY_HAS_VALUE_SUFFIX,
        MATERIAL_PROPERTY_NO_DATA_SUFFIX, MATERIAL_PROPERTY_OFFSET_SUFFIX,
        MATERIAL_PROPERTY_SCALE_SUFFIX, MATERIAL_PROPERTY_STRIDE_SUFFIX, MATERIAL_TEXTURE_SUFFIX,
        description::PropertyTableDescription,
        details::{EncodedConversion, MetadataEncodingDetails},
        naming::name_for_property_table_property,
    },
};

/// A property table property encoded into a texture.
#[derive(Debug)]
pub struct EncodedPropertyTableProperty<T> {
    /// `PTABLE_<table><property>`.
    pub name: String,
    pub value_type: ValueType,
    /// The encoding actually used, after best-fit resolution.
    pub encoding: MetadataEncodingDetails,
    /// Texels per feature.
    pub stride: u32,
    /// Owned by this property alone.
    pub texture: TextureSlot<T>,
    pub offset: Option<MetadataValue>,
    pub scale: Option<MetadataValue>,
    pub no_data: Option<MetadataValue>,
    pub default_value: Option<MetadataValue>,
}

impl<T> EncodedPropertyTableProperty<T> {
    fn suffixed(&self, suffix: &str) -> String {
        format!("{}{}", self.name, suffix)
    }

    pub fn texture_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_TEXTURE_SUFFIX)
    }

    pub fn offset_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_PROPERTY_OFFSET_SUFFIX)
    }

    pub fn scale_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_PROPERTY_SCALE_SUFFIX)
    }

    pub fn no_data_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_PROPERTY_NO_DATA_SUFFIX)
    }

    pub fn default_value_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_PROPERTY_DEFAULT_VALUE_SUFFIX)
    }

    pub fn has_value_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_PROPERTY_HAS_VALUE_SUFFIX)
    }

    pub fn stride_parameter_name(&self) -> String {
        self.suffixed(MATERIAL_PROPERTY_STRIDE_SUFFIX)
    }
}

/// A property table whose declared properties have been encoded, in
/// declaration order.
#[derive(Debug)]
pub struct EncodedPropertyTable<T> {
    /// Unique within the model.
    pub name: String,
    pub properties: Vec<EncodedPropertyTableProperty<T>>,
}

impl<T> EncodedPropertyTable<T> {
    /// Encodes the properties declared in `description` into CPU-side pixel
    /// buffers. Safe to call from any thread.
    ///
    /// Each property is encoded independently; one that is missing, invalid or
    /// has no encoding is skipped without affecting the others.
    pub fn encode_any_thread(
        config: &EncoderConfig,
        description: &PropertyTableDescription,
        property_table: &PropertyTable,
    ) -> Self {
        let mut properties = Vec::with_capacity(description.properties.len());
        for property_description in &description.properties {
            let Some(property) = property_table.property(&property_description.name) else {
                debug!(
                    "Property table {} has no property {}; skipping it.",
                    description.name, property_description.name
                );
                continue;
            };
            let status = property_table.property_status(property);
            if status != PropertyTablePropertyStatus::Valid {
                warn!(
                    "Property {} of table {} is invalid ({:?}); skipping it.",
                    property.name, description.name, status
                );
                continue;
            }
            if !MetadataEncodingDetails::can_encode(&property.value_type) {
                warn!(
                    "Property {} of table {} has unencodable type {:?}; skipping it.",
                    property.name, description.name, property.value_type
                );
                continue;
            }

            let encoding = property_description
                .encoding
                .unwrap_or_else(|| MetadataEncodingDetails::best_fit(&property.value_type));
            if encoding.conversion == EncodedConversion::None {
                continue;
            }
            if !encoding.has_valid_type() {
                warn!(
                    "Property {} of table {} has no GPU encoding for {:?}; skipping it.",
                    property.name, description.name, property.value_type
                );
                continue;
            }

            let name = name_for_property_table_property(&description.name, &property.name);
            match encode_values(config, &name, property, &encoding) {
                Ok((pixels, stride)) => properties.push(EncodedPropertyTableProperty {
                    name,
                    value_type: property.value_type,
                    encoding,
                    stride,
                    texture: TextureSlot::Pending(Arc::new(pixels)),
                    offset: property.details.offset.clone(),
                    scale: property.details.scale.clone(),
                    no_data: property.details.no_data.clone(),
                    default_value: property.details.default_value.clone(),
                }),
                Err(e) => warn!("Could not encode {}: {:#}; skipping it.", name, e),
            }
        }
        Self {
            name: description.name.clone(),
            properties,
        }
    }

    /// Uploads every property's pixel buffer. Must run on the thread that owns
    /// the graphics context. Returns `false` if any upload failed; the other
    /// properties are still uploaded.
    pub fn encode_game_thread<U>(&mut self, uploader: &U) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        // Table textures are never shared, so nothing is deduplicated.
        let mut unique = HashMap::new();
        self.properties.iter_mut().fold(true, |success, property| {
            property.texture.realize(uploader, &mut unique) && success
        })
    }

    pub fn destroy(&mut self) {
        for property in &mut self.properties {
            property.texture.release();
        }
    }
}

/// Smallest near-square texture holding `texel_count` texels within
/// `max_dimension` on each side.
pub fn texture_dimensions(texel_count: usize, max_dimension: u32) -> Result<(u32, u32)> {
    let texel_count = texel_count.max(1);
    let mut width = (texel_count as f64).sqrt() as usize;
    if width * width < texel_count {
        width += 1;
    }
    let width = width.clamp(1, max_dimension.max(1) as usize);
    let height = texel_count.div_ceil(width);
    ensure!(
        height <= max_dimension as usize,
        "{} texels do not fit into a {}x{} texture",
        texel_count,
        max_dimension,
        max_dimension
    );
    Ok((width as u32, height as u32))
}

fn string_len(value: &Option<MetadataValue>) -> usize {
    match value {
        Some(MetadataValue::String(s)) => s.len(),
        _ => 0,
    }
}

fn encode_values(
    config: &EncoderConfig,
    name: &str,
    property: &PropertyTableProperty,
    encoding: &MetadataEncodingDetails,
) -> Result<(TexturePixels, u32)> {
    let format = encoding
        .pixel_format()
        .ok_or_else(|| anyhow!("no texture format for {:?}", encoding))?;
    let components = encoding.ty.component_count();
    let padding = encoding.ty.texel_channels() - components;
    let texel_size = TexturePixels::texel_size(format) as usize;
    let byte_run = encoding.is_byte_run(&property.value_type);

    let values: Vec<Option<MetadataValue>> = (0..property.size).map(|row| property.get(row)).collect();

    let max_bytes = if byte_run {
        encoding
            .max_length
            .map(|m| m as usize)
            .unwrap_or_else(|| values.iter().map(string_len).max().unwrap_or(0))
    } else {
        0
    };
    let stride = if byte_run {
        max_bytes.div_ceil(components)
    } else if property.value_type.is_array {
        encoding
            .max_length
            .map(|m| m as usize)
            .or(property.array_count)
            .unwrap_or_else(|| {
                (0..property.size)
                    .map(|row| property.array_size(row))
                    .max()
                    .unwrap_or(0)
            })
    } else {
        1
    }
    .max(1);

    let (width, height) = texture_dimensions(property.size * stride, config.max_texture_dimension)?;
    let mut data = Vec::with_capacity(width as usize * height as usize * texel_size);
    let write_texel = |data: &mut Vec<u8>, texel: &[f64]| {
        for &component in texel {
            encoding.component_type.write(data, component);
        }
        for _ in 0..padding {
            encoding.component_type.write(data, 0.0);
        }
    };
    let zeros = vec![0.0; components];

    for value in &values {
        if byte_run {
            let bytes: &[u8] = match value {
                Some(MetadataValue::String(s)) => s.as_bytes(),
                _ => &[],
            };
            // Lossy by contract: strings longer than the declared maximum are cut.
            let bytes = &bytes[..bytes.len().min(max_bytes)];
            for t in 0..stride {
                let texel: Vec<f64> = (0..components)
                    .map(|c| bytes.get(t * components + c).map_or(0.0, |&b| b as f64))
                    .collect();
                write_texel(&mut data, &texel);
            }
        } else if property.value_type.is_array {
            let elements: &[MetadataValue] = match value {
                Some(MetadataValue::Array(elements)) => elements,
                _ => &[],
            };
            for e in 0..stride {
                match elements.get(e) {
                    Some(element) => write_texel(&mut data, &encoding.texel_components(element)),
                    None => write_texel(&mut data, &zeros),
                }
            }
        } else {
            match value {
                Some(value) => write_texel(&mut data, &encoding.texel_components(value)),
                None => write_texel(&mut data, &zeros),
            }
        }
    }
    data.resize(width as usize * height as usize * texel_size, 0);

    Ok((
        TexturePixels {
            label: name.to_string(),
            image_id: None,
            width,
            height,
            format,
            data,
        },
        stride as u32,
    ))
}
