//! Encoding of property textures.
//!
//! Property textures already store their values in image channels, so nothing
//! is resampled or repacked beyond padding three-channel images. The work is in
//! sharing: properties often pack several values into different channels of one
//! image, and that image must reach the GPU exactly once per model.

use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};

use crate::{
    data_structures::{
        image::ImageId,
        metadata::{PropertyTexture, PropertyTexturePropertyStatus},
        texture::{TexturePixels, TextureSlot, TextureUpload},
        value::{MetadataValue, ValueType},
    },
    encoding::{
        MATERIAL_CHANNELS_SUFFIX, MATERIAL_TEX_COORD_INDEX_SUFFIX, MATERIAL_TEXTURE_SUFFIX,
        description::PropertyTextureDescription, naming::name_for_property_texture_property,
    },
};

#[derive(Debug)]
pub struct EncodedPropertyTextureProperty<T> {
    /// `PTEXTURE_<texture><property>`.
    pub base_name: String,
    pub value_type: ValueType,
    /// Shared with every property of the model that reads the same image.
    pub texture: TextureSlot<T>,
    pub tex_coord_set_index: i64,
    /// Image channel read into each value component; -1 where unused.
    pub channel_offsets: [i32; 4],
    /// Anything but `Valid` leaves `texture` empty.
    pub status: PropertyTexturePropertyStatus,
    pub offset: Option<MetadataValue>,
    pub scale: Option<MetadataValue>,
    pub no_data: Option<MetadataValue>,
    pub default_value: Option<MetadataValue>,
}

impl<T> EncodedPropertyTextureProperty<T> {
    pub fn texture_parameter_name(&self) -> String {
        format!("{}{}", self.base_name, MATERIAL_TEXTURE_SUFFIX)
    }

    pub fn tex_coord_index_parameter_name(&self) -> String {
        format!("{}{}", self.base_name, MATERIAL_TEX_COORD_INDEX_SUFFIX)
    }

    pub fn channels_parameter_name(&self) -> String {
        format!("{}{}", self.base_name, MATERIAL_CHANNELS_SUFFIX)
    }
}

#[derive(Debug)]
pub struct EncodedPropertyTexture<T> {
    pub name: String,
    pub properties: Vec<EncodedPropertyTextureProperty<T>>,
}

impl<T> EncodedPropertyTexture<T> {
    /// Prepares the properties declared in `description`. Safe to call from any
    /// thread.
    ///
    /// `image_sharing` spans one model encode: an image already prepared for
    /// another property, of this or any other property texture, is reused
    /// instead of copied.
    pub fn encode_any_thread(
        image_sharing: &mut HashMap<ImageId, Arc<TexturePixels>>,
        description: &PropertyTextureDescription,
        property_texture_name: &str,
        property_texture: &PropertyTexture,
    ) -> Self {
        let mut properties = Vec::with_capacity(description.properties.len());
        for property_description in &description.properties {
            let Some(property) = property_texture.property(&property_description.name) else {
                debug!(
                    "Property texture {} has no property {}; skipping it.",
                    property_texture_name, property_description.name
                );
                continue;
            };
            let base_name = name_for_property_texture_property(property_texture_name, &property.name);

            let status = property.status();
            let texture = match (&property.image, status) {
                (Some(image), PropertyTexturePropertyStatus::Valid) => {
                    let pixels = image_sharing
                        .entry(image.id)
                        .or_insert_with(|| Arc::new(TexturePixels::from_image(image, &base_name)))
                        .clone();
                    TextureSlot::Pending(pixels)
                }
                (_, status) => {
                    warn!(
                        "Property {} of texture {} is invalid ({:?}); it will have no texture.",
                        property.name, property_texture_name, status
                    );
                    TextureSlot::Empty
                }
            };

            let mut channel_offsets = [-1; 4];
            if status == PropertyTexturePropertyStatus::Valid {
                for (offset, &channel) in channel_offsets.iter_mut().zip(&property.channels) {
                    *offset = channel as i32;
                }
            }

            properties.push(EncodedPropertyTextureProperty {
                base_name,
                value_type: property.value_type,
                texture,
                tex_coord_set_index: property.tex_coord_set_index,
                channel_offsets,
                status,
                offset: property.details.offset.clone(),
                scale: property.details.scale.clone(),
                no_data: property.details.no_data.clone(),
                default_value: property.details.default_value.clone(),
            });
        }
        Self {
            name: property_texture_name.to_string(),
            properties,
        }
    }

    /// Creates the GPU texture of every distinct image, once. Must run on the
    /// thread that owns the graphics context.
    ///
    /// `unique_textures` spans one model encode and maps each image to its GPU
    /// texture, or to `None` once its upload failed. Properties of different
    /// property textures that read the same image end up pointing at the same
    /// resource.
    pub fn encode_game_thread<U>(
        &mut self,
        uploader: &U,
        unique_textures: &mut HashMap<ImageId, Option<Arc<T>>>,
    ) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        self.properties.iter_mut().fold(true, |success, property| {
            property.texture.realize(uploader, unique_textures) && success
        })
    }

    pub fn destroy(&mut self) {
        for property in &mut self.properties {
            property.texture.release();
        }
    }
}
