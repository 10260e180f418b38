//! Per-primitive and per-model aggregates of the encoders.
//!
//! A model's property tables and property textures are encoded once and shared
//! by all of its primitives. Each primitive encodes its own feature ID sets and
//! records which of the model's property textures it samples.

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{
    config::EncoderConfig,
    data_structures::{
        image::ImageId,
        metadata::{ModelMetadata, PrimitiveMetadata},
        model::{Model, Primitive},
        texture::{TexturePixels, TextureUpload},
    },
    encoding::{
        description::{FeaturesMetadataDescription, ModelMetadataDescription},
        features::EncodedPrimitiveFeatures,
        naming::{name_for_property_table, name_for_property_texture},
        property_table::EncodedPropertyTable,
        property_texture::EncodedPropertyTexture,
    },
};

/// Names of the model's property textures a primitive samples, in
/// description order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodedPrimitiveMetadata {
    pub property_texture_names: Vec<String>,
}

impl EncodedPrimitiveMetadata {
    pub fn encode_any_thread(
        description: &ModelMetadataDescription,
        model_metadata: &ModelMetadata,
        primitive: &PrimitiveMetadata,
    ) -> Self {
        let used: Vec<String> = primitive
            .property_texture_indices
            .iter()
            .filter_map(|&index| {
                let texture = model_metadata.property_textures.get(index);
                if texture.is_none() {
                    debug!("Primitive references missing property texture {}.", index);
                }
                texture.map(|texture| name_for_property_texture(texture, index))
            })
            .collect();
        let property_texture_names = description
            .property_textures
            .iter()
            .filter(|d| used.contains(&d.name))
            .map(|d| d.name.clone())
            .collect();
        Self {
            property_texture_names,
        }
    }

    /// Primitive metadata owns no GPU resources; this always succeeds.
    pub fn encode_game_thread(&mut self) -> bool {
        true
    }

    pub fn destroy(&mut self) {
        self.property_texture_names.clear();
    }
}

/// The encoded `EXT_structural_metadata` of a model.
#[derive(Debug)]
pub struct EncodedModelMetadata<T> {
    pub property_tables: Vec<EncodedPropertyTable<T>>,
    pub property_textures: Vec<EncodedPropertyTexture<T>>,
}

impl<T> Default for EncodedModelMetadata<T> {
    fn default() -> Self {
        Self {
            property_tables: Vec::new(),
            property_textures: Vec::new(),
        }
    }
}

impl<T> EncodedModelMetadata<T> {
    /// Encodes every property table and property texture the description
    /// declares, in declaration order. Declarations the model does not have are
    /// skipped.
    pub fn encode_any_thread(
        config: &EncoderConfig,
        description: &ModelMetadataDescription,
        model_metadata: &ModelMetadata,
    ) -> Self {
        let table_names: Vec<String> = model_metadata
            .property_tables
            .iter()
            .enumerate()
            .map(|(i, table)| name_for_property_table(table, i))
            .collect();
        let texture_names: Vec<String> = model_metadata
            .property_textures
            .iter()
            .enumerate()
            .map(|(i, texture)| name_for_property_texture(texture, i))
            .collect();

        let mut encoded = Self::default();
        for table_description in &description.property_tables {
            match table_names.iter().position(|n| *n == table_description.name) {
                Some(index) => encoded.property_tables.push(EncodedPropertyTable::encode_any_thread(
                    config,
                    table_description,
                    &model_metadata.property_tables[index],
                )),
                None => debug!(
                    "Model has no property table named {}; skipping it.",
                    table_description.name
                ),
            }
        }

        let mut image_sharing: HashMap<ImageId, Arc<TexturePixels>> = HashMap::new();
        for texture_description in &description.property_textures {
            match texture_names.iter().position(|n| *n == texture_description.name) {
                Some(index) => encoded
                    .property_textures
                    .push(EncodedPropertyTexture::encode_any_thread(
                        &mut image_sharing,
                        texture_description,
                        &texture_description.name,
                        &model_metadata.property_textures[index],
                    )),
                None => debug!(
                    "Model has no property texture named {}; skipping it.",
                    texture_description.name
                ),
            }
        }
        encoded
    }

    /// Uploads every table and texture. A failure in one of them does not stop
    /// the others; the result is `false` if anything failed.
    pub fn encode_game_thread<U>(&mut self, uploader: &U) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        let mut success = true;
        for table in &mut self.property_tables {
            success &= table.encode_game_thread(uploader);
        }
        let mut unique_textures: HashMap<ImageId, Option<Arc<T>>> = HashMap::new();
        for texture in &mut self.property_textures {
            success &= texture.encode_game_thread(uploader, &mut unique_textures);
        }
        success
    }

    pub fn destroy(&mut self) {
        for table in &mut self.property_tables {
            table.destroy();
        }
        for texture in &mut self.property_textures {
            texture.destroy();
        }
    }

    pub fn property_table(&self, name: &str) -> Option<&EncodedPropertyTable<T>> {
        self.property_tables.iter().find(|t| t.name == name)
    }

    pub fn property_texture(&self, name: &str) -> Option<&EncodedPropertyTexture<T>> {
        self.property_textures.iter().find(|t| t.name == name)
    }
}

/// Everything encoded for one primitive.
#[derive(Debug)]
pub struct EncodedPrimitive<T> {
    pub features: EncodedPrimitiveFeatures<T>,
    pub metadata: EncodedPrimitiveMetadata,
}

impl<T> EncodedPrimitive<T> {
    pub fn encode_any_thread(
        description: &FeaturesMetadataDescription,
        model_metadata: &ModelMetadata,
        primitive: &Primitive,
    ) -> Self {
        Self {
            features: EncodedPrimitiveFeatures::encode_any_thread(
                &description.features,
                &primitive.features,
                &model_metadata.property_tables,
            ),
            metadata: EncodedPrimitiveMetadata::encode_any_thread(
                &description.metadata,
                model_metadata,
                &primitive.metadata,
            ),
        }
    }

    pub fn encode_game_thread<U>(&mut self, uploader: &U) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        let features = self.features.encode_game_thread(uploader);
        let metadata = self.metadata.encode_game_thread();
        features && metadata
    }

    pub fn destroy(&mut self) {
        self.features.destroy();
        self.metadata.destroy();
    }
}

/// Everything encoded for one model: its metadata and each of its primitives,
/// in model order.
#[derive(Debug)]
pub struct EncodedModel<T> {
    pub name: String,
    pub metadata: EncodedModelMetadata<T>,
    pub primitives: Vec<EncodedPrimitive<T>>,
}

impl<T> EncodedModel<T> {
    pub fn encode_any_thread(
        config: &EncoderConfig,
        description: &FeaturesMetadataDescription,
        model: &Model,
    ) -> Self {
        Self {
            name: model.name.clone(),
            metadata: EncodedModelMetadata::encode_any_thread(
                config,
                &description.metadata,
                &model.metadata,
            ),
            primitives: model
                .primitives
                .iter()
                .map(|p| EncodedPrimitive::encode_any_thread(description, &model.metadata, p))
                .collect(),
        }
    }

    /// Runs the game-thread phase of the metadata and every primitive, all of
    /// them even if an earlier one fails.
    pub fn encode_game_thread<U>(&mut self, uploader: &U) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        let mut success = self.metadata.encode_game_thread(uploader);
        for primitive in &mut self.primitives {
            success &= primitive.encode_game_thread(uploader);
        }
        success
    }

    pub fn destroy(&mut self) {
        for primitive in &mut self.primitives {
            primitive.destroy();
        }
        self.metadata.destroy();
    }
}
