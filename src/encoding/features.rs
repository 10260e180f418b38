//! Encoding of a primitive's feature ID sets (`EXT_mesh_features`).

use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};

use crate::{
    data_structures::{
        features::{
            FeatureIdAttributeStatus, FeatureIdSetKind, FeatureIdTextureStatus, PrimitiveFeatures,
        },
        image::ImageId,
        metadata::PropertyTable,
        texture::{TexturePixels, TextureSlot, TextureUpload},
    },
    encoding::{
        MATERIAL_CHANNELS_SUFFIX, MATERIAL_NULL_FEATURE_ID_SUFFIX, MATERIAL_NUM_CHANNELS_SUFFIX,
        MATERIAL_TEX_COORD_INDEX_SUFFIX, MATERIAL_TEXTURE_SUFFIX,
        description::{FeatureIdSetDescription, FeatureIdSetType, PrimitiveFeaturesDescription},
        naming::{name_for_feature_id_set, name_for_property_table},
    },
};

/// A feature ID texture prepared for the GPU.
#[derive(Debug)]
pub struct EncodedFeatureIdTexture<T> {
    /// Shared with every other set of the primitive that uses the same image.
    pub texture: TextureSlot<T>,
    /// Image channels holding the feature ID, least significant byte first.
    pub channels: Vec<u8>,
    pub tex_coord_set_index: i64,
    /// Anything but `Valid` leaves `texture` empty.
    pub status: FeatureIdTextureStatus,
}

#[derive(Debug)]
pub enum EncodedFeatureIdSource<T> {
    /// Set index of the `_FEATURE_ID_<n>` vertex attribute.
    Attribute(i64),
    Texture(EncodedFeatureIdTexture<T>),
    Implicit,
}

#[derive(Debug)]
pub struct EncodedFeatureIdSet<T> {
    /// Unique within the primitive and used verbatim in the material.
    pub name: String,
    /// Index of the set in the primitive's source feature ID sets.
    pub index: usize,
    pub source: EncodedFeatureIdSource<T>,
    /// Property table the IDs index into; empty if none.
    pub property_table_name: String,
    /// Number of distinct features, not counting the null feature ID.
    pub feature_count: i64,
    pub null_feature_id: Option<i64>,
}

impl<T> EncodedFeatureIdSet<T> {
    pub fn texture(&self) -> Option<&EncodedFeatureIdTexture<T>> {
        match &self.source {
            EncodedFeatureIdSource::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn texture_parameter_name(&self) -> String {
        format!("{}{}", self.name, MATERIAL_TEXTURE_SUFFIX)
    }

    pub fn tex_coord_index_parameter_name(&self) -> String {
        format!("{}{}", self.name, MATERIAL_TEX_COORD_INDEX_SUFFIX)
    }

    pub fn channels_parameter_name(&self) -> String {
        format!("{}{}", self.name, MATERIAL_CHANNELS_SUFFIX)
    }

    pub fn num_channels_parameter_name(&self) -> String {
        format!("{}{}", self.name, MATERIAL_NUM_CHANNELS_SUFFIX)
    }

    pub fn null_feature_id_parameter_name(&self) -> String {
        format!("{}{}", self.name, MATERIAL_NULL_FEATURE_ID_SUFFIX)
    }
}

/// The encoded feature ID sets of one primitive, in description order.
#[derive(Debug)]
pub struct EncodedPrimitiveFeatures<T> {
    pub feature_id_sets: Vec<EncodedFeatureIdSet<T>>,
}

impl<T> Default for EncodedPrimitiveFeatures<T> {
    fn default() -> Self {
        Self {
            feature_id_sets: Vec::new(),
        }
    }
}

fn kind_matches(expected: Option<FeatureIdSetType>, kind: &FeatureIdSetKind) -> bool {
    match (expected, kind) {
        (None, _) => true,
        (Some(FeatureIdSetType::Attribute), FeatureIdSetKind::Attribute(_)) => true,
        (Some(FeatureIdSetType::Texture), FeatureIdSetKind::Texture(_)) => true,
        (Some(FeatureIdSetType::Implicit), FeatureIdSetKind::Implicit) => true,
        _ => false,
    }
}

impl<T> EncodedPrimitiveFeatures<T> {
    /// Prepares the feature ID sets named in `description` without touching the
    /// GPU. Safe to call from any thread.
    ///
    /// Sets are emitted in declaration order. Declared sets the primitive does
    /// not have are skipped. Feature ID textures that reference the same image
    /// share one pixel buffer. A set whose description names no property
    /// table falls back to the model table it references in `property_tables`.
    pub fn encode_any_thread(
        description: &PrimitiveFeaturesDescription,
        features: &PrimitiveFeatures,
        property_tables: &[PropertyTable],
    ) -> Self {
        // Names depend on source order through the texture counter, so all of
        // them are generated before matching against the description.
        let mut feature_id_texture_counter = 0;
        let names: Vec<String> = features
            .feature_id_sets
            .iter()
            .map(|set| name_for_feature_id_set(set, &mut feature_id_texture_counter))
            .collect();

        let mut image_sharing: HashMap<ImageId, Arc<TexturePixels>> = HashMap::new();
        let mut encoded = Self::default();
        for set_description in &description.feature_id_sets {
            if encoded
                .feature_id_sets
                .iter()
                .any(|s| s.name == set_description.name)
            {
                debug!(
                    "Feature ID set {} is declared more than once; encoding it once.",
                    set_description.name
                );
                continue;
            }
            let Some(index) = names.iter().position(|n| *n == set_description.name) else {
                debug!(
                    "Primitive has no feature ID set named {}; skipping it.",
                    set_description.name
                );
                continue;
            };
            let set = &features.feature_id_sets[index];
            if !kind_matches(set_description.kind, &set.kind) {
                warn!(
                    "Feature ID set {} is not of the declared type {:?}; skipping it.",
                    set_description.name, set_description.kind
                );
                continue;
            }

            let Some(source) = encode_source(&mut image_sharing, set_description, &set.kind)
            else {
                continue;
            };
            let property_table_name = if set_description.property_table_name.is_empty() {
                set.property_table_index
                    .and_then(|i| property_tables.get(i).map(|t| name_for_property_table(t, i)))
                    .unwrap_or_default()
            } else {
                set_description.property_table_name.clone()
            };
            encoded.feature_id_sets.push(EncodedFeatureIdSet {
                name: set_description.name.clone(),
                index,
                source,
                property_table_name,
                feature_count: set.feature_count,
                null_feature_id: set.null_feature_id,
            });
        }
        encoded
    }

    /// Creates the GPU textures of every texture-backed set. Must run on the
    /// thread that owns the graphics context.
    ///
    /// Returns `false` if any upload failed. A failure only affects its own
    /// set; the remaining sets are still uploaded.
    pub fn encode_game_thread<U>(&mut self, uploader: &U) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        let mut unique: HashMap<ImageId, Option<Arc<T>>> = HashMap::new();
        let mut success = true;
        for set in &mut self.feature_id_sets {
            if let EncodedFeatureIdSource::Texture(texture) = &mut set.source {
                success &= texture.texture.realize(uploader, &mut unique);
            }
        }
        success
    }

    /// Releases every texture this primitive holds. Calling it again, or on a
    /// structure that never reached the game thread, does nothing.
    pub fn destroy(&mut self) {
        for set in &mut self.feature_id_sets {
            if let EncodedFeatureIdSource::Texture(texture) = &mut set.source {
                texture.texture.release();
            }
        }
    }
}

fn encode_source<T>(
    image_sharing: &mut HashMap<ImageId, Arc<TexturePixels>>,
    description: &FeatureIdSetDescription,
    kind: &FeatureIdSetKind,
) -> Option<EncodedFeatureIdSource<T>> {
    match kind {
        FeatureIdSetKind::Attribute(attribute) => {
            if attribute.status != FeatureIdAttributeStatus::Valid {
                warn!(
                    "Feature ID attribute {} is invalid ({:?}); skipping it.",
                    description.name, attribute.status
                );
                return None;
            }
            Some(EncodedFeatureIdSource::Attribute(attribute.set_index))
        }
        FeatureIdSetKind::Implicit => Some(EncodedFeatureIdSource::Implicit),
        FeatureIdSetKind::Texture(texture) => {
            let slot = match (&texture.image, texture.status) {
                (Some(image), FeatureIdTextureStatus::Valid) => {
                    let pixels = image_sharing
                        .entry(image.id)
                        .or_insert_with(|| {
                            Arc::new(TexturePixels::from_image(image, &description.name))
                        })
                        .clone();
                    TextureSlot::Pending(pixels)
                }
                (_, status) => {
                    warn!(
                        "Feature ID texture {} is invalid ({:?}); it will have no texture.",
                        description.name, status
                    );
                    TextureSlot::Empty
                }
            };
            Some(EncodedFeatureIdSource::Texture(EncodedFeatureIdTexture {
                texture: slot,
                channels: texture.channels.clone(),
                tex_coord_set_index: texture.tex_coord_set_index,
                status: texture.status,
            }))
        }
    }
}
