//! Feature ID sets of a glTF primitive (`EXT_mesh_features`).

use std::sync::Arc;

use crate::data_structures::image::ImageData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureIdAttributeStatus {
    Valid,
    ErrorInvalidAttribute,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureIdTextureStatus {
    Valid,
    ErrorInvalidTexture,
    ErrorInvalidTextureAccess,
    ErrorInvalidTexCoordSetIndex,
}

/// Feature IDs stored per vertex in a `_FEATURE_ID_<set index>` attribute.
#[derive(Clone, Debug)]
pub struct FeatureIdAttribute {
    pub set_index: i64,
    pub status: FeatureIdAttributeStatus,
}

impl FeatureIdAttribute {
    pub fn new(set_index: i64) -> Self {
        let status = if set_index < 0 {
            FeatureIdAttributeStatus::ErrorInvalidAttribute
        } else {
            FeatureIdAttributeStatus::Valid
        };
        Self { set_index, status }
    }
}

/// Feature IDs stored per texel, assembled from one or more image channels.
#[derive(Clone, Debug)]
pub struct FeatureIdTexture {
    pub image: Option<Arc<ImageData>>,
    /// Image channels holding the feature ID, least significant first. Each
    /// channel contributes 8 or 16 bits depending on the image.
    pub channels: Vec<u8>,
    pub tex_coord_set_index: i64,
    pub status: FeatureIdTextureStatus,
}

impl FeatureIdTexture {
    pub fn new(image: Option<Arc<ImageData>>, channels: Vec<u8>, tex_coord_set_index: i64) -> Self {
        let status = match &image {
            None => FeatureIdTextureStatus::ErrorInvalidTexture,
            Some(_) if tex_coord_set_index < 0 => {
                FeatureIdTextureStatus::ErrorInvalidTexCoordSetIndex
            }
            Some(img) => {
                if channels.is_empty()
                    || channels.len() > 4
                    || channels.iter().any(|&c| c >= img.channels)
                {
                    FeatureIdTextureStatus::ErrorInvalidTextureAccess
                } else {
                    FeatureIdTextureStatus::Valid
                }
            }
        };
        Self {
            image,
            channels,
            tex_coord_set_index,
            status,
        }
    }

    /// Decodes the feature ID at texel `(x, y)`. Returns -1 for invalid textures
    /// and out-of-bounds texels.
    pub fn feature_id(&self, x: u32, y: u32) -> i64 {
        if self.status != FeatureIdTextureStatus::Valid {
            return -1;
        }
        let Some(image) = &self.image else {
            return -1;
        };
        let Some(texel) = image.texel(x, y) else {
            return -1;
        };
        let stride = image.bytes_per_channel as usize;
        self.channels
            .iter()
            .enumerate()
            .fold(0i64, |id, (i, &channel)| {
                let start = channel as usize * stride;
                let value = texel[start..start + stride]
                    .iter()
                    .rev()
                    .fold(0i64, |value, &byte| (value << 8) | byte as i64);
                id | (value << (8 * stride * i))
            })
    }
}

#[derive(Clone, Debug)]
pub enum FeatureIdSetKind {
    Attribute(FeatureIdAttribute),
    Texture(FeatureIdTexture),
    /// IDs are the vertex index; nothing is stored.
    Implicit,
}

#[derive(Clone, Debug)]
pub struct FeatureIdSet {
    pub kind: FeatureIdSetKind,
    pub feature_count: i64,
    pub null_feature_id: Option<i64>,
    pub label: Option<String>,
    pub property_table_index: Option<usize>,
}

impl FeatureIdSet {
    pub fn new(kind: FeatureIdSetKind, feature_count: i64) -> Self {
        Self {
            kind,
            feature_count,
            null_feature_id: None,
            label: None,
            property_table_index: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_null_feature_id(mut self, null_feature_id: i64) -> Self {
        self.null_feature_id = Some(null_feature_id);
        self
    }

    pub fn with_property_table(mut self, index: usize) -> Self {
        self.property_table_index = Some(index);
        self
    }
}

/// All feature ID sets of one primitive, in source order.
#[derive(Clone, Debug, Default)]
pub struct PrimitiveFeatures {
    pub feature_id_sets: Vec<FeatureIdSet>,
}
