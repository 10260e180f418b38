//! Declarative descriptions of what to encode.
//!
//! Descriptions are filled out once per tileset and apply to every model it
//! loads. Not every model contains everything a description declares; the
//! encoders skip whatever is missing. Descriptions are read-only to the
//! encoders and deserialize from camelCase JSON.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::encoding::details::MetadataEncodingDetails;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureIdSetType {
    Attribute,
    Texture,
    Implicit,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureIdSetDescription {
    /// Generated or labeled name of the set, see
    /// [`name_for_feature_id_set`](crate::encoding::naming::name_for_feature_id_set).
    pub name: String,
    /// Expected kind of the set. Sets of another kind are skipped.
    #[serde(rename = "type")]
    pub kind: Option<FeatureIdSetType>,
    /// Property table the feature IDs index into, if any.
    pub property_table_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrimitiveFeaturesDescription {
    pub feature_id_sets: Vec<FeatureIdSetDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyTablePropertyDescription {
    pub name: String,
    /// Explicit encoding. `None` picks the best fit for the source type.
    pub encoding: Option<MetadataEncodingDetails>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyTableDescription {
    pub name: String,
    pub properties: Vec<PropertyTablePropertyDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyTexturePropertyDescription {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyTextureDescription {
    pub name: String,
    pub properties: Vec<PropertyTexturePropertyDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelMetadataDescription {
    pub property_tables: Vec<PropertyTableDescription>,
    pub property_textures: Vec<PropertyTextureDescription>,
}

/// Everything a tileset wants encoded: per-primitive feature IDs and model-wide
/// metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeaturesMetadataDescription {
    pub features: PrimitiveFeaturesDescription,
    pub metadata: ModelMetadataDescription,
}

impl FeaturesMetadataDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid features/metadata description")
    }
}
