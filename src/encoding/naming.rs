//! Shader parameter names for feature ID sets and metadata.
//!
//! Names generated here are the identifiers the material graph binds to, so
//! they must be deterministic for a given model and description: re-encoding the
//! same primitive has to produce the same parameter layout.

use crate::{
    data_structures::{
        features::{FeatureIdSet, FeatureIdSetKind},
        metadata::{PropertyTable, PropertyTexture},
    },
    encoding::{MATERIAL_PROPERTY_TABLE_PREFIX, MATERIAL_PROPERTY_TEXTURE_PREFIX},
};

pub const FEATURE_ID_ATTRIBUTE_PREFIX: &str = "_FEATURE_ID_";
pub const FEATURE_ID_TEXTURE_PREFIX: &str = "_FEATURE_ID_TEXTURE_";
pub const IMPLICIT_FEATURE_ID_NAME: &str = "_IMPLICIT_FEATURE_ID";
pub const PROPERTY_TABLE_FALLBACK_PREFIX: &str = "_PROPERTY_TABLE_";
pub const PROPERTY_TEXTURE_FALLBACK_PREFIX: &str = "_PROPERTY_TEXTURE_";

/// Turns an arbitrary label into a valid shader identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`. A leading digit or an
/// empty input gets a `_` prefix. Distinct labels may collide after this; the
/// caller is responsible for disambiguating.
pub fn create_hlsl_safe_name(raw_name: &str) -> String {
    let mut safe: String = raw_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() || safe.starts_with(|c: char| c.is_ascii_digit()) {
        safe.insert(0, '_');
    }
    safe
}

fn label(label: &Option<String>) -> Option<&str> {
    label.as_deref().filter(|l| !l.is_empty())
}

/// Name for a feature ID set of a primitive.
///
/// Labeled sets use their sanitized label. Otherwise:
/// - attributes are named `_FEATURE_ID_<set index>`
/// - textures are named `_FEATURE_ID_TEXTURE_<counter>`, and the counter is
///   incremented. It counts the unlabeled feature ID textures seen so far in
///   the primitive, so the same counter must be passed for every set of one
///   primitive, in source order.
/// - implicit sets are all named `_IMPLICIT_FEATURE_ID`; their definition never
///   varies, so one name covers every implicit set of a primitive.
pub fn name_for_feature_id_set(set: &FeatureIdSet, feature_id_texture_counter: &mut i32) -> String {
    if let Some(label) = label(&set.label) {
        return create_hlsl_safe_name(label);
    }
    match &set.kind {
        FeatureIdSetKind::Attribute(attribute) => {
            format!("{}{}", FEATURE_ID_ATTRIBUTE_PREFIX, attribute.set_index)
        }
        FeatureIdSetKind::Texture(_) => {
            let name = format!("{}{}", FEATURE_ID_TEXTURE_PREFIX, feature_id_texture_counter);
            *feature_id_texture_counter += 1;
            name
        }
        FeatureIdSetKind::Implicit => IMPLICIT_FEATURE_ID_NAME.to_string(),
    }
}

/// Name for a property table: its label, else its class, else its position in
/// the model.
pub fn name_for_property_table(table: &PropertyTable, index: usize) -> String {
    match label(&table.name).or(Some(table.class_name.as_str()).filter(|c| !c.is_empty())) {
        Some(name) => create_hlsl_safe_name(name),
        None => format!("{}{}", PROPERTY_TABLE_FALLBACK_PREFIX, index),
    }
}

/// Name for a property texture, following the same rule as property tables.
pub fn name_for_property_texture(texture: &PropertyTexture, index: usize) -> String {
    match label(&texture.name).or(Some(texture.class_name.as_str()).filter(|c| !c.is_empty())) {
        Some(name) => create_hlsl_safe_name(name),
        None => format!("{}{}", PROPERTY_TEXTURE_FALLBACK_PREFIX, index),
    }
}

/// `PTABLE_<table name><property name>`. Side-channel parameters append
/// `_OFFSET`, `_SCALE`, `_NO_DATA`, `_DEFAULT` or `_HAS_VALUE` to this.
pub fn name_for_property_table_property(property_table_name: &str, property_name: &str) -> String {
    create_hlsl_safe_name(&format!(
        "{}{}{}",
        MATERIAL_PROPERTY_TABLE_PREFIX, property_table_name, property_name
    ))
}

/// `PTEXTURE_<texture name><property name>`.
pub fn name_for_property_texture_property(
    property_texture_name: &str,
    property_name: &str,
) -> String {
    create_hlsl_safe_name(&format!(
        "{}{}{}",
        MATERIAL_PROPERTY_TEXTURE_PREFIX, property_texture_name, property_name
    ))
}
