//! Feature ID and structural metadata encoding.
//!
//! Every encoder runs in two phases:
//!
//! - `encode_any_thread` reads the source model and a description and produces
//!   CPU-side pixel buffers. It touches no GPU state and can run on any worker.
//! - `encode_game_thread` hands those buffers to a
//!   [`TextureUpload`](crate::data_structures::texture::TextureUpload) and must
//!   run on the thread owning the graphics context.
//!
//! `destroy` releases the GPU textures again and may be called on a structure
//! that never reached the game thread.
//!
//! Modules
//! - `naming`: shader parameter names
//! - `description`: what a tileset wants encoded
//! - `details`: how a property is laid out in a texture
//! - `features`: per-primitive feature ID sets
//! - `property_table`: property tables, one texture per property
//! - `property_texture`: property textures, one texture per source image
//! - `model`: per-primitive and per-model aggregates

pub mod description;
pub mod details;
pub mod features;
pub mod model;
pub mod naming;
pub mod property_table;
pub mod property_texture;

// Suffixes of the material parameters generated for an encoded name.
pub const MATERIAL_TEXTURE_SUFFIX: &str = "_TX";
pub const MATERIAL_TEX_COORD_INDEX_SUFFIX: &str = "_UV_INDEX";
pub const MATERIAL_CHANNELS_SUFFIX: &str = "_CHANNELS";
pub const MATERIAL_NUM_CHANNELS_SUFFIX: &str = "_NUM_CHANNELS";
pub const MATERIAL_NULL_FEATURE_ID_SUFFIX: &str = "_NULL_ID";

pub const MATERIAL_PROPERTY_TABLE_PREFIX: &str = "PTABLE_";
pub const MATERIAL_PROPERTY_TEXTURE_PREFIX: &str = "PTEXTURE_";

pub const MATERIAL_PROPERTY_OFFSET_SUFFIX: &str = "_OFFSET";
pub const MATERIAL_PROPERTY_SCALE_SUFFIX: &str = "_SCALE";
pub const MATERIAL_PROPERTY_NO_DATA_SUFFIX: &str = "_NO_DATA";
pub const MATERIAL_PROPERTY_DEFAULT_VALUE_SUFFIX: &str = "_DEFAULT";
pub const MATERIAL_PROPERTY_HAS_VALUE_SUFFIX: &str = "_HAS_VALUE";
/// Texels per feature of array and string properties.
pub const MATERIAL_PROPERTY_STRIDE_SUFFIX: &str = "_STRIDE";

// Names of the intermediate nodes the material graph builds per property.
pub const MATERIAL_PROPERTY_DATA_SUFFIX: &str = "_DATA";
pub const MATERIAL_PROPERTY_RAW_SUFFIX: &str = "_RAW";
pub const MATERIAL_PROPERTY_VALUE_SUFFIX: &str = "_VALUE";
