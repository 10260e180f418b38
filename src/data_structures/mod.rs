//! Engine-side data structures: loaded models, their metadata and textures.
//!
//! This module contains the data the encoders read from and write to:
//!
//! - `image` holds decoded glTF images and their stable identities
//! - `value` holds metadata types and values from `EXT_structural_metadata`
//! - `features` holds feature ID sets from `EXT_mesh_features`
//! - `metadata` holds property tables and property textures with typed readers
//! - `model` bundles a model's metadata with its primitives
//! - `texture` contains GPU textures, pixel buffers and the upload seam

pub mod features;
pub mod image;
pub mod metadata;
pub mod model;
pub mod texture;
pub mod value;
