//! tiles-metadata-encoder
//!
//! Turns the feature IDs (`EXT_mesh_features`) and structural metadata
//! (`EXT_structural_metadata`) of loaded glTF models into textures and shader
//! parameter names a material can bind to. Encoding is split into a CPU-only
//! phase that may run on any worker and a game-thread phase that creates the
//! GPU resources.
//!
//! High-level modules
//! - `config`: encoder settings
//! - `context`: headless wgpu device/queue that uploads encoded textures
//! - `data_structures`: source models, metadata values, images and textures
//! - `encoding`: naming, descriptions and the per-feature/per-property encoders
//! - `flow`: worker pool and game-thread hand-off for whole models
//! - `resources`: helpers to load images, glTF files and descriptions
//!

pub mod config;
pub mod context;
pub mod data_structures;
pub mod encoding;
pub mod flow;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use config::EncoderConfig;
pub use encoding::description::FeaturesMetadataDescription;
pub use encoding::model::{EncodedModel, EncodedModelMetadata, EncodedPrimitive};
pub use flow::{EncodeFlow, EncodeResult};
