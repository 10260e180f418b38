//! A loaded glTF model as handed to the encoders.

use crate::data_structures::{
    features::PrimitiveFeatures,
    metadata::{ModelMetadata, PrimitiveMetadata},
};

/// One mesh primitive's feature IDs and metadata references.
#[derive(Clone, Debug, Default)]
pub struct Primitive {
    pub features: PrimitiveFeatures,
    pub metadata: PrimitiveMetadata,
}

/// A model's structural metadata together with every primitive of its meshes.
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub name: String,
    pub metadata: ModelMetadata,
    pub primitives: Vec<Primitive>,
}
