//! Loading of images, glTF files, descriptions and configuration from disk.
//!
//! Relative file names resolve against `./assets`, absolute paths are used
//! as given.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context as _, Result};

use crate::{
    config::EncoderConfig,
    data_structures::image::{ImageData, ImageId},
    encoding::description::FeaturesMetadataDescription,
};

fn asset_path(file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new("./").join("assets").join(path)
    }
}

pub async fn load_binary(file_name: &str) -> Result<Vec<u8>> {
    let path = asset_path(file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

pub async fn load_string(file_name: &str) -> Result<String> {
    let path = asset_path(file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

/// Decodes an encoded image (PNG, JPEG, ...) keeping its channel layout.
pub fn image_from_bytes(id: ImageId, bytes: &[u8]) -> Result<ImageData> {
    let img = image::load_from_memory(bytes)
        .with_context(|| format!("could not decode image {}", id.0))?;
    ImageData::from_dynamic(id, &img)
}

pub async fn load_image(id: ImageId, file_name: &str) -> Result<Arc<ImageData>> {
    let bytes = load_binary(file_name).await?;
    Ok(Arc::new(image_from_bytes(id, &bytes)?))
}

/// Imports a glTF file and decodes all of its images, indexed by their
/// position in the glTF `images` array.
pub fn load_gltf_images(file_name: &str) -> Result<Vec<Arc<ImageData>>> {
    let path = asset_path(file_name);
    let (_, _, images) = gltf::import(&path)
        .with_context(|| format!("could not import {}", path.display()))?;
    let images = images
        .into_iter()
        .enumerate()
        .map(|(i, data)| ImageData::from_gltf(ImageId(i), data).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;
    log::debug!("Loaded {} images from {}", images.len(), path.display());
    Ok(images)
}

pub async fn load_description(file_name: &str) -> Result<FeaturesMetadataDescription> {
    FeaturesMetadataDescription::from_json(&load_string(file_name).await?)
}

pub async fn load_config(file_name: &str) -> Result<EncoderConfig> {
    EncoderConfig::from_json(&load_string(file_name).await?)
}
