use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use anyhow::bail;
use tiles_metadata_encoder::data_structures::{
    features::{FeatureIdAttribute, FeatureIdSet, FeatureIdSetKind, FeatureIdTexture},
    image::{ImageData, ImageId},
    metadata::{PropertyTable, PropertyTableProperty, PropertyTexture, PropertyTextureProperty},
    texture::{TexturePixels, TextureUpload},
    value::{ComponentType, MetadataType, ValueType},
};

/// Stand-in for a GPU texture. Keeps the uploaded pixels and tracks how many
/// textures are alive.
#[derive(Debug)]
pub(crate) struct MockTexture {
    pub(crate) pixels: TexturePixels,
    live: Arc<AtomicUsize>,
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Records every texture creation instead of touching a GPU. Uploads of
/// textures whose label is in `failing` fail.
#[derive(Default)]
pub(crate) struct MockUploader {
    live: Arc<AtomicUsize>,
    created: AtomicUsize,
    attempts: AtomicUsize,
    failing: Vec<String>,
    labels: Mutex<Vec<String>>,
}

impl MockUploader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(labels: &[&str]) -> Self {
        Self {
            failing: labels.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Textures created so far, including released ones.
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Calls to `create_texture`, failed ones included.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Textures still referenced by someone.
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap().clone()
    }
}

impl TextureUpload for MockUploader {
    type Texture = MockTexture;

    fn create_texture(&self, pixels: &TexturePixels) -> anyhow::Result<MockTexture> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&pixels.label) {
            bail!("out of texture memory for {}", pixels.label);
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        self.labels.lock().unwrap().push(pixels.label.clone());
        Ok(MockTexture {
            pixels: pixels.clone(),
            live: self.live.clone(),
        })
    }
}

pub(crate) fn scalar(component_type: ComponentType) -> ValueType {
    ValueType::new(MetadataType::Scalar, Some(component_type))
}

/// An 8-bit image whose texel `i` holds `i * channels + c` in channel `c`.
pub(crate) fn image(id: usize, width: u32, height: u32, channels: u8) -> Arc<ImageData> {
    let len = width as usize * height as usize * channels as usize;
    let pixels = (0..len).map(|i| i as u8).collect();
    Arc::new(ImageData::new(ImageId(id), width, height, channels, 1, pixels).unwrap())
}

pub(crate) fn attribute_set(set_index: i64) -> FeatureIdSet {
    FeatureIdSet::new(
        FeatureIdSetKind::Attribute(FeatureIdAttribute::new(set_index)),
        10,
    )
}

pub(crate) fn texture_set(image: &Arc<ImageData>, channels: Vec<u8>) -> FeatureIdSet {
    FeatureIdSet::new(
        FeatureIdSetKind::Texture(FeatureIdTexture::new(Some(image.clone()), channels, 0)),
        10,
    )
}

pub(crate) fn implicit_set() -> FeatureIdSet {
    FeatureIdSet::new(FeatureIdSetKind::Implicit, 10)
}

/// `buildings` with a float `height` and a string `name` per building.
pub(crate) fn buildings_table() -> PropertyTable {
    PropertyTable {
        name: Some("buildings".to_string()),
        class_name: "building".to_string(),
        count: 3,
        properties: vec![
            PropertyTableProperty::from_numbers(
                "height",
                scalar(ComponentType::Float32),
                &[12.5f32, 30.0, 7.25],
            ),
            PropertyTableProperty::from_strings("name", &["Town Hall", "Tower", "Shed"]),
        ],
    }
}

/// `climate` reads temperature and humidity from channels 0 and 1 of `image`.
pub(crate) fn climate_texture(image: &Arc<ImageData>) -> PropertyTexture {
    PropertyTexture {
        name: Some("climate".to_string()),
        class_name: "climate".to_string(),
        properties: vec![
            PropertyTextureProperty::new(
                "temperature",
                scalar(ComponentType::Uint8),
                Some(image.clone()),
                vec![0],
                0,
            ),
            PropertyTextureProperty::new(
                "humidity",
                scalar(ComponentType::Uint8),
                Some(image.clone()),
                vec![1],
                0,
            ),
        ],
    }
}

/// `soil` reads its moisture from channel 2 of `image`.
pub(crate) fn soil_texture(image: &Arc<ImageData>) -> PropertyTexture {
    PropertyTexture {
        name: Some("soil".to_string()),
        class_name: "soil".to_string(),
        properties: vec![PropertyTextureProperty::new(
            "moisture",
            scalar(ComponentType::Uint8),
            Some(image.clone()),
            vec![2],
            1,
        )],
    }
}

/// Reads the `f32` at texel `index` of a single-channel float buffer.
pub(crate) fn f32_at(pixels: &TexturePixels, index: usize) -> f32 {
    let bytes = &pixels.data[index * 4..index * 4 + 4];
    f32::from_le_bytes(bytes.try_into().unwrap())
}
