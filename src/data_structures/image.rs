//! Decoded glTF images as seen by feature ID textures and property textures.
//!
//! Images are addressed by channel rather than by colour: a feature ID texture
//! may keep its IDs in the green channel only, and a property texture may pack
//! several unrelated properties into the channels of one image. [`ImageData`]
//! therefore keeps the source channel layout untouched.

use anyhow::*;
use ::image::{ColorType, DynamicImage};

/// Stable identity of a decoded image within one model.
///
/// This is the index of the image in the glTF `images` array. Two textures that
/// reference the same source image carry the same `ImageId`, which is what the
/// encoders deduplicate on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub usize);

/// A decoded image with its original channel layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub id: ImageId,
    pub width: u32,
    pub height: u32,
    /// Number of channels per pixel, 1 to 4.
    pub channels: u8,
    /// 1 for 8-bit images, 2 for 16-bit images.
    pub bytes_per_channel: u8,
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(
        id: ImageId,
        width: u32,
        height: u32,
        channels: u8,
        bytes_per_channel: u8,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        ensure!(
            (1..=4).contains(&channels),
            "image {} has an unsupported channel count of {}",
            id.0,
            channels
        );
        ensure!(
            bytes_per_channel == 1 || bytes_per_channel == 2,
            "image {} has an unsupported channel size of {} bytes",
            id.0,
            bytes_per_channel
        );
        let expected =
            width as usize * height as usize * channels as usize * bytes_per_channel as usize;
        ensure!(
            pixels.len() == expected,
            "image {} holds {} bytes, expected {} for {}x{}",
            id.0,
            pixels.len(),
            expected,
            width,
            height
        );
        Ok(Self {
            id,
            width,
            height,
            channels,
            bytes_per_channel,
            pixels,
        })
    }

    /// Converts an image decoded by the `gltf` importer.
    ///
    /// Floating point images cannot hold feature IDs or metadata and are rejected.
    pub fn from_gltf(id: ImageId, data: gltf::image::Data) -> Result<Self> {
        use gltf::image::Format;
        let (channels, bytes_per_channel) = match data.format {
            Format::R8 => (1, 1),
            Format::R8G8 => (2, 1),
            Format::R8G8B8 => (3, 1),
            Format::R8G8B8A8 => (4, 1),
            Format::R16 => (1, 2),
            Format::R16G16 => (2, 2),
            Format::R16G16B16 => (3, 2),
            Format::R16G16B16A16 => (4, 2),
            other => bail!("image {} uses unsupported format {:?}", id.0, other),
        };
        Self::new(
            id,
            data.width,
            data.height,
            channels,
            bytes_per_channel,
            data.pixels,
        )
    }

    /// Converts an image decoded by the `image` crate, keeping its channel count
    /// where possible. Exotic colour types are expanded to RGBA8.
    pub fn from_dynamic(id: ImageId, img: &DynamicImage) -> Result<Self> {
        let color = img.color();
        match color {
            ColorType::L8
            | ColorType::La8
            | ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::L16
            | ColorType::La16
            | ColorType::Rgb16
            | ColorType::Rgba16 => {
                let channels = color.channel_count();
                let bytes_per_channel = color.bytes_per_pixel() / channels;
                Self::new(
                    id,
                    img.width(),
                    img.height(),
                    channels,
                    bytes_per_channel,
                    img.as_bytes().to_vec(),
                )
            }
            _ => {
                let rgba = img.to_rgba8();
                let (width, height) = rgba.dimensions();
                Self::new(id, width, height, 4, 1, rgba.into_raw())
            }
        }
    }

    /// Bytes of the pixel at `(x, y)`; `None` if out of bounds.
    pub fn texel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let texel_size = self.channels as usize * self.bytes_per_channel as usize;
        let start = (y as usize * self.width as usize + x as usize) * texel_size;
        self.pixels.get(start..start + texel_size)
    }
}
