//! GPU textures and the CPU-side pixel buffers they are created from.
//!
//! Encoding happens in two phases. The any-thread phase produces
//! [`TexturePixels`]: plain bytes plus a texture format, safe to build on any
//! worker. The game-thread phase hands those bytes to a [`TextureUpload`]
//! implementation, which is the only place a GPU resource is created. A
//! [`TextureSlot`] tracks which of the two states an encoded texture is in and
//! shares the result between every user of the same source image.

use std::{collections::HashMap, sync::Arc};

use anyhow::*;

use crate::data_structures::image::{ImageData, ImageId};

/// Pixel data ready for upload, laid out row-major starting at texel (0, 0).
#[derive(Clone, Debug, PartialEq)]
pub struct TexturePixels {
    pub label: String,
    /// Source image this buffer was built from. `None` for buffers synthesized
    /// from property table values.
    pub image_id: Option<ImageId>,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub data: Vec<u8>,
}

impl TexturePixels {
    /// Size in bytes of one texel of `format`.
    pub fn texel_size(format: wgpu::TextureFormat) -> u32 {
        format.block_copy_size(None).unwrap_or(4)
    }

    pub fn bytes_per_row(&self) -> u32 {
        Self::texel_size(self.format) * self.width
    }

    /// Repackages a source image for upload without resampling it. Channel
    /// indices stay valid: three-channel images gain an empty fourth channel
    /// since GPUs have no three-channel integer formats.
    pub fn from_image(image: &ImageData, label: &str) -> Self {
        let channels = image.channels as usize;
        let bytes_per_channel = image.bytes_per_channel as usize;
        let (format, padded_channels) = match (channels, bytes_per_channel) {
            (1, 1) => (wgpu::TextureFormat::R8Uint, 1),
            (2, 1) => (wgpu::TextureFormat::Rg8Uint, 2),
            (_, 1) => (wgpu::TextureFormat::Rgba8Uint, 4),
            (1, _) => (wgpu::TextureFormat::R16Uint, 1),
            (2, _) => (wgpu::TextureFormat::Rg16Uint, 2),
            (_, _) => (wgpu::TextureFormat::Rgba16Uint, 4),
        };
        let data = if padded_channels == channels {
            image.pixels.clone()
        } else {
            let texel = channels * bytes_per_channel;
            let padded = padded_channels * bytes_per_channel;
            let mut data = Vec::with_capacity(image.pixels.len() / texel * padded);
            for chunk in image.pixels.chunks_exact(texel) {
                data.extend_from_slice(chunk);
                data.resize(data.len() + (padded - texel), 0);
            }
            data
        };
        Self {
            label: label.to_string(),
            image_id: Some(image.id),
            width: image.width,
            height: image.height,
            format,
            data,
        }
    }
}

/// A GPU texture with a view and a sampler.
///
/// Metadata textures hold integers and raw floats, so they are sampled with
/// nearest filtering, clamped addressing and no mipmaps.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Creates a texture from pixel data and uploads it through `queue`.
    ///
    /// Fails if the buffer does not match its declared size or exceeds the
    /// device's 2D texture limit.
    pub fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &TexturePixels,
    ) -> Result<Self> {
        let max = device.limits().max_texture_dimension_2d;
        ensure!(
            pixels.width > 0 && pixels.height > 0,
            "texture {} is empty",
            pixels.label
        );
        ensure!(
            pixels.width <= max && pixels.height <= max,
            "texture {} is {}x{}, the device allows at most {}x{}",
            pixels.label,
            pixels.width,
            pixels.height,
            max,
            max
        );
        let expected = pixels.bytes_per_row() as usize * pixels.height as usize;
        ensure!(
            pixels.data.len() == expected,
            "texture {} holds {} bytes, expected {}",
            pixels.label,
            pixels.data.len(),
            expected
        );

        let size = wgpu::Extent3d {
            width: pixels.width,
            height: pixels.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&pixels.label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: pixels.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &pixels.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pixels.bytes_per_row()),
                rows_per_image: Some(pixels.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_nearest_sampler(device);
        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

pub fn create_nearest_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("metadata sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Creates GPU textures from pixel buffers.
///
/// Implementations must only be called from the thread that owns the graphics
/// context. The encoders never call this during the any-thread phase.
pub trait TextureUpload {
    type Texture;

    fn create_texture(&self, pixels: &TexturePixels) -> Result<Self::Texture>;
}

/// State of an encoded texture.
///
/// Both payloads are reference counted: several feature ID sets or property
/// texture properties built from the same source image hold clones of the same
/// `Arc`, and the GPU resource lives as long as its longest holder.
#[derive(Debug)]
pub enum TextureSlot<T> {
    Empty,
    Pending(Arc<TexturePixels>),
    Realized(Arc<T>),
}

impl<T> Default for TextureSlot<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> Clone for TextureSlot<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Pending(pixels) => Self::Pending(pixels.clone()),
            Self::Realized(texture) => Self::Realized(texture.clone()),
        }
    }
}

impl<T> TextureSlot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn pixels(&self) -> Option<&Arc<TexturePixels>> {
        match self {
            Self::Pending(pixels) => Some(pixels),
            _ => None,
        }
    }

    pub fn texture(&self) -> Option<&Arc<T>> {
        match self {
            Self::Realized(texture) => Some(texture),
            _ => None,
        }
    }

    /// Creates the GPU texture for a pending slot. Slots sharing a source image
    /// are resolved to one texture through `unique`, keyed by image identity.
    /// A failed upload is recorded there as `None`, so each image is attempted
    /// at most once per map.
    ///
    /// Returns `false` only if the upload failed; the slot then stays pending.
    /// Empty and already realized slots succeed trivially.
    pub fn realize<U>(
        &mut self,
        uploader: &U,
        unique: &mut HashMap<ImageId, Option<Arc<T>>>,
    ) -> bool
    where
        U: TextureUpload<Texture = T>,
    {
        let Self::Pending(pixels) = self else {
            return true;
        };
        let pixels = pixels.clone();
        match pixels.image_id.and_then(|id| unique.get(&id)) {
            Some(Some(texture)) => {
                *self = Self::Realized(texture.clone());
                return true;
            }
            Some(None) => return false,
            None => {}
        }
        match uploader.create_texture(&pixels) {
            Result::Ok(texture) => {
                let texture = Arc::new(texture);
                if let Some(id) = pixels.image_id {
                    unique.insert(id, Some(texture.clone()));
                }
                *self = Self::Realized(texture);
                true
            }
            Err(e) => {
                log::warn!("Could not create texture {}: {:#}", pixels.label, e);
                if let Some(id) = pixels.image_id {
                    unique.insert(id, None);
                }
                false
            }
        }
    }

    /// Drops this holder's reference. The GPU resource is released once the
    /// last holder lets go. Releasing an empty slot does nothing.
    pub fn release(&mut self) {
        *self = Self::Empty;
    }
}
