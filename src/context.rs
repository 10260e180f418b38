//! The graphics context owned by the game thread.
//!
//! [`Context`] is a headless wgpu device and queue. It is the only
//! [`TextureUpload`] implementation that creates real GPU resources, so
//! whichever thread owns it is the game thread.

use anyhow::{Context as _, Result, ensure};
use instant::Duration;

use crate::{
    config::EncoderConfig,
    data_structures::texture::{Texture, TexturePixels, TextureUpload},
};

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Context {
    pub async fn new() -> Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no graphics adapter available")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("metadata encoder"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await
            .context("could not create a graphics device")?;

        Ok(Self { device, queue })
    }

    /// An encoder configuration clamped to this device's texture limits.
    pub fn encoder_config(&self, config: EncoderConfig) -> EncoderConfig {
        config.with_limits(&self.device.limits())
    }

    /// Copies a texture back to the CPU, tightly packed row by row.
    pub async fn read_texture(&self, texture: &Texture) -> Result<Vec<u8>> {
        let format = texture.texture.format();
        let width = texture.texture.width();
        let height = texture.texture.height();
        let texel_size = TexturePixels::texel_size(format);
        let unpadded_bytes_per_row = texel_size * width;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("readback buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture.texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // The receiver only goes away if this future is dropped.
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .context("device lost while reading back a texture")?;
        let mapped = rx.receive().await;
        ensure!(mapped.is_some(), "readback of {:?} was cancelled", texture.texture);
        if let Some(Err(e)) = mapped {
            return Err(e).context("could not map readback buffer");
        }

        let data = buffer_slice.get_mapped_range();
        let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
        for row in data.chunks(padded_bytes_per_row as usize) {
            pixels.extend_from_slice(&row[..unpadded_bytes_per_row as usize]);
        }
        drop(data);
        output_buffer.unmap();
        Ok(pixels)
    }
}

impl TextureUpload for Context {
    type Texture = Texture;

    fn create_texture(&self, pixels: &TexturePixels) -> Result<Texture> {
        Texture::from_pixels(&self.device, &self.queue, pixels)
    }
}
