//! Encoder settings.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

/// Settings shared by every encode of a tileset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderConfig {
    /// Largest width or height of a property table texture. Matches the
    /// default `max_texture_dimension_2d` of wgpu.
    #[serde(default = "default_max_texture_dimension")]
    pub max_texture_dimension: u32,
    /// Blocking workers used by the encode flow for the any-thread phase.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_max_texture_dimension() -> u32 {
    8192
}

fn default_worker_threads() -> usize {
    4
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_texture_dimension: default_max_texture_dimension(),
            worker_threads: default_worker_threads(),
        }
    }
}

impl EncoderConfig {
    /// Clamps the texture size to what a device actually supports.
    pub fn with_limits(mut self, limits: &wgpu::Limits) -> Self {
        self.max_texture_dimension = self
            .max_texture_dimension
            .min(limits.max_texture_dimension_2d);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid encoder configuration")
    }
}
