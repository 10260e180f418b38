//! Scheduling of the two encode phases.
//!
//! [`EncodeFlow`] runs the any-thread phase of every submitted model on a pool
//! of blocking workers and hands the results to the game thread through a
//! channel. The thread that calls [`EncodeFlow::pump`] with the graphics
//! context is the game thread; nothing else ever creates a GPU resource.
//!
//! # Lifecycle
//!
//! 1. `submit()` a model. Its any-thread phase starts immediately.
//! 2. `pump()` once per frame. Every finished model runs its game-thread phase
//!    and is returned together with its success flag.
//! 3. `EncodedModel::destroy()` the result once the model is unloaded, or pass
//!    it to `discard()` to drop it without ever uploading.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use instant::Instant;
use log::{debug, info, warn};
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
};

use crate::{
    config::EncoderConfig,
    data_structures::{model::Model, texture::TextureUpload},
    encoding::{description::FeaturesMetadataDescription, model::EncodedModel},
};

/// A model that went through both encode phases.
#[derive(Debug)]
pub struct EncodeResult<T> {
    pub model: EncodedModel<T>,
    /// `false` if any GPU texture of the model could not be created. The model
    /// is still usable, minus the affected sets and properties.
    pub success: bool,
}

type Finished<T> = Result<EncodedModel<T>>;

pub struct EncodeFlow<T> {
    runtime: Runtime,
    config: Arc<EncoderConfig>,
    description: Arc<FeaturesMetadataDescription>,
    sender: UnboundedSender<Finished<T>>,
    receiver: UnboundedReceiver<Finished<T>>,
    in_flight: usize,
}

impl<T: Send + Sync + 'static> EncodeFlow<T> {
    pub fn new(config: EncoderConfig, description: FeaturesMetadataDescription) -> Result<Self> {
        if let Err(e) = env_logger::try_init() {
            debug!("Logger already initialized: {}", e);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.worker_threads.max(1))
            .thread_name("metadata-encoder")
            .enable_all()
            .build()?;
        let (sender, receiver) = unbounded_channel();
        Ok(Self {
            runtime,
            config: Arc::new(config),
            description: Arc::new(description),
            sender,
            receiver,
            in_flight: 0,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn description(&self) -> &FeaturesMetadataDescription {
        &self.description
    }

    /// Models submitted but not yet returned by `pump` or `finish`.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Starts the any-thread phase of `model` on a worker.
    pub fn submit(&mut self, model: Arc<Model>) {
        let config = self.config.clone();
        let description = self.description.clone();
        let name = model.name.clone();
        let handle = self.runtime.spawn_blocking(move || {
            let start = Instant::now();
            let encoded = EncodedModel::encode_any_thread(&config, &description, &model);
            info!(
                "Encoded {} ({} primitives) in {:?}",
                model.name,
                model.primitives.len(),
                start.elapsed()
            );
            encoded
        });
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let finished = handle
                .await
                .map_err(|e| anyhow!("encode of {} did not finish: {}", name, e));
            // The flow itself holds a sender; a closed channel means it is gone.
            let _ = sender.send(finished);
        });
        self.in_flight += 1;
    }

    /// Runs the game-thread phase of every model whose any-thread phase has
    /// finished. Never blocks.
    pub fn pump<U>(&mut self, uploader: &U) -> Vec<EncodeResult<T>>
    where
        U: TextureUpload<Texture = T>,
    {
        let mut results = Vec::new();
        while let Ok(finished) = self.receiver.try_recv() {
            if let Some(result) = self.complete(uploader, finished) {
                results.push(result);
            }
        }
        results
    }

    /// Waits for every submitted model and runs its game-thread phase.
    pub fn finish<U>(&mut self, uploader: &U) -> Vec<EncodeResult<T>>
    where
        U: TextureUpload<Texture = T>,
    {
        let mut results = Vec::new();
        while self.in_flight > 0 {
            let Some(finished) = self.runtime.block_on(self.receiver.recv()) else {
                break;
            };
            if let Some(result) = self.complete(uploader, finished) {
                results.push(result);
            }
        }
        results
    }

    /// Waits for every submitted model and drops it without uploading.
    pub fn cancel_all(&mut self) {
        while self.in_flight > 0 {
            let Some(finished) = self.runtime.block_on(self.receiver.recv()) else {
                break;
            };
            self.in_flight -= 1;
            if let Ok(model) = finished {
                Self::discard(model);
            }
        }
    }

    /// Drops a model whose game-thread phase is not wanted anymore.
    pub fn discard(mut model: EncodedModel<T>) {
        debug!("Discarding encoded model {}", model.name);
        model.destroy();
    }

    fn complete<U>(&mut self, uploader: &U, finished: Finished<T>) -> Option<EncodeResult<T>>
    where
        U: TextureUpload<Texture = T>,
    {
        self.in_flight -= 1;
        let mut model = match finished {
            Ok(model) => model,
            Err(e) => {
                warn!("{:#}", e);
                return None;
            }
        };
        let start = Instant::now();
        let success = model.encode_game_thread(uploader);
        if success {
            info!("Uploaded {} in {:?}", model.name, start.elapsed());
        } else {
            warn!(
                "Some textures of {} could not be created; its metadata is incomplete.",
                model.name
            );
        }
        Some(EncodeResult { model, success })
    }
}
