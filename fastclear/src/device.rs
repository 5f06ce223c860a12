// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use fastclear_encoding::{DccEncoder, Format, GfxLevel};

use crate::{
    ClearPipelineCache, CommandBuffer, Image, ImageCreateInfo, ImageView, PipelineCompiler,
    PipelineHandle, PipelineKey, QueueFamily, Result, SubresourceRange,
};

/// Options which are set at device creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Hardware generation whose metadata encodings are produced.
    pub gfx_level: GfxLevel,
    /// Depth values outside `[0, 1]` may be cleared.
    pub depth_range_unrestricted: bool,
    /// Depth images store variable-rate shading rates in HTILE (GFX10.3).
    pub attachment_vrs: bool,
    /// Send every clear down the slow path.
    pub disable_fast_clears: bool,
    /// Allow DCC images to store fast-clear colors in their first texel
    /// (GFX10+), instead of a clear color register.
    pub comp_to_single: bool,
    /// The color block has the RB+ path enabled.
    pub rbplus_allowed: bool,
    /// Create clear pipelines when they are first used. When `false`, the
    /// color and depth/stencil pipelines are all built by [`Device::new`].
    pub on_demand: bool,
    /// How many threads to use for building pipelines at device creation.
    ///
    /// If set to `None`, a heuristic based on the available parallelism is
    /// used.
    pub num_init_threads: Option<NonZeroUsize>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            gfx_level: GfxLevel::Gfx10_3,
            depth_range_unrestricted: false,
            attachment_vrs: false,
            disable_fast_clears: false,
            comp_to_single: false,
            rbplus_allowed: true,
            on_demand: true,
            num_init_threads: None,
        }
    }
}

/// Clear state shared by every command buffer recorded for one GPU.
pub struct Device {
    compiler: Arc<dyn PipelineCompiler>,
    cache: ClearPipelineCache,
    options: DeviceOptions,
    encoder: DccEncoder,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Creates a device whose clear pipelines are built by `compiler`.
    pub fn new(compiler: Arc<dyn PipelineCompiler>, options: DeviceOptions) -> Result<Self> {
        let device = Self {
            compiler,
            cache: ClearPipelineCache::new(),
            encoder: DccEncoder::for_gfx_level(options.gfx_level),
            options,
        };
        if !options.on_demand {
            device.precompile(options.num_init_threads)?;
        }
        Ok(device)
    }

    fn precompile(&self, num_threads: Option<NonZeroUsize>) -> Result<()> {
        let mut keys = PipelineKey::precompiled(self.options.depth_range_unrestricted);
        let num_threads = num_threads
            .map(NonZeroUsize::get)
            .unwrap_or_else(|| {
                // Leave a couple of cores to the rest of the application.
                std::thread::available_parallelism().map_or(2, |it| it.get().max(4) - 2)
            })
            .min(keys.len());
        log::debug!(
            "Building {} clear pipelines using {num_threads} threads",
            keys.len()
        );
        let remainder = keys.split_off(num_threads);
        let (tx, rx) = std::sync::mpsc::channel::<Result<PipelineHandle>>();

        // Creating a pipeline takes far longer than the lock, so a mutex is
        // enough for the work queue.
        let work_queue = Mutex::new(remainder.into_iter());
        let work_queue = &work_queue;
        let mut first_error = None;
        std::thread::scope(|scope| {
            for key in keys {
                let tx = tx.clone();
                let spawned = std::thread::Builder::new()
                    .name("clear pipeline worker thread".into())
                    .spawn_scoped(scope, move || {
                        // The receiver outlives every sender, so sends can't fail.
                        let _ = tx.send(self.pipeline(key));
                        while let Ok(mut guard) = work_queue.lock() {
                            let Some(key) = guard.next() else {
                                break;
                            };
                            drop(guard);
                            let _ = tx.send(self.pipeline(key));
                        }
                    });
                if spawned.is_err() {
                    // Whatever wasn't picked up is built lazily.
                    log::warn!("failed to spawn a clear pipeline worker thread");
                }
            }
            // Drop the initial sender, so the channel closes once every worker is done.
            drop(tx);
            while let Ok(result) = rx.recv() {
                if let Err(err) = result {
                    first_error.get_or_insert(err);
                }
            }
        });
        first_error.map_or(Ok(()), Err)
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn gfx_level(&self) -> GfxLevel {
        self.options.gfx_level
    }

    pub fn dcc_encoder(&self) -> DccEncoder {
        self.encoder
    }

    pub fn cache(&self) -> &ClearPipelineCache {
        &self.cache
    }

    pub fn compiler(&self) -> &Arc<dyn PipelineCompiler> {
        &self.compiler
    }

    /// The pipeline for `key`, created on first use.
    pub fn pipeline(&self, key: PipelineKey) -> Result<PipelineHandle> {
        self.cache.get_or_create(key, self.compiler.as_ref())
    }

    pub fn create_image(&self, info: ImageCreateInfo) -> Arc<Image> {
        Arc::new(Image::new(info, &self.options))
    }

    /// A view of `range` of `image` in the image's own format.
    pub fn create_view(&self, image: &Arc<Image>, range: SubresourceRange) -> ImageView {
        self.create_view_with_format(image, image.format(), range)
    }

    pub fn create_view_with_format(
        &self,
        image: &Arc<Image>,
        format: Format,
        range: SubresourceRange,
    ) -> ImageView {
        ImageView::new(image, format, range, false, &self.options)
    }

    /// A view whose writes bypass compression.
    pub(crate) fn create_uncompressed_view(
        &self,
        image: &Arc<Image>,
        format: Format,
        range: SubresourceRange,
    ) -> ImageView {
        ImageView::new(image, format, range, true, &self.options)
    }

    pub fn create_command_buffer(&self, queue: QueueFamily) -> CommandBuffer<'_> {
        CommandBuffer::new(self, queue)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use super::{Device, DeviceOptions};
    use crate::{Error, PipelineKey, ReferenceCompiler};

    #[test]
    fn on_demand_builds_nothing() {
        let compiler = Arc::new(ReferenceCompiler::new());
        let device = Device::new(compiler.clone(), DeviceOptions::default()).unwrap();
        assert_eq!(compiler.created(), 0);
        assert!(device.cache().is_empty());
    }

    #[test]
    fn precompiles_every_color_and_depth_pipeline() {
        let compiler = Arc::new(ReferenceCompiler::new());
        let options = DeviceOptions {
            on_demand: false,
            num_init_threads: NonZeroUsize::new(3),
            ..DeviceOptions::default()
        };
        let device = Device::new(compiler.clone(), options).unwrap();
        let expected = PipelineKey::precompiled(false).len();
        assert_eq!(compiler.created(), expected);
        assert_eq!(device.cache().len(), expected);
    }

    #[test]
    fn precompile_failure_is_reported() {
        let compiler = Arc::new(ReferenceCompiler::new());
        compiler.fail_with(Some(Error::OutOfHostMemory));
        let options = DeviceOptions {
            on_demand: false,
            ..DeviceOptions::default()
        };
        let err = Device::new(compiler, options).unwrap_err();
        assert_eq!(err, Error::OutOfHostMemory);
    }
}
