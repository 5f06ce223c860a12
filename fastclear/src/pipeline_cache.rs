// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily created clear pipelines.
//!
//! Every pipeline a clear needs is identified by a [`PipelineKey`]. The key
//! expands to a declarative description that a [`PipelineCompiler`] turns
//! into a handle. Handles are created once per device and never invalidated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use fastclear_encoding::{AspectFlags, Format, MetaFsKey};
use fastclear_shaders::{ClearShader, ShaderShape, ShaderStages};

use crate::{PipelineHandle, Result};

/// Identifies one clear pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKey {
    /// Writes a push-constant color to one color attachment.
    Color {
        samples_log2: u32,
        attachment: u32,
        fs_key: MetaFsKey,
    },
    /// Writes depth and/or stencil.
    DepthStencil {
        aspects: AspectFlags,
        /// Depth comes from the fragment stage, so values outside `[0, 1]`
        /// survive.
        unrestricted: bool,
        /// Lets the depth block record the clear in HTILE.
        fast: bool,
        samples_log2: u32,
    },
    HtileMask,
    CompToSingle {
        msaa: bool,
    },
    /// Compute image store, used when the image can't be rendered to.
    ClearImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Replace,
}

/// Fixed depth/stencil state of a clear pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub stencil_test: bool,
    pub stencil_pass_op: StencilOp,
    pub stencil_compare: CompareOp,
    pub stencil_write_mask: u32,
}

impl DepthStencilState {
    pub const DISABLED: Self = Self {
        depth_test: false,
        depth_write: false,
        depth_compare: CompareOp::Never,
        stencil_test: false,
        stencil_pass_op: StencilOp::Keep,
        stencil_compare: CompareOp::Never,
        stencil_write_mask: 0,
    };
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsPipelineDesc {
    pub label: String,
    pub vertex: ClearShader,
    pub fragment: Option<ClearShader>,
    pub samples: u32,
    /// Color formats by attachment location. Locations the pipeline doesn't
    /// write are [`Format::Undefined`].
    pub color_formats: Vec<Format>,
    pub depth_format: Format,
    pub stencil_format: Format,
    pub depth_stencil: DepthStencilState,
    pub push_constant_stages: ShaderStages,
    pub push_constant_size: u32,
    /// The depth block may record the clear in HTILE instead of writing
    /// texels.
    pub db_depth_clear: bool,
    pub db_stencil_clear: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComputePipelineDesc {
    pub label: String,
    pub shader: ClearShader,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PipelineDesc {
    Graphics(GraphicsPipelineDesc),
    Compute(ComputePipelineDesc),
}

impl PipelineDesc {
    pub fn label(&self) -> &str {
        match self {
            Self::Graphics(desc) => &desc.label,
            Self::Compute(desc) => &desc.label,
        }
    }
}

impl PipelineKey {
    /// The description of the pipeline this key names.
    pub fn desc(&self) -> PipelineDesc {
        match *self {
            Self::Color {
                samples_log2,
                attachment,
                fs_key,
            } => {
                let mut color_formats = vec![Format::Undefined; attachment as usize + 1];
                color_formats[attachment as usize] = fs_key.exemplar();
                let fragment = ShaderShape::ColorOutput {
                    location: attachment,
                }
                .shader();
                PipelineDesc::Graphics(GraphicsPipelineDesc {
                    label: format!("clear_color_{attachment}_{fs_key:?}_{}x", 1 << samples_log2),
                    vertex: ShaderShape::RectVertices {
                        depth_from_push_constant: false,
                    }
                    .shader(),
                    push_constant_size: fragment.push_constant_size,
                    fragment: Some(fragment),
                    samples: 1 << samples_log2,
                    color_formats,
                    depth_format: Format::Undefined,
                    stencil_format: Format::Undefined,
                    depth_stencil: DepthStencilState::DISABLED,
                    push_constant_stages: ShaderStages::FRAGMENT,
                    db_depth_clear: false,
                    db_stencil_clear: false,
                })
            }
            Self::DepthStencil {
                aspects,
                unrestricted,
                fast,
                samples_log2,
            } => {
                let depth = aspects.contains(AspectFlags::DEPTH);
                let stencil = aspects.contains(AspectFlags::STENCIL);
                let vertex = ShaderShape::RectVertices {
                    depth_from_push_constant: !unrestricted,
                }
                .shader();
                let fragment = unrestricted.then(|| ShaderShape::DepthOutput.shader());
                let (push_constant_stages, push_constant_size) = match &fragment {
                    Some(fs) => (ShaderStages::FRAGMENT, fs.push_constant_size),
                    None => (ShaderStages::VERTEX, vertex.push_constant_size),
                };
                PipelineDesc::Graphics(GraphicsPipelineDesc {
                    label: format!(
                        "clear_{}{}{}_{}x",
                        if depth { "d" } else { "" },
                        if stencil { "s" } else { "" },
                        if fast { "_fast" } else { "" },
                        1 << samples_log2
                    ),
                    vertex,
                    fragment,
                    samples: 1 << samples_log2,
                    color_formats: Vec::new(),
                    depth_format: if depth {
                        Format::D32Sfloat
                    } else {
                        Format::Undefined
                    },
                    stencil_format: if stencil {
                        Format::S8Uint
                    } else {
                        Format::Undefined
                    },
                    depth_stencil: DepthStencilState {
                        depth_test: depth,
                        depth_write: depth,
                        depth_compare: CompareOp::Always,
                        stencil_test: stencil,
                        stencil_pass_op: StencilOp::Replace,
                        stencil_compare: CompareOp::Always,
                        stencil_write_mask: 0xff,
                    },
                    push_constant_stages,
                    push_constant_size,
                    db_depth_clear: fast,
                    db_stencil_clear: fast,
                })
            }
            Self::HtileMask => compute("clear_htile_mask", ShaderShape::HtileMask),
            Self::CompToSingle { msaa } => compute(
                "clear_dcc_comp_to_single",
                ShaderShape::DccCompToSingle { msaa },
            ),
            Self::ClearImage => compute("clear_image", ShaderShape::ClearImage),
        }
    }

    /// Every color and depth/stencil pipeline built when pipelines aren't
    /// created on demand.
    pub(crate) fn precompiled(unrestricted: bool) -> Vec<Self> {
        const MAX_SAMPLES_LOG2: u32 = 4;
        let mut keys = Vec::new();
        for samples_log2 in 0..MAX_SAMPLES_LOG2 {
            for fs_key in MetaFsKey::ALL {
                keys.push(Self::Color {
                    samples_log2,
                    attachment: 0,
                    fs_key,
                });
            }
            for aspects in [
                AspectFlags::DEPTH,
                AspectFlags::STENCIL,
                AspectFlags::DEPTH | AspectFlags::STENCIL,
            ] {
                for fast in [false, true] {
                    keys.push(Self::DepthStencil {
                        aspects,
                        unrestricted,
                        fast,
                        samples_log2,
                    });
                }
            }
        }
        keys
    }
}

fn compute(label: &str, shape: ShaderShape) -> PipelineDesc {
    PipelineDesc::Compute(ComputePipelineDesc {
        label: label.into(),
        shader: shape.shader(),
    })
}

/// Creates pipelines from clear pipeline descriptions.
///
/// Called concurrently from every thread recording clears.
pub trait PipelineCompiler: Send + Sync {
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle>;
    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<PipelineHandle>;
}

/// One cache entry: empty until a creation succeeds, then immutable.
#[derive(Debug, Default)]
struct Slot {
    ready: OnceLock<PipelineHandle>,
    creating: Mutex<()>,
}

/// Write-once map from [`PipelineKey`] to pipeline handle, shared by every
/// command buffer of a device.
#[derive(Debug, Default)]
pub struct ClearPipelineCache {
    slots: Mutex<HashMap<PipelineKey, Arc<Slot>>>,
}

impl ClearPipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: PipelineKey) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key).or_default().clone()
    }

    /// The handle of `key`, if it has been created.
    pub fn get(&self, key: PipelineKey) -> Option<PipelineHandle> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(&key).and_then(|slot| slot.ready.get().copied())
    }

    /// Returns the handle of `key`, creating it with `compiler` on first use.
    ///
    /// Concurrent callers for the same key create the pipeline at most once.
    /// A failed creation leaves the slot empty, so the next caller (including
    /// any that were waiting) tries again.
    pub fn get_or_create(
        &self,
        key: PipelineKey,
        compiler: &dyn PipelineCompiler,
    ) -> Result<PipelineHandle> {
        let slot = self.slot(key);
        if let Some(handle) = slot.ready.get() {
            return Ok(*handle);
        }
        let _creating = slot.creating.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished while we waited for the lock.
        if let Some(handle) = slot.ready.get() {
            return Ok(*handle);
        }
        let desc = key.desc();
        let handle = match &desc {
            PipelineDesc::Graphics(desc) => compiler.create_graphics_pipeline(desc),
            PipelineDesc::Compute(desc) => compiler.create_compute_pipeline(desc),
        }?;
        log::debug!("created clear pipeline {} for {key:?}", desc.label());
        Ok(*slot.ready.get_or_init(|| handle))
    }

    /// Number of pipelines created so far.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.ready.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    use super::*;
    use crate::{Error, ReferenceCompiler};

    #[test]
    fn color_desc_writes_one_location() {
        let key = PipelineKey::Color {
            samples_log2: 2,
            attachment: 2,
            fs_key: MetaFsKey::Uint8Abgr,
        };
        let PipelineDesc::Graphics(desc) = key.desc() else {
            panic!("color clears are graphics pipelines");
        };
        assert_eq!(desc.samples, 4);
        assert_eq!(
            desc.color_formats,
            [Format::Undefined, Format::Undefined, Format::R8G8B8A8Uint]
        );
        assert_eq!(
            desc.fragment.map(|fs| fs.shape),
            Some(ShaderShape::ColorOutput { location: 2 })
        );
        assert_eq!(desc.push_constant_size, 16);
    }

    #[test]
    fn depth_desc_pushes_where_depth_is_read() {
        let key = |unrestricted| PipelineKey::DepthStencil {
            aspects: AspectFlags::DEPTH,
            unrestricted,
            fast: true,
            samples_log2: 0,
        };
        let PipelineDesc::Graphics(restricted) = key(false).desc() else {
            panic!("depth clears are graphics pipelines");
        };
        assert!(restricted.fragment.is_none());
        assert_eq!(restricted.push_constant_stages, ShaderStages::VERTEX);
        assert!(restricted.db_depth_clear);
        assert!(!restricted.depth_stencil.stencil_test);
        let PipelineDesc::Graphics(unrestricted) = key(true).desc() else {
            panic!("depth clears are graphics pipelines");
        };
        assert_eq!(unrestricted.push_constant_stages, ShaderStages::FRAGMENT);
        assert_eq!(unrestricted.push_constant_size, 4);
    }

    #[test]
    fn precompiled_keys_are_unique() {
        let keys = PipelineKey::precompiled(false);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert_eq!(keys.len(), 4 * (10 + 6));
    }

    #[test]
    fn concurrent_creation_happens_once() {
        let compiler = ReferenceCompiler::new().with_delay(Duration::from_millis(5));
        let cache = ClearPipelineCache::new();
        let key = PipelineKey::Color {
            samples_log2: 0,
            attachment: 0,
            fs_key: MetaFsKey::Fp16Abgr,
        };
        let barrier = Barrier::new(8);
        let handles: Vec<_> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.get_or_create(key, &compiler)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(compiler.created(), 1);
        assert!(handles.iter().all(|h| *h == handles[0]));
        assert!(handles[0].is_ok());
        assert_eq!(cache.len(), 1);
    }

    struct FlakyCompiler {
        attempts: AtomicUsize,
        inner: ReferenceCompiler,
    }

    impl PipelineCompiler for FlakyCompiler {
        fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(Error::OutOfDeviceMemory);
            }
            self.inner.create_graphics_pipeline(desc)
        }

        fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<PipelineHandle> {
            self.inner.create_compute_pipeline(desc)
        }
    }

    #[test]
    fn failed_creation_is_retried() {
        let compiler = FlakyCompiler {
            attempts: AtomicUsize::new(0),
            inner: ReferenceCompiler::new(),
        };
        let cache = ClearPipelineCache::new();
        let key = PipelineKey::DepthStencil {
            aspects: AspectFlags::STENCIL,
            unrestricted: false,
            fast: false,
            samples_log2: 0,
        };
        assert_eq!(cache.get_or_create(key, &compiler), Err(Error::OutOfDeviceMemory));
        assert!(cache.get(key).is_none());
        assert!(cache.is_empty());
        let handle = cache.get_or_create(key, &compiler).unwrap();
        assert_eq!(cache.get(key), Some(handle));
        assert_eq!(cache.get_or_create(key, &compiler), Ok(handle));
        assert_eq!(compiler.attempts.load(Ordering::SeqCst), 2);
    }
}
