// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pipeline creation shared between command buffers on many threads.

use std::num::NonZeroUsize;
use std::sync::{Arc, Barrier};
use std::time::Duration;

use fastclear::{
    AspectFlags, ClearColorValue, Device, DeviceOptions, Format, ImageCreateInfo, ImageLayout,
    PipelineKey, QueueFamily, ReferenceCompiler, SubresourceRange,
};

#[test]
fn recording_threads_share_one_pipeline() {
    let compiler = Arc::new(ReferenceCompiler::new().with_delay(Duration::from_millis(10)));
    let device = Device::new(
        compiler.clone(),
        DeviceOptions {
            disable_fast_clears: true,
            ..DeviceOptions::default()
        },
    )
    .unwrap();
    let image = device.create_image(ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 32, 32));
    let barrier = Barrier::new(8);

    let recordings: Vec<_> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
                    barrier.wait();
                    cmd.clear_color_image(
                        &image,
                        ImageLayout::TransferDstOptimal,
                        &ClearColorValue::float32([0.25; 4]),
                        &[SubresourceRange::whole(&image, AspectFlags::COLOR)],
                    );
                    cmd.finish()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(compiler.created(), 1);
    assert_eq!(device.cache().len(), 1);
    for recording in recordings {
        assert_eq!(recording.unwrap().draw_count(), 1);
    }
}

#[test]
fn precompiled_pipelines_are_reused() {
    let compiler = Arc::new(ReferenceCompiler::new());
    let device = Device::new(
        compiler.clone(),
        DeviceOptions {
            on_demand: false,
            num_init_threads: NonZeroUsize::new(3),
            ..DeviceOptions::default()
        },
    )
    .unwrap();
    let created = compiler.created();
    assert!(created > 0);
    assert_eq!(device.cache().len(), created);

    let key = PipelineKey::DepthStencil {
        aspects: AspectFlags::DEPTH | AspectFlags::STENCIL,
        unrestricted: false,
        fast: true,
        samples_log2: 2,
    };
    let handle = device.pipeline(key).unwrap();
    assert_eq!(compiler.created(), created);
    assert!(compiler.desc(handle).unwrap().label().starts_with("clear_ds_fast"));
}
