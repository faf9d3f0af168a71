use std::path::PathBuf;

use ffmpeg_next::format::Pixel;
use tokio_util::sync::CancellationToken;

use avpipe::error::Result as AvResult;
use avpipe::frame::RawFrame;
use avpipe::layout::GridLayout;
use avpipe::source::FrameSource;

use crate::config::{H264Profile, StreamConfig};
use crate::pipeline::Pipeline;

/// Deterministic stand-in for a live capture: a fixed number of solid-color
/// frames, then end of stream.
struct SolidSource {
    bgr: [u8; 3],
    width: u32,
    height: u32,
    remaining: u32,
}

impl FrameSource for SolidSource {
    fn pull(&mut self) -> AvResult<Option<RawFrame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let mut frame = RawFrame::new(Pixel::BGR24, self.width, self.height);
        let stride = frame.stride();
        let plane = frame.plane_mut();
        for row in 0..self.height as usize {
            for px in 0..self.width as usize {
                let at = row * stride + px * 3;
                plane[at..at + 3].copy_from_slice(&self.bgr);
            }
        }
        Ok(Some(frame))
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn scratch_flv(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("camgrid_{}_{}.flv", name, std::process::id()))
}

fn test_config(output: &str, fps: u32) -> StreamConfig {
    StreamConfig {
        inputs: vec!["mock://left".into(), "mock://right".into()],
        output: output.to_string(),
        width: 128,
        height: 96,
        fps,
        bitrate: 200_000,
        profile: H264Profile::Baseline,
    }
}

#[test]
fn two_source_mosaic_muxes_a_playable_flv() -> anyhow::Result<()> {
    avpipe::init()?;
    let out = scratch_flv("mosaic");
    let _ = std::fs::remove_file(&out);

    let frames = 20u32;
    let config = test_config(&out.to_string_lossy(), 50);
    config.validate()?;

    let layout = GridLayout::uniform(config.width, config.height, 2)?;
    let sources: Vec<Box<dyn FrameSource + Send>> = vec![
        Box::new(SolidSource {
            bgr: [255, 0, 0],
            width: 64,
            height: 96,
            remaining: frames,
        }),
        Box::new(SolidSource {
            bgr: [0, 0, 255],
            width: 64,
            height: 96,
            remaining: frames,
        }),
    ];

    let pipeline = Pipeline::new(&config, layout, sources)?;
    // Sources run dry after `frames` ticks; the run ends gracefully.
    pipeline.run(&CancellationToken::new())?;

    let mut input = ffmpeg_next::format::input(out.to_str().unwrap())?;
    let (video_index, codec_id) = {
        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .expect("muxed file has a video stream");
        (stream.index(), stream.parameters().id())
    };
    assert_eq!(codec_id, ffmpeg_next::codec::Id::H264);

    let mut count = 0u32;
    let mut last_pts = i64::MIN;
    for (stream, packet) in input.packets() {
        if stream.index() != video_index {
            continue;
        }
        count += 1;
        if let Some(pts) = packet.pts() {
            assert!(pts > last_pts, "mux order must keep pts non-decreasing");
            last_pts = pts;
        }
    }
    assert!(
        count >= frames - 2 && count <= frames + 2,
        "expected ~{frames} packets, got {count}"
    );

    std::fs::remove_file(&out).ok();
    Ok(())
}

#[test]
fn cancelled_run_still_finalizes_the_container() -> anyhow::Result<()> {
    avpipe::init()?;
    let out = scratch_flv("cancel");
    let _ = std::fs::remove_file(&out);

    let config = test_config(&out.to_string_lossy(), 50);
    let layout = GridLayout::uniform(config.width, config.height, 2)?;
    let sources: Vec<Box<dyn FrameSource + Send>> = vec![
        Box::new(SolidSource {
            bgr: [1, 2, 3],
            width: 64,
            height: 96,
            remaining: u32::MAX,
        }),
        Box::new(SolidSource {
            bgr: [4, 5, 6],
            width: 64,
            height: 96,
            remaining: u32::MAX,
        }),
    ];

    let cancel = CancellationToken::new();
    cancel.cancel();
    let pipeline = Pipeline::new(&config, layout, sources)?;
    pipeline.run(&cancel)?;

    // Header and trailer were written even though no tick ever ran.
    assert!(std::fs::metadata(&out)?.len() > 0);
    assert!(ffmpeg_next::format::input(out.to_str().unwrap()).is_ok());

    std::fs::remove_file(&out).ok();
    Ok(())
}
