use std::time::Duration;

use ffmpeg_next::format::Pixel;
use tokio_util::sync::CancellationToken;

use avpipe::compositor::Compositor;
use avpipe::convert::Converter;
use avpipe::encoder::{EncoderSettings, VideoEncoder, pts_step};
use avpipe::error::AvError;
use avpipe::layout::GridLayout;
use avpipe::output::OutputSink;
use avpipe::source::FrameSource;

use crate::config::StreamConfig;

/// Fixed-interval tick pacing: one sleep of 1/fps per tick, no compensation
/// for the work time of the tick itself. Sustained output reaches the target
/// rate only while a whole tick completes inside one frame interval.
pub struct Pacer {
    interval: Duration,
}

impl Pacer {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait(&self) {
        std::thread::sleep(self.interval);
    }
}

/// The whole compositing/encoding/muxing session, owned in one place:
/// constructed, run, torn down. The trailer is written on every exit path.
pub struct Pipeline {
    sources: Vec<Box<dyn FrameSource + Send>>,
    compositor: Compositor,
    converter: Converter,
    encoder: VideoEncoder,
    sink: OutputSink,
    stream_index: usize,
    pacer: Pacer,
    frames: u64,
}

impl Pipeline {
    pub fn new(
        config: &StreamConfig,
        layout: GridLayout,
        sources: Vec<Box<dyn FrameSource + Send>>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            sources.len() == layout.slot_count(),
            "{} sources for {} slots",
            sources.len(),
            layout.slot_count()
        );
        for (slot, source) in sources.iter().enumerate() {
            let rect = layout
                .slot(slot)
                .ok_or_else(|| anyhow::anyhow!("no slot for source {slot}"))?;
            let (width, height) = source.size();
            anyhow::ensure!(
                width <= rect.width && height <= rect.height,
                "source {slot} delivers {width}x{height}, larger than its {}x{} slot",
                rect.width,
                rect.height
            );
        }
        let compositor = Compositor::new(layout);

        let mut sink = OutputSink::open(&config.output, "flv")?;
        let settings = EncoderSettings {
            width: config.width,
            height: config.height,
            fps: config.fps,
            bit_rate: config.bitrate,
            profile: config.profile.as_str().to_string(),
            global_header: sink.needs_global_header(),
            ..EncoderSettings::default()
        };
        let encoder = VideoEncoder::new(&settings)?;
        let converter = Converter::new(
            Pixel::BGR24,
            config.width,
            config.height,
            settings.pixel_format,
            config.width,
            config.height,
        )?;
        let stream_index = sink.declare_stream(encoder.parameters(), encoder.time_base())?;
        sink.write_header()?;
        if let Some(stream_time_base) = sink.stream_time_base(stream_index) {
            log::debug!(
                "stream time base {:?}, pts step per frame {}",
                stream_time_base,
                pts_step(encoder.time_base(), stream_time_base)
            );
        }

        Ok(Self {
            sources,
            compositor,
            converter,
            encoder,
            sink,
            stream_index,
            pacer: Pacer::new(config.fps),
            frames: 0,
        })
    }

    /// Runs the tick loop until cancellation, end of stream, or a fatal
    /// error, then flushes the encoder and writes the trailer in all three
    /// cases.
    pub fn run(mut self, cancel: &CancellationToken) -> anyhow::Result<()> {
        let run_result = self.stream_loop(cancel);
        let finish_result = self.finish();
        log::info!("pipeline stopped after {} frames", self.frames);
        run_result.and(finish_result)
    }

    fn stream_loop(&mut self, cancel: &CancellationToken) -> anyhow::Result<()> {
        loop {
            if cancel.is_cancelled() {
                log::info!("cancellation requested, stopping stream");
                return Ok(());
            }

            for slot in 0..self.sources.len() {
                let frame = match self.sources[slot].pull()? {
                    Some(frame) => frame,
                    None => {
                        log::info!("source {} reached end of stream", slot);
                        return Ok(());
                    }
                };
                match self.compositor.blit(slot, &frame) {
                    Ok(()) => {}
                    // Oversize frame: keep the slot's previous content and
                    // carry on with this tick.
                    Err(e @ AvError::LayoutOverflow { .. }) => log::warn!("{}", e),
                    Err(e) => return Err(e.into()),
                }
            }

            self.converter
                .run(self.compositor.canvas(), self.encoder.frame_mut())?;
            for packet in self.encoder.encode()? {
                log::trace!(
                    "packet pts {:?} dts {:?} size {} key {}",
                    packet.pts(),
                    packet.dts(),
                    packet.size(),
                    packet.is_key()
                );
                self.sink.write_packet(self.stream_index, packet)?;
            }

            self.frames += 1;
            self.pacer.wait();
        }
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        for packet in self.encoder.finish()? {
            self.sink.write_packet(self.stream_index, packet)?;
        }
        self.sink.finish()?;
        Ok(())
    }
}
