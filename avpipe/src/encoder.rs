use ffmpeg_next::util::mathematics::rescale::Rescale;
use ffmpeg_next::{Dictionary, Rational, codec, format::Pixel};

use crate::error::{AvError, Result};
use crate::packet::RawPacket;

/// Encoder session parameters, fixed before open and immutable afterwards.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bit_rate: usize,
    /// Keyframe interval in frames. Small to bound receiver recovery latency.
    pub gop: u32,
    pub profile: String,
    pub pixel_format: Pixel,
    /// Carry codec extradata in the container header instead of in-band.
    pub global_header: bool,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            width: 2560,
            height: 720,
            fps: 30,
            bit_rate: 300_000,
            gop: 12,
            profile: "high444".to_string(),
            pixel_format: Pixel::YUV420P,
            global_header: false,
        }
    }
}

/// H.264 encoder session. Owns the encoder-format frame buffer, allocated
/// once and overwritten by the converter every tick, and the presentation
/// timestamp that advances with it.
pub struct VideoEncoder {
    inner: codec::encoder::Video,
    frame: ffmpeg_next::frame::Video,
    time_base: Rational,
}

impl std::fmt::Debug for VideoEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoEncoder")
            .field("time_base", &self.time_base)
            .finish_non_exhaustive()
    }
}

impl VideoEncoder {
    pub fn new(settings: &EncoderSettings) -> Result<Self> {
        let codec = ffmpeg_next::encoder::find(codec::Id::H264)
            .ok_or_else(|| AvError::EncoderConfig("no H.264 encoder available".to_string()))?;
        let mut encoder = codec::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| AvError::EncoderConfig(e.to_string()))?;

        let time_base = Rational::new(1, settings.fps as i32);
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(settings.pixel_format);
        encoder.set_frame_rate(Some(Rational::new(settings.fps as i32, 1)));
        encoder.set_time_base(time_base);
        encoder.set_bit_rate(settings.bit_rate);
        encoder.set_gop(settings.gop);
        if settings.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        options.set("profile", &settings.profile);
        options.set("preset", "superfast");
        options.set("tune", "zerolatency");
        let inner = encoder.open_with(options).map_err(AvError::EncoderOpen)?;

        let mut frame =
            ffmpeg_next::frame::Video::new(settings.pixel_format, settings.width, settings.height);
        frame.set_pts(Some(0));

        Ok(Self {
            inner,
            frame,
            time_base,
        })
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Codec parameters (including extradata) for declaring the output stream.
    pub fn parameters(&self) -> codec::Parameters {
        codec::Parameters::from(&self.inner)
    }

    /// The owned encoder-format buffer. The converter writes the next canvas
    /// into it before each `encode` call.
    pub fn frame_mut(&mut self) -> &mut ffmpeg_next::frame::Video {
        &mut self.frame
    }

    /// One tick: advance the presentation timestamp by one encoder-time-base
    /// step, submit the owned frame, then drain every packet the encoder has
    /// ready. One submit may yield zero packets (the encoder buffers) or
    /// several; no 1:1 assumption.
    pub fn encode(&mut self) -> Result<Vec<RawPacket>> {
        let pts = self.frame.pts().unwrap_or(0) + 1;
        self.frame.set_pts(Some(pts));
        self.inner
            .send_frame(&self.frame)
            .map_err(AvError::EncodeSubmit)?;
        self.drain()
    }

    /// Signals end of stream and collects whatever the encoder still holds.
    pub fn finish(&mut self) -> Result<Vec<RawPacket>> {
        self.inner.send_eof().map_err(AvError::EncodeSubmit)?;
        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<RawPacket>> {
        let mut packets = Vec::new();
        loop {
            let mut packet = codec::packet::Packet::empty();
            match self.inner.receive_packet(&mut packet) {
                Ok(()) => packets.push(RawPacket::from((packet, self.time_base))),
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    break;
                }
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(AvError::EncodePacket(e)),
            }
        }
        Ok(packets)
    }
}

/// The presentation-time advance of one encoder tick, expressed in the mux
/// stream's time base.
pub fn pts_step(encoder_time_base: Rational, stream_time_base: Rational) -> i64 {
    1i64.rescale(encoder_time_base, stream_time_base)
}
