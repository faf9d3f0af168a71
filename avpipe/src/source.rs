use std::ffi::CString;

use ffmpeg_next::{Dictionary, codec, format::Pixel, media};

use crate::convert::Converter;
use crate::error::{AvError, Result};
use crate::frame::RawFrame;

/// Blocking supplier of decoded BGR24 frames at a fixed size.
/// `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn pull(&mut self) -> Result<Option<RawFrame>>;

    /// The size every pulled frame is delivered at.
    fn size(&self) -> (u32, u32);
}

/// A demuxed and decoded video input: network stream, file, or device.
/// Decoded frames are converted to BGR24 at the configured size before they
/// leave this type, so downstream stages never see the source's native
/// format.
pub struct AvSource {
    input: ffmpeg_next::format::context::Input,
    stream_index: usize,
    decoder: codec::decoder::Video,
    converter: Option<Converter>,
    width: u32,
    height: u32,
    draining: bool,
}

impl std::fmt::Debug for AvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvSource")
            .field("stream_index", &self.stream_index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("draining", &self.draining)
            .finish_non_exhaustive()
    }
}

impl AvSource {
    /// Resolve an input format by name (e.g. "lavfi", "v4l2") via FFmpeg's
    /// av_find_input_format.
    fn find_input_format(name: &str) -> Option<ffmpeg_next::format::format::Input> {
        let cname = CString::new(name).ok()?;
        let ptr = unsafe { ffmpeg_next::ffi::av_find_input_format(cname.as_ptr()) };
        if ptr.is_null() {
            None
        } else {
            Some(unsafe { ffmpeg_next::format::format::Input::wrap(ptr as *mut _) })
        }
    }

    /// Opens `url`, optionally forcing a demuxer format, and binds the best
    /// video stream's decoder. Frames will be delivered at `width`x`height`.
    pub fn open(url: &str, format: Option<&str>, width: u32, height: u32) -> Result<Self> {
        let open_err = |reason: String| AvError::DeviceOpen {
            url: url.to_string(),
            reason,
        };

        let input = match format {
            Some(name) => {
                let fmt = Self::find_input_format(name)
                    .ok_or_else(|| open_err(format!("input format not found: {name}")))?;
                ffmpeg_next::format::open_with(
                    url,
                    &ffmpeg_next::format::format::Format::Input(fmt),
                    Dictionary::new(),
                )
                .map_err(|e| open_err(e.to_string()))?
                .input()
            }
            None => ffmpeg_next::format::input(url).map_err(|e| open_err(e.to_string()))?,
        };

        let (stream_index, parameters) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| open_err("no video stream".to_string()))?;
            (stream.index(), stream.parameters())
        };
        let decoder = codec::context::Context::from_parameters(parameters)
            .map_err(|e| open_err(e.to_string()))?
            .decoder()
            .video()
            .map_err(|e| open_err(e.to_string()))?;

        Ok(Self {
            input,
            stream_index,
            decoder,
            converter: None,
            width,
            height,
            draining: false,
        })
    }

    fn next_packet(&mut self) -> Option<ffmpeg_next::codec::packet::Packet> {
        loop {
            match self.input.packets().next() {
                Some((stream, packet)) if stream.index() == self.stream_index => {
                    return Some(packet);
                }
                Some(_) => continue,
                None => return None,
            }
        }
    }

    /// One decoded frame converted to BGR24 at the configured size, or None
    /// when the decoder wants more input.
    fn receive(&mut self) -> Result<Option<RawFrame>> {
        let mut decoded = ffmpeg_next::frame::Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => {
                if self.converter.is_none() {
                    self.converter = Some(Converter::new(
                        decoded.format(),
                        decoded.width(),
                        decoded.height(),
                        Pixel::BGR24,
                        self.width,
                        self.height,
                    )?);
                }
                let mut out = ffmpeg_next::frame::Video::new(Pixel::BGR24, self.width, self.height);
                self.converter.as_mut().unwrap().run(&decoded, &mut out)?;
                Ok(Some(RawFrame::from(out)))
            }
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(AvError::Decode(e)),
        }
    }
}

impl FrameSource for AvSource {
    fn pull(&mut self) -> Result<Option<RawFrame>> {
        loop {
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
            if self.draining {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        // One corrupt packet should not end the stream.
                        log::warn!("decoder rejected packet: {}", e);
                    }
                }
                None => {
                    self.draining = true;
                    if let Err(e) = self.decoder.send_eof() {
                        log::warn!("decoder eof: {}", e);
                    }
                }
            }
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
