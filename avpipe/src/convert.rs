use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

use crate::error::{AvError, Result};

/// Pixel format/size conversion context, bound once at initialization.
///
/// The mapping is fixed: feeding a frame whose format or dimensions differ
/// from the bound input is rejected by libswscale and surfaces as a
/// [`AvError::Convert`]; there is no dynamic rebinding mid-stream.
pub struct Converter {
    context: scaling::Context,
}

impl Converter {
    pub fn new(
        src_format: Pixel,
        src_width: u32,
        src_height: u32,
        dst_format: Pixel,
        dst_width: u32,
        dst_height: u32,
    ) -> Result<Self> {
        let context = scaling::Context::get(
            src_format,
            src_width,
            src_height,
            dst_format,
            dst_width,
            dst_height,
            scaling::flag::Flags::BICUBIC,
        )
        .map_err(AvError::ConverterInit)?;
        Ok(Self { context })
    }

    pub fn run(
        &mut self,
        src: &ffmpeg_next::frame::Video,
        dst: &mut ffmpeg_next::frame::Video,
    ) -> Result<()> {
        self.context.run(src, dst).map_err(AvError::Convert)
    }
}

unsafe impl Send for Converter {}
