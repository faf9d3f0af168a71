use ffmpeg_next::format::Pixel;

use crate::error::{AvError, Result};
use crate::frame::RawFrame;
use crate::layout::GridLayout;

const BYTES_PER_PIXEL: usize = 3;

/// Arranges source frames into one BGR24 canvas according to a [`GridLayout`].
///
/// The canvas is allocated once and zero-filled; each tick overwrites the
/// covered slots. Regions no source covers stay black, and a slot skipped
/// because of an oversize frame keeps its previous pixels. Never scales.
pub struct Compositor {
    canvas: ffmpeg_next::frame::Video,
    layout: GridLayout,
}

impl Compositor {
    pub fn new(layout: GridLayout) -> Self {
        let (width, height) = layout.canvas_size();
        let mut canvas = ffmpeg_next::frame::Video::new(Pixel::BGR24, width, height);
        canvas.data_mut(0).fill(0);
        Self { canvas, layout }
    }

    /// Copies `frame` into its slot, row by row, honoring both strides.
    /// A frame larger than its slot is rejected with `LayoutOverflow` before
    /// any byte is written.
    pub fn blit(&mut self, slot: usize, frame: &RawFrame) -> Result<()> {
        let rect = self
            .layout
            .slot(slot)
            .ok_or_else(|| AvError::Layout(format!("unknown slot {slot}")))?;
        if frame.width() > rect.width || frame.height() > rect.height {
            return Err(AvError::LayoutOverflow {
                slot,
                width: frame.width(),
                height: frame.height(),
                bound_width: rect.width,
                bound_height: rect.height,
            });
        }

        let src_stride = frame.stride();
        let dst_stride = self.canvas.stride(0);
        let row_bytes = frame.width() as usize * BYTES_PER_PIXEL;
        let x_offset = rect.x as usize * BYTES_PER_PIXEL;
        let src = frame.plane();
        let dst = self.canvas.data_mut(0);
        for row in 0..frame.height() as usize {
            let src_start = row * src_stride;
            let dst_start = (rect.y as usize + row) * dst_stride + x_offset;
            dst[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }
        Ok(())
    }

    /// The composed frame, ready for pixel conversion.
    pub fn canvas(&self) -> &ffmpeg_next::frame::Video {
        &self.canvas
    }

    /// BGR bytes at (x, y). Diagnostic accessor.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let stride = self.canvas.stride(0);
        let start = y as usize * stride + x as usize * BYTES_PER_PIXEL;
        let data = self.canvas.data(0);
        [data[start], data[start + 1], data[start + 2]]
    }
}
