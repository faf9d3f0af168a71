use ffmpeg_next::format::Pixel;

/// One decoded source image in 24-bit interleaved BGR. The driver owns it for
/// a single tick; nothing retains it across ticks.
#[derive(Clone)]
pub struct RawFrame {
    inner: ffmpeg_next::frame::Video,
}

impl RawFrame {
    pub fn new(format: Pixel, width: u32, height: u32) -> Self {
        Self {
            inner: ffmpeg_next::frame::Video::new(format, width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn format(&self) -> Pixel {
        self.inner.format()
    }

    /// Row stride of the packed plane in bytes. May exceed width * 3 due to
    /// allocator alignment.
    pub fn stride(&self) -> usize {
        self.inner.stride(0)
    }

    pub fn plane(&self) -> &[u8] {
        self.inner.data(0)
    }

    pub fn plane_mut(&mut self) -> &mut [u8] {
        self.inner.data_mut(0)
    }
}

impl From<ffmpeg_next::frame::Video> for RawFrame {
    fn from(frame: ffmpeg_next::frame::Video) -> Self {
        Self { inner: frame }
    }
}
