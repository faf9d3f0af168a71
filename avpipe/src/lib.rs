pub mod compositor;
pub mod convert;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod layout;
pub mod output;
pub mod packet;
pub mod source;

/// Registers FFmpeg components and the network stack. Call once at startup
/// before opening any source or sink.
pub fn init() -> error::Result<()> {
    ffmpeg_next::init().map_err(error::AvError::Init)?;
    ffmpeg_next::format::network::init();
    Ok(())
}
