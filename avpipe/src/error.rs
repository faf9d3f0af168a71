use ffmpeg_next as ffmpeg;

pub type Result<T> = std::result::Result<T, AvError>;

/// Everything that can go wrong between a source URL and a muxed packet.
///
/// Initialization failures (`DeviceOpen`, `EncoderConfig`, `EncoderOpen`,
/// `SinkOpen`, `ConverterInit`, `Layout`) are fatal. `LayoutOverflow` is the
/// one per-tick condition a driver may log and skip.
#[derive(Debug, thiserror::Error)]
pub enum AvError {
    #[error("ffmpeg initialization failed: {0}")]
    Init(#[source] ffmpeg::Error),

    #[error("failed to open source {url}: {reason}")]
    DeviceOpen { url: String, reason: String },

    #[error("invalid encoder configuration: {0}")]
    EncoderConfig(String),

    #[error("failed to open video encoder: {0}")]
    EncoderOpen(#[source] ffmpeg::Error),

    #[error("failed to open output {url}: {source}")]
    SinkOpen {
        url: String,
        #[source]
        source: ffmpeg::Error,
    },

    #[error("failed to declare output stream: {0}")]
    StreamDeclare(#[source] ffmpeg::Error),

    #[error("failed to write container header: {0}")]
    HeaderWrite(#[source] ffmpeg::Error),

    #[error("failed to write container trailer: {0}")]
    TrailerWrite(#[source] ffmpeg::Error),

    #[error("encoder rejected frame: {0}")]
    EncodeSubmit(#[source] ffmpeg::Error),

    #[error("failed to receive packet from encoder: {0}")]
    EncodePacket(#[source] ffmpeg::Error),

    #[error("failed to write packet: {0}")]
    PacketWrite(#[source] ffmpeg::Error),

    #[error("failed to initialize pixel converter: {0}")]
    ConverterInit(#[source] ffmpeg::Error),

    #[error("pixel conversion failed: {0}")]
    Convert(#[source] ffmpeg::Error),

    #[error("decode failed: {0}")]
    Decode(#[source] ffmpeg::Error),

    #[error("slot {slot}: extent {width}x{height} exceeds bounds {bound_width}x{bound_height}")]
    LayoutOverflow {
        slot: usize,
        width: u32,
        height: u32,
        bound_width: u32,
        bound_height: u32,
    },

    #[error("invalid layout: {0}")]
    Layout(String),

    #[error("output sink used out of order: {0}")]
    SinkState(&'static str),
}
