use ffmpeg_next::{Rational, codec};

use crate::error::{AvError, Result};
use crate::packet::RawPacket;

/// Container/transport session around one output URL.
///
/// Lifecycle: `open` → `declare_stream` → `write_header` → `write_packet`* →
/// `finish`. The state guards turn misuse (header twice, packets before the
/// header, streams after it) into typed errors instead of muxer corruption,
/// and dropping the sink finalizes the container even on abnormal exits.
pub struct OutputSink {
    inner: ffmpeg_next::format::context::Output,
    url: String,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl OutputSink {
    /// Allocates the container context for `container` (e.g. "flv" for RTMP)
    /// and opens the transport if the format needs one.
    pub fn open(url: &str, container: &str) -> Result<Self> {
        let inner = ffmpeg_next::format::output_as(url, container).map_err(|source| {
            AvError::SinkOpen {
                url: url.to_string(),
                source,
            }
        })?;
        Ok(Self {
            inner,
            url: url.to_string(),
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    /// Whether the container wants codec extradata in the stream header
    /// rather than in-band (FLV does).
    pub fn needs_global_header(&self) -> bool {
        self.inner
            .format()
            .flags()
            .contains(ffmpeg_next::format::flag::Flags::GLOBAL_HEADER)
    }

    /// Registers the single video stream. Must happen before `write_header`.
    pub fn declare_stream(
        &mut self,
        parameters: codec::Parameters,
        time_base: Rational,
    ) -> Result<usize> {
        if self.have_written_header {
            return Err(AvError::SinkState("stream declared after header"));
        }
        let mut stream = self
            .inner
            .add_stream(ffmpeg_next::encoder::find(parameters.id()))
            .map_err(AvError::StreamDeclare)?;
        stream.set_parameters(parameters);
        stream.set_time_base(time_base);
        Ok(stream.index())
    }

    /// Emits the container header. Exactly once, after all streams are
    /// declared and before any packet.
    pub fn write_header(&mut self) -> Result<()> {
        if self.have_written_header {
            return Err(AvError::SinkState("header written twice"));
        }
        self.inner.write_header().map_err(AvError::HeaderWrite)?;
        self.have_written_header = true;
        log::debug!("container header written to {}", self.url);
        Ok(())
    }

    /// The muxer-adjusted stream time base; meaningful after `write_header`.
    pub fn stream_time_base(&self, index: usize) -> Option<Rational> {
        self.inner.stream(index).map(|s| s.time_base())
    }

    /// Writes one packet, rescaling its timestamps from the packet's own
    /// time base into the stream's. Packets must arrive in the encoder's
    /// emission order; the sink does not reorder.
    pub fn write_packet(&mut self, stream_index: usize, mut packet: RawPacket) -> Result<()> {
        if !self.have_written_header {
            return Err(AvError::SinkState("packet before header"));
        }
        let stream_time_base = self
            .inner
            .stream(stream_index)
            .ok_or(AvError::SinkState("unknown output stream"))?
            .time_base();
        let packet_time_base = packet.time_base();
        let inner_packet = packet.get_mut();
        inner_packet.set_stream(stream_index);
        inner_packet.set_position(-1);
        inner_packet.rescale_ts(packet_time_base, stream_time_base);
        inner_packet
            .write_interleaved(&mut self.inner)
            .map_err(AvError::PacketWrite)
    }

    /// Writes the trailer, once. Safe to call again; later calls are no-ops.
    pub fn finish(&mut self) -> Result<()> {
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner.write_trailer().map_err(AvError::TrailerWrite)?;
            log::debug!("container trailer written to {}", self.url);
        }
        Ok(())
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        // Finalize the container on paths that never reached finish(), so an
        // aborted run still leaves a playable stream.
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            if let Err(e) = self.inner.write_trailer() {
                log::warn!("trailer write on drop failed for {}: {}", self.url, e);
            }
        }
    }
}
