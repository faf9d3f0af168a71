use clap::ValueEnum;

/// H.264 profiles the encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum H264Profile {
    Baseline,
    Main,
    High,
    High10,
    High422,
    High444,
}

impl H264Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            H264Profile::Baseline => "baseline",
            H264Profile::Main => "main",
            H264Profile::High => "high",
            H264Profile::High10 => "high10",
            H264Profile::High422 => "high422",
            H264Profile::High444 => "high444",
        }
    }
}

/// Immutable stream configuration, resolved once before the pipeline starts.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub inputs: Vec<String>,
    pub output: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate: usize,
    pub profile: H264Profile,
}

impl StreamConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.inputs.is_empty() && self.inputs.len() <= avpipe::layout::GridLayout::MAX_SLOTS,
            "between 1 and {} input sources required, got {}",
            avpipe::layout::GridLayout::MAX_SLOTS,
            self.inputs.len()
        );
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "output size must be positive, got {}x{}",
            self.width,
            self.height
        );
        anyhow::ensure!(
            self.width % 2 == 0 && self.height % 2 == 0,
            "output size must be even for 4:2:0 encoding, got {}x{}",
            self.width,
            self.height
        );
        anyhow::ensure!(self.fps > 0, "fps must be positive");
        anyhow::ensure!(self.bitrate > 0, "bitrate must be positive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> StreamConfig {
        StreamConfig {
            inputs: vec!["a".into(), "b".into()],
            output: "rtmp://localhost/live/stream".into(),
            width: 2560,
            height: 720,
            fps: 30,
            bitrate: 300_000,
            profile: H264Profile::High444,
        }
    }

    #[test]
    fn base_config_is_valid() {
        base().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        assert!(StreamConfig {
            inputs: vec![],
            ..base()
        }
        .validate()
        .is_err());
        assert!(StreamConfig {
            inputs: vec!["a".into(); 5],
            ..base()
        }
        .validate()
        .is_err());
        assert!(StreamConfig {
            width: 0,
            ..base()
        }
        .validate()
        .is_err());
        assert!(StreamConfig {
            height: 719,
            ..base()
        }
        .validate()
        .is_err());
        assert!(StreamConfig { fps: 0, ..base() }.validate().is_err());
        assert!(StreamConfig {
            bitrate: 0,
            ..base()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn profile_names_match_encoder_spelling() {
        assert_eq!(H264Profile::High444.as_str(), "high444");
        assert_eq!(H264Profile::Baseline.as_str(), "baseline");
    }
}
