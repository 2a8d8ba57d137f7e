use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(ValueEnum, Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Float, // 32-bit IEEE float, keeps crushed values exact
    Pcm16,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float => write!(f, "32-bit float"),
            Self::Pcm16 => write!(f, "16-bit PCM"),
        }
    }
}

/// Interleaved, normalized audio.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl WavAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }
}

/// Reads a WAV file, scaling integer PCM into `[-1.0, 1.0]`.
pub fn read_wav(path: &Path) -> Result<WavAudio> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file '{}'", path.display()))?;
    let spec = reader.spec();
    debug!("Reading {}: {:?}", path.display(), spec);

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to decode float samples")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to decode integer samples")?
        }
    };

    Ok(WavAudio {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}

pub fn write_wav(path: &Path, audio: &WavAudio, format: OutputFormat) -> Result<()> {
    let spec = match format {
        OutputFormat::Float => WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
        OutputFormat::Pcm16 => WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create WAV file '{}'", path.display()))?;

    for &sample in &audio.samples {
        match format {
            OutputFormat::Float => writer.write_sample(sample)?,
            OutputFormat::Pcm16 => {
                let v = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer.write_sample(v)?;
            }
        }
    }

    writer
        .finalize()
        .with_context(|| format!("failed to finalize WAV file '{}'", path.display()))
}
