//! Offline host: drives a session block by block over a whole file, the way a real-time
//! host would drive it from its audio callback.

pub mod automation;

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::Path;

pub use automation::{Automation, AutomationEvent};

use crate::audio::block::Block;
use crate::audio::engine::Engine;
use crate::io::wav::{self, WavAudio};
use crate::session::Session;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub channels: usize,
    pub frames: u64,
    pub blocks: u64,
    pub events_applied: usize,
}

/// Runs interleaved audio through `engine` in blocks of `block_size` frames.
///
/// Automation events are applied through `session` before the block they fall due in,
/// with the engine draining its queue after each one. The final block may be shorter
/// than `block_size`.
pub fn render_interleaved(
    input: &[f32],
    channels: usize,
    block_size: usize,
    session: &mut Session,
    engine: &mut Engine,
    automation: &mut Automation,
) -> Result<(Vec<f32>, RenderSummary)> {
    if block_size == 0 {
        bail!("block size must be at least one frame");
    }
    if channels == 0 {
        return Ok((Vec::new(), RenderSummary::default()));
    }

    let mut summary = RenderSummary {
        channels,
        ..RenderSummary::default()
    };
    let mut output = Vec::with_capacity(input.len());
    let mut block = Block::new(channels, block_size);

    for chunk in input.chunks(block_size * channels) {
        for event in automation.take_due(summary.frames) {
            let status = session
                .apply(&event.command)
                .with_context(|| format!("failed to apply automation at frame {}", event.frame))?;
            debug!(
                "frame {}: {}",
                summary.frames,
                serde_json::to_string(&status)?
            );
            summary.events_applied += 1;
            engine.handle_messages();
        }

        block.load_interleaved(chunk);
        engine
            .process(block.channels_mut())
            .with_context(|| format!("failed to process block {}", summary.blocks))?;
        block.extend_interleaved(&mut output);

        summary.frames += block.frames() as u64;
        summary.blocks += 1;
    }

    Ok((output, summary))
}

/// Crushes `input` into `output` using `settings` for the initial state.
///
/// The session is enabled before the first block unless the automation says otherwise
/// at frame zero.
pub fn render_file(
    input: &Path,
    output: &Path,
    settings: &Settings,
    mut automation: Automation,
) -> Result<RenderSummary> {
    let audio = wav::read_wav(input)?;
    let channels = usize::from(audio.channels);
    info!(
        "Rendering {} ({} channels, {} Hz, {} frames)",
        input.display(),
        channels,
        audio.sample_rate,
        audio.frames()
    );

    let (mut session, mut engine) = Session::from_settings(settings, channels);
    session.enable()?;

    let (samples, summary) = render_interleaved(
        &audio.samples,
        channels,
        settings.block_size,
        &mut session,
        &mut engine,
        &mut automation,
    )?;
    session.close()?;

    wav::write_wav(
        output,
        &WavAudio {
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            samples,
        },
        settings.output_format,
    )?;

    info!(
        "Wrote {} ({} blocks, {} automation events)",
        output.display(),
        summary.blocks,
        summary.events_applied
    );
    Ok(summary)
}
