use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::audio::engine::{Engine, EngineHandle};
use crate::crusher::{CrusherParams, ParamUpdate};
use crate::settings::Settings;

/// Reply sent back to a controller after every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub enabled: bool,
    pub params: CrusherParams,
}

/// Controller commands, e.g. `{"cmd": "setParams", "bitDepth": 4}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Command {
    Toggle,
    Enable,
    Disable,
    Reset,
    SetParams(ParamUpdate),
}

/// Caller-owned control surface for one crusher pipeline.
///
/// A session starts disabled. Enabling it starts a fresh pipeline with every hold cycle at
/// phase zero; disabling it lets the host's audio through untouched. Dropping the session
/// and its [`Engine`] tears the pipeline down.
pub struct Session {
    handle: EngineHandle,
    enabled: bool,
    channels: usize,
}

impl Session {
    pub fn new(channels: usize, params: CrusherParams) -> (Self, Engine) {
        let (mut engine, handle) = Engine::new(channels, params);
        engine.set_enabled(false);

        debug!("Session created: {channels} channels, {}", handle.params());

        (
            Self {
                handle,
                enabled: false,
                channels,
            },
            engine,
        )
    }

    pub fn from_settings(settings: &Settings, channels: usize) -> (Self, Engine) {
        Self::new(channels, settings.crusher)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            enabled: self.enabled,
            params: self.handle.params(),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    pub fn params(&self) -> CrusherParams {
        self.handle.params()
    }

    /// Enables processing. Enabling an already running session restarts it from phase zero.
    pub fn enable(&mut self) -> Result<SessionStatus> {
        if self.enabled {
            self.handle.reset().context("failed to restart crusher")?;
        } else {
            self.handle
                .set_enabled(true)
                .context("failed to enable crusher")?;
            self.enabled = true;
        }

        info!("Bitcrusher enabled ({})", self.handle.params());
        Ok(self.status())
    }

    pub fn disable(&mut self) -> Result<SessionStatus> {
        if self.enabled {
            self.handle
                .set_enabled(false)
                .context("failed to disable crusher")?;
            self.enabled = false;
            info!("Bitcrusher disabled");
        }

        Ok(self.status())
    }

    pub fn toggle(&mut self) -> Result<SessionStatus> {
        if self.enabled {
            self.disable()
        } else {
            self.enable()
        }
    }

    pub fn reset(&self) -> Result<SessionStatus> {
        self.handle.reset().context("failed to reset crusher")?;
        Ok(self.status())
    }

    /// Applies a partial parameter update. Takes effect from the next block.
    pub fn set_params(&self, update: &ParamUpdate) -> SessionStatus {
        let params = self.handle.update(update);
        debug!("Params updated: {params}");
        self.status()
    }

    /// Changes the channel count. Fresh state is installed at the next block boundary.
    pub fn reconfigure(&mut self, channels: usize) -> Result<()> {
        if channels == self.channels {
            return Ok(());
        }

        self.handle
            .reconfigure(channels)
            .with_context(|| format!("failed to reconfigure for {channels} channels"))?;
        self.channels = channels;
        Ok(())
    }

    pub fn apply(&mut self, command: &Command) -> Result<SessionStatus> {
        match command {
            Command::Toggle => self.toggle(),
            Command::Enable => self.enable(),
            Command::Disable => self.disable(),
            Command::Reset => self.reset(),
            Command::SetParams(update) => Ok(self.set_params(update)),
        }
    }

    /// Disables processing and releases the control side.
    pub fn close(mut self) -> Result<()> {
        self.disable()?;
        debug!("Session closed");
        Ok(())
    }
}
