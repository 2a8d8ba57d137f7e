use anyhow::{Result, anyhow, bail};
use arc_swap::ArcSwap;
use assert_no_alloc::assert_no_alloc;
use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, warn};
use std::sync::Arc;

use crate::crusher::{Crusher, CrusherParams, ParamUpdate};

const MESSAGE_CHANNEL_CAPACITY: usize = 16;

pub enum EngineMessage {
    /// Restart every channel's hold cycle.
    Reset,
    /// Enabling starts a fresh pipeline; disabling passes audio through untouched.
    SetEnabled(bool),
    /// Swap in state for a new channel count. Built on the control side.
    Reconfigure(Crusher),
}

/// Audio-side half of the crusher. Lives on the processing thread.
pub struct Engine {
    crusher: Crusher,
    /// Latest parameter snapshot published by the handle.
    params: Arc<ArcSwap<CrusherParams>>,
    /// Structural updates, applied at block boundaries.
    rx_updates: Receiver<EngineMessage>,
    /// Replaced crushers go back to the control side to be freed there.
    tx_retired: Sender<Crusher>,
    enabled: bool,
}

/// Control-side half. Publishes parameters and queues structural changes.
pub struct EngineHandle {
    params: Arc<ArcSwap<CrusherParams>>,
    tx_updates: Sender<EngineMessage>,
    rx_retired: Receiver<Crusher>,
}

impl Engine {
    pub fn new(channels: usize, params: CrusherParams) -> (Self, EngineHandle) {
        let params = Arc::new(ArcSwap::from_pointee(params.clamped()));
        let (tx_updates, rx_updates) = bounded::<EngineMessage>(MESSAGE_CHANNEL_CAPACITY);
        let (tx_retired, rx_retired) = bounded::<Crusher>(MESSAGE_CHANNEL_CAPACITY);

        (
            Self {
                crusher: Crusher::new(channels),
                params: Arc::clone(&params),
                rx_updates,
                tx_retired,
                enabled: true,
            },
            EngineHandle {
                params,
                tx_updates,
                rx_retired,
            },
        )
    }

    pub fn channels(&self) -> usize {
        self.crusher.channels()
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.crusher.reset();
        }
        self.enabled = enabled;
    }

    pub fn crusher(&self) -> &Crusher {
        &self.crusher
    }

    /// Processes one block in place.
    ///
    /// Blocks with no channels, or with every channel empty, are a no-op. A ragged block
    /// or one whose channel count does not match the engine is rejected and left untouched.
    pub fn process<C: AsMut<[f32]>>(&mut self, block: &mut [C]) -> Result<()> {
        self.handle_messages();

        let frames = match block.first_mut() {
            Some(channel) => channel.as_mut().len(),
            None => return Ok(()),
        };
        if block.iter_mut().any(|channel| channel.as_mut().len() != frames) {
            bail!("block channels have unequal frame counts");
        }
        if frames == 0 {
            return Ok(());
        }

        if block.len() != self.crusher.channels() {
            bail!(
                "block has {} channels, engine is configured for {}",
                block.len(),
                self.crusher.channels()
            );
        }

        if !self.enabled {
            return Ok(());
        }

        let params = **self.params.load();
        let crusher = &mut self.crusher;
        assert_no_alloc(|| crusher.process(block, params));

        Ok(())
    }

    pub fn handle_messages(&mut self) {
        while let Ok(message) = self.rx_updates.try_recv() {
            match message {
                EngineMessage::Reset => {
                    self.crusher.reset();
                    debug!("Crusher state reset");
                }
                EngineMessage::SetEnabled(enabled) => {
                    self.set_enabled(enabled);
                    debug!("Crusher enabled: {enabled}");
                }
                EngineMessage::Reconfigure(crusher) => {
                    debug!(
                        "Reconfigured from {} to {} channels",
                        self.crusher.channels(),
                        crusher.channels()
                    );
                    let retired = std::mem::replace(&mut self.crusher, crusher);
                    // Dropped here only if the handle is gone or has stopped reclaiming.
                    let _ = self.tx_retired.try_send(retired);
                }
            }
        }
    }
}

impl EngineHandle {
    pub fn params(&self) -> CrusherParams {
        **self.params.load()
    }

    pub fn set_params(&self, params: CrusherParams) {
        self.params.store(Arc::new(params.clamped()));
    }

    /// Merges a partial update into the live parameters and returns the result.
    ///
    /// Concurrent updates to different fields never overwrite each other.
    pub fn update(&self, update: &ParamUpdate) -> CrusherParams {
        let previous = self.params.rcu(|params| params.apply(update));
        previous.apply(update)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(EngineMessage::Reset)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.send(EngineMessage::SetEnabled(enabled))
    }

    pub fn reconfigure(&self, channels: usize) -> Result<()> {
        self.send(EngineMessage::Reconfigure(Crusher::new(channels)))
    }

    /// Frees crushers the engine has swapped out. Returns how many were dropped.
    pub fn reclaim(&self) -> usize {
        let retired = self.rx_retired.try_iter().count();
        if retired > 0 {
            debug!("Reclaimed {retired} retired crusher(s)");
        }
        retired
    }

    fn send(&self, message: EngineMessage) -> Result<()> {
        self.reclaim();
        self.tx_updates.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("Engine message queue is full");
                anyhow!("engine message queue is full")
            }
            TrySendError::Disconnected(_) => anyhow!("engine has been dropped"),
        })
    }
}
