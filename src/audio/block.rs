use anyhow::{Result, bail};

/// Planar multi-channel buffer, one `Vec<f32>` per channel, all the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl Block {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frames]; channels],
            frames,
        }
    }

    /// Wraps existing channel buffers. Fails if the channels are ragged.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let frames = channels.first().map_or(0, Vec::len);
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != frames)
        {
            bail!(
                "channel {index} has {} frames, expected {frames}",
                channel.len()
            );
        }

        Ok(Self { channels, frames })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub const fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.frames == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Changes the frame count, keeping the channel count. New frames are silent.
    pub fn set_frames(&mut self, frames: usize) {
        for channel in &mut self.channels {
            channel.resize(frames, 0.0);
        }
        self.frames = frames;
    }

    /// Fills the block from interleaved samples, resizing to `samples.len() / channels` frames.
    /// A trailing partial frame is dropped.
    pub fn load_interleaved(&mut self, samples: &[f32]) {
        let channel_count = self.channel_count();
        if channel_count == 0 {
            return;
        }

        self.set_frames(samples.len() / channel_count);
        for (frame, chunk) in samples.chunks_exact(channel_count).enumerate() {
            for (channel, &sample) in self.channels.iter_mut().zip(chunk) {
                channel[frame] = sample;
            }
        }
    }

    /// Appends the block's frames to `out` in interleaved order.
    pub fn extend_interleaved(&self, out: &mut Vec<f32>) {
        out.reserve(self.frames * self.channel_count());
        for frame in 0..self.frames {
            out.extend(self.channels.iter().map(|channel| channel[frame]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_channels() {
        assert!(Block::from_channels(vec![vec![0.0; 4], vec![0.0; 3]]).is_err());

        let block = Block::from_channels(vec![vec![0.0; 4], vec![0.0; 4]]).unwrap();
        assert_eq!(block.channel_count(), 2);
        assert_eq!(block.frames(), 4);
    }

    #[test]
    fn test_interleave_both_ways() {
        let interleaved = [0.1f32, -0.1, 0.2, -0.2, 0.3, -0.3, 0.4];
        let mut block = Block::new(2, 0);
        block.load_interleaved(&interleaved);

        assert_eq!(block.frames(), 3);
        assert_eq!(block.channel(0), Some(&[0.1f32, 0.2, 0.3][..]));
        assert_eq!(block.channel(1), Some(&[-0.1f32, -0.2, -0.3][..]));

        let mut out = Vec::new();
        block.extend_interleaved(&mut out);
        assert_eq!(out, &interleaved[..6]);
    }

    #[test]
    fn test_empty_blocks() {
        assert!(Block::new(0, 128).is_empty());
        assert!(Block::new(2, 0).is_empty());
        assert!(!Block::new(1, 1).is_empty());
        assert!(Block::from_channels(Vec::new()).unwrap().is_empty());
    }
}
