use serde::Deserialize;

use crate::color::{Channel, Rgb};

/// Perturbation of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelMutation {
    /// Probability in [0, 1] that the channel is perturbed at all.
    pub rate: f64,
    /// Smallest delta, may be negative.
    pub min: i32,
    /// Largest delta.
    pub max: i32,
}

impl Default for ChannelMutation {
    fn default() -> Self {
        Self {
            rate: 0.2,
            min: -10,
            max: 10,
        }
    }
}

impl ChannelMutation {
    /// A mutation that never fires.
    pub const NONE: ChannelMutation = ChannelMutation {
        rate: 0.0,
        min: 0,
        max: 0,
    };

    /// Delta drawn uniformly from `[min, max]`, rounded half up.
    fn delta(&self, rng: &mut fastrand::Rng) -> i32 {
        let (lo, hi) = (self.min.min(self.max) as f64, self.min.max(self.max) as f64);
        (rng.f64() * (hi - lo) + lo + 0.5).floor() as i32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub red: ChannelMutation,
    pub green: ChannelMutation,
    pub blue: ChannelMutation,
}

impl MutationConfig {
    pub fn uniform(channel: ChannelMutation) -> Self {
        Self {
            red: channel,
            green: channel,
            blue: channel,
        }
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> &ChannelMutation {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    /// Returns `base` with each channel independently perturbed: with
    /// probability `rate` a delta drawn from `[min, max]` is added and the
    /// result clamped to `0..=255`.
    pub fn apply(&self, base: Rgb, rng: &mut fastrand::Rng) -> Rgb {
        let mut color = base;
        for channel in Channel::ALL {
            let mutation = self.channel(channel);
            if !test_rate(mutation.rate, rng) {
                continue;
            }
            let delta = mutation.delta(rng);
            let value = (color.channel(channel) as i32 + delta).clamp(0, 255);
            color.set_channel(channel, value as u8);
        }
        color
    }
}

/// Bernoulli trial with success probability `rate`.
#[inline]
pub fn test_rate(rate: f64, rng: &mut fastrand::Rng) -> bool {
    rng.f64() < rate
}
