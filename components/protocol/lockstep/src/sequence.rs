//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

use antijam_api::AjError;
use heapless::Vec;
use rand_core::RngCore;

use crate::*;

/// Hop sequence length before truncation to a whole number of blocks
pub const SEQUENCE_LEN: usize = 256;
/// Fixed-point scale for the inter-channel frequency spread
pub const FREQ_SPREAD_SCALE: u64 = 256;

/// Regulatory band description.
///
/// Frequencies in Hz. `freq_count` channels are spread evenly between
/// `freq_start` and `freq_stop` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FhssConfig {
    pub domain: &'static str,
    pub freq_start: u32,
    pub freq_stop: u32,
    pub freq_count: u16,
}

impl FhssConfig {
    pub const fn freq_center(&self) -> u32 {
        self.freq_start / 2 + self.freq_stop / 2
    }
}

pub const DOMAIN_EU_868: FhssConfig = FhssConfig {
    domain: "EU868",
    freq_start: 865_275_000,
    freq_stop: 869_575_000,
    freq_count: 13,
};

pub const DOMAIN_FCC_915: FhssConfig = FhssConfig {
    domain: "FCC915",
    freq_start: 903_500_000,
    freq_stop: 926_900_000,
    freq_count: 40,
};

pub const DOMAIN_ISM_2G4: FhssConfig = FhssConfig {
    domain: "ISM2G4",
    freq_start: 2_400_400_000,
    freq_stop: 2_479_400_000,
    freq_count: 80,
};

/// One frequency band with its pseudo-random hop sequence.
///
/// The sequence is a concatenation of blocks; every block is a permutation of
/// all channels with the sync channel pinned to the block start, so every
/// channel occurs equally often and a receiver scanning the sync channel is
/// guaranteed a rendezvous once per block.
#[derive(Debug)]
pub struct FhssBand {
    config: FhssConfig,
    sequence: Vec<Channel, SEQUENCE_LEN>,
    sync_channel: Channel,
    /// Inter-channel spacing in Hz, scaled by `FREQ_SPREAD_SCALE`
    freq_spread: u64,
}

impl FhssBand {
    pub fn new(
        config: FhssConfig,
        sync_channel: Channel,
        rng: &mut impl RngCore,
    ) -> Result<Self, AjError> {
        if config.freq_count == 0
            || config.freq_count as usize > SEQUENCE_LEN
            || config.freq_stop <= config.freq_start
            || sync_channel as u16 >= config.freq_count
        {
            return Err(AjError::InvalidArgument);
        }

        let freq_spread = (config.freq_stop as u64 - config.freq_start as u64)
            * FREQ_SPREAD_SCALE
            / (config.freq_count as u64 - 1).max(1);

        let mut band = Self {
            config,
            sequence: Vec::new(),
            sync_channel,
            freq_spread,
        };
        band.rebuild(rng);
        Ok(band)
    }

    pub fn config(&self) -> &FhssConfig {
        &self.config
    }

    pub fn sync_channel(&self) -> Channel {
        self.sync_channel
    }

    /// Usable sequence length: the largest whole number of blocks.
    pub fn sequence_count(&self) -> u16 {
        let block = self.config.freq_count as usize;
        ((SEQUENCE_LEN / block) * block) as u16
    }

    /// Regenerate the hop sequence.
    ///
    /// Both link partners must call this with identically seeded generators;
    /// the sequence is a pure function of the RNG stream and the band.
    pub fn rebuild(&mut self, rng: &mut impl RngCore) {
        let block = self.config.freq_count as usize;
        let blocks = SEQUENCE_LEN / block;

        self.sequence.clear();
        for _ in 0..blocks {
            let base = self.sequence.len();
            for ch in 0..block {
                // Vec is sized for blocks * block entries, push cannot fail
                let _ = self.sequence.push(ch as Channel);
            }
            // pin the sync channel to the block start, then shuffle the rest
            let sync_pos = base + self.sync_channel as usize;
            self.sequence.swap(base, sync_pos);
            for i in (2..=block.saturating_sub(1)).rev() {
                let j = 1 + (rng.next_u32() as usize) % i;
                self.sequence.swap(base + i, base + j);
            }
        }
    }

    pub fn channel_at(&self, index: u16) -> Channel {
        self.sequence[(index % self.sequence_count()) as usize]
    }

    /// Index lands on the per-block rendezvous slot.
    pub fn is_sync_index(&self, index: u16) -> bool {
        (index % self.sequence_count()) % self.config.freq_count == 0
    }

    pub fn channel_frequency(&self, channel: Channel) -> u32 {
        (self.config.freq_start as u64 + self.freq_spread * channel as u64 / FREQ_SPREAD_SCALE)
            as u32
    }

    pub fn frequency(&self, index: u16) -> u32 {
        self.channel_frequency(self.channel_at(index))
    }

    /// Antipodal channel for the same sequence index, used by the second
    /// radio when both hop inside one band.
    pub fn gemini_frequency(&self, index: u16) -> u32 {
        let count = self.config.freq_count;
        let ch = (self.channel_at(index) as u16 + count / 2) % count;
        self.channel_frequency(ch as Channel)
    }

    /// Frequency the link starts on before the first hop.
    pub fn initial_frequency(&self) -> u32 {
        self.channel_frequency(self.sync_channel)
    }

    /// Nearest channel for a measured frequency.
    pub fn channel_for_frequency(&self, freq: u32) -> Channel {
        if freq <= self.config.freq_start {
            return 0;
        }
        let offset = (freq as u64 - self.config.freq_start as u64) * FREQ_SPREAD_SCALE;
        let ch = (offset + self.freq_spread / 2) / self.freq_spread;
        ch.min(self.config.freq_count as u64 - 1) as Channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn band(config: FhssConfig, seed: u64) -> FhssBand {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        FhssBand::new(config, 0, &mut rng).unwrap()
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let swapped = FhssConfig {
            freq_start: DOMAIN_EU_868.freq_stop,
            freq_stop: DOMAIN_EU_868.freq_start,
            ..DOMAIN_EU_868
        };
        assert_eq!(
            FhssBand::new(swapped, 0, &mut rng).unwrap_err(),
            AjError::InvalidArgument
        );
        assert_eq!(
            FhssBand::new(DOMAIN_EU_868, 13, &mut rng).unwrap_err(),
            AjError::InvalidArgument
        );
    }

    #[test]
    fn same_seed_gives_identical_sequences() {
        let a = band(DOMAIN_FCC_915, 42);
        let b = band(DOMAIN_FCC_915, 42);
        for i in 0..a.sequence_count() {
            assert_eq!(a.channel_at(i), b.channel_at(i));
        }

        let c = band(DOMAIN_FCC_915, 43);
        let differs = (0..a.sequence_count()).any(|i| a.channel_at(i) != c.channel_at(i));
        assert!(differs);
    }

    #[test]
    fn every_block_is_a_permutation_with_sync_at_start() {
        for config in [DOMAIN_EU_868, DOMAIN_FCC_915, DOMAIN_ISM_2G4] {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let band = FhssBand::new(config, 3, &mut rng).unwrap();
            let count = config.freq_count;

            for block_start in (0..band.sequence_count()).step_by(count as usize) {
                assert_eq!(band.channel_at(block_start), 3);
                assert!(band.is_sync_index(block_start));

                let mut seen = [false; SEQUENCE_LEN];
                for i in 0..count {
                    let ch = band.channel_at(block_start + i) as usize;
                    assert!(!seen[ch], "channel {} repeated in block", ch);
                    seen[ch] = true;
                }
            }
        }
    }

    #[test]
    fn sequence_count_is_whole_blocks() {
        let eu = band(DOMAIN_EU_868, 1);
        assert_eq!(eu.sequence_count(), (256 / 13) * 13);
        let ism = band(DOMAIN_ISM_2G4, 1);
        assert_eq!(ism.sequence_count(), 240);
    }

    #[test]
    fn frequencies_stay_inside_the_band() {
        let band = band(DOMAIN_ISM_2G4, 9);
        for i in 0..band.sequence_count() {
            let f = band.frequency(i);
            assert!(f >= DOMAIN_ISM_2G4.freq_start);
            assert!(f <= DOMAIN_ISM_2G4.freq_stop);
        }
        assert_eq!(band.channel_frequency(0), DOMAIN_ISM_2G4.freq_start);
    }

    #[test]
    fn frequency_channel_round_trip() {
        for config in [DOMAIN_EU_868, DOMAIN_FCC_915, DOMAIN_ISM_2G4] {
            let mut rng = ChaCha8Rng::seed_from_u64(5);
            let band = FhssBand::new(config, 0, &mut rng).unwrap();
            for ch in 0..config.freq_count {
                let f = band.channel_frequency(ch as Channel);
                assert_eq!(band.channel_for_frequency(f), ch as Channel);
            }
        }
    }

    #[test]
    fn gemini_is_half_band_away() {
        let band = band(DOMAIN_FCC_915, 3);
        for i in 0..band.sequence_count() {
            assert_ne!(band.gemini_frequency(i), band.frequency(i));
        }
    }
}
