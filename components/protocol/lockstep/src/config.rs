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

use serde::{Deserialize, Serialize};

use crate::*;

/// How the sliding window is bounded.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowMode {
    /// Window ends after `window_size_packets` packets
    #[default]
    ByCount,
    /// Window ends after `window_duration_ms` milliseconds
    ByTime,
}

/// Anti-jam engine configuration.
///
/// Immutable per epoch; replaced only through an explicit reconfigure.
/// Out-of-range values are clamped to safe defaults rather than rejected,
/// refusing to run is worse than running with a sane default in a control
/// loop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AjConfig {
    pub window_mode: WindowMode,
    /// Packets per window, >= 1 (also the ring capacity in ByTime mode)
    pub window_size_packets: u16,
    /// Window length in ms, >= 1, used only in ByTime mode
    pub window_duration_ms: u32,
    /// Bad-packet percentage at which a window counts as jammy, 1..=100
    pub jam_threshold_percent: u8,
    /// Minimum bad packets before a window can count as jammy
    pub min_bad_packets: u16,
    /// Consecutive jammy windows required to enter JAMMED, >= 1
    pub consecutive_windows_to_jam: u8,
    /// Dwell time in JAMMED before a clean window may soften the state
    pub jam_state_hold_time_ms: u32,
    /// Minimum spacing between two dispatched hop suggestions, >= 1
    pub min_time_between_reco_ms: u32,
    /// Allow suggesting a band/group switch alongside a hop
    pub allow_group_switch_suggestions: bool,
}

const DEFAULT_WINDOW_DURATION_MS: u32 = 1000;
const DEFAULT_MIN_TIME_BETWEEN_RECO_MS: u32 = 500;

impl Default for AjConfig {
    fn default() -> Self {
        Self {
            window_mode: WindowMode::ByCount,
            window_size_packets: 100,
            window_duration_ms: DEFAULT_WINDOW_DURATION_MS,
            jam_threshold_percent: 30,
            min_bad_packets: 5,
            consecutive_windows_to_jam: 2,
            jam_state_hold_time_ms: 2000,
            min_time_between_reco_ms: DEFAULT_MIN_TIME_BETWEEN_RECO_MS,
            allow_group_switch_suggestions: false,
        }
    }
}

impl AjConfig {
    /// Clamp obviously-bad values to safe minima.
    pub(crate) fn sanitized(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.window_size_packets == 0 {
            warn!("window_size_packets 0 coerced to 1");
            cfg.window_size_packets = 1;
        }
        if cfg.window_mode == WindowMode::ByTime && cfg.window_duration_ms == 0 {
            warn!("window_duration_ms 0 coerced to {}", DEFAULT_WINDOW_DURATION_MS);
            cfg.window_duration_ms = DEFAULT_WINDOW_DURATION_MS;
        }
        if cfg.min_time_between_reco_ms == 0 {
            cfg.min_time_between_reco_ms = DEFAULT_MIN_TIME_BETWEEN_RECO_MS;
        }
        if cfg.consecutive_windows_to_jam == 0 {
            cfg.consecutive_windows_to_jam = 1;
        }
        cfg.jam_threshold_percent = cfg.jam_threshold_percent.clamp(1, 100);
        cfg
    }

    /// Effective window duration, never zero.
    pub(crate) fn window_duration(&self) -> TimeMs {
        self.window_duration_ms.max(1)
    }
}
