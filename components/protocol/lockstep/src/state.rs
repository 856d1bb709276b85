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

/// Link jam assessment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JamState {
    #[default]
    NotJammed,
    Suspect,
    Jammed,
}

impl core::fmt::Display for JamState {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            JamState::NotJammed => "not_jammed",
            JamState::Suspect => "suspect",
            JamState::Jammed => "jammed",
        };
        write!(fmt, "{}", s)
    }
}

/// Window snapshot evaluated at a boundary.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WindowVerdict {
    pub(crate) jammy: bool,
    pub(crate) score: u8,
    pub(crate) count: u16,
}

/// Debounced three-state jam detector.
///
/// Advanced only at window boundaries, never mid-window. Entering JAMMED
/// requires `consecutive_windows_to_jam` jammy windows in a row; leaving it
/// requires the hold time to have elapsed, and dropping from SUSPECT back to
/// NOT_JAMMED requires the window to be clearly below half the entry
/// threshold so the state does not flap.
#[derive(Debug, Default)]
pub(crate) struct JamDetector {
    pub(crate) state: JamState,
    /// Consecutive jammy windows, saturates at 255
    pub(crate) jam_streak: u8,
    pub(crate) last_change_ms: TimeMs,
}

impl JamDetector {
    /// Process one window boundary. Returns true when the state changed.
    pub(crate) fn advance(&mut self, verdict: WindowVerdict, cfg: &AjConfig, now: TimeMs) -> bool {
        if verdict.jammy {
            self.jam_streak = self.jam_streak.saturating_add(1);
            if self.jam_streak >= cfg.consecutive_windows_to_jam {
                if self.state != JamState::Jammed {
                    self.state = JamState::Jammed;
                    self.last_change_ms = now;
                    return true;
                }
            } else if self.state == JamState::NotJammed {
                self.state = JamState::Suspect;
                self.last_change_ms = now;
                return true;
            }
            return false;
        }

        self.jam_streak = 0;
        match self.state {
            JamState::Jammed => {
                if now.wrapping_sub(self.last_change_ms) >= cfg.jam_state_hold_time_ms {
                    self.state = JamState::Suspect;
                    self.last_change_ms = now;
                    return true;
                }
            }
            JamState::Suspect => {
                if verdict.count == 0 || verdict.score < cfg.jam_threshold_percent / 2 {
                    self.state = JamState::NotJammed;
                    self.last_change_ms = now;
                    return true;
                }
            }
            JamState::NotJammed => {}
        }
        false
    }

    pub(crate) fn reset(&mut self, now: TimeMs) {
        self.state = JamState::NotJammed;
        self.jam_streak = 0;
        self.last_change_ms = now;
    }
}
