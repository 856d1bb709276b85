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

/// Snapshot of the engine's assessment.
///
/// Recomputed on every mutation; never the source of truth. The window and
/// the state machine fields are.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AjReport {
    pub state: JamState,
    /// Bad-packet percentage plus external-jam bonus, 0..=100
    pub score: u8,
    /// Evidence volume plus margin above threshold, 0..=100
    pub confidence: u8,
    /// Whether the pacing window is currently open and the state warrants a hop
    pub recommend_hop: bool,
    /// Linear rescale of the score to 0..=255
    pub hop_aggressiveness_hint: u8,
    /// When this report was computed
    pub when: TimeMs,
}

impl AjReport {
    pub(crate) fn baseline(when: TimeMs) -> Self {
        Self {
            state: JamState::NotJammed,
            score: 0,
            confidence: 0,
            recommend_hop: false,
            hop_aggressiveness_hint: 0,
            when,
        }
    }
}

/// Hop suggestion delivered to the notification sink.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HopSuggestion {
    pub recommend: bool,
    /// 0..=100
    pub confidence: u8,
    /// Also switch the frequency band/group, only when the config allows it
    pub suggest_group_switch: bool,
    /// 0..=255 (0 = gentle)
    pub hop_aggressiveness_hint: u8,
    /// Only meaningful when `has_preferred_slot` is set; this core never sets it
    pub preferred_slot_index: u32,
    pub has_preferred_slot: bool,
}

/// report as JSON to make it parseable
macro_rules! report_to_json_string {
    ($fmt:expr,$write:tt,$report:expr) => {
        $write!(
            $fmt,
            "{{\"state\":\"{}\",\"score\":{},\"confidence\":{},\"recommend_hop\":{},\"hint\":{},\"when\":{}}}",
            $report.state,
            $report.score,
            $report.confidence,
            $report.recommend_hop,
            $report.hop_aggressiveness_hint,
            $report.when
        )
    };
}

/// suggestion as JSON to make it parseable
macro_rules! suggestion_to_json_string {
    ($fmt:expr,$write:tt,$sugg:expr) => {
        $write!(
            $fmt,
            "{{\"recommend\":{},\"confidence\":{},\"group_switch\":{},\"hint\":{}}}",
            $sugg.recommend,
            $sugg.confidence,
            $sugg.suggest_group_switch,
            $sugg.hop_aggressiveness_hint
        )
    };
}

impl core::fmt::Display for AjReport {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        report_to_json_string!(fmt, write, self)
    }
}

impl core::fmt::Display for HopSuggestion {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        suggestion_to_json_string!(fmt, write, self)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AjReport {
    fn format(&self, fmt: defmt::Formatter) {
        fn wrapper(report: &AjReport, fmt: defmt::Formatter) -> core::fmt::Result {
            report_to_json_string!(fmt, defmt_write_wrapper, report)
        }
        let _ = wrapper(self, fmt);
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HopSuggestion {
    fn format(&self, fmt: defmt::Formatter) {
        fn wrapper(sugg: &HopSuggestion, fmt: defmt::Formatter) -> core::fmt::Result {
            suggestion_to_json_string!(fmt, defmt_write_wrapper, sugg)
        }
        let _ = wrapper(self, fmt);
    }
}
