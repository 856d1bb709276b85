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

#![cfg_attr(not(test), no_std)]

mod config;
mod engine;
mod event_log;
mod report;
mod sequence;
mod session;
mod state;
mod sync;
mod window;

pub use antijam_api::{AjError, DomainSwitchHook, HopSink, JamMonitor, Outcome};

pub use crate::{
    config::{AjConfig, WindowMode},
    engine::AntiJam,
    report::{AjReport, HopSuggestion},
    sequence::{
        FhssBand, FhssConfig, DOMAIN_EU_868, DOMAIN_FCC_915, DOMAIN_ISM_2G4, FREQ_SPREAD_SCALE,
        SEQUENCE_LEN,
    },
    session::{LinkSession, DOMAIN_SWITCH_COOLDOWN_MS, DOMAIN_SWITCH_THRESHOLD},
    state::JamState,
    sync::HopCycleGate,
};

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
use log::{debug, error, info, warn};

/// Time as milliseconds since start, wraps like a hardware millisecond tick
pub type TimeMs = u32;
/// Channel index within a regulatory band
pub type Channel = u8;

/// The two cooperating radio front-ends of the link.
///
/// Band assignment (primary vs. Gemini/secondary) follows from the session's
/// band configuration, not from the ID itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioId {
    Radio1,
    Radio2,
}

/// Wraps defmt::write and returns Ok() to make it behave like core::write!.
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! defmt_write_wrapper {
    ($($arg:expr),*) => {{
        defmt::write!($($arg),*);
        Ok(())
    }};
}
