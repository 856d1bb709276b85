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

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::RngCore;

use antijam_api::DomainSwitchHook;
use lockstep::{AjConfig, FhssConfig, JamState, LinkSession, RadioId, TimeMs, WindowMode};

/// One packet every 20 ms, 50 packets per second
pub const PACKET_INTERVAL_MS: TimeMs = 20;
/// Ring storage of the simulated sessions
pub const SIM_RING: usize = 64;

/// Stationary narrowband (or wideband) jammer.
#[derive(Debug, Clone, Copy)]
pub struct Jammer {
    pub center_hz: u32,
    pub half_width_hz: u32,
    pub active_from_ms: TimeMs,
    pub active_until_ms: TimeMs,
}

impl Jammer {
    pub fn silent() -> Self {
        Self {
            center_hz: 0,
            half_width_hz: 0,
            active_from_ms: 0,
            active_until_ms: 0,
        }
    }

    /// Covers the whole band for its active window.
    pub fn wideband(band: &FhssConfig, active_from_ms: TimeMs, active_until_ms: TimeMs) -> Self {
        Self {
            center_hz: band.freq_center(),
            half_width_hz: (band.freq_stop - band.freq_start) / 2 + 1,
            active_from_ms,
            active_until_ms,
        }
    }

    pub fn hits(&self, freq: u32, now: TimeMs) -> bool {
        if now < self.active_from_ms || now >= self.active_until_ms {
            return false;
        }
        freq.abs_diff(self.center_hz) <= self.half_width_hz
    }
}

/// Counts how often the core reported a sustained bad-packet run.
#[derive(Debug, Default)]
pub struct AlertCounter {
    pub alerts: u32,
}

impl DomainSwitchHook<TimeMs> for AlertCounter {
    fn on_bad_packet_run(&mut self, consecutive_bad: u8, now: TimeMs) {
        warn!("{} consecutive bad packets at {} ms", consecutive_bad, now);
        self.alerts += 1;
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SimOutcome {
    pub packets: u32,
    pub bad_packets: u32,
    pub hops: u32,
    pub domain_alerts: u32,
    pub final_state: JamState,
    /// Both radios read back the same frequencies for every hop cycle
    pub lock_step: bool,
}

/// Detection tuning used by all simulated links.
pub fn sim_aj_config(allow_group_switch: bool) -> AjConfig {
    AjConfig {
        window_mode: WindowMode::ByCount,
        window_size_packets: 20,
        jam_threshold_percent: 30,
        min_bad_packets: 3,
        consecutive_windows_to_jam: 2,
        jam_state_hold_time_ms: 2000,
        min_time_between_reco_ms: 200,
        allow_group_switch_suggestions: allow_group_switch,
        ..AjConfig::default()
    }
}

/// Drive one link against a jammer for `minutes` of simulated time.
///
/// Packets are carried on the first radio's frequency; the second radio is
/// tracked to verify both stay in lock-step. A packet is corrupted when the
/// jammer covers the carrier or the random error rate strikes.
pub fn run(
    session: &mut LinkSession<SIM_RING>,
    minutes: usize,
    per_ppt: u32,
    jammer: &Jammer,
    rng: &mut impl RngCore,
) -> SimOutcome {
    let mut alert_counter = AlertCounter::default();

    let mut f1 = session.initial_frequency(RadioId::Radio1);
    let mut f2 = session.initial_frequency(RadioId::Radio2);
    info!("link starts on {} Hz / {} Hz", f1, f2);

    let mut packets = 0;
    let mut bad_packets = 0;
    let mut hops = 0;
    let mut lock_step = true;

    let end = minutes as TimeMs * 60_000;
    let mut time: TimeMs = 0;
    while time < end {
        time += PACKET_INTERVAL_MS;

        let jammed = jammer.hits(f1, time);
        let noise = per_ppt > 0 && rng.next_u32() % 1000 < per_ppt;
        let good = !jammed && !noise;
        packets += 1;
        if !good {
            bad_packets += 1;
        }

        if let Some((new_f1, new_f2)) = session.register_packet(good, time, Some(&mut alert_counter))
        {
            hops += 1;
            // the cycle is spent: both radios must read back the same pair
            if session.hop_next_synced(RadioId::Radio1) != new_f1
                || session.hop_next_synced(RadioId::Radio2) != new_f2
            {
                lock_step = false;
            }
            info!(
                "{} ms: hop to {} Hz / {} Hz (index {})",
                time,
                new_f1,
                new_f2,
                session.synced_index()
            );
            f1 = new_f1;
            f2 = new_f2;
        }

        session.service_tick(time);
    }

    SimOutcome {
        packets,
        bad_packets,
        hops,
        domain_alerts: alert_counter.alerts,
        final_state: session.report().state,
        lock_step,
    }
}
