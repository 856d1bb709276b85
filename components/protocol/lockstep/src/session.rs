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

use antijam_api::{AjError, DomainSwitchHook, HopSink, JamMonitor, Outcome};
use rand_core::RngCore;

use crate::*;

/// Consecutive bad packets before the domain switch hook is consulted
pub const DOMAIN_SWITCH_THRESHOLD: u8 = 16;
/// Minimum gap between two domain switch notifications
pub const DOMAIN_SWITCH_COOLDOWN_MS: TimeMs = 500;

/// One frequency-hopping link: detection engine, hop sequences for up to two
/// bands and the gate that keeps both radios on the same sequence index.
///
/// All mutating calls run on the link's task; the gate alone is shared with
/// interrupt context.
#[derive(Debug)]
pub struct LinkSession<const N: usize> {
    primary: FhssBand,
    secondary: Option<FhssBand>,
    /// False only after a group switch on a dual-band session
    use_primary_band: bool,
    gate: HopCycleGate,
    engine: AntiJam<N>,
    enabled: bool,
    consecutive_bad_packets: u8,
    last_domain_notify_ms: TimeMs,
}

impl<const N: usize> LinkSession<N> {
    pub fn new(
        primary: FhssConfig,
        secondary: Option<FhssConfig>,
        sync_channel: Channel,
        cfg: &AjConfig,
        rng: &mut impl RngCore,
    ) -> Result<Self, AjError> {
        let primary = FhssBand::new(primary, sync_channel, rng)?;
        let secondary = match secondary {
            Some(config) => Some(FhssBand::new(config, sync_channel, rng)?),
            None => None,
        };
        Ok(Self {
            primary,
            secondary,
            use_primary_band: true,
            gate: HopCycleGate::new(),
            engine: AntiJam::new(cfg)?,
            enabled: true,
            consecutive_bad_packets: 0,
            last_domain_notify_ms: 0,
        })
    }

    /// Enable or disable automatic hopping. Re-enabling resets the detection
    /// engine so stale window contents cannot trigger an immediate hop.
    pub fn set_enabled(&mut self, enabled: bool, now: TimeMs) -> Outcome {
        if enabled == self.enabled {
            return Outcome::NoChange;
        }
        self.enabled = enabled;
        if enabled {
            self.engine.reset(now);
        }
        info!("hopping {}", if enabled { "enabled" } else { "disabled" });
        Outcome::Changed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Band the first radio currently hops in.
    pub fn active_band(&self) -> &FhssBand {
        match (&self.secondary, self.use_primary_band) {
            (Some(secondary), false) => secondary,
            _ => &self.primary,
        }
    }

    /// Band the second radio hops in, when two bands are configured.
    fn companion_band(&self) -> Option<&FhssBand> {
        match (&self.secondary, self.use_primary_band) {
            (Some(secondary), true) => Some(secondary),
            (Some(_), false) => Some(&self.primary),
            (None, _) => None,
        }
    }

    /// Usable sequence length. With two bands both must stay in lock-step,
    /// so the shorter whole-block length wins.
    pub fn sequence_count(&self) -> u16 {
        match &self.secondary {
            Some(secondary) => self.primary.sequence_count().min(secondary.sequence_count()),
            None => self.primary.sequence_count(),
        }
    }

    /// Arm the gate for the next hop cycle. Call once per cycle, before the
    /// radios ask for their next frequency.
    pub fn begin_hop_cycle(&self) {
        self.gate.begin_hop_cycle();
    }

    /// Next frequency for one radio. The first caller of an armed cycle
    /// advances the shared index; both radios get frequencies derived from
    /// the same index whichever order their interrupts fire in.
    pub fn hop_next_synced(&self, radio: RadioId) -> u32 {
        let index = self.gate.hop_next_synced(self.sequence_count());
        match radio {
            RadioId::Radio1 => self.active_band().frequency(index),
            RadioId::Radio2 => self.gemini_frequency(index),
        }
    }

    /// Second radio's frequency for a sequence index: the companion band's
    /// slot when dual-band, the antipodal channel otherwise.
    pub fn gemini_frequency(&self, index: u16) -> u32 {
        match self.companion_band() {
            Some(band) => band.frequency(index),
            None => self.active_band().gemini_frequency(index),
        }
    }

    pub fn initial_frequency(&self, radio: RadioId) -> u32 {
        match radio {
            RadioId::Radio1 => self.active_band().initial_frequency(),
            RadioId::Radio2 => self.gemini_frequency(0),
        }
    }

    pub fn on_sync_channel(&self) -> bool {
        self.active_band().is_sync_index(self.gate.synced_index())
    }

    /// Adopt an index learned from the link partner.
    pub fn set_current_index(&self, index: u16) {
        self.gate.set_index(index % self.sequence_count());
    }

    pub fn synced_index(&self) -> u16 {
        self.gate.synced_index()
    }

    pub fn hop_epoch(&self) -> u32 {
        self.gate.epoch()
    }

    /// Rebuild all hop sequences and restart from index zero. Both link
    /// partners must do this with identically seeded generators.
    pub fn regenerate_sequences(&mut self, rng: &mut impl RngCore) {
        self.primary.rebuild(rng);
        if let Some(secondary) = &mut self.secondary {
            secondary.rebuild(rng);
        }
        self.gate.set_index(0);
        info!("hop sequences regenerated");
    }

    /// Feed one packet outcome. Returns the new frequency pair when the
    /// engine's suggestion was executed this call.
    pub fn register_packet(
        &mut self,
        good: bool,
        now: TimeMs,
        mut domain_hook: Option<&mut dyn DomainSwitchHook<TimeMs>>,
    ) -> Option<(u32, u32)> {
        let mut pending: Option<HopSuggestion> = None;
        {
            let mut sink = |suggestion: &HopSuggestion| pending = Some(suggestion.clone());
            self.engine
                .register_packet(good, now, Some(&mut sink as &mut dyn HopSink<HopSuggestion>));
        }

        if good {
            self.consecutive_bad_packets = 0;
        } else {
            self.consecutive_bad_packets = self.consecutive_bad_packets.saturating_add(1);
            if self.consecutive_bad_packets >= DOMAIN_SWITCH_THRESHOLD
                && now.wrapping_sub(self.last_domain_notify_ms) >= DOMAIN_SWITCH_COOLDOWN_MS
            {
                if let Some(hook) = domain_hook.as_deref_mut() {
                    hook.on_bad_packet_run(self.consecutive_bad_packets, now);
                    self.last_domain_notify_ms = now;
                }
            }
        }

        pending.and_then(|suggestion| self.execute_hop(&suggestion))
    }

    /// Feed an out-of-band jam indication, e.g. an energy-detect flag from
    /// the radio.
    pub fn register_external_jam(&mut self, now: TimeMs) -> Option<(u32, u32)> {
        let mut pending: Option<HopSuggestion> = None;
        {
            let mut sink = |suggestion: &HopSuggestion| pending = Some(suggestion.clone());
            self.engine
                .register_external_jam(now, Some(&mut sink as &mut dyn HopSink<HopSuggestion>));
        }
        pending.and_then(|suggestion| self.execute_hop(&suggestion))
    }

    /// Periodic housekeeping: window boundaries in time mode, flag aging.
    /// Never hops.
    pub fn service_tick(&mut self, now: TimeMs) {
        self.engine.tick(now);
    }

    /// Hop both radios immediately, bypassing the engine.
    pub fn force_synced_hop(&self) -> Result<(u32, u32), AjError> {
        if !self.enabled {
            return Err(AjError::Denied);
        }
        self.gate.begin_hop_cycle();
        let f1 = self.hop_next_synced(RadioId::Radio1);
        let f2 = self.hop_next_synced(RadioId::Radio2);
        Ok((f1, f2))
    }

    fn execute_hop(&mut self, suggestion: &HopSuggestion) -> Option<(u32, u32)> {
        if !self.enabled {
            // the engine already committed its pacing; just don't move
            warn!("hop suggestion dropped, hopping disabled");
            return None;
        }
        if suggestion.suggest_group_switch && self.secondary.is_some() {
            self.use_primary_band = !self.use_primary_band;
            info!("group switch to {}", self.active_band().config().domain);
        }
        self.gate.begin_hop_cycle();
        let f1 = self.hop_next_synced(RadioId::Radio1);
        let f2 = self.hop_next_synced(RadioId::Radio2);
        Some((f1, f2))
    }

    pub fn configure_engine(&mut self, cfg: &AjConfig) -> Result<(), AjError> {
        self.engine.configure(cfg)
    }

    pub fn report(&self) -> AjReport {
        self.engine.report()
    }

    pub fn is_jammed(&self) -> bool {
        self.engine.is_jammed()
    }

    pub fn evaluate_hop(&self) -> HopSuggestion {
        self.engine.evaluate_hop()
    }
}
