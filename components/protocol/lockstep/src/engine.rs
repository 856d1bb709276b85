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

use antijam_api::{AjError, HopSink, JamMonitor};

use crate::state::{JamDetector, WindowVerdict};
use crate::window::PacketRing;
use crate::*;

/// Additive score bonus while the external-jam flag is set
const EXT_JAM_SCORE_BONUS: u8 = 10;
/// External-jam flag lifetime for count-based windows
const EXT_JAM_AGE_DEFAULT_MS: TimeMs = 1000;
/// Score at which a group switch is suggested alongside the hop
const GROUP_SWITCH_SCORE: u8 = 80;
/// Margin above the jam threshold required to recommend from SUSPECT
const SUSPECT_RECOMMEND_MARGIN: u8 = 10;

/// Sliding-window jam detection engine.
///
/// `N` bounds the packet ring at compile time; the configured window size
/// must fit or construction fails. One instance is driven serially by a
/// single logical caller; it needs no internal locking.
#[derive(Debug)]
pub struct AntiJam<const N: usize> {
    cfg: AjConfig,
    ring: PacketRing<N>,
    /// Start of the current time window (ByTime mode)
    window_start_ms: TimeMs,
    /// Last notion of "now" seen on any entry point
    last_now_ms: TimeMs,
    detector: JamDetector,
    /// Sticky external jam signal, aged out by `tick`
    ext_jam_recent: bool,
    ext_jam_since_ms: TimeMs,
    /// Committed only when a suggestion is dispatched to a sink
    last_reco_ms: TimeMs,
    last_report: AjReport,
}

impl<const N: usize> AntiJam<N> {
    pub fn new(cfg: &AjConfig) -> Result<Self, AjError> {
        let cfg = cfg.sanitized();
        let ring = PacketRing::new(cfg.window_size_packets)?;
        Ok(Self {
            cfg,
            ring,
            window_start_ms: 0,
            last_now_ms: 0,
            detector: JamDetector::default(),
            ext_jam_recent: false,
            ext_jam_since_ms: 0,
            last_reco_ms: 0,
            last_report: AjReport::baseline(0),
        })
    }

    /// Exact byte size of an instance, for static allocation budgets.
    pub const fn size_bytes() -> usize {
        core::mem::size_of::<Self>()
    }

    /// Ring slots a configuration needs; must be `<= N` for `new` to succeed.
    pub const fn required_capacity(cfg: &AjConfig) -> usize {
        if cfg.window_size_packets == 0 {
            1
        } else {
            cfg.window_size_packets as usize
        }
    }

    pub fn config(&self) -> &AjConfig {
        &self.cfg
    }

    /// Replace the configuration.
    ///
    /// A capacity change clears the ring. The jam state survives but the
    /// streak restarts so the new thresholds are debounced from scratch.
    pub fn configure(&mut self, cfg: &AjConfig) -> Result<(), AjError> {
        let cfg = cfg.sanitized();
        self.ring.set_capacity(cfg.window_size_packets)?;
        self.cfg = cfg;
        self.window_start_ms = self.last_now_ms;
        self.detector.jam_streak = 0;
        Ok(())
    }

    fn prune(&mut self, now: TimeMs) {
        if self.cfg.window_mode != WindowMode::ByTime {
            return;
        }
        let dur = self.cfg.window_duration();
        let cutoff = if now > dur { now - dur } else { 0 };
        self.ring.prune_older_than(cutoff);
    }

    /// The single authoritative score every downstream decision uses.
    fn score(&self) -> u8 {
        let total = self.ring.count();
        if total == 0 {
            return 0;
        }
        let mut pct = (self.ring.bad_count() as u32 * 100 / total as u32) as u8;
        if self.ext_jam_recent {
            pct = (pct + EXT_JAM_SCORE_BONUS).min(100);
        }
        pct
    }

    fn verdict(&self) -> WindowVerdict {
        let score = self.score();
        let jammy = self.ring.bad_count() >= self.cfg.min_bad_packets
            && score >= self.cfg.jam_threshold_percent;
        WindowVerdict {
            jammy,
            score,
            count: self.ring.count(),
        }
    }

    fn on_window_boundary(&mut self, now: TimeMs) {
        let verdict = self.verdict();
        if self.detector.advance(verdict, &self.cfg, now) {
            event_log_state!(now, self.detector.state, verdict.score);
        }
    }

    fn suspect_recommend_score(&self) -> u8 {
        (self.cfg.jam_threshold_percent as u32 + SUSPECT_RECOMMEND_MARGIN as u32).min(100) as u8
    }

    fn refresh_report(&mut self, now: TimeMs) {
        let score = self.score();
        let total = self.ring.count();

        let confidence = if total == 0 {
            0
        } else {
            let over = score.saturating_sub(self.cfg.jam_threshold_percent) as u32;
            let base = (total as u32).min(100);
            (base / 2 + over).min(100) as u8
        };

        let hint = (score as u32 * 255 / 100) as u8;

        // recommend only while the pacing window is open
        let pacing_open =
            now.wrapping_sub(self.last_reco_ms) >= self.cfg.min_time_between_reco_ms;
        let recommend_hop = pacing_open
            && match self.detector.state {
                JamState::Jammed => true,
                JamState::Suspect => score >= self.suspect_recommend_score(),
                JamState::NotJammed => false,
            };

        self.last_report = AjReport {
            state: self.detector.state,
            score,
            confidence,
            recommend_hop,
            hop_aggressiveness_hint: hint,
            when: now,
        };
    }

    fn build_suggestion(&self, recommend: bool) -> HopSuggestion {
        HopSuggestion {
            recommend,
            confidence: self.last_report.confidence,
            suggest_group_switch: self.cfg.allow_group_switch_suggestions
                && (self.last_report.score >= GROUP_SWITCH_SCORE || self.ext_jam_recent),
            hop_aggressiveness_hint: self.last_report.hop_aggressiveness_hint,
            preferred_slot_index: 0,
            has_preferred_slot: false,
        }
    }

    /// Deliver a suggestion when the fresh report recommends one.
    ///
    /// This is the only place `last_reco_ms` is committed: the pacing window
    /// closes only when something actually consumed the recommendation.
    fn dispatch(&mut self, now: TimeMs, sink: Option<&mut dyn HopSink<HopSuggestion>>) {
        let Some(sink) = sink else {
            return;
        };
        if !self.last_report.recommend_hop {
            return;
        }
        let suggestion = self.build_suggestion(true);
        self.last_reco_ms = now;
        event_log_hop!(now, suggestion);
        sink.on_hop_suggested(&suggestion);
    }

    fn age_external_jam(&mut self, now: TimeMs) {
        if !self.ext_jam_recent {
            return;
        }
        let limit = match self.cfg.window_mode {
            WindowMode::ByTime => self.cfg.window_duration(),
            WindowMode::ByCount => EXT_JAM_AGE_DEFAULT_MS,
        };
        if now.wrapping_sub(self.ext_jam_since_ms) >= limit {
            self.ext_jam_recent = false;
        }
    }
}

impl<const N: usize> JamMonitor for AntiJam<N> {
    type TimeMs = TimeMs;
    type Report = AjReport;
    type Suggestion = HopSuggestion;

    fn register_packet(
        &mut self,
        good: bool,
        now: TimeMs,
        sink: Option<&mut dyn HopSink<HopSuggestion>>,
    ) {
        self.last_now_ms = now;
        self.prune(now);

        let wrapped = self.ring.push(good, now);
        if self.cfg.window_mode == WindowMode::ByCount && wrapped {
            self.on_window_boundary(now);
        }

        self.refresh_report(now);
        self.dispatch(now, sink);
    }

    fn register_external_jam(&mut self, now: TimeMs, sink: Option<&mut dyn HopSink<HopSuggestion>>) {
        self.last_now_ms = now;
        self.ext_jam_recent = true;
        self.ext_jam_since_ms = now;

        // no packet entry is inserted, but the same prune + recompute path runs
        self.prune(now);
        self.refresh_report(now);
        self.dispatch(now, sink);
    }

    fn tick(&mut self, now: TimeMs) {
        self.last_now_ms = now;

        if self.cfg.window_mode == WindowMode::ByTime {
            self.prune(now);

            let dur = self.cfg.window_duration();
            let elapsed = now.wrapping_sub(self.window_start_ms);
            if elapsed >= dur {
                // several windows may have elapsed; advance past all of them
                // but evaluate a single boundary
                let steps = elapsed / dur;
                self.window_start_ms = self.window_start_ms.wrapping_add(steps * dur);
                self.on_window_boundary(now);
            }
        }

        self.age_external_jam(now);

        // report refresh only; a bare tick never dispatches
        self.refresh_report(now);
    }

    fn report(&self) -> AjReport {
        self.last_report.clone()
    }

    fn is_jammed(&self) -> bool {
        self.detector.state == JamState::Jammed
    }

    /// Recompute the suggestion from the cached report.
    ///
    /// Deliberately ignores pacing and leaves `last_reco_ms` untouched so
    /// callers can inspect the engine without affecting the dispatch path.
    fn evaluate_hop(&self) -> HopSuggestion {
        let recommend = match self.detector.state {
            JamState::Jammed => true,
            JamState::Suspect => self.last_report.score >= self.suspect_recommend_score(),
            JamState::NotJammed => false,
        };
        self.build_suggestion(recommend)
    }

    fn reset(&mut self, now: TimeMs) {
        self.ring.clear();
        self.window_start_ms = now;
        self.last_now_ms = now;
        self.detector.reset(now);
        self.ext_jam_recent = false;
        self.ext_jam_since_ms = 0;
        self.last_reco_ms = 0;
        self.last_report = AjReport::baseline(now);
        event_log_reset!(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 64;

    fn by_count_cfg() -> AjConfig {
        AjConfig {
            window_mode: WindowMode::ByCount,
            window_size_packets: 10,
            jam_threshold_percent: 30,
            min_bad_packets: 3,
            consecutive_windows_to_jam: 2,
            ..AjConfig::default()
        }
    }

    fn by_time_cfg() -> AjConfig {
        AjConfig {
            window_mode: WindowMode::ByTime,
            window_size_packets: 32,
            window_duration_ms: 1000,
            jam_threshold_percent: 30,
            min_bad_packets: 1,
            consecutive_windows_to_jam: 2,
            ..AjConfig::default()
        }
    }

    /// Feed one window of `total` packets with `bad` bad ones.
    fn feed_window<const N: usize>(aj: &mut AntiJam<N>, total: u16, bad: u16, t0: TimeMs) {
        for i in 0..total {
            aj.register_packet(i >= bad, t0 + i as TimeMs, None);
        }
    }

    #[test]
    fn construction_fails_when_window_exceeds_storage() {
        let cfg = AjConfig {
            window_size_packets: 100,
            ..AjConfig::default()
        };
        assert_eq!(AntiJam::<16>::new(&cfg).unwrap_err(), AjError::InsufficientBuffer);
        assert_eq!(AntiJam::<16>::required_capacity(&cfg), 100);
        assert!(AntiJam::<128>::new(&cfg).is_ok());
    }

    #[test]
    fn by_count_debounce_scenario() {
        let mut aj = AntiJam::<CAP>::new(&by_count_cfg()).unwrap();

        // 10 packets, 4 bad: 40% >= 30% and 4 >= 3, first jammy window
        feed_window(&mut aj, 10, 4, 0);
        assert_eq!(aj.report().state, JamState::Suspect);
        assert!(!aj.is_jammed());

        // second jammy window reaches the streak requirement
        feed_window(&mut aj, 10, 4, 100);
        assert_eq!(aj.report().state, JamState::Jammed);
        assert!(aj.is_jammed());
    }

    #[test]
    fn clean_windows_never_trigger() {
        let mut aj = AntiJam::<CAP>::new(&by_count_cfg()).unwrap();
        for w in 0..5 {
            feed_window(&mut aj, 10, 2, w * 100); // 20% < 30%
        }
        assert_eq!(aj.report().state, JamState::NotJammed);
    }

    #[test]
    fn score_is_zero_for_empty_window_even_with_external_jam() {
        let mut aj = AntiJam::<CAP>::new(&by_time_cfg()).unwrap();
        aj.register_external_jam(0, None);
        assert_eq!(aj.report().score, 0);
        assert_eq!(aj.report().confidence, 0);
    }

    #[test]
    fn external_jam_bonus_and_aging() {
        let mut aj = AntiJam::<CAP>::new(&by_time_cfg()).unwrap();
        aj.register_packet(true, 0, None);
        aj.register_external_jam(0, None);

        aj.tick(999);
        assert_eq!(aj.report().score, EXT_JAM_SCORE_BONUS);

        // one window duration later the flag ages out
        aj.tick(1001);
        assert_eq!(aj.report().score, 0);
    }

    #[test]
    fn by_time_boundary_is_coalesced() {
        let mut aj = AntiJam::<CAP>::new(&by_time_cfg()).unwrap();

        // three windows elapse unobserved; the late tick evaluates a single
        // boundary, so the streak is 1 and not 3
        aj.register_packet(false, 3400, None);
        aj.tick(3500);
        assert_eq!(aj.report().state, JamState::Suspect);

        // a second observed boundary completes the streak
        aj.register_packet(false, 4400, None);
        aj.tick(4500);
        assert_eq!(aj.report().state, JamState::Jammed);
    }

    #[test]
    fn pacing_commits_only_on_dispatch() {
        let cfg = AjConfig {
            window_mode: WindowMode::ByCount,
            window_size_packets: 1,
            jam_threshold_percent: 1,
            min_bad_packets: 1,
            consecutive_windows_to_jam: 1,
            min_time_between_reco_ms: 500,
            ..AjConfig::default()
        };
        let mut aj = AntiJam::<CAP>::new(&cfg).unwrap();

        let mut dispatched: Vec<TimeMs> = Vec::new();
        for t in (0..2000).step_by(100) {
            let mut sink = |_: &HopSuggestion| dispatched.push(t);
            aj.register_packet(false, t, Some(&mut sink));
        }

        assert!(!dispatched.is_empty());
        for pair in dispatched.windows(2) {
            assert!(pair[1] - pair[0] >= 500, "dispatches too close: {:?}", dispatched);
        }
    }

    #[test]
    fn no_sink_means_no_pacing_commit() {
        let cfg = AjConfig {
            window_mode: WindowMode::ByCount,
            window_size_packets: 1,
            jam_threshold_percent: 1,
            min_bad_packets: 1,
            consecutive_windows_to_jam: 1,
            min_time_between_reco_ms: 500,
            ..AjConfig::default()
        };
        let mut aj = AntiJam::<CAP>::new(&cfg).unwrap();

        // recommendation computed repeatedly without a sink
        for t in (500..1000).step_by(100) {
            aj.register_packet(false, t, None);
            assert!(aj.report().recommend_hop);
        }

        // the very next registration with a sink dispatches immediately
        let mut got = false;
        let mut sink = |_: &HopSuggestion| got = true;
        aj.register_packet(false, 1000, Some(&mut sink));
        assert!(got);
    }

    #[test]
    fn evaluate_hop_ignores_pacing() {
        let cfg = AjConfig {
            window_mode: WindowMode::ByCount,
            window_size_packets: 1,
            jam_threshold_percent: 1,
            min_bad_packets: 1,
            consecutive_windows_to_jam: 1,
            min_time_between_reco_ms: 500,
            ..AjConfig::default()
        };
        let mut aj = AntiJam::<CAP>::new(&cfg).unwrap();

        let mut fired = 0;
        let mut sink = |_: &HopSuggestion| fired += 1;
        aj.register_packet(false, 600, Some(&mut sink));
        assert_eq!(fired, 1);

        // pacing window is closed for the report but the query still recommends
        aj.register_packet(false, 700, None);
        assert!(!aj.report().recommend_hop);
        assert!(aj.evaluate_hop().recommend);
    }

    #[test]
    fn suspect_needs_margin_to_recommend() {
        let cfg = AjConfig {
            window_mode: WindowMode::ByCount,
            window_size_packets: 10,
            jam_threshold_percent: 30,
            min_bad_packets: 3,
            consecutive_windows_to_jam: 5,
            min_time_between_reco_ms: 1,
            ..AjConfig::default()
        };
        let mut aj = AntiJam::<CAP>::new(&cfg).unwrap();

        // 30%: jammy window, SUSPECT, but below threshold + margin
        feed_window(&mut aj, 10, 3, 1000);
        assert_eq!(aj.report().state, JamState::Suspect);
        assert!(!aj.evaluate_hop().recommend);

        // 40% >= 30 + 10: SUSPECT now recommends
        feed_window(&mut aj, 10, 4, 2000);
        assert!(aj.evaluate_hop().recommend);
    }

    #[test]
    fn group_switch_follows_score_and_config() {
        let cfg = AjConfig {
            window_mode: WindowMode::ByCount,
            window_size_packets: 10,
            jam_threshold_percent: 30,
            min_bad_packets: 3,
            consecutive_windows_to_jam: 1,
            allow_group_switch_suggestions: true,
            ..AjConfig::default()
        };
        let mut aj = AntiJam::<CAP>::new(&cfg).unwrap();

        feed_window(&mut aj, 10, 9, 0); // 90% >= 80
        assert!(aj.evaluate_hop().suggest_group_switch);

        let cfg_no_switch = AjConfig {
            allow_group_switch_suggestions: false,
            ..cfg
        };
        let mut aj = AntiJam::<CAP>::new(&cfg_no_switch).unwrap();
        feed_window(&mut aj, 10, 9, 0);
        assert!(!aj.evaluate_hop().suggest_group_switch);
    }

    #[test]
    fn confidence_rewards_evidence_and_margin() {
        let mut aj = AntiJam::<CAP>::new(&by_count_cfg()).unwrap();
        feed_window(&mut aj, 10, 4, 0);
        // base 10/2 + (40 - 30) = 15
        assert_eq!(aj.report().confidence, 15);
        assert_eq!(aj.report().hop_aggressiveness_hint, (40u32 * 255 / 100) as u8);
    }

    #[test]
    fn reset_returns_to_baseline() {
        let mut aj = AntiJam::<CAP>::new(&by_count_cfg()).unwrap();
        feed_window(&mut aj, 10, 10, 0);
        feed_window(&mut aj, 10, 10, 100);
        assert!(aj.is_jammed());

        aj.reset(12345);
        assert!(!aj.is_jammed());
        let report = aj.report();
        assert_eq!(report.state, JamState::NotJammed);
        assert_eq!(report.score, 0);
        assert_eq!(report.when, 12345);
    }

    #[test]
    fn reconfigure_with_new_capacity_clears_window() {
        let mut aj = AntiJam::<CAP>::new(&by_count_cfg()).unwrap();
        feed_window(&mut aj, 5, 5, 0);

        let bigger = AjConfig {
            window_size_packets: 20,
            ..by_count_cfg()
        };
        aj.configure(&bigger).unwrap();
        assert_eq!(aj.config().window_size_packets, 20);

        aj.tick(100);
        assert_eq!(aj.report().score, 0);

        let too_big = AjConfig {
            window_size_packets: 1000,
            ..by_count_cfg()
        };
        assert_eq!(aj.configure(&too_big).unwrap_err(), AjError::InsufficientBuffer);
    }
}
