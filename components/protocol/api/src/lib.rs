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

/// Failures of the anti-jam core.
///
/// Malformed configuration values never end up here, they are clamped to safe
/// defaults instead. Only conditions the caller must act on are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AjError {
    /// A caller-supplied value is out of range (e.g. an invalid mode value)
    InvalidArgument,
    /// A policy-gated mutation was rejected (anti-jam disabled)
    Denied,
    /// The configured window does not fit the compile-time storage
    InsufficientBuffer,
}

impl core::fmt::Display for AjError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AjError::InvalidArgument => write!(fmt, "invalid argument"),
            AjError::Denied => write!(fmt, "denied by policy"),
            AjError::InsufficientBuffer => write!(fmt, "insufficient buffer"),
        }
    }
}

/// Result of an idempotent mutation.
///
/// `NoChange` is a success, not an error. Callers use it to decide whether an
/// operator or controller link needs to be notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum Outcome {
    Changed,
    NoChange,
}

/// Notification sink for committed hop suggestions.
///
/// The dispatch path invokes this at most once per pacing window. Rate
/// limiting is committed only when a suggestion is actually delivered.
pub trait HopSink<S> {
    fn on_hop_suggested(&mut self, suggestion: &S);
}

impl<S, F: FnMut(&S)> HopSink<S> for F {
    fn on_hop_suggested(&mut self, suggestion: &S) {
        self(suggestion)
    }
}

/// Hook for regulatory-domain switching policies.
///
/// The core tracks consecutive bad packets and reports the running count; the
/// switching algorithm itself lives outside the core.
pub trait DomainSwitchHook<T> {
    fn on_bad_packet_run(&mut self, consecutive_bad: u8, now: T);
}

/// Jam detection engine interface.
///
/// Implementations consume per-packet CRC outcomes and caller-supplied
/// millisecond timestamps; the engine never reads a clock itself. All
/// operations are synchronous and bounded-time.
pub trait JamMonitor {
    type TimeMs: Copy + Eq + Ord;
    type Report: Clone;
    type Suggestion: Clone;

    /// Record one packet outcome (`good` = CRC OK).
    ///
    /// When a hop recommendation clears the pacing window and `sink` is
    /// present, the suggestion is delivered and pacing is committed.
    fn register_packet(
        &mut self,
        good: bool,
        now: Self::TimeMs,
        sink: Option<&mut dyn HopSink<Self::Suggestion>>,
    );

    /// Record an external jam indication (e.g. RF front-end overload).
    fn register_external_jam(
        &mut self,
        now: Self::TimeMs,
        sink: Option<&mut dyn HopSink<Self::Suggestion>>,
    );

    /// Periodic service call. Never delivers suggestions on its own.
    fn tick(&mut self, now: Self::TimeMs);

    /// Snapshot of the last computed report.
    fn report(&self) -> Self::Report;

    fn is_jammed(&self) -> bool;

    /// Recompute the hop suggestion from the cached report without touching
    /// rate-limiting state.
    fn evaluate_hop(&self) -> Self::Suggestion;

    fn reset(&mut self, now: Self::TimeMs);
}
