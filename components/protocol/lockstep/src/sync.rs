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

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

/// Lock-free gate that advances the hop sequence index exactly once per hop
/// cycle, no matter which of the two radio interrupt paths runs first.
///
/// The armed flag and the index live in one atomic word so the advance is a
/// single compare-and-swap: a racing second caller can never observe the flag
/// cleared with a stale index.
#[derive(Debug)]
pub struct HopCycleGate {
    /// Bit 15: armed. Bits 0..15: current sequence index.
    word: AtomicU16,
    /// Index both radios last agreed on
    synced: AtomicU16,
    /// Completed hop cycles, wraps
    epoch: AtomicU32,
}

const ARMED_BIT: u16 = 0x8000;
const INDEX_MASK: u16 = 0x7fff;

impl HopCycleGate {
    pub const fn new() -> Self {
        Self {
            word: AtomicU16::new(0),
            synced: AtomicU16::new(0),
            epoch: AtomicU32::new(0),
        }
    }

    /// Arm the gate for the next hop cycle.
    pub fn begin_hop_cycle(&self) {
        self.word.fetch_or(ARMED_BIT, Ordering::AcqRel);
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Advance the index if this is the first call of the armed cycle.
    ///
    /// Returns the index the caller must use. Both radios call this once per
    /// cycle and both get the same value: the first caller consumes the armed
    /// flag and increments, the second sees the flag cleared and reads.
    pub fn hop_next_synced(&self, seq_len: u16) -> u16 {
        debug_assert!(seq_len > 0 && seq_len <= INDEX_MASK);
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            if current & ARMED_BIT == 0 {
                return current & INDEX_MASK;
            }
            let next = ((current & INDEX_MASK) + 1) % seq_len;
            match self.word.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.synced.store(next, Ordering::Release);
                    return next;
                }
                Err(observed) => current = observed,
            }
        }
    }

    pub fn current_index(&self) -> u16 {
        self.word.load(Ordering::Acquire) & INDEX_MASK
    }

    pub fn synced_index(&self) -> u16 {
        self.synced.load(Ordering::Acquire)
    }

    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn is_armed(&self) -> bool {
        self.word.load(Ordering::Acquire) & ARMED_BIT != 0
    }

    /// Overwrite the index, e.g. after a resynchronization packet. A pending
    /// armed cycle stays armed.
    pub fn set_index(&self, index: u16) {
        let index = index & INDEX_MASK;
        // fetch_update keeps the armed bit from a concurrent begin_hop_cycle
        let _ = self
            .word
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some((word & ARMED_BIT) | index)
            });
        self.synced.store(index, Ordering::Release);
    }
}

impl Default for HopCycleGate {
    fn default() -> Self {
        Self::new()
    }
}
