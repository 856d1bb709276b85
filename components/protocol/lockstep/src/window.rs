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

use crate::*;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PacketEntry {
    pub(crate) good: bool,
    pub(crate) ts: TimeMs,
}

/// Ring buffer of recent packet outcomes with a running bad count.
///
/// `N` is the compile-time storage bound; the live capacity comes from the
/// configuration and may be smaller. Entries are logically ordered oldest to
/// newest. Invariant: `bad_count <= count <= capacity <= N`.
#[derive(Debug)]
pub(crate) struct PacketRing<const N: usize> {
    entries: [PacketEntry; N],
    /// Live capacity, 1..=N
    capacity: u16,
    /// Next insert position, 0..capacity
    head: u16,
    count: u16,
    bad_count: u16,
}

impl<const N: usize> PacketRing<N> {
    pub(crate) fn new(capacity: u16) -> Result<Self, AjError> {
        let capacity = capacity.max(1);
        if capacity as usize > N {
            return Err(AjError::InsufficientBuffer);
        }
        Ok(Self {
            entries: [PacketEntry::default(); N],
            capacity,
            head: 0,
            count: 0,
            bad_count: 0,
        })
    }

    pub(crate) fn count(&self) -> u16 {
        self.count
    }

    pub(crate) fn bad_count(&self) -> u16 {
        self.bad_count
    }

    pub(crate) fn capacity(&self) -> u16 {
        self.capacity
    }

    pub(crate) fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
        self.bad_count = 0;
    }

    /// Change the live capacity. The ring is cleared when it changes, the old
    /// entry ordering is meaningless under a different modulus.
    pub(crate) fn set_capacity(&mut self, capacity: u16) -> Result<(), AjError> {
        let capacity = capacity.max(1);
        if capacity as usize > N {
            return Err(AjError::InsufficientBuffer);
        }
        if capacity != self.capacity {
            self.capacity = capacity;
            self.clear();
        }
        Ok(())
    }

    /// Append one outcome, evicting the oldest entry when full.
    ///
    /// Returns true when the ring just wrapped to the start while full, which
    /// marks a count-based window boundary: one boundary every `capacity`
    /// insertions.
    pub(crate) fn push(&mut self, good: bool, ts: TimeMs) -> bool {
        if self.count == self.capacity {
            let evicted = self.entries[self.head as usize];
            if !evicted.good && self.bad_count > 0 {
                self.bad_count -= 1;
            }
        } else {
            self.count += 1;
        }

        self.entries[self.head as usize] = PacketEntry { good, ts };
        if !good {
            self.bad_count += 1;
        }

        self.head = (self.head + 1) % self.capacity;
        self.count == self.capacity && self.head == 0
    }

    /// Drop entries older than `cutoff` from the oldest side.
    pub(crate) fn prune_older_than(&mut self, cutoff: TimeMs) {
        while self.count > 0 {
            // widened so head + capacity cannot overflow u16
            let tail = ((self.head as u32 + self.capacity as u32 - self.count as u32)
                % self.capacity as u32) as u16;
            let entry = self.entries[tail as usize];
            if entry.ts >= cutoff {
                break;
            }
            if !entry.good && self.bad_count > 0 {
                self.bad_count -= 1;
            }
            self.count -= 1;
        }
    }
}
