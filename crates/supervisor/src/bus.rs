// SPDX-License-Identifier: MIT
// Copyright (c) 2026 hack contributors

//! Per-job log ring + sequenced event log + subscriber bus (spec §4.3).
//!
//! The live feed is a bounded `tokio::sync::broadcast` channel: a slow
//! subscriber that falls behind gets `Lagged` and is dropped rather than
//! pushing back on the job (spec §9 Open Question 3, resolved as a
//! hard-ceiling ring with slow-subscriber drop).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::log_ring::LogRing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEventKind {
    Created,
    Started,
    Stdout,
    Stderr,
    Completed,
    Failed,
    Canceled,
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub seq: u64,
    pub kind: JobEventKind,
    pub logs_offset: u64,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone)]
pub enum JobUpdate {
    Log { offset: u64, data: Vec<u8> },
    Event(JobEvent),
}

const DEFAULT_RETAINED_EVENTS: usize = 1024;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

pub struct JobBus {
    log_ring: Mutex<LogRing>,
    retained_events: Mutex<VecDeque<JobEvent>>,
    retained_cap: usize,
    sender: broadcast::Sender<JobUpdate>,
    next_seq: AtomicU64,
}

impl JobBus {
    pub fn new(log_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            log_ring: Mutex::new(LogRing::new(log_capacity)),
            retained_events: Mutex::new(VecDeque::new()),
            retained_cap: DEFAULT_RETAINED_EVENTS,
            sender,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn logs_offset(&self) -> u64 {
        self.log_ring.lock().end_offset()
    }

    pub fn events_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Acquire)
    }

    /// Append `data` to the log ring and broadcast it, returning the
    /// absolute offset of the first byte written.
    pub fn publish_log(&self, data: &[u8]) -> u64 {
        let offset = self.log_ring.lock().append(data);
        let _ = self.sender.send(JobUpdate::Log { offset, data: data.to_vec() });
        offset
    }

    /// Append and broadcast an event, returning its assigned sequence number.
    pub fn publish_event(&self, kind: JobEventKind, created_at_ms: i64) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
        let event = JobEvent { seq, kind, logs_offset: self.logs_offset(), created_at_ms };
        {
            let mut retained = self.retained_events.lock();
            retained.push_back(event.clone());
            if retained.len() > self.retained_cap {
                retained.pop_front();
            }
        }
        let _ = self.sender.send(JobUpdate::Event(event));
        seq
    }

    /// Subscribe from `(logs_from, events_from)`: returns the retained
    /// history at or after those cursors plus a live receiver for anything
    /// published afterward.
    pub fn subscribe(&self, logs_from: u64, events_from: u64) -> (Vec<JobUpdate>, broadcast::Receiver<JobUpdate>) {
        let rx = self.sender.subscribe();
        let mut replay = Vec::new();
        let log_tail = self.log_ring.lock().read(logs_from, self.logs_offset());
        if !log_tail.is_empty() {
            replay.push(JobUpdate::Log { offset: logs_from.max(self.log_ring.lock().base_offset()), data: log_tail });
        }
        for event in self.retained_events.lock().iter().filter(|e| e.seq >= events_from) {
            replay.push(JobUpdate::Event(event.clone()));
        }
        (replay, rx)
    }
}
