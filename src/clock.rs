// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Injectable time and randomness sources.
//!
//! Session-age comparisons use server-side time from a [`Clock`], never
//! client-supplied timestamps, and the probabilistic re-verification draw
//! comes from a [`SampleSource`]. Both are small trait seams so the
//! validator can be driven deterministically: production wires
//! [`SystemClock`] + [`ThreadRngSampler`], tests wire [`ManualClock`] +
//! [`FixedSampler`]/[`SequenceSampler`].

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Source of the current server time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic tests and replay tooling.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward (or backward, with a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Source of uniform samples in `[0, 1)` for the re-verification draw.
pub trait SampleSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Thread-local RNG sampler used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSampler;

impl SampleSource for ThreadRngSampler {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Sampler that always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(f64);

impl FixedSampler {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Always below any positive sampling rate: every request is sampled.
    pub fn hit() -> Self {
        Self(0.0)
    }

    /// Never below any sampling rate `<= 1.0`: no request is sampled.
    pub fn miss() -> Self {
        Self(1.0)
    }
}

impl SampleSource for FixedSampler {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Sampler that replays a scripted sequence of draws, then a fallback.
pub struct SequenceSampler {
    values: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl SequenceSampler {
    pub fn new(values: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            fallback,
        }
    }
}

impl SampleSource for SequenceSampler {
    fn sample(&self) -> f64 {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.pop_front().unwrap_or(self.fallback)
    }
}
