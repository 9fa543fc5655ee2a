//! Per-step time budget shared by the phase loops.
//!
//! A step hands each operation `time_step` seconds. Phase handlers consume
//! from the budget until it is empty; every consumed second is recorded
//! against the phase that used it, so the trace of a step sums to the step.

use serde::Serialize;
use smallvec::SmallVec;

use crate::OperationId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseSpan {
    pub phase: &'static str,
    pub seconds: f64,
}

pub type PhaseTrace = SmallVec<[PhaseSpan; 6]>;

#[derive(Debug, Clone)]
pub struct TimeBudget {
    remaining: f64,
    trace: PhaseTrace,
}

impl TimeBudget {
    pub fn new(seconds: f64) -> Self {
        Self {
            remaining: seconds.max(0.0),
            trace: PhaseTrace::new(),
        }
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Consume up to `seconds` in `phase`. Returns what was actually consumed.
    pub fn consume(&mut self, phase: &'static str, seconds: f64) -> f64 {
        let spent = seconds.clamp(0.0, self.remaining);
        if spent >= self.remaining {
            self.remaining = 0.0;
        } else {
            self.remaining -= spent;
        }
        if spent > 0.0 {
            match self.trace.last_mut() {
                Some(last) if last.phase == phase => last.seconds += spent,
                _ => self.trace.push(PhaseSpan { phase, seconds: spent }),
            }
        }
        spent
    }

    /// Consume whatever is left in `phase`.
    pub fn consume_all(&mut self, phase: &'static str) -> f64 {
        let remaining = self.remaining;
        self.consume(phase, remaining)
    }

    pub fn trace(&self) -> &PhaseTrace {
        &self.trace
    }

    pub fn into_trace(self) -> PhaseTrace {
        self.trace
    }
}

/// Total seconds recorded in a trace.
pub fn traced_seconds(trace: &[PhaseSpan]) -> f64 {
    trace.iter().map(|span| span.seconds).sum()
}

/// Seconds recorded against one phase label.
pub fn seconds_in(trace: &[PhaseSpan], phase: &str) -> f64 {
    trace
        .iter()
        .filter(|span| span.phase == phase)
        .map(|span| span.seconds)
        .sum()
}

/// Bounds a phase loop: every iteration must consume time, or a transition
/// must lead to a phase that does within `limit` iterations.
pub(crate) struct StallGuard {
    limit: u32,
    stalls: u32,
}

impl StallGuard {
    pub(crate) fn new(limit: u32) -> Self {
        Self { limit, stalls: 0 }
    }

    /// Call after each handler. Spends the rest of the budget in `phase` when
    /// the loop has stopped making progress.
    pub(crate) fn check(
        &mut self,
        before: f64,
        budget: &mut TimeBudget,
        phase: &'static str,
        operation: &OperationId,
    ) {
        if budget.remaining() < before {
            self.stalls = 0;
            return;
        }
        self.stalls += 1;
        if self.stalls > self.limit {
            tracing::error!(
                %operation,
                phase,
                remaining_s = budget.remaining(),
                "phase loop made no progress; idling for the rest of the step"
            );
            budget.consume_all(phase);
        }
    }
}
