//! Delayed actuation of sorting exits.

use std::io::Write;
use std::time::{Duration, Instant};

use crate::error::ActuatorError;
use crate::tracker::{Channel, ExitEvent};

/// Actuation waiting for its trigger time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAction {
    pub channel: Channel,
    pub assigned_number: u32,
    pub trigger_time: Instant,
}

impl PendingAction {
    /// Signal written to the actuator.
    pub fn signal(&self) -> [u8; 1] {
        [self.channel.tag()]
    }
}

/// Turns qualifying exits into time-deferred actions.
#[derive(Debug, Clone)]
pub struct ActionScheduler {
    delay: Duration,
    /// Kept in insertion order
    pending: Vec<PendingAction>,
}

impl ActionScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    /// Queue an action for `exit`, firing `delay` after `now`.
    pub fn schedule(&mut self, exit: &ExitEvent, now: Instant) -> PendingAction {
        let action = PendingAction {
            channel: exit.channel,
            assigned_number: exit.assigned_number,
            trigger_time: now + self.delay,
        };
        tracing::info!(
            channel = %exit.channel,
            assigned_number = exit.assigned_number,
            delay_ms = self.delay.as_millis() as u64,
            "action scheduled"
        );
        self.pending.push(action);
        action
    }

    /// Remove and return every action due at `now`, in insertion order.
    pub fn poll(&mut self, now: Instant) -> Vec<PendingAction> {
        if !self.pending.iter().any(|a| a.trigger_time <= now) {
            return Vec::new();
        }
        let (fired, remaining): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|a| a.trigger_time <= now);
        self.pending = remaining;
        fired
    }

    /// Remove everything still queued, regardless of trigger time.
    pub fn drain_all(&mut self) -> Vec<PendingAction> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[PendingAction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Physical output that receives actuation signals.
pub trait Actuator {
    fn write(&mut self, signal: &[u8]) -> Result<(), ActuatorError>;
}

/// Writes signals to any byte sink, such as an opened serial device.
#[derive(Debug)]
pub struct WriterActuator<W: Write> {
    inner: W,
}

impl<W: Write> WriterActuator<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Actuator for WriterActuator<W> {
    fn write(&mut self, signal: &[u8]) -> Result<(), ActuatorError> {
        self.inner.write_all(signal)?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Discards every signal. Used when no hardware is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActuator;

impl Actuator for NullActuator {
    fn write(&mut self, _signal: &[u8]) -> Result<(), ActuatorError> {
        Ok(())
    }
}

/// Fire a batch of actions. Failures are logged and skipped; returns the number delivered.
pub fn dispatch<A: Actuator + ?Sized>(actuator: &mut A, batch: &[PendingAction]) -> usize {
    let mut delivered = 0;
    for action in batch {
        tracing::info!(
            channel = %action.channel,
            assigned_number = action.assigned_number,
            "action fired"
        );
        match actuator.write(&action.signal()) {
            Ok(()) => delivered += 1,
            Err(err) => tracing::warn!(
                channel = %action.channel,
                assigned_number = action.assigned_number,
                "actuator write failed: {err}"
            ),
        }
    }
    delivered
}
