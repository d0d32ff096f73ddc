//! Collaborators of the controller: the servo bus and the clock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::sync_write::SyncWrite;

/// Per-servo primitives of the actuator bus. All methods address physical actuator ids.
pub trait ServoBus {
    /// Present position of the actuator. `Ok(None)` is the transient read failure the bus
    /// reports from time to time (no reply, garbled reply); callers may retry.
    fn read_position(&mut self, id: u8) -> anyhow::Result<Option<u16>>;

    /// Goal position of a single actuator.
    fn write_position(&mut self, id: u8, position: u16) -> anyhow::Result<()>;

    fn set_torque_enabled(&mut self, id: u8, enabled: bool) -> anyhow::Result<()>;

    /// Raw bytes of a pre-built frame (like [SyncWrite]) sent as they are.
    fn write_frame(&mut self, frame: &[u8]) -> anyhow::Result<()>;
}

/// Source of time. Motions read `now` every tick and `sleep` between ticks.
pub trait Clock {
    /// Time since some fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

/// Wall clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedServo {
    pub position: u16,
    pub torque: bool,
}

/// Servos that reach any goal instantly. Unknown ids never reply.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    servos: HashMap<u8, SimulatedServo>,
    failing_reads: usize,
}

impl SimulatedBus {
    /// Bus with the given (id, position) servos, torque on.
    pub fn new(servos: &[(u8, u16)]) -> Self {
        SimulatedBus {
            servos: servos
                .iter()
                .map(|&(id, position)| (id, SimulatedServo { position, torque: true }))
                .collect(),
            failing_reads: 0,
        }
    }

    pub fn servo(&self, id: u8) -> Option<SimulatedServo> {
        self.servos.get(&id).copied()
    }

    /// Moves a servo as if by hand (works also with torque off).
    pub fn set_position(&mut self, id: u8, position: u16) {
        if let Some(servo) = self.servos.get_mut(&id) {
            servo.position = position;
        }
    }

    /// The next `count` reads fail with the transient failure.
    pub fn fail_next_reads(&mut self, count: usize) {
        self.failing_reads = count;
    }

    fn goal(&mut self, id: u8, position: u16) {
        if let Some(servo) = self.servos.get_mut(&id) {
            if servo.torque {
                servo.position = position;
            }
        }
    }
}

impl ServoBus for SimulatedBus {
    fn read_position(&mut self, id: u8) -> anyhow::Result<Option<u16>> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Ok(None);
        }
        Ok(self.servos.get(&id).map(|servo| servo.position))
    }

    fn write_position(&mut self, id: u8, position: u16) -> anyhow::Result<()> {
        self.goal(id, position);
        Ok(())
    }

    fn set_torque_enabled(&mut self, id: u8, enabled: bool) -> anyhow::Result<()> {
        if let Some(servo) = self.servos.get_mut(&id) {
            servo.torque = enabled;
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        let sync = SyncWrite::decode(frame)?;
        for &(id, position) in sync.entries() {
            self.goal(id, position);
        }
        Ok(())
    }
}
