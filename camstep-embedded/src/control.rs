use alloc::string::String;
use core::fmt::Write;

use crate::bank::{MotorBank, MotorId, PollReport};
use crate::config::DeviceConfig;
use crate::stepper::Motor;

/// Drives the bank once per loop iteration and emits a periodic status line.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    heartbeat_ms: u64,
    idle_delay_ms: u64,
    last_beat: u64,
}

impl ControlLoop {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            heartbeat_ms: config.heartbeat_ms,
            idle_delay_ms: config.idle_delay_ms,
            last_beat: 0,
        }
    }

    /// How long the transport should sleep between ticks.
    pub fn idle_delay_ms(&self) -> u64 {
        self.idle_delay_ms
    }

    pub fn tick<M: Motor>(&mut self, bank: &mut MotorBank<M>, now_ms: u64) -> PollReport {
        let report = bank.poll(now_ms);

        if self.heartbeat_ms > 0 && now_ms.saturating_sub(self.last_beat) >= self.heartbeat_ms {
            self.last_beat = now_ms;
            log::info!("{}", heartbeat_line(bank, now_ms));
        }

        report
    }
}

impl Default for ControlLoop {
    fn default() -> Self {
        Self::new(&DeviceConfig::default())
    }
}

/// `[status] delay=1000us | M1:running(cw) 3s left | M2:stopped 0s left`
pub fn heartbeat_line<M: Motor>(bank: &MotorBank<M>, now_ms: u64) -> String {
    let mut line = String::new();
    let _ = write!(line, "[status] delay={}us", bank.step_interval());

    for motor in MotorId::ALL {
        let state = bank.state(motor);
        let _ = if state.running {
            write!(
                line,
                " | M{}:running({}) {}s left",
                motor.index(),
                state.direction.token(),
                bank.remaining_secs(motor, now_ms)
            )
        } else {
            write!(line, " | M{}:stopped 0s left", motor.index())
        };
    }

    line
}
