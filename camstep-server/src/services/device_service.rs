use std::sync::{Arc, Mutex, MutexGuard};

use camstep_embedded::{Clock, DeviceConfig, Dispatcher, MotorBank, Reply, StdClock};

use super::sim_driver::{SimMotor, sim_motor};
use crate::errors::ServerError;

pub type SimBank = MotorBank<SimMotor>;

/// The simulated controller: one motor bank shared by the HTTP handlers and the control thread.
#[derive(Clone)]
pub struct DeviceService {
    bank: Arc<Mutex<SimBank>>,
    clock: Arc<StdClock>,
    dispatcher: Dispatcher,
    config: Arc<DeviceConfig>,
}

impl DeviceService {
    pub fn new(config: DeviceConfig) -> Self {
        let bank = MotorBank::new(
            sim_motor(&config.motor1),
            sim_motor(&config.motor2),
            config.step_interval_us,
        );

        Self {
            bank: Arc::new(Mutex::new(bank)),
            clock: Arc::new(StdClock::new()),
            dispatcher: Dispatcher::new(&config),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, SimBank>, ServerError> {
        self.bank.lock().map_err(|_| ServerError::DeviceUnavailable)
    }

    /// Runs `f` with the bank locked and the current time.
    pub fn with_bank<R>(&self, f: impl FnOnce(&mut SimBank, u64) -> R) -> Result<R, ServerError> {
        let mut bank = self.lock()?;
        Ok(f(&mut bank, self.now_ms()))
    }

    /// `None` when the path is not a motor command.
    pub fn dispatch(&self, path: &str, query: Option<&str>) -> Result<Option<Reply>, ServerError> {
        self.with_bank(|bank, now| self.dispatcher.dispatch(bank, path, query, now))
    }

    /// What a restart does to the motors: everything back to the boot state.
    pub fn reset(&self) -> Result<(), ServerError> {
        self.with_bank(|bank, _| bank.reset())
    }
}
