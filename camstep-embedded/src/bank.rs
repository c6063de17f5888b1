use crate::error::Error;
use crate::stepper::{Direction, Motor, step_motor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorId {
    One,
    Two,
}

impl MotorId {
    pub const ALL: [MotorId; 2] = [MotorId::One, MotorId::Two];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::try_from(index).ok()
    }

    pub fn index(self) -> u8 {
        match self {
            MotorId::One => 1,
            MotorId::Two => 2,
        }
    }

    fn slot(self) -> usize {
        match self {
            MotorId::One => 0,
            MotorId::Two => 1,
        }
    }
}

impl TryFrom<u8> for MotorId {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(MotorId::One),
            2 => Ok(MotorId::Two),
            other => Err(Error::InvalidMotor(other)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    pub running: bool,
    pub direction: Direction,
    /// Monotonic milliseconds at which the current activation ends.
    pub stop_deadline: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorStatus {
    Stopped,
    Running(Direction),
}

impl MotorStatus {
    pub fn label(self) -> &'static str {
        match self {
            MotorStatus::Stopped => "停止",
            MotorStatus::Running(direction) => direction.label(),
        }
    }
}

/// What a single poll did for each motor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    stepped: [bool; 2],
    expired: [bool; 2],
}

impl PollReport {
    pub fn stepped(&self, motor: MotorId) -> bool {
        self.stepped[motor.slot()]
    }

    pub fn expired(&self, motor: MotorId) -> bool {
        self.expired[motor.slot()]
    }

    pub fn pulses(&self) -> usize {
        self.stepped.iter().filter(|stepped| **stepped).count()
    }
}

struct MotorChannel<M: Motor> {
    motor: M,
    state: MotorState,
}

/// Owns both motor channels and the step interval they share.
///
/// Every mutation goes through `&mut self`; transports that serve requests from
/// another thread keep the bank behind a mutex so a start/stop never interleaves
/// with the deadline check in [`MotorBank::poll`].
pub struct MotorBank<M: Motor> {
    channels: [MotorChannel<M>; 2],
    step_interval_us: u32,
    boot_interval_us: u32,
}

impl<M: Motor> MotorBank<M> {
    /// Enables both driver stages, as the device does at boot.
    pub fn new(motor1: M, motor2: M, step_interval_us: u32) -> Self {
        let mut bank = Self {
            channels: [
                MotorChannel {
                    motor: motor1,
                    state: MotorState::default(),
                },
                MotorChannel {
                    motor: motor2,
                    state: MotorState::default(),
                },
            ],
            step_interval_us,
            boot_interval_us: step_interval_us,
        };
        bank.reenable_drivers();
        bank
    }

    fn channel(&self, motor: MotorId) -> &MotorChannel<M> {
        &self.channels[motor.slot()]
    }

    fn channel_mut(&mut self, motor: MotorId) -> &mut MotorChannel<M> {
        &mut self.channels[motor.slot()]
    }

    /// Starts a timed run. No pulse is emitted here; motion happens on later polls.
    ///
    /// Restarting a running motor overwrites its direction and deadline.
    pub fn start_motor(
        &mut self,
        motor: MotorId,
        direction: Direction,
        duration_secs: u32,
        now_ms: u64,
    ) {
        log::info!(
            "[motor{}] start {}, {}s",
            motor.index(),
            direction.token(),
            duration_secs
        );

        let channel = self.channel_mut(motor);
        channel.state = MotorState {
            running: true,
            direction,
            stop_deadline: now_ms.saturating_add(u64::from(duration_secs) * 1000),
        };
        channel.motor.enable();
    }

    /// Stops pulsing. The direction and step lines are left as they are.
    pub fn stop_motor(&mut self, motor: MotorId) {
        log::info!("[motor{}] stop", motor.index());
        self.channel_mut(motor).state.running = false;
    }

    pub fn stop_all(&mut self) {
        for motor in MotorId::ALL {
            self.stop_motor(motor);
        }
    }

    pub fn start_index(&mut self, index: u8, direction: Direction, duration_secs: u32, now_ms: u64) {
        if let Some(motor) = MotorId::from_index(index) {
            self.start_motor(motor, direction, duration_secs, now_ms);
        }
    }

    pub fn stop_index(&mut self, index: u8) {
        if let Some(motor) = MotorId::from_index(index) {
            self.stop_motor(motor);
        }
    }

    pub fn step_index(&mut self, index: u8, steps: i32, direction: Direction) {
        if let Some(motor) = MotorId::from_index(index) {
            self.step_motor(motor, steps, direction);
        }
    }

    /// Blocking burst of `|steps|` pulses at the current interval.
    pub fn step_motor(&mut self, motor: MotorId, steps: i32, direction: Direction) {
        let interval_us = self.step_interval_us;
        step_motor(&mut self.channel_mut(motor).motor, steps, direction, interval_us);
    }

    /// Takes effect from the next pulse, including pulses of motors already running.
    pub fn set_step_interval(&mut self, interval_us: u32) {
        self.step_interval_us = interval_us;
    }

    pub fn step_interval(&self) -> u32 {
        self.step_interval_us
    }

    /// One loop iteration: expire runs whose deadline has passed, otherwise pay one pulse.
    pub fn poll(&mut self, now_ms: u64) -> PollReport {
        let mut report = PollReport::default();

        for motor in MotorId::ALL {
            let state = self.channel(motor).state;
            if !state.running {
                continue;
            }

            if now_ms >= state.stop_deadline {
                self.channel_mut(motor).state.running = false;
                report.expired[motor.slot()] = true;
                log::info!("[motor{}] deadline reached, auto-stopped", motor.index());
            } else {
                self.step_motor(motor, 1, state.direction);
                report.stepped[motor.slot()] = true;
            }
        }

        report
    }

    pub fn state(&self, motor: MotorId) -> MotorState {
        self.channel(motor).state
    }

    pub fn status(&self, motor: MotorId) -> MotorStatus {
        let state = self.state(motor);
        if state.running {
            MotorStatus::Running(state.direction)
        } else {
            MotorStatus::Stopped
        }
    }

    /// Whole seconds left in the current run, 0 when stopped or overdue.
    pub fn remaining_secs(&self, motor: MotorId, now_ms: u64) -> u64 {
        let state = self.state(motor);
        if state.running && state.stop_deadline > now_ms {
            (state.stop_deadline - now_ms) / 1000
        } else {
            0
        }
    }

    pub fn is_driver_enabled(&self, motor: MotorId) -> bool {
        self.channel(motor).motor.is_enabled()
    }

    /// Stops both motors and de-asserts both enable lines.
    pub fn halt_all(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.state.running = false;
            channel.motor.disable();
        }
    }

    /// Re-asserts both enable lines without resuming any run.
    pub fn reenable_drivers(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.motor.enable();
        }
    }

    /// Back to the boot state: both stopped, default direction, boot interval, drivers enabled.
    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.state = MotorState::default();
        }
        self.step_interval_us = self.boot_interval_us;
        self.reenable_drivers();
    }

    pub fn motor(&self, motor: MotorId) -> &M {
        &self.channel(motor).motor
    }
}
