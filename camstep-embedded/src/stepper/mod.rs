mod motor_2pin;

pub use motor_2pin::TwoPinMotor;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn from_clockwise(clockwise: bool) -> Self {
        if clockwise {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Only the exact token `cw` selects clockwise; anything else is counter-clockwise.
    pub fn from_token(token: &str) -> Self {
        Self::from_clockwise(token == "cw")
    }

    pub fn is_clockwise(self) -> bool {
        self == Direction::Clockwise
    }

    pub fn token(self) -> &'static str {
        match self {
            Direction::Clockwise => "cw",
            Direction::CounterClockwise => "ccw",
        }
    }

    /// Label used in HTTP replies and the status document.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Clockwise => "顺时针",
            Direction::CounterClockwise => "逆时针",
        }
    }
}

/// A step/direction driver stage with an enable line.
pub trait Motor {
    fn set_direction(&mut self, direction: Direction);

    /// Emits one step pulse: active for `interval_us`, then inactive for `interval_us`.
    fn pulse(&mut self, interval_us: u32);

    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;
}

/// Sets the direction line then emits `|steps|` pulses.
///
/// Blocks for `|steps| * 2 * interval_us` microseconds. The step line is inactive on return.
pub fn step_motor<M: Motor>(motor: &mut M, steps: i32, direction: Direction, interval_us: u32) {
    motor.set_direction(direction);

    for _ in 0..steps.unsigned_abs() {
        motor.pulse(interval_us);
    }
}
