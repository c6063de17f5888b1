use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Direction, Motor};

/// A4988-style driver: step and direction lines plus an active-low enable line.
pub struct TwoPinMotor<Pin, D>
where
    Pin: OutputPin,
    D: DelayNs,
{
    step_pin: Pin,
    dir_pin: Pin,
    enable_pin: Pin,
    delay: D,
    step_pin_inverted: bool,
    dir_pin_inverted: bool,
    enabled: bool,
}

impl<Pin, D> TwoPinMotor<Pin, D>
where
    Pin: OutputPin,
    D: DelayNs,
{
    /// Drives the step and direction lines low. The driver stays disabled until [`Motor::enable`].
    pub fn new(step_pin: Pin, dir_pin: Pin, enable_pin: Pin, delay: D) -> Self {
        let mut motor = Self {
            step_pin,
            dir_pin,
            enable_pin,
            delay,
            step_pin_inverted: false,
            dir_pin_inverted: false,
            enabled: false,
        };
        motor.set_step_active(false);
        motor.dir_pin.set_low().ok();
        motor
    }

    pub fn with_inverted_pins(mut self, step_pin_inverted: bool, dir_pin_inverted: bool) -> Self {
        self.step_pin_inverted = step_pin_inverted;
        self.dir_pin_inverted = dir_pin_inverted;
        self.set_step_active(false);
        self
    }

    fn set_step_active(&mut self, active: bool) {
        if active != self.step_pin_inverted {
            self.step_pin.set_high().ok();
        } else {
            self.step_pin.set_low().ok();
        }
    }
}

impl<Pin, D> Motor for TwoPinMotor<Pin, D>
where
    Pin: OutputPin,
    D: DelayNs,
{
    fn set_direction(&mut self, direction: Direction) {
        if direction.is_clockwise() != self.dir_pin_inverted {
            self.dir_pin.set_high().ok();
        } else {
            self.dir_pin.set_low().ok();
        }
    }

    fn pulse(&mut self, interval_us: u32) {
        self.set_step_active(true);
        self.delay.delay_us(interval_us);
        self.set_step_active(false);
        self.delay.delay_us(interval_us);
    }

    fn enable(&mut self) {
        self.enable_pin.set_low().ok();
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enable_pin.set_high().ok();
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
