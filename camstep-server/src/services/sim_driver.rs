use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use camstep_embedded::{PinMap, TwoPinMotor};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

pub type SimMotor = TwoPinMotor<SimPin, SimDelay>;

/// GPIO stand-in that traces level changes.
#[derive(Debug)]
pub struct SimPin {
    gpio: u8,
    high: bool,
}

impl SimPin {
    pub fn new(gpio: u8) -> Self {
        Self { gpio, high: false }
    }

    fn set_level(&mut self, high: bool) {
        if self.high != high {
            tracing::trace!(gpio = self.gpio, high, "pin level");
        }
        self.high = high;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

/// Sleeps the calling thread, standing in for the device's busy wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimDelay;

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

pub fn sim_motor(pins: &PinMap) -> SimMotor {
    tracing::debug!(
        "simulated driver: dir={} step={} enable={}",
        pins.dir,
        pins.step,
        pins.enable
    );

    TwoPinMotor::new(
        SimPin::new(pins.step),
        SimPin::new(pins.dir),
        SimPin::new(pins.enable),
        SimDelay,
    )
}
