use core::cell::RefCell;
use core::convert::Infallible;

use alloc::rc::Rc;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::bank::MotorBank;
use crate::stepper::TwoPinMotor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Pin(&'static str, bool),
    Delay(u32),
}

/// Shared, ordered record of every pin write and delay across a test rig.
pub type Trace = Rc<RefCell<Vec<Event>>>;

pub type MockMotor = TwoPinMotor<MockPin, MockDelay>;

pub struct MockPin {
    name: &'static str,
    trace: Trace,
}

impl MockPin {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: trace.clone(),
        }
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.trace.borrow_mut().push(Event::Pin(self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.trace.borrow_mut().push(Event::Pin(self.name, true));
        Ok(())
    }
}

pub struct MockDelay {
    trace: Trace,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.trace.borrow_mut().push(Event::Delay(ns / 1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.trace.borrow_mut().push(Event::Delay(us));
    }
}

pub fn mock_motor(index: u8, trace: &Trace) -> MockMotor {
    let (step, dir, en) = match index {
        1 => ("step1", "dir1", "en1"),
        _ => ("step2", "dir2", "en2"),
    };

    TwoPinMotor::new(
        MockPin::new(step, trace),
        MockPin::new(dir, trace),
        MockPin::new(en, trace),
        MockDelay {
            trace: trace.clone(),
        },
    )
}

pub fn mock_bank(trace: &Trace) -> MotorBank<MockMotor> {
    MotorBank::new(mock_motor(1, trace), mock_motor(2, trace), 1000)
}

pub fn pin_events(trace: &Trace, name: &str) -> Vec<bool> {
    trace
        .borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Pin(pin, state) if *pin == name => Some(*state),
            _ => None,
        })
        .collect()
}

pub fn delays(trace: &Trace) -> Vec<u32> {
    trace
        .borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Delay(us) => Some(*us),
            _ => None,
        })
        .collect()
}

/// Last level written to `name`, if any.
pub fn level(trace: &Trace, name: &str) -> Option<bool> {
    pin_events(trace, name).last().copied()
}
