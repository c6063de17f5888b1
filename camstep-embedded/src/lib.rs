#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod bank;
pub mod clock;
pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod stepper;
pub mod update;

#[cfg(test)]
pub(crate) mod mock;

pub use bank::*;
pub use clock::*;
pub use command::*;
pub use config::*;
pub use control::*;
pub use error::*;
pub use stepper::*;
pub use update::*;
