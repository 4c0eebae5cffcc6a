#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod alert;
pub mod asynch;
pub mod command;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod payload;
pub mod peripherals;
pub mod publish;
pub mod transport;

#[cfg(test)]
mod test_helpers;
