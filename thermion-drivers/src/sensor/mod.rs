//! Temperature sensor implementations

pub mod thermistor;

pub use thermistor::{AdcReader, ThermistorInput, OVERSAMPLE};
