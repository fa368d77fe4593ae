//! Hardware and simulated collaborators for the trigger decoder.
//!
//! The simulator is always available; Raspberry Pi GPIO input levels sit
//! behind the `hardware` feature.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;

pub use error::HwError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioInputs;
pub use sim::{SimulatedInputs, SimulatedWheel, WheelShape};
