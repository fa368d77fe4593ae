#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Crank/cam trigger decoding (hardware-agnostic).
//!
//! Turns timestamped sensor edges into a synchronized tooth count, a crank
//! angle, an RPM estimate and the per-channel ignition end teeth. All
//! hardware interaction goes through the `trigger_traits` collaborators.
//!
//! ## Architecture
//!
//! - **Decoders**: missing-tooth and dual-wheel patterns behind one template (`decoder`)
//! - **Timing**: revolution time and its fixed-point derivatives (`timing`, `fixed_point`)
//! - **RPM**: standard and cranking estimators (`rpm`)
//! - **Noise filter**: adaptive minimum gap (`filter`)
//! - **Ignition**: end-tooth table (`end_tooth`) and per-tooth corrector (`per_tooth`)
//! - **Instance**: `Trigger` with its state behind a critical section (`trigger`, `builder`)
//! - **Host glue**: `EdgePump` thread and the tooth logger (`edge_pump`, `logger`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Angles are whole degrees in `i16`, times are `u32` microseconds that wrap
//! like the hardware counter. Speed is carried as UQ24.8 µs/degree and UQ1.15
//! degrees/µs, always rounded to nearest. No floating point on the edge path.

pub mod builder;
pub mod config;
mod conversions;
mod decoder;
pub mod edge_pump;
pub mod end_tooth;
pub mod error;
pub mod filter;
pub mod fixed_point;
pub mod logger;
pub mod mocks;
pub mod per_tooth;
pub mod rpm;
pub mod state;
pub mod status;
pub mod timing;
pub mod trigger;
pub mod util;

pub use builder::{Trigger, TriggerBuilder, TriggerG, build_trigger};
pub use decoder::{AngleSnapshot, Geometry};
pub use edge_pump::{EdgePump, PumpStats};
pub use error::{BuildError, DecoderError};
pub use logger::{SharedToothLog, ToothLogBuffer};
pub use state::DecoderSnapshot;
pub use status::{EdgeOutcome, SyncState};
pub use trigger::TriggerCore;
