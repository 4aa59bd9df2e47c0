//! Emulates a multi-level dimmable light on top of a plain on/off switch whose
//! power draw is observed through a sensor.
//!
//! [`logic::StepMapper`] does the step arithmetic, [`controller::DimmerController`]
//! turns brightness requests into toggle sequences, and [`light::StepDimmerLight`]
//! binds both to the hub bus.

pub mod actions;
pub mod config;
pub mod controller;
pub mod error;
pub mod light;
pub mod logic;
pub mod sim;

pub use config::DimmerConfig;
pub use controller::{BrightnessObserver, DimmerController, SwitchActions};
pub use error::DimmerError;
pub use logic::{Step, StepMapper};
