//! Steering wheel providers.
//!
//! This module contains the concrete [`SteeringWheelSdk`](crate::wheel_sdk::SteeringWheelSdk)
//! implementations: the hardware-less default and the vendor adapters.

pub mod logitech;
pub mod null;

// Re-export core types for convenience
pub use logitech::LogitechSteeringWheelSdk;
pub use null::NullSteeringWheelSdk;
