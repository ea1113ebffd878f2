//! # wheel_ffb
//!
//! Steering wheel force feedback for a multiplayer driving simulator.
//!
//! ## Features
//!
//! - **Seat Assignment**: Up to six participant seats, each bound to one
//!   connected wheel, with operator reassignment
//! - **Input Caching**: Steering, pedals and buttons polled once per tick
//! - **Force Feedback**: Constant, damper and spring forces with a global gain
//! - **Startup Sequencing**: Delayed FFB arming and per-device spring bring-up
//! - **Pluggable Vendors**: A process-wide provider slot with a null fallback
//!
//! ## Architecture
//!
//! - [`WheelManager`](manager::WheelManager) - Owns the provider and all seat entries
//! - [`SteeringWheelSdk`](wheel_sdk::SteeringWheelSdk) - Vendor seam
//! - [`registry`] - Process-wide provider installation
//! - [`ForceFeedback`](force_feedback::ForceFeedback) - Per-vehicle force model
//! - [`CalibrationPanel`](calibration::CalibrationPanel) - Waiting-room seat mapping
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use wheel_ffb::{config::Config, manager::WheelManager, registry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     registry::install_logitech(None, Default::default())?;
//!
//!     let sdk = registry::global().take();
//!     let mut manager = WheelManager::new(sdk, config.manager_settings())?;
//!     manager.initialize();
//!     manager.tick(Duration::from_millis(16));
//!     Ok(())
//! }
//! ```

pub mod calibration;
pub mod cli;
pub mod config;
pub mod debug_shell;
pub mod drivers;
pub mod force_feedback;
pub mod keyboard;
pub mod manager;
pub mod participant;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod wheel_sdk;
