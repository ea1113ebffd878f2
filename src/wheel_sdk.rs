//! Steering wheel provider abstraction and trait definitions.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Logical wheel buttons, decoded from vendor button arrays.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct WheelButtons: u32 {
        const HORN = 1 << 0;
        const HIGH_BEAMS = 1 << 1;
        const SELECT = 1 << 2;
        const LEFT_INDICATOR = 1 << 3;
        const RIGHT_INDICATOR = 1 << 4;
    }
}

/// Snapshot of one polled device.
///
/// `steer` is in `[-1, 1]`, `throttle` and `brake` in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelState {
    pub steer: f32,
    pub throttle: f32,
    pub brake: f32,
    pub buttons: WheelButtons,
}

impl WheelState {
    pub const DEFAULT: WheelState = WheelState {
        steer: 0.0,
        throttle: 0.0,
        brake: 0.0,
        buttons: WheelButtons::empty(),
    };

    pub fn new(steer: f32, throttle: f32, brake: f32, buttons: WheelButtons) -> Self {
        Self {
            steer,
            throttle,
            brake,
            buttons,
        }
    }
}

/// Provider failures that callers are expected to tolerate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The vendor runtime is not installed or is missing an entry point.
    #[error("native dependency '{library}' unavailable: {reason}")]
    MissingNativeDependency { library: String, reason: String },

    /// The vendor runtime loaded but refused to start.
    #[error("{provider} refused to initialize")]
    InitializeRejected { provider: &'static str },
}

/// Vendor-neutral contract for a steering wheel provider.
///
/// Exactly one implementation is active per process (see
/// [`SdkRegistry`](crate::registry::SdkRegistry)). Every query or force call
/// on an invalid or disconnected index must fail by returning `false` or
/// `None`; none of them may panic.
///
/// # Example
///
/// ```
/// use wheel_ffb::drivers::null::NullSteeringWheelSdk;
/// use wheel_ffb::wheel_sdk::SteeringWheelSdk;
///
/// let mut sdk = NullSteeringWheelSdk;
/// assert!(sdk.initialize().is_ok());
/// assert_eq!(sdk.max_controller_count(), 0);
/// assert!(sdk.try_get_state(0).is_none());
/// sdk.shutdown();
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait SteeringWheelSdk: Send {
    /// Provider identifier used in diagnostics.
    fn name(&self) -> &'static str;

    /// Performs vendor startup.
    fn initialize(&mut self) -> Result<(), SdkError>;

    /// Releases vendor resources. Safe to call repeatedly or before `initialize`.
    fn shutdown(&mut self);

    /// Pumps the vendor polling loop. Call once per tick before reading state.
    fn update(&mut self);

    /// Upper bound for device index iteration.
    fn max_controller_count(&self) -> usize;

    fn is_connected(&self, index: usize) -> bool;

    /// Decodes the current axes and buttons of one device.
    fn try_get_state(&self, index: usize) -> Option<WheelState>;

    fn try_get_product_name(&self, index: usize) -> Option<String>;

    fn play_constant_force(&mut self, index: usize, magnitude: i32) -> bool;

    fn play_damper_force(&mut self, index: usize, magnitude: i32) -> bool;

    fn play_spring_force(
        &mut self,
        index: usize,
        offset: i32,
        saturation: i32,
        coefficient: i32,
    ) -> bool;

    fn stop_spring_force(&mut self, index: usize) -> bool;
}

/// Returns true if any of `indices` refers to a pressed entry of `buttons`.
///
/// Indices past the end of the array are ignored.
pub fn any_pressed(buttons: &[u8], indices: &[usize]) -> bool {
    indices
        .iter()
        .any(|&idx| buttons.get(idx).is_some_and(|&b| b > 0))
}

/// Maps a signed 16-bit steering axis onto `[-1, 1]`.
pub fn normalize_steer(raw: i32) -> f32 {
    (raw as f32 / 32768.0).clamp(-1.0, 1.0)
}

/// Maps a reversed signed 16-bit pedal axis onto `[0, 1]`.
///
/// Released pedals report positive values and clamp to zero.
pub fn normalize_pedal(raw: i32) -> f32 {
    (raw as f32 / -32768.0).clamp(0.0, 1.0)
}
