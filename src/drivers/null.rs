//! Hardware-less default provider.

use crate::wheel_sdk::{SdkError, SteeringWheelSdk, WheelState};

/// Provider name, also returned as the product name of every index.
pub const NULL_SDK_NAME: &str = "NullSteeringWheelSdk";

/// Provider used when no vendor is installed.
///
/// Startup and spring-stop succeed so higher layers proceed normally; every
/// device query reports "no device". The product name query deliberately
/// answers with [`NULL_SDK_NAME`] so a missing vendor install is visible in
/// logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSteeringWheelSdk;

impl SteeringWheelSdk for NullSteeringWheelSdk {
    fn name(&self) -> &'static str {
        NULL_SDK_NAME
    }

    fn initialize(&mut self) -> Result<(), SdkError> {
        Ok(())
    }

    fn shutdown(&mut self) {}

    fn update(&mut self) {}

    fn max_controller_count(&self) -> usize {
        0
    }

    fn is_connected(&self, _index: usize) -> bool {
        false
    }

    fn try_get_state(&self, _index: usize) -> Option<WheelState> {
        None
    }

    fn try_get_product_name(&self, _index: usize) -> Option<String> {
        Some(NULL_SDK_NAME.to_string())
    }

    fn play_constant_force(&mut self, _index: usize, _magnitude: i32) -> bool {
        false
    }

    fn play_damper_force(&mut self, _index: usize, _magnitude: i32) -> bool {
        false
    }

    fn play_spring_force(
        &mut self,
        _index: usize,
        _offset: i32,
        _saturation: i32,
        _coefficient: i32,
    ) -> bool {
        false
    }

    fn stop_spring_force(&mut self, _index: usize) -> bool {
        true
    }
}
