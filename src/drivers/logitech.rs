pub mod layout;
pub mod native;

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::wheel_sdk::{SdkError, SteeringWheelSdk, WheelState};

use self::{
    layout::ButtonLayout,
    native::{LOGI_MAX_CONTROLLERS, LogitechApi, NativeLogitechApi},
};

/// Provider name reported in diagnostics.
pub const LOGITECH_SDK_NAME: &str = "LogitechSteeringWheelSdk";

type ApiLoader = Box<dyn FnMut() -> Result<Box<dyn LogitechApi>, SdkError> + Send>;

/// Logitech steering wheel provider.
///
/// Translates every [`SteeringWheelSdk`] call onto the vendor function of the
/// same name. The vendor library is only loaded during
/// [`initialize`](SteeringWheelSdk::initialize), so a machine without the
/// runtime can still construct and install the provider; until the library is
/// loaded every query and force call reports failure.
///
/// # Example
///
/// ```no_run
/// use wheel_ffb::drivers::logitech::LogitechSteeringWheelSdk;
/// use wheel_ffb::wheel_sdk::SteeringWheelSdk;
///
/// let mut sdk = LogitechSteeringWheelSdk::with_default_library();
/// match sdk.initialize() {
///     Ok(()) => println!("{} slots", sdk.max_controller_count()),
///     Err(e) => eprintln!("wheel support disabled: {e}"),
/// }
/// ```
pub struct LogitechSteeringWheelSdk {
    loader: ApiLoader,
    api: Option<Box<dyn LogitechApi>>,
    layout: ButtonLayout,
    started: bool,
}

impl std::fmt::Debug for LogitechSteeringWheelSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogitechSteeringWheelSdk")
            .field("loaded", &self.api.is_some())
            .field("started", &self.started)
            .field("layout", &self.layout)
            .finish()
    }
}

impl LogitechSteeringWheelSdk {
    /// Provider that loads the vendor wrapper from `library` on initialize.
    pub fn new(library: PathBuf) -> Self {
        Self {
            loader: Box::new(move || {
                NativeLogitechApi::load(&library).map(|api| Box::new(api) as Box<dyn LogitechApi>)
            }),
            api: None,
            layout: ButtonLayout::logitech_default(),
            started: false,
        }
    }

    /// Provider that looks the wrapper up by its platform file name.
    pub fn with_default_library() -> Self {
        Self::new(NativeLogitechApi::default_library())
    }

    /// Provider bound to an already available function surface.
    pub fn with_api<A: LogitechApi + 'static>(api: A) -> Self {
        Self {
            loader: Box::new(|| {
                Err(SdkError::MissingNativeDependency {
                    library: String::from("<injected>"),
                    reason: String::from("injected API cannot be reloaded"),
                })
            }),
            api: Some(Box::new(api)),
            layout: ButtonLayout::logitech_default(),
            started: false,
        }
    }

    /// Replaces the raw-button table.
    pub fn with_layout(mut self, layout: ButtonLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &ButtonLayout {
        &self.layout
    }

    fn slot(index: usize) -> Option<i32> {
        (index < LOGI_MAX_CONTROLLERS).then_some(index as i32)
    }

    fn device(&self, index: usize) -> Option<(&dyn LogitechApi, i32)> {
        let api = self.api.as_deref()?;
        Self::slot(index).map(|slot| (api, slot))
    }
}

impl SteeringWheelSdk for LogitechSteeringWheelSdk {
    fn name(&self) -> &'static str {
        LOGITECH_SDK_NAME
    }

    fn initialize(&mut self) -> Result<(), SdkError> {
        if self.api.is_none() {
            self.api = Some((self.loader)()?);
        }
        let Some(api) = self.api.as_deref() else {
            return Err(SdkError::InitializeRejected {
                provider: LOGITECH_SDK_NAME,
            });
        };

        if api.steering_initialize(false) {
            info!("Logitech steering wheel runtime initialized");
            self.started = true;
            Ok(())
        } else {
            warn!("LogiSteeringInitialize returned false");
            Err(SdkError::InitializeRejected {
                provider: LOGITECH_SDK_NAME,
            })
        }
    }

    fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        if let Some(api) = self.api.as_deref() {
            api.steering_shutdown();
            info!("Logitech steering wheel runtime shut down");
        }
        self.started = false;
    }

    fn update(&mut self) {
        if let Some(api) = self.api.as_deref() {
            if !api.update() {
                debug!("LogiUpdate reported no update");
            }
        }
    }

    fn max_controller_count(&self) -> usize {
        LOGI_MAX_CONTROLLERS
    }

    fn is_connected(&self, index: usize) -> bool {
        self.device(index)
            .is_some_and(|(api, slot)| api.is_connected(slot))
    }

    fn try_get_state(&self, index: usize) -> Option<WheelState> {
        let (api, slot) = self.device(index)?;
        if !api.is_connected(slot) {
            return None;
        }
        api.get_state(slot)
            .map(|raw| self.layout.decode_state(&raw))
    }

    fn try_get_product_name(&self, index: usize) -> Option<String> {
        let (api, slot) = self.device(index)?;
        api.friendly_product_name(slot)
    }

    fn play_constant_force(&mut self, index: usize, magnitude: i32) -> bool {
        self.device(index)
            .is_some_and(|(api, slot)| api.play_constant_force(slot, magnitude))
    }

    fn play_damper_force(&mut self, index: usize, magnitude: i32) -> bool {
        self.device(index)
            .is_some_and(|(api, slot)| api.play_damper_force(slot, magnitude))
    }

    fn play_spring_force(
        &mut self,
        index: usize,
        offset: i32,
        saturation: i32,
        coefficient: i32,
    ) -> bool {
        self.device(index).is_some_and(|(api, slot)| {
            api.play_spring_force(slot, offset, saturation, coefficient)
        })
    }

    fn stop_spring_force(&mut self, index: usize) -> bool {
        self.device(index)
            .is_some_and(|(api, slot)| api.stop_spring_force(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wheel_sdk::WheelButtons;
    use mockall::predicate::eq;
    use native::{DiJoyState2Engines, MockLogitechApi};
    use pretty_assertions::assert_eq;

    fn started_sdk(mut api: MockLogitechApi) -> LogitechSteeringWheelSdk {
        api.expect_steering_initialize()
            .with(eq(false))
            .times(1)
            .return_const(true);
        let mut sdk = LogitechSteeringWheelSdk::with_api(api);
        sdk.initialize().unwrap();
        sdk
    }

    #[test]
    fn initialize_reports_rejection() {
        let mut api = MockLogitechApi::new();
        api.expect_steering_initialize().return_const(false);
        let mut sdk = LogitechSteeringWheelSdk::with_api(api);
        assert_eq!(
            sdk.initialize(),
            Err(SdkError::InitializeRejected {
                provider: LOGITECH_SDK_NAME
            })
        );
    }

    #[test]
    fn missing_library_surfaces_on_initialize() {
        let mut sdk = LogitechSteeringWheelSdk::new(PathBuf::from("/nonexistent/libnothing.so"));
        assert!(matches!(
            sdk.initialize(),
            Err(SdkError::MissingNativeDependency { .. })
        ));
        // Unloaded provider degrades to "no device" everywhere.
        assert!(!sdk.is_connected(0));
        assert!(sdk.try_get_state(0).is_none());
        assert!(sdk.try_get_product_name(0).is_none());
        assert!(!sdk.play_constant_force(0, 10));
        assert!(!sdk.stop_spring_force(0));
        sdk.update();
        sdk.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut api = MockLogitechApi::new();
        api.expect_steering_shutdown().times(1).return_const(());
        let mut sdk = started_sdk(api);
        sdk.shutdown();
        sdk.shutdown();
    }

    #[test]
    fn shutdown_before_initialize_skips_vendor_call() {
        let mut api = MockLogitechApi::new();
        api.expect_steering_shutdown().never();
        let mut sdk = LogitechSteeringWheelSdk::with_api(api);
        sdk.shutdown();
    }

    #[test]
    fn state_is_decoded_through_the_layout() {
        let mut api = MockLogitechApi::new();
        api.expect_is_connected().with(eq(1)).return_const(true);
        api.expect_get_state().with(eq(1)).returning(|_| {
            let mut raw = DiJoyState2Engines::zeroed();
            raw.l_x = 32767;
            raw.l_y = -8192;
            raw.l_rz = -32768;
            raw.rgb_buttons[23] = 1;
            Some(raw)
        });
        let sdk = started_sdk(api);

        let state = sdk.try_get_state(1).unwrap();
        assert!((state.steer - 32767.0 / 32768.0).abs() < 1e-6);
        assert_eq!(state.throttle, 0.25);
        assert_eq!(state.brake, 1.0);
        assert_eq!(state.buttons, WheelButtons::HORN);
    }

    #[test]
    fn disconnected_device_has_no_state() {
        let mut api = MockLogitechApi::new();
        api.expect_is_connected().return_const(false);
        api.expect_get_state().never();
        let sdk = started_sdk(api);
        assert!(sdk.try_get_state(0).is_none());
    }

    #[test]
    fn out_of_range_indices_never_reach_the_vendor() {
        let mut api = MockLogitechApi::new();
        api.expect_is_connected().never();
        api.expect_play_constant_force().never();
        api.expect_play_spring_force().never();
        let mut sdk = started_sdk(api);
        assert!(!sdk.is_connected(LOGI_MAX_CONTROLLERS));
        assert!(!sdk.play_constant_force(99, 10));
        assert!(!sdk.play_spring_force(usize::MAX, 0, 1, 1));
    }

    #[test]
    fn forces_forward_arguments_verbatim() {
        let mut api = MockLogitechApi::new();
        api.expect_play_constant_force()
            .with(eq(0), eq(-25))
            .times(1)
            .return_const(true);
        api.expect_play_damper_force()
            .with(eq(0), eq(15))
            .times(1)
            .return_const(true);
        api.expect_play_spring_force()
            .with(eq(0), eq(0), eq(30), eq(40))
            .times(1)
            .return_const(false);
        api.expect_stop_spring_force()
            .with(eq(0))
            .times(1)
            .return_const(true);
        let mut sdk = started_sdk(api);

        assert!(sdk.play_constant_force(0, -25));
        assert!(sdk.play_damper_force(0, 15));
        assert!(!sdk.play_spring_force(0, 0, 30, 40));
        assert!(sdk.stop_spring_force(0));
    }

    #[test]
    fn product_name_comes_from_vendor() {
        let mut api = MockLogitechApi::new();
        api.expect_friendly_product_name()
            .with(eq(2))
            .returning(|_| Some("G923 Racing Wheel".to_string()));
        api.expect_friendly_product_name()
            .with(eq(3))
            .returning(|_| None);
        let sdk = started_sdk(api);
        assert_eq!(sdk.try_get_product_name(2).as_deref(), Some("G923 Racing Wheel"));
        assert_eq!(sdk.try_get_product_name(3), None);
    }

    #[test]
    fn custom_layout_replaces_default() {
        let mut api = MockLogitechApi::new();
        api.expect_is_connected().return_const(true);
        api.expect_get_state().returning(|_| {
            let mut raw = DiJoyState2Engines::zeroed();
            raw.rgb_buttons[0] = 1;
            raw.rgb_buttons[9] = 1;
            Some(raw)
        });
        let layout = ButtonLayout {
            horn: vec![],
            select: vec![9],
            ..ButtonLayout::logitech_default()
        };
        let mut sdk = LogitechSteeringWheelSdk::with_api(api).with_layout(layout);
        let state = sdk.try_get_state(0).unwrap();
        assert_eq!(state.buttons, WheelButtons::SELECT);
        // Never initialized: shutdown stays local.
        sdk.shutdown();
    }
}
