use std::path::{Path, PathBuf};

use libloading::Library;
use log::info;

use crate::wheel_sdk::SdkError;

/// Number of device slots the vendor runtime exposes.
pub const LOGI_MAX_CONTROLLERS: usize = 4;

/// Size of the raw button array in [`DiJoyState2Engines`].
pub const BUTTON_COUNT: usize = 128;

/// UTF-16 code units reserved for a friendly product name.
pub const PRODUCT_NAME_BUFFER: usize = 256;

/// Base name of the vendor wrapper library.
pub const LIBRARY_NAME: &str = "LogitechSteeringWheelEnginesWrapper";

/// Raw device state as laid out by the vendor runtime (DirectInput
/// `DIJOYSTATE2` with the vendor's engine naming).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiJoyState2Engines {
    pub l_x: i32,
    pub l_y: i32,
    pub l_z: i32,
    pub l_rx: i32,
    pub l_ry: i32,
    pub l_rz: i32,
    pub rgl_slider: [i32; 2],
    pub rgdw_pov: [u32; 4],
    pub rgb_buttons: [u8; BUTTON_COUNT],
    pub l_vx: i32,
    pub l_vy: i32,
    pub l_vz: i32,
    pub l_vrx: i32,
    pub l_vry: i32,
    pub l_vrz: i32,
    pub rgl_vslider: [i32; 2],
    pub l_ax: i32,
    pub l_ay: i32,
    pub l_az: i32,
    pub l_arx: i32,
    pub l_ary: i32,
    pub l_arz: i32,
    pub rgl_aslider: [i32; 2],
    pub l_fx: i32,
    pub l_fy: i32,
    pub l_fz: i32,
    pub l_frx: i32,
    pub l_fry: i32,
    pub l_frz: i32,
    pub rgl_fslider: [i32; 2],
}

impl DiJoyState2Engines {
    pub const fn zeroed() -> Self {
        Self {
            l_x: 0,
            l_y: 0,
            l_z: 0,
            l_rx: 0,
            l_ry: 0,
            l_rz: 0,
            rgl_slider: [0; 2],
            rgdw_pov: [0; 4],
            rgb_buttons: [0; BUTTON_COUNT],
            l_vx: 0,
            l_vy: 0,
            l_vz: 0,
            l_vrx: 0,
            l_vry: 0,
            l_vrz: 0,
            rgl_vslider: [0; 2],
            l_ax: 0,
            l_ay: 0,
            l_az: 0,
            l_arx: 0,
            l_ary: 0,
            l_arz: 0,
            rgl_aslider: [0; 2],
            l_fx: 0,
            l_fy: 0,
            l_fz: 0,
            l_frx: 0,
            l_fry: 0,
            l_frz: 0,
            rgl_fslider: [0; 2],
        }
    }
}

impl Default for DiJoyState2Engines {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Function surface of the vendor steering wheel SDK.
///
/// Indices are the vendor's `int` device slots. Implementations never see an
/// index outside `0..LOGI_MAX_CONTROLLERS`; the adapter filters them first.
#[cfg_attr(test, mockall::automock)]
pub trait LogitechApi: Send {
    fn steering_initialize(&self, ignore_xinput_controllers: bool) -> bool;
    fn steering_shutdown(&self);
    fn update(&self) -> bool;
    fn is_connected(&self, index: i32) -> bool;
    fn get_state(&self, index: i32) -> Option<DiJoyState2Engines>;
    fn friendly_product_name(&self, index: i32) -> Option<String>;
    fn play_constant_force(&self, index: i32, magnitude_percentage: i32) -> bool;
    fn play_damper_force(&self, index: i32, coefficient_percentage: i32) -> bool;
    fn play_spring_force(&self, index: i32, offset: i32, saturation: i32, coefficient: i32)
    -> bool;
    fn stop_spring_force(&self, index: i32) -> bool;
}

type InitializeFn = unsafe extern "C" fn(bool) -> bool;
type VoidFn = unsafe extern "C" fn();
type UpdateFn = unsafe extern "C" fn() -> bool;
type IndexFn = unsafe extern "C" fn(i32) -> bool;
type GetStateFn = unsafe extern "C" fn(i32) -> *const DiJoyState2Engines;
type ProductNameFn = unsafe extern "C" fn(i32, *mut u16, i32) -> bool;
type ForceFn = unsafe extern "C" fn(i32, i32) -> bool;
type SpringFn = unsafe extern "C" fn(i32, i32, i32, i32) -> bool;

/// [`LogitechApi`] bound to the vendor wrapper library at runtime.
pub struct NativeLogitechApi {
    _library: Library,
    steering_initialize: InitializeFn,
    steering_shutdown: VoidFn,
    update: UpdateFn,
    is_connected: IndexFn,
    get_state: GetStateFn,
    friendly_product_name: ProductNameFn,
    play_constant_force: ForceFn,
    play_damper_force: ForceFn,
    play_spring_force: SpringFn,
    stop_spring_force: IndexFn,
}

impl std::fmt::Debug for NativeLogitechApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLogitechApi").finish_non_exhaustive()
    }
}

impl NativeLogitechApi {
    /// Platform file name of the vendor wrapper (e.g. `LogitechSteeringWheelEnginesWrapper.dll`).
    pub fn default_library() -> PathBuf {
        PathBuf::from(libloading::library_filename(LIBRARY_NAME))
    }

    /// Loads the vendor library and resolves every entry point.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::MissingNativeDependency`] if the library cannot be
    /// opened or lacks one of the expected symbols.
    pub fn load(path: &Path) -> Result<Self, SdkError> {
        // SAFETY: loading runs the library's initializers; the vendor wrapper
        // has no initialization side effects beyond the runtime's own setup.
        let library = unsafe { Library::new(path) }.map_err(|e| missing(path, e))?;

        let api = Self {
            steering_initialize: symbol(&library, path, b"LogiSteeringInitialize\0")?,
            steering_shutdown: symbol(&library, path, b"LogiSteeringShutdown\0")?,
            update: symbol(&library, path, b"LogiUpdate\0")?,
            is_connected: symbol(&library, path, b"LogiIsConnected\0")?,
            get_state: symbol(&library, path, b"LogiGetStateENGINES\0")?,
            friendly_product_name: symbol(&library, path, b"LogiGetFriendlyProductName\0")?,
            play_constant_force: symbol(&library, path, b"LogiPlayConstantForce\0")?,
            play_damper_force: symbol(&library, path, b"LogiPlayDamperForce\0")?,
            play_spring_force: symbol(&library, path, b"LogiPlaySpringForce\0")?,
            stop_spring_force: symbol(&library, path, b"LogiStopSpringForce\0")?,
            _library: library,
        };

        info!("Loaded vendor library {}", path.display());
        Ok(api)
    }
}

fn missing(path: &Path, err: libloading::Error) -> SdkError {
    SdkError::MissingNativeDependency {
        library: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn symbol<T: Copy>(library: &Library, path: &Path, name: &[u8]) -> Result<T, SdkError> {
    // SAFETY: every `T` used with this helper matches the C signature the
    // vendor header declares for `name`. The copied function pointer stays
    // valid because the `Library` is stored next to it.
    unsafe { library.get::<T>(name) }
        .map(|sym| *sym)
        .map_err(|e| missing(path, e))
}

impl LogitechApi for NativeLogitechApi {
    fn steering_initialize(&self, ignore_xinput_controllers: bool) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.steering_initialize)(ignore_xinput_controllers) }
    }

    fn steering_shutdown(&self) {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.steering_shutdown)() }
    }

    fn update(&self) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.update)() }
    }

    fn is_connected(&self, index: i32) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.is_connected)(index) }
    }

    fn get_state(&self, index: i32) -> Option<DiJoyState2Engines> {
        // SAFETY: resolved from the loaded library with the matching signature.
        let ptr = unsafe { (self.get_state)(index) };
        // SAFETY: a non-null pointer refers to the runtime's per-slot state
        // buffer, which lives as long as the runtime; it is copied out at once.
        unsafe { ptr.as_ref() }.copied()
    }

    fn friendly_product_name(&self, index: i32) -> Option<String> {
        let mut buffer = [0u16; PRODUCT_NAME_BUFFER];
        // SAFETY: the buffer is writable for `PRODUCT_NAME_BUFFER` code units
        // and the runtime NUL-terminates within the size it is given.
        let ok = unsafe {
            (self.friendly_product_name)(index, buffer.as_mut_ptr(), PRODUCT_NAME_BUFFER as i32)
        };
        ok.then(|| decode_wide(&buffer))
    }

    fn play_constant_force(&self, index: i32, magnitude_percentage: i32) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.play_constant_force)(index, magnitude_percentage) }
    }

    fn play_damper_force(&self, index: i32, coefficient_percentage: i32) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.play_damper_force)(index, coefficient_percentage) }
    }

    fn play_spring_force(
        &self,
        index: i32,
        offset: i32,
        saturation: i32,
        coefficient: i32,
    ) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.play_spring_force)(index, offset, saturation, coefficient) }
    }

    fn stop_spring_force(&self, index: i32) -> bool {
        // SAFETY: resolved from the loaded library with the matching signature.
        unsafe { (self.stop_spring_force)(index) }
    }
}

/// Decodes a NUL-terminated UTF-16 buffer.
pub fn decode_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}
