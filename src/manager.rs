//! Participant-to-wheel assignment, input polling and force arbitration.
//!
//! [`WheelManager`] owns the installed provider and one [`WheelEntry`] per
//! assigned participant. Everything happens inside [`WheelManager::tick`]:
//! deferred startup tasks run, the provider is pumped, every entry is polled
//! and the current force targets are pushed back to the hardware.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    keyboard::{Key, Keyboard, NoKeyboard},
    participant::ParticipantOrder,
    scheduler::Scheduler,
    session::SessionSource,
    wheel_sdk::{SdkError, SteeringWheelSdk, WheelButtons, WheelState},
};

/// Steer/accel value reported for a participant without a device.
pub const NO_DEVICE_INPUT: f32 = -2.0;

/// Engineering range of force targets.
pub const FORCE_INPUT_RANGE: f32 = 10000.0;

/// Magnitude range the provider expects.
pub const FORCE_OUTPUT_RANGE: f32 = 100.0;

const UNKNOWN_PRODUCT: &str = "Unknown";

static MANAGER_ALIVE: AtomicBool = AtomicBool::new(false);

/// Maps a force target from `[-10000, 10000]` onto `[-100, 100]`.
///
/// ```
/// use wheel_ffb::manager::int_remap;
///
/// assert_eq!(int_remap(0.0), 0);
/// assert_eq!(int_remap(10000.0), 100);
/// assert_eq!(int_remap(-10000.0), -100);
/// assert_eq!(int_remap(2500.0), 25);
/// ```
pub fn int_remap(value: f32) -> i32 {
    int_remap_with(
        value,
        -FORCE_INPUT_RANGE,
        FORCE_INPUT_RANGE,
        -FORCE_OUTPUT_RANGE,
        FORCE_OUTPUT_RANGE,
    )
}

/// Linear remap between explicit bounds, truncated toward zero.
pub fn int_remap_with(value: f32, in_low: f32, in_high: f32, out_low: f32, out_high: f32) -> i32 {
    let mapped = (value - in_low) / (in_high - in_low) * (out_high - out_low) + out_low;
    mapped as i32
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManagerError {
    #[error("a WheelManager is already alive in this process")]
    AlreadyExists,
}

/// Tunables of the manager, usually built from [`Config`](crate::config::Config).
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    /// Multiplier applied to every force target before remapping.
    pub ffb_gain: f32,
    /// Delay between device assignment and the first force output.
    pub ffb_settle_delay: Duration,
    /// Wait before a spring-force bring-up starts retrying.
    pub spring_init_delay: Duration,
    pub spring_restart_stop_delay: Duration,
    pub spring_restart_start_delay: Duration,
    /// Spring-force attempts per device before giving up.
    pub spring_max_attempts: u32,
    /// Weight of the previous value in the throttle filter.
    pub throttle_smoothing: f32,
    /// Longest time `tick_with_session` waits for the server before initializing anyway.
    pub session_wait_timeout: Duration,
    /// False on platforms without native wheel support; device work is skipped.
    pub platform_supported: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            ffb_gain: 1.0,
            ffb_settle_delay: Duration::from_millis(500),
            spring_init_delay: Duration::from_secs(1),
            spring_restart_stop_delay: Duration::from_secs(1),
            spring_restart_start_delay: Duration::from_millis(500),
            spring_max_attempts: 150,
            throttle_smoothing: 0.9,
            session_wait_timeout: Duration::from_secs(30),
            platform_supported: !cfg!(target_os = "macos"),
        }
    }
}

/// Lifecycle of a [`WheelManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Initializing,
    /// At least one device is connected.
    Ready,
    /// Initialized, but no device is connected.
    Degraded,
    /// The vendor runtime is missing; ticks do nothing.
    Disabled,
    ShuttingDown,
    ShutDown,
}

/// Progress of the spring-force start sequence of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpringBringUp {
    #[default]
    Idle,
    Pending {
        saturation: i32,
        coefficient: i32,
        attempts: u32,
    },
    Running,
    Abandoned,
}

/// Remapped magnitudes sent to the provider for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForceOutput {
    pub constant: i32,
    pub damper: i32,
    pub spring_offset: i32,
    pub spring_saturation: i32,
    pub spring_coefficient: i32,
}

/// Cached input and force targets of one assigned participant.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelEntry {
    pub device_index: usize,
    pub steer_input: f32,
    pub accel_input: f32,
    /// Smoothed throttle.
    pub gas: f32,
    pub brake: f32,
    pub left_indicator: bool,
    pub right_indicator: bool,
    pub horn: bool,
    pub high_beam: bool,
    pub constant: i32,
    pub damper: i32,
    pub spring_saturation: i32,
    pub spring_coefficient: i32,
    pub ffb_active: bool,
    pub spring: SpringBringUp,
}

impl WheelEntry {
    pub fn new(device_index: usize) -> Self {
        Self {
            device_index,
            steer_input: 0.0,
            accel_input: 0.0,
            gas: 0.0,
            brake: 0.0,
            left_indicator: false,
            right_indicator: false,
            horn: false,
            high_beam: false,
            constant: 0,
            damper: 0,
            spring_saturation: 0,
            spring_coefficient: 0,
            ffb_active: false,
            spring: SpringBringUp::Idle,
        }
    }

    /// Folds one polled state into the cached inputs.
    ///
    /// `smoothing` is the weight kept from the previous throttle value; the
    /// filtered throttle stays within `[0, 1]`.
    pub fn apply_state(&mut self, state: &WheelState, smoothing: f32) {
        self.steer_input = state.steer;
        self.gas = (smoothing * self.gas + (1.0 - smoothing) * state.throttle).clamp(0.0, 1.0);
        self.brake = state.brake;
        self.accel_input = self.gas - self.brake;

        self.left_indicator = state.buttons.contains(WheelButtons::LEFT_INDICATOR);
        self.right_indicator = state.buttons.contains(WheelButtons::RIGHT_INDICATOR);
        self.horn = state.buttons.contains(WheelButtons::HORN);
        self.high_beam = state.buttons.contains(WheelButtons::HIGH_BEAMS);
    }

    /// Provider magnitudes for the current targets.
    ///
    /// An unset (non-positive) spring saturation counts as 1. The spring
    /// coefficient is not scaled by `gain`.
    pub fn force_output(&self, gain: f32) -> ForceOutput {
        let saturation = if self.spring_saturation <= 0 {
            1
        } else {
            self.spring_saturation
        };
        ForceOutput {
            constant: int_remap(self.constant as f32 * gain),
            damper: int_remap(self.damper as f32 * gain),
            spring_offset: 0,
            spring_saturation: int_remap(saturation as f32 * gain),
            spring_coefficient: int_remap(self.spring_coefficient as f32),
        }
    }

    pub fn zero_forces(&mut self) {
        self.constant = 0;
        self.damper = 0;
        self.spring_saturation = 0;
        self.spring_coefficient = 0;
    }
}

/// Outcome of [`WheelManager::switch_steering_wheels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reassignment {
    /// Both participants had entries; they were exchanged whole.
    Swapped { with: ParticipantOrder },
    /// The entry moved over from a participant who is now unassigned.
    Moved { from: ParticipantOrder },
    /// The participant's entry now points at a free device.
    Repointed { previous: usize },
    /// A fresh entry was created for a free device.
    Created,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    EnableForceFeedback,
    StartSpringBringUp { saturation: i32, coefficient: i32 },
    StopSpringForce,
    RestartSpringForce,
}

const TASK_ENABLE_FFB: &str = "enable-force-feedback";
const TASK_SPRING_BRING_UP: &str = "spring-bring-up";
const TASK_SPRING_STOP: &str = "spring-restart-stop";
const TASK_SPRING_RESTART: &str = "spring-restart-start";

/// Owner of the provider and of every participant's wheel entry.
///
/// Only one manager may be alive per process; [`WheelManager::new`] fails with
/// [`ManagerError::AlreadyExists`] while another one exists. Dropping the
/// manager shuts it down and releases the claim.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wheel_ffb::drivers::null::NullSteeringWheelSdk;
/// use wheel_ffb::manager::{ManagerSettings, ManagerState, NO_DEVICE_INPUT, WheelManager};
/// use wheel_ffb::participant::ParticipantOrder;
///
/// let mut manager =
///     WheelManager::new(Box::new(NullSteeringWheelSdk), ManagerSettings::default())?;
/// manager.initialize();
/// manager.tick(Duration::from_millis(16));
///
/// assert_eq!(manager.state(), ManagerState::Degraded);
/// assert_eq!(manager.steer_input(ParticipantOrder::A), NO_DEVICE_INPUT);
/// manager.shutdown();
/// # Ok::<(), wheel_ffb::manager::ManagerError>(())
/// ```
pub struct WheelManager {
    sdk: Box<dyn SteeringWheelSdk>,
    keyboard: Box<dyn Keyboard>,
    settings: ManagerSettings,
    state: ManagerState,
    entries: BTreeMap<ParticipantOrder, WheelEntry>,
    scheduler: Scheduler<Deferred>,
    ffb_armed: bool,
    /// Targets of the latest bring-up that has started, for late entries.
    spring_params: Option<(i32, i32)>,
    session_waited: Duration,
}

impl std::fmt::Debug for WheelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WheelManager")
            .field("sdk", &self.sdk.name())
            .field("state", &self.state)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl WheelManager {
    pub fn new(
        sdk: Box<dyn SteeringWheelSdk>,
        settings: ManagerSettings,
    ) -> Result<Self, ManagerError> {
        if MANAGER_ALIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!("Refusing to create a second WheelManager");
            return Err(ManagerError::AlreadyExists);
        }

        info!("Wheel manager created with provider {}", sdk.name());
        Ok(Self {
            sdk,
            keyboard: Box::new(NoKeyboard),
            settings,
            state: ManagerState::Uninitialized,
            entries: BTreeMap::new(),
            scheduler: Scheduler::new(),
            ffb_armed: false,
            spring_params: None,
            session_waited: Duration::ZERO,
        })
    }

    /// Keyboard used for the shift+letter horn fallback.
    pub fn with_keyboard(mut self, keyboard: Box<dyn Keyboard>) -> Self {
        self.keyboard = keyboard;
        self
    }

    /// True while some manager instance is alive in this process.
    pub fn instance_alive() -> bool {
        MANAGER_ALIVE.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ManagerState::Ready
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &'static str {
        self.sdk.name()
    }

    pub fn ffb_gain(&self) -> f32 {
        self.settings.ffb_gain
    }

    pub fn set_ffb_gain(&mut self, gain: f32) {
        self.settings.ffb_gain = gain;
    }

    /// Replaces the tunables. Changed delays apply to tasks scheduled afterwards.
    pub fn apply_settings(&mut self, settings: ManagerSettings) {
        info!("Wheel manager settings updated (gain {})", settings.ffb_gain);
        self.settings = settings;
    }

    /// Deferred tasks not yet due.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Starts the provider and assigns every connected device.
    ///
    /// Runs once; later calls are ignored. A missing vendor runtime leaves the
    /// manager [`Disabled`](ManagerState::Disabled).
    pub fn initialize(&mut self) {
        if self.state != ManagerState::Uninitialized {
            debug!("Wheel manager already initialized ({:?})", self.state);
            return;
        }
        self.state = ManagerState::Initializing;

        if self.settings.platform_supported {
            match self.sdk.initialize() {
                Ok(()) => info!("{} initialized", self.sdk.name()),
                Err(e @ SdkError::MissingNativeDependency { .. }) => {
                    error!("Wheel support disabled: {}", e);
                    self.state = ManagerState::Disabled;
                    return;
                }
                Err(e @ SdkError::InitializeRejected { .. }) => {
                    warn!("{}; continuing without a started runtime", e);
                }
            }
            self.assign_steering_wheels();
        } else {
            warn!("Steering wheels are not supported on this platform");
        }

        self.init_force_feedback();
        self.init_spring_force(0, 0);

        self.state = if self.connected_device_count() > 0 {
            ManagerState::Ready
        } else {
            ManagerState::Degraded
        };
        info!(
            "Wheel manager {:?} with {} assigned wheel(s)",
            self.state,
            self.entries.len()
        );
    }

    /// Ticks after initializing once the session reports a started server.
    ///
    /// Waiting gives up after [`ManagerSettings::session_wait_timeout`] and
    /// initializes without the session.
    pub fn tick_with_session(&mut self, dt: Duration, session: &dyn SessionSource) {
        if self.state == ManagerState::Uninitialized {
            if session.is_available() && session.server_started() {
                info!("Server started, initializing wheels");
                self.initialize();
            } else {
                self.session_waited += dt;
                if self.session_waited >= self.settings.session_wait_timeout {
                    warn!(
                        "Server did not start within {:?}, initializing wheels anyway",
                        self.settings.session_wait_timeout
                    );
                    self.initialize();
                }
            }
        }
        self.tick(dt);
    }

    /// Advances the manager clock by `dt` and runs one update.
    pub fn tick(&mut self, dt: Duration) {
        for task in self.scheduler.advance(dt) {
            self.run_deferred(task);
        }

        if !matches!(self.state, ManagerState::Ready | ManagerState::Degraded) {
            return;
        }
        if !self.settings.platform_supported {
            return;
        }

        self.sdk.update();
        self.refresh_readiness();
        if self.state == ManagerState::Degraded {
            return;
        }

        self.step_spring_bring_up();
        self.poll_entries();
    }

    fn refresh_readiness(&mut self) {
        let connected = self.connected_device_count() > 0;
        match (self.state, connected) {
            (ManagerState::Ready, false) => {
                warn!("No steering wheel connected");
                self.state = ManagerState::Degraded;
            }
            (ManagerState::Degraded, true) => {
                info!("Steering wheel connected");
                self.state = ManagerState::Ready;
            }
            _ => {}
        }
    }

    fn poll_entries(&mut self) {
        let gain = self.settings.ffb_gain;
        let smoothing = self.settings.throttle_smoothing;
        let sdk = self.sdk.as_mut();

        for (participant, entry) in self.entries.iter_mut() {
            let Some(state) = sdk.try_get_state(entry.device_index) else {
                #[cfg(debug_assertions)]
                {
                    debug!(
                        "No state for participant {} (device {})",
                        participant, entry.device_index
                    );
                }
                continue;
            };
            entry.apply_state(&state, smoothing);

            if entry.ffb_active {
                send_forces(sdk, *participant, entry, gain);
            }
        }
    }

    fn step_spring_bring_up(&mut self) {
        let gain = self.settings.ffb_gain;
        let max_attempts = self.settings.spring_max_attempts;
        let sdk = self.sdk.as_mut();

        for (participant, entry) in self.entries.iter_mut() {
            let SpringBringUp::Pending {
                saturation,
                coefficient,
                attempts,
            } = entry.spring
            else {
                continue;
            };

            let started = sdk.play_spring_force(
                entry.device_index,
                0,
                int_remap(saturation as f32 * gain),
                int_remap(coefficient as f32 * gain),
            );
            let attempts = attempts + 1;
            debug!(
                "Starting spring for participant {}: {} (attempt {})",
                participant, started, attempts
            );

            entry.spring = if started {
                info!("Spring force running for participant {}", participant);
                SpringBringUp::Running
            } else if attempts >= max_attempts {
                warn!(
                    "Could not init spring force for participant {} (device {}) after {} attempts, aborting",
                    participant, entry.device_index, attempts
                );
                SpringBringUp::Abandoned
            } else {
                SpringBringUp::Pending {
                    saturation,
                    coefficient,
                    attempts,
                }
            };
        }
    }

    fn run_deferred(&mut self, task: Deferred) {
        match task {
            Deferred::EnableForceFeedback => {
                self.ffb_armed = true;
                for entry in self.entries.values_mut() {
                    entry.ffb_active = true;
                }
                info!("Force feedback enabled");
            }
            Deferred::StartSpringBringUp {
                saturation,
                coefficient,
            } => {
                self.spring_params = Some((saturation, coefficient));
                for entry in self.entries.values_mut() {
                    entry.spring = SpringBringUp::Pending {
                        saturation,
                        coefficient,
                        attempts: 0,
                    };
                }
            }
            Deferred::StopSpringForce => self.stop_spring_force(),
            Deferred::RestartSpringForce => {
                self.init_spring_force(0, 0);
                self.run_deferred(Deferred::EnableForceFeedback);
            }
        }
    }

    fn assign_steering_wheels(&mut self) {
        let mut participant = ParticipantOrder::first();
        for index in 0..self.sdk.max_controller_count() {
            if !self.sdk.is_connected(index) {
                continue;
            }
            if participant.is_none() {
                warn!("No free participant left for device {}", index);
                break;
            }
            info!(
                "We got the input controller called {}, assigning it to participant {}",
                self.product_name(index),
                participant
            );
            self.entries.insert(participant, WheelEntry::new(index));
            participant = participant.next();
        }
    }

    /// Zeroes every target and arms force feedback after the settle delay.
    fn init_force_feedback(&mut self) {
        for entry in self.entries.values_mut() {
            entry.zero_forces();
        }
        self.scheduler.schedule(
            TASK_ENABLE_FFB,
            self.settings.ffb_settle_delay,
            Deferred::EnableForceFeedback,
        );
    }

    /// Starts a spring-force bring-up for every entry after the initial wait.
    ///
    /// A bring-up that has not started yet is replaced.
    pub fn init_spring_force(&mut self, saturation: i32, coefficient: i32) {
        self.scheduler.cancel(TASK_SPRING_BRING_UP);
        self.scheduler.schedule(
            TASK_SPRING_BRING_UP,
            self.settings.spring_init_delay,
            Deferred::StartSpringBringUp {
                saturation,
                coefficient,
            },
        );
    }

    /// Stops spring force on every device and suspends force output.
    pub fn stop_spring_force(&mut self) {
        self.ffb_armed = false;
        for (participant, entry) in self.entries.iter_mut() {
            entry.ffb_active = false;
            let stopped = self.sdk.stop_spring_force(entry.device_index);
            info!("Stopping spring for participant {}: {}", participant, stopped);
        }
    }

    /// Stops spring force, then brings it back up and re-arms force feedback.
    pub fn restart_spring_force(&mut self) {
        let stop = self.settings.spring_restart_stop_delay;
        let start = stop + self.settings.spring_restart_start_delay;
        let replaced =
            self.scheduler.cancel(TASK_SPRING_STOP) + self.scheduler.cancel(TASK_SPRING_RESTART);
        if replaced > 0 {
            debug!("Spring restart already pending, starting over");
        }
        self.scheduler
            .schedule(TASK_SPRING_STOP, stop, Deferred::StopSpringForce);
        self.scheduler
            .schedule(TASK_SPRING_RESTART, start, Deferred::RestartSpringForce);
    }

    /// Zeroes every force target and suspends force output.
    pub fn cleanup(&mut self) {
        self.ffb_armed = false;
        for entry in self.entries.values_mut() {
            entry.ffb_active = false;
            entry.zero_forces();
        }
    }

    /// Cleans up, drops pending work and stops the provider. Repeat calls are no-ops.
    pub fn shutdown(&mut self) {
        if matches!(
            self.state,
            ManagerState::ShuttingDown | ManagerState::ShutDown
        ) {
            return;
        }
        self.state = ManagerState::ShuttingDown;

        self.cleanup();
        self.scheduler.cancel_all();
        for entry in self.entries.values_mut() {
            entry.spring = SpringBringUp::Idle;
        }
        self.sdk.shutdown();

        self.state = ManagerState::ShutDown;
        info!("Wheel manager shut down");
    }

    /// Maps `new_index` to `participant`, swapping with its current owner.
    pub fn switch_steering_wheels(
        &mut self,
        new_index: usize,
        participant: ParticipantOrder,
    ) -> Reassignment {
        if participant.is_none() {
            return Reassignment::Unchanged;
        }

        let owner = self
            .entries
            .iter()
            .find(|(_, entry)| entry.device_index == new_index)
            .map(|(owner, _)| *owner);

        let outcome = match owner {
            Some(owner) if owner == participant => Reassignment::Unchanged,
            Some(owner) => match self.entries.remove(&participant) {
                Some(own) => {
                    if let Some(theirs) = self.entries.insert(owner, own) {
                        self.entries.insert(participant, theirs);
                    }
                    Reassignment::Swapped { with: owner }
                }
                None => {
                    if let Some(theirs) = self.entries.remove(&owner) {
                        self.entries.insert(participant, theirs);
                    }
                    Reassignment::Moved { from: owner }
                }
            },
            None if new_index < self.sdk.max_controller_count() => {
                match self.entries.get_mut(&participant) {
                    Some(entry) => {
                        let previous = entry.device_index;
                        entry.device_index = new_index;
                        Reassignment::Repointed { previous }
                    }
                    None => {
                        let mut entry = WheelEntry::new(new_index);
                        entry.ffb_active = self.ffb_armed;
                        // Without a pending bring-up, start one for the late entry.
                        if let Some((saturation, coefficient)) = self.spring_params {
                            if !self.scheduler.is_pending(TASK_SPRING_BRING_UP) {
                                entry.spring = SpringBringUp::Pending {
                                    saturation,
                                    coefficient,
                                    attempts: 0,
                                };
                            }
                        }
                        self.entries.insert(participant, entry);
                        Reassignment::Created
                    }
                }
            }
            None => Reassignment::Unchanged,
        };

        if outcome != Reassignment::Unchanged {
            info!(
                "Device {} assigned to participant {}: {:?}",
                new_index, participant, outcome
            );
        }
        outcome
    }

    pub fn set_constant_force(&mut self, force: i32, participant: ParticipantOrder) {
        if let Some(entry) = self.entries.get_mut(&participant) {
            entry.constant = force;
        }
    }

    pub fn set_damper_force(&mut self, force: i32, participant: ParticipantOrder) {
        if let Some(entry) = self.entries.get_mut(&participant) {
            entry.damper = force;
        }
    }

    pub fn set_spring_force(
        &mut self,
        saturation: i32,
        coefficient: i32,
        participant: ParticipantOrder,
    ) {
        if let Some(entry) = self.entries.get_mut(&participant) {
            entry.spring_saturation = saturation;
            entry.spring_coefficient = coefficient;
        }
    }

    pub fn steer_input(&self, participant: ParticipantOrder) -> f32 {
        self.entries
            .get(&participant)
            .map_or(NO_DEVICE_INPUT, |entry| entry.steer_input)
    }

    pub fn accel_input(&self, participant: ParticipantOrder) -> f32 {
        self.entries
            .get(&participant)
            .map_or(NO_DEVICE_INPUT, |entry| entry.accel_input)
    }

    /// Smoothed throttle and brake; `(0, 0)` without a device.
    pub fn accel_brake_input(&self, participant: ParticipantOrder) -> (f32, f32) {
        self.entries
            .get(&participant)
            .map_or((0.0, 0.0), |entry| (entry.gas, entry.brake))
    }

    pub fn left_indicator_input(&self, participant: ParticipantOrder) -> bool {
        self.entries
            .get(&participant)
            .is_some_and(|entry| entry.left_indicator)
    }

    pub fn right_indicator_input(&self, participant: ParticipantOrder) -> bool {
        self.entries
            .get(&participant)
            .is_some_and(|entry| entry.right_indicator)
    }

    /// Horn state; without a device, LeftShift plus the seat letter.
    pub fn horn_button_input(&self, participant: ParticipantOrder) -> bool {
        if let Some(entry) = self.entries.get(&participant) {
            return entry.horn;
        }
        participant.letter().is_some_and(|letter| {
            self.keyboard.is_pressed(Key::LeftShift) && self.keyboard.is_pressed(Key::letter(letter))
        })
    }

    pub fn high_beam_button_input(&self, participant: ParticipantOrder) -> bool {
        self.entries
            .get(&participant)
            .is_some_and(|entry| entry.high_beam)
    }

    pub fn hand_brake_input(&self) -> f32 {
        0.0
    }

    pub fn device_index(&self, participant: ParticipantOrder) -> Option<usize> {
        self.entries.get(&participant).map(|entry| entry.device_index)
    }

    pub fn entry(&self, participant: ParticipantOrder) -> Option<&WheelEntry> {
        self.entries.get(&participant)
    }

    /// Assigned participants in ascending order.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantOrder> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (ParticipantOrder, &WheelEntry)> + '_ {
        self.entries.iter().map(|(participant, entry)| (*participant, entry))
    }

    pub fn product_name(&self, index: usize) -> String {
        self.sdk
            .try_get_product_name(index)
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string())
    }

    pub fn connected_device_count(&self) -> usize {
        (0..self.sdk.max_controller_count())
            .filter(|&index| self.sdk.is_connected(index))
            .count()
    }
}

fn send_forces(
    sdk: &mut dyn SteeringWheelSdk,
    participant: ParticipantOrder,
    entry: &WheelEntry,
    gain: f32,
) {
    let out = entry.force_output(gain);
    let index = entry.device_index;

    let constant = sdk.play_constant_force(index, out.constant);
    let damper = sdk.play_damper_force(index, out.damper);
    let spring = sdk.play_spring_force(
        index,
        out.spring_offset,
        out.spring_saturation,
        out.spring_coefficient,
    );
    if !(constant && damper && spring) {
        debug!(
            "Force command failed for participant {} (constant: {}, damper: {}, spring: {})",
            participant, constant, damper, spring
        );
    }
}

impl Drop for WheelManager {
    fn drop(&mut self) {
        self.shutdown();
        MANAGER_ALIVE.store(false, Ordering::Release);
    }
}
