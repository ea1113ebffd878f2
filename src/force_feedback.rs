//! Self-aligning torque estimate and per-participant force commands.
//!
//! A [`ForceFeedback`] component is bound to one participant, one
//! [`RigidBody`] and the body's wheel contacts. Every tick it estimates the
//! self-aligning torque from the tire contact kinematics and hands a
//! constant/spring/damper triple to the [`WheelManager`], choosing the formula
//! by the session's [`ForceRegime`].

use std::ops::{Add, Mul, Neg, Sub};

#[cfg(debug_assertions)]
use log::debug;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    manager::WheelManager,
    participant::ParticipantOrder,
    session::{ForceRegime, ServerState, regime_of},
};

/// Multiplier from unit torque to force-target units.
pub const FORCE_SCALE: f32 = 10000.0;

/// Constant force pushing the wheel back to center before driving starts.
pub const PRE_DRIVE_CENTERING_FORCE: i32 = (0.25 * FORCE_SCALE) as i32;

/// Steer magnitude below which no centering force is applied.
pub const STEER_DEADZONE: f32 = 0.025;

/// Steer offset used by the pre-drive spring formula.
const PRE_DRIVE_STEER_OFFSET: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Component of `self` along `onto`. Zero for a degenerate `onto`.
    pub fn project(self, onto: Vec3) -> Vec3 {
        let len_sq = onto.length_squared();
        if len_sq <= f32::EPSILON {
            return Vec3::ZERO;
        }
        onto * (self.dot(onto) / len_sq)
    }

    /// `self` with its component along `normal` removed.
    pub fn project_on_plane(self, normal: Vec3) -> Vec3 {
        self - self.project(normal)
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// Ground contact of one wheel, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub forward_dir: Vec3,
    pub sideways_dir: Vec3,
}

/// Physics-engine view of one wheel.
pub trait WheelContact {
    /// Current ground contact; `None` while the wheel is airborne.
    fn ground_hit(&self) -> Option<WheelHit>;
}

/// Physics-engine view of the vehicle body.
pub trait RigidBody {
    /// World-space velocity of the body at `point`.
    fn point_velocity(&self, point: Vec3) -> Vec3;
}

impl WheelContact for Option<WheelHit> {
    fn ground_hit(&self) -> Option<WheelHit> {
        *self
    }
}

/// Tuning of the force model, one set per vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceFeedbackSettings {
    #[serde(default = "defaults::weight_intensity")]
    pub weight_intensity: f32,

    #[serde(default = "defaults::tire_width")]
    pub tire_width: f32,

    #[serde(default)]
    pub spring_saturation: f32,

    #[serde(default)]
    pub spring_coefficient: f32,

    #[serde(default = "defaults::damper_amount")]
    pub damper_amount: i32,
}

impl Default for ForceFeedbackSettings {
    fn default() -> Self {
        Self {
            weight_intensity: defaults::weight_intensity(),
            tire_width: defaults::tire_width(),
            spring_saturation: 0.0,
            spring_coefficient: 0.0,
            damper_amount: defaults::damper_amount(),
        }
    }
}

mod defaults {
    pub fn weight_intensity() -> f32 {
        1.0
    }

    pub fn tire_width() -> f32 {
        0.1
    }

    pub fn damper_amount() -> i32 {
        3000
    }
}

/// Force targets issued for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForceCommand {
    pub constant: i32,
    pub spring_saturation: i32,
    pub spring_coefficient: i32,
    pub damper: i32,
}

/// Sum over grounded wheels of `(0.5 * weight_intensity * slip) / 2`.
///
/// `slip` is the difference of the forward velocity components at the two
/// tire edges (right minus left), measured in the contact plane.
pub fn self_aligning_torque<W: WheelContact>(
    settings: &ForceFeedbackSettings,
    body: &dyn RigidBody,
    wheels: &[W],
) -> f32 {
    wheels
        .iter()
        .filter_map(WheelContact::ground_hit)
        .map(|hit| {
            let half_width = hit.sideways_dir * (settings.tire_width * 0.5);
            let left = hit.point - half_width;
            let right = hit.point + half_width;

            let left_tangent = body.point_velocity(left).project_on_plane(hit.normal);
            let right_tangent = body.point_velocity(right).project_on_plane(hit.normal);

            let slip = hit.forward_dir.dot(right_tangent) - hit.forward_dir.dot(left_tangent);
            (0.5 * settings.weight_intensity * slip) / 2.0
        })
        .sum()
}

/// Force targets for `regime` given the current steer input and torque.
pub fn force_command(
    settings: &ForceFeedbackSettings,
    regime: ForceRegime,
    steer: f32,
    torque: f32,
) -> ForceCommand {
    let spring_coefficient = (settings.spring_coefficient * FORCE_SCALE).round_ties_even() as i32;

    match regime {
        ForceRegime::PreDrive => {
            let constant = if steer > STEER_DEADZONE {
                PRE_DRIVE_CENTERING_FORCE
            } else if steer < -STEER_DEADZONE {
                -PRE_DRIVE_CENTERING_FORCE
            } else {
                0
            };
            ForceCommand {
                constant,
                spring_saturation: (settings.spring_saturation
                    * PRE_DRIVE_STEER_OFFSET.abs()
                    * FORCE_SCALE)
                    .round_ties_even() as i32,
                spring_coefficient,
                damper: settings.damper_amount / 2,
            }
        }
        ForceRegime::Driving => ForceCommand {
            constant: (torque * FORCE_SCALE) as i32,
            spring_saturation: (settings.spring_saturation * torque.abs() * FORCE_SCALE)
                .round_ties_even() as i32,
            spring_coefficient,
            damper: settings.damper_amount,
        },
    }
}

/// Force model of one participant's vehicle.
///
/// # Example
///
/// ```
/// use wheel_ffb::force_feedback::{ForceFeedback, ForceFeedbackSettings, RigidBody, Vec3, WheelHit};
/// use wheel_ffb::participant::ParticipantOrder;
///
/// struct Parked;
/// impl RigidBody for Parked {
///     fn point_velocity(&self, _point: Vec3) -> Vec3 {
///         Vec3::ZERO
///     }
/// }
///
/// let wheels: Vec<Option<WheelHit>> = vec![None; 4];
/// let mut ffb = ForceFeedback::new(ParticipantOrder::A, ForceFeedbackSettings::default(), Parked, wheels);
/// // Without a manager the component disables itself.
/// assert!(!ffb.init(None));
/// ```
pub struct ForceFeedback<B, W> {
    participant: ParticipantOrder,
    settings: ForceFeedbackSettings,
    body: B,
    wheels: Vec<W>,
    ready: bool,
    last_torque: f32,
}

impl<B: RigidBody, W: WheelContact> ForceFeedback<B, W> {
    pub fn new(
        participant: ParticipantOrder,
        settings: ForceFeedbackSettings,
        body: B,
        wheels: Vec<W>,
    ) -> Self {
        Self {
            participant,
            settings,
            body,
            wheels,
            ready: false,
            last_torque: 0.0,
        }
    }

    /// Zeroes the participant's force targets and enables the component.
    ///
    /// Without a manager the component stays disabled and every tick is a
    /// no-op. Returns whether the component is enabled.
    pub fn init(&mut self, manager: Option<&mut WheelManager>) -> bool {
        match manager {
            Some(manager) => {
                manager.set_constant_force(0, self.participant);
                manager.set_damper_force(0, self.participant);
                manager.set_spring_force(0, 0, self.participant);
                self.ready = true;
            }
            None => {
                warn!(
                    "No wheel manager for participant {}, force feedback disabled",
                    self.participant
                );
                self.ready = false;
            }
        }
        self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn participant(&self) -> ParticipantOrder {
        self.participant
    }

    pub fn settings(&self) -> &ForceFeedbackSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ForceFeedbackSettings {
        &mut self.settings
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn wheels_mut(&mut self) -> &mut Vec<W> {
        &mut self.wheels
    }

    /// Torque computed by the latest tick.
    pub fn last_torque(&self) -> f32 {
        self.last_torque
    }

    pub fn self_aligning_torque(&self) -> f32 {
        self_aligning_torque(&self.settings, &self.body, &self.wheels)
    }

    /// Computes this tick's forces and writes them to the manager.
    ///
    /// `server_state` is the session phase; `None` counts as pre-drive.
    pub fn tick(
        &mut self,
        manager: &mut WheelManager,
        server_state: Option<ServerState>,
    ) -> Option<ForceCommand> {
        if !self.ready {
            return None;
        }

        let torque = self.self_aligning_torque();
        self.last_torque = torque;

        let steer = manager.steer_input(self.participant);
        let command = force_command(&self.settings, regime_of(server_state), steer, torque);

        manager.set_constant_force(command.constant, self.participant);
        manager.set_spring_force(
            command.spring_saturation,
            command.spring_coefficient,
            self.participant,
        );
        manager.set_damper_force(command.damper, self.participant);

        #[cfg(debug_assertions)]
        {
            debug!(
                "[{}] torque {:.4} -> {:?}",
                self.participant, torque, command
            );
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ManagerSettings;
    use crate::wheel_sdk::{MockSteeringWheelSdk, WheelButtons, WheelState};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serial_test::serial;
    use std::time::Duration;

    /// Body rotating about the world origin.
    struct Spinning {
        linear: Vec3,
        angular: Vec3,
    }

    impl RigidBody for Spinning {
        fn point_velocity(&self, point: Vec3) -> Vec3 {
            self.linear + self.angular.cross(point)
        }
    }

    fn flat_hit(point: Vec3) -> Option<WheelHit> {
        Some(WheelHit {
            point,
            normal: Vec3::new(0.0, 1.0, 0.0),
            forward_dir: Vec3::new(0.0, 0.0, 1.0),
            sideways_dir: Vec3::new(1.0, 0.0, 0.0),
        })
    }

    fn yawing(rate: f32) -> Spinning {
        Spinning {
            linear: Vec3::new(0.0, 0.0, 10.0),
            angular: Vec3::new(0.0, rate, 0.0),
        }
    }

    #[test]
    fn vector_helpers() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.dot(Vec3::new(4.0, -5.0, 6.0)), 12.0);
        assert_eq!(v.project(Vec3::new(0.0, 2.0, 0.0)), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(v.project_on_plane(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(v.project(Vec3::ZERO), Vec3::ZERO);
        assert_eq!(
            Vec3::new(1.0, 0.0, 0.0).cross(Vec3::new(0.0, 1.0, 0.0)),
            Vec3::new(0.0, 0.0, 1.0)
        );
        assert_eq!(-v + v, Vec3::ZERO);
    }

    #[test]
    fn straight_motion_has_no_torque() {
        let body = Spinning {
            linear: Vec3::new(0.0, -1.0, 15.0),
            angular: Vec3::ZERO,
        };
        let wheels = vec![flat_hit(Vec3::new(-0.8, 0.0, 1.2)), flat_hit(Vec3::new(0.8, 0.0, 1.2))];
        let torque = self_aligning_torque(&ForceFeedbackSettings::default(), &body, &wheels);
        assert_eq!(torque, 0.0);
    }

    #[test]
    fn yaw_produces_width_proportional_torque() {
        // forward velocity at x is 10 - rate * x, so slip = -rate * tire_width.
        let settings = ForceFeedbackSettings::default();
        let wheels = vec![flat_hit(Vec3::new(1.0, 0.0, 0.0))];
        let torque = self_aligning_torque(&settings, &yawing(2.0), &wheels);
        assert!((torque - (-0.05)).abs() < 1e-5, "torque {torque}");

        let wide = ForceFeedbackSettings {
            tire_width: 0.2,
            weight_intensity: 2.0,
            ..Default::default()
        };
        let torque = self_aligning_torque(&wide, &yawing(2.0), &wheels);
        assert!((torque - (-0.2)).abs() < 1e-5, "torque {torque}");
    }

    #[test]
    fn airborne_wheels_are_skipped() {
        let settings = ForceFeedbackSettings::default();
        let grounded = vec![flat_hit(Vec3::new(1.0, 0.0, 0.0))];
        let mixed = vec![None, flat_hit(Vec3::new(1.0, 0.0, 0.0)), None];
        assert_eq!(
            self_aligning_torque(&settings, &yawing(1.0), &grounded),
            self_aligning_torque(&settings, &yawing(1.0), &mixed)
        );
        let airborne: Vec<Option<WheelHit>> = vec![None; 4];
        assert_eq!(self_aligning_torque(&settings, &yawing(1.0), &airborne), 0.0);
    }

    #[test]
    fn normal_component_is_ignored() {
        let settings = ForceFeedbackSettings::default();
        let wheels = vec![flat_hit(Vec3::new(1.0, 0.0, 0.0))];
        let bouncing = Spinning {
            linear: Vec3::new(0.0, 5.0, 10.0),
            angular: Vec3::new(0.0, 2.0, 0.0),
        };
        let a = self_aligning_torque(&settings, &bouncing, &wheels);
        let b = self_aligning_torque(&settings, &yawing(2.0), &wheels);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn pre_drive_centers_outside_deadzone() {
        let settings = ForceFeedbackSettings {
            spring_saturation: 0.4,
            spring_coefficient: 0.3,
            ..Default::default()
        };
        let cmd = |steer| force_command(&settings, ForceRegime::PreDrive, steer, 0.7);

        assert_eq!(cmd(0.5).constant, 2500);
        assert_eq!(cmd(-0.03).constant, -2500);
        assert_eq!(cmd(0.025).constant, 0);
        assert_eq!(cmd(-0.025).constant, 0);
        assert_eq!(
            cmd(0.0),
            ForceCommand {
                constant: 0,
                spring_saturation: 0,
                spring_coefficient: 3000,
                damper: 1500,
            }
        );
    }

    #[test]
    fn pre_drive_damper_uses_integer_halving() {
        let settings = ForceFeedbackSettings {
            damper_amount: 3001,
            ..Default::default()
        };
        assert_eq!(
            force_command(&settings, ForceRegime::PreDrive, 0.0, 0.0).damper,
            1500
        );
    }

    #[test]
    fn driving_follows_torque() {
        let settings = ForceFeedbackSettings {
            spring_saturation: 0.5,
            spring_coefficient: 0.25,
            ..Default::default()
        };
        assert_eq!(
            force_command(&settings, ForceRegime::Driving, 0.5, -0.125),
            ForceCommand {
                constant: -1250,
                spring_saturation: 625,
                spring_coefficient: 2500,
                damper: 3000,
            }
        );
    }

    #[test]
    fn spring_terms_round_instead_of_truncating() {
        let settings = ForceFeedbackSettings {
            spring_saturation: 0.5,
            spring_coefficient: 0.000_07,
            ..Default::default()
        };
        let cmd = force_command(&settings, ForceRegime::Driving, 0.0, -0.000_13);
        assert_eq!(cmd.spring_saturation, 1);
        assert_eq!(cmd.spring_coefficient, 1);
        assert_eq!(cmd.constant, -1);
    }

    proptest! {
        #[test]
        fn pre_drive_constant_is_bounded(steer in -1.0f32..=1.0) {
            let cmd = force_command(&ForceFeedbackSettings::default(), ForceRegime::PreDrive, steer, 0.0);
            prop_assert!([-2500, 0, 2500].contains(&cmd.constant));
            prop_assert_eq!(cmd.constant.signum(), if steer.abs() > STEER_DEADZONE { steer.signum() as i32 } else { 0 });
            prop_assert_eq!(cmd.spring_saturation, 0);
        }

        #[test]
        fn driving_constant_is_odd_in_torque(torque in -1.0f32..1.0) {
            let settings = ForceFeedbackSettings::default();
            let pos = force_command(&settings, ForceRegime::Driving, 0.0, torque);
            let neg = force_command(&settings, ForceRegime::Driving, 0.0, -torque);
            prop_assert_eq!(pos.constant, -neg.constant);
            prop_assert_eq!(pos.spring_saturation, neg.spring_saturation);
        }
    }

    fn steering_manager(steer: f32) -> WheelManager {
        let mut sdk = MockSteeringWheelSdk::new();
        sdk.expect_name().return_const("Scripted");
        sdk.expect_initialize().returning(|| Ok(()));
        sdk.expect_max_controller_count().return_const(1usize);
        sdk.expect_is_connected().return_const(true);
        sdk.expect_try_get_product_name().returning(|_| None);
        sdk.expect_update().return_const(());
        sdk.expect_try_get_state()
            .returning(move |_| Some(WheelState::new(steer, 0.0, 0.0, WheelButtons::empty())));
        sdk.expect_play_constant_force().return_const(true);
        sdk.expect_play_damper_force().return_const(true);
        sdk.expect_play_spring_force().return_const(true);
        sdk.expect_shutdown().return_const(());

        let mut manager = WheelManager::new(Box::new(sdk), ManagerSettings::default()).unwrap();
        manager.initialize();
        manager.tick(Duration::from_millis(16));
        manager
    }

    #[test]
    #[serial]
    fn init_without_manager_disables() {
        let mut ffb = ForceFeedback::new(
            ParticipantOrder::A,
            ForceFeedbackSettings::default(),
            yawing(1.0),
            vec![flat_hit(Vec3::ZERO)],
        );
        assert!(!ffb.init(None));
        let mut manager = steering_manager(0.0);
        assert_eq!(ffb.tick(&mut manager, Some(ServerState::Interact)), None);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().constant, 0);
    }

    #[test]
    #[serial]
    fn init_zeroes_participant_targets() {
        let mut manager = steering_manager(0.0);
        manager.set_constant_force(900, ParticipantOrder::A);
        manager.set_spring_force(1, 2, ParticipantOrder::A);

        let mut ffb = ForceFeedback::new(
            ParticipantOrder::A,
            ForceFeedbackSettings::default(),
            yawing(0.0),
            Vec::<Option<WheelHit>>::new(),
        );
        assert!(ffb.init(Some(&mut manager)));

        let entry = manager.entry(ParticipantOrder::A).unwrap();
        assert_eq!((entry.constant, entry.damper), (0, 0));
        assert_eq!((entry.spring_saturation, entry.spring_coefficient), (0, 0));
    }

    #[test]
    #[serial]
    fn regime_flip_switches_constant_force_next_tick() {
        let mut manager = steering_manager(0.5);
        assert_eq!(manager.steer_input(ParticipantOrder::A), 0.5);

        let mut ffb = ForceFeedback::new(
            ParticipantOrder::A,
            ForceFeedbackSettings::default(),
            yawing(2.0),
            vec![flat_hit(Vec3::new(1.0, 0.0, 0.0)), flat_hit(Vec3::new(-1.0, 0.0, 0.0))],
        );
        assert!(ffb.init(Some(&mut manager)));

        let lobby = ffb.tick(&mut manager, Some(ServerState::WaitingRoom)).unwrap();
        assert_eq!(lobby.constant, 2500);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().constant, 2500);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().damper, 1500);

        manager.tick(Duration::from_millis(16));
        let driving = ffb.tick(&mut manager, Some(ServerState::Interact)).unwrap();
        let expected = (ffb.last_torque() * FORCE_SCALE) as i32;
        assert_eq!(driving.constant, expected);
        assert!((driving.constant - (-1000)).abs() <= 1, "constant {}", driving.constant);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().constant, expected);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().damper, 3000);
    }

    #[test]
    #[serial]
    fn missing_session_state_counts_as_pre_drive() {
        let mut manager = steering_manager(-0.9);
        let mut ffb = ForceFeedback::new(
            ParticipantOrder::A,
            ForceFeedbackSettings::default(),
            yawing(3.0),
            vec![flat_hit(Vec3::ZERO)],
        );
        ffb.init(Some(&mut manager));
        assert_eq!(ffb.tick(&mut manager, None).unwrap().constant, -2500);
    }
}
