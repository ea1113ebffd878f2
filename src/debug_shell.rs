//! Development harness that reads one participant's inputs every tick.

use std::{fmt, str::FromStr};

use anyhow::{Context, anyhow, bail};
use log::info;

use crate::{
    force_feedback::{RigidBody, Vec3},
    manager::WheelManager,
    participant::ParticipantOrder,
    session::ServerState,
};

/// Constant force sent while the FFB test trigger is held.
pub const FFB_TEST_FORCE: i32 = 5000;

/// Edge-triggered operator inputs for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugTriggers {
    /// Log the current input line.
    pub log: bool,
    pub ffb_pressed: bool,
    pub ffb_released: bool,
}

/// Accessor values of one participant at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSnapshot {
    pub participant: ParticipantOrder,
    pub steer: f32,
    pub accel: f32,
    pub left_indicator: bool,
    pub right_indicator: bool,
    pub horn: bool,
    pub high_beam: bool,
}

impl fmt::Display for InputSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Steer: {:.2} | Accel: {:.2} | L:{} R:{} Horn:{} HB:{}",
            self.participant,
            self.steer,
            self.accel,
            self.left_indicator,
            self.right_indicator,
            self.horn,
            self.high_beam
        )
    }
}

/// One line typed into the harness console.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Log,
    Ffb(bool),
    State(ServerState),
    Target(ParticipantOrder),
    Index(ParticipantOrder, String),
    Gain(f32),
    Restart,
    StopSpring,
    Status,
    Reload,
    Save,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            bail!("Empty command");
        };
        let args: Vec<&str> = words.collect();

        let command = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("log", []) => ShellCommand::Log,
            ("ffb", ["on"]) => ShellCommand::Ffb(true),
            ("ffb", ["off"]) => ShellCommand::Ffb(false),
            ("state", [state]) => ShellCommand::State(state.parse()?),
            ("target", [participant]) => ShellCommand::Target(participant.parse()?),
            ("index", [participant, text]) => {
                ShellCommand::Index(participant.parse()?, (*text).to_string())
            }
            ("gain", [value]) => ShellCommand::Gain(
                value
                    .parse()
                    .with_context(|| format!("Invalid gain '{value}'"))?,
            ),
            ("restart", []) => ShellCommand::Restart,
            ("stop-spring", []) => ShellCommand::StopSpring,
            ("status", []) => ShellCommand::Status,
            ("reload", []) => ShellCommand::Reload,
            ("save", []) => ShellCommand::Save,
            ("quit" | "exit", []) => ShellCommand::Quit,
            _ => return Err(anyhow!("Unknown command '{}'", line.trim())),
        };
        Ok(command)
    }
}

impl ShellCommand {
    /// Triggers for the next [`DebugShell::tick`], if the command is one.
    pub fn triggers(&self) -> Option<DebugTriggers> {
        match self {
            ShellCommand::Log => Some(DebugTriggers {
                log: true,
                ..Default::default()
            }),
            ShellCommand::Ffb(on) => Some(DebugTriggers {
                ffb_pressed: *on,
                ffb_released: !*on,
                ..Default::default()
            }),
            _ => None,
        }
    }
}

/// Vehicle body at rest, for driving the force model without a simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StationaryBody;

impl RigidBody for StationaryBody {
    fn point_velocity(&self, _point: Vec3) -> Vec3 {
        Vec3::ZERO
    }
}

#[derive(Debug, Clone)]
pub struct DebugShell {
    participant: ParticipantOrder,
    log_every_frame: bool,
    ffb_test_held: bool,
}

impl DebugShell {
    pub fn new(participant: ParticipantOrder, log_every_frame: bool) -> Self {
        Self {
            participant,
            log_every_frame,
            ffb_test_held: false,
        }
    }

    pub fn participant(&self) -> ParticipantOrder {
        self.participant
    }

    /// Initializes the manager without waiting for a session.
    pub fn start(&self, manager: &mut WheelManager) {
        manager.initialize();
    }

    pub fn snapshot(&self, manager: &WheelManager) -> InputSnapshot {
        let participant = self.participant;
        InputSnapshot {
            participant,
            steer: manager.steer_input(participant),
            accel: manager.accel_input(participant),
            left_indicator: manager.left_indicator_input(participant),
            right_indicator: manager.right_indicator_input(participant),
            horn: manager.horn_button_input(participant),
            high_beam: manager.high_beam_button_input(participant),
        }
    }

    pub fn ffb_test_held(&self) -> bool {
        self.ffb_test_held
    }

    /// Reads the inputs and applies this tick's triggers.
    ///
    /// While the FFB test is held the test force is re-issued every tick, so
    /// it wins over targets written earlier in the same tick.
    pub fn tick(&mut self, manager: &mut WheelManager, triggers: DebugTriggers) -> InputSnapshot {
        let snapshot = self.snapshot(manager);
        if triggers.log || self.log_every_frame {
            info!("{}", snapshot);
        }

        if triggers.ffb_pressed {
            info!("FFB test ON");
            self.ffb_test_held = true;
        }
        if triggers.ffb_released {
            info!("FFB test OFF");
            self.ffb_test_held = false;
            manager.set_constant_force(0, self.participant);
        }
        if self.ffb_test_held {
            manager.set_constant_force(FFB_TEST_FORCE, self.participant);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::null::NullSteeringWheelSdk;
    use crate::manager::{ManagerSettings, ManagerState, NO_DEVICE_INPUT};
    use crate::wheel_sdk::{MockSteeringWheelSdk, WheelButtons, WheelState};
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::time::Duration;

    #[test]
    fn parses_console_commands() {
        assert_eq!("log".parse::<ShellCommand>().unwrap(), ShellCommand::Log);
        assert_eq!("FFB on".parse::<ShellCommand>().unwrap(), ShellCommand::Ffb(true));
        assert_eq!(
            "state waiting_room".parse::<ShellCommand>().unwrap(),
            ShellCommand::State(ServerState::WaitingRoom)
        );
        assert_eq!(
            "target none".parse::<ShellCommand>().unwrap(),
            ShellCommand::Target(ParticipantOrder::None)
        );
        assert_eq!(
            "index b 3".parse::<ShellCommand>().unwrap(),
            ShellCommand::Index(ParticipantOrder::B, "3".to_string())
        );
        assert_eq!("gain 0.5".parse::<ShellCommand>().unwrap(), ShellCommand::Gain(0.5));
        assert_eq!("exit".parse::<ShellCommand>().unwrap(), ShellCommand::Quit);
        assert_eq!("reload".parse::<ShellCommand>().unwrap(), ShellCommand::Reload);
        assert_eq!("save".parse::<ShellCommand>().unwrap(), ShellCommand::Save);

        for bad in ["", "ffb", "ffb maybe", "state parked", "gain loud", "index a"] {
            assert!(bad.parse::<ShellCommand>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn only_log_and_ffb_produce_triggers() {
        let off = ShellCommand::Ffb(false).triggers().unwrap();
        assert!(off.ffb_released && !off.ffb_pressed);
        assert!(ShellCommand::Log.triggers().unwrap().log);
        assert_eq!(ShellCommand::Restart.triggers(), None);
    }

    #[test]
    fn snapshot_line_format() {
        let snapshot = InputSnapshot {
            participant: ParticipantOrder::A,
            steer: 0.5,
            accel: 0.1,
            left_indicator: false,
            right_indicator: true,
            horn: false,
            high_beam: true,
        };
        assert_eq!(
            snapshot.to_string(),
            "[A] Steer: 0.50 | Accel: 0.10 | L:false R:true Horn:false HB:true"
        );
    }

    #[test]
    #[serial]
    fn unassigned_snapshot_shows_sentinels() {
        let mut manager =
            WheelManager::new(Box::new(NullSteeringWheelSdk), ManagerSettings::default()).unwrap();
        let mut shell = DebugShell::new(ParticipantOrder::B, true);
        shell.start(&mut manager);
        assert_eq!(manager.state(), ManagerState::Degraded);

        let snapshot = shell.tick(&mut manager, DebugTriggers::default());
        assert_eq!(snapshot.steer, NO_DEVICE_INPUT);
        assert_eq!(
            snapshot.to_string(),
            "[B] Steer: -2.00 | Accel: -2.00 | L:false R:false Horn:false HB:false"
        );
    }

    #[test]
    #[serial]
    fn ffb_trigger_sets_and_clears_test_force() {
        let mut sdk = MockSteeringWheelSdk::new();
        sdk.expect_name().return_const("Scripted");
        sdk.expect_initialize().returning(|| Ok(()));
        sdk.expect_max_controller_count().return_const(1usize);
        sdk.expect_is_connected().return_const(true);
        sdk.expect_try_get_product_name()
            .returning(|_| Some("G920".to_string()));
        sdk.expect_update().return_const(());
        sdk.expect_try_get_state()
            .returning(|_| Some(WheelState::new(0.5, 0.0, 0.0, WheelButtons::HIGH_BEAMS)));
        sdk.expect_shutdown().return_const(());

        let mut manager = WheelManager::new(Box::new(sdk), ManagerSettings::default()).unwrap();
        let mut shell = DebugShell::new(ParticipantOrder::A, false);
        shell.start(&mut manager);
        manager.tick(Duration::from_millis(16));

        let pressed = DebugTriggers {
            ffb_pressed: true,
            ..Default::default()
        };
        let snapshot = shell.tick(&mut manager, pressed);
        assert_eq!(snapshot.steer, 0.5);
        assert!(snapshot.high_beam);
        assert_eq!(
            manager.entry(ParticipantOrder::A).unwrap().constant,
            FFB_TEST_FORCE
        );

        let released = DebugTriggers {
            ffb_released: true,
            ..Default::default()
        };
        shell.tick(&mut manager, released);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().constant, 0);
    }

    #[test]
    #[serial]
    fn held_test_force_wins_over_force_model() {
        use crate::force_feedback::{ForceFeedback, ForceFeedbackSettings, WheelHit};

        let mut sdk = MockSteeringWheelSdk::new();
        sdk.expect_name().return_const("Scripted");
        sdk.expect_initialize().returning(|| Ok(()));
        sdk.expect_max_controller_count().return_const(1usize);
        sdk.expect_is_connected().return_const(true);
        sdk.expect_try_get_product_name().returning(|_| None);
        sdk.expect_update().return_const(());
        sdk.expect_try_get_state()
            .returning(|_| Some(WheelState::new(0.5, 0.0, 0.0, WheelButtons::empty())));
        sdk.expect_shutdown().return_const(());

        let mut manager = WheelManager::new(Box::new(sdk), ManagerSettings::default()).unwrap();
        let mut shell = DebugShell::new(ParticipantOrder::A, false);
        shell.start(&mut manager);
        manager.tick(Duration::from_millis(16));

        let wheels: Vec<Option<WheelHit>> = vec![None; 4];
        let mut model = ForceFeedback::new(
            ParticipantOrder::A,
            ForceFeedbackSettings::default(),
            StationaryBody,
            wheels,
        );
        assert!(model.init(Some(&mut manager)));
        let lobby = Some(ServerState::WaitingRoom);

        model.tick(&mut manager, lobby);
        shell.tick(
            &mut manager,
            DebugTriggers {
                ffb_pressed: true,
                ..Default::default()
            },
        );
        assert!(shell.ffb_test_held());

        model.tick(&mut manager, lobby);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().constant, 2500);
        shell.tick(&mut manager, DebugTriggers::default());
        assert_eq!(
            manager.entry(ParticipantOrder::A).unwrap().constant,
            FFB_TEST_FORCE
        );

        shell.tick(
            &mut manager,
            DebugTriggers {
                ffb_released: true,
                ..Default::default()
            },
        );
        model.tick(&mut manager, lobby);
        assert_eq!(manager.entry(ParticipantOrder::A).unwrap().constant, 2500);
    }

    #[test]
    fn stationary_body_has_no_velocity() {
        assert_eq!(StationaryBody.point_velocity(Vec3::new(1.0, 2.0, 3.0)), Vec3::ZERO);
    }
}
