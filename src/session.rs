//! High-level session state consumed from the networking layer.

use std::{fmt, str::FromStr};

/// Server phase as reported by the session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServerState {
    #[default]
    Default,
    WaitingRoom,
    Interact,
    Questions,
    PostQuestions,
    Loading,
}

/// Force-feedback behaviour selected by the session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceRegime {
    /// Lobby and questionnaire phases: centering from steer input only.
    PreDrive,
    /// Everything else: forces follow the self-aligning torque.
    Driving,
}

impl ServerState {
    pub const ALL: [ServerState; 6] = [
        ServerState::Default,
        ServerState::WaitingRoom,
        ServerState::Interact,
        ServerState::Questions,
        ServerState::PostQuestions,
        ServerState::Loading,
    ];

    pub fn regime(self) -> ForceRegime {
        match self {
            ServerState::WaitingRoom | ServerState::Questions => ForceRegime::PreDrive,
            _ => ForceRegime::Driving,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ServerState::Default => "default",
            ServerState::WaitingRoom => "waiting-room",
            ServerState::Interact => "interact",
            ServerState::Questions => "questions",
            ServerState::PostQuestions => "post-questions",
            ServerState::Loading => "loading",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ServerState::ALL
            .into_iter()
            .find(|state| state.as_str() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown server state '{}'", s))
    }
}

/// Read-only view of the networking layer.
pub trait SessionSource {
    /// The networking subsystem exists and can be queried.
    fn is_available(&self) -> bool;

    /// The server has reported that it started.
    fn server_started(&self) -> bool;

    /// Current server phase, if the session layer publishes one.
    fn server_state(&self) -> Option<ServerState>;
}

/// Settable [`SessionSource`] for harnesses and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    pub available: bool,
    pub started: bool,
    pub state: Option<ServerState>,
}

impl StaticSession {
    /// A session that is up and in `state`.
    pub fn running(state: ServerState) -> Self {
        Self {
            available: true,
            started: true,
            state: Some(state),
        }
    }

    pub fn set_state(&mut self, state: ServerState) {
        self.state = Some(state);
    }
}

impl SessionSource for StaticSession {
    fn is_available(&self) -> bool {
        self.available
    }

    fn server_started(&self) -> bool {
        self.available && self.started
    }

    fn server_state(&self) -> Option<ServerState> {
        self.state
    }
}

/// Regime for a possibly missing session state. No state means pre-drive.
pub fn regime_of(state: Option<ServerState>) -> ForceRegime {
    state.map_or(ForceRegime::PreDrive, ServerState::regime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_lobby_and_questions_are_pre_drive() {
        let pre_drive: Vec<_> = ServerState::ALL
            .into_iter()
            .filter(|s| s.regime() == ForceRegime::PreDrive)
            .collect();
        assert_eq!(pre_drive, vec![ServerState::WaitingRoom, ServerState::Questions]);
    }

    #[test]
    fn missing_state_is_pre_drive() {
        assert_eq!(regime_of(None), ForceRegime::PreDrive);
        assert_eq!(regime_of(Some(ServerState::Interact)), ForceRegime::Driving);
    }

    #[test]
    fn parse_accepts_display_and_snake_case() {
        for state in ServerState::ALL {
            assert_eq!(state.to_string().parse::<ServerState>().unwrap(), state);
        }
        assert_eq!(
            "WAITING_ROOM".parse::<ServerState>().unwrap(),
            ServerState::WaitingRoom
        );
        assert!("lobby".parse::<ServerState>().is_err());
    }

    #[test]
    fn static_session_requires_availability_to_start() {
        let mut session = StaticSession {
            started: true,
            ..Default::default()
        };
        assert!(!session.server_started());
        session.available = true;
        assert!(session.server_started());
        assert_eq!(session.server_state(), None);
        session.set_state(ServerState::Loading);
        assert_eq!(session.server_state(), Some(ServerState::Loading));
    }
}
