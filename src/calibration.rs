//! Headless model of the operator calibration panel.
//!
//! The panel is only shown in the waiting room. It offers one row per seat
//! with the device index currently assigned to it. Editing the index text
//! reassigns the device directly. Selecting a seat as the target and pressing
//! the horn on any wheel assigns that wheel to the target.

use log::{info, warn};

use crate::{
    manager::{Reassignment, WheelManager},
    participant::ParticipantOrder,
    session::ServerState,
};

/// Widest index the text field accepts.
pub const INDEX_FIELD_MAX_LEN: usize = 2;

/// One seat of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationRow {
    pub participant: ParticipantOrder,
    /// Assigned device index, empty when the seat has no wheel.
    pub index_text: String,
}

/// What the panel shows this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationView {
    /// Waiting for a horn press to pick the wheel for `target`.
    Prompt {
        target: ParticipantOrder,
        text: String,
    },
    Rows(Vec<CalibrationRow>),
}

#[derive(Debug, Default)]
pub struct CalibrationPanel {
    target: ParticipantOrder,
}

impl CalibrationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat waiting for a horn press, if any.
    pub fn target(&self) -> Option<ParticipantOrder> {
        (!self.target.is_none()).then_some(self.target)
    }

    /// Starts waiting for a horn press for `participant`. `None` cancels.
    pub fn select_target(&mut self, participant: ParticipantOrder) {
        self.target = participant;
        if !participant.is_none() {
            info!("Calibration: press a button for {}", participant);
        }
    }

    /// Parses `text` as a device index and assigns it to `participant`.
    ///
    /// Text that is empty, longer than [`INDEX_FIELD_MAX_LEN`] or not a number
    /// is ignored.
    pub fn edit_index(
        &mut self,
        manager: &mut WheelManager,
        participant: ParticipantOrder,
        text: &str,
    ) -> Option<Reassignment> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > INDEX_FIELD_MAX_LEN {
            return None;
        }
        match text.parse::<usize>() {
            Ok(index) => Some(manager.switch_steering_wheels(index, participant)),
            Err(e) => {
                warn!("Ignoring device index '{}': {}", text, e);
                None
            }
        }
    }

    /// Assigns the first wheel with its horn pressed to the target seat.
    ///
    /// Only acts in the waiting room and while a target is selected; the
    /// target clears once a wheel has been picked.
    pub fn poll(
        &mut self,
        manager: &mut WheelManager,
        state: Option<ServerState>,
    ) -> Option<Reassignment> {
        if state != Some(ServerState::WaitingRoom) {
            return None;
        }
        let target = self.target()?;

        let index = manager
            .entries()
            .find(|(_, entry)| entry.horn)
            .map(|(_, entry)| entry.device_index)?;

        let outcome = manager.switch_steering_wheels(index, target);
        info!("Calibration: device {} picked for {}", index, target);
        self.target = ParticipantOrder::None;
        Some(outcome)
    }

    /// The current view, or `None` outside the waiting room.
    pub fn render(
        &self,
        manager: &WheelManager,
        state: Option<ServerState>,
    ) -> Option<CalibrationView> {
        if state != Some(ServerState::WaitingRoom) {
            return None;
        }
        if let Some(target) = self.target() {
            return Some(CalibrationView::Prompt {
                target,
                text: format!("Press a button for {target}"),
            });
        }

        let rows = ParticipantOrder::seats()
            .map(|participant| CalibrationRow {
                participant,
                index_text: manager
                    .device_index(participant)
                    .map(|index| index.to_string())
                    .unwrap_or_default(),
            })
            .collect();
        Some(CalibrationView::Rows(rows))
    }
}
