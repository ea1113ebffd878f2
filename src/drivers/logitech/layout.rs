use serde::{Deserialize, Serialize};

use super::native::{BUTTON_COUNT, DiJoyState2Engines};
use crate::wheel_sdk::{WheelButtons, WheelState, any_pressed, normalize_pedal, normalize_steer};

/// Raw button indices that make up each logical button.
///
/// A logical button is pressed when any of its raw indices is pressed. The
/// table is plain data so a wheel with a different face plate only needs a new
/// layout (see the `buttons` key of the `logitech` provider config).
///
/// # Example
///
/// ```
/// use wheel_ffb::drivers::logitech::layout::ButtonLayout;
/// use wheel_ffb::wheel_sdk::WheelButtons;
///
/// let layout = ButtonLayout::logitech_default();
/// let mut raw = [0u8; 128];
/// raw[6] = 0x80;
/// assert_eq!(layout.decode(&raw), WheelButtons::HIGH_BEAMS);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLayout {
    #[serde(default)]
    pub horn: Vec<usize>,

    #[serde(default)]
    pub high_beams: Vec<usize>,

    #[serde(default)]
    pub select: Vec<usize>,

    #[serde(default)]
    pub left_indicator: Vec<usize>,

    #[serde(default)]
    pub right_indicator: Vec<usize>,
}

impl ButtonLayout {
    /// Face-plate layout of the Logitech G-series wheels.
    pub fn logitech_default() -> Self {
        Self {
            horn: vec![0, 1, 2, 3, 7, 11, 23],
            high_beams: vec![6, 10],
            select: vec![],
            left_indicator: vec![5],
            right_indicator: vec![4],
        }
    }

    fn entries(&self) -> [(WheelButtons, &[usize]); 5] {
        [
            (WheelButtons::HORN, &self.horn),
            (WheelButtons::HIGH_BEAMS, &self.high_beams),
            (WheelButtons::SELECT, &self.select),
            (WheelButtons::LEFT_INDICATOR, &self.left_indicator),
            (WheelButtons::RIGHT_INDICATOR, &self.right_indicator),
        ]
    }

    pub fn decode(&self, raw: &[u8]) -> WheelButtons {
        self.entries()
            .into_iter()
            .filter(|(_, indices)| any_pressed(raw, indices))
            .fold(WheelButtons::empty(), |acc, (button, _)| acc | button)
    }

    /// Converts a raw vendor state into a [`WheelState`].
    pub fn decode_state(&self, raw: &DiJoyState2Engines) -> WheelState {
        WheelState::new(
            normalize_steer(raw.l_x),
            normalize_pedal(raw.l_y),
            normalize_pedal(raw.l_rz),
            self.decode(&raw.rgb_buttons),
        )
    }

    /// Largest raw index referenced by the layout, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.entries()
            .into_iter()
            .flat_map(|(_, indices)| indices.iter().copied())
            .max()
    }

    /// Checks that every index addresses the vendor button array.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.max_index() {
            Some(idx) if idx >= BUTTON_COUNT => Err(anyhow::anyhow!(
                "Button index {idx} exceeds the {BUTTON_COUNT} buttons reported by the device"
            )),
            _ => Ok(()),
        }
    }
}

impl Default for ButtonLayout {
    fn default() -> Self {
        Self::logitech_default()
    }
}
