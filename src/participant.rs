//! Logical seats that physical wheels are assigned to.

use std::{fmt, str::FromStr};

use anyhow::anyhow;

/// Logical seat/player slot in the simulation.
///
/// The derived ordering is the assignment order: devices discovered at startup
/// go to `A`, then `B`, and so on. `None` is the "unassigned" sentinel and
/// sorts before every seat.
///
/// # Example
///
/// ```
/// use wheel_ffb::participant::ParticipantOrder;
///
/// assert_eq!(ParticipantOrder::first(), ParticipantOrder::A);
/// assert_eq!(ParticipantOrder::A.next(), ParticipantOrder::B);
/// assert_eq!(ParticipantOrder::F.next(), ParticipantOrder::None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParticipantOrder {
    #[default]
    None,
    A,
    B,
    C,
    D,
    E,
    F,
}

impl ParticipantOrder {
    const SEATS: [ParticipantOrder; 6] = [
        ParticipantOrder::A,
        ParticipantOrder::B,
        ParticipantOrder::C,
        ParticipantOrder::D,
        ParticipantOrder::E,
        ParticipantOrder::F,
    ];

    /// All real seats in ascending order (`None` excluded).
    pub fn seats() -> impl Iterator<Item = ParticipantOrder> {
        Self::SEATS.into_iter()
    }

    /// The first seat handed out during assignment.
    pub fn first() -> Self {
        ParticipantOrder::A
    }

    /// Successor seat; `None` once the seats are exhausted.
    pub fn next(self) -> Self {
        match self {
            ParticipantOrder::None => ParticipantOrder::A,
            ParticipantOrder::A => ParticipantOrder::B,
            ParticipantOrder::B => ParticipantOrder::C,
            ParticipantOrder::C => ParticipantOrder::D,
            ParticipantOrder::D => ParticipantOrder::E,
            ParticipantOrder::E => ParticipantOrder::F,
            ParticipantOrder::F => ParticipantOrder::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == ParticipantOrder::None
    }

    /// Keyboard letter bound to this seat for the shift+letter fallbacks.
    pub fn letter(self) -> Option<char> {
        match self {
            ParticipantOrder::None => None,
            ParticipantOrder::A => Some('A'),
            ParticipantOrder::B => Some('B'),
            ParticipantOrder::C => Some('C'),
            ParticipantOrder::D => Some('D'),
            ParticipantOrder::E => Some('E'),
            ParticipantOrder::F => Some('F'),
        }
    }
}

impl fmt::Display for ParticipantOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.letter() {
            Some(letter) => write!(f, "{letter}"),
            None => f.write_str("None"),
        }
    }
}

impl FromStr for ParticipantOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(ParticipantOrder::None);
        }
        let mut chars = trimmed.chars();
        let letter = match (chars.next(), chars.next()) {
            (Some(c), None) => c.to_ascii_uppercase(),
            _ => return Err(anyhow!("Unknown participant '{trimmed}'")),
        };
        Self::seats()
            .find(|seat| seat.letter() == Some(letter))
            .ok_or(anyhow!("Unknown participant '{trimmed}'"))
    }
}
