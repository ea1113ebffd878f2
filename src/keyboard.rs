//! Keyboard state consumed for keyboard-only fallbacks.

/// Keys the crate has a use for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    LeftShift,
    /// An ASCII letter, stored uppercase.
    Letter(char),
}

impl Key {
    pub fn letter(c: char) -> Self {
        Key::Letter(c.to_ascii_uppercase())
    }
}

/// Read-only view of the host keyboard.
pub trait Keyboard: Send {
    fn is_pressed(&self, key: Key) -> bool;
}

/// Keyboard that never reports a pressed key.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyboard;

impl Keyboard for NoKeyboard {
    fn is_pressed(&self, _key: Key) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_uppercased() {
        assert_eq!(Key::letter('a'), Key::Letter('A'));
        assert_eq!(Key::letter('B'), Key::Letter('B'));
    }

    #[test]
    fn no_keyboard_reports_nothing() {
        assert!(!NoKeyboard.is_pressed(Key::LeftShift));
        assert!(!NoKeyboard.is_pressed(Key::letter('a')));
    }
}
