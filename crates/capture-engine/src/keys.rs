//! Keyboard shortcuts.
//!
//! Space toggles playback and `c`/`C` requests a capture. The two never
//! overlap: space does not capture and `c` does not touch playback.

/// A key press as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
}

impl Key {
    /// Interpret one line of terminal input as a key press.
    ///
    /// A line that is exactly one space, or the word `space`, is the spacebar;
    /// any other single character is that character. Everything else is not a
    /// key press.
    pub fn from_line(line: &str) -> Option<Key> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line == " " || line.trim().eq_ignore_ascii_case("space") {
            return Some(Key::Space);
        }
        let mut chars = line.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Key::Char(c)),
            _ => None,
        }
    }
}

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    TogglePlayback,
    Capture,
}

/// Map a key to its shortcut, if any.
pub fn shortcut_for(key: Key) -> Option<Shortcut> {
    match key {
        Key::Space => Some(Shortcut::TogglePlayback),
        Key::Char(c) if c.eq_ignore_ascii_case(&'c') => Some(Shortcut::Capture),
        Key::Char(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_is_case_insensitive() {
        assert_eq!(shortcut_for(Key::Char('c')), Some(Shortcut::Capture));
        assert_eq!(shortcut_for(Key::Char('C')), Some(Shortcut::Capture));
        assert_eq!(shortcut_for(Key::Char('x')), None);
    }

    #[test]
    fn test_space_only_toggles() {
        assert_eq!(shortcut_for(Key::Space), Some(Shortcut::TogglePlayback));
        assert_eq!(shortcut_for(Key::Char(' ')), None);
    }

    #[test]
    fn test_from_line() {
        assert_eq!(Key::from_line(" "), Some(Key::Space));
        assert_eq!(Key::from_line(" \n"), Some(Key::Space));
        assert_eq!(Key::from_line("SPACE"), Some(Key::Space));
        assert_eq!(Key::from_line("C\n"), Some(Key::Char('C')));
        assert_eq!(Key::from_line("seek 4"), None);
        assert_eq!(Key::from_line(""), None);
    }
}
