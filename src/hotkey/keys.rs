//! Modifier sets, virtual key codes and the human-readable hotkey grammar.
//!
//! A hotkey string is `Mod+Mod+...+Key`, case-insensitive, separated by `+`.
//! Formatting always emits the canonical modifier order Ctrl, Alt, Shift,
//! Win so that `format(parse(s))` is stable.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Modifier keys held together with a hotkey.
    ///
    /// The bit values match the OS hotkey modifier flags, which is also the
    /// integer stored in the catalog file (`3` = Ctrl+Alt).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct Modifiers: u32 {
        const ALT = 0x1;
        const CONTROL = 0x2;
        const SHIFT = 0x4;
        const WIN = 0x8;
    }
}

impl Modifiers {
    /// The modifier pair used for every built-in and layout hotkey.
    pub const CTRL_ALT: Modifiers = Modifiers::CONTROL.union(Modifiers::ALT);
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in [
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::WIN, "Win"),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A virtual key code.
///
/// Letters and digits use their ASCII upper-case code (`'J'` = 74).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: KeyCode = KeyCode(0x08);
    pub const TAB: KeyCode = KeyCode(0x09);
    pub const ENTER: KeyCode = KeyCode(0x0D);
    pub const ESCAPE: KeyCode = KeyCode(0x1B);
    pub const SPACE: KeyCode = KeyCode(0x20);
    pub const PAGE_UP: KeyCode = KeyCode(0x21);
    pub const PAGE_DOWN: KeyCode = KeyCode(0x22);
    pub const END: KeyCode = KeyCode(0x23);
    pub const HOME: KeyCode = KeyCode(0x24);
    pub const LEFT: KeyCode = KeyCode(0x25);
    pub const UP: KeyCode = KeyCode(0x26);
    pub const RIGHT: KeyCode = KeyCode(0x27);
    pub const DOWN: KeyCode = KeyCode(0x28);
    pub const INSERT: KeyCode = KeyCode(0x2D);
    pub const DELETE: KeyCode = KeyCode(0x2E);

    /// Named keys, in the spelling [`Display`](fmt::Display) uses.
    const NAMED: [(KeyCode, &'static str); 15] = [
        (KeyCode::LEFT, "Left"),
        (KeyCode::RIGHT, "Right"),
        (KeyCode::UP, "Up"),
        (KeyCode::DOWN, "Down"),
        (KeyCode::SPACE, "Space"),
        (KeyCode::ENTER, "Enter"),
        (KeyCode::ESCAPE, "Esc"),
        (KeyCode::TAB, "Tab"),
        (KeyCode::BACKSPACE, "Backspace"),
        (KeyCode::DELETE, "Delete"),
        (KeyCode::INSERT, "Insert"),
        (KeyCode::HOME, "Home"),
        (KeyCode::END, "End"),
        (KeyCode::PAGE_UP, "PageUp"),
        (KeyCode::PAGE_DOWN, "PageDown"),
    ];

    /// Key code for an ASCII letter or digit.
    pub fn from_char(c: char) -> Option<KeyCode> {
        if c.is_ascii_alphanumeric() {
            Some(KeyCode(c.to_ascii_uppercase() as u32))
        } else {
            None
        }
    }

    /// Parse a single key token: a letter or digit, a named key, or a raw
    /// `VK_<n>` code as produced by [`Display`](fmt::Display).
    pub fn from_name(token: &str) -> Option<KeyCode> {
        let token = token.trim();
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return KeyCode::from_char(c);
        }
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "escape" => return Some(KeyCode::ESCAPE),
            "return" => return Some(KeyCode::ENTER),
            "del" => return Some(KeyCode::DELETE),
            _ => {}
        }
        if let Some(&(code, _)) = KeyCode::NAMED
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(&lower))
        {
            return Some(code);
        }
        lower
            .strip_prefix("vk_")
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|&n| n > 0 && n < 256)
            .map(KeyCode)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((_, name)) = KeyCode::NAMED.iter().find(|(code, _)| code == self) {
            return f.write_str(name);
        }
        match char::from_u32(self.0) {
            Some(c) if c.is_ascii_uppercase() || c.is_ascii_digit() => write!(f, "{}", c),
            _ => write!(f, "VK_{}", self.0),
        }
    }
}

/// A `(modifiers, key)` combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: KeyCode,
}

impl Hotkey {
    pub const fn new(modifiers: Modifiers, key: KeyCode) -> Self {
        Self { modifiers, key }
    }
}

/// Error from parsing a hotkey string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyParseError {
    #[error("empty hotkey string")]
    Empty,
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
    #[error("unknown key {0:?}")]
    UnknownKey(String),
}

fn parse_modifier(token: &str) -> Option<Modifiers> {
    match token.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(Modifiers::CONTROL),
        "alt" => Some(Modifiers::ALT),
        "shift" => Some(Modifiers::SHIFT),
        "win" | "windows" => Some(Modifiers::WIN),
        "altgr" => Some(Modifiers::CTRL_ALT),
        _ => None,
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s
            .split('+')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let (key_token, modifier_tokens) = tokens.split_last().ok_or(HotkeyParseError::Empty)?;

        let mut modifiers = Modifiers::empty();
        for token in modifier_tokens {
            modifiers |= parse_modifier(token)
                .ok_or_else(|| HotkeyParseError::UnknownModifier(token.to_string()))?;
        }
        let key = KeyCode::from_name(key_token)
            .ok_or_else(|| HotkeyParseError::UnknownKey(key_token.to_string()))?;
        Ok(Hotkey { modifiers, key })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}
