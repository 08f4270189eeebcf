//! Repository header colours.
//!
//! A repo colour is either one of the eight ANSI names or a `#RRGGBB` hex
//! value. It is stored in `ms-config.json` as a plain string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// The eight basic ANSI colour names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl NamedColor {
    pub const ALL: [NamedColor; 8] = [
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Yellow,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
        Self::White,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
        }
    }
}

/// Colour used for a repository's output headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RepoColor {
    Named(NamedColor),
    Rgb(u8, u8, u8),
}

impl RepoColor {
    /// Orange, offered in the setup palette.
    pub const ORANGE: RepoColor = RepoColor::Rgb(0xFF, 0xA5, 0x00);

    /// Palette shown by `ms setup`. Entry 7 ("Custom Hex") is handled by the
    /// caller.
    pub fn palette() -> [(&'static str, RepoColor); 6] {
        [
            ("Blue", RepoColor::Named(NamedColor::Blue)),
            ("Green", RepoColor::Named(NamedColor::Green)),
            ("Pink/Purple", RepoColor::Named(NamedColor::Magenta)),
            ("Cyan", RepoColor::Named(NamedColor::Cyan)),
            ("Yellow", RepoColor::Named(NamedColor::Yellow)),
            ("Orange", RepoColor::ORANGE),
        ]
    }

    /// Parse a strict `#RRGGBB` value.
    pub fn parse_hex(s: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidColor { value: s.into() };
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Default for RepoColor {
    fn default() -> Self {
        Self::Named(NamedColor::White)
    }
}

impl fmt::Display for RepoColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => f.write_str(n.as_str()),
            Self::Rgb(r, g, b) => write!(f, "#{r:02X}{g:02X}{b:02X}"),
        }
    }
}

impl FromStr for RepoColor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('#') {
            return Self::parse_hex(trimmed);
        }
        let lower = trimmed.to_ascii_lowercase();
        NamedColor::ALL
            .iter()
            .find(|n| n.as_str() == lower)
            .map(|n| Self::Named(*n))
            .ok_or_else(|| DomainError::InvalidColor { value: s.into() })
    }
}

impl TryFrom<String> for RepoColor {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoColor> for String {
    fn from(value: RepoColor) -> Self {
        value.to_string()
    }
}
