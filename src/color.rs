//! Skin tone values and their persisted text form.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseToneError;

static RGB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)").expect("static pattern compiles")
});

/// Dominant skin color of a photo, in RGB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SkinTone {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl SkinTone {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean distance between the two colors as points in RGB space.
    pub fn distance(&self, other: &SkinTone) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Parse the `"(r, g, b)"` form. Anything malformed or out of range is `None`.
    pub fn parse(text: &str) -> Option<SkinTone> {
        let caps = RGB_PATTERN.captures(text)?;
        let channel = |i: usize| -> Option<u8> {
            let value: u32 = caps.get(i)?.as_str().parse().ok()?;
            u8::try_from(value).ok()
        };
        Some(SkinTone::new(channel(1)?, channel(2)?, channel(3)?))
    }
}

impl fmt::Display for SkinTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

impl FromStr for SkinTone {
    type Err = ParseToneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkinTone::parse(s).ok_or_else(|| ParseToneError(s.to_string()))
    }
}

/// Value of the skin tone column: a color, or a marker saying why there is none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCell {
    Tone(SkinTone),
    NotDetected,
    InvalidUrl,
    NotProcessed,
    Error,
}

impl ToneCell {
    pub const NOT_DETECTED: &'static str = "Not Detected";
    pub const INVALID_URL: &'static str = "Invalid URL";
    pub const NOT_PROCESSED: &'static str = "Not Processed";
    pub const ERROR: &'static str = "Error";

    /// Read a persisted cell. Blank and unparsable text yield `None`; sentinel
    /// strings are recognised before any color parsing happens.
    pub fn read(text: &str) -> Option<ToneCell> {
        match text.trim() {
            "" => None,
            Self::NOT_DETECTED => Some(ToneCell::NotDetected),
            Self::INVALID_URL => Some(ToneCell::InvalidUrl),
            Self::NOT_PROCESSED => Some(ToneCell::NotProcessed),
            Self::ERROR => Some(ToneCell::Error),
            other => SkinTone::parse(other).map(ToneCell::Tone),
        }
    }

    pub fn tone(&self) -> Option<SkinTone> {
        match self {
            ToneCell::Tone(tone) => Some(*tone),
            _ => None,
        }
    }
}

impl fmt::Display for ToneCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToneCell::Tone(tone) => tone.fmt(f),
            ToneCell::NotDetected => f.write_str(Self::NOT_DETECTED),
            ToneCell::InvalidUrl => f.write_str(Self::INVALID_URL),
            ToneCell::NotProcessed => f.write_str(Self::NOT_PROCESSED),
            ToneCell::Error => f.write_str(Self::ERROR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_padding() {
        assert_eq!(SkinTone::new(7, 0, 255).to_string(), "(7, 0, 255)");
    }

    #[test]
    fn round_trips_every_channel_value() {
        for v in 0..=255u8 {
            let tone = SkinTone::new(v, 255 - v, v / 2);
            assert_eq!(SkinTone::parse(&tone.to_string()), Some(tone));
        }
    }

    #[test]
    fn tolerates_whitespace() {
        assert_eq!(
            SkinTone::parse("(  12 ,3,\t200 )"),
            Some(SkinTone::new(12, 3, 200))
        );
    }

    #[test]
    fn rejects_malformed_and_out_of_range() {
        assert_eq!(SkinTone::parse("(256, 0, 0)"), None);
        assert_eq!(SkinTone::parse("(1,2)"), None);
        assert_eq!(SkinTone::parse("not a color"), None);
        assert_eq!(SkinTone::parse("(-1, 2, 3)"), None);
        assert_eq!(SkinTone::parse("(99999999999999999999, 0, 0)"), None);
        assert!("(1, 2, x)".parse::<SkinTone>().is_err());
    }

    #[test]
    fn parse_error_names_the_input() {
        let err = "(1,2)".parse::<SkinTone>().unwrap_err();
        assert_eq!(err, ParseToneError("(1,2)".to_string()));
        assert_eq!(err.to_string(), "not an (r, g, b) color: \"(1,2)\"");
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = SkinTone::new(10, 20, 30);
        let b = SkinTone::new(200, 100, 0);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(a.distance(&a), 0.0);
        assert_eq!(SkinTone::new(0, 0, 0).distance(&SkinTone::new(3, 4, 0)), 5.0);
    }

    #[test]
    fn sentinels_are_never_colors() {
        assert_eq!(ToneCell::read("Not Detected"), Some(ToneCell::NotDetected));
        assert_eq!(ToneCell::read(" Invalid URL "), Some(ToneCell::InvalidUrl));
        assert_eq!(ToneCell::read("Not Processed"), Some(ToneCell::NotProcessed));
        assert_eq!(ToneCell::read("Error"), Some(ToneCell::Error));
        assert_eq!(ToneCell::read(""), None);
        assert_eq!(ToneCell::read("garbage"), None);
        assert_eq!(
            ToneCell::read("(1, 2, 3)").and_then(|c| c.tone()),
            Some(SkinTone::new(1, 2, 3))
        );
        assert_eq!(ToneCell::NotDetected.to_string(), "Not Detected");
    }
}
