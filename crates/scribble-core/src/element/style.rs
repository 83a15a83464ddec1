//! Colors and stroke/fill style for elements.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color {0:?}: expected #rgb, #rrggbb or #rrggbbaa")]
pub struct ColorParseError(pub String);

/// RGBA8 color, serialized as a CSS hex string (`#rrggbb` or `#rrggbbaa`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    /// Fill used for new sticky notes.
    pub const STICKY_YELLOW: Color = Color::rgb(0xfe, 0xf0, 0x8a);
    /// Fill used for new rich notes.
    pub const NOTE_PAPER: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Return a copy with the alpha channel replaced.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|v| v * 17)
                .map_err(|_| err())
        };
        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(err()),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Style properties for elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    /// Stroke color.
    pub stroke_color: Color,
    /// Stroke width, always positive.
    #[serde(deserialize_with = "deserialize_width")]
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
}

impl ElementStyle {
    /// Default stroke width for new elements.
    pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
    /// Thinnest stroke accepted; smaller widths are raised to this.
    pub const MIN_STROKE_WIDTH: f64 = 0.1;

    /// Create a stroke-only style.
    pub fn stroke(color: Color, width: f64) -> Self {
        Self {
            stroke_color: color,
            stroke_width: sanitize_width(width),
            fill_color: None,
        }
    }

    /// Builder-style fill.
    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill_color = Some(fill);
        self
    }
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self::stroke(Color::BLACK, Self::DEFAULT_STROKE_WIDTH)
    }
}

/// Incoming widths from peers or disk go through the same rule as
/// [`ElementStyle::stroke`].
fn deserialize_width<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Option::<f64>::deserialize(deserializer).map(|w| sanitize_width(w.unwrap_or(f64::NAN)))
}

fn sanitize_width(width: f64) -> f64 {
    if width.is_finite() && width > 0.0 {
        width.max(ElementStyle::MIN_STROKE_WIDTH)
    } else {
        ElementStyle::DEFAULT_STROKE_WIDTH
    }
}
