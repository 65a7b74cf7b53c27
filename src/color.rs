//! # Color Normalization
//!
//! Template authors write colors in whichever notation their design tool
//! exports. Everything is normalized at load time to a canonical lowercase
//! `#rrggbb` string so the renderer deals with a single representation.
//!
//! | Notation | Example | Channel range |
//! |----------|---------|---------------|
//! | hex | `#FF0000` | 6 hex digits |
//! | rgb / rgba | `rgb(255, 0, 0)`, `rgba(255,0,0,0.5)` | 0–255 (alpha ignored) |
//! | cmyk | `cmyk(0%,100%,100%,0%)` | 0–100 percent |

use std::fmt;

use image::Rgba;
use thiserror::Error;

/// Errors produced while normalizing a color string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("unrecognized color '{0}' (expected #rrggbb, rgb(), rgba() or cmyk())")]
    Invalid(String),

    #[error("color '{input}': {channel} value {value} is out of range 0-{max}")]
    OutOfRange {
        input: String,
        channel: &'static str,
        value: u32,
        max: u32,
    },
}

/// A validated color in canonical `#rrggbb` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    r: u8,
    g: u8,
    b: u8,
}

impl HexColor {
    pub const BLACK: HexColor = HexColor::new(0, 0, 0);
    pub const WHITE: HexColor = HexColor::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Opaque pixel value for drawing.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Normalize a color string into canonical hex.
///
/// ```
/// use idforge::color::normalize_color;
///
/// assert_eq!(normalize_color("rgb(255,0,0)").unwrap().to_string(), "#ff0000");
/// assert_eq!(normalize_color("cmyk(0%,100%,100%,0%)").unwrap().to_string(), "#ff0000");
/// assert!(normalize_color("notacolor").is_err());
/// ```
pub fn normalize_color(input: &str) -> Result<HexColor, ColorError> {
    let trimmed = input.trim();

    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(input, hex);
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(args) = function_args(&lower, "rgba").or_else(|| function_args(&lower, "rgb")) {
        return parse_rgb(input, &args);
    }
    if let Some(args) = function_args(&lower, "cmyk") {
        return parse_cmyk(input, &args);
    }

    Err(ColorError::Invalid(input.to_string()))
}

/// Split `name(a, b, c)` into its trimmed arguments.
fn function_args<'a>(s: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let inner = s.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).collect())
}

fn parse_hex(input: &str, hex: &str) -> Result<HexColor, ColorError> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::Invalid(input.to_string()));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::Invalid(input.to_string()))
    };
    Ok(HexColor::new(channel(0)?, channel(2)?, channel(4)?))
}

fn parse_rgb(input: &str, args: &[&str]) -> Result<HexColor, ColorError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(ColorError::Invalid(input.to_string()));
    }
    if let Some(alpha) = args.get(3) {
        // Alpha must be numeric but does not affect the canonical color.
        if alpha.is_empty() || !alpha.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(ColorError::Invalid(input.to_string()));
        }
    }

    const NAMES: [&str; 3] = ["red", "green", "blue"];
    let mut channels = [0u8; 3];
    for (i, arg) in args.iter().take(3).enumerate() {
        let value = parse_integer(input, arg)?;
        if value > 255 {
            return Err(ColorError::OutOfRange {
                input: input.to_string(),
                channel: NAMES[i],
                value,
                max: 255,
            });
        }
        channels[i] = value as u8;
    }
    Ok(HexColor::new(channels[0], channels[1], channels[2]))
}

fn parse_cmyk(input: &str, args: &[&str]) -> Result<HexColor, ColorError> {
    if args.len() != 4 {
        return Err(ColorError::Invalid(input.to_string()));
    }

    const NAMES: [&str; 4] = ["cyan", "magenta", "yellow", "key"];
    let mut fractions = [0f64; 4];
    for (i, arg) in args.iter().enumerate() {
        let digits = arg
            .strip_suffix('%')
            .ok_or_else(|| ColorError::Invalid(input.to_string()))?;
        let value = parse_integer(input, digits.trim_end())?;
        if value > 100 {
            return Err(ColorError::OutOfRange {
                input: input.to_string(),
                channel: NAMES[i],
                value,
                max: 100,
            });
        }
        fractions[i] = value as f64 / 100.0;
    }

    let [c, m, y, k] = fractions;
    // Truncation toward zero matches the reference conversion.
    let r = 255.0 * (1.0 - c) * (1.0 - k);
    let g = 255.0 * (1.0 - m) * (1.0 - k);
    let b = 255.0 * (1.0 - y) * (1.0 - k);
    Ok(HexColor::new(r as u8, g as u8, b as u8))
}

fn parse_integer(input: &str, s: &str) -> Result<u32, ColorError> {
    if s.is_empty() || s.len() > 3 || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ColorError::Invalid(input.to_string()));
    }
    s.parse().map_err(|_| ColorError::Invalid(input.to_string()))
}
