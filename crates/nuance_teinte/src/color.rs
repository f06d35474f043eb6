//! RGBA colors, CSS color literal parsing and HSL conversion.

use std::fmt;

use nuance_trousse::{phf_map, PhfMap};

/// sRGB color with channels in `0.0..=255.0` and alpha in `0.0..=1.0`.
///
/// Channels stay fractional so chained color functions do not accumulate
/// rounding error; [`Color::red`] and friends round for consumers that need
/// integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
}

/// Named colors understood in color literals
static NAMED_COLORS: PhfMap<&'static str, u32> = phf_map! {
    "aqua" => 0x00ffff,
    "black" => 0x000000,
    "blue" => 0x0000ff,
    "brown" => 0xa52a2a,
    "coral" => 0xff7f50,
    "crimson" => 0xdc143c,
    "cyan" => 0x00ffff,
    "darkblue" => 0x00008b,
    "darkgray" => 0xa9a9a9,
    "darkgreen" => 0x006400,
    "darkgrey" => 0xa9a9a9,
    "darkred" => 0x8b0000,
    "fuchsia" => 0xff00ff,
    "gold" => 0xffd700,
    "gray" => 0x808080,
    "green" => 0x008000,
    "grey" => 0x808080,
    "indigo" => 0x4b0082,
    "ivory" => 0xfffff0,
    "khaki" => 0xf0e68c,
    "lavender" => 0xe6e6fa,
    "lightblue" => 0xadd8e6,
    "lightgray" => 0xd3d3d3,
    "lightgreen" => 0x90ee90,
    "lightgrey" => 0xd3d3d3,
    "lime" => 0x00ff00,
    "magenta" => 0xff00ff,
    "maroon" => 0x800000,
    "navy" => 0x000080,
    "olive" => 0x808000,
    "orange" => 0xffa500,
    "pink" => 0xffc0cb,
    "purple" => 0x800080,
    "red" => 0xff0000,
    "salmon" => 0xfa8072,
    "silver" => 0xc0c0c0,
    "teal" => 0x008080,
    "tomato" => 0xff6347,
    "turquoise" => 0x40e0d0,
    "violet" => 0xee82ee,
    "white" => 0xffffff,
    "yellow" => 0xffff00,
};

impl Color {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
            a: a.clamp(0.0, 1.0),
        }
    }

    #[inline]
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    fn from_packed(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xff) as f64,
            ((rgb >> 8) & 0xff) as f64,
            (rgb & 0xff) as f64,
        )
    }

    /// Build from hue in degrees, saturation and lightness in `0.0..=1.0`
    pub fn from_hsla(h: f64, s: f64, l: f64, a: f64) -> Self {
        let h = h.rem_euclid(360.0) / 360.0;
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
        let m1 = l * 2.0 - m2;
        let hue = |h: f64| {
            let h = if h < 0.0 {
                h + 1.0
            } else if h > 1.0 {
                h - 1.0
            } else {
                h
            };
            if h * 6.0 < 1.0 {
                m1 + (m2 - m1) * h * 6.0
            } else if h * 2.0 < 1.0 {
                m2
            } else if h * 3.0 < 2.0 {
                m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
            } else {
                m1
            }
        };

        Self::rgba(
            hue(h + 1.0 / 3.0) * 255.0,
            hue(h) * 255.0,
            hue(h - 1.0 / 3.0) * 255.0,
            a,
        )
    }

    /// Hue in degrees, saturation and lightness in `0.0..=1.0`
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.r / 255.0;
        let g = self.g / 255.0;
        let b = self.b / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;

        if d == 0.0 {
            return (0.0, 0.0, l);
        }

        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        (h * 60.0, s, l)
    }

    /// Parse a color literal: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb()`/`rgba()` with numeric channels, or a named color.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return Self::from_hex(hex);
        }

        let lower = text.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
        {
            return parse_rgb_args(args.strip_suffix(')')?);
        }

        Self::named(&lower)
    }

    /// Parse hex digits (without the leading `#`)
    pub fn from_hex(hex: &str) -> Option<Self> {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
        let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

        let (r, g, b, a) = match hex.len() {
            3 => (digit(0)?, digit(1)?, digit(2)?, 255),
            4 => (digit(0)?, digit(1)?, digit(2)?, digit(3)?),
            6 => (pair(0)?, pair(2)?, pair(4)?, 255),
            8 => (pair(0)?, pair(2)?, pair(4)?, pair(6)?),
            _ => return None,
        };
        Some(Self::rgba(r as f64, g as f64, b as f64, a as f64 / 255.0))
    }

    /// Look up a named color (`transparent` included)
    pub fn named(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("transparent") {
            return Some(Self::rgba(0.0, 0.0, 0.0, 0.0));
        }
        let lower = name.to_ascii_lowercase();
        NAMED_COLORS.get(lower.as_str()).map(|&rgb| Self::from_packed(rgb))
    }

    #[inline]
    pub fn red(&self) -> u8 {
        self.r.round() as u8
    }

    #[inline]
    pub fn green(&self) -> u8 {
        self.g.round() as u8
    }

    #[inline]
    pub fn blue(&self) -> u8 {
        self.b.round() as u8
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.a
    }

    /// Raw fractional channels `(r, g, b)`
    #[inline]
    pub fn channels(&self) -> (f64, f64, f64) {
        (self.r, self.g, self.b)
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }

    /// Apply `f` to each RGB channel pair, keeping this color's alpha
    pub(crate) fn zip_channels(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::rgba(
            f(self.r, other.r),
            f(self.g, other.g),
            f(self.b, other.b),
            self.a,
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a < 1.0 {
            write!(
                f,
                "rgba({}, {}, {}, {})",
                self.red(),
                self.green(),
                self.blue(),
                crate::format_number(self.a)
            )
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}",
                self.red(),
                self.green(),
                self.blue()
            )
        }
    }
}

#[inline]
fn clamp_channel(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 255.0)
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |s: &str| -> Option<f64> {
        match s.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok().map(|p| p * 2.55),
            None => s.parse::<f64>().ok(),
        }
    };

    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = match parts.get(3) {
        Some(a) => a.parse::<f64>().ok()?,
        None => 1.0,
    };
    Some(Color::rgba(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse("#fc0").unwrap().to_string(), "#ffcc00");
        assert_eq!(Color::parse("#FFCC00").unwrap().to_string(), "#ffcc00");
        assert_eq!(
            Color::parse("#00000080").unwrap().to_string(),
            "rgba(0, 0, 0, 0.50196078)"
        );
        assert!(Color::parse("#ffcc0").is_none());
        assert!(Color::parse("#ggg").is_none());
    }

    #[test]
    fn test_parse_functional_and_named() {
        let c = Color::parse("rgb(255, 204, 0)").unwrap();
        assert_eq!((c.red(), c.green(), c.blue()), (255, 204, 0));

        let c = Color::parse("rgba(100%, 0%, 0%, 0.5)").unwrap();
        assert_eq!(c.red(), 255);
        assert_eq!(c.alpha(), 0.5);

        assert_eq!(Color::parse("Red").unwrap().to_string(), "#ff0000");
        assert_eq!(Color::parse("transparent").unwrap().alpha(), 0.0);
        assert!(Color::parse("2px").is_none());
        assert!(Color::parse("solid").is_none());
    }

    #[test]
    fn test_hsl_round_trip() {
        let c = Color::parse("#ffcc00").unwrap();
        let (h, s, l) = c.to_hsl();
        assert!((h - 48.0).abs() < 1e-9);
        assert!((s - 1.0).abs() < 1e-9);
        assert!((l - 0.5).abs() < 1e-9);

        let back = Color::from_hsla(h, s, l, 1.0);
        assert_eq!(back.to_string(), "#ffcc00");
    }

    proptest::proptest! {
        #[test]
        fn prop_hsl_preserves_channels(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
            let color = Color::rgb(r as f64, g as f64, b as f64);
            let (h, s, l) = color.to_hsl();
            let back = Color::from_hsla(h, s, l, 1.0);
            proptest::prop_assert_eq!((back.red(), back.green(), back.blue()), (r, g, b));
        }
    }

    #[test]
    fn test_grey_has_no_saturation() {
        let (h, s, l) = Color::parse("#808080").unwrap().to_hsl();
        assert_eq!((h, s), (0.0, 0.0));
        assert!((l - 128.0 / 255.0).abs() < 1e-9);
    }
}
