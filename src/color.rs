use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque sRGB color. Serialized as a `"#rrggbb"` string.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    MissingHash { input: String },
    BadLength { input: String },
    BadDigits { input: String },
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::MissingHash { input } => write!(f, "color {:?} must start with '#'", input),
            ColorError::BadLength { input } => {
                write!(f, "color {:?} must have exactly six hex digits", input)
            }
            ColorError::BadDigits { input } => write!(f, "color {:?} is not valid hex", input),
        }
    }
}

impl std::error::Error for ColorError {}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_source(self) -> raqote::Source<'static> {
        raqote::Source::Solid(raqote::SolidSource::from_unpremultiplied_argb(
            0xff, self.r, self.g, self.b,
        ))
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color { r, g, b }
    }
}

impl FromStr for Color {
    type Err = ColorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').ok_or_else(|| ColorError::MissingHash {
            input: s.to_owned(),
        })?;
        if digits.len() != 6 {
            return Err(ColorError::BadLength {
                input: s.to_owned(),
            });
        }
        let mut buf = [0u8; 3];
        hex::decode_to_slice(digits, &mut buf).map_err(|_| ColorError::BadDigits {
            input: s.to_owned(),
        })?;
        Ok(Color::from(buf))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", hex::encode(self.to_array()))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_parse() {
        assert_eq!("#1e90ff".parse::<Color>(), Ok(Color::from(hex!("1e90ff"))));
        assert_eq!("#FFFFFF".parse::<Color>(), Ok(Color::WHITE));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "1e90ff".parse::<Color>(),
            Err(ColorError::MissingHash { .. })
        ));
        assert!(matches!(
            "#fff".parse::<Color>(),
            Err(ColorError::BadLength { .. })
        ));
        assert!(matches!(
            "#gg0000".parse::<Color>(),
            Err(ColorError::BadDigits { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::from(hex!("00ff7f")).to_string(), "#00ff7f");
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&Color::rgb(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#ff0010\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(255, 0, 16));
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }
}
