//! Colors assigned to sets and the themes that provide their defaults.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

pub mod table;

pub use table::Table;

/// The default color for nodes when the light theme is active.
const DEFAULT_LIGHT_COLOR: Color = Color::new(200, 200, 200);

/// The default color for nodes when the dark theme is active.
const DEFAULT_DARK_COLOR: Color = Color::new(50, 50, 50);

/// The pattern for a hexadecimal color string.
static HEX: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: this pattern is tested below and will always compile.
    Regex::new(r"^#?([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$").unwrap()
});

/// An error related to parsing a [`Color`].
#[derive(Debug)]
pub enum ParseError {
    /// The value was not a six digit hexadecimal color.
    InvalidHex(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidHex(value) => {
                write!(f, "invalid hex color: expected `#rrggbb`, found `{value}`")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// An RGB color.
///
/// Colors are serialized as three element integer arrays (e.g., `[255, 0,
/// 0]`), which is the way they travel between views. The `#rrggbb` form is
/// only used when talking to the analysis service.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    /// The red channel.
    red: u8,

    /// The green channel.
    green: u8,

    /// The blue channel.
    blue: u8,
}

impl Color {
    /// Black, used for selections that have never been assigned a color.
    pub const BLACK: Color = Color::new(0, 0, 0);

    /// Creates a new color.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::color::Color;
    ///
    /// let color = Color::new(10, 20, 30);
    /// assert_eq!(color.rgb(), [10, 20, 30]);
    /// ```
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Gets the channels as an `[r, g, b]` array.
    pub fn rgb(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Converts the color to a lowercase `#rrggbb` string.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::color::Color;
    ///
    /// assert_eq!(Color::new(10, 20, 255).to_hex(), "#0a14ff");
    /// ```
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl From<[u8; 3]> for Color {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Self::new(red, green, blue)
    }
}

impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        color.rgb()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups = HEX
            .captures(s.trim())
            .ok_or_else(|| ParseError::InvalidHex(s.to_string()))?;

        let channel = |i: usize| {
            groups
                .get(i)
                .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
                .ok_or_else(|| ParseError::InvalidHex(s.to_string()))
        };

        Ok(Self::new(channel(1)?, channel(2)?, channel(3)?))
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Themes
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to parsing a [`Theme`].
#[derive(Debug)]
pub enum ThemeError {
    /// An unknown theme name.
    Unknown(String),
}

impl std::fmt::Display for ThemeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeError::Unknown(name) => {
                write!(f, "unknown theme: expected `light` or `dark`, found `{name}`")
            }
        }
    }
}

impl std::error::Error for ThemeError {}

/// The visual theme of the views.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// A light theme.
    #[default]
    Light,

    /// A dark theme.
    Dark,
}

impl Theme {
    /// Gets the color used for nodes with no explicitly assigned color.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::color::Color;
    /// use cellsets::color::Theme;
    ///
    /// assert_eq!(Theme::Light.default_color(), Color::new(200, 200, 200));
    /// assert_eq!(Theme::Dark.default_color(), Color::new(50, 50, 50));
    /// ```
    pub fn default_color(&self) -> Color {
        match self {
            Theme::Light => DEFAULT_LIGHT_COLOR,
            Theme::Dark => DEFAULT_DARK_COLOR,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ThemeError::Unknown(s.to_string())),
        }
    }
}
