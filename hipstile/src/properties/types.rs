//! Typed values carried by HiPS property files.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing property or hipslist text.
///
/// Individual malformed lines never produce an error; they are skipped and
/// counted. Only input that cannot be key/value text at all is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input contains NUL bytes and is not text.
    #[error("input is binary, not key = value text")]
    Binary,

    /// The input has content but not a single `key = value` line.
    #[error("no key = value entries found ({skipped} lines skipped)")]
    NoEntries { skipped: usize },
}

/// Coordinate frame a survey is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frame {
    /// International Celestial Reference System (equatorial).
    Icrs,
    /// Observed / topocentric frame (horizon-fixed or body-fixed imagery).
    Observed,
    /// Galactic coordinates.
    Galactic,
}

impl Frame {
    /// Canonical property-file spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frame::Icrs => "equatorial",
            Frame::Observed => "horizontal",
            Frame::Galactic => "galactic",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised frame name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frame '{0}'")]
pub struct UnknownFrame(pub String);

impl FromStr for Frame {
    type Err = UnknownFrame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equatorial" | "icrs" | "icrf" | "c" => Ok(Frame::Icrs),
            "horizontal" | "observed" | "altaz" => Ok(Frame::Observed),
            "galactic" | "g" => Ok(Frame::Galactic),
            other => Err(UnknownFrame(other.to_string())),
        }
    }
}

/// Tile media type declared by `hips_tile_format`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Jpeg,
    Png,
    Webp,
    Fits,
    /// Survey-specific payload (catalog data, ephemerides, ...).
    Custom(String),
}

impl TileFormat {
    /// Parse one whitespace-separated token of `hips_tile_format`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => TileFormat::Jpeg,
            "png" => TileFormat::Png,
            "webp" => TileFormat::Webp,
            "fits" => TileFormat::Fits,
            other => TileFormat::Custom(other.to_string()),
        }
    }

    /// File extension used in tile URLs.
    pub fn extension(&self) -> &str {
        match self {
            TileFormat::Jpeg => "jpg",
            TileFormat::Png => "png",
            TileFormat::Webp => "webp",
            TileFormat::Fits => "fits",
            TileFormat::Custom(ext) => ext,
        }
    }

    /// Whether tiles of this format are displayable images.
    pub fn is_imagery(&self) -> bool {
        matches!(self, TileFormat::Jpeg | TileFormat::Png | TileFormat::Webp)
    }

    /// Lower ranks are preferred when a survey offers several formats.
    fn preference(&self) -> u8 {
        match self {
            TileFormat::Webp => 0,
            TileFormat::Png => 1,
            TileFormat::Jpeg => 2,
            TileFormat::Fits => 4,
            TileFormat::Custom(_) => 3,
        }
    }

    /// Pick the format to request from a list of advertised formats.
    pub fn preferred(formats: &[TileFormat]) -> Option<&TileFormat> {
        formats.iter().min_by_key(|f| f.preference())
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileFormat::Jpeg => f.write_str("jpeg"),
            TileFormat::Custom(name) => f.write_str(name),
            other => f.write_str(other.extension()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_str() {
        assert_eq!("equatorial".parse::<Frame>(), Ok(Frame::Icrs));
        assert_eq!("ICRS".parse::<Frame>(), Ok(Frame::Icrs));
        assert_eq!("C".parse::<Frame>(), Ok(Frame::Icrs));
        assert_eq!("horizontal".parse::<Frame>(), Ok(Frame::Observed));
        assert_eq!("galactic".parse::<Frame>(), Ok(Frame::Galactic));
        assert!("ecliptic".parse::<Frame>().is_err());
    }

    #[test]
    fn test_tile_format_tokens() {
        assert_eq!(TileFormat::from_token("JPEG"), TileFormat::Jpeg);
        assert_eq!(TileFormat::from_token("eph"), TileFormat::Custom("eph".into()));
        assert_eq!(TileFormat::Jpeg.extension(), "jpg");
        assert!(TileFormat::Png.is_imagery());
        assert!(!TileFormat::Fits.is_imagery());
    }

    #[test]
    fn test_preferred_format() {
        let formats = vec![TileFormat::Jpeg, TileFormat::Fits, TileFormat::Png];
        assert_eq!(TileFormat::preferred(&formats), Some(&TileFormat::Png));
        let formats = vec![TileFormat::Fits, TileFormat::Custom("eph".into())];
        assert_eq!(
            TileFormat::preferred(&formats),
            Some(&TileFormat::Custom("eph".into()))
        );
        assert_eq!(TileFormat::preferred(&[]), None);
    }
}
