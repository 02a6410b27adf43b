//! Survey metadata: the HiPS `properties` file and hipslist indexes.
//!
//! Property files are newline-separated `key = value` text. Parsing is
//! tolerant: unknown keys are kept but ignored, malformed lines are skipped
//! and counted, and invalid typed values fall back to caller defaults. Only
//! input that is not key/value text at all is rejected.

mod date;
mod hipslist;
mod types;

pub use date::{format_date, parse_date};
pub use hipslist::{parse_hipslist, parse_hipslist_entries, HipsListEntry};
pub use types::{Frame, ParseError, TileFormat, UnknownFrame};

use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Caller-supplied fallbacks for values a property file omits.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefaults {
    /// Shallowest order with tiles (and the allsky order).
    pub order_min: u8,
    /// Deepest order with tiles.
    pub order_max: u8,
    /// Frame for non-planet surveys without `hips_frame`.
    pub frame: Frame,
    /// Tile format when `hips_tile_format` is absent.
    pub tile_format: TileFormat,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Treat the survey as planet-surface imagery.
    pub planet: bool,
}

impl Default for PropertyDefaults {
    fn default() -> Self {
        Self {
            order_min: 3,
            order_max: 3,
            frame: Frame::Icrs,
            tile_format: TileFormat::Jpeg,
            tile_width: 512,
            planet: false,
        }
    }
}

/// Parsed, immutable metadata for one survey.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySet {
    entries: BTreeMap<String, String>,
    skipped_lines: usize,
    order_min: u8,
    order_max: u8,
    frame: Frame,
    frame_declared: bool,
    tile_formats: Vec<TileFormat>,
    tile_width: u32,
    release_date: Option<f64>,
    label: Option<String>,
    planet: bool,
}

impl PropertySet {
    /// Property set built purely from defaults, used when the property file
    /// could not be fetched or parsed.
    pub fn from_defaults(defaults: &PropertyDefaults) -> Self {
        Self {
            entries: BTreeMap::new(),
            skipped_lines: 0,
            order_min: defaults.order_min.min(defaults.order_max),
            order_max: defaults.order_max,
            frame: default_frame(defaults, defaults.planet),
            frame_declared: false,
            tile_formats: vec![defaults.tile_format.clone()],
            tile_width: defaults.tile_width,
            release_date: None,
            label: None,
            planet: defaults.planet,
        }
    }

    /// Raw value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of distinct keys parsed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines skipped as malformed during parsing.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Iterate raw `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn order_min(&self) -> u8 {
        self.order_min
    }

    pub fn order_max(&self) -> u8 {
        self.order_max
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Whether the file names a supported frame, as opposed to a default.
    pub fn declares_frame(&self) -> bool {
        self.frame_declared
    }

    /// All advertised tile formats, in file order.
    pub fn tile_formats(&self) -> &[TileFormat] {
        &self.tile_formats
    }

    /// Format used to fetch tiles.
    pub fn tile_format(&self) -> &TileFormat {
        // tile_formats is never empty: the parser falls back to the default.
        TileFormat::preferred(&self.tile_formats).unwrap_or(&TileFormat::Jpeg)
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    /// Release date as MJD, when the file declares a valid one.
    pub fn release_date(&self) -> Option<f64> {
        self.release_date
    }

    /// `obs_title`, if present.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_planet(&self) -> bool {
        self.planet
    }

    /// Whether tiles are displayable images rather than custom payloads.
    pub fn is_imagery(&self) -> bool {
        self.tile_format().is_imagery()
    }
}

/// Parse property text with [`PropertyDefaults::default`].
///
/// # Example
///
/// ```
/// use hipstile::properties::{parse_properties, Frame};
///
/// let props = parse_properties("hips_order_max = 9\nhips_frame = equatorial\n").unwrap();
/// assert_eq!(props.order_max(), 9);
/// assert_eq!(props.frame(), Frame::Icrs);
/// ```
pub fn parse_properties(text: &str) -> Result<PropertySet, ParseError> {
    parse_properties_with(text, &PropertyDefaults::default())
}

/// Parse property text, filling omitted or invalid values from `defaults`.
pub fn parse_properties_with(
    text: &str,
    defaults: &PropertyDefaults,
) -> Result<PropertySet, ParseError> {
    let (entries, skipped_lines) = parse_key_values(text)?;

    let mut set = PropertySet::from_defaults(defaults);
    set.skipped_lines = skipped_lines;

    let lookup = |keys: &[&str]| keys.iter().find_map(|k| entries.get(*k).map(String::as_str));

    if let Some(value) = lookup(&["hips_order", "hips_order_max", "maxOrder"]) {
        set.order_max = parse_order(value, "hips_order").unwrap_or(defaults.order_max);
    }
    set.order_min = match lookup(&["hips_order_min"]) {
        Some(value) => parse_order(value, "hips_order_min").unwrap_or(defaults.order_min),
        None => defaults.order_min,
    };
    set.order_min = set.order_min.min(set.order_max);

    set.planet = defaults.planet || entries.contains_key("hips_body");
    set.frame = match lookup(&["hips_frame", "coordsys"]) {
        Some(value) => match value.parse::<Frame>() {
            Ok(frame) => {
                set.frame_declared = true;
                frame
            }
            Err(e) => {
                warn!(error = %e, "Unsupported survey frame, using default");
                default_frame(defaults, set.planet)
            }
        },
        None => default_frame(defaults, set.planet),
    };

    if let Some(value) = lookup(&["hips_tile_format", "format"]) {
        let formats: Vec<TileFormat> = value.split_whitespace().map(TileFormat::from_token).collect();
        if !formats.is_empty() {
            set.tile_formats = formats;
        }
    }

    if let Some(value) = lookup(&["hips_tile_width"]) {
        match value.parse::<u32>() {
            Ok(width) if width > 0 => set.tile_width = width,
            _ => warn!(value, "Invalid hips_tile_width, using default"),
        }
    }

    if let Some(value) = lookup(&["hips_release_date"]) {
        set.release_date = parse_date(value);
        if set.release_date.is_none() {
            debug!(value, "Unrecognised hips_release_date, treating as unknown");
        }
    }

    set.label = lookup(&["obs_title"])
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    set.entries = entries;

    if skipped_lines > 0 {
        debug!(skipped_lines, keys = set.len(), "Skipped malformed property lines");
    }
    Ok(set)
}

fn default_frame(defaults: &PropertyDefaults, planet: bool) -> Frame {
    if planet {
        Frame::Observed
    } else {
        defaults.frame
    }
}

fn parse_order(value: &str, key: &str) -> Option<u8> {
    match value.parse::<u8>() {
        Ok(order) if order <= crate::healpix::MAX_ORDER => Some(order),
        _ => {
            warn!(key, value, "Invalid order value, using default");
            None
        }
    }
}

/// Split text into key/value pairs, returning the pairs and the number of
/// skipped lines.
pub(crate) fn parse_key_values(text: &str) -> Result<(BTreeMap<String, String>, usize), ParseError> {
    if text.contains('\0') {
        return Err(ParseError::Binary);
    }

    let mut entries = BTreeMap::new();
    let mut skipped = 0usize;
    let mut content_lines = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        content_lines += 1;
        match split_pair(line) {
            Some((key, value)) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => skipped += 1,
        }
    }

    if content_lines > 0 && entries.is_empty() {
        return Err(ParseError::NoEntries { skipped });
    }
    Ok((entries, skipped))
}

/// Split a trimmed `key = value` line. Keys must be non-empty and contain no
/// whitespace.
pub(crate) fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_max_and_frame() {
        let props = parse_properties("hips_order_max = 9\nhips_frame = equatorial\n").unwrap();
        assert_eq!(props.order_max(), 9);
        assert_eq!(props.frame(), Frame::Icrs);
        assert_eq!(props.len(), 2);
        assert_eq!(props.skipped_lines(), 0);
    }

    #[test]
    fn test_single_malformed_line_is_skipped() {
        let text = "\
creator_did = ivo://CDS/P/DSS2/color
obs_title = DSS colored
hips_version = 1.4
hips_release_date = 2019-05-07T10:55Z
hips_frame = equatorial
hips_order = 9
this line has no separator
hips_order_min = 3
hips_tile_width = 512
hips_tile_format = jpeg png
";
        let props = parse_properties(text).unwrap();
        assert_eq!(props.len(), 9);
        assert_eq!(props.skipped_lines(), 1);
        assert_eq!(props.order_max(), 9);
        assert_eq!(props.order_min(), 3);
        assert_eq!(props.label(), Some("DSS colored"));
        assert_eq!(props.tile_format(), &TileFormat::Png);
        assert!(props.release_date().is_some());
        assert_eq!(props.get("hips_version"), Some("1.4"));
    }

    #[test]
    fn test_compact_and_legacy_keys() {
        let props = parse_properties("maxOrder=6\ncoordsys=G\nformat=png\n").unwrap();
        assert_eq!(props.order_max(), 6);
        assert_eq!(props.frame(), Frame::Galactic);
        assert_eq!(props.tile_format(), &TileFormat::Png);
    }

    #[test]
    fn test_defaults_applied_for_missing_and_invalid_values() {
        let defaults = PropertyDefaults {
            order_max: 5,
            ..PropertyDefaults::default()
        };
        let props = parse_properties_with("hips_order = lots\nhips_tile_width = 0\n", &defaults)
            .unwrap();
        assert_eq!(props.order_max(), 5);
        assert_eq!(props.order_min(), 3);
        assert_eq!(props.tile_width(), 512);
        assert_eq!(props.frame(), Frame::Icrs);
        assert_eq!(props.release_date(), None);
    }

    #[test]
    fn test_order_min_clamped_to_order_max() {
        let props = parse_properties("hips_order = 1\nhips_order_min = 3\n").unwrap();
        assert_eq!(props.order_min(), 1);
        assert_eq!(props.order_max(), 1);
    }

    #[test]
    fn test_planet_defaults_to_observed_frame() {
        let props = parse_properties("hips_body = mars\nhips_order = 4\n").unwrap();
        assert!(props.is_planet());
        assert_eq!(props.frame(), Frame::Observed);

        let props = parse_properties("hips_body = moon\nhips_frame = equatorial\n").unwrap();
        assert_eq!(props.frame(), Frame::Icrs);
    }

    #[test]
    fn test_custom_format_is_not_imagery() {
        let props = parse_properties("hips_tile_format = eph\n").unwrap();
        assert!(!props.is_imagery());
        assert_eq!(props.tile_format().extension(), "eph");
    }

    #[test]
    fn test_invalid_release_date_is_unknown() {
        let props = parse_properties("hips_release_date = yesterday\n").unwrap();
        assert_eq!(props.release_date(), None);
    }

    #[test]
    fn test_comments_and_empty_input() {
        let props = parse_properties("# comment only\n\n").unwrap();
        assert!(props.is_empty());
        assert_eq!(props.order_max(), PropertyDefaults::default().order_max);
    }

    #[test]
    fn test_structurally_malformed_input_fails() {
        assert_eq!(
            parse_properties("<html>\n<body>Not Found</body>\n</html>\n"),
            Err(ParseError::NoEntries { skipped: 3 })
        );
        assert_eq!(parse_properties("a = b\0"), Err(ParseError::Binary));
    }

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("a=b"), Some(("a", "b")));
        assert_eq!(split_pair("a = b = c"), Some(("a", "b = c")));
        assert_eq!(split_pair("key ="), Some(("key", "")));
        assert_eq!(split_pair("= value"), None);
        assert_eq!(split_pair("two words = x"), None);
        assert_eq!(split_pair("no separator"), None);
    }
}
