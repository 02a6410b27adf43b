//! Hipslist parsing: an index of sub-surveys served by a HiPS node.
//!
//! A hipslist is a sequence of `key = value` blocks, one per survey,
//! separated by blank lines. Each entry is introduced by `hips_service_url`;
//! a second URL line before a blank line starts a new entry.

use tracing::debug;

use super::types::ParseError;
use super::{parse_date, split_pair};

/// One survey advertised by a hipslist.
#[derive(Debug, Clone, PartialEq)]
pub struct HipsListEntry {
    /// Root URL of the survey.
    pub url: String,
    /// Release date (MJD), if declared in the supported profile.
    pub release_date: Option<f64>,
    /// `obs_title`, if declared.
    pub title: Option<String>,
}

#[derive(Default)]
struct PendingEntry {
    url: Option<String>,
    release_date: Option<f64>,
    title: Option<String>,
}

impl PendingEntry {
    fn take(&mut self) -> Option<HipsListEntry> {
        let pending = std::mem::take(self);
        pending.url.map(|url| HipsListEntry {
            url,
            release_date: pending.release_date,
            title: pending.title,
        })
    }
}

/// Parse a hipslist, invoking `callback` for every complete entry.
///
/// Returns the number of entries parsed. Malformed lines are skipped; the
/// only errors are for input that is not key/value text at all.
///
/// # Example
///
/// ```
/// use hipstile::properties::parse_hipslist;
///
/// let text = "hips_service_url = https://a.example/dss\n\
///             hips_service_url = https://b.example/2mass\n";
/// let mut urls = Vec::new();
/// let count = parse_hipslist(text, |entry| urls.push(entry.url.clone())).unwrap();
/// assert_eq!(count, 2);
/// ```
pub fn parse_hipslist<F>(text: &str, mut callback: F) -> Result<usize, ParseError>
where
    F: FnMut(&HipsListEntry),
{
    if text.contains('\0') {
        return Err(ParseError::Binary);
    }

    let mut pending = PendingEntry::default();
    let mut count = 0usize;
    let mut skipped = 0usize;
    let mut pairs = 0usize;

    let mut flush = |pending: &mut PendingEntry, count: &mut usize| {
        if let Some(entry) = pending.take() {
            callback(&entry);
            *count += 1;
        }
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut pending, &mut count);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = split_pair(line) else {
            skipped += 1;
            continue;
        };
        pairs += 1;
        match key {
            "hips_service_url" => {
                if pending.url.is_some() {
                    flush(&mut pending, &mut count);
                }
                pending.url = Some(value.to_string());
            }
            "hips_release_date" => pending.release_date = parse_date(value),
            "obs_title" => pending.title = Some(value.to_string()),
            _ => {}
        }
    }
    flush(&mut pending, &mut count);

    if pairs == 0 && skipped > 0 {
        return Err(ParseError::NoEntries { skipped });
    }
    if skipped > 0 {
        debug!(skipped, entries = count, "Skipped malformed hipslist lines");
    }
    Ok(count)
}

/// Parse a hipslist into a vector of entries.
pub fn parse_hipslist_entries(text: &str) -> Result<Vec<HipsListEntry>, ParseError> {
    let mut entries = Vec::new();
    parse_hipslist(text, |entry| entries.push(entry.clone()))?;
    Ok(entries)
}
