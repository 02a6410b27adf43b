//! List command - show the surveys advertised by a hipslist.

use std::path::PathBuf;

use hipstile::properties::parse_hipslist_entries;
use hipstile::transport::is_remote;

use super::common::{display_date, print_header};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the list command on a hipslist URL or local file.
pub fn run(runner: &CliRunner, source: &str) -> Result<(), CliError> {
    runner.log_startup("list");
    let text = if is_remote(source) {
        let data = runner.runtime().block_on(runner.loader().fetch(source))?;
        String::from_utf8_lossy(&data).into_owned()
    } else {
        std::fs::read_to_string(source).map_err(|source_err| CliError::Read {
            path: PathBuf::from(source),
            source: source_err,
        })?
    };

    let entries = parse_hipslist_entries(&text)?;
    print_header(&format!("{} surveys", entries.len()));
    for entry in &entries {
        println!(
            "  {:<40} {:<17} {}",
            entry.title.as_deref().unwrap_or("(untitled)"),
            display_date(entry.release_date),
            entry.url
        );
    }
    Ok(())
}
