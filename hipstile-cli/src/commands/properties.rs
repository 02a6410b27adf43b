//! Properties command - show a survey's metadata.

use std::sync::Arc;

use hipstile::decode::RawBytesDecoder;

use super::common::{display_date, print_header};
use crate::error::CliError;
use crate::runner::CliRunner;

pub fn run(runner: &CliRunner, url: &str) -> Result<(), CliError> {
    runner.log_startup("properties");
    let survey = runner.open_survey(url, Arc::new(RawBytesDecoder))?;
    let Some(properties) = survey.properties() else {
        return Err(CliError::Config(format!("no properties resolved for {}", url)));
    };

    print_header(survey.label().as_deref().unwrap_or(url));
    println!("  URL:          {}", survey.url());
    println!("  Orders:       {} - {}", survey.order_min(), survey.order_max());
    println!("  Frame:        {}", survey.frame());
    let formats: Vec<_> = properties
        .tile_formats()
        .iter()
        .map(|f| f.extension().to_string())
        .collect();
    println!(
        "  Formats:      {} (using {})",
        formats.join(", "),
        properties.tile_format().extension()
    );
    println!("  Tile width:   {}", survey.tile_width());
    println!("  Released:     {}", display_date(properties.release_date()));
    println!(
        "  Kind:         {}{}",
        if properties.is_imagery() { "imagery" } else { "custom" },
        if survey.is_planet() { ", planet" } else { "" }
    );
    println!("  Allsky:       {}", if survey.has_allsky() { "yes" } else { "no" });

    if properties.is_empty() {
        println!();
        println!("No properties file was read; showing defaults.");
        return Ok(());
    }

    println!();
    println!("Raw properties ({}):", properties.len());
    for (key, value) in properties.iter() {
        println!("  {} = {}", key, value);
    }
    if properties.skipped_lines() > 0 {
        println!("  ({} unreadable lines skipped)", properties.skipped_lines());
    }
    Ok(())
}
