//! Helpers shared across CLI commands.

use hipstile::properties::format_date;

use crate::error::CliError;

/// Print a title underlined to its width.
pub fn print_header(title: &str) {
    println!("{}", title);
    println!("{}", "=".repeat(title.chars().count()));
}

/// Render an MJD as a calendar date, falling back to the raw number.
pub fn display_date(mjd: Option<f64>) -> String {
    match mjd {
        Some(mjd) => format_date(mjd).unwrap_or_else(|| format!("MJD {:.1}", mjd)),
        None => "-".to_string(),
    }
}

/// Validate a field of view given in degrees and convert it to radians.
pub fn fov_radians(degrees: f64) -> Result<f64, CliError> {
    if !(degrees > 0.0 && degrees <= 360.0) {
        return Err(CliError::InvalidArgument(format!(
            "field of view must be in (0, 360] degrees, got {}",
            degrees
        )));
    }
    Ok(degrees.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fov_radians() {
        assert!((fov_radians(180.0).unwrap() - std::f64::consts::PI).abs() < 1e-12);
        assert!(fov_radians(0.0).is_err());
        assert!(fov_radians(f64::NAN).is_err());
        assert!(fov_radians(400.0).is_err());
    }

    #[test]
    fn test_display_date_without_value() {
        assert_eq!(display_date(None), "-");
    }
}
