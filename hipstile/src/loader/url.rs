//! HiPS resource URLs.
//!
//! Tiles live at `{base}/Norder{o}/Dir{d}/Npix{pix}.{ext}` where `d` is
//! `pix` rounded down to a multiple of 10000. When the survey's release
//! date is known, tile and allsky URLs carry `?v={mjd}` so HTTP caches
//! refresh after a new release.

use crate::healpix::HealpixAddress;
use crate::properties::TileFormat;

fn trim(base: &str) -> &str {
    base.trim_end_matches('/')
}

fn version_suffix(release_date: Option<f64>) -> String {
    match release_date {
        Some(mjd) if mjd.is_finite() && mjd >= 0.0 => format!("?v={}", mjd.floor() as u64),
        _ => String::new(),
    }
}

pub fn properties_url(base: &str) -> String {
    format!("{}/properties", trim(base))
}

pub fn tile_url(
    base: &str,
    address: HealpixAddress,
    format: &TileFormat,
    release_date: Option<f64>,
) -> String {
    let pix = address.pix();
    format!(
        "{}/Norder{}/Dir{}/Npix{}.{}{}",
        trim(base),
        address.order(),
        (pix / 10_000) * 10_000,
        pix,
        format.extension(),
        version_suffix(release_date)
    )
}

pub fn allsky_url(base: &str, order: u8, format: &TileFormat, release_date: Option<f64>) -> String {
    format!(
        "{}/Norder{}/Allsky.{}{}",
        trim(base),
        order,
        format.extension(),
        version_suffix(release_date)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url() {
        let addr = HealpixAddress::new(7, 123_456).unwrap();
        assert_eq!(
            tile_url("https://hips.example/DSS/", addr, &TileFormat::Jpeg, None),
            "https://hips.example/DSS/Norder7/Dir120000/Npix123456.jpg"
        );
        let addr = HealpixAddress::new(3, 42).unwrap();
        assert_eq!(
            tile_url("https://hips.example/DSS", addr, &TileFormat::Webp, Some(58000.7)),
            "https://hips.example/DSS/Norder3/Dir0/Npix42.webp?v=58000"
        );
    }

    #[test]
    fn test_allsky_and_properties_url() {
        assert_eq!(
            allsky_url("https://hips.example/Mars", 3, &TileFormat::Png, None),
            "https://hips.example/Mars/Norder3/Allsky.png"
        );
        assert_eq!(
            properties_url("https://hips.example/Mars/"),
            "https://hips.example/Mars/properties"
        );
    }
}
