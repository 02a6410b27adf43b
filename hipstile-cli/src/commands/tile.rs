//! Tile command - fetch a single tile and describe it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hipstile::cache::TileState;
use hipstile::decode::{RawBytesDecoder, RgbaImageDecoder, TileDecoder, TileSource};
use hipstile::healpix::HealpixAddress;
use hipstile::survey::{TileFlags, TileLookup};

use super::common::print_header;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the tile command.
pub struct TileArgs {
    pub url: String,
    pub order: u8,
    pub pix: u64,
    pub output: Option<PathBuf>,
    pub timeout: u64,
}

pub fn run(runner: &CliRunner, args: TileArgs) -> Result<(), CliError> {
    runner.log_startup("tile");
    let address = HealpixAddress::new(args.order, args.pix)
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let survey = runner.open_survey(&args.url, Arc::new(RawBytesDecoder))?;
    let unavailable = |reason: String| CliError::Tile {
        tile: address.to_string(),
        reason,
    };

    if let TileLookup::Error(code) = survey.get_tile(address, TileFlags::NONE) {
        return Err(unavailable(code.to_string()));
    }
    let settled = runner.wait_until(Duration::from_secs(args.timeout), || {
        survey.tile_state(address) != TileState::Loading
    });
    if !settled {
        return Err(unavailable(format!("still loading after {}s", args.timeout)));
    }

    let data = match survey.tile_state(address) {
        TileState::Error(code) => return Err(unavailable(code.to_string())),
        _ => match survey.get_tile(address, TileFlags::CACHED_ONLY) {
            TileLookup::Ready(data) => data,
            TileLookup::Error(code) => return Err(unavailable(code.to_string())),
            TileLookup::Pending => return Err(unavailable("evicted before it could be read".into())),
        },
    };

    print_header(&format!("Tile {}", address));
    println!("  Survey:   {}", survey.url());
    println!("  Bytes:    {}", data.len());
    println!("  Uniq:     {}", address.uniq());

    let imagery = survey
        .properties()
        .map(|p| p.is_imagery())
        .unwrap_or(false);
    if imagery {
        match RgbaImageDecoder.decode(TileSource::Tile(address), (*data).clone()) {
            Ok(decoded) => {
                println!("  Size:     {}x{}", decoded.payload.width(), decoded.payload.height());
                let empty: Vec<_> = (0..4u8)
                    .filter(|&i| decoded.transparency.is_child_empty(i))
                    .map(|i| i.to_string())
                    .collect();
                if !empty.is_empty() {
                    println!("  Empty children: {}", empty.join(", "));
                }
            }
            Err(e) => println!("  Decode:   failed ({})", e),
        }
    }

    if let Some(path) = args.output {
        std::fs::write(&path, &data[..]).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        println!("  Saved to: {}", path.display());
    }
    Ok(())
}
