//! Plan command - show which tiles a view would draw and where their
//! textures come from.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hipstile::config::format_size;
use hipstile::decode::RawBytesDecoder;
use hipstile::lod::view::{icrs_to_frame, radec_to_vec};
use hipstile::lod::{PaintTile, SimpleView, TextureOrigin, ViewContext};
use hipstile::survey::TileFlags;

use super::common::{fov_radians, print_header};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Tiles listed individually before the output is truncated.
const MAX_LISTED: usize = 32;

/// Arguments for the plan command.
pub struct PlanArgs {
    pub url: String,
    pub fov: f64,
    pub width: u32,
    pub height: u32,
    pub ra: f64,
    pub dec: f64,
    pub fetch: bool,
    pub timeout: u64,
}

pub fn run(runner: &CliRunner, args: PlanArgs) -> Result<(), CliError> {
    runner.log_startup("plan");
    let fov = fov_radians(args.fov)?;
    let survey = runner.open_survey(&args.url, Arc::new(RawBytesDecoder))?;

    let direction = icrs_to_frame(survey.frame(), radec_to_vec(args.ra, args.dec));
    let view = SimpleView::new(direction, fov, args.width, args.height);
    let mut options = runner.config().render_options();
    if !args.fetch {
        options.flags = TileFlags::CACHED_ONLY;
    }

    let mut painted: Vec<PaintTile<Bytes>> = Vec::new();
    let mut stats = survey.render(&view, &options, &mut painted);
    if args.fetch {
        let settled = runner.wait_until(Duration::from_secs(args.timeout), || {
            survey.cache_stats().loading_entries == 0
        });
        if !settled {
            println!("Some tiles were still loading after {}s.", args.timeout);
        }
        painted.clear();
        stats = survey.render(&view, &options, &mut painted);
    }

    print_header(&format!(
        "Plan for {} ({}x{} px, fov {:.2} deg)",
        survey.label().as_deref().unwrap_or(survey.url()),
        args.width,
        args.height,
        args.fov
    ));
    println!(
        "  Render order: {} (survey orders {} - {})",
        survey.render_order(view.pixels_per_radian(), TAU),
        survey.order_min(),
        survey.order_max()
    );
    println!("  Tiles:        {} ({} complete)", stats.tiles, stats.complete);
    println!("  Traversal:    {:?}", stats.outcome);

    let count = |wanted: fn(&TextureOrigin) -> bool| {
        painted.iter().filter(|p| wanted(&p.texture.origin)).count()
    };
    println!(
        "  Sources:      {} own, {} ancestor, {} allsky, {} missing",
        count(|o| matches!(o, TextureOrigin::Tile)),
        count(|o| matches!(o, TextureOrigin::Ancestor(_))),
        count(|o| matches!(o, TextureOrigin::Allsky)),
        count(|o| matches!(o, TextureOrigin::Missing)),
    );

    println!();
    for tile in painted.iter().take(MAX_LISTED) {
        let origin = match tile.texture.origin {
            TextureOrigin::Tile => "tile".to_string(),
            TextureOrigin::Ancestor(a) => format!("ancestor {}", a),
            TextureOrigin::Allsky => "allsky".to_string(),
            TextureOrigin::Missing => "missing".to_string(),
        };
        println!(
            "  {:<16} split {:>2}  {}",
            tile.node.address.to_string(),
            tile.node.split,
            origin
        );
    }
    if painted.len() > MAX_LISTED {
        println!("  ... {} more", painted.len() - MAX_LISTED);
    }

    let cache = survey.cache_stats();
    println!();
    println!(
        "Cache:   {} tiles, {} of {}",
        cache.loaded_entries,
        format_size(cache.size_bytes),
        format_size(cache.budget_bytes)
    );
    println!("Network: {}", runner.loader().metrics().snapshot());
    Ok(())
}
