//! End-to-end survey behaviour against a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use glam::DVec2;
use tokio::runtime::Handle;

use hipstile::cache::{CacheConfig, TileErrorCode, TileState};
use hipstile::decode::RawBytesDecoder;
use hipstile::healpix::HealpixAddress;
use hipstile::loader::{LoaderConfig, TileLoader};
use hipstile::lod::{resolve_texture, FullSkyView, PaintTile, RenderOptions, TextureOrigin};
use hipstile::properties::PropertyDefaults;
use hipstile::survey::{Survey, SurveySettings, TileFlags};
use hipstile::transport::{MemoryTransport, Transport, TransportError};

const BASE: &str = "https://hips.example/dss";

fn loader(transport: &Arc<MemoryTransport>) -> Arc<TileLoader> {
    Arc::new(TileLoader::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        Handle::current(),
        &LoaderConfig::default(),
    ))
}

fn settings() -> SurveySettings<Bytes> {
    SurveySettings::new(Arc::new(RawBytesDecoder))
}

fn tile(order: u8, pix: u64) -> HealpixAddress {
    HealpixAddress::new(order, pix).unwrap()
}

fn tile_url(address: HealpixAddress, ext: &str) -> String {
    format!(
        "{BASE}/Norder{}/Dir{}/Npix{}.{ext}",
        address.order(),
        (address.pix() / 10_000) * 10_000,
        address.pix()
    )
}

/// Wait until nothing is loading.
async fn settle(survey: &Survey<Bytes>) {
    for _ in 0..400 {
        if survey.cache_stats().loading_entries == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("loads did not settle");
}

async fn load(survey: &Survey<Bytes>, address: HealpixAddress) {
    survey.get_tile(address, TileFlags::NONE);
    settle(survey).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_fetch_once() {
    let transport = Arc::new(MemoryTransport::new().with_delay(Duration::from_millis(30)));
    transport.insert(
        format!("{BASE}/properties"),
        "hips_tile_format = json\nhips_order = 4\n",
    );
    let address = tile(4, 1234);
    transport.insert(tile_url(address, "json"), "[1,2,3]");

    let survey = Survey::create(BASE, None, settings(), loader(&transport));
    survey.wait_ready().await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let survey = Arc::clone(&survey);
            tokio::spawn(async move { survey.get_tile(address, TileFlags::NONE).code() })
        })
        .collect();
    for code in futures::future::join_all(tasks).await {
        assert_eq!(code.unwrap(), 0);
    }

    settle(&survey).await;
    assert_eq!(transport.request_count(&tile_url(address, "json")), 1);
    let lookup = survey.get_tile(address, TileFlags::NONE);
    assert_eq!(lookup.code(), 200);
    assert_eq!(&lookup.payload().unwrap()[..], b"[1,2,3]");
}

#[tokio::test]
async fn least_recently_used_tile_is_evicted() {
    let transport = Arc::new(MemoryTransport::new());
    transport.insert(
        format!("{BASE}/properties"),
        "hips_tile_format = json\nhips_order = 3\n",
    );
    let (a, b, c) = (tile(3, 0), tile(3, 1), tile(3, 2));
    for address in [a, b, c] {
        transport.insert(tile_url(address, "json"), "1234");
    }

    let cache = CacheConfig {
        budget_bytes: 10,
        ..CacheConfig::default()
    };
    let survey = Survey::create(BASE, None, settings().with_cache(cache), loader(&transport));
    survey.wait_ready().await;

    load(&survey, a).await;
    load(&survey, b).await;
    // Touch `a` so `b` becomes the oldest.
    assert_eq!(survey.get_tile(a, TileFlags::NONE).code(), 200);
    load(&survey, c).await;

    assert_eq!(survey.tile_state(a), TileState::Loaded);
    assert_eq!(survey.tile_state(b), TileState::Missing);
    assert_eq!(survey.tile_state(c), TileState::Loaded);
    let stats = survey.cache_stats();
    assert_eq!(stats.size_bytes, 8);
    assert_eq!(stats.evictions, 1);
}

#[tokio::test]
async fn deep_tiles_resolve_through_max_order_ancestor() {
    let transport = Arc::new(MemoryTransport::new());
    transport.insert(
        format!("{BASE}/properties"),
        "hips_tile_format = json\nhips_order = 3\nhips_order_min = 0\n",
    );
    let ancestor = tile(3, 0);
    transport.insert(tile_url(ancestor, "json"), "{}");

    let survey = Survey::create(BASE, None, settings(), loader(&transport));
    survey.wait_ready().await;
    load(&survey, ancestor).await;

    let deep = tile(5, 3);
    let texture = resolve_texture(&*survey, deep, TileFlags::NONE);
    assert_eq!(texture.origin, TextureOrigin::Ancestor(ancestor));
    assert!(texture.loading_complete);
    let corner = texture.transform.transform_point2(DVec2::ZERO);
    assert!((corner - DVec2::new(0.25, 0.25)).length() < 1e-12);
    let far = texture.transform.transform_point2(DVec2::ONE);
    assert!((far - DVec2::new(0.5, 0.5)).length() < 1e-12);
    // Nothing beyond the deepest order is ever requested.
    assert!(transport.requests().iter().all(|u| !u.contains("Norder5")));
}

#[tokio::test]
async fn render_converges_on_loaded_tiles() {
    let transport = Arc::new(MemoryTransport::new());
    transport.insert(
        format!("{BASE}/properties"),
        "hips_tile_format = json\nhips_order = 1\nhips_order_min = 0\n",
    );
    let root = tile(0, 0);
    let child = tile(1, 1);
    transport.insert(tile_url(root, "json"), "root");
    transport.insert(tile_url(child, "json"), "child");

    let survey = Survey::create(BASE, None, settings(), loader(&transport));
    survey.wait_ready().await;
    load(&survey, root).await;

    let view = FullSkyView {
        pixels_per_radian: 1e7,
    };
    let mut painted: Vec<PaintTile<Bytes>> = Vec::new();
    let stats = survey.render(&view, &RenderOptions::default(), &mut painted);
    assert_eq!(stats.tiles, 48);
    assert_eq!(stats.complete, 0);
    let from_root = painted
        .iter()
        .filter(|p| p.texture.origin == TextureOrigin::Ancestor(root))
        .count();
    assert_eq!(from_root, 4);
    assert!(painted
        .iter()
        .filter(|p| p.node.address.parent() != Some(root))
        .all(|p| p.texture.origin == TextureOrigin::Missing));

    settle(&survey).await;
    let mut painted: Vec<PaintTile<Bytes>> = Vec::new();
    let stats = survey.render(&view, &RenderOptions::default(), &mut painted);
    assert_eq!(stats.complete, 1);
    let own = painted
        .iter()
        .find(|p| p.node.address == child)
        .unwrap();
    assert_eq!(own.texture.origin, TextureOrigin::Tile);
    assert_eq!(&own.texture.texture.as_ref().unwrap()[..], b"child");
}

#[tokio::test]
async fn allsky_backs_unloaded_tiles() {
    let transport = Arc::new(MemoryTransport::new());
    transport.insert(
        format!("{BASE}/properties"),
        "hips_tile_format = png\nhips_order = 5\nhips_order_min = 3\n",
    );
    transport.insert(format!("{BASE}/Norder3/Allsky.png"), "mosaic");

    let survey = Survey::create(BASE, None, settings(), loader(&transport));
    survey.wait_ready().await;
    assert!(survey.has_allsky());

    let address = tile(4, 77);
    let texture = resolve_texture(&*survey, address, TileFlags::CACHED_ONLY);
    assert_eq!(texture.origin, TextureOrigin::Allsky);
    assert!(!texture.loading_complete);
    assert_eq!(survey.tile_state(address), TileState::Missing);

    let forced = resolve_texture(&*survey, address, TileFlags::FORCE_USE_ALLSKY);
    assert_eq!(forced.origin, TextureOrigin::Allsky);
    assert!(forced.loading_complete);
}

#[tokio::test]
async fn unreachable_properties_use_defaults() {
    let transport = Arc::new(MemoryTransport::new());
    transport.insert_error(
        format!("{BASE}/properties"),
        TransportError::Status {
            url: format!("{BASE}/properties"),
            status: 503,
        },
    );
    let defaults = PropertyDefaults {
        order_min: 2,
        order_max: 6,
        ..PropertyDefaults::default()
    };

    let survey = Survey::create(
        BASE,
        None,
        settings().with_defaults(defaults),
        loader(&transport),
    );
    survey.wait_ready().await;

    assert_eq!(survey.order_min(), 2);
    assert_eq!(survey.order_max(), 6);
    assert_eq!(transport.request_count(&format!("{BASE}/Norder2/Allsky.jpg")), 1);
    assert!(!survey.has_allsky());
}

#[tokio::test]
async fn network_errors_are_retried_after_backoff() {
    let transport = Arc::new(MemoryTransport::new());
    transport.insert(
        format!("{BASE}/properties"),
        "hips_tile_format = json\nhips_order = 3\n",
    );
    let address = tile(3, 9);
    let url = tile_url(address, "json");
    transport.insert_error(url.clone(), TransportError::Timeout { url: url.clone() });

    let cache = CacheConfig {
        error_backoff: Duration::ZERO,
        ..CacheConfig::default()
    };
    let survey = Survey::create(BASE, None, settings().with_cache(cache), loader(&transport));
    survey.wait_ready().await;

    load(&survey, address).await;
    assert_eq!(
        survey.tile_state(address),
        TileState::Error(TileErrorCode::Network)
    );

    transport.insert(url.clone(), "ok");
    load(&survey, address).await;
    assert_eq!(survey.get_tile(address, TileFlags::NONE).code(), 200);
    assert_eq!(transport.request_count(&url), 2);
}
