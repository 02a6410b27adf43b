//! One HiPS dataset: metadata, tile cache and loader behind a single handle.
//!
//! [`Survey::create`] returns immediately and fetches the property file in
//! the background, followed by the allsky mosaic for imagery surveys. Until
//! the property file is in, tile lookups report `Pending`; if it cannot be
//! fetched or parsed the survey carries on with the caller's defaults.
//!
//! All lookups are synchronous and never block on I/O: a miss schedules a
//! load and reports `Pending`, and later calls observe the result.

mod allsky;
mod settings;

use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, TileCache, TileErrorCode, TileState, TileView};
use crate::decode::{TileDecoder, TileSource};
use crate::healpix::HealpixAddress;
use crate::loader::url::{allsky_url, properties_url, tile_url};
use crate::loader::{LoadError, LoadJob, TileLoader};
use crate::lod::{self, RenderOptions, RenderParams, RenderStats, TilePainter, TileStore, ViewContext};
use crate::properties::{parse_properties_with, Frame, PropertyDefaults, PropertySet};

pub use allsky::{AllskyLayout, AllskyTexture};
pub use settings::{SurveySettings, TileFlags};

/// Result of a synchronous tile lookup.
#[derive(Debug)]
pub enum TileLookup<T> {
    /// The decoded payload.
    Ready(Arc<T>),
    /// Not available yet; a load may have been scheduled.
    Pending,
    /// The tile will not become available.
    Error(TileErrorCode),
}

impl<T> TileLookup<T> {
    /// HTTP-like status: 200 when ready, 0 while pending, else the error code.
    pub fn code(&self) -> i32 {
        match self {
            TileLookup::Ready(_) => 200,
            TileLookup::Pending => 0,
            TileLookup::Error(code) => code.code(),
        }
    }

    pub fn payload(&self) -> Option<&Arc<T>> {
        match self {
            TileLookup::Ready(payload) => Some(payload),
            _ => None,
        }
    }
}

enum AllskyState<T> {
    Pending,
    Ready(AllskyTexture<T>),
    Absent,
}

struct SurveyState<T> {
    properties: Option<Arc<PropertySet>>,
    allsky: AllskyState<T>,
    fade: f64,
    label: Option<String>,
    frame: Option<Frame>,
}

/// A HiPS survey.
pub struct Survey<T> {
    base_url: String,
    release_hint: Option<f64>,
    flags: TileFlags,
    defaults: PropertyDefaults,
    decoder: Arc<dyn TileDecoder<T>>,
    loader: Arc<TileLoader>,
    cache: Arc<TileCache<T>>,
    state: RwLock<SurveyState<T>>,
    ready: watch::Sender<bool>,
}

impl<T> Survey<T>
where
    T: Send + Sync + 'static,
{
    /// Create a survey rooted at `base_url` and start fetching its metadata.
    ///
    /// `release_hint` is the release date (MJD) from a hipslist entry, used
    /// for cache-busting URLs when the property file has none.
    pub fn create(
        base_url: impl Into<String>,
        release_hint: Option<f64>,
        settings: SurveySettings<T>,
        loader: Arc<TileLoader>,
    ) -> Arc<Self> {
        let mut defaults = settings.defaults;
        defaults.planet |= settings.flags.contains(TileFlags::PLANET);
        let (ready, _) = watch::channel(false);

        let survey = Arc::new(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            release_hint,
            flags: settings.flags,
            defaults,
            decoder: settings.decoder,
            cache: Arc::new(TileCache::new(settings.cache)),
            loader,
            state: RwLock::new(SurveyState {
                properties: None,
                allsky: AllskyState::Pending,
                fade: 1.0,
                label: None,
                frame: None,
            }),
            ready,
        });

        debug!(url = %survey.base_url, "Creating survey");
        survey
            .loader
            .runtime()
            .spawn(Self::initialize(Arc::downgrade(&survey)));
        survey
    }

    async fn initialize(weak: Weak<Self>) {
        let Some((loader, base_url, defaults)) = weak.upgrade().map(|survey| {
            (
                Arc::clone(&survey.loader),
                survey.base_url.clone(),
                survey.defaults.clone(),
            )
        }) else {
            return;
        };

        let properties = Arc::new(fetch_properties(&loader, &base_url, &defaults).await);

        let (allsky_url, order, decoder) = {
            let Some(survey) = weak.upgrade() else {
                return;
            };
            survey.state.write().properties = Some(Arc::clone(&properties));
            info!(
                url = %base_url,
                order_min = properties.order_min(),
                order_max = properties.order_max(),
                format = %properties.tile_format(),
                frame = %properties.frame(),
                "Survey properties ready"
            );

            if !properties.is_imagery() {
                survey.resolve_allsky(AllskyState::Absent);
                return;
            }
            let order = properties.order_min();
            let url = allsky_url(
                &base_url,
                order,
                properties.tile_format(),
                survey.release_date(&properties),
            );
            (url, order, Arc::clone(&survey.decoder))
        };

        let outcome: Result<_, LoadError> = match loader.fetch(&allsky_url).await {
            Ok(data) => crate::loader::decode(decoder, TileSource::Allsky { order }, data).await,
            Err(e) => Err(e.into()),
        };

        let Some(survey) = weak.upgrade() else {
            return;
        };
        let allsky = match outcome {
            Ok(decoded) => {
                debug!(url = %allsky_url, cost = decoded.cost, "Allsky loaded");
                AllskyState::Ready(AllskyTexture {
                    payload: Arc::new(decoded.payload),
                    layout: AllskyLayout::new(order),
                })
            }
            Err(e) if e.code() == TileErrorCode::NotFound => {
                debug!(url = %allsky_url, "Survey has no allsky");
                AllskyState::Absent
            }
            Err(e) => {
                warn!(url = %allsky_url, error = %e, "Failed to load allsky");
                AllskyState::Absent
            }
        };
        survey.resolve_allsky(allsky);
    }

    fn resolve_allsky(&self, allsky: AllskyState<T>) {
        self.state.write().allsky = allsky;
        self.ready.send_replace(true);
    }

    /// Synchronous tile lookup for custom-payload consumers.
    ///
    /// Returns the payload when loaded. Otherwise schedules a load (unless
    /// `CACHED_ONLY`) and reports `Pending`. Tiles outside the survey's
    /// order range, and tiles the server does not have, report an error.
    pub fn get_tile(&self, address: HealpixAddress, flags: TileFlags) -> TileLookup<T> {
        let Some(properties) = self.properties() else {
            return TileLookup::Pending;
        };
        if !in_range(&properties, address) {
            return TileLookup::Error(TileErrorCode::OutOfRange);
        }
        if let Some(view) = self.cache.get(address) {
            return TileLookup::Ready(view.payload);
        }
        if let TileState::Error(code) = self.cache.state(address) {
            if !code.is_retryable() {
                return TileLookup::Error(code);
            }
        }
        if !flags.contains(TileFlags::CACHED_ONLY) {
            self.request_with(&properties, address);
        }
        TileLookup::Pending
    }

    fn request_with(&self, properties: &PropertySet, address: HealpixAddress) -> bool {
        if !in_range(properties, address) {
            return false;
        }
        let url = tile_url(
            &self.base_url,
            address,
            properties.tile_format(),
            self.release_date(properties),
        );
        self.loader.request(LoadJob {
            cache: Arc::clone(&self.cache),
            decoder: Arc::clone(&self.decoder),
            address,
            url,
        })
    }

    /// Draw the survey: selects tiles for `view`, resolves their textures and
    /// hands them to `painter`.
    pub fn render<V>(
        &self,
        view: &V,
        options: &RenderOptions,
        painter: &mut dyn TilePainter<T>,
    ) -> RenderStats
    where
        V: ViewContext + ?Sized,
    {
        self.cache.begin_frame();
        lod::render(self, view, options, painter)
    }
}

impl<T> Survey<T> {
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Whether the property file and the allsky attempt have both resolved.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until [`is_ready`](Self::is_ready).
    pub async fn wait_ready(&self) {
        let mut ready = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = ready.wait_for(|ready| *ready).await;
    }

    /// Parsed metadata, once the property file has been handled.
    pub fn properties(&self) -> Option<Arc<PropertySet>> {
        self.state.read().properties.clone()
    }

    pub fn has_allsky(&self) -> bool {
        matches!(self.state.read().allsky, AllskyState::Ready(_))
    }

    /// Display label: the override, else the survey's `obs_title`.
    pub fn label(&self) -> Option<String> {
        let state = self.state.read();
        state.label.clone().or_else(|| {
            state
                .properties
                .as_ref()
                .and_then(|p| p.label().map(str::to_string))
        })
    }

    pub fn set_label(&self, label: impl Into<String>) {
        self.state.write().label = Some(label.into());
    }

    /// Coordinate frame of the tiles.
    ///
    /// A frame declared in the property file wins over [`set_frame`](Self::set_frame).
    pub fn frame(&self) -> Frame {
        let state = self.state.read();
        match &state.properties {
            Some(p) if p.declares_frame() => p.frame(),
            Some(p) => state.frame.unwrap_or_else(|| p.frame()),
            None => state.frame.unwrap_or(if self.defaults.planet {
                Frame::Observed
            } else {
                self.defaults.frame
            }),
        }
    }

    /// Frame to use when the property file does not declare one.
    pub fn set_frame(&self, frame: Frame) {
        self.state.write().frame = Some(frame);
    }

    pub fn fade(&self) -> f64 {
        self.state.read().fade
    }

    /// Global fade in `[0, 1]`; values outside are clamped.
    pub fn set_fade(&self, fade: f64) {
        self.state.write().fade = if fade.is_nan() { 0.0 } else { fade.clamp(0.0, 1.0) };
    }

    pub fn flags(&self) -> TileFlags {
        self.flags
    }

    pub fn is_planet(&self) -> bool {
        self.properties()
            .map(|p| p.is_planet())
            .unwrap_or(self.defaults.planet)
    }

    fn release_date(&self, properties: &PropertySet) -> Option<f64> {
        properties.release_date().or(self.release_hint)
    }

    fn with_properties<R>(&self, f: impl FnOnce(&PropertySet) -> R, default: R) -> R {
        match &self.state.read().properties {
            Some(p) => f(&**p),
            None => default,
        }
    }

    pub fn order_min(&self) -> u8 {
        self.with_properties(PropertySet::order_min, self.defaults.order_min)
    }

    pub fn order_max(&self) -> u8 {
        self.with_properties(PropertySet::order_max, self.defaults.order_max)
    }

    pub fn tile_width(&self) -> u32 {
        self.with_properties(PropertySet::tile_width, self.defaults.tile_width)
    }

    /// Deepest order worth drawing for a survey spanning `angle` radians
    /// at `pixels_per_radian`.
    pub fn render_order(&self, pixels_per_radian: f64, angle: f64) -> u8 {
        let params = RenderParams {
            order_min: self.order_min(),
            order_max: self.order_max(),
            tile_width: self.tile_width(),
            split_order: 0,
        };
        lod::render_order(&params, pixels_per_radian, angle)
    }

    pub fn tile_state(&self, address: HealpixAddress) -> TileState {
        self.cache.state(address)
    }

    pub fn cache(&self) -> &TileCache<T> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached tile and discard loads still in flight.
    pub fn shutdown(&self) {
        self.cache.close();
    }
}

impl<T> Drop for Survey<T> {
    fn drop(&mut self) {
        self.cache.close();
    }
}

impl<T> TileStore<T> for Survey<T>
where
    T: Send + Sync + 'static,
{
    fn order_min(&self) -> u8 {
        Survey::order_min(self)
    }

    fn order_max(&self) -> u8 {
        Survey::order_max(self)
    }

    fn tile_width(&self) -> u32 {
        Survey::tile_width(self)
    }

    fn fade(&self) -> f64 {
        Survey::fade(self)
    }

    fn loaded(&self, address: HealpixAddress) -> Option<TileView<T>> {
        self.cache.get(address)
    }

    fn request(&self, address: HealpixAddress) {
        if let Some(properties) = self.properties() {
            self.request_with(&properties, address);
        }
    }

    fn allsky(&self) -> Option<AllskyTexture<T>> {
        match &self.state.read().allsky {
            AllskyState::Ready(allsky) => Some(allsky.clone()),
            _ => None,
        }
    }
}

fn in_range(properties: &PropertySet, address: HealpixAddress) -> bool {
    (properties.order_min()..=properties.order_max()).contains(&address.order())
}

async fn fetch_properties(
    loader: &TileLoader,
    base_url: &str,
    defaults: &PropertyDefaults,
) -> PropertySet {
    let url = properties_url(base_url);
    match loader.fetch(&url).await {
        Ok(data) => parse_fetched(&url, &data, defaults),
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to fetch survey properties; using defaults");
            PropertySet::from_defaults(defaults)
        }
    }
}

fn parse_fetched(url: &str, data: &Bytes, defaults: &PropertyDefaults) -> PropertySet {
    let text = String::from_utf8_lossy(data);
    match parse_properties_with(&text, defaults) {
        Ok(properties) => properties,
        Err(e) => {
            warn!(url = %url, error = %e, "Unreadable survey properties; using defaults");
            PropertySet::from_defaults(defaults)
        }
    }
}
