//! Milky Way background layer.
//!
//! Draws a whole-sky HiPS survey behind everything else. It only shows for
//! wide fields of view: invisible below 10 degrees, fully visible from 20.

use std::sync::Arc;

use super::fader::{smoothstep, Fader};
use super::SkyLayer;
use crate::loader::TileLoader;
use crate::lod::{RenderOptions, RenderStats, TilePainter, ViewContext};
use crate::properties::HipsListEntry;
use crate::survey::{Survey, SurveySettings, TileFlags};

/// Title a data source must carry to be picked up by this layer.
pub const MILKYWAY_TITLE: &str = "milkyway";

const SPLIT_ORDER: u8 = 2;
const MIN_ALPHA: f64 = 1.0 / 255.0;

pub struct MilkyWay<T> {
    loader: Arc<TileLoader>,
    settings: Option<SurveySettings<T>>,
    survey: Option<Arc<Survey<T>>>,
    visible: Fader,
}

impl<T> MilkyWay<T>
where
    T: Send + Sync + 'static,
{
    /// A layer waiting for its data source; `settings` configures the
    /// survey created when one arrives.
    pub fn new(loader: Arc<TileLoader>, settings: SurveySettings<T>) -> Self {
        Self {
            loader,
            settings: Some(settings),
            survey: None,
            visible: Fader::new(true),
        }
    }

    pub fn survey(&self) -> Option<&Arc<Survey<T>>> {
        self.survey.as_ref()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible.set_target(visible);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.target()
    }

    /// Opacity the layer would draw with at field of view `fov` (radians).
    pub fn opacity(&self, fov: f64) -> f64 {
        self.visible.value() * smoothstep(10f64.to_radians(), 20f64.to_radians(), fov)
    }
}

impl<T> SkyLayer<T> for MilkyWay<T>
where
    T: Send + Sync + 'static,
{
    fn id(&self) -> &str {
        MILKYWAY_TITLE
    }

    fn z_order(&self) -> i32 {
        5
    }

    fn update(&mut self, dt: f64) -> bool {
        if self.survey.is_none() {
            return false;
        }
        self.visible.update(dt)
    }

    fn add_data_source(&mut self, entry: &HipsListEntry) -> bool {
        if self.survey.is_some() {
            return false;
        }
        let accepted = entry
            .title
            .as_deref()
            .is_some_and(|title| title.eq_ignore_ascii_case(MILKYWAY_TITLE));
        if !accepted {
            return false;
        }
        let Some(settings) = self.settings.take() else {
            return false;
        };
        self.survey = Some(Survey::create(
            entry.url.clone(),
            entry.release_date,
            settings,
            Arc::clone(&self.loader),
        ));
        true
    }

    fn render(&self, view: &dyn ViewContext, painter: &mut dyn TilePainter<T>) -> RenderStats {
        let Some(survey) = &self.survey else {
            return RenderStats::default();
        };
        let opacity = self.opacity(view.fov());
        if opacity < MIN_ALPHA {
            return RenderStats::default();
        }
        let options = RenderOptions {
            split_order: SPLIT_ORDER,
            flags: TileFlags::NONE,
            opacity,
        };
        survey.render(view, &options, painter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::RawBytesDecoder;
    use crate::loader::LoaderConfig;
    use crate::lod::{FullSkyView, PaintTile, SimpleView};
    use crate::transport::MemoryTransport;
    use bytes::Bytes;
    use glam::DVec3;
    use tokio::runtime::Handle;

    fn layer(transport: Arc<MemoryTransport>) -> MilkyWay<Bytes> {
        let loader = Arc::new(TileLoader::new(
            transport,
            Handle::current(),
            &LoaderConfig::default(),
        ));
        MilkyWay::new(loader, SurveySettings::new(Arc::new(RawBytesDecoder)))
    }

    fn entry(url: &str, title: Option<&str>) -> HipsListEntry {
        HipsListEntry {
            url: url.to_string(),
            release_date: None,
            title: title.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_accepts_only_milkyway_source() {
        let mut layer = layer(Arc::new(MemoryTransport::new()));
        assert!(!layer.add_data_source(&entry("https://hips.example/dss", Some("DSS"))));
        assert!(!layer.add_data_source(&entry("https://hips.example/none", None)));
        assert!(layer.add_data_source(&entry("https://hips.example/mw", Some("MilkyWay"))));
        assert_eq!(layer.survey().unwrap().url(), "https://hips.example/mw");
        // Only one source.
        assert!(!layer.add_data_source(&entry("https://hips.example/mw2", Some("milkyway"))));
    }

    #[tokio::test]
    async fn test_hidden_at_narrow_fov() {
        let transport = Arc::new(MemoryTransport::new());
        transport.insert("https://hips.example/mw/properties", "hips_order = 3\n");
        let mut layer = layer(Arc::clone(&transport));
        layer.add_data_source(&entry("https://hips.example/mw", Some("milkyway")));
        layer.survey().unwrap().wait_ready().await;

        let narrow = SimpleView::new(DVec3::X, 5f64.to_radians(), 800, 600);
        let mut painted: Vec<PaintTile<Bytes>> = Vec::new();
        assert_eq!(layer.render(&narrow, &mut painted).tiles, 0);
        assert!(painted.is_empty());

        let wide = FullSkyView {
            pixels_per_radian: 100.0,
        };
        let stats = layer.render(&wide, &mut painted);
        assert_eq!(stats.tiles, 768);
        assert!(painted.iter().all(|t| t.node.split == 1));

        layer.set_visible(false);
        assert!(layer.update(2.0));
        painted.clear();
        assert_eq!(layer.render(&wide, &mut painted).tiles, 0);
    }

    #[test]
    fn test_opacity_ramp() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let _guard = runtime.enter();
        let layer = layer(Arc::new(MemoryTransport::new()));
        assert_eq!(layer.opacity(5f64.to_radians()), 0.0);
        assert!((layer.opacity(15f64.to_radians()) - 0.5).abs() < 1e-9);
        assert_eq!(layer.opacity(90f64.to_radians()), 1.0);
    }
}
