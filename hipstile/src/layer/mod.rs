//! Sky layers: drawable objects built on surveys.
//!
//! Each concrete layer kind implements [`SkyLayer`]. A [`LayerStack`] keeps
//! them in draw order and routes data sources from hipslist files to the
//! layer that accepts them.

mod fader;
mod milkyway;

use std::sync::Arc;

use tracing::debug;

use crate::lod::{RenderOptions, RenderStats, TilePainter, ViewContext};
use crate::properties::{parse_hipslist, HipsListEntry, ParseError};
use crate::survey::Survey;

pub use fader::{smoothstep, Fader};
pub use milkyway::{MilkyWay, MILKYWAY_TITLE};

/// A drawable sky layer.
pub trait SkyLayer<T> {
    fn id(&self) -> &str;

    /// Draw order; lower values are drawn first.
    fn z_order(&self) -> i32 {
        0
    }

    /// Advance animations by `dt` seconds. Returns whether anything changed.
    fn update(&mut self, _dt: f64) -> bool {
        false
    }

    /// Offer a survey listed in a hipslist. Returns whether it was taken.
    fn add_data_source(&mut self, _entry: &HipsListEntry) -> bool {
        false
    }

    fn render(&self, view: &dyn ViewContext, painter: &mut dyn TilePainter<T>) -> RenderStats;
}

/// A survey drawn as-is with fixed render options.
pub struct SurveyLayer<T> {
    survey: Arc<Survey<T>>,
    options: RenderOptions,
    z_order: i32,
}

impl<T> SurveyLayer<T> {
    pub fn new(survey: Arc<Survey<T>>, options: RenderOptions) -> Self {
        Self {
            survey,
            options,
            z_order: 0,
        }
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn survey(&self) -> &Arc<Survey<T>> {
        &self.survey
    }
}

impl<T> SkyLayer<T> for SurveyLayer<T>
where
    T: Send + Sync + 'static,
{
    fn id(&self) -> &str {
        self.survey.url()
    }

    fn z_order(&self) -> i32 {
        self.z_order
    }

    fn render(&self, view: &dyn ViewContext, painter: &mut dyn TilePainter<T>) -> RenderStats {
        self.survey.render(view, &self.options, painter)
    }
}

/// Layers in draw order.
pub struct LayerStack<T> {
    layers: Vec<Box<dyn SkyLayer<T>>>,
}

impl<T> Default for LayerStack<T> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<T> LayerStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a layer, keeping layers sorted by z-order (stable).
    pub fn push(&mut self, layer: Box<dyn SkyLayer<T>>) {
        let index = self
            .layers
            .partition_point(|existing| existing.z_order() <= layer.z_order());
        self.layers.insert(index, layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|layer| layer.id())
    }

    /// Update every layer; returns whether any changed.
    pub fn update(&mut self, dt: f64) -> bool {
        self.layers
            .iter_mut()
            .fold(false, |changed, layer| layer.update(dt) || changed)
    }

    /// Offer a data source to each layer in order until one accepts it.
    pub fn add_data_source(&mut self, entry: &HipsListEntry) -> Option<&str> {
        let layer = self
            .layers
            .iter_mut()
            .find_map(|layer| layer.add_data_source(entry).then_some(layer))?;
        debug!(url = %entry.url, layer = layer.id(), "Data source accepted");
        Some(layer.id())
    }

    /// Parse a hipslist and offer each entry to the layers.
    ///
    /// Returns the number of entries parsed; entries no layer wants are
    /// ignored.
    pub fn add_hipslist(&mut self, text: &str) -> Result<usize, ParseError> {
        parse_hipslist(text, |entry| {
            if self.add_data_source(entry).is_none() {
                debug!(url = %entry.url, "No layer for data source");
            }
        })
    }

    /// Draw all layers back to front.
    pub fn render(&self, view: &dyn ViewContext, painter: &mut dyn TilePainter<T>) -> RenderStats {
        self.layers
            .iter()
            .fold(RenderStats::default(), |total, layer| {
                let stats = layer.render(view, painter);
                RenderStats {
                    tiles: total.tiles + stats.tiles,
                    complete: total.complete + stats.complete,
                    outcome: stats.outcome,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::{FullSkyView, PaintTile, TraverseOutcome};

    struct Recorder {
        id: &'static str,
        z: i32,
        accepts: &'static str,
        sources: Vec<String>,
    }

    impl Recorder {
        fn boxed(id: &'static str, z: i32, accepts: &'static str) -> Box<dyn SkyLayer<()>> {
            Box::new(Self {
                id,
                z,
                accepts,
                sources: Vec::new(),
            })
        }
    }

    impl SkyLayer<()> for Recorder {
        fn id(&self) -> &str {
            self.id
        }

        fn z_order(&self) -> i32 {
            self.z
        }

        fn add_data_source(&mut self, entry: &HipsListEntry) -> bool {
            if entry.title.as_deref() == Some(self.accepts) {
                self.sources.push(entry.url.clone());
                true
            } else {
                false
            }
        }

        fn render(&self, _view: &dyn ViewContext, _painter: &mut dyn TilePainter<()>) -> RenderStats {
            RenderStats {
                tiles: self.sources.len(),
                complete: 0,
                outcome: TraverseOutcome::Completed,
            }
        }
    }

    #[test]
    fn test_layers_sorted_by_z_order() {
        let mut stack = LayerStack::new();
        stack.push(Recorder::boxed("stars", 10, "stars"));
        stack.push(Recorder::boxed("milkyway", 5, "milkyway"));
        stack.push(Recorder::boxed("dss", 5, "dss"));
        assert_eq!(stack.ids().collect::<Vec<_>>(), vec!["milkyway", "dss", "stars"]);
    }

    #[test]
    fn test_hipslist_routing() {
        let mut stack = LayerStack::new();
        stack.push(Recorder::boxed("milkyway", 5, "milkyway"));
        stack.push(Recorder::boxed("dss", 6, "DSS"));

        let count = stack
            .add_hipslist(
                "hips_service_url = https://a.example/mw\nobs_title = milkyway\n\n\
                 hips_service_url = https://a.example/dss\nobs_title = DSS\n\n\
                 hips_service_url = https://a.example/other\n",
            )
            .unwrap();
        assert_eq!(count, 3);

        let mut painted: Vec<PaintTile<()>> = Vec::new();
        let stats = stack.render(&FullSkyView { pixels_per_radian: 1.0 }, &mut painted);
        assert_eq!(stats.tiles, 2);
    }
}
