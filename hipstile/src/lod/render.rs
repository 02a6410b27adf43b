//! Screen-space driven traversal for rendering.

use std::f64::consts::SQRT_2;

use super::resolve::{resolve_texture, ResolvedTexture};
use super::traverse::{traverse, TraverseOutcome, Visit};
use super::view::ViewContext;
use super::TileStore;
use crate::cache::Transparency;
use crate::healpix::{footprint, Footprint, HealpixAddress};
use crate::survey::TileFlags;

/// Survey parameters that shape the render traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    pub order_min: u8,
    pub order_max: u8,
    pub tile_width: u32,
    /// Leaves shallower than this are subdivided into a finer mesh.
    pub split_order: u8,
}

impl RenderParams {
    pub fn from_store<T, S>(store: &S, split_order: u8) -> Self
    where
        S: TileStore<T> + ?Sized,
    {
        Self {
            order_min: store.order_min(),
            order_max: store.order_max(),
            tile_width: store.tile_width(),
            split_order,
        }
    }
}

/// A tile selected for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderNode {
    pub address: HealpixAddress,
    pub footprint: Footprint,
    /// Mesh subdivisions per side.
    pub split: u32,
}

/// Per-call rendering options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub split_order: u8,
    pub flags: TileFlags,
    /// Multiplied into every tile's fade.
    pub opacity: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            split_order: 3,
            flags: TileFlags::NONE,
            opacity: 1.0,
        }
    }
}

/// One tile handed to the painter.
#[derive(Debug)]
pub struct PaintTile<T> {
    pub node: RenderNode,
    pub texture: ResolvedTexture<T>,
}

/// Receives the tiles of a render pass; owns all drawing.
pub trait TilePainter<T> {
    fn paint(&mut self, tile: PaintTile<T>);
}

impl<T> TilePainter<T> for Vec<PaintTile<T>> {
    fn paint(&mut self, tile: PaintTile<T>) {
        self.push(tile);
    }
}

/// Summary of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub tiles: usize,
    /// Tiles drawn with their final texture.
    pub complete: usize,
    pub outcome: TraverseOutcome,
}

impl Default for RenderStats {
    fn default() -> Self {
        Self {
            tiles: 0,
            complete: 0,
            outcome: TraverseOutcome::Completed,
        }
    }
}

/// Deepest order worth rendering for a survey spanning `angle` radians.
///
/// `ceil(log2(angle * ppr / (4 * sqrt(2) * tile_width)))`, clamped to the
/// survey's order range.
pub fn render_order(params: &RenderParams, pixels_per_radian: f64, angle: f64) -> u8 {
    let width = f64::from(params.tile_width.max(1));
    let order = (angle * pixels_per_radian / (4.0 * SQRT_2 * width)).log2().ceil();
    let max = params.order_max.max(params.order_min);
    if !order.is_finite() || order < f64::from(params.order_min) {
        return params.order_min;
    }
    (order as u8).min(max)
}

/// Walk the quadtree selecting the tiles to draw.
///
/// Always descends to `order_min`; below it, descends while a tile covers
/// more than one tile-width squared of screen pixels, never past
/// `order_max`. Off-screen tiles are culled, and a child is skipped when
/// its parent's transparency mask marks it empty.
pub fn render_traverse<V, M, F>(
    view: &V,
    params: &RenderParams,
    mut transparency: M,
    mut visit: F,
) -> TraverseOutcome
where
    V: ViewContext + ?Sized,
    M: FnMut(HealpixAddress) -> Transparency,
    F: FnMut(RenderNode),
{
    let order_max = params.order_max.max(params.order_min);
    let tile_area = f64::from(params.tile_width).powi(2);
    let ppr2 = view.pixels_per_radian().powi(2);

    traverse(|address| {
        if let Some(parent) = address.parent() {
            if transparency(parent).is_child_empty(address.quadrant()) {
                return Visit::StopSubtree;
            }
        }

        let footprint = footprint(address);
        if !view.is_visible(&footprint) {
            return Visit::StopSubtree;
        }
        let order = address.order();
        if order < params.order_min {
            return Visit::Descend;
        }
        if order < order_max && footprint.solid_angle * ppr2 > tile_area {
            return Visit::Descend;
        }

        visit(RenderNode {
            address,
            footprint,
            split: 1 << params.split_order.saturating_sub(order).min(16),
        });
        Visit::StopSubtree
    })
}

/// Run a full render pass: select tiles, resolve their textures and paint.
pub fn render<T, S, V>(
    store: &S,
    view: &V,
    options: &RenderOptions,
    painter: &mut dyn TilePainter<T>,
) -> RenderStats
where
    S: TileStore<T> + ?Sized,
    V: ViewContext + ?Sized,
{
    let params = RenderParams::from_store::<T, S>(store, options.split_order);
    let mut tiles = 0;
    let mut complete = 0;

    let outcome = render_traverse(
        view,
        &params,
        |parent| {
            store
                .loaded(parent)
                .map(|tile| tile.transparency)
                .unwrap_or_default()
        },
        |node| {
            let mut texture = resolve_texture::<T, S>(store, node.address, options.flags);
            texture.fade *= options.opacity;
            tiles += 1;
            if texture.loading_complete {
                complete += 1;
            }
            painter.paint(PaintTile { node, texture });
        },
    );

    RenderStats {
        tiles,
        complete,
        outcome,
    }
}
