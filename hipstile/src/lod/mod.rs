//! Level-of-detail selection and texture fallback.
//!
//! Two traversal modes share one depth-first walk:
//!
//! - [`traverse`] is a plain quadtree walk driven by a caller predicate,
//!   usable for coverage queries and other non-render work.
//! - [`render_traverse`] picks tiles by screen-space size, culls them
//!   against the view, and prunes children their parent marks empty.
//!
//! [`render`] ties the render walk to [`resolve_texture`], which draws each
//! selected tile with the best texture on hand and requests what is missing.

mod render;
mod resolve;
mod traverse;
pub mod view;

pub use render::{
    render, render_order, render_traverse, PaintTile, RenderNode, RenderOptions, RenderParams,
    RenderStats, TilePainter,
};
pub use resolve::{ancestor_transform, resolve_texture, ResolvedTexture, TextureOrigin};
pub use traverse::{traverse, TraverseOutcome, Visit};
pub use view::{FullSkyView, SimpleView, ViewContext};

use crate::cache::TileView;
use crate::healpix::HealpixAddress;
use crate::survey::AllskyTexture;

/// Tile source the renderer reads from.
///
/// [`Survey`](crate::survey::Survey) is the production implementation.
pub trait TileStore<T> {
    fn order_min(&self) -> u8;
    fn order_max(&self) -> u8;
    fn tile_width(&self) -> u32;

    /// Global fade applied to every tile of this source.
    fn fade(&self) -> f64;

    /// A loaded tile, if any.
    fn loaded(&self, address: HealpixAddress) -> Option<TileView<T>>;

    /// Ask for a tile to be loaded. Must not block.
    fn request(&self, address: HealpixAddress);

    fn allsky(&self) -> Option<AllskyTexture<T>>;
}
