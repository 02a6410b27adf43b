//! Texture resolution with progressive fallback.
//!
//! A leaf tile is drawn with the best texture available right now: its own
//! tile when loaded, else the nearest loaded ancestor, else the allsky
//! mosaic. Every miss requests the tile so later frames converge on full
//! resolution without the render path ever waiting on a load.

use std::sync::Arc;

use glam::{DMat3, DVec2};

use super::TileStore;
use crate::healpix::HealpixAddress;
use crate::survey::TileFlags;

/// Where a resolved texture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureOrigin {
    /// The tile itself.
    Tile,
    /// A coarser tile covering this one.
    Ancestor(HealpixAddress),
    /// The survey's allsky mosaic.
    Allsky,
    /// Nothing loaded; draw a placeholder.
    Missing,
}

/// Texture choice for one tile.
#[derive(Debug)]
pub struct ResolvedTexture<T> {
    pub address: HealpixAddress,
    pub texture: Option<Arc<T>>,
    pub origin: TextureOrigin,
    /// Maps the tile's unit UV square into the texture's UV space.
    pub transform: DMat3,
    pub fade: f64,
    /// Whether this is the best texture the survey will ever offer here.
    pub loading_complete: bool,
}

impl<T> Clone for ResolvedTexture<T> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            texture: self.texture.clone(),
            origin: self.origin,
            transform: self.transform,
            fade: self.fade,
            loading_complete: self.loading_complete,
        }
    }
}

/// UV transform placing `address` inside the texture of its ancestor at `order`.
pub fn ancestor_transform(address: HealpixAddress, order: u8) -> DMat3 {
    match address.quadrant_in_ancestor(order) {
        Some((u, v, size)) => {
            DMat3::from_scale_angle_translation(DVec2::splat(size), 0.0, DVec2::new(u, v))
        }
        None => DMat3::IDENTITY,
    }
}

/// Pick the texture to draw `address` with.
///
/// Tiles deeper than the store's maximum order resolve through their
/// ancestor at that order, which then counts as complete.
pub fn resolve_texture<T, S>(store: &S, address: HealpixAddress, flags: TileFlags) -> ResolvedTexture<T>
where
    S: TileStore<T> + ?Sized,
{
    let fade = store.fade();
    let resolved = |texture, origin, transform, loading_complete| ResolvedTexture {
        address,
        texture,
        origin,
        transform,
        fade,
        loading_complete,
    };

    let order_max = store.order_max();
    let target = address
        .ancestor(order_max.min(address.order()))
        .unwrap_or(address);

    if !flags.contains(TileFlags::FORCE_USE_ALLSKY) {
        if let Some(view) = store.loaded(target) {
            let origin = if target == address {
                TextureOrigin::Tile
            } else {
                TextureOrigin::Ancestor(target)
            };
            return resolved(
                Some(view.payload),
                origin,
                ancestor_transform(address, target.order()),
                true,
            );
        }

        if !flags.contains(TileFlags::CACHED_ONLY) {
            store.request(target);
        }

        let mut current = target;
        while let Some(parent) = current.parent() {
            if let Some(view) = store.loaded(parent) {
                return resolved(
                    Some(view.payload),
                    TextureOrigin::Ancestor(parent),
                    ancestor_transform(address, parent.order()),
                    false,
                );
            }
            current = parent;
        }
    }

    if let Some(allsky) = store.allsky() {
        if let Some(transform) = allsky.layout.transform(address) {
            return resolved(
                Some(allsky.payload),
                TextureOrigin::Allsky,
                transform,
                flags.contains(TileFlags::FORCE_USE_ALLSKY),
            );
        }
    }

    resolved(None, TextureOrigin::Missing, DMat3::IDENTITY, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::testing::FakeStore;
    use crate::survey::{AllskyLayout, AllskyTexture};

    fn addr(order: u8, pix: u64) -> HealpixAddress {
        HealpixAddress::new(order, pix).unwrap()
    }

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < 1e-12
    }

    #[test]
    fn test_loaded_tile_is_used_directly() {
        let store = FakeStore::new(0, 3).with_fade(0.5);
        store.load(addr(2, 5), "t");

        let resolved = resolve_texture(&store, addr(2, 5), TileFlags::NONE);
        assert_eq!(resolved.origin, TextureOrigin::Tile);
        assert_eq!(resolved.texture.as_deref(), Some(&"t"));
        assert_eq!(resolved.transform, DMat3::IDENTITY);
        assert_eq!(resolved.fade, 0.5);
        assert!(resolved.loading_complete);
        assert!(store.requests().is_empty());
    }

    #[test]
    fn test_falls_back_to_base_tile_and_requests() {
        let store = FakeStore::new(0, 3);
        store.load(addr(0, 0), "base");

        let resolved = resolve_texture(&store, addr(3, 0), TileFlags::NONE);
        assert_eq!(resolved.origin, TextureOrigin::Ancestor(addr(0, 0)));
        assert_eq!(resolved.texture.as_deref(), Some(&"base"));
        assert!(!resolved.loading_complete);
        assert_eq!(store.requests(), vec![addr(3, 0)]);

        // Three nested quadrant steps: scale 1/8 anchored at the origin.
        let expected = DMat3::from_scale_angle_translation(DVec2::splat(0.125), 0.0, DVec2::ZERO);
        assert!(resolved.transform.abs_diff_eq(expected, 1e-12));

        let resolved = resolve_texture(&store, addr(3, 63), TileFlags::NONE);
        let origin = resolved.transform.transform_point2(DVec2::ZERO);
        assert!(close(origin, DVec2::new(0.875, 0.875)));
        let corner = resolved.transform.transform_point2(DVec2::ONE);
        assert!(close(corner, DVec2::ONE));
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let store = FakeStore::new(0, 5);
        store.load(addr(0, 1), "coarse");
        store.load(addr(2, 16), "fine");

        let resolved = resolve_texture(&store, addr(4, 16 * 16 + 3), TileFlags::NONE);
        assert_eq!(resolved.origin, TextureOrigin::Ancestor(addr(2, 16)));
        assert_eq!(resolved.texture.as_deref(), Some(&"fine"));
    }

    #[test]
    fn test_allsky_fallback() {
        let store = FakeStore::new(3, 6).with_allsky(AllskyTexture {
            payload: Arc::new("allsky"),
            layout: AllskyLayout::new(3),
        });

        let resolved = resolve_texture(&store, addr(4, 4 * 28), TileFlags::NONE);
        assert_eq!(resolved.origin, TextureOrigin::Allsky);
        assert!(!resolved.loading_complete);
        // Tile 28 at order 3 sits in cell (1, 1) of a 27 x 29 grid.
        let p = resolved.transform.transform_point2(DVec2::ZERO);
        assert!(close(p, DVec2::new(1.0 / 27.0, 1.0 / 29.0)));
        assert_eq!(store.requests(), vec![addr(4, 4 * 28)]);
    }

    #[test]
    fn test_nothing_available() {
        let store = FakeStore::new(0, 3);
        let resolved = resolve_texture(&store, addr(2, 7), TileFlags::NONE);
        assert_eq!(resolved.origin, TextureOrigin::Missing);
        assert!(resolved.texture.is_none());
        assert!(!resolved.loading_complete);
        assert!(resolved.transform.is_finite());
        assert_eq!(store.requests(), vec![addr(2, 7)]);
    }

    #[test]
    fn test_cached_only_never_requests() {
        let store = FakeStore::new(0, 3);
        resolve_texture(&store, addr(2, 7), TileFlags::CACHED_ONLY);
        assert!(store.requests().is_empty());
    }

    #[test]
    fn test_deeper_than_max_order_uses_max_order_tile() {
        let store = FakeStore::new(0, 3);
        store.load(addr(3, 9), "max");

        let resolved = resolve_texture(&store, addr(5, 9 * 16 + 15), TileFlags::NONE);
        assert_eq!(resolved.origin, TextureOrigin::Ancestor(addr(3, 9)));
        assert!(resolved.loading_complete);
        let p = resolved.transform.transform_point2(DVec2::ZERO);
        assert!(close(p, DVec2::new(0.75, 0.75)));
        assert!(store.requests().is_empty());

        let store = FakeStore::new(0, 3);
        resolve_texture(&store, addr(5, 9 * 16), TileFlags::NONE);
        assert_eq!(store.requests(), vec![addr(3, 9)]);
    }

    #[test]
    fn test_force_allsky() {
        let store = FakeStore::new(3, 6).with_allsky(AllskyTexture {
            payload: Arc::new("allsky"),
            layout: AllskyLayout::new(3),
        });
        store.load(addr(3, 0), "tile");

        let resolved = resolve_texture(&store, addr(3, 0), TileFlags::FORCE_USE_ALLSKY);
        assert_eq!(resolved.origin, TextureOrigin::Allsky);
        assert!(resolved.loading_complete);
        assert!(store.requests().is_empty());
    }
}
