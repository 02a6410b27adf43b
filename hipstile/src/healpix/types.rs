//! Healpix address type and validation errors.

use std::fmt;

use thiserror::Error;

/// Deepest order addressable with a `u64` pixel index.
pub const MAX_ORDER: u8 = 29;

/// Number of base faces covering the sphere at order 0.
pub const BASE_FACES: u64 = 12;

/// Errors returned when constructing a [`HealpixAddress`] from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HealpixError {
    /// Order beyond [`MAX_ORDER`].
    #[error("invalid healpix order {0} (max {MAX_ORDER})")]
    InvalidOrder(u8),

    /// Pixel index outside `0..12 * 4^order`.
    #[error("invalid healpix pixel {pix} at order {order} (npix {npix})")]
    InvalidPixel { order: u8, pix: u64, npix: u64 },
}

/// One tile of the spherical quadtree: `(order, pix)` in the nested scheme.
///
/// The parent of `(order, pix)` is `(order - 1, pix / 4)` and its children are
/// `(order + 1, 4 * pix + i)` for `i` in `0..4`. Order 0 holds the 12 base
/// faces, which have no parent.
///
/// # Example
///
/// ```
/// use hipstile::healpix::HealpixAddress;
///
/// let tile = HealpixAddress::new(3, 42).unwrap();
/// assert_eq!(tile.parent(), Some(HealpixAddress::new(2, 10).unwrap()));
/// assert_eq!(tile.children()[1].pix(), 169);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HealpixAddress {
    order: u8,
    pix: u64,
}

impl HealpixAddress {
    /// Create a validated address.
    pub fn new(order: u8, pix: u64) -> Result<Self, HealpixError> {
        if order > MAX_ORDER {
            return Err(HealpixError::InvalidOrder(order));
        }
        let npix = npix(order);
        if pix >= npix {
            return Err(HealpixError::InvalidPixel { order, pix, npix });
        }
        Ok(Self { order, pix })
    }

    /// Create an address the caller already knows to be in range.
    ///
    /// # Panics
    ///
    /// Panics if the address is out of range; this is a caller contract
    /// violation, not a recoverable condition.
    pub fn new_unchecked(order: u8, pix: u64) -> Self {
        assert!(
            order <= MAX_ORDER && pix < npix(order),
            "healpix address out of range: order {} pix {}",
            order,
            pix
        );
        Self { order, pix }
    }

    /// The 12 order-0 base faces.
    pub fn base_faces() -> impl Iterator<Item = HealpixAddress> {
        (0..BASE_FACES).map(|pix| Self { order: 0, pix })
    }

    /// Subdivision depth.
    #[inline]
    pub fn order(&self) -> u8 {
        self.order
    }

    /// Nested pixel index at this order.
    #[inline]
    pub fn pix(&self) -> u64 {
        self.pix
    }

    /// Base face (0..12) containing this tile.
    #[inline]
    pub fn face(&self) -> u64 {
        self.pix >> (2 * self.order as u32)
    }

    /// Parent tile, or `None` for a base face.
    #[inline]
    pub fn parent(&self) -> Option<HealpixAddress> {
        if self.order == 0 {
            return None;
        }
        Some(Self {
            order: self.order - 1,
            pix: self.pix / 4,
        })
    }

    /// The four children at `order + 1`.
    ///
    /// # Panics
    ///
    /// Panics when called on a tile at [`MAX_ORDER`].
    #[inline]
    pub fn children(&self) -> [HealpixAddress; 4] {
        assert!(self.order < MAX_ORDER, "no children below order {MAX_ORDER}");
        let order = self.order + 1;
        let base = self.pix * 4;
        [0, 1, 2, 3].map(|i| Self {
            order,
            pix: base + i,
        })
    }

    /// Index of this tile among its parent's children (`pix mod 4`).
    #[inline]
    pub fn quadrant(&self) -> u8 {
        (self.pix & 3) as u8
    }

    /// Ancestor at `order`, or `None` when `order` is deeper than this tile.
    pub fn ancestor(&self, order: u8) -> Option<HealpixAddress> {
        if order > self.order {
            return None;
        }
        let shift = 2 * (self.order - order) as u32;
        Some(Self {
            order,
            pix: self.pix >> shift,
        })
    }

    /// Sub-square this tile covers inside the texture of its ancestor at
    /// `order`, as `(u, v, size)` in the ancestor's unit square.
    ///
    /// Child `i` occupies `u = (i >> 1) / 2`, `v = (i & 1) / 2` of its
    /// parent; deeper levels nest. `None` when `order` is deeper than this
    /// tile.
    pub fn quadrant_in_ancestor(&self, order: u8) -> Option<(f64, f64, f64)> {
        if order > self.order {
            return None;
        }
        let (mut u, mut v, mut size) = (0.0, 0.0, 1.0);
        for level in order + 1..=self.order {
            let i = (self.pix >> (2 * (self.order - level) as u32)) & 3;
            size *= 0.5;
            u += (i >> 1) as f64 * size;
            v += (i & 1) as f64 * size;
        }
        Some((u, v, size))
    }

    /// Unique packed key: `4 * 4^order + pix`.
    ///
    /// Distinct for every `(order, pix)` pair across all orders.
    #[inline]
    pub fn uniq(&self) -> u64 {
        (4u64 << (2 * self.order as u32)) + self.pix
    }

    /// Inverse of [`uniq`](Self::uniq).
    pub fn from_uniq(uniq: u64) -> Result<Self, HealpixError> {
        let mut order = 0u8;
        while order < MAX_ORDER && uniq >= (16u64 << (2 * order as u32)) {
            order += 1;
        }
        let offset = 4u64 << (2 * order as u32);
        let pix = uniq
            .checked_sub(offset)
            .ok_or(HealpixError::InvalidPixel {
                order,
                pix: uniq,
                npix: npix(order),
            })?;
        Self::new(order, pix)
    }
}

impl fmt::Display for HealpixAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.order, self.pix)
    }
}

/// Nside at the given order: `2^order`.
#[inline]
pub fn nside(order: u8) -> u64 {
    1u64 << order
}

/// Number of tiles at the given order: `12 * 4^order`.
#[inline]
pub fn npix(order: u8) -> u64 {
    BASE_FACES << (2 * order as u32)
}
