//! Allsky mosaics: every tile of one order packed into a single image.
//!
//! Tiles are laid out row-major in a grid `floor(sqrt(npix))` cells wide;
//! tile `p` sits in column `p mod w`, row `p div w`.

use std::sync::Arc;

use glam::{DMat3, DVec2};

use crate::healpix::{npix, HealpixAddress};

/// Grid geometry of an allsky image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllskyLayout {
    pub order: u8,
    pub columns: u64,
    pub rows: u64,
}

impl AllskyLayout {
    pub fn new(order: u8) -> Self {
        let count = npix(order);
        let columns = ((count as f64).sqrt().floor() as u64).max(1);
        let rows = count.div_ceil(columns);
        Self {
            order,
            columns,
            rows,
        }
    }

    /// Grid cell `(column, row)` holding tile `pix` of the allsky order.
    pub fn cell(&self, pix: u64) -> (u64, u64) {
        (pix % self.columns, pix / self.columns)
    }

    /// UV transform mapping `address`'s unit square into the allsky image.
    ///
    /// `None` when the tile is coarser than the allsky order and therefore
    /// spans several cells.
    pub fn transform(&self, address: HealpixAddress) -> Option<DMat3> {
        let cell = address.ancestor(self.order)?;
        let (u, v, size) = address.quadrant_in_ancestor(self.order)?;
        let (column, row) = self.cell(cell.pix());
        let cell_size = DVec2::new(1.0 / self.columns as f64, 1.0 / self.rows as f64);
        let offset = DVec2::new(column as f64 + u, row as f64 + v) * cell_size;
        Some(DMat3::from_scale_angle_translation(
            cell_size * size,
            0.0,
            offset,
        ))
    }
}

/// A decoded allsky image ready to serve as a fallback texture.
#[derive(Debug)]
pub struct AllskyTexture<T> {
    pub payload: Arc<T>,
    pub layout: AllskyLayout,
}

impl<T> Clone for AllskyTexture<T> {
    fn clone(&self) -> Self {
        Self {
            payload: Arc::clone(&self.payload),
            layout: self.layout,
        }
    }
}
