//! Healpix addressing for the HiPS quadtree.
//!
//! Pure functions mapping `(order, pix)` tiles in the nested scheme to their
//! parent, children, neighbours and sky footprint. Directions are unit
//! vectors in the survey frame (`z` toward the north pole, `x` toward
//! longitude 0).
//!
//! The 12 base faces are laid out as:
//! - 0–3: north polar cap
//! - 4–7: equatorial belt
//! - 8–11: south polar cap
//!
//! Within a face, `x` occupies the even bits of the sub-index and `y` the odd
//! bits, so child `i` of a tile sits at `x + (i & 1)`, `y + (i >> 1)`.

mod types;

pub use types::{nside, npix, HealpixAddress, HealpixError, BASE_FACES, MAX_ORDER};

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec3;

/// Ring index (in units of nside) of the southernmost corner of each face.
const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];

/// Longitude index (in units of pi/4) of the centre of each face.
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

// Neighbour lookup tables, ordered SW, W, NW, N, NE, E, SE, S.
const NB_XOFFSET: [i64; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
const NB_YOFFSET: [i64; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
const NB_FACEARRAY: [[i64; 12]; 9] = [
    [8, 9, 10, 11, -1, -1, -1, -1, 10, 11, 8, 9],
    [5, 6, 7, 4, 8, 9, 10, 11, 9, 10, 11, 8],
    [-1, -1, -1, -1, 5, 6, 7, 4, -1, -1, -1, -1],
    [4, 5, 6, 7, 11, 8, 9, 10, 11, 8, 9, 10],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    [1, 2, 3, 0, 0, 1, 2, 3, 5, 6, 7, 4],
    [-1, -1, -1, -1, 7, 4, 5, 6, -1, -1, -1, -1],
    [3, 0, 1, 2, 3, 0, 1, 2, 4, 5, 6, 7],
    [2, 3, 0, 1, -1, -1, -1, -1, 0, 1, 2, 3],
];
const NB_SWAPARRAY: [[u8; 3]; 9] = [
    [0, 0, 3],
    [0, 0, 6],
    [0, 0, 0],
    [0, 0, 5],
    [0, 0, 0],
    [5, 0, 0],
    [0, 0, 0],
    [6, 0, 0],
    [3, 0, 0],
];

/// Approximate sky footprint of a tile, used for culling and LOD decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Unit vector to the tile centre.
    pub center: DVec3,
    /// Angular radius (radians) of a cap around `center` enclosing the tile.
    pub radius: f64,
    /// Exact solid angle of the tile (steradians).
    pub solid_angle: f64,
}

/// Solid angle (steradians) of a single tile at the given order.
pub fn pixel_area(order: u8) -> f64 {
    4.0 * PI / npix(order) as f64
}

/// Unit direction and enclosing angular radius of a tile.
pub fn pix_to_angle(addr: HealpixAddress) -> (DVec3, f64) {
    let fp = footprint(addr);
    (fp.center, fp.radius)
}

/// Full footprint of a tile: centre, enclosing radius and solid angle.
pub fn footprint(addr: HealpixAddress) -> Footprint {
    let ns = nside(addr.order()) as f64;
    let (face, ix, iy) = decompose(addr);
    let center = face_xy_to_vec(face, (ix as f64 + 0.5) / ns, (iy as f64 + 0.5) / ns);

    let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
    let radius = corners
        .iter()
        .map(|(dx, dy)| {
            let corner = face_xy_to_vec(face, (ix as f64 + dx) / ns, (iy as f64 + dy) / ns);
            angle_between(center, corner)
        })
        .fold(0.0, f64::max);

    Footprint {
        center,
        radius,
        solid_angle: pixel_area(addr.order()),
    }
}

/// Tile containing `direction` at `order`.
///
/// `direction` need not be normalised but must be non-zero.
///
/// # Panics
///
/// Panics if `order` exceeds [`MAX_ORDER`].
pub fn ang_to_pix(order: u8, direction: DVec3) -> HealpixAddress {
    assert!(order <= MAX_ORDER, "invalid healpix order {}", order);
    let dir = direction.normalize();
    let z = dir.z.clamp(-1.0, 1.0);
    let phi = dir.y.atan2(dir.x).rem_euclid(TAU);

    let ns = nside(order) as i64;
    let nsf = ns as f64;
    let za = z.abs();
    let tt = phi / FRAC_PI_2;

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        let temp1 = nsf * (0.5 + tt);
        let temp2 = nsf * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp / ns;
        let ifm = jm / ns;
        let face = if ifp == ifm {
            (ifp & 3) | 4
        } else if ifp < ifm {
            ifp & 3
        } else {
            (ifm & 3) + 8
        };
        let ix = jm & (ns - 1);
        let iy = ns - (jp & (ns - 1)) - 1;
        (face, ix, iy)
    } else {
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = nsf * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);
        if z >= 0.0 {
            (ntt, ns - jm - 1, ns - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };

    compose(order, face as u64, ix as u64, iy as u64)
}

/// The eight neighbours of a tile, ordered SW, W, NW, N, NE, E, SE, S.
///
/// Entries are `None` where a base-face corner has only seven neighbours.
pub fn neighbours(addr: HealpixAddress) -> [Option<HealpixAddress>; 8] {
    let order = addr.order();
    let ns = nside(order) as i64;
    let (face, ix, iy) = decompose(addr);
    let (ix, iy) = (ix as i64, iy as i64);
    let mut result = [None; 8];

    if ix > 0 && ix < ns - 1 && iy > 0 && iy < ns - 1 {
        for m in 0..8 {
            let x = (ix + NB_XOFFSET[m]) as u64;
            let y = (iy + NB_YOFFSET[m]) as u64;
            result[m] = Some(compose(order, face, x, y));
        }
        return result;
    }

    for m in 0..8 {
        let mut x = ix + NB_XOFFSET[m];
        let mut y = iy + NB_YOFFSET[m];
        let mut nbnum = 4usize;
        if x < 0 {
            x += ns;
            nbnum -= 1;
        } else if x >= ns {
            x -= ns;
            nbnum += 1;
        }
        if y < 0 {
            y += ns;
            nbnum -= 3;
        } else if y >= ns {
            y -= ns;
            nbnum += 3;
        }

        let f = NB_FACEARRAY[nbnum][face as usize];
        if f < 0 {
            continue;
        }
        let bits = NB_SWAPARRAY[nbnum][(face >> 2) as usize];
        if bits & 1 != 0 {
            x = ns - x - 1;
        }
        if bits & 2 != 0 {
            y = ns - y - 1;
        }
        if bits & 4 != 0 {
            std::mem::swap(&mut x, &mut y);
        }
        result[m] = Some(compose(order, f as u64, x as u64, y as u64));
    }
    result
}

/// Great-circle angle (radians) between two unit vectors.
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    // atan2 form stays accurate for nearly parallel vectors.
    a.cross(b).length().atan2(a.dot(b))
}

/// Split a tile into `(face, x, y)` within its base face.
pub(crate) fn decompose(addr: HealpixAddress) -> (u64, u64, u64) {
    let face = addr.face();
    let sub = addr.pix() & ((1u64 << (2 * addr.order() as u32)) - 1);
    let (x, y) = deinterleave(sub);
    (face, x, y)
}

fn compose(order: u8, face: u64, x: u64, y: u64) -> HealpixAddress {
    let pix = (face << (2 * order as u32)) | interleave(x, y);
    HealpixAddress::new_unchecked(order, pix)
}

/// Bit-interleave `(x, y)`: x provides even bits, y provides odd bits.
fn interleave(x: u64, y: u64) -> u64 {
    let mut result = 0u64;
    for bit in 0..32 {
        result |= ((x >> bit) & 1) << (2 * bit);
        result |= ((y >> bit) & 1) << (2 * bit + 1);
    }
    result
}

fn deinterleave(sub: u64) -> (u64, u64) {
    let mut x = 0u64;
    let mut y = 0u64;
    for bit in 0..32 {
        x |= ((sub >> (2 * bit)) & 1) << bit;
        y |= ((sub >> (2 * bit + 1)) & 1) << bit;
    }
    (x, y)
}

/// Continuous face coordinates (`x`, `y` in `[0, 1]`) to a unit vector.
fn face_xy_to_vec(face: u64, x: f64, y: f64) -> DVec3 {
    let face = face as usize;
    let jr = JRLL[face] as f64 - x - y;

    let (nr, z) = if jr < 1.0 {
        let nr = jr;
        (nr, 1.0 - nr * nr / 3.0)
    } else if jr > 3.0 {
        let nr = 4.0 - jr;
        (nr, nr * nr / 3.0 - 1.0)
    } else {
        (1.0, (2.0 - jr) * 2.0 / 3.0)
    };

    let mut tmp = JPLL[face] as f64 * nr + x - y;
    if tmp < 0.0 {
        tmp += 8.0;
    }
    if tmp >= 8.0 {
        tmp -= 8.0;
    }
    let phi = if nr < 1e-15 {
        0.0
    } else {
        0.5 * FRAC_PI_2 * tmp / nr
    };

    let z = z.clamp(-1.0, 1.0);
    let sth = (1.0 - z * z).sqrt();
    DVec3::new(sth * phi.cos(), sth * phi.sin(), z)
}
