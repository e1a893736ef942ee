//! Void filling by nearest-ring averaging.
//!
//! A void sample is replaced by the mean of the valid samples on the closest
//! Chebyshev ring around it that has any. Rings are scanned whole, so two
//! equally close valid neighbours are averaged rather than the first one found
//! winning.

use crate::tile::{Tile, VOID_VALUE};

/// Offsets of the cells at Chebyshev distance `radius` from a centre.
///
/// For `j` in `0..=radius` the iterator yields, in order:
///
/// - `(-r, -j)`, `(r, -j)`
/// - if `j > 0`: `(-r, j)`, `(r, j)`
/// - if `j < r`: `(-j, -r)`, `(-j, r)`, and if also `j > 0`: `(j, -r)`, `(j, r)`
///
/// which visits each of the `8 × radius` ring cells exactly once. A radius of
/// zero yields nothing.
#[derive(Debug, Clone)]
pub struct RingOffsets {
    radius: isize,
    j: isize,
    slot: u8,
}

impl RingOffsets {
    pub fn new(radius: usize) -> Self {
        Self {
            radius: radius as isize,
            j: 0,
            slot: 0,
        }
    }
}

impl Iterator for RingOffsets {
    type Item = (isize, isize);

    fn next(&mut self) -> Option<Self::Item> {
        let r = self.radius;
        while r > 0 && self.j <= r {
            let j = self.j;
            let slot = self.slot;
            self.slot += 1;
            if self.slot == 8 {
                self.slot = 0;
                self.j += 1;
            }

            let offset = match slot {
                0 => Some((-r, -j)),
                1 => Some((r, -j)),
                2 if j > 0 => Some((-r, j)),
                3 if j > 0 => Some((r, j)),
                4 if j < r => Some((-j, -r)),
                5 if j < r => Some((-j, r)),
                6 if j > 0 && j < r => Some((j, -r)),
                7 if j > 0 && j < r => Some((j, r)),
                _ => None,
            };
            if offset.is_some() {
                return offset;
            }
        }
        None
    }
}

/// Height at `(x, y)` with voids filled.
///
/// Coordinates follow [`Tile::raw_height`]: x from the west edge, y from the
/// south edge, both in bounds.
///
/// Returns the raw sample when it is valid. For a void sample the search grows
/// one ring at a time and returns the mean of the first ring holding any valid
/// sample. It gives up with `None` once the ring no longer reaches any cell of
/// the tile (so never past `max(cols, rows)`), or immediately if the whole
/// tile is void.
pub fn resolve(tile: &Tile, x: usize, y: usize) -> Option<f64> {
    let raw = tile.raw_height(x, y);
    if raw != VOID_VALUE {
        return Some(f64::from(raw));
    }
    if tile.is_all_void() {
        return None;
    }

    let cols = tile.cols() as isize;
    let rows = tile.rows() as isize;
    let (cx, cy) = (x as isize, y as isize);
    let max_radius = cx.max(cols - 1 - cx).max(cy).max(rows - 1 - cy) as usize;

    for radius in 1..=max_radius {
        let mut sum = 0i64;
        let mut count = 0i64;

        for (dx, dy) in RingOffsets::new(radius) {
            let (px, py) = (cx + dx, cy + dy);
            if px < 0 || py < 0 || px >= cols || py >= rows {
                continue;
            }
            let h = tile.raw_height(px as usize, py as usize);
            if h != VOID_VALUE {
                sum += i64::from(h);
                count += 1;
            }
        }

        if count > 0 {
            return Some(sum as f64 / count as f64);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Resolution, TileId};
    use std::collections::HashSet;

    const N: usize = 1201;

    /// Build an SRTM3 tile from a closure over `(x, y)` (y from the south).
    fn tile_from_fn(f: impl Fn(usize, usize) -> i16) -> Tile {
        let mut samples = vec![0i16; N * N];
        for row in 0..N {
            for col in 0..N {
                samples[row * N + col] = f(col, N - 1 - row);
            }
        }
        Tile::from_samples(&samples, TileId::new(51, -1), Resolution::Srtm3).unwrap()
    }

    fn chebyshev(x: usize, y: usize, cx: usize, cy: usize) -> usize {
        x.abs_diff(cx).max(y.abs_diff(cy))
    }

    #[test]
    fn test_ring_offsets_cover_ring_exactly_once() {
        for radius in 1..=6 {
            let offsets: Vec<_> = RingOffsets::new(radius).collect();
            assert_eq!(offsets.len(), 8 * radius, "radius {radius}");

            let unique: HashSet<_> = offsets.iter().copied().collect();
            assert_eq!(unique.len(), offsets.len());

            let r = radius as isize;
            for (dx, dy) in offsets {
                assert_eq!(dx.abs().max(dy.abs()), r);
            }
        }
    }

    #[test]
    fn test_ring_offsets_order() {
        let offsets: Vec<_> = RingOffsets::new(1).collect();
        assert_eq!(
            offsets,
            vec![
                (-1, 0),
                (1, 0),
                (0, -1),
                (0, 1),
                (-1, -1),
                (1, -1),
                (-1, 1),
                (1, 1),
            ]
        );
        assert_eq!(RingOffsets::new(0).count(), 0);
    }

    #[test]
    fn test_valid_sample_returned_unchanged() {
        let tile = tile_from_fn(|x, y| (x + y) as i16 - 7);
        assert_eq!(resolve(&tile, 10, 20), Some(23.0));
        assert_eq!(resolve(&tile, 0, 0), Some(-7.0));
    }

    #[test]
    fn test_void_filled_from_second_ring() {
        let (cx, cy) = (600, 600);
        let tile = tile_from_fn(|x, y| {
            if chebyshev(x, y, cx, cy) <= 1 {
                VOID_VALUE
            } else if chebyshev(x, y, cx, cy) == 2 {
                250
            } else {
                9000
            }
        });
        assert_eq!(resolve(&tile, cx, cy), Some(250.0));
    }

    #[test]
    fn test_whole_ring_is_averaged() {
        let (cx, cy) = (300, 400);
        let tile = tile_from_fn(|x, y| {
            if (x, y) == (cx, cy) {
                VOID_VALUE
            } else if (x, y) == (cx - 1, cy) {
                // First offset checked on the ring
                100
            } else if (x, y) == (cx + 1, cy + 1) {
                // Last offset checked on the ring
                201
            } else if chebyshev(x, y, cx, cy) == 1 {
                VOID_VALUE
            } else {
                -1000
            }
        });
        assert_eq!(resolve(&tile, cx, cy), Some(150.5));
    }

    #[test]
    fn test_void_at_corner_is_clipped_to_tile() {
        // South-west corner: only three in-bounds cells on ring 1.
        let tile = tile_from_fn(|x, y| match (x, y) {
            (0, 0) => VOID_VALUE,
            (1, 0) => 10,
            (0, 1) => 20,
            (1, 1) => 33,
            _ => 0,
        });
        assert_eq!(resolve(&tile, 0, 0), Some(21.0));
    }

    #[test]
    fn test_single_valid_sample_far_away() {
        let tile = tile_from_fn(|x, y| if (x, y) == (1200, 1200) { 42 } else { VOID_VALUE });
        assert_eq!(resolve(&tile, 0, 0), Some(42.0));
    }

    #[test]
    fn test_all_void_tile_is_exhausted() {
        let tile = tile_from_fn(|_, _| VOID_VALUE);
        assert_eq!(resolve(&tile, 600, 600), None);
        assert_eq!(resolve(&tile, 0, 1200), None);
    }
}
