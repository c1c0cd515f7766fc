//! Marker detection.
//!
//! Detection is a pluggable seam: the pose solver only needs the four
//! ordered corner pixels of a square marker, so any fiducial detector
//! (AprilTag, ArUco, a hardware pipeline) can sit behind [`MarkerDetector`].
//! [`DarkSquareDetector`] is a minimal built-in implementation for a plain
//! dark square on a light background, intended for bring-up and testing
//! rather than production marker families.

use image::GrayImage;

use crate::errors::MarkerError;

/// The four corner pixels of a detected marker, ordered top-left,
/// top-right, bottom-right, bottom-left in image coordinates.
pub type MarkerCorners = [[f64; 2]; 4];

/// A fiducial-marker corner detector.
///
/// Implementations must be stateless per call; detection failures that are
/// not errors (no marker in view) are reported as `Ok(None)`.
pub trait MarkerDetector {
    /// Find the most prominent marker in a grayscale image.
    fn detect(&self, image: &GrayImage) -> Result<Option<MarkerCorners>, MarkerError>;
}

/// Detects the largest dark connected region and reports its extreme
/// points as corners.
///
/// Thresholding is adaptive per tile (min/max midpoint), low-contrast
/// tiles are treated as background. Works for a roughly upright square
/// marker filling a reasonable part of the frame; in-plane rotations
/// beyond 45 degrees permute the corner order and need a real fiducial
/// decoder instead.
#[derive(Debug, Clone)]
pub struct DarkSquareDetector {
    /// Side length of the threshold tiles, in pixels.
    pub tile_size: usize,
    /// Minimum tile contrast (max - min) before a tile is considered to
    /// contain any marker edge at all.
    pub min_contrast: u8,
    /// Minimum component size in pixels for a detection.
    pub min_area: usize,
}

impl Default for DarkSquareDetector {
    fn default() -> Self {
        Self {
            tile_size: 16,
            min_contrast: 40,
            min_area: 64,
        }
    }
}

impl MarkerDetector for DarkSquareDetector {
    fn detect(&self, image: &GrayImage) -> Result<Option<MarkerCorners>, MarkerError> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width < self.tile_size || height < self.tile_size {
            return Ok(None);
        }

        let dark = self.threshold_dark(image.as_raw(), width, height);

        let Some(component) = largest_component(&dark, width, height, self.min_area) else {
            return Ok(None);
        };

        Ok(Some(extreme_corners(&component, width)))
    }
}

impl DarkSquareDetector {
    /// Binarize into a dark-pixel mask using per-tile min/max midpoints.
    fn threshold_dark(&self, data: &[u8], width: usize, height: usize) -> Vec<bool> {
        let tiles_x = width.div_ceil(self.tile_size);
        let tiles_y = height.div_ceil(self.tile_size);

        let mut tile_min = vec![u8::MAX; tiles_x * tiles_y];
        let mut tile_max = vec![u8::MIN; tiles_x * tiles_y];
        for y in 0..height {
            let ty = y / self.tile_size;
            for x in 0..width {
                let px = data[y * width + x];
                let tile = ty * tiles_x + x / self.tile_size;
                if px < tile_min[tile] {
                    tile_min[tile] = px;
                }
                if px > tile_max[tile] {
                    tile_max[tile] = px;
                }
            }
        }

        let mut dark = vec![false; width * height];
        for y in 0..height {
            let ty = y / self.tile_size;
            for x in 0..width {
                let tile = ty * tiles_x + x / self.tile_size;
                let (lo, hi) = (tile_min[tile], tile_max[tile]);
                if hi - lo < self.min_contrast {
                    continue;
                }
                let midpoint = lo as u16 + (hi as u16 - lo as u16) / 2;
                dark[y * width + x] = (data[y * width + x] as u16) < midpoint;
            }
        }
        dark
    }
}

/// Disjoint-set over pixel indices, used to group dark pixels into
/// connected components.
struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len as u32).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut id: u32) -> u32 {
        while self.parent[id as usize] != id {
            // path halving
            let grandparent = self.parent[self.parent[id as usize] as usize];
            self.parent[id as usize] = grandparent;
            id = grandparent;
        }
        id
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra as usize] >= self.size[rb as usize] {
            self.parent[rb as usize] = ra;
            self.size[ra as usize] += self.size[rb as usize];
        } else {
            self.parent[ra as usize] = rb;
            self.size[rb as usize] += self.size[ra as usize];
        }
    }
}

/// Pixel indices of the largest 4-connected dark component, or `None` if
/// no component reaches `min_area`.
fn largest_component(
    dark: &[bool],
    width: usize,
    height: usize,
    min_area: usize,
) -> Option<Vec<usize>> {
    let mut uf = UnionFind::new(dark.len());
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !dark[idx] {
                continue;
            }
            if x > 0 && dark[idx - 1] {
                uf.union(idx as u32, (idx - 1) as u32);
            }
            if y > 0 && dark[idx - width] {
                uf.union(idx as u32, (idx - width) as u32);
            }
        }
    }

    let mut best_root = None;
    let mut best_size = min_area as u32;
    for idx in 0..dark.len() {
        if !dark[idx] {
            continue;
        }
        let root = uf.find(idx as u32);
        let size = uf.size[root as usize];
        if size >= best_size {
            best_size = size;
            best_root = Some(root);
        }
    }
    let best_root = best_root?;

    let mut component = Vec::with_capacity(best_size as usize);
    for idx in 0..dark.len() {
        if dark[idx] && uf.find(idx as u32) == best_root {
            component.push(idx);
        }
    }
    Some(component)
}

/// Extreme points of a component in canonical corner order.
fn extreme_corners(component: &[usize], width: usize) -> MarkerCorners {
    // scores: TL minimizes x+y, TR maximizes x-y, BR maximizes x+y,
    // BL maximizes y-x (image y grows downward)
    let mut corners = [[0.0; 2]; 4];
    let mut scores = [i64::MIN; 4];
    for &idx in component {
        let (x, y) = ((idx % width) as i64, (idx / width) as i64);
        let candidate = [-(x + y), x - y, x + y, y - x];
        for (i, &score) in candidate.iter().enumerate() {
            if score > scores[i] {
                scores[i] = score;
                corners[i] = [x as f64, y as f64];
            }
        }
    }
    corners
}
