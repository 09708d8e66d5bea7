//! Geometry primitives
//!
//! Plain data shared by every other module: undirected edges, the sprite
//! frame rectangle, depth-weighted triangles and a handful of 2D helpers.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Unordered pair of vertex indices.
///
/// `Edge::new(1, 2) == Edge::new(2, 1)`; hashing agrees with equality so an
/// edge can be used as a set key regardless of orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Edge {
    pub index1: usize,
    pub index2: usize,
}

impl Edge {
    pub fn new(index1: usize, index2: usize) -> Self {
        Self { index1, index2 }
    }

    /// Whether either endpoint is `index`
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.index1 == index || self.index2 == index
    }

    /// The endpoint that is not `index` (`None` if `index` is not an endpoint)
    pub fn other(&self, index: usize) -> Option<usize> {
        if self.index1 == index {
            Some(self.index2)
        } else if self.index2 == index {
            Some(self.index1)
        } else {
            None
        }
    }

    /// Endpoints as (min, max)
    #[inline]
    pub fn key(&self) -> (usize, usize) {
        if self.index1 <= self.index2 {
            (self.index1, self.index2)
        } else {
            (self.index2, self.index1)
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<(usize, usize)> for Edge {
    fn from((index1, index2): (usize, usize)) -> Self {
        Self::new(index1, index2)
    }
}

/// Axis-aligned rectangle (sprite frame in texture space).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.y >= min.y && point.x <= max.x && point.y <= max.y
    }

    /// Bounding box of `points`, `None` when empty
    pub fn bounding(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::from_min_max(min, max))
    }

    /// Clamp `delta` so that `inner` moved by it stays inside `self`.
    pub fn clamp_delta(&self, inner: &Rect, delta: Vec2) -> Vec2 {
        let low = self.min() - inner.min();
        let high = self.max() - inner.max();
        Vec2::new(
            delta.x.clamp(low.x.min(0.0), high.x.max(0.0)),
            delta.y.clamp(low.y.min(0.0), high.y.max(0.0)),
        )
    }
}

/// Triangle tagged with a sort key (mean bone depth).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedTriangle {
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
    pub weight: f32,
}

impl WeightedTriangle {
    pub fn new(p1: usize, p2: usize, p3: usize, weight: f32) -> Self {
        Self { p1, p2, p3, weight }
    }

    /// Ascending by weight; NaN sorts as equal so stable sorting keeps input order.
    pub fn cmp_weight(&self, other: &Self) -> Ordering {
        self.weight
            .partial_cmp(&other.weight)
            .unwrap_or(Ordering::Equal)
    }
}

/// Barycentric coordinates `(u, v, w)` of `p` in triangle `(a, b, c)`.
///
/// Dot-product formulation; a degenerate triangle yields non-finite values.
pub fn barycentric(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}

/// Parameter of the projection of `p` onto the line through `a`, `b` (unclamped).
pub fn segment_parameter(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    (p - a).dot(ab) / len_sq
}

/// Distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let t = segment_parameter(p, a, b).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}

/// Intersection point of segments `p1`-`p2` and `q1`-`q2`, if they cross.
///
/// Parallel segments never intersect here, even when overlapping.
pub fn segment_intersection(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> Option<Vec2> {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.perp_dot(s);
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let qp = q1 - p1;
    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(p1 + r * t)
    } else {
        None
    }
}

/// Signed area of triangle `(a, b, c)`, positive when counter-clockwise.
#[inline]
pub fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a) * 0.5
}
