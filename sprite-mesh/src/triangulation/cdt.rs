//! Incremental constrained Delaunay triangulation
//!
//! Triangles are stored counter-clockwise in a slot arena. Adjacency is not
//! stored explicitly: every directed edge maps to the triangle that owns it,
//! so the neighbour across `a -> b` is the owner of `b -> a`.
//!
//! Points 0..3 are the vertices of an enclosing super triangle; input point
//! `i` lives at `SUPER_VERTEX_COUNT + i`. Hash maps are only ever used for
//! lookups, never iterated, so the result is a pure function of the input.

use std::collections::BTreeMap;

use glam::DVec2;
use hashbrown::{HashMap, HashSet};

use super::predicates::{in_diametral_circle, incircle, line_distance, orient};

/// Number of super-triangle vertices at the front of `Cdt::points`
pub(crate) const SUPER_VERTEX_COUNT: usize = 3;

const NO_TRIANGLE: usize = usize::MAX;

/// Relative tolerance (times the input extent) for coincidence and collinearity
const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Scale of the super triangle relative to the input extent
const SUPER_TRIANGLE_SCALE: f64 = 64.0;

/// Origin of a constrained segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// Caller-supplied constraint edge (or a piece of one)
    Input,
    /// Domain boundary edge promoted to a segment before refinement
    Boundary,
}

/// Result of inserting a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insertion {
    /// A new vertex was linked into the triangulation
    Inserted(usize),
    /// The point coincides with this existing vertex
    Existing(usize),
    /// The point lies inside the diametral circle of this segment
    Encroaches(usize, usize),
    /// The point is outside every triangle
    Outside,
}

enum Trace {
    /// Segment passes through an existing vertex
    Collinear(usize),
    /// Segment crosses an existing constrained segment
    CrossesSegment(usize, usize),
    /// Triangles crossed by the segment and the polygon chains on each side
    Crossed {
        removed: Vec<usize>,
        left: Vec<usize>,
        right: Vec<usize>,
        end: usize,
    },
    Failed,
}

#[derive(Debug, Clone)]
pub(crate) struct Cdt {
    pub points: Vec<DVec2>,
    triangles: Vec<Option<[usize; 3]>>,
    free: Vec<usize>,
    half_edges: HashMap<(usize, usize), usize>,
    segments: BTreeMap<(usize, usize), SegmentKind>,
    vertex_triangle: Vec<usize>,
    hint: usize,
    extent: f64,
    tolerance: f64,
}

#[inline]
fn key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

impl Cdt {
    /// Empty triangulation whose super triangle encloses `[min, max]`.
    pub fn new(min: DVec2, max: DVec2) -> Self {
        let extent = (max - min).max_element().max(1e-6);
        let center = (min + max) * 0.5;
        let d = extent * SUPER_TRIANGLE_SCALE;
        let points = vec![
            center + DVec2::new(-d, -d),
            center + DVec2::new(d, -d),
            center + DVec2::new(0.0, d),
        ];
        let mut cdt = Self {
            points,
            triangles: Vec::new(),
            free: Vec::new(),
            half_edges: HashMap::new(),
            segments: BTreeMap::new(),
            vertex_triangle: vec![NO_TRIANGLE; SUPER_VERTEX_COUNT],
            hint: 0,
            extent,
            tolerance: extent * RELATIVE_TOLERANCE,
        };
        cdt.add_triangle([0, 1, 2]);
        cdt
    }

    /// Triangulate `points` with `segments` as constraints.
    ///
    /// Input point `i` becomes vertex `SUPER_VERTEX_COUNT + i` even when it
    /// duplicates an earlier point (the duplicate is then left unlinked).
    pub fn build(points: &[DVec2], segments: &[(usize, usize)], carve: bool) -> Self {
        let segments: Vec<_> = segments
            .iter()
            .map(|&(a, b)| (a, b, SegmentKind::Input))
            .collect();
        Self::build_with_kinds(points, &segments, carve)
    }

    /// `build` with an explicit kind per segment.
    pub fn build_with_kinds(
        points: &[DVec2],
        segments: &[(usize, usize, SegmentKind)],
        carve: bool,
    ) -> Self {
        let (min, max) = points
            .iter()
            .fold((DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        let (min, max) = if points.is_empty() {
            (DVec2::ZERO, DVec2::ONE)
        } else {
            (min, max)
        };

        let mut cdt = Self::new(min, max);
        let mut remap = Vec::with_capacity(points.len());
        for p in points {
            let vi = cdt.push_point(*p);
            let linked = match cdt.insert_vertex(vi, false) {
                Insertion::Inserted(v) | Insertion::Existing(v) => v,
                _ => vi,
            };
            remap.push(linked);
        }

        for &(a, b, kind) in segments {
            if a >= points.len() || b >= points.len() {
                continue;
            }
            cdt.insert_segment(remap[a], remap[b], kind);
        }

        cdt.remove_exterior(carve);
        cdt
    }

    /// Largest side of the input bounding box
    pub fn extent(&self) -> f64 {
        self.extent
    }

    fn push_point(&mut self, p: DVec2) -> usize {
        self.points.push(p);
        self.vertex_triangle.push(NO_TRIANGLE);
        self.points.len() - 1
    }

    // ------------------------------------------------------------------------
    // Triangle arena
    // ------------------------------------------------------------------------

    fn add_triangle(&mut self, tri: [usize; 3]) -> usize {
        let id = match self.free.pop() {
            Some(id) => {
                self.triangles[id] = Some(tri);
                id
            }
            None => {
                self.triangles.push(Some(tri));
                self.triangles.len() - 1
            }
        };
        for k in 0..3 {
            self.half_edges.insert((tri[k], tri[(k + 1) % 3]), id);
            self.vertex_triangle[tri[k]] = id;
        }
        self.hint = id;
        id
    }

    fn remove_triangle(&mut self, id: usize) -> Option<[usize; 3]> {
        let tri = self.triangles.get_mut(id)?.take()?;
        for k in 0..3 {
            let edge = (tri[k], tri[(k + 1) % 3]);
            if self.half_edges.get(&edge) == Some(&id) {
                self.half_edges.remove(&edge);
            }
        }
        self.free.push(id);
        Some(tri)
    }

    #[inline]
    pub fn triangle(&self, id: usize) -> Option<[usize; 3]> {
        self.triangles.get(id).copied().flatten()
    }

    /// Live triangles in slot order
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles.iter().filter_map(|t| *t)
    }

    /// Slot ids of live triangles
    pub fn triangle_ids(&self) -> Vec<usize> {
        (0..self.triangles.len())
            .filter(|&id| self.triangles[id].is_some())
            .collect()
    }

    /// Triangle across the directed edge `a -> b`
    #[inline]
    pub fn neighbor(&self, a: usize, b: usize) -> Option<usize> {
        self.half_edges.get(&(b, a)).copied()
    }

    #[inline]
    pub fn edge_exists(&self, a: usize, b: usize) -> bool {
        self.half_edges.contains_key(&(a, b)) || self.half_edges.contains_key(&(b, a))
    }

    // ------------------------------------------------------------------------
    // Segments
    // ------------------------------------------------------------------------

    #[inline]
    pub fn is_segment(&self, a: usize, b: usize) -> bool {
        self.segments.contains_key(&key(a, b))
    }

    fn mark_segment(&mut self, a: usize, b: usize, kind: SegmentKind) {
        let entry = self.segments.entry(key(a, b)).or_insert(kind);
        if kind == SegmentKind::Input {
            *entry = SegmentKind::Input;
        }
    }

    /// Constrained segments in ascending key order
    pub fn segments(&self) -> impl Iterator<Item = ((usize, usize), SegmentKind)> + '_ {
        self.segments.iter().map(|(k, v)| (*k, *v))
    }

    /// Promote every edge with a single adjacent triangle to a boundary segment.
    pub fn mark_boundary_segments(&mut self) {
        let mut boundary = Vec::new();
        for tri in self.triangles() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                if self.neighbor(a, b).is_none() {
                    boundary.push((a, b));
                }
            }
        }
        for (a, b) in boundary {
            self.mark_segment(a, b, SegmentKind::Boundary);
        }
    }

    // ------------------------------------------------------------------------
    // Point location and insertion
    // ------------------------------------------------------------------------

    /// Triangle containing `p` (boundary inclusive).
    pub fn locate(&self, p: DVec2) -> Option<usize> {
        let start = match self.triangle(self.hint) {
            Some(_) => Some(self.hint),
            None => self.triangles.iter().position(|t| t.is_some()),
        };
        let mut current = start?;
        let max_steps = self.triangles.len() + 8;

        'walk: for step in 0..max_steps {
            let Some(tri) = self.triangle(current) else {
                break;
            };
            for offset in 0..3 {
                let k = (step + offset) % 3;
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                if orient(self.points[a], self.points[b], p) < 0.0 {
                    match self.neighbor(a, b) {
                        Some(next) => {
                            current = next;
                            continue 'walk;
                        }
                        None => break 'walk,
                    }
                }
            }
            return Some(current);
        }

        self.locate_linear(p)
    }

    fn locate_linear(&self, p: DVec2) -> Option<usize> {
        let tol = self.tolerance;
        self.triangles.iter().enumerate().find_map(|(id, t)| {
            let tri = (*t)?;
            let inside = (0..3).all(|k| {
                line_distance(self.points[tri[k]], self.points[tri[(k + 1) % 3]], p) >= -tol
            });
            inside.then_some(id)
        })
    }

    fn on_segment_interior(&self, a: usize, b: usize, p: DVec2) -> bool {
        let (pa, pb) = (self.points[a], self.points[b]);
        if line_distance(pa, pb, p).abs() > self.tolerance {
            return false;
        }
        let t = (p - pa).dot(pb - pa) / pa.distance_squared(pb).max(f64::MIN_POSITIVE);
        t > 0.0 && t < 1.0
    }

    fn in_circumcircle(&self, id: usize, p: DVec2) -> bool {
        match self.triangle(id) {
            Some([a, b, c]) => incircle(self.points[a], self.points[b], self.points[c], p) > 0.0,
            None => false,
        }
    }

    /// Insert a new point, rolling it back unless it was linked.
    pub fn insert_point(&mut self, p: DVec2, reject_encroaching: bool) -> Insertion {
        let vi = self.push_point(p);
        let outcome = self.insert_vertex(vi, reject_encroaching);
        if !matches!(outcome, Insertion::Inserted(_)) {
            self.points.pop();
            self.vertex_triangle.pop();
        }
        outcome
    }

    /// Link the already-pushed vertex `vi` into the triangulation
    /// (Bowyer-Watson cavity bounded by constrained segments).
    fn insert_vertex(&mut self, vi: usize, reject_encroaching: bool) -> Insertion {
        let p = self.points[vi];
        let Some(seed) = self.locate(p) else {
            return Insertion::Outside;
        };
        let Some(seed_tri) = self.triangle(seed) else {
            return Insertion::Outside;
        };
        for &v in &seed_tri {
            if self.points[v].distance(p) <= self.tolerance {
                return Insertion::Existing(v);
            }
        }

        let mut cavity = vec![seed];
        let mut in_cavity: HashSet<usize> = HashSet::new();
        in_cavity.insert(seed);
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        let mut split: Vec<((usize, usize), SegmentKind)> = Vec::new();
        let mut stack = vec![seed];

        while let Some(id) = stack.pop() {
            let Some(tri) = self.triangle(id) else {
                continue;
            };
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let segment = self.segments.get(&key(a, b)).copied();
                let on_edge = self.on_segment_interior(a, b, p);

                if let Some(kind) = segment {
                    if on_edge {
                        if !split.iter().any(|(s, _)| *s == key(a, b)) {
                            split.push((key(a, b), kind));
                        }
                    } else if reject_encroaching
                        && in_diametral_circle(self.points[a], self.points[b], p)
                    {
                        return Insertion::Encroaches(a, b);
                    }
                }

                match self.neighbor(a, b) {
                    None => {
                        if !on_edge {
                            boundary.push((a, b));
                        }
                    }
                    Some(n) if in_cavity.contains(&n) => {}
                    Some(n) => {
                        let grow = match segment {
                            Some(_) => on_edge,
                            None => on_edge || self.in_circumcircle(n, p),
                        };
                        if grow {
                            in_cavity.insert(n);
                            cavity.push(n);
                            stack.push(n);
                        } else {
                            boundary.push((a, b));
                        }
                    }
                }
            }
        }

        boundary.retain(|&(a, b)| match self.neighbor(a, b) {
            Some(n) => !in_cavity.contains(&n),
            None => true,
        });

        for id in cavity {
            self.remove_triangle(id);
        }
        for (a, b) in boundary {
            self.add_triangle([a, b, vi]);
        }
        for ((a, b), kind) in split {
            self.segments.remove(&(a, b));
            self.segments.insert(key(a, vi), kind);
            self.segments.insert(key(vi, b), kind);
        }

        Insertion::Inserted(vi)
    }

    // ------------------------------------------------------------------------
    // Segment recovery
    // ------------------------------------------------------------------------

    /// Triangles incident to vertex `v`.
    fn incident_triangles(&self, v: usize) -> Vec<usize> {
        let start = match self.vertex_triangle.get(v) {
            Some(&id) if self.triangle(id).is_some_and(|t| t.contains(&v)) => Some(id),
            _ => self
                .triangles
                .iter()
                .position(|t| t.is_some_and(|t| t.contains(&v))),
        };
        let Some(start) = start else {
            return Vec::new();
        };

        let rotated = |id: usize| -> Option<[usize; 3]> {
            let tri = self.triangle(id)?;
            let k = tri.iter().position(|&x| x == v)?;
            Some([tri[k], tri[(k + 1) % 3], tri[(k + 2) % 3]])
        };

        let mut fan = vec![start];
        let mut current = start;
        let mut closed = false;
        // counter-clockwise
        while let Some([_, _, y]) = rotated(current) {
            match self.half_edges.get(&(v, y)).copied() {
                Some(next) if next == start => {
                    closed = true;
                    break;
                }
                Some(next) if !fan.contains(&next) => {
                    fan.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        if !closed {
            current = start;
            // clockwise
            while let Some([_, x, _]) = rotated(current) {
                match self.half_edges.get(&(x, v)).copied() {
                    Some(prev) if !fan.contains(&prev) => {
                        fan.push(prev);
                        current = prev;
                    }
                    _ => break,
                }
            }
        }
        fan
    }

    fn is_between(&self, a: usize, b: usize, x: usize) -> bool {
        let (pa, pb, px) = (self.points[a], self.points[b], self.points[x]);
        if line_distance(pa, pb, px).abs() > self.tolerance {
            return false;
        }
        let t = (px - pa).dot(pb - pa) / pa.distance_squared(pb).max(f64::MIN_POSITIVE);
        t > 0.0 && t < 1.0
    }

    fn trace(&self, a: usize, b: usize) -> Trace {
        let (pa, pb) = (self.points[a], self.points[b]);
        let side = |v: usize| line_distance(pa, pb, self.points[v]);

        let mut first = None;
        for id in self.incident_triangles(a) {
            let Some(tri) = self.triangle(id) else {
                continue;
            };
            let Some(k) = tri.iter().position(|&v| v == a) else {
                continue;
            };
            let (x, y) = (tri[(k + 1) % 3], tri[(k + 2) % 3]);
            for v in [x, y] {
                if self.is_between(a, b, v) {
                    return Trace::Collinear(v);
                }
            }
            if side(x) < 0.0 && side(y) > 0.0 {
                first = Some((id, x, y));
                break;
            }
        }
        let Some((start, mut x, mut y)) = first else {
            return Trace::Failed;
        };

        let mut removed = vec![start];
        let mut right = vec![x];
        let mut left = vec![y];
        let limit = self.triangles.len();

        for _ in 0..limit {
            if self.is_segment(x, y) {
                return Trace::CrossesSegment(x, y);
            }
            let Some(next) = self.neighbor(x, y) else {
                return Trace::Failed;
            };
            let Some(tri) = self.triangle(next) else {
                return Trace::Failed;
            };
            let Some(z) = tri.iter().copied().find(|&v| v != x && v != y) else {
                return Trace::Failed;
            };
            removed.push(next);

            if z == b {
                return Trace::Crossed {
                    removed,
                    left,
                    right,
                    end: b,
                };
            }
            let s = side(z);
            if s.abs() <= self.tolerance {
                return Trace::Crossed {
                    removed,
                    left,
                    right,
                    end: z,
                };
            }
            if s > 0.0 {
                left.push(z);
                y = z;
            } else {
                right.push(z);
                x = z;
            }
        }
        Trace::Failed
    }

    /// Force the segment `a`-`b` into the triangulation.
    ///
    /// Vertices lying on the segment split it; crossings with existing
    /// segments insert the intersection point.
    pub fn insert_segment(&mut self, a: usize, b: usize, kind: SegmentKind) {
        let mut work = vec![(a, b)];
        let mut budget = 4 * (self.points.len() + 16);

        while let Some((a, b)) = work.pop() {
            if budget == 0 {
                tracing::warn!("Segment recovery budget exhausted, constraints may be missing");
                return;
            }
            budget -= 1;
            if a == b {
                continue;
            }
            if self.edge_exists(a, b) {
                self.mark_segment(a, b, kind);
                continue;
            }

            match self.trace(a, b) {
                Trace::Collinear(v) => {
                    work.push((v, b));
                    work.push((a, v));
                }
                Trace::CrossesSegment(x, y) => {
                    let Some(p) = segment_crossing(
                        self.points[a],
                        self.points[b],
                        self.points[x],
                        self.points[y],
                    ) else {
                        tracing::warn!(a, b, "Degenerate segment crossing, constraint skipped");
                        continue;
                    };
                    match self.insert_point(p, false) {
                        Insertion::Inserted(v) | Insertion::Existing(v) if v != a && v != b => {
                            work.push((v, b));
                            work.push((a, v));
                        }
                        _ => {
                            tracing::warn!(a, b, "Could not split crossing segment");
                        }
                    }
                }
                Trace::Crossed {
                    removed,
                    left,
                    right,
                    end,
                } => {
                    for id in removed {
                        self.remove_triangle(id);
                    }
                    self.fill_pseudo_polygon(a, end, &left, true);
                    self.fill_pseudo_polygon(a, end, &right, false);
                    self.mark_segment(a, end, kind);
                    if end != b {
                        work.push((end, b));
                    }
                }
                Trace::Failed => {
                    tracing::warn!(a, b, "Segment trace failed, constraint skipped");
                }
            }
        }
    }

    /// Delaunay triangulation of the pseudo-polygon `a, chain.., b` on one
    /// side of the base edge `a`-`b`.
    fn fill_pseudo_polygon(&mut self, a: usize, b: usize, chain: &[usize], left_side: bool) {
        if chain.is_empty() {
            return;
        }
        let (pa, pb) = (self.points[a], self.points[b]);
        let mut ci = 0;
        for i in 1..chain.len() {
            let pc = self.points[chain[ci]];
            let candidate = self.points[chain[i]];
            let inside = if left_side {
                incircle(pa, pb, pc, candidate)
            } else {
                incircle(pb, pa, pc, candidate)
            };
            if inside > 0.0 {
                ci = i;
            }
        }
        let c = chain[ci];
        self.fill_pseudo_polygon(a, c, &chain[..ci], left_side);
        self.fill_pseudo_polygon(c, b, &chain[ci + 1..], left_side);
        if left_side {
            self.add_triangle([a, b, c]);
        } else {
            self.add_triangle([b, a, c]);
        }
    }

    // ------------------------------------------------------------------------
    // Exterior removal
    // ------------------------------------------------------------------------

    /// Remove super-triangle triangles and, with `carve`, every triangle
    /// reachable from them without crossing a segment.
    ///
    /// Carving is abandoned when it would leave an input segment with no
    /// adjacent triangle (open outlines, stray edges).
    pub fn remove_exterior(&mut self, carve: bool) {
        let ids = self.triangle_ids();
        let touches_super = |tri: [usize; 3]| tri.iter().any(|&v| v < SUPER_VERTEX_COUNT);

        let mut doomed = vec![false; self.triangles.len()];
        let mut stack = Vec::new();
        for &id in &ids {
            if self.triangle(id).is_some_and(touches_super) {
                doomed[id] = true;
                stack.push(id);
            }
        }

        if carve && !self.segments.is_empty() {
            let mut carved = doomed.clone();
            while let Some(id) = stack.pop() {
                let Some(tri) = self.triangle(id) else {
                    continue;
                };
                for k in 0..3 {
                    let (a, b) = (tri[k], tri[(k + 1) % 3]);
                    if self.is_segment(a, b) {
                        continue;
                    }
                    if let Some(n) = self.neighbor(a, b) {
                        if !carved[n] {
                            carved[n] = true;
                            stack.push(n);
                        }
                    }
                }
            }

            let keeps_segments = self
                .segments
                .iter()
                .filter(|(_, kind)| **kind == SegmentKind::Input)
                .all(|(&(a, b), _)| {
                    [(a, b), (b, a)]
                        .iter()
                        .filter_map(|&(u, v)| self.half_edges.get(&(u, v)))
                        .any(|&id| !carved[id])
                });
            if keeps_segments {
                doomed = carved;
            } else {
                tracing::debug!("Constraint edges do not enclose a region, keeping convex hull");
            }
        }

        for id in ids {
            if doomed[id] {
                self.remove_triangle(id);
            }
        }
        self.segments
            .retain(|&(a, b), _| a >= SUPER_VERTEX_COUNT && b >= SUPER_VERTEX_COUNT);
    }
}

/// Intersection of segments `a`-`b` and `c`-`d` (parameters within [0, 1]).
fn segment_crossing(a: DVec2, b: DVec2, c: DVec2, d: DVec2) -> Option<DVec2> {
    let r = b - a;
    let s = d - c;
    let denom = r.perp_dot(s);
    if denom == 0.0 {
        return None;
    }
    let t = (c - a).perp_dot(s) / denom;
    let u = (c - a).perp_dot(r) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then(|| a + r * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<DVec2> {
        vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ]
    }

    fn has_edge(cdt: &Cdt, a: usize, b: usize) -> bool {
        cdt.edge_exists(a + SUPER_VERTEX_COUNT, b + SUPER_VERTEX_COUNT)
    }

    fn assert_ccw(cdt: &Cdt) {
        for [a, b, c] in cdt.triangles() {
            assert!(orient(cdt.points[a], cdt.points[b], cdt.points[c]) > 0.0);
        }
    }

    #[test]
    fn test_square_gives_two_triangles() {
        let cdt = Cdt::build(&square(), &[], false);
        assert_eq!(cdt.triangles().count(), 2);
        assert_ccw(&cdt);
    }

    #[test]
    fn test_forced_diagonal() {
        // Both diagonals are Delaunay for a square; force each in turn.
        for (a, b) in [(0, 2), (1, 3)] {
            let cdt = Cdt::build(&square(), &[(a, b)], false);
            assert!(has_edge(&cdt, a, b));
            assert_eq!(cdt.triangles().count(), 2);
        }
    }

    #[test]
    fn test_constraint_across_many_triangles() {
        let mut points = vec![DVec2::new(0.0, 5.0), DVec2::new(20.0, 5.0)];
        for i in 0..9 {
            let x = 2.0 + 2.0 * i as f64;
            points.push(DVec2::new(x, 4.0 + (i % 2) as f64 * 0.5));
            points.push(DVec2::new(x + 0.5, 6.0 - (i % 3) as f64 * 0.3));
        }
        let cdt = Cdt::build(&points, &[(0, 1)], false);
        assert!(has_edge(&cdt, 0, 1));
        assert!(cdt.is_segment(SUPER_VERTEX_COUNT, SUPER_VERTEX_COUNT + 1));
        assert_ccw(&cdt);
    }

    #[test]
    fn test_collinear_vertex_splits_segment() {
        let mut points = square();
        points.push(DVec2::new(5.0, 5.0));
        let cdt = Cdt::build(&points, &[(0, 2)], false);
        assert!(has_edge(&cdt, 0, 4));
        assert!(has_edge(&cdt, 4, 2));
        assert!(!cdt.is_segment(SUPER_VERTEX_COUNT, SUPER_VERTEX_COUNT + 2));
    }

    #[test]
    fn test_crossing_segments_insert_intersection() {
        let cdt = Cdt::build(&square(), &[(0, 2), (1, 3)], false);
        assert_eq!(cdt.points.len(), SUPER_VERTEX_COUNT + 5);
        let center = cdt.points[SUPER_VERTEX_COUNT + 4];
        assert!((center - DVec2::new(5.0, 5.0)).length() < 1e-9);
        assert_eq!(cdt.triangles().count(), 4);
    }

    #[test]
    fn test_carving_removes_concavity() {
        // L-shaped outline; its convex hull adds one triangle in the notch.
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 4.0),
            DVec2::new(4.0, 4.0),
            DVec2::new(4.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        let outline: Vec<(usize, usize)> = (0..6).map(|i| (i, (i + 1) % 6)).collect();
        let hull = Cdt::build(&points, &[], false);
        let carved = Cdt::build(&points, &outline, true);
        assert_eq!(hull.triangles().count(), 5);
        assert_eq!(carved.triangles().count(), 4);
        let notch = DVec2::new(6.0, 6.0);
        assert!(hull.locate_linear(notch).is_some());
        assert!(carved.locate_linear(notch).is_none());
    }

    #[test]
    fn test_open_outline_keeps_hull() {
        let cdt = Cdt::build(&square(), &[(0, 1), (1, 2)], true);
        assert_eq!(cdt.triangles().count(), 2);
    }

    #[test]
    fn test_insert_point_on_segment_splits_it() {
        let mut cdt = Cdt::build(&square(), &[(0, 1), (1, 2), (2, 3), (3, 0)], true);
        cdt.mark_boundary_segments();
        let outcome = cdt.insert_point(DVec2::new(5.0, 0.0), false);
        let Insertion::Inserted(v) = outcome else {
            panic!("expected insertion, got {outcome:?}");
        };
        assert!(cdt.is_segment(SUPER_VERTEX_COUNT, v));
        assert!(cdt.is_segment(v, SUPER_VERTEX_COUNT + 1));
        assert!(!cdt.is_segment(SUPER_VERTEX_COUNT, SUPER_VERTEX_COUNT + 1));
        assert_eq!(cdt.triangles().count(), 3);
        assert_ccw(&cdt);
    }

    #[test]
    fn test_duplicate_point_is_reported() {
        let mut cdt = Cdt::build(&square(), &[], false);
        let before = cdt.points.len();
        assert_eq!(
            cdt.insert_point(DVec2::new(10.0, 10.0), false),
            Insertion::Existing(SUPER_VERTEX_COUNT + 2)
        );
        assert_eq!(cdt.points.len(), before);
    }
}
