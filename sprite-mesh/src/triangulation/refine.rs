//! Ruppert-style quality refinement of a constrained triangulation

use glam::DVec2;
use hashbrown::HashSet;

use super::cdt::{Cdt, Insertion};
use super::predicates::{angles, circumcenter, in_diametral_circle, orient};

/// Quality bounds for one refinement pass. Zero disables a bound.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Quality {
    /// Minimum interior angle, degrees
    pub min_angle: f64,
    /// Maximum interior angle, degrees
    pub max_angle: f64,
    /// Maximum triangle area
    pub max_area: f64,
}

/// Minimum angles above this bound are not guaranteed to terminate.
const MIN_ANGLE_LIMIT: f64 = 34.0;

/// Segments and edges shorter than this (times the input extent) are not split.
const MIN_FEATURE_FACTOR: f64 = 1e-4;

impl Quality {
    pub fn is_active(&self) -> bool {
        self.min_angle > 0.0 || self.max_angle > 0.0 || self.max_area > 0.0
    }

    fn is_bad(&self, a: DVec2, b: DVec2, c: DVec2) -> bool {
        if self.max_area > 0.0 && orient(a, b, c).abs() * 0.5 > self.max_area {
            return true;
        }
        if self.min_angle <= 0.0 && self.max_angle <= 0.0 {
            return false;
        }
        let [x, y, z] = angles(a, b, c);
        let smallest = x.min(y).min(z).to_degrees();
        let largest = x.max(y).max(z).to_degrees();
        (self.min_angle > 0.0 && smallest < self.min_angle.min(MIN_ANGLE_LIMIT))
            || (self.max_angle > 0.0 && largest > self.max_angle.max(60.0))
    }
}

/// Outcome counters of a refinement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RefineStats {
    pub inserted: usize,
    pub budget_exhausted: bool,
}

struct Refiner<'a> {
    cdt: &'a mut Cdt,
    quality: Quality,
    min_length: f64,
    budget: usize,
    stats: RefineStats,
}

impl Cdt {
    /// Largest and total triangle area.
    pub fn area_stats(&self) -> (f64, f64) {
        self.triangles().fold((0.0f64, 0.0f64), |(largest, total), [a, b, c]| {
            let area = orient(self.points[a], self.points[b], self.points[c]).abs() * 0.5;
            (largest.max(area), total + area)
        })
    }

    /// Insert Steiner points until every triangle satisfies `quality` or
    /// `max_steiner` points have been added.
    ///
    /// The domain boundary is promoted to segments first so refinement never
    /// grows the triangulated region.
    pub fn refine(&mut self, quality: Quality, max_steiner: usize) -> RefineStats {
        if !quality.is_active() {
            return RefineStats::default();
        }
        self.mark_boundary_segments();

        let min_length = self.extent() * MIN_FEATURE_FACTOR;
        let mut refiner = Refiner {
            cdt: self,
            quality,
            min_length,
            budget: max_steiner,
            stats: RefineStats::default(),
        };
        refiner.run();
        if refiner.stats.budget_exhausted {
            tracing::warn!(
                inserted = refiner.stats.inserted,
                "Refinement stopped at the Steiner point budget"
            );
        }
        refiner.stats
    }
}

impl Refiner<'_> {
    fn run(&mut self) {
        let mut rejected: HashSet<[usize; 3]> = HashSet::new();
        loop {
            let mut changed = self.split_encroached_segments();

            for id in self.cdt.triangle_ids() {
                if self.exhausted() {
                    return;
                }
                let Some(tri) = self.cdt.triangle(id) else {
                    continue;
                };
                let mut sorted = tri;
                sorted.sort_unstable();
                if rejected.contains(&sorted) || !self.needs_split(tri) {
                    continue;
                }
                if self.split_triangle(tri) {
                    changed = true;
                } else {
                    rejected.insert(sorted);
                }
            }

            if !changed || self.exhausted() {
                return;
            }
        }
    }

    fn exhausted(&mut self) -> bool {
        if self.stats.inserted >= self.budget {
            self.stats.budget_exhausted = true;
        }
        self.stats.budget_exhausted
    }

    fn point(&self, v: usize) -> DVec2 {
        self.cdt.points[v]
    }

    fn needs_split(&self, [a, b, c]: [usize; 3]) -> bool {
        let (pa, pb, pc) = (self.point(a), self.point(b), self.point(c));
        let shortest = pa.distance(pb).min(pb.distance(pc)).min(pc.distance(pa));
        shortest > self.min_length && self.quality.is_bad(pa, pb, pc)
    }

    /// Split every segment whose diametral circle holds the apex of an
    /// adjacent triangle. Returns whether anything was inserted.
    fn split_encroached_segments(&mut self) -> bool {
        let mut changed = false;
        loop {
            let encroached: Vec<(usize, usize)> = self
                .cdt
                .segments()
                .map(|(s, _)| s)
                .filter(|&(a, b)| self.is_encroached(a, b))
                .collect();
            if encroached.is_empty() {
                return changed;
            }

            let mut progressed = false;
            for (a, b) in encroached {
                if self.exhausted() {
                    return changed;
                }
                if self.cdt.is_segment(a, b) && self.split_segment(a, b) {
                    progressed = true;
                }
            }
            if !progressed {
                return changed;
            }
            changed = true;
        }
    }

    fn is_encroached(&self, a: usize, b: usize) -> bool {
        let (pa, pb) = (self.point(a), self.point(b));
        if pa.distance(pb) <= 2.0 * self.min_length {
            return false;
        }
        [(a, b), (b, a)].into_iter().any(|(u, v)| {
            self.cdt
                .neighbor(v, u)
                .and_then(|id| self.cdt.triangle(id))
                .and_then(|tri| tri.into_iter().find(|&x| x != a && x != b))
                .is_some_and(|apex| in_diametral_circle(pa, pb, self.point(apex)))
        })
    }

    fn split_segment(&mut self, a: usize, b: usize) -> bool {
        let (pa, pb) = (self.point(a), self.point(b));
        if pa.distance(pb) <= 2.0 * self.min_length {
            return false;
        }
        self.insert((pa + pb) * 0.5)
    }

    fn insert(&mut self, p: DVec2) -> bool {
        match self.cdt.insert_point(p, false) {
            Insertion::Inserted(_) => {
                self.stats.inserted += 1;
                true
            }
            _ => false,
        }
    }

    fn split_triangle(&mut self, [a, b, c]: [usize; 3]) -> bool {
        let (pa, pb, pc) = (self.point(a), self.point(b), self.point(c));
        if let Some(center) = circumcenter(pa, pb, pc) {
            match self.cdt.insert_point(center, true) {
                Insertion::Inserted(_) => {
                    self.stats.inserted += 1;
                    return true;
                }
                Insertion::Encroaches(s0, s1) => return self.split_segment(s0, s1),
                Insertion::Outside => {
                    let encroached = self
                        .cdt
                        .segments()
                        .map(|(s, _)| s)
                        .find(|&(s0, s1)| in_diametral_circle(self.point(s0), self.point(s1), center));
                    if let Some((s0, s1)) = encroached {
                        if self.split_segment(s0, s1) {
                            return true;
                        }
                    }
                }
                Insertion::Existing(_) => {}
            }
        }

        // Fall back to halving the longest edge.
        let edges = [(a, b), (b, c), (c, a)];
        let Some(&(u, v)) = edges.iter().max_by(|x, y| {
            let lx = self.point(x.0).distance_squared(self.point(x.1));
            let ly = self.point(y.0).distance_squared(self.point(y.1));
            lx.total_cmp(&ly)
        }) else {
            return false;
        };
        let (pu, pv) = (self.point(u), self.point(v));
        if pu.distance(pv) <= 2.0 * self.min_length {
            return false;
        }
        self.insert((pu + pv) * 0.5)
    }
}
