//! Laplacian relaxation of Steiner vertices

use glam::DVec2;
use hashbrown::HashSet;

use super::cdt::{Cdt, SUPER_VERTEX_COUNT};
use super::predicates::orient;

impl Cdt {
    /// Move every free Steiner vertex to the centroid of its neighbours
    /// `iterations` times, then rebuild the triangulation over the moved
    /// points with the same segments.
    ///
    /// Input vertices (the first `input_count` after the super triangle) and
    /// segment endpoints stay put. A move that would leave the vertex's star
    /// is skipped.
    pub fn relax(&mut self, input_count: usize, iterations: u32) {
        if iterations == 0 {
            return;
        }
        let first_steiner = SUPER_VERTEX_COUNT + input_count;
        if self.points.len() <= first_steiner {
            return;
        }

        let pinned: HashSet<usize> = self.segments().flat_map(|((a, b), _)| [a, b]).collect();

        for _ in 0..iterations {
            // Opposite edges of each vertex's incident triangles, CCW
            let mut rings: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.points.len()];
            for [a, b, c] in self.triangles() {
                rings[a].push((b, c));
                rings[b].push((c, a));
                rings[c].push((a, b));
            }

            let mut moved = self.points.clone();
            for v in first_steiner..self.points.len() {
                if pinned.contains(&v) || rings[v].is_empty() {
                    continue;
                }
                let ring = &rings[v];
                let mut neighbors: Vec<usize> = ring.iter().flat_map(|&(x, y)| [x, y]).collect();
                neighbors.sort_unstable();
                neighbors.dedup();
                let centroid = neighbors
                    .iter()
                    .fold(DVec2::ZERO, |sum, &n| sum + self.points[n])
                    / neighbors.len() as f64;

                let inside_star = ring
                    .iter()
                    .all(|&(x, y)| orient(self.points[x], self.points[y], centroid) > 0.0);
                if inside_star {
                    moved[v] = centroid;
                }
            }
            // Jacobi update: every move reads the previous positions
            self.points = moved;
        }

        let segments: Vec<_> = self
            .segments()
            .map(|((a, b), kind)| (a - SUPER_VERTEX_COUNT, b - SUPER_VERTEX_COUNT, kind))
            .collect();
        let points = self.points[SUPER_VERTEX_COUNT..].to_vec();
        *self = Cdt::build_with_kinds(&points, &segments, true);
    }
}

#[cfg(test)]
mod tests {
    use super::super::refine::Quality;
    use super::*;

    #[test]
    fn test_relax_keeps_inputs_and_segments() {
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        let segments: Vec<_> = (0..4).map(|i| (i, (i + 1) % 4)).collect();
        let mut cdt = Cdt::build(&points, &segments, true);
        cdt.refine(
            Quality {
                max_area: 4.0,
                ..Default::default()
            },
            1000,
        );
        let before = cdt.points.len();
        let (_, area_before) = cdt.area_stats();
        cdt.relax(4, 3);

        assert_eq!(cdt.points.len(), before);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(cdt.points[SUPER_VERTEX_COUNT + i], *p);
        }
        let (_, area_after) = cdt.area_stats();
        assert!((area_before - area_after).abs() < 1e-6);
        for [a, b, c] in cdt.triangles() {
            assert!(orient(cdt.points[a], cdt.points[b], cdt.points[c]) > 0.0);
        }
    }
}
