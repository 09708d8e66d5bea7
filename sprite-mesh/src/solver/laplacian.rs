//! Cotangent Laplacian and lumped mass matrix of a planar triangle mesh

use glam::DVec2;

use super::sparse::CsrMatrix;

/// Cotangent Laplacian `L` (positive semi-definite sign convention) and the
/// lumped (one third of incident area) vertex masses.
///
/// `L[i][j] = -(cot a + cot b) / 2` for the two angles opposite edge `ij`.
pub fn cotangent_laplacian(points: &[DVec2], triangles: &[[usize; 3]]) -> (CsrMatrix, Vec<f64>) {
    let n = points.len();
    let mut triplets = Vec::with_capacity(triangles.len() * 12);
    let mut mass = vec![0.0f64; n];

    for &tri in triangles {
        let [p0, p1, p2] = tri.map(|v| points[v]);
        let double_area = (p1 - p0).perp_dot(p2 - p0).abs();
        if double_area <= f64::EPSILON {
            continue;
        }
        for &v in &tri {
            mass[v] += double_area / 6.0;
        }
        for k in 0..3 {
            // Edge (i, j) opposite vertex o
            let o = tri[k];
            let i = tri[(k + 1) % 3];
            let j = tri[(k + 2) % 3];
            let u = points[i] - points[o];
            let w = points[j] - points[o];
            let cot = u.dot(w) / double_area;
            let half = 0.5 * cot;
            triplets.push((i, j, -half));
            triplets.push((j, i, -half));
            triplets.push((i, i, half));
            triplets.push((j, j, half));
        }
    }

    (CsrMatrix::from_triplets(n, &triplets), mass)
}

/// Biharmonic operator `L M^-1 L`.
///
/// Vertices with no area (not referenced by any triangle) get unit mass.
pub fn bilaplacian(laplacian: &CsrMatrix, mass: &[f64]) -> CsrMatrix {
    let inverse: Vec<f64> = mass
        .iter()
        .map(|&m| if m > 0.0 { 1.0 / m } else { 1.0 })
        .collect();
    laplacian.symmetric_sandwich(&inverse)
}
