//! Compressed sparse row matrices and the iterative solvers used by the
//! weight diffusion

/// Square sparse matrix in CSR layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsrMatrix {
    size: usize,
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble from `(row, column, value)` triplets; duplicates are summed.
    ///
    /// Triplets outside `size x size` are dropped.
    pub fn from_triplets(size: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets
            .iter()
            .copied()
            .filter(|&(r, c, _)| r < size && c < size)
            .collect();
        sorted.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut row_offsets = vec![0usize; size + 1];
        let mut columns = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (r, c, v) in sorted {
            if last == Some((r, c)) {
                if let Some(value) = values.last_mut() {
                    *value += v;
                }
                continue;
            }
            columns.push(c);
            values.push(v);
            row_offsets[r + 1] += 1;
            last = Some((r, c));
        }
        for r in 0..size {
            row_offsets[r + 1] += row_offsets[r];
        }

        Self {
            size,
            row_offsets,
            columns,
            values,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn non_zeros(&self) -> usize {
        self.values.len()
    }

    /// Column/value pairs of `row`
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.row(row)
            .find(|&(c, _)| c == column)
            .map_or(0.0, |(_, v)| v)
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size).map(|i| self.get(i, i)).collect()
    }

    /// `y = A x`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        for (i, out) in y.iter_mut().enumerate().take(self.size) {
            *out = self.row(i).map(|(c, v)| v * x[c]).sum();
        }
    }

    /// `A D A` for symmetric `A` and diagonal `D`.
    ///
    /// Rows are accumulated with a dense scratch row (Gustavson).
    pub fn symmetric_sandwich(&self, diagonal: &[f64]) -> Self {
        let n = self.size;
        let mut accumulator = vec![0.0f64; n];
        let mut marker = vec![usize::MAX; n];
        let mut touched = Vec::new();

        let mut row_offsets = Vec::with_capacity(n + 1);
        row_offsets.push(0);
        let mut columns = Vec::new();
        let mut values = Vec::new();

        for i in 0..n {
            touched.clear();
            for (k, a_ik) in self.row(i) {
                let scale = a_ik * diagonal[k];
                for (j, a_kj) in self.row(k) {
                    if marker[j] != i {
                        marker[j] = i;
                        accumulator[j] = 0.0;
                        touched.push(j);
                    }
                    accumulator[j] += scale * a_kj;
                }
            }
            touched.sort_unstable();
            for &j in &touched {
                columns.push(j);
                values.push(accumulator[j]);
            }
            row_offsets.push(columns.len());
        }

        Self {
            size: n,
            row_offsets,
            columns,
            values,
        }
    }

    /// Add `epsilon` to every diagonal entry present in the pattern.
    pub fn add_to_diagonal(&mut self, epsilon: f64) {
        for i in 0..self.size {
            for idx in self.row_offsets[i]..self.row_offsets[i + 1] {
                if self.columns[idx] == i {
                    self.values[idx] += epsilon;
                }
            }
        }
    }
}

/// Outcome of an iterative solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Jacobi-preconditioned conjugate gradient on the rows where `fixed` is
/// false, holding the fixed entries of `x` as Dirichlet values.
///
/// Solves `A[F,F] x[F] = -A[F,H] x[H]`.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    x: &mut [f64],
    fixed: &[bool],
    max_iterations: usize,
    tolerance: f64,
) -> SolveReport {
    let n = a.size();
    let diagonal = a.diagonal();
    let free = |i: usize| !fixed[i];

    // r = -A x over free rows (x holds the Dirichlet values)
    let mut ax = vec![0.0; n];
    a.mul_vec(x, &mut ax);
    let mut r: Vec<f64> = (0..n).map(|i| if free(i) { -ax[i] } else { 0.0 }).collect();
    let precondition = |r: &[f64], z: &mut [f64]| {
        for i in 0..n {
            z[i] = if free(i) && diagonal[i] > 0.0 {
                r[i] / diagonal[i]
            } else {
                0.0
            };
        }
    };

    let norm_b = dot(&r, &r).sqrt();
    if norm_b == 0.0 {
        return SolveReport {
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
    }

    // Solve for the correction d with x[F] = x0[F] + d
    let mut d = vec![0.0; n];
    let mut z = vec![0.0; n];
    precondition(&r, &mut z);
    let mut p = z.clone();
    let mut rz = dot(&r, &z);
    let mut ap = vec![0.0; n];
    let mut report = SolveReport {
        iterations: 0,
        residual: 1.0,
        converged: false,
    };

    for iteration in 0..max_iterations {
        a.mul_vec(&p, &mut ap);
        for i in 0..n {
            if !free(i) {
                ap[i] = 0.0;
            }
        }
        let pap = dot(&p, &ap);
        if pap <= 0.0 {
            break;
        }
        let alpha = rz / pap;
        for i in 0..n {
            d[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }

        report.iterations = iteration + 1;
        report.residual = dot(&r, &r).sqrt() / norm_b;
        if report.residual <= tolerance {
            report.converged = true;
            break;
        }

        precondition(&r, &mut z);
        let rz_next = dot(&r, &z);
        let beta = rz_next / rz;
        rz = rz_next;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
    }

    for i in 0..n {
        if free(i) {
            x[i] += d[i];
        }
    }
    report
}

/// Projected Gauss-Seidel sweeps keeping free entries of `x` within
/// `[lower, upper]` for the system `A[F,F] x[F] = -A[F,H] x[H]`.
pub fn projected_gauss_seidel(
    a: &CsrMatrix,
    x: &mut [f64],
    fixed: &[bool],
    lower: f64,
    upper: f64,
    sweeps: usize,
) {
    for i in 0..x.len() {
        if !fixed[i] {
            x[i] = x[i].clamp(lower, upper);
        }
    }
    for _ in 0..sweeps {
        for i in 0..a.size() {
            if fixed[i] {
                continue;
            }
            let mut diagonal = 0.0;
            let mut rhs = 0.0;
            for (j, v) in a.row(i) {
                if j == i {
                    diagonal = v;
                } else {
                    rhs -= v * x[j];
                }
            }
            if diagonal > 0.0 {
                x[i] = (rhs / diagonal).clamp(lower, upper);
            }
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1D Laplacian on a path of `n` nodes
    fn path_laplacian(n: usize) -> CsrMatrix {
        let mut triplets = Vec::new();
        for i in 0..n - 1 {
            triplets.push((i, i, 1.0));
            triplets.push((i + 1, i + 1, 1.0));
            triplets.push((i, i + 1, -1.0));
            triplets.push((i + 1, i, -1.0));
        }
        CsrMatrix::from_triplets(n, &triplets)
    }

    #[test]
    fn test_triplets_are_summed() {
        let m = CsrMatrix::from_triplets(2, &[(0, 0, 1.0), (0, 0, 2.0), (1, 0, 4.0), (5, 5, 1.0)]);
        assert_eq!(m.get(0, 0), 3.0);
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.non_zeros(), 2);
    }

    #[test]
    fn test_sandwich_matches_dense_product() {
        let l = path_laplacian(4);
        let d = [1.0, 2.0, 0.5, 1.0];
        let k = l.symmetric_sandwich(&d);
        for i in 0..4 {
            for j in 0..4 {
                let expected: f64 = (0..4).map(|m| l.get(i, m) * d[m] * l.get(m, j)).sum();
                assert!((k.get(i, j) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_cg_interpolates_linearly_between_handles() {
        let n = 11;
        let l = path_laplacian(n);
        let mut x = vec![0.0; n];
        let mut fixed = vec![false; n];
        x[0] = 1.0;
        fixed[0] = true;
        fixed[n - 1] = true;

        let report = conjugate_gradient(&l, &mut x, &fixed, 100, 1e-12);
        assert!(report.converged);
        for (i, value) in x.iter().enumerate() {
            let expected = 1.0 - i as f64 / (n - 1) as f64;
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pgs_respects_bounds() {
        let n = 6;
        let l = path_laplacian(n);
        let mut x = vec![2.0, -3.0, 5.0, 0.5, -1.0, 0.0];
        let mut fixed = vec![false; n];
        fixed[0] = true;
        fixed[n - 1] = true;
        projected_gauss_seidel(&l, &mut x, &fixed, 0.0, 1.0, 200);
        assert_eq!(x[0], 2.0);
        for value in &x[1..n] {
            assert!((0.0..=1.0).contains(value));
        }
    }
}
