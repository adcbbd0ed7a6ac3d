use ndarray::Array2;
use thiserror::Error;

use super::sparse::CsrMatrix;

/// Linear solver used for every region system.
///
/// The systems are symmetric positive definite as soon as one pixel of the
/// image is known, so both variants converge to the same solution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Solver {
    /// Banded Cholesky factorization, exact up to rounding.
    #[default]
    Cholesky,
    /// Jacobi preconditioned conjugate gradient.
    ConjugateGradient {
        /// Relative residual `|b - Ax| / |b|` to reach.
        tolerance: f64,
        max_iterations: usize,
    },
}

impl Solver {
    pub const fn conjugate_gradient() -> Self {
        Self::ConjugateGradient {
            tolerance: 1e-10,
            max_iterations: 50_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverFailure {
    #[error("system is not positive definite at pivot {pivot}")]
    NotPositiveDefinite { pivot: usize },
    #[error("no convergence after {iterations} iterations, relative residual {residual:e}")]
    NoConvergence { iterations: usize, residual: f64 },
    #[error("conjugate gradient broke down at iteration {iteration}")]
    Breakdown { iteration: usize },
    #[error("solution contains non-finite values")]
    NonFinite,
}

/// Solver state computed once per region and shared by all channels.
#[derive(Debug)]
pub(crate) enum Factorization {
    Cholesky(BandedCholesky),
    ConjugateGradient {
        inverse_diagonal: Vec<f64>,
        tolerance: f64,
        max_iterations: usize,
    },
}

impl Factorization {
    pub(crate) fn prepare(solver: Solver, matrix: &CsrMatrix) -> Result<Self, SolverFailure> {
        match solver {
            Solver::Cholesky => BandedCholesky::factor(matrix).map(Self::Cholesky),
            Solver::ConjugateGradient {
                tolerance,
                max_iterations,
            } => {
                let inverse_diagonal = matrix
                    .diagonal()
                    .into_iter()
                    .enumerate()
                    .map(|(pivot, value)| {
                        if value > 0.0 {
                            Ok(value.recip())
                        } else {
                            Err(SolverFailure::NotPositiveDefinite { pivot })
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::ConjugateGradient {
                    inverse_diagonal,
                    tolerance,
                    max_iterations,
                })
            }
        }
    }

    pub(crate) fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>, SolverFailure> {
        let solution = match self {
            Self::Cholesky(factor) => factor.solve(rhs),
            Self::ConjugateGradient {
                inverse_diagonal,
                tolerance,
                max_iterations,
            } => conjugate_gradient(matrix, inverse_diagonal, rhs, *tolerance, *max_iterations)?,
        };

        if solution.iter().all(|value| value.is_finite()) {
            Ok(solution)
        } else {
            Err(SolverFailure::NonFinite)
        }
    }
}

/// Lower triangular Cholesky factor stored as a band.
///
/// `band[(i, bandwidth + j - i)]` holds `L[i][j]` for `i - bandwidth <= j <= i`.
#[derive(Debug)]
pub(crate) struct BandedCholesky {
    bandwidth: usize,
    band: Array2<f64>,
}

impl BandedCholesky {
    pub(crate) fn factor(matrix: &CsrMatrix) -> Result<Self, SolverFailure> {
        let size = matrix.size();
        let bandwidth = matrix.lower_bandwidth();
        let mut band = Array2::zeros((size, bandwidth + 1));
        for row in 0..size {
            for (column, value) in matrix.row(row) {
                if column <= row {
                    band[(row, bandwidth + column - row)] = value;
                }
            }
        }

        for j in 0..size {
            let mut pivot = band[(j, bandwidth)];
            let scale = pivot.abs();
            for k in j.saturating_sub(bandwidth)..j {
                let value = band[(j, bandwidth + k - j)];
                pivot -= value * value;
            }
            if !(pivot > scale * f64::EPSILON) {
                return Err(SolverFailure::NotPositiveDefinite { pivot: j });
            }
            let pivot = pivot.sqrt();
            band[(j, bandwidth)] = pivot;

            for i in j + 1..(j + bandwidth + 1).min(size) {
                let mut value = band[(i, bandwidth + j - i)];
                for k in i.saturating_sub(bandwidth)..j {
                    value -= band[(i, bandwidth + k - i)] * band[(j, bandwidth + k - j)];
                }
                band[(i, bandwidth + j - i)] = value / pivot;
            }
        }

        Ok(Self { bandwidth, band })
    }

    pub(crate) fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let size = rhs.len();
        let bandwidth = self.bandwidth;

        let mut forward = vec![0.0; size];
        for i in 0..size {
            let mut value = rhs[i];
            for k in i.saturating_sub(bandwidth)..i {
                value -= self.band[(i, bandwidth + k - i)] * forward[k];
            }
            forward[i] = value / self.band[(i, bandwidth)];
        }

        let mut solution = vec![0.0; size];
        for i in (0..size).rev() {
            let mut value = forward[i];
            for k in i + 1..(i + bandwidth + 1).min(size) {
                value -= self.band[(k, bandwidth + i - k)] * solution[k];
            }
            solution[i] = value / self.band[(i, bandwidth)];
        }
        solution
    }
}

fn dot(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

fn conjugate_gradient(
    matrix: &CsrMatrix,
    inverse_diagonal: &[f64],
    rhs: &[f64],
    tolerance: f64,
    max_iterations: usize,
) -> Result<Vec<f64>, SolverFailure> {
    let size = rhs.len();
    let mut solution = vec![0.0; size];

    let rhs_norm = dot(rhs, rhs).sqrt();
    if rhs_norm == 0.0 {
        return Ok(solution);
    }

    let mut residual = rhs.to_vec();
    let mut preconditioned: Vec<f64> = residual
        .iter()
        .zip(inverse_diagonal)
        .map(|(r, d)| r * d)
        .collect();
    let mut direction = preconditioned.clone();
    let mut product = vec![0.0; size];
    let mut rho = dot(&residual, &preconditioned);
    let mut relative = 1.0;

    for iteration in 1..=max_iterations {
        matrix.multiply(&direction, &mut product);
        let curvature = dot(&direction, &product);
        if !(curvature > 0.0) {
            return Err(SolverFailure::Breakdown { iteration });
        }
        let alpha = rho / curvature;
        for ((x, r), (p, q)) in solution
            .iter_mut()
            .zip(residual.iter_mut())
            .zip(direction.iter().zip(&product))
        {
            *x += alpha * p;
            *r -= alpha * q;
        }

        relative = dot(&residual, &residual).sqrt() / rhs_norm;
        if relative <= tolerance {
            log::trace!("conjugate gradient converged after {iteration} iterations");
            return Ok(solution);
        }

        for ((z, r), d) in preconditioned
            .iter_mut()
            .zip(&residual)
            .zip(inverse_diagonal)
        {
            *z = r * d;
        }
        let next_rho = dot(&residual, &preconditioned);
        let beta = next_rho / rho;
        rho = next_rho;
        for (p, z) in direction.iter_mut().zip(&preconditioned) {
            *p = z + beta * *p;
        }
    }

    Err(SolverFailure::NoConvergence {
        iterations: max_iterations,
        residual: relative,
    })
}
