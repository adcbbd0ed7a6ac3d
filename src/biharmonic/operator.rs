//! Discrete biharmonic operator and the per region equations built from it.

use ndarray::{Array2, ArrayView2};

use super::sparse::CsrMatrix;

/// Reach of the squared 5-point Laplacian in pixels.
const REACH: usize = 2;
const SPAN: usize = 2 * REACH + 1;

type Window = [[f64; SPAN]; SPAN];

/// Weights of the squared Laplacian centred on one pixel.
///
/// The window is cropped at the image border and the Laplacian reflects
/// values there (index -1 reads index 0, index n reads n - 1), so edge pixels
/// get a Neumann-like boundary instead of wrapping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stencil {
    top: usize,
    left: usize,
    rows: usize,
    cols: usize,
    weights: Window,
}

impl Stencil {
    pub(crate) fn at(row: usize, col: usize, height: usize, width: usize) -> Self {
        let top = row.saturating_sub(REACH);
        let left = col.saturating_sub(REACH);
        let rows = (row + REACH + 1).min(height) - top;
        let cols = (col + REACH + 1).min(width) - left;

        let mut impulse = [[0.0; SPAN]; SPAN];
        impulse[row - top][col - left] = 1.0;
        let weights = laplace(&laplace(&impulse, rows, cols), rows, cols);

        Self {
            top,
            left,
            rows,
            cols,
            weights,
        }
    }

    /// Nonzero weights with their absolute pixel coordinates.
    pub(crate) fn taps(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| (r, c)))
            .filter_map(move |(r, c)| {
                let weight = self.weights[r][c];
                (weight != 0.0).then_some(((self.top + r, self.left + c), weight))
            })
    }
}

fn laplace(values: &Window, rows: usize, cols: usize) -> Window {
    let mut out = [[0.0; SPAN]; SPAN];
    for r in 0..rows {
        for c in 0..cols {
            let up = values[r.saturating_sub(1)][c];
            let down = values[(r + 1).min(rows - 1)][c];
            let left = values[r][c.saturating_sub(1)];
            let right = values[r][(c + 1).min(cols - 1)];
            out[r][c] = up + down + left + right - 4.0 * values[r][c];
        }
    }
    out
}

/// Linear system of one region: the operator must vanish on every unknown
/// pixel while known pixels keep their observed value.
#[derive(Debug)]
pub(crate) struct Equations {
    /// Unknown pixels, in the order of the system's rows and columns.
    pub(crate) pixels: Vec<(usize, usize)>,
    pub(crate) matrix: CsrMatrix,
    /// Known pixels each row depends on as `(row, pixel, weight)`.
    couplings: Vec<(usize, (usize, usize), f64)>,
}

impl Equations {
    /// Builds the system for the pixels labelled `label`.
    ///
    /// `members` must be non-empty and hold exactly the pixels carrying
    /// `label` in `labels`.
    pub(crate) fn assemble(
        members: &[(usize, usize)],
        labels: ArrayView2<'_, usize>,
        label: usize,
    ) -> Self {
        let (height, width) = labels.dim();
        let pixels = solve_order(members);

        let (top, left, bottom, right) = bounding_box(&pixels);
        let mut slots = Array2::from_elem((bottom - top, right - left), usize::MAX);
        for (index, &(row, col)) in pixels.iter().enumerate() {
            slots[(row - top, col - left)] = index;
        }

        let mut builder = CsrMatrix::builder(pixels.len());
        let mut couplings = Vec::new();
        for (equation, &(row, col)) in pixels.iter().enumerate() {
            for (pixel, weight) in Stencil::at(row, col, height, width).taps() {
                if labels[pixel] == label {
                    builder.push(slots[(pixel.0 - top, pixel.1 - left)], weight);
                } else {
                    couplings.push((equation, pixel, weight));
                }
            }
            builder.finish_row();
        }

        Self {
            pixels,
            matrix: builder.build(),
            couplings,
        }
    }

    /// Right hand side for one channel, moving known pixels out of the
    /// operator.
    pub(crate) fn rhs(&self, plane: ArrayView2<'_, f64>) -> Vec<f64> {
        let mut rhs = vec![0.0; self.pixels.len()];
        for &(equation, pixel, weight) in &self.couplings {
            rhs[equation] -= weight * plane[pixel];
        }
        rhs
    }
}

fn bounding_box(pixels: &[(usize, usize)]) -> (usize, usize, usize, usize) {
    pixels.iter().fold(
        (usize::MAX, usize::MAX, 0, 0),
        |(top, left, bottom, right), &(row, col)| {
            (top.min(row), left.min(col), bottom.max(row + 1), right.max(col + 1))
        },
    )
}

/// Orders pixels along the shorter side of their bounding box, which keeps
/// the band of the system narrow.
fn solve_order(members: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let (top, left, bottom, right) = bounding_box(members);
    let mut pixels = members.to_vec();
    if right - left > bottom - top {
        pixels.sort_unstable_by_key(|&(row, col)| (col, row));
    } else {
        pixels.sort_unstable();
    }
    pixels
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn weight(stencil: &Stencil, pixel: (usize, usize)) -> f64 {
        stencil
            .taps()
            .find(|(tap, _)| *tap == pixel)
            .map_or(0.0, |(_, weight)| weight)
    }

    #[test]
    fn test_interior_stencil() {
        let stencil = Stencil::at(5, 5, 11, 11);

        assert_eq!(weight(&stencil, (5, 5)), 20.0);
        for neighbour in [(4, 5), (6, 5), (5, 4), (5, 6)] {
            assert_eq!(weight(&stencil, neighbour), -8.0);
        }
        for diagonal in [(4, 4), (4, 6), (6, 4), (6, 6)] {
            assert_eq!(weight(&stencil, diagonal), 2.0);
        }
        for far in [(3, 5), (7, 5), (5, 3), (5, 7)] {
            assert_eq!(weight(&stencil, far), 1.0);
        }
        assert_eq!(stencil.taps().count(), 13);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(0, 3)]
    #[case(1, 1)]
    #[case(2, 0)]
    #[case(5, 6)]
    #[case(3, 3)]
    fn test_rows_sum_to_zero(#[case] row: usize, #[case] col: usize) {
        let total: f64 = Stencil::at(row, col, 6, 7).taps().map(|(_, w)| w).sum();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_operator_is_symmetric_at_edges() {
        let (height, width) = (5, 6);
        for row in 0..height {
            for col in 0..width {
                let stencil = Stencil::at(row, col, height, width);
                for (pixel, coefficient) in stencil.taps() {
                    let mirrored = Stencil::at(pixel.0, pixel.1, height, width);
                    assert_eq!(coefficient, weight(&mirrored, (row, col)));
                }
            }
        }
    }

    #[test]
    fn test_single_row_image() {
        let stencil = Stencil::at(0, 2, 1, 5);
        assert_eq!(weight(&stencil, (0, 2)), 6.0);
        assert_eq!(weight(&stencil, (0, 1)), -4.0);
        assert_eq!(weight(&stencil, (0, 0)), 1.0);
    }

    #[test]
    fn test_equations_split_known_and_unknown() {
        let mut labels = Array2::zeros((7, 7));
        labels[(3, 3)] = 1;
        labels[(3, 4)] = 1;
        let equations = Equations::assemble(&[(3, 3), (3, 4)], labels.view(), 1);

        assert_eq!(equations.pixels, vec![(3, 3), (3, 4)]);
        assert_eq!(equations.matrix.diagonal(), vec![20.0, 20.0]);
        assert_eq!(equations.matrix.lower_bandwidth(), 1);

        let plane = Array2::from_elem((7, 7), 10.0);
        let rhs = equations.rhs(plane.view());
        // Each row sums to zero, so the known part equals minus the unknown part.
        assert_eq!(rhs, vec![120.0, 120.0]);
    }

    #[test]
    fn test_wide_regions_are_ordered_by_column() {
        let members = [(4, 1), (4, 2), (4, 3), (5, 1), (5, 2), (5, 3)];
        assert_eq!(
            solve_order(&members),
            vec![(4, 1), (5, 1), (4, 2), (5, 2), (4, 3), (5, 3)]
        );
    }
}
