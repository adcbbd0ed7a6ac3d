/// Square matrix in compressed sparse row layout.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CsrMatrix {
    size: usize,
    offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    pub(crate) fn builder(size: usize) -> CsrBuilder {
        CsrBuilder {
            matrix: Self {
                size,
                offsets: vec![0],
                columns: Vec::new(),
                values: Vec::new(),
            },
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[row]..self.offsets[row + 1];
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub(crate) fn multiply(&self, vector: &[f64], out: &mut [f64]) {
        for (row, target) in out.iter_mut().enumerate() {
            *target = self
                .row(row)
                .map(|(column, value)| value * vector[column])
                .sum();
        }
    }

    pub(crate) fn diagonal(&self) -> Vec<f64> {
        (0..self.size)
            .map(|row| {
                self.row(row)
                    .filter(|(column, _)| *column == row)
                    .map(|(_, value)| value)
                    .sum()
            })
            .collect()
    }

    /// Largest distance below the diagonal of any stored entry.
    pub(crate) fn lower_bandwidth(&self) -> usize {
        (0..self.size)
            .flat_map(|row| {
                self.row(row)
                    .map(move |(column, _)| row.saturating_sub(column))
            })
            .max()
            .unwrap_or(0)
    }
}

/// Row by row construction of a [`CsrMatrix`].
#[derive(Debug)]
pub(crate) struct CsrBuilder {
    matrix: CsrMatrix,
}

impl CsrBuilder {
    pub(crate) fn push(&mut self, column: usize, value: f64) {
        self.matrix.columns.push(column);
        self.matrix.values.push(value);
    }

    pub(crate) fn finish_row(&mut self) {
        self.matrix.offsets.push(self.matrix.columns.len());
    }

    pub(crate) fn build(self) -> CsrMatrix {
        debug_assert_eq!(self.matrix.offsets.len(), self.matrix.size + 1);
        self.matrix
    }
}

#[cfg(test)]
pub(crate) fn from_dense(rows: &[&[f64]]) -> CsrMatrix {
    let mut builder = CsrMatrix::builder(rows.len());
    for row in rows {
        for (column, value) in row.iter().enumerate() {
            if *value != 0.0 {
                builder.push(column, *value);
            }
        }
        builder.finish_row();
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply() {
        let matrix = from_dense(&[&[2.0, 0.0, 1.0], &[0.0, 3.0, 0.0], &[1.0, 0.0, 4.0]]);
        let mut out = vec![0.0; 3];
        matrix.multiply(&[1.0, 2.0, 3.0], &mut out);
        assert_eq!(out, vec![5.0, 6.0, 13.0]);
    }

    #[test]
    fn test_diagonal_and_bandwidth() {
        let matrix = from_dense(&[
            &[4.0, 1.0, 0.0, 0.0],
            &[1.0, 4.0, 0.0, 0.0],
            &[0.0, 0.0, 5.0, 0.0],
            &[2.0, 0.0, 0.0, 6.0],
        ]);
        assert_eq!(matrix.diagonal(), vec![4.0, 4.0, 5.0, 6.0]);
        assert_eq!(matrix.lower_bandwidth(), 3);
        assert_eq!(matrix.size(), 4);
    }
}
