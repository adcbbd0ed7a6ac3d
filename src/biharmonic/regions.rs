use ndarray::{Array2, ArrayView2};

/// Masked pixels grouped into independently solvable regions.
///
/// The mask is dilated by a 4-neighbour cross and the dilation is labelled
/// with 8-connectivity. Masked pixels whose stencils can overlap always end up
/// in the same region, so the regions' systems share no unknowns.
#[derive(Debug)]
pub(crate) struct Regions {
    /// `0` for known pixels, `n + 1` for pixels of region `n`.
    pub(crate) labels: Array2<usize>,
    /// Pixels of each region in scan order.
    pub(crate) members: Vec<Vec<(usize, usize)>>,
}

impl Regions {
    pub(crate) fn find(mask: ArrayView2<'_, bool>) -> Self {
        let (height, width) = mask.dim();
        let dilated = dilate(mask);

        let mut components = Array2::<usize>::zeros((height, width));
        let mut count = 0;
        let mut stack = Vec::new();
        for ((row, col), &inside) in dilated.indexed_iter() {
            if !inside || components[(row, col)] != 0 {
                continue;
            }
            count += 1;
            components[(row, col)] = count;
            stack.push((row, col));
            while let Some((r, c)) = stack.pop() {
                for neighbour in neighbourhood(r, c, height, width) {
                    if dilated[neighbour] && components[neighbour] == 0 {
                        components[neighbour] = count;
                        stack.push(neighbour);
                    }
                }
            }
        }

        // Every component of the dilation contains at least one masked pixel,
        // so labels stay dense after restricting to the mask.
        let mut labels = Array2::zeros((height, width));
        let mut members = vec![Vec::new(); count];
        for (pixel, &masked) in mask.indexed_iter() {
            if masked {
                let label = components[pixel];
                labels[pixel] = label;
                members[label - 1].push(pixel);
            }
        }

        Self { labels, members }
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }
}

fn dilate(mask: ArrayView2<'_, bool>) -> Array2<bool> {
    let (height, width) = mask.dim();
    let mut dilated = mask.to_owned();
    for ((row, col), &masked) in mask.indexed_iter() {
        if !masked {
            continue;
        }
        if row > 0 {
            dilated[(row - 1, col)] = true;
        }
        if row + 1 < height {
            dilated[(row + 1, col)] = true;
        }
        if col > 0 {
            dilated[(row, col - 1)] = true;
        }
        if col + 1 < width {
            dilated[(row, col + 1)] = true;
        }
    }
    dilated
}

/// 3x3 block around a pixel, cropped to the image.
fn neighbourhood(
    row: usize,
    col: usize,
    height: usize,
    width: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (row.saturating_sub(1)..(row + 2).min(height))
        .flat_map(move |r| (col.saturating_sub(1)..(col + 2).min(width)).map(move |c| (r, c)))
}

#[cfg(test)]
mod tests {
    use ndarray::s;
    use rstest::rstest;

    use super::*;

    fn mask_with(blocks: &[(usize, usize, usize, usize)]) -> Array2<bool> {
        let mut mask = Array2::from_elem((12, 12), false);
        for &(top, left, bottom, right) in blocks {
            mask.slice_mut(s![top..bottom, left..right]).fill(true);
        }
        mask
    }

    #[rstest]
    // Three known columns in between: stencils cannot meet.
    #[case(&[(2, 1, 5, 3), (2, 6, 5, 8)], 2)]
    // Two known columns in between: the cross dilation merges them.
    #[case(&[(2, 1, 5, 3), (2, 5, 5, 7)], 1)]
    // Diagonal neighbours two apart.
    #[case(&[(2, 2, 3, 3), (3, 4, 4, 5)], 1)]
    #[case(&[(0, 0, 2, 2), (9, 9, 12, 12), (0, 9, 2, 12)], 3)]
    fn test_region_count(#[case] blocks: &[(usize, usize, usize, usize)], #[case] expected: usize) {
        let regions = Regions::find(mask_with(blocks).view());
        assert_eq!(regions.len(), expected);
    }

    #[test]
    fn test_labels_cover_exactly_the_mask() {
        let mask = mask_with(&[(2, 1, 5, 3), (7, 7, 9, 11)]);
        let regions = Regions::find(mask.view());

        for (pixel, &masked) in mask.indexed_iter() {
            assert_eq!(regions.labels[pixel] != 0, masked);
        }
        let total: usize = regions.members.iter().map(Vec::len).sum();
        assert_eq!(total, 6 + 8);
        assert_eq!(regions.members[0].first(), Some(&(2, 1)));
    }
}
