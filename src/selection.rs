use glam::{IVec2, USizeVec2};
use ndarray::{Array2, s};

/// Rectangle dragged over an image, in pixel coordinates.
///
/// Corners are stored normalized so that `origin <= end` on both axes. They
/// are signed because a pointer can be released outside the image; the
/// rectangle is clamped to the image when a mask is built. The `end` corner is
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    origin: IVec2,
    end: IVec2,
}

impl Selection {
    pub fn new(origin: IVec2, end: IVec2) -> Self {
        Self {
            origin: origin.min(end),
            end: origin.max(end),
        }
    }

    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::new(IVec2::new(x0, y0), IVec2::new(x1, y1))
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn end(&self) -> IVec2 {
        self.end
    }

    /// Clamped `(min, max)` corners for an image of `resolution` (width, height).
    pub fn bounds(&self, resolution: USizeVec2) -> (USizeVec2, USizeVec2) {
        let clamp = |corner: IVec2| {
            USizeVec2::new(
                (corner.x.max(0) as usize).min(resolution.x),
                (corner.y.max(0) as usize).min(resolution.y),
            )
        };
        (clamp(self.origin), clamp(self.end))
    }

    /// Whether the rectangle covers no pixel of an image of `resolution`.
    pub fn is_empty_within(&self, resolution: USizeVec2) -> bool {
        let (min, max) = self.bounds(resolution);
        min.x == max.x || min.y == max.y
    }

    /// Boolean mask of shape `(height, width)` with the rectangle set.
    pub fn to_mask(&self, resolution: USizeVec2) -> Array2<bool> {
        let (min, max) = self.bounds(resolution);
        let mut mask = Array2::from_elem((resolution.y, resolution.x), false);
        mask.slice_mut(s![min.y..max.y, min.x..max.x]).fill(true);
        mask
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_corners_are_normalized() {
        let selection = Selection::from_corners(8, 2, 3, 6);
        assert_eq!(selection.origin(), IVec2::new(3, 2));
        assert_eq!(selection.end(), IVec2::new(8, 6));
    }

    #[test]
    fn test_mask_marks_rectangle_with_exclusive_end() {
        let mask = Selection::from_corners(1, 2, 4, 3).to_mask(USizeVec2::new(6, 5));

        assert_eq!(mask.dim(), (5, 6));
        assert_eq!(mask.iter().filter(|masked| **masked).count(), 3);
        assert!(mask[(2, 1)]);
        assert!(mask[(2, 3)]);
        assert!(!mask[(2, 4)]);
        assert!(!mask[(3, 1)]);
    }

    #[rstest]
    #[case(Selection::from_corners(-5, -5, 2, 2), (USizeVec2::new(0, 0), USizeVec2::new(2, 2)))]
    #[case(Selection::from_corners(3, 3, 40, 50), (USizeVec2::new(3, 3), USizeVec2::new(10, 8)))]
    #[case(Selection::from_corners(20, 20, 30, 30), (USizeVec2::new(10, 8), USizeVec2::new(10, 8)))]
    fn test_bounds_are_clamped(
        #[case] selection: Selection,
        #[case] expected: (USizeVec2, USizeVec2),
    ) {
        assert_eq!(selection.bounds(USizeVec2::new(10, 8)), expected);
    }

    #[test]
    fn test_zero_area_selection_gives_empty_mask() {
        let resolution = USizeVec2::new(10, 10);
        let selection = Selection::from_corners(4, 4, 4, 9);

        assert!(selection.is_empty_within(resolution));
        assert!(selection.to_mask(resolution).iter().all(|masked| !masked));
    }
}
