#![doc = include_str!("../README.md")]

mod biharmonic;
mod error;
pub mod prelude;
mod sample;
mod selection;

pub use biharmonic::{
    Biharmonic, Diagnostic, InpaintOptions, Solver, SolverFailure, biharmonic_inpaint, reconstruct,
};
pub use error::{Error, InvalidMask, Result};
pub use sample::Sample;
pub use selection::Selection;

#[cfg(feature = "image")]
use std::ops::Deref;

#[cfg(feature = "image")]
use glam::USizeVec2;
#[cfg(feature = "image")]
use image::{ImageBuffer, Luma, Pixel, Primitive};
#[cfg(feature = "image")]
use ndarray::{Array2, Array3, ArrayView2};

#[cfg(feature = "image")]
/// Inpaint implementations for the `Image` crate.
pub trait Inpaint {
    /// Reconstruct the pixels marked by nonzero samples in `mask`.
    fn biharmonic_inpaint<MaskPixel, MaskContainer>(
        &mut self,
        mask: &ImageBuffer<Luma<MaskPixel>, MaskContainer>,
    ) -> Result<()>
    where
        MaskPixel: Primitive + 'static,
        MaskContainer: Deref<Target = [MaskPixel]>,
    {
        self.biharmonic_inpaint_with(&Biharmonic::default(), mask)
    }

    /// Same as [`Inpaint::biharmonic_inpaint`] with a configured engine.
    fn biharmonic_inpaint_with<MaskPixel, MaskContainer>(
        &mut self,
        engine: &Biharmonic,
        mask: &ImageBuffer<Luma<MaskPixel>, MaskContainer>,
    ) -> Result<()>
    where
        MaskPixel: Primitive + 'static,
        MaskContainer: Deref<Target = [MaskPixel]>;

    /// Reconstruct the pixels covered by a dragged rectangle.
    fn inpaint_selection(&mut self, engine: &Biharmonic, selection: Selection) -> Result<()>;
}

#[cfg(feature = "image")]
impl<ImagePixel, ImageContainer> Inpaint for ImageBuffer<ImagePixel, Vec<ImageContainer>>
where
    ImagePixel: Pixel<Subpixel = ImageContainer>,
    ImageContainer: Sample,
{
    fn biharmonic_inpaint_with<MaskPixel, MaskContainer>(
        &mut self,
        engine: &Biharmonic,
        mask: &ImageBuffer<Luma<MaskPixel>, MaskContainer>,
    ) -> Result<()>
    where
        MaskPixel: Primitive + 'static,
        MaskContainer: Deref<Target = [MaskPixel]>,
    {
        let resolution = self.dimensions();
        let resolution = USizeVec2::new(resolution.0 as usize, resolution.1 as usize);
        if mask.dimensions() != self.dimensions() {
            return Err(Error::ShapeMismatch {
                image: (resolution.y, resolution.x),
                mask: (mask.height() as usize, mask.width() as usize),
            });
        }

        let mask: Array2<bool> = Array2::from_shape_vec(
            (resolution.y, resolution.x),
            mask.as_raw()
                .iter()
                .take(resolution.x * resolution.y)
                .map(|value| *value != MaskPixel::DEFAULT_MIN_VALUE)
                .collect(),
        )?;

        inpaint_buffer(self, engine, mask.view())
    }

    fn inpaint_selection(&mut self, engine: &Biharmonic, selection: Selection) -> Result<()> {
        let resolution = self.dimensions();
        let resolution = USizeVec2::new(resolution.0 as usize, resolution.1 as usize);
        let mask = selection.to_mask(resolution);
        inpaint_buffer(self, engine, mask.view())
    }
}

#[cfg(feature = "image")]
fn inpaint_buffer<ImagePixel, ImageContainer>(
    image: &mut ImageBuffer<ImagePixel, Vec<ImageContainer>>,
    engine: &Biharmonic,
    mask: ArrayView2<'_, bool>,
) -> Result<()>
where
    ImagePixel: Pixel<Subpixel = ImageContainer>,
    ImageContainer: Sample,
{
    let (width, height) = image.dimensions();
    let mut process_image: Array3<ImageContainer> = Array3::from_shape_vec(
        (
            height as usize,
            width as usize,
            ImagePixel::CHANNEL_COUNT as usize,
        ),
        image.as_raw().to_vec(),
    )?;

    engine.inpaint(&mut process_image, mask)?;

    for (target, value) in image.iter_mut().zip(process_image.iter()) {
        *target = *value;
    }
    Ok(())
}

#[cfg(feature = "python-bindings")]
#[pyo3::pymodule(name = "biharmonic_inpaint")]
mod python {
    use crate::error::Result;
    use numpy::IntoPyArray;
    use numpy::{PyArray3, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::Python;
    use pyo3::prelude::*;

    fn biharmonic_inpaint_inner_py<'py, T>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, T>,
        mask: PyReadonlyArray2<'py, T>,
    ) -> Result<Bound<'py, PyArray3<T>>>
    where
        T: numpy::Element + crate::Sample + PartialOrd + num_traits::Zero,
    {
        let mut original_image = image.as_array().to_owned();
        let mask_image = mask.as_array().mapv(|value| value > T::zero());

        crate::biharmonic_inpaint(&mut original_image, mask_image.view())?;

        Ok(original_image.into_pyarray(py))
    }

    #[pyfunction]
    #[pyo3(name = "biharmonic_inpaint")]
    fn biharmonic_inpaint_py<'py>(
        py: Python<'py>,
        image: PyReadonlyArray3<'py, f32>,
        mask: PyReadonlyArray2<'py, f32>,
    ) -> Result<Bound<'py, PyArray3<f32>>> {
        biharmonic_inpaint_inner_py::<f32>(py, image, mask)
    }
}
