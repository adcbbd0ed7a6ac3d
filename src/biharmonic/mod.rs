//! Biharmonic inpainting.
//!
//! Masked pixels are replaced by the smoothest surface that agrees with the
//! known pixels around them: the squared discrete Laplacian is forced to zero
//! on every masked pixel while known pixels stay fixed. Each channel is solved
//! on its own; the linear systems only depend on the mask, so they are built
//! and factorized once per region and reused for all channels.

mod operator;
mod regions;
mod solver;
mod sparse;

pub use solver::{Solver, SolverFailure};

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::{Error, InvalidMask, Result};
use crate::sample::Sample;
use operator::Equations;
use regions::Regions;
use solver::Factorization;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InpaintOptions {
    pub solver: Solver,
    /// Clip reconstructed values to the range of the channel's known pixels
    /// before writing them back.
    pub clip_to_known_range: bool,
}

impl Default for InpaintOptions {
    fn default() -> Self {
        Self {
            solver: Solver::default(),
            clip_to_known_range: true,
        }
    }
}

/// Intermediate buffers handed to an observer during reconstruction.
#[derive(Debug, Clone, Copy)]
pub enum Diagnostic<'a> {
    /// Region of every pixel: `0` for known pixels, `n + 1` for region `n`.
    Regions {
        labels: ArrayView2<'a, usize>,
        count: usize,
    },
    /// Channel after reconstruction, before conversion to the sample type.
    Channel {
        channel: usize,
        plane: ArrayView2<'a, f64>,
    },
}

/// Reconstruction engine. Holds configuration only, no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Biharmonic {
    options: InpaintOptions,
}

struct PreparedRegion {
    equations: Equations,
    factorization: Factorization,
}

impl Biharmonic {
    pub fn new(options: InpaintOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &InpaintOptions {
        &self.options
    }

    /// Returns a reconstructed copy of `image`, leaving the input untouched.
    pub fn reconstruct<T: Sample>(
        &self,
        image: ArrayView3<'_, T>,
        mask: ArrayView2<'_, bool>,
    ) -> Result<Array3<T>> {
        let mut output = image.to_owned();
        self.inpaint(&mut output, mask)?;
        Ok(output)
    }

    /// Reconstructs the masked pixels of `image` in place.
    ///
    /// Only masked pixels are written, and only once every channel has been
    /// solved, so the image is unchanged when an error is returned.
    pub fn inpaint<T: Sample>(&self, image: &mut Array3<T>, mask: ArrayView2<'_, bool>) -> Result<()> {
        self.inpaint_observed(image, mask, &mut |_| {})
    }

    /// Same as [`Biharmonic::inpaint`], reporting intermediate buffers to
    /// `observer` on the calling thread.
    pub fn inpaint_observed<T: Sample>(
        &self,
        image: &mut Array3<T>,
        mask: ArrayView2<'_, bool>,
        observer: &mut dyn FnMut(Diagnostic<'_>),
    ) -> Result<()> {
        validate(image.dim(), mask)?;

        let regions = Regions::find(mask);
        log::debug!(
            "inpainting {} region(s) over {} channel(s) with {:?}",
            regions.len(),
            image.dim().2,
            self.options.solver
        );
        observer(Diagnostic::Regions {
            labels: regions.labels.view(),
            count: regions.len(),
        });

        let prepared = self.prepare(&regions)?;
        let planes = self.solve_channels(image.view(), mask, &prepared)?;

        for (channel, plane) in planes.iter().enumerate() {
            observer(Diagnostic::Channel {
                channel,
                plane: plane.view(),
            });
            let mut target = image.index_axis_mut(Axis(2), channel);
            for region in &prepared {
                for &pixel in &region.equations.pixels {
                    target[pixel] = T::from_f64(plane[pixel]);
                }
            }
        }
        Ok(())
    }

    fn prepare(&self, regions: &Regions) -> Result<Vec<PreparedRegion>> {
        let prepare_region = |(index, members): (usize, &Vec<(usize, usize)>)| -> Result<PreparedRegion> {
            let equations = Equations::assemble(members, regions.labels.view(), index + 1);
            log::trace!(
                "region {index}: {} unknown(s), bandwidth {}",
                equations.pixels.len(),
                equations.matrix.lower_bandwidth()
            );
            let factorization = Factorization::prepare(self.options.solver, &equations.matrix)
                .map_err(|source| Error::NumericalFailure {
                    region: index,
                    channel: None,
                    source,
                })?;
            Ok(PreparedRegion {
                equations,
                factorization,
            })
        };

        #[cfg(feature = "rayon")]
        let prepared = regions.members.par_iter().enumerate().map(prepare_region).collect();
        #[cfg(not(feature = "rayon"))]
        let prepared = regions.members.iter().enumerate().map(prepare_region).collect();
        prepared
    }

    fn solve_channels<T: Sample>(
        &self,
        image: ArrayView3<'_, T>,
        mask: ArrayView2<'_, bool>,
        prepared: &[PreparedRegion],
    ) -> Result<Vec<Array2<f64>>> {
        let channels = image.dim().2;
        let solve_channel = |channel: usize| -> Result<Array2<f64>> {
            let mut plane = image.index_axis(Axis(2), channel).mapv(|value| -> f64 { value.as_() });
            let limits = self
                .options
                .clip_to_known_range
                .then(|| known_range(plane.view(), mask));

            for (index, region) in prepared.iter().enumerate() {
                let rhs = region.equations.rhs(plane.view());
                let values = region
                    .factorization
                    .solve(&region.equations.matrix, &rhs)
                    .map_err(|source| Error::NumericalFailure {
                        region: index,
                        channel: Some(channel),
                        source,
                    })?;
                for (&pixel, value) in region.equations.pixels.iter().zip(values) {
                    plane[pixel] = match limits {
                        Some((low, high)) => value.max(low).min(high),
                        None => value,
                    };
                }
            }
            Ok(plane)
        };

        #[cfg(feature = "rayon")]
        let planes = (0..channels).into_par_iter().map(solve_channel).collect();
        #[cfg(not(feature = "rayon"))]
        let planes = (0..channels).map(solve_channel).collect();
        planes
    }
}

fn validate(dim: (usize, usize, usize), mask: ArrayView2<'_, bool>) -> Result<()> {
    let (height, width, channels) = dim;
    if height == 0 || width == 0 || channels == 0 {
        return Err(Error::NoData);
    }
    if mask.dim() != (height, width) {
        return Err(Error::ShapeMismatch {
            image: (height, width),
            mask: mask.dim(),
        });
    }

    let masked = mask.iter().filter(|masked| **masked).count();
    if masked == 0 {
        return Err(Error::InvalidMask(InvalidMask::Empty));
    }
    if masked == mask.len() {
        return Err(Error::InvalidMask(InvalidMask::Full));
    }
    Ok(())
}

/// Smallest and largest known value of a channel.
fn known_range(plane: ArrayView2<'_, f64>, mask: ArrayView2<'_, bool>) -> (f64, f64) {
    plane
        .iter()
        .zip(mask.iter())
        .filter(|(_, masked)| !**masked)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), (value, _)| {
            (low.min(*value), high.max(*value))
        })
}

/// Inpaints `image` in place with the default options.
///
/// `image` is laid out as `(height, width, channels)` and `mask` as
/// `(height, width)`, `true` marking the pixels to reconstruct.
pub fn biharmonic_inpaint<T: Sample>(image: &mut Array3<T>, mask: ArrayView2<'_, bool>) -> Result<()> {
    Biharmonic::default().inpaint(image, mask)
}

/// Returns a reconstructed copy of `image` using the default options.
pub fn reconstruct<T: Sample>(image: ArrayView3<'_, T>, mask: ArrayView2<'_, bool>) -> Result<Array3<T>> {
    Biharmonic::default().reconstruct(image, mask)
}
