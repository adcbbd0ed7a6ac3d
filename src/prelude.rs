//! Everything needed to inpaint an image in one import.

pub use crate::biharmonic::{
    Biharmonic, Diagnostic, InpaintOptions, Solver, biharmonic_inpaint, reconstruct,
};
pub use crate::error::{Error, InvalidMask, Result};
pub use crate::sample::Sample;
pub use crate::selection::Selection;

#[cfg(feature = "image")]
pub use crate::Inpaint;
