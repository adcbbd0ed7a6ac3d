use anyhow::{Context, Result, bail};
use biharmonic_inpaint::prelude::*;
use clap::{Parser, ValueEnum};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Remove a rectangle from an image and reconstruct it by biharmonic inpainting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to repair, it is never modified
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Rectangle to remove, corners in any order
    #[arg(short, long, value_name = "X0,Y0,X1,Y1", value_parser = parse_rect)]
    rect: Selection,

    /// Output file (default: INPUT_out.EXT next to the input)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Linear solver for the reconstruction
    #[arg(long, value_enum, default_value_t = SolverKind::Cholesky)]
    solver: SolverKind,

    /// Do not clip reconstructed values to the range of the known pixels
    #[arg(long)]
    no_clip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SolverKind {
    Cholesky,
    Cg,
}

impl From<SolverKind> for Solver {
    fn from(kind: SolverKind) -> Self {
        match kind {
            SolverKind::Cholesky => Solver::Cholesky,
            SolverKind::Cg => Solver::conjugate_gradient(),
        }
    }
}

fn parse_rect(value: &str) -> std::result::Result<Selection, String> {
    let corners = value
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{value}': {e}"))?;

    match corners.as_slice() {
        [x0, y0, x1, y1] => Ok(Selection::from_corners(*x0, *y0, *x1, *y1)),
        _ => Err(format!("expected X0,Y0,X1,Y1, got '{value}'")),
    }
}

/// `photo.png` becomes `photo_out.png`, so the upload itself stays untouched.
fn working_copy_path(input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Invalid input filename")?;
    let extension = input
        .extension()
        .and_then(|s| s.to_str())
        .context("Input has no file extension")?;
    let parent = input.parent().unwrap_or_else(|| Path::new("."));

    Ok(parent.join(format!("{stem}_out.{extension}")))
}

fn inpaint_dynamic(
    mut image: DynamicImage,
    engine: &Biharmonic,
    selection: Selection,
) -> Result<DynamicImage> {
    match &mut image {
        DynamicImage::ImageLuma8(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageLumaA8(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageRgb8(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageRgba8(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageLuma16(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageLumaA16(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageRgb16(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageRgba16(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageRgb32F(buffer) => buffer.inpaint_selection(engine, selection)?,
        DynamicImage::ImageRgba32F(buffer) => buffer.inpaint_selection(engine, selection)?,
        other => bail!("Unsupported colour type {:?}", other.color()),
    }
    Ok(image)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let output = match args.output {
        Some(output) => output,
        None => working_copy_path(&args.input)?,
    };
    let image = image::open(&args.input)
        .with_context(|| format!("Failed to open {}", args.input.display()))?;
    log::info!(
        "Input:  {} ({}x{}, {:?})",
        args.input.display(),
        image.width(),
        image.height(),
        image.color()
    );

    let engine = Biharmonic::new(InpaintOptions {
        solver: args.solver.into(),
        clip_to_known_range: !args.no_clip,
    });

    let start_time = Instant::now();
    let image = inpaint_dynamic(image, &engine, args.rect)?;
    log::info!("Inpainting finished in {:.2?}", start_time.elapsed());

    image
        .save(&output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    log::info!("Output: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_parse_rect_normalizes() {
        let selection = parse_rect("30, 20,10,5").unwrap();
        assert_eq!(selection, Selection::from_corners(10, 5, 30, 20));
    }

    #[test]
    fn test_parse_rect_rejects_bad_input() {
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,x,4").is_err());
    }

    #[test]
    fn test_working_copy_path() {
        let output = working_copy_path(Path::new("/tmp/photo.png")).unwrap();
        assert_eq!(output, Path::new("/tmp/photo_out.png"));
        assert!(working_copy_path(Path::new("/tmp/photo")).is_err());
    }

    #[test]
    fn test_inpaint_dynamic_keeps_colour_type() {
        let buffer = ImageBuffer::from_fn(24, 20, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 90]));
        let image = DynamicImage::ImageRgb8(buffer.clone());

        let output = inpaint_dynamic(
            image,
            &Biharmonic::default(),
            Selection::from_corners(6, 5, 14, 12),
        )
        .unwrap();

        let output = output.as_rgb8().unwrap();
        assert_eq!(output, &buffer);
    }
}
