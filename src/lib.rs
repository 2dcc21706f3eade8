//! Progressive Mandelbrot rendering.
//!
//! An image is rendered coarse to fine: one block covering the whole image
//! is evaluated at its top-left pixel and painted, then split into four
//! quadrants, and so on down to single pixels. Blocks whose origin escaped
//! quickly are refined first. Evaluation runs on a pool of calculator
//! threads; a single painter thread owns every write to the pixel buffer.
//!
//! ```no_run
//! use mandeltile::{render, RenderParameters, SessionConfig};
//!
//! let img = render(RenderParameters::INITIAL, 800, 600, SessionConfig::default()).unwrap();
//! img.save("mandelbrot.png").unwrap();
//! ```
#![allow(clippy::new_without_default)]

use image::RgbImage;

pub mod complex;
pub mod coord;
pub mod errors;
pub mod explorer;
pub mod histogram;
pub mod painter;
pub mod palette;
pub mod queue;
pub mod session;
pub mod solver;
pub mod threads;

pub use crate::coord::{Plane, RenderParameters};
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::explorer::Explorer;
pub use crate::histogram::Histogram;
pub use crate::painter::{Canvas, PixelBuffer};
pub use crate::palette::Palette;
pub use crate::session::{RenderSession, SessionConfig, SessionState};

/// Renders a whole image and blocks until every pixel is painted.
pub fn render(
    params: RenderParameters,
    width: u32,
    height: u32,
    config: SessionConfig,
) -> Result<RgbImage> {
    let canvas = Canvas::blank(width, height);
    let mut session = RenderSession::launch(params, canvas.clone(), config)?;
    let complete = session.wait(None);
    session.join()?;
    if !complete {
        error_chain::bail!(ErrorKind::InvalidState(format!(
            "render ended after {} of {} points with {} failed jobs",
            session.painted_points(),
            session.total_points(),
            session.faults()
        )));
    }
    drop(session);
    Ok(canvas.snapshot())
}
