use error_chain::bail;
use log::{error, info};

use crate::coord::RenderParameters;
use crate::errors::*;
use crate::painter::{Canvas, PixelBuffer};
use crate::session::{RenderSession, SessionConfig};

pub const ZOOM_IN: f64 = 0.333;
pub const ZOOM_OUT: f64 = 3.0;

/// Owns a canvas and the one session currently rendering onto it. Starting
/// a new view always stops and joins the previous session first, so two
/// sessions never paint on the same canvas.
pub struct Explorer<B: PixelBuffer> {
    canvas: Canvas<B>,
    config: SessionConfig,
    session: Option<RenderSession<B>>,
}

impl<B> Explorer<B>
where
    B: PixelBuffer + Send + Sync + 'static,
{
    pub fn new(canvas: Canvas<B>, config: SessionConfig) -> Self {
        Self {
            canvas,
            config,
            session: None,
        }
    }

    pub fn render(&mut self, params: RenderParameters) -> Result<&RenderSession<B>> {
        self.stop();
        let session = RenderSession::launch(params, self.canvas.clone(), self.config)?;
        Ok(self.session.insert(session))
    }

    /// Re-renders centered on the clicked pixel, zoomed in by `ZOOM_IN` or
    /// out by `ZOOM_OUT`.
    pub fn click(&mut self, px: u32, py: u32, zoom_out: bool) -> Result<&RenderSession<B>> {
        let params = match self.session {
            Some(ref session) => {
                let center = session.pixel_to_world(px, py);
                let factor = if zoom_out { ZOOM_OUT } else { ZOOM_IN };
                session.params().zoomed(center, factor)
            }
            None => bail!(ErrorKind::InvalidState(
                "nothing rendered yet, nowhere to zoom".to_string()
            )),
        };
        info!(
            "zooming {} at ({}, {}) to {}",
            if zoom_out { "out" } else { "in" },
            px,
            py,
            params.center
        );
        self.render(params)
    }

    /// Stops and joins the current session, if any. A session whose threads
    /// failed is logged and discarded.
    pub fn stop(&mut self) {
        if let Some(mut old) = self.session.take() {
            if let Err(e) = old.join() {
                error!("previous render did not shut down cleanly: {}", e);
            }
        }
    }

    /// Stops and joins the current session but keeps it around, so its
    /// final histogram and counters can still be read.
    pub fn finish(&mut self) -> Result<Option<&RenderSession<B>>> {
        match self.session {
            Some(ref mut session) => {
                session.join()?;
                Ok(Some(&*session))
            }
            None => Ok(None),
        }
    }

    pub fn session(&self) -> Option<&RenderSession<B>> {
        self.session.as_ref()
    }

    pub fn canvas(&self) -> &Canvas<B> {
        &self.canvas
    }
}
