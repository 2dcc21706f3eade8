use crate::complex::*;
use crate::errors::*;
use error_chain::bail;

/// The view to render: which point sits in the middle of the image, how wide
/// the image is on the real axis and how many iterations to try per point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderParameters {
    pub center: C<f64>,
    pub width: f64,
    pub bailout: u32,
}

impl RenderParameters {
    pub const INITIAL: RenderParameters = RenderParameters {
        center: ORIGIN,
        width: 4.0,
        bailout: 100,
    };

    pub fn new(center: C<f64>, width: f64, bailout: u32) -> Result<Self> {
        if !(width.is_finite() && width > 0.0) {
            bail!(ErrorKind::InvalidParameters(format!(
                "width must be a positive number, got {}",
                width
            )));
        }
        if bailout < 1 {
            bail!(ErrorKind::InvalidParameters(
                "bailout must be at least 1".to_string()
            ));
        }
        if !(center.re.is_finite() && center.im.is_finite()) {
            bail!(ErrorKind::InvalidParameters(format!(
                "center must be finite, got {}",
                center
            )));
        }
        Ok(Self {
            center,
            width,
            bailout,
        })
    }

    /// Same bailout, new center, width multiplied by `factor`.
    pub fn zoomed(&self, center: C<f64>, factor: f64) -> Self {
        Self {
            center,
            width: self.width * factor,
            bailout: self.bailout,
        }
    }
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Maps pixel coordinates of a `width` x `height` image onto the complex
/// plane. Pixels are square; the real extent is fixed by the parameters and
/// the imaginary extent follows from the aspect ratio. The imaginary part
/// grows downwards, like pixel rows.
#[derive(Copy, Clone, Debug)]
pub struct Plane {
    top_left: C<f64>,
    delta: f64,
    width: u32,
    height: u32,
}

impl Plane {
    pub fn new(params: &RenderParameters, width: u32, height: u32) -> Self {
        let delta = params.width / width as f64;
        let world_height = height as f64 * delta;
        let top_left = c(
            params.center.re - params.width / 2.0,
            params.center.im - world_height / 2.0,
        );
        Self {
            top_left,
            delta,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn top_left(&self) -> C<f64> {
        self.top_left
    }

    pub fn pixel_to_world(&self, px: u32, py: u32) -> C<f64> {
        c(
            self.top_left.re + self.delta * px as f64,
            self.top_left.im + self.delta * py as f64,
        )
    }

    /// Side of the smallest power-of-two square covering the image, or
    /// `None` if that side does not fit in a `u32`.
    pub fn initial_scale(&self) -> Option<u32> {
        self.width.max(self.height).max(1).checked_next_power_of_two()
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width and height of the `scale` sized block at (x, y) once clipped to
    /// the image.
    pub fn clip(&self, x: u32, y: u32, scale: u32) -> (u32, u32) {
        (
            scale.min(self.width.saturating_sub(x)),
            scale.min(self.height.saturating_sub(y)),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_initial_parameters_map_square_image() {
        let plane = Plane::new(&RenderParameters::INITIAL, 4, 4);
        assert_eq!(plane.delta(), 1.0);
        assert_eq!(plane.top_left(), c(-2.0, -2.0));
        assert_eq!(plane.pixel_to_world(2, 2), c(0.0, 0.0));
        assert_eq!(plane.pixel_to_world(3, 0), c(1.0, -2.0));
    }

    #[test]
    fn test_world_height_follows_aspect_ratio() {
        let params = RenderParameters::new(c(-0.5, 0.25), 3.0, 50).unwrap();
        let plane = Plane::new(&params, 300, 100);
        assert!((plane.delta() - 0.01).abs() < 1e-12);
        let tl = plane.top_left();
        assert!((tl.re - -2.0).abs() < 1e-12);
        assert!((tl.im - -0.25).abs() < 1e-12);
    }

    #[test]
    fn test_initial_scale() {
        assert_eq!(Plane::new(&RenderParameters::INITIAL, 1, 1).initial_scale(), Some(1));
        assert_eq!(Plane::new(&RenderParameters::INITIAL, 4, 4).initial_scale(), Some(4));
        assert_eq!(Plane::new(&RenderParameters::INITIAL, 5, 3).initial_scale(), Some(8));
        assert_eq!(Plane::new(&RenderParameters::INITIAL, 600, 1024).initial_scale(), Some(1024));
        assert_eq!(Plane::new(&RenderParameters::INITIAL, 1025, 2).initial_scale(), Some(2048));
        let side = 1u32 << 31;
        assert_eq!(Plane::new(&RenderParameters::INITIAL, side, 1).initial_scale(), Some(side));
        assert_eq!(Plane::new(&RenderParameters::INITIAL, side + 1, 1).initial_scale(), None);
        assert_eq!(Plane::new(&RenderParameters::INITIAL, 3, u32::MAX).initial_scale(), None);
    }

    #[test]
    fn test_clip() {
        let plane = Plane::new(&RenderParameters::INITIAL, 5, 3);
        assert_eq!(plane.clip(0, 0, 8), (5, 3));
        assert_eq!(plane.clip(4, 2, 4), (1, 1));
        assert_eq!(plane.clip(2, 0, 2), (2, 2));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(RenderParameters::new(ORIGIN, 0.0, 100).is_err());
        assert!(RenderParameters::new(ORIGIN, -1.0, 100).is_err());
        assert!(RenderParameters::new(ORIGIN, f64::NAN, 100).is_err());
        assert!(RenderParameters::new(ORIGIN, 4.0, 0).is_err());
        assert!(RenderParameters::new(c(f64::INFINITY, 0.0), 4.0, 10).is_err());
        assert!(RenderParameters::new(ORIGIN, 4.0, 1).is_ok());
    }

    #[test]
    fn test_zoomed_keeps_bailout() {
        let zoomed = RenderParameters::INITIAL.zoomed(c(1.0, 1.0), 0.5);
        assert_eq!(zoomed.width, 2.0);
        assert_eq!(zoomed.bailout, 100);
        assert_eq!(zoomed.center, c(1.0, 1.0));
    }
}
