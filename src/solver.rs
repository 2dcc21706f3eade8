/// Outcome of iterating a single point: how many steps it survived and the
/// squared components of the last orbit value, which smooth coloring needs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IterationResult {
    pub iterations: u32,
    pub re_squared: f64,
    pub im_squared: f64,
}

impl IterationResult {
    pub fn escaped(&self, bailout: u32) -> bool {
        self.iterations < bailout
    }

    pub fn magnitude(&self) -> f64 {
        (self.re_squared + self.im_squared).sqrt()
    }
}

/// Escape-time iteration of z <- z^2 + c starting from z = c, stopping at
/// `bailout` iterations or once |z|^2 >= 4.
pub fn evaluate(cx: f64, cy: f64, bailout: u32) -> IterationResult {
    let mut iterations = 0;
    let mut zx = cx;
    let mut zy = cy;
    let mut zx2 = zx * zx;
    let mut zy2 = zy * zy;
    while iterations < bailout && zx2 + zy2 < 4.0 {
        zy = 2.0 * zx * zy + cy;
        zx = zx2 - zy2 + cx;
        iterations += 1;
        zx2 = zx * zx;
        zy2 = zy * zy;
    }
    IterationResult {
        iterations,
        re_squared: zx2,
        im_squared: zy2,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_outside_radius_escapes_immediately() {
        for &(cx, cy) in &[(2.0, 0.0), (0.0, -2.0), (1.5, 1.5), (-3.0, 0.5), (10.0, 10.0)] {
            let r = evaluate(cx, cy, 100);
            assert_eq!(r.iterations, 0, "({}, {})", cx, cy);
            assert_eq!(r.re_squared, cx * cx);
            assert_eq!(r.im_squared, cy * cy);
        }
    }

    #[test]
    fn test_origin_never_escapes() {
        for bailout in [1, 2, 17, 100, 5000] {
            let r = evaluate(0.0, 0.0, bailout);
            assert_eq!(r.iterations, bailout);
            assert_eq!(r.re_squared, 0.0);
            assert_eq!(r.im_squared, 0.0);
            assert!(!r.escaped(bailout));
        }
    }

    #[test]
    fn test_known_escape() {
        // 1 -> 2 -> 5
        let r = evaluate(1.0, 0.0, 100);
        assert_eq!(r.iterations, 1);
        assert_eq!(r.re_squared, 4.0);
        assert!(r.escaped(100));
        assert_eq!(r.magnitude(), 2.0);
    }

    #[test]
    fn test_bailout_is_monotonic() {
        let points = [
            (-0.75, 0.1),
            (0.3, 0.5),
            (-1.25, 0.0),
            (0.25, 0.0),
            (-0.1, 0.65),
            (0.0, 1.0),
        ];
        for &(cx, cy) in &points {
            let mut last = 0;
            for bailout in 1..300 {
                let r = evaluate(cx, cy, bailout);
                assert!(r.iterations >= last, "({}, {}) at {}", cx, cy, bailout);
                assert!(r.iterations <= bailout);
                last = r.iterations;
            }
        }
    }
}
