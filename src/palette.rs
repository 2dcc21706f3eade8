use image::Rgb;

use crate::solver::IterationResult;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Integer triangle wave: 255 at 0, down to 1 at 255, back up to 255 at 511.
///
/// The float is truncated towards zero first; out of range values saturate
/// and NaN becomes 0, so every input yields a channel value.
pub fn sawtooth(v: f64) -> u8 {
    (((v as i32) & 0x1FE) - 0xFF).unsigned_abs() as u8
}

/// Renormalized iteration count of an escaped point.
pub fn smooth_iterations(result: &IterationResult) -> f64 {
    let ln2 = 2f64.ln();
    let zn = result.magnitude();
    let nu = (zn.ln() / ln2).ln() / ln2;
    result.iterations as f64 + 1.0 - nu
}

/// Smooth banded coloring. Points that never escaped are black; escaped
/// points cycle through red, green and blue at different rates.
pub fn color_for(result: &IterationResult, bailout: u32) -> Rgb<u8> {
    if !result.escaped(bailout) {
        return BLACK;
    }
    let smooth = smooth_iterations(result);
    Rgb([
        sawtooth(smooth),
        sawtooth(smooth / 31.0),
        sawtooth(smooth / 3.0),
    ])
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    SmoothBands,
    Greyscale,
}

impl Palette {
    pub fn color(&self, result: &IterationResult, bailout: u32) -> Rgb<u8> {
        match self {
            Self::SmoothBands => color_for(result, bailout),
            Self::Greyscale => greyscale(result, bailout),
        }
    }
}

impl std::str::FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smooth" | "bands" => Ok(Self::SmoothBands),
            "grey" | "gray" | "greyscale" => Ok(Self::Greyscale),
            other => Err(format!("unknown palette '{}'", other)),
        }
    }
}

fn greyscale(result: &IterationResult, bailout: u32) -> Rgb<u8> {
    if !result.escaped(bailout) {
        return BLACK;
    }
    let frac = (result.iterations as f64 / bailout as f64).clamp(0.0, 1.0);
    let v: u8 = 255 - (frac * 255.0).round() as u8;
    Rgb([v, v, v])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::solver::evaluate;

    #[test]
    fn test_sawtooth_range() {
        let mut v = -2000.0;
        while v < 2000.0 {
            // |even - 255| is always odd
            assert_eq!(sawtooth(v) % 2, 1);
            v += 0.37;
        }
        assert_eq!(sawtooth(0.0), 255);
        assert_eq!(sawtooth(1.9), 255);
        assert_eq!(sawtooth(2.0), 253);
        assert_eq!(sawtooth(255.0), 1);
        assert_eq!(sawtooth(256.0), 1);
        assert_eq!(sawtooth(511.0), 255);
        assert_eq!(sawtooth(-3.5), 253);
    }

    #[test]
    fn test_sawtooth_period() {
        for i in -1024..1024 {
            let v = i as f64 + 0.25;
            if v >= 0.0 {
                assert_eq!(sawtooth(v), sawtooth(v + 512.0), "{}", v);
            }
        }
        for i in 0..512 {
            assert_eq!(sawtooth(i as f64), sawtooth((i + 512 * 7) as f64));
        }
    }

    #[test]
    fn test_sawtooth_non_finite() {
        assert_eq!(sawtooth(f64::NEG_INFINITY), 255);
        assert_eq!(sawtooth(f64::INFINITY), 255);
        assert_eq!(sawtooth(f64::NAN), 255);
    }

    #[test]
    fn test_black_when_not_escaped() {
        for bailout in [1, 5, 100, 1000] {
            let r = evaluate(0.0, 0.0, bailout);
            assert_eq!(color_for(&r, bailout), BLACK);
            assert_eq!(Palette::Greyscale.color(&r, bailout), BLACK);
        }
        let r = evaluate(-0.1, 0.1, 50);
        assert_eq!(r.iterations, 50);
        assert_eq!(color_for(&r, 50), BLACK);
    }

    #[test]
    fn test_escape_on_radius() {
        let r = evaluate(1.0, 0.0, 100);
        assert_eq!(smooth_iterations(&r), 2.0);
        assert_eq!(color_for(&r, 100), Rgb([253, 255, 255]));
    }

    #[test]
    fn test_color_is_deterministic() {
        let r = evaluate(0.5, 0.5, 500);
        assert!(r.escaped(500));
        assert_eq!(color_for(&r, 500), color_for(&r, 500));
        let smooth = smooth_iterations(&r);
        assert_eq!(
            color_for(&r, 500),
            Rgb([
                sawtooth(smooth),
                sawtooth(smooth / 31.0),
                sawtooth(smooth / 3.0)
            ])
        );
    }

    #[test]
    fn test_greyscale_fades_with_iterations() {
        let at = |iterations| IterationResult {
            iterations,
            re_squared: 4.0,
            im_squared: 4.0,
        };
        assert_eq!(Palette::Greyscale.color(&at(0), 100), Rgb([255, 255, 255]));
        assert_eq!(Palette::Greyscale.color(&at(50), 100), Rgb([127, 127, 127]));
        assert_eq!(Palette::Greyscale.color(&at(99), 100), Rgb([3, 3, 3]));
    }

    #[test]
    fn test_parse_palette() {
        assert_eq!("smooth".parse::<Palette>(), Ok(Palette::SmoothBands));
        assert_eq!("grey".parse::<Palette>(), Ok(Palette::Greyscale));
        assert!("plaid".parse::<Palette>().is_err());
    }
}
