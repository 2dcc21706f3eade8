use num::complex::Complex;

pub type C<T> = Complex<T>;

pub const ORIGIN: C<f64> = Complex::new(0.0, 0.0);

pub fn c(re: f64, im: f64) -> C<f64> {
    Complex::new(re, im)
}
