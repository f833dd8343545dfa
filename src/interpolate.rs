//! Curve interpolation for display

use nalgebra::{DMatrix, DVector};

#[derive(Debug, thiserror::Error)]
pub enum InterpolationError {
    #[error("interpolation needs at least {expected} points, found {found}")]
    TooFewPoints { expected: usize, found: usize },
    #[error("abscissa and ordinate lengths differ: {0} != {1}")]
    LengthMismatch(usize, usize),
    #[error("abscissa must be strictly increasing")]
    NotIncreasing,
    #[error("spline system is singular")]
    Singular,
}
type Result<T> = std::result::Result<T, InterpolationError>;

/// Regular sampling of the interval `[lower,upper]` with `n` samples
///
/// Both ends are included
pub fn linspace(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![lower],
        _ => {
            let step = (upper - lower) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { upper } else { lower + step * i as f64 })
                .collect()
        }
    }
}

fn check(x: &[f64], y: &[f64], min_len: usize) -> Result<()> {
    if x.len() != y.len() {
        return Err(InterpolationError::LengthMismatch(x.len(), y.len()));
    }
    if x.len() < min_len {
        return Err(InterpolationError::TooFewPoints {
            expected: min_len,
            found: x.len(),
        });
    }
    if x.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(InterpolationError::NotIncreasing);
    }
    Ok(())
}

/// Second order polynomial through 3 points
#[derive(Debug, Clone, Copy)]
pub struct Quadratic {
    x: [f64; 3],
    y: [f64; 3],
}
impl Quadratic {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        check(x, y, 3)?;
        Ok(Self {
            x: [x[0], x[1], x[2]],
            y: [y[0], y[1], y[2]],
        })
    }
    /// Evaluates the Lagrange form of the polynomial
    pub fn eval(&self, t: f64) -> f64 {
        let [x0, x1, x2] = self.x;
        let [y0, y1, y2] = self.y;
        y0 * (t - x1) * (t - x2) / ((x0 - x1) * (x0 - x2))
            + y1 * (t - x0) * (t - x2) / ((x1 - x0) * (x1 - x2))
            + y2 * (t - x0) * (t - x1) / ((x2 - x0) * (x2 - x1))
    }
    /// Constant second derivative of the polynomial
    fn curvature(&self) -> f64 {
        let [x0, x1, x2] = self.x;
        let [y0, y1, y2] = self.y;
        2. * (y0 / ((x0 - x1) * (x0 - x2))
            + y1 / ((x1 - x0) * (x1 - x2))
            + y2 / ((x2 - x0) * (x2 - x1)))
    }
}

/// Cubic spline with not-a-knot end conditions
///
/// With 3 points the spline is the interpolating parabola and with 2 points
/// the straight line
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    // second derivatives at the knots
    m: Vec<f64>,
}
impl CubicSpline {
    pub fn not_a_knot(x: &[f64], y: &[f64]) -> Result<Self> {
        check(x, y, 2)?;
        let n = x.len();
        let m = match n {
            2 => vec![0.; 2],
            3 => vec![Quadratic::new(x, y)?.curvature(); 3],
            _ => {
                let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
                let mut a = DMatrix::<f64>::zeros(n, n);
                let mut b = DVector::<f64>::zeros(n);
                // continuity of the third derivative at the second knot
                a[(0, 0)] = h[1];
                a[(0, 1)] = -(h[0] + h[1]);
                a[(0, 2)] = h[0];
                for i in 1..n - 1 {
                    a[(i, i - 1)] = h[i - 1];
                    a[(i, i)] = 2. * (h[i - 1] + h[i]);
                    a[(i, i + 1)] = h[i];
                    b[i] = 6. * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
                }
                // and at the knot before last
                a[(n - 1, n - 3)] = h[n - 2];
                a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
                a[(n - 1, n - 1)] = h[n - 3];
                a.lu()
                    .solve(&b)
                    .ok_or(InterpolationError::Singular)?
                    .iter()
                    .copied()
                    .collect()
            }
        };
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }
    /// Evaluates the spline at `t`, the end polynomials extrapolate
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        let i = self
            .x
            .partition_point(|&xi| xi <= t)
            .saturating_sub(1)
            .min(n - 2);
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - t, t - x0);
        m0 * a.powi(3) / (6. * h)
            + m1 * b.powi(3) / (6. * h)
            + (y0 / h - m0 * h / 6.) * a
            + (y1 / h - m1 * h / 6.) * b
    }
    /// Samples the spline at `n` points regularly spaced between the first and last knots
    pub fn sample(&self, n: usize) -> Vec<(f64, f64)> {
        let (lower, upper) = (self.x[0], self.x[self.x.len() - 1]);
        linspace(lower, upper, n)
            .into_iter()
            .map(|t| (t, self.eval(t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_ends() {
        let x = linspace(0., 1., 5);
        assert_eq!(x, vec![0., 0.25, 0.5, 0.75, 1.]);
        assert_eq!(linspace(2., 3., 1), vec![2.]);
        assert!(linspace(2., 3., 0).is_empty());
    }

    #[test]
    fn spline_reproduces_cubics() {
        let f = |x: f64| x.powi(3) - 2. * x * x + 1.;
        let x: Vec<f64> = vec![0., 0.7, 1.5, 2., 3.2, 4.];
        let y: Vec<f64> = x.iter().map(|&x| f(x)).collect();
        let spline = CubicSpline::not_a_knot(&x, &y).unwrap();
        for t in linspace(0., 4., 33) {
            assert!((spline.eval(t) - f(t)).abs() < 1e-9, "at {t}");
        }
        for (xi, yi) in x.iter().zip(&y) {
            assert!((spline.eval(*xi) - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn spline_with_few_points() {
        let line = CubicSpline::not_a_knot(&[0., 2.], &[1., 5.]).unwrap();
        assert!((line.eval(0.5) - 2.).abs() < 1e-12);
        let parabola = CubicSpline::not_a_knot(&[0., 1., 2.], &[0., 1., 4.]).unwrap();
        assert!((parabola.eval(1.5) - 2.25).abs() < 1e-12);
        assert!((parabola.eval(0.5) - 0.25).abs() < 1e-12);
        assert_eq!(parabola.sample(3).len(), 3);
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            CubicSpline::not_a_knot(&[0.], &[1.]),
            Err(InterpolationError::TooFewPoints { .. })
        ));
        assert!(matches!(
            CubicSpline::not_a_knot(&[0., 1., 1., 2.], &[0., 1., 2., 3.]),
            Err(InterpolationError::NotIncreasing)
        ));
        assert!(matches!(
            Quadratic::new(&[0., 1., 2.], &[0., 1.]),
            Err(InterpolationError::LengthMismatch(3, 2))
        ));
    }

    #[test]
    fn quadratic() {
        let q = Quadratic::new(&[1., 2., 4.], &[1., 4., 16.]).unwrap();
        assert!((q.eval(3.) - 9.).abs() < 1e-12);
    }
}
