//! Least-squares polynomial regression.
//!
//! Fits $y \approx \sum_j c_j t^j$ by solving the normal equations with an
//! LU decomposition via `faer`. Sample positions are mapped affinely onto
//! $[-1, 1]$ before the Vandermonde moments are accumulated, which keeps the
//! system well conditioned at the wavelength magnitudes (hundreds of nm)
//! this crate works with.

use faer::linalg::solvers::SpSolver;
use thiserror::Error;

/// Errors from polynomial fitting.
#[derive(Debug, Error)]
pub enum PolyfitError {
    #[error(
        "Polynomial degree {degree} needs at least {required} distinct sample positions, \
         found {found}"
    )]
    DegreeTooHigh {
        degree: usize,
        required: usize,
        found: usize,
    },
}

/// A fitted polynomial over a scaled position axis.
///
/// Coefficients are stored in ascending powers of the scaled variable;
/// [`Polynomial::evaluate`] applies the same scaling to queries, so callers
/// work in the original units throughout.
#[derive(Debug, Clone)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    x_min: f64,
    x_max: f64,
}

/// Fit a polynomial of the given degree through `(x, y)` samples.
pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial, PolyfitError> {
    assert_eq!(x.len(), y.len(), "One y value per x position is required");

    let required = degree + 1;
    let found = count_distinct(x);
    if found < required {
        return Err(PolyfitError::DegreeTooHigh {
            degree,
            required,
            found,
        });
    }

    let x_min = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    // Moment sums S_m = sum t^m and right-hand side b_j = sum y t^j over
    // the scaled positions t.
    let order = degree + 1;
    let mut moments = vec![0.0; 2 * degree + 1];
    let mut rhs = vec![0.0; order];
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let t = scale(xi, x_min, x_max);
        let mut power = 1.0;
        for (m, moment) in moments.iter_mut().enumerate() {
            *moment += power;
            if m < order {
                rhs[m] += yi * power;
            }
            power *= t;
        }
    }

    let normal = faer::Mat::<f64>::from_fn(order, order, |i, j| moments[i + j]);
    let b = faer::Col::<f64>::from_fn(order, |i| rhs[i]);
    let lu = normal.partial_piv_lu();
    let solution = lu.solve(&b);
    let coefficients: Vec<f64> = (0..order).map(|i| solution[i]).collect();

    Ok(Polynomial {
        coefficients,
        x_min,
        x_max,
    })
}

impl Polynomial {
    /// Evaluate the polynomial at a position in original units.
    pub fn evaluate(&self, x: f64) -> f64 {
        let t = scale(x, self.x_min, self.x_max);
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    /// Evaluate at every position in `xs`.
    pub fn sample(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Degree of the fitted polynomial.
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }
}

/// Map `x` from `[x_min, x_max]` onto `[-1, 1]`. A zero-width span maps
/// everything to 0, which only degree-0 fits can reach.
fn scale(x: f64, x_min: f64, x_max: f64) -> f64 {
    let span = x_max - x_min;
    if span == 0.0 {
        return 0.0;
    }
    2.0 * (x - x_min) / span - 1.0
}

fn count_distinct(x: &[f64]) -> usize {
    let mut distinct = 0;
    for (i, xi) in x.iter().enumerate() {
        if x[..i].iter().all(|xj| xj != xi) {
            distinct += 1;
        }
    }
    distinct
}
