//! Radial basis function interpolation over composition space.
//!
//! A scattered-data interpolant
//! $s(x) = \sum_i w_i \, \phi(\lVert x - x_i \rVert)$ is fitted through the
//! measured combinations by solving the collocation system
//! $\mathbf{A}\mathbf{w} = \mathbf{y}$ with $A_{ij} = \phi(r_{ij})$. The
//! centre set is the same at every wavelength, so the matrix is assembled and
//! LU-factorised once; each wavelength then costs only a forward and back
//! substitution.
//!
//! Kernel definitions and the bounding-box default for the shape parameter
//! $\varepsilon$ follow the classical multiquadric family.
//!
//! # References
//! - Hardy, R. L., "Multiquadric equations of topography and other irregular
//!   surfaces", J. Geophys. Res. 76 (1971).

use faer::linalg::solvers::{PartialPivLu, SpSolver};
use serde::Deserialize;
use thiserror::Error;

use crate::types::Composition;

/// Errors raised while fitting the interpolation system.
#[derive(Error, Debug)]
pub enum RbfError {
    /// Fewer distinct sample compositions than an interpolant over the
    /// composition space can be anchored by.
    #[error(
        "degenerate fit: {distinct} distinct sample compositions, but {required} are required \
         for {dimension} constituents"
    )]
    DegenerateFit {
        distinct: usize,
        required: usize,
        dimension: usize,
    },

    /// The collocation matrix has no unique solution.
    #[error("singular collocation system: sample compositions do not determine the interpolant")]
    SingularSystem,
}

/// Radial kernel $\phi(r)$ of the interpolant.
///
/// The first three kernels scale distances by the shape parameter
/// $\varepsilon$; the polyharmonic kernels ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RbfKernel {
    /// $\sqrt{(r/\varepsilon)^2 + 1}$
    Multiquadric,
    /// $1 / \sqrt{(r/\varepsilon)^2 + 1}$
    #[serde(alias = "inverse")]
    InverseMultiquadric,
    /// $e^{-(r/\varepsilon)^2}$
    Gaussian,
    /// $r$
    Linear,
    /// $r^3$
    Cubic,
    /// $r^5$
    Quintic,
    /// $r^2 \ln r$, taken as $0$ at $r = 0$
    ThinPlate,
}

impl RbfKernel {
    /// Evaluate $\phi(r)$ for the given shape parameter.
    pub fn eval(&self, r: f64, epsilon: f64) -> f64 {
        match self {
            RbfKernel::Multiquadric => ((r / epsilon).powi(2) + 1.0).sqrt(),
            RbfKernel::InverseMultiquadric => 1.0 / ((r / epsilon).powi(2) + 1.0).sqrt(),
            RbfKernel::Gaussian => (-(r / epsilon).powi(2)).exp(),
            RbfKernel::Linear => r,
            RbfKernel::Cubic => r.powi(3),
            RbfKernel::Quintic => r.powi(5),
            RbfKernel::ThinPlate => {
                if r == 0.0 {
                    0.0
                } else {
                    r * r * r.ln()
                }
            }
        }
    }

    /// Whether the kernel is scaled by the shape parameter.
    pub fn uses_epsilon(&self) -> bool {
        matches!(
            self,
            RbfKernel::Multiquadric | RbfKernel::InverseMultiquadric | RbfKernel::Gaussian
        )
    }
}

impl Default for RbfKernel {
    fn default() -> Self {
        RbfKernel::InverseMultiquadric
    }
}

impl std::fmt::Display for RbfKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RbfKernel::Multiquadric => "multiquadric",
            RbfKernel::InverseMultiquadric => "inverse-multiquadric",
            RbfKernel::Gaussian => "gaussian",
            RbfKernel::Linear => "linear",
            RbfKernel::Cubic => "cubic",
            RbfKernel::Quintic => "quintic",
            RbfKernel::ThinPlate => "thin-plate",
        };
        write!(f, "{name}")
    }
}

/// Default shape parameter: an approximate mean node spacing.
///
/// With $N$ points whose bounding box has nonzero edge lengths
/// $e_1, \dots, e_k$, the default is $(\prod_j e_j / N)^{1/k}$. Edges of
/// zero length (dimensions in which all samples agree) do not contribute.
pub fn default_epsilon(points: &[Composition]) -> f64 {
    let dimension = points.first().map_or(0, Composition::dimension);
    let n = points.len();
    let mut edges = Vec::with_capacity(dimension);
    for d in 0..dimension {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for p in points {
            lo = lo.min(p.fractions()[d]);
            hi = hi.max(p.fractions()[d]);
        }
        let edge = hi - lo;
        if edge > 0.0 {
            edges.push(edge);
        }
    }
    if edges.is_empty() {
        return 1.0;
    }
    let product: f64 = edges.iter().product();
    (product / n as f64).powf(1.0 / edges.len() as f64)
}

/// The factorised collocation system for one fixed set of sample
/// compositions.
///
/// Fitting assembles the kernel matrix, checks that enough distinct centres
/// anchor it, and LU-factorises it with partial pivoting. Weight vectors for
/// any number of right-hand sides are then obtained without refactorising.
#[derive(Debug)]
pub struct RbfSystem {
    centres: Vec<Composition>,
    kernel: RbfKernel,
    epsilon: f64,
    lu: PartialPivLu<f64>,
}

impl RbfSystem {
    /// Assemble and factorise the kernel matrix over the given centres.
    ///
    /// `epsilon` falls back to [`default_epsilon`] when absent. `smoothing`
    /// is subtracted from the matrix diagonal; zero keeps the interpolant
    /// exact at the centres.
    pub fn fit(
        centres: Vec<Composition>,
        kernel: RbfKernel,
        epsilon: Option<f64>,
        smoothing: f64,
    ) -> Result<Self, RbfError> {
        let n = centres.len();
        let dimension = centres.first().map_or(0, Composition::dimension);
        let required = dimension + 1;
        let distinct = count_distinct(&centres);
        if distinct < required {
            return Err(RbfError::DegenerateFit {
                distinct,
                required,
                dimension,
            });
        }

        let epsilon = match epsilon {
            Some(e) => e,
            None => default_epsilon(&centres),
        };

        let matrix = faer::Mat::<f64>::from_fn(n, n, |i, j| {
            let phi = kernel.eval(centres[i].distance(&centres[j]), epsilon);
            if i == j {
                phi - smoothing
            } else {
                phi
            }
        });
        let lu = matrix.partial_piv_lu();

        // Solve against a generic right-hand side: a zero pivot surfaces as
        // a non-finite solution component.
        let trial = faer::Col::<f64>::from_fn(n, |_| 1.0);
        let sol = lu.solve(&trial);
        if (0..n).any(|i| !sol[i].is_finite()) {
            return Err(RbfError::SingularSystem);
        }

        Ok(Self {
            centres,
            kernel,
            epsilon,
            lu,
        })
    }

    /// Solve for the weights that reproduce `values` at the centres.
    pub fn weights_for(&self, values: &[f64]) -> Vec<f64> {
        assert_eq!(
            values.len(),
            self.centres.len(),
            "One value per centre is required"
        );
        let rhs = faer::Col::<f64>::from_fn(values.len(), |i| values[i]);
        let sol = self.lu.solve(&rhs);
        (0..values.len()).map(|i| sol[i]).collect()
    }

    /// Kernel evaluations of the query against every centre.
    ///
    /// The interpolant value is the dot product of this basis vector with a
    /// weight vector; computing the basis once serves all weight vectors
    /// that share the centres.
    pub fn basis(&self, query: &Composition) -> Vec<f64> {
        self.centres
            .iter()
            .map(|c| self.kernel.eval(query.distance(c), self.epsilon))
            .collect()
    }

    /// Evaluate the interpolant defined by `weights` at a query composition.
    pub fn evaluate(&self, weights: &[f64], query: &Composition) -> f64 {
        debug_assert_eq!(weights.len(), self.centres.len());
        self.centres
            .iter()
            .zip(weights)
            .map(|(c, &w)| w * self.kernel.eval(query.distance(c), self.epsilon))
            .sum()
    }

    /// Number of centres in the system.
    pub fn len(&self) -> usize {
        self.centres.len()
    }

    /// Whether the system has no centres. Never true for a fitted system.
    pub fn is_empty(&self) -> bool {
        self.centres.is_empty()
    }

    /// The shape parameter in effect (explicit or derived).
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The kernel in effect.
    pub fn kernel(&self) -> RbfKernel {
        self.kernel
    }

    /// The sample compositions anchoring the interpolant.
    pub fn centres(&self) -> &[Composition] {
        &self.centres
    }
}

fn count_distinct(points: &[Composition]) -> usize {
    let mut distinct = 0;
    for (i, p) in points.iter().enumerate() {
        if points[..i].iter().all(|q| q != p) {
            distinct += 1;
        }
    }
    distinct
}
