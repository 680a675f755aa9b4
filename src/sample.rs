//! Turning symbolic solutions into numbers.

use crate::{
    ops::{self, Context, EvaluationError},
    Expression, Parameter,
};
use nalgebra::DVector as Vector;
use serde::Serialize;

/// A closed interval discretized into evenly spaced points.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SampleDomain {
    low: f64,
    high: f64,
    samples: usize,
}

impl SampleDomain {
    pub const DEFAULT_RANGE: (f64, f64) = (-10.0, 10.0);
    pub const DEFAULT_SAMPLES: usize = 1000;

    pub fn new(
        low: f64,
        high: f64,
        samples: usize,
    ) -> Result<Self, DomainError> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(DomainError::InvalidRange { low, high });
        }
        if samples < 2 {
            return Err(DomainError::TooFewSamples { samples });
        }

        Ok(SampleDomain { low, high, samples })
    }

    pub fn low(&self) -> f64 { self.low }

    pub fn high(&self) -> f64 { self.high }

    pub fn samples(&self) -> usize { self.samples }

    /// The sample points, with both ends of the interval included.
    pub fn points(&self) -> Vector<f64> {
        let step = (self.high - self.low) / (self.samples - 1) as f64;

        Vector::from_fn(self.samples, |i, _| {
            if i == self.samples - 1 {
                self.high
            } else {
                self.low + step * i as f64
            }
        })
    }
}

impl Default for SampleDomain {
    fn default() -> Self {
        let (low, high) = SampleDomain::DEFAULT_RANGE;

        SampleDomain {
            low,
            high,
            samples: SampleDomain::DEFAULT_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("the range {low}..{high} must be finite with low < high")]
    InvalidRange { low: f64, high: f64 },
    #[error("at least 2 samples are needed, found {samples}")]
    TooFewSamples { samples: usize },
}

/// An [`Expression`] turned into a numeric function of one [`Parameter`].
#[derive(Debug)]
pub struct Lambda<'a, C> {
    expression: &'a Expression,
    parameter: &'a Parameter,
    ctx: &'a C,
}

impl<'a, C: Context> Lambda<'a, C> {
    pub fn new(
        expression: &'a Expression,
        parameter: &'a Parameter,
        ctx: &'a C,
    ) -> Self {
        Lambda {
            expression,
            parameter,
            ctx,
        }
    }

    /// Does the result actually vary with the parameter?
    pub fn is_constant(&self) -> bool {
        !self.expression.depends_on(self.parameter)
    }

    pub fn call(&self, value: f64) -> Result<f64, EvaluationError> {
        let parameter = self.parameter;

        ops::evaluate(
            self.expression,
            |p| if p == parameter { Some(value) } else { None },
            self.ctx,
        )
    }
}

/// How a solution branch was turned into numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sampling {
    /// Evaluated at every sample point.
    Varying,
    /// The branch doesn't depend on the independent variable, so its single
    /// value is repeated across the domain.
    Constant { value: f64 },
    /// The branch couldn't be evaluated (e.g. it references an unknown
    /// parameter), so it has no points.
    Unevaluable { reason: String },
}

/// Evaluate `branch` at each of the `points`.
///
/// Failures are contained to this branch. The returned values may contain
/// NaN or infinities where the branch has no real value.
pub fn sample_branch<C>(
    branch: &Expression,
    parameter: &Parameter,
    points: &Vector<f64>,
    ctx: &C,
) -> (Sampling, Vector<f64>)
where
    C: Context,
{
    let lambda = Lambda::new(branch, parameter, ctx);

    if lambda.is_constant() {
        return match ops::evaluate(branch, |_| None, ctx) {
            Ok(value) => (
                Sampling::Constant { value },
                Vector::from_element(points.len(), value),
            ),
            Err(e) => unevaluable(branch, e),
        };
    }

    let mut values = Vec::with_capacity(points.len());

    for &x in points.iter() {
        match lambda.call(x) {
            Ok(y) => values.push(y),
            Err(e) => return unevaluable(branch, e),
        }
    }

    (Sampling::Varying, Vector::from_vec(values))
}

fn unevaluable(
    branch: &Expression,
    error: EvaluationError,
) -> (Sampling, Vector<f64>) {
    tracing::warn!(%branch, %error, "unable to evaluate a solution branch");

    (
        Sampling::Unevaluable {
            reason: error.to_string(),
        },
        Vector::zeros(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Builtins;
    use approx::assert_relative_eq;

    #[test]
    fn points_are_evenly_spaced_and_include_both_ends() {
        let domain = SampleDomain::new(-1.0, 1.0, 5).unwrap();

        let got = domain.points();

        assert_eq!(got.as_slice(), &[-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn default_domain() {
        let domain = SampleDomain::default();
        let points = domain.points();

        assert_eq!(points.len(), 1000);
        assert_eq!(points[0], -10.0);
        assert_eq!(points[999], 10.0);
    }

    #[test]
    fn invalid_domains() {
        assert_eq!(
            SampleDomain::new(1.0, -1.0, 10),
            Err(DomainError::InvalidRange {
                low: 1.0,
                high: -1.0
            })
        );
        assert!(SampleDomain::new(0.0, f64::INFINITY, 10).is_err());
        assert!(SampleDomain::new(f64::NAN, 1.0, 10).is_err());
        assert_eq!(
            SampleDomain::new(0.0, 1.0, 1),
            Err(DomainError::TooFewSamples { samples: 1 })
        );
    }

    #[test]
    fn sample_a_varying_branch() {
        let branch: Expression = "x^2 + 1".parse().unwrap();
        let points = SampleDomain::new(0.0, 2.0, 3).unwrap().points();

        let (sampling, values) =
            sample_branch(&branch, &Parameter::x(), &points, &Builtins);

        assert_eq!(sampling, Sampling::Varying);
        assert_relative_eq!(values, Vector::from_vec(vec![1.0, 2.0, 5.0]));
    }

    #[test]
    fn constants_are_broadcast() {
        let branch = Expression::Constant(5.0);
        let points = SampleDomain::default().points();

        let (sampling, values) =
            sample_branch(&branch, &Parameter::x(), &points, &Builtins);

        assert_eq!(sampling, Sampling::Constant { value: 5.0 });
        assert_eq!(values.len(), points.len());
        assert!(values.iter().all(|&v| v == 5.0));
    }

    #[test]
    fn named_constants_count_as_constants() {
        let branch: Expression = "pi/2".parse().unwrap();
        let points = SampleDomain::default().points();

        let (sampling, _) =
            sample_branch(&branch, &Parameter::x(), &points, &Builtins);

        assert_eq!(
            sampling,
            Sampling::Constant {
                value: std::f64::consts::FRAC_PI_2
            }
        );
    }

    #[test]
    fn unknown_parameters_make_a_branch_unevaluable() {
        let branch: Expression = "x + a".parse().unwrap();
        let points = SampleDomain::default().points();

        let (sampling, values) =
            sample_branch(&branch, &Parameter::x(), &points, &Builtins);

        assert!(matches!(sampling, Sampling::Unevaluable { .. }));
        assert!(values.is_empty());
    }

    #[test]
    fn values_outside_the_real_domain_are_nan() {
        let branch: Expression = "sqrt(4 - x^2)".parse().unwrap();
        let points = SampleDomain::new(-3.0, 3.0, 7).unwrap().points();

        let (_, values) =
            sample_branch(&branch, &Parameter::x(), &points, &Builtins);

        assert!(values[0].is_nan());
        assert_relative_eq!(values[3], 2.0);
        assert!(values[6].is_nan());
    }
}
