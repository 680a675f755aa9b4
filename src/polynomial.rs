use crate::{
    ops::{self, Context},
    BinaryOperation, Expression, Parameter,
};

/// Powers above this are left for the other solving strategies, otherwise
/// expanding something like `(x + y)^100` blows up.
const MAX_DEGREE: usize = 32;

/// An expression rewritten as a polynomial in a single unknown.
///
/// `coefficients[n]` is the coefficient of `unknown^n`. Coefficients never
/// reference the unknown, and trailing zero coefficients are trimmed, so the
/// zero polynomial has no coefficients at all.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polynomial {
    coefficients: Vec<Expression>,
}

impl Polynomial {
    /// Try to read `expr` as a polynomial in `unknown`, returning `None` when
    /// the unknown appears somewhere a polynomial can't have it (inside a
    /// function call, in a denominator, etc.).
    pub(crate) fn from_expression<C>(
        expr: &Expression,
        unknown: &Parameter,
        ctx: &C,
    ) -> Option<Self>
    where
        C: Context,
    {
        if !expr.depends_on(unknown) {
            return Some(Polynomial::constant(expr.clone()).trimmed(ctx));
        }

        let poly = match expr {
            Expression::Parameter(_) => Polynomial {
                coefficients: vec![
                    Expression::Constant(0.0),
                    Expression::Constant(1.0),
                ],
            },
            Expression::Constant(_) => unreachable!(),
            Expression::Negate(inner) => {
                Polynomial::from_expression(inner, unknown, ctx)?.negated(ctx)
            },
            Expression::Binary { left, right, op } => match op {
                BinaryOperation::Plus => {
                    let left = Polynomial::from_expression(left, unknown, ctx)?;
                    let right =
                        Polynomial::from_expression(right, unknown, ctx)?;
                    left.add(&right, ctx)
                },
                BinaryOperation::Minus => {
                    let left = Polynomial::from_expression(left, unknown, ctx)?;
                    let right =
                        Polynomial::from_expression(right, unknown, ctx)?;
                    left.add(&right.negated(ctx), ctx)
                },
                BinaryOperation::Times => {
                    let left = Polynomial::from_expression(left, unknown, ctx)?;
                    let right =
                        Polynomial::from_expression(right, unknown, ctx)?;
                    left.mul(&right, ctx)?
                },
                BinaryOperation::Divide => {
                    if right.depends_on(unknown) {
                        return None;
                    }
                    Polynomial::from_expression(left, unknown, ctx)?
                        .divided_by(right, ctx)
                },
                BinaryOperation::Power => {
                    if right.depends_on(unknown) {
                        return None;
                    }
                    let exponent = natural_number(right, ctx)?;
                    Polynomial::from_expression(left, unknown, ctx)?
                        .pow(exponent, ctx)?
                },
            },
            Expression::FunctionCall { .. } => return None,
        };

        Some(poly.trimmed(ctx))
    }

    fn constant(value: Expression) -> Self {
        Polynomial {
            coefficients: vec![value],
        }
    }

    fn one() -> Self { Polynomial::constant(Expression::Constant(1.0)) }

    pub(crate) fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub(crate) fn coefficients(&self) -> &[Expression] { &self.coefficients }

    /// The coefficients as plain numbers, if none of them reference another
    /// parameter.
    pub(crate) fn numeric_coefficients(&self) -> Option<Vec<f64>> {
        self.coefficients.iter().map(Expression::as_constant).collect()
    }

    fn coefficient(&self, power: usize) -> Expression {
        self.coefficients
            .get(power)
            .cloned()
            .unwrap_or(Expression::Constant(0.0))
    }

    fn add<C: Context>(&self, other: &Polynomial, ctx: &C) -> Polynomial {
        let len = self.coefficients.len().max(other.coefficients.len());

        let coefficients = (0..len)
            .map(|power| {
                let sum = self.coefficient(power) + other.coefficient(power);
                ops::fold_constants(&sum, ctx)
            })
            .collect();

        Polynomial { coefficients }
    }

    fn negated<C: Context>(&self, ctx: &C) -> Polynomial {
        let coefficients = self
            .coefficients
            .iter()
            .map(|c| ops::fold_constants(&-c.clone(), ctx))
            .collect();

        Polynomial { coefficients }
    }

    fn mul<C: Context>(
        &self,
        other: &Polynomial,
        ctx: &C,
    ) -> Option<Polynomial> {
        if self.coefficients.is_empty() || other.coefficients.is_empty() {
            return Some(Polynomial {
                coefficients: Vec::new(),
            });
        }

        let len = self.coefficients.len() + other.coefficients.len() - 1;
        if len > MAX_DEGREE + 1 {
            return None;
        }

        let mut coefficients = vec![Expression::Constant(0.0); len];

        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                let term = a.clone() * b.clone();
                let sum = coefficients[i + j].clone() + term;
                coefficients[i + j] = ops::fold_constants(&sum, ctx);
            }
        }

        Some(Polynomial { coefficients })
    }

    fn divided_by<C: Context>(
        &self,
        divisor: &Expression,
        ctx: &C,
    ) -> Polynomial {
        let coefficients = self
            .coefficients
            .iter()
            .map(|c| ops::fold_constants(&(c.clone() / divisor.clone()), ctx))
            .collect();

        Polynomial { coefficients }
    }

    fn pow<C: Context>(&self, exponent: usize, ctx: &C) -> Option<Polynomial> {
        if self.degree().saturating_mul(exponent) > MAX_DEGREE {
            return None;
        }

        let mut result = Polynomial::one();

        for _ in 0..exponent {
            result = result.mul(self, ctx)?;
        }

        Some(result)
    }

    fn trimmed<C: Context>(mut self, ctx: &C) -> Polynomial {
        for c in &mut self.coefficients {
            *c = ops::fold_constants(c, ctx);
        }

        while let Some(&Expression::Constant(last)) = self.coefficients.last() {
            if last == 0.0 {
                self.coefficients.pop();
            } else {
                break;
            }
        }

        self
    }
}

/// Interpret an exponent as a small, non-negative integer.
fn natural_number<C: Context>(expr: &Expression, ctx: &C) -> Option<usize> {
    let value = ops::fold_constants(expr, ctx).as_constant()?;

    if value >= 0.0 && value.fract() == 0.0 && value <= MAX_DEGREE as f64 {
        Some(value as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Builtins;

    fn coefficients_of(src: &str, unknown: &str) -> Option<Vec<String>> {
        let expr: Expression = src.parse().unwrap();
        let ctx = Builtins::default();

        Polynomial::from_expression(&expr, &Parameter::named(unknown), &ctx)
            .map(|poly| {
                poly.coefficients().iter().map(ToString::to_string).collect()
            })
    }

    #[test]
    fn extract_coefficients() {
        let inputs = vec![
            ("y - x", "y", vec!["-x", "1"]),
            ("y - 5", "y", vec!["-5", "1"]),
            ("x + 1", "x", vec!["1", "1"]),
            ("x^2 + y^2 - 4", "y", vec!["x^2 - 4", "0", "1"]),
            ("x*y - 1", "y", vec!["-1", "x"]),
            ("(y + 1)^2", "y", vec!["1", "2", "1"]),
            ("y/2 + sin(x)", "y", vec!["sin(x)", "0.5"]),
            ("3*y^3 - y", "y", vec!["0", "-1", "0", "3"]),
            ("y - y", "y", vec![]),
        ];

        for (src, unknown, should_be) in inputs {
            let got = coefficients_of(src, unknown);

            let should_be: Vec<String> =
                should_be.iter().map(|s| s.to_string()).collect();
            assert_eq!(got, Some(should_be), "{}", src);
        }
    }

    #[test]
    fn non_polynomials_are_rejected() {
        let inputs = vec![
            "sin(y) - x",
            "1/y - x",
            "y^0.5 - x",
            "2^y - x",
            "y^-1",
            "(y + x)^100",
        ];

        for src in inputs {
            assert_eq!(coefficients_of(src, "y"), None, "{}", src);
        }
    }

    #[test]
    fn degree_and_numeric_coefficients() {
        let expr: Expression = "x^3 - 6*x^2 + 11*x - 6".parse().unwrap();
        let ctx = Builtins::default();

        let got =
            Polynomial::from_expression(&expr, &Parameter::x(), &ctx).unwrap();

        assert_eq!(got.degree(), 3);
        assert_eq!(
            got.numeric_coefficients(),
            Some(vec![-6.0, 11.0, -6.0, 1.0])
        );
    }
}
