use crate::{
    ops::{self, Context, EvaluationError},
    polynomial::Polynomial,
    BinaryOperation, Equation, Expression, Parameter,
};
use arrayvec::ArrayVec;
use nalgebra::{linalg::Schur, DMatrix as Matrix};

/// Solve an [`Equation`] symbolically for `target`.
///
/// The returned branches are closed-form expressions for `target` in terms of
/// the equation's other parameters. An empty [`SolutionSet`] is a valid
/// outcome (e.g. `x^2 + 1 = 0` has no real solutions).
pub fn solve<C>(
    equation: &Equation,
    target: &Parameter,
    ctx: &C,
) -> Result<SolutionSet, SolveError>
where
    C: Context,
{
    let body = ops::fold_constants(&equation.body(), ctx);

    let (strategy, candidates) = if !body.depends_on(target) {
        (Strategy::Trivial, Vec::new())
    } else {
        match Polynomial::from_expression(&body, target, ctx) {
            Some(poly) if poly.degree() <= 2 => {
                (Strategy::ClosedForm, closed_form(&poly))
            },
            _ if body.occurrences(target) == 1 => {
                let branches =
                    isolate(&body, target, Expression::Constant(0.0), ctx)?;
                (Strategy::Isolation, branches)
            },
            Some(poly) => match poly.numeric_coefficients() {
                Some(coefficients) => {
                    (Strategy::NumericRoots, numeric_roots(&coefficients)?)
                },
                None => {
                    return Err(SolveError::Unsupported {
                        target: target.clone(),
                        reason: "polynomials above degree 2 need numeric \
                                 coefficients",
                    })
                },
            },
            None => {
                return Err(SolveError::Unsupported {
                    target: target.clone(),
                    reason: "it appears more than once and the equation \
                             isn't a polynomial",
                })
            },
        }
    };

    let mut branches: Vec<Expression> = Vec::new();

    for candidate in candidates {
        let candidate = ops::fold_constants(&candidate, ctx);

        if is_non_real(&candidate) || branches.contains(&candidate) {
            continue;
        }
        if strategy == Strategy::Isolation
            && !satisfies(&body, target, &candidate, ctx)
        {
            tracing::debug!(%candidate, "discarding an extraneous solution");
            continue;
        }

        branches.push(candidate);
    }

    tracing::debug!(
        %target,
        ?strategy,
        branches = branches.len(),
        "solved the equation"
    );

    Ok(SolutionSet {
        target: target.clone(),
        strategy,
        branches,
    })
}

/// The ordered closed-form solutions for one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionSet {
    target: Parameter,
    strategy: Strategy,
    branches: Vec<Expression>,
}

impl SolutionSet {
    /// The parameter that was solved for.
    pub fn target(&self) -> &Parameter { &self.target }

    /// How the branches were found.
    pub fn strategy(&self) -> Strategy { self.strategy }

    pub fn branches(&self) -> &[Expression] { &self.branches }

    pub fn len(&self) -> usize { self.branches.len() }

    pub fn is_empty(&self) -> bool { self.branches.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Expression> + '_ {
        self.branches.iter()
    }
}

impl<'a> IntoIterator for &'a SolutionSet {
    type IntoIter = <&'a [Expression] as IntoIterator>::IntoIter;
    type Item = &'a Expression;

    fn into_iter(self) -> Self::IntoIter { self.branches.iter() }
}

impl IntoIterator for SolutionSet {
    type IntoIter = <Vec<Expression> as IntoIterator>::IntoIter;
    type Item = Expression;

    fn into_iter(self) -> Self::IntoIter { self.branches.into_iter() }
}

/// The technique used to find a [`SolutionSet`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The target doesn't appear in the equation, so there is nothing to
    /// solve.
    Trivial,
    /// The linear or quadratic formula.
    ClosedForm,
    /// The target appears exactly once, so each operation around it was
    /// undone in turn.
    Isolation,
    /// Eigenvalues of the polynomial's companion matrix.
    NumericRoots,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("evaluation failed: {0}")]
    Eval(#[from] EvaluationError),
    #[error("unable to solve for {target} because {reason}")]
    Unsupported {
        target: Parameter,
        reason: &'static str,
    },
    #[error("the polynomial has non-finite coefficients")]
    NonFiniteCoefficients,
    #[error("the root finder didn't converge")]
    DidntConverge,
}

impl SolveError {
    /// Was this caused by a bad numeric value rather than an equation we
    /// don't know how to handle?
    pub fn is_value_error(&self) -> bool {
        matches!(self, SolveError::NonFiniteCoefficients)
    }
}

fn closed_form(poly: &Polynomial) -> Vec<Expression> {
    match poly.coefficients() {
        [c, b] => vec![-c.clone() / b.clone()],
        [c, b, a] => quadratic(a, b, c).into_iter().collect(),
        // constant polynomials have no roots worth plotting
        _ => Vec::new(),
    }
}

/// The roots of `a*t^2 + b*t + c`, smallest branch first.
fn quadratic(
    a: &Expression,
    b: &Expression,
    c: &Expression,
) -> ArrayVec<Expression, 2> {
    let mut roots = ArrayVec::new();

    match b {
        Expression::Constant(b) if *b == 0.0 => {
            let root = Expression::call("sqrt", -c.clone() / a.clone());
            roots.push(-root.clone());
            roots.push(root);
        },
        _ => {
            let discriminant = b.clone().pow(Expression::Constant(2.0))
                - Expression::Constant(4.0) * a.clone() * c.clone();
            let root = Expression::call("sqrt", discriminant);
            let two_a = Expression::Constant(2.0) * a.clone();

            roots.push((-b.clone() - root.clone()) / two_a.clone());
            roots.push((-b.clone() + root) / two_a);
        },
    }

    roots
}

/// Undo each operation applied to `target` in `expr = rhs`, assuming `target`
/// appears exactly once in `expr`.
fn isolate<C>(
    expr: &Expression,
    target: &Parameter,
    rhs: Expression,
    ctx: &C,
) -> Result<Vec<Expression>, SolveError>
where
    C: Context,
{
    let rhs = ops::fold_constants(&rhs, ctx);

    match expr {
        Expression::Parameter(p) if p == target => Ok(vec![rhs]),
        Expression::Negate(inner) => isolate(inner, target, -rhs, ctx),
        Expression::Binary { left, right, op } => {
            let l = Expression::clone(left);
            let r = Expression::clone(right);

            match (op, left.depends_on(target)) {
                (BinaryOperation::Plus, true) => {
                    isolate(left, target, rhs - r, ctx)
                },
                (BinaryOperation::Plus, false) => {
                    isolate(right, target, rhs - l, ctx)
                },
                (BinaryOperation::Minus, true) => {
                    isolate(left, target, rhs + r, ctx)
                },
                (BinaryOperation::Minus, false) => {
                    isolate(right, target, l - rhs, ctx)
                },
                (BinaryOperation::Times, true) => {
                    isolate(left, target, rhs / r, ctx)
                },
                (BinaryOperation::Times, false) => {
                    isolate(right, target, rhs / l, ctx)
                },
                (BinaryOperation::Divide, true) => {
                    isolate(left, target, rhs * r, ctx)
                },
                (BinaryOperation::Divide, false) => {
                    isolate(right, target, l / rhs, ctx)
                },
                (BinaryOperation::Power, true) => {
                    let mut branches = Vec::new();
                    for root in nth_roots(rhs, &r, ctx) {
                        branches.extend(isolate(left, target, root, ctx)?);
                    }
                    Ok(branches)
                },
                (BinaryOperation::Power, false) => {
                    isolate(right, target, logarithm(rhs, l), ctx)
                },
            }
        },
        Expression::FunctionCall { function, argument } => {
            let mut branches = Vec::new();
            for inverse in ctx.invert_function(function, &rhs)? {
                branches.extend(isolate(argument, target, inverse, ctx)?);
            }
            Ok(branches)
        },
        _ => Err(SolveError::Unsupported {
            target: target.clone(),
            reason: "it doesn't appear in the equation",
        }),
    }
}

/// Every real `base` where `base^exponent = value`.
fn nth_roots<C>(
    value: Expression,
    exponent: &Expression,
    ctx: &C,
) -> ArrayVec<Expression, 2>
where
    C: Context,
{
    let mut roots = ArrayVec::new();

    match ops::fold_constants(exponent, ctx).as_constant() {
        Some(n) if n == 2.0 => {
            let root = Expression::call("sqrt", value);
            roots.push(-root.clone());
            roots.push(root);
        },
        Some(n) if n == 3.0 => roots.push(Expression::call("cbrt", value)),
        Some(n) if n > 0.0 && n % 2.0 == 0.0 => {
            let root = value.pow(Expression::Constant(1.0 / n));
            roots.push(-root.clone());
            roots.push(root);
        },
        _ => roots.push(
            value.pow(Expression::Constant(1.0) / exponent.clone()),
        ),
    }

    roots
}

/// `log_base(value)`, using the natural log directly when the base is `e`.
fn logarithm(value: Expression, base: Expression) -> Expression {
    match &base {
        Expression::Parameter(p) if p.name() == "e" => {
            Expression::call("log", value)
        },
        _ => Expression::call("log", value) / Expression::call("log", base),
    }
}

/// Find every real root of a polynomial with numeric coefficients, in
/// ascending order.
///
/// The roots of a monic polynomial are the eigenvalues of its [companion
/// matrix][companion].
///
/// [companion]: https://en.wikipedia.org/wiki/Companion_matrix
fn numeric_roots(coefficients: &[f64]) -> Result<Vec<Expression>, SolveError> {
    const MAX_ITERATIONS: usize = 1000;
    const TOLERANCE: f64 = 1e-6;

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(SolveError::NonFiniteCoefficients);
    }

    let degree = coefficients.len() - 1;
    let leading = coefficients[degree];

    let mut companion = Matrix::zeros(degree, degree);
    for row in 1..degree {
        companion[(row, row - 1)] = 1.0;
    }
    for (row, coefficient) in coefficients[..degree].iter().enumerate() {
        companion[(row, degree - 1)] = -coefficient / leading;
    }

    let schur = Schur::try_new(companion, f64::EPSILON, MAX_ITERATIONS)
        .ok_or(SolveError::DidntConverge)?;

    let mut roots: Vec<f64> = schur
        .complex_eigenvalues()
        .iter()
        .filter(|z| z.im.abs() <= TOLERANCE * (1.0 + z.re.abs()))
        .map(|z| tidy(z.re))
        .collect();

    roots.sort_by(|a, b| a.total_cmp(b));
    roots.dedup_by(|a, b| approx::abs_diff_eq!(*a, *b, epsilon = TOLERANCE));

    Ok(roots.into_iter().map(Expression::Constant).collect())
}

/// Snap values that are within rounding error of an integer.
fn tidy(value: f64) -> f64 {
    let rounded = value.round();

    if (value - rounded).abs() < 1e-9 {
        rounded
    } else {
        value
    }
}

fn is_non_real(expr: &Expression) -> bool {
    matches!(expr, Expression::Constant(value) if !value.is_finite())
}

/// Check a numeric candidate by plugging it back into the equation. Isolation
/// can introduce extraneous roots (e.g. squaring both sides of
/// `sqrt(x) = -1`).
fn satisfies<C>(
    body: &Expression,
    target: &Parameter,
    candidate: &Expression,
    ctx: &C,
) -> bool
where
    C: Context,
{
    let substituted = ops::substitute(body, target, candidate);

    match ops::evaluate(&substituted, |_| None, ctx) {
        Ok(residual) => {
            residual.abs() <= 1e-9 * (1.0 + candidate_scale(candidate))
        },
        // still has free parameters, so we can't tell
        Err(_) => true,
    }
}

fn candidate_scale(candidate: &Expression) -> f64 {
    candidate.as_constant().map(f64::abs).unwrap_or(0.0)
}
