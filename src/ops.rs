//! [`Expression`] operations.

use crate::{BinaryOperation, Expression, Parameter};
use arrayvec::ArrayVec;
use smol_str::SmolStr;
use std::f64::consts::{E, PI};

/// Contextual information used when evaluating an [`Expression`].
pub trait Context {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError>;

    /// Look up the value of a named constant (e.g. `pi`).
    fn constant(&self, name: &str) -> Option<f64>;

    /// For some function, `f`, and value, `v`, find every `a` where
    /// `f(a) = v`.
    fn invert_function(
        &self,
        name: &str,
        value: &Expression,
    ) -> Result<ArrayVec<Expression, 2>, EvaluationError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("unknown function \"{name}\"")]
    UnknownFunction { name: SmolStr },
    #[error("no value was provided for \"{name}\"")]
    UnknownParameter { name: SmolStr },
    #[error("unable to invert \"{name}\"")]
    UnableToInvert { name: SmolStr },
}

/// The set of builtin functions and constants. Angles are in radians.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Builtins;

impl Context for Builtins {
    fn evaluate_function(
        &self,
        name: &str,
        argument: f64,
    ) -> Result<f64, EvaluationError> {
        match name {
            "sin" => Ok(argument.sin()),
            "cos" => Ok(argument.cos()),
            "tan" => Ok(argument.tan()),
            "asin" => Ok(argument.asin()),
            "acos" => Ok(argument.acos()),
            "atan" => Ok(argument.atan()),
            "sinh" => Ok(argument.sinh()),
            "cosh" => Ok(argument.cosh()),
            "tanh" => Ok(argument.tanh()),
            "sqrt" => Ok(argument.sqrt()),
            "cbrt" => Ok(argument.cbrt()),
            "exp" => Ok(argument.exp()),
            "log" | "ln" => Ok(argument.ln()),
            "abs" => Ok(argument.abs()),
            _ => Err(EvaluationError::UnknownFunction { name: name.into() }),
        }
    }

    fn constant(&self, name: &str) -> Option<f64> {
        match name {
            "pi" | "π" => Some(PI),
            "e" | "E" => Some(E),
            _ => None,
        }
    }

    fn invert_function(
        &self,
        name: &str,
        value: &Expression,
    ) -> Result<ArrayVec<Expression, 2>, EvaluationError> {
        let call = |function: &str| Expression::call(function, value.clone());
        let mut inverses = ArrayVec::new();

        match name {
            "sin" => {
                inverses.push(call("asin"));
                inverses.push(
                    Expression::Parameter(Parameter::named("pi"))
                        - call("asin"),
                );
            },
            "cos" => {
                inverses.push(call("acos"));
                inverses.push(-call("acos"));
            },
            "tan" => inverses.push(call("atan")),
            "asin" => inverses.push(call("sin")),
            "acos" => inverses.push(call("cos")),
            "atan" => inverses.push(call("tan")),
            "sqrt" => {
                inverses.push(value.clone().pow(Expression::Constant(2.0)))
            },
            "cbrt" => {
                inverses.push(value.clone().pow(Expression::Constant(3.0)))
            },
            "exp" => inverses.push(call("log")),
            "log" | "ln" => inverses.push(call("exp")),
            "abs" => {
                inverses.push(value.clone());
                inverses.push(-value.clone());
            },
            _ => {
                return Err(EvaluationError::UnableToInvert {
                    name: name.into(),
                })
            },
        }

        Ok(inverses)
    }
}

/// Simplify an expression by evaluating all constant operations.
pub fn fold_constants<C>(expr: &Expression, ctx: &C) -> Expression
where
    C: Context,
{
    match expr {
        Expression::Binary { left, right, op } => {
            fold_binary_op(left, right, *op, ctx)
        },
        Expression::Negate(expr) => match fold_constants(expr, ctx) {
            Expression::Constant(value) => constant(-value),
            // double negative
            Expression::Negate(inner) => *inner,
            // -(a - b) = b - a
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Minus,
            } => Expression::Binary {
                left: right,
                right: left,
                op: BinaryOperation::Minus,
            },
            other => Expression::Negate(Box::new(other)),
        },
        Expression::FunctionCall { function, argument } => {
            let argument = fold_constants(argument, ctx);

            if let Expression::Constant(argument) = argument {
                if let Ok(result) = ctx.evaluate_function(function, argument) {
                    return Expression::Constant(result);
                }
            }

            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(argument),
            }
        },
        _ => expr.clone(),
    }
}

fn fold_binary_op<C>(
    left: &Expression,
    right: &Expression,
    op: BinaryOperation,
    ctx: &C,
) -> Expression
where
    C: Context,
{
    let left = fold_constants(left, ctx);
    let right = fold_constants(right, ctx);

    // If our operands contain constants, we can use arithmetic's identity laws
    // to simplify things
    match (left, right, op) {
        // Evaluate in-place
        (Expression::Constant(l), Expression::Constant(r), op) => {
            constant(apply(op, l, r))
        },

        (l, r, BinaryOperation::Plus) if l == r => {
            Expression::Constant(2.0) * r
        },
        (l, r, BinaryOperation::Minus) if l == r => Expression::Constant(0.0),
        (l, r, BinaryOperation::Divide) if l == r => Expression::Constant(1.0),
        (l, r, BinaryOperation::Times) if l == r => {
            l.pow(Expression::Constant(2.0))
        },

        // x + 0 = x
        (Expression::Constant(l), right, BinaryOperation::Plus)
            if l == 0.0 =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Plus)
            if r == 0.0 =>
        {
            left
        },

        // x + -5 = x - 5
        (left, Expression::Constant(r), BinaryOperation::Plus) if r < 0.0 => {
            left - Expression::Constant(-r)
        },
        (left, Expression::Negate(r), BinaryOperation::Plus) => left - *r,

        // x - -5 = x + 5
        (left, Expression::Constant(r), BinaryOperation::Minus) if r < 0.0 => {
            left + Expression::Constant(-r)
        },
        (left, Expression::Negate(r), BinaryOperation::Minus) => left + *r,

        // 0 * x = 0
        (Expression::Constant(l), _, BinaryOperation::Times)
            if l == 0.0 =>
        {
            Expression::Constant(0.0)
        },
        (_, Expression::Constant(r), BinaryOperation::Times)
            if r == 0.0 =>
        {
            Expression::Constant(0.0)
        },

        // 1 * x = x
        (Expression::Constant(l), right, BinaryOperation::Times)
            if l == 1.0 =>
        {
            right
        },
        (left, Expression::Constant(r), BinaryOperation::Times)
            if r == 1.0 =>
        {
            left
        },

        // -1 * x = -x
        (Expression::Constant(l), right, BinaryOperation::Times)
            if l == -1.0 =>
        {
            -right
        },
        (left, Expression::Constant(r), BinaryOperation::Times)
            if r == -1.0 =>
        {
            -left
        },

        // 0 / x = 0
        (Expression::Constant(l), _, BinaryOperation::Divide)
            if l == 0.0 =>
        {
            Expression::Constant(0.0)
        },

        // x / 1 = x
        (left, Expression::Constant(r), BinaryOperation::Divide)
            if r == 1.0 =>
        {
            left
        },

        // x / -1 = -x
        (left, Expression::Constant(r), BinaryOperation::Divide)
            if r == -1.0 =>
        {
            -left
        },

        // 0 - x = -x
        (Expression::Constant(l), right, BinaryOperation::Minus)
            if l == 0.0 =>
        {
            fold_constants(&-right, ctx)
        },

        // x - 0 = x
        (left, Expression::Constant(r), BinaryOperation::Minus)
            if r == 0.0 =>
        {
            left
        },

        // x^1 = x and x^0 = 1
        (left, Expression::Constant(r), BinaryOperation::Power)
            if r == 1.0 =>
        {
            left
        },
        (_, Expression::Constant(r), BinaryOperation::Power)
            if r == 0.0 =>
        {
            Expression::Constant(1.0)
        },

        // (x * y) * z
        (
            Expression::Constant(constant_a),
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            },
            BinaryOperation::Times,
        ) if left.is_constant() || right.is_constant() => {
            scale_product(constant_a, &left, &right)
        },
        (
            Expression::Binary {
                left,
                right,
                op: BinaryOperation::Times,
            },
            Expression::Constant(constant_a),
            BinaryOperation::Times,
        ) if left.is_constant() || right.is_constant() => {
            scale_product(constant_a, &left, &right)
        },

        // Oh well, we tried
        (left, right, op) => Expression::Binary {
            left: Box::new(left),
            right: Box::new(right),
            op,
        },
    }
}

/// Wrap a folded value, normalizing `-0` so it doesn't leak into labels.
fn constant(value: f64) -> Expression {
    if value == 0.0 {
        Expression::Constant(0.0)
    } else {
        Expression::Constant(value)
    }
}

fn apply(op: BinaryOperation, l: f64, r: f64) -> f64 {
    match op {
        BinaryOperation::Plus => l + r,
        BinaryOperation::Minus => l - r,
        BinaryOperation::Times => l * r,
        BinaryOperation::Divide => l / r,
        BinaryOperation::Power => l.powf(r),
    }
}

/// Multiply `constant * (left * right)` where one of `left` or `right` is a
/// constant.
fn scale_product(
    constant: f64,
    left: &Expression,
    right: &Expression,
) -> Expression {
    match (left, right) {
        (Expression::Constant(l), other) | (other, Expression::Constant(l)) => {
            Expression::Constant(constant * l) * other.clone()
        },
        (left, right) => {
            Expression::Constant(constant) * (left.clone() * right.clone())
        },
    }
}

/// Replace all references to a [`Parameter`] with an [`Expression`].
pub fn substitute(
    expression: &Expression,
    param: &Parameter,
    value: &Expression,
) -> Expression {
    match expression {
        Expression::Parameter(p) => {
            if p == param {
                value.clone()
            } else {
                Expression::Parameter(p.clone())
            }
        },
        Expression::Constant(value) => Expression::Constant(*value),
        Expression::Binary { left, right, op } => {
            let left = substitute(left, param, value);
            let right = substitute(right, param, value);
            Expression::Binary {
                left: Box::new(left),
                right: Box::new(right),
                op: *op,
            }
        },
        Expression::Negate(inner) => -substitute(inner, param, value),
        Expression::FunctionCall { function, argument } => {
            Expression::FunctionCall {
                function: function.clone(),
                argument: Box::new(substitute(argument, param, value)),
            }
        },
    }
}

/// Numerically evaluate an [`Expression`].
///
/// Parameters are resolved using `lookup_parameter_value` first, falling back
/// to the [`Context`]'s named constants.
pub fn evaluate<F, C>(
    expr: &Expression,
    lookup_parameter_value: F,
    ctx: &C,
) -> Result<f64, EvaluationError>
where
    F: Fn(&Parameter) -> Option<f64>,
    C: Context,
{
    evaluate_inner(expr, &lookup_parameter_value, ctx)
}

fn evaluate_inner<F, C>(
    expr: &Expression,
    lookup_parameter_value: &F,
    ctx: &C,
) -> Result<f64, EvaluationError>
where
    F: Fn(&Parameter) -> Option<f64>,
    C: Context,
{
    match expr {
        Expression::Parameter(p) => lookup_parameter_value(p)
            .or_else(|| ctx.constant(p.name()))
            .ok_or_else(|| EvaluationError::UnknownParameter {
                name: p.name().into(),
            }),
        Expression::Constant(value) => Ok(*value),
        Expression::Binary { left, right, op } => {
            let left = evaluate_inner(left, lookup_parameter_value, ctx)?;
            let right = evaluate_inner(right, lookup_parameter_value, ctx)?;
            Ok(apply(*op, left, right))
        },
        Expression::Negate(inner) => {
            evaluate_inner(inner, lookup_parameter_value, ctx).map(|v| -v)
        },
        Expression::FunctionCall { function, argument } => {
            let argument =
                evaluate_inner(argument, lookup_parameter_value, ctx)?;
            ctx.evaluate_function(function, argument)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_fold_simple_arithmetic() {
        let inputs = vec![
            ("1", 1.0),
            ("1 + 1.5", 1.0 + 1.5),
            ("1 - 1.5", 1.0 - 1.5),
            ("2 * 3", 2.0 * 3.0),
            ("4 / 2", 4.0 / 2.0),
            ("2^10", 1024.0),
            ("2^3^2", 512.0),
            ("1 - 2 - 3", -4.0),
            ("sqrt(4)", 4_f64.sqrt()),
            ("sqrt(2 + 2)", (2_f64 + 2.0).sqrt()),
            ("sin(0)", 0.0),
            ("atan(1)", 1_f64.atan()),
            ("sqrt(2 + sqrt(4))", (2.0 + 4_f64.sqrt()).sqrt()),
            ("-(1 + 2)", -(1.0 + 2.0)),
            ("0 * x", 0.0),
            ("x - x", 0.0),
            ("x/x", 1.0),
            ("x^0", 1.0),
            ("0.0000001 * 2", 0.0000002),
            ("0.0000001 + 0", 0.0000001),
        ];
        let ctx = Builtins::default();

        for (src, should_be) in inputs {
            let expr: Expression = src.parse().unwrap();
            let got = fold_constants(&expr, &ctx);

            match got {
                Expression::Constant(value) => assert_eq!(
                    value, should_be,
                    "{} -> {} != {}",
                    expr, value, should_be
                ),
                other => panic!(
                    "Expected a constant expression, but got \"{}\"",
                    other
                ),
            }
        }
    }

    #[test]
    fn constant_folding_leaves_unknowns_unevaluated() {
        let inputs = vec![
            ("x", "x"),
            ("-(2 * 3 + x)", "-(6 + x)"),
            ("unknown_function(3)", "unknown_function(3)"),
            ("2 * x * 3", "6 * x"),
            ("x + 5", "x + 5"),
            ("x + 5*2", "x + 10"),
            ("x + x", "2*x"),
            ("x * x", "x^2"),
            ("0 + x", "x"),
            ("x + 0", "x"),
            ("1 * x", "x"),
            ("x * 1", "x"),
            ("-1 * x", "-x"),
            ("x - 0", "x"),
            ("0 - x", "-x"),
            ("x / 1", "x"),
            ("x^1", "x"),
            ("--x", "x"),
            ("-(x - 4)", "4 - x"),
            ("x + -4", "x - 4"),
            ("x - -4", "x + 4"),
            ("x + -y", "x - y"),
            ("(x + x)*3 + 5", "6*x + 5"),
            ("pi - asin(x)", "pi - asin(x)"),
            // tiny values aren't 0 or 1
            ("x * 0.0000001", "x*0.0000001"),
            ("0.0000001 * x", "0.0000001*x"),
            ("x + 0.0000001", "x + 0.0000001"),
            ("x - 0.0000001", "x - 0.0000001"),
            ("x / 1.0000001", "x/1.0000001"),
            ("x * 0.9999999", "x*0.9999999"),
            ("x^0.0000001", "x^0.0000001"),
            ("0.0000001 / x", "0.0000001/x"),
        ];
        let ctx = Builtins::default();

        for (src, should_be) in inputs {
            let expr: Expression = src.parse().unwrap();

            let got = fold_constants(&expr, &ctx);

            let should_be: Expression = should_be.parse().unwrap();

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn basic_substitutions() {
        let parameter = Parameter::named("x");
        let inputs = vec![
            ("1 + 2", "3", "1 + 2"),
            ("x", "5", "5"),
            ("y", "5", "y"),
            ("x + 5", "5", " 5 + 5"),
            ("-x", "5", "-5"),
            ("sin(x)", "y + y", "sin(y + y)"),
        ];

        for (src, new_value, should_be) in inputs {
            let original: Expression = src.parse().unwrap();
            let new_value: Expression = new_value.parse().unwrap();
            let should_be: Expression = should_be.parse().unwrap();

            let got = substitute(&original, &parameter, &new_value);

            assert_eq!(got, should_be, "{} != {}", got, should_be);
        }
    }

    #[test]
    fn evaluate_with_known_parameters() {
        let expr: Expression = "x^2 + 2*x*y - sin(pi/2)".parse().unwrap();
        let ctx = Builtins::default();
        let lookup = |p: &Parameter| match p.name() {
            "x" => Some(3.0),
            "y" => Some(0.5),
            _ => None,
        };

        let got = evaluate(&expr, lookup, &ctx).unwrap();

        approx::assert_relative_eq!(got, 9.0 + 3.0 - 1.0);
    }

    #[test]
    fn evaluating_an_unknown_parameter_fails() {
        let expr: Expression = "x + a".parse().unwrap();
        let ctx = Builtins::default();

        let got = evaluate(&expr, |_| Some(1.0), &ctx);
        assert!(got.is_ok());

        let got = evaluate(&expr, |p| (p.name() == "x").then(|| 1.0), &ctx);
        assert_eq!(
            got,
            Err(EvaluationError::UnknownParameter { name: "a".into() })
        );
    }

    #[test]
    fn invert_builtin_functions() {
        let ctx = Builtins::default();
        let value: Expression = "x".parse().unwrap();

        let got = ctx.invert_function("sin", &value).unwrap();
        let got: Vec<_> = got.iter().map(ToString::to_string).collect();
        assert_eq!(got, vec!["asin(x)", "pi - asin(x)"]);

        let got = ctx.invert_function("sqrt", &value).unwrap();
        assert_eq!(got[0].to_string(), "x^2");

        assert_eq!(
            ctx.invert_function("foo", &value),
            Err(EvaluationError::UnableToInvert { name: "foo".into() })
        );
    }
}
