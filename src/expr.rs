use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
};

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A free variable (or a named constant like `pi`).
    Parameter(Parameter),
    Constant(f64),
    /// An expression involving two operands.
    Binary {
        left: Box<Expression>,
        right: Box<Expression>,
        op: BinaryOperation,
    },
    /// Negate the expression.
    Negate(Box<Expression>),
    /// Invoke a builtin function.
    FunctionCall {
        function: SmolStr,
        argument: Box<Expression>,
    },
}

impl Expression {
    /// Iterate over all [`Parameter`]s in this expression, in the order they
    /// appear (duplicates included).
    pub fn params(&self) -> impl Iterator<Item = &Parameter> + '_ {
        Params { stack: vec![self] }
    }

    /// Does this [`Expression`] reference a particular [`Parameter`]?
    pub fn depends_on(&self, param: &Parameter) -> bool {
        self.params().any(|p| p == param)
    }

    /// How many times does `param` appear in this expression?
    pub fn occurrences(&self, param: &Parameter) -> usize {
        self.params().filter(|p| *p == param).count()
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Expression::Constant(_))
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Expression::Constant(value) => Some(*value),
            _ => None,
        }
    }

    pub fn pow(self, exponent: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(exponent),
            op: BinaryOperation::Power,
        }
    }

    pub fn call<S: Into<SmolStr>>(function: S, argument: Expression) -> Self {
        Expression::FunctionCall {
            function: function.into(),
            argument: Box::new(argument),
        }
    }

    /// Binding strength used when deciding where parentheses are needed.
    fn precedence(&self) -> u8 {
        match self {
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Negate(_) => NEGATE_PRECEDENCE,
            Expression::Constant(value) if value.is_sign_negative() => {
                NEGATE_PRECEDENCE
            },
            Expression::Parameter(_)
            | Expression::Constant(_)
            | Expression::FunctionCall { .. } => ATOM_PRECEDENCE,
        }
    }
}

const NEGATE_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 5;

struct Params<'a> {
    stack: Vec<&'a Expression>,
}

impl<'a> Iterator for Params<'a> {
    type Item = &'a Parameter;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(expr) = self.stack.pop() {
            match expr {
                Expression::Parameter(p) => return Some(p),
                Expression::Constant(_) => {},
                Expression::Binary { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                },
                Expression::Negate(inner) => self.stack.push(inner),
                Expression::FunctionCall { argument, .. } => {
                    self.stack.push(argument)
                },
            }
        }

        None
    }
}

/// A named symbol.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize,
)]
#[serde(transparent)]
pub struct Parameter(SmolStr);

impl Parameter {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self { Parameter(name.into()) }

    /// The independent variable.
    pub fn x() -> Self { Parameter::named("x") }

    /// The dependent variable.
    pub fn y() -> Self { Parameter::named("y") }

    pub fn name(&self) -> &str { &self.0 }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    fn precedence(self) -> u8 {
        match self {
            BinaryOperation::Plus | BinaryOperation::Minus => 1,
            BinaryOperation::Times | BinaryOperation::Divide => 2,
            BinaryOperation::Power => 4,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperation::Plus => " + ",
            BinaryOperation::Minus => " - ",
            BinaryOperation::Times => "*",
            BinaryOperation::Divide => "/",
            BinaryOperation::Power => "^",
        }
    }
}

// define some operator overloads to make constructing an expression easier.

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Plus,
        }
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Minus,
        }
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Times,
        }
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::Binary {
            left: Box::new(self),
            right: Box::new(rhs),
            op: BinaryOperation::Divide,
        }
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Box::new(self)) }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self { Expression::Constant(value) }
}

impl From<Parameter> for Expression {
    fn from(param: Parameter) -> Self { Expression::Parameter(param) }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Parameter(p) => write!(f, "{}", p),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Binary { left, right, op } => {
                let precedence = op.precedence();

                // exponentiation is right associative, everything else
                // associates to the left
                let (left_needs_parens, right_needs_parens) =
                    if *op == BinaryOperation::Power {
                        (
                            left.precedence() <= precedence,
                            right.precedence() < precedence,
                        )
                    } else {
                        (
                            left.precedence() < precedence,
                            right.precedence() <= precedence,
                        )
                    };

                write_operand(left, left_needs_parens, f)?;
                write!(f, "{}", op.symbol())?;
                write_operand(right, right_needs_parens, f)
            },
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_operand(inner, inner.precedence() < NEGATE_PRECEDENCE, f)
            },
            Expression::FunctionCall { function, argument } => {
                write!(f, "{}({})", function, argument)
            },
        }
    }
}

fn write_operand(
    expr: &Expression,
    parenthesize: bool,
    f: &mut Formatter<'_>,
) -> fmt::Result {
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}
