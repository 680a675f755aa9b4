use crate::{
    ops::{self, Context},
    Expression, Parameter, ParseError,
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A relation between two expressions, `left = right`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    left: Expression,
    right: Expression,
}

impl Equation {
    pub fn new(left: Expression, right: Expression) -> Self {
        Equation { left, right }
    }

    pub fn left(&self) -> &Expression { &self.left }

    pub fn right(&self) -> &Expression { &self.right }

    /// The expression which is zero whenever the equation holds
    /// (`left - right`).
    pub fn body(&self) -> Expression {
        match &self.right {
            Expression::Constant(value) if *value == 0.0 => self.left.clone(),
            right => self.left.clone() - right.clone(),
        }
    }

    pub fn depends_on(&self, param: &Parameter) -> bool {
        self.left.depends_on(param) || self.right.depends_on(param)
    }

    /// Which variable should this equation be solved for?
    ///
    /// Prefer `y` so the solutions are functions of `x`. Equations without a
    /// `y` are assumed to constrain `x` directly.
    pub fn solve_target(&self) -> Parameter {
        let y = Parameter::y();

        if self.depends_on(&y) {
            y
        } else {
            Parameter::x()
        }
    }

    /// Constant-fold both sides of the equation.
    pub fn simplified<C>(&self, ctx: &C) -> Equation
    where
        C: Context,
    {
        Equation {
            left: ops::fold_constants(&self.left, ctx),
            right: ops::fold_constants(&self.right, ctx),
        }
    }
}

impl FromStr for Equation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (left, right) = split_equation(s);

        let left = left.parse()?;
        let right = match right {
            Some(right) => {
                // the right-hand side starts just after the "="
                let offset = s.len() - right.len();
                right
                    .parse::<Expression>()
                    .map_err(|e| e.offset_by(offset))?
            },
            None => Expression::Constant(0.0),
        };

        Ok(Equation::new(left, right))
    }
}

/// Split some text on the first `=`, if there is one.
pub(crate) fn split_equation(s: &str) -> (&str, Option<&str>) {
    match s.find('=') {
        Some(index) => {
            let (left, right) = s.split_at(index);
            (left, Some(&right[1..]))
        },
        None => (s, None),
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}
