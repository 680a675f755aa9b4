//! Solve free-form equations symbolically and plot every solution branch.
//!
//! ```rust
//! use mathplot::{plot_function, ErrorKind};
//!
//! let figure = plot_function("x^2 + y^2 = 4", Some((-3.0, 3.0))).unwrap();
//! assert_eq!(figure.curves.len(), 2);
//!
//! let error = plot_function("not a valid $$ expr", None).unwrap_err();
//! assert_eq!(error.kind(), ErrorKind::Parse);
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod equations;
mod error;
mod expr;
pub mod ops;
mod parse;
mod plot;
mod polynomial;
pub mod sample;
mod session;
pub mod solve;

pub use equations::Equation;
pub use error::{ErrorKind, ErrorReport, PlotError};
pub use expr::{BinaryOperation, Expression, Parameter};
pub use parse::{parse, ParseError, TokenKind};
pub use plot::{
    evaluate_expression, plot_function, plot_function_with, Bounds, Curve,
    Figure, GraphSpace, PlotConfig, Point, ReferenceLine, RenderError,
};
pub use session::Session;
pub use solve::{solve, SolutionSet, SolveError, Strategy};
