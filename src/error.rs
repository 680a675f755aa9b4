use crate::{
    plot::RenderError, sample::DomainError, solve::SolveError, ParseError,
};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Everything that can go wrong while turning text into a [`Figure`].
///
/// [`Figure`]: crate::Figure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlotError {
    #[error("unable to parse \"{text}\": {source}")]
    Parse {
        text: String,
        #[source]
        source: ParseError,
    },
    #[error("invalid domain: {0}")]
    InvalidDomain(#[from] DomainError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PlotError {
    pub(crate) fn parse(text: &str, source: ParseError) -> Self {
        PlotError::Parse {
            text: text.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PlotError::Parse { .. } => ErrorKind::Parse,
            PlotError::InvalidDomain(_) => ErrorKind::Value,
            PlotError::Solve(e) if e.is_value_error() => ErrorKind::Value,
            PlotError::Solve(_) | PlotError::Render(_) => ErrorKind::Unexpected,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// The broad category of a [`PlotError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The text isn't a well-formed expression or equation.
    Parse,
    /// The input was well-formed but a numeric value was unusable.
    Value,
    Unexpected,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::Value => write!(f, "value error"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// A serializable summary of a [`PlotError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl Display for ErrorReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parameter;

    #[test]
    fn error_kinds() {
        let inputs = vec![
            (
                PlotError::parse("$", ParseError::UnexpectedEndOfInput),
                ErrorKind::Parse,
            ),
            (
                PlotError::from(DomainError::TooFewSamples { samples: 0 }),
                ErrorKind::Value,
            ),
            (
                PlotError::from(SolveError::NonFiniteCoefficients),
                ErrorKind::Value,
            ),
            (
                PlotError::from(SolveError::Unsupported {
                    target: Parameter::y(),
                    reason: "reasons",
                }),
                ErrorKind::Unexpected,
            ),
            (
                PlotError::from(RenderError("backend".to_string())),
                ErrorKind::Unexpected,
            ),
        ];

        for (error, should_be) in inputs {
            assert_eq!(error.kind(), should_be, "{}", error);
        }
    }

    #[test]
    fn report_includes_the_offending_text() {
        let error = PlotError::parse(
            "x $ 2",
            ParseError::InvalidCharacter {
                character: '$',
                index: 2,
            },
        );

        let got = error.report();

        assert_eq!(got.kind, ErrorKind::Parse);
        assert!(got.message.contains("\"x $ 2\""), "{}", got.message);
        assert!(got.to_string().starts_with("parse error: "));
    }
}
