use itertools::Itertools;
use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{
    frontend::{FrontendError, TranslateError},
    ir::{Identifier, OrderConstraint, Predicate},
    plan::PlanId,
};

/// Errors raised while turning a query into a pattern. All of them are
/// terminal for the translation at hand.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CompileError {
    #[error("Multiple tokens share the identifier {0}")]
    DuplicateToken(Identifier),
    #[error("Query contains no tokens")]
    EmptyQuery,
    #[error("Predicate references identifier {0}, which is not part of the query")]
    UnknownIdentifier(Identifier),
    #[error("Free-floating predicate does not name the token it constrains")]
    UnanchoredPredicate(Predicate),
    #[error("Order constraints contradict each other: {}", .0.iter().join(", "))]
    InconsistentOrdering(Vec<OrderConstraint>),
    #[error("Query expands to more than {0} alternatives")]
    CandidateLimitExceeded(usize),
    #[error("Execution plan contains no query")]
    EmptyPlan,
    #[error("Execution plan refers to unknown entry {0}")]
    UnknownPlanEntry(PlanId),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The query text the error relates to.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: Option<SourceSpan>,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: impl Into<InnerError>) -> Self {
        let source_code = source_code.into();
        let cause = cause.into();

        let position = match &cause {
            InnerError::Translate(TranslateError::Frontend(FrontendError::ParsingFailed(errors))) => {
                errors.iter().find_map(|error| error.position)
            }
            _ => None,
        };

        let location = position.map(|(line, column)| {
            SourceSpan::new(SourceOffset::from_location(&source_code, line, column), 1)
        });

        Self {
            cause,
            source_code,
            location,
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Compile(CompileError::DuplicateToken(_)) => "CompileError::DuplicateToken",
            InnerError::Compile(CompileError::EmptyQuery) => "CompileError::EmptyQuery",
            InnerError::Compile(CompileError::UnknownIdentifier(_)) => "CompileError::UnknownIdentifier",
            InnerError::Compile(CompileError::UnanchoredPredicate(_)) => "CompileError::UnanchoredPredicate",
            InnerError::Compile(CompileError::InconsistentOrdering(_)) => "CompileError::InconsistentOrdering",
            InnerError::Compile(CompileError::CandidateLimitExceeded(_)) => {
                "CompileError::CandidateLimitExceeded"
            }
            InnerError::Compile(CompileError::EmptyPlan) => "CompileError::EmptyPlan",
            InnerError::Compile(CompileError::UnknownPlanEntry(_)) => "CompileError::UnknownPlanEntry",
            InnerError::Translate(TranslateError::UnknownFrontend(_)) => "TranslateError::UnknownFrontend",
            InnerError::Translate(TranslateError::DuplicateFrontend(_)) => "TranslateError::DuplicateFrontend",
            InnerError::Translate(TranslateError::UnableToGuess(_)) => "TranslateError::UnableToGuess",
            InnerError::Translate(TranslateError::Frontend(FrontendError::ParsingFailed(_))) => {
                "FrontendError::ParsingFailed"
            }
            InnerError::Translate(TranslateError::Frontend(FrontendError::NotSupported(_))) => {
                "FrontendError::NotSupported"
            }
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Compile(CompileError::UnknownIdentifier(_)) => {
                Some("Declare the token, or connect it through a dependency or an order constraint.".to_string())
            }
            InnerError::Compile(CompileError::UnanchoredPredicate(_)) => {
                Some("Attach the predicate to a token, or qualify its attributes with a token.".to_string())
            }
            InnerError::Compile(CompileError::InconsistentOrdering(_)) => {
                Some("Remove one of the listed order constraints.".to_string())
            }
            InnerError::Compile(CompileError::CandidateLimitExceeded(limit)) => Some(format!(
                "Add order constraints to reduce the number of alternatives, or raise the limit above {limit}."
            )),
            InnerError::Translate(TranslateError::UnknownFrontend(name)) => {
                Some(format!("'{name}' is not a registered front-end. Use --list to see all of them."))
            }
            InnerError::Translate(TranslateError::UnableToGuess(matching)) if matching.is_empty() => {
                Some("No front-end accepts the query. Check its syntax.".to_string())
            }
            InnerError::Translate(TranslateError::UnableToGuess(matching)) => Some(format!(
                "The query is accepted by {}. Name the front-end explicitly.",
                matching.iter().join(", ")
            )),
            InnerError::Translate(TranslateError::Frontend(FrontendError::ParsingFailed(errors))) => {
                Some(errors.iter().map(ToString::to_string).join("\n"))
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        self.location.map(|location| {
            Box::new(std::iter::once(miette::LabeledSpan::new_with_span(
                Some(format!("{}", self.cause)),
                location,
            ))) as Box<dyn Iterator<Item = miette::LabeledSpan>>
        })
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.location.map(|_| &self.source_code as &dyn miette::SourceCode)
    }
}
