//! Surface syntaxes that produce execution plans, and the registry that
//! picks one of them for an input.
pub mod json;

use std::fmt::{self, Display, Formatter};

use crate::plan::ExecutionPlan;

pub use json::JsonFrontend;

/// One problem found while parsing an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    /// One-based line and column, when known.
    pub position: Option<(usize, usize)>,
    pub message: String,
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.position {
            Some((line, column)) => write!(f, "{}:{}: {}", line, column, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrontendError {
    #[error("Parsing failed. Detected {} error(s).", .0.len())]
    ParsingFailed(Vec<InputError>),
    #[error("Query cannot be translated: {0}")]
    NotSupported(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TranslateError {
    #[error("Unknown front-end: {0}")]
    UnknownFrontend(String),
    #[error("A front-end named {0} is already registered")]
    DuplicateFrontend(String),
    #[error("Cannot guess front-end for query: {}", if .0.is_empty() { "no front-end matches" } else { "multiple front-ends match" })]
    UnableToGuess(Vec<String>),
    #[error(transparent)]
    Frontend(#[from] FrontendError),
}

pub trait Frontend {
    /// Name the front-end is selected by.
    fn name(&self) -> &str;

    fn translate(&self, input: &str) -> Result<ExecutionPlan, FrontendError>;
}

/// Known front-ends in registration order.
pub struct Registry {
    frontends: Vec<Box<dyn Frontend>>,
}

impl Default for Registry {
    /// A registry holding every built-in front-end.
    fn default() -> Self {
        Self {
            frontends: vec![Box::new(JsonFrontend)],
        }
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self { frontends: Vec::new() }
    }

    pub fn register(&mut self, frontend: Box<dyn Frontend>) -> Result<(), TranslateError> {
        if self.get(frontend.name()).is_some() {
            return Err(TranslateError::DuplicateFrontend(frontend.name().to_string()));
        }
        self.frontends.push(frontend);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frontends.iter().map(|frontend| frontend.name())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Frontend> {
        self.frontends
            .iter()
            .find(|frontend| frontend.name() == name)
            .map(|frontend| frontend.as_ref())
    }

    /// Translates `input` with the named front-end, or with the only
    /// front-end accepting it when no name is given.
    pub fn translate(&self, input: &str, name: Option<&str>) -> Result<ExecutionPlan, TranslateError> {
        match name {
            Some(name) => {
                let frontend = self
                    .get(name)
                    .ok_or_else(|| TranslateError::UnknownFrontend(name.to_string()))?;
                Ok(frontend.translate(input)?)
            }
            None => {
                let mut accepted = self.guess(input);
                if accepted.len() == 1
                    && let Some((_, plan)) = accepted.pop()
                {
                    return Ok(plan);
                }
                Err(TranslateError::UnableToGuess(
                    accepted.into_iter().map(|(name, _)| name.to_string()).collect(),
                ))
            }
        }
    }

    /// Every front-end that accepts `input`, with its translation.
    pub fn guess(&self, input: &str) -> Vec<(&str, ExecutionPlan)> {
        self.frontends
            .iter()
            .filter_map(|frontend| match frontend.translate(input) {
                Ok(plan) => Some((frontend.name(), plan)),
                Err(error) => {
                    tracing::trace!(frontend = frontend.name(), %error, "front-end rejected input");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryBuilder;
    use rstest::rstest;

    /// Accepts inputs starting with its own name.
    struct Prefix(&'static str);

    impl Frontend for Prefix {
        fn name(&self) -> &str {
            self.0
        }

        fn translate(&self, input: &str) -> Result<ExecutionPlan, FrontendError> {
            if !input.starts_with(self.0) {
                return Err(FrontendError::NotSupported(format!("not {}", self.0)));
            }
            let mut builder = QueryBuilder::new();
            builder.token(None);
            builder
                .build()
                .map(ExecutionPlan::of_query)
                .map_err(|error| FrontendError::NotSupported(error.to_string()))
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::empty();
        registry.register(Box::new(Prefix("ab"))).unwrap();
        registry.register(Box::new(Prefix("a"))).unwrap();
        registry
    }

    #[test]
    fn test_names_keep_registration_order() {
        assert_eq!(registry().names().collect::<Vec<_>>(), vec!["ab", "a"]);
        assert_eq!(Registry::default().names().collect::<Vec<_>>(), vec!["json"]);
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = registry();
        assert_eq!(
            registry.register(Box::new(Prefix("a"))),
            Err(TranslateError::DuplicateFrontend("a".to_string()))
        );
    }

    #[rstest]
    #[case::single_match("a-query", None, Ok(()))]
    #[case::no_match("query", None, Err(TranslateError::UnableToGuess(vec![])))]
    #[case::many_matches(
        "ab-query",
        None,
        Err(TranslateError::UnableToGuess(vec!["ab".to_string(), "a".to_string()]))
    )]
    #[case::named("ab-query", Some("ab"), Ok(()))]
    #[case::named_rejects(
        "a-query",
        Some("ab"),
        Err(TranslateError::Frontend(FrontendError::NotSupported("not ab".to_string())))
    )]
    #[case::unknown("a-query", Some("grew"), Err(TranslateError::UnknownFrontend("grew".to_string())))]
    fn test_translate(
        #[case] input: &str,
        #[case] name: Option<&str>,
        #[case] expected: Result<(), TranslateError>,
    ) {
        assert_eq!(registry().translate(input, name).map(|_| ()), expected);
    }

    #[rstest]
    #[case(
        InputError { position: Some((2, 5)), message: "expected `,`".to_string() },
        "2:5: expected `,`"
    )]
    #[case(InputError { position: None, message: "empty input".to_string() }, "empty input")]
    fn test_input_error_display(#[case] error: InputError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
