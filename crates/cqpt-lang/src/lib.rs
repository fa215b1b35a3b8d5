//! `cqpt-lang` compiles dependency-tree queries into CQP, the sequential
//! token-pattern language of the IMS Open Corpus Workbench.
//!
//! A dependency tree has no inherent left-to-right order, so a query is
//! compiled into an alternation with one sequence per admissible token order.
//!
//! ## Examples
//!
//! ```rust
//! use cqpt_lang::{Attribute, Predicate, QueryBuilder, Value};
//!
//! let mut builder = QueryBuilder::new();
//! let noun = builder.token(Some(Predicate::equal(
//!     Attribute::local("pos"),
//!     Value::Literal("NOUN".to_string()),
//! )));
//! let adj = builder.token(Some(Predicate::equal(
//!     Attribute::local("pos"),
//!     Value::Literal("ADJ".to_string()),
//! )));
//! builder.dependency(noun, adj);
//!
//! let pattern = cqpt_lang::translate(&builder.build().unwrap()).unwrap();
//! assert_eq!(
//!     pattern,
//!     r#"a:[pos = "NOUN"] []* [pos = "ADJ" & dephead = a.ref] | a:[pos = "ADJ"] []* [pos = "NOUN" & a.dephead = ref]"#
//! );
//! ```
//!
//! Text inputs go through a [`Registry`] of front-ends:
//!
//! ```rust
//! use cqpt_lang::{CompileOptions, Registry};
//!
//! let input = r#"{"tokens": [{"name": "a", "where": {"eq": [{"attr": "word"}, {"literal": "dog"}]}}]}"#;
//! let pattern = cqpt_lang::translate_input(&Registry::default(), input, None, &CompileOptions::default()).unwrap();
//! assert_eq!(pattern, r#"[word = "dog"]"#);
//! ```
mod arena;
mod compile;
mod emit;
mod error;
pub mod frontend;
mod ir;
mod linearize;
mod names;
mod ordering;
mod placement;
mod plan;
mod regex;

pub use arena::{Arena, ArenaId};
pub use compile::{CompileOptions, Compiler};
pub use emit::Emitter;
pub use error::{CompileError, Error, InnerError};
pub use frontend::{Frontend, FrontendError, InputError, JsonFrontend, Registry, TranslateError};
pub use ir::{
    Attribute, Dependency, Identifier, Operand, Operator, OrderConstraint, OrderKind, Predicate, Query, QueryBuilder,
    Token, Value,
};
pub use linearize::{Candidate, Candidates, Gap, Linearizer};
pub use ordering::{Component, OrderingModel};
pub use placement::Placement;
pub use plan::{ExecutionPlan, PlanBuilder, PlanEntry, PlanId, SetOperator};

pub type CqptResult = Result<String, Error>;

/// Compiles `query` with default options.
pub fn translate(query: &Query) -> Result<String, CompileError> {
    Compiler::default().compile(query)
}

/// Translates a textual query with the named front-end, or the only one
/// accepting it, and compiles the resulting plan.
#[allow(clippy::result_large_err)]
pub fn translate_input(
    registry: &Registry,
    input: &str,
    frontend: Option<&str>,
    options: &CompileOptions,
) -> CqptResult {
    let plan = registry
        .translate(input, frontend)
        .map_err(|e| Error::from_error(input, e))?;

    Compiler::new(options.clone())
        .compile_plan(&plan)
        .map_err(|e| Error::from_error(input, e))
}
