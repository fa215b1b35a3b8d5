//! Queries written directly as JSON documents.
//!
//! ```json
//! {
//!   "tokens": [
//!     {"name": "n", "where": {"eq": [{"attr": "pos"}, {"literal": "NOUN"}]}},
//!     {"name": "adj"}
//!   ],
//!   "dependencies": [{"governor": "n", "dependent": "adj"}],
//!   "predicates": [{"exists": {"attr": "feats", "of": "adj"}}],
//!   "order": [{"before": "adj", "after": "n", "immediate": true}]
//! }
//! ```
//!
//! Names mentioned only by dependencies or order constraints denote tokens
//! without a predicate.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use smol_str::SmolStr;

use super::{Frontend, FrontendError, InputError};
use crate::ir::{Attribute, Identifier, Operand, OrderKind, Predicate, Query, QueryBuilder, Value};
use crate::plan::ExecutionPlan;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    tokens: Vec<TokenDoc>,
    #[serde(default)]
    dependencies: Vec<DependencyDoc>,
    #[serde(default)]
    predicates: Vec<PredicateDoc>,
    #[serde(default)]
    order: Vec<OrderDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenDoc {
    name: SmolStr,
    #[serde(rename = "where")]
    predicate: Option<PredicateDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DependencyDoc {
    governor: SmolStr,
    dependent: SmolStr,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrderDoc {
    before: SmolStr,
    after: SmolStr,
    #[serde(default)]
    immediate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PredicateDoc {
    And(Vec<PredicateDoc>),
    Or(Vec<PredicateDoc>),
    Not(Box<PredicateDoc>),
    Exists(AttributeDoc),
    Missing(AttributeDoc),
    Eq(OperandDoc, OperandDoc),
    Ne(OperandDoc, OperandDoc),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeDoc {
    attr: SmolStr,
    of: Option<SmolStr>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OperandDoc {
    Attribute(AttributeDoc),
    Literal(LiteralDoc),
    Regex(RegexDoc),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LiteralDoc {
    literal: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegexDoc {
    regex: String,
    #[serde(default)]
    ignore_case: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrontend;

impl Frontend for JsonFrontend {
    fn name(&self) -> &str {
        "json"
    }

    fn translate(&self, input: &str) -> Result<ExecutionPlan, FrontendError> {
        let document = serde_json::from_str::<Document>(input).map_err(|error| {
            let position = (error.line() > 0).then(|| (error.line(), error.column()));
            FrontendError::ParsingFailed(vec![InputError {
                position,
                message: error.to_string(),
            }])
        })?;

        Names::default().build(document).map(ExecutionPlan::of_query)
    }
}

/// Identifiers handed out by token name.
#[derive(Default)]
struct Names {
    builder: QueryBuilder,
    identifiers: FxHashMap<SmolStr, Identifier>,
}

impl Names {
    fn resolve(&mut self, name: &SmolStr) -> Identifier {
        if let Some(identifier) = self.identifiers.get(name) {
            return *identifier;
        }
        let identifier = self.builder.identifier();
        self.identifiers.insert(name.clone(), identifier);
        identifier
    }

    fn build(mut self, document: Document) -> Result<Query, FrontendError> {
        let mut declared = FxHashSet::default();
        for token in &document.tokens {
            if !declared.insert(&token.name) {
                return Err(FrontendError::NotSupported(format!(
                    "token '{}' is declared more than once",
                    token.name
                )));
            }
            let identifier = self.resolve(&token.name);
            let predicate = token
                .predicate
                .as_ref()
                .map(|predicate| self.predicate(predicate))
                .transpose()?;
            self.builder.declare(identifier, predicate);
        }

        for dependency in &document.dependencies {
            let governor = self.resolve(&dependency.governor);
            let dependent = self.resolve(&dependency.dependent);
            self.builder.dependency(governor, dependent);
        }

        for constraint in &document.order {
            let before = self.resolve(&constraint.before);
            let after = self.resolve(&constraint.after);
            let kind = if constraint.immediate {
                OrderKind::Immediate
            } else {
                OrderKind::General
            };
            self.builder.order(before, after, kind);
        }

        for predicate in &document.predicates {
            let predicate = self.predicate(predicate)?;
            self.builder.predicate(predicate);
        }

        self.builder
            .build()
            .map_err(|error| FrontendError::NotSupported(error.to_string()))
    }

    fn predicate(&mut self, predicate: &PredicateDoc) -> Result<Predicate, FrontendError> {
        Ok(match predicate {
            PredicateDoc::And(operands) => {
                let operands = operands
                    .iter()
                    .map(|operand| self.predicate(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                Predicate::all(operands)
                    .ok_or_else(|| FrontendError::NotSupported("empty conjunction".to_string()))?
            }
            PredicateDoc::Or(operands) => {
                let operands = operands
                    .iter()
                    .map(|operand| self.predicate(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                Predicate::any(operands)
                    .ok_or_else(|| FrontendError::NotSupported("empty disjunction".to_string()))?
            }
            PredicateDoc::Not(inner) => Predicate::negate(self.predicate(inner)?),
            PredicateDoc::Exists(attribute) => Predicate::Presence(self.attribute(attribute)),
            PredicateDoc::Missing(attribute) => Predicate::Absence(self.attribute(attribute)),
            PredicateDoc::Eq(lhs, rhs) => Predicate::equal(self.operand(lhs), self.operand(rhs)),
            PredicateDoc::Ne(lhs, rhs) => Predicate::not_equal(self.operand(lhs), self.operand(rhs)),
        })
    }

    fn attribute(&mut self, attribute: &AttributeDoc) -> Attribute {
        match &attribute.of {
            Some(owner) => Attribute::of(self.resolve(owner), attribute.attr.clone()),
            None => Attribute::local(attribute.attr.clone()),
        }
    }

    fn operand(&mut self, operand: &OperandDoc) -> Operand {
        match operand {
            OperandDoc::Attribute(attribute) => self.attribute(attribute).into(),
            OperandDoc::Literal(LiteralDoc { literal }) => Value::Literal(literal.clone()).into(),
            OperandDoc::Regex(RegexDoc {
                regex,
                ignore_case: false,
            }) => Value::Regex(regex.clone()).into(),
            OperandDoc::Regex(RegexDoc {
                regex,
                ignore_case: true,
            }) => Value::RegexIgnoreCase(regex.clone()).into(),
        }
    }
}
