use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use rustc_hash::FxHashSet;

use super::predicate::Predicate;
use crate::error::CompileError;

/// Handle of one logical token within a query.
///
/// Handles are only created by [`QueryBuilder`], so two separately allocated
/// identifiers never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(u32);

impl Identifier {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub identifier: Identifier,
    pub predicate: Option<Predicate>,
}

/// Directed governor → dependent edge. Implies no left-right order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub governor: Identifier,
    pub dependent: Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderKind {
    /// `after` is the very next token.
    Immediate,
    /// `after` occurs strictly later, with any gap.
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderConstraint {
    pub before: Identifier,
    pub after: Identifier,
    pub kind: OrderKind,
}

impl Display for OrderConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            OrderKind::Immediate => "<.",
            OrderKind::General => "<<",
        };
        write!(f, "{} {} {}", self.before, op, self.after)
    }
}

/// A dependency-tree query, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    tokens: Vec<Token>,
    dependencies: Vec<Dependency>,
    predicates: Vec<Predicate>,
    constraints: Vec<OrderConstraint>,
}

impl Query {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Free-floating predicates not declared on any token.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn constraints(&self) -> &[OrderConstraint] {
        &self.constraints
    }

    pub fn token(&self, identifier: Identifier) -> Option<&Token> {
        self.tokens.iter().find(|token| token.identifier == identifier)
    }

    /// Declared tokens followed by every identifier first mentioned by a
    /// dependency or an order constraint.
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.tokens
            .iter()
            .map(|token| token.identifier)
            .chain(
                self.dependencies
                    .iter()
                    .flat_map(|dependency| [dependency.governor, dependency.dependent]),
            )
            .chain(
                self.constraints
                    .iter()
                    .flat_map(|constraint| [constraint.before, constraint.after]),
            )
            .unique()
            .collect()
    }
}

/// Allocates identifiers and assembles a [`Query`].
#[derive(Debug, Default)]
pub struct QueryBuilder {
    next_identifier: u32,
    tokens: Vec<Token>,
    dependencies: Vec<Dependency>,
    predicates: Vec<Predicate>,
    constraints: Vec<OrderConstraint>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh identifier without declaring a token for it.
    pub fn identifier(&mut self) -> Identifier {
        let identifier = Identifier(self.next_identifier);
        self.next_identifier += 1;
        identifier
    }

    /// Allocates a fresh identifier and declares a token for it.
    pub fn token(&mut self, predicate: Option<Predicate>) -> Identifier {
        let identifier = self.identifier();
        self.declare(identifier, predicate);
        identifier
    }

    pub fn declare(&mut self, identifier: Identifier, predicate: Option<Predicate>) -> &mut Self {
        self.tokens.push(Token {
            identifier,
            predicate,
        });
        self
    }

    pub fn dependency(&mut self, governor: Identifier, dependent: Identifier) -> &mut Self {
        self.dependencies.push(Dependency {
            governor,
            dependent,
        });
        self
    }

    pub fn predicate(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order(&mut self, before: Identifier, after: Identifier, kind: OrderKind) -> &mut Self {
        self.constraints.push(OrderConstraint {
            before,
            after,
            kind,
        });
        self
    }

    pub fn build(self) -> Result<Query, CompileError> {
        let mut declared = FxHashSet::default();
        for token in &self.tokens {
            if !declared.insert(token.identifier) {
                return Err(CompileError::DuplicateToken(token.identifier));
            }
        }

        let query = Query {
            tokens: self.tokens,
            dependencies: self.dependencies,
            predicates: self.predicates,
            constraints: self.constraints,
        };

        if query.identifiers().is_empty() {
            return Err(CompileError::EmptyQuery);
        }

        Ok(query)
    }
}
