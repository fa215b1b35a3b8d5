//! Front-end agnostic representation of a dependency-tree query.
pub mod predicate;
pub mod query;

pub use predicate::{Attribute, Operand, Operator, Predicate, Value};
pub use query::{Dependency, Identifier, OrderConstraint, OrderKind, Query, QueryBuilder, Token};
