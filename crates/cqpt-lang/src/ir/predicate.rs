use std::fmt::{self, Display, Formatter};

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::Identifier;

/// A named attribute of a token.
///
/// `owner = None` refers to the token the enclosing predicate is placed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub owner: Option<Identifier>,
    pub name: SmolStr,
}

impl Attribute {
    /// An attribute of the token the predicate ends up on.
    pub fn local(name: impl Into<SmolStr>) -> Self {
        Self {
            owner: None,
            name: name.into(),
        }
    }

    /// An attribute of a specific token.
    pub fn of(owner: Identifier, name: impl Into<SmolStr>) -> Self {
        Self {
            owner: Some(owner),
            name: name.into(),
        }
    }

    fn raise_onto(&self, on: Identifier) -> Self {
        Self {
            owner: self.owner.or(Some(on)),
            name: self.name.clone(),
        }
    }

    fn lower_onto(&self, on: Identifier) -> Self {
        Self {
            owner: self.owner.filter(|owner| *owner != on),
            name: self.name.clone(),
        }
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "{}.{}", owner, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A constant leaf value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Matched verbatim; regex metacharacters carry no meaning.
    Literal(String),
    Regex(String),
    RegexIgnoreCase(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Attribute(Attribute),
    Value(Value),
}

impl From<Attribute> for Operand {
    fn from(attribute: Attribute) -> Self {
        Operand::Attribute(attribute)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Equal => write!(f, "="),
            Operator::NotEqual => write!(f, "!="),
        }
    }
}

/// Boolean expression over token attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    Conjunction(Box<Predicate>, Box<Predicate>),
    Disjunction(Box<Predicate>, Box<Predicate>),
    Negation(Box<Predicate>),
    Presence(Attribute),
    Absence(Attribute),
    Comparison(Operator, Operand, Operand),
}

impl Predicate {
    pub fn and(lhs: Predicate, rhs: Predicate) -> Self {
        Predicate::Conjunction(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Predicate, rhs: Predicate) -> Self {
        Predicate::Disjunction(Box::new(lhs), Box::new(rhs))
    }

    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Negation(Box::new(predicate))
    }

    pub fn equal(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Predicate::Comparison(Operator::Equal, lhs.into(), rhs.into())
    }

    pub fn not_equal(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Predicate::Comparison(Operator::NotEqual, lhs.into(), rhs.into())
    }

    /// Folds predicates into a right-nested conjunction.
    ///
    /// Returns `None` for an empty sequence and the predicate itself for a
    /// single element.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        Self::fold(predicates, Predicate::and)
    }

    /// Folds predicates into a right-nested disjunction, see [`Predicate::all`].
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        Self::fold(predicates, Predicate::or)
    }

    fn fold(
        predicates: impl IntoIterator<Item = Predicate>,
        combine: fn(Predicate, Predicate) -> Predicate,
    ) -> Option<Self> {
        let mut predicates = predicates.into_iter().collect::<Vec<_>>();
        let last = predicates.pop()?;
        Some(
            predicates
                .into_iter()
                .rev()
                .fold(last, |acc, predicate| combine(predicate, acc)),
        )
    }

    /// Top-level conjuncts, with nested conjunctions flattened.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        let mut conjuncts = Vec::new();
        self.collect_junction(&mut conjuncts, true);
        conjuncts
    }

    /// Top-level disjuncts, with nested disjunctions flattened.
    pub fn disjuncts(&self) -> Vec<&Predicate> {
        let mut disjuncts = Vec::new();
        self.collect_junction(&mut disjuncts, false);
        disjuncts
    }

    fn collect_junction<'a>(&'a self, buf: &mut Vec<&'a Predicate>, conjunction: bool) {
        match self {
            Predicate::Conjunction(lhs, rhs) if conjunction => {
                lhs.collect_junction(buf, conjunction);
                rhs.collect_junction(buf, conjunction);
            }
            Predicate::Disjunction(lhs, rhs) if !conjunction => {
                lhs.collect_junction(buf, conjunction);
                rhs.collect_junction(buf, conjunction);
            }
            _ => buf.push(self),
        }
    }

    /// Every token identifier mentioned by an attribute in this predicate.
    pub fn referenced_identifiers(&self) -> FxHashSet<Identifier> {
        let mut identifiers = FxHashSet::default();
        self.visit_attributes(&mut |attribute| {
            if let Some(owner) = attribute.owner {
                identifiers.insert(owner);
            }
        });
        identifiers
    }

    /// Whether some attribute has no explicit owner.
    pub fn has_local_attributes(&self) -> bool {
        let mut found = false;
        self.visit_attributes(&mut |attribute| found |= attribute.owner.is_none());
        found
    }

    fn visit_attributes(&self, f: &mut impl FnMut(&Attribute)) {
        match self {
            Predicate::Conjunction(lhs, rhs) | Predicate::Disjunction(lhs, rhs) => {
                lhs.visit_attributes(f);
                rhs.visit_attributes(f);
            }
            Predicate::Negation(inner) => inner.visit_attributes(f),
            Predicate::Presence(attribute) | Predicate::Absence(attribute) => f(attribute),
            Predicate::Comparison(_, lhs, rhs) => {
                for operand in [lhs, rhs] {
                    if let Operand::Attribute(attribute) = operand {
                        f(attribute);
                    }
                }
            }
        }
    }

    /// Makes local attributes explicit by giving them the owner `on`.
    pub fn raise_onto(&self, on: Identifier) -> Self {
        self.map_attributes(&|attribute: &Attribute| attribute.raise_onto(on))
    }

    /// Turns attributes owned by `on` into local attributes.
    pub fn lower_onto(&self, on: Identifier) -> Self {
        self.map_attributes(&|attribute: &Attribute| attribute.lower_onto(on))
    }

    fn map_attributes(&self, f: &impl Fn(&Attribute) -> Attribute) -> Self {
        let map_operand = |operand: &Operand| match operand {
            Operand::Attribute(attribute) => Operand::Attribute(f(attribute)),
            Operand::Value(_) => operand.clone(),
        };

        match self {
            Predicate::Conjunction(lhs, rhs) => Predicate::and(lhs.map_attributes(f), rhs.map_attributes(f)),
            Predicate::Disjunction(lhs, rhs) => Predicate::or(lhs.map_attributes(f), rhs.map_attributes(f)),
            Predicate::Negation(inner) => Predicate::negate(inner.map_attributes(f)),
            Predicate::Presence(attribute) => Predicate::Presence(f(attribute)),
            Predicate::Absence(attribute) => Predicate::Absence(f(attribute)),
            Predicate::Comparison(op, lhs, rhs) => Predicate::Comparison(*op, map_operand(lhs), map_operand(rhs)),
        }
    }

    /// Simplified copy: double negations removed, `!present` folded into
    /// `absent` (and back), junctions re-nested to the right.
    pub fn normalize(&self) -> Self {
        match self {
            Predicate::Conjunction(..) => Predicate::all(self.conjuncts().into_iter().map(Predicate::normalize))
                .unwrap_or_else(|| self.clone()),
            Predicate::Disjunction(..) => Predicate::any(self.disjuncts().into_iter().map(Predicate::normalize))
                .unwrap_or_else(|| self.clone()),
            Predicate::Negation(inner) => match inner.normalize() {
                Predicate::Negation(inner) => *inner,
                Predicate::Presence(attribute) => Predicate::Absence(attribute),
                Predicate::Absence(attribute) => Predicate::Presence(attribute),
                inner => Predicate::negate(inner),
            },
            Predicate::Presence(_) | Predicate::Absence(_) | Predicate::Comparison(..) => self.clone(),
        }
    }
}
