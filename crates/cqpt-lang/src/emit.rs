//! Rendering of candidates as CQP token sequences.
use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::error::CompileError;
use crate::ir::{Attribute, Identifier, Operand, Predicate, Query, Value};
use crate::linearize::{Candidate, Gap};
use crate::names::{self, TOKEN_ALPHABET};
use crate::placement::Placement;
use crate::regex;

type Labels = FxHashMap<Identifier, SmolStr>;

const UNBOUNDED_GAP: &str = "[]*";

/// Binding strength of a predicate when rendered, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Top,
    Junction,
    Negation,
    Comparison,
    Atom,
}

impl Precedence {
    fn of(predicate: &Predicate) -> Self {
        match predicate {
            Predicate::Conjunction(..) | Predicate::Disjunction(..) => Precedence::Junction,
            Predicate::Negation(_) => Precedence::Negation,
            Predicate::Comparison(..) => Precedence::Comparison,
            Predicate::Presence(_) | Predicate::Absence(_) => Precedence::Atom,
        }
    }
}

/// A conjunct still to be rendered inside a token.
#[derive(Debug)]
enum Conjunct<'a> {
    Predicate(&'a Predicate),
    Owned(Predicate),
    Dependent { governor: Identifier },
    Governor { dependent: Identifier },
}

pub struct Emitter<'a> {
    query: &'a Query,
    placement: &'a Placement,
}

impl<'a> Emitter<'a> {
    pub fn new(query: &'a Query, placement: &'a Placement) -> Self {
        Self { query, placement }
    }

    /// Renders every candidate and joins them with alternation. An
    /// alternative identical to an earlier one is dropped.
    ///
    /// Fails without output once more than `limit` distinct alternatives are
    /// seen.
    pub fn emit_all(
        &self,
        candidates: impl IntoIterator<Item = Candidate>,
        limit: Option<usize>,
    ) -> Result<String, CompileError> {
        let mut alternatives = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut duplicates = 0usize;

        for candidate in candidates {
            let alternative = self.emit_candidate(&candidate);
            if seen.contains(&alternative) {
                duplicates += 1;
                continue;
            }
            if let Some(limit) = limit.filter(|limit| alternatives.len() >= *limit) {
                return Err(CompileError::CandidateLimitExceeded(limit));
            }
            seen.insert(alternative.clone());
            alternatives.push(alternative);
        }

        tracing::debug!(alternatives = alternatives.len(), duplicates, "emitted pattern");
        Ok(alternatives.join(" | "))
    }

    pub fn emit_candidate(&self, candidate: &Candidate) -> String {
        let positions = candidate
            .tokens
            .iter()
            .enumerate()
            .map(|(position, identifier)| (*identifier, position))
            .collect::<FxHashMap<_, _>>();
        let later = |a: Identifier, b: Identifier| match positions.get(&a).cmp(&positions.get(&b)) {
            Ordering::Less => Some((b, a)),
            Ordering::Greater => Some((a, b)),
            Ordering::Equal => None,
        };

        let mut conjuncts: FxHashMap<Identifier, Vec<Conjunct<'_>>> = FxHashMap::default();
        let mut referenced: FxHashSet<Identifier> = FxHashSet::default();

        for identifier in &candidate.tokens {
            if let Some(predicate) = self.placement.predicate(*identifier) {
                conjuncts
                    .entry(*identifier)
                    .or_default()
                    .extend(predicate.conjuncts().into_iter().map(Conjunct::Predicate));
            }
        }

        for predicate in self.placement.deferred() {
            let owners = predicate.referenced_identifiers();
            let Some(carrier) = owners.iter().copied().max_by_key(|owner| positions.get(owner)) else {
                continue;
            };
            referenced.extend(owners.iter().copied().filter(|owner| *owner != carrier));

            let lowered = predicate.lower_onto(carrier);
            let entry = conjuncts.entry(carrier).or_default();
            entry.extend(lowered.conjuncts().into_iter().cloned().map(Conjunct::Owned));
        }

        for dependency in self.query.dependencies() {
            let Some((carrier, earlier)) = later(dependency.governor, dependency.dependent) else {
                continue;
            };
            referenced.insert(earlier);

            let conjunct = if carrier == dependency.dependent {
                Conjunct::Dependent {
                    governor: dependency.governor,
                }
            } else {
                Conjunct::Governor {
                    dependent: dependency.dependent,
                }
            };
            conjuncts.entry(carrier).or_default().push(conjunct);
        }

        let labels: Labels = candidate
            .tokens
            .iter()
            .filter(|identifier| referenced.contains(identifier))
            .copied()
            .zip(names::from_alphabet(TOKEN_ALPHABET))
            .collect();

        let mut buf = String::new();
        for (i, identifier) in candidate.tokens.iter().enumerate() {
            if i > 0 {
                match candidate.gaps.get(i - 1) {
                    Some(Gap::Adjacent) => buf.push(' '),
                    Some(Gap::Unbounded) | None => {
                        buf.push(' ');
                        buf.push_str(UNBOUNDED_GAP);
                        buf.push(' ');
                    }
                }
            }
            format_token(
                *identifier,
                conjuncts.get(identifier).map(Vec::as_slice).unwrap_or_default(),
                &labels,
                &mut buf,
            );
        }

        buf
    }
}

fn format_token(identifier: Identifier, conjuncts: &[Conjunct<'_>], labels: &Labels, buf: &mut String) {
    if let Some(label) = labels.get(&identifier) {
        buf.push_str(label);
        buf.push(':');
    }

    let precedence = if conjuncts.len() > 1 {
        Precedence::Negation
    } else {
        Precedence::Top
    };

    buf.push('[');
    for (i, conjunct) in conjuncts.iter().enumerate() {
        if i > 0 {
            buf.push_str(" & ");
        }
        match conjunct {
            Conjunct::Predicate(predicate) => format_predicate(predicate, precedence, labels, buf),
            Conjunct::Owned(predicate) => format_predicate(predicate, precedence, labels, buf),
            Conjunct::Dependent { governor } => {
                buf.push_str("dephead = ");
                format_label(*governor, labels, buf);
                buf.push_str(".ref");
            }
            Conjunct::Governor { dependent } => {
                format_label(*dependent, labels, buf);
                buf.push_str(".dephead = ref");
            }
        }
    }
    buf.push(']');
}

fn format_predicate(predicate: &Predicate, context: Precedence, labels: &Labels, buf: &mut String) {
    let precedence = Precedence::of(predicate);
    let parenthesize = precedence < context;
    if parenthesize {
        buf.push('(');
    }

    match predicate {
        Predicate::Conjunction(..) => format_junction(&predicate.conjuncts(), " & ", labels, buf),
        Predicate::Disjunction(..) => format_junction(&predicate.disjuncts(), " | ", labels, buf),
        Predicate::Negation(inner) => {
            buf.push('!');
            format_predicate(inner, Precedence::Atom, labels, buf);
        }
        Predicate::Presence(attribute) => format_attribute(attribute, labels, buf),
        Predicate::Absence(attribute) => {
            buf.push('!');
            format_attribute(attribute, labels, buf);
        }
        Predicate::Comparison(op, lhs, rhs) => {
            format_operand(lhs, labels, buf);
            buf.push_str(&format!(" {op} "));
            format_operand(rhs, labels, buf);
        }
    }

    if parenthesize {
        buf.push(')');
    }
}

/// Mixed junctions are always parenthesized.
fn format_junction(operands: &[&Predicate], operator: &str, labels: &Labels, buf: &mut String) {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            buf.push_str(operator);
        }
        format_predicate(operand, Precedence::Negation, labels, buf);
    }
}

fn format_operand(operand: &Operand, labels: &Labels, buf: &mut String) {
    match operand {
        Operand::Attribute(attribute) => format_attribute(attribute, labels, buf),
        Operand::Value(Value::Literal(value)) => format_string(&regex::escape(value), buf),
        Operand::Value(Value::Regex(value)) => format_string(value, buf),
        Operand::Value(Value::RegexIgnoreCase(value)) => {
            format_string(value, buf);
            buf.push_str("%c");
        }
    }
}

fn format_attribute(attribute: &Attribute, labels: &Labels, buf: &mut String) {
    if let Some(owner) = attribute.owner {
        format_label(owner, labels, buf);
        buf.push('.');
    }
    buf.push_str(&attribute.name);
}

fn format_label(identifier: Identifier, labels: &Labels, buf: &mut String) {
    match labels.get(&identifier) {
        Some(label) => buf.push_str(label),
        None => buf.push_str(&identifier.to_string()),
    }
}

fn format_string(value: &str, buf: &mut String) {
    buf.push('"');
    buf.push_str(&value.replace('"', "\\\""));
    buf.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Linearizer, OrderKind, OrderingModel, QueryBuilder};
    use rstest::rstest;

    fn literal(name: &str, value: &str) -> Predicate {
        Predicate::equal(Attribute::local(name), Value::Literal(value.to_string()))
    }

    fn emit(builder: QueryBuilder) -> String {
        let query = builder.build().unwrap();
        let placement = Placement::new(&query).unwrap();
        let linearizer = Linearizer::new(&OrderingModel::new(&query).unwrap()).unwrap();
        Emitter::new(&query, &placement)
            .emit_all(linearizer.candidates(), None)
            .unwrap()
    }

    #[test]
    fn test_two_token_dependency() {
        let mut builder = QueryBuilder::new();
        let a = builder.token(Some(literal("pos", "NOUN")));
        let b = builder.token(Some(literal("pos", "ADJ")));
        builder.dependency(a, b);

        assert_eq!(
            emit(builder),
            r#"a:[pos = "NOUN"] []* [pos = "ADJ" & dephead = a.ref] | a:[pos = "ADJ"] []* [pos = "NOUN" & a.dephead = ref]"#
        );
    }

    #[test]
    fn test_immediate_order_has_no_gap() {
        let mut builder = QueryBuilder::new();
        let a = builder.token(Some(literal("word", "New")));
        let b = builder.token(Some(literal("word", "York")));
        builder.order(a, b, OrderKind::Immediate);

        assert_eq!(emit(builder), r#"[word = "New"] [word = "York"]"#);
    }

    #[test]
    fn test_empty_token() {
        let mut builder = QueryBuilder::new();
        builder.token(None);

        assert_eq!(emit(builder), "[]");
    }

    #[test]
    fn test_deferred_predicate_refers_backwards() {
        let mut builder = QueryBuilder::new();
        let a = builder.token(None);
        let b = builder.token(None);
        builder
            .order(a, b, OrderKind::General)
            .predicate(Predicate::equal(Attribute::of(b, "lemma"), Attribute::of(a, "lemma")));

        assert_eq!(emit(builder), "a:[] []* [lemma = a.lemma]");
    }

    #[test]
    fn test_labels_follow_position() {
        let mut builder = QueryBuilder::new();
        let a = builder.token(None);
        let b = builder.token(None);
        let c = builder.token(None);
        builder
            .order(c, b, OrderKind::General)
            .order(b, a, OrderKind::General)
            .dependency(a, c)
            .dependency(a, b);

        assert_eq!(
            emit(builder),
            "a:[] []* b:[] []* [a.dephead = ref & b.dephead = ref]"
        );
    }

    #[rstest]
    #[case::literal(Value::Literal("3.5 (a)".to_string()), r#"[form = "3\.5 \(a\)"]"#)]
    #[case::quote(Value::Literal("\"".to_string()), r#"[form = "\""]"#)]
    #[case::regex(Value::Regex("colou?r".to_string()), r#"[form = "colou?r"]"#)]
    #[case::regex_ignore_case(Value::RegexIgnoreCase("the".to_string()), r#"[form = "the"%c]"#)]
    fn test_values(#[case] value: Value, #[case] expected: &str) {
        let mut builder = QueryBuilder::new();
        builder.token(Some(Predicate::equal(Attribute::local("form"), value)));

        assert_eq!(emit(builder), expected);
    }

    #[rstest]
    #[case::presence(Predicate::Presence(Attribute::local("feats")), "[feats]")]
    #[case::absence(Predicate::Absence(Attribute::local("feats")), "[!feats]")]
    #[case::not_equal(
        Predicate::not_equal(Attribute::local("pos"), Value::Literal("X".to_string())),
        r#"[pos != "X"]"#
    )]
    #[case::disjunction(
        Predicate::or(literal("pos", "A"), literal("pos", "B")),
        r#"[pos = "A" | pos = "B"]"#
    )]
    #[case::disjunction_in_conjunction(
        Predicate::and(Predicate::or(literal("pos", "A"), literal("pos", "B")), literal("lemma", "x")),
        r#"[(pos = "A" | pos = "B") & lemma = "x"]"#
    )]
    #[case::conjunction_in_disjunction(
        Predicate::or(Predicate::and(literal("pos", "A"), literal("lemma", "x")), literal("pos", "B")),
        r#"[(pos = "A" & lemma = "x") | pos = "B"]"#
    )]
    #[case::negated_comparison(Predicate::negate(literal("pos", "A")), r#"[!(pos = "A")]"#)]
    #[case::negated_conjunction(
        Predicate::negate(Predicate::and(literal("pos", "A"), literal("lemma", "x"))),
        r#"[!(pos = "A" & lemma = "x")]"#
    )]
    #[case::negated_presence(Predicate::negate(Predicate::Presence(Attribute::local("feats"))), "[!feats]")]
    #[case::negated_absence(Predicate::negate(Predicate::Absence(Attribute::local("feats"))), "[feats]")]
    #[case::double_negation(Predicate::negate(Predicate::negate(literal("pos", "A"))), r#"[pos = "A"]"#)]
    fn test_predicates(#[case] predicate: Predicate, #[case] expected: &str) {
        let mut builder = QueryBuilder::new();
        builder.token(Some(predicate));

        assert_eq!(emit(builder), expected);
    }

    #[rstest]
    #[case::exceeded(Some(5), None)]
    #[case::reached(Some(6), Some(6))]
    #[case::unlimited(None, Some(6))]
    fn test_candidate_limit(#[case] limit: Option<usize>, #[case] expected: Option<usize>) {
        let mut builder = QueryBuilder::new();
        for value in ["A", "B", "C"] {
            builder.token(Some(literal("pos", value)));
        }
        let query = builder.build().unwrap();
        let placement = Placement::new(&query).unwrap();
        let linearizer = Linearizer::new(&OrderingModel::new(&query).unwrap()).unwrap();
        let emitter = Emitter::new(&query, &placement);

        match (emitter.emit_all(linearizer.candidates(), limit), expected) {
            (Ok(pattern), Some(alternatives)) => assert_eq!(pattern.split(" | ").count(), alternatives),
            (Err(error), None) => assert_eq!(error, CompileError::CandidateLimitExceeded(5)),
            (result, _) => panic!("unexpected result {result:?}"),
        }
    }

    #[test]
    fn test_identical_alternatives_are_dropped() {
        let mut builder = QueryBuilder::new();
        for _ in 0..3 {
            builder.token(None);
        }

        assert_eq!(emit(builder), "[] []* [] []* []");
    }

    #[test]
    fn test_limit_counts_distinct_alternatives() {
        let mut builder = QueryBuilder::new();
        builder.token(Some(literal("pos", "DET")));
        builder.token(Some(literal("pos", "DET")));
        builder.token(Some(literal("pos", "NOUN")));
        let query = builder.build().unwrap();
        let placement = Placement::new(&query).unwrap();
        let linearizer = Linearizer::new(&OrderingModel::new(&query).unwrap()).unwrap();
        let emitter = Emitter::new(&query, &placement);

        assert_eq!(
            emitter.emit_all(linearizer.candidates(), Some(3)).unwrap(),
            [
                r#"[pos = "DET"] []* [pos = "DET"] []* [pos = "NOUN"]"#,
                r#"[pos = "DET"] []* [pos = "NOUN"] []* [pos = "DET"]"#,
                r#"[pos = "NOUN"] []* [pos = "DET"] []* [pos = "DET"]"#,
            ]
            .join(" | ")
        );
        assert_eq!(
            emitter.emit_all(linearizer.candidates(), Some(2)),
            Err(CompileError::CandidateLimitExceeded(2))
        );
    }
}
