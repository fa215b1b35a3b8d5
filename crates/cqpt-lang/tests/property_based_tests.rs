//! Property-based tests for candidate enumeration and predicate placement.
use cqpt_lang::{
    Attribute, Compiler, Gap, Identifier, Linearizer, OrderKind, OrderingModel, Placement, Predicate, Query,
    QueryBuilder, Value,
};
use itertools::Itertools;
use proptest::prelude::*;
use rustc_hash::FxHashSet;

/// Shape of a generated query. Order constraints are drawn from a hidden
/// token order, so they never contradict each other.
#[derive(Debug, Clone)]
struct QueryShape {
    tokens: usize,
    hidden_order: Vec<usize>,
    parents: Vec<Option<usize>>,
    constraints: Vec<(usize, usize, bool)>,
}

mod strategies {
    use super::*;

    pub fn query_shape() -> impl Strategy<Value = QueryShape> {
        (1usize..=5).prop_flat_map(|tokens| {
            (
                Just((0..tokens).collect::<Vec<_>>()).prop_shuffle(),
                proptest::collection::vec(proptest::option::of(0usize..100), tokens),
                proptest::collection::vec((0..tokens, 0..tokens, any::<bool>()), 0..4),
            )
                .prop_map(move |(hidden_order, parents, constraints)| QueryShape {
                    tokens,
                    hidden_order,
                    parents: parents
                        .into_iter()
                        .enumerate()
                        .map(|(i, parent)| parent.filter(|_| i > 0).map(|seed| seed % i.max(1)))
                        .collect(),
                    constraints,
                })
        })
    }
}

fn pos(i: usize) -> Predicate {
    Predicate::equal(Attribute::local("pos"), Value::Literal(format!("T{i}")))
}

fn build(shape: &QueryShape) -> (Query, Vec<Identifier>) {
    let mut builder = QueryBuilder::new();
    let ids = (0..shape.tokens).map(|i| builder.token(Some(pos(i)))).collect::<Vec<_>>();

    for (i, parent) in shape.parents.iter().enumerate() {
        if let Some(parent) = parent {
            builder.dependency(ids[*parent], ids[i]);
        }
    }

    for (x, y, immediate) in &shape.constraints {
        let (lo, hi) = (*x.min(y), *x.max(y));
        if lo == hi {
            continue;
        }
        let kind = if *immediate && hi == lo + 1 {
            OrderKind::Immediate
        } else {
            OrderKind::General
        };
        builder.order(ids[shape.hidden_order[lo]], ids[shape.hidden_order[hi]], kind);
    }

    (builder.build().unwrap(), ids)
}

fn satisfies(query: &Query, order: &[Identifier]) -> bool {
    let position = |id: Identifier| order.iter().position(|token| *token == id);
    query.constraints().iter().all(|constraint| {
        match (position(constraint.before), position(constraint.after)) {
            (Some(before), Some(after)) => match constraint.kind {
                OrderKind::Immediate => after == before + 1,
                OrderKind::General => before < after,
            },
            _ => false,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn translation_is_deterministic(shape in strategies::query_shape()) {
        let (query, _) = build(&shape);
        let compiler = Compiler::default();
        prop_assert_eq!(compiler.compile(&query).unwrap(), compiler.compile(&query).unwrap());
    }

    #[test]
    fn candidates_are_exactly_the_valid_orders(shape in strategies::query_shape()) {
        let (query, ids) = build(&shape);
        let linearizer = Linearizer::new(&OrderingModel::new(&query).unwrap()).unwrap();

        let candidates = linearizer
            .candidates()
            .map(|candidate| candidate.tokens)
            .collect::<Vec<_>>();
        let unique = candidates.iter().cloned().collect::<FxHashSet<_>>();
        prop_assert_eq!(unique.len(), candidates.len());

        let expected = ids
            .iter()
            .copied()
            .permutations(ids.len())
            .filter(|order| satisfies(&query, order))
            .collect::<FxHashSet<_>>();
        prop_assert_eq!(&unique, &expected);
        prop_assert_eq!(linearizer.count(), expected.len());
    }

    #[test]
    fn gaps_follow_immediate_constraints(shape in strategies::query_shape()) {
        let (query, _) = build(&shape);
        let linearizer = Linearizer::new(&OrderingModel::new(&query).unwrap()).unwrap();

        let immediate = query
            .constraints()
            .iter()
            .filter(|constraint| constraint.kind == OrderKind::Immediate)
            .map(|constraint| (constraint.before, constraint.after))
            .collect::<FxHashSet<_>>();

        for candidate in linearizer.candidates() {
            prop_assert_eq!(candidate.gaps.len() + 1, candidate.tokens.len());
            for (i, gap) in candidate.gaps.iter().enumerate() {
                let pair = (candidate.tokens[i], candidate.tokens[i + 1]);
                let expected = if immediate.contains(&pair) { Gap::Adjacent } else { Gap::Unbounded };
                prop_assert_eq!(*gap, expected);
            }
        }
    }

    #[test]
    fn references_point_backwards(shape in strategies::query_shape()) {
        let (query, _) = build(&shape);
        let pattern = Compiler::default().compile(&query).unwrap();

        for alternative in pattern.split(" | ") {
            let mut defined = FxHashSet::default();
            for token in alternative.split(' ').filter(|token| *token != "[]*") {
                if let Some((label, _)) = token.split_once(":[") {
                    defined.insert(label.to_string());
                }
            }
            let references = alternative
                .match_indices(".ref")
                .chain(alternative.match_indices(".dephead"))
                .map(|(i, _)| &alternative[..i]);
            for reference in references {
                let label = reference.rsplit(['[', ' ']).next().unwrap_or_default();
                prop_assert!(defined.contains(label), "{} in {}", label, alternative);
                let definition = alternative.find(&format!("{label}:[")).unwrap();
                prop_assert!(definition < reference.len());
            }
        }
    }

    #[test]
    fn placement_ignores_declaration_form(value in "[a-zA-Z.*]{1,8}", floating in any::<bool>()) {
        let predicate = Predicate::and(
            Predicate::equal(Attribute::local("lemma"), Value::Literal(value.clone())),
            Predicate::Presence(Attribute::local("feats")),
        );

        let mut declared = QueryBuilder::new();
        let a = declared.identifier();
        declared.declare(a, Some(predicate.clone()));

        let mut moved = QueryBuilder::new();
        let b = moved.identifier();
        if floating {
            moved.declare(b, None).predicate(predicate.raise_onto(b));
        } else {
            moved.declare(b, Some(predicate.clone()));
        }
        prop_assert_eq!(a, b);

        let declared = Placement::new(&declared.build().unwrap()).unwrap();
        let moved = Placement::new(&moved.build().unwrap()).unwrap();
        prop_assert_eq!(declared.predicate(a), moved.predicate(b));
        prop_assert_eq!(declared.predicate(a), Some(&predicate));
    }
}
