#![no_main]

use arbitrary::Arbitrary;
use cqpt_lang::{
    Attribute, CompileOptions, Compiler, Identifier, OrderKind, Predicate, QueryBuilder, Registry, Value,
};
use itertools::Itertools;
use libfuzzer_sys::fuzz_target;

const MAX_TOKENS: usize = 6;
const CANDIDATE_LIMIT: usize = 720;

#[derive(Debug, Clone, Arbitrary)]
enum Leaf {
    Present(Option<u8>, String),
    Missing(Option<u8>, String),
    Literal(Option<u8>, String, String),
    Regex(Option<u8>, String, String, bool),
    Cross(Option<u8>, String, Option<u8>, String, bool),
}

#[derive(Debug, Clone, Arbitrary)]
enum Expr {
    Leaf(Leaf),
    Not(Leaf),
    And(Leaf, Leaf),
    Or(Leaf, Leaf),
}

#[derive(Debug, Clone, Arbitrary)]
struct ArbitraryQuery {
    tokens: Vec<Option<Expr>>,
    dependencies: Vec<(u8, u8)>,
    order: Vec<(u8, u8, bool)>,
    floating: Vec<Expr>,
}

impl ArbitraryQuery {
    fn attribute(ids: &[Identifier], owner: Option<u8>, name: &str) -> Attribute {
        match owner {
            Some(owner) => Attribute::of(ids[owner as usize % ids.len()], name),
            None => Attribute::local(name),
        }
    }

    fn leaf(ids: &[Identifier], leaf: &Leaf) -> Predicate {
        match leaf {
            Leaf::Present(owner, name) => Predicate::Presence(Self::attribute(ids, *owner, name)),
            Leaf::Missing(owner, name) => Predicate::Absence(Self::attribute(ids, *owner, name)),
            Leaf::Literal(owner, name, value) => {
                Predicate::equal(Self::attribute(ids, *owner, name), Value::Literal(value.clone()))
            }
            Leaf::Regex(owner, name, pattern, ignore_case) => {
                let value = if *ignore_case {
                    Value::RegexIgnoreCase(pattern.clone())
                } else {
                    Value::Regex(pattern.clone())
                };
                Predicate::not_equal(Self::attribute(ids, *owner, name), value)
            }
            Leaf::Cross(lhs, lhs_name, rhs, rhs_name, equal) => {
                let lhs = Self::attribute(ids, *lhs, lhs_name);
                let rhs = Self::attribute(ids, *rhs, rhs_name);
                if *equal {
                    Predicate::equal(lhs, rhs)
                } else {
                    Predicate::not_equal(lhs, rhs)
                }
            }
        }
    }

    fn expr(ids: &[Identifier], expr: &Expr) -> Predicate {
        match expr {
            Expr::Leaf(leaf) => Self::leaf(ids, leaf),
            Expr::Not(leaf) => Predicate::negate(Self::leaf(ids, leaf)),
            Expr::And(lhs, rhs) => Predicate::and(Self::leaf(ids, lhs), Self::leaf(ids, rhs)),
            Expr::Or(lhs, rhs) => Predicate::or(Self::leaf(ids, lhs), Self::leaf(ids, rhs)),
        }
    }

    fn build(&self) -> Option<cqpt_lang::Query> {
        let count = self.tokens.len().clamp(1, MAX_TOKENS);
        let mut builder = QueryBuilder::new();
        let ids = (0..count).map(|_| builder.identifier()).collect_vec();

        for (i, id) in ids.iter().enumerate() {
            let predicate = self
                .tokens
                .get(i)
                .and_then(|expr| expr.as_ref())
                .map(|expr| Self::expr(&ids, expr));
            builder.declare(*id, predicate);
        }
        for (governor, dependent) in &self.dependencies {
            builder.dependency(ids[*governor as usize % count], ids[*dependent as usize % count]);
        }
        for (before, after, immediate) in &self.order {
            let kind = if *immediate {
                OrderKind::Immediate
            } else {
                OrderKind::General
            };
            builder.order(ids[*before as usize % count], ids[*after as usize % count], kind);
        }
        for expr in &self.floating {
            builder.predicate(Self::expr(&ids, expr));
        }

        builder.build().ok()
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct Context {
    raw_input: Option<String>,
    query: Option<ArbitraryQuery>,
}

fuzz_target!(|context: Context| {
    let options = CompileOptions {
        candidate_limit: Some(CANDIDATE_LIMIT),
        span: None,
    };

    if let Some(input) = &context.raw_input {
        let _ = cqpt_lang::translate_input(&Registry::default(), input, None, &options);
    }

    if let Some(query) = context.query.as_ref().and_then(ArbitraryQuery::build) {
        let _ = Compiler::new(options).compile(&query);
    }
});
