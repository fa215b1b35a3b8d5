use cqpt_lang::{
    Attribute, CompileError, CompileOptions, Compiler, InnerError, OrderKind, Predicate, QueryBuilder, Registry,
    TranslateError, Value,
};
use rstest::{fixture, rstest};

#[fixture]
fn registry() -> Registry {
    Registry::default()
}

fn pos(value: &str) -> Predicate {
    Predicate::equal(Attribute::local("pos"), Value::Literal(value.to_string()))
}

#[rstest]
#[case::noun_with_adjective(
    r#"{
        "tokens": [
            {"name": "n", "where": {"eq": [{"attr": "pos"}, {"literal": "NOUN"}]}},
            {"name": "a", "where": {"eq": [{"attr": "pos"}, {"literal": "ADJ"}]}}
        ],
        "dependencies": [{"governor": "n", "dependent": "a"}]
    }"#,
    Ok(r#"a:[pos = "NOUN"] []* [pos = "ADJ" & dephead = a.ref] | a:[pos = "ADJ"] []* [pos = "NOUN" & a.dephead = ref]"#.to_string())
)]
#[case::immediate_order(
    r#"{
        "tokens": [
            {"name": "x", "where": {"eq": [{"attr": "word"}, {"literal": "New"}]}},
            {"name": "y", "where": {"eq": [{"attr": "word"}, {"literal": "York"}]}}
        ],
        "order": [{"before": "x", "after": "y", "immediate": true}]
    }"#,
    Ok(r#"[word = "New"] [word = "York"]"#.to_string())
)]
#[case::general_order_with_dependency(
    r#"{
        "tokens": [{"name": "v", "where": {"eq": [{"attr": "pos"}, {"literal": "VERB"}]}}],
        "dependencies": [{"governor": "v", "dependent": "s"}],
        "predicates": [{"eq": [{"attr": "deprel", "of": "s"}, {"literal": "nsubj"}]}],
        "order": [{"before": "s", "after": "v"}]
    }"#,
    Ok(r#"a:[deprel = "nsubj"] []* [pos = "VERB" & a.dephead = ref]"#.to_string())
)]
#[case::cross_token_predicate(
    r#"{
        "tokens": [{"name": "a"}, {"name": "b"}],
        "predicates": [{"eq": [{"attr": "lemma", "of": "a"}, {"attr": "lemma", "of": "b"}]}]
    }"#,
    Ok("a:[] []* [a.lemma = lemma] | a:[] []* [lemma = a.lemma]".to_string())
)]
#[case::case_insensitive_regex(
    r#"{"tokens": [{"name": "a", "where": {"or": [
        {"eq": [{"attr": "word"}, {"regex": "colou?r", "ignore_case": true}]},
        {"missing": {"attr": "lemma"}}
    ]}}]}"#,
    Ok(r#"[word = "colou?r"%c | !lemma]"#.to_string())
)]
#[case::identical_alternatives(
    r#"{"tokens": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}"#,
    Ok("[] []* [] []* []".to_string())
)]
#[case::order_cycle(
    r#"{
        "tokens": [{"name": "a"}, {"name": "b"}],
        "order": [{"before": "a", "after": "b"}, {"before": "b", "after": "a"}]
    }"#,
    Err("CompileError::InconsistentOrdering")
)]
#[case::unknown_identifier(
    r#"{
        "tokens": [{"name": "a"}],
        "predicates": [{"eq": [{"attr": "lemma", "of": "a"}, {"attr": "lemma", "of": "ghost"}]}]
    }"#,
    Err("CompileError::UnknownIdentifier")
)]
#[case::parse_error(r#"{"tokens": [}"#, Err("FrontendError::ParsingFailed"))]
#[case::not_supported(r#"{"tokens": [{"name": "a", "where": {"and": []}}]}"#, Err("FrontendError::NotSupported"))]
fn test_translate_input(
    registry: Registry,
    #[case] input: &str,
    #[case] expected: Result<String, &'static str>,
) {
    use miette::Diagnostic;

    let result = cqpt_lang::translate_input(&registry, input, Some("json"), &CompileOptions::default());
    match expected {
        Ok(pattern) => assert_eq!(result.unwrap(), pattern),
        Err(code) => {
            let error = result.unwrap_err();
            assert_eq!(error.code().map(|c| c.to_string()), Some(code.to_string()));
        }
    }
}

#[rstest]
fn test_guess_frontend(registry: Registry) {
    let input = r#"{"tokens": [{"name": "a"}]}"#;
    assert_eq!(
        cqpt_lang::translate_input(&registry, input, None, &CompileOptions::default()).unwrap(),
        "[]"
    );

    let error = cqpt_lang::translate_input(&registry, "[word=\"a\"]", None, &CompileOptions::default()).unwrap_err();
    assert_eq!(error.cause, InnerError::Translate(TranslateError::UnableToGuess(vec![])));
}

#[rstest]
fn test_parse_error_has_label(registry: Registry) {
    use miette::Diagnostic;

    let error = cqpt_lang::translate_input(&registry, "{\n  \"tokens\": [}", None, &CompileOptions::default())
        .unwrap_err();
    assert!(matches!(error.cause, InnerError::Translate(_)));
    let error = cqpt_lang::translate_input(&registry, "{\n  \"tokens\": [}", Some("json"), &CompileOptions::default())
        .unwrap_err();
    assert!(error.location.is_some());
    assert_eq!(error.labels().map(|labels| labels.count()), Some(1));
}

#[test]
fn test_unconstrained_symmetry() {
    let mut builder = QueryBuilder::new();
    let a = builder.token(Some(pos("NOUN")));
    let b = builder.token(Some(pos("ADJ")));
    builder.dependency(b, a);

    let pattern = cqpt_lang::translate(&builder.build().unwrap()).unwrap();
    let alternatives = pattern.split(" | ").collect::<Vec<_>>();
    assert_eq!(alternatives.len(), 2);
    assert!(alternatives[0].starts_with(r#"a:[pos = "NOUN"]"#));
    assert!(alternatives[1].starts_with(r#"a:[pos = "ADJ"]"#));
}

#[test]
fn test_immediate_constraint_never_reversed() {
    let mut builder = QueryBuilder::new();
    let a = builder.token(Some(pos("DET")));
    let b = builder.token(Some(pos("NOUN")));
    let c = builder.token(Some(pos("VERB")));
    builder.order(a, b, OrderKind::Immediate).dependency(c, b);

    let pattern = cqpt_lang::translate(&builder.build().unwrap()).unwrap();
    for alternative in pattern.split(" | ") {
        assert!(alternative.contains(r#"[pos = "DET"] "#), "{alternative}");
        assert!(!alternative.contains(r#"[pos = "DET"] []*"#), "{alternative}");
    }
}

#[test]
fn test_order_cycle_produces_no_output() {
    let mut builder = QueryBuilder::new();
    let a = builder.token(None);
    let b = builder.token(None);
    builder.order(a, b, OrderKind::General).order(b, a, OrderKind::General);

    assert!(matches!(
        cqpt_lang::translate(&builder.build().unwrap()),
        Err(CompileError::InconsistentOrdering(constraints)) if constraints.len() == 2
    ));
}

#[test]
fn test_translation_is_deterministic() {
    let build = || {
        let mut builder = QueryBuilder::new();
        let a = builder.token(Some(pos("NOUN")));
        let b = builder.token(Some(pos("ADJ")));
        let c = builder.token(None);
        builder
            .dependency(a, b)
            .dependency(a, c)
            .predicate(Predicate::not_equal(Attribute::of(b, "lemma"), Attribute::of(c, "lemma")));
        builder.build().unwrap()
    };

    let compiler = Compiler::new(CompileOptions {
        span: Some("s".into()),
        ..Default::default()
    });
    assert_eq!(compiler.compile(&build()).unwrap(), compiler.compile(&build()).unwrap());
}
