// Behavioural guarantees of the query language: worked scenarios, the
// cardinality and idempotence laws, the array merge matrix, alias cycles
// and document streams.

use serde_json::{Value, json};
use tansy_lang::ast::preferences::ArrayMergePolicy;
use tansy_lang::merge::{MergeOptions, merge};
use tansy_lang::{
    Arena, Config, EvalError, Evaluator, JsonDecoder, JsonPrinter, Kind, ParseError, from_json,
    parse_expression, pipeline, to_json,
};

fn eval_expr(expression: &str, input: Value) -> Result<Vec<Value>, EvalError> {
    let expr = parse_expression(expression).map_err(EvalError::Syntax)?;
    let mut evaluator = Evaluator::new(Config::default());
    let document = from_json(evaluator.arena_mut(), &input);
    let results = evaluator.evaluate(&expr, &[document])?;
    Ok(results.iter().map(|id| to_json(evaluator.arena(), *id)).collect())
}

fn eval_one(expression: &str, input: Value) -> Value {
    let mut results = eval_expr(expression, input).unwrap();
    assert_eq!(results.len(), 1, "expected one result for {}", expression);
    results.remove(0)
}

fn eval_stream(expression: &str, input: &str, together: bool) -> String {
    pipeline::run(
        expression,
        input,
        &JsonDecoder::new(),
        &JsonPrinter::new(false),
        Config::default(),
        together,
    )
    .unwrap()
}

// ============================================================================
// Section: Worked scenarios
// ============================================================================

#[test]
fn test_concatenate_arrays() {
    assert_eq!(
        eval_one(".a + .b", json!({"a": [1, 2], "b": [3, 4]})),
        json!([1, 2, 3, 4])
    );
}

#[test]
fn test_assign_from_own_sum() {
    assert_eq!(
        eval_one(".a = .a + .b", json!({"a": 3, "b": 4})),
        json!({"a": 7, "b": 4})
    );
}

#[test]
fn test_first_matching_element() {
    let doc = json!([{"a": "dog"}, {"a": "cat"}, {"a": "cat", "b": 1}]);
    assert_eq!(eval_one("first(.a == \"cat\")", doc), json!({"a": "cat"}));
}

#[test]
fn test_unique_keeps_first_seen_order() {
    assert_eq!(eval_one("unique", json!([2, 1, 3, 2])), json!([2, 1, 3]));
}

#[test]
fn test_delete_by_glob() {
    let doc = json!({"a": "cat", "b": "dog", "c": "bat"});
    assert_eq!(
        eval_one("del(.[] | select(. == \"*at\"))", doc),
        json!({"b": "dog"})
    );
}

#[test]
fn test_unclosed_bracket_is_reported() {
    assert_eq!(parse_expression("[1,2").unwrap_err(), ParseError::MissingBracket(']'));
}

// ============================================================================
// Section: Laws
// ============================================================================

#[test]
fn test_binary_operators_cross_left_outer() {
    let doc = json!({"a": [1, 2, 3], "b": [10, 20]});
    let results = eval_expr(".a[] + .b[]", doc).unwrap();
    assert_eq!(results.len(), 6);
    assert_eq!(
        results,
        vec![json!(11), json!(21), json!(12), json!(22), json!(13), json!(23)]
    );
}

#[test]
fn test_empty_constructors_still_produce_a_value() {
    assert_eq!(eval_expr("[]", json!({"a": 1})).unwrap(), vec![json!([])]);
    assert_eq!(eval_expr("{}", json!({"a": 1})).unwrap(), vec![json!({})]);
}

#[test]
fn test_object_cardinality_is_a_product() {
    let results = eval_expr("{\"a\": (1, 2), \"b\": (3, 4, 5)}", json!(null)).unwrap();
    assert_eq!(results.len(), 6);
    assert_eq!(results[0], json!({"a": 1, "b": 3}));
    assert_eq!(results[5], json!({"a": 2, "b": 5}));
}

#[test]
fn test_assignment_is_idempotent() {
    let once = eval_one(".a.b.c = 1", json!(null));
    assert_eq!(once, json!({"a": {"b": {"c": 1}}}));
    let twice = eval_one(".a.b.c = 1", once.clone());
    assert_eq!(twice, once);
}

#[test]
fn test_reading_inside_select_is_side_effect_free() {
    let doc = json!({"a": 1});
    assert_eq!(eval_one("select(.x.y | not) // . | keys", doc), json!(["a"]));
}

#[test]
fn test_plain_reads_leave_the_input_alone() {
    assert_eq!(eval_expr(".[5], .", json!([1, 2, 3])).unwrap(), vec![json!([1, 2, 3])]);
    assert_eq!(eval_expr(".missing, .", json!({"b": 1})).unwrap(), vec![json!({"b": 1})]);
    assert_eq!(eval_expr(".a + .b, .", json!({})).unwrap(), vec![json!({})]);
    assert_eq!(eval_expr(".a.b, .", json!(null)).unwrap(), vec![json!(null)]);
}

#[test]
fn test_write_targets_still_create_structure() {
    assert_eq!(eval_one(".[2] = 1", json!([0])), json!([0, null, 1]));
    assert_eq!(eval_one(".b.c |= 5", json!({"a": 1})), json!({"a": 1, "b": {"c": 5}}));
    assert!(matches!(
        eval_expr(".[9223372036854775807] = 1", json!([])),
        Err(EvalError::TypeError(_))
    ));
}

#[test]
fn test_pipeline_is_associative() {
    let doc = json!({"a": {"b": {"c": 5}}});
    assert_eq!(eval_one("(.a | .b) | .c", doc.clone()), json!(5));
    assert_eq!(eval_one(".a | (.b | .c)", doc), json!(5));
}

#[test]
fn test_division_prints_nearest_float() {
    assert_eq!(eval_stream("1 / 3", "null", false), "0.3333333333333333");
    assert_eq!(eval_stream(".x / 3", "{\"x\": 2}", false), "0.6666666666666666");
    assert_eq!(eval_stream("7.5 / 2.5", "null", false), "3");
}

#[test]
fn test_string_repeat_is_bounded() {
    assert_eq!(eval_one("\"ab\" * 2", json!(null)), json!("abab"));
    assert!(matches!(
        eval_expr("\"x\" * 100000000000", json!(null)),
        Err(EvalError::TypeError(_))
    ));
}

#[test]
fn test_object_literal_errors_name_no_path() {
    match eval_expr("{\"a\": 1} + 3", json!(null)) {
        Err(EvalError::TypeError(message)) => {
            assert!(message.contains("!!map"), "{}", message);
            assert!(!message.contains("[0]"), "{}", message);
        }
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Section: Array merge policies
// ============================================================================

#[test]
fn test_merge_matrix_through_expressions() {
    let doc = json!({"a": {"list": [1, 2]}, "b": {"list": [3, 4]}});
    assert_eq!(eval_one(".a * .b | .list", doc.clone()), json!([3, 4]));
    assert_eq!(eval_one(".a *d .b | .list", doc.clone()), json!([3, 4]));
    assert_eq!(eval_one(".a *+ .b | .list", doc), json!([1, 2, 3, 4]));
}

#[test]
fn test_update_policy_keeps_longer_tail() {
    let doc = json!({"a": {"list": [1, 2, 5]}, "b": {"list": [3, 4]}});
    assert_eq!(eval_one(".a *d .b | .list", doc.clone()), json!([3, 4, 5]));
    assert_eq!(eval_one(".a * .b | .list", doc), json!([3, 4]));
}

#[test]
fn test_merge_matrix_through_library() {
    let cases = [
        (ArrayMergePolicy::Update, json!([3, 4])),
        (ArrayMergePolicy::Overwrite, json!([3, 4])),
        (ArrayMergePolicy::Append, json!([1, 2, 3, 4])),
    ];
    for (arrays, expected) in cases {
        let mut arena = Arena::new();
        let left = from_json(&mut arena, &json!({"list": [1, 2], "keep": true}));
        let right = from_json(&mut arena, &json!({"list": [3, 4]}));
        let options = MergeOptions {
            arrays,
            ..MergeOptions::default()
        };
        let merged = merge(&mut arena, left, right, &options).unwrap();
        let result = to_json(&arena, merged);
        assert_eq!(result["list"], expected, "policy {:?}", arrays);
        assert_eq!(result["keep"], json!(true));
    }
}

// ============================================================================
// Section: Aliases
// ============================================================================

fn self_referencing_document() -> (Evaluator, tansy_lang::NodeId) {
    let mut arena = Arena::new();
    let root = arena.new_mapping();
    arena.get_mut(root).anchor = "root".to_string();
    let key = arena.new_str("self");
    let alias = arena.new_alias(root);
    arena.push_entry(root, key, alias);
    (Evaluator::with_arena(arena, Config::default()), root)
}

#[test]
fn test_recursive_descent_stops_at_alias_cycle() {
    let (mut evaluator, root) = self_referencing_document();
    let expr = parse_expression("..").unwrap();
    let results = evaluator.evaluate(&expr, &[root]).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], root);
    assert_eq!(evaluator.arena().get(results[1]).kind, Kind::Alias);
}

#[test]
fn test_cyclic_alias_prints_by_name() {
    let (evaluator, root) = self_referencing_document();
    assert_eq!(to_json(evaluator.arena(), root), json!({"self": "*root"}));
}

#[test]
fn test_explode_rejects_cycle() {
    let (mut evaluator, root) = self_referencing_document();
    let expr = parse_expression("explode(.)").unwrap();
    assert!(matches!(
        evaluator.evaluate(&expr, &[root]),
        Err(EvalError::TypeError(_))
    ));
}

// ============================================================================
// Section: Document streams
// ============================================================================

#[test]
fn test_documents_are_evaluated_separately() {
    assert_eq!(eval_stream(".a", "{\"a\": 1} {\"a\": 2}", false), "1\n2");
    assert_eq!(eval_stream("document_index", "{} {} {}", false), "0\n1\n2");
}

#[test]
fn test_documents_evaluated_together() {
    assert_eq!(
        eval_stream("select(di == 0) * select(di == 1)", "{\"a\": 1} {\"b\": 2}", true),
        "{\"a\":1,\"b\":2}"
    );
    assert_eq!(eval_stream("[.] | length", "1 2 3", true), "3");
}

#[test]
fn test_empty_stream_is_one_null_document() {
    assert_eq!(eval_stream(".", "", false), "null");
}

// ============================================================================
// Section: Compilation
// ============================================================================

#[test]
fn test_compiled_tree_is_deterministic() {
    let source = ".a[] | select(.b == \"x\") | .c |= . + 1";
    let first = parse_expression(source).unwrap();
    let second = parse_expression(source).unwrap();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first, second);
}

#[test]
fn test_compiled_expression_is_reusable() {
    let expr = parse_expression(".n * 2").unwrap();
    let mut evaluator = Evaluator::new(Config::default());
    for n in [1, 2, 3] {
        let input = from_json(evaluator.arena_mut(), &json!({"n": n}));
        let results = evaluator.evaluate(&expr, &[input]).unwrap();
        assert_eq!(to_json(evaluator.arena(), results[0]), json!(n * 2));
    }
}
