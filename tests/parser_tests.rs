// tests/parser_tests.rs

use tansy_lang::parser::{ParseError, parse_expression};
use tansy_lang::Expression;

fn compile(input: &str) -> String {
    parse_expression(input).unwrap().to_string()
}

// ============================================================================
// Operator Precedence
// ============================================================================

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    assert_eq!(compile("1 + 2 * 3"), "ADD(1, MULTIPLY(2, 3))");
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(compile("1 - 2 - 3"), "SUBTRACT(SUBTRACT(1, 2), 3)");
    assert_eq!(compile(".a - 1"), "SUBTRACT(.a, 1)");
}

#[test]
fn test_union_binds_tighter_than_pipe() {
    assert_eq!(compile(".a, .b | .c"), "PIPE(UNION(.a, .b), .c)");
}

#[test]
fn test_assignment_binds_tighter_than_pipe() {
    assert_eq!(compile(".a = .b | .c"), "PIPE(ASSIGN(.a, .b), .c)");
}

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(compile(".a and .b or .c"), "OR(AND(.a, .b), .c)");
}

#[test]
fn test_path_chain_is_left_associative() {
    assert_eq!(compile(".a.b.c"), "SHORT_PIPE(SHORT_PIPE(.a, .b), .c)");
}

// ============================================================================
// Collections and indexing
// ============================================================================

#[test]
fn test_collect() {
    assert_eq!(compile("[1, 2]"), "SHORT_PIPE(UNION(1, 2), COLLECT)");
    assert_eq!(compile("[]"), "SHORT_PIPE(EMPTY, COLLECT)");
}

#[test]
fn test_collect_object() {
    assert_eq!(compile("{}"), "SHORT_PIPE(EMPTY, COLLECT_OBJECT)");
    assert_eq!(
        compile("{a: 1}"),
        "SHORT_PIPE(CREATE_MAP(\"a\", 1), COLLECT_OBJECT)"
    );
}

#[test]
fn test_indexing() {
    assert_eq!(compile(".a[0]"), "TRAVERSE_ARRAY(.a, SHORT_PIPE(0, COLLECT))");
    assert_eq!(compile(".[]"), "TRAVERSE_ARRAY(SELF, SHORT_PIPE(EMPTY, COLLECT))");
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_function_operand_on_the_right() {
    assert_eq!(compile("select(.a == 1)"), "SELECT(_, EQUALS(.a, 1))");
    assert_eq!(compile("select(.a) | .b"), "PIPE(SELECT(_, .a), .b)");
    assert_eq!(compile("first(.a == \"cat\")"), "FIRST_MATCHING(_, EQUALS(.a, \"cat\"))");
}

#[test]
fn test_block_arguments() {
    assert_eq!(compile("sub(\"a\"; \"b\")"), "SUBSTITUTE(_, BLOCK(\"a\", \"b\"))");
    assert_eq!(compile("with(.a; . = 1)"), "WITH(_, BLOCK(.a, ASSIGN(SELF, 1)))");
}

#[test]
fn test_reduce() {
    assert_eq!(
        compile("reduce .[] as $x (0; . + $x)"),
        "REDUCE(ASSIGN_VARIABLE(TRAVERSE_ARRAY(SELF, SHORT_PIPE(EMPTY, COLLECT)), $x), BLOCK(0, ADD(SELF, $x)))"
    );
}

#[test]
fn test_leaves() {
    assert_eq!(compile(".a | not"), "PIPE(.a, NOT)");
    assert_eq!(compile(".a // \"d\""), "ALTERNATIVE(.a, \"d\")");
    assert_eq!(compile(".a *+ .b"), "MULTIPLY(.a, .b)");
    assert_eq!(compile("-1"), "-1");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unclosed_collect() {
    assert_eq!(parse_expression("[1,2").unwrap_err(), ParseError::MissingBracket(']'));
    assert_eq!(
        ParseError::MissingBracket(']').to_string(),
        "Bad expression, could not find matching `]`"
    );
}

#[test]
fn test_mismatched_brackets() {
    assert_eq!(parse_expression(")").unwrap_err(), ParseError::MissingBracket('('));
    assert_eq!(parse_expression("{a: 1]").unwrap_err(), ParseError::MissingBracket('}'));
}

#[test]
fn test_missing_operand() {
    assert_eq!(
        parse_expression("1 +").unwrap_err(),
        ParseError::Arity("'ADD' expects 2 args but there is 1".to_string())
    );
}

#[test]
fn test_lex_errors_surface() {
    assert!(matches!(parse_expression("\"abc"), Err(ParseError::Lex(_))));
}

// ============================================================================
// Compiled expressions
// ============================================================================

#[test]
fn test_compilation_is_deterministic() {
    let source = ".a[] | select(.b == \"x\") | {name: .c, tags: [.d[]]}";
    let first = parse_expression(source).unwrap();
    let second = parse_expression(source).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.source(), source);
    assert!(!first.is_identity());
}

#[test]
fn test_expressions_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Expression>();
}
