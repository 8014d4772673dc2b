// tests/lexer_tests.rs

use tansy_lang::ast::preferences::Prefs;
use tansy_lang::ast::tokens::TokenKind;
use tansy_lang::lexer::{Lexer, describe_tokens, tokenize};

fn scan(input: &str) -> String {
    describe_tokens(&tokenize(input).unwrap())
}

// ============================================================================
// Symbols
// ============================================================================

#[test]
fn test_single_char_operators() {
    let test_cases = vec![
        (". | .", "SELF PIPE SELF"),
        (". , .", "SELF UNION SELF"),
        (". + .", "SELF ADD SELF"),
        (". - .", "SELF SUBTRACT SELF"),
        (". * .", "SELF MULTIPLY SELF"),
        (". / .", "SELF DIVIDE SELF"),
        (". % .", "SELF MODULO SELF"),
        (". < .", "SELF COMPARE SELF"),
        (". > .", "SELF COMPARE SELF"),
        (". = .", "SELF ASSIGN SELF"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(scan(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_two_char_operators() {
    let test_cases = vec![
        (".a += 1", "TRAVERSE_PATH(a) ADD_ASSIGN VALUE(1)"),
        (".a -= 1", "TRAVERSE_PATH(a) SUBTRACT_ASSIGN VALUE(1)"),
        (".a *= 1", "TRAVERSE_PATH(a) MULTIPLY_ASSIGN VALUE(1)"),
        (".a /= 1", "TRAVERSE_PATH(a) DIVIDE_ASSIGN VALUE(1)"),
        (".a %= 1", "TRAVERSE_PATH(a) MODULO_ASSIGN VALUE(1)"),
        (".a //= 1", "TRAVERSE_PATH(a) ALTERNATIVE_ASSIGN VALUE(1)"),
        (".a // 1", "TRAVERSE_PATH(a) ALTERNATIVE VALUE(1)"),
        (".a == 1", "TRAVERSE_PATH(a) EQUALS VALUE(1)"),
        (".a != 1", "TRAVERSE_PATH(a) NOT_EQUALS VALUE(1)"),
        (".a >= 1", "TRAVERSE_PATH(a) COMPARE VALUE(1)"),
        (".a <= 1", "TRAVERSE_PATH(a) COMPARE VALUE(1)"),
        (".a |= 1", "TRAVERSE_PATH(a) ASSIGN VALUE(1)"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(scan(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_update_assign_flag() {
    let tokens = tokenize(".a |= . + 1").unwrap();
    let op = tokens[1].operation.as_ref().unwrap();
    assert_eq!(op.op_type.name, "ASSIGN");
    assert!(op.update_assign);

    let tokens = tokenize(".a = 1").unwrap();
    assert!(!tokens[1].operation.as_ref().unwrap().update_assign);
}

#[test]
fn test_compare_prefs() {
    let tokens = tokenize(".a >= 1").unwrap();
    match &tokens[1].operation.as_ref().unwrap().prefs {
        Prefs::Compare(prefs) => {
            assert!(prefs.greater);
            assert!(prefs.or_equal);
        }
        other => panic!("unexpected prefs {:?}", other),
    }
}

// ============================================================================
// Paths and brackets
// ============================================================================

#[test]
fn test_quoted_path_keeps_dots() {
    assert_eq!(scan(".\"a.b\""), "TRAVERSE_PATH(a.b)");
}

#[test]
fn test_recursive_descent() {
    assert_eq!(scan(".. | .a"), "RECURSIVE_DESCENT PIPE TRAVERSE_PATH(a)");

    let tokens = tokenize("...").unwrap();
    match &tokens[0].operation.as_ref().unwrap().prefs {
        Prefs::RecursiveDescent(prefs) => assert!(prefs.traverse.include_map_keys),
        other => panic!("unexpected prefs {:?}", other),
    }
}

#[test]
fn test_post_traverse_after_brackets() {
    assert_eq!(scan("(.a).b"), "( TRAVERSE_PATH(a) ) SHORT_PIPE TRAVERSE_PATH(b)");
    assert_eq!(scan("[.a][0]"), "[ TRAVERSE_PATH(a) ] TRAVERSE_ARRAY [ VALUE(0) ]");
}

#[test]
fn test_optional_splat() {
    let tokens = tokenize(".a[]?").unwrap();
    assert_eq!(describe_tokens(&tokens), "TRAVERSE_PATH(a) TRAVERSE_ARRAY [ ]");
    assert_eq!(tokens[3].kind, TokenKind::CloseCollect);
    assert!(tokens[3].optional);
}

#[test]
fn test_object_construction() {
    assert_eq!(
        scan("{name: .a, \"x\": 1}"),
        "{ VALUE(name) CREATE_MAP TRAVERSE_PATH(a) UNION VALUE(x) CREATE_MAP VALUE(1) }"
    );
}

// ============================================================================
// Literals, variables and formats
// ============================================================================

#[test]
fn test_string_escapes() {
    let tokens = tokenize(r#""a\nbé""#).unwrap();
    assert_eq!(tokens[0].operation.as_ref().unwrap().string_value, "a\nbé");
}

#[test]
fn test_variables() {
    assert_eq!(
        scan(".a as $x | $x"),
        "TRAVERSE_PATH(a) ASSIGN_VARIABLE GET_VARIABLE(x) PIPE GET_VARIABLE(x)"
    );
    let tokens = tokenize(".a ref $x").unwrap();
    match &tokens[1].operation.as_ref().unwrap().prefs {
        Prefs::Variable(prefs) => assert!(prefs.is_reference),
        other => panic!("unexpected prefs {:?}", other),
    }
}

#[test]
fn test_formats() {
    assert_eq!(scan(". | @json"), "SELF PIPE ENCODE");
    assert_eq!(scan(". | @csv"), "SELF PIPE ENCODE");
    assert_eq!(scan(". | @jsond"), "SELF PIPE DECODE");
    assert_eq!(scan("to_json(4)"), "ENCODE_WITH_INDENT ( VALUE(4) )");
    assert_eq!(scan("to_json"), "ENCODE");
}

#[test]
fn test_functions_with_and_without_args() {
    assert_eq!(scan("first"), "FIRST");
    assert_eq!(scan("first(.a)"), "FIRST_MATCHING ( TRAVERSE_PATH(a) )");
    assert_eq!(scan("parent(2)"), "GET_PARENT_N ( VALUE(2) )");
    assert_eq!(scan("flatten"), "FLATTEN");
}

#[test]
fn test_metadata_writers() {
    assert_eq!(scan(".a anchor = \"x\""), "TRAVERSE_PATH(a) ASSIGN_ANCHOR VALUE(x)");
    assert_eq!(scan(".a line_comment = \"x\""), "TRAVERSE_PATH(a) ASSIGN_COMMENT VALUE(x)");
    assert_eq!(scan(".a | tag"), "TRAVERSE_PATH(a) PIPE GET_TAG");
}

// ============================================================================
// Streaming API and errors
// ============================================================================

#[test]
fn test_next_token_streams_raw_tokens() {
    let mut lexer = Lexer::new(".a | .b");
    let mut names = Vec::new();
    while let Some(token) = lexer.next_token().unwrap() {
        names.push(token.operation.unwrap().op_type.name);
    }
    assert_eq!(names, vec!["TRAVERSE_PATH", "PIPE", "TRAVERSE_PATH"]);
}

#[test]
fn test_error_position_on_later_line() {
    let err = tokenize("\n  \"abc").unwrap_err();
    assert_eq!(err.position.line, 2);
    assert_eq!(err.position.column, 3);
}

#[test]
fn test_lexing_errors() {
    assert_eq!(tokenize("$").unwrap_err().message, "expected a variable name after '$'");
    assert_eq!(tokenize("@yaml").unwrap_err().message, "unknown format '@yaml'");
    assert_eq!(tokenize("1abc").unwrap_err().message, "invalid number literal");
    assert_eq!(tokenize(r#""\q""#).unwrap_err().message, "invalid escape sequence \\q");
    assert_eq!(tokenize(". ^ .").unwrap_err().message, "unexpected character '^'");
}
