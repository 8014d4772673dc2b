use std::fmt;

use log::debug;

use crate::ast::expressions::Operation;
use crate::ast::operators::{self, OperationType};
use crate::ast::preferences::{
    ArrayMergePolicy, AssignPrefs, CommentPrefs, CommentsPolicy, ComparePrefs, DecodeFormat,
    EncodeFormat, EncodePrefs, Literal, MultiplyPrefs, Prefs, RecursiveDescentPrefs,
    TraversePrefs, VariablePrefs,
};
use crate::ast::tokens::{Token, TokenKind};
use crate::node::{TAG_BOOL, TAG_NULL, TAG_STR};
use crate::value;

/// Location of a character in the expression text. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// A scanning failure, with the offending text.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub fragment: String,
    pub position: Position,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {} near '{}'",
            self.message, self.position.line, self.position.column, self.fragment
        )
    }
}

impl std::error::Error for LexError {}

/// Characters that end a bare path segment such as `.foo`.
const PATH_TERMINATORS: &str = "[](){}|,:;=!<>+/%\"#.?$";

/// Flags that may follow `*`.
const MERGE_FLAGS: &str = "+d?ncCAI";

fn is_path_char(ch: char) -> bool {
    !ch.is_whitespace() && !PATH_TERMINATORS.contains(ch)
}

struct Keyword {
    op: Option<&'static OperationType>,
    with_args: Option<&'static OperationType>,
    assign: Option<&'static OperationType>,
    prefs: Prefs,
}

impl Keyword {
    fn simple(op: &'static OperationType) -> Self {
        Keyword {
            op: Some(op),
            with_args: None,
            assign: None,
            prefs: Prefs::None,
        }
    }

    fn function(op: &'static OperationType) -> Self {
        Keyword {
            op: None,
            with_args: Some(op),
            assign: None,
            prefs: Prefs::None,
        }
    }

    fn either(op: &'static OperationType, with_args: &'static OperationType) -> Self {
        Keyword {
            op: Some(op),
            with_args: Some(with_args),
            assign: None,
            prefs: Prefs::None,
        }
    }

    fn assignable(mut self, assign: &'static OperationType) -> Self {
        self.assign = Some(assign);
        self
    }

    fn prefs(mut self, prefs: Prefs) -> Self {
        self.prefs = prefs;
        self
    }
}

fn comment_slots(head: bool, line: bool, foot: bool) -> Prefs {
    Prefs::Comments(CommentPrefs { head, line, foot })
}

fn encoder(format: EncodeFormat, indent: usize) -> Prefs {
    Prefs::Encode(EncodePrefs { format, indent })
}

fn keyword(name: &str) -> Option<Keyword> {
    use operators::*;

    let keyword = match name {
        "and" => Keyword::simple(&AND),
        "or" => Keyword::simple(&OR),
        "not" => Keyword::simple(&NOT),
        "as" => Keyword::simple(&ASSIGN_VARIABLE)
            .prefs(Prefs::Variable(VariablePrefs { is_reference: false })),
        "ref" => Keyword::simple(&ASSIGN_VARIABLE)
            .prefs(Prefs::Variable(VariablePrefs { is_reference: true })),
        "reduce" => Keyword::simple(&REDUCE),
        "foreach" => Keyword::simple(&FOREACH),
        "empty" => Keyword::simple(&EMPTY),

        "select" => Keyword::function(&SELECT),
        "has" => Keyword::function(&HAS),
        "contains" => Keyword::function(&CONTAINS),
        "first" => Keyword::either(&FIRST, &FIRST_MATCHING),
        "any" => Keyword::simple(&ANY),
        "all" => Keyword::simple(&ALL),
        "any_c" => Keyword::function(&ANY_CONDITION),
        "all_c" => Keyword::function(&ALL_CONDITION),
        "with" => Keyword::function(&WITH),
        "min" => Keyword::simple(&MIN),
        "max" => Keyword::simple(&MAX),

        "length" => Keyword::simple(&LENGTH),
        "keys" => Keyword::simple(&KEYS),
        "map" => Keyword::function(&MAP),
        "map_values" => Keyword::function(&MAP_VALUES),
        "flatten" => Keyword::either(&FLATTEN, &FLATTEN_BY),
        "add" => Keyword::simple(&ADD_ELEMENTS),
        "to_entries" => Keyword::simple(&TO_ENTRIES),
        "from_entries" => Keyword::simple(&FROM_ENTRIES),
        "with_entries" => Keyword::function(&WITH_ENTRIES),
        "pick" => Keyword::function(&PICK),
        "omit" => Keyword::function(&OMIT),

        "reverse" => Keyword::simple(&REVERSE),
        "sort" => Keyword::simple(&SORT),
        "sort_by" => Keyword::function(&SORT_BY),
        "unique" => Keyword::simple(&UNIQUE),
        "unique_by" => Keyword::function(&UNIQUE_BY),
        "group_by" => Keyword::function(&GROUP_BY),

        "join" => Keyword::function(&JOIN),
        "split" => Keyword::function(&SPLIT),
        "test" => Keyword::function(&TEST),
        "match" => Keyword::function(&MATCH),
        "capture" => Keyword::function(&CAPTURE),
        "sub" => Keyword::function(&SUBSTITUTE),
        "upcase" | "ascii_upcase" => Keyword::simple(&UPCASE),
        "downcase" | "ascii_downcase" => Keyword::simple(&DOWNCASE),
        "trim" => Keyword::simple(&TRIM),
        "tostring" | "to_string" => Keyword::simple(&TO_STRING),
        "tonumber" | "to_number" => Keyword::simple(&TO_NUMBER),

        "path" => Keyword::simple(&GET_PATH),
        "paths" => Keyword::simple(&PATHS),
        "getpath" => Keyword::function(&GETPATH),
        "setpath" => Keyword::function(&SETPATH),
        "delpaths" => Keyword::function(&DELPATHS),
        "del" => Keyword::function(&DELETE),
        "key" => Keyword::simple(&GET_KEY),
        "parent" => Keyword::either(&GET_PARENT, &GET_PARENT_N),
        "parents" => Keyword::simple(&GET_PARENTS),

        "tag" | "type" => Keyword::simple(&GET_TAG).assignable(&ASSIGN_TAG),
        "kind" => Keyword::simple(&GET_KIND),
        "style" => Keyword::simple(&GET_STYLE).assignable(&ASSIGN_STYLE),
        "anchor" => Keyword::simple(&GET_ANCHOR).assignable(&ASSIGN_ANCHOR),
        "alias" => Keyword::simple(&GET_ALIAS).assignable(&ASSIGN_ALIAS),
        "explode" => Keyword::function(&EXPLODE),
        "line" => Keyword::simple(&GET_LINE),
        "column" => Keyword::simple(&GET_COLUMN),
        "document_index" | "di" => Keyword::simple(&GET_DOCUMENT_INDEX),
        "filename" => Keyword::simple(&GET_FILENAME),
        "file_index" | "fi" => Keyword::simple(&GET_FILE_INDEX),
        "split_doc" => Keyword::simple(&SPLIT_DOCUMENT),

        "head_comment" => Keyword::simple(&GET_COMMENT)
            .assignable(&ASSIGN_COMMENT)
            .prefs(comment_slots(true, false, false)),
        "line_comment" => Keyword::simple(&GET_COMMENT)
            .assignable(&ASSIGN_COMMENT)
            .prefs(comment_slots(false, true, false)),
        "foot_comment" => Keyword::simple(&GET_COMMENT)
            .assignable(&ASSIGN_COMMENT)
            .prefs(comment_slots(false, false, true)),
        "comments" => Keyword::simple(&GET_COMMENT)
            .assignable(&ASSIGN_COMMENT)
            .prefs(comment_slots(true, true, true)),

        "to_json" => Keyword::either(&ENCODE, &ENCODE_WITH_INDENT)
            .prefs(encoder(EncodeFormat::Json, 2)),
        "tojson" => Keyword::simple(&ENCODE).prefs(encoder(EncodeFormat::Json, 0)),
        "from_json" | "fromjson" => {
            Keyword::simple(&DECODE).prefs(Prefs::Decode(DecodeFormat::Json))
        }

        "now" => Keyword::simple(&NOW),
        "format_datetime" => Keyword::function(&FORMAT_DATETIME),
        "to_unix" | "tounix" => Keyword::simple(&TO_UNIX),
        "from_unix" | "fromunix" => Keyword::simple(&FROM_UNIX),
        "with_dtf" => Keyword::function(&WITH_DTF),

        "env" => Keyword::function(&ENV),
        "strenv" => Keyword::function(&STRENV),
        "load" => Keyword::function(&LOAD),
        "load_str" => Keyword::function(&LOAD_STR),
        "error" => Keyword::function(&ERROR),
        "eval" => Keyword::function(&EVAL),
        _ => return None,
    };
    Some(keyword)
}

fn literal(tag: &str, text: impl Into<String>) -> Token {
    let text = text.into();
    Token::operation(
        Operation::with_value(&operators::VALUE, text.clone()).with_prefs(Prefs::Value(Literal {
            tag: tag.to_string(),
            value: text,
        })),
    )
}

fn op(op_type: &'static OperationType) -> Token {
    Token::operation(Operation::new(op_type))
}

fn compare(greater: bool, or_equal: bool) -> Token {
    Token::operation(
        Operation::new(&operators::COMPARE)
            .with_prefs(Prefs::Compare(ComparePrefs { greater, or_equal })),
    )
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Open brackets seen so far, used to spot bare object keys
    brackets: Vec<char>,
    previous_ends_operand: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            brackets: Vec::new(),
            previous_ends_operand: false,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, ch)| self.peek_char(i) == Some(ch))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '#' {
                while let Some(ch) = self.current_char() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn next_non_whitespace(&self) -> Option<char> {
        self.input[self.position.min(self.input.len())..]
            .iter()
            .copied()
            .find(|ch| !ch.is_whitespace())
    }

    fn position_at(&self, offset: usize) -> Position {
        let mut line = 1;
        let mut column = 1;
        for ch in self.input.iter().take(offset) {
            if *ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Position {
            offset,
            line,
            column,
        }
    }

    fn error(&self, start: usize, message: impl Into<String>) -> LexError {
        let end = self.position.max(start + 1).min(self.input.len());
        LexError {
            message: message.into(),
            fragment: self.input[start.min(end)..end].iter().collect(),
            position: self.position_at(start),
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('u') => {
                            let hex: String = (1..=4).filter_map(|i| self.peek_char(i)).collect();
                            let decoded = u32::from_str_radix(&hex, 16)
                                .ok()
                                .filter(|_| hex.len() == 4)
                                .and_then(char::from_u32);
                            match decoded {
                                Some(c) => result.push(c),
                                None => return Err(self.error(start, "invalid unicode escape")),
                            }
                            self.position += 4;
                        }
                        Some(other) => {
                            return Err(
                                self.error(start, format!("invalid escape sequence \\{}", other))
                            );
                        }
                        None => return Err(self.error(start, "unterminated string")),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error(start, "unterminated string"))
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexError> {
        let mut number = String::new();
        if self.eat('-') {
            number.push('-');
        }

        while let Some(ch) = self.current_char() {
            let exponent_sign = (ch == '+' || ch == '-')
                && number.ends_with(['e', 'E'])
                && !number.contains(['x', 'X']);
            let decimal_point =
                ch == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit());
            if ch.is_ascii_alphanumeric() || exponent_sign || decimal_point {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match value::classify_number(&number) {
            Some(tag) => Ok(literal(tag, number)),
            None => Err(self.error(start, "invalid number literal")),
        }
    }

    fn path_token(&mut self, key: String) -> Token {
        let optional = self.eat('?');
        Token::operation(
            Operation::with_value(&operators::TRAVERSE_PATH, key).with_prefs(Prefs::Traverse(
                TraversePrefs {
                    optional,
                    ..TraversePrefs::default()
                },
            )),
        )
    }

    fn read_dot(&mut self) -> Result<Token, LexError> {
        if self.peek_char(1) == Some('.') {
            self.advance();
            self.advance();
            let include_map_keys = self.eat('.');
            let prefs = RecursiveDescentPrefs {
                recurse_array: true,
                traverse: TraversePrefs {
                    include_map_keys,
                    dont_follow_alias: true,
                    ..TraversePrefs::default()
                },
            };
            return Ok(Token::operation(
                Operation::new(&operators::RECURSIVE_DESCENT)
                    .with_prefs(Prefs::RecursiveDescent(prefs)),
            ));
        }

        match self.peek_char(1) {
            Some('[') => {
                self.advance();
                self.advance();
                self.brackets.push('[');
                Ok(Token::structural(TokenKind::TraverseArrayCollect))
            }
            Some('"') => {
                self.advance();
                let key = self.read_string()?;
                Ok(self.path_token(key))
            }
            Some(ch) if is_path_char(ch) => {
                self.advance();
                let mut key = String::new();
                while let Some(ch) = self.current_char() {
                    if !is_path_char(ch) {
                        break;
                    }
                    key.push(ch);
                    self.advance();
                }
                Ok(self.path_token(key))
            }
            _ => {
                self.advance();
                Ok(op(&operators::SELF))
            }
        }
    }

    fn read_word(&mut self, start: usize) -> Result<Token, LexError> {
        let word = self.read_identifier();

        if self.brackets.last() == Some(&'{') && self.next_non_whitespace() == Some(':') {
            return Ok(literal(TAG_STR, word));
        }
        match word.as_str() {
            "true" | "false" => return Ok(literal(TAG_BOOL, word)),
            "null" => return Ok(literal(TAG_NULL, word)),
            _ => {}
        }

        let Some(keyword) = keyword(&word) else {
            return Err(self.error(start, format!("unknown function '{}'", word)));
        };
        let chosen = match (keyword.op, keyword.with_args) {
            (Some(_), Some(with_args)) if self.current_char() == Some('(') => with_args,
            (Some(op), _) => op,
            (None, Some(with_args)) => with_args,
            (None, None) => return Err(self.error(start, format!("unknown function '{}'", word))),
        };
        Ok(Token::operation(Operation::new(chosen).with_prefs(keyword.prefs))
            .with_assign(keyword.assign))
    }

    fn read_format(&mut self, start: usize) -> Result<Token, LexError> {
        self.advance();
        let name = self.read_identifier();
        let prefs = match name.as_str() {
            "json" => encoder(EncodeFormat::Json, 0),
            "csv" => encoder(EncodeFormat::Csv, 0),
            "tsv" => encoder(EncodeFormat::Tsv, 0),
            "jsond" => {
                return Ok(Token::operation(
                    Operation::new(&operators::DECODE)
                        .with_prefs(Prefs::Decode(DecodeFormat::Json)),
                ));
            }
            _ => return Err(self.error(start, format!("unknown format '@{}'", name))),
        };
        Ok(Token::operation(
            Operation::new(&operators::ENCODE).with_prefs(prefs),
        ))
    }

    fn read_multiply(&mut self) -> Token {
        self.advance();
        let mut flags = String::new();
        let mut offset = 0;
        while let Some(ch) = self.peek_char(offset) {
            if !MERGE_FLAGS.contains(ch) {
                break;
            }
            flags.push(ch);
            offset += 1;
        }
        if self
            .peek_char(offset)
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            flags.clear();
        }
        self.position += flags.chars().count();

        let mut prefs = MultiplyPrefs::default();
        for flag in flags.chars() {
            match flag {
                '+' => prefs.arrays = ArrayMergePolicy::Append,
                'd' => prefs.arrays = ArrayMergePolicy::Update,
                '?' => prefs.only_existing = true,
                'n' => prefs.assign.only_write_null = true,
                'c' => prefs.assign.clobber_custom_tags = true,
                'C' => prefs.comments = CommentsPolicy::Overwrite,
                'A' => prefs.comments = CommentsPolicy::Append,
                'I' => prefs.comments = CommentsPolicy::Ignore,
                _ => {}
            }
        }

        let op_type = if self.current_char() == Some('=') && self.peek_char(1) != Some('=') {
            self.advance();
            &operators::MULTIPLY_ASSIGN
        } else {
            &operators::MULTIPLY
        };
        Token::operation(Operation::new(op_type).with_prefs(Prefs::Multiply(prefs)))
    }

    fn assign(&mut self, width: usize, update_assign: bool, clobber: bool) -> Token {
        self.position += width;
        let mut operation = Operation::new(&operators::ASSIGN).with_prefs(Prefs::Assign(
            AssignPrefs {
                clobber_custom_tags: clobber,
                ..AssignPrefs::default()
            },
        ));
        operation.update_assign = update_assign;
        Token::operation(operation)
    }

    fn read_symbol(&mut self, start: usize) -> Result<Token, LexError> {
        use operators::*;

        let two_char: &[(&str, &'static OperationType)] = &[
            ("+=", &ADD_ASSIGN),
            ("-=", &SUBTRACT_ASSIGN),
            ("%=", &MODULO_ASSIGN),
            ("==", &EQUALS),
            ("!=", &NOT_EQUALS),
        ];

        if self.starts_with("//=") {
            self.position += 3;
            return Ok(op(&ALTERNATIVE_ASSIGN));
        }
        if self.starts_with("//") {
            self.position += 2;
            return Ok(op(&ALTERNATIVE));
        }
        if self.starts_with("/=") {
            self.position += 2;
            return Ok(op(&DIVIDE_ASSIGN));
        }
        if self.starts_with("|=") {
            return Ok(self.assign(2, true, false));
        }
        for (text, op_type) in two_char {
            if self.starts_with(text) {
                self.position += 2;
                return Ok(op(op_type));
            }
        }
        if self.starts_with("<=") {
            self.position += 2;
            return Ok(compare(false, true));
        }
        if self.starts_with(">=") {
            self.position += 2;
            return Ok(compare(true, true));
        }
        if self.starts_with("=c")
            && !self
                .peek_char(2)
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            return Ok(self.assign(2, false, true));
        }

        let Some(ch) = self.current_char() else {
            return Err(self.error(start, "unexpected end of expression"));
        };
        let token = match ch {
            '=' => return Ok(self.assign(1, false, false)),
            '*' => return Ok(self.read_multiply()),
            '|' => op(&PIPE),
            ',' => op(&UNION),
            ':' => op(&CREATE_MAP),
            ';' => op(&BLOCK),
            '+' => op(&ADD),
            '-' => op(&SUBTRACT),
            '/' => op(&DIVIDE),
            '%' => op(&MODULO),
            '<' => compare(false, false),
            '>' => compare(true, false),
            other => return Err(self.error(start, format!("unexpected character '{}'", other))),
        };
        self.advance();
        Ok(token)
    }

    /// Scans the next raw token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };

        let token = match ch {
            '(' => {
                self.advance();
                self.brackets.push('(');
                Token::structural(TokenKind::OpenBracket)
            }
            ')' => {
                self.advance();
                self.brackets.pop();
                Token::structural(TokenKind::CloseBracket)
            }
            '[' => {
                self.advance();
                self.brackets.push('[');
                Token::structural(TokenKind::OpenCollect)
            }
            ']' => {
                self.advance();
                self.brackets.pop();
                let mut token = Token::structural(TokenKind::CloseCollect);
                token.optional = self.eat('?');
                token
            }
            '{' => {
                self.advance();
                self.brackets.push('{');
                Token::structural(TokenKind::OpenCollectObject)
            }
            '}' => {
                self.advance();
                self.brackets.pop();
                Token::structural(TokenKind::CloseCollectObject)
            }
            '.' => self.read_dot()?,
            '"' => literal(TAG_STR, self.read_string()?),
            '$' => {
                self.advance();
                let name = self.read_identifier();
                if name.is_empty() {
                    return Err(self.error(start, "expected a variable name after '$'"));
                }
                Token::operation(Operation::with_value(&operators::GET_VARIABLE, name))
            }
            '@' => self.read_format(start)?,
            c if c.is_ascii_digit() => self.read_number(start)?,
            '-' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
                && !self.previous_ends_operand =>
            {
                self.read_number(start)?
            }
            c if c.is_alphabetic() || c == '_' => self.read_word(start)?,
            _ => self.read_symbol(start)?,
        };

        self.previous_ends_operand = token.ends_operand();
        Ok(Some(token))
    }

    /// Scans the whole input and applies the token rewrites.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut raw = Vec::new();
        while let Some(token) = self.next_token()? {
            raw.push(token);
        }
        let tokens = post_process(raw);
        debug!("tokens: {}", describe_tokens(&tokens));
        Ok(tokens)
    }
}

/// Scans `input` into the token stream the postfix converter expects.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

/// Local rewrites that need one token of lookahead:
///
/// 1. a reader followed by `=` or `|=` becomes its writer and the `=` is dropped
/// 2. a post-traverse token followed by a path gets a short pipe, and one
///    followed by `[` gets a traverse-array
/// 3. `.[` becomes self, traverse-array, `[`
/// 4. the `source as $x` clause of `reduce`/`foreach` is bracketed
pub fn post_process(raw: Vec<Token>) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(raw.len());
    let mut open_reductions = 0usize;
    let mut index = 0;

    while index < raw.len() {
        let mut token = raw[index].clone();
        let mut consumed = 1;

        if token.kind == TokenKind::TraverseArrayCollect {
            tokens.push(op(&operators::SELF));
            tokens.push(op(&operators::TRAVERSE_ARRAY));
            token = Token::structural(TokenKind::OpenCollect);
        }

        if let Some(assign) = token.assign_operation {
            let next_assign = raw
                .get(index + 1)
                .and_then(|next| next.operation.as_ref())
                .filter(|next| next.is(&operators::ASSIGN));
            if let Some(next) = next_assign {
                let update_assign = next.update_assign;
                if let Some(operation) = token.operation.as_mut() {
                    operation.op_type = assign;
                    operation.update_assign = update_assign;
                }
                token.check_for_post_traverse = false;
                consumed = 2;
            }
        }

        let is_reduction =
            token.is_op(&operators::REDUCE) || token.is_op(&operators::FOREACH);
        let is_variable = token.is_op(&operators::GET_VARIABLE);
        let check_for_post_traverse = token.check_for_post_traverse;
        tokens.push(token);

        let next = raw.get(index + consumed);
        if is_reduction {
            tokens.push(Token::structural(TokenKind::OpenBracket));
            open_reductions += 1;
        } else if is_variable
            && open_reductions > 0
            && next.is_some_and(|n| n.kind == TokenKind::OpenBracket)
        {
            tokens.push(Token::structural(TokenKind::CloseBracket));
            open_reductions -= 1;
        } else if check_for_post_traverse {
            match next {
                Some(n) if n.is_path() || n.kind == TokenKind::TraverseArrayCollect => {
                    tokens.push(op(&operators::SHORT_PIPE));
                }
                Some(n) if n.kind == TokenKind::OpenCollect => {
                    tokens.push(op(&operators::TRAVERSE_ARRAY));
                }
                _ => {}
            }
        }

        index += consumed;
    }

    tokens
}

/// Compact rendering of a token stream for logs and tests.
pub fn describe_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match (&token.operation, token.kind) {
            (Some(op), _) if !op.string_value.is_empty() => {
                format!("{}({})", op.op_type.name, op.string_value)
            }
            (Some(op), _) => op.op_type.name.to_string(),
            (None, TokenKind::OpenBracket) => "(".to_string(),
            (None, TokenKind::CloseBracket) => ")".to_string(),
            (None, TokenKind::OpenCollect) => "[".to_string(),
            (None, TokenKind::CloseCollect) => "]".to_string(),
            (None, TokenKind::OpenCollectObject) => "{".to_string(),
            (None, TokenKind::CloseCollectObject) => "}".to_string(),
            (None, TokenKind::TraverseArrayCollect) => ".[".to_string(),
            (None, TokenKind::Operation) => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> String {
        describe_tokens(&tokenize(input).unwrap())
    }

    #[test]
    fn test_keywords() {
        assert_eq!(scan("true and not"), "VALUE(true) AND NOT");
        assert_eq!(scan("null or false"), "VALUE(null) OR VALUE(false)");
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(scan(".a"), "TRAVERSE_PATH(a)");
        assert_eq!(scan(".\"a b\""), "TRAVERSE_PATH(a b)");
        assert_eq!(scan(".a.b"), "TRAVERSE_PATH(a) SHORT_PIPE TRAVERSE_PATH(b)");
    }

    #[test]
    fn test_optional_path() {
        let tokens = tokenize(".a?").unwrap();
        let op = tokens[0].operation.as_ref().unwrap();
        assert_eq!(op.string_value, "a");
        assert!(op.prefs.traverse().optional);
    }

    #[test]
    fn test_index_after_path() {
        assert_eq!(scan(".a[0]"), "TRAVERSE_PATH(a) TRAVERSE_ARRAY [ VALUE(0) ]");
    }

    #[test]
    fn test_dot_bracket_rewrite() {
        assert_eq!(scan(".[]"), "SELF TRAVERSE_ARRAY [ ]");
        assert_eq!(
            scan(".a.[1]"),
            "TRAVERSE_PATH(a) SHORT_PIPE SELF TRAVERSE_ARRAY [ VALUE(1) ]"
        );
    }

    #[test]
    fn test_assign_variant() {
        assert_eq!(scan(".a tag = \"!!str\""), "TRAVERSE_PATH(a) ASSIGN_TAG VALUE(!!str)");
        let tokens = tokenize(".a style |= \"double\"").unwrap();
        let op = tokens[1].operation.as_ref().unwrap();
        assert_eq!(op.op_type.name, "ASSIGN_STYLE");
        assert!(op.update_assign);
    }

    #[test]
    fn test_number_classification() {
        let tag_of = |input: &str| match &tokenize(input).unwrap()[0].operation {
            Some(op) => match &op.prefs {
                Prefs::Value(literal) => literal.tag.clone(),
                _ => String::new(),
            },
            None => String::new(),
        };
        assert_eq!(tag_of("42"), "!!int");
        assert_eq!(tag_of("4.2"), "!!float");
        assert_eq!(tag_of("1e3"), "!!float");
        assert_eq!(tag_of("0x1F"), "!!int");
        assert_eq!(tag_of("-7"), "!!int");
    }

    #[test]
    fn test_minus_after_operand() {
        assert_eq!(scan("1 -1"), "VALUE(1) SUBTRACT VALUE(1)");
        assert_eq!(scan("[-1]"), "[ VALUE(-1) ]");
    }

    #[test]
    fn test_object_key_identifier() {
        assert_eq!(
            scan("{tag: 1}"),
            "{ VALUE(tag) CREATE_MAP VALUE(1) }"
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(scan(".a # trailing\n| .b"), "TRAVERSE_PATH(a) PIPE TRAVERSE_PATH(b)");
    }

    #[test]
    fn test_reduce_clause_bracketed() {
        assert_eq!(
            scan("reduce .[] as $x (0; . + $x)"),
            "REDUCE ( SELF TRAVERSE_ARRAY [ ] ASSIGN_VARIABLE GET_VARIABLE(x) ) ( VALUE(0) BLOCK SELF ADD GET_VARIABLE(x) )"
        );
    }

    #[test]
    fn test_merge_flags() {
        let tokens = tokenize(". *+? .b").unwrap();
        match &tokens[1].operation.as_ref().unwrap().prefs {
            Prefs::Multiply(prefs) => {
                assert_eq!(prefs.arrays, ArrayMergePolicy::Append);
                assert!(prefs.only_existing);
            }
            other => panic!("unexpected prefs {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!(err.position.column, 1);
    }

    #[test]
    fn test_unknown_function() {
        let err = tokenize(".a | frobnicate").unwrap_err();
        assert_eq!(err.fragment, "frobnicate");
    }
}
