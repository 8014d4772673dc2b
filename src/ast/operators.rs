//! Operator descriptors.
//!
//! Every operator the language knows is a `static` [`OperationType`]: name,
//! arity, precedence and the handler that evaluates it. Descriptors are
//! immutable and shared by every compiled expression.

use std::fmt;

use super::expressions::ExpressionNode;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::operators::{
    arithmetic, assign, boolean, collect, collections, comments, compare, datetime, encode,
    metadata, multiply, navigation, paths, select, sort, strings, structure, system, variables,
};

pub type Handler = fn(&mut Evaluator, &Context, &ExpressionNode) -> Result<Context, EvalError>;

pub struct OperationType {
    pub name: &'static str,
    /// Number of operands: 0 for leaves, 1 for prefix functions (operand on the right), 2 for infix
    pub arity: usize,
    /// Higher binds tighter
    pub precedence: u8,
    pub handler: Handler,
    pub check_for_post_traverse: bool,
    pub left_associative: bool,
}

impl OperationType {
    const fn new(name: &'static str, arity: usize, precedence: u8, handler: Handler) -> Self {
        OperationType {
            name,
            arity,
            precedence,
            handler,
            check_for_post_traverse: false,
            left_associative: false,
        }
    }

    const fn leaf(name: &'static str, handler: Handler) -> Self {
        OperationType::new(name, 0, 50, handler).post_traverse()
    }

    const fn function(name: &'static str, handler: Handler) -> Self {
        OperationType::new(name, 1, 50, handler)
    }

    const fn post_traverse(self) -> Self {
        OperationType {
            check_for_post_traverse: true,
            ..self
        }
    }

    const fn left(self) -> Self {
        OperationType {
            left_associative: true,
            ..self
        }
    }
}

impl PartialEq for OperationType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl fmt::Debug for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// structure
pub static SELF: OperationType = OperationType::leaf("SELF", structure::self_reference);
pub static PIPE: OperationType = OperationType::new("PIPE", 2, 10, structure::pipe);
pub static SHORT_PIPE: OperationType =
    OperationType::new("SHORT_PIPE", 2, 45, structure::short_pipe).left();
pub static UNION: OperationType = OperationType::new("UNION", 2, 20, structure::union);
pub static BLOCK: OperationType = OperationType::new("BLOCK", 2, 5, structure::block);
pub static EMPTY: OperationType = OperationType::new("EMPTY", 0, 50, structure::empty);
pub static VALUE: OperationType = OperationType::new("VALUE", 0, 50, structure::value);

// traversal
pub static TRAVERSE_PATH: OperationType =
    OperationType::leaf("TRAVERSE_PATH", navigation::traverse_path);
pub static TRAVERSE_ARRAY: OperationType =
    OperationType::new("TRAVERSE_ARRAY", 2, 48, navigation::traverse_array).left();
pub static RECURSIVE_DESCENT: OperationType =
    OperationType::leaf("RECURSIVE_DESCENT", navigation::recursive_descent);

// collection construction
pub static COLLECT: OperationType = OperationType::new("COLLECT", 0, 50, collect::collect);
pub static COLLECT_OBJECT: OperationType =
    OperationType::new("COLLECT_OBJECT", 0, 50, collect::collect_object);
pub static CREATE_MAP: OperationType = OperationType::new("CREATE_MAP", 2, 22, collect::create_map);

// arithmetic
pub static ADD: OperationType = OperationType::new("ADD", 2, 40, arithmetic::add).left();
pub static SUBTRACT: OperationType =
    OperationType::new("SUBTRACT", 2, 40, arithmetic::subtract).left();
pub static MULTIPLY: OperationType =
    OperationType::new("MULTIPLY", 2, 42, multiply::multiply).left();
pub static DIVIDE: OperationType = OperationType::new("DIVIDE", 2, 42, arithmetic::divide).left();
pub static MODULO: OperationType = OperationType::new("MODULO", 2, 42, arithmetic::modulo).left();

pub static ADD_ASSIGN: OperationType =
    OperationType::new("ADD_ASSIGN", 2, 25, arithmetic::add_assign);
pub static SUBTRACT_ASSIGN: OperationType =
    OperationType::new("SUBTRACT_ASSIGN", 2, 25, arithmetic::subtract_assign);
pub static MULTIPLY_ASSIGN: OperationType =
    OperationType::new("MULTIPLY_ASSIGN", 2, 25, multiply::multiply_assign);
pub static DIVIDE_ASSIGN: OperationType =
    OperationType::new("DIVIDE_ASSIGN", 2, 25, arithmetic::divide_assign);
pub static MODULO_ASSIGN: OperationType =
    OperationType::new("MODULO_ASSIGN", 2, 25, arithmetic::modulo_assign);
pub static ALTERNATIVE_ASSIGN: OperationType =
    OperationType::new("ALTERNATIVE_ASSIGN", 2, 25, boolean::alternative_assign);

// comparison
pub static EQUALS: OperationType = OperationType::new("EQUALS", 2, 35, compare::equals).left();
pub static NOT_EQUALS: OperationType =
    OperationType::new("NOT_EQUALS", 2, 35, compare::not_equals).left();
pub static COMPARE: OperationType = OperationType::new("COMPARE", 2, 35, compare::compare).left();
pub static MIN: OperationType = OperationType::leaf("MIN", compare::min);
pub static MAX: OperationType = OperationType::leaf("MAX", compare::max);

// boolean
pub static AND: OperationType = OperationType::new("AND", 2, 32, boolean::and).left();
pub static OR: OperationType = OperationType::new("OR", 2, 30, boolean::or).left();
pub static NOT: OperationType = OperationType::leaf("NOT", boolean::not);
pub static ALTERNATIVE: OperationType =
    OperationType::new("ALTERNATIVE", 2, 27, boolean::alternative);
pub static ANY: OperationType = OperationType::leaf("ANY", boolean::any);
pub static ALL: OperationType = OperationType::leaf("ALL", boolean::all);
pub static ANY_CONDITION: OperationType = OperationType::function("ANY_CONDITION", boolean::any_c);
pub static ALL_CONDITION: OperationType = OperationType::function("ALL_CONDITION", boolean::all_c);

// assignment
pub static ASSIGN: OperationType = OperationType::new("ASSIGN", 2, 25, assign::assign);
pub static WITH: OperationType = OperationType::function("WITH", assign::with);

// selection
pub static SELECT: OperationType = OperationType::function("SELECT", select::select);
pub static HAS: OperationType = OperationType::function("HAS", select::has);
pub static CONTAINS: OperationType = OperationType::function("CONTAINS", select::contains);
pub static FIRST: OperationType = OperationType::leaf("FIRST", select::first);
pub static FIRST_MATCHING: OperationType =
    OperationType::function("FIRST_MATCHING", select::first_matching);

// variables
pub static ASSIGN_VARIABLE: OperationType =
    OperationType::new("ASSIGN_VARIABLE", 2, 44, variables::assign_variable);
pub static GET_VARIABLE: OperationType =
    OperationType::leaf("GET_VARIABLE", variables::get_variable);
pub static REDUCE: OperationType = OperationType::new("REDUCE", 2, 50, variables::reduce);
pub static FOREACH: OperationType = OperationType::new("FOREACH", 2, 50, variables::foreach);

// collections
pub static LENGTH: OperationType = OperationType::leaf("LENGTH", collections::length);
pub static KEYS: OperationType = OperationType::leaf("KEYS", collections::keys);
pub static MAP: OperationType = OperationType::function("MAP", collections::map);
pub static MAP_VALUES: OperationType =
    OperationType::function("MAP_VALUES", collections::map_values);
pub static FLATTEN: OperationType = OperationType::leaf("FLATTEN", collections::flatten);
pub static FLATTEN_BY: OperationType =
    OperationType::function("FLATTEN_BY", collections::flatten);
pub static ADD_ELEMENTS: OperationType =
    OperationType::leaf("ADD_ELEMENTS", collections::add_elements);
pub static TO_ENTRIES: OperationType = OperationType::leaf("TO_ENTRIES", collections::to_entries);
pub static FROM_ENTRIES: OperationType =
    OperationType::leaf("FROM_ENTRIES", collections::from_entries);
pub static WITH_ENTRIES: OperationType =
    OperationType::function("WITH_ENTRIES", collections::with_entries);
pub static PICK: OperationType = OperationType::function("PICK", collections::pick);
pub static OMIT: OperationType = OperationType::function("OMIT", collections::omit);

// ordering
pub static REVERSE: OperationType = OperationType::leaf("REVERSE", sort::reverse);
pub static SORT: OperationType = OperationType::leaf("SORT", sort::sort);
pub static SORT_BY: OperationType = OperationType::function("SORT_BY", sort::sort_by);
pub static UNIQUE: OperationType = OperationType::leaf("UNIQUE", sort::unique);
pub static UNIQUE_BY: OperationType = OperationType::function("UNIQUE_BY", sort::unique_by);
pub static GROUP_BY: OperationType = OperationType::function("GROUP_BY", sort::group_by);

// strings
pub static JOIN: OperationType = OperationType::function("JOIN", strings::join);
pub static SPLIT: OperationType = OperationType::function("SPLIT", strings::split);
pub static TEST: OperationType = OperationType::function("TEST", strings::test);
pub static MATCH: OperationType = OperationType::function("MATCH", strings::match_regex);
pub static CAPTURE: OperationType = OperationType::function("CAPTURE", strings::capture);
pub static SUBSTITUTE: OperationType = OperationType::function("SUBSTITUTE", strings::sub);
pub static UPCASE: OperationType = OperationType::leaf("UPCASE", strings::upcase);
pub static DOWNCASE: OperationType = OperationType::leaf("DOWNCASE", strings::downcase);
pub static TRIM: OperationType = OperationType::leaf("TRIM", strings::trim);
pub static TO_STRING: OperationType = OperationType::leaf("TO_STRING", strings::to_string);
pub static TO_NUMBER: OperationType = OperationType::leaf("TO_NUMBER", strings::to_number);

// paths
pub static GET_PATH: OperationType = OperationType::leaf("GET_PATH", paths::get_path);
pub static PATHS: OperationType = OperationType::leaf("PATHS", paths::paths);
pub static GETPATH: OperationType = OperationType::function("GETPATH", paths::getpath);
pub static SETPATH: OperationType = OperationType::function("SETPATH", paths::setpath);
pub static DELPATHS: OperationType = OperationType::function("DELPATHS", paths::delpaths);
pub static DELETE: OperationType = OperationType::function("DELETE", paths::delete);
pub static GET_KEY: OperationType = OperationType::leaf("GET_KEY", paths::get_key);
pub static GET_PARENT: OperationType = OperationType::leaf("GET_PARENT", paths::get_parent);
pub static GET_PARENT_N: OperationType =
    OperationType::function("GET_PARENT_N", paths::get_parent);
pub static GET_PARENTS: OperationType = OperationType::leaf("GET_PARENTS", paths::get_parents);

// node metadata
pub static GET_TAG: OperationType = OperationType::leaf("GET_TAG", metadata::get_tag);
pub static ASSIGN_TAG: OperationType =
    OperationType::new("ASSIGN_TAG", 2, 25, metadata::assign_tag);
pub static GET_KIND: OperationType = OperationType::leaf("GET_KIND", metadata::get_kind);
pub static GET_STYLE: OperationType = OperationType::leaf("GET_STYLE", metadata::get_style);
pub static ASSIGN_STYLE: OperationType =
    OperationType::new("ASSIGN_STYLE", 2, 25, metadata::assign_style);
pub static GET_ANCHOR: OperationType = OperationType::leaf("GET_ANCHOR", metadata::get_anchor);
pub static ASSIGN_ANCHOR: OperationType =
    OperationType::new("ASSIGN_ANCHOR", 2, 25, metadata::assign_anchor);
pub static GET_ALIAS: OperationType = OperationType::leaf("GET_ALIAS", metadata::get_alias);
pub static ASSIGN_ALIAS: OperationType =
    OperationType::new("ASSIGN_ALIAS", 2, 25, metadata::assign_alias);
pub static EXPLODE: OperationType = OperationType::function("EXPLODE", metadata::explode);
pub static GET_LINE: OperationType = OperationType::leaf("GET_LINE", metadata::get_line);
pub static GET_COLUMN: OperationType = OperationType::leaf("GET_COLUMN", metadata::get_column);
pub static GET_DOCUMENT_INDEX: OperationType =
    OperationType::leaf("GET_DOCUMENT_INDEX", metadata::get_document_index);
pub static GET_FILENAME: OperationType =
    OperationType::leaf("GET_FILENAME", metadata::get_filename);
pub static GET_FILE_INDEX: OperationType =
    OperationType::leaf("GET_FILE_INDEX", metadata::get_file_index);
pub static SPLIT_DOCUMENT: OperationType =
    OperationType::leaf("SPLIT_DOCUMENT", metadata::split_document);

// comments
pub static GET_COMMENT: OperationType = OperationType::leaf("GET_COMMENT", comments::get_comment);
pub static ASSIGN_COMMENT: OperationType =
    OperationType::new("ASSIGN_COMMENT", 2, 25, comments::assign_comment);

// encoding
pub static ENCODE: OperationType = OperationType::leaf("ENCODE", encode::encode);
pub static ENCODE_WITH_INDENT: OperationType =
    OperationType::function("ENCODE_WITH_INDENT", encode::encode);
pub static DECODE: OperationType = OperationType::leaf("DECODE", encode::decode);

// date and time
pub static NOW: OperationType = OperationType::leaf("NOW", datetime::now);
pub static FORMAT_DATETIME: OperationType =
    OperationType::function("FORMAT_DATETIME", datetime::format_datetime);
pub static TO_UNIX: OperationType = OperationType::leaf("TO_UNIX", datetime::to_unix);
pub static FROM_UNIX: OperationType = OperationType::leaf("FROM_UNIX", datetime::from_unix);
pub static WITH_DTF: OperationType = OperationType::function("WITH_DTF", datetime::with_dtf);

// environment, files and scripting
pub static ENV: OperationType = OperationType::function("ENV", system::env);
pub static STRENV: OperationType = OperationType::function("STRENV", system::strenv);
pub static LOAD: OperationType = OperationType::function("LOAD", system::load);
pub static LOAD_STR: OperationType = OperationType::function("LOAD_STR", system::load_str);
pub static ERROR: OperationType = OperationType::function("ERROR", system::error);
pub static EVAL: OperationType = OperationType::function("EVAL", system::eval);
