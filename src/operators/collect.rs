//! `[...]` and `{...}` constructors.
//!
//! An object literal is compiled as CREATE_MAP pairs joined by UNION and fed
//! into COLLECT_OBJECT. Each CREATE_MAP yields one sequence holding, per
//! input, the maps for every key/value combination. COLLECT_OBJECT lines
//! those up by input and crosses them into complete objects.

use crate::ast::expressions::ExpressionNode;
use crate::ast::preferences::ArrayMergePolicy;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::merge::{self, MergeOptions};
use crate::node::NodeId;

use super::sequence_of;

pub fn collect(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let seq = sequence_of(evaluator.arena_mut(), &context.matches);
    Ok(context.child(vec![seq]))
}

/// `key: value` inside an object literal.
pub fn create_map(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let inputs: Vec<Context> = if context.is_empty() {
        vec![context.clone()]
    } else {
        context
            .matches
            .iter()
            .map(|id| context.single_child(*id))
            .collect()
    };

    let outer = evaluator.arena_mut().new_sequence();
    for input in inputs {
        let keys = evaluator.eval(&input, expr.lhs())?.matches;
        let values = evaluator.eval(&input, expr.rhs())?.matches;

        let arena = evaluator.arena_mut();
        let pairs = arena.new_sequence();
        for key in &keys {
            for value in &values {
                let map = arena.new_mapping();
                let key_copy = arena.deep_copy(*key);
                let value_copy = arena.deep_copy(*value);
                arena.push_entry(map, key_copy, value_copy);
                arena.push_child(pairs, map);
            }
        }
        arena.push_child(outer, pairs);
    }
    Ok(context.child(vec![outer]))
}

pub fn collect_object(
    evaluator: &mut Evaluator,
    context: &Context,
    _expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let Some(first) = context.first() else {
        let empty = evaluator.arena_mut().new_mapping();
        return Ok(context.child(vec![empty]));
    };

    let width = evaluator.arena().get(first).content.len();
    let mut results = Vec::new();
    for position in 0..width {
        let rotated: Vec<NodeId> = context
            .matches
            .iter()
            .filter_map(|id| evaluator.arena().get(*id).content.get(position).copied())
            .collect();
        results.extend(cross_pairs(evaluator, Vec::new(), &rotated)?);
    }
    for map in &results {
        evaluator.arena_mut().detach(*map);
    }
    Ok(context.child(results))
}

/// Every combination of one map from each entry of `remaining`, merged
/// onto each map in `aggregate`.
fn cross_pairs(
    evaluator: &mut Evaluator,
    aggregate: Vec<NodeId>,
    remaining: &[NodeId],
) -> Result<Vec<NodeId>, EvalError> {
    let Some((head, rest)) = remaining.split_first() else {
        return Ok(aggregate);
    };
    let candidates = evaluator.arena().get(*head).content.clone();
    if aggregate.is_empty() {
        return cross_pairs(evaluator, candidates, rest);
    }

    let options = MergeOptions {
        arrays: ArrayMergePolicy::Overwrite,
        ..MergeOptions::default()
    };
    let arena = evaluator.arena_mut();
    let mut next = Vec::with_capacity(aggregate.len() * candidates.len());
    for base in &aggregate {
        for candidate in &candidates {
            let copy = arena.deep_copy(*base);
            next.push(merge::merge(arena, copy, *candidate, &options)?);
        }
    }
    cross_pairs(evaluator, next, rest)
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::evaluator::Evaluator;
    use crate::parser::parse_expression;
    use crate::node::NodeId;

    fn run(expression: &str) -> (Evaluator, Vec<NodeId>) {
        let mut evaluator = Evaluator::new(Config::default());
        let null = evaluator.arena_mut().new_null();
        let expr = parse_expression(expression).unwrap();
        let results = evaluator.evaluate(&expr, &[null]).unwrap();
        (evaluator, results)
    }

    #[test]
    fn test_empty_brackets() {
        let (evaluator, results) = run("[]");
        assert_eq!(results.len(), 1);
        assert!(evaluator.arena().get(results[0]).content.is_empty());

        let (evaluator, results) = run("{}");
        assert_eq!(results.len(), 1);
        assert!(evaluator.arena().get(results[0]).content.is_empty());
    }

    #[test]
    fn test_object_cardinality() {
        let (_, results) = run("{\"a\": (1, 2), \"b\": (3, 4, 5)}");
        assert_eq!(results.len(), 6);
    }

    #[test]
    fn test_objects_are_roots() {
        let (evaluator, results) = run("{\"a\": 1}, {\"a\": 1, \"b\": 2}");
        for map in results {
            assert_eq!(evaluator.arena().get(map).parent, None);
            assert_eq!(evaluator.arena().nice_path(map), "");
        }
    }

    #[test]
    fn test_collect_copies() {
        let (evaluator, results) = run("[1, 2, 3]");
        let arena = evaluator.arena();
        let values: Vec<&str> = arena
            .get(results[0])
            .content
            .iter()
            .map(|id| arena.get(*id).value.as_str())
            .collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }
}
