use crate::ast::expressions::ExpressionNode;
use crate::ast::preferences::CommentPrefs;
use crate::context::Context;
use crate::evaluator::{EvalError, Evaluator};
use crate::node::{Kind, Node, TAG_STR};

use super::metadata::assign_attribute;

/// Comment text without its `#` markers, one line per comment line.
fn strip_markers(comment: &str) -> String {
    comment
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('#').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn selected(node: &Node, prefs: CommentPrefs) -> String {
    let slots = [
        (prefs.head, &node.head_comment),
        (prefs.line, &node.line_comment),
        (prefs.foot, &node.foot_comment),
    ];
    slots
        .into_iter()
        .filter(|(wanted, text)| *wanted && !text.is_empty())
        .map(|(_, text)| strip_markers(text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `head_comment`, `line_comment`, `foot_comment`
pub fn get_comment(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = expr.operation.prefs.comments();
    let mut results = Vec::new();
    for id in &context.matches {
        let arena = evaluator.arena_mut();
        let text = selected(arena.get(*id), prefs);
        results.push(arena.create_replacement(*id, Kind::Scalar, TAG_STR, text));
    }
    Ok(context.child(results))
}

/// `line_comment = "x"`, `comments = ""` and friends. The text is stored as
/// given.
pub fn assign_comment(
    evaluator: &mut Evaluator,
    context: &Context,
    expr: &ExpressionNode,
) -> Result<Context, EvalError> {
    let prefs = expr.operation.prefs.comments();
    assign_attribute(evaluator, context, expr, false, |arena, target, text| {
        let node = arena.get_mut(target);
        if prefs.head {
            node.head_comment = text.to_string();
        }
        if prefs.line {
            node.line_comment = text.to_string();
        }
        if prefs.foot {
            node.foot_comment = text.to_string();
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_are_stripped() {
        assert_eq!(strip_markers("# hello\n#world"), "hello\nworld");
        assert_eq!(strip_markers("plain"), "plain");
    }

    #[test]
    fn test_selected_slots() {
        let node = Node {
            head_comment: "# top".into(),
            line_comment: "# side".into(),
            ..Node::default()
        };
        let line_only = CommentPrefs {
            line: true,
            ..CommentPrefs::default()
        };
        assert_eq!(selected(&node, line_only), "side");
        let all = CommentPrefs {
            head: true,
            line: true,
            foot: true,
        };
        assert_eq!(selected(&node, all), "top\nside");
    }
}
