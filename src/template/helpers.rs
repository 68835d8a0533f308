//! Helper functions callable as `{{name arg ...}}` and their argument parsing.

use super::context::{display, is_truthy, lookup};
use serde_json::Value;
use std::sync::Arc;

/// A helper receives its resolved arguments and returns the replacement text.
pub type Helper = Arc<dyn Fn(&[Value]) -> String + Send + Sync>;

/// Marker the `if` / `unless` helpers emit for a true result
pub const TRUTHY_MARKER: &str = "true";
/// Marker the `if` / `unless` helpers emit for a false result
pub const FALSY_MARKER: &str = "";

/// Splits a helper's argument text into resolved values.
///
/// Quoted spans (single or double quotes) are literal strings, taken verbatim.
/// Unquoted tokens starting with a letter or `@` are context paths, all-digit
/// tokens are integers and anything else is a literal string.
pub fn parse_args(args: &str, context: &Value) -> Vec<Value> {
    let mut values = Vec::new();
    let mut chars = args.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let body_start = start + c.len_utf8();
            let mut body_end = args.len();
            for (i, next) in chars.by_ref() {
                if next == c {
                    body_end = i;
                    break;
                }
            }
            values.push(Value::String(args[body_start..body_end].to_string()));
            continue;
        }

        let mut end = args.len();
        while let Some(&(i, next)) = chars.peek() {
            if next.is_whitespace() {
                end = i;
                break;
            }
            chars.next();
        }
        values.push(resolve_token(&args[start..end], context));
    }

    values
}

fn resolve_token(token: &str, context: &Value) -> Value {
    let first = token.chars().next().unwrap_or_default();
    if first.is_alphabetic() || first == '@' {
        lookup(context, token).cloned().unwrap_or(Value::Null)
    } else if token.chars().all(|c| c.is_ascii_digit()) {
        token
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(token.to_string()))
    } else {
        Value::String(token.to_string())
    }
}

/// Wraps a function as a [`Helper`].
pub fn helper<F>(f: F) -> Helper
where
    F: Fn(&[Value]) -> String + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Helpers every engine starts with.
pub fn builtin_helpers() -> Vec<(&'static str, Helper)> {
    vec![
        ("if", helper(if_helper)),
        ("unless", helper(unless_helper)),
        ("each", helper(each_helper)),
        ("join", helper(join_helper)),
        ("uppercase", helper(|args| arg_text(args, 0).to_uppercase())),
        ("lowercase", helper(|args| arg_text(args, 0).to_lowercase())),
    ]
}

fn arg_text(args: &[Value], index: usize) -> String {
    args.get(index).map(display).unwrap_or_default()
}

fn marker(flag: bool) -> String {
    let marker = if flag { TRUTHY_MARKER } else { FALSY_MARKER };
    marker.to_string()
}

fn if_helper(args: &[Value]) -> String {
    marker(args.first().is_some_and(is_truthy))
}

fn unless_helper(args: &[Value]) -> String {
    marker(!args.first().is_some_and(is_truthy))
}

/// `{{each items "- {{this}}\n"}}` repeats the sub-template once per element.
fn each_helper(args: &[Value]) -> String {
    let template = arg_text(args, 1);
    match args.first() {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| template.replace("{{this}}", &display(item)))
            .collect(),
        _ => String::new(),
    }
}

fn join_helper(args: &[Value]) -> String {
    let separator = args.get(1).map(display).unwrap_or_else(|| ",".to_string());
    match args.first() {
        Some(Value::Array(items)) => {
            items.iter().map(display).collect::<Vec<_>>().join(&separator)
        }
        Some(other) => display(other),
        None => String::new(),
    }
}
