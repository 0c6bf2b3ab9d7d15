//! `$name` / `${expr}` interpolation (spec C2 `expand_variables`, P9).
//!
//! A pure function of `(text, vars)`. Failed `${...}` expansions leave the
//! original substring untouched rather than raising or partially replacing.

use indexmap::IndexMap;

use crate::value::Value;
use crate::vars::expr;

/// Replace `${expr}` with `str(evaluate_expression(expr))` and bare `$name`
/// with the stringified value of `name`, or leave the literal text in place
/// when the name is undefined or the expression fails to evaluate.
pub fn expand(text: &str, locals: &IndexMap<String, Value>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && chars.get(i + 1) == Some(&'$') {
            out.push('$');
            i += 2;
            continue;
        }
        if c == '$' && chars.get(i + 1) == Some(&'{') {
            if let Some((expr_text, end)) = scan_braced(&chars, i + 2) {
                match expr::evaluate(&expr_text, locals) {
                    Ok(v) => out.push_str(&v.to_string()),
                    Err(_) => out.push_str(&chars[i..end].iter().collect::<String>()),
                }
                i = end;
                continue;
            }
        }
        if c == '$' {
            if let Some((name, end)) = scan_identifier(&chars, i + 1) {
                match locals.get(&name) {
                    Some(v) => out.push_str(&v.to_string()),
                    None => out.push_str(&chars[i..end].iter().collect::<String>()),
                }
                i = end;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

fn scan_braced(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut depth = 1usize;
    let mut i = start;
    let inner_start = start;
    while i < chars.len() {
        match chars[i] {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let inner: String = chars[inner_start..i].iter().collect();
                    return Some((inner, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn scan_identifier(chars: &[char], start: usize) -> Option<(String, usize)> {
    if start >= chars.len() || !(chars[start].is_alphabetic() || chars[start] == '_') {
        return None;
    }
    let mut end = start;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    Some((chars[start..end].iter().collect(), end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locals() -> IndexMap<String, Value> {
        let mut m = IndexMap::new();
        m.insert("name".to_string(), Value::String("prod01".into()));
        m.insert("count".to_string(), Value::Int(3));
        m
    }

    #[test]
    fn bare_name_is_replaced() {
        assert_eq!(expand("host $name ready", &locals()), "host prod01 ready");
    }

    #[test]
    fn undefined_bare_name_is_left_literal() {
        assert_eq!(expand("host $missing", &locals()), "host $missing");
    }

    #[test]
    fn braced_expression_is_evaluated() {
        assert_eq!(expand("total=${count + 1}", &locals()), "total=4");
    }

    #[test]
    fn failed_expression_preserves_original_text() {
        assert_eq!(expand("bad=${1 / 0}", &locals()), "bad=${1 / 0}");
    }

    #[test]
    fn escaped_dollar_is_literal() {
        assert_eq!(expand("price: \\$5", &locals()), "price: $5");
    }

    #[test]
    fn pure_function_of_text_and_vars() {
        let l = locals();
        assert_eq!(expand("$name-$count", &l), expand("$name-$count", &l));
    }
}
