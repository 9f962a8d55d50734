//! Plist helpers over `lexpr::Value`.
//!
//! Config files and status dumps are Emacs-style property lists
//! (`(:key value :key value ...)`). Keys are accepted both as
//! `Value::Keyword` (elisp parser) and `Value::Symbol(":key")`
//! (default parser).

use lexpr::Value;

/// Whether `v` is the plist key `key`.
fn is_key(v: &Value, key: &str) -> bool {
    match v {
        Value::Keyword(k) => k.as_ref() == key,
        Value::Symbol(s) => s.strip_prefix(':') == Some(key),
        _ => false,
    }
}

/// Raw value following `:key` in a plist.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = value;
    while let Value::Cons(pair) = current {
        if is_key(pair.car(), key) {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Render an atom as a bare string: keywords lose their colon,
/// booleans become `t`/`nil`.
pub fn atom_string(val: &Value) -> String {
    match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => v.strip_prefix(':').unwrap_or(v).to_string(),
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "t" } else { "nil" }.to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    }
}

/// Extract a keyword value as a string.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    get_value(value, key).map(atom_string)
}

/// Extract a boolean. Treats "nil" as false, anything else as true.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

/// Extract a floating-point value.
pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract an integer value.
pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a list of atoms as strings. `nil` and `()` give an empty list.
pub fn get_list(value: &Value, key: &str) -> Option<Vec<String>> {
    let list = get_value(value, key)?;
    let mut items = Vec::new();
    let mut current = list;
    loop {
        match current {
            Value::Cons(pair) => {
                items.push(atom_string(pair.car()));
                current = pair.cdr();
            }
            Value::Null | Value::Nil => break,
            Value::Symbol(s) if s.as_ref() == "nil" => break,
            other => {
                items.push(atom_string(other));
                break;
            }
        }
    }
    Some(items)
}

/// Every key of a plist, without the colon, in order.
pub fn keys(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        match pair.car() {
            Value::Keyword(k) => out.push(k.to_string()),
            Value::Symbol(s) if s.starts_with(':') => out.push(s[1..].to_string()),
            _ => {}
        }
        // skip the value cell
        current = match pair.cdr() {
            Value::Cons(next) => next.cdr(),
            _ => break,
        };
    }
    out
}

/// Format a boolean as `t` / `nil`.
pub fn bool_str(b: bool) -> &'static str {
    if b {
        "t"
    } else {
        "nil"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Value {
        lexpr::from_str(s).unwrap()
    }

    #[test]
    fn test_get_keyword_forms() {
        let v = parse("(:name :psi :label \"hello\" :count 3)");
        assert_eq!(get_keyword(&v, "name").as_deref(), Some("psi"));
        assert_eq!(get_keyword(&v, "label").as_deref(), Some("hello"));
        assert_eq!(get_int(&v, "count"), Some(3));
        assert_eq!(get_keyword(&v, "missing"), None);
    }

    #[test]
    fn test_get_bool_and_float() {
        let v = parse("(:a t :b nil :height 1.25)");
        assert_eq!(get_bool(&v, "a"), Some(true));
        assert_eq!(get_bool(&v, "b"), Some(false));
        assert!((get_float(&v, "height").unwrap() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_get_list() {
        let v = parse("(:gestures (:swipe-left :click) :none nil :empty ())");
        assert_eq!(
            get_list(&v, "gestures").unwrap(),
            vec!["swipe-left".to_string(), "click".to_string()]
        );
        assert!(get_list(&v, "none").unwrap().is_empty());
        assert!(get_list(&v, "empty").unwrap().is_empty());
        assert_eq!(get_list(&v, "missing"), None);
    }

    #[test]
    fn test_nested_plist() {
        let v = parse("(:rig (:mirrored t :move-rate 2))");
        let rig = get_value(&v, "rig").unwrap();
        assert_eq!(get_bool(rig, "mirrored"), Some(true));
        assert_eq!(get_int(rig, "move-rate"), Some(2));
    }

    #[test]
    fn test_keys() {
        let v = parse("(:player1 (:gestures nil) :two-users t :player3 nil)");
        assert_eq!(keys(&v), vec!["player1", "two-users", "player3"]);
    }
}
