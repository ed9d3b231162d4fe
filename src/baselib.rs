//! Standard function capabilities.
//!
//! Each function here is a host implementation that a
//! [`Runner`](crate::Runner) can be configured with by name (see
//! `registry.rs`).  They follow the script language's own calling
//! conventions: arguments arrive as a value list, results are pushed back
//! as a value list, and bad arguments raise script-level errors.
//!
//! | Capability | Behavior |
//! |------------|----------|
//! | `tostring(v)` | default/metamethod string rendition |
//! | `tonumber(v [, base])` | numbers pass through; strings parse, `nil` on failure |
//! | `error(v [, level])` | raises a script error carrying `v` |
//! | `type(v)` | type name as a string |
//! | `print(…)` | tab-separated renditions to stdout, newline-terminated |

use mlua::{Lua, MultiValue, Value};

pub const TOSTRING: &str = "tostring";
pub const TONUMBER: &str = "tonumber";
pub const ERROR: &str = "error";
pub const TYPE: &str = "type";
pub const PRINT: &str = "print";

// ── Argument helpers ──────────────────────────────────────────────────────

fn check_arg<'a>(args: &'a [Value], index: usize, fname: &str) -> mlua::Result<&'a Value> {
    args.get(index).ok_or_else(|| {
        mlua::Error::RuntimeError(format!(
            "bad argument #{} to '{fname}' (value expected)",
            index + 1
        ))
    })
}

fn one(value: Value) -> MultiValue {
    MultiValue::from_vec(vec![value])
}

// ── tostring ──────────────────────────────────────────────────────────────

pub(crate) fn tostring(lua: &Lua, args: MultiValue) -> mlua::Result<MultiValue> {
    let args = args.into_vec();
    let rendered = check_arg(&args, 0, TOSTRING)?.to_string()?;
    Ok(one(Value::String(lua.create_string(&rendered)?)))
}

// ── tonumber ──────────────────────────────────────────────────────────────

pub(crate) fn tonumber(_lua: &Lua, args: MultiValue) -> mlua::Result<MultiValue> {
    let args = args.into_vec();
    let value = check_arg(&args, 0, TONUMBER)?;

    let (base, explicit_base) = match args.get(1) {
        None | Some(Value::Nil) => (10, false),
        Some(Value::Integer(n)) => (*n, true),
        Some(Value::Number(f)) => (*f as i64, true),
        Some(other) => {
            return Err(mlua::Error::RuntimeError(format!(
                "bad argument #2 to '{TONUMBER}' (number expected, got {})",
                other.type_name()
            )))
        }
    };

    let result = match value {
        Value::Integer(_) | Value::Number(_) => value.clone(),
        Value::String(s) => {
            let text = s.to_str()?;
            parse_number(&text, base, explicit_base)
        }
        _ => Value::Nil,
    };

    Ok(one(result))
}

/// Parse a script string into a number.
///
/// Leading/trailing spaces, newlines, and tabs are trimmed.  A string
/// containing `.` parses as a float; otherwise it parses as an integer in
/// `base`, auto-detecting a `0x`/`0X` prefix as base 16 only when no
/// explicit base was given.  Unparsable input (including a base outside
/// 2..=36) yields nil, not an error.
fn parse_number(raw: &str, base: i64, explicit_base: bool) -> Value {
    let s = raw.trim_matches(&[' ', '\n', '\t'][..]);

    if s.contains('.') {
        return match s.parse::<f64>() {
            Ok(v) => Value::Number(v),
            Err(_) => Value::Nil,
        };
    }

    let (digits, base) = if !explicit_base
        && s.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("0x"))
    {
        (&s[2..], 16)
    } else {
        (s, base)
    };

    if !(2..=36).contains(&base) {
        return Value::Nil;
    }

    match i64::from_str_radix(digits, base as u32) {
        Ok(v) => Value::Integer(v),
        Err(_) => Value::Nil,
    }
}

// ── error ─────────────────────────────────────────────────────────────────

pub(crate) fn error(_lua: &Lua, args: MultiValue) -> mlua::Result<MultiValue> {
    let args = args.into_vec();
    let value = check_arg(&args, 0, ERROR)?;
    match args.get(1) {
        None | Some(Value::Nil) | Some(Value::Integer(_)) | Some(Value::Number(_)) => {}
        Some(other) => {
            return Err(mlua::Error::RuntimeError(format!(
                "bad argument #2 to '{ERROR}' (number expected, got {})",
                other.type_name()
            )))
        }
    }
    Err(mlua::Error::RuntimeError(value.to_string()?))
}

// ── type ──────────────────────────────────────────────────────────────────

pub(crate) fn type_of(lua: &Lua, args: MultiValue) -> mlua::Result<MultiValue> {
    let args = args.into_vec();
    let name = lua_type_name(check_arg(&args, 0, TYPE)?);
    Ok(one(Value::String(lua.create_string(name)?)))
}

fn lua_type_name(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) | Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Table(_) => "table",
        Value::Function(_) => "function",
        Value::Thread(_) => "thread",
        _ => "userdata",
    }
}

// ── print ─────────────────────────────────────────────────────────────────

pub(crate) fn print(_lua: &Lua, args: MultiValue) -> mlua::Result<MultiValue> {
    let line = render_print_line(&args.into_vec())?;
    println!("{line}");
    Ok(MultiValue::new())
}

/// Render a `print` argument list: each value's default/metamethod string
/// rendition, tab-separated, in argument order.  The trailing newline is
/// added by the caller.
pub fn render_print_line(args: &[Value]) -> mlua::Result<String> {
    let mut out = String::new();
    for (i, value) in args.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(&value.to_string()?);
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_number ──────────────────────────────────────────────────────

    #[test]
    fn decimal() {
        assert_eq!(parse_number("42", 10, false), Value::Integer(42));
        assert_eq!(parse_number("-7", 10, false), Value::Integer(-7));
    }

    #[test]
    fn trims_spaces_newlines_tabs() {
        assert_eq!(parse_number(" \t10\n", 10, false), Value::Integer(10));
    }

    #[test]
    fn dot_means_float() {
        assert_eq!(parse_number("3.5", 10, false), Value::Number(3.5));
        assert_eq!(parse_number("1.", 10, false), Value::Number(1.0));
    }

    #[test]
    fn hex_prefix_auto_detected_without_explicit_base() {
        assert_eq!(parse_number("0x1A", 10, false), Value::Integer(26));
        assert_eq!(parse_number("0XFF", 10, false), Value::Integer(255));
    }

    #[test]
    fn hex_prefix_not_special_with_explicit_base() {
        // An explicit base means the prefix is just unparsable digits.
        assert_eq!(parse_number("0x10", 16, true), Value::Nil);
    }

    #[test]
    fn explicit_base_applies() {
        assert_eq!(parse_number("10", 2, true), Value::Integer(2));
        assert_eq!(parse_number("zz", 36, true), Value::Integer(1295));
    }

    #[test]
    fn unparsable_yields_nil() {
        assert_eq!(parse_number("abc", 10, false), Value::Nil);
        assert_eq!(parse_number("", 10, false), Value::Nil);
        assert_eq!(parse_number("1.2.3", 10, false), Value::Nil);
    }

    #[test]
    fn out_of_range_base_yields_nil() {
        assert_eq!(parse_number("10", 99, true), Value::Nil);
        assert_eq!(parse_number("10", 1, true), Value::Nil);
    }

    // ── render_print_line ─────────────────────────────────────────────────

    #[test]
    fn print_line_is_tab_separated_in_order() {
        let lua = mlua::Lua::new();
        let args = vec![
            Value::String(lua.create_string("a").unwrap()),
            Value::String(lua.create_string("b").unwrap()),
            Value::Integer(3),
        ];
        assert_eq!(render_print_line(&args).unwrap(), "a\tb\t3");
    }

    #[test]
    fn print_line_empty_args() {
        assert_eq!(render_print_line(&[]).unwrap(), "");
    }

    // ── type names ────────────────────────────────────────────────────────

    #[test]
    fn integers_and_floats_are_both_number() {
        assert_eq!(lua_type_name(&Value::Integer(1)), "number");
        assert_eq!(lua_type_name(&Value::Number(1.5)), "number");
        assert_eq!(lua_type_name(&Value::Nil), "nil");
    }
}
