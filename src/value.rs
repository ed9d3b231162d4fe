//! Closed value model for the host/script boundary.
//!
//! [`ScriptValue`] is the only shape host data takes on its way into the
//! interpreter, and the only shape interpreter results take on their way
//! out.  [`HostValue`] is the deliberately narrower variant that
//! [`to_native`](crate::to_native) produces; see `convert.rs` for the
//! asymmetry.

use indexmap::IndexMap;
use mlua::{IntoLua, Lua, Value};

use crate::error::ConversionError;

// ── ScriptValue ───────────────────────────────────────────────────────────

/// A value in the script runtime's dynamic model.
///
/// Numbers are a single kind (`f64`); integral values cross the engine
/// boundary as integers, and numbers narrow back to `i64` in `to_native`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Table(ScriptTable),
}

/// A script table, split into its sequence part and its string-keyed
/// mapping part.  No other key kind is representable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptTable {
    pub seq: Vec<ScriptValue>,
    pub map: IndexMap<String, ScriptValue>,
}

impl ScriptValue {
    /// Name of the value's type, as the script language would report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::Str(_) => "string",
            ScriptValue::Table(_) => "table",
        }
    }
}

// ── HostValue ─────────────────────────────────────────────────────────────

/// A script result converted back to the host side.
///
/// Narrower than [`ScriptValue`] on purpose: numbers narrow to `i64` and a
/// table comes back only as the string values of its mapping part.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    Seq(Vec<String>),
}

// ── Engine boundary ───────────────────────────────────────────────────────

impl IntoLua for ScriptValue {
    fn into_lua(self, lua: &Lua) -> mlua::Result<Value> {
        Ok(match self {
            ScriptValue::Nil => Value::Nil,
            ScriptValue::Bool(b) => Value::Boolean(b),
            // Integral numbers cross as engine integers so they render
            // without a float suffix ("99", not "99.0").
            ScriptValue::Number(n) => {
                if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
                    Value::Integer(n as i64)
                } else {
                    Value::Number(n)
                }
            }
            ScriptValue::Str(s) => Value::String(lua.create_string(&s)?),
            ScriptValue::Table(t) => {
                let table = lua.create_table()?;
                for v in t.seq {
                    table.raw_push(v.into_lua(lua)?)?;
                }
                for (k, v) in t.map {
                    table.raw_set(k, v.into_lua(lua)?)?;
                }
                Value::Table(table)
            }
        })
    }
}

impl ScriptValue {
    /// Read an engine value back into the closed model.
    ///
    /// Table keys are split the way they were written: consecutive integer
    /// keys starting at 1 form the sequence part, string keys form the
    /// mapping part.  Any other key kind fails, as does any value kind the
    /// model cannot represent (functions, userdata, threads).
    pub fn from_engine(value: Value) -> Result<ScriptValue, ConversionError> {
        Ok(match value {
            Value::Nil => ScriptValue::Nil,
            Value::Boolean(b) => ScriptValue::Bool(b),
            Value::Integer(i) => ScriptValue::Number(i as f64),
            Value::Number(n) => ScriptValue::Number(n),
            Value::String(s) => ScriptValue::Str(
                s.to_str()
                    .map_err(|e| ConversionError::to_native(e.to_string()))?
                    .to_owned(),
            ),
            Value::Table(t) => {
                let mut out = ScriptTable::default();
                for pair in t.pairs::<Value, Value>() {
                    let (k, v) =
                        pair.map_err(|e| ConversionError::to_native(e.to_string()))?;
                    let v = ScriptValue::from_engine(v)?;
                    match k {
                        Value::Integer(i)
                            if usize::try_from(i) == Ok(out.seq.len() + 1) =>
                        {
                            out.seq.push(v);
                        }
                        Value::String(s) => {
                            let key = s
                                .to_str()
                                .map_err(|e| ConversionError::to_native(e.to_string()))?
                                .to_owned();
                            out.map.insert(key, v);
                        }
                        other => {
                            return Err(ConversionError::to_native(format!(
                                "table key is not a string: {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                ScriptValue::Table(out)
            }
            other => {
                return Err(ConversionError::to_native(format!(
                    "unsupported script value type: {}",
                    other.type_name()
                )))
            }
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(lua: &Lua, expr: &str) -> Value {
        lua.load(expr).eval().unwrap()
    }

    #[test]
    fn scalars_cross_both_ways() {
        let lua = Lua::new();
        for sv in [
            ScriptValue::Nil,
            ScriptValue::Bool(true),
            ScriptValue::Number(3.5),
            ScriptValue::Str("hi".into()),
        ] {
            let engine = sv.clone().into_lua(&lua).unwrap();
            assert_eq!(ScriptValue::from_engine(engine).unwrap(), sv);
        }
    }

    #[test]
    fn integer_engine_values_become_numbers() {
        let lua = Lua::new();
        let v = eval(&lua, "return 42");
        assert_eq!(ScriptValue::from_engine(v).unwrap(), ScriptValue::Number(42.0));
    }

    #[test]
    fn integral_numbers_render_without_float_suffix() {
        let lua = Lua::new();
        let v = ScriptValue::Number(99.0).into_lua(&lua).unwrap();
        assert_eq!(v, Value::Integer(99));
        let v = ScriptValue::Number(1.5).into_lua(&lua).unwrap();
        assert_eq!(v, Value::Number(1.5));
    }

    #[test]
    fn table_splits_into_seq_and_map_parts() {
        let lua = Lua::new();
        let v = eval(&lua, "return {'a', 'b', x = 'c'}");
        match ScriptValue::from_engine(v).unwrap() {
            ScriptValue::Table(t) => {
                assert_eq!(
                    t.seq,
                    vec![ScriptValue::Str("a".into()), ScriptValue::Str("b".into())]
                );
                assert_eq!(t.map.get("x"), Some(&ScriptValue::Str("c".into())));
                assert_eq!(t.map.len(), 1);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn table_round_trips_through_engine() {
        let lua = Lua::new();
        let mut map = IndexMap::new();
        map.insert("name".to_owned(), ScriptValue::Str("tf".into()));
        let table = ScriptValue::Table(ScriptTable {
            seq: vec![ScriptValue::Number(1.0), ScriptValue::Number(2.0)],
            map,
        });
        let engine = table.clone().into_lua(&lua).unwrap();
        assert_eq!(ScriptValue::from_engine(engine).unwrap(), table);
    }

    #[test]
    fn non_string_table_key_is_rejected() {
        let lua = Lua::new();
        let v = eval(&lua, "return {[true] = 'x'}");
        let err = ScriptValue::from_engine(v).unwrap_err();
        assert!(err.message.contains("boolean"), "{}", err.message);
    }

    #[test]
    fn sparse_integer_keys_are_rejected() {
        let lua = Lua::new();
        let v = eval(&lua, "return {[5] = 'x'}");
        assert!(ScriptValue::from_engine(v).is_err());
    }

    #[test]
    fn function_values_are_rejected() {
        let lua = Lua::new();
        let v = eval(&lua, "return function() end");
        let err = ScriptValue::from_engine(v).unwrap_err();
        assert!(err.message.contains("function"), "{}", err.message);
    }
}
