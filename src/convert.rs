//! Value Marshaler: conversions between host values and [`ScriptValue`].
//!
//! The host side of the boundary is the `serde::Serialize` contract: any
//! type that serializes through the recognized shapes (scalars, strings,
//! sequences, string-keyed maps, structs) can cross into the script world.
//! [`to_script`] is a serializer producing [`ScriptValue`] directly; shapes
//! outside the recognized set are rejected by name with a
//! [`ConversionError`], never silently coerced.
//!
//! The reverse direction, [`to_native`], is intentionally narrower: see its
//! docs for the asymmetry.

use indexmap::IndexMap;
use serde::ser::{self, Impossible, Serialize};

use crate::error::ConversionError;
use crate::value::{HostValue, ScriptTable, ScriptValue};

// ── Public API ────────────────────────────────────────────────────────────

/// Convert a host value into the script value model.
///
/// Recursive and total over the recognized shapes:
/// - `()` / `None` → [`ScriptValue::Nil`]; `Some` and newtype wrappers
///   recurse (references dereference through their `Serialize` impls).
/// - strings and `char` → `Str`; `bool` → `Bool`; every integer and float
///   kind → `Number`.
/// - maps → the mapping part of a `Table`, one entry per map entry; a key
///   that is not a string fails.
/// - structs → the mapping part of a `Table`, keyed by field name in
///   declaration order.
/// - sequences and tuples → the sequence part of a `Table`, in order.
/// - anything else (bytes, enum variants) fails, naming the shape.
pub fn to_script<T>(value: &T) -> Result<ScriptValue, ConversionError>
where
    T: Serialize + ?Sized,
{
    value.serialize(ScriptSerializer)
}

/// Convert a script value back into a host value.
///
/// Intentionally partial and asymmetric with [`to_script`]: `Number`
/// narrows to `i64`, and a `Table` comes back only as the string values of
/// its mapping part, in order.  Any mapping-part value that is not a string
/// fails, naming the offending key; the sequence part is not reconstructed
/// at all.
pub fn to_native(value: &ScriptValue) -> Result<HostValue, ConversionError> {
    Ok(match value {
        ScriptValue::Nil => HostValue::Nil,
        ScriptValue::Bool(b) => HostValue::Bool(*b),
        ScriptValue::Number(n) => HostValue::Int(*n as i64),
        ScriptValue::Str(s) => HostValue::Str(s.clone()),
        ScriptValue::Table(t) => {
            let mut out = Vec::with_capacity(t.map.len());
            for (key, v) in &t.map {
                match v {
                    ScriptValue::Str(s) => out.push(s.clone()),
                    other => {
                        return Err(ConversionError::to_native(format!(
                            "value at key {key:?} is not a string: {}",
                            other.type_name()
                        )))
                    }
                }
            }
            HostValue::Seq(out)
        }
    })
}

/// True iff the value will convert to a `Table`: after unwrapping `Some`
/// and newtype wrappers, its shape is a struct, map, sequence, or tuple.
/// False for scalars, `Nil`, and shapes [`to_script`] rejects.
pub fn will_produce_table<T>(value: &T) -> bool
where
    T: Serialize + ?Sized,
{
    value.serialize(ShapeProbe).unwrap_or(false)
}

// ── to_script serializer ──────────────────────────────────────────────────

struct ScriptSerializer;

fn unsupported(shape: &str) -> ConversionError {
    ConversionError::to_script(format!("unsupported shape for script conversion: {shape}"))
}

impl ser::Serializer for ScriptSerializer {
    type Ok = ScriptValue;
    type Error = ConversionError;

    type SerializeSeq = SeqPart;
    type SerializeTuple = SeqPart;
    type SerializeTupleStruct = SeqPart;
    type SerializeTupleVariant = Impossible<ScriptValue, ConversionError>;
    type SerializeMap = MapPart;
    type SerializeStruct = MapPart;
    type SerializeStructVariant = Impossible<ScriptValue, ConversionError>;

    fn serialize_bool(self, v: bool) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_i16(self, v: i16) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_i32(self, v: i32) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_i64(self, v: i64) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_u8(self, v: u8) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_u16(self, v: u16) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_u32(self, v: u32) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_u64(self, v: u64) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f32(self, v: f32) -> Result<ScriptValue, ConversionError> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Number(v))
    }

    fn serialize_char(self, v: char) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Str(v.to_owned()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<ScriptValue, ConversionError> {
        Err(unsupported("byte array"))
    }

    fn serialize_none(self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Nil)
    }

    fn serialize_some<T>(self, value: &T) -> Result<ScriptValue, ConversionError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Nil)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Nil)
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<ScriptValue, ConversionError> {
        Err(unsupported(&format!("enum variant {name}::{variant}")))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<ScriptValue, ConversionError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<ScriptValue, ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Err(unsupported(&format!("enum variant {name}::{variant}")))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqPart, ConversionError> {
        Ok(SeqPart { seq: Vec::with_capacity(len.unwrap_or(0)) })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqPart, ConversionError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqPart, ConversionError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ConversionError> {
        Err(unsupported(&format!("enum variant {name}::{variant}")))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapPart, ConversionError> {
        Ok(MapPart { map: IndexMap::new(), pending_key: None })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<MapPart, ConversionError> {
        Ok(MapPart { map: IndexMap::with_capacity(len), pending_key: None })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ConversionError> {
        Err(unsupported(&format!("enum variant {name}::{variant}")))
    }
}

struct SeqPart {
    seq: Vec<ScriptValue>,
}

impl SeqPart {
    fn push<T>(&mut self, value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        self.seq.push(value.serialize(ScriptSerializer)?);
        Ok(())
    }

    fn finish(self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Table(ScriptTable { seq: self.seq, map: IndexMap::new() }))
    }
}

impl ser::SerializeSeq for SeqPart {
    type Ok = ScriptValue;
    type Error = ConversionError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<ScriptValue, ConversionError> {
        self.finish()
    }
}

impl ser::SerializeTuple for SeqPart {
    type Ok = ScriptValue;
    type Error = ConversionError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<ScriptValue, ConversionError> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SeqPart {
    type Ok = ScriptValue;
    type Error = ConversionError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<ScriptValue, ConversionError> {
        self.finish()
    }
}

struct MapPart {
    map: IndexMap<String, ScriptValue>,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapPart {
    type Ok = ScriptValue;
    type Error = ConversionError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        match key.serialize(ScriptSerializer)? {
            ScriptValue::Str(s) => {
                self.pending_key = Some(s);
                Ok(())
            }
            other => Err(ConversionError::to_script(format!(
                "map key is not a string: {}",
                other.type_name()
            ))),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        // serde guarantees serialize_key was called first.
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| ConversionError::to_script("map value without a key"))?;
        self.map.insert(key, value.serialize(ScriptSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Table(ScriptTable { seq: Vec::new(), map: self.map }))
    }
}

impl ser::SerializeStruct for MapPart {
    type Ok = ScriptValue;
    type Error = ConversionError;

    fn serialize_field<T>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        self.map.insert(key.to_owned(), value.serialize(ScriptSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<ScriptValue, ConversionError> {
        Ok(ScriptValue::Table(ScriptTable { seq: Vec::new(), map: self.map }))
    }
}

// ── will_produce_table probe ──────────────────────────────────────────────

/// Classifier serializer: reports whether the top-level shape converts to a
/// table, without converting anything.  Aggregate sinks ignore their
/// contents.
struct ShapeProbe;

struct ProbeSink;

impl ser::Serializer for ShapeProbe {
    type Ok = bool;
    type Error = ConversionError;

    type SerializeSeq = ProbeSink;
    type SerializeTuple = ProbeSink;
    type SerializeTupleStruct = ProbeSink;
    type SerializeTupleVariant = ProbeSink;
    type SerializeMap = ProbeSink;
    type SerializeStruct = ProbeSink;
    type SerializeStructVariant = ProbeSink;

    fn serialize_bool(self, _v: bool) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_i8(self, _v: i8) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_i16(self, _v: i16) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_i32(self, _v: i32) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_i64(self, _v: i64) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_u8(self, _v: u8) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_u16(self, _v: u16) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_u32(self, _v: u32) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_u64(self, _v: u64) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_f32(self, _v: f32) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_f64(self, _v: f64) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_char(self, _v: char) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_str(self, _v: &str) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_none(self) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_some<T>(self, value: &T) -> Result<bool, ConversionError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<bool, ConversionError> {
        Ok(false)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<bool, ConversionError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<bool, ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(false)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }

    fn serialize_tuple(self, _len: usize) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<ProbeSink, ConversionError> {
        Ok(ProbeSink)
    }
}

impl ser::SerializeSeq for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_element<T>(&mut self, _value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(true)
    }
}

impl ser::SerializeTuple for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_element<T>(&mut self, _value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(true)
    }
}

impl ser::SerializeTupleStruct for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_field<T>(&mut self, _value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(true)
    }
}

impl ser::SerializeTupleVariant for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_field<T>(&mut self, _value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(false)
    }
}

impl ser::SerializeMap for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_key<T>(&mut self, _key: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn serialize_value<T>(&mut self, _value: &T) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(true)
    }
}

impl ser::SerializeStruct for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_field<T>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(true)
    }
}

impl ser::SerializeStructVariant for ProbeSink {
    type Ok = bool;
    type Error = ConversionError;

    fn serialize_field<T>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), ConversionError>
    where
        T: Serialize + ?Sized,
    {
        Ok(())
    }

    fn end(self) -> Result<bool, ConversionError> {
        Ok(false)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
