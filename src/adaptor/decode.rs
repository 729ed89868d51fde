//! Coercive decoding of extracted fields into caller types.
//!
//! Filters always produce strings, so a field like `"size": "2048"` has to land
//! in a `u64`. [`weak_decode`] walks a `serde_json::Value` and converts between
//! strings, numbers and booleans on demand, using the strict parsers from
//! [`crate::util`]. An empty string decodes as zero; any other text that does
//! not parse is an error.

use crate::util;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, Expected, IntoDeserializer, MapAccess,
    SeqAccess, Unexpected, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Map, Number, Value};

pub fn weak_decode<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    T::deserialize(WeakValue(value))
}

struct WeakValue(Value);

fn number_as_i64(n: &Number) -> i64 {
    n.as_i64()
        .or_else(|| n.as_u64().map(|u| u as i64))
        .or_else(|| n.as_f64().map(|f| f as i64))
        .unwrap_or_default()
}

/// Parses a text field, treating blank text as the zero value.
fn parse_text<T: Default>(text: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    if text.trim().is_empty() {
        Some(T::default())
    } else {
        parse(text)
    }
}

fn malformed(text: &str, expected: &dyn Expected) -> serde_json::Error {
    de::Error::invalid_value(Unexpected::Str(text), expected)
}

macro_rules! deserialize_signed {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::String(s) => match parse_text(&s, util::try_parse_int) {
                    Some(v) => visitor.visit_i64(v),
                    None => Err(malformed(&s, &visitor)),
                },
                Value::Bool(b) => visitor.visit_i64(b as i64),
                Value::Null => visitor.visit_i64(0),
                Value::Number(n) => visitor.visit_i64(number_as_i64(&n)),
                other => other.$method(visitor),
            }
        }
    )*};
}

macro_rules! deserialize_unsigned {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::String(s) => match parse_text(&s, util::try_parse_int) {
                    Some(v) if v >= 0 => visitor.visit_u64(v as u64),
                    _ => Err(malformed(&s, &visitor)),
                },
                Value::Bool(b) => visitor.visit_u64(b as u64),
                Value::Null => visitor.visit_u64(0),
                Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
                    (Some(u), _, _) => visitor.visit_u64(u),
                    (None, Some(i), _) => {
                        Err(de::Error::invalid_value(Unexpected::Signed(i), &visitor))
                    }
                    (None, None, Some(f)) if f >= 0.0 => visitor.visit_u64(f as u64),
                    (_, _, f) => Err(de::Error::invalid_value(
                        Unexpected::Float(f.unwrap_or_default()),
                        &visitor,
                    )),
                },
                other => other.$method(visitor),
            }
        }
    )*};
}

macro_rules! deserialize_float {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Value::String(s) => match parse_text(&s, util::try_parse_f64) {
                    Some(v) => visitor.visit_f64(v),
                    None => Err(malformed(&s, &visitor)),
                },
                Value::Bool(b) => visitor.visit_f64(if b { 1.0 } else { 0.0 }),
                Value::Null => visitor.visit_f64(0.0),
                other => other.$method(visitor),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for WeakValue {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(WeakSeq(items.into_iter())),
            Value::Object(map) => visitor.visit_map(WeakMap::new(map)),
            other => other.deserialize_any(visitor),
        }
    }

    deserialize_signed!(deserialize_i8, deserialize_i16, deserialize_i32, deserialize_i64);
    deserialize_unsigned!(deserialize_u8, deserialize_u16, deserialize_u32, deserialize_u64);
    deserialize_float!(deserialize_f32, deserialize_f64);

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::String(s) => match parse_text(&s, util::try_parse_bool) {
                Some(v) => visitor.visit_bool(v),
                None => Err(malformed(&s, &visitor)),
            },
            Value::Number(n) => visitor.visit_bool(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::Null => visitor.visit_bool(false),
            other => other.deserialize_bool(visitor),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            Value::Null => visitor.visit_string(String::new()),
            other => other.deserialize_string(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(WeakValue(other)),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(WeakSeq(items.into_iter())),
            Value::Null => visitor.visit_seq(WeakSeq(Vec::new().into_iter())),
            // A lone value decodes as a one-element sequence.
            other => visitor.visit_seq(WeakSeq(vec![other].into_iter())),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(WeakMap::new(map)),
            Value::Null => visitor.visit_map(WeakMap::new(Map::new())),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        i128 u128 char bytes byte_buf unit unit_struct tuple tuple_struct
        identifier ignored_any
    }
}

struct WeakSeq(std::vec::IntoIter<Value>);

impl<'de> SeqAccess<'de> for WeakSeq {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        self.0
            .next()
            .map(|value| seed.deserialize(WeakValue(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

struct WeakMap {
    entries: serde_json::map::IntoIter,
    pending: Option<Value>,
}

impl WeakMap {
    fn new(map: Map<String, Value>) -> Self {
        Self {
            entries: map.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for WeakMap {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                let key: de::value::StringDeserializer<serde_json::Error> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| <serde_json::Error as de::Error>::custom("value requested before key"))?;
        seed.deserialize(WeakValue(value))
    }
}
