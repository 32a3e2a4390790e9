//! Decoding of "one-or-many" payloads.
//!
//! The API emits a bare object when there is exactly one record and an array
//! when there are several. Both shapes decode to a `Vec<T>` in emission order.

use std::ops::Deref;

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{Result, TradierError};

/// Decodes `bytes` as a single `T` or, failing that, as a list of `T`.
///
/// `null` decodes to an empty list.
pub fn one_or_many<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let value: JsonValue = serde_json::from_slice(bytes)
        .map_err(|err| TradierError::Decode(format!("invalid JSON payload: {err}")))?;
    one_or_many_value(value)
}

/// Decodes the one-or-many value at JSON `pointer` inside `bytes`.
///
/// A missing value, `null` and the string `"null"` all mean "no records".
pub fn one_or_many_at<T: DeserializeOwned>(bytes: &[u8], pointer: &str) -> Result<Vec<T>> {
    let mut value: JsonValue = serde_json::from_slice(bytes)
        .map_err(|err| TradierError::Decode(format!("invalid JSON payload: {err}")))?;
    match value.pointer_mut(pointer).map(JsonValue::take) {
        None => Ok(Vec::new()),
        Some(JsonValue::String(text)) if text == "null" => Ok(Vec::new()),
        Some(found) => one_or_many_value(found),
    }
}

pub(crate) fn one_or_many_value<T: DeserializeOwned>(value: JsonValue) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }

    let single_err = match T::deserialize(&value) {
        Ok(single) => return Ok(vec![single]),
        Err(err) => err,
    };

    Vec::<T>::deserialize(&value).map_err(|list_err| {
        TradierError::Decode(format!(
            "payload is neither a single record ({single_err}) nor a list ({list_err})"
        ))
    })
}

/// Serde adapter for fields in the one-or-many shape.
///
/// Also accepts the string `"null"`, which the API uses for empty
/// collections such as `{"positions": "null"}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OneOrMany<T>(pub Vec<T>);

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Deref for OneOrMany<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.0
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        if value.as_str() == Some("null") {
            return Ok(Self::default());
        }
        one_or_many_value(value)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{one_or_many, one_or_many_at, OneOrMany};
    use crate::TradierError;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Position {
        symbol: String,
        quantity: f64,
    }

    #[test]
    fn single_object_becomes_one_element() {
        let decoded: Vec<Position> =
            one_or_many(br#"{"symbol":"AAPL","quantity":10}"#).expect("must decode");

        assert_eq!(
            decoded,
            vec![Position {
                symbol: "AAPL".to_owned(),
                quantity: 10.0
            }]
        );
    }

    #[test]
    fn array_is_returned_in_order() {
        let decoded: Vec<Position> = one_or_many(
            br#"[{"symbol":"AAPL","quantity":1},{"symbol":"MSFT","quantity":2},{"symbol":"SPY","quantity":3}]"#,
        )
        .expect("must decode");

        let symbols: Vec<_> = decoded.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, ["AAPL", "MSFT", "SPY"]);
    }

    #[test]
    fn empty_and_singleton_arrays_are_verbatim() {
        let empty: Vec<Position> = one_or_many(b"[]").expect("must decode");
        assert!(empty.is_empty());

        let one: Vec<Position> =
            one_or_many(br#"[{"symbol":"SPY","quantity":5}]"#).expect("must decode");
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn null_is_empty() {
        let decoded: Vec<Position> = one_or_many(b"null").expect("must decode");
        assert!(decoded.is_empty());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = one_or_many::<Position>(b"{\"symbol\":").expect_err("must fail");
        assert!(matches!(err, TradierError::Decode(_)));
    }

    #[test]
    fn wrong_shape_is_decode_error() {
        let err = one_or_many::<Position>(br#"{"unexpected":true}"#).expect_err("must fail");
        assert!(matches!(err, TradierError::Decode(_)));
    }

    #[test]
    fn nested_pointer_tolerates_missing_and_null_markers() {
        let body = br#"{"positions":{"position":{"symbol":"SPY","quantity":1}}}"#;
        let found: Vec<Position> = one_or_many_at(body, "/positions/position").expect("must decode");
        assert_eq!(found.len(), 1);

        let empty: Vec<Position> =
            one_or_many_at(br#"{"positions":"null"}"#, "/positions/position").expect("must decode");
        assert!(empty.is_empty());

        let err = one_or_many_at::<Position>(br#"{"positions":{"position":42}}"#, "/positions/position")
            .expect_err("must fail");
        assert!(matches!(err, TradierError::Decode(_)));
    }

    #[test]
    fn adapter_handles_nested_fields() {
        #[derive(Deserialize)]
        struct Positions {
            position: OneOrMany<Position>,
        }
        #[derive(Deserialize)]
        struct Envelope {
            positions: Option<OneOrMany<Positions>>,
        }

        let one: Envelope =
            serde_json::from_str(r#"{"positions":{"position":{"symbol":"SPY","quantity":1}}}"#)
                .expect("must decode");
        let positions = one.positions.expect("positions present");
        assert_eq!(positions[0].position.len(), 1);

        let none: Envelope =
            serde_json::from_str(r#"{"positions":"null"}"#).expect("must decode");
        assert!(none.positions.expect("field present").is_empty());
    }
}
