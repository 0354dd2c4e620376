// crm_core/src/query/cursor.rs

//! Opaque pagination cursors.
//!
//! A cursor carries the sort-key tuple of the last row handed out, plus a
//! signature of the query's kind and ordering so that a cursor cannot be
//! replayed against a differently-ordered query.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::filter::SortKey;
use crate::error::{CrmError, CrmResult};
use crate::model::{EntityKind, FieldValue};

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
  sig: String,
  keys: Vec<FieldValue>,
}

/// `customer:name,-email,id`
pub fn signature(kind: EntityKind, ordering: &[SortKey]) -> String {
  let tokens: Vec<String> = ordering.iter().map(SortKey::token).collect();
  format!("{}:{}", kind, tokens.join(","))
}

pub fn encode(kind: EntityKind, ordering: &[SortKey], keys: Vec<FieldValue>) -> String {
  let payload = CursorPayload {
    sig: signature(kind, ordering),
    keys,
  };
  // FieldValue serialization cannot fail: no maps with non-string keys.
  let json = serde_json::to_vec(&payload).unwrap_or_default();
  URL_SAFE_NO_PAD.encode(json)
}

pub fn decode(cursor: &str, kind: EntityKind, ordering: &[SortKey]) -> CrmResult<Vec<FieldValue>> {
  let bytes = URL_SAFE_NO_PAD
    .decode(cursor.trim())
    .map_err(|_| CrmError::invalid_query("malformed cursor"))?;
  let payload: CursorPayload =
    serde_json::from_slice(&bytes).map_err(|_| CrmError::invalid_query("malformed cursor"))?;

  if payload.sig != signature(kind, ordering) {
    return Err(CrmError::invalid_query("cursor does not belong to this query's ordering"));
  }
  if payload.keys.len() != ordering.len() {
    return Err(CrmError::invalid_query("malformed cursor"));
  }
  // Every key must have the type its sort field produces (Null allowed for optional columns).
  for (value, key) in payload.keys.iter().zip(ordering) {
    if !value_fits(value, key) {
      return Err(CrmError::invalid_query("malformed cursor"));
    }
  }
  Ok(payload.keys)
}

fn value_fits(value: &FieldValue, key: &SortKey) -> bool {
  use super::descriptor::FieldType;
  matches!(
    (key.field.ty, value),
    (_, FieldValue::Null)
      | (FieldType::Id, FieldValue::Id(_))
      | (FieldType::Integer, FieldValue::Integer(_))
      | (FieldType::Text, FieldValue::Text(_))
      | (FieldType::Decimal, FieldValue::Decimal(_))
      | (FieldType::Timestamp, FieldValue::Timestamp(_))
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use crate::query::filter::parse_ordering;

  #[test]
  fn cursor_is_bound_to_its_ordering() {
    let descriptor = EntityKind::Customer.descriptor();
    let by_name = parse_ordering(descriptor, &["name".to_string()]).unwrap();
    let by_email = parse_ordering(descriptor, &["email".to_string()]).unwrap();

    let cursor = encode(
      EntityKind::Customer,
      &by_name,
      vec![FieldValue::Text("Alice".into()), FieldValue::Id(1)],
    );
    let keys = decode(&cursor, EntityKind::Customer, &by_name).unwrap();
    assert_eq!(keys[1], FieldValue::Id(1));

    let err = decode(&cursor, EntityKind::Customer, &by_email).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuery);
  }

  #[test]
  fn garbage_is_rejected() {
    let ordering = parse_ordering(EntityKind::Order.descriptor(), &[]).unwrap();
    for bad in ["", "not base64 !!", "eyJmb28iOjF9"] {
      assert_eq!(
        decode(bad, EntityKind::Order, &ordering).unwrap_err().kind(),
        ErrorKind::InvalidQuery
      );
    }
  }
}
