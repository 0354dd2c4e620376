// crm_core/src/query/filter.rs

//! Parsing of raw filter/order specifications into typed predicates and sort
//! keys, plus their in-process evaluation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use super::descriptor::{EntityDescriptor, FieldDescriptor, FieldType, Lookup};
use crate::error::{CrmError, CrmResult};
use crate::model::{FieldValue, Record};
use crate::validation::json_type_name;

/// Separates a field name from its lookup: `name__icontains`.
pub const LOOKUP_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
  pub field: &'static FieldDescriptor,
  pub lookup: Lookup,
  pub value: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
  pub field: &'static FieldDescriptor,
  pub descending: bool,
}

impl SortKey {
  /// `name` or `-name`, the form used both on input and in cursor signatures.
  pub fn token(&self) -> String {
    if self.descending {
      format!("-{}", self.field.name)
    } else {
      self.field.name.to_string()
    }
  }
}

/// Turns `{"name__icontains": "ann", "price__gte": "10"}` into predicates.
/// A bare field name means `exact`.
pub fn parse_filters(descriptor: &EntityDescriptor, raw: &BTreeMap<String, Value>) -> CrmResult<Vec<Predicate>> {
  raw
    .iter()
    .map(|(key, value)| parse_predicate(descriptor, key, value))
    .collect()
}

fn parse_predicate(descriptor: &EntityDescriptor, key: &str, raw_value: &Value) -> CrmResult<Predicate> {
  let (field_name, lookup) = match key.split_once(LOOKUP_SEPARATOR) {
    Some((field_name, suffix)) => {
      let lookup = Lookup::parse(suffix)
        .ok_or_else(|| CrmError::invalid_query(format!("unknown lookup '{}' in filter '{}'", suffix, key)))?;
      (field_name, lookup)
    }
    None => (key, Lookup::Exact),
  };

  let field = descriptor.field(field_name).ok_or_else(|| {
    CrmError::invalid_query(format!("unknown filter field '{}' for {}", field_name, descriptor.kind))
  })?;
  if !field.supports(lookup) {
    return Err(CrmError::invalid_query(format!(
      "field '{}' of {} does not support '{}'",
      field.name, descriptor.kind, lookup
    )));
  }

  let value = parse_value(field, raw_value)
    .map_err(|reason| CrmError::invalid_query(format!("bad value for filter '{}': {}", key, reason)))?;
  Ok(Predicate { field, lookup, value })
}

/// Coerces a raw JSON value to the field's type.
pub(crate) fn parse_value(field: &FieldDescriptor, raw: &Value) -> Result<FieldValue, String> {
  match (field.ty, raw) {
    (_, Value::Null) => Err("null is not a filter value".to_string()),

    (FieldType::Id | FieldType::Integer, Value::Number(n)) => {
      let int = n.as_i64().ok_or_else(|| format!("expected an integer, got {}", n))?;
      Ok(integral(field.ty, int))
    }
    (FieldType::Id | FieldType::Integer, Value::String(s)) => {
      let int = s.trim().parse::<i64>().map_err(|_| format!("expected an integer, got {:?}", s))?;
      Ok(integral(field.ty, int))
    }

    (FieldType::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),

    (FieldType::Decimal, Value::Number(n)) => Decimal::from_str(&n.to_string())
      .map(FieldValue::Decimal)
      .map_err(|e| e.to_string()),
    (FieldType::Decimal, Value::String(s)) => Decimal::from_str(s.trim())
      .map(FieldValue::Decimal)
      .map_err(|e| e.to_string()),

    (FieldType::Timestamp, Value::String(s)) => parse_timestamp(s).map(FieldValue::Timestamp),

    (ty, other) => Err(format!("{:?} field cannot be compared with {}", ty, json_type_name(other))),
  }
}

fn integral(ty: FieldType, value: i64) -> FieldValue {
  match ty {
    FieldType::Id => FieldValue::Id(value),
    _ => FieldValue::Integer(value),
  }
}

/// RFC 3339 timestamps, or plain `YYYY-MM-DD` dates taken as midnight UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
  let raw = raw.trim();
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Ok(ts.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
    .ok_or_else(|| format!("expected an RFC 3339 timestamp or YYYY-MM-DD date, got {:?}", raw))
}

/// Parses `["name", "-price"]`. Identity ascending is appended as the final
/// tie-breaker unless `id` is already part of the ordering.
pub fn parse_ordering(descriptor: &EntityDescriptor, raw: &[String]) -> CrmResult<Vec<SortKey>> {
  let mut seen = HashSet::new();
  let mut keys = Vec::with_capacity(raw.len() + 1);

  for token in raw {
    let token = token.trim();
    let (name, descending) = match token.strip_prefix('-') {
      Some(rest) => (rest, true),
      None => (token, false),
    };
    if name.is_empty() {
      return Err(CrmError::invalid_query("empty order field"));
    }
    let field = descriptor.field(name).ok_or_else(|| {
      CrmError::invalid_query(format!("unknown order field '{}' for {}", name, descriptor.kind))
    })?;
    if !field.orderable {
      return Err(CrmError::invalid_query(format!(
        "field '{}' of {} cannot be ordered on",
        name, descriptor.kind
      )));
    }
    if !seen.insert(field.name) {
      return Err(CrmError::invalid_query(format!("order field '{}' given twice", name)));
    }
    keys.push(SortKey { field, descending });
  }

  if !seen.contains("id") {
    keys.push(SortKey {
      field: descriptor.id_field(),
      descending: false,
    });
  }
  Ok(keys)
}

impl Predicate {
  pub fn matches(&self, record: &Record) -> bool {
    let Some(actual) = record.field(self.field.name) else {
      return false;
    };
    match self.lookup {
      Lookup::Exact => actual.compare(&self.value) == Some(Ordering::Equal),
      Lookup::IContains => match (actual.as_text(), self.value.as_text()) {
        (Some(haystack), Some(needle)) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        _ => false,
      },
      Lookup::StartsWith => match (actual.as_text(), self.value.as_text()) {
        (Some(haystack), Some(prefix)) => haystack.starts_with(prefix),
        _ => false,
      },
      Lookup::Gte => matches!(actual.compare(&self.value), Some(Ordering::Greater | Ordering::Equal)),
      Lookup::Lte => matches!(actual.compare(&self.value), Some(Ordering::Less | Ordering::Equal)),
    }
  }
}

/// Sort-key tuple of a record under the given ordering.
pub fn sort_values(record: &Record, ordering: &[SortKey]) -> Vec<FieldValue> {
  ordering
    .iter()
    .map(|key| record.field(key.field.name).unwrap_or(FieldValue::Null))
    .collect()
}

/// Lexicographic comparison of two key tuples, honouring per-key direction.
pub fn compare_keys(a: &[FieldValue], b: &[FieldValue], ordering: &[SortKey]) -> Ordering {
  for ((left, right), key) in a.iter().zip(b.iter()).zip(ordering.iter()) {
    let ord = left.compare(right).unwrap_or(Ordering::Equal);
    let ord = if key.descending { ord.reverse() } else { ord };
    if ord != Ordering::Equal {
      return ord;
    }
  }
  Ordering::Equal
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use crate::model::{EntityKind, Product};
  use serde_json::json;

  fn filters(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
  }

  #[test]
  fn parses_lookups_and_bare_fields() {
    let descriptor = EntityKind::Product.descriptor();
    let preds = parse_filters(
      descriptor,
      &filters(&[("name__icontains", json!("lap")), ("price__gte", json!("10.00")), ("stock", json!(5))]),
    )
    .unwrap();
    assert_eq!(preds.len(), 3);
    assert!(preds.iter().any(|p| p.field.name == "stock" && p.lookup == Lookup::Exact));
  }

  #[test]
  fn rejects_unknown_fields_and_lookups() {
    let descriptor = EntityKind::Customer.descriptor();
    for key in ["nickname", "name__regex", "email__gte", "price__gte"] {
      let err = parse_filters(descriptor, &filters(&[(key, json!("x"))])).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidQuery, "{}", key);
    }
    let err = parse_filters(EntityKind::Product.descriptor(), &filters(&[("stock__gte", json!("many"))])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidQuery);
  }

  #[test]
  fn ordering_appends_id_and_rejects_bad_tokens() {
    let descriptor = EntityKind::Product.descriptor();
    let keys = parse_ordering(descriptor, &["-price".to_string()]).unwrap();
    let tokens: Vec<String> = keys.iter().map(SortKey::token).collect();
    assert_eq!(tokens, vec!["-price", "id"]);

    let keys = parse_ordering(descriptor, &["-id".to_string()]).unwrap();
    assert_eq!(keys.len(), 1);

    for bad in ["colour", "-", "name,price"] {
      assert_eq!(
        parse_ordering(descriptor, &[bad.to_string()]).unwrap_err().kind(),
        ErrorKind::InvalidQuery
      );
    }
    assert!(parse_ordering(EntityKind::Customer.descriptor(), &["phone".to_string()]).is_err());
    assert!(parse_ordering(descriptor, &["name".to_string(), "-name".to_string()]).is_err());
  }

  #[test]
  fn predicates_match_records() {
    let laptop = Record::Product(Product {
      id: 1,
      name: "Laptop".to_string(),
      price: Decimal::new(120000, 2),
      stock: 5,
    });
    let descriptor = EntityKind::Product.descriptor();
    let check = |key: &str, value: Value| parse_filters(descriptor, &filters(&[(key, value)])).unwrap()[0].matches(&laptop);

    assert!(check("name__icontains", json!("LAP")));
    assert!(!check("name__startswith", json!("lap")));
    assert!(check("price__gte", json!(1200)));
    assert!(!check("price__lte", json!("1199.99")));
    assert!(check("price", json!("1200")));
    assert!(check("stock__lte", json!(5)));
  }

  #[test]
  fn timestamps_accept_dates_and_rfc3339() {
    assert!(parse_timestamp("2024-03-01").is_ok());
    assert!(parse_timestamp("2024-03-01T12:30:00+02:00").is_ok());
    assert!(parse_timestamp("yesterday").is_err());
  }
}
