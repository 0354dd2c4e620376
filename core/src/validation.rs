// crm_core/src/validation.rs

//! Field Validator: stateless checks on single candidate values.
//!
//! Every check is pure. A check either passes or yields the `CrmError`
//! (`MissingField`, `InvalidFormat`, `InvalidValue`) whose message is the
//! human-readable reason.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{CrmError, CrmResult, FieldRole};

/// `+` followed by 7-15 digits, or the local dashed `ddd-ddd-dddd` form.
static PHONE_PATTERN: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(?:\+\d{7,15}|\d{3}-\d{3}-\d{4})$").expect("phone pattern is a valid regex"));

pub const PHONE_FORMAT_HINT: &str = "use +1234567890 or 123-456-7890";

// Column limits shared with the SQL schema.
pub const NAME_MAX_CHARS: usize = 255;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PHONE_MAX_CHARS: usize = 20;

/// Money columns are NUMERIC(10, 2): amounts must stay below 10^8.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Checks one raw value in the given role. `Value::Null` stands for "absent".
pub fn check(role: FieldRole, value: &Value) -> CrmResult<()> {
  match role {
    FieldRole::Name | FieldRole::Email => {
      let text = required_text(role, value)?;
      if role == FieldRole::Email {
        validate_email(&text)?;
      }
      Ok(())
    }
    FieldRole::Phone => match optional_text(role, value)? {
      Some(phone) => validate_phone(&phone),
      None => Ok(()),
    },
    FieldRole::Price => validate_price(parse_decimal(role, value)?),
    FieldRole::Stock => validate_stock(parse_integer(role, value)?).map(|_| ()),
    FieldRole::Total => validate_amount(role, parse_decimal(role, value)?),
  }
}

/// Extracts a required, non-blank string. Surrounding whitespace is dropped.
pub fn required_text(role: FieldRole, value: &Value) -> CrmResult<String> {
  optional_text(role, value)?.ok_or(CrmError::MissingField { field: role })
}

/// Extracts an optional string; `null`, absent and blank all mean "not given".
/// Text longer than the role's column limit is an `InvalidValue`.
pub fn optional_text(role: FieldRole, value: &Value) -> CrmResult<Option<String>> {
  match value {
    Value::Null => Ok(None),
    Value::String(s) => {
      let trimmed = s.trim();
      if trimmed.is_empty() {
        return Ok(None);
      }
      if let Some(max) = max_chars(role) {
        if trimmed.chars().count() > max {
          return Err(CrmError::invalid_value(
            role,
            format!("must be at most {} characters", max),
          ));
        }
      }
      Ok(Some(trimmed.to_string()))
    }
    other => Err(CrmError::invalid_format(
      role,
      format!("expected a string, got {}", json_type_name(other)),
    )),
  }
}

fn max_chars(role: FieldRole) -> Option<usize> {
  match role {
    FieldRole::Name => Some(NAME_MAX_CHARS),
    FieldRole::Email => Some(EMAIL_MAX_CHARS),
    FieldRole::Phone => Some(PHONE_MAX_CHARS),
    FieldRole::Price | FieldRole::Stock | FieldRole::Total => None,
  }
}

pub fn validate_email(email: &str) -> CrmResult<()> {
  let reason = if email.chars().any(char::is_whitespace) {
    Some("must not contain whitespace")
  } else {
    match email.split_once('@') {
      None => Some("must contain an @ symbol"),
      Some(("", _)) => Some("local part cannot be empty"),
      Some((_, domain)) if domain.contains('@') => Some("must contain exactly one @ symbol"),
      Some((_, domain)) if !is_plausible_domain(domain) => Some("domain is not valid"),
      Some(_) => None,
    }
  };
  match reason {
    Some(reason) => Err(CrmError::invalid_format(FieldRole::Email, reason)),
    None => Ok(()),
  }
}

fn is_plausible_domain(domain: &str) -> bool {
  !domain.is_empty()
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !domain.contains("..")
}

pub fn validate_phone(phone: &str) -> CrmResult<()> {
  if PHONE_PATTERN.is_match(phone) {
    Ok(())
  } else {
    Err(CrmError::invalid_format(FieldRole::Phone, PHONE_FORMAT_HINT))
  }
}

pub fn validate_price(price: Decimal) -> CrmResult<()> {
  if price <= Decimal::ZERO {
    return Err(CrmError::invalid_value(FieldRole::Price, "price must be positive"));
  }
  if price.scale() > 2 && price.normalize().scale() > 2 {
    return Err(CrmError::invalid_value(
      FieldRole::Price,
      "price must have at most two decimal places",
    ));
  }
  validate_amount(FieldRole::Price, price)
}

pub fn validate_amount(role: FieldRole, amount: Decimal) -> CrmResult<()> {
  if amount.abs() >= AMOUNT_LIMIT {
    return Err(CrmError::invalid_value(
      role,
      format!("must be less than {}", AMOUNT_LIMIT),
    ));
  }
  Ok(())
}

/// Stock must be a non-negative integer that fits the store's column.
pub fn validate_stock(stock: i64) -> CrmResult<i32> {
  if stock < 0 {
    return Err(CrmError::invalid_value(FieldRole::Stock, "stock cannot be negative"));
  }
  i32::try_from(stock).map_err(|_| CrmError::invalid_value(FieldRole::Stock, "stock is too large"))
}

/// Accepts JSON numbers and numeric strings.
pub fn parse_decimal(role: FieldRole, value: &Value) -> CrmResult<Decimal> {
  let parsed = match value {
    Value::Null => return Err(CrmError::MissingField { field: role }),
    Value::Number(n) => Decimal::from_str(&n.to_string()).or_else(|_| Decimal::from_scientific(&n.to_string())),
    Value::String(s) => Decimal::from_str(s.trim()),
    other => {
      return Err(CrmError::invalid_format(
        role,
        format!("expected a decimal number, got {}", json_type_name(other)),
      ))
    }
  };
  parsed.map_err(|e| CrmError::invalid_format(role, format!("not a decimal number: {}", e)))
}

pub fn parse_integer(role: FieldRole, value: &Value) -> CrmResult<i64> {
  match value {
    Value::Null => Err(CrmError::MissingField { field: role }),
    Value::Number(n) => n
      .as_i64()
      .ok_or_else(|| CrmError::invalid_format(role, format!("expected an integer, got {}", n))),
    Value::String(s) => s
      .trim()
      .parse::<i64>()
      .map_err(|_| CrmError::invalid_format(role, format!("expected an integer, got {:?}", s))),
    other => Err(CrmError::invalid_format(
      role,
      format!("expected an integer, got {}", json_type_name(other)),
    )),
  }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
