// crm_core/src/query/descriptor.rs

//! Capability descriptors: for each entity kind, which fields can be filtered
//! (and with which lookups) and which can be ordered on.

use std::fmt;

use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
  Id,
  Integer,
  Text,
  Decimal,
  Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
  Exact,
  IContains,
  StartsWith,
  Gte,
  Lte,
}

impl Lookup {
  pub fn parse(suffix: &str) -> Option<Self> {
    match suffix {
      "exact" => Some(Lookup::Exact),
      "icontains" => Some(Lookup::IContains),
      "startswith" => Some(Lookup::StartsWith),
      "gte" => Some(Lookup::Gte),
      "lte" => Some(Lookup::Lte),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Lookup::Exact => "exact",
      Lookup::IContains => "icontains",
      Lookup::StartsWith => "startswith",
      Lookup::Gte => "gte",
      Lookup::Lte => "lte",
    }
  }
}

impl fmt::Display for Lookup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
  /// Field name as exposed to callers. Also the column name in SQL backends.
  pub name: &'static str,
  pub ty: FieldType,
  pub lookups: &'static [Lookup],
  pub orderable: bool,
}

impl FieldDescriptor {
  pub fn supports(&self, lookup: Lookup) -> bool {
    self.lookups.contains(&lookup)
  }
}

#[derive(Debug, PartialEq, Eq)]
pub struct EntityDescriptor {
  pub kind: EntityKind,
  /// Backing table for SQL stores.
  pub table: &'static str,
  pub fields: &'static [FieldDescriptor],
}

impl EntityDescriptor {
  pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
    // `fields` is 'static, so the borrow outlives `self`.
    let fields: &'static [FieldDescriptor] = self.fields;
    fields.iter().find(|f| f.name == name)
  }

  pub fn id_field(&self) -> &'static FieldDescriptor {
    let fields: &'static [FieldDescriptor] = self.fields;
    &fields[0]
  }
}

const ID_LOOKUPS: &[Lookup] = &[Lookup::Exact, Lookup::Gte, Lookup::Lte];
const RANGE_LOOKUPS: &[Lookup] = &[Lookup::Exact, Lookup::Gte, Lookup::Lte];
const TEXT_LOOKUPS: &[Lookup] = &[Lookup::Exact, Lookup::IContains, Lookup::StartsWith];

// `id` must stay the first field of every descriptor.
static CUSTOMER: EntityDescriptor = EntityDescriptor {
  kind: EntityKind::Customer,
  table: "customers",
  fields: &[
    FieldDescriptor { name: "id", ty: FieldType::Id, lookups: ID_LOOKUPS, orderable: true },
    FieldDescriptor { name: "name", ty: FieldType::Text, lookups: TEXT_LOOKUPS, orderable: true },
    FieldDescriptor { name: "email", ty: FieldType::Text, lookups: &[Lookup::Exact, Lookup::IContains], orderable: true },
    FieldDescriptor { name: "phone", ty: FieldType::Text, lookups: &[Lookup::Exact, Lookup::StartsWith], orderable: false },
  ],
};

static PRODUCT: EntityDescriptor = EntityDescriptor {
  kind: EntityKind::Product,
  table: "products",
  fields: &[
    FieldDescriptor { name: "id", ty: FieldType::Id, lookups: ID_LOOKUPS, orderable: true },
    FieldDescriptor { name: "name", ty: FieldType::Text, lookups: TEXT_LOOKUPS, orderable: true },
    FieldDescriptor { name: "price", ty: FieldType::Decimal, lookups: RANGE_LOOKUPS, orderable: true },
    FieldDescriptor { name: "stock", ty: FieldType::Integer, lookups: RANGE_LOOKUPS, orderable: true },
  ],
};

static ORDER: EntityDescriptor = EntityDescriptor {
  kind: EntityKind::Order,
  table: "orders",
  fields: &[
    FieldDescriptor { name: "id", ty: FieldType::Id, lookups: ID_LOOKUPS, orderable: true },
    FieldDescriptor { name: "customer_id", ty: FieldType::Id, lookups: &[Lookup::Exact], orderable: true },
    FieldDescriptor { name: "total_amount", ty: FieldType::Decimal, lookups: RANGE_LOOKUPS, orderable: true },
    FieldDescriptor { name: "order_date", ty: FieldType::Timestamp, lookups: &[Lookup::Gte, Lookup::Lte], orderable: true },
  ],
};

impl EntityKind {
  pub fn descriptor(&self) -> &'static EntityDescriptor {
    match self {
      EntityKind::Customer => &CUSTOMER,
      EntityKind::Product => &PRODUCT,
      EntityKind::Order => &ORDER,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_descriptor_starts_with_an_orderable_id() {
    for kind in EntityKind::ALL {
      let id = kind.descriptor().id_field();
      assert_eq!(id.name, "id");
      assert_eq!(id.ty, FieldType::Id);
      assert!(id.orderable);
    }
  }

  #[test]
  fn field_sets_differ_per_kind() {
    assert!(EntityKind::Customer.descriptor().field("email").is_some());
    assert!(EntityKind::Product.descriptor().field("email").is_none());
    assert!(EntityKind::Order.descriptor().field("order_date").unwrap().supports(Lookup::Gte));
    assert!(!EntityKind::Customer.descriptor().field("phone").unwrap().orderable);
  }
}
