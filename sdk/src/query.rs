//! Structured query compiler
//!
//! List operations take a `Query<F>` tree instead of a raw search string.
//! `F` is a per-resource field enum, so a filter can only mention fields
//! the remote search syntax actually indexes, and each one renders to its
//! fixed remote name. Compilation is deterministic: the same tree always
//! produces the same search string.

use chrono::{DateTime, Utc};
use std::fmt::Write;

/// A filterable field for some resource
pub trait QueryField: Copy {
    fn remote_name(&self) -> &'static str;
}

/// Fields the remote indexes on entity records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityQueryField {
    DisplayName,
    UpdatedAt,
    Id,
    Handle,
    Type,
    Status,
}

impl QueryField for EntityQueryField {
    fn remote_name(&self) -> &'static str {
        match self {
            EntityQueryField::DisplayName => "display_name",
            EntityQueryField::UpdatedAt => "updated_at",
            EntityQueryField::Id => "id",
            EntityQueryField::Handle => "handle",
            EntityQueryField::Type => "type",
            EntityQueryField::Status => "status",
        }
    }
}

/// Fields the remote indexes on products
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductQueryField {
    Title,
    Vendor,
    Sku,
    Tag,
    TagNot,
    Id,
    Handle,
    ProductType,
    CreatedAt,
    UpdatedAt,
    Status,
    Barcode,
    GiftCard,
    Price,
    InventoryTotal,
    PublishedStatus,
}

impl QueryField for ProductQueryField {
    fn remote_name(&self) -> &'static str {
        match self {
            ProductQueryField::Title => "title",
            ProductQueryField::Vendor => "vendor",
            ProductQueryField::Sku => "sku",
            ProductQueryField::Tag => "tag",
            ProductQueryField::TagNot => "tag_not",
            ProductQueryField::Id => "id",
            ProductQueryField::Handle => "handle",
            ProductQueryField::ProductType => "product_type",
            ProductQueryField::CreatedAt => "created_at",
            ProductQueryField::UpdatedAt => "updated_at",
            ProductQueryField::Status => "status",
            ProductQueryField::Barcode => "barcode",
            ProductQueryField::GiftCard => "gift_card",
            ProductQueryField::Price => "price",
            ProductQueryField::InventoryTotal => "inventory_total",
            ProductQueryField::PublishedStatus => "published_status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Not,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A comparison operand, rendered quoted except for `Raw`
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    /// Spliced into the search string verbatim, unquoted
    Raw(String),
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Text(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Text(v)
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Integer(v)
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Decimal(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Boolean(v)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(v: DateTime<Utc>) -> Self {
        QueryValue::DateTime(v)
    }
}

/// One filter tree over the fields of `F`
#[derive(Debug, Clone, PartialEq)]
pub enum Query<F> {
    Condition {
        field: F,
        op: Comparison,
        value: QueryValue,
    },
    And(Vec<Query<F>>),
    Or(Vec<Query<F>>),
    Raw(String),
}

impl<F: QueryField> Query<F> {
    pub fn eq(field: F, value: impl Into<QueryValue>) -> Self {
        Self::condition(field, Comparison::Eq, value)
    }

    pub fn not(field: F, value: impl Into<QueryValue>) -> Self {
        Self::condition(field, Comparison::Not, value)
    }

    pub fn lt(field: F, value: impl Into<QueryValue>) -> Self {
        Self::condition(field, Comparison::Lt, value)
    }

    pub fn lte(field: F, value: impl Into<QueryValue>) -> Self {
        Self::condition(field, Comparison::Lte, value)
    }

    pub fn gt(field: F, value: impl Into<QueryValue>) -> Self {
        Self::condition(field, Comparison::Gt, value)
    }

    pub fn gte(field: F, value: impl Into<QueryValue>) -> Self {
        Self::condition(field, Comparison::Gte, value)
    }

    pub fn condition(field: F, op: Comparison, value: impl Into<QueryValue>) -> Self {
        Query::Condition {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn and(members: impl IntoIterator<Item = Query<F>>) -> Self {
        Query::And(members.into_iter().collect())
    }

    pub fn or(members: impl IntoIterator<Item = Query<F>>) -> Self {
        Query::Or(members.into_iter().collect())
    }

    pub fn raw(query: impl Into<String>) -> Self {
        Query::Raw(query.into())
    }

    /// Render the tree into the remote search syntax
    pub fn compile(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        match self {
            Query::Condition { field, op, value } => {
                if *op == Comparison::Not {
                    out.push_str("NOT ");
                }
                out.push_str(field.remote_name());
                out.push(':');
                match op {
                    Comparison::Eq | Comparison::Not => {}
                    Comparison::Lt => out.push('<'),
                    Comparison::Lte => out.push_str("<="),
                    Comparison::Gt => out.push('>'),
                    Comparison::Gte => out.push_str(">="),
                }
                render_value(value, out);
            }
            Query::And(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    member.render(out);
                }
            }
            Query::Or(members) => {
                out.push('(');
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    member.render(out);
                }
                out.push(')');
            }
            Query::Raw(raw) => out.push_str(raw),
        }
    }
}

fn render_value(value: &QueryValue, out: &mut String) {
    match value {
        QueryValue::Text(s) => {
            // serde_json quoting covers embedded quotes and backslashes
            let quoted = serde_json::to_string(s).unwrap_or_default();
            out.push_str(&quoted);
        }
        QueryValue::Integer(i) => {
            let _ = write!(out, "\"{}\"", i);
        }
        QueryValue::Decimal(d) => {
            let _ = write!(out, "\"{}\"", d);
        }
        QueryValue::Boolean(b) => {
            let _ = write!(out, "\"{}\"", b);
        }
        QueryValue::DateTime(dt) => {
            let _ = write!(out, "\"{}\"", dt.format("%Y-%m-%dT%H:%M:%SZ"));
        }
        QueryValue::Raw(raw) => out.push_str(raw),
    }
}

/// Server-side sort orders for entity listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySortKey {
    Id,
    Type,
    UpdatedAt,
    DisplayName,
}

impl EntitySortKey {
    pub fn wire_name(&self) -> &'static str {
        match self {
            EntitySortKey::Id => "ID",
            EntitySortKey::Type => "TYPE",
            EntitySortKey::UpdatedAt => "UPDATED_AT",
            EntitySortKey::DisplayName => "DISPLAY_NAME",
        }
    }
}
