//! Runtime values carried by entity fields and attachments

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A field value as seen by callers. The codec layer maps each variant to
/// and from the remote wire string according to the field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Any of the text kinds (single line, multi line, url)
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// Composite unit value (dimension, volume, weight)
    Measurement(Measurement),
    /// Opaque remote id of a referenced object (product, file, entity)
    Reference(String),
    List(Vec<Value>),
}

impl Value {
    /// Variant name used in codec mismatch diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date_time",
            Value::Measurement(_) => "measurement",
            Value::Reference(_) => "reference",
            Value::List(_) => "list",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Decimal(f)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Measurement> for Value {
    fn from(m: Measurement) -> Self {
        Value::Measurement(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

/// A value carrying a unit, used by the dimension/volume/weight field types.
/// The wire representation is a compact JSON object string, e.g.
/// `{"value":2.5,"unit":"KILOGRAMS"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

impl Measurement {
    pub fn new<U: Into<String>>(value: f64, unit: U) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Units accepted by dimension fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionUnit {
    Meters,
    Centimeters,
    Millimeters,
    Inches,
    Feet,
    Yards,
}

impl DimensionUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionUnit::Meters => "METERS",
            DimensionUnit::Centimeters => "CENTIMETERS",
            DimensionUnit::Millimeters => "MILLIMETERS",
            DimensionUnit::Inches => "INCHES",
            DimensionUnit::Feet => "FEET",
            DimensionUnit::Yards => "YARDS",
        }
    }
}

/// Units accepted by volume fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeUnit {
    Milliliters,
    Centiliters,
    Liters,
    Pints,
    CubicInches,
    CubicFeet,
    CubicMeters,
    ImperialFluidOunces,
}

impl VolumeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeUnit::Milliliters => "MILLILITERS",
            VolumeUnit::Centiliters => "CENTILITERS",
            VolumeUnit::Liters => "LITERS",
            VolumeUnit::Pints => "PINTS",
            VolumeUnit::CubicInches => "CUBIC_INCHES",
            VolumeUnit::CubicFeet => "CUBIC_FEET",
            VolumeUnit::CubicMeters => "CUBIC_METERS",
            VolumeUnit::ImperialFluidOunces => "IMPERIAL_FLUID_OUNCES",
        }
    }
}

/// Units accepted by weight fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    Kilograms,
    Grams,
    Pounds,
    Ounces,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kilograms => "KILOGRAMS",
            WeightUnit::Grams => "GRAMS",
            WeightUnit::Pounds => "POUNDS",
            WeightUnit::Ounces => "OUNCES",
        }
    }
}

macro_rules! impl_unit_display {
    ($($unit:ty),*) => {
        $(
            impl fmt::Display for $unit {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl From<$unit> for String {
                fn from(unit: $unit) -> Self {
                    unit.as_str().to_string()
                }
            }
        )*
    };
}

impl_unit_display!(DimensionUnit, VolumeUnit, WeightUnit);
