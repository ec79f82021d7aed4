//! Object graph model: typed field values and the property accessor capability
//!
//! The engine never reaches into target objects directly. Every read and write
//! goes through [`Target`], and fresh objects come from a [`TargetFactory`].
//! [`RecordNode`] is the generic implementation used when the caller does not
//! supply typed targets of its own.

use crate::error::AccessError;
use crate::schema::RecordDefinition;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// A converted field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Decimal(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// Property accessor capability over one target object.
///
/// Implementations map field and segment names to get/set operations on
/// whatever concrete type backs the record. Child collections are appended to
/// in input order and read back in insertion order.
pub trait Target: fmt::Debug + Send {
    /// Set a converted field value
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), AccessError>;

    /// Read a field value for formatting; unset properties read as `Value::Null`
    fn property(&self, name: &str) -> Result<Value, AccessError>;

    /// Append an assembled child to the named segment collection
    fn add_child(&mut self, segment: &str, child: Box<dyn Target>) -> Result<(), AccessError>;

    /// Children of the named segment collection, in insertion order
    fn children(&self, segment: &str) -> Result<Vec<&dyn Target>, AccessError>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<'a> dyn Target + 'a {
    /// Downcast a target reference to its concrete type
    pub fn downcast_ref<T: Target + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take ownership of the concrete target
    pub fn downcast<T: Target + 'static>(self: Box<Self>) -> Result<Box<T>, Box<dyn Any>> {
        self.into_any().downcast::<T>()
    }
}

/// Creates fresh target objects for matched record definitions
pub trait TargetFactory: Send + Sync {
    fn create(&self, record: &RecordDefinition) -> Result<Box<dyn Target>, AccessError>;
}

/// Generic object graph node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordNode {
    pub record: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Vec<RecordNode>>,
}

impl RecordNode {
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            fields: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Builder-style field setter; null values leave the field unset
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.fields.insert(name.to_string(), value);
        }
        self
    }

    /// Builder-style child setter; empty collections are not stored
    pub fn with_children(mut self, segment: &str, children: Vec<RecordNode>) -> Self {
        if !children.is_empty() {
            self.children
                .entry(segment.to_string())
                .or_default()
                .extend(children);
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn child_nodes(&self, segment: &str) -> &[RecordNode] {
        self.children
            .get(segment)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Target for RecordNode {
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        if value.is_null() {
            self.fields.remove(name);
        } else {
            self.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Result<Value, AccessError> {
        Ok(self.fields.get(name).cloned().unwrap_or(Value::Null))
    }

    fn add_child(&mut self, segment: &str, child: Box<dyn Target>) -> Result<(), AccessError> {
        let node = child
            .downcast::<RecordNode>()
            .map_err(|_| AccessError::UnknownSegment(segment.to_string()))?;
        self.children
            .entry(segment.to_string())
            .or_default()
            .push(*node);
        Ok(())
    }

    fn children(&self, segment: &str) -> Result<Vec<&dyn Target>, AccessError> {
        Ok(self
            .child_nodes(segment)
            .iter()
            .map(|node| node as &dyn Target)
            .collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Factory producing [`RecordNode`] targets
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeFactory;

impl TargetFactory for NodeFactory {
    fn create(&self, record: &RecordDefinition) -> Result<Box<dyn Target>, AccessError> {
        Ok(Box::new(RecordNode::new(record.name.clone())))
    }
}
