//! Converter registry: name to converter lookup

use crate::conversion::converters::{
    BooleanConverter, Converter, DateConverter, DateTimeConverter, DecimalConverter,
    IntegerConverter, TextConverter,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named converters shared by every engine built from it.
///
/// Registration happens while building; lookups afterwards are read-only, so
/// one registry can back many engines on many threads.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in converters under their usual names
    pub fn with_builtins() -> Self {
        Self::new()
            .with_converter("char", TextConverter)
            .with_converter("string", TextConverter)
            .with_converter("int", IntegerConverter)
            .with_converter("long", IntegerConverter)
            .with_converter("decimal", DecimalConverter)
            .with_converter("boolean", BooleanConverter)
            .with_converter("date", DateConverter)
            .with_converter("datetime", DateTimeConverter)
    }

    /// Register a converter, replacing any previous one of the same name
    pub fn with_converter(mut self, name: &str, converter: impl Converter + 'static) -> Self {
        self.register(name, Arc::new(converter));
        self
    }

    pub fn register(&mut self, name: &str, converter: Arc<dyn Converter>) {
        self.converters.insert(name.to_string(), converter);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Converter> {
        self.converters.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.names())
            .finish()
    }
}
