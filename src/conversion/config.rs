//! Configuration options for the record engine

use crate::error::{SchemaError, SchemaResult};
use encoding_rs::Encoding;

/// What happens to a top-level line no record definition identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedPolicy {
    /// Fail with `StructuralError::UnmatchedLine`
    #[default]
    Strict,
    /// Skip the line and report it as a warning
    Lenient,
}

impl UnmatchedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmatchedPolicy::Strict => "strict",
            UnmatchedPolicy::Lenient => "lenient",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(UnmatchedPolicy::Strict),
            "lenient" | "skip" => Ok(UnmatchedPolicy::Lenient),
            other => Err(format!(
                "Invalid unmatched policy '{}'. Use 'strict' or 'lenient'",
                other
            )),
        }
    }
}

/// Engine configuration options
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Handling of unmatched top-level lines
    pub unmatched: UnmatchedPolicy,
    /// Drop empty lines before matching; lines of spaces are still records
    pub skip_blank_lines: bool,
    /// Deepest segment nesting a schema may declare
    pub max_depth: usize,
    /// Terminator written after every formatted line
    pub record_separator: String,
    /// Character encoding label of byte input and output (WHATWG names)
    pub encoding: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unmatched: UnmatchedPolicy::Strict,
            skip_blank_lines: true,
            max_depth: 32,
            record_separator: "\n".to_string(),
            encoding: "UTF-8".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Every unmatched line is fatal
    pub fn strict() -> Self {
        Self::default()
    }

    /// Unmatched lines are skipped and reported
    pub fn lenient() -> Self {
        Self {
            unmatched: UnmatchedPolicy::Lenient,
            ..Default::default()
        }
    }

    pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    pub fn with_skip_blank_lines(mut self, skip: bool) -> Self {
        self.skip_blank_lines = skip;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_record_separator(mut self, separator: &str) -> Self {
        self.record_separator = separator.to_string();
        self
    }

    pub fn with_encoding(mut self, label: &str) -> Self {
        self.encoding = label.to_string();
        self
    }

    /// Resolve the encoding label
    pub fn text_encoding(&self) -> SchemaResult<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes()).ok_or_else(|| {
            SchemaError::Configuration(format!("Unknown character encoding '{}'", self.encoding))
        })
    }

    pub fn is_lenient(&self) -> bool {
        self.unmatched == UnmatchedPolicy::Lenient
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> SchemaResult<()> {
        if self.max_depth == 0 {
            return Err(SchemaError::Configuration(
                "Max depth must be at least 1".to_string(),
            ));
        }

        if self.record_separator.is_empty() {
            return Err(SchemaError::Configuration(
                "Record separator must not be empty".to_string(),
            ));
        }

        self.text_encoding()?;
        Ok(())
    }
}
