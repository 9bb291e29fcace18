// ============================================================
// EXPORT CONFIGURATION
// ============================================================
// Export modes and the knobs that shape CSV output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;

/// Which extraction shape the caller is exporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    ObjectRows,
    LabelValueText,
    FlatMapping,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMode::ObjectRows => "object-rows",
            ExportMode::LabelValueText => "label-value-text",
            ExportMode::FlatMapping => "flat-mapping",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "object-rows" => Ok(ExportMode::ObjectRows),
            "label-value-text" => Ok(ExportMode::LabelValueText),
            "flat-mapping" => Ok(ExportMode::FlatMapping),
            other => Err(AppError::ValidationError(format!(
                "Unknown export mode '{}'",
                other
            ))),
        }
    }
}

/// Cell quoting applied during serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quoting {
    /// RFC 4180: quote cells holding a delimiter, quote, CR or LF
    #[default]
    Necessary,
    /// Join cells with the delimiter as they are, no quotes added
    Never,
}

/// How object-rows export treats records whose keys differ from the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaPolicy {
    /// Missing keys become empty cells, extra keys are dropped
    #[default]
    Lenient,
    /// Any key-set difference fails with `SchemaMismatch`
    Strict,
}

/// Header derivation for flat-mapping export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderStrategy {
    /// Union of fields across all entries, first-seen order
    #[default]
    Union,
    /// Fields of the first entry only
    FirstEntry,
}

macro_rules! kebab_from_str {
    ($ty:ty, $label:literal, { $($text:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(AppError::ValidationError(format!(
                        concat!("Unknown ", $label, " '{}'"),
                        other
                    ))),
                }
            }
        }
    };
}

kebab_from_str!(Quoting, "quoting", {
    "necessary" => Quoting::Necessary,
    "never" => Quoting::Never,
});

kebab_from_str!(SchemaPolicy, "schema policy", {
    "lenient" => SchemaPolicy::Lenient,
    "strict" => SchemaPolicy::Strict,
});

kebab_from_str!(HeaderStrategy, "header strategy", {
    "union" => HeaderStrategy::Union,
    "first-entry" => HeaderStrategy::FirstEntry,
});

/// Configuration for CSV export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub quoting: Quoting,
    pub schema_policy: SchemaPolicy,
    pub header_strategy: HeaderStrategy,
    /// Lead flat-mapping rows with an `ImageName` column holding the key
    pub image_name_column: bool,
}

impl ExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unquoted cells, and flat-mapping headers taken from the first
    /// entry's fields with no key column
    pub fn legacy() -> Self {
        Self {
            quoting: Quoting::Never,
            schema_policy: SchemaPolicy::Lenient,
            header_strategy: HeaderStrategy::FirstEntry,
            image_name_column: false,
        }
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn with_schema_policy(mut self, schema_policy: SchemaPolicy) -> Self {
        self.schema_policy = schema_policy;
        self
    }

    pub fn with_header_strategy(mut self, header_strategy: HeaderStrategy) -> Self {
        self.header_strategy = header_strategy;
        self
    }

    pub fn with_image_name_column(mut self, enabled: bool) -> Self {
        self.image_name_column = enabled;
        self
    }
}
