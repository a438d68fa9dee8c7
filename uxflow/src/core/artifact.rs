//! Source artifact submitted for compilation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source language accepted by the build service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// C source.
    C,
    /// C++ source.
    #[serde(rename = "C++")]
    Cpp,
    /// Fortran source.
    Fortran,
}

impl Default for Language {
    fn default() -> Self {
        Self::C
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::C => write!(f, "C"),
            Self::Cpp => write!(f, "C++"),
            Self::Fortran => write!(f, "Fortran"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(Self::C),
            "c++" | "cpp" => Ok(Self::Cpp),
            "fortran" => Ok(Self::Fortran),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// A variable to trace on reference-core runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceVariable {
    /// Source file containing the expression.
    pub file: String,
    /// Line at which to sample the expression.
    pub line_number: u32,
    /// The expression to trace.
    pub expression: String,
}

/// Where a data source lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceType {
    /// A gateway-attached device.
    Gateway,
    /// A cloud bucket.
    Bucket,
    /// The service's own storage.
    SignaloidCloudStorage,
}

/// A default data source mounted for tasks started from a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Identifier of the resource.
    #[serde(rename = "ResourceID")]
    pub resource_id: String,
    /// Resource type.
    #[serde(rename = "ResourceType")]
    pub resource_type: DataSourceType,
    /// Mount location.
    #[serde(rename = "Location")]
    pub location: String,
}

/// Program text plus everything needed to build and run it.
///
/// Artifacts are created by the caller before submission and never mutated
/// by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceArtifact {
    /// The program text.
    pub code: String,
    /// The source language.
    pub language: Language,
    /// Default command-line arguments for tasks started from the build.
    #[serde(default)]
    pub arguments: Option<String>,
    /// Compute core selector. Falls back to the configured default core.
    #[serde(default)]
    pub core_id: Option<String>,
    /// Variables to trace.
    #[serde(default)]
    pub trace_variables: Vec<TraceVariable>,
    /// Default data sources.
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
}

impl SourceArtifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(code: impl Into<String>, language: Language) -> Self {
        Self {
            code: code.into(),
            language,
            arguments: None,
            core_id: None,
            trace_variables: Vec::new(),
            data_sources: Vec::new(),
        }
    }

    /// Sets the execution arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    /// Sets the compute core.
    #[must_use]
    pub fn with_core_id(mut self, core_id: impl Into<String>) -> Self {
        self.core_id = Some(core_id.into());
        self
    }

    /// Adds a traced variable.
    #[must_use]
    pub fn with_trace_variable(mut self, variable: TraceVariable) -> Self {
        self.trace_variables.push(variable);
        self
    }

    /// Adds a data source.
    #[must_use]
    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_sources.push(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_wire_names() {
        assert_eq!(serde_json::to_string(&Language::Cpp).unwrap(), r#""C++""#);
        assert_eq!(serde_json::to_string(&Language::C).unwrap(), r#""C""#);
        assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("Fortran".parse::<Language>().unwrap(), Language::Fortran);
        assert!("rust".parse::<Language>().is_err());
    }

    #[test]
    fn test_artifact_builder() {
        let artifact = SourceArtifact::new("int main(void) { return 0; }", Language::C)
            .with_arguments("100 1.1 1.3")
            .with_core_id("cor_custom");

        assert_eq!(artifact.arguments.as_deref(), Some("100 1.1 1.3"));
        assert_eq!(artifact.core_id.as_deref(), Some("cor_custom"));
        assert!(artifact.trace_variables.is_empty());
    }

    #[test]
    fn test_data_source_serialize() {
        let source = DataSource {
            resource_id: "bkt_1".to_string(),
            resource_type: DataSourceType::Bucket,
            location: "/data".to_string(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ResourceID": "bkt_1", "ResourceType": "Bucket", "Location": "/data"})
        );
    }
}
