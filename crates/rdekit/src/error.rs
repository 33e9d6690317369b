use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Documentation link carried by configuration errors.
pub const CONFIG_DOC_URL: &str = "https://rdekit.github.io/rdekit/usage/config/";

#[derive(Error, Debug)]
pub enum RdekitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationReport),

    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Json(#[from] JsonFileError),
}

impl RdekitError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for a run aborted by this error: 2 for usage/config
    /// problems, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, RdekitError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: '{path}'")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}'{}: {message}", fmt_location(.line, .column))]
    ParseYaml {
        path: PathBuf,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Failed to parse TOML in '{path}': {message}")]
    ParseToml { path: PathBuf, message: String },

    #[error("Failed to parse JSON in '{path}' at line {line}, column {column}: {message}")]
    ParseJson {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid configuration field '{field}': {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    pub fn doc_url(&self) -> &'static str {
        CONFIG_DOC_URL
    }
}

fn fmt_location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!(" at line {l}, column {c}"),
        (Some(l), None) => format!(" at line {l}"),
        _ => String::new(),
    }
}

impl From<JsonFileError> for ConfigError {
    fn from(err: JsonFileError) -> Self {
        match err {
            JsonFileError::Read { path, source } => ConfigError::Read { path, source },
            JsonFileError::Parse {
                path,
                line,
                column,
                message,
            } => ConfigError::ParseJson {
                path,
                line,
                column,
                message,
            },
            JsonFileError::Write { path, source } => ConfigError::Read { path, source },
        }
    }
}

/// Errors raised by the JSON file helpers in [`crate::fileops`].
#[derive(Error, Debug)]
pub enum JsonFileError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in '{path}' at line {line}, column {column}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Kinds of schema/data validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    TypeMismatch,
    EnumViolation,
    ExtraProperty,
    FormatError,
    SizeExceeded,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Missing => "Missing",
            Self::TypeMismatch => "TypeMismatch",
            Self::EnumViolation => "EnumViolation",
            Self::ExtraProperty => "ExtraProperty",
            Self::FormatError => "FormatError",
            Self::SizeExceeded => "SizeExceeded",
        };
        f.write_str(name)
    }
}

/// One localized validation finding.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted field path, e.g. `basic.dataName` or `constant.length`.
    pub path: String,
    pub kind: IssueKind,
    pub detail: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}': {}", self.kind, self.path, self.detail)
    }
}

/// Collected validation findings for one document. Validation is fail-slow:
/// all findings for a document are gathered before the report is returned.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    /// Empty report becomes `Ok(())`, anything else is returned as the error.
    pub fn into_result(self) -> std::result::Result<(), ValidationReport> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Magic-variable resolution failures.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Encountered empty magic variable expression")]
    EmptyExpression,

    #[error("Unsupported magic variable '${{{0}}}'")]
    Unsupported(String),

    #[error("Field '{field}' is missing for magic variable '${{{expression}}}'")]
    MissingField { expression: String, field: String },

    #[error("'metadata:variable' entries vary per measurement and cannot be used in magic variables")]
    VariableMetadataRejected,

    #[error("Magic variable '${{{expression}}}' must resolve to a scalar value")]
    NonScalar { expression: String },

    #[error("Magic variable expansion produced an empty string for template '{template}'")]
    EmptyResult { template: String },
}

/// Archive expansion failures.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to open archive '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read archive '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive entry '{name}' in '{path}' escapes the extraction root")]
    Traversal { path: PathBuf, name: String },

    #[error("Case-insensitive duplicate path '{name}' in archive '{path}'")]
    CaseCollision { path: PathBuf, name: String },

    #[error("Failed to extract '{name}' from '{path}': {source}")]
    Extract {
        path: PathBuf,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while reading batch descriptors and grouping input files.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Excel invoice not found: '{0}'")]
    ExcelInvoiceNotFound(PathBuf),

    #[error("Multiple invoice-list sheets found in '{0}'")]
    MultipleInvoiceSheets(PathBuf),

    #[error("No invoice-list sheet found in '{0}'")]
    NoInvoiceSheet(PathBuf),

    #[error("Blank rows exist between data rows in '{0}'")]
    IntermittentBlankRows(PathBuf),

    #[error("Raw file referenced by the invoice was not found: '{name}'")]
    RawFileMissing { name: String },

    #[error("Failed to read spreadsheet '{path}': {message}")]
    Spreadsheet { path: PathBuf, message: String },

    #[error("SmartTable descriptor '{path}' violates the naming convention: {reason}")]
    DescriptorNaming { path: PathBuf, reason: String },

    #[error("SmartTable descriptor '{0}' has no mapping-key columns (basic/, custom/, sample/, meta/, inputdata)")]
    NoMappingKeys(PathBuf),

    #[error("Failed to read table file '{path}': {message}")]
    Table { path: PathBuf, message: String },

    #[error("Failed to write row file '{path}': {source}")]
    RowFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown term '{key_name}' referenced by column '{column}'")]
    UnknownTerm { column: String, key_name: String },
}

/// Failure carrier for a single pipeline processor.
///
/// `SkipRemaining` is a control-flow signal, not a failure: the pipeline
/// converts it into a successful tile completion.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationReport),

    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] JsonFileError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Dataset callback failed: {0}")]
    UserCallback(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Remaining processors skipped")]
    SkipRemaining,
}

impl ProcessorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Fatal errors abort the whole run instead of failing a single tile.
    /// Configuration and schema-level failures qualify; everything else is
    /// tile-local.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// A processor failure annotated with its tile context.
#[derive(Error, Debug)]
#[error("tile {tile_index} [{processor}]: {source}")]
pub struct PipelineError {
    pub tile_index: usize,
    pub processor: &'static str,
    #[source]
    pub source: ProcessorError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_carries_doc_url() {
        let err = ConfigError::Validation {
            field: "system.extended_mode".to_string(),
            message: "bad value".to_string(),
        };
        assert_eq!(err.doc_url(), CONFIG_DOC_URL);
    }

    #[test]
    fn test_yaml_error_display_includes_location() {
        let err = ConfigError::ParseYaml {
            path: PathBuf::from("rdeconfig.yaml"),
            line: Some(3),
            column: Some(7),
            message: "bad indent".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("line 3"));
        assert!(text.contains("column 7"));
    }

    #[test]
    fn test_validation_report_into_result() {
        let empty = ValidationReport::new();
        assert!(empty.into_result().is_ok());

        let mut report = ValidationReport::new();
        report.push(ValidationIssue::new(
            "basic.dataName",
            IssueKind::Missing,
            "required key absent",
        ));
        let err = report.into_result().unwrap_err();
        assert!(err.has_kind(IssueKind::Missing));
        assert!(err.to_string().contains("basic.dataName"));
    }

    #[test]
    fn test_pipeline_error_display_has_tile_context() {
        let err = PipelineError {
            tile_index: 3,
            processor: "raw_file_copier",
            source: ProcessorError::InvalidState("no input files".to_string()),
        };
        let text = err.to_string();
        assert!(text.contains("tile 3"));
        assert!(text.contains("raw_file_copier"));
    }

    #[test]
    fn test_exit_codes() {
        let config = RdekitError::Config(ConfigError::NotFound {
            path: PathBuf::from("rdeconfig.yaml"),
        });
        assert_eq!(config.exit_code(), 2);

        let validation = RdekitError::Validation(ValidationReport::new());
        assert_eq!(validation.exit_code(), 1);
    }

    #[test]
    fn test_skip_remaining_is_not_fatal() {
        assert!(!ProcessorError::SkipRemaining.is_fatal());
        assert!(ProcessorError::Config(ConfigError::NotFound {
            path: PathBuf::from("x"),
        })
        .is_fatal());
    }
}
