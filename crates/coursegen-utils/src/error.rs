use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Provider,
    ResourceLimits,
    ResponseValidation,
    CourseState,
    Storage,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Provider => write!(f, "Provider"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
            Self::ResponseValidation => write!(f, "Response Validation"),
            Self::CourseState => write!(f, "Course State"),
            Self::Storage => write!(f, "Storage"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
            Self::ValidationFailed { errors, .. } => format!(
                "Configuration validation failed with {} errors: {}",
                errors.len(),
                errors.join(", ")
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [defaults], [retry], [media], [llm] and [store] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "coursegen searches for .coursegen/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::ValidationFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Compare with the example configuration in the README".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "level" => vec!["Use 'beginner', 'intermediate' or 'advanced'".to_string()],
                "language" => vec!["Use 'en' or 'pt'".to_string()],
                "provider" => vec!["Use 'gemini' as the LLM provider".to_string()],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .coursegen/config.toml in your project root".to_string(),
                "Use --config <path> to point at an existing file".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check read permissions on the current directory and its parents".to_string(),
                "Use --config <path> to specify configuration file explicitly".to_string(),
            ],
            Self::ValidationFailed { .. } => vec![
                "Fix each listed value and run 'coursegen config' again".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors raised by provider backends.
///
/// Only [`LlmError::ProviderOverloaded`] is transient; every other variant is
/// terminal for the retry policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed request)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider reports temporary overload (503, "overloaded", "UNAVAILABLE")
    #[error("Provider overloaded: {0}")]
    ProviderOverloaded(String),

    /// Provider service outage (other 5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// A long-running operation finished with a provider-reported failure
    #[error("Provider operation failed: {0}")]
    OperationFailed(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    /// Whether the failure signals temporary unavailability worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderOverloaded(_))
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOverloaded(msg) => {
                format!("LLM provider stayed overloaded after all retries: {msg}")
            }
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::OperationFailed(msg) => format!("Provider rejected the generation: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {duration:?}")
            }
            Self::BudgetExceeded { limit, attempted } => format!(
                "LLM budget exceeded: attempted {attempted} calls, limit is {limit}"
            ),
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => Some(
                "Transport errors occur when the provider cannot be reached or rejects the request."
                    .to_string(),
            ),
            Self::ProviderOverloaded(_) => Some(
                "Overload errors are retried with exponential backoff before being reported."
                    .to_string(),
            ),
            Self::BudgetExceeded { .. } => {
                Some("Budget limits prevent excessive provider calls and costs.".to_string())
            }
            Self::Misconfiguration(_) => Some(
                "Configuration errors indicate missing or invalid provider settings.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) => vec![
                "Verify network connectivity".to_string(),
                "Try running with --verbose to see detailed error information".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the API key environment variable (default GEMINI_API_KEY) is set"
                    .to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Check your provider's usage dashboard or status page".to_string(),
            ],
            Self::ProviderOverloaded(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Raise [retry] max_attempts or initial_delay_ms".to_string(),
            ],
            Self::OperationFailed(_) => vec![
                "Run the same command again".to_string(),
                "Check that the unit summary does not violate the provider's content policy"
                    .to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase [llm] timeout_secs in configuration".to_string(),
                "Check your internet connection".to_string(),
            ],
            Self::BudgetExceeded { .. } => vec![
                "Increase [llm] budget in configuration".to_string(),
                "Run fewer generations per process".to_string(),
            ],
            Self::Misconfiguration(_) | Self::Unsupported(_) => vec![
                "Check the [llm] section of .coursegen/config.toml".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) | Self::BudgetExceeded { .. } => ErrorCategory::ResourceLimits,
            _ => ErrorCategory::Provider,
        }
    }
}

/// A provider payload that does not satisfy the declared response schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("provider returned an empty payload")]
    EmptyPayload,

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field '{path}'")]
    MissingField { path: String },

    #[error("field '{path}' should be {expected}, found {found}")]
    WrongType {
        path: String,
        expected: String,
        found: String,
    },

    #[error("field '{path}' must not be empty")]
    EmptyField { path: String },

    #[error("field '{path}' has {actual} items, expected {min}..={max}")]
    CountOutOfRange {
        path: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("field '{path}' is {actual}, expected {min}..={max}")]
    ValueOutOfRange {
        path: String,
        min: i64,
        max: i64,
        actual: i64,
    },
}

/// Failure of a generation operation.
///
/// Provider failures arrive here only after the retry policy has given up, so
/// a transient error in `Provider` is indistinguishable from a permanent one.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Provider call failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Response failed schema validation: {0}")]
    Schema(#[from] SchemaError),

    #[error("Media operation {operation} completed without an artifact reference")]
    MissingArtifact { operation: String },

    #[error("Unit index {index} is out of range for a course with {len} units")]
    UnitIndexOutOfRange { index: usize, len: usize },

    #[error("Course {course_id} has no completed units to assess")]
    NoCompletedUnits { course_id: String },

    #[error("Unit {index} of course {course_id} is not completed (status: {status})")]
    UnitNotCompleted {
        course_id: String,
        index: usize,
        status: String,
    },

    #[error("Course {course_id} has no open quiz to grade")]
    NoQuizToGrade { course_id: String },

    #[error("Media generation already in flight for unit {index}")]
    MediaAlreadyInFlight { index: usize },

    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),

    #[error("Course {0} not found")]
    CourseNotFound(String),

    #[error("Course store error: {0}")]
    Store(String),
}

impl UserFriendlyError for GenerationError {
    fn user_message(&self) -> String {
        match self {
            Self::Provider(err) => err.user_message(),
            Self::Schema(err) => format!("The provider returned an unusable response: {err}"),
            Self::MissingArtifact { .. } => {
                "Video generation finished but no video was returned".to_string()
            }
            Self::UnitIndexOutOfRange { index, len } => {
                format!("Unit {index} does not exist; the course has {len} units")
            }
            Self::NoCompletedUnits { .. } => {
                "No unit has been generated yet, so there is nothing to assess".to_string()
            }
            Self::UnitNotCompleted { index, status, .. } => {
                format!("Unit {index} is {status}; generate it before marking it done")
            }
            Self::NoQuizToGrade { .. } => {
                "There is no open quiz for this course; answers can only be graded against a quiz that was shown".to_string()
            }
            Self::MediaAlreadyInFlight { index } => {
                format!("A video for unit {index} is already being generated")
            }
            Self::InvalidRequest(msg) => format!("Invalid request: {msg}"),
            Self::CourseNotFound(id) => format!("Course {id} was not found"),
            Self::Store(msg) => format!("Could not read or write course data: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Provider(err) => err.context(),
            Self::Schema(_) => Some(
                "Responses are validated against a schema; malformed payloads are never retried."
                    .to_string(),
            ),
            Self::NoCompletedUnits { .. } | Self::UnitNotCompleted { .. } => Some(
                "Units are generated lazily when opened; an assessment only covers generated units."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Provider(err) => err.suggestions(),
            Self::Schema(_) | Self::MissingArtifact { .. } => {
                vec!["Run the same command again".to_string()]
            }
            Self::NoCompletedUnits { .. } | Self::UnitNotCompleted { .. } => {
                vec!["Open the unit with 'coursegen unit <course> <index>' first".to_string()]
            }
            Self::UnitIndexOutOfRange { .. } => {
                vec!["Use 'coursegen show <course>' to list the units".to_string()]
            }
            Self::NoQuizToGrade { .. } => {
                vec!["Generate a quiz with 'coursegen quiz <course>' first".to_string()]
            }
            Self::MediaAlreadyInFlight { .. } => {
                vec!["Wait for the running generation to finish".to_string()]
            }
            Self::InvalidRequest(_) => vec!["Provide a non-empty topic and duration".to_string()],
            Self::CourseNotFound(_) => {
                vec!["Use 'coursegen list' to see the stored courses".to_string()]
            }
            Self::Store(_) => vec!["Check permissions on the [store] dir".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Provider(err) => err.category(),
            Self::Schema(_) | Self::MissingArtifact { .. } => ErrorCategory::ResponseValidation,
            Self::Store(_) => ErrorCategory::Storage,
            _ => ErrorCategory::CourseState,
        }
    }
}
