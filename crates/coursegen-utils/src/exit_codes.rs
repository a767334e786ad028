//! Exit code constants and error mapping for coursegen.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `NOT_FOUND` | Requested course or unit does not exist |
//! | 4 | `COURSE_STATE` | Operation not allowed in the current course state |
//! | 65 | `INVALID_RESPONSE` | Provider response failed validation |
//! | 69 | `PROVIDER_FAILURE` | Provider call failed after retries |

use crate::error::{ConfigError, GenerationError, LlmError};

/// Exit codes matching the documented exit code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Course or unit not found
    pub const NOT_FOUND: ExitCode = ExitCode(3);

    /// Course state does not allow the operation
    pub const COURSE_STATE: ExitCode = ExitCode(4);

    /// Provider returned a payload that failed schema validation
    pub const INVALID_RESPONSE: ExitCode = ExitCode(65);

    /// Provider call failed after retries
    pub const PROVIDER_FAILURE: ExitCode = ExitCode(69);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(_: &ConfigError) -> Self {
        ExitCode::CLI_ARGS
    }
}

impl From<&LlmError> for ExitCode {
    fn from(err: &LlmError) -> Self {
        match err {
            LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => ExitCode::CLI_ARGS,
            _ => ExitCode::PROVIDER_FAILURE,
        }
    }
}

impl From<&GenerationError> for ExitCode {
    fn from(err: &GenerationError) -> Self {
        match err {
            GenerationError::Provider(inner) => inner.into(),
            GenerationError::Schema(_) | GenerationError::MissingArtifact { .. } => {
                ExitCode::INVALID_RESPONSE
            }
            GenerationError::UnitIndexOutOfRange { .. } | GenerationError::CourseNotFound(_) => {
                ExitCode::NOT_FOUND
            }
            GenerationError::NoCompletedUnits { .. }
            | GenerationError::UnitNotCompleted { .. }
            | GenerationError::NoQuizToGrade { .. }
            | GenerationError::MediaAlreadyInFlight { .. } => ExitCode::COURSE_STATE,
            GenerationError::InvalidRequest(_) => ExitCode::CLI_ARGS,
            GenerationError::Store(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    #[test]
    fn test_generation_errors_map_to_documented_codes() {
        let cases = [
            (
                GenerationError::Provider(LlmError::ProviderOverloaded("503".to_string())),
                69,
            ),
            (
                GenerationError::Provider(LlmError::Misconfiguration("no key".to_string())),
                2,
            ),
            (GenerationError::Schema(SchemaError::EmptyPayload), 65),
            (GenerationError::UnitIndexOutOfRange { index: 7, len: 5 }, 3),
            (
                GenerationError::NoCompletedUnits {
                    course_id: "c".to_string(),
                },
                4,
            ),
            (GenerationError::Store("disk full".to_string()), 1),
        ];

        for (err, code) in cases {
            assert_eq!(ExitCode::from(&err).as_i32(), code, "{err:?}");
        }
    }
}
