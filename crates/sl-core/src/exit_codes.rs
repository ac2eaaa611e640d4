//! Exit codes for the sightline CLI.
//!
//! Exit codes communicate operation outcome without requiring output parsing.

/// Exit codes for sightline commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean / nothing to report
    Clean = 0,

    /// Configuration or secrets could not be resolved or failed validation
    ConfigError = 10,

    /// Store could not be opened or initialized
    StorageError = 13,

    /// HTTP listener or audit log could not be started
    ServeError = 14,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::ConfigError.as_i32(), 10);
        assert_eq!(i32::from(ExitCode::StorageError), 13);
        assert!(ExitCode::Clean.is_success());
        assert!(!ExitCode::ServeError.is_success());
    }
}
