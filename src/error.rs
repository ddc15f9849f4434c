//! Fatal, run-level errors.
//!
//! Per-group problems never surface here: they become `SkipReason`s in the
//! manifest. `AppError` is reserved for things that stop the whole run
//! (unreadable files, invalid configuration, an empty panel).

/// Exit code for unreadable inputs, invalid configuration and write failures.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for inputs that parse but contain nothing usable.
pub const EXIT_EMPTY: u8 = 3;
/// Exit code for numeric failures outside the per-group pipeline.
pub const EXIT_NUMERIC: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
