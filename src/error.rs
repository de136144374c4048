//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This keeps
//! a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter‑operation with `anyhow` in the binary, while still preserving rich
//! diagnostic detail.
//!
//! The module **does not** print diagnostics itself: every phase pushes into a
//! [`Diagnostics`] collector that is handed back to the caller, who decides how
//! to report and which exit code to use.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Exit code for scan, parse and resolution failures.
pub const EXIT_STATIC: i32 = 65;

/// Exit code for runtime failures.
pub const EXIT_RUNTIME: i32 = 70;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.  `location` is either ` at end` or
    /// ` at '<lexeme>'`.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure (redeclaration, forward read, bad `return`, …).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Advisory: a local binding that was never read.
    #[error("[line {line}] Warning: Variable <{name}> was never used.")]
    UnusedVariable { name: String, line: usize },

    /// Advisory: a `use` statement whose library could not be found.
    #[error("[line {line}] Warning: Could not find library '{path}'.")]
    MissingLibrary { path: String, line: usize },

    /// Runtime evaluation error.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error`.  Enables `?` on I/O ops.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for LoxError {
    fn from(err: io::Error) -> Self {
        LoxError::Io(err.to_string())
    }
}

/// ` at end` for EOF, ` at '<lexeme>'` otherwise.
fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**, reported against `token`.
    pub fn parse_at<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**, reported against `token`.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: line={}, msg={}",
            token.line, message
        );

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Advisory diagnostics never block evaluation.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            LoxError::UnusedVariable { .. } | LoxError::MissingLibrary { .. }
        )
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime { .. })
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Collector threaded through scan, parse and resolve.  Fatal errors and
/// advisory warnings are kept apart; the runtime error, when the program got
/// that far, is recorded as well.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
    warnings: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic, routing advisory ones to the warning list.
    pub fn report(&mut self, err: LoxError) {
        if err.is_advisory() {
            self.warnings.push(err);
        } else {
            self.errors.push(err);
        }
    }

    pub fn extend<I: IntoIterator<Item = LoxError>>(&mut self, errs: I) {
        for err in errs {
            self.report(err);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.errors.iter().any(LoxError::is_runtime)
    }

    /// Any scan, parse or resolution error.
    pub fn had_static_error(&self) -> bool {
        self.errors.iter().any(|e| !e.is_runtime())
    }

    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[LoxError] {
        &self.warnings
    }

    /// Process exit code the driver should use for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.had_static_error() {
            EXIT_STATIC
        } else if self.had_runtime_error() {
            EXIT_RUNTIME
        } else {
            0
        }
    }

    /// Every diagnostic, warnings first, in the order they were reported.
    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.warnings.iter().chain(self.errors.iter())
    }
}
