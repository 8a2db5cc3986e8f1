//! Diagnostic reporting for declarations the engine could not desugar.
//!
//! Per-declaration failures do not stop a run; they are collected as
//! `Diagnostic` values and rendered by the command line through miette.

use crate::location::SourceLocation;
use miette::Diagnostic as MietteDiagnostic;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Hint => "hint",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("{message}")]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Name of the declaration the report is about.
    pub subject: Option<String>,
    #[help]
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
            location: None,
            subject: None,
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
            location: None,
            subject: None,
            help: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        if !location.is_unknown() {
            self.location = Some(location);
        }
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// One-line rendering: `error: main.cpp:3:1: `foo`: message`.
    pub fn summary(&self) -> String {
        let mut out = format!("{}: ", self.level);
        if let Some(location) = &self.location {
            out.push_str(&format!("{}: ", location));
        }
        if let Some(subject) = &self.subject {
            out.push_str(&format!("`{}`: ", subject));
        }
        out.push_str(&self.message);
        out
    }
}
