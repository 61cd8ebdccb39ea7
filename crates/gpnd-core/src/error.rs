// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fmt;

/// Unified error type for the novelty-detection pipeline.
#[derive(Debug)]
pub enum GpndError {
    /// Caller-supplied data or parameters are invalid.
    InvalidInput(String),
    /// A numeric computation produced an unusable result.
    NumericalIssue(String),
    /// The requested operation is not supported by this build.
    NotSupported(String),
    /// A size, count, or budget limit was exceeded.
    ResourceLimit(String),
    /// An underlying I/O operation failed.
    Io {
        context: String,
        source: std::io::Error,
    },
    /// Cooperative cancellation was requested.
    Cancelled,
}

impl GpndError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn cancelled() -> Self {
        Self::Cancelled
    }

    /// Stable machine-readable code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Io { .. } => "io_error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for GpndError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NumericalIssue(msg) => write!(f, "numerical issue: {msg}"),
            Self::NotSupported(msg) => write!(f, "not supported: {msg}"),
            Self::ResourceLimit(msg) => write!(f, "resource limit exceeded: {msg}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for GpndError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
