//! Structured error status and the frame envelope used on streaming routes.
//!
//! A [`Status`] is what a client sees when a call fails: a coarse [`Code`],
//! a human-readable message and a list of machine-readable details. Every
//! status produced by the service carries one [`ErrorDetail::ErrorInfo`]
//! whose `reason` is stable and safe to match on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Domain reported in every `ErrorInfo` detail.
pub const ERROR_DOMAIN: &str = "bank-service";

/// Coarse status code, modelled on the usual RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Internal,
    Unknown,
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::NotFound => "NOT_FOUND",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Internal => "INTERNAL",
            Code::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconditionViolation {
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpLink {
    pub url: String,
    pub description: String,
}

/// Machine-readable detail attached to a [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type", rename_all = "snake_case")]
pub enum ErrorDetail {
    ErrorInfo {
        reason: String,
        domain: String,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
    BadRequest {
        field_violations: Vec<FieldViolation>,
    },
    PreconditionFailure {
        violations: Vec<PreconditionViolation>,
    },
    Help {
        links: Vec<HelpLink>,
    },
}

/// Error returned by any call, unary or streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    pub code: Code,
    pub message: String,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Code::Unknown, message)
    }

    /// Attaches the stable `ErrorInfo` reason plus optional metadata.
    pub fn with_reason<I, K, V>(mut self, reason: &str, metadata: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.details.push(ErrorDetail::ErrorInfo {
            reason: reason.to_string(),
            domain: ERROR_DOMAIN.to_string(),
            metadata: metadata
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }

    pub fn with_field_violation(
        mut self,
        field: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let violation = FieldViolation {
            field: field.into(),
            description: description.into(),
        };
        match self.details.iter_mut().find_map(|d| match d {
            ErrorDetail::BadRequest { field_violations } => Some(field_violations),
            _ => None,
        }) {
            Some(violations) => violations.push(violation),
            None => self.details.push(ErrorDetail::BadRequest {
                field_violations: vec![violation],
            }),
        }
        self
    }

    pub fn with_precondition(
        mut self,
        kind: impl Into<String>,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.details.push(ErrorDetail::PreconditionFailure {
            violations: vec![PreconditionViolation {
                kind: kind.into(),
                subject: subject.into(),
                description: description.into(),
            }],
        });
        self
    }

    pub fn with_help(mut self, url: impl Into<String>, description: impl Into<String>) -> Self {
        self.details.push(ErrorDetail::Help {
            links: vec![HelpLink {
                url: url.into(),
                description: description.into(),
            }],
        });
        self
    }

    /// Stable reason from the first `ErrorInfo` detail.
    pub fn reason(&self) -> Option<&str> {
        self.details.iter().find_map(|d| match d {
            ErrorDetail::ErrorInfo { reason, .. } => Some(reason.as_str()),
            _ => None,
        })
    }

    /// Metadata value from the first `ErrorInfo` detail.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.details.iter().find_map(|d| match d {
            ErrorDetail::ErrorInfo { metadata, .. } => metadata.get(key).map(String::as_str),
            _ => None,
        })
    }

    pub fn field_violations(&self) -> impl Iterator<Item = &FieldViolation> {
        self.details
            .iter()
            .filter_map(|d| match d {
                ErrorDetail::BadRequest { field_violations } => Some(field_violations.iter()),
                _ => None,
            })
            .flatten()
    }
}

/// Envelope for every text frame on a streaming route.
///
/// Either side sends any number of `message` frames followed by exactly one
/// terminal frame. A client sends `end` to half-close its input; the server
/// sends `end` on normal completion or `error` with a [`Status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Frame<T> {
    Message(T),
    End,
    Error(Status),
}
