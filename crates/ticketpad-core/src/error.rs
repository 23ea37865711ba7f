use std::fmt;

use thiserror::Error;

/// Machine-readable error codes shown in the `+Errors` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    BlankField,
    UnknownIssueType,
    UnknownProject,
    EmptyDescription,
    RemoteUnreachable,
    RemoteRejected,
    RemoteDecodeFailed,
    WindowClosed,
    SurfaceIo,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::BlankField => "E2001",
            Self::UnknownIssueType => "E2002",
            Self::UnknownProject => "E2003",
            Self::EmptyDescription => "E2004",
            Self::RemoteUnreachable => "E3001",
            Self::RemoteRejected => "E3002",
            Self::RemoteDecodeFailed => "E3003",
            Self::WindowClosed => "E4001",
            Self::SurfaceIo => "E4002",
        }
    }

    /// Short human-facing summary for logs and the error buffer.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::BlankField => "Required field is blank",
            Self::UnknownIssueType => "Unknown issue type",
            Self::UnknownProject => "Unknown project",
            Self::EmptyDescription => "Empty description",
            Self::RemoteUnreachable => "Tracker unreachable",
            Self::RemoteRejected => "Tracker rejected the request",
            Self::RemoteDecodeFailed => "Tracker response could not be decoded",
            Self::WindowClosed => "Window already closed",
            Self::SurfaceIo => "Editor I/O failure",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in ticketpad/config.toml and retry."),
            Self::BlankField => Some("Fill in Summary, Project, Type and Assignee, then Put."),
            Self::UnknownIssueType => Some("Use one of the names listed on the Types: line."),
            Self::UnknownProject => Some("Use one of the keys listed on the Projects: line."),
            Self::EmptyDescription => Some("Write a description below the header block."),
            Self::RemoteUnreachable => Some("Check the server URL and network, then Get."),
            Self::RemoteRejected => Some("Check credentials and field values, then Put again."),
            Self::RemoteDecodeFailed => Some("Retry once. If persistent, report a bug with logs."),
            Self::WindowClosed | Self::SurfaceIo => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures talking to the remote tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl TrackerError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Transport { .. } => ErrorCode::RemoteUnreachable,
            Self::Status { .. } => ErrorCode::RemoteRejected,
            Self::Decode { .. } => ErrorCode::RemoteDecodeFailed,
        }
    }
}

/// Failures reading or writing an editor window.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("window {0:?} is closed")]
    Closed(String),
    #[error("window i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl SurfaceError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Closed(_) => ErrorCode::WindowClosed,
            Self::Io(_) => ErrorCode::SurfaceIo,
        }
    }
}

/// Checks run on a new-issue buffer before anything is sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("blank summary")]
    BlankSummary,
    #[error("blank project")]
    BlankProject,
    #[error("blank type")]
    BlankType,
    #[error("blank assignee")]
    BlankAssignee,
    #[error("bad issue type {0:?}")]
    UnknownType(String),
    #[error("bad project name {0:?}")]
    UnknownProject(String),
    #[error("empty description")]
    EmptyDescription,
}

impl ValidationError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::BlankSummary | Self::BlankProject | Self::BlankType | Self::BlankAssignee => {
                ErrorCode::BlankField
            }
            Self::UnknownType(_) => ErrorCode::UnknownIssueType,
            Self::UnknownProject(_) => ErrorCode::UnknownProject,
            Self::EmptyDescription => ErrorCode::EmptyDescription,
        }
    }
}

/// Anything a session handler can fail with. None of these end the session.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Remote(#[from] TrackerError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Remote(e) => e.code(),
            Self::Surface(e) => e.code(),
            Self::Validation(e) => e.code(),
        }
    }

    /// One line for the error buffer: `E#### message`.
    #[must_use]
    pub fn report(&self) -> String {
        format!("{}: {self}", self.code())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
