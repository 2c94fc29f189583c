//! Request options, parsed results and error definitions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::transport::TransportError;

/// HTTP methods the request layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method '{}'", other)),
        }
    }
}

/// Cross-origin hint carried with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    #[default]
    Cors,
    NoCors,
}

/// Options recognised by [`RequestClient::request`](crate::RequestClient::request).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    /// Pre-serialized body.
    pub body: Option<String>,
    pub mode: RequestMode,
    /// Resolve terminal failures to [`ParsedBody::Error`] instead of `Err`.
    pub catch_error: bool,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::Get)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and mark it as JSON.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn catch_error(mut self, catch_error: bool) -> Self {
        self.catch_error = catch_error;
        self
    }
}

/// A successfully decoded response, or the error value produced when the
/// caller opted into `catch_error`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// JSON body parsed structurally.
    Json(Value),
    /// Empty body or 204.
    Success,
    /// Any non-JSON content type, returned verbatim.
    Text(String),
    /// Terminal failure converted to a value.
    Error { message: String },
}

impl ParsedBody {
    pub fn is_error(&self) -> bool {
        matches!(self, ParsedBody::Error { .. })
    }

    /// Convert to the JSON shape feature code consumes:
    /// `{success:true}`, `{error:true,message}`, the parsed value, or a string.
    pub fn into_value(self) -> Value {
        match self {
            ParsedBody::Json(value) => value,
            ParsedBody::Success => json!({ "success": true }),
            ParsedBody::Text(text) => Value::String(text),
            ParsedBody::Error { message } => json!({ "error": true, "message": message }),
        }
    }
}

/// Errors that can occur while performing a request.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The transport failed before a usable response was read.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The remote answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The body did not match its declared content type.
    #[error("Failed to parse response (HTTP {status}): {message}")]
    Parse { status: u16, message: String },

    /// No bridge message arrived within the deadline.
    #[error("Bridge request timed out after {0} seconds")]
    BridgeTimeout(u64),

    /// The isolated context could not be created.
    #[error("Bridge context failed to load: {0}")]
    BridgeLoadError(String),

    /// The request performed inside the isolated context failed.
    #[error("Bridge request failed: {0}")]
    BridgeRemote(String),

    /// The remote script never invoked its callback.
    #[error("Script callback timed out after {0} seconds")]
    ScriptCallbackTimeout(u64),

    /// The remote script could not be loaded.
    #[error("Script failed to load: {0}")]
    ScriptLoadError(String),

    /// The target or relay URL could not be parsed.
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
}

impl RequestError {
    /// Status code for failures where the transport itself succeeded.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::HttpStatus { status, .. } | RequestError::Parse { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result type for request operations.
pub type RequestResult<T> = Result<T, RequestError>;
