//! Classification of non-200 responses.
//!
//! A body that decodes as a JSON object (or `null`) is a definitive answer
//! from the API and is never retried. Anything else is treated as a rate-limit rejection
//! whose resume time may be embedded in the text.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::normalize::OneOrMany;

/// Fault code returned when a request would produce too large a response.
pub const TOO_BIG_BODY: &str = "protocol.http.TooBigBody";

/// Header carrying the number of requests left in the current window.
pub const RATE_LIMIT_AVAILABLE: &str = "x-ratelimit-available";
/// Header carrying the window renewal time as epoch milliseconds.
pub const RATE_LIMIT_EXPIRY: &str = "x-ratelimit-expiry";

const QUOTA_VIOLATION_PREFIX: &str = "Quota Violation";

/// Structured error body returned by the API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Fault {
    /// HTTP status of the response that carried this fault.
    #[serde(skip)]
    pub http_status_code: u16,
    #[serde(default)]
    pub fault: FaultBody,
    /// Validation errors, reported by some endpoints instead of `fault`.
    #[serde(default)]
    pub errors: Option<ErrorList>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FaultBody {
    #[serde(default)]
    pub faultstring: String,
    #[serde(default)]
    pub detail: FaultDetail,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FaultDetail {
    #[serde(default)]
    pub errorcode: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorList {
    #[serde(default)]
    pub error: OneOrMany<String>,
}

impl Fault {
    /// Human-readable description of the fault.
    pub fn message(&self) -> String {
        if !self.fault.faultstring.is_empty() {
            return self.fault.faultstring.clone();
        }
        match &self.errors {
            Some(errors) if !errors.error.is_empty() => errors.error.join("; "),
            _ => String::from("unspecified fault"),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        let code = self.fault.detail.errorcode.as_str();
        (!code.is_empty()).then_some(code)
    }

    /// Whether the request must be split into smaller time ranges.
    pub fn is_too_big_body(&self) -> bool {
        self.fault.detail.errorcode == TOO_BIG_BODY
    }
}

/// Result of inspecting a non-200 response.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    /// Definitive structured fault.
    Terminal(Fault),
    /// Unstructured body; retry, no earlier than `resume_at` when known.
    Retryable {
        status: u16,
        body: String,
        resume_at: Option<DateTime<Utc>>,
    },
}

pub fn classify(status: u16, body: &str) -> Classification {
    if let Some(mut fault) = decode_fault(body) {
        fault.http_status_code = status;
        return Classification::Terminal(fault);
    }

    Classification::Retryable {
        status,
        body: body.to_owned(),
        resume_at: parse_quota_violation_expiration(body),
    }
}

fn decode_fault(body: &str) -> Option<Fault> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value(value).ok(),
        Ok(serde_json::Value::Null) => Some(Fault::default()),
        _ => None,
    }
}

/// Extracts the resume time from a quota violation message.
///
/// The message starts with `Quota Violation` and ends with the expiry as
/// epoch milliseconds; any other text has no known expiry.
pub fn parse_quota_violation_expiration(body: &str) -> Option<DateTime<Utc>> {
    if !body.starts_with(QUOTA_VIOLATION_PREFIX) {
        return None;
    }

    let ms = body.split_whitespace().last()?.parse::<i64>().ok()?;
    DateTime::from_timestamp(ms.div_euclid(1_000), 0)
}

/// Rate-limit window reported on every response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    pub available: Option<u64>,
    pub expiry: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };

        let available = header(RATE_LIMIT_AVAILABLE).and_then(|value| value.parse().ok());
        let expiry = header(RATE_LIMIT_EXPIRY)
            .and_then(|value| value.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        if available.is_none() && expiry.is_none() {
            return None;
        }
        Some(Self { available, expiry })
    }
}
