use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    backoff::ExponentialBackoff,
    classify::{classify, Classification, RateLimit},
    normalize::{one_or_many, one_or_many_at},
    ClientOptions, Result, RetryObserver, TradierError, TracingObserver,
};

/// Form-encoded request body, re-encoded for every attempt.
pub type Form = Vec<(String, String)>;

/// A completed `200 OK` exchange with its body fully read.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub rate_limit: Option<RateLimit>,
    pub body: String,
}

impl ApiResponse {
    /// Decodes the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|err| {
            TradierError::Decode(format!("invalid response JSON: {err}; body: {}", self.body))
        })
    }

    /// Decodes the body as one `T` or a list of `T`.
    pub fn one_or_many<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        one_or_many(self.body.as_bytes())
    }

    /// Decodes the one-or-many value at JSON `pointer` within the body.
    pub fn records_at<T: DeserializeOwned>(&self, pointer: &str) -> Result<Vec<T>> {
        one_or_many_at(self.body.as_bytes(), pointer)
    }
}

/// Runs HTTP exchanges with quota-aware retries.
///
/// Backoff state lives only for the duration of one [`execute`](Self::execute)
/// call, so concurrent calls on clones of one executor do not interfere.
#[derive(Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    authorization: String,
    options: ClientOptions,
    observer: Arc<dyn RetryObserver>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("authorization", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl RequestExecutor {
    pub fn new(authorization: impl Into<String>, options: ClientOptions) -> Self {
        Self {
            http: reqwest::Client::new(),
            authorization: authorization.into(),
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Performs up to `max_retries + 1` attempts of `method url`.
    ///
    /// Structured API faults return immediately. Transport failures and
    /// unstructured error bodies are retried; once attempts run out the last
    /// error is returned.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        form: Option<&Form>,
        max_retries: usize,
    ) -> Result<ApiResponse> {
        let mut backoff = ExponentialBackoff::new(&self.options.backoff);
        let mut planned = Some(Duration::ZERO);
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match self.build_request(&method, url, form).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    let status = response.status();
                    let rate_limit = RateLimit::from_headers(response.headers());
                    let body = response.text().await.map_err(TradierError::Transport)?;
                    return Ok(ApiResponse {
                        status,
                        rate_limit,
                        body,
                    });
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = match response.text().await {
                        Ok(body) => body,
                        Err(err) => {
                            self.observer.on_transport_error(attempt, url, &err);
                            planned = backoff.next_backoff();
                            last_error = Some(TradierError::Transport(err));
                            self.pause(attempt, max_retries, url, planned).await;
                            continue;
                        }
                    };

                    match classify(status, &body) {
                        Classification::Terminal(fault) => return Err(TradierError::Api(fault)),
                        Classification::Retryable {
                            status,
                            body,
                            resume_at,
                        } => {
                            let current = planned.unwrap_or_default();
                            planned = match quota_wait(resume_at, current, Utc::now()) {
                                Some(wait) => Some(wait),
                                None => backoff.next_backoff(),
                            };
                            last_error = Some(TradierError::QuotaViolation { status, body });
                        }
                    }
                }
                Err(err) => {
                    self.observer.on_transport_error(attempt, url, &err);
                    planned = backoff.next_backoff();
                    last_error = Some(TradierError::Transport(err));
                }
            }

            self.pause(attempt, max_retries, url, planned).await;
        }

        Err(last_error
            .unwrap_or_else(|| TradierError::Decode(format!("no attempt was made for {url}"))))
    }

    async fn pause(&self, attempt: usize, max_retries: usize, url: &str, delay: Option<Duration>) {
        if attempt >= max_retries {
            return;
        }
        if let Some(delay) = delay {
            self.observer.on_retry(attempt + 1, url, delay);
            sleep(delay).await;
        }
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        form: Option<&Form>,
    ) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, &self.authorization)
            .timeout(Duration::from_millis(self.options.timeout_ms));

        if *method != Method::DELETE {
            request = request.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        if let Some(form) = form {
            request = request.form(form);
        }
        request
    }
}

/// Wait dictated by a quota expiry, when it outlasts the currently planned delay.
///
/// One extra second covers the expiry's truncation to whole seconds.
fn quota_wait(
    resume_at: Option<DateTime<Utc>>,
    planned: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let until = (resume_at? - now).to_std().ok()?;
    (until > planned).then(|| until + Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeDelta, Utc};

    use super::{quota_wait, RequestExecutor};
    use crate::ClientOptions;

    #[test]
    fn quota_wait_outlasting_backoff_wins() {
        let now = Utc::now();
        let resume_at = now + TimeDelta::seconds(30);

        let wait = quota_wait(Some(resume_at), Duration::from_secs(2), now);

        assert_eq!(wait, Some(Duration::from_secs(31)));
    }

    #[test]
    fn quota_wait_defers_to_longer_backoff() {
        let now = Utc::now();
        let resume_at = now + TimeDelta::seconds(1);

        assert_eq!(quota_wait(Some(resume_at), Duration::from_secs(5), now), None);
    }

    #[test]
    fn quota_wait_ignores_past_or_unknown_expiry() {
        let now = Utc::now();

        assert_eq!(quota_wait(Some(now - TimeDelta::seconds(5)), Duration::ZERO, now), None);
        assert_eq!(quota_wait(None, Duration::ZERO, now), None);
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let executor = RequestExecutor::new("Bearer secret-token", ClientOptions::default());
        let debug = format!("{executor:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
