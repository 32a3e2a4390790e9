//! Bisection of time-series requests rejected as too large.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Result, TradierError};

/// Narrowest later half, in seconds, for which a range is still split.
pub const BISECTION_FLOOR_SECS: i64 = 60;

/// Requested span of history. `None` bounds mean "beginning of history" and
/// "now" respectively.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// Splits at the midpoint, or returns `None` when the later half would be
    /// narrower than [`BISECTION_FLOOR_SECS`].
    pub fn split(&self, now: DateTime<Utc>) -> Option<(TimeRange, TimeRange)> {
        let start = self.start.unwrap_or_default();
        let end = self.end.unwrap_or(now);
        let middle = bisect(start, end);
        if end - middle < TimeDelta::seconds(BISECTION_FLOOR_SECS) {
            return None;
        }
        Some((
            TimeRange::new(self.start, Some(middle)),
            TimeRange::new(Some(middle), self.end),
        ))
    }
}

/// Midpoint between `start` and `end`.
pub fn bisect(start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
    start + (end - start) / 2
}

type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<Vec<T>>> + Send + 'a>>;

/// Fetches `range`, halving it whenever the API answers with the too-big-body
/// fault. Halves are fetched one after another and concatenated in
/// chronological order. Any other error, or a fault on a range already at the
/// floor, is returned unchanged.
pub fn fetch_with_bisection<'a, T, F, Fut>(range: TimeRange, fetch: &'a F) -> FetchFuture<'a, T>
where
    T: Send + 'a,
    F: Fn(TimeRange) -> Fut + Sync,
    Fut: Future<Output = Result<Vec<T>>> + Send + 'a,
{
    Box::pin(async move {
        let err = match fetch(range).await {
            Ok(records) => return Ok(records),
            Err(err) => err,
        };

        let oversized = matches!(&err, TradierError::Api(fault) if fault.is_too_big_body());
        if !oversized {
            return Err(err);
        }

        let Some((first, second)) = range.split(Utc::now()) else {
            return Err(err);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(?first, ?second, "response too large, splitting time range");

        let mut records = fetch_with_bisection(first, fetch).await?;
        records.extend(fetch_with_bisection(second, fetch).await?);
        Ok(records)
    })
}
