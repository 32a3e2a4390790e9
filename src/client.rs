use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use reqwest::Method;
use serde::Deserialize;
use url::Url;

use crate::{
    executor::{ApiResponse, Form, RequestExecutor},
    split::{fetch_with_bisection, TimeRange},
    AccountBalances, ClientOptions, ClosedPosition, Event, MarketCalendar, MarketStatus, Order,
    OrderChange, OrderPreview, OrderRequest, Position, Quote, Result, RetryObserver,
    StreamSession, TimeSale, TradierError, API_ENDPOINT, SANDBOX_ENDPOINT,
};

/// Order status reported for accepted requests.
const STATUS_OK: &str = "ok";

/// Bar size of a time-series request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interval {
    Tick,
    OneMinute,
    FiveMinute,
    FifteenMinute,
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::OneMinute => "1min",
            Self::FiveMinute => "5min",
            Self::FifteenMinute => "15min",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Daily and longer bars come from the history endpoint.
    pub fn is_historical(self) -> bool {
        matches!(self, Self::Daily | Self::Weekly | Self::Monthly)
    }
}

#[derive(Clone)]
/// HTTP client for the Tradier brokerage API.
pub struct TradierClient {
    executor: RequestExecutor,
    endpoint: String,
    account: Option<String>,
}

impl fmt::Debug for TradierClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradierClient")
            .field("endpoint", &self.endpoint)
            .field("account", &self.account)
            .field("executor", &self.executor)
            .finish()
    }
}

impl TradierClient {
    /// Creates a production client from an access token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self::with_endpoint(API_ENDPOINT, token)
    }

    /// Creates a client for the paper-trading sandbox.
    pub fn sandbox(token: impl AsRef<str>) -> Self {
        Self::with_endpoint(SANDBOX_ENDPOINT, token)
    }

    /// Creates a client for an arbitrary base URL, e.g. a local mock.
    pub fn with_endpoint(endpoint: impl Into<String>, token: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(token.as_ref());
        let endpoint: String = endpoint.into();
        Self {
            executor: RequestExecutor::new(authorization, ClientOptions::default()),
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            account: None,
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `TRADIER_TOKEN` — access token (Bearer prefix optional)
    /// - `TRADIER_ENDPOINT` — optional base URL, defaults to production
    /// - `TRADIER_ACCOUNT` — optional account to select
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("TRADIER_TOKEN")
            .map_err(|_| TradierError::Config("missing TRADIER_TOKEN environment variable".into()))?;
        if token.trim().is_empty() {
            return Err(TradierError::Config("TRADIER_TOKEN is set but empty".into()));
        }
        let endpoint = std::env::var("TRADIER_ENDPOINT")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| API_ENDPOINT.to_owned());

        let mut client = Self::with_endpoint(endpoint, token);
        if let Ok(account) = std::env::var("TRADIER_ACCOUNT") {
            if !account.trim().is_empty() {
                client.select_account(account.trim());
            }
        }
        Ok(client)
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.executor = self.executor.with_options(opts);
        self
    }

    /// Replaces the retry observer (logging by default).
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    /// Sets the account used by account-scoped methods.
    pub fn select_account(&mut self, account: impl Into<String>) {
        self.account = Some(account.into());
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn get_account_balances(&self) -> Result<AccountBalances> {
        let url = self.account_url("balances")?;
        #[derive(Deserialize)]
        struct Envelope {
            balances: AccountBalances,
        }
        Ok(self.get(&url).await?.json::<Envelope>()?.balances)
    }

    pub async fn get_account_positions(&self) -> Result<Vec<Position>> {
        let url = self.account_url("positions")?;
        self.get(&url).await?.records_at("/positions/position")
    }

    /// Returns the account history, newest first. `limit` of `None` uses the
    /// API default.
    pub async fn get_account_history(&self, limit: Option<u32>) -> Result<Vec<Event>> {
        let mut url = self.account_url("history")?;
        if let Some(limit) = limit {
            url = with_query(&url, &[("limit", limit.to_string())])?;
        }
        self.get(&url).await?.records_at("/history/event")
    }

    /// Returns realized gains and losses.
    pub async fn get_account_cost_basis(&self) -> Result<Vec<ClosedPosition>> {
        let url = self.account_url("gainloss")?;
        self.get(&url).await?.records_at("/gainloss/closed_position")
    }

    pub async fn get_open_orders(&self) -> Result<Vec<Order>> {
        let url = self.account_url("orders")?;
        self.get(&url).await?.records_at("/orders/order")
    }

    pub async fn get_order_status(&self, order_id: i64) -> Result<Order> {
        let url = self.account_url(&format!("orders/{order_id}"))?;
        self.get(&url)
            .await?
            .records_at::<Order>("/order")?
            .into_iter()
            .next()
            .ok_or_else(|| TradierError::Decode(format!("order {order_id} missing from response")))
    }

    /// Places an order and returns its id.
    ///
    /// Never retried, so a lost response cannot place the order twice.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<i64> {
        let url = self.account_url("orders")?;
        let form = order.to_form()?;
        let response = self.executor.execute(Method::POST, &url, Some(&form), 0).await?;
        let ack = order_ack(&response)?;
        ack.ensure_ok()?;
        Ok(ack.id)
    }

    /// Returns the cost of the order without placing it.
    pub async fn preview_order(&self, order: &OrderRequest) -> Result<OrderPreview> {
        let url = self.account_url("orders")?;
        let mut form = order.to_form()?;
        form.push(("preview".to_owned(), "true".to_owned()));
        let response = self.send(Method::POST, &url, Some(&form)).await?;

        #[derive(Deserialize)]
        struct Envelope {
            order: Option<OrderPreview>,
        }
        let preview = response
            .json::<Envelope>()?
            .order
            .ok_or_else(|| TradierError::Decode("response has no order preview".into()))?;
        if preview.status != STATUS_OK {
            return Err(TradierError::OrderRejected {
                id: 0,
                status: preview.status,
            });
        }
        Ok(preview)
    }

    pub async fn change_order(&self, order_id: i64, change: &OrderChange) -> Result<()> {
        let url = self.account_url(&format!("orders/{order_id}"))?;
        let form = change.to_form()?;
        let response = self.send(Method::PUT, &url, Some(&form)).await?;
        order_ack(&response)?.ensure_matches(order_id)
    }

    pub async fn cancel_order(&self, order_id: i64) -> Result<()> {
        let url = self.account_url(&format!("orders/{order_id}"))?;
        let response = self.send(Method::DELETE, &url, None).await?;
        order_ack(&response)?.ensure_matches(order_id)
    }

    pub async fn get_quotes(&self, symbols: &[&str]) -> Result<Vec<Quote>> {
        let url = self.url("/v1/markets/quotes", &[("symbols", symbols.join(","))])?;
        self.get(&url).await?.records_at("/quotes/quote")
    }

    pub async fn get_market_state(&self) -> Result<MarketStatus> {
        let url = self.url("/v1/markets/clock", &[])?;
        #[derive(Deserialize)]
        struct Envelope {
            clock: MarketStatus,
        }
        Ok(self.get(&url).await?.json::<Envelope>()?.clock)
    }

    pub async fn get_market_calendar(&self, year: i32, month: u32) -> Result<Vec<MarketCalendar>> {
        let url = self.url(
            "/v1/markets/calendar",
            &[("year", year.to_string()), ("month", month.to_string())],
        )?;
        self.get(&url).await?.records_at("/calendar/days/day")
    }

    /// Returns price bars or ticks for `symbol` over `range`.
    ///
    /// Requests the API rejects as too large are split in half recursively
    /// until each piece fits or the pieces become narrower than a minute.
    pub async fn get_time_sales(
        &self,
        symbol: &str,
        interval: Interval,
        range: TimeRange,
    ) -> Result<Vec<TimeSale>> {
        let fetch = |range: TimeRange| self.get_time_sales_once(symbol, interval, range);
        fetch_with_bisection(range, &fetch).await
    }

    async fn get_time_sales_once(
        &self,
        symbol: &str,
        interval: Interval,
        range: TimeRange,
    ) -> Result<Vec<TimeSale>> {
        let url = self.time_sales_url(symbol, interval, range)?;
        let response = self.get(&url).await?;
        if interval.is_historical() {
            response.records_at("/history/day")
        } else {
            response.records_at("/series/data")
        }
    }

    fn time_sales_url(&self, symbol: &str, interval: Interval, range: TimeRange) -> Result<String> {
        let mut params = vec![
            ("symbol", symbol.to_owned()),
            ("interval", interval.as_str().to_owned()),
        ];
        let format = |instant: DateTime<Utc>| {
            if interval.is_historical() {
                instant.format("%Y-%m-%d").to_string()
            } else {
                instant
                    .with_timezone(&New_York)
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string()
            }
        };
        if let Some(start) = range.start {
            params.push(("start", format(start)));
        }
        if let Some(end) = range.end {
            params.push(("end", format(end)));
        }

        let path = if interval.is_historical() {
            "/v1/markets/history"
        } else {
            "/v1/markets/timesales"
        };
        self.url(path, &params)
    }

    /// Opens a market event streaming session.
    pub async fn create_stream_session(&self) -> Result<StreamSession> {
        let url = self.url("/v1/markets/events/session", &[])?;
        #[derive(Deserialize)]
        struct Envelope {
            stream: StreamSession,
        }
        Ok(self
            .send(Method::POST, &url, None)
            .await?
            .json::<Envelope>()?
            .stream)
    }

    async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.send(Method::GET, url, None).await
    }

    async fn send(&self, method: Method, url: &str, form: Option<&Form>) -> Result<ApiResponse> {
        let retries = self.executor.options().max_retries;
        self.executor.execute(method, url, form, retries).await
    }

    fn account_url(&self, suffix: &str) -> Result<String> {
        let account = self
            .account
            .as_deref()
            .ok_or(TradierError::NoAccountSelected)?;
        self.url(&format!("/v1/accounts/{account}/{suffix}"), &[])
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        with_query(&format!("{}{path}", self.endpoint), params)
    }
}

fn with_query(base: &str, params: &[(&str, String)]) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|err| TradierError::Config(format!("invalid URL '{base}': {err}")))?;
    if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.into())
}

#[derive(Deserialize)]
struct OrderAck {
    id: i64,
    #[serde(default)]
    status: String,
}

impl OrderAck {
    fn ensure_ok(&self) -> Result<()> {
        if self.status != STATUS_OK {
            return Err(TradierError::OrderRejected {
                id: self.id,
                status: self.status.clone(),
            });
        }
        Ok(())
    }

    fn ensure_matches(&self, order_id: i64) -> Result<()> {
        self.ensure_ok()?;
        if self.id != order_id {
            return Err(TradierError::Decode(format!(
                "requested order {order_id} but response refers to {}",
                self.id
            )));
        }
        Ok(())
    }
}

fn order_ack(response: &ApiResponse) -> Result<OrderAck> {
    #[derive(Deserialize)]
    struct Envelope {
        order: OrderAck,
    }
    Ok(response.json::<Envelope>()?.order)
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{normalize_bearer_authorization, Interval, TradierClient};
    use crate::split::TimeRange;
    use crate::TradierError;

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = TradierClient::with_endpoint("https://example.test", "secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn account_url_requires_selected_account() {
        let mut client = TradierClient::with_endpoint("https://example.test/", "token");
        assert!(matches!(
            client.account_url("balances"),
            Err(TradierError::NoAccountSelected)
        ));

        client.select_account("VA000001");
        assert_eq!(
            client.account_url("balances").expect("account selected"),
            "https://example.test/v1/accounts/VA000001/balances"
        );
    }

    #[test]
    fn intraday_url_uses_new_york_time() {
        let client = TradierClient::with_endpoint("https://example.test", "token");
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 14, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 4, 21, 0, 0).unwrap();

        let url = client
            .time_sales_url("SPY", Interval::OneMinute, TimeRange::between(start, end))
            .expect("must build url");

        assert_eq!(
            url,
            "https://example.test/v1/markets/timesales?symbol=SPY&interval=1min\
             &start=2024-03-04T09%3A30%3A00&end=2024-03-04T16%3A00%3A00"
        );
    }

    #[test]
    fn daily_url_uses_dates_and_omits_open_bounds() {
        let client = TradierClient::with_endpoint("https://example.test", "token");
        let start = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();

        let url = client
            .time_sales_url("AAPL", Interval::Daily, TimeRange::new(Some(start), None))
            .expect("must build url");

        assert_eq!(
            url,
            "https://example.test/v1/markets/history?symbol=AAPL&interval=daily&start=2020-01-02"
        );
    }
}
