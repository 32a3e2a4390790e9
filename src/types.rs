use serde::Deserialize;

use crate::normalize::OneOrMany;
use crate::Timestamp;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccountBalances {
    pub account_number: String,
    pub account_type: String,
    pub total_equity: f64,
    pub total_cash: f64,
    pub market_value: f64,
    pub long_market_value: f64,
    pub short_market_value: f64,
    pub open_pl: f64,
    pub close_pl: f64,
    pub pending_orders_count: i64,
    pub uncleared_funds: f64,
    pub option_requirement: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Position {
    pub id: i64,
    pub symbol: String,
    pub quantity: f64,
    pub cost_basis: f64,
    pub date_acquired: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ClosedPosition {
    pub symbol: String,
    pub quantity: f64,
    pub cost: f64,
    pub proceeds: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
    pub open_date: Timestamp,
    pub close_date: Timestamp,
    #[serde(default)]
    pub term: i64,
}

/// Entry of the account history.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Event {
    pub amount: f64,
    pub date: Timestamp,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Order as reported by the API.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub order_type: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stop_price: Option<f64>,
    #[serde(default)]
    pub avg_fill_price: f64,
    #[serde(default)]
    pub exec_quantity: f64,
    #[serde(default)]
    pub remaining_quantity: f64,
    #[serde(default)]
    pub create_date: Option<Timestamp>,
    #[serde(default)]
    pub transaction_date: Option<Timestamp>,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub option_symbol: Option<String>,
    #[serde(default, rename = "leg")]
    pub legs: OneOrMany<Order>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrderPreview {
    pub status: String,
    pub commission: f64,
    pub cost: f64,
    pub fees: f64,
    pub order_cost: f64,
    pub margin_change: f64,
    pub symbol: String,
    pub quantity: f64,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub duration: String,
    pub result: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Quote {
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub exch: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub last: Option<f64>,
    pub change: Option<f64>,
    pub change_percentage: Option<f64>,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub average_volume: i64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub prevclose: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    #[serde(default)]
    pub bidsize: i64,
    #[serde(default)]
    pub asksize: i64,
    pub trade_date: Option<Timestamp>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
    pub underlying: Option<String>,
    pub strike: Option<f64>,
    pub expiration_date: Option<Timestamp>,
    pub option_type: Option<String>,
}

/// Price bar or tick. Daily bars carry `date`, intraday bars `time`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TimeSale {
    #[serde(alias = "date")]
    pub time: Timestamp,
    pub price: Option<f64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: i64,
    pub vwap: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MarketStatus {
    pub date: Timestamp,
    pub description: String,
    pub state: String,
    pub timestamp: i64,
    pub next_change: Timestamp,
    pub next_state: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MarketCalendar {
    pub date: Timestamp,
    pub status: String,
    #[serde(default)]
    pub description: String,
    pub premarket: Option<SessionHours>,
    pub open: Option<SessionHours>,
    pub postmarket: Option<SessionHours>,
}

/// Session bounds as times of day; only their offset from midnight matters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct SessionHours {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Handshake result for the market event stream.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StreamSession {
    #[serde(rename = "sessionid")]
    pub session_id: String,
    pub url: String,
}
