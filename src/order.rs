//! Order forms and their validation.
//!
//! Every inconsistency is reported as [`TradierError::InvalidOrder`] before
//! any request is sent.

use crate::{executor::Form, Result, TradierError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderClass {
    Equity,
    Option,
    Multileg,
    Combo,
    /// One-triggers-other.
    Oto,
    /// One-cancels-other.
    Oco,
    /// One-triggers-one-cancels-other.
    Otoco,
}

impl OrderClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Option => "option",
            Self::Multileg => "multileg",
            Self::Combo => "combo",
            Self::Oto => "oto",
            Self::Oco => "oco",
            Self::Otoco => "otoco",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    Debit,
    Credit,
    Even,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Stop => "stop",
            Self::StopLimit => "stop_limit",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Even => "even",
        }
    }

    fn needs_price(self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit | Self::Debit | Self::Credit)
    }

    fn needs_stop(self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    BuyToCover,
    Sell,
    SellShort,
    BuyToOpen,
    BuyToClose,
    SellToOpen,
    SellToClose,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::BuyToCover => "buy_to_cover",
            Self::Sell => "sell",
            Self::SellShort => "sell_short",
            Self::BuyToOpen => "buy_to_open",
            Self::BuyToClose => "buy_to_close",
            Self::SellToOpen => "sell_to_open",
            Self::SellToClose => "sell_to_close",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDuration {
    Day,
    Gtc,
    Pre,
    Post,
}

impl OrderDuration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

/// One leg of a multi-leg or conditional order.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLeg {
    pub symbol: Option<String>,
    pub option_symbol: Option<String>,
    pub side: OrderSide,
    pub quantity: f64,
    pub order_type: Option<OrderType>,
    pub price: Option<f64>,
    pub stop: Option<f64>,
}

impl OrderLeg {
    pub fn new(side: OrderSide, quantity: f64) -> Self {
        Self {
            symbol: None,
            option_symbol: None,
            side,
            quantity,
            order_type: None,
            price: None,
            stop: None,
        }
    }
}

/// A new order to place or preview.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub class: OrderClass,
    pub symbol: Option<String>,
    pub option_symbol: Option<String>,
    pub side: Option<OrderSide>,
    pub quantity: f64,
    pub order_type: OrderType,
    pub duration: OrderDuration,
    pub price: Option<f64>,
    pub stop: Option<f64>,
    pub legs: Vec<OrderLeg>,
}

impl OrderRequest {
    /// Single-leg equity order.
    pub fn equity(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
        order_type: OrderType,
        duration: OrderDuration,
    ) -> Self {
        Self {
            class: OrderClass::Equity,
            symbol: Some(symbol.into()),
            option_symbol: None,
            side: Some(side),
            quantity,
            order_type,
            duration,
            price: None,
            stop: None,
            legs: Vec::new(),
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_stop(mut self, stop: f64) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_leg(mut self, leg: OrderLeg) -> Self {
        self.legs.push(leg);
        self
    }

    /// Encodes the order as the create-order form.
    pub fn to_form(&self) -> Result<Form> {
        let mut form = FormBuilder::default();
        form.push("class", self.class.as_str());
        form.push("duration", self.duration.as_str());

        match self.class {
            OrderClass::Equity | OrderClass::Option => {
                form.push("symbol", required(&self.symbol, "symbol")?);
                if self.class == OrderClass::Option {
                    form.push("option_symbol", required(&self.option_symbol, "option_symbol")?);
                }
                let side = self
                    .side
                    .ok_or_else(|| invalid("side is required for single-leg orders"))?;
                form.push("side", side.as_str());
                form.push("quantity", format_quantity(self.quantity)?);
                form.push("type", self.order_type.as_str());
                push_prices(&mut form, "", self.order_type, self.price, self.stop)?;
            }
            OrderClass::Multileg | OrderClass::Combo => {
                form.push("symbol", required(&self.symbol, "symbol")?);
                form.push("type", self.order_type.as_str());
                push_prices(&mut form, "", self.order_type, self.price, self.stop)?;
                if self.legs.is_empty() {
                    return Err(invalid("multileg orders need at least one leg"));
                }
                for (i, leg) in self.legs.iter().enumerate() {
                    if let Some(symbol) = &leg.symbol {
                        form.push(format!("symbol[{i}]"), symbol);
                    }
                    let option_symbol = leg.option_symbol.as_ref().ok_or_else(|| {
                        invalid(format!("leg {i}: option_symbol is required"))
                    })?;
                    form.push(format!("option_symbol[{i}]"), option_symbol);
                    form.push(format!("side[{i}]"), leg.side.as_str());
                    form.push(format!("quantity[{i}]"), format_quantity(leg.quantity)?);
                }
            }
            OrderClass::Oto | OrderClass::Oco | OrderClass::Otoco => {
                if self.legs.len() < 2 {
                    return Err(invalid("conditional orders need at least two legs"));
                }
                for (i, leg) in self.legs.iter().enumerate() {
                    let symbol = leg
                        .symbol
                        .as_ref()
                        .ok_or_else(|| invalid(format!("leg {i}: symbol is required")))?;
                    let order_type = leg
                        .order_type
                        .ok_or_else(|| invalid(format!("leg {i}: type is required")))?;
                    form.push(format!("symbol[{i}]"), symbol);
                    form.push(format!("quantity[{i}]"), format_quantity(leg.quantity)?);
                    form.push(format!("type[{i}]"), order_type.as_str());
                    form.push(format!("side[{i}]"), leg.side.as_str());
                    if let Some(option_symbol) = &leg.option_symbol {
                        form.push(format!("option_symbol[{i}]"), option_symbol);
                    }
                    push_prices(&mut form, &format!("[{i}]"), order_type, leg.price, leg.stop)?;
                }
            }
        }

        Ok(form.finish())
    }
}

/// Modification of a pending order.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderChange {
    pub order_type: OrderType,
    pub duration: OrderDuration,
    pub price: Option<f64>,
    pub stop: Option<f64>,
}

impl OrderChange {
    pub fn to_form(&self) -> Result<Form> {
        if !matches!(
            self.order_type,
            OrderType::Market | OrderType::Limit | OrderType::Stop | OrderType::StopLimit
        ) {
            return Err(invalid(format!(
                "order type '{}' cannot be changed",
                self.order_type.as_str()
            )));
        }
        if !matches!(self.duration, OrderDuration::Day | OrderDuration::Gtc) {
            return Err(invalid(format!(
                "duration '{}' cannot be used when changing an order",
                self.duration.as_str()
            )));
        }

        let mut form = FormBuilder::default();
        form.push("type", self.order_type.as_str());
        form.push("duration", self.duration.as_str());
        push_prices(&mut form, "", self.order_type, self.price, self.stop)?;
        Ok(form.finish())
    }
}

#[derive(Default)]
struct FormBuilder(Form);

impl FormBuilder {
    fn push(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        self.0.push((key.into(), value.as_ref().to_owned()));
    }

    fn finish(self) -> Form {
        self.0
    }
}

fn push_prices(
    form: &mut FormBuilder,
    suffix: &str,
    order_type: OrderType,
    price: Option<f64>,
    stop: Option<f64>,
) -> Result<()> {
    if order_type.needs_price() {
        let price = positive(price)
            .ok_or_else(|| invalid(format!("{} order requires a price", order_type.as_str())))?;
        form.push(format!("price{suffix}"), format!("{price:.2}"));
    }
    if order_type.needs_stop() {
        let stop = positive(stop).ok_or_else(|| {
            invalid(format!("{} order requires a stop price", order_type.as_str()))
        })?;
        form.push(format!("stop{suffix}"), format!("{stop:.2}"));
    }
    Ok(())
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value > 0.0)
}

fn format_quantity(quantity: f64) -> Result<String> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(invalid(format!("quantity must be positive, got {quantity}")));
    }
    Ok(format!("{quantity:.0}"))
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| invalid(format!("{field} is required")))
}

fn invalid(message: impl Into<String>) -> TradierError {
    TradierError::InvalidOrder(message.into())
}
