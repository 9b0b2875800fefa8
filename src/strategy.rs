//! Boundary between decoded market data and a trading strategy.
//!
//! Strategies receive [`PriceUpdate`] and [`CandleUpdate`] events and act
//! through a [`StrategyContext`], which owns the host's [`Broker`]. The broker
//! is a required constructor argument, so a context can never be missing one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::order::{Order, OrderSide, OrderType};
use crate::time::Timestamp;
use crate::types::{Candle, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub time: Timestamp,
    pub price: Decimal,
    pub volume: Option<Decimal>,
}

impl From<&Tick> for PriceUpdate {
    fn from(tick: &Tick) -> Self {
        PriceUpdate {
            time: tick.time(),
            price: tick.price(),
            volume: Some(tick.volume()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleUpdate {
    pub time: Timestamp,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl From<&Candle> for CandleUpdate {
    fn from(c: &Candle) -> Self {
        CandleUpdate {
            time: c.start_time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

/// Capabilities the host environment provides to a strategy.
pub trait Broker {
    /// Returns the id assigned to the order.
    fn place_order(&mut self, order: Order) -> String;
    fn close_order(&mut self, order_id: &str) -> bool;
    fn current_time(&self) -> Timestamp;
    fn orders(&self) -> Vec<Order>;
}

pub trait Strategy {
    fn on_init(&mut self);
    fn on_deinit(&mut self);
    fn on_new_price(&mut self, update: &PriceUpdate);
    fn on_new_candle(&mut self, update: &CandleUpdate);
}

pub struct StrategyContext<B: Broker> {
    broker: B,
}

impl<B: Broker> StrategyContext<B> {
    pub fn new(broker: B) -> Self {
        StrategyContext { broker }
    }

    /// Builds a `New` order stamped with the broker's current time and submits it.
    pub fn place_order(
        &mut self,
        amount: Decimal,
        side: OrderSide,
        order_type: OrderType,
        price: Option<Decimal>,
    ) -> String {
        let mut order = Order::new(amount, side, order_type);
        order.price = price;
        order.creation_time = Some(self.broker.current_time());
        let id = self.broker.place_order(order);
        debug!(order_id = %id, %amount, ?side, ?order_type, "placed order");
        id
    }

    pub fn close_order(&mut self, order_id: &str) -> bool {
        self.broker.close_order(order_id)
    }

    pub fn current_time(&self) -> Timestamp {
        self.broker.current_time()
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.broker.orders()
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn into_broker(self) -> B {
        self.broker
    }
}
