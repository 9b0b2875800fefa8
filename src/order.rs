use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Executes immediately at the current market price.
    #[default]
    Market,
    /// Executes only at the given price or better.
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Open,
    Filled,
    Pending,
    Canceled,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// An order as seen by a strategy. Host environments fill in the execution fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub id: Option<String>,
    pub creation_time: Option<Timestamp>,
    pub open_time: Timestamp,
    pub close_time: Timestamp,
    pub pnl: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub side: OrderSide,
    pub commission: Decimal,
}

impl Order {
    /// Fresh `New` order with zeroed execution fields.
    pub fn new(amount: Decimal, side: OrderSide, order_type: OrderType) -> Self {
        Order {
            amount,
            price: None,
            id: None,
            creation_time: None,
            open_time: Timestamp::default(),
            close_time: Timestamp::default(),
            pnl: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            exit_price: Decimal::ZERO,
            order_type,
            status: OrderStatus::New,
            side,
            commission: Decimal::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::New | OrderStatus::Open | OrderStatus::Pending
        )
    }
}
