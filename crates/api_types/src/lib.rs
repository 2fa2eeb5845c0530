use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Id of the authenticated account that owns the cached data.
///
/// Serialized as a plain UUID string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for OwnerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Entities addressed by a numeric server id.
///
/// `numeric_id` is the type guard used by the stores when matching entries:
/// an entry without a numeric id never matches an update or a removal.
pub trait Identified {
    fn numeric_id(&self) -> Option<i64>;
}

/// Reasons a fetched entity is refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
    #[error("{entity} {id}: day_of_month {day} outside 1..=31")]
    DayOfMonth {
        entity: &'static str,
        id: i64,
        day: u32,
    },
    #[error("{entity} {id}: {field} must be > 0")]
    NotPositive {
        entity: &'static str,
        id: i64,
        field: &'static str,
    },
}

/// Field-level validation applied to every fetched entity before it is cached.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn require_name(label: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyName(label));
    }
    Ok(())
}

macro_rules! numeric_id {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Identified for $ty {
                fn numeric_id(&self) -> Option<i64> {
                    Some(self.id)
                }
            }
        )+
    };
}

numeric_id!(
    category::Category,
    payment_method::PaymentMethod,
    subscription::Subscription,
    transaction::Transaction,
    stock::StockPosition,
    watchlist::Watchlist,
    budget::Budget,
);

pub mod category {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Category {
        pub id: i64,
        pub name: String,
        pub description: Option<String>,
    }

    impl Validate for Category {
        fn validate(&self) -> Result<(), ValidationError> {
            require_name("category name", &self.name)
        }
    }
}

pub mod payment_method {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PaymentMethod {
        pub id: i64,
        pub name: String,
        pub provider: Option<String>,
        pub description: Option<String>,
    }

    impl Validate for PaymentMethod {
        fn validate(&self) -> Result<(), ValidationError> {
            require_name("payment method name", &self.name)
        }
    }
}

pub mod subscription {
    use super::*;

    /// A charge (or income) repeated every month on the same day.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Subscription {
        pub id: i64,
        pub label: String,
        pub category_id: i64,
        pub payment_method_id: Option<i64>,
        /// Signed amount: positive = income, negative = expense.
        pub amount_minor: i64,
        /// Day of month in `1..=31`. Shorter months execute on their last day.
        pub day_of_month: u32,
        #[serde(default)]
        pub paused: bool,
        pub description: Option<String>,
    }

    impl Validate for Subscription {
        fn validate(&self) -> Result<(), ValidationError> {
            require_name("subscription label", &self.label)?;
            if !(1..=31).contains(&self.day_of_month) {
                return Err(ValidationError::DayOfMonth {
                    entity: "subscription",
                    id: self.id,
                    day: self.day_of_month,
                });
            }
            Ok(())
        }
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Transaction {
        pub id: i64,
        pub category_id: i64,
        pub payment_method_id: Option<i64>,
        /// Calendar date the transaction was booked on (`YYYY-MM-DD`).
        pub occurred_at: NaiveDate,
        /// Signed amount: positive = income, negative = expense.
        pub amount_minor: i64,
        pub receiver: Option<String>,
        pub note: Option<String>,
    }

    impl Validate for Transaction {
        fn validate(&self) -> Result<(), ValidationError> {
            Ok(())
        }
    }
}

pub mod stock {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct StockPosition {
        pub id: i64,
        pub symbol: String,
        pub quantity: f64,
        pub bought_at: NaiveDate,
        /// Purchase price per share, in minor units.
        pub buy_in_minor: i64,
        pub currency: String,
    }

    impl Validate for StockPosition {
        fn validate(&self) -> Result<(), ValidationError> {
            require_name("stock symbol", &self.symbol)?;
            if !(self.quantity > 0.0) {
                return Err(ValidationError::NotPositive {
                    entity: "stock position",
                    id: self.id,
                    field: "quantity",
                });
            }
            Ok(())
        }
    }
}

pub mod watchlist {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Watchlist {
        pub id: i64,
        pub name: String,
        #[serde(default)]
        pub symbols: Vec<String>,
    }

    impl Validate for Watchlist {
        fn validate(&self) -> Result<(), ValidationError> {
            require_name("watchlist name", &self.name)
        }
    }
}

pub mod budget {
    use super::*;

    /// Monthly spending limit for a set of categories.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Budget {
        pub id: i64,
        pub label: String,
        pub category_id: i64,
        /// Must be > 0.
        pub limit_minor: i64,
    }

    impl Validate for Budget {
        fn validate(&self) -> Result<(), ValidationError> {
            require_name("budget label", &self.label)?;
            if self.limit_minor <= 0 {
                return Err(ValidationError::NotPositive {
                    entity: "budget",
                    id: self.id,
                    field: "limit",
                });
            }
            Ok(())
        }
    }
}

/// Body returned by the server for non-2xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
