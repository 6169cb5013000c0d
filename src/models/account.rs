use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account in the ledger engine. `id` is store-assigned and monotonic; lock ordering
/// (§4.1 step 3 of the design notes) relies on that monotonicity to fix a global order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub balance: Decimal,
    /// Optimistic-locking marker, bumped on every mutation. Kept as defense-in-depth;
    /// the pessimistic row lock is the only concurrency gate actually exercised.
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn account_serializes_round_trip() {
        let account = Account {
            id: 1,
            balance: dec!(100.50),
            version: 0,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&account).unwrap();
        let deserialized: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.balance, dec!(100.50));
        assert_eq!(deserialized.id, 1);
    }
}
