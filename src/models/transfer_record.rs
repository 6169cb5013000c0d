use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status of a transfer record. Once COMPLETED or FAILED it is terminal and
/// never mutated again (invariant 7 of the testable properties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }
}

/// The transfer coordinator's owned record of one money-movement intent. Created PENDING
/// on first sighting of an idempotency key; transitions exactly once to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransferRecord {
    pub id: i64,
    pub transfer_id: String,
    pub idempotency_key: String,
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: Decimal,
    pub status: TransferStatus,
    pub error_message: Option<String>,
    /// Digest of the request body bound to `idempotency_key`, used to detect the key being
    /// reused with different parameters (resolves the expanded spec's Open Question 1).
    pub request_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn request_digest(from_account_id: i64, to_account_id: i64, amount: Decimal) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(from_account_id.to_le_bytes());
        hasher.update(to_account_id.to_le_bytes());
        hasher.update(amount.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn terminal_statuses() {
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
    }

    #[test]
    fn request_digest_is_stable_and_sensitive_to_amount() {
        let a = TransferRecord::request_digest(1, 2, dec!(10.00));
        let b = TransferRecord::request_digest(1, 2, dec!(10.00));
        let c = TransferRecord::request_digest(1, 2, dec!(10.01));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
