use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Account, TransferRecord, TransferStatus};

/// Standard API response envelope, kept uniform across both facades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ErrorResponse) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }
}

/// Error response body, shared taxonomy with `AppError::code()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Ledger facade responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub balance: Decimal,
    pub version: i32,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self { id: a.id, balance: a.balance, version: a.version }
    }
}

/// `POST /ledger/transfer` success body. `alreadyApplied` reports as success, per §4.2 —
/// the caller cannot distinguish first application from replay, by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyTransferResponse {
    pub success: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Transfer facade responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    #[serde(rename = "transferId")]
    pub transfer_id: String,
    pub status: TransferStatus,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<TransferRecord> for TransferResponse {
    fn from(r: TransferRecord) -> Self {
        Self { transfer_id: r.transfer_id, status: r.status, error_message: r.error_message }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub transfers: Vec<TransferResponse>,
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
