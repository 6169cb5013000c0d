use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Validation error, one per malformed field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Ledger facade requests
// ---------------------------------------------------------------------------

/// `POST /accounts` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(rename = "initialBalance")]
    pub initial_balance: Decimal,
}

impl CreateAccountRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.initial_balance <= Decimal::ZERO {
            errors.push(ValidationError {
                field: "initialBalance".to_string(),
                message: "initialBalance must be strictly positive".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// `POST /ledger/transfer` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyTransferRequest {
    #[serde(rename = "transferId")]
    pub transfer_id: String,
    #[serde(rename = "fromAccountId")]
    pub from_account_id: i64,
    #[serde(rename = "toAccountId")]
    pub to_account_id: i64,
    pub amount: Decimal,
}

impl ApplyTransferRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.transfer_id.trim().is_empty() {
            errors.push(ValidationError { field: "transferId".to_string(), message: "transferId must not be empty".to_string() });
        }
        if self.amount <= Decimal::ZERO {
            errors.push(ValidationError { field: "amount".to_string(), message: "amount must be strictly positive".to_string() });
        }
        if self.from_account_id == self.to_account_id {
            errors.push(ValidationError {
                field: "toAccountId".to_string(),
                message: "fromAccountId and toAccountId must differ".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ---------------------------------------------------------------------------
// Transfer facade requests
// ---------------------------------------------------------------------------

/// `POST /transfers` body. The idempotency key itself travels in the `Idempotency-Key`
/// header (§4.6), not in this body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferRequest {
    #[serde(rename = "fromAccountId")]
    pub from_account_id: i64,
    #[serde(rename = "toAccountId")]
    pub to_account_id: i64,
    pub amount: Decimal,
}

impl CreateTransferRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.amount <= Decimal::ZERO {
            errors.push(ValidationError { field: "amount".to_string(), message: "amount must be strictly positive".to_string() });
        }
        if self.from_account_id == self.to_account_id {
            errors.push(ValidationError {
                field: "toAccountId".to_string(),
                message: "fromAccountId and toAccountId must differ".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// One line of a `POST /transfers/batch` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTransferLine {
    #[serde(rename = "idempotencyKey")]
    pub idempotency_key: String,
    #[serde(rename = "fromAccountId")]
    pub from_account_id: i64,
    #[serde(rename = "toAccountId")]
    pub to_account_id: i64,
    pub amount: Decimal,
}

/// `POST /transfers/batch` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessBatchRequest {
    pub transfers: Vec<BatchTransferLine>,
}
