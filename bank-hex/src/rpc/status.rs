//! Translation of service errors into client-facing [`Status`] values.
//!
//! Reasons are part of the wire contract; clients match on them.

use rust_decimal::Decimal;

use bank_types::{
    AppError, Code, ExchangeRateRequest, Status, TransactionMessage, TransferError,
    TransferRequest,
};

pub const REASON_NOT_FOUND: &str = "NOT_FOUND";
pub const REASON_INSUFFICIENT_FUNDS: &str = "INSUFFICIENT_FUNDS";
pub const REASON_INVALID_CURRENCY: &str = "INVALID_CURRENCY";
pub const REASON_INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const REASON_NEGATIVE_AMOUNT: &str = "NEGATIVE_AMOUNT";
pub const REASON_ACCOUNT_NOT_FOUND: &str = "ACCOUNT_NOT_FOUND";
pub const REASON_MIXED_ACCOUNTS: &str = "MIXED_ACCOUNTS";
pub const REASON_RATE_NOT_FOUND: &str = "RATE_NOT_FOUND";
pub const REASON_SOURCE_NOT_FOUND: &str = "SOURCE_ACCOUNT_NOT_FOUND";
pub const REASON_DESTINATION_NOT_FOUND: &str = "DESTINATION_ACCOUNT_NOT_FOUND";
pub const REASON_RECORD_FAILED: &str = "TRANSFER_RECORD_FAILED";
pub const REASON_PAIR_FAILED: &str = "TRANSACTION_PAIR_FAILED";
pub const REASON_UNKNOWN: &str = "UNKNOWN";

const NO_METADATA: [(&str, &str); 0] = [];

/// Context-free mapping used by unary routes and as the fallback for streams.
pub fn from_app_error(err: &AppError) -> Status {
    match err {
        AppError::NotFound(msg) => {
            Status::new(Code::NotFound, msg.clone()).with_reason(REASON_NOT_FOUND, NO_METADATA)
        }
        AppError::InsufficientFunds {
            available,
            requested,
        } => Status::new(Code::FailedPrecondition, err.to_string()).with_reason(
            REASON_INSUFFICIENT_FUNDS,
            [
                ("available", available.to_string()),
                ("requested", requested.to_string()),
            ],
        ),
        AppError::InvalidCurrency { from, to } => invalid_currency(from, to),
        AppError::InvalidArgument { field, message } => Status::invalid_argument(message.clone())
            .with_reason(REASON_INVALID_ARGUMENT, NO_METADATA)
            .with_field_violation(field.clone(), message.clone()),
        AppError::Unknown(_) => {
            Status::unknown("internal error").with_reason(REASON_UNKNOWN, NO_METADATA)
        }
    }
}

pub fn invalid_currency(from: &str, to: &str) -> Status {
    Status::invalid_argument("Currency not valid. Please use valid currency for both from and to")
        .with_reason(
            REASON_INVALID_CURRENCY,
            [("from_currency", from), ("to_currency", to)],
        )
}

pub fn negative_amount(amount: Decimal) -> Status {
    let message = format!("Requested amount {} is negative", amount);
    Status::invalid_argument(message.clone())
        .with_reason(REASON_NEGATIVE_AMOUNT, [("amount", amount.to_string())])
        .with_field_violation("amount", message)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate feed
// ─────────────────────────────────────────────────────────────────────────────

/// A tick could not resolve a rate for the requested pair.
pub fn rate_unavailable(err: &AppError, req: &ExchangeRateRequest) -> Status {
    let pair = [
        ("from_currency", req.from_currency.as_str()),
        ("to_currency", req.to_currency.as_str()),
    ];
    match err {
        AppError::NotFound(msg) => {
            Status::new(Code::NotFound, msg.clone()).with_reason(REASON_RATE_NOT_FOUND, pair)
        }
        AppError::InvalidCurrency { from, to } => invalid_currency(from, to),
        other => Status::unknown(other.to_string()).with_reason(REASON_UNKNOWN, pair),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction summarizer
// ─────────────────────────────────────────────────────────────────────────────

pub fn mixed_accounts(expected: &str, got: &str) -> Status {
    Status::invalid_argument(format!(
        "Stream is summarizing account {}, got account {}",
        expected, got
    ))
    .with_reason(
        REASON_MIXED_ACCOUNTS,
        [("expected", expected), ("account_number", got)],
    )
    .with_field_violation("account_number", "All messages must use the same account number")
}

pub fn summary_overflow(msg: &TransactionMessage) -> Status {
    Status::invalid_argument(format!(
        "Amount {} overflows the running total for account {}",
        msg.amount, msg.account_number
    ))
    .with_reason(
        REASON_INVALID_ARGUMENT,
        [
            ("account_number", msg.account_number.clone()),
            ("amount", msg.amount.to_string()),
        ],
    )
    .with_field_violation("amount", "Running total exceeds the supported range")
}

/// Failure applying one summarizer message.
pub fn transaction_failed(err: &AppError, msg: &TransactionMessage) -> Status {
    match err {
        AppError::NotFound(detail) => Status::invalid_argument(detail.clone())
            .with_reason(
                REASON_ACCOUNT_NOT_FOUND,
                [("account_number", msg.account_number.as_str())],
            )
            .with_field_violation("account_number", "Invalid account number"),
        AppError::InsufficientFunds { .. } => Status::invalid_argument(err.to_string())
            .with_reason(
                REASON_INSUFFICIENT_FUNDS,
                [
                    ("account_number", msg.account_number.clone()),
                    ("amount", msg.amount.to_string()),
                ],
            )
            .with_field_violation(
                "amount",
                format!("Requested amount {} exceeds available balance", msg.amount),
            ),
        other => from_app_error(other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfer pipeline
// ─────────────────────────────────────────────────────────────────────────────

pub fn transfer_failed(err: &TransferError, req: &TransferRequest) -> Status {
    match err {
        TransferError::SourceAccountNotFound(_) => {
            Status::new(Code::FailedPrecondition, err.to_string())
                .with_reason(
                    REASON_SOURCE_NOT_FOUND,
                    [("from_account", req.from_account.as_str())],
                )
                .with_precondition(
                    "INVALID_ACCOUNT",
                    "Source account not found",
                    format!("source account (from {}) not found", req.from_account),
                )
        }
        TransferError::DestinationAccountNotFound(_) => {
            Status::new(Code::FailedPrecondition, err.to_string())
                .with_reason(
                    REASON_DESTINATION_NOT_FOUND,
                    [("to_account", req.to_account.as_str())],
                )
                .with_precondition(
                    "INVALID_ACCOUNT",
                    "Destination account not found",
                    format!("destination account (to {}) not found", req.to_account),
                )
        }
        TransferError::RecordFailed(_) => Status::new(Code::Internal, err.to_string())
            .with_reason(REASON_RECORD_FAILED, NO_METADATA)
            .with_help("/swagger-ui", "Bank API documentation"),
        TransferError::TransactionPair(_) => Status::invalid_argument(err.to_string())
            .with_reason(
                REASON_PAIR_FAILED,
                [
                    ("from_account", req.from_account.clone()),
                    ("to_account", req.to_account.clone()),
                    ("currency", req.currency.clone()),
                    ("amount", req.amount.to_string()),
                ],
            ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_types::ErrorDetail;
    use rust_decimal_macros::dec;

    fn transfer_request() -> TransferRequest {
        TransferRequest {
            from_account: "1001".into(),
            to_account: "1002".into(),
            currency: "IDR".into(),
            amount: dec!(5000),
            notes: String::new(),
        }
    }

    #[test]
    fn test_transfer_errors_have_distinct_reasons() {
        let req = transfer_request();
        let errors = [
            TransferError::SourceAccountNotFound("1001".into()),
            TransferError::DestinationAccountNotFound("1002".into()),
            TransferError::RecordFailed("db down".into()),
            TransferError::TransactionPair("rolled back".into()),
        ];

        let reasons: Vec<_> = errors
            .iter()
            .map(|e| transfer_failed(e, &req).reason().unwrap().to_string())
            .collect();

        assert_eq!(
            reasons,
            vec![
                REASON_SOURCE_NOT_FOUND,
                REASON_DESTINATION_NOT_FOUND,
                REASON_RECORD_FAILED,
                REASON_PAIR_FAILED
            ]
        );
    }

    #[test]
    fn test_source_not_found_is_failed_precondition() {
        let status = transfer_failed(
            &TransferError::SourceAccountNotFound("1001".into()),
            &transfer_request(),
        );

        assert_eq!(status.code, Code::FailedPrecondition);
        assert!(status.details.iter().any(|d| matches!(
            d,
            ErrorDetail::PreconditionFailure { violations } if violations[0].kind == "INVALID_ACCOUNT"
        )));
    }

    #[test]
    fn test_pair_failure_carries_request_metadata() {
        let status = transfer_failed(
            &TransferError::TransactionPair("x".into()),
            &transfer_request(),
        );

        assert_eq!(status.code, Code::InvalidArgument);
        assert_eq!(status.metadata("currency"), Some("IDR"));
        assert_eq!(status.metadata("amount"), Some("5000"));
    }

    #[test]
    fn test_unknown_app_error_hides_detail() {
        let status = from_app_error(&AppError::Unknown("password=hunter2".into()));

        assert_eq!(status.code, Code::Unknown);
        assert!(!status.message.contains("hunter2"));
    }

    #[test]
    fn test_invalid_currency_names_both_currencies() {
        let status = invalid_currency("USD", "XYZ");

        assert_eq!(status.reason(), Some(REASON_INVALID_CURRENCY));
        assert_eq!(status.metadata("from_currency"), Some("USD"));
        assert_eq!(status.metadata("to_currency"), Some("XYZ"));
    }
}
