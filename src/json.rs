//! Line classification and JSON decoding for the event wire format.
//!
//! Every non-blank stdin line is one JSON object. An object carrying an
//! `account` key is an account event; a `transaction` key, a transaction
//! event. The three failure kinds are all recoverable at line granularity:
//! the caller logs them and moves to the next line.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Account, ExternalEvent, Transaction};

/// Errors that can occur when classifying an input line.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("line {line}: not valid JSON: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("line {line}: event shape mismatch: {source}")]
    Decode {
        line: usize,
        source: serde_json::Error,
    },

    #[error("line {line}: neither an account nor a transaction event")]
    Unrecognized { line: usize },
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    account: Account,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelope {
    transaction: Transaction,
}

/// Classify one input line into an [`ExternalEvent`].
///
/// `line` is the 1-based input line number, carried into errors for the log.
pub fn classify(line: usize, raw: &str) -> Result<ExternalEvent, ClassifyError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|source| ClassifyError::Parse { line, source })?;

    let Some(object) = value.as_object() else {
        return Err(ClassifyError::Unrecognized { line });
    };

    if object.contains_key("account") {
        let envelope: AccountEnvelope = serde_json::from_value(value)
            .map_err(|source| ClassifyError::Decode { line, source })?;
        Ok(ExternalEvent::Account(envelope.account))
    } else if object.contains_key("transaction") {
        let envelope: TransactionEnvelope = serde_json::from_value(value)
            .map_err(|source| ClassifyError::Decode { line, source })?;
        Ok(ExternalEvent::Transaction(envelope.transaction))
    } else {
        Err(ClassifyError::Unrecognized { line })
    }
}
