//! Structured exchange logs.
//!
//! Every state transition is logged with the same field names so logs from
//! different protocols can be filtered uniformly:
//! - `protocol`: protocol name (action-menu, issue-credential, ...)
//! - `record_id`: exchange record id
//! - `thread_id`: DIDComm thread id
//! - `previous_state` / `state`: transition endpoints

/// Log a state transition of an exchange record.
///
/// `previous_state` is `None` for newly created records.
///
/// ```rust,ignore
/// log_exchange_event!(debug, "action-menu", &record.id, &record.thread_id, previous, record.state);
/// ```
#[macro_export]
macro_rules! log_exchange_event {
    ($level:ident, $protocol:expr, $record_id:expr, $thread_id:expr, $previous:expr, $state:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            protocol = $protocol,
            record_id = %$record_id,
            thread_id = %$thread_id,
            previous_state = ?$previous,
            state = %$state,
            $($($field)*,)?
            "Exchange state changed"
        )
    };
}

/// Log a rejected inbound message with standard fields.
#[macro_export]
macro_rules! log_rejected_message {
    ($protocol:expr, $message_type:expr, $error:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            protocol = $protocol,
            message_type = %$message_type,
            error = %$error,
            $($($field)*,)?
            "Inbound message rejected"
        )
    };
}
