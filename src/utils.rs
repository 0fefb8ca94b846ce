//! Small shared helpers

use chrono::{TimeZone, Utc};
use std::future::Future;

/// Bridge a synchronous resource method onto the async API client.
/// Callers must run on a multi-threaded tokio runtime.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Render a millisecond epoch timestamp as RFC 3339, `None` for the zero
/// value so unset server fields do not show up as 1970
pub fn format_timestamp_rfc3339(epoch_ms: i64) -> Option<String> {
    if epoch_ms <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Render a millisecond epoch timestamp as `YYYY-MM-DD HH:MM:SS` UTC,
/// the format the alarm rule endpoints use
pub fn format_timestamp_utc(epoch_ms: i64) -> Option<String> {
    if epoch_ms <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_format_in_utc() {
        assert_eq!(
            format_timestamp_rfc3339(1_700_000_000_000).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(
            format_timestamp_utc(1_700_000_000_000).as_deref(),
            Some("2023-11-14 22:13:20")
        );
    }

    #[test]
    fn zero_timestamp_is_absent() {
        assert_eq!(format_timestamp_rfc3339(0), None);
        assert_eq!(format_timestamp_utc(-5), None);
    }
}
