/// Look-ahead window for the expiring-soon rental query, in days
pub const DEFAULT_EXPIRING_DAYS: i64 = 7;

/// Longest look-ahead window accepted for the expiring-soon query
pub const MAX_EXPIRING_DAYS: i64 = 365;

/// Activity log entries returned when the caller gives no limit
pub const DEFAULT_ACTIVITY_LOG_LIMIT: usize = 20;

/// Upper bound on activity log entries per request
pub const MAX_ACTIVITY_LOG_LIMIT: usize = 100;

/// Maximum length of short text fields (numbers, names, plates, contacts)
pub const MAX_TEXT_FIELD_LENGTH: usize = 100;

/// Maximum length of free-form notes
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Clamp a caller supplied activity log limit into the accepted range
pub fn activity_log_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_ACTIVITY_LOG_LIMIT)
        .clamp(1, MAX_ACTIVITY_LOG_LIMIT)
}
