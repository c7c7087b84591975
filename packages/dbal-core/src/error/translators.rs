//! Per-backend error translators
//!
//! Each SQL engine and each blob backend speaks its own native error
//! vocabulary; these functions fold that vocabulary onto [`super::DbalError`].

use super::DbalError;

/// Translate a `libsql`/SQLite failure into the shared taxonomy.
///
/// `libsql` does not expose the raw `SQLITE_*` result code on every error
/// path, so the translation matches on the substrings SQLite embeds in its
/// own error messages — the same strings `sqlite3_errmsg` would produce.
/// This mirrors the source adapter's `SQLITE_CONSTRAINT`/`SQLITE_BUSY`/etc.
/// switch, just driven by text instead of an integer code.
pub fn sqlite_error_to_dbal(err: &libsql::Error, context: &str) -> DbalError {
    let text = err.to_string();
    let lower = text.to_lowercase();

    if lower.contains("unique constraint")
        || lower.contains("constraint failed")
        || lower.contains("primary key")
        || lower.contains("foreign key")
    {
        DbalError::conflict(format!("{context}: {text}"))
    } else if lower.contains("no such table")
        || lower.contains("no such column")
        || lower.contains("not found")
    {
        DbalError::not_found(format!("{context}: {text}"))
    } else if lower.contains("database is locked") || lower.contains("database table is locked") {
        DbalError::database(format!("{context}: database is locked"))
    } else if lower.contains("attempt to write a readonly database") {
        DbalError::forbidden(format!("{context}: {text}"))
    } else if lower.contains("unable to open database file") {
        DbalError::database(format!("{context}: {text}"))
    } else if lower.contains("out of memory") {
        DbalError::internal(format!("{context}: {text}"))
    } else if lower.contains("malformed") || lower.contains("not a database") {
        DbalError::database(format!("{context}: {text}"))
    } else {
        DbalError::database(format!("{context}: {text}"))
    }
}

/// Translate an HTTP status code from an S3-compatible endpoint into the
/// shared taxonomy.
pub fn http_status_to_dbal(status: u16, context: &str) -> DbalError {
    match status {
        404 => DbalError::not_found(format!("{context}: not found")),
        403 => DbalError::forbidden(format!("{context}: access denied")),
        401 => DbalError::unauthorized(format!("{context}: authentication failed")),
        409 => DbalError::conflict(format!("{context}: conflict")),
        412 | 400 => DbalError::validation(format!("{context}: bad request")),
        _ => DbalError::internal(format!("{context}: unexpected status {status}")),
    }
}
