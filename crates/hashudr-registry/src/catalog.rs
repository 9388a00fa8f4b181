//! # Custom Error Catalog
//!
//! Reads the connection's custom exceptions once, when its record is
//! created. Only exceptions whose name starts with the configured prefix
//! are selected; rows fill the tracked slot carrying their name.
//!
//! [`decode_custom_error`] is the only code that knows the row layout.

use hashudr_core::{CustomErrorEntry, CustomErrorSet, HostError, UdrError};
use hashudr_host::{
    ExecutionContext, LayoutError, MessageLayout, ResultCursor, TransactionHandle,
};

/// The catalog query selecting every exception under `prefix`.
pub fn catalog_query(prefix: &str) -> String {
    format!(
        "SELECT CAST(TRIM(ex.rdb$exception_name) AS VARCHAR(63)) AS name, \
         ex.rdb$exception_number AS number, ex.rdb$message AS message \
         FROM rdb$exceptions ex \
         WHERE TRIM(ex.rdb$exception_name) STARTING WITH '{}'",
        prefix.replace('\'', "''")
    )
}

/// Decode one catalog row: `(name, number, message)`.
///
/// A null name or message decodes as empty and a null number as `0`
/// (undefined). Text is decoded lossily and the name is trimmed.
pub fn decode_custom_error(layout: &MessageLayout, row: &[u8]) -> Result<CustomErrorEntry, LayoutError> {
    let name = layout.read_text(row, 0)?.unwrap_or_default();
    let number = layout.read_long(row, 1)?.unwrap_or(0);
    let message = layout.read_text(row, 2)?.unwrap_or_default();
    Ok(CustomErrorEntry::new(
        String::from_utf8_lossy(name).trim(),
        number,
        String::from_utf8_lossy(message).trim_end(),
    ))
}

/// Run the catalog query and fill a set tracking `error_name`.
///
/// Stops fetching once every slot is defined. The cursor is closed on
/// every exit path.
pub fn load_custom_errors(
    context: &dyn ExecutionContext,
    transaction: TransactionHandle,
    prefix: &str,
    error_name: &str,
) -> Result<CustomErrorSet, UdrError> {
    let mut set = CustomErrorSet::tracking([error_name]);
    let query = catalog_query(prefix);
    let mut cursor = CursorGuard::new(
        context
            .open_cursor(transaction, &query)
            .map_err(|e| UdrError::CatalogQuery(e.to_string()))?,
    );

    let layout = cursor.cursor().layout().clone();
    let mut row = layout.new_buffer();
    let mut rows = 0usize;
    while !set.is_complete() {
        let fetched = cursor
            .cursor()
            .fetch_next(&mut row)
            .map_err(|e| UdrError::CatalogQuery(e.to_string()))?;
        if !fetched {
            break;
        }
        rows += 1;
        let entry = decode_custom_error(&layout, &row)
            .map_err(|e| UdrError::CatalogQuery(format!("row {rows}: {e}")))?;
        if !set.fill(entry) {
            tracing::debug!(row = rows, "catalog row does not match a tracked error");
        }
    }
    cursor
        .close()
        .map_err(|e| UdrError::CatalogQuery(e.to_string()))?;

    tracing::debug!(rows, complete = set.is_complete(), "custom error catalog loaded");
    Ok(set)
}

/// Closes the cursor on drop unless it was closed explicitly.
struct CursorGuard {
    cursor: Box<dyn ResultCursor>,
    closed: bool,
}

impl CursorGuard {
    fn new(cursor: Box<dyn ResultCursor>) -> Self {
        Self {
            cursor,
            closed: false,
        }
    }

    fn cursor(&mut self) -> &mut dyn ResultCursor {
        self.cursor.as_mut()
    }

    fn close(&mut self) -> Result<(), HostError> {
        self.closed = true;
        self.cursor.close()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.cursor.close() {
                tracing::warn!(error = %err, "closing catalog cursor failed");
            }
        }
    }
}
