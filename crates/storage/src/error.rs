/// All errors that can be returned by a table store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The row could not be serialized for the backend.
    #[error("failed to serialize row for table {table}: {message}")]
    Serialization { table: String, message: String },

    /// Local filesystem failure (JSON-lines backend).
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote store answered but refused the insert.
    #[error("insert into {table} rejected ({status}): {message}")]
    Rejected {
        table: String,
        status: u16,
        message: String,
    },

    /// A backend-specific failure (connection, configuration, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
