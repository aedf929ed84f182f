use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("workout session '{id}' not found")]
    SessionNotFound { id: String },

    #[error("exercise entry '{id}' not found")]
    EntryNotFound { id: String },

    #[error("set record '{id}' not found")]
    SetNotFound { id: String },

    #[error("no session is being recorded")]
    NoActiveSession,

    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    /// A packaging defect: the upgrade table has no step for this version.
    #[error("no migration step defined for schema version {version}")]
    MissingMigration { version: i64 },
}

pub type Result<T> = std::result::Result<T, Error>;
