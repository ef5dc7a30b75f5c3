use std::fmt;

/// Payment store error kinds
#[derive(Debug, Clone)]
pub enum StoreErrorKind {
    /// Connection pool is exhausted
    PoolExhausted,
    /// Record not found
    NotFound { entity: String, id: String },
    /// Unique constraint violation (e.g., duplicate payment request id)
    UniqueConstraintViolation { column: String, value: String },
    /// Query execution error
    QueryError { message: String },
    /// Transaction error
    TransactionError { message: String },
    /// Database connection error
    ConnectionError { message: String },
    /// Stored value could not be decoded
    Corrupt { message: String },
    /// Unknown error
    Unknown { message: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub context: Option<String>,
    pub is_retryable: bool,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind) -> Self {
        let is_retryable = matches!(
            kind,
            StoreErrorKind::PoolExhausted | StoreErrorKind::ConnectionError { .. }
        );

        Self {
            kind,
            context: None,
            is_retryable,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn duplicate(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::UniqueConstraintViolation {
            column: column.into(),
            value: value.into(),
        })
    }

    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.kind, StoreErrorKind::UniqueConstraintViolation { .. })
    }

    /// Map SQLx error to our custom error type
    #[cfg(feature = "database")]
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::new(StoreErrorKind::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            }),
            sqlx::Error::PoolTimedOut => Self::new(StoreErrorKind::PoolExhausted),
            sqlx::Error::PoolClosed => Self::new(StoreErrorKind::ConnectionError {
                message: "Connection pool is closed".to_string(),
            }),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // Postgres unique_violation
                Some("23505") => Self::duplicate("payment_request_id", "provided value"),
                _ => Self::new(StoreErrorKind::QueryError {
                    message: db_err.message().to_string(),
                }),
            },
            sqlx::Error::Io(io_err) => Self::new(StoreErrorKind::ConnectionError {
                message: io_err.to_string(),
            }),
            _ => Self::new(StoreErrorKind::Unknown {
                message: error.to_string(),
            }),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.kind {
            StoreErrorKind::PoolExhausted => {
                "Database connection pool exhausted. Please try again.".to_string()
            }
            StoreErrorKind::NotFound { entity, id } => {
                format!("{} with ID '{}' not found", entity, id)
            }
            StoreErrorKind::UniqueConstraintViolation { column, value } => {
                format!("A record with {} '{}' already exists", column, value)
            }
            StoreErrorKind::QueryError { message } => format!("Database query failed: {}", message),
            StoreErrorKind::TransactionError { message } => {
                format!("Transaction failed: {}", message)
            }
            StoreErrorKind::ConnectionError { message } => {
                format!("Database connection error: {}", message)
            }
            StoreErrorKind::Corrupt { message } => format!("Corrupt stored value: {}", message),
            StoreErrorKind::Unknown { message } => format!("Unknown database error: {}", message),
        };

        if let Some(context) = &self.context {
            write!(f, "{} ({})", message, context)
        } else {
            write!(f, "{}", message)
        }
    }
}

impl std::error::Error for StoreError {}
