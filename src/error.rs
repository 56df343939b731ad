use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::db::query::{Column, Table};

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Invalid email: '{0}'")]
    InvalidEmail(String),

    #[error("Invalid phone: '{0}'. Expected 7 to 11 digits")]
    InvalidPhone(String),

    #[error("Invalid {field}: '{value}'. Expected 1 to 40 characters")]
    InvalidName { field: &'static str, value: String },

    #[error("Constraint violation{}: {message}", .constraint.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    ConstraintViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("No row in {table} matching {key}")]
    NotFound { table: Table, key: String },

    #[error("Nothing to {0}: every field was absent")]
    EmptyFields(&'static str),

    #[error("Column {column:?} does not belong to table {table}")]
    ColumnMismatch { column: Column, table: Table },

    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for CrmError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    return CrmError::ConstraintViolation {
                        constraint: db_err.constraint().map(str::to_owned),
                        message: db_err.message().to_owned(),
                    };
                }
                _ => {}
            }
            // string_data_right_truncation: value longer than the column allows
            if db_err.code().as_deref() == Some("22001") {
                return CrmError::ConstraintViolation {
                    constraint: None,
                    message: db_err.message().to_owned(),
                };
            }
        }
        CrmError::Database(err)
    }
}

impl CrmError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, CrmError::ConstraintViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;
