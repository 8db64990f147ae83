#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error("Database error")]
    DatabaseError(sqlx::Error),
    #[error("Record not found")]
    NotFound,
}

impl DatabaseError {
    /// Unique index violations surface as 400s, so callers check for them
    /// before wrapping the error.
    pub fn is_unique_violation(error: &sqlx::Error) -> bool {
        match error {
            sqlx::Error::Database(db_error) => db_error.is_unique_violation(),
            _ => false,
        }
    }
}
