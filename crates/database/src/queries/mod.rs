use registry::database::DatabaseError;

pub mod location;

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        _ => DatabaseError::Other(Box::new(why)),
    }
}

/// Like [`convert_error`], but reports unique violations as `DuplicateKey` with
/// the value that was about to be written.
pub(crate) fn convert_write_error(why: sqlx::Error, key: &str) -> DatabaseError {
    match why {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            DatabaseError::DuplicateKey(key.to_owned())
        }
        _ => convert_error(why),
    }
}
