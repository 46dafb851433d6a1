use std::{error::Error, fmt};

use model::location::Location;
use utility::id::Id;

pub mod ancestry;
pub mod database;
pub mod manager;
pub mod memory;
pub mod seed;
pub mod tree;

/// Everything that can go wrong in a location registry operation.
///
/// All but `StorageFailure` are rejections of the request itself and are raised
/// before anything is written.
#[derive(Debug)]
pub enum LocationError {
    NotFound(Id<Location>),
    ParentNotFound(Id<Location>),
    SelfParent(Id<Location>),
    CyclicParent {
        id: Id<Location>,
        parent_id: Id<Location>,
    },
    DuplicateLocationNumber(String),
    HasChildren {
        id: Id<Location>,
        children: usize,
    },
    StorageFailure(Box<dyn Error + Send + Sync>),
}

impl LocationError {
    pub fn storage<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::StorageFailure(Box::new(why))
    }
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Location with ID {} not found", id),
            Self::ParentNotFound(id) => {
                write!(f, "Parent location with ID {} not found", id)
            }
            Self::SelfParent(id) => {
                write!(f, "Location with ID {} can not be its own parent", id)
            }
            Self::CyclicParent { id, parent_id } => write!(
                f,
                "Location with ID {} is a descendant of location {} and can not be its parent",
                parent_id, id
            ),
            Self::DuplicateLocationNumber(number) => {
                write!(f, "Location number '{}' is already in use", number)
            }
            Self::HasChildren { id, children } => write!(
                f,
                "Cannot delete location with ID {} with {} existing children",
                id, children
            ),
            Self::StorageFailure(why) => write!(f, "storage failure: {}", why),
        }
    }
}

impl Error for LocationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(why) => Some(why.as_ref()),
            _ => None,
        }
    }
}

impl From<database::DatabaseError> for LocationError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::DuplicateKey(key) => {
                Self::DuplicateLocationNumber(key)
            }
            database::DatabaseError::Other(why) => Self::StorageFailure(why),
            why @ database::DatabaseError::NotFound => Self::storage(why),
        }
    }
}

pub type LocationResult<T> = Result<T, LocationError>;

#[cfg(test)]
mod tests {
    use utility::id::Id;

    use super::{database::DatabaseError, LocationError};

    #[test]
    fn duplicate_key_becomes_duplicate_location_number() {
        let error = LocationError::from(DatabaseError::DuplicateKey("A-01".to_owned()));
        assert!(matches!(
            error,
            LocationError::DuplicateLocationNumber(ref number) if number == "A-01"
        ));
    }

    #[test]
    fn messages_name_the_offending_ids() {
        let error = LocationError::CyclicParent {
            id: Id::new(1),
            parent_id: Id::new(2),
        };
        assert_eq!(
            error.to_string(),
            "Location with ID 2 is a descendant of location 1 and can not be its parent"
        );
    }
}
