use std::{error, fmt, result};

use async_trait::async_trait;
use model::{
    location::{Location, LocationWithRelations},
    WithId,
};
use utility::id::Id;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    /// A unique constraint was violated. Carries the conflicting value.
    DuplicateKey(String),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::DuplicateKey(key) => write!(f, "duplicate key '{}'", key),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl error::Error for DatabaseError {}

pub type Result<T> = result::Result<T, DatabaseError>;

/// Storage of the location hierarchy as a flat adjacency list.
///
/// Implementations do not validate the hierarchy, that is up to the caller.
#[async_trait]
pub trait LocationRepo {
    /// Persists a new location and returns it with its assigned id.
    ///
    /// Fails with `DuplicateKey` if the location number is taken.
    async fn insert(&mut self, location: Location) -> Result<WithId<Location>>;

    async fn find_by_id(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>>;

    /// All locations with their direct parent and children, ordered by id.
    async fn find_all_with_relations(&mut self) -> Result<Vec<LocationWithRelations>>;

    async fn find_children(
        &mut self,
        id: Id<Location>,
    ) -> Result<Vec<WithId<Location>>>;

    /// All locations whose parent is one of `ids`, in a single round trip.
    async fn find_children_of_set(
        &mut self,
        ids: &[Id<Location>],
    ) -> Result<Vec<WithId<Location>>>;

    async fn find_roots(&mut self) -> Result<Vec<WithId<Location>>>;

    /// Overwrites all fields of an existing location.
    ///
    /// Fails with `DuplicateKey` if the location number is taken by another row and
    /// with `NotFound` if the row does not exist.
    async fn update(&mut self, location: WithId<Location>) -> Result<WithId<Location>>;

    /// Removes a location. Does not check for children.
    async fn delete(&mut self, location: WithId<Location>) -> Result<WithId<Location>>;

    async fn count(&mut self) -> Result<i64>;

    /// Locks the given rows and all of their ancestors until the end of the
    /// current transaction.
    async fn lock_ancestry(&mut self, ids: &[Id<Location>]) -> Result<()>;
}

pub trait DatabaseOperations: LocationRepo + Send {}

impl<T> DatabaseOperations for T where T: LocationRepo + Send {}

#[async_trait]
pub trait DatabaseTransaction: DatabaseOperations {
    async fn commit(self) -> Result<()>;
}

pub trait DatabaseAutocommit: DatabaseOperations {}

/// trait to implement a location database.
/// multiple concurrent accesses should be possible by e.g. cloning the database object.
#[async_trait]
pub trait Database: Clone + Send + Sync + Sized + 'static {
    type Transaction: DatabaseTransaction + Send;
    type Autocommit: DatabaseAutocommit + Send;

    /// Starts a transaction. Dropping it without committing discards its writes.
    async fn transaction(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;
}
