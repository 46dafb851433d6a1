//! In-process location store, used for tests and for running without PostgreSQL.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use model::{
    location::{Location, LocationWithRelations},
    WithId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use utility::id::Id;

use crate::database::{
    Database, DatabaseAutocommit, DatabaseError, DatabaseTransaction, LocationRepo,
    Result,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    locations: BTreeMap<Id<Location>, Location>,
    last_id: i32,
}

fn row(id: Id<Location>, location: &Location) -> WithId<Location> {
    WithId::new(id, location.clone())
}

impl Tables {
    fn number_taken(&self, number: &str, except: Option<Id<Location>>) -> bool {
        self.locations
            .iter()
            .any(|(id, other)| Some(*id) != except && other.location_number == number)
    }

    fn insert(&mut self, location: Location) -> Result<WithId<Location>> {
        if self.number_taken(&location.location_number, None) {
            return Err(DatabaseError::DuplicateKey(location.location_number));
        }
        self.last_id += 1;
        let id = Id::new(self.last_id);
        self.locations.insert(id, location.clone());
        Ok(WithId::new(id, location))
    }

    fn find_by_id(&self, id: Id<Location>) -> Option<WithId<Location>> {
        self.locations
            .get(&id)
            .map(|location| row(id, location))
    }

    fn find_where<P>(&self, predicate: P) -> Vec<WithId<Location>>
    where
        P: Fn(&Location) -> bool,
    {
        self.locations
            .iter()
            .filter(|(_, location)| predicate(location))
            .map(|(id, location)| row(*id, location))
            .collect()
    }

    fn find_all_with_relations(&self) -> Vec<LocationWithRelations> {
        self.locations
            .iter()
            .map(|(id, location)| LocationWithRelations {
                location: row(*id, location),
                parent: location
                    .parent_id
                    .and_then(|parent_id| self.find_by_id(parent_id)),
                children: self.find_where(|child| child.parent_id == Some(*id)),
            })
            .collect()
    }

    fn update(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        if !self.locations.contains_key(&location.id) {
            return Err(DatabaseError::NotFound);
        }
        if self.number_taken(&location.content.location_number, Some(location.id)) {
            return Err(DatabaseError::DuplicateKey(
                location.content.location_number,
            ));
        }
        self.locations.insert(location.id, location.content.clone());
        Ok(location)
    }

    fn delete(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        self.locations
            .remove(&location.id)
            .map(|removed| WithId::new(location.id, removed))
            .ok_or(DatabaseError::NotFound)
    }
}

/// A location database held in memory. Clones share the same tables.
///
/// A transaction holds the tables exclusively until it is committed or dropped, so
/// transactions are fully serialized.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryDatabaseTransaction {
    guard: OwnedMutexGuard<Tables>,
    /// uncommitted state, written back on commit.
    working: Tables,
}

pub struct MemoryDatabaseAutocommit {
    tables: Arc<Mutex<Tables>>,
}

impl DatabaseAutocommit for MemoryDatabaseAutocommit {}

#[async_trait]
impl DatabaseTransaction for MemoryDatabaseTransaction {
    async fn commit(mut self) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Transaction = MemoryDatabaseTransaction;
    type Autocommit = MemoryDatabaseAutocommit;

    async fn transaction(&self) -> Result<Self::Transaction> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryDatabaseTransaction { guard, working })
    }

    fn auto(&self) -> Self::Autocommit {
        MemoryDatabaseAutocommit {
            tables: self.tables.clone(),
        }
    }
}

#[async_trait]
impl LocationRepo for MemoryDatabaseAutocommit {
    async fn insert(&mut self, location: Location) -> Result<WithId<Location>> {
        self.tables.lock().await.insert(location)
    }

    async fn find_by_id(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        Ok(self.tables.lock().await.find_by_id(id))
    }

    async fn find_all_with_relations(&mut self) -> Result<Vec<LocationWithRelations>> {
        Ok(self.tables.lock().await.find_all_with_relations())
    }

    async fn find_children(
        &mut self,
        id: Id<Location>,
    ) -> Result<Vec<WithId<Location>>> {
        Ok(self
            .tables
            .lock()
            .await
            .find_where(|location| location.parent_id == Some(id)))
    }

    async fn find_children_of_set(
        &mut self,
        ids: &[Id<Location>],
    ) -> Result<Vec<WithId<Location>>> {
        Ok(self.tables.lock().await.find_where(|location| {
            location
                .parent_id
                .map_or(false, |parent_id| ids.contains(&parent_id))
        }))
    }

    async fn find_roots(&mut self) -> Result<Vec<WithId<Location>>> {
        Ok(self.tables.lock().await.find_where(Location::is_root))
    }

    async fn update(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        self.tables.lock().await.update(location)
    }

    async fn delete(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        self.tables.lock().await.delete(location)
    }

    async fn count(&mut self) -> Result<i64> {
        Ok(self.tables.lock().await.locations.len() as i64)
    }

    async fn lock_ancestry(&mut self, _ids: &[Id<Location>]) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl LocationRepo for MemoryDatabaseTransaction {
    async fn insert(&mut self, location: Location) -> Result<WithId<Location>> {
        self.working.insert(location)
    }

    async fn find_by_id(
        &mut self,
        id: Id<Location>,
    ) -> Result<Option<WithId<Location>>> {
        Ok(self.working.find_by_id(id))
    }

    async fn find_all_with_relations(&mut self) -> Result<Vec<LocationWithRelations>> {
        Ok(self.working.find_all_with_relations())
    }

    async fn find_children(
        &mut self,
        id: Id<Location>,
    ) -> Result<Vec<WithId<Location>>> {
        Ok(self
            .working
            .find_where(|location| location.parent_id == Some(id)))
    }

    async fn find_children_of_set(
        &mut self,
        ids: &[Id<Location>],
    ) -> Result<Vec<WithId<Location>>> {
        Ok(self.working.find_where(|location| {
            location
                .parent_id
                .map_or(false, |parent_id| ids.contains(&parent_id))
        }))
    }

    async fn find_roots(&mut self) -> Result<Vec<WithId<Location>>> {
        Ok(self.working.find_where(Location::is_root))
    }

    async fn update(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        self.working.update(location)
    }

    async fn delete(&mut self, location: WithId<Location>) -> Result<WithId<Location>> {
        self.working.delete(location)
    }

    async fn count(&mut self) -> Result<i64> {
        Ok(self.working.locations.len() as i64)
    }

    async fn lock_ancestry(&mut self, _ids: &[Id<Location>]) -> Result<()> {
        // the transaction already holds all tables
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use model::location::Location;
    use utility::id::Id;

    use super::MemoryDatabase;
    use crate::database::{Database, DatabaseError, DatabaseTransaction, LocationRepo};

    fn location(number: &str) -> Location {
        Location {
            building: "A".to_owned(),
            location_name: number.to_owned(),
            location_number: number.to_owned(),
            area: 0.0,
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let db = MemoryDatabase::new();
        let mut repo = db.auto();
        let first = repo.insert(location("A-01")).await.unwrap();
        let second = repo.insert(location("A-02")).await.unwrap();
        assert_eq!(first.id, Id::new(1));
        assert_eq!(second.id, Id::new(2));
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejects_duplicate_location_numbers() {
        let db = MemoryDatabase::new();
        let mut repo = db.auto();
        repo.insert(location("A-01")).await.unwrap();
        let other = repo.insert(location("A-02")).await.unwrap();

        assert!(matches!(
            repo.insert(location("A-01")).await,
            Err(DatabaseError::DuplicateKey(number)) if number == "A-01"
        ));

        let mut renamed = other.clone();
        renamed.content.location_number = "A-01".to_owned();
        assert!(matches!(
            repo.update(renamed).await,
            Err(DatabaseError::DuplicateKey(_))
        ));
        // rewriting a row with its own number is fine
        assert!(repo.update(other).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let db = MemoryDatabase::new();
        {
            let mut tx = db.transaction().await.unwrap();
            tx.insert(location("A-01")).await.unwrap();
        }
        assert_eq!(db.auto().count().await.unwrap(), 0);

        let mut tx = db.transaction().await.unwrap();
        tx.insert(location("A-01")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(db.auto().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn relations_list_parent_and_children() {
        let db = MemoryDatabase::new();
        let mut repo = db.auto();
        let root = repo.insert(location("A")).await.unwrap();
        let child = repo
            .insert(Location {
                parent_id: Some(root.id),
                ..location("A-1")
            })
            .await
            .unwrap();

        let all = repo.find_all_with_relations().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].parent.is_none());
        assert_eq!(all[0].children.len(), 1);
        assert_eq!(all[0].children[0].id, child.id);
        assert_eq!(all[1].parent.as_ref().map(|parent| parent.id), Some(root.id));
        assert!(all[1].children.is_empty());
    }
}
