use std::sync::Arc;

use model::{
    location::{
        Location, LocationPatch, LocationTreeNode, LocationWithRelations, ParentChange,
    },
    WithId,
};
use tokio::sync::Mutex;
use utility::id::Id;

use crate::{
    ancestry,
    database::{Database, DatabaseError, DatabaseTransaction, LocationRepo},
    tree, LocationError, LocationResult,
};

/// Entry point to the location registry.
///
/// Every mutation runs its checks and its write in one transaction. On top of
/// that, mutations issued through clones of the same manager are serialized, so
/// two concurrent re-parentings can not both pass their cycle check.
#[derive(Debug, Clone)]
pub struct LocationManager<D>
where
    D: Database + Send + Sync + Sized + 'static,
{
    database: D,
    mutation_lock: Arc<Mutex<()>>,
}

impl<D> LocationManager<D>
where
    D: Database,
{
    pub fn new(database: D) -> Self {
        Self {
            database,
            mutation_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, location: Location) -> LocationResult<WithId<Location>> {
        log::info!("creating new location: {}", location.location_name);
        let created = self
            .create_locked(location)
            .await
            .map_err(|why| rejected("create", why))?;
        log::info!("successfully created location with ID: {}", created.id);
        Ok(created)
    }

    pub async fn find_all(&self) -> LocationResult<Vec<LocationWithRelations>> {
        log::info!("fetching all locations");
        self.database
            .auto()
            .find_all_with_relations()
            .await
            .map_err(|why| rejected("fetch locations", why.into()))
    }

    pub async fn find_one(&self, id: Id<Location>) -> LocationResult<LocationWithRelations> {
        log::info!("fetching location with ID: {}", id);
        self.find_one_with_relations(id)
            .await
            .map_err(|why| rejected("fetch location", why))
    }

    pub async fn find_tree(&self) -> LocationResult<Vec<LocationTreeNode>> {
        log::info!("fetching location tree");
        tree::build_forest(&mut self.database.auto())
            .await
            .map_err(|why| rejected("load location tree", why.into()))
    }

    pub async fn update(
        &self,
        id: Id<Location>,
        patch: LocationPatch,
    ) -> LocationResult<WithId<Location>> {
        log::info!("updating location with ID: {}", id);
        let updated = self
            .update_locked(id, patch)
            .await
            .map_err(|why| rejected("update", why))?;
        log::info!("successfully updated location with ID: {}", id);
        Ok(updated)
    }

    pub async fn remove(&self, id: Id<Location>) -> LocationResult<WithId<Location>> {
        log::info!("removing location with ID: {}", id);
        let removed = self
            .remove_locked(id)
            .await
            .map_err(|why| rejected("remove", why))?;
        log::info!("successfully removed location with ID: {}", id);
        Ok(removed)
    }

    /// Number of stored locations.
    pub async fn count(&self) -> LocationResult<i64> {
        self.database
            .auto()
            .count()
            .await
            .map_err(|why| rejected("count locations", why.into()))
    }

    async fn create_locked(&self, location: Location) -> LocationResult<WithId<Location>> {
        let _guard = self.mutation_lock.lock().await;
        let mut tx = self.database.transaction().await?;

        if let Some(parent_id) = location.parent_id {
            tx.lock_ancestry(&[parent_id]).await?;
            if tx.find_by_id(parent_id).await?.is_none() {
                return Err(LocationError::ParentNotFound(parent_id));
            }
        }

        let number = location.location_number.clone();
        let created = tx
            .insert(location)
            .await
            .map_err(|why| write_error(why, None, number))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find_one_with_relations(
        &self,
        id: Id<Location>,
    ) -> LocationResult<LocationWithRelations> {
        let mut db = self.database.auto();
        let location = db
            .find_by_id(id)
            .await?
            .ok_or(LocationError::NotFound(id))?;
        let parent = match location.content.parent_id {
            Some(parent_id) => db.find_by_id(parent_id).await?,
            None => None,
        };
        let children = db.find_children(id).await?;
        Ok(LocationWithRelations {
            location,
            parent,
            children,
        })
    }

    async fn update_locked(
        &self,
        id: Id<Location>,
        patch: LocationPatch,
    ) -> LocationResult<WithId<Location>> {
        let _guard = self.mutation_lock.lock().await;
        let mut tx = self.database.transaction().await?;

        let mut locked = vec![id];
        if let ParentChange::Attach(parent_id) = patch.parent {
            locked.push(parent_id);
        }
        tx.lock_ancestry(&locked).await?;

        let mut location = tx
            .find_by_id(id)
            .await?
            .ok_or(LocationError::NotFound(id))?;

        match patch.parent {
            ParentChange::Keep => {}
            ParentChange::Detach => location.content.parent_id = None,
            ParentChange::Attach(parent_id) => {
                check_parent(&mut tx, id, parent_id).await?;
                location.content.parent_id = Some(parent_id);
            }
        }
        patch.apply_fields(&mut location.content);

        let number = location.content.location_number.clone();
        let updated = tx
            .update(location)
            .await
            .map_err(|why| write_error(why, Some(id), number))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_locked(&self, id: Id<Location>) -> LocationResult<WithId<Location>> {
        let _guard = self.mutation_lock.lock().await;
        let mut tx = self.database.transaction().await?;
        tx.lock_ancestry(&[id]).await?;

        let location = tx
            .find_by_id(id)
            .await?
            .ok_or(LocationError::NotFound(id))?;

        let children = tx.find_children(id).await?;
        if !children.is_empty() {
            return Err(LocationError::HasChildren {
                id,
                children: children.len(),
            });
        }

        let removed = tx
            .delete(location)
            .await
            .map_err(|why| write_error(why, Some(id), String::new()))?;
        tx.commit().await?;
        Ok(removed)
    }
}

/// Validates attaching `id` below `parent_id`.
async fn check_parent<R>(
    repo: &mut R,
    id: Id<Location>,
    parent_id: Id<Location>,
) -> LocationResult<()>
where
    R: LocationRepo + Send + ?Sized,
{
    if repo.find_by_id(parent_id).await?.is_none() {
        return Err(LocationError::ParentNotFound(parent_id));
    }
    if parent_id == id {
        return Err(LocationError::SelfParent(id));
    }
    if ancestry::is_within_subtree(repo, id, parent_id).await? {
        return Err(LocationError::CyclicParent { id, parent_id });
    }
    Ok(())
}

fn write_error(
    why: DatabaseError,
    id: Option<Id<Location>>,
    location_number: String,
) -> LocationError {
    match (why, id) {
        (DatabaseError::DuplicateKey(_), _) => {
            LocationError::DuplicateLocationNumber(location_number)
        }
        (DatabaseError::NotFound, Some(id)) => LocationError::NotFound(id),
        (why, _) => why.into(),
    }
}

fn rejected(action: &str, why: LocationError) -> LocationError {
    match &why {
        LocationError::StorageFailure(source) => {
            log::error!("failed to {}: {}", action, source)
        }
        _ => log::warn!("failed to {}: {}", action, why),
    }
    why
}
