//! Cycle detection for re-parenting.

use std::collections::HashSet;

use model::location::Location;
use utility::id::Id;

use crate::database::{LocationRepo, Result};

/// Returns whether `candidate` is `subtree_root` itself or one of its descendants.
///
/// Used to reject attaching a location below one of its own descendants, which
/// would close a cycle. The subtree is walked breadth first with one store round
/// trip per level. Locations already visited are not expanded again, so the walk
/// terminates even if the stored hierarchy is corrupted.
pub async fn is_within_subtree<R>(
    repo: &mut R,
    subtree_root: Id<Location>,
    candidate: Id<Location>,
) -> Result<bool>
where
    R: LocationRepo + Send + ?Sized,
{
    if subtree_root == candidate {
        return Ok(true);
    }

    let mut visited = HashSet::from([subtree_root]);
    let mut frontier = vec![subtree_root];
    while !frontier.is_empty() {
        let children = repo.find_children_of_set(&frontier).await?;
        if children.iter().any(|child| child.id == candidate) {
            return Ok(true);
        }
        frontier = children
            .into_iter()
            .map(|child| child.id)
            .filter(|id| visited.insert(*id))
            .collect();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use model::location::Location;
    use utility::id::Id;

    use super::is_within_subtree;
    use crate::{
        database::{Database, LocationRepo},
        memory::MemoryDatabase,
    };

    async fn insert(
        db: &MemoryDatabase,
        number: &str,
        parent: Option<Id<Location>>,
    ) -> Id<Location> {
        db.auto()
            .insert(Location {
                building: "A".to_owned(),
                location_name: number.to_owned(),
                location_number: number.to_owned(),
                area: 1.0,
                parent_id: parent,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn finds_deep_descendants() {
        let db = MemoryDatabase::new();
        let root = insert(&db, "A", None).await;
        let floor = insert(&db, "A-1", Some(root)).await;
        let room = insert(&db, "A-1-1", Some(floor)).await;
        let other = insert(&db, "B", None).await;

        let mut repo = db.auto();
        assert!(is_within_subtree(&mut repo, root, room).await.unwrap());
        assert!(is_within_subtree(&mut repo, root, floor).await.unwrap());
        assert!(is_within_subtree(&mut repo, root, root).await.unwrap());
        assert!(!is_within_subtree(&mut repo, floor, root).await.unwrap());
        assert!(!is_within_subtree(&mut repo, root, other).await.unwrap());
        assert!(!is_within_subtree(&mut repo, room, floor).await.unwrap());
    }

    #[tokio::test]
    async fn terminates_on_corrupted_cycle() {
        let db = MemoryDatabase::new();
        let a = insert(&db, "A", None).await;
        let b = insert(&db, "B", Some(a)).await;
        let unrelated = insert(&db, "C", None).await;

        // close a cycle behind the registry's back
        let mut repo = db.auto();
        let mut root = repo.find_by_id(a).await.unwrap().unwrap();
        root.content.parent_id = Some(b);
        repo.update(root).await.unwrap();

        assert!(!is_within_subtree(&mut repo, a, unrelated).await.unwrap());
        assert!(is_within_subtree(&mut repo, b, a).await.unwrap());
    }
}
