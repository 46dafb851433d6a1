//! Assembly of the flat location table into a nested forest.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use model::{
    location::{Location, LocationTreeNode},
    WithId,
};
use utility::id::Id;

use crate::database::{LocationRepo, Result};

/// Builds the whole location forest.
///
/// The hierarchy is fetched level by level: the roots first, then the children of
/// all locations of the previous level in a single batched lookup, until a level
/// comes back empty. Nesting happens in memory afterwards, from the deepest level
/// up. Siblings are ordered by ascending id.
pub async fn build_forest<R>(repo: &mut R) -> Result<Vec<LocationTreeNode>>
where
    R: LocationRepo + Send + ?Sized,
{
    let levels = fetch_levels(repo).await?;
    Ok(assemble(levels))
}

async fn fetch_levels<R>(repo: &mut R) -> Result<Vec<Vec<WithId<Location>>>>
where
    R: LocationRepo + Send + ?Sized,
{
    let roots = repo.find_roots().await?;
    let mut seen: HashSet<Id<Location>> = roots.iter().map(|root| root.id).collect();
    let mut levels = vec![roots];

    loop {
        let frontier = levels
            .last()
            .map(|level| level.iter().map(|location| location.id).collect_vec())
            .unwrap_or_default();
        if frontier.is_empty() {
            break;
        }

        // a location seen twice can only come from a corrupted, cyclic table
        let children = repo
            .find_children_of_set(&frontier)
            .await?
            .into_iter()
            .filter(|child| seen.insert(child.id))
            .collect_vec();
        if children.is_empty() {
            break;
        }
        levels.push(children);
    }

    log::debug!("fetched location tree with {} levels", levels.len());
    Ok(levels)
}

fn assemble(levels: Vec<Vec<WithId<Location>>>) -> Vec<LocationTreeNode> {
    let mut forest = vec![];
    let mut below: HashMap<Id<Location>, Vec<LocationTreeNode>> = HashMap::new();

    for level in levels.into_iter().rev() {
        let mut current: HashMap<Id<Location>, Vec<LocationTreeNode>> = HashMap::new();
        for location in level.into_iter().sorted_by_key(|location| location.id) {
            let parent_id = location.content.parent_id;
            let mut node = LocationTreeNode::leaf(location);
            node.children = below.remove(&node.id).unwrap_or_default();
            match parent_id {
                Some(parent_id) => current.entry(parent_id).or_default().push(node),
                None => forest.push(node),
            }
        }
        below = current;
    }

    forest
}

#[cfg(test)]
mod tests {
    use model::location::Location;
    use utility::id::Id;

    use super::build_forest;
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
                building: number[..1].to_owned(),
                location_name: format!("Location {}", number),
                location_number: number.to_owned(),
                area: 10.0,
                parent_id: parent,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn empty_store_builds_empty_forest() {
        let db = MemoryDatabase::new();
        assert!(build_forest(&mut db.auto()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nests_children_below_their_parents() {
        let db = MemoryDatabase::new();
        let a = insert(&db, "A", None).await;
        let b = insert(&db, "B", None).await;
        let a1 = insert(&db, "A-1", Some(a)).await;
        let b1 = insert(&db, "B-1", Some(b)).await;
        let a2 = insert(&db, "A-2", Some(a)).await;
        let a11 = insert(&db, "A-1-1", Some(a1)).await;

        let forest = build_forest(&mut db.auto()).await.unwrap();

        assert_eq!(forest.iter().map(|node| node.count()).sum::<usize>(), 6);
        assert_eq!(forest.iter().map(|node| node.id).collect::<Vec<_>>(), vec![a, b]);

        let building_a = &forest[0];
        assert_eq!(building_a.name, "Location A");
        assert_eq!(
            building_a.children.iter().map(|node| node.id).collect::<Vec<_>>(),
            vec![a1, a2]
        );
        assert_eq!(building_a.children[0].children[0].id, a11);
        assert!(building_a.children[1].children.is_empty());
        assert_eq!(forest[1].children[0].id, b1);
        assert_eq!(forest[1].children[0].location_number, "B-1");
    }

    #[tokio::test]
    async fn siblings_are_ordered_by_id_after_reparenting() {
        let db = MemoryDatabase::new();
        let a = insert(&db, "A", None).await;
        let b = insert(&db, "B", None).await;
        let late = insert(&db, "A-9", Some(b)).await;
        let early = insert(&db, "A-1", Some(a)).await;

        let mut repo = db.auto();
        let mut moved = repo.find_by_id(late).await.unwrap().unwrap();
        moved.content.parent_id = Some(a);
        repo.update(moved).await.unwrap();

        let forest = build_forest(&mut repo).await.unwrap();
        assert_eq!(
            forest[0].children.iter().map(|node| node.id).collect::<Vec<_>>(),
            vec![late, early]
        );
        assert!(forest[1].children.is_empty());
    }

    #[tokio::test]
    async fn deep_chains_do_not_recurse() {
        let db = MemoryDatabase::new();
        let mut parent = None;
        for depth in 0..2_000 {
            parent = Some(insert(&db, &format!("D-{}", depth), parent).await);
        }

        let forest = build_forest(&mut db.auto()).await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].count(), 2_000);
    }
}
