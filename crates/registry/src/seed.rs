//! Sample hierarchy for fresh installations.

use model::location::Location;
use utility::id::Id;

use crate::{database::Database, manager::LocationManager, LocationResult};

/// (building, name, number, area)
type Room = (&'static str, &'static str, &'static str, f64);

const LEVEL_1_ROOMS: &[Room] = &[
    ("A", "Lobby Level1", "A-01-Lobby", 80.62),
    ("A", "Master Room", "A-01-01", 50.11),
    ("A", "Meeting Room 1", "A-01-M1", 20.11),
    ("A", "Corridor Level 1", "A-01-Corridor", 30.2),
    ("A", "Toilet Level 1", "A-01-02", 30.2),
];

const LEVEL_5_ROOMS: &[Room] = &[
    ("B", "Utility Room", "B-05-11", 10.2),
    ("B", "Sanitary Room", "B-05-12", 12.2),
    ("B", "Male Toilet", "B-05-13", 30.2),
    ("B", "Genset Room", "B-05-14", 35.2),
    ("B", "Pantry Level 5", "B-05-15", 50.2),
    ("B", "Corridor Level 5", "B-05-Corridor", 30.0),
];

/// Seeds the registry with building A (car park, level 1 and its rooms) and
/// building B (level 5 and its rooms), unless it already contains locations.
///
/// Everything goes through the manager, so the usual validation applies. Returns
/// the number of locations created.
pub async fn run<D: Database>(manager: &LocationManager<D>) -> LocationResult<usize> {
    if manager.count().await? > 0 {
        log::info!("locations present, skipping seed");
        return Ok(0);
    }

    let car_park = manager
        .create(location("A", "Car Park", "A-CarPark", 80.62, None))
        .await?;
    let level_5 = manager
        .create(location("B", "Level 5", "B-05", 150.0, None))
        .await?;
    let level_1 = manager
        .create(location("A", "Level 1", "A-01", 100.92, Some(car_park.id)))
        .await?;
    let mut created = 3;

    for (parent, rooms) in [(level_1.id, LEVEL_1_ROOMS), (level_5.id, LEVEL_5_ROOMS)] {
        for &(building, name, number, area) in rooms {
            manager
                .create(location(building, name, number, area, Some(parent)))
                .await?;
            created += 1;
        }
    }

    log::info!("seeded {} locations", created);
    Ok(created)
}

fn location(
    building: &str,
    name: &str,
    number: &str,
    area: f64,
    parent_id: Option<Id<Location>>,
) -> Location {
    Location {
        building: building.to_owned(),
        location_name: name.to_owned(),
        location_number: number.to_owned(),
        area,
        parent_id,
    }
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::{manager::LocationManager, memory::MemoryDatabase};

    #[tokio::test]
    async fn seeds_two_buildings_once() {
        let manager = LocationManager::new(MemoryDatabase::new());
        assert_eq!(run(&manager).await.unwrap(), 14);
        assert_eq!(run(&manager).await.unwrap(), 0);

        let tree = manager.find_tree().await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].location_number, "A-CarPark");
        assert_eq!(tree[0].children[0].location_number, "A-01");
        assert_eq!(tree[0].children[0].children.len(), 5);
        assert_eq!(tree[1].location_number, "B-05");
        assert_eq!(tree[1].children.len(), 6);
        assert_eq!(tree.iter().map(|node| node.count()).sum::<usize>(), 14);
    }
}
