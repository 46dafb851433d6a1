use model::location::Location;
use sqlx::prelude::FromRow;
use utility::id::Id;

use super::DatabaseRow;

/// A location, e.g. a building, a floor or a room.
/// Table: `locations`
///
/// `area` is stored as `NUMERIC` and read back as `float8`.
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    pub id: i32,
    pub building: String,
    pub location_name: String,
    pub location_number: String,
    pub area: f64,
    pub parent_id: Option<i32>,
}

impl DatabaseRow for LocationRow {
    type Model = Location;

    fn get_id(&self) -> Id<Location> {
        Id::new(self.id)
    }

    fn to_model(self) -> Location {
        Location {
            building: self.building,
            location_name: self.location_name,
            location_number: self.location_number,
            area: self.area,
            parent_id: self.parent_id.map(Id::new),
        }
    }
}
