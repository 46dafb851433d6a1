use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{ExampleData, WithId};

/// A physical location, e.g. a building, a floor or a room.
///
/// Locations form a forest through `parent_id`. The children of a location are not
/// stored with it, they are looked up by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub building: String,
    pub location_name: String,
    /// Unique across all locations.
    pub location_number: String,
    /// Area in square meters.
    pub area: f64,
    pub parent_id: Option<Id<Location>>,
}

impl HasId for Location {
    type IdType = i32;
}

impl Location {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl ExampleData for Location {
    fn example_data() -> Self {
        Self {
            building: "A".to_owned(),
            location_name: "Car Park".to_owned(),
            location_number: "A-CarPark".to_owned(),
            area: 80.62,
            parent_id: None,
        }
    }
}

/// What an update does to the parent of a location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentChange {
    /// Leave the parent as it is.
    Keep,
    /// Make the location a root. An update that names no parent does this.
    #[default]
    Detach,
    /// Move the location below another one.
    Attach(Id<Location>),
}

impl From<Option<Id<Location>>> for ParentChange {
    fn from(parent_id: Option<Id<Location>>) -> Self {
        match parent_id {
            Some(id) => ParentChange::Attach(id),
            None => ParentChange::Detach,
        }
    }
}

/// Partial update of a [`Location`]. Fields that are `None` are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPatch {
    pub building: Option<String>,
    pub location_name: Option<String>,
    pub location_number: Option<String>,
    pub area: Option<f64>,
    pub parent: ParentChange,
}

impl LocationPatch {
    /// Overwrites the plain fields of `location`. The parent is left to the caller,
    /// as changing it needs validation against the stored hierarchy.
    pub fn apply_fields(&self, location: &mut Location) {
        if let Some(building) = &self.building {
            location.building = building.clone();
        }
        if let Some(location_name) = &self.location_name {
            location.location_name = location_name.clone();
        }
        if let Some(location_number) = &self.location_number {
            location.location_number = location_number.clone();
        }
        if let Some(area) = self.area {
            location.area = area;
        }
    }
}

/// A location together with its direct parent and direct children.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationWithRelations {
    #[serde(flatten)]
    pub location: WithId<Location>,
    pub parent: Option<WithId<Location>>,
    pub children: Vec<WithId<Location>>,
}

/// A node of the nested location tree. Unlike [`Location`], only children are
/// shown, the parent is implied by nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationTreeNode {
    pub id: Id<Location>,
    pub name: String,
    pub location_number: String,
    pub building: String,
    pub area: f64,
    pub children: Vec<LocationTreeNode>,
}

impl LocationTreeNode {
    pub fn leaf(location: WithId<Location>) -> Self {
        Self {
            id: location.id,
            name: location.content.location_name,
            location_number: location.content.location_number,
            building: location.content.building,
            area: location.content.area,
            children: vec![],
        }
    }

    /// Number of nodes in this subtree, including this node.
    pub fn count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use utility::id::Id;

    use super::*;

    fn room(number: &str, parent: Option<i32>) -> Location {
        Location {
            building: "B".to_owned(),
            location_name: format!("Room {}", number),
            location_number: number.to_owned(),
            area: 12.5,
            parent_id: parent.map(Id::new),
        }
    }

    #[test]
    fn location_serializes_camel_case_with_id() {
        let value = serde_json::to_value(WithId::new(Id::new(3), room("B-05-11", Some(8))))
            .unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "building": "B",
                "locationName": "Room B-05-11",
                "locationNumber": "B-05-11",
                "area": 12.5,
                "parentId": 8
            })
        );
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut location = room("A-01", Some(1));
        let patch = LocationPatch {
            location_name: Some("Lobby".to_owned()),
            area: Some(-3.0),
            ..Default::default()
        };
        patch.apply_fields(&mut location);
        assert_eq!(location.location_name, "Lobby");
        assert_eq!(location.area, -3.0);
        assert_eq!(location.location_number, "A-01");
        assert_eq!(location.parent_id, Some(Id::new(1)));
    }

    #[test]
    fn default_parent_change_detaches() {
        assert_eq!(LocationPatch::default().parent, ParentChange::Detach);
        assert_eq!(
            ParentChange::from(Some(Id::new(4))),
            ParentChange::Attach(Id::new(4))
        );
    }

    #[test]
    fn tree_node_counts_nested_children() {
        let mut root = LocationTreeNode::leaf(WithId::new(Id::new(1), room("A", None)));
        let mut floor = LocationTreeNode::leaf(WithId::new(Id::new(2), room("A-1", Some(1))));
        floor
            .children
            .push(LocationTreeNode::leaf(WithId::new(Id::new(3), room("A-1-1", Some(2)))));
        root.children.push(floor);
        assert_eq!(root.count(), 3);
        assert_eq!(root.children[0].name, "Room A-1");
    }
}
