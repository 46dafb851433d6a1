use model::location::{Location, LocationPatch, ParentChange};
use serde::Deserialize;
use utility::id::Id;

use crate::common::RouteErrorResponse;

/// Request body of `POST /locations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLocationDto {
    building: String,
    location_name: String,
    location_number: String,
    area: f64,
    #[serde(default)]
    parent_id: Option<Id<Location>>,
}

impl TryFrom<CreateLocationDto> for Location {
    type Error = RouteErrorResponse;

    fn try_from(dto: CreateLocationDto) -> Result<Self, Self::Error> {
        Ok(Location {
            building: non_empty("building", dto.building)?,
            location_name: non_empty("locationName", dto.location_name)?,
            location_number: non_empty("locationNumber", dto.location_number)?,
            area: dto.area,
            parent_id: dto.parent_id,
        })
    }
}

/// Request body of `PUT /locations/:id`. Every field is optional.
///
/// `parentId` missing or `null` turns the location into a root, unless
/// `keepParent` is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateLocationDto {
    #[serde(default)]
    building: Option<String>,
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default)]
    location_number: Option<String>,
    #[serde(default)]
    area: Option<f64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    parent_id: Option<Option<Id<Location>>>,
    #[serde(default)]
    keep_parent: bool,
}

impl TryFrom<UpdateLocationDto> for LocationPatch {
    type Error = RouteErrorResponse;

    fn try_from(dto: UpdateLocationDto) -> Result<Self, Self::Error> {
        let parent = match (dto.keep_parent, dto.parent_id) {
            (true, Some(_)) => {
                return Err(RouteErrorResponse::bad_request(
                    "keepParent can not be combined with parentId",
                ))
            }
            (true, None) => ParentChange::Keep,
            (false, Some(Some(parent_id))) => ParentChange::Attach(parent_id),
            (false, _) => ParentChange::Detach,
        };

        Ok(LocationPatch {
            building: dto
                .building
                .map(|v| non_empty("building", v))
                .transpose()?,
            location_name: dto
                .location_name
                .map(|v| non_empty("locationName", v))
                .transpose()?,
            location_number: dto
                .location_number
                .map(|v| non_empty("locationNumber", v))
                .transpose()?,
            area: dto.area,
            parent,
        })
    }
}

fn non_empty(field: &str, value: String) -> Result<String, RouteErrorResponse> {
    if value.trim().is_empty() {
        Err(RouteErrorResponse::bad_request(format!(
            "{} must not be empty",
            field
        )))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use model::location::{Location, LocationPatch, ParentChange};
    use serde_json::json;
    use utility::id::Id;

    use super::{CreateLocationDto, UpdateLocationDto};

    fn patch(body: serde_json::Value) -> Result<LocationPatch, String> {
        let dto: UpdateLocationDto = serde_json::from_value(body).unwrap();
        LocationPatch::try_from(dto).map_err(|why| why.message.unwrap_or_default())
    }

    #[test]
    fn create_requires_non_empty_strings() {
        let dto: CreateLocationDto = serde_json::from_value(json!({
            "building": "A",
            "locationName": " ",
            "locationNumber": "A-01",
            "area": 12.5
        }))
        .unwrap();
        let why = Location::try_from(dto).unwrap_err();
        assert_eq!(why.message.as_deref(), Some("locationName must not be empty"));
    }

    #[test]
    fn create_rejects_non_numeric_area() {
        let result = serde_json::from_value::<CreateLocationDto>(json!({
            "building": "A",
            "locationName": "Lobby",
            "locationNumber": "A-01",
            "area": "big"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn parent_id_decides_the_parent_change() {
        assert_eq!(patch(json!({})).unwrap().parent, ParentChange::Detach);
        assert_eq!(
            patch(json!({ "parentId": null })).unwrap().parent,
            ParentChange::Detach
        );
        assert_eq!(
            patch(json!({ "parentId": 4 })).unwrap().parent,
            ParentChange::Attach(Id::new(4))
        );
        assert_eq!(
            patch(json!({ "keepParent": true })).unwrap().parent,
            ParentChange::Keep
        );
    }

    #[test]
    fn keep_parent_conflicts_with_parent_id() {
        assert!(patch(json!({ "keepParent": true, "parentId": null })).is_err());
        assert!(patch(json!({ "keepParent": true, "parentId": 2 })).is_err());
    }

    #[test]
    fn update_fields_are_optional_but_not_empty() {
        let patch_ok = patch(json!({ "area": 3.5, "locationName": "Pantry" })).unwrap();
        assert_eq!(patch_ok.area, Some(3.5));
        assert_eq!(patch_ok.location_name.as_deref(), Some("Pantry"));
        assert!(patch_ok.building.is_none());

        assert_eq!(
            patch(json!({ "locationNumber": "" })).unwrap_err(),
            "locationNumber must not be empty"
        );
    }
}
