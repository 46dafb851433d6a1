use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Json, Router,
};
use model::{
    location::{Location, LocationPatch, LocationTreeNode, LocationWithRelations},
    WithId,
};
use registry::database::Database;
use utility::{id::Id, let_also::LetAlso};

use super::dto::{CreateLocationDto, UpdateLocationDto};
use crate::{
    common::{
        route_not_found, schema, schema_no_example, HateoasResult, RouteErrorResponse,
        RouteResult, VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/locations{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<Location>))
        .route("/tree/schema", get(schema_no_example::<LocationTreeNode>))
        .route("/tree", get(get_tree::<D>))
        .route(
            "/:id",
            get(get_location::<D>)
                .put(update_location::<D>)
                .delete(delete_location::<D>),
        )
        .route("/", get(get_locations::<D>).post(create_location::<D>))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_locations<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { locations }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<LocationWithRelations>>> {
    locations
        .find_all()
        .await
        .map(|all| {
            all.into_iter()
                .map(|location| location_with_relations_hateoas(location, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::new(data).hateoas().json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_tree<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { locations }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<LocationTreeNode>> {
    locations
        .find_tree()
        .await
        .map(|forest| {
            hateoas::Response::builder(VecResponse::new(forest), base_url)
                .link("self", resource!("/tree"))
                .link("locations", resource!(""))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn get_location<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { locations }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<LocationWithRelations> {
    let id = parse_id(&id, &Method::GET, original_uri.path())?;
    locations
        .find_one(id)
        .await
        .map(|location| location_with_relations_hateoas(location, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn create_location<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { locations }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    payload: Result<Json<CreateLocationDto>, JsonRejection>,
) -> RouteResult<(StatusCode, Json<hateoas::Response<WithId<Location>>>)> {
    let with_request = |why: RouteErrorResponse| {
        why.with_method(&Method::POST).with_uri(original_uri.path())
    };

    let Json(dto) = payload.map_err(|why| with_request(why.into()))?;
    let location = Location::try_from(dto).map_err(with_request)?;

    locations
        .create(location)
        .await
        .map(|created| (StatusCode::CREATED, location_hateoas(created, base_url).json()))
        .map_err(|why| with_request(why.into()))
}

async fn update_location<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { locations }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    payload: Result<Json<UpdateLocationDto>, JsonRejection>,
) -> HateoasResult<WithId<Location>> {
    let with_request = |why: RouteErrorResponse| {
        why.with_method(&Method::PUT).with_uri(original_uri.path())
    };

    let id = parse_id(&id, &Method::PUT, original_uri.path())?;
    let Json(dto) = payload.map_err(|why| with_request(why.into()))?;
    let patch = LocationPatch::try_from(dto).map_err(with_request)?;

    locations
        .update(id, patch)
        .await
        .map(|updated| location_hateoas(updated, base_url).json())
        .map_err(|why| with_request(why.into()))
}

async fn delete_location<D: Database>(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { locations }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Location>> {
    let id = parse_id(&id, &Method::DELETE, original_uri.path())?;
    locations
        .remove(id)
        .await
        .map(|removed| {
            hateoas::Response::builder(removed, base_url)
                .link("locations", resource!(""))
                .build()
                .json()
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}

fn parse_id(raw: &str, method: &Method, uri: &str) -> RouteResult<Id<Location>> {
    raw.parse().map_err(|_| {
        RouteErrorResponse::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_message("Invalid ID")
    })
}

pub(crate) fn location_hateoas(
    location: WithId<Location>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Location>> {
    let id = location.id;
    let parent = location.content.parent_id;
    hateoas::Response::builder(location, base_url)
        .link("self", resource!("/{}", id))
        .link_option("parent", parent.map(|parent| resource!("/{}", parent)))
        .link("tree", resource!("/tree"))
        .build()
}

pub(crate) fn location_with_relations_hateoas(
    location: LocationWithRelations,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<LocationWithRelations> {
    let id = location.location.id;
    let parent = location.parent.as_ref().map(|parent| parent.id);
    let children = location
        .children
        .iter()
        .map(|child| resource!("/{}", child.id))
        .collect::<Vec<_>>();

    let mut builder = hateoas::Response::builder(location, base_url)
        .link("self", resource!("/{}", id))
        .link_option("parent", parent.map(|parent| resource!("/{}", parent)));
    for child in children {
        builder = builder.link("children", child);
    }
    builder.link("tree", resource!("/tree")).build()
}
