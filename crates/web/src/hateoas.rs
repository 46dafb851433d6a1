use std::sync::Arc;

use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::middleware::base_url::BaseUrl;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    #[serde(rename = "rel")]
    pub relation: String,

    #[serde(rename = "href")]
    pub hypertext_reference: String,
}

/// A resource together with links to related resources.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    #[serde(flatten)]
    pub content: T,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<Link>,
}

impl<T> Response<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            links: vec![],
        }
    }

    pub fn builder(content: T, base_url: Arc<BaseUrl>) -> ResponseBuilder<T> {
        ResponseBuilder::new(content, base_url)
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

pub struct ResponseBuilder<T> {
    pub response: Response<T>,
    pub base_url: Arc<BaseUrl>,
}

impl<T> ResponseBuilder<T> {
    pub fn new(content: T, base_url: Arc<BaseUrl>) -> Self {
        Self {
            response: Response::new(content),
            base_url,
        }
    }

    /// Adds a link to a path on this server.
    pub fn link<R, H>(self, relation: R, hypertext_reference: H) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        let url = self.base_url.full_url(hypertext_reference);
        self.link_extern(relation, url)
    }

    pub fn link_option<R, H>(self, relation: R, hypertext_reference: Option<H>) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        match hypertext_reference {
            Some(path) => self.link(relation, path),
            None => self,
        }
    }

    pub fn link_extern<R, H>(mut self, relation: R, hypertext_reference: H) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        self.response.links.push(Link {
            relation: relation.into(),
            hypertext_reference: hypertext_reference.into(),
        });
        self
    }

    pub fn build(self) -> Response<T> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderMap;
    use serde_json::json;

    use super::Response;
    use crate::middleware::base_url::BaseUrl;

    #[test]
    fn links_are_absolute_and_content_is_flattened() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "registry.local".parse().unwrap());
        let base_url = Arc::new(BaseUrl::from_headers(&headers));

        let response = Response::builder(json!({ "id": 3 }), base_url)
            .link("self", "/api/v1/locations/3")
            .link_option("parent", None::<String>)
            .build();

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "id": 3,
                "links": [
                    { "rel": "self", "href": "http://registry.local/api/v1/locations/3" }
                ]
            })
        );
    }

    #[test]
    fn responses_without_links_omit_them() {
        let response = Response::new(json!({ "id": 3 }));
        assert_eq!(serde_json::to_value(response).unwrap(), json!({ "id": 3 }));
    }
}
