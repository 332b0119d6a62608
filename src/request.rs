//! Request-side inputs to the binder.
//!
//! The HTTP kernel and the router are upstream of binding: by the time a
//! controller is bound, the request has been reduced to three string-keyed maps
//! (query, body, files) and the router has produced [`RouteParams`]. The helpers
//! here build those maps from a raw query string and a parsed JSON body.

use http::Method;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Maximum inline route parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Route parameters produced by path matching.
///
/// Names use `Arc<str>` because the router hands out the same names for every
/// match of a route. Duplicate names are allowed; lookups take the last one.
pub type RouteParams = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Look up a route parameter by name.
///
/// Uses "last write wins" semantics: for `/org/{id}/user/{id}` the user id is returned.
#[inline]
#[must_use]
pub fn route_param<'a>(params: &'a RouteParams, name: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

/// Build [`RouteParams`] from name/value pairs.
pub fn route_params<I, K, V>(pairs: I) -> RouteParams
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into()))
        .collect()
}

/// Request identifier (ULID) carried into binder log events.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

/// The request as seen by the binder.
///
/// `query`, `body` and `files` are independent source maps. `files` holds raw
/// upload descriptors (single maps or arrays of maps) exactly as the multipart
/// layer produced them; they are normalized only when a field asks for them.
#[derive(Debug, Clone, PartialEq)]
pub struct BindRequest {
    /// Identifier used to correlate binder log events
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Query string parameters
    pub query: Map<String, Value>,
    /// Body fields
    pub body: Map<String, Value>,
    /// Uploaded file descriptors
    pub files: Map<String, Value>,
}

impl BindRequest {
    /// Create an empty request for `method` and `path`.
    ///
    /// If `path` carries a query string it is split off and parsed into `query`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let raw: String = path.into();
        let (path, query) = match raw.split_once('?') {
            Some((p, q)) => (p.to_string(), parse_query_string(q)),
            None => (raw, Map::new()),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path,
            query,
            body: Map::new(),
            files: Map::new(),
        }
    }

    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Replace the query map.
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    /// Parse a raw `a=1&b=2` query string into the query map.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query = parse_query_string(raw.trim_start_matches('?'));
        self
    }

    /// Set the body from a parsed JSON document.
    ///
    /// Object bodies contribute their members as fields. Any other JSON value is
    /// stored under the `body` key.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = match body {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("body".to_string(), other);
                map
            }
        };
        self
    }

    /// Replace the uploaded-files map.
    pub fn with_files(mut self, files: Map<String, Value>) -> Self {
        self.files = files;
        self
    }

    /// Add a single upload descriptor under `name`.
    pub fn with_file(mut self, name: impl Into<String>, descriptor: Value) -> Self {
        self.files.insert(name.into(), descriptor);
        self
    }

    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    #[inline]
    #[must_use]
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    #[inline]
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&Value> {
        self.files.get(name)
    }
}

/// Parse a query string into a source map.
///
/// Names and values are URL-decoded. Repeated plain keys keep the last value;
/// keys ending in `[]` accumulate into an array under the bare name
/// (`tag[]=a&tag[]=b` gives `tag: ["a", "b"]`).
pub fn parse_query_string(raw: &str) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
        if let Some(base) = k.strip_suffix("[]").map(str::to_string) {
            let entry = map
                .entry(base)
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(Value::String(v.into_owned())),
                other => *other = Value::Array(vec![Value::String(v.into_owned())]),
            }
        } else {
            map.insert(k.into_owned(), Value::String(v.into_owned()));
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_param_last_wins() {
        let params = route_params([("id", "1"), ("team", "x"), ("id", "2")]);
        assert_eq!(route_param(&params, "id"), Some("2"));
        assert_eq!(route_param(&params, "team"), Some("x"));
        assert_eq!(route_param(&params, "missing"), None);
    }

    #[test]
    fn test_parse_query_string() {
        let q = parse_query_string("x=1&y=hello%20world&x=3");
        assert_eq!(q.get("x"), Some(&json!("3")));
        assert_eq!(q.get("y"), Some(&json!("hello world")));
    }

    #[test]
    fn test_parse_query_string_arrays() {
        let q = parse_query_string("tag[]=a&tag[]=b&page=2");
        assert_eq!(q.get("tag"), Some(&json!(["a", "b"])));
        assert_eq!(q.get("page"), Some(&json!("2")));
    }

    #[test]
    fn test_new_splits_query() {
        let req = BindRequest::new(Method::GET, "/users?limit=10");
        assert_eq!(req.path, "/users");
        assert_eq!(req.query_param("limit"), Some(&json!("10")));
    }

    #[test]
    fn test_non_object_body_goes_under_body_key() {
        let req = BindRequest::new(Method::POST, "/items").with_body(json!([1, 2]));
        assert_eq!(req.body_field("body"), Some(&json!([1, 2])));

        let req = BindRequest::new(Method::POST, "/items").with_body(json!({"name": "x"}));
        assert_eq!(req.body_field("name"), Some(&json!("x")));
    }

    #[test]
    fn test_request_id_round_trip_from_str() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-ulid".parse::<RequestId>().is_err());
    }
}
