//! # Precedence Resolution
//!
//! A field's raw value comes from exactly one source and one naming form. The
//! sources are probed in a fixed order, and within each source the field's own
//! name is tried before its snake-case form:
//!
//! 1. route `name`, route `alt(name)`
//! 2. query `name`, query `alt(name)`
//! 3. body `name`, body `alt(name)`
//! 4. files `name`, files `alt(name)` (normalized on hit)
//!
//! The first hit wins; values are never merged across sources.

use crate::naming::alt_form;
use crate::request::{route_param, BindRequest, RouteParams};
use crate::upload::FileValueNormalizer;
use crate::value::RawValue;
use serde_json::{Map, Value};
use std::fmt;

/// Which request source a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Route,
    Query,
    Body,
    Files,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Route => write!(f, "route"),
            SourceKind::Query => write!(f, "query"),
            SourceKind::Body => write!(f, "body"),
            SourceKind::Files => write!(f, "files"),
        }
    }
}

/// A named source of raw values.
pub trait ValueSource {
    fn kind(&self) -> SourceKind;

    fn get(&self, name: &str) -> Option<RawValue>;
}

/// Route parameters; values are always strings.
pub struct RouteSource<'a> {
    params: &'a RouteParams,
}

impl<'a> RouteSource<'a> {
    pub fn new(params: &'a RouteParams) -> Self {
        Self { params }
    }
}

impl ValueSource for RouteSource<'_> {
    fn kind(&self) -> SourceKind {
        SourceKind::Route
    }

    fn get(&self, name: &str) -> Option<RawValue> {
        route_param(self.params, name).map(|v| RawValue::Json(Value::String(v.to_string())))
    }
}

/// A JSON map source (query or body).
pub struct MapSource<'a> {
    kind: SourceKind,
    map: &'a Map<String, Value>,
}

impl<'a> MapSource<'a> {
    pub fn new(kind: SourceKind, map: &'a Map<String, Value>) -> Self {
        Self { kind, map }
    }
}

impl ValueSource for MapSource<'_> {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn get(&self, name: &str) -> Option<RawValue> {
        self.map.get(name).cloned().map(RawValue::Json)
    }
}

/// Uploaded files; hits are normalized before they are returned.
pub struct FileSource<'a> {
    files: &'a Map<String, Value>,
    normalizer: &'a FileValueNormalizer,
}

impl<'a> FileSource<'a> {
    pub fn new(files: &'a Map<String, Value>, normalizer: &'a FileValueNormalizer) -> Self {
        Self { files, normalizer }
    }
}

impl ValueSource for FileSource<'_> {
    fn kind(&self) -> SourceKind {
        SourceKind::Files
    }

    fn get(&self, name: &str) -> Option<RawValue> {
        self.files
            .get(name)
            .map(|raw| RawValue::from(self.normalizer.normalize(raw)))
    }
}

/// Where and under which key a field's value was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub source: SourceKind,
    pub key: String,
    pub value: RawValue,
}

/// Ordered list of value sources with naming-convention fallback.
pub struct PrecedenceResolver<'a> {
    sources: Vec<Box<dyn ValueSource + 'a>>,
    naming_fallback: bool,
}

impl<'a> PrecedenceResolver<'a> {
    /// The standard route → query → body → files chain.
    pub fn new(
        route: &'a RouteParams,
        request: &'a BindRequest,
        normalizer: &'a FileValueNormalizer,
    ) -> Self {
        Self::with_sources(vec![
            Box::new(RouteSource::new(route)),
            Box::new(MapSource::new(SourceKind::Query, &request.query)),
            Box::new(MapSource::new(SourceKind::Body, &request.body)),
            Box::new(FileSource::new(&request.files, normalizer)),
        ])
    }

    /// A resolver over an explicit, ordered list of sources.
    pub fn with_sources(sources: Vec<Box<dyn ValueSource + 'a>>) -> Self {
        Self {
            sources,
            naming_fallback: true,
        }
    }

    /// Disable probing the snake-case form of field names.
    pub fn naming_fallback(mut self, enabled: bool) -> Self {
        self.naming_fallback = enabled;
        self
    }

    /// Find the raw value for `name`, or `None` if no source has it.
    pub fn resolve(&self, name: &str) -> Option<Resolved> {
        let alt = alt_form(name);
        let probe_alt = self.naming_fallback && alt != name;

        for source in &self.sources {
            if let Some(value) = source.get(name) {
                return Some(Resolved {
                    source: source.kind(),
                    key: name.to_string(),
                    value,
                });
            }
            if probe_alt {
                if let Some(value) = source.get(&alt) {
                    return Some(Resolved {
                        source: source.kind(),
                        key: alt.to_string(),
                        value,
                    });
                }
            }
        }
        None
    }
}
