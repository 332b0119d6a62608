//! # brrtbind
//!
//! **brrtbind** binds an inbound HTTP request onto a strongly-typed controller
//! input struct. It is the seam between the untyped maps produced by the HTTP
//! layer (route parameters, query string, body, uploaded files) and the typed
//! fields application code works with.
//!
//! ## Architecture
//!
//! - **[`naming`]** - camel-case to snake-case alternate field names
//! - **[`request`]** - [`BindRequest`] source maps and [`RouteParams`]
//! - **[`upload`]** - normalization of raw upload descriptors into [`UploadedFile`]
//! - **[`resolver`]** - ordered value sources and the precedence policy
//! - **[`coerce`]** - conversion of raw values to declared field types
//! - **[`descriptor`]** - per-type field descriptors, the [`Controller`] trait, the descriptor cache
//! - **[`binder`]** - orchestration: resolve, apply default/null policy, coerce, commit
//! - **[`config`]** - YAML and environment configuration
//!
//! ### Binding Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller as HTTP layer
//!     participant Binder
//!     participant Cache as Descriptor cache
//!     participant Resolver as PrecedenceResolver
//!     participant Normalizer as FileValueNormalizer
//!     participant Coercer as TypeCoercer
//!     participant Ctrl as Controller
//!
//!     Caller->>Binder: bind(&mut ctrl, &request, &route)
//!     Binder->>Cache: descriptor_for::<C>()
//!     Cache-->>Binder: Arc<ControllerDescriptor>
//!     opt controller declares `request`
//!         Binder->>Ctrl: inject_request(&request)
//!     end
//!     loop each field
//!         Binder->>Resolver: resolve(name)
//!         Resolver->>Resolver: route, query, body (own name, then snake-case)
//!         Resolver->>Normalizer: files hit
//!         Normalizer-->>Resolver: Single / List / Unrecognized
//!         Resolver-->>Binder: Option<Resolved>
//!         alt no value
//!             Binder->>Ctrl: keep default / assign null / leave unset
//!         else value
//!             Binder->>Coercer: coerce(raw, type)
//!             Coercer-->>Binder: BoundValue or CoercionError
//!             Binder->>Ctrl: assign(name, value)
//!         end
//!     end
//!     Binder-->>Caller: Ok(()) or Err(CoercionError)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtbind::{request::route_params, BindRequest, Binder, Controller, Slot, UploadedFile};
//! use http::Method;
//! use serde_json::json;
//!
//! #[derive(Debug, Default, Controller)]
//! #[bind(rename_all = "camelCase")]
//! struct UpdateAvatar {
//!     user_id: Slot<i64>,
//!     avatar: Slot<UploadedFile>,
//!     #[bind(default)]
//!     notify: Option<bool>,
//! }
//!
//! let request = BindRequest::new(Method::POST, "/users/7/avatar")
//!     .with_file("avatar", json!({"tmp_name": "/tmp/php1", "name": "me.png", "size": 10, "error": 0}));
//! let route = route_params([("userId", "7")]);
//!
//! let input: UpdateAvatar = Binder::default().bind_new(&request, &route).unwrap();
//! assert_eq!(input.user_id.get(), Some(&7));
//! assert_eq!(input.avatar.get().map(|f| f.client_name()), Some("me.png"));
//! assert_eq!(input.notify, None);
//! ```
//!
//! ## Field Shapes
//!
//! | Field type  | Nullable | Default | No value from any source |
//! |-------------|----------|---------|--------------------------|
//! | `Slot<T>`   | no       | no      | stays `Slot::Unset`      |
//! | `Option<T>` | yes      | no      | set to `None`            |
//! | `T`         | no       | yes     | keeps its current value  |
//!
//! Add `#[bind(default)]` to a `Slot<T>` or `Option<T>` field to keep its current
//! value when no source provides one.
//!
//! ## Errors
//!
//! Only [`CoercionError`] is ever returned. It names the field path, the raw
//! value and the target type; [`CoercionError::to_problem_json`] renders it as
//! an RFC 7807 body for a 400 response.

extern crate self as brrtbind;

pub mod binder;
pub mod coerce;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod naming;
pub mod request;
pub mod resolver;
pub mod upload;
pub mod value;

pub use binder::{bind, Binder};
pub use brrtbind_macros::Controller;
pub use coerce::TypeCoercer;
pub use config::BinderConfig;
pub use descriptor::{
    descriptor_for, from_bound_object, Absent, BindValue, Controller, ControllerDescriptor,
    DescriptorRef, FieldDescriptor, FieldType, InjectRequest, Slot,
};
pub use error::CoercionError;
pub use request::{BindRequest, RequestId, RouteParams};
pub use resolver::{PrecedenceResolver, Resolved, SourceKind, ValueSource};
pub use upload::{FileValueNormalizer, NormalizedUpload, UploadError, UploadedFile};
pub use value::{BoundValue, RawValue};
