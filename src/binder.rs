//! # Binder
//!
//! [`Binder::bind`] populates a controller from a request:
//!
//! 1. If the controller declares a `request` field, it receives the request.
//! 2. For every other bindable field, in declaration order:
//!    - resolve the raw value (route → query → body → files, own name then snake-case name)
//!    - no value: keep the default if there is one, else assign null if nullable,
//!      else leave the field unset
//!    - a value: coerce it to the declared type and commit it
//!
//! A coercion failure stops binding and is returned to the caller. Fields
//! committed before the failure keep their new values.
//!
//! ```rust
//! use brrtbind::{request::route_params, BindRequest, Binder, Controller, Slot};
//! use http::Method;
//!
//! #[derive(Debug, Default, Controller)]
//! #[bind(rename_all = "camelCase")]
//! struct ShowPost {
//!     user_id: Slot<i64>,
//!     page: Option<u32>,
//! }
//!
//! let request = BindRequest::new(Method::GET, "/users/7/posts?page=2");
//! let route = route_params([("user_id", "7")]);
//! let post: ShowPost = Binder::default().bind_new(&request, &route).unwrap();
//! assert_eq!(post.user_id.get(), Some(&7));
//! assert_eq!(post.page, Some(2));
//! ```

use crate::coerce::TypeCoercer;
use crate::config::BinderConfig;
use crate::descriptor::{descriptor_for, Absent, Controller, ControllerDescriptor};
use crate::error::CoercionError;
use crate::request::{BindRequest, RouteParams};
use crate::resolver::PrecedenceResolver;
use crate::upload::FileValueNormalizer;
use crate::value::BoundValue;
use std::sync::Arc;
use tracing::{debug, trace};

/// Binds requests onto controllers.
///
/// Cheap to share: holds only configuration. One binder can serve every request.
#[derive(Debug, Clone)]
pub struct Binder {
    config: BinderConfig,
    normalizer: FileValueNormalizer,
    coercer: TypeCoercer,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new(BinderConfig::default())
    }
}

impl Binder {
    pub fn new(config: BinderConfig) -> Self {
        Self {
            normalizer: FileValueNormalizer::new(config.file_temp_key.clone()),
            coercer: TypeCoercer::new(config.naming_fallback)
                .with_descriptor_cache(config.descriptor_cache),
            config,
        }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    fn descriptor<C: Controller>(&self) -> Arc<ControllerDescriptor> {
        if self.config.descriptor_cache {
            descriptor_for::<C>()
        } else {
            Arc::new(C::describe())
        }
    }

    /// Bind `request` and `route` onto `controller` in place.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoercionError`]; earlier fields remain assigned.
    pub fn bind<C: Controller>(
        &self,
        controller: &mut C,
        request: &BindRequest,
        route: &RouteParams,
    ) -> Result<(), CoercionError> {
        let descriptor = self.descriptor::<C>();
        let request_id = request.request_id;

        if descriptor.injects_request() {
            controller.inject_request(request);
        }

        let resolver = PrecedenceResolver::new(route, request, &self.normalizer)
            .naming_fallback(self.config.naming_fallback);

        for field in descriptor.fields() {
            let Some(hit) = resolver.resolve(field.name()) else {
                match field.when_absent() {
                    Absent::KeepDefault => {
                        trace!(%request_id, field = field.name(), "No value, keeping default");
                    }
                    Absent::AssignNull => {
                        trace!(%request_id, field = field.name(), "No value, assigning null");
                        controller.assign(field.name(), BoundValue::Null)?;
                    }
                    Absent::LeaveUnset => {
                        trace!(%request_id, field = field.name(), "No value, leaving unset");
                    }
                }
                continue;
            };

            trace!(
                %request_id,
                field = field.name(),
                source = %hit.source,
                key = %hit.key,
                "Field resolved"
            );

            let value = self
                .coercer
                .coerce(field.name(), hit.value, field.ty(), field.is_nullable())
                .inspect_err(|err| {
                    debug!(
                        %request_id,
                        controller = descriptor.short_name(),
                        field = err.field(),
                        target = err.target(),
                        reason = err.reason(),
                        "Coercion failed"
                    );
                })?;
            controller.assign(field.name(), value)?;
        }

        debug!(
            %request_id,
            controller = descriptor.short_name(),
            fields = descriptor.fields().len(),
            "Controller bound"
        );
        Ok(())
    }

    /// Build a fresh controller with `C::default()` and bind it.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoercionError`] encountered.
    pub fn bind_new<C: Controller + Default>(
        &self,
        request: &BindRequest,
        route: &RouteParams,
    ) -> Result<C, CoercionError> {
        let mut controller = C::default();
        self.bind(&mut controller, request, route)?;
        Ok(controller)
    }
}

/// Bind with the default configuration.
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind<C: Controller>(
    controller: &mut C,
    request: &BindRequest,
    route: &RouteParams,
) -> Result<(), CoercionError> {
    Binder::default().bind(controller, request, route)
}
