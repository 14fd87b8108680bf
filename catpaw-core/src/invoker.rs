//! Handler invocation.
//!
//! The [`Invoker`] turns a matched [`RequestContext`] into an HTTP response:
//!
//! 1. bad request entries collected while matching the path short-circuit
//!    into a 400 listing them,
//! 2. the declared parameters are resolved with the request bound
//!    overwrites, provides and fallbacks below,
//! 3. `OnRequest` hooks run, then the handler,
//! 4. a session touched by the handler is saved and its cookie attached,
//! 5. `OnResponse` hooks run and the response is rendered following the
//!    route `Produces` declarations and the request `Accept` header.
//!
//! Framework types injected per request: [`SessionHandle`], [`HttpRequest`],
//! [`Body`], [`Accepts`], [`Filter`], [`Page`] and [`RequestContext`].

use crate::body_parser::Body;
use crate::container::Container;
use crate::content_negotiation::{Accepts, MediaType, negotiate_media_type};
use crate::dependencies::{Argument, DependenciesOptions, Parameter, ParameterKind, resolve_dependencies};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::http::{HttpRequest, HttpResponse};
use crate::logging::{debug, error, warn};
use crate::page::Page;
use crate::request_context::RequestContext;
use crate::response::{Response, SuccessResponseModifier, bad_request};
use crate::route::Route;
use crate::session::SessionHandle;
use catpaw_session::{SESSION_COOKIE_NAME, SessionStore};
use std::sync::Arc;

/// Invokes route handlers with their resolved dependencies.
#[derive(Clone)]
pub struct Invoker {
    container: Container,
    session_store: Option<Arc<dyn SessionStore>>,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("container", &self.container)
            .field("sessions", &self.session_store.is_some())
            .finish()
    }
}

impl Invoker {
    pub fn new(container: Container) -> Self {
        Self {
            container,
            session_store: None,
        }
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Invoke the handler of `context`.
    ///
    /// Client errors raised while resolving parameters or by the handler are
    /// rendered as error responses; server errors are returned.
    pub async fn invoke(&self, context: RequestContext) -> Result<HttpResponse> {
        let accepts = Accepts::from_request(&context.request);

        if context.is_bad_request() {
            debug!(route = %context.key, entries = ?context.bad_request_entries, "Bad request");
            return bad_request(context.bad_request_entries.join("\n")).render();
        }

        let context = match &self.session_store {
            Some(store) => {
                let requested_id = context.request.cookie(SESSION_COOKIE_NAME);
                context.with_session(Arc::new(SessionHandle::new(store.clone(), requested_id)))
            }
            None => context,
        };
        let context = Arc::new(context);
        let route = context.route.clone();
        let request = context.request.clone();

        let options = self.dependencies_options(&context);
        let arguments = match resolve_dependencies(&route.parameters, &options).await {
            Ok(arguments) => arguments,
            Err(e) => return client_error(&context.key, e)?.render(Some(&accepts)),
        };

        for hook in &route.on_request {
            if let Err(e) = hook.on_request(&request).await {
                error!(route = %context.key, error = %e, "Request hook failed");
                break;
            }
        }

        let mut response = match (route.handler)(arguments).await {
            Ok(response) => response,
            Err(e) => client_error(&context.key, e)?,
        };

        if let Some(session) = &context.session
            && let Some(cookie) = session.commit().await?
        {
            response = response.with_cookie(cookie);
        }

        for hook in &route.on_response {
            if let Err(e) = hook.on_response(&request, &mut response).await {
                error!(route = %context.key, error = %e, "Response hook failed");
                break;
            }
        }

        let response = match response {
            Response::Success(success) => Response::Success(apply_produces(&route, success, &accepts)),
            other => other,
        };
        response.render(Some(&accepts))
    }

    /// Request bound injection tables for `context`.
    pub fn dependencies_options(&self, context: &Arc<RequestContext>) -> DependenciesOptions {
        let request = context.request.clone();
        let mut options = DependenciesOptions::new(self.container.clone())
            .with_key(context.key.clone())
            .with_context(context.clone())
            .overwrite_with(request.clone())
            .overwrite_with(context.clone())
            .overwrite_with(Arc::new(Body::from_request(&request)))
            .overwrite_with(Arc::new(Accepts::from_request(&request)))
            .overwrite_with(Arc::new(Filter::from_request(&request)))
            .overwrite_with(Arc::new(Page::from_request(&request).with_request(&request)));

        if let Some(session) = &context.session {
            options = options.overwrite_with(session.clone());
        }

        for kind in [
            ParameterKind::Bool,
            ParameterKind::Int,
            ParameterKind::Float,
            ParameterKind::String,
        ] {
            let provide = context.clone();
            let fallback = context.clone();
            options = options
                .provide(kind, move |parameter| path_parameter(&provide, parameter))
                .fallback(kind, move |parameter| path_parameter(&fallback, parameter));
        }

        options
    }
}

/// Value of the path parameter named like `parameter`, converted to its kind.
fn path_parameter(context: &RequestContext, parameter: &Parameter) -> Result<Argument> {
    let Some(raw) = context.path_parameter(&parameter.name) else {
        return Ok(Argument::Null);
    };
    crate::attributes::path_value(raw, parameter)
}

/// Client errors become responses, server errors propagate.
fn client_error(key: &str, error: Error) -> Result<Response> {
    if error.status_code() < 500 {
        warn!(route = %key, error = %error, "Request rejected");
        Ok(Response::from(error))
    } else {
        Err(error)
    }
}

/// Content type and structure declared by the route `Produces` entries.
fn apply_produces(route: &Route, success: SuccessResponseModifier, accepts: &Accepts) -> SuccessResponseModifier {
    if route.produces.is_empty() {
        return success;
    }

    let mut success = success;
    if success.content_type().is_none() {
        let candidates: Vec<MediaType> = route
            .produces
            .iter()
            .filter(|produces| produces.status == success.status() || produces.status == 200)
            .flat_map(|produces| produces.content_types.iter())
            .filter_map(|content_type| MediaType::parse(content_type))
            .collect();
        if let Some(media_type) = negotiate_media_type(accepts, &candidates).or(candidates.first()) {
            success = success.as_type(media_type.mime_type());
        }
    }

    let structured_type = success
        .content_type()
        .map(|content_type| content_type.contains("json") || content_type.contains("xml"))
        .unwrap_or(false);
    if structured_type && route.is_structured() && !success.is_structured() {
        success = success.item();
    }
    success
}
