//! Per-request lifecycle: static assets, route matching, controller resolution, property
//! injection, argument binding, invocation and response formatting.
//!
//! Routing and validation failures are turned into `404` and `400` responses. Everything else
//! escaping a handler is returned as a [DispatchError], for the transport layer to handle.

use crate::argument::{Argument, Arguments, Scalar};
use crate::asset::StaticAssets;
use crate::controller::{Controller, ControllerRegistry, Injected};
use crate::dto::DtoRegistry;
use crate::formatter::{FormatError, FormatterRegistry};
use crate::http::{Request, Response, ResponseHandle};
use crate::validation::{ConstraintValidator, ValidationErrors, ValidatorPtr};
use crate::view::TemplateRendererPtr;
use lento_di::container::Container;
use lento_di::service::ServiceId;
use lento_di::{ContainerError, ErrorPtr};
use lento_router::plan::{ParameterBinding, RoutePlan};
use lento_router::table::RouteTable;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Error resolving controller: {0}")]
    Container(#[from] ContainerError),
    #[error("Service is not a registered controller: {0}")]
    UnknownController(ServiceId),
    #[error("Unknown DTO type: {0}")]
    UnknownDto(String),
    #[error("Error reading static asset: {0}")]
    Asset(#[source] std::io::Error),
    #[error("Error in {controller}::{action}: {source}")]
    Handler {
        controller: ServiceId,
        action: String,
        #[source]
        source: ErrorPtr,
    },
    #[error("Error formatting response: {0}")]
    Format(#[from] FormatError),
}

struct DispatcherInner {
    table: RouteTable,
    container: Arc<Container>,
    controllers: ControllerRegistry,
    assets: Option<StaticAssets>,
    validator: ValidatorPtr,
    dtos: DtoRegistry,
    formatters: FormatterRegistry,
}

/// Request dispatcher. Cheap to clone, and injectable into controllers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    pub fn builder(
        table: RouteTable,
        container: Arc<Container>,
        controllers: ControllerRegistry,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            table,
            container,
            controllers,
            assets: None,
            validator: None,
            dtos: DtoRegistry::default(),
            formatters: FormatterRegistry::default(),
        }
    }

    #[inline]
    pub fn table(&self) -> &RouteTable {
        &self.inner.table
    }

    #[inline]
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    pub async fn dispatch(&self, request: Request) -> Result<Response, DispatchError> {
        if let Some(assets) = &self.inner.assets {
            if let Some(file) = assets.resolve(request.path()) {
                debug!(path = %request.path(), file = %file.display(), "Serving static asset.");
                return assets.serve(&file).map_err(DispatchError::Asset);
            }
        }

        let Some(matched) = self
            .inner
            .table
            .match_route(request.method(), request.path())
        else {
            debug!(method = %request.method(), path = %request.path(), "No route found.");
            return Ok(Response::not_found());
        };

        let plan = matched.plan;
        debug!(
            method = %plan.method,
            path = %plan.path,
            controller = %plan.controller,
            action = %plan.action,
            "Matched route."
        );

        let instance = self.inner.container.get(&plan.controller)?;
        let mut controller = self
            .inner
            .controllers
            .fork(&plan.controller, &instance)
            .ok_or_else(|| DispatchError::UnknownController(plan.controller.clone()))?;

        let response = ResponseHandle::default();
        self.inject_properties(controller.as_mut(), plan, &request, &response);

        let arguments = match self.bind_arguments(plan, &matched.params, &request, &response)? {
            Ok(arguments) => arguments,
            Err(errors) => {
                debug!(?errors, "Validation failed.");
                return Ok(Response::validation_failed(&errors));
            }
        };

        let reply = controller
            .invoke(&plan.action, arguments)
            .await
            .map_err(|source| DispatchError::Handler {
                controller: plan.controller.clone(),
                action: plan.action.clone(),
                source,
            })?;

        let formatted = self
            .inner
            .formatters
            .format(reply, &plan.formatter, &request)?;

        let head = response.head();
        let mut result = Response::new(head.status, formatted.content_type, formatted.body);
        result.headers.extend(formatted.headers);

        // headers set by the handler win
        for name in head.headers.keys() {
            result.headers.remove(name);
        }
        for (name, value) in head.headers.iter() {
            result.headers.append(name.clone(), value.clone());
        }

        Ok(result)
    }

    fn inject_properties(
        &self,
        controller: &mut dyn Controller,
        plan: &RoutePlan,
        request: &Request,
        response: &ResponseHandle,
    ) {
        for property in &plan.properties {
            let declared = &property.declared_type;
            let injected = if *declared == ServiceId::of::<Request>() {
                Injected::Request(request.clone())
            } else if *declared == ServiceId::of::<ResponseHandle>() {
                Injected::Response(response.clone())
            } else if *declared == ServiceId::of::<Dispatcher>() {
                Injected::Dispatcher(self.clone())
            } else {
                match self.inner.container.get(declared) {
                    Ok(instance) => Injected::Service(instance),
                    Err(error) => {
                        warn!(
                            field = %property.field,
                            %error,
                            "Cannot resolve property - leaving unset."
                        );
                        continue;
                    }
                }
            };

            if !controller.wire(&property.field, injected) {
                warn!(
                    field = %property.field,
                    declared_type = %declared,
                    "Controller did not accept injected property."
                );
            }
        }
    }

    fn bind_arguments(
        &self,
        plan: &RoutePlan,
        params: &[(String, String)],
        request: &Request,
        response: &ResponseHandle,
    ) -> Result<Result<Arguments, ValidationErrors>, DispatchError> {
        let route_param = |name: &str| {
            params
                .iter()
                .find(|(param, _)| param == name)
                .map(|(_, value)| value.as_str())
        };

        let mut arguments = Vec::with_capacity(plan.arguments.len());
        for binding in &plan.arguments {
            let argument = match binding {
                ParameterBinding::Request => Argument::Request(request.clone()),
                ParameterBinding::Response => Argument::Response(response.clone()),
                ParameterBinding::RouteParam { name } => {
                    Argument::Text(route_param(name).map(str::to_string))
                }
                ParameterBinding::QueryParam { name } => {
                    Argument::Text(request.query(name).map(str::to_string))
                }
                ParameterBinding::Scalar { name, primitive } => Argument::Scalar(Scalar::coerce(
                    route_param(name).or_else(|| request.query(name)),
                    *primitive,
                )),
                ParameterBinding::Body { dto, validate } => {
                    let decoded = self
                        .inner
                        .dtos
                        .decode(dto, request.body())
                        .ok_or_else(|| DispatchError::UnknownDto(dto.clone()))?;

                    let dto = match decoded {
                        Ok(dto) => dto,
                        Err(error) => {
                            return Ok(Err([("body".to_string(), error.to_string())]
                                .into_iter()
                                .collect()))
                        }
                    };

                    if *validate {
                        let errors = self.inner.validator.validate(&*dto);
                        if !errors.is_empty() {
                            return Ok(Err(errors));
                        }
                    }

                    Argument::Body(dto)
                }
                ParameterBinding::Unbound => Argument::Null,
            };

            arguments.push(argument);
        }

        Ok(Ok(Arguments::new(arguments)))
    }
}

pub struct DispatcherBuilder {
    table: RouteTable,
    container: Arc<Container>,
    controllers: ControllerRegistry,
    assets: Option<StaticAssets>,
    validator: Option<ValidatorPtr>,
    dtos: DtoRegistry,
    formatters: FormatterRegistry,
}

impl DispatcherBuilder {
    pub fn assets(mut self, assets: StaticAssets) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Replaces the default [ConstraintValidator].
    pub fn validator(mut self, validator: ValidatorPtr) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn renderer(mut self, renderer: TemplateRendererPtr) -> Self {
        self.formatters.set_renderer(renderer);
        self
    }

    pub fn dtos(mut self, dtos: DtoRegistry) -> Self {
        self.dtos = dtos;
        self
    }

    /// Replaces formatters, keeping a previously set renderer if the new registry has none.
    pub fn formatters(mut self, mut formatters: FormatterRegistry) -> Self {
        if formatters.renderer().is_none() {
            if let Some(renderer) = self.formatters.renderer() {
                formatters.set_renderer(renderer.clone());
            }
        }

        self.formatters = formatters;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                table: self.table,
                container: self.container,
                controllers: self.controllers,
                assets: self.assets,
                validator: self
                    .validator
                    .unwrap_or_else(|| Arc::new(ConstraintValidator::default())),
                dtos: self.dtos,
                formatters: self.formatters,
            }),
        }
    }
}
