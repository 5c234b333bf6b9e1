//! Core application functionality. The [Application] boots the routing table, either from the route
//! cache (warm boot) or by compiling endpoint declarations (cold boot), bootstraps services and
//! runs the web server.

use crate::config::ApplicationConfig;
use crate::metadata::{MetadataProviderPtr, StaticMetadata};
use itertools::Itertools;
use lento_di::catalog::ServiceCatalog;
use lento_di::container::Container;
use lento_di::discovery::discover_services;
use lento_di::service::ServiceId;
use lento_di::{ContainerError, ErrorPtr};
use lento_router::cache::{
    CachedRoutes, FileSourceClock, RouteCache, SourceClockPtr, SourceUnit, DEFAULT_BUILD_ID,
};
use lento_router::compiler::RouteCompiler;
use lento_router::descriptor::PropertyInjection;
use lento_router::store::{FileStore, PersistentStorePtr};
use lento_router::{CacheError, CompileError};
use lento_web::asset::StaticAssets;
use lento_web::config::WebConfig;
use lento_web::controller::{is_contextual_type, ControllerRegistry};
use lento_web::dispatcher::Dispatcher;
use lento_web::dto::DtoRegistry;
use lento_web::formatter::{FormatterPtr, FormatterRegistry};
use lento_web::server::{serve, ServerError};
use lento_web::validation::ValidatorPtr;
use lento_web::view::TemplateRendererPtr;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use std::{env, fs};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error retrieving endpoint metadata: {0}")]
    MetadataError(#[source] ErrorPtr),
    #[error("Error compiling routes: {0}")]
    CompileError(#[from] CompileError),
    #[error("Error storing route cache: {0}")]
    CacheError(#[from] CacheError),
    #[error("Error bootstrapping services: {0}")]
    ContainerError(#[from] ContainerError),
    #[error("Error opening public directory {path}: {source}")]
    PublicDirectoryError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Server error: {0}")]
    ServerError(#[from] ServerError),
}

/// How the routing table was obtained.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum BootKind {
    /// Routes were loaded from a valid cache.
    Warm,
    /// Routes were compiled from endpoint declarations.
    Cold,
}

/// Main entrypoint for the application.
pub struct Application {
    dispatcher: Dispatcher,
    web_config: WebConfig,
    boot_kind: BootKind,
}

impl Application {
    pub fn builder(config: ApplicationConfig) -> ApplicationBuilder {
        ApplicationBuilder {
            config,
            web_config: WebConfig::default(),
            catalog: ServiceCatalog::default(),
            controllers: ControllerRegistry::default(),
            metadata: None,
            dtos: DtoRegistry::default(),
            validator: None,
            renderer: None,
            formatters: FormatterRegistry::default(),
            store: None,
            clock: None,
            build_id: None,
        }
    }

    #[inline]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[inline]
    pub fn web_config(&self) -> &WebConfig {
        &self.web_config
    }

    #[inline]
    pub fn boot_kind(&self) -> BootKind {
        self.boot_kind
    }

    /// Serves requests until the shutdown future completes.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ApplicationError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Running application...");

        serve(&self.web_config, self.dispatcher.clone(), shutdown)
            .await
            .map_err(ApplicationError::ServerError)
    }

    /// Serves requests until Ctrl+C is received.
    pub async fn run_until_interrupted(&self) -> Result<(), ApplicationError> {
        self.run(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "Cannot listen for interrupt signal.");
            }
        })
        .await
    }
}

pub struct ApplicationBuilder {
    config: ApplicationConfig,
    web_config: WebConfig,
    catalog: ServiceCatalog,
    controllers: ControllerRegistry,
    metadata: Option<MetadataProviderPtr>,
    dtos: DtoRegistry,
    validator: Option<ValidatorPtr>,
    renderer: Option<TemplateRendererPtr>,
    formatters: FormatterRegistry,
    store: Option<PersistentStorePtr>,
    clock: Option<SourceClockPtr>,
    build_id: Option<String>,
}

impl ApplicationBuilder {
    pub fn web_config(mut self, web_config: WebConfig) -> Self {
        self.web_config = web_config;
        self
    }

    pub fn catalog(mut self, catalog: ServiceCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn controllers(mut self, controllers: ControllerRegistry) -> Self {
        self.controllers = controllers;
        self
    }

    pub fn metadata(mut self, metadata: MetadataProviderPtr) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn dtos(mut self, dtos: DtoRegistry) -> Self {
        self.dtos = dtos;
        self
    }

    pub fn validator(mut self, validator: ValidatorPtr) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn renderer(mut self, renderer: TemplateRendererPtr) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Registers a custom formatter kind.
    pub fn formatter<K: Into<String>>(mut self, kind: K, formatter: FormatterPtr) -> Self {
        self.formatters.register(kind, formatter);
        self
    }

    /// Replaces the file-based cache storage.
    pub fn cache_store(mut self, store: PersistentStorePtr) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the file modification time based freshness clock.
    pub fn source_clock(mut self, clock: SourceClockPtr) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the id identifying current build in the route cache. Defaults to the framework
    /// version combined with the modification time of the running executable.
    pub fn cache_build_id<I: Into<String>>(mut self, build_id: I) -> Self {
        self.build_id = Some(build_id.into());
        self
    }

    pub fn build(mut self) -> Result<Application, ApplicationError> {
        if self.config.install_tracing_logger {
            install_tracing_logger();
        }

        let metadata = self
            .metadata
            .unwrap_or_else(|| Box::new(StaticMetadata::default()));
        let units = metadata.source_units();
        let controllers = self.controllers.ids();

        let cache = self.config.cache.enabled.then(|| {
            RouteCache::new(
                self.store.unwrap_or_else(|| {
                    Box::new(FileStore::new(self.config.cache.directory.clone()))
                }),
                self.clock.unwrap_or_else(|| Box::new(FileSourceClock)),
            )
            .with_build_id(self.build_id.unwrap_or_else(default_build_id))
        });

        let (routes, boot_kind) = match cache
            .as_ref()
            .and_then(|cache| load_cached_routes(cache, &controllers, &units))
        {
            Some(routes) => (routes, BootKind::Warm),
            None => {
                info!("Compiling routes...");

                let descriptors = metadata
                    .descriptors()
                    .map_err(ApplicationError::MetadataError)?;
                let table = RouteCompiler::new(self.config.allow_route_overriding)
                    .compile(&descriptors)?;

                let roots = descriptors
                    .iter()
                    .map(|descriptor| descriptor.controller.clone())
                    .unique()
                    .collect_vec();

                for descriptor in &descriptors {
                    let dependencies = injected_services(&descriptor.properties);
                    if !self
                        .catalog
                        .add_dependencies(&descriptor.controller, dependencies)
                    {
                        debug!(
                            controller = %descriptor.controller,
                            "Controller not present in catalog - not following its properties."
                        );
                    }
                }

                let services = discover_services(&roots, &self.catalog);

                if let Some(cache) = &cache {
                    cache.store(&table, &controllers, &units, &services)?;
                }

                (CachedRoutes { table, services }, BootKind::Cold)
            }
        };

        info!(
            ?boot_kind,
            routes = routes.table.len(),
            services = routes.services.len(),
            "Routes ready."
        );

        for route in routes.table.routes() {
            debug!(
                method = %route.method,
                path = %route.path,
                controller = %route.controller,
                action = %route.action,
                "Route."
            );
        }

        let container = Arc::new(Container::new(self.catalog));
        let created = container.bootstrap(&routes.services)?;
        info!(created, "Bootstrapped services.");

        let mut builder = Dispatcher::builder(routes.table, container, self.controllers)
            .dtos(self.dtos)
            .formatters(self.formatters);

        if let Some(validator) = self.validator {
            builder = builder.validator(validator);
        }

        if let Some(renderer) = self.renderer {
            builder = builder.renderer(renderer);
        }

        if let Some(directory) = &self.web_config.public_directory {
            let assets = StaticAssets::new(directory).map_err(|source| {
                ApplicationError::PublicDirectoryError {
                    path: directory.clone(),
                    source,
                }
            })?;
            builder = builder.assets(assets);
        }

        Ok(Application {
            dispatcher: builder.build(),
            web_config: self.web_config,
            boot_kind,
        })
    }
}

/// Container-resolved types of injected properties.
fn injected_services(properties: &[PropertyInjection]) -> Vec<ServiceId> {
    properties
        .iter()
        .map(|property| property.declared_type.clone())
        .filter(|declared_type| !is_contextual_type(declared_type))
        .collect()
}

fn default_build_id() -> String {
    let modified = env::current_exe()
        .and_then(fs::metadata)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.duration_since(SystemTime::UNIX_EPOCH).ok());

    match modified {
        Some(modified) => format!("{DEFAULT_BUILD_ID}-{}", modified.as_nanos()),
        None => DEFAULT_BUILD_ID.to_string(),
    }
}

fn load_cached_routes(
    cache: &RouteCache,
    controllers: &[ServiceId],
    units: &[SourceUnit],
) -> Option<CachedRoutes> {
    if !cache.is_valid(controllers, units) {
        return None;
    }

    match cache.load() {
        Ok(routes) => Some(routes),
        Err(error) => {
            warn!(%error, "Cannot load cached routes - recompiling.");
            None
        }
    }
}

fn install_tracing_logger() {
    let result = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        debug!("Tracing subscriber already installed.");
    }
}
