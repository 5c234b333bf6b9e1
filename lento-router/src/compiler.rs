//! Compilation of [EndpointDescriptor]s into a [RouteTable].

use crate::descriptor::EndpointDescriptor;
use crate::error::CompileError;
use crate::path::{is_dynamic, join_paths, RoutePattern};
use crate::plan::{Matcher, ParameterBinding, RoutePlan};
use crate::table::RouteTable;
use tracing::{debug, warn};

/// Turns descriptors into route plans. Duplicate static routes are rejected, unless overriding is
/// allowed, in which case the last declared route wins.
#[derive(Clone, Copy, Default, Debug)]
pub struct RouteCompiler {
    allow_route_overriding: bool,
}

impl RouteCompiler {
    pub fn new(allow_route_overriding: bool) -> Self {
        Self {
            allow_route_overriding,
        }
    }

    pub fn compile(&self, descriptors: &[EndpointDescriptor]) -> Result<RouteTable, CompileError> {
        let mut table = RouteTable::default();

        for descriptor in descriptors {
            let plan = Self::compile_plan(descriptor)?;
            if plan.is_dynamic() {
                debug!(method = %plan.method, path = %plan.path, "Compiled dynamic route.");
                table.push_dynamic(plan);
                continue;
            }

            if let Some(existing) = table.static_plan(plan.method, &plan.path) {
                if !self.allow_route_overriding {
                    return Err(CompileError::DuplicateRoute {
                        method: plan.method,
                        path: plan.path.clone(),
                        existing: format!("{}::{}", existing.controller, existing.action),
                        duplicate: format!("{}::{}", plan.controller, plan.action),
                    });
                }

                warn!(
                    method = %plan.method,
                    path = %plan.path,
                    previous = %existing.controller,
                    "Overriding static route."
                );
            }

            debug!(method = %plan.method, path = %plan.path, "Compiled static route.");
            table.insert_static(plan);
        }

        Ok(table)
    }

    /// Compiles a single descriptor into a plan.
    pub fn compile_plan(descriptor: &EndpointDescriptor) -> Result<RoutePlan, CompileError> {
        let path = join_paths(&descriptor.prefix, &descriptor.path);
        let malformed = |source| CompileError::MalformedTemplate {
            path: path.clone(),
            controller: descriptor.controller.clone(),
            action: descriptor.action.clone(),
            source,
        };

        let matcher = if is_dynamic(&path).map_err(malformed)? {
            Matcher::Pattern(RoutePattern::compile(&path).map_err(malformed)?)
        } else {
            Matcher::Exact
        };

        Ok(RoutePlan {
            method: descriptor.method,
            matcher,
            controller: descriptor.controller.clone(),
            action: descriptor.action.clone(),
            arguments: descriptor
                .parameters
                .iter()
                .map(ParameterBinding::derive)
                .collect(),
            properties: descriptor.properties.clone(),
            formatter: descriptor.formatter.clone(),
            throws: descriptor.throws.clone(),
            path,
        })
    }
}
