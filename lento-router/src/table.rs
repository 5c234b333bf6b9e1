//! Two-tier route table: exact static lookup, then first-match-wins dynamic scan.

use crate::method::HttpMethod;
use crate::plan::{Matcher, RoutePlan};
use fxhash::FxHashMap;
use itertools::Itertools;
use lento_di::service::ServiceId;
use serde::{Deserialize, Serialize};

/// Result of a successful match.
#[derive(Clone, Debug)]
pub struct RouteMatch<'a> {
    pub plan: &'a RoutePlan,
    /// Captured route parameters, in placeholder order. Empty for static routes.
    pub params: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Route listing entry.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RouteSummary {
    pub method: HttpMethod,
    pub path: String,
    pub controller: ServiceId,
    pub action: String,
}

impl From<&RoutePlan> for RouteSummary {
    fn from(plan: &RoutePlan) -> Self {
        Self {
            method: plan.method,
            path: plan.path.clone(),
            controller: plan.controller.clone(),
            action: plan.action.clone(),
        }
    }
}

#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct RouteTable {
    static_routes: FxHashMap<HttpMethod, FxHashMap<String, RoutePlan>>,
    dynamic_routes: FxHashMap<HttpMethod, Vec<RoutePlan>>,
}

impl RouteTable {
    /// Inserts a static plan, returning the one it replaced.
    pub fn insert_static(&mut self, plan: RoutePlan) -> Option<RoutePlan> {
        self.static_routes
            .entry(plan.method)
            .or_default()
            .insert(plan.path.clone(), plan)
    }

    /// Appends a dynamic plan after all previously pushed ones for its method.
    pub fn push_dynamic(&mut self, plan: RoutePlan) {
        self.dynamic_routes.entry(plan.method).or_default().push(plan);
    }

    pub fn static_plan(&self, method: HttpMethod, path: &str) -> Option<&RoutePlan> {
        self.static_routes
            .get(&method)
            .and_then(|routes| routes.get(path))
    }

    /// Matches a normalized path.
    pub fn match_route(&self, method: HttpMethod, path: &str) -> Option<RouteMatch<'_>> {
        if let Some(plan) = self.static_plan(method, path) {
            return Some(RouteMatch {
                plan,
                params: Vec::new(),
            });
        }

        self.dynamic_routes
            .get(&method)?
            .iter()
            .find_map(|plan| match &plan.matcher {
                Matcher::Pattern(pattern) => pattern
                    .matches(path)
                    .map(|params| RouteMatch { plan, params }),
                Matcher::Exact => None,
            })
    }

    /// All routes: static ones sorted by method and path, then dynamic ones in match order.
    pub fn routes(&self) -> Vec<RouteSummary> {
        let static_routes = self
            .static_routes
            .values()
            .flat_map(|routes| routes.values())
            .sorted_by(|a, b| (a.method, &a.path).cmp(&(b.method, &b.path)));

        let dynamic_routes = self
            .dynamic_routes
            .iter()
            .sorted_by_key(|(method, _)| **method)
            .flat_map(|(_, routes)| routes.iter());

        static_routes
            .chain(dynamic_routes)
            .map(RouteSummary::from)
            .collect()
    }

    /// Finds a route by its declared (not matched) path.
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<RouteSummary> {
        self.routes()
            .into_iter()
            .find(|route| route.method == method && route.path == path)
    }

    pub fn len(&self) -> usize {
        self.static_routes.values().map(|routes| routes.len()).sum::<usize>()
            + self.dynamic_routes.values().map(|routes| routes.len()).sum::<usize>()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
