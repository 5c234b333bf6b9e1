//! Boot-time discovery of every service reachable from a set of root services (typically the
//! declared controllers).
//!
//! Discovery is a breadth-first traversal over [ServiceDefinition](crate::catalog::ServiceDefinition)
//! dependencies. Each type is visited at most once, so dependency cycles terminate: both sides of
//! a cycle are simply discovered once and resolved independently later.

use crate::catalog::ServiceCatalog;
use crate::service::ServiceId;
use fxhash::FxHashSet;
use std::collections::VecDeque;
use tracing::debug;

/// Returns the roots followed by all transitively reachable dependencies, in discovery order.
/// Dependencies unknown to the catalog are skipped.
pub fn discover_services(roots: &[ServiceId], catalog: &ServiceCatalog) -> Vec<ServiceId> {
    let mut discovered = Vec::with_capacity(roots.len());
    let mut seen = FxHashSet::default();

    for root in roots {
        if seen.insert(root.clone()) {
            discovered.push(root.clone());
        }
    }

    let mut queue: VecDeque<ServiceId> = discovered.iter().cloned().collect();
    let mut visited = FxHashSet::default();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }

        let Some(definition) = catalog.definition(&id) else {
            debug!(service = %id, "Service not present in catalog - not following dependencies.");
            continue;
        };

        for dependency in &definition.dependencies {
            if !catalog.is_registered(dependency) {
                debug!(service = %id, %dependency, "Skipping unknown dependency.");
                continue;
            }

            if seen.insert(dependency.clone()) {
                discovered.push(dependency.clone());
                queue.push_back(dependency.clone());
            }
        }
    }

    discovered
}
