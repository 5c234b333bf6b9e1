//! Persistence of compiled route tables, keyed on the freshness of controller source units.
//!
//! A cache is valid only if both artifacts exist and were stored by the same build, the set of
//! declared controllers is not empty and equals the cached one, every declared controller has at
//! least one source unit and every source unit still has the recorded modification time. Any
//! failure while checking makes the cache invalid, which in turn means recompiling - a stale table
//! is never used.
//!
//! Cached [ServiceId]s are derived from type names, which are not guaranteed to be stable between
//! compiler versions. The build id recorded in the manifest guards against reading them back
//! with a different build.

use crate::error::CacheError;
use crate::store::PersistentStorePtr;
use crate::table::RouteTable;
use lento_di::service::ServiceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::time::SystemTime;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

/// Artifact holding the [CachedRoutes].
pub const ROUTES_ARTIFACT: &str = "routes.json";

/// Artifact holding the [FreshnessManifest].
pub const MANIFEST_ARTIFACT: &str = "meta.json";

/// Source unit declaring a controller, e.g. the file containing its endpoint metadata.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct SourceUnit {
    pub controller: ServiceId,
    pub id: String,
}

impl SourceUnit {
    pub fn new<I: Into<String>>(controller: ServiceId, id: I) -> Self {
        Self {
            controller,
            id: id.into(),
        }
    }
}

/// Source of modification times for source units.
#[cfg_attr(test, automock)]
pub trait SourceClock {
    /// Returns the last modification time, or [None] if the unit does not exist.
    fn modified(&self, unit: &str) -> Option<SystemTime>;
}

pub type SourceClockPtr = Box<dyn SourceClock + Send + Sync>;

/// Treats source unit ids as file paths.
#[derive(Clone, Copy, Default, Debug)]
pub struct FileSourceClock;

impl SourceClock for FileSourceClock {
    fn modified(&self, unit: &str) -> Option<SystemTime> {
        fs::metadata(unit)
            .and_then(|metadata| metadata.modified())
            .ok()
    }
}

/// Build id used when none is given explicitly.
pub const DEFAULT_BUILD_ID: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Default, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct FreshnessManifest {
    #[serde(default)]
    pub build_id: String,
    pub units: BTreeMap<String, SystemTime>,
    pub controllers: BTreeSet<ServiceId>,
}

impl FreshnessManifest {
    /// Records current modification times. Units without one are left out, so they invalidate the
    /// cache on next check.
    pub fn capture(
        build_id: &str,
        controllers: &[ServiceId],
        units: &[SourceUnit],
        clock: &dyn SourceClock,
    ) -> Self {
        Self {
            build_id: build_id.to_string(),
            units: units
                .iter()
                .filter_map(|unit| clock.modified(&unit.id).map(|time| (unit.id.clone(), time)))
                .collect(),
            controllers: declared_controllers(controllers, units),
        }
    }
}

/// Explicitly declared controllers along with the ones owning source units.
fn declared_controllers(controllers: &[ServiceId], units: &[SourceUnit]) -> BTreeSet<ServiceId> {
    controllers
        .iter()
        .cloned()
        .chain(units.iter().map(|unit| unit.controller.clone()))
        .collect()
}

/// Contents of the routes artifact: the table and every service discovered for it.
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct CachedRoutes {
    pub table: RouteTable,
    pub services: Vec<ServiceId>,
}

pub struct RouteCache {
    store: PersistentStorePtr,
    clock: SourceClockPtr,
    build_id: String,
}

impl RouteCache {
    pub fn new(store: PersistentStorePtr, clock: SourceClockPtr) -> Self {
        Self {
            store,
            clock,
            build_id: DEFAULT_BUILD_ID.to_string(),
        }
    }

    /// Sets the id of current build. Caches stored by other builds are invalid.
    pub fn with_build_id<I: Into<String>>(mut self, build_id: I) -> Self {
        self.build_id = build_id.into();
        self
    }

    /// Checks if cached routes can be used for given currently declared controllers and their
    /// source units.
    pub fn is_valid(&self, controllers: &[ServiceId], units: &[SourceUnit]) -> bool {
        match self.check(controllers, units) {
            Ok(()) => {
                debug!("Route cache is valid.");
                true
            }
            Err(error) => {
                info!(reason = %error, "Route cache is invalid.");
                false
            }
        }
    }

    fn check(&self, controllers: &[ServiceId], units: &[SourceUnit]) -> Result<(), CacheError> {
        let controllers = declared_controllers(controllers, units);
        if controllers.is_empty() {
            return Err(CacheError::NoControllers);
        }

        for artifact in [ROUTES_ARTIFACT, MANIFEST_ARTIFACT] {
            if !self.store.exists(artifact) {
                return Err(CacheError::MissingArtifact(artifact.to_string()));
            }
        }

        let manifest: FreshnessManifest =
            serde_json::from_slice(&self.store.read(MANIFEST_ARTIFACT)?)?;

        if manifest.build_id != self.build_id {
            return Err(CacheError::BuildChanged(manifest.build_id));
        }

        if controllers != manifest.controllers {
            return Err(CacheError::ControllersChanged);
        }

        if let Some(controller) = controllers
            .iter()
            .find(|controller| !units.iter().any(|unit| &unit.controller == *controller))
        {
            return Err(CacheError::MissingUnit(controller.clone()));
        }

        for unit in units {
            let modified = self
                .clock
                .modified(&unit.id)
                .ok_or_else(|| CacheError::MissingSource(unit.id.clone()))?;

            if manifest.units.get(&unit.id) != Some(&modified) {
                return Err(CacheError::StaleSource(unit.id.clone()));
            }
        }

        Ok(())
    }

    /// Persists the table with discovered services, along with a fresh manifest. The manifest is
    /// written last, so a partially stored cache is never valid for the new units.
    pub fn store(
        &self,
        table: &RouteTable,
        controllers: &[ServiceId],
        units: &[SourceUnit],
        services: &[ServiceId],
    ) -> Result<(), CacheError> {
        let routes = serde_json::to_vec(&CachedRoutesRef { table, services })?;
        let manifest = serde_json::to_vec(&FreshnessManifest::capture(
            &self.build_id,
            controllers,
            units,
            self.clock.as_ref(),
        ))?;

        self.store.write(ROUTES_ARTIFACT, &routes)?;
        self.store.write(MANIFEST_ARTIFACT, &manifest)?;

        info!(routes = table.len(), services = services.len(), "Stored route cache.");
        Ok(())
    }

    /// Loads cached routes without checking validity.
    pub fn load(&self) -> Result<CachedRoutes, CacheError> {
        if !self.store.exists(ROUTES_ARTIFACT) {
            return Err(CacheError::MissingArtifact(ROUTES_ARTIFACT.to_string()));
        }

        Ok(serde_json::from_slice(&self.store.read(ROUTES_ARTIFACT)?)?)
    }
}

#[derive(Serialize)]
struct CachedRoutesRef<'a> {
    table: &'a RouteTable,
    services: &'a [ServiceId],
}

#[cfg(test)]
mod tests {
    use crate::cache::{
        FreshnessManifest, MockSourceClock, RouteCache, SourceUnit, DEFAULT_BUILD_ID,
        MANIFEST_ARTIFACT, ROUTES_ARTIFACT,
    };
    use crate::store::MockPersistentStore;
    use lento_di::service::ServiceId;
    use mockall::predicate::eq;
    use std::time::{Duration, SystemTime};

    fn unit(controller: &str) -> SourceUnit {
        SourceUnit::new(ServiceId::new(controller), format!("src/{controller}.rs"))
    }

    fn controllers(names: &[&str]) -> Vec<ServiceId> {
        names.iter().map(|name| ServiceId::new(*name)).collect()
    }

    fn time(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(seconds)
    }

    fn clock_at(seconds: u64) -> MockSourceClock {
        let mut clock = MockSourceClock::new();
        clock
            .expect_modified()
            .returning(move |_| Some(time(seconds)));
        clock
    }

    fn capture(units: &[SourceUnit]) -> FreshnessManifest {
        FreshnessManifest::capture(DEFAULT_BUILD_ID, &[], units, &clock_at(10))
    }

    fn store_with_manifest(manifest: &FreshnessManifest) -> MockPersistentStore {
        let manifest = serde_json::to_vec(manifest).unwrap();
        let mut store = MockPersistentStore::new();
        store.expect_exists().return_const(true);
        store
            .expect_read()
            .with(eq(MANIFEST_ARTIFACT))
            .returning(move |_| Ok(manifest.clone()));
        store
    }

    #[test]
    fn should_capture_manifest() {
        let manifest = FreshnessManifest::capture(
            "build",
            &controllers(&["c"]),
            &[unit("a"), unit("b")],
            &clock_at(10),
        );

        assert_eq!(manifest.build_id, "build");
        assert_eq!(manifest.units.len(), 2);
        assert_eq!(manifest.units["src/a.rs"], time(10));
        assert_eq!(
            manifest.controllers.into_iter().collect::<Vec<_>>(),
            controllers(&["a", "b", "c"])
        );
    }

    #[test]
    fn should_be_invalid_without_artifacts() {
        let mut store = MockPersistentStore::new();
        store
            .expect_exists()
            .with(eq(ROUTES_ARTIFACT))
            .return_const(false);

        let cache = RouteCache::new(Box::new(store), Box::new(clock_at(10)));
        assert!(!cache.is_valid(&[], &[unit("a")]));
    }

    #[test]
    fn should_be_valid_with_unchanged_units() {
        let manifest = capture(&[unit("a")]);
        let cache = RouteCache::new(
            Box::new(store_with_manifest(&manifest)),
            Box::new(clock_at(10)),
        );

        assert!(cache.is_valid(&controllers(&["a"]), &[unit("a")]));
        assert!(cache.is_valid(&[], &[unit("a")]));
    }

    #[test]
    fn should_be_invalid_after_touching_unit() {
        let manifest = capture(&[unit("a")]);
        let cache = RouteCache::new(
            Box::new(store_with_manifest(&manifest)),
            Box::new(clock_at(11)),
        );

        assert!(!cache.is_valid(&[], &[unit("a")]));
    }

    #[test]
    fn should_be_invalid_after_adding_or_removing_controller() {
        let manifest = capture(&[unit("a"), unit("b")]);

        let cache = RouteCache::new(
            Box::new(store_with_manifest(&manifest)),
            Box::new(clock_at(10)),
        );
        assert!(!cache.is_valid(&[], &[unit("a")]));
        assert!(!cache.is_valid(&[], &[unit("a"), unit("b"), unit("c")]));
        assert!(cache.is_valid(&[], &[unit("b"), unit("a")]));
    }

    #[test]
    fn should_be_invalid_without_declared_controllers() {
        let cache = RouteCache::new(
            Box::new(store_with_manifest(&capture(&[]))),
            Box::new(clock_at(10)),
        );

        assert!(!cache.is_valid(&[], &[]));
    }

    #[test]
    fn should_be_invalid_with_controller_without_units() {
        let manifest = FreshnessManifest::capture(
            DEFAULT_BUILD_ID,
            &controllers(&["a", "b"]),
            &[unit("a")],
            &clock_at(10),
        );
        let cache = RouteCache::new(
            Box::new(store_with_manifest(&manifest)),
            Box::new(clock_at(10)),
        );

        assert!(!cache.is_valid(&controllers(&["a", "b"]), &[unit("a")]));
    }

    #[test]
    fn should_be_invalid_for_other_build() {
        let manifest = capture(&[unit("a")]);

        let cache = RouteCache::new(
            Box::new(store_with_manifest(&manifest)),
            Box::new(clock_at(10)),
        )
        .with_build_id("other");
        assert!(!cache.is_valid(&[], &[unit("a")]));

        let mut legacy = manifest;
        legacy.build_id.clear();
        let cache = RouteCache::new(
            Box::new(store_with_manifest(&legacy)),
            Box::new(clock_at(10)),
        );
        assert!(!cache.is_valid(&[], &[unit("a")]));
    }

    #[test]
    fn should_be_invalid_with_missing_source() {
        let manifest = capture(&[unit("a")]);
        let mut clock = MockSourceClock::new();
        clock.expect_modified().return_const(None);

        let cache = RouteCache::new(Box::new(store_with_manifest(&manifest)), Box::new(clock));
        assert!(!cache.is_valid(&[], &[unit("a")]));
    }

    #[test]
    fn should_be_invalid_with_corrupt_manifest() {
        let mut store = MockPersistentStore::new();
        store.expect_exists().return_const(true);
        store
            .expect_read()
            .returning(|_| Ok(b"{not json".to_vec()));

        let cache = RouteCache::new(Box::new(store), Box::new(clock_at(10)));
        assert!(!cache.is_valid(&[], &[unit("a")]));
    }

    #[test]
    fn should_write_manifest_after_routes() {
        let mut sequence = mockall::Sequence::new();
        let mut store = MockPersistentStore::new();
        store
            .expect_write()
            .with(eq(ROUTES_ARTIFACT), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        store
            .expect_write()
            .with(eq(MANIFEST_ARTIFACT), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));

        let cache = RouteCache::new(Box::new(store), Box::new(clock_at(10)));
        cache
            .store(
                &Default::default(),
                &controllers(&["a"]),
                &[unit("a")],
                &controllers(&["a"]),
            )
            .unwrap();
    }
}
