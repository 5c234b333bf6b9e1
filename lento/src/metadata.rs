//! Sources of endpoint declarations.

use derive_more::Constructor;
use lento_di::ErrorPtr;
use lento_router::cache::SourceUnit;
use lento_router::descriptor::EndpointDescriptor;

#[cfg(test)]
use mockall::automock;

pub type MetadataProviderPtr = Box<dyn MetadataProvider + Send + Sync>;

/// Provides endpoint declarations of all controllers. Descriptors are only requested on cold boot,
/// while source units are always needed to check cache freshness.
#[cfg_attr(test, automock)]
pub trait MetadataProvider {
    /// Units whose modification times decide if cached routes are still usable.
    fn source_units(&self) -> Vec<SourceUnit>;

    fn descriptors(&self) -> Result<Vec<EndpointDescriptor>, ErrorPtr>;
}

/// Metadata declared up front in code.
#[derive(Constructor, Clone, Default, Debug)]
pub struct StaticMetadata {
    descriptors: Vec<EndpointDescriptor>,
    source_units: Vec<SourceUnit>,
}

impl MetadataProvider for StaticMetadata {
    fn source_units(&self) -> Vec<SourceUnit> {
        self.source_units.clone()
    }

    fn descriptors(&self) -> Result<Vec<EndpointDescriptor>, ErrorPtr> {
        Ok(self.descriptors.clone())
    }
}
