//! Type → provider index

use crate::error::{Error, Result};
use crate::object::MonitoringObject;
use crate::provider::BoxedProvider;
use crate::resource::Identified;
use std::collections::HashMap;

/// Maps every object type to the index of the provider that owns it
///
/// Built once when the monitor is constructed and never changed afterward.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    by_type: HashMap<String, usize>,
    providers: usize,
}

impl ProviderRegistry {
    /// Index `providers` by their operating types
    ///
    /// Fails with `DuplicatedProvider` when two providers claim a type.
    pub fn build<O: MonitoringObject>(providers: &[BoxedProvider<O>]) -> Result<Self> {
        let mut by_type: HashMap<String, usize> = HashMap::new();

        for (index, provider) in providers.iter().enumerate() {
            for type_name in provider.operating_types() {
                if let Some(&first) = by_type.get(&type_name) {
                    return Err(Error::DuplicatedProvider {
                        type_name,
                        first: providers[first].name().to_string(),
                        second: provider.name().to_string(),
                    });
                }
                log::trace!("{type_name} -> {}", provider.name());
                by_type.insert(type_name, index);
            }
        }

        Ok(Self {
            by_type,
            providers: providers.len(),
        })
    }

    /// Index of the provider owning `type_name`
    pub fn provider_for(&self, type_name: &str) -> Option<usize> {
        self.by_type.get(type_name).copied()
    }

    /// Whether some provider owns `type_name`
    pub fn handles(&self, type_name: &str) -> bool {
        self.by_type.contains_key(type_name)
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers == 0
    }

    /// Bucket resources by owning provider, one bucket per provider
    ///
    /// Fails with `UnknownHandler` naming every resource no provider owns.
    pub fn partition<R: Identified>(&self, resources: Vec<R>) -> Result<Vec<Vec<R>>> {
        let mut buckets: Vec<Vec<R>> = (0..self.providers).map(|_| Vec::new()).collect();
        let mut unhandled = Vec::new();

        for resource in resources {
            match self.provider_for(resource.type_name()) {
                Some(index) => buckets[index].push(resource),
                None => unhandled.push(resource.local_id().clone()),
            }
        }

        if unhandled.is_empty() {
            Ok(buckets)
        } else {
            Err(Error::UnknownHandler {
                resources: unhandled,
            })
        }
    }
}
