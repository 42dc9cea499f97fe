/// Completion aggregation.
///
/// The engine asks every registered provider at once, drops the ones that
/// declined, failed or panicked, merges the rest, removes structurally
/// equal duplicates and sorts by `(band, label)`.  The merged list is
/// incomplete as soon as one contributing provider says so.
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::completion::attributes::AttributeProvider;
use crate::completion::elements::ElementProvider;
use crate::completion::items::ItemProvider;
use crate::completion::packages::PackageProvider;
use crate::completion::properties::PropertyProvider;
use crate::completion::provider::CompletionProvider;
use crate::completion::targets::TargetProvider;
use crate::config::Config;
use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::reference::ReferenceData;
use crate::registry::PackageRegistry;
use crate::types::{CompletionSet, ProviderOutput};

/// The immutable provider registration set.
pub struct CompletionEngine {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl CompletionEngine {
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// The full provider set.  The package provider is only registered
    /// when a registry is given.
    pub fn standard(
        config: &Config,
        reference: Arc<ReferenceData>,
        registry: Option<Arc<dyn PackageRegistry>>,
    ) -> Self {
        let mut providers: Vec<Arc<dyn CompletionProvider>> = vec![
            Arc::new(PropertyProvider::new(
                Arc::clone(&reference),
                config.completion.clone(),
            )),
            Arc::new(ItemProvider::new(
                Arc::clone(&reference),
                config.completion.clone(),
            )),
            Arc::new(ElementProvider::new(Arc::clone(&reference))),
            Arc::new(AttributeProvider::new(reference)),
            Arc::new(TargetProvider::new()),
        ];
        if let Some(registry) = registry {
            providers.push(Arc::new(PackageProvider::new(
                registry,
                config.registry.page_size,
            )));
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Merge every provider's answer for `location`.
    ///
    /// Returns `None` when nothing applies or the request was cancelled.
    pub async fn complete_at(
        &self,
        location: &ResolvedLocation,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Option<CompletionSet> {
        let calls = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                let outcome = AssertUnwindSafe(provider.provide(location, document, cancel))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(output)) => output,
                    Ok(Err(err)) => {
                        warn!(provider = provider.name(), %err, "completion provider failed");
                        None
                    }
                    Err(_) => {
                        error!(provider = provider.name(), "completion provider panicked");
                        None
                    }
                }
            }
        });

        let outputs = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("completion request cancelled");
                return None;
            }
            outputs = join_all(calls) => outputs,
        };
        if cancel.is_cancelled() {
            return None;
        }
        merge(outputs.into_iter().flatten())
    }
}

/// Concatenate, de-duplicate and sort provider outputs.
pub fn merge(outputs: impl IntoIterator<Item = ProviderOutput>) -> Option<CompletionSet> {
    let mut is_incomplete = false;
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for output in outputs {
        is_incomplete |= output.is_incomplete;
        for item in output.items {
            if seen.insert(item.clone()) {
                items.push(item);
            }
        }
    }
    if items.is_empty() {
        return None;
    }
    // Stable: equal keys keep provider registration order.
    items.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
    Some(CompletionSet {
        items,
        is_incomplete,
    })
}
