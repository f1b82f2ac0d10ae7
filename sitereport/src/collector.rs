//! Runs every enabled provider for a coordinate.

use crate::{
    cache::{CachingProvider, ResponseCache},
    provider::{ApiProvider, Provider, ProviderKind, ProviderResult, QueryOptions},
    SurveyError,
};
use envapi::Client;
use geo::Coord;
use log::{debug, warn};
use std::{collections::BTreeSet, sync::Arc, time::Instant};

/// Results for one coordinate, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub coord: Coord,
    pub results: Vec<(ProviderKind, ProviderResult)>,
}

pub struct Collector {
    providers: Vec<Box<dyn Provider>>,
}

impl Collector {
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn builder() -> CollectorBuilder {
        CollectorBuilder {
            client: None,
            kinds: BTreeSet::new(),
            options: QueryOptions::default(),
            cache: None,
        }
    }

    /// Kinds of the configured providers, in collection order.
    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.iter().map(|provider| provider.kind())
    }

    /// Calls every provider once for `coord`.
    ///
    /// Never fails as a whole: each provider's outcome, success or
    /// failure, is returned alongside its kind.
    pub fn collect(&self, coord: Coord) -> Collection {
        let now = Instant::now();
        let results = self
            .providers
            .iter()
            .map(|provider| {
                let kind = provider.kind();
                let result = provider.fetch(coord);
                if let Err(err) = &result {
                    warn!("{kind} unavailable; coord: {coord:?}, err: {err}");
                }
                (kind, result)
            })
            .collect();
        debug!(
            "collect; coord: {coord:?}, providers: {}, exec: {:?}",
            self.providers.len(),
            now.elapsed()
        );
        Collection { coord, results }
    }
}

pub struct CollectorBuilder {
    client: Option<Arc<Client>>,
    kinds: BTreeSet<ProviderKind>,
    options: QueryOptions,
    cache: Option<Arc<ResponseCache>>,
}

impl CollectorBuilder {
    pub fn client(mut self, client: Arc<Client>) -> Self {
        self.client = Some(client);
        self
    }

    /// Enables a provider. Enabling one twice has no effect.
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn providers<I: IntoIterator<Item = ProviderKind>>(mut self, kinds: I) -> Self {
        self.kinds.extend(kinds);
        self
    }

    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Memoize successful responses in `cache`.
    pub fn cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<Collector, SurveyError> {
        let Self {
            client,
            kinds,
            options,
            cache,
        } = self;
        let client = client.ok_or(SurveyError::Builder)?;
        let options = Arc::new(options);
        let providers = kinds
            .into_iter()
            .map(|kind| -> Box<dyn Provider> {
                let provider = ApiProvider::new(kind, client.clone(), options.clone());
                match &cache {
                    Some(cache) => Box::new(CachingProvider::new(provider, cache.clone())),
                    None => Box::new(provider),
                }
            })
            .collect();
        Ok(Collector::new(providers))
    }
}
