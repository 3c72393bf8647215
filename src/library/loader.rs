//! Lazy library loader with caching and request de-duplication.
//!
//! Each library is fetched at most once per cache generation. Concurrent
//! requests for the same id share one pending load; the fetch runs in its
//! own task so it completes even if every caller goes away.
//!
//! Failures never reach the caller: a library that cannot be fetched or
//! parsed is logged and reported as `None`, and is not cached, so the next
//! request retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::content::{parse_library, ContentSource, ParseError, ParsedLibrary};
use super::manifest::{AssetDescriptor, LibraryId, Manifest};
use crate::adapters::{AssetProvider, DirectoryProvider, FetchError, Fetcher, HttpFetcher};
use crate::config::ResolvedConfig;

/// Why a library could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

type PendingLoad = Shared<BoxFuture<'static, Option<Arc<ParsedLibrary>>>>;

/// Process-scoped loader state. Reset only by [`LibraryLoader::clear_cache`].
#[derive(Default)]
struct LoaderState {
    /// Memoized descriptors derived from the manifest
    descriptors: Option<Arc<[AssetDescriptor]>>,

    /// Successfully parsed libraries
    cache: HashMap<LibraryId, Arc<ParsedLibrary>>,

    /// Loads that have started but not settled
    in_flight: HashMap<LibraryId, PendingLoad>,

    /// Bumped on every clear; loads from an older generation don't write back
    generation: u64,
}

/// Loads library content on demand and keeps it for the loader's lifetime
#[derive(Clone)]
pub struct LibraryLoader {
    manifest: Arc<Manifest>,
    base_url: String,
    asset_prefix: String,
    fetcher: Arc<dyn Fetcher>,
    provider: Option<Arc<dyn AssetProvider>>,
    state: Arc<Mutex<LoaderState>>,
}

impl LibraryLoader {
    /// Create a loader over `manifest` that fetches through `fetcher`
    pub fn new(manifest: Manifest, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            manifest: Arc::new(manifest),
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            asset_prefix: crate::config::DEFAULT_ASSET_PREFIX.to_string(),
            fetcher,
            provider: None,
            state: Arc::new(Mutex::new(LoaderState::default())),
        }
    }

    /// Build a loader from resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let manifest = match &config.manifest {
            Some(path) => Manifest::load(path)?,
            None => Manifest::builtin(),
        };

        let fetcher = HttpFetcher::new(config.fetch_timeout)?;

        let mut loader = Self::new(manifest, Arc::new(fetcher))
            .with_base_url(&config.base_url)
            .with_asset_prefix(&config.asset_prefix);

        if let Some(dir) = &config.asset_dir {
            loader = loader.with_provider(Arc::new(DirectoryProvider::new(dir)));
        }

        Ok(loader)
    }

    /// Set the host library locators are resolved against
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the prefix bundled asset paths are resolved under
    pub fn with_asset_prefix(mut self, asset_prefix: impl Into<String>) -> Self {
        self.asset_prefix = asset_prefix.into();
        self
    }

    /// Consult `provider` before the network
    pub fn with_provider(mut self, provider: Arc<dyn AssetProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    fn state(&self) -> MutexGuard<'_, LoaderState> {
        lock(&self.state)
    }

    /// All descriptors, in manifest order
    pub fn list_descriptors(&self) -> Arc<[AssetDescriptor]> {
        let mut state = self.state();
        state
            .descriptors
            .get_or_insert_with(|| {
                self.manifest
                    .descriptors(&self.base_url, &self.asset_prefix)
                    .into()
            })
            .clone()
    }

    /// Find a descriptor by id
    pub fn descriptor(&self, id: &str) -> Option<AssetDescriptor> {
        self.list_descriptors()
            .iter()
            .find(|d| d.id.as_str() == id)
            .cloned()
    }

    /// Load a library, sharing any load already in flight for the same id
    pub async fn load(&self, descriptor: &AssetDescriptor) -> Option<Arc<ParsedLibrary>> {
        let pending = {
            let mut state = self.state();

            if let Some(cached) = state.cache.get(&descriptor.id) {
                debug!(library = %descriptor.id, "Library served from cache");
                return Some(cached.clone());
            }

            match state.in_flight.get(&descriptor.id) {
                Some(pending) => {
                    debug!(library = %descriptor.id, "Joining in-flight load");
                    pending.clone()
                }
                None => {
                    let pending = self.start_load(descriptor.clone(), state.generation);
                    state.in_flight.insert(descriptor.id.clone(), pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Load a library by id; unknown ids yield `None`
    pub async fn load_by_id(&self, id: &str) -> Option<Arc<ParsedLibrary>> {
        match self.descriptor(id) {
            Some(descriptor) => self.load(&descriptor).await,
            None => {
                warn!(library = id, "Unknown library id");
                None
            }
        }
    }

    /// Load every library concurrently; failures are left out, order is kept
    pub async fn load_all(&self) -> Vec<Arc<ParsedLibrary>> {
        let descriptors = self.list_descriptors();
        let results = join_all(descriptors.iter().map(|d| self.load(d))).await;

        let loaded: Vec<_> = results.into_iter().flatten().collect();
        info!(
            loaded = loaded.len(),
            total = descriptors.len(),
            "Loaded libraries"
        );
        loaded
    }

    /// Check the cache for a library
    pub fn is_loaded(&self, id: &LibraryId) -> bool {
        self.state().cache.contains_key(id)
    }

    /// Get a cached library
    pub fn get_loaded(&self, id: &LibraryId) -> Option<Arc<ParsedLibrary>> {
        self.state().cache.get(id).cloned()
    }

    /// Check whether a load for `id` has started and not yet settled
    pub fn is_in_flight(&self, id: &LibraryId) -> bool {
        self.state().in_flight.contains_key(id)
    }

    /// Drop the descriptor memo, the content cache, and in-flight markers
    pub fn clear_cache(&self) {
        let mut state = self.state();
        state.descriptors = None;
        state.cache.clear();
        state.in_flight.clear();
        state.generation += 1;
    }

    /// Spawn the fetch-and-parse task for `descriptor`.
    ///
    /// Must be called with the state lock held so the task cannot settle
    /// before its in-flight marker is registered.
    fn start_load(&self, descriptor: AssetDescriptor, generation: u64) -> PendingLoad {
        let fetcher = self.fetcher.clone();
        let provider = self.provider.clone();
        let state = self.state.clone();
        let settle_state = self.state.clone();
        let id = descriptor.id.clone();

        let task = tokio::spawn(async move {
            let library = match fetch_and_parse(provider.as_deref(), fetcher.as_ref(), &descriptor).await {
                Ok(library) => {
                    info!(
                        library = %descriptor.id,
                        items = library.len(),
                        source = %library.source,
                        "Library loaded"
                    );
                    Some(Arc::new(library))
                }
                Err(e) => {
                    warn!(library = %descriptor.id, error = %e, "Library unavailable");
                    None
                }
            };

            let mut state = lock(&state);
            if state.generation == generation {
                if let Some(library) = &library {
                    state.cache.insert(descriptor.id.clone(), library.clone());
                }
                state.in_flight.remove(&descriptor.id);
            }

            library
        });

        // A panicking task never reaches its own cleanup, so the marker is
        // dropped here instead; nothing is cached and the next load retries.
        task.map(move |joined| match joined {
            Ok(library) => library,
            Err(e) => {
                warn!(library = %id, error = %e, "Library load task failed");
                let mut state = lock(&settle_state);
                if state.generation == generation {
                    state.in_flight.remove(&id);
                }
                None
            }
        })
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<LoaderState>) -> MutexGuard<'_, LoaderState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Read the payload (provider first, then network) and parse it
async fn fetch_and_parse(
    provider: Option<&dyn AssetProvider>,
    fetcher: &dyn Fetcher,
    descriptor: &AssetDescriptor,
) -> Result<ParsedLibrary, LoadError> {
    if let Some(provider) = provider {
        match provider.load_library_asset(&descriptor.asset_path).await {
            Ok(Some(content)) if !content.trim().is_empty() => {
                return Ok(parse_library(descriptor, &content, ContentSource::Provider)?);
            }
            Ok(_) => {
                debug!(library = %descriptor.id, provider = provider.name(), "Asset not bundled");
            }
            Err(e) => {
                warn!(
                    library = %descriptor.id,
                    provider = provider.name(),
                    error = %e,
                    "Asset provider failed, falling back to network"
                );
            }
        }
    }

    let payload = fetcher.fetch(&descriptor.locator).await?;
    Ok(parse_library(descriptor, &payload, ContentSource::Network)?)
}
