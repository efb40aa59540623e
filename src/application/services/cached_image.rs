//! Image consumer that resolves addresses through the cache into display
//! handles.

use tokio::sync::watch;
use tracing::{debug, warn};

use super::display_handle::{DisplayHandle, HandleRegistry};
use super::image_fetch_service::ImageFetchService;
use crate::domain::entities::{PayloadSource, ResponsiveImage, ResponsiveVariant, srcset};
use crate::domain::errors::CacheError;

/// What a consumer wants displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRequest {
    /// Primary address.
    pub address: String,
    /// Low-quality address shown while loading.
    pub placeholder: Option<String>,
    /// Width variants for `srcset`.
    pub variants: Vec<ResponsiveVariant>,
    /// Layout hint for the variants.
    pub size_hints: Option<String>,
}

impl ImageRequest {
    /// Creates request for a single address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Sets placeholder address.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Sets width variants.
    #[must_use]
    pub fn with_variants(mut self, variants: Vec<ResponsiveVariant>) -> Self {
        self.variants = variants;
        self
    }

    /// Sets layout hint.
    #[must_use]
    pub fn with_size_hints(mut self, size_hints: impl Into<String>) -> Self {
        self.size_hints = Some(size_hints.into());
        self
    }

    /// Renders variants as a `srcset` value, if there are any.
    #[must_use]
    pub fn srcset(&self) -> Option<String> {
        (!self.variants.is_empty()).then(|| srcset(&self.variants))
    }
}

impl From<ResponsiveImage> for ImageRequest {
    fn from(image: ResponsiveImage) -> Self {
        Self {
            address: image.primary,
            placeholder: Some(image.placeholder),
            variants: image.variants,
            size_hints: Some(image.size_hints),
        }
    }
}

/// Sending half of an abort signal.
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    /// Creates controller in the not-aborted state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a signal observing this controller.
    #[must_use]
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Aborts every signal handed out by this controller.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half of an abort signal.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Returns true once aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when aborted. Pends forever if the controller is dropped first.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Observable state of a [`CachedImage`].
#[derive(Debug, Default)]
pub struct ImageState {
    /// Handle for the loaded payload.
    pub handle: Option<DisplayHandle>,
    /// Raw address used when the cached path failed.
    pub fallback: Option<String>,
    /// True while a load is in flight.
    pub is_loading: bool,
    /// Error from the last failed load.
    pub error: Option<CacheError>,
    /// Where the loaded payload came from.
    pub source: Option<PayloadSource>,
}

/// Marks a load in flight; clears the flag however the load ends,
/// including when the `load` future is dropped.
struct LoadingGuard<'a> {
    state: &'a mut ImageState,
}

impl<'a> LoadingGuard<'a> {
    fn begin(state: &'a mut ImageState) -> Self {
        state.is_loading = true;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.is_loading = false;
    }
}

/// Result of one [`CachedImage::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// A handle was created.
    Loaded(PayloadSource),
    /// Fetch failed; the raw address is displayed instead.
    FellBack,
    /// The signal fired before the fetch finished; nothing applied.
    Aborted,
    /// The request had no address.
    Empty,
}

/// Holds at most one display handle for the current request.
pub struct CachedImage {
    service: ImageFetchService,
    registry: HandleRegistry,
    request: Option<ImageRequest>,
    state: ImageState,
}

impl std::fmt::Debug for CachedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedImage")
            .field("request", &self.request)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CachedImage {
    /// Creates an idle consumer.
    #[must_use]
    pub fn new(service: ImageFetchService, registry: HandleRegistry) -> Self {
        Self {
            service,
            registry,
            request: None,
            state: ImageState::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ImageState {
        &self.state
    }

    /// Current request.
    #[must_use]
    pub const fn request(&self) -> Option<&ImageRequest> {
        self.request.as_ref()
    }

    /// What to display: the handle url, else the fallback address.
    #[must_use]
    pub fn src(&self) -> Option<&str> {
        self.state
            .handle
            .as_ref()
            .map(DisplayHandle::url)
            .or(self.state.fallback.as_deref())
    }

    /// Placeholder to show while loading.
    #[must_use]
    pub fn placeholder_src(&self) -> Option<&str> {
        if !self.state.is_loading {
            return None;
        }
        self.request.as_ref().and_then(|r| r.placeholder.as_deref())
    }

    /// Loads `request`, replacing whatever was displayed.
    ///
    /// The previous handle is released before fetching. The fetch runs in
    /// its own task, so an abort stops only this consumer from applying the
    /// result; the store write still completes.
    pub async fn load(&mut self, request: ImageRequest, abort: &AbortSignal) -> LoadStatus {
        self.state = ImageState::default();
        let address = request.address.clone();
        self.request = Some(request);

        if address.is_empty() {
            return LoadStatus::Empty;
        }

        let mut guard = LoadingGuard::begin(&mut self.state);

        let service = self.service.clone();
        let task_address = address.clone();
        let task = tokio::spawn(async move { service.fetch_with_cache(&task_address).await });

        let result = tokio::select! {
            biased;
            () = abort.aborted() => {
                debug!(address = %address, "Image load aborted");
                return LoadStatus::Aborted;
            }
            joined = task => joined
                .map_err(|e| CacheError::network(format!("Fetch task failed: {e}")))
                .and_then(|r| r),
        };

        match result {
            Ok(outcome) => {
                guard.state.handle = Some(self.registry.create(outcome.payload));
                guard.state.source = Some(outcome.source);
                LoadStatus::Loaded(outcome.source)
            }
            Err(e) => {
                warn!(address = %address, error = %e, "Falling back to uncached image");
                guard.state.error = Some(e);
                guard.state.fallback = Some(address);
                LoadStatus::FellBack
            }
        }
    }

    /// Releases the current handle and forgets the request.
    pub fn release(&mut self) {
        self.state = ImageState::default();
        self.request = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio::sync::Notify;

    use crate::domain::errors::CacheResult;
    use crate::domain::ports::NetworkFetcherPort;
    use crate::domain::ports::mocks::{InMemoryStore, MockNetworkFetcher};

    const A: &str = "https://res.cloudinary.com/demo/image/upload/w_640/a.png";
    const B: &str = "https://res.cloudinary.com/demo/image/upload/w_640/b.png";

    fn consumer(
        store: Arc<InMemoryStore>,
        network: Arc<dyn NetworkFetcherPort>,
    ) -> (CachedImage, HandleRegistry) {
        let registry = HandleRegistry::new();
        let service = ImageFetchService::new(store, network);
        (CachedImage::new(service, registry.clone()), registry)
    }

    struct GatedFetcher {
        gate: Notify,
    }

    #[async_trait]
    impl NetworkFetcherPort for GatedFetcher {
        async fn fetch(&self, _address: &str) -> CacheResult<Bytes> {
            self.gate.notified().await;
            Ok(Bytes::from_static(b"late"))
        }
    }

    #[tokio::test]
    async fn test_load_creates_resolvable_handle() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(MockNetworkFetcher::new().with_payload(A, b"png"));
        let (mut image, registry) = consumer(store, network);

        let status = image.load(ImageRequest::new(A), &AbortSignal::never()).await;

        assert_eq!(status, LoadStatus::Loaded(PayloadSource::Network));
        let src = image.src().unwrap();
        assert!(src.starts_with("blob:"));
        assert_eq!(registry.resolve(src), Some(Bytes::from_static(b"png")));
        assert!(!image.state().is_loading);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_raw_address() {
        let store = Arc::new(InMemoryStore::new());
        let (mut image, registry) = consumer(store, Arc::new(MockNetworkFetcher::new()));

        let status = image.load(ImageRequest::new(A), &AbortSignal::never()).await;

        assert_eq!(status, LoadStatus::FellBack);
        assert_eq!(image.src(), Some(A));
        assert_eq!(image.state().error.as_ref().and_then(CacheError::status), Some(404));
        assert!(image.state().handle.is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_address_change_keeps_one_live_handle() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(
            MockNetworkFetcher::new()
                .with_payload(A, b"a")
                .with_payload(B, b"b"),
        );
        let (mut image, registry) = consumer(store, network);
        let never = AbortSignal::never();

        image.load(ImageRequest::new(A), &never).await;
        let first = image.src().unwrap().to_string();
        image.load(ImageRequest::new(B), &never).await;

        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&first), None);
        assert_eq!(
            registry.resolve(image.src().unwrap()),
            Some(Bytes::from_static(b"b"))
        );
    }

    #[tokio::test]
    async fn test_failed_reload_releases_previous_handle() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(MockNetworkFetcher::new().with_payload(A, b"a"));
        let (mut image, registry) = consumer(store, network);
        let never = AbortSignal::never();

        image.load(ImageRequest::new(A), &never).await;
        image.load(ImageRequest::new(B), &never).await;

        assert_eq!(registry.live_count(), 0);
        assert_eq!(image.src(), Some(B));
    }

    #[tokio::test]
    async fn test_teardown_releases_handle() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(MockNetworkFetcher::new().with_payload(A, b"a"));
        let (mut image, registry) = consumer(store, network);

        image.load(ImageRequest::new(A), &AbortSignal::never()).await;
        assert_eq!(registry.live_count(), 1);

        drop(image);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_release_clears_state() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(MockNetworkFetcher::new().with_payload(A, b"a"));
        let (mut image, registry) = consumer(store, network);

        image.load(ImageRequest::new(A), &AbortSignal::never()).await;
        image.release();

        assert_eq!(registry.live_count(), 0);
        assert_eq!(image.src(), None);
        assert!(image.request().is_none());
    }

    #[tokio::test]
    async fn test_abort_applies_nothing_but_store_write_completes() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(GatedFetcher {
            gate: Notify::new(),
        });
        let (mut image, registry) = consumer(store.clone(), network.clone());
        let controller = AbortController::new();
        let signal = controller.signal();

        let (status, ()) = tokio::join!(image.load(ImageRequest::new(A), &signal), async {
            tokio::task::yield_now().await;
            controller.abort();
        });

        assert_eq!(status, LoadStatus::Aborted);
        assert_eq!(image.src(), None);
        assert_eq!(registry.live_count(), 0);

        network.gate.notify_one();
        for _ in 0..100 {
            if store.contains(A) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.contains(A));
    }

    #[tokio::test]
    async fn test_dropped_load_clears_loading_state() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(GatedFetcher {
            gate: Notify::new(),
        });
        let (mut image, registry) = consumer(store, network);
        let request = ImageRequest::new(A).with_placeholder("https://cdn/p.png");

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            image.load(request, &AbortSignal::never()),
        )
        .await;

        assert!(result.is_err());
        assert!(!image.state().is_loading);
        assert_eq!(image.placeholder_src(), None);
        assert_eq!(image.src(), None);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_shown_only_while_loading() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(MockNetworkFetcher::new().with_payload(A, b"a"));
        let (mut image, _registry) = consumer(store, network);
        let request = ImageRequest::new(A).with_placeholder("https://cdn/p.png");

        image.request = Some(request.clone());
        image.state.is_loading = true;
        assert_eq!(image.placeholder_src(), Some("https://cdn/p.png"));

        image.load(request, &AbortSignal::never()).await;
        assert_eq!(image.placeholder_src(), None);
        assert!(image.src().is_some());
    }

    #[tokio::test]
    async fn test_empty_address_is_noop() {
        let store = Arc::new(InMemoryStore::new());
        let network = Arc::new(MockNetworkFetcher::new());
        let (mut image, _registry) = consumer(store, network.clone());

        let status = image.load(ImageRequest::default(), &AbortSignal::never()).await;

        assert_eq!(status, LoadStatus::Empty);
        assert_eq!(network.call_count(), 0);
    }

    #[test]
    fn test_request_from_responsive_set() {
        use crate::domain::entities::ImageSpec;
        use crate::infrastructure::image::{CdnConfig, build_responsive_set};

        let set = build_responsive_set(&CdnConfig::default(), &ImageSpec::new("hero.jpg"), None);
        let request = ImageRequest::from(set.clone());

        assert_eq!(request.address, set.primary);
        assert_eq!(request.placeholder.as_deref(), Some(set.placeholder.as_str()));
        assert_eq!(request.srcset(), Some(set.srcset()));
        assert_eq!(ImageRequest::new(A).srcset(), None);
    }

    #[test]
    fn test_abort_signal_state() {
        let controller = AbortController::new();
        let signal = controller.signal();
        assert!(!signal.is_aborted());

        controller.abort();

        assert!(signal.is_aborted());
        assert!(!AbortSignal::never().is_aborted());
    }
}
