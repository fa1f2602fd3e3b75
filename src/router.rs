//! # Navigation Router
//!
//! Drives one reconciliation end to end:
//!
//! ```text
//!  event ──▶ classify ──▶ RouteChange
//!                            │
//!             Idle ──▶ Fetching ──────────────▶ Merging ──────────────▶ Idle
//!                      push history             head merge
//!                      GET + X-Kindling         [transition] body swap
//!                      progress events          scripts, scroll
//!                                               end event, re-prefetch
//! ```
//!
//! The live page (document, window, prefetch state) sits behind a mutex
//! that is only taken in synchronous sections, never across an `.await`.
//! Navigations are not queued. Each one takes a generation number, and a
//! navigation whose fetch finishes after a newer one started is dropped
//! before it touches the document.
//!
//! Every attempt runs under one error boundary: failures become a single
//! [`RouterEvent::Error`], a log line, and a `false` return. Nothing is
//! retried.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use log::{debug, error, info, warn};
use tokio::sync::{broadcast, watch};

use crate::classify::{self, ClickEvent, RouteChange};
use crate::config::RouterOptions;
use crate::dom::{Document, NodeId};
use crate::error::RouterError;
use crate::events::{Notifier, RouterEvent};
use crate::prefetch::{PrefetchMode, Prefetcher};
use crate::window::{ScrollBehavior, Window};
use crate::{history, merge, progress, scripts, url};

/// Request header marking a router fetch, so servers can special-case it.
pub const NAVIGATION_HEADER: &str = "X-Kindling";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    Fetching,
    Merging,
}

/// How to scroll once the new document is in.
enum Landing {
    Link { anchor_id: Option<String> },
    Popstate,
}

/// The live page: document, host window and prefetch bookkeeping.
pub struct Page<W> {
    pub document: Document,
    pub window: W,
    prefetcher: Prefetcher,
}

impl<W: Window> Page<W> {
    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    /// Head merge, then body swap, scripts and scroll (optionally inside a view transition).
    fn apply(&mut self, next: &mut Document, page_transitions: bool, landing: Landing) {
        merge::merge_head(&mut self.document, next);

        let transition = page_transitions && self.window.supports_view_transitions();
        if transition {
            self.window.begin_view_transition();
        }

        let kept = merge::replace_body(&mut self.document, next);
        self.prefetcher.disarm();
        let Page {
            document, window, ..
        } = &mut *self;
        let ran = scripts::run_scripts(document, |script| window.execute_script(script));
        self.land(landing);

        if transition {
            self.window.end_view_transition();
        }
        debug!("body swapped: preserved={kept}, scripts={ran}, transition={transition}");
    }

    fn land(&mut self, landing: Landing) {
        match landing {
            Landing::Link { anchor_id } => {
                let target = anchor_id.and_then(|id| self.document.get_element_by_id(&id));
                match target {
                    Some(node) => {
                        self.window
                            .scroll_into_view(&self.document, node, ScrollBehavior::Smooth)
                    }
                    None => self.window.scroll_to(0.0),
                }
            }
            Landing::Popstate => {
                let y = history::saved_scroll(&self.window).unwrap_or(0.0);
                self.window.scroll_to(y);
            }
        }
    }

    fn scroll_to_anchor(&mut self, anchor_id: &str) {
        if anchor_id.is_empty() {
            self.window.scroll_to(0.0);
            return;
        }
        match self.document.get_element_by_id(anchor_id) {
            Some(node) => self
                .window
                .scroll_into_view(&self.document, node, ScrollBehavior::Smooth),
            None => debug!("no element #{anchor_id} to scroll to"),
        }
    }
}

struct Inner<W> {
    page: Mutex<Page<W>>,
    options: RouterOptions,
    client: reqwest::Client,
    notifier: Notifier,
    state: watch::Sender<RouterState>,
    generation: AtomicU64,
    enabled: bool,
}

pub struct Router<W> {
    inner: Arc<Inner<W>>,
}

impl<W> Clone for Router<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Window + 'static> Router<W> {
    /// Takes ownership of the live document and its window.
    ///
    /// A window without history support leaves the router permanently
    /// disabled: every later call logs and returns `false`.
    pub fn new(document: Document, window: W, options: RouterOptions) -> Self {
        let enabled = window.supports_history();
        if !enabled {
            warn!("kindling disabled: {}", RouterError::Unsupported);
        }

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });
        let (state, _) = watch::channel(RouterState::Idle);

        let router = Self {
            inner: Arc::new(Inner {
                page: Mutex::new(Page {
                    document,
                    window,
                    prefetcher: Prefetcher::default(),
                }),
                options,
                client,
                notifier: Notifier::new(),
                state,
                generation: AtomicU64::new(0),
                enabled,
            }),
        };
        if enabled {
            router.prefetch();
        }
        router
    }

    fn page(&self) -> MutexGuard<'_, Page<W>> {
        self.inner.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        if self.inner.options.log {
            info!("{args}");
        } else {
            debug!("{args}");
        }
    }

    fn set_state(&self, state: RouterState) {
        self.inner.state.send_replace(state);
    }

    /// Back to Idle, unless a newer navigation owns the state by now.
    fn settle(&self, generation: u64) {
        if self.inner.generation.load(Ordering::SeqCst) == generation {
            self.set_state(RouterState::Idle);
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }

    pub fn state(&self) -> RouterState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<RouterState> {
        self.inner.state.subscribe()
    }

    /// Registers a listener for lifecycle and progress notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.inner.notifier.subscribe()
    }

    /// Runs `f` with the live page locked. Keep it short and synchronous.
    pub fn with_page<R>(&self, f: impl FnOnce(&mut Page<W>) -> R) -> R {
        f(&mut self.page())
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Navigates to `path`, resolved against the current origin.
    ///
    /// A malformed path is returned as `Err`; everything past resolution is
    /// caught by the error boundary and reported as `Ok(false)`.
    pub async fn go(&self, path: &str) -> Result<bool, RouterError> {
        let location = self.page().window.location();
        let here = url::parse(&location, None)?;
        let origin = here.origin().ascii_serialization();
        let next = url::resolve(path, Some(&origin))?;

        Ok(self
            .reconstruct(RouteChange::Link {
                next: next.target,
                prev: Some(here.to_string()),
                anchor_id: next.anchor_id,
            })
            .await)
    }

    /// Classifies a click right away (so `prevent_default` is visible to the
    /// caller on return) and hands back the navigation to drive.
    pub fn on_click(&self, event: &mut ClickEvent) -> BoxFuture<'static, bool> {
        if !self.inner.enabled {
            debug!("router disabled, click left to the browser");
            return future::ready(false).boxed();
        }

        let intent = {
            let mut page = self.page();
            let location = page.window.location();
            classify::click(&mut page.document, &location, event)
        };

        let router = self.clone();
        async move { router.reconstruct(intent).await }.boxed()
    }

    /// The host's history moved to a new entry (back/forward).
    pub async fn on_popstate(&self) -> Result<bool, RouterError> {
        let location = self.page().window.location();
        let intent = classify::popstate(&location)?;
        Ok(self.reconstruct(intent).await)
    }

    pub async fn back(&self) -> bool {
        self.traverse(-1).await
    }

    pub async fn forward(&self) -> bool {
        self.traverse(1).await
    }

    async fn traverse(&self, delta: i32) -> bool {
        if !self.inner.enabled {
            info!("router disabled, ignoring history traversal");
            return false;
        }

        let replay = {
            let mut page = self.page();
            history::record_departure(&mut page.window);
            page.window.traverse(delta)
        };
        if !replay {
            return false;
        }

        match self.on_popstate().await {
            Ok(done) => done,
            Err(e) => {
                warn!("history traversal landed on an unusable location: {e}");
                false
            }
        }
    }

    /// Runs one prefetch pass with the configured mode.
    pub fn prefetch(&self) -> usize {
        let mode = self.inner.options.prefetch;
        if mode == PrefetchMode::None || !self.inner.enabled {
            return 0;
        }
        let mut page = self.page();
        let Page {
            document,
            window,
            prefetcher,
        } = &mut *page;
        let count = prefetcher.run(mode, document, window);
        debug!("prefetch pass ({mode:?}): {count} links");
        count
    }

    /// Pointer entered `node`; in hover mode this may add a prefetch hint.
    pub fn on_pointer_enter(&self, node: NodeId) -> bool {
        if self.inner.options.prefetch != PrefetchMode::Hover || !self.inner.enabled {
            return false;
        }
        let mut page = self.page();
        let Page {
            document,
            prefetcher,
            ..
        } = &mut *page;
        prefetcher.pointer_enter(document, node)
    }

    fn schedule_prefetch(&self) {
        if self.inner.options.prefetch == PrefetchMode::None {
            return;
        }
        let router = self.clone();
        let delay = self.inner.options.prefetch_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            router.prefetch();
        });
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Carries out `intent`. Returns true only when a new document was merged.
    pub async fn reconstruct(&self, intent: RouteChange) -> bool {
        if !self.inner.enabled {
            info!("router disabled, ignoring {} navigation", intent.kind());
            return false;
        }

        self.trace(format_args!("⚡ {}", intent.kind()));
        let started = Instant::now();

        match self.reconstruct_unchecked(intent).await {
            Ok(done) => {
                if done {
                    self.trace(format_args!("⏱️ navigation took {:?}", started.elapsed()));
                }
                done
            }
            Err(err) => {
                self.inner.notifier.emit(RouterEvent::Error(err.clone()));
                error!("💥 router fetch failed after {:?}: {err}", started.elapsed());
                false
            }
        }
    }

    async fn reconstruct_unchecked(&self, intent: RouteChange) -> Result<bool, RouterError> {
        let (next, landing, replay) = match intent {
            RouteChange::Noop => return Ok(false),
            RouteChange::Scroll { anchor_id } => {
                self.page().scroll_to_anchor(&anchor_id);
                return Ok(false);
            }
            RouteChange::Link {
                next,
                prev,
                anchor_id,
            } => {
                if prev.as_deref() == Some(next.as_str()) {
                    debug!("already at {next}, nothing to fetch");
                    return Ok(false);
                }
                (next, Landing::Link { anchor_id }, false)
            }
            RouteChange::Popstate { next, .. } => (next, Landing::Popstate, true),
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.notifier.emit(RouterEvent::FetchStart);
        self.set_state(RouterState::Fetching);

        if !replay {
            history::push(&mut self.page().window, &next);
        }

        let mut next_doc = self
            .fetch_document(&next)
            .await
            .inspect_err(|_| self.settle(generation))?;

        {
            let mut page = self.page();
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                info!("discarding {next}: a newer navigation started meanwhile");
                return Ok(false);
            }
            self.set_state(RouterState::Merging);
            page.apply(&mut next_doc, self.inner.options.page_transitions, landing);
        }

        self.inner.notifier.emit(RouterEvent::End);
        self.settle(generation);
        self.schedule_prefetch();
        Ok(true)
    }

    async fn fetch_document(&self, url: &str) -> Result<Document, RouterError> {
        let response = self
            .inner
            .client
            .get(url)
            .header(NAVIGATION_HEADER, "1")
            .send()
            .await?;

        let status = response.status();
        debug!("GET {url} -> {status}");
        if !status.is_success() {
            return Err(RouterError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let stream = progress::body_stream(response, self.inner.notifier.clone())?;
        let html = progress::read_to_string(stream).await?;
        Ok(Document::parse(&html))
    }
}

/// Holds at most one router for a page. The embedding application owns the
/// slot; `acquire` hands out the existing router or builds the first one.
pub struct RouterSlot<W> {
    cell: OnceLock<Router<W>>,
}

impl<W> Default for RouterSlot<W> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

impl<W: Window + 'static> RouterSlot<W> {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub fn acquire(&self, init: impl FnOnce() -> (Document, W, RouterOptions)) -> Router<W> {
        self.cell
            .get_or_init(|| {
                let (document, window, options) = init();
                let log = options.log;
                let router = Router::new(document, window, options);
                if log {
                    info!("🔥 kindling engaged");
                }
                router
            })
            .clone()
    }

    pub fn get(&self) -> Option<Router<W>> {
        self.cell.get().cloned()
    }
}
