//! Debounced preview sessions.
//!
//! A `PreviewSession` owns the caller's latest `SourceBundle` snapshot and a
//! single pending render. Every update cancels the pending render and starts
//! the delay again, so a burst of edits produces exactly one composition using
//! the last snapshot. Each delivered document carries a fresh, strictly
//! increasing render key so the host reloads its frame from scratch instead of
//! patching it, which drops the previous document's listeners and timers.

use crate::{render, Error, RenderedDocument, Result, SourceBundle, SourceKind, ViewportProfile};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type RenderHandler = Arc<dyn Fn(&PreviewFrame) + Send + Sync>;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last edit before re-rendering, in milliseconds
    pub debounce_ms: u64,
    /// Host container size used for delivered frames
    pub viewport: ViewportProfile,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            viewport: ViewportProfile::Desktop,
        }
    }
}

/// One document handed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    /// Render key, strictly increasing within a session
    pub key: u64,
    pub viewport: ViewportProfile,
    pub document: RenderedDocument,
}

#[derive(Default)]
struct Shared {
    // Identifies the most recently scheduled render; stale timers compare
    // against it and bail out.
    ticket: AtomicU64,
    last_key: AtomicU64,
    current: Mutex<Option<PreviewFrame>>,
}

impl Shared {
    // The ticket is re-checked under the `current` lock, so a timer that woke
    // just before `flush` or `dispose` cannot deliver after them. Holding the
    // lock through the handler keeps deliveries in key order.
    fn deliver(
        &self,
        ticket: u64,
        handler: &RenderHandler,
        viewport: ViewportProfile,
        bundle: &SourceBundle,
    ) -> Option<PreviewFrame> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if self.ticket.load(Ordering::SeqCst) != ticket {
            debug!("render {} superseded", ticket);
            return None;
        }
        let key = self.last_key.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = PreviewFrame {
            key,
            viewport,
            document: render(bundle),
        };
        debug!("render {} ({} bytes)", key, frame.document.len());
        *current = Some(frame.clone());
        handler(&frame);
        Some(frame)
    }
}

/// Live-preview state owned by one editor view.
pub struct PreviewSession {
    config: SessionConfig,
    runtime: Handle,
    bundle: SourceBundle,
    baseline: SourceBundle,
    pending: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    on_render: RenderHandler,
    disposed: bool,
}

impl PreviewSession {
    /// Create a session on the current tokio runtime.
    ///
    /// `on_render` is invoked with every delivered frame, from the runtime's
    /// worker when the debounce fires or from the caller on `flush`.
    pub fn new<F>(config: SessionConfig, on_render: F) -> Result<Self>
    where
        F: Fn(&PreviewFrame) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| Error::InitializationError(format!("no tokio runtime available: {}", e)))?;
        Ok(Self::with_runtime(runtime, config, on_render))
    }

    /// Create a session that schedules its timers on `runtime`.
    pub fn with_runtime<F>(runtime: Handle, config: SessionConfig, on_render: F) -> Self
    where
        F: Fn(&PreviewFrame) + Send + Sync + 'static,
    {
        Self {
            config,
            runtime,
            bundle: SourceBundle::default(),
            baseline: SourceBundle::default(),
            pending: None,
            shared: Arc::new(Shared::default()),
            on_render: Arc::new(on_render),
            disposed: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Latest snapshot handed to the session.
    pub fn bundle(&self) -> &SourceBundle {
        &self.bundle
    }

    /// Most recently delivered frame, if any.
    pub fn current(&self) -> Option<PreviewFrame> {
        self.shared.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether a debounced render is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Replace the snapshot and restart the debounce timer.
    pub fn update(&mut self, bundle: SourceBundle) -> Result<()> {
        if self.disposed {
            return Err(Error::SessionDisposed);
        }
        self.bundle = bundle;
        self.schedule();
        Ok(())
    }

    /// Replace a single field of the snapshot (one editor tab) and restart
    /// the debounce timer.
    pub fn edit(&mut self, kind: SourceKind, text: impl Into<String>) -> Result<()> {
        if self.disposed {
            return Err(Error::SessionDisposed);
        }
        self.bundle.set(kind, text);
        self.schedule();
        Ok(())
    }

    /// Start from a loaded project: the snapshot becomes the saved baseline.
    pub fn load(&mut self, bundle: SourceBundle) -> Result<()> {
        self.baseline = bundle.clone();
        self.update(bundle)
    }

    /// Whether the snapshot differs from the last saved baseline.
    pub fn has_changes(&self) -> bool {
        self.bundle != self.baseline
    }

    /// Fields that differ from the saved baseline.
    pub fn changed_fields(&self) -> Vec<SourceKind> {
        self.bundle.changed_fields(&self.baseline)
    }

    /// Record the current snapshot as saved.
    pub fn mark_saved(&mut self) {
        self.baseline = self.bundle.clone();
    }

    /// Viewport used for frames delivered from now on.
    pub fn set_viewport(&mut self, viewport: ViewportProfile) {
        self.config.viewport = viewport;
    }

    /// Cancel any pending render and render the current snapshot right away.
    pub fn flush(&mut self) -> Result<PreviewFrame> {
        if self.disposed {
            return Err(Error::SessionDisposed);
        }
        self.cancel_pending();
        let ticket = self.shared.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared
            .deliver(ticket, &self.on_render, self.config.viewport, &self.bundle)
            .ok_or_else(|| Error::Other("render superseded".to_string()))
    }

    /// Tear the session down: the pending render is cancelled and no further
    /// frames are delivered.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel_pending();
        self.disposed = true;
        *self.shared.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        debug!("preview session disposed");
    }

    fn cancel_pending(&mut self) {
        // Invalidate whatever timer is in flight, even one that already woke.
        self.shared.ticket.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn schedule(&mut self) {
        self.cancel_pending();
        let ticket = self.shared.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = Duration::from_millis(self.config.debounce_ms);
        let snapshot = self.bundle.clone();
        let viewport = self.config.viewport;
        let shared = self.shared.clone();
        let handler = self.on_render.clone();

        self.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.deliver(ticket, &handler, viewport, &snapshot);
        }));
        debug!("render scheduled in {:?}", delay);
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
