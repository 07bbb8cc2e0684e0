//! Display form loader
//!
//! State machine: `pending -> loading -> {success | error}`. A cancelled
//! load returns the loader to the state it had before that load started.
//! Only the latest load is tracked; starting a new one cancels the previous.

use crate::callbacks::{CallbackPayload, CallbackRegistry, Correlation, Unsubscribe};
use crate::error::{FilterError, Result};
use crate::fetch::{current_runtime, guarded_fetch, DisplayFormLoad, InFlight, Settled};
use crate::loadable::Loadable;
use crate::lock;
use attrfilter_backend::AnalyticalBackend;
use attrfilter_model::{DisplayFormMetadata, ObjRef};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct DisplayFormState {
    display_form: Loadable<DisplayFormMetadata>,
    in_flight: Option<InFlight<Loadable<DisplayFormMetadata>>>,
    next_seq: u64,
}

struct Inner {
    display_form_ref: ObjRef,
    backend: Arc<dyn AnalyticalBackend>,
    workspace: String,
    load: Arc<dyn DisplayFormLoad>,
    timeout: Option<Duration>,
    state: Mutex<DisplayFormState>,
    on_start: CallbackRegistry<()>,
    on_success: CallbackRegistry<DisplayFormMetadata>,
    on_error: CallbackRegistry<FilterError>,
    on_cancel: CallbackRegistry<()>,
}

/// Loads the metadata (title, attribute) of one display form.
#[derive(Clone)]
pub struct DefaultAttributeDisplayFormLoader {
    inner: Arc<Inner>,
}

impl DefaultAttributeDisplayFormLoader {
    /// Create a loader; nothing is fetched until `load_display_form_info`.
    pub fn new(
        display_form_ref: ObjRef,
        backend: Arc<dyn AnalyticalBackend>,
        workspace: impl Into<String>,
        load: Arc<dyn DisplayFormLoad>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                display_form_ref,
                backend,
                workspace: workspace.into(),
                load,
                timeout,
                state: Mutex::new(DisplayFormState {
                    display_form: Loadable::Pending,
                    in_flight: None,
                    next_seq: 0,
                }),
                on_start: CallbackRegistry::new(),
                on_success: CallbackRegistry::new(),
                on_error: CallbackRegistry::new(),
                on_cancel: CallbackRegistry::new(),
            }),
        }
    }

    /// Start loading the display form, cancelling any load in flight.
    ///
    /// The correlation is echoed in every event this load fires. The
    /// returned handle completes once the outcome has been dispatched.
    pub fn load_display_form_info(
        &self,
        correlation: Option<Correlation>,
    ) -> Result<JoinHandle<()>> {
        let runtime = current_runtime()?;
        let (seq, token) = {
            let mut state = lock(&self.inner.state);
            let restore = match state.in_flight.take() {
                Some(previous) => {
                    previous.token.cancel();
                    previous.restore
                }
                None => state.display_form.clone(),
            };
            let seq = state.next_seq;
            state.next_seq += 1;
            let token = CancellationToken::new();
            state.in_flight = Some(InFlight {
                seq,
                token: token.clone(),
                restore,
            });
            state.display_form = Loadable::Loading;
            (seq, token)
        };

        debug!(
            display_form = %self.inner.display_form_ref,
            correlation = correlation.as_deref().unwrap_or_default(),
            "Loading display form"
        );
        self.inner.on_start.trigger_all(correlation.clone(), ());

        let this = self.clone();
        Ok(runtime.spawn(async move { this.run_load(seq, token, correlation).await }))
    }

    async fn run_load(&self, seq: u64, token: CancellationToken, correlation: Option<Correlation>) {
        let inner = &self.inner;
        let fetch = inner
            .load
            .load(inner.backend.as_ref(), &inner.workspace, &inner.display_form_ref);
        let result = guarded_fetch(&token, inner.timeout, fetch).await;

        let settled = {
            let mut state = lock(&inner.state);
            let is_current = state.in_flight.as_ref().is_some_and(|f| f.seq == seq);
            let settled = Settled::from_result(result, &token, is_current);
            if is_current {
                if let Some(flight) = state.in_flight.take() {
                    state.display_form = match &settled {
                        Settled::Success(metadata) => Loadable::Success(metadata.clone()),
                        Settled::Failed(err) => Loadable::Error(err.clone()),
                        Settled::Cancelled => flight.restore,
                    };
                }
            }
            settled
        };

        match settled {
            Settled::Success(metadata) => {
                debug!(title = %metadata.title, "Display form loaded");
                inner.on_success.trigger_all(correlation, metadata);
            }
            Settled::Failed(err) => {
                warn!(
                    display_form = %inner.display_form_ref,
                    error = %err,
                    "Display form load failed"
                );
                inner.on_error.trigger_all(correlation, err);
            }
            Settled::Cancelled => {
                debug!(display_form = %inner.display_form_ref, "Display form load cancelled");
                inner.on_cancel.trigger_all(correlation, ());
            }
        }
    }

    /// Cancel the load in flight, if any. Its cancel event fires once the
    /// load task observes the cancellation.
    pub fn cancel_display_form_info_load(&self) {
        if let Some(flight) = lock(&self.inner.state).in_flight.as_ref() {
            flight.token.cancel();
        }
    }

    /// Current state of the display form.
    #[must_use]
    pub fn get_display_form_info(&self) -> Loadable<DisplayFormMetadata> {
        lock(&self.inner.state).display_form.clone()
    }

    /// Reference of the handled display form.
    #[must_use]
    pub fn display_form_ref(&self) -> &ObjRef {
        &self.inner.display_form_ref
    }

    /// Subscribe to load start.
    pub fn on_display_form_load_start<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.inner.on_start.subscribe(callback)
    }

    /// Subscribe to successful loads.
    pub fn on_display_form_load_success<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<DisplayFormMetadata>) + Send + Sync + 'static,
    {
        self.inner.on_success.subscribe(callback)
    }

    /// Subscribe to failed loads.
    pub fn on_display_form_load_error<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<FilterError>) + Send + Sync + 'static,
    {
        self.inner.on_error.subscribe(callback)
    }

    /// Subscribe to cancelled loads.
    pub fn on_display_form_load_cancel<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&CallbackPayload<()>) + Send + Sync + 'static,
    {
        self.inner.on_cancel.subscribe(callback)
    }
}
