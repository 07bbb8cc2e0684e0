//! Scripted fetch functions for ordering and cancellation tests
//!
//! Each fetch is parked until the test answers it through the responder it
//! receives on the request channel. A dropped responder means the fetch was
//! cancelled by the loader.

use crate::callbacks::CallbackPayload;
use crate::fetch::{DisplayFormLoad, ElementsLoad, ElementsLoadConfig, ElementsLoadResult};
use attrfilter_backend::{
    AnalyticalBackend, BackendError, BackendFixture, DisplayFormFixture, InMemoryBackend,
};
use attrfilter_model::{AttributeElement, DisplayFormMetadata, ObjRef};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub(crate) type Responder<T> = oneshot::Sender<Result<T, BackendError>>;

/// Parked elements fetch.
pub(crate) struct PendingElements {
    pub config: ElementsLoadConfig,
    pub respond: Responder<ElementsLoadResult>,
}

/// Parked display form fetch.
pub(crate) struct PendingDisplayForm {
    pub display_form: ObjRef,
    pub respond: Responder<DisplayFormMetadata>,
}

pub(crate) struct ScriptedElementsLoad {
    requests: mpsc::UnboundedSender<PendingElements>,
}

impl ScriptedElementsLoad {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingElements>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { requests: tx }), rx)
    }
}

#[async_trait::async_trait]
impl ElementsLoad for ScriptedElementsLoad {
    async fn load(&self, config: ElementsLoadConfig) -> Result<ElementsLoadResult, BackendError> {
        let (respond, answer) = oneshot::channel();
        self.requests
            .send(PendingElements { config, respond })
            .map_err(|_| BackendError::Request("script closed".into()))?;
        answer.await.map_err(|_| BackendError::Aborted)?
    }
}

pub(crate) struct ScriptedDisplayFormLoad {
    requests: mpsc::UnboundedSender<PendingDisplayForm>,
}

impl ScriptedDisplayFormLoad {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PendingDisplayForm>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { requests: tx }), rx)
    }
}

#[async_trait::async_trait]
impl DisplayFormLoad for ScriptedDisplayFormLoad {
    async fn load(
        &self,
        _backend: &dyn AnalyticalBackend,
        _workspace: &str,
        display_form: &ObjRef,
    ) -> Result<DisplayFormMetadata, BackendError> {
        let (respond, answer) = oneshot::channel();
        self.requests
            .send(PendingDisplayForm {
                display_form: display_form.clone(),
                respond,
            })
            .map_err(|_| BackendError::Request("script closed".into()))?;
        answer.await.map_err(|_| BackendError::Aborted)?
    }
}

pub(crate) fn city_display_form() -> ObjRef {
    ObjRef::identifier("label.city")
}

pub(crate) fn city_metadata() -> DisplayFormMetadata {
    DisplayFormMetadata {
        obj_ref: city_display_form(),
        id: "label.city".into(),
        uri: "/gdc/md/ws/obj/10".into(),
        title: "City".into(),
        attribute: ObjRef::identifier("attr.city"),
    }
}

pub(crate) fn element(n: u32) -> AttributeElement {
    AttributeElement::new(format!("/e/{}", n), format!("City {}", n))
}

/// Backend serving the city display form with elements `1..=count`.
pub(crate) fn city_backend(count: u32) -> InMemoryBackend {
    InMemoryBackend::new(BackendFixture {
        display_forms: vec![DisplayFormFixture {
            metadata: city_metadata(),
            elements: (1..=count).map(element).collect(),
        }],
    })
}

pub(crate) fn page(
    items: Vec<AttributeElement>,
    offset: u32,
    total_count: u64,
) -> ElementsLoadResult {
    ElementsLoadResult {
        limit: items.len() as u32,
        items,
        offset,
        total_count,
    }
}

/// Records every payload delivered to a subscription.
pub(crate) fn recorder<T: Clone + Send + 'static>() -> (
    Arc<std::sync::Mutex<Vec<CallbackPayload<T>>>>,
    impl Fn(&CallbackPayload<T>) + Send + Sync + 'static,
) {
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, move |p: &CallbackPayload<T>| {
        sink.lock().unwrap().push(p.clone())
    })
}
