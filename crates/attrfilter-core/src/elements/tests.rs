use super::*;
use crate::fetch::BackendElementsLoad;
use crate::testutil::{
    city_backend, city_display_form, element, page, recorder, PendingElements,
    ScriptedElementsLoad,
};
use attrfilter_backend::{BackendError, InMemoryBackend, MockAnalyticalBackend};
use tokio::sync::mpsc::UnboundedReceiver;

fn loader_over(backend: Arc<dyn AnalyticalBackend>) -> DefaultAttributeElementsLoader {
    DefaultAttributeElementsLoader::new(
        city_display_form(),
        backend,
        "ws",
        Arc::new(BackendElementsLoad),
        ElementKeyKind::Uri,
        HandlerSettings::default(),
    )
}

fn scripted(
    key_kind: ElementKeyKind,
) -> (DefaultAttributeElementsLoader, UnboundedReceiver<PendingElements>) {
    let (load, requests) = ScriptedElementsLoad::new();
    let loader = DefaultAttributeElementsLoader::new(
        city_display_form(),
        Arc::new(InMemoryBackend::default()),
        "ws",
        load,
        key_kind,
        HandlerSettings::default(),
    );
    (loader, requests)
}

fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_range_load_reports_count_and_items_in_order() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (successes, on_success) = recorder::<ElementsLoadResult>();
    loader.on_elements_range_load_success(on_success);

    let handle = loader.load_elements_range(0, 2, Some("c1".into())).unwrap();
    let pending = requests.recv().await.unwrap();
    assert_eq!((pending.config.offset, pending.config.limit), (0, 2));
    pending
        .respond
        .send(Ok(page(vec![element(1), element(2)], 0, 5)))
        .unwrap();
    handle.await.unwrap();

    assert_eq!(loader.get_count_with_current_settings(), Some(5));
    assert_eq!(loader.get_all_items(), vec![element(1), element(2)]);
    assert_eq!(loader.get_loading_status(), LoadableStatus::Success);
    assert_eq!(successes.lock().unwrap()[0].correlation.as_deref(), Some("c1"));
}

#[tokio::test]
async fn test_setting_search_resets_count_until_next_load() {
    let backend = Arc::new(city_backend(12));
    let loader = loader_over(backend);

    loader.load_elements_range(0, 5, None).unwrap().await.unwrap();
    assert_eq!(loader.get_count_with_current_settings(), Some(12));

    loader.set_search("city 1");
    assert_eq!(loader.get_count_with_current_settings(), None);
    assert!(loader.get_all_items().is_empty());
    assert_eq!(loader.get_search(), "city 1");

    loader.load_elements_range(0, 5, None).unwrap().await.unwrap();
    // "City 1", "City 10", "City 11", "City 12"
    assert_eq!(loader.get_count_with_current_settings(), Some(4));
    assert_eq!(loader.get_all_items().len(), 4);
}

#[tokio::test]
async fn test_abort_error_keeps_previous_status() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (cancels, on_cancel) = recorder::<()>();
    let (errors, on_error) = recorder::<FilterError>();
    loader.on_elements_range_load_cancel(on_cancel);
    loader.on_elements_range_load_error(on_error);

    let first = loader.load_elements_range(0, 2, None).unwrap();
    requests
        .recv()
        .await
        .unwrap()
        .respond
        .send(Ok(page(vec![element(1), element(2)], 0, 5)))
        .unwrap();
    first.await.unwrap();
    assert_eq!(loader.get_loading_status(), LoadableStatus::Success);

    let second = loader.load_elements_range(2, 2, Some("c2".into())).unwrap();
    assert_eq!(loader.get_loading_status(), LoadableStatus::Loading);
    requests
        .recv()
        .await
        .unwrap()
        .respond
        .send(Err(BackendError::Aborted))
        .unwrap();
    second.await.unwrap();

    assert_eq!(loader.get_loading_status(), LoadableStatus::Success);
    assert_eq!(cancels.lock().unwrap()[0].correlation.as_deref(), Some("c2"));
    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(loader.get_all_items().len(), 2);
}

#[tokio::test]
async fn test_overlapping_pages_are_merged_by_uri() {
    let backend = Arc::new(city_backend(5));
    let loader = loader_over(backend);

    loader.load_elements_range(0, 3, None).unwrap().await.unwrap();
    loader.load_elements_range(2, 3, None).unwrap().await.unwrap();

    let uris: Vec<String> = loader.get_all_items().into_iter().map(|e| e.uri).collect();
    assert_eq!(uris, keys(&["/e/1", "/e/2", "/e/3", "/e/4", "/e/5"]));
}

#[tokio::test]
async fn test_next_page_continues_after_loaded_items() {
    let backend = Arc::new(city_backend(120));
    let loader = loader_over(backend.clone());

    loader.load_next_elements_page(None).unwrap().await.unwrap();
    loader.load_next_elements_page(None).unwrap().await.unwrap();
    loader.load_next_elements_page(None).unwrap().await.unwrap();

    let items = loader.get_all_items();
    assert_eq!(items.len(), 120);
    assert_eq!(items[50], element(51));
    assert_eq!(backend.element_query_count(), 3);
}

#[tokio::test]
async fn test_stale_response_is_not_applied() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (cancels, on_cancel) = recorder::<()>();
    loader.on_elements_range_load_cancel(on_cancel);

    let first = loader.load_elements_range(0, 2, Some("first".into())).unwrap();
    let first_request = requests.recv().await.unwrap();
    let second = loader.load_elements_range(0, 2, Some("second".into())).unwrap();
    let second_request = requests.recv().await.unwrap();

    first.await.unwrap();
    assert!(first_request.respond.is_closed());

    second_request
        .respond
        .send(Ok(page(vec![element(7)], 0, 1)))
        .unwrap();
    second.await.unwrap();

    assert_eq!(loader.get_all_items(), vec![element(7)]);
    let cancels = cancels.lock().unwrap();
    assert_eq!(cancels.len(), 1);
    assert_eq!(cancels[0].correlation.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_setter_cancels_range_load_in_flight() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (cancels, on_cancel) = recorder::<()>();
    loader.on_elements_range_load_cancel(on_cancel);

    let handle = loader.load_elements_range(0, 2, None).unwrap();
    let pending = requests.recv().await.unwrap();
    loader.set_order(SortDirection::Desc);
    handle.await.unwrap();

    assert!(pending.respond.is_closed());
    assert_eq!(cancels.lock().unwrap().len(), 1);
    assert_eq!(loader.get_loading_status(), LoadableStatus::Pending);
    assert_eq!(loader.get_order(), Some(SortDirection::Desc));
}

#[tokio::test]
async fn test_range_load_carries_limiting_filters() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let measure = Measure::simple("m1", ObjRef::identifier("metric.revenue"));
    loader.set_limiting_measures(vec![measure.clone()]);
    loader.set_search("pra");

    let handle = loader.load_elements_range(10, 20, None).unwrap();
    let pending = requests.recv().await.unwrap();
    assert_eq!(pending.config.offset, 10);
    assert_eq!(pending.config.limit, 20);
    assert_eq!(pending.config.search.as_deref(), Some("pra"));
    assert_eq!(pending.config.limiting_measures, vec![measure.clone()]);
    assert!(pending.config.elements.is_none());
    pending.respond.send(Ok(page(Vec::new(), 10, 0))).unwrap();
    handle.await.unwrap();

    assert_eq!(loader.get_limiting_measures(), vec![measure]);
}

#[tokio::test]
async fn test_particular_elements_fill_dictionary_only() {
    let backend = Arc::new(city_backend(5));
    let loader = loader_over(backend);
    let (successes, on_success) = recorder::<ElementsLoadResult>();
    loader.on_particular_elements_load_success(on_success);

    let spec = ElementsSpecification::Uris(keys(&["/e/2", "/e/4"]));
    loader
        .load_particular_elements(spec, Some("p1".into()))
        .unwrap()
        .await
        .unwrap();

    assert!(loader.get_all_items().is_empty());
    assert_eq!(
        loader.get_items_by_key(&keys(&["/e/4", "/e/9", "/e/2"])),
        vec![Some(element(4)), None, Some(element(2))]
    );
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Success);
    assert_eq!(successes.lock().unwrap()[0].correlation.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_particular_elements_by_value() {
    let (loader, mut requests) = scripted(ElementKeyKind::Value);

    let spec = ElementsSpecification::Values(keys(&["City 3"]));
    let handle = loader.load_particular_elements(spec.clone(), None).unwrap();
    let pending = requests.recv().await.unwrap();
    assert_eq!(pending.config.elements, Some(spec));
    assert_eq!(pending.config.limit, 1000);
    pending
        .respond
        .send(Ok(page(vec![element(3), AttributeElement::empty("/e/null")], 0, 2)))
        .unwrap();
    handle.await.unwrap();

    assert_eq!(
        loader.get_items_by_key(&keys(&["City 3", "/e/3"])),
        vec![Some(element(3)), None]
    );
}

#[tokio::test]
async fn test_empty_particular_request_skips_backend() {
    let backend = Arc::new(city_backend(5));
    let loader = loader_over(backend.clone());
    let (successes, on_success) = recorder::<ElementsLoadResult>();
    loader.on_particular_elements_load_success(on_success);

    loader
        .load_particular_elements(ElementsSpecification::Uris(Vec::new()), None)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(backend.element_query_count(), 0);
    assert_eq!(successes.lock().unwrap().len(), 1);
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Success);
}

#[tokio::test]
async fn test_particular_request_over_limit_is_rejected() {
    let loader = DefaultAttributeElementsLoader::new(
        city_display_form(),
        Arc::new(city_backend(5)),
        "ws",
        Arc::new(BackendElementsLoad),
        ElementKeyKind::Uri,
        HandlerSettings {
            particular_elements_limit: 2,
            ..HandlerSettings::default()
        },
    );
    let spec = ElementsSpecification::Uris(keys(&["/e/1", "/e/2", "/e/3"]));
    assert!(matches!(
        loader.load_particular_elements(spec, None),
        Err(FilterError::InvalidOptions(_))
    ));
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Pending);
}

#[tokio::test]
async fn test_particular_and_range_loads_are_independent() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (range_cancels, on_range_cancel) = recorder::<()>();
    loader.on_elements_range_load_cancel(on_range_cancel);

    let range = loader.load_elements_range(0, 2, None).unwrap();
    let range_request = requests.recv().await.unwrap();
    let particular = loader
        .load_particular_elements(ElementsSpecification::Uris(keys(&["/e/9"])), None)
        .unwrap();
    let particular_request = requests.recv().await.unwrap();

    particular_request
        .respond
        .send(Ok(page(vec![element(9)], 0, 1)))
        .unwrap();
    particular.await.unwrap();
    range_request
        .respond
        .send(Ok(page(vec![element(1)], 0, 3)))
        .unwrap();
    range.await.unwrap();

    assert!(range_cancels.lock().unwrap().is_empty());
    assert_eq!(loader.get_all_items(), vec![element(1)]);
    assert_eq!(
        loader.get_items_by_key(&keys(&["/e/1", "/e/9"])),
        vec![Some(element(1)), Some(element(9))]
    );
}

#[tokio::test]
async fn test_cancel_element_load_cancels_both_slots() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (range_cancels, on_range_cancel) = recorder::<()>();
    let (particular_cancels, on_particular_cancel) = recorder::<()>();
    loader.on_elements_range_load_cancel(on_range_cancel);
    loader.on_particular_elements_load_cancel(on_particular_cancel);

    let range = loader.load_elements_range(0, 2, None).unwrap();
    let _range_request = requests.recv().await.unwrap();
    let particular = loader
        .load_particular_elements(ElementsSpecification::Uris(keys(&["/e/9"])), None)
        .unwrap();
    let _particular_request = requests.recv().await.unwrap();

    loader.cancel_element_load();
    range.await.unwrap();
    particular.await.unwrap();

    assert_eq!(range_cancels.lock().unwrap().len(), 1);
    assert_eq!(particular_cancels.lock().unwrap().len(), 1);
    assert_eq!(loader.get_loading_status(), LoadableStatus::Pending);
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Pending);
}

#[tokio::test]
async fn test_particular_loads_run_side_by_side() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);
    let (cancels, on_cancel) = recorder::<()>();
    loader.on_particular_elements_load_cancel(on_cancel);

    let first = loader
        .load_particular_elements(ElementsSpecification::Uris(keys(&["/e/1"])), None)
        .unwrap();
    let first_request = requests.recv().await.unwrap();
    let second = loader
        .load_particular_elements(ElementsSpecification::Uris(keys(&["/e/4"])), None)
        .unwrap();
    let second_request = requests.recv().await.unwrap();

    second_request
        .respond
        .send(Ok(page(vec![element(4)], 0, 1)))
        .unwrap();
    second.await.unwrap();
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Loading);

    first_request
        .respond
        .send(Ok(page(vec![element(1)], 0, 1)))
        .unwrap();
    first.await.unwrap();

    assert!(cancels.lock().unwrap().is_empty());
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Success);
    assert_eq!(
        loader.get_items_by_key(&keys(&["/e/1", "/e/4"])),
        vec![Some(element(1)), Some(element(4))]
    );
}

#[tokio::test]
async fn test_batched_particular_load_splits_by_limit() {
    let backend = Arc::new(city_backend(5));
    let loader = DefaultAttributeElementsLoader::new(
        city_display_form(),
        backend.clone(),
        "ws",
        Arc::new(BackendElementsLoad),
        ElementKeyKind::Uri,
        HandlerSettings {
            particular_elements_limit: 2,
            ..HandlerSettings::default()
        },
    );
    let (successes, on_success) = recorder::<ElementsLoadResult>();
    loader.on_particular_elements_load_success(on_success);

    let all = keys(&["/e/1", "/e/2", "/e/3", "/e/4", "/e/5"]);
    let handles = loader
        .load_particular_elements_in_batches(ElementKeyKind::Uri, all.clone(), Some("b".into()))
        .unwrap();
    assert_eq!(handles.len(), 3);
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(backend.element_query_count(), 3);
    assert_eq!(successes.lock().unwrap().len(), 3);
    assert!(loader.get_items_by_key(&all).iter().all(Option::is_some));
    assert_eq!(loader.get_particular_elements_status(), LoadableStatus::Success);
}

#[tokio::test]
async fn test_cancelled_total_count_keeps_previous_value() {
    let (loader, mut requests) = scripted(ElementKeyKind::Uri);

    let first = loader.load_total_count().unwrap();
    let request = requests.recv().await.unwrap();
    assert_eq!(request.config.limit, 1);
    request.respond.send(Ok(page(Vec::new(), 0, 5))).unwrap();
    first.await.unwrap();
    assert_eq!(loader.get_total_count_info(), Loadable::Success(5));

    let second = loader.load_total_count().unwrap();
    let request = requests.recv().await.unwrap();
    assert_eq!(loader.get_total_count_info(), Loadable::Loading);
    loader.cancel_element_load();
    second.await.unwrap();

    assert!(request.respond.is_closed());
    assert_eq!(loader.get_total_count_info(), Loadable::Success(5));
}

#[tokio::test]
async fn test_total_count_ignores_search() {
    let backend = Arc::new(city_backend(12));
    let loader = loader_over(backend);
    loader.set_search("city 1");

    assert_eq!(loader.get_total_count(), None);
    loader.load_total_count().unwrap().await.unwrap();
    assert_eq!(loader.get_total_count(), Some(12));
    assert_eq!(loader.get_count_with_current_settings(), None);
}

#[tokio::test]
async fn test_backend_error_is_reported() {
    let mut backend = MockAnalyticalBackend::new();
    backend
        .expect_query_elements()
        .withf(|ws, query| ws == "ws" && query.offset == Some(4) && query.limit == Some(2))
        .times(1)
        .returning(|_, _| Err(BackendError::Request("boom".into())));
    let loader = loader_over(Arc::new(backend));
    let (errors, on_error) = recorder::<FilterError>();
    loader.on_elements_range_load_error(on_error);

    loader.load_elements_range(4, 2, None).unwrap().await.unwrap();

    let expected = FilterError::Backend(BackendError::Request("boom".into()));
    assert_eq!(loader.get_loading_status(), LoadableStatus::Error);
    assert_eq!(loader.get_range_error(), Some(expected.clone()));
    assert_eq!(errors.lock().unwrap()[0].payload, expected);
}

#[test]
fn test_zero_limit_is_rejected() {
    let loader = loader_over(Arc::new(city_backend(1)));
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let _guard = runtime.enter();
    assert!(matches!(
        loader.load_elements_range(0, 0, None),
        Err(FilterError::InvalidOptions(_))
    ));
    assert_eq!(loader.get_loading_status(), LoadableStatus::Pending);
}
