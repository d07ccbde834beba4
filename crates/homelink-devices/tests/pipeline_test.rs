//! Ingestion pipeline integration tests.
//!
//! Exercises the full decode → classify → resolve → extract → persist path
//! against in-memory stores.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde_json::{json, Value};

use homelink_core::{Device, DeviceStore, LogStore};
use homelink_devices::{DeviceError, IngestPipeline};
use homelink_storage::MemoryStores;

fn encode_body(payload: &Value) -> String {
    URL_SAFE.encode(serde_json::to_vec(payload).unwrap())
}

fn envelope(topic: &str, payload: &Value) -> Value {
    json!({
        "data": {
            "body": encode_body(payload),
            "properties": { "topic": topic },
        }
    })
}

fn pipeline(stores: &Arc<MemoryStores>) -> IngestPipeline {
    IngestPipeline::new(
        stores.clone() as Arc<dyn DeviceStore>,
        stores.clone() as Arc<dyn LogStore>,
    )
}

#[tokio::test]
async fn result_updates_matching_channel_and_logs_history() {
    let stores = Arc::new(MemoryStores::new());
    let channel2 = Device::relay("Test", "t1", 2);
    let channel3 = Device::relay("Test", "t1", 3);
    let (id2, id3) = (channel2.id, channel3.id);
    DeviceStore::insert(&*stores, channel2).await.unwrap();
    DeviceStore::insert(&*stores, channel3).await.unwrap();

    let report = pipeline(&stores)
        .ingest_batch(json!([envelope("t1/RESULT", &json!({"POWER2": "OFF"}))]))
        .await
        .unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.logged, 1);
    // Channel 3 had no POWER3 key: skipped with a recorded failure.
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].device_id, Some(id3.to_string()));

    let updated = DeviceStore::get(&*stores, id2).await.unwrap();
    assert_eq!(updated.last_reading.unwrap().state(), Some("OFF"));
    assert!(updated.last_updated_at.is_some());
    assert_eq!(stores.list_for_device(id2).await.unwrap().len(), 1);

    let untouched = DeviceStore::get(&*stores, id3).await.unwrap();
    assert!(untouched.last_reading.is_none());
    assert!(stores.list_for_device(id3).await.unwrap().is_empty());
}

#[tokio::test]
async fn sensor_reading_is_normalized_without_history() {
    let stores = Arc::new(MemoryStores::new());
    let sensor = Device::sensor("Test", "wemos-t1", "am2301");
    let id = sensor.id;
    DeviceStore::insert(&*stores, sensor).await.unwrap();

    let payload = json!({
        "Time": "2021-08-16T13:57:26",
        "AM2301": {"DewPoint": 0, "Humidity": 44.4, "Temperature": 21.2},
        "TempUnit": "C"
    });
    let report = pipeline(&stores)
        .ingest_batch(json!([envelope("wemos-t1/SENSOR", &payload)]))
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.logged, 0);
    assert!(report.failures.is_empty());

    let reading = DeviceStore::get(&*stores, id)
        .await
        .unwrap()
        .last_reading
        .unwrap();
    assert_eq!(reading.number("temperature"), Some(21.2));
    assert_eq!(reading.number("humidity"), Some(44.4));
    assert_eq!(reading.get("units").and_then(Value::as_str), Some("C"));

    // SENSOR heartbeats never write history.
    assert!(stores.list_for_device(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn one_malformed_envelope_does_not_abort_the_batch() {
    let stores = Arc::new(MemoryStores::new());
    let relay = Device::relay("Test", "t1", 1);
    let id = relay.id;
    DeviceStore::insert(&*stores, relay).await.unwrap();

    let batch = json!([
        envelope("t1/STATE", &json!({"POWER1": "ON"})),
        { "data": { "body": "not-base64!!", "properties": {"topic": "t1/STATE"} } },
        envelope("t1/STATE", &json!({"POWER1": "OFF"})),
    ]);

    let report = pipeline(&stores).ingest_batch(batch).await.unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.updated, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);

    // Messages apply in input order: the last write wins.
    let device = DeviceStore::get(&*stores, id).await.unwrap();
    assert_eq!(device.last_reading.unwrap().state(), Some("OFF"));
}

#[tokio::test]
async fn unknown_action_is_recorded_and_skipped() {
    let stores = Arc::new(MemoryStores::new());
    let report = pipeline(&stores)
        .ingest_batch(json!([envelope(
            "wemos-t1/INFO1",
            &json!({"Info1": {"Module": "Generic"}})
        )]))
        .await
        .unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("INFO1"));
}

#[tokio::test]
async fn missing_firmware_properties_are_recorded_and_skipped() {
    let stores = Arc::new(MemoryStores::new());
    let batch = json!([{
        "data": { "body": encode_body(&json!({"test": "test"})), "properties": {} }
    }]);

    let report = pipeline(&stores).ingest_batch(batch).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("firmware"));
}

#[tokio::test]
async fn non_list_payload_is_rejected_before_processing() {
    let stores = Arc::new(MemoryStores::new());
    let result = pipeline(&stores).ingest_batch(json!({})).await;
    assert!(matches!(result, Err(DeviceError::InvalidBatchShape)));
}

#[tokio::test]
async fn host_with_no_device_records_is_a_clean_no_op() {
    let stores = Arc::new(MemoryStores::new());
    let report = pipeline(&stores)
        .ingest_batch(json!([envelope("ghost/RESULT", &json!({"POWER1": "ON"}))]))
        .await
        .unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.updated, 0);
    assert!(report.failures.is_empty());
}
