// Wire and model serialization tests (relay messages, metric keys, projection JSON)

mod common;

use common::at;
use serde_json::json;
use solar_telemetry::models::*;
use solar_telemetry::projection::{Projection, SurfaceSize, project, LabelTimezone};
use solar_telemetry::selection::SelectionState;

#[test]
fn subscription_message_matches_relay_shape() {
    let msg = ClientMessage::subscribe(&["A".to_string(), "B".to_string()]);
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        value,
        json!({ "type": "request_data", "payload": { "esp32_ids": ["A", "B"] } })
    );
}

#[test]
fn device_data_message_parses_batches() {
    let text = json!({
        "type": "device_data",
        "data": [
            { "esp32_id": "A", "metadata": { "InsertCount": 3 }, "data": [
                { "created_at": "2025-06-01T12:00:00Z", "voltage": 12.1 }
            ] },
            { "esp32_id": "B", "data": null }
        ]
    })
    .to_string();
    let ServerMessage::DeviceData(batches) = ServerMessage::parse(&text).unwrap() else {
        panic!("expected device_data");
    };
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].esp32_id, "A");
    assert_eq!(batches[0].samples().len(), 1);
    assert!(batches[1].samples().is_empty());
}

#[test]
fn unknown_type_and_status_replies_parse_without_error() {
    assert_eq!(
        ServerMessage::parse(r#"{"type":"ping"}"#).unwrap(),
        ServerMessage::Other("ping".into())
    );
    assert_eq!(
        ServerMessage::parse(r#"{"status":"accepted","message":"Data stored in memory"}"#)
            .unwrap(),
        ServerMessage::Status {
            status: "accepted".into(),
            message: "Data stored in memory".into()
        }
    );
}

#[test]
fn non_json_fails_to_parse() {
    assert!(ServerMessage::parse("<html>").is_err());
    assert!(ServerMessage::parse("[1, 2]").is_err());
}

#[test]
fn metric_keys_round_trip_through_field_names() {
    for m in Metric::ALL {
        assert_eq!(Metric::from_field(m.key()), Some(m));
        assert_eq!(serde_json::to_value(m).unwrap(), json!(m.key()));
    }
    assert_eq!(
        Metric::from_field("esp32_core_temperature"),
        Some(Metric::Esp32CoreTemp)
    );
    assert_eq!("humidity".parse::<Metric>().ok(), None);
}

#[test]
fn aggregated_point_serializes_metric_map() {
    let point = AggregatedPoint {
        bucket_key: BucketKey::from_timestamp(&at(12, 0, 0, 0)),
        representative_timestamp: at(12, 0, 0, 250),
        fields: [(Metric::Voltage, 12.0)].into_iter().collect(),
    };
    let value = serde_json::to_value(&point).unwrap();
    assert_eq!(value["bucketKey"], json!("2025-06-01T12:00:00"));
    assert_eq!(value["fields"]["voltage"], json!(12.0));
    let back: AggregatedPoint = serde_json::from_value(value).unwrap();
    assert_eq!(back, point);
}

#[test]
fn projection_serializes_with_state_tag() {
    let selection = SelectionState::new(vec!["A".into()], None, &[Metric::Voltage]);
    let waiting = project(&[], &selection, SurfaceSize::default(), LabelTimezone::Utc);
    assert_eq!(
        serde_json::to_value(&waiting).unwrap(),
        json!({ "state": "awaitingLayout" })
    );

    let chart = project(&[], &selection, SurfaceSize::new(10, 10), LabelTimezone::Utc);
    let value = serde_json::to_value(&chart).unwrap();
    assert_eq!(value["state"], json!("chart"));
    assert_eq!(value["deviceId"], json!("A"));
    assert_eq!(value["style"], json!("line"));
    assert_eq!(value["series"][0]["color"], json!("#1976d2"));
    let back: Projection = serde_json::from_value(value).unwrap();
    assert_eq!(back, chart);
}
