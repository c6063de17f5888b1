use std::time::Duration;

use axum::http::StatusCode;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use camstep_embedded::{DeviceConfig, Direction, MotorId, MotorStatus};
use serde_json::json;

mod common;
use common::mock_app::{INDEX_PAGE, MockApp};

#[tokio::test]
async fn test_start_motor_replies_with_effective_duration() {
    let app = MockApp::new();

    let response = app.get("/motor1/cw/10").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "电机1顺时针转动10秒");
    assert_eq!(
        response.headers[CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let response = app.get("/motor2/ccw?t=0").await;
    assert_eq!(response.body, "电机2逆时针转动5秒");

    let response = app.get("/motor2/ccw/abc").await;
    assert_eq!(response.body, "电机2逆时针转动5秒");

    let status = app
        .device
        .with_bank(|bank, _| (bank.status(MotorId::One), bank.status(MotorId::Two)))
        .unwrap();
    assert_eq!(status.0, MotorStatus::Running(Direction::Clockwise));
    assert_eq!(status.1, MotorStatus::Running(Direction::CounterClockwise));
}

#[tokio::test]
async fn test_status_document() {
    let app = MockApp::new();
    assert_eq!(app.status().await, json!({"motor1": "停止", "motor2": "停止"}));

    let response = app.get("/both/ccw/cw/3").await;
    assert_eq!(response.body, "双电机已启动运行3秒");

    let response = app.get("/status").await;
    assert_eq!(response.headers[CONTENT_TYPE], "application/json");
    assert_eq!(response.body, r#"{"motor1":"逆时针","motor2":"顺时针"}"#);

    let response = app.get("/stop/all").await;
    assert_eq!(response.body, "所有电机已停止");
    assert_eq!(app.status().await, json!({"motor1": "停止", "motor2": "停止"}));
}

#[tokio::test]
async fn test_both_query_form_and_single_stop() {
    let app = MockApp::new();

    let response = app.get("/both?d1=ccw&t=4").await;
    assert_eq!(response.body, "双电机已启动运行4秒");
    assert_eq!(app.status().await, json!({"motor1": "逆时针", "motor2": "顺时针"}));

    let response = app.get("/motor1/stop").await;
    assert_eq!(response.body, "电机1已停止");
    assert_eq!(app.status().await, json!({"motor1": "停止", "motor2": "顺时针"}));
}

#[tokio::test]
async fn test_set_speed_echoes_request() {
    let app = MockApp::new();

    let response = app.get("/set/speed/500").await;
    assert_eq!(response.body, "速度已设置为: 500");

    let interval = app.device.with_bank(|bank, _| bank.step_interval()).unwrap();
    assert_eq!(interval, 500);
}

#[tokio::test]
async fn test_unknown_routes_are_not_found() {
    let app = MockApp::new();

    for uri in ["/motor3/cw/5", "/stop", "/set/speed", "/favicon.ico"] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_cors_headers_on_every_response() {
    let app = MockApp::new();

    for uri in ["/status", "/motor1/stop", "/nowhere"] {
        let response = app.get(uri).await;
        assert_eq!(response.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers["access-control-allow-methods"],
            "GET, POST, OPTIONS"
        );
        assert_eq!(response.headers["access-control-allow-headers"], "Content-Type");
    }
}

#[tokio::test]
async fn test_index_page() {
    let app = MockApp::new();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(response.body, INDEX_PAGE);
}

#[tokio::test]
async fn test_missing_index_page_is_not_found() {
    let app = MockApp::new();
    std::fs::remove_file(app.dir.join("index.html")).unwrap();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reboot_reply() {
    let app = MockApp::new();

    let response = app.get("/reboot").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "系统将在3秒后重启...");
}

#[tokio::test]
async fn test_reboot_restores_boot_state() {
    let app = MockApp::with_config(DeviceConfig {
        reboot_delay_ms: 50,
        ..Default::default()
    });
    app.get("/set/speed/250").await;
    app.get("/motor1/ccw/30").await;

    app.get("/reboot").await;
    assert_eq!(app.status().await["motor1"], "逆时针");

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(app.status().await, json!({"motor1": "停止", "motor2": "停止"}));
    let interval = app.device.with_bank(|bank, _| bank.step_interval()).unwrap();
    assert_eq!(interval, 1000);
}
