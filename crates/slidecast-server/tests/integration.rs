//! End-to-end tests using a real WebSocket client.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use slidecast_server::{ServerConfig, SlidecastServer};
use slidecast_slides::{PdftoppmRasterizer, SlideLibrary};
use slidecast_store::MemorySessionStore;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestServer {
    addr: std::net::SocketAddr,
    base: String,
    server: SlidecastServer,
    _dir: tempfile::TempDir,
}

/// Boot a test server on an ephemeral port.
async fn boot_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let library = SlideLibrary::new(dir.path().join("slides"), dir.path().join("uploads"));
    let rasterizer = PdftoppmRasterizer::new(library.clone(), "/nonexistent/pdftoppm", 150);
    let server = SlidecastServer::new(
        ServerConfig::default(), // port 0 = auto-assign
        Arc::new(MemorySessionStore::new()),
        library,
        Arc::new(rasterizer),
    );
    let (addr, _handle) = server.listen().await.unwrap();
    TestServer {
        addr,
        base: format!("ws://{addr}/ws"),
        server,
        _dir: dir,
    }
}

async fn connect(ts: &TestServer, query: &str) -> WsStream {
    let (ws, _) = connect_async(format!("{}?{query}", ts.base)).await.unwrap();
    ws
}

async fn send(ws: &mut WsStream, msg: Value) {
    ws.send(Message::text(msg.to_string())).await.unwrap();
}

/// Read the next text message as JSON.
async fn read_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for message")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Read until a close frame arrives and return its code.
async fn read_close_code(ws: &mut WsStream) -> u16 {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for close")
            .expect("stream ended without close frame")
            .expect("ws error");
        match msg {
            Message::Close(Some(frame)) => return u16::from(frame.code),
            Message::Close(None) => panic!("close frame without code"),
            _ => {}
        }
    }
}

/// Assert nothing arrives within a short window.
async fn assert_silent(ws: &mut WsStream) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(Duration::from_millis(200), ws.next()).await {
        panic!("unexpected frame: {text}");
    }
}

/// Presenter creates and starts `id`, consuming the start snapshot.
async fn start_session(ts: &TestServer, id: &str, slide_count: u32) -> WsStream {
    let mut presenter = connect(ts, "role=teacher&clientId=p1").await;
    send(
        &mut presenter,
        json!({
            "action": "createSession", "sessionId": id, "sessionName": "Algebra",
            "sessionDate": "2026-10-16", "sessionTime": "09:00", "pptFileNames": ["deck.pdf"],
            "slideCount": slide_count
        }),
    )
    .await;
    send(&mut presenter, json!({"action": "startSession", "sessionId": id})).await;
    let snapshot = read_json(&mut presenter).await;
    assert_eq!(snapshot["action"], "slideChange");
    assert_eq!(snapshot["slide"], 1);
    presenter
}

#[tokio::test]
async fn late_viewer_sees_current_slide() {
    let ts = boot_server().await;
    let mut presenter = start_session(&ts, "ABCD123", 10).await;

    send(&mut presenter, json!({"action": "slideChange", "slide": 5})).await;
    let echo = read_json(&mut presenter).await;
    assert_eq!(echo["clientId"], "p1");
    assert_eq!(echo["slide"], 5);

    let mut viewer = connect(&ts, "role=student&sessionId=ABCD123&clientId=v1").await;
    let expected = json!({"action": "slideChange", "sessionId": "ABCD123", "slide": 5, "slideCount": 10});
    assert_eq!(read_json(&mut viewer).await, expected);

    send(&mut viewer, json!({"action": "getInitialState"})).await;
    assert_eq!(read_json(&mut viewer).await, expected);
    assert_silent(&mut presenter).await;
}

#[tokio::test]
async fn late_viewer_sees_whiteboard() {
    let ts = boot_server().await;
    let mut presenter = start_session(&ts, "WB1", 4).await;
    let mut early = connect(&ts, "role=student&sessionId=WB1&clientId=v1").await;
    assert_eq!(read_json(&mut early).await["action"], "slideChange");

    send(&mut presenter, json!({"action": "whiteboardToggle", "enabled": true})).await;
    let stroke = json!({"points": [[0.1, 0.1], [0.4, 0.5], [0.8, 0.2]], "color": "#00FF00", "width": 3.0});
    send(&mut presenter, json!({"action": "whiteboardStroke", "stroke": stroke})).await;

    let toggle = read_json(&mut early).await;
    assert_eq!(toggle["action"], "whiteboardToggle");
    assert_eq!(toggle["enabled"], true);
    assert_eq!(toggle["slide"], 1);
    assert_eq!(toggle["slideCount"], 4);
    assert_eq!(read_json(&mut early).await["action"], "whiteboardClear");
    let live = read_json(&mut early).await;
    assert_eq!(live["action"], "whiteboardStroke");
    assert_eq!(live["stroke"], stroke);

    let mut late = connect(&ts, "role=student&sessionId=WB1&clientId=v2").await;
    assert_eq!(read_json(&mut late).await["action"], "slideChange");
    assert_eq!(
        read_json(&mut late).await,
        json!({"action": "whiteboardToggle", "sessionId": "WB1", "enabled": true})
    );
    assert_eq!(
        read_json(&mut late).await,
        json!({"action": "whiteboardState", "sessionId": "WB1", "strokes": [stroke]})
    );
}

#[tokio::test]
async fn browser_clients_connect_on_root_path() {
    let ts = boot_server().await;
    let _presenter = start_session(&ts, "ROOT1", 6).await;
    let url = format!("ws://{}/?role=student&sessionId=ROOT1&clientId=v1", ts.addr);
    let (mut viewer, _) = connect_async(url).await.unwrap();
    assert_eq!(
        read_json(&mut viewer).await,
        json!({"action": "slideChange", "sessionId": "ROOT1", "slide": 1, "slideCount": 6})
    );
}

#[tokio::test]
async fn chat_reaches_everyone_in_session_only() {
    let ts = boot_server().await;
    let mut presenter = start_session(&ts, "CHAT", 2).await;
    let mut other_presenter = start_session(&ts, "OTHER", 2).await;
    let mut viewer = connect(&ts, "role=student&sessionId=CHAT&clientId=v1").await;
    let _ = read_json(&mut viewer).await;

    send(&mut viewer, json!({"action": "chatMessage", "text": "question"})).await;
    let got = read_json(&mut presenter).await;
    assert_eq!(got["action"], "chatMessage");
    assert_eq!(got["text"], "question");
    assert_eq!(got["senderRole"], "student");
    assert!(got["timestamp"].is_i64());
    assert_silent(&mut other_presenter).await;
}

#[tokio::test]
async fn directory_lists_sessions_then_closes() {
    let ts = boot_server().await;
    let _presenter = start_session(&ts, "LIST1", 3).await;

    let mut dir = connect(&ts, "role=getSessions").await;
    let list = read_json(&mut dir).await;
    assert_eq!(list["action"], "sessionList");
    assert_eq!(list["sessions"]["LIST1"]["status"], "live");
    assert_eq!(list["sessions"]["LIST1"]["slideCount"], 3);
    assert_eq!(read_close_code(&mut dir).await, 1000);
}

#[tokio::test]
async fn viewer_rejected_from_missing_or_scheduled_session() {
    let ts = boot_server().await;
    let mut presenter = connect(&ts, "role=teacher&clientId=p1").await;
    send(
        &mut presenter,
        json!({
            "action": "createSession", "sessionId": "LATER", "sessionName": "Later",
            "sessionDate": "2026-10-17", "sessionTime": "10:00", "slideCount": 3
        }),
    )
    .await;
    // wait for the create to land
    for _ in 0..50 {
        let found = ts
            .server
            .lifecycle()
            .session(&slidecast_core::SessionId::from("LATER"))
            .await
            .unwrap();
        if found.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for query in ["role=student&sessionId=MISSING", "role=student&sessionId=LATER", "role=student", "role=admin"] {
        let mut ws = connect(&ts, query).await;
        assert_eq!(read_close_code(&mut ws).await, 1008, "{query}");
    }
}

#[tokio::test]
async fn ended_session_notifies_viewers() {
    let ts = boot_server().await;
    let mut presenter = start_session(&ts, "END1", 3).await;
    let mut viewer = connect(&ts, "role=student&sessionId=END1").await;
    let _ = read_json(&mut viewer).await;

    send(&mut presenter, json!({"action": "endSession", "sessionId": "END1"})).await;
    let ended = read_json(&mut viewer).await;
    assert_eq!(ended["action"], "sessionEnded");
    assert_eq!(ended["sessionId"], "END1");

    let mut late = connect(&ts, "role=student&sessionId=END1").await;
    assert_eq!(read_close_code(&mut late).await, 1008);
}

#[tokio::test]
async fn malformed_frames_keep_connection_open() {
    let ts = boot_server().await;
    let mut presenter = start_session(&ts, "BAD1", 3).await;
    presenter.send(Message::text("not json")).await.unwrap();
    send(&mut presenter, json!({"action": "danceParty"})).await;
    send(&mut presenter, json!({"action": "slideChange", "slide": 99})).await;
    send(&mut presenter, json!({"action": "slideChange", "slide": 2})).await;
    let got = read_json(&mut presenter).await;
    assert_eq!(got["slide"], 2);
}

#[tokio::test]
async fn shutdown_closes_sockets_going_away() {
    let ts = boot_server().await;
    let mut presenter = start_session(&ts, "BYE", 2).await;
    ts.server.shutdown().shutdown();
    assert_eq!(read_close_code(&mut presenter).await, 1001);
}
