use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use futures::{SinkExt, StreamExt};
use lockstep_core::{ChatNote, ClientMessage, NewVideo, ServerMessage, SyncAction, SyncEvent, UploadResponse};
use lockstep_server::{app_state::SharedState, routes::create_router, AppState, Config};
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const BOUNDARY: &str = "lockstep-test-boundary";

fn test_state() -> (SharedState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.media.upload_dir = dir.path().to_path_buf();
    (AppState::new(config), dir)
}

async fn spawn_server(state: SharedState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(lockstep_server::serve(listener, state));
    addr
}

async fn connect(addr: SocketAddr, name: &str) -> Client {
    let url = format!("ws://{}/ws?name={}", addr, name);
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();
    match recv(&mut ws).await {
        ServerMessage::Welcome { session_id } => assert!(!session_id.is_empty()),
        other => panic!("expected welcome, got {:?}", other),
    }
    ws
}

async fn send(ws: &mut Client, msg: ClientMessage) {
    ws.send(Message::Text(msg.to_text().unwrap())).await.unwrap();
}

async fn recv(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return ServerMessage::from_text(&text).unwrap();
        }
    }
}

fn multipart_request(field: &str, filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: video/mp4\r\n\r\n{content}\r\n--{b}--\r\n",
        b = BOUNDARY,
        field = field,
        filename = filename,
        content = content,
    );
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_video_event_relayed_to_others_only() {
    let (state, _dir) = test_state();
    let addr = spawn_server(state.clone()).await;

    let mut ana = connect(addr, "ana").await;
    let mut ben = connect(addr, "ben").await;

    let evt = SyncEvent::new(SyncAction::Pause, 12.3);
    send(&mut ana, ClientMessage::VideoEvent(evt)).await;
    send(&mut ana, ClientMessage::ChatMessage("hola".into())).await;

    // The bus is ordered: ana's first frame after the event is her own chat line.
    assert_eq!(recv(&mut ana).await, ServerMessage::ChatMessage("hola".into()));
    assert_eq!(recv(&mut ben).await, ServerMessage::VideoEvent(evt));
    assert_eq!(recv(&mut ben).await, ServerMessage::ChatMessage("hola".into()));

    assert_eq!(
        state.notes(),
        vec![ChatNote {
            author: "ana".into(),
            content: "hola".into()
        }]
    );
}

#[tokio::test]
async fn test_notes_endpoint_replays_history() {
    let (state, _dir) = test_state();
    state.record_note(ChatNote {
        author: "ben".into(),
        content: "first".into(),
    });
    state.record_note(ChatNote {
        author: "ana".into(),
        content: "second".into(),
    });

    let res = create_router(state)
        .oneshot(Request::get("/notes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let notes: Vec<ChatNote> = body_json(res.into_body()).await;
    let contents: Vec<_> = notes.iter().map(|n| n.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let (state, _dir) = test_state();

    let res = create_router(state)
        .oneshot(multipart_request("poster", "cover.png", "png"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: UploadResponse = body_json(res.into_body()).await;
    assert!(body.url.is_none());
    assert_eq!(body.error.as_deref(), Some("No file"));
}

#[tokio::test]
async fn test_upload_stores_announces_and_serves() {
    let (state, dir) = test_state();
    let mut bus = state.tx.subscribe();
    let app = create_router(state);

    let res = app
        .clone()
        .oneshot(multipart_request("video", "Movie Night.mp4", "not really a video"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: UploadResponse = body_json(res.into_body()).await;
    assert_eq!(body.url.as_deref(), Some("/uploads/Movie_Night.mp4"));

    let stored = std::fs::read_to_string(dir.path().join("Movie_Night.mp4")).unwrap();
    assert_eq!(stored, "not really a video");

    let relayed = bus.try_recv().unwrap();
    assert!(relayed.exclude.is_none());
    assert_eq!(
        relayed.message,
        ServerMessage::NewVideo(NewVideo {
            url: "/uploads/Movie_Night.mp4".into()
        })
    );

    let res = app
        .clone()
        .oneshot(Request::get("/uploads/Movie_Night.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"not really a video");

    let res = app
        .oneshot(Request::get("/uploads/missing.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_announcement_reaches_connected_peers() {
    let (state, _dir) = test_state();
    let addr = spawn_server(state.clone()).await;
    let mut ana = connect(addr, "ana").await;

    let res = create_router(state)
        .oneshot(multipart_request("video", "clip.mp4", "data"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(
        recv(&mut ana).await,
        ServerMessage::NewVideo(NewVideo {
            url: "/uploads/clip.mp4".into()
        })
    );
}

#[tokio::test]
async fn test_health_lists_connected_peers() {
    let (state, _dir) = test_state();
    let addr = spawn_server(state.clone()).await;

    let _ben = connect(addr, "ben").await;
    let _ana = connect(addr, "ana").await;

    let res = create_router(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok (2 peers: ana, ben)");
}
