//! End-to-end session tests against a mocked backend.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    routing::get,
    Router,
};
use mockito::Matcher;
use parley_core::channel::HttpTransport;
use parley_core::{
    AgentDirectory, AgentId, ClientConfig, ConversationSession, Sender, SessionStatus,
    TransportMode,
};
use serde_json::json;

fn session_for(server: &mockito::Server) -> Arc<ConversationSession> {
    let config = ClientConfig::new(&server.url()).unwrap();
    ConversationSession::start(config).unwrap()
}

#[tokio::test]
async fn auto_route_posts_to_main_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/main_query")
        .match_body(Matcher::Json(json!({"query": "fever and cough"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":"Drink water"}"#)
        .create_async()
        .await;

    let session = session_for(&server);
    session.submit("fever and cough").await;

    mock.assert_async().await;
    let log = session.messages();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].text(), "Drink water");
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn pinned_agent_posts_to_ask_with_topic() {
    let mut server = mockito::Server::new_async().await;
    let ask = server
        .mock("POST", "/ask")
        .match_body(Matcher::Json(
            json!({"user_query": "how do I save?", "topic": "finance_agent"}),
        ))
        .with_status(200)
        .with_body(r#"{"response":{"data":"Pay yourself first"}}"#)
        .create_async()
        .await;
    let main_query = server
        .mock("POST", "/main_query")
        .expect(0)
        .create_async()
        .await;

    let session = session_for(&server);
    session.set_routing_preference(Some(AgentId::from("finance_agent")));
    let reply = session.submit("how do I save?").await.unwrap();

    ask.assert_async().await;
    main_query.assert_async().await;
    assert_eq!(reply.text(), "Pay yourself first");
}

#[tokio::test]
async fn server_error_becomes_agent_entry() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/main_query")
        .with_status(500)
        .create_async()
        .await;

    let session = session_for(&server);
    session.submit("hello").await;

    let log = session.messages();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].sender(), Sender::Agent);
    assert!(log[1].text().contains("500"));
    assert_eq!(session.status(), SessionStatus::Error);
}

#[tokio::test]
async fn legacy_route_posts_tool_run() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tools/healthcare_agent/run")
        .match_body(Matcher::Json(
            json!({"command": "suggest_advice", "params": {"symptom": "headache"}}),
        ))
        .with_status(200)
        .with_body(r#"{"success":true,"data":"Rest and hydrate","agent":"healthcare_agent"}"#)
        .create_async()
        .await;

    let mut config = ClientConfig::new(&server.url()).unwrap();
    config.route_style = parley_core::RouteStyle::LegacyTool;
    let session = ConversationSession::start(config).unwrap();

    let reply = session.submit("headache").await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply.text(), "Rest and hydrate");
}

#[tokio::test]
async fn refresh_agents_reports_progress_and_result() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(
            json!({"components": {
                "finance_agent": {"status": "healthy"},
                "law_agent": {"status": "unhealthy"}
            }})
            .to_string(),
        )
        .create_async()
        .await;

    let config = Arc::new(ClientConfig::new(&server.url()).unwrap());
    let directory = AgentDirectory::new(HttpTransport::new(Arc::clone(&config)).unwrap());
    let session = ConversationSession::start((*config).clone()).unwrap();
    let mut events = session.subscribe();

    let agents = session.refresh_agents(&directory).await;

    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].label, "Finance");
    assert_eq!(session.status(), SessionStatus::Idle);

    let first = events.recv().await.unwrap();
    assert!(matches!(
        first,
        parley_core::SessionEvent::StatusChanged {
            status: SessionStatus::AwaitingAgentList,
            ..
        }
    ));
}

async fn push_two(mut socket: WebSocket) {
    for frame in [r#"{"data":"pushed one"}"#, r#"{"data":{"data":"pushed two"}}"#] {
        if socket.send(WsMessage::Text(frame.into())).await.is_err() {
            return;
        }
    }
    let _ = socket.send(WsMessage::Close(None)).await;
}

#[tokio::test]
async fn duplex_pushes_are_appended() {
    let app = Router::new().route(
        "/ws",
        get(|ws: WebSocketUpgrade| async move { ws.on_upgrade(push_two) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = ClientConfig::new(&format!("http://{addr}")).unwrap();
    config.transport = TransportMode::Duplex;
    let session = ConversationSession::start(config).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while session.status() != SessionStatus::Disconnected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("duplex channel should close");

    let texts: Vec<String> = session
        .messages()
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(texts, vec!["pushed one", "pushed two"]);
    assert!(session
        .messages()
        .iter()
        .all(|m| m.sender() == Sender::Agent));
}
