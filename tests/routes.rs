use std::sync::Arc;

use warden::game::{Game, MemoryGameStore};
use warden::identity::{MemoryDirectory, UserIdentity};
use warden::kind::{ErrorRegistry, Severity};
use warden::middleware::Chain;
use warden::telemetry::{RecordingSink, TelemetrySink};
use warden::{ApplicationError, Config, Failure, Method, Request, Router, app};

struct Fixture {
    chain: Chain,
    sink: Arc<RecordingSink>,
    directory: Arc<MemoryDirectory>,
    games: Arc<MemoryGameStore>,
}

fn fixture_with(sink: Arc<RecordingSink>) -> Fixture {
    let directory = Arc::new(
        MemoryDirectory::new()
            .with_user(UserIdentity::new("u1", "alice", "alice@example.com"))
            .with_user(UserIdentity::new("u2", "bob", "bob@example.com")),
    );
    let games = Arc::new(MemoryGameStore::new().with_game(Game {
        owner_id: "u1".to_owned(),
        name: "alice's game".to_owned(),
        turn: 12,
    }));

    let config = Config::from_lookup(|_| None).unwrap();
    let chain = app::build(&config, app::Services {
        directory: directory.clone(),
        games: games.clone(),
        sink: sink.clone() as Arc<dyn TelemetrySink>,
    })
    .unwrap();

    Fixture { chain, sink, directory, games }
}

fn fixture() -> Fixture {
    fixture_with(Arc::new(RecordingSink::new()))
}

fn get(target: &str, session: Option<&str>) -> Request {
    let req = Request::new(Method::Get, target);
    match session {
        Some(user) => req.with_header("cookie", &format!("session={user}")),
        None => req,
    }
}

#[tokio::test]
async fn anonymous_get_game_is_must_connect_whether_or_not_the_game_exists() {
    let f = fixture();

    for target in ["/getGame/u1", "/getGame/nobody"] {
        let res = f.chain.handle(get(target, None)).await;
        assert_eq!(res.status_code(), 420, "{target}");
        assert!(res.body().is_empty());
    }

    let events = f.sink.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == Some("MUST_CONNECT") && e.user.is_none()));
}

#[tokio::test]
async fn missing_game_is_404_for_any_signed_in_caller() {
    let f = fixture();

    for session in ["alice", "bob"] {
        let res = f.chain.handle(get("/getGame/nobody", Some(session))).await;
        assert_eq!(res.status_code(), 404, "{session}");
        assert!(res.body().is_empty());
    }

    // Pass-through to the fallback is not an error.
    assert!(f.sink.events().is_empty());
}

#[tokio::test]
async fn someone_elses_game_is_403_and_reported_as_a_warning() {
    let f = fixture();

    let res = f.chain.handle(get("/getGame/u1", Some("bob"))).await;
    assert_eq!(res.status_code(), 403);
    assert!(res.body().is_empty());

    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, Severity::Warning);
    assert_eq!(events[0].kind, Some("OPERATION_FORBIDDEN"));
    let user = events[0].user.as_ref().unwrap();
    assert_eq!(user.id, "u2");
    assert_eq!(user.username, "bob");
    assert_eq!(user.email, "bob@example.com");

    let location = events[0].location.as_deref().unwrap();
    assert!(location.contains("app.rs:"), "{location}");
}

#[tokio::test]
async fn own_game_is_returned() {
    let f = fixture();

    let res = f.chain.handle(get("/getGame/u1", Some("alice"))).await;
    assert_eq!(res.status_code(), 200);
    let game: Game = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(game.owner_id, "u1");
    assert_eq!(game.turn, 12);
    assert!(f.sink.events().is_empty());
}

#[tokio::test]
async fn sync_error_is_always_420() {
    let f = fixture();

    for session in [None, Some("alice"), Some("ghost")] {
        let res = f.chain.handle(get("/syncError", session)).await;
        assert_eq!(res.status_code(), 420, "{session:?}");
        assert!(res.body().is_empty());
    }

    let events = f.sink.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.severity == Severity::Error));
    assert!(events[0].user.is_none());
    assert_eq!(events[1].user.as_ref().unwrap().username, "alice");
    assert!(events[2].user.is_none());
}

#[tokio::test]
async fn stale_session_is_treated_as_anonymous() {
    let f = fixture();

    let res = f.chain.handle(get("/getGame/u1", Some("ghost"))).await;
    assert_eq!(res.status_code(), 420);

    let res = f.chain.handle(get("/connect", Some("ghost"))).await;
    assert_eq!(res.status_code(), 200);
}

#[tokio::test]
async fn connect_redirects_when_signed_in() {
    let f = fixture();

    let res = f.chain.handle(get("/connect", Some("alice"))).await;
    assert_eq!(res.status_code(), 302);
    assert_eq!(res.header("location"), Some("/"));

    let res = f.chain.handle(get("/connect?redirect=/getGame/u1", None)).await;
    assert_eq!(res.status_code(), 200);
    let view: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(view["connect"], 1);
    assert_eq!(view["redirect"], "/getGame/u1");
}

#[tokio::test]
async fn unmatched_routes_are_bare_404s() {
    let f = fixture();

    for req in [get("/nope", None), get("/getGame", Some("alice")), Request::new(Method::Post, "/syncError")] {
        let res = f.chain.handle(req).await;
        assert_eq!(res.status_code(), 404);
        assert!(res.body().is_empty());
    }
    assert!(f.sink.events().is_empty());
}

#[tokio::test]
async fn repeated_requests_yield_the_same_status() {
    let f = fixture();
    let cases = [
        ("/getGame/u1", None),
        ("/getGame/u1", Some("alice")),
        ("/getGame/u1", Some("bob")),
        ("/getGame/nobody", Some("bob")),
        ("/syncError", Some("alice")),
        ("/connect", None),
    ];

    for (target, session) in cases {
        let first = f.chain.handle(get(target, session)).await.status_code();
        let second = f.chain.handle(get(target, session)).await.status_code();
        assert_eq!(first, second, "{target} {session:?}");
    }
}

#[tokio::test]
async fn directory_fault_is_an_unexpected_500() {
    let f = fixture();
    f.directory.set_offline(true);

    let res = f.chain.handle(get("/getGame/u1", Some("alice"))).await;
    assert_eq!(res.status_code(), 500);
    assert!(res.body().is_empty());

    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].severity, Severity::Error);
    assert!(events[0].kind.is_none());
    assert!(events[0].causes[0].contains("directory offline"));

    // No session, no lookup, no fault.
    let res = f.chain.handle(get("/connect", None)).await;
    assert_eq!(res.status_code(), 200);
}

#[tokio::test]
async fn game_store_fault_is_an_unexpected_500_attributed_to_the_caller() {
    let f = fixture();
    f.games.set_offline(true);

    let res = f.chain.handle(get("/getGame/u1", Some("alice"))).await;
    assert_eq!(res.status_code(), 500);
    assert!(res.body().is_empty());

    let events = f.sink.events();
    assert_eq!(events[0].user.as_ref().unwrap().id, "u1");
    assert!(events[0].causes[0].contains("game store offline"));
}

#[tokio::test]
async fn failing_telemetry_does_not_block_the_response() {
    let f = fixture_with(Arc::new(RecordingSink::failing()));

    assert_eq!(f.chain.handle(get("/syncError", None)).await.status_code(), 420);
    assert_eq!(f.chain.handle(get("/getGame/u1", Some("bob"))).await.status_code(), 403);
    f.games.set_offline(true);
    assert_eq!(f.chain.handle(get("/getGame/u1", Some("alice"))).await.status_code(), 500);
    assert_eq!(f.sink.events().len(), 3);
}

#[tokio::test]
async fn every_registered_kind_surfaces_its_status_through_the_chain() {
    for kind in ErrorRegistry::standard().unwrap().iter().copied() {
        let sink = Arc::new(RecordingSink::new());
        let errors = warden::ErrorHandler::new(
            Arc::new(ErrorRegistry::standard().unwrap()),
            sink.clone(),
            Default::default(),
        );
        let router = Router::new().get("/raise", move |_req: Request| async move {
            Err::<warden::Response, Failure>(ApplicationError::with_message(kind, "raised in test").into())
        });
        let chain = Chain::new(errors).stage(router);

        let res = chain.handle(Request::new(Method::Get, "/raise")).await;
        assert_eq!(res.status_code(), kind.status(), "{kind}");
        assert!(res.body().is_empty());

        let events = sink.events();
        assert_eq!(events[0].kind, Some(kind.name()));
        assert_eq!(events[0].severity, kind.severity());
        assert_eq!(events[0].message, format!("{} - raised in test", kind.status()));
    }
}
