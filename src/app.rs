//! The application: route handlers and the assembled chain.
//!
//! | Route | Behaviour |
//! |---|---|
//! | `GET /connect` | connect view; redirects to `/` when already signed in |
//! | `GET /syncError` | always forwards `MUST_CONNECT` |
//! | `GET /getGame/{userId}` | the owner's game; 420 / 404 / 403 otherwise |
//!
//! For `/getGame`, the checks run in a fixed order: anonymous callers are
//! stopped first (so nothing about the resource leaks), then a missing game
//! passes through to the 404 fallback, and only an existing game is compared
//! against the caller.

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::fault::{ApplicationError, Failure};
use crate::game::GameStore;
use crate::identity::UserDirectory;
use crate::kind::{ErrorRegistry, MUST_CONNECT, OPERATION_FORBIDDEN};
use crate::middleware::auth::Authenticate;
use crate::middleware::session::SessionCookie;
use crate::middleware::{Chain, Outcome};
use crate::reporter::ErrorHandler;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::telemetry::TelemetrySink;

/// External collaborators the application needs.
#[derive(Clone)]
pub struct Services {
    pub directory: Arc<dyn UserDirectory>,
    pub games: Arc<dyn GameStore>,
    pub sink: Arc<dyn TelemetrySink>,
}

/// Session → auth → routes, with the standard error registry.
pub fn build(config: &Config, services: Services) -> Result<Chain, Error> {
    let errors = ErrorHandler::new(
        Arc::new(ErrorRegistry::standard()?),
        services.sink,
        config.telemetry.clone(),
    );

    Ok(Chain::new(errors)
        .stage(SessionCookie::new(config.session_cookie.clone()))
        .stage(Authenticate::new(services.directory))
        .stage(routes(services.games)))
}

pub fn routes(games: Arc<dyn GameStore>) -> Router {
    Router::new()
        .get("/connect", connect)
        .get("/syncError", sync_error)
        .get("/getGame/{userId}", move |req| get_game(Arc::clone(&games), req))
}

async fn connect(req: Request) -> Response {
    if req.me().is_some() {
        return Response::redirect("/");
    }

    let mut view = req.ctx().locals().clone();
    view.insert("head".to_owned(), Value::from("connect"));
    view.insert("redirect".to_owned(), req.query("redirect").map_or(Value::Null, Value::from));
    view.insert("connect".to_owned(), Value::from(1));
    Response::to_json(&Value::Object(view))
}

async fn sync_error(_req: Request) -> Result<Response, Failure> {
    Err(Failure::from(MUST_CONNECT))
}

async fn get_game(games: Arc<dyn GameStore>, req: Request) -> Result<Outcome, Failure> {
    let Some(me) = req.me() else {
        return Err(Failure::from(MUST_CONNECT));
    };
    let user_id = req.param("userId").unwrap_or_default();

    let Some(game) = games.find_by_owner(user_id).await? else {
        return Ok(Outcome::Continue);
    };

    if me.id != user_id {
        return Err(ApplicationError::with_message(
            OPERATION_FORBIDDEN,
            format!("user {} asked for the game of {}", me.id, game.owner_id),
        )
        .into());
    }

    Ok(Outcome::Respond(Response::to_json(&game)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, MemoryGameStore};
    use crate::identity::UserIdentity;
    use crate::method::Method;
    use crate::middleware::Stage;

    fn store() -> Arc<dyn GameStore> {
        Arc::new(MemoryGameStore::new().with_game(Game {
            owner_id: "u1".to_owned(),
            name: "first".to_owned(),
            turn: 3,
        }))
    }

    fn as_user(id: &str, target: &str) -> Request {
        let mut req = Request::new(Method::Get, target);
        req.ctx_mut().set_me(UserIdentity::new(id, format!("{id}-handle"), format!("{id}@example.com")));
        req
    }

    async fn run(mut req: Request) -> Outcome {
        routes(store()).call(&mut req).await
    }

    #[tokio::test]
    async fn get_game_checks_in_order() {
        match run(Request::new(Method::Get, "/getGame/nobody")).await {
            Outcome::Fail(f) => assert_eq!(f.kind(), Some(&MUST_CONNECT)),
            other => panic!("anonymous: {other:?}"),
        }

        assert!(matches!(run(as_user("u2", "/getGame/nobody")).await, Outcome::Continue));

        match run(as_user("u2", "/getGame/u1")).await {
            Outcome::Fail(f) => assert_eq!(f.kind(), Some(&OPERATION_FORBIDDEN)),
            other => panic!("stranger: {other:?}"),
        }

        match run(as_user("u1", "/getGame/u1")).await {
            Outcome::Respond(res) => {
                assert_eq!(res.status_code(), 200);
                let game: Game = serde_json::from_slice(res.body()).unwrap();
                assert_eq!(game.turn, 3);
            }
            other => panic!("owner: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_redirects_signed_in_users() {
        match run(as_user("u1", "/connect")).await {
            Outcome::Respond(res) => {
                assert_eq!(res.status_code(), 302);
                assert_eq!(res.header("location"), Some("/"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_renders_the_view_for_anonymous_users() {
        let mut req = Request::new(Method::Get, "/connect?redirect=/getGame/u1");
        req.ctx_mut().insert_local("lang", "en");

        match run(req).await {
            Outcome::Respond(res) => {
                let view: Value = serde_json::from_slice(res.body()).unwrap();
                assert_eq!(view["head"], "connect");
                assert_eq!(view["connect"], 1);
                assert_eq!(view["redirect"], "/getGame/u1");
                assert_eq!(view["lang"], "en");
            }
            other => panic!("{other:?}"),
        }
    }
}
