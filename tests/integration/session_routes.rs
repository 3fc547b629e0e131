//! Integration tests for sign-in, route guarding and navigation.
//!
//! Drives the real HTTP client against the reference server and checks
//! what each role may see before and after signing in.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdesk::api::http::HttpApiClient;
use taskdesk::api::{ApiError, TaskApi};
use taskdesk::controller::DashboardController;
use taskdesk::gate::{Route, RouteDecision, guard, nav_links};
use taskdesk::roster::load_assignees;
use taskdesk::session::{self, SessionError, SessionStore};
use taskdesk::sync::FetchOutcome;
use taskdesk_proto::query::TaskQuery;
use taskdesk_proto::user::Role;
use taskdesk_server::server::{self, AppState};
use taskdesk_server::store::TaskStore;

async fn start() -> (HttpApiClient, SessionStore, tokio::task::JoinHandle<()>) {
    let store = TaskStore::with_admin("admin@example.com", "admin").expect("seed admin");
    let state = Arc::new(AppState::with_config(1024 * 1024, store));
    let (addr, handle) = server::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");
    let sessions = SessionStore::new();
    let api = HttpApiClient::new(
        &format!("http://{addr}/api"),
        Duration::from_secs(5),
        sessions.clone(),
    )
    .expect("client");
    (api, sessions, handle)
}

#[tokio::test]
async fn signed_out_visitor_is_sent_to_login() {
    let (_api, sessions, _h) = start().await;

    for path in ["/dashboard", "/tasks", "/tasks/3", "/users"] {
        let route = Route::parse(path).unwrap();
        assert_eq!(
            guard(route, &sessions),
            RouteDecision::Redirect(Route::Login),
            "{path}"
        );
    }
    assert_eq!(
        guard(Route::Login, &sessions),
        RouteDecision::Render
    );
    assert_eq!(nav_links(&sessions), vec![Route::Login, Route::Register]);
}

#[tokio::test]
async fn admin_login_unlocks_user_management() {
    let (api, sessions, _h) = start().await;

    let user = session::login(&api, &sessions, "admin@example.com", "admin")
        .await
        .unwrap();
    assert_eq!(user.role, Role::Admin);
    assert_eq!(
        nav_links(&sessions),
        vec![Route::Dashboard, Route::Tasks, Route::Users]
    );
    assert_eq!(
        guard(Route::Login, &sessions),
        RouteDecision::Redirect(Route::Dashboard)
    );
    assert_eq!(guard(Route::Users, &sessions), RouteDecision::Render);

    let roster = load_assignees(&api, &user, 100).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].email, "admin@example.com");
}

#[tokio::test]
async fn registered_user_sees_tasks_but_no_roster() {
    let (api, sessions, _h) = start().await;

    let user = session::register(&api, &sessions, "new@example.com", "pw", None)
        .await
        .unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(nav_links(&sessions), vec![Route::Dashboard, Route::Tasks]);
    assert!(load_assignees(&api, &user, 100).await.unwrap().is_empty());

    let dashboard = DashboardController::new(Arc::new(api), 10);
    assert_eq!(dashboard.load().await, FetchOutcome::Applied);
    assert!(dashboard.state().items().is_empty());
}

#[tokio::test]
async fn wrong_password_leaves_visitor_signed_out() {
    let (api, sessions, _h) = start().await;

    let err = session::login(&api, &sessions, "admin@example.com", "nope")
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Api(ApiError::Unauthorized));
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn signing_out_drops_the_token() {
    let (api, sessions, _h) = start().await;
    session::login(&api, &sessions, "admin@example.com", "admin")
        .await
        .unwrap();
    assert!(api.list_tasks(&TaskQuery::with_size(10)).await.is_ok());

    sessions.end();
    assert!(matches!(
        api.list_tasks(&TaskQuery::with_size(10)).await,
        Err(ApiError::Unauthorized)
    ));
    assert_eq!(
        guard(Route::Tasks, &sessions),
        RouteDecision::Redirect(Route::Login)
    );
}
