//! Integration tests for user administration against the reference server.
//!
//! Covers the admin-only gate, password retention on update, self-management
//! refusals, and the knock-on effects of deleting a user.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskdesk::api::http::HttpApiClient;
use taskdesk::api::loopback::LoopbackApi;
use taskdesk::api::{ApiError, TaskApi};
use taskdesk::controller::{Confirmation, UserAdminController, ViewError};
use taskdesk::draft::UserDraft;
use taskdesk::gate::AccessError;
use taskdesk::session::{self, SessionError, SessionStore};
use taskdesk::sync::FetchOutcome;
use taskdesk_proto::auth::AuthResponse;
use taskdesk_proto::query::{SortDirection, UserQueryPatch, UserSortField};
use taskdesk_proto::user::{Role, UserId};
use taskdesk_server::server::{self, AppState};
use taskdesk_server::store::TaskStore;

struct Harness {
    base: String,
    _server: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        let store = TaskStore::with_admin("admin@example.com", "admin").expect("seed admin");
        let state = Arc::new(AppState::with_config(1024 * 1024, store));
        let (addr, handle) = server::start_server_with_state("127.0.0.1:0", state)
            .await
            .expect("failed to start server");
        Self {
            base: format!("http://{addr}/api"),
            _server: handle,
        }
    }

    fn client(&self) -> (Arc<HttpApiClient>, SessionStore) {
        let sessions = SessionStore::new();
        let api = HttpApiClient::new(&self.base, Duration::from_secs(5), sessions.clone())
            .expect("client");
        (Arc::new(api), sessions)
    }

    async fn admin(&self) -> UserAdminController<HttpApiClient> {
        let (api, sessions) = self.client();
        session::login(api.as_ref(), &sessions, "admin@example.com", "admin")
            .await
            .expect("admin login");
        UserAdminController::new(api, sessions, 10)
    }

    async fn can_login(&self, email: &str, password: &str) -> bool {
        let (api, sessions) = self.client();
        match session::login(api.as_ref(), &sessions, email, password).await {
            Ok(_) => true,
            Err(SessionError::Api(ApiError::Unauthorized)) => false,
            Err(other) => panic!("unexpected login failure: {other}"),
        }
    }
}

fn user_draft(email: &str, password: &str, role: Role) -> UserDraft {
    UserDraft {
        email: email.into(),
        password: password.into(),
        role,
    }
}

// =============================================================================
// Role gate
// =============================================================================

#[tokio::test]
async fn non_admin_is_denied_before_any_list_call() {
    let api = Arc::new(LoopbackApi::new());
    let sessions = SessionStore::new();
    sessions.begin(&AuthResponse {
        token: "t".into(),
        email: "user@example.com".into(),
        role: Role::User,
        id: UserId::new(7),
    });
    let ctl = UserAdminController::new(api.clone(), sessions, 10);

    assert!(matches!(
        ctl.open().await,
        Err(ViewError::Access(AccessError::AdminRequired))
    ));
    assert!(matches!(
        ctl.delete_user(UserId::new(1), Confirmation::Confirmed).await,
        Err(ViewError::Access(AccessError::AdminRequired))
    ));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn server_refuses_user_list_to_regular_users() {
    let harness = Harness::start().await;
    let (api, sessions) = harness.client();
    session::register(api.as_ref(), &sessions, "plain@example.com", "pw", None)
        .await
        .unwrap();

    let err = api
        .list_users(&taskdesk_proto::query::UserQuery::with_size(10))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

// =============================================================================
// Create / update
// =============================================================================

#[tokio::test]
async fn blank_password_keeps_old_one() {
    let harness = Harness::start().await;
    let ctl = harness.admin().await;

    let created = ctl
        .create_user(&user_draft("worker@example.com", "first", Role::User))
        .await
        .unwrap();
    assert!(harness.can_login("worker@example.com", "first").await);

    ctl.update_user(
        created.id,
        &user_draft("worker@example.com", "", Role::User),
    )
    .await
    .unwrap();
    assert!(harness.can_login("worker@example.com", "first").await);

    ctl.update_user(
        created.id,
        &user_draft("worker@example.com", "second", Role::User),
    )
    .await
    .unwrap();
    assert!(!harness.can_login("worker@example.com", "first").await);
    assert!(harness.can_login("worker@example.com", "second").await);
}

#[tokio::test]
async fn duplicate_email_surfaces_server_message() {
    let harness = Harness::start().await;
    let ctl = harness.admin().await;

    let err = ctl
        .create_user(&user_draft("ADMIN@example.com", "pw", Role::User))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Email already registered");
    assert!(ctl.form_error().is_some());
}

#[tokio::test]
async fn roster_sorts_by_email_descending() {
    let harness = Harness::start().await;
    let ctl = harness.admin().await;
    for email in ["bravo@example.com", "alpha@example.com", "zulu@example.com"] {
        ctl.create_user(&user_draft(email, "pw", Role::User))
            .await
            .unwrap();
    }

    let patch = UserQueryPatch::default().sort(UserSortField::Email, SortDirection::Desc);
    assert_eq!(ctl.set_sort(&patch).await.unwrap(), FetchOutcome::Applied);
    let emails: Vec<_> = ctl
        .state()
        .items()
        .iter()
        .map(|u| u.email.clone())
        .collect();
    assert_eq!(
        emails,
        [
            "zulu@example.com",
            "bravo@example.com",
            "alpha@example.com",
            "admin@example.com"
        ]
    );
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn admin_cannot_delete_self_on_live_server() {
    let harness = Harness::start().await;
    let ctl = harness.admin().await;
    assert_eq!(ctl.open().await.unwrap(), FetchOutcome::Applied);
    let me = ctl
        .state()
        .items()
        .iter()
        .find(|u| u.email == "admin@example.com")
        .map(|u| u.id)
        .unwrap();

    assert!(matches!(
        ctl.delete_user(me, Confirmation::Confirmed).await,
        Err(ViewError::SelfManagement("delete"))
    ));
    assert!(harness.can_login("admin@example.com", "admin").await);
}

#[tokio::test]
async fn deleted_user_can_no_longer_sign_in() {
    let harness = Harness::start().await;
    let ctl = harness.admin().await;
    let doomed = ctl
        .create_user(&user_draft("doomed@example.com", "pw", Role::User))
        .await
        .unwrap();

    ctl.delete_user(doomed.id, Confirmation::Declined)
        .await
        .unwrap();
    assert!(harness.can_login("doomed@example.com", "pw").await);

    ctl.delete_user(doomed.id, Confirmation::Confirmed)
        .await
        .unwrap();
    assert!(!harness.can_login("doomed@example.com", "pw").await);
    assert!(ctl.state().items().iter().all(|u| u.id != doomed.id));
}
