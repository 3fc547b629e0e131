//! User administration view (administrators only).
//!
//! Every operation checks the role gate first, so a regular user is turned
//! away before any user request leaves the client.

use std::sync::Arc;

use parking_lot::Mutex;
use taskdesk_proto::query::{PageQuery, UserQuery, UserQueryPatch};
use taskdesk_proto::user::{Role, User, UserId};

use super::{Confirmation, ViewError};
use crate::api::TaskApi;
use crate::collection::CollectionState;
use crate::draft::UserDraft;
use crate::gate::require_admin;
use crate::session::SessionStore;
use crate::sync::{FetchOutcome, FetchTicket, QuerySync};

/// Controller behind the user roster.
pub struct UserAdminController<A> {
    api: Arc<A>,
    session: SessionStore,
    sync: QuerySync<UserQuery, User>,
    form_error: Mutex<Option<ViewError>>,
    alert: Mutex<Option<ViewError>>,
}

impl<A: TaskApi> UserAdminController<A> {
    /// Creates a controller listing `page_size` users per page.
    pub fn new(api: Arc<A>, session: SessionStore, page_size: u32) -> Self {
        Self::with_query(api, session, UserQuery::with_size(page_size))
    }

    /// Creates a controller starting from an explicit descriptor.
    pub fn with_query(api: Arc<A>, session: SessionStore, query: UserQuery) -> Self {
        Self {
            api,
            session,
            sync: QuerySync::new(query),
            form_error: Mutex::new(None),
            alert: Mutex::new(None),
        }
    }

    /// Current descriptor.
    pub fn query(&self) -> UserQuery {
        self.sync.query()
    }

    /// Snapshot of the roster state.
    pub fn state(&self) -> CollectionState<User> {
        self.sync.state()
    }

    /// Error shown in the create or edit form.
    pub fn form_error(&self) -> Option<ViewError> {
        self.form_error.lock().clone()
    }

    /// One-shot alert from the last failed delete.
    pub fn alert(&self) -> Option<ViewError> {
        self.alert.lock().clone()
    }

    /// Clears the alert once shown.
    pub fn dismiss_alert(&self) {
        *self.alert.lock() = None;
    }

    fn admin(&self) -> Result<User, ViewError> {
        require_admin(&self.session).map_err(|e| {
            tracing::warn!(error = %e, "user management refused");
            ViewError::from(e)
        })
    }

    /// Opens the view: checks the role, then loads the current page.
    ///
    /// # Errors
    ///
    /// [`ViewError::Access`] for non-admins, without any request.
    pub async fn open(&self) -> Result<FetchOutcome, ViewError> {
        self.admin()?;
        Ok(self.fetch(self.sync.begin_refresh()).await)
    }

    /// Moves to `page`.
    ///
    /// # Errors
    ///
    /// [`ViewError::Access`] for non-admins.
    pub async fn set_page(&self, page: u32) -> Result<FetchOutcome, ViewError> {
        self.admin()?;
        let ticket = self.sync.begin_with(|q| {
            q.set_page(page);
            true
        });
        Ok(match ticket {
            Some(ticket) => self.fetch(ticket).await,
            None => FetchOutcome::Skipped,
        })
    }

    /// Changes sort or page size; resets to page 0.
    ///
    /// # Errors
    ///
    /// [`ViewError::Access`] for non-admins.
    pub async fn set_sort(&self, patch: &UserQueryPatch) -> Result<FetchOutcome, ViewError> {
        self.admin()?;
        Ok(match self.sync.begin_with(|q| q.apply(patch)) {
            Some(ticket) => self.fetch(ticket).await,
            None => FetchOutcome::Skipped,
        })
    }

    async fn fetch(&self, ticket: FetchTicket<UserQuery>) -> FetchOutcome {
        let result = self.api.list_users(ticket.query()).await;
        self.sync.finish(&ticket, result)
    }

    async fn refresh(&self) {
        let _ = self.fetch(self.sync.begin_refresh()).await;
    }

    /// Creates a user. Email and password are required.
    ///
    /// # Errors
    ///
    /// [`ViewError::Access`], [`ViewError::Validation`] (nothing sent) or
    /// [`ViewError::Api`].
    pub async fn create_user(&self, draft: &UserDraft) -> Result<User, ViewError> {
        self.admin()?;
        *self.form_error.lock() = None;
        let body = draft.to_new_user().map_err(|e| self.reject(e.into()))?;
        let user = self
            .api
            .create_user(&body)
            .await
            .map_err(|e| self.reject(e.into()))?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        self.refresh().await;
        Ok(user)
    }

    /// Updates a user. A blank password leaves it unchanged. An admin
    /// cannot remove their own admin role.
    ///
    /// # Errors
    ///
    /// [`ViewError::Access`], [`ViewError::SelfManagement`],
    /// [`ViewError::Validation`] or [`ViewError::Api`].
    pub async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User, ViewError> {
        let me = self.admin()?;
        *self.form_error.lock() = None;
        if me.id == id && draft.role != Role::Admin {
            return Err(self.reject(ViewError::SelfManagement("demote")));
        }
        let body = draft.to_update().map_err(|e| self.reject(e.into()))?;
        let user = self
            .api
            .update_user(id, &body)
            .await
            .map_err(|e| self.reject(e.into()))?;
        tracing::info!(
            user_id = %user.id,
            password_changed = body.password.is_some(),
            "user updated"
        );
        self.refresh().await;
        Ok(user)
    }

    /// Deletes a user once confirmed. An admin cannot delete themselves.
    /// Failures are also raised as [`UserAdminController::alert`].
    ///
    /// # Errors
    ///
    /// [`ViewError::Access`], [`ViewError::SelfManagement`] or
    /// [`ViewError::Api`].
    pub async fn delete_user(&self, id: UserId, confirmation: Confirmation) -> Result<(), ViewError> {
        let me = self.admin()?;
        if me.id == id {
            return Err(self.raise(id, ViewError::SelfManagement("delete")));
        }
        if !confirmation.is_confirmed() {
            return Ok(());
        }
        *self.alert.lock() = None;
        if let Err(e) = self.api.delete_user(id).await {
            return Err(self.raise(id, e.into()));
        }
        tracing::info!(user_id = %id, "user deleted");
        self.refresh().await;
        Ok(())
    }

    fn raise(&self, id: UserId, error: ViewError) -> ViewError {
        tracing::warn!(user_id = %id, error = %error, "user delete failed");
        *self.alert.lock() = Some(error.clone());
        error
    }

    fn reject(&self, error: ViewError) -> ViewError {
        tracing::warn!(error = %error, "user form rejected");
        *self.form_error.lock() = Some(error.clone());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::api::loopback::{Call, Endpoint, LoopbackApi, Reply};
    use crate::gate::AccessError;
    use taskdesk_proto::auth::AuthResponse;
    use taskdesk_proto::page::Page;
    use taskdesk_proto::query::{SortDirection, UserSortField};

    fn signed_in(role: Role) -> SessionStore {
        let store = SessionStore::new();
        store.begin(&AuthResponse {
            token: "t".into(),
            email: "me@example.com".into(),
            role,
            id: UserId::new(1),
        });
        store
    }

    fn user(id: i64) -> User {
        User {
            id: UserId::new(id),
            email: format!("u{id}@example.com"),
            role: Role::User,
        }
    }

    fn users_page() -> Reply {
        Reply::Users(Page::slice(&[user(1), user(2)], 0, 10))
    }

    #[tokio::test]
    async fn non_admin_is_denied_before_any_request() {
        let api = Arc::new(LoopbackApi::new());
        let ctl = UserAdminController::new(api.clone(), signed_in(Role::User), 10);

        let err = ctl.open().await.unwrap_err();
        assert!(matches!(err, ViewError::Access(AccessError::AdminRequired)));
        assert!(ctl.create_user(&UserDraft::default()).await.is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn admin_opens_first_page_sorted_by_id() {
        let api = Arc::new(LoopbackApi::new());
        api.reply(Endpoint::ListUsers, Ok(users_page()));
        let ctl = UserAdminController::new(api.clone(), signed_in(Role::Admin), 10);

        assert_eq!(ctl.open().await.unwrap(), FetchOutcome::Applied);
        assert_eq!(ctl.state().items().len(), 2);
        let Some(Call::ListUsers(q)) = api.calls().first().cloned() else {
            panic!("expected list call");
        };
        assert_eq!(q.sort_by, UserSortField::Id);
        assert_eq!(q.sort_dir, SortDirection::Asc);
    }

    #[tokio::test]
    async fn create_requires_email_and_password() {
        let api = Arc::new(LoopbackApi::new());
        let ctl = UserAdminController::new(api.clone(), signed_in(Role::Admin), 10);
        let draft = UserDraft {
            email: "new@example.com".into(),
            ..UserDraft::default()
        };
        assert!(matches!(
            ctl.create_user(&draft).await,
            Err(ViewError::Validation(_))
        ));
        assert!(ctl.form_error().is_some());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_password_update_omits_field() {
        let api = Arc::new(LoopbackApi::new());
        api.reply(Endpoint::UpdateUser, Ok(Reply::User(user(2))));
        api.reply(Endpoint::ListUsers, Ok(users_page()));
        let ctl = UserAdminController::new(api.clone(), signed_in(Role::Admin), 10);

        let draft = UserDraft::from_user(&user(2));
        ctl.update_user(UserId::new(2), &draft).await.unwrap();
        match &api.calls()[0] {
            Call::UpdateUser { update, .. } => assert_eq!(update.password, None),
            other => panic!("unexpected call {other:?}"),
        }
        assert_eq!(api.call_count(Endpoint::ListUsers), 1);
    }

    #[tokio::test]
    async fn admin_cannot_delete_or_demote_self() {
        let api = Arc::new(LoopbackApi::new());
        let ctl = UserAdminController::new(api.clone(), signed_in(Role::Admin), 10);

        assert!(matches!(
            ctl.delete_user(UserId::new(1), Confirmation::Confirmed).await,
            Err(ViewError::SelfManagement("delete"))
        ));
        assert!(matches!(
            ctl.alert(),
            Some(ViewError::SelfManagement("delete"))
        ));
        let demote = UserDraft {
            email: "me@example.com".into(),
            password: String::new(),
            role: Role::User,
        };
        assert!(matches!(
            ctl.update_user(UserId::new(1), &demote).await,
            Err(ViewError::SelfManagement("demote"))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_roster() {
        let api = Arc::new(LoopbackApi::new());
        api.reply(Endpoint::ListUsers, Ok(users_page()));
        api.reply(Endpoint::DeleteUser, Err(ApiError::Network("down".into())));
        let ctl = UserAdminController::new(api.clone(), signed_in(Role::Admin), 10);
        let _ = ctl.open().await.unwrap();

        assert!(ctl
            .delete_user(UserId::new(2), Confirmation::Confirmed)
            .await
            .is_err());
        assert_eq!(ctl.state().items().len(), 2);
        assert_eq!(api.call_count(Endpoint::ListUsers), 1);
        assert!(matches!(
            ctl.alert(),
            Some(ViewError::Api(ApiError::Network(_)))
        ));
        ctl.dismiss_alert();
        assert!(ctl.alert().is_none());
    }
}
