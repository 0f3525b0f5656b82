pub mod create;
pub mod get;
pub mod list;
pub mod me;
pub mod profile;
pub mod set_password;
pub mod subscribe;
pub mod subscriptions;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/users endpoints (mounted at /api/users)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_users).post(create::create_user))
        .route("/me", get(me::me))
        .route("/set_password", post(set_password::set_password))
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route("/{id}", get(get::get_user))
        .route(
            "/{id}/subscribe",
            post(subscribe::subscribe).delete(subscribe::unsubscribe),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list::list_users,
        create::create_user,
        me::me,
        set_password::set_password,
        subscriptions::list_subscriptions,
        get::get_user,
        subscribe::subscribe,
        subscribe::unsubscribe,
    ),
    components(schemas(
        create::CreateUserRequest,
        set_password::SetPasswordRequest,
        list::UsersResponse,
        subscriptions::SubscriptionsResponse,
        profile::UserProfile,
        profile::SubscriptionProfile,
    ))
)]
pub struct ApiDoc;
