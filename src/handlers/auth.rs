use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ApiJson, AppError, Result};
use crate::handlers::non_blank;
use crate::models::{CreateUser, LoginCredentials, User, UserSummary};
use crate::repositories::UserRepository;

#[derive(Clone)]
pub struct AuthState {
    pub user_repo: UserRepository,
}

pub async fn users_list(State(state): State<AuthState>) -> Result<Json<Vec<UserSummary>>> {
    let users = state.user_repo.list_summaries().await?;
    Ok(Json(users))
}

pub async fn register(
    State(state): State<AuthState>,
    ApiJson(form): ApiJson<CreateUser>,
) -> Result<Response> {
    let name = non_blank(form.name);
    let email = non_blank(form.email);
    let password = form.password.filter(|p| !p.is_empty());

    let (Some(name_value), Some(email_value), Some(password_value)) = (&name, &email, &password)
    else {
        return Err(AppError::missing(&[
            ("name", name.is_some()),
            ("email", email.is_some()),
            ("password", password.is_some()),
        ]));
    };

    let user = state
        .user_repo
        .create(name_value, email_value, password_value)
        .await?;
    tracing::info!("Registered user {} ({})", user.id, user.name);

    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn login(
    State(state): State<AuthState>,
    ApiJson(credentials): ApiJson<LoginCredentials>,
) -> Result<Json<User>> {
    let email = non_blank(credentials.email);
    let password = credentials.password.filter(|p| !p.is_empty());

    let (Some(email_value), Some(password_value)) = (&email, &password) else {
        return Err(AppError::missing(&[
            ("email", email.is_some()),
            ("password", password.is_some()),
        ]));
    };

    match state
        .user_repo
        .verify_password(email_value, password_value)
        .await?
    {
        Some(user) => {
            tracing::debug!("User {} logged in", user.id);
            Ok(Json(user))
        }
        None => Err(AppError::Unauthorized("Invalid credentials.".to_string())),
    }
}
