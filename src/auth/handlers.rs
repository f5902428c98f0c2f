use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, CurrentUser, LoginRequest, RefreshRequest, RegisterRequest,
            RegisterResponse, UpdateProfileRequest, UserInfo,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{ProfileChanges, User},
        services::{
            email_change, is_valid_username, issue_tokens, normalize_email, revoke,
            validate_password,
        },
    },
    error::{ApiError, ApiResult},
    response::{ApiResponse, Empty},
    state::AppState,
};

const BAD_CREDENTIALS: &str = "invalid username or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/user", get(get_current_user).put(update_current_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<ApiResponse<RegisterResponse>> {
    let username = payload.username.trim();
    if !is_valid_username(username) {
        warn!("invalid username");
        return Err(ApiError::bad_request(
            "username must be 3-32 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    validate_password(&payload.password)?;
    let email = normalize_email(payload.email)?;

    if User::find_by_username(&state.db, username).await?.is_some() {
        warn!("username already registered");
        return Err(ApiError::bad_request("username already exists"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, username, &hash, email.as_deref())
        .await?
        .ok_or_else(|| {
            warn!("username taken concurrently");
            ApiError::bad_request("username already exists")
        })?;

    info!(user_id = user.id, "user registered");
    Ok(ApiResponse::with_message(
        "registered",
        RegisterResponse {
            user_id: user.id.to_string(),
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let Some(user) = User::find_by_username(&state.db, payload.username.trim()).await? else {
        warn!("login unknown username");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }

    let keys = JwtKeys::from_ref(&state);
    let tokens = issue_tokens(&keys, user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(ApiResponse::with_message(
        "logged in",
        AuthResponse {
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user_info: UserInfo::from(&user),
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<ApiResponse<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthorized("invalid refresh token")
    })?;
    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("invalid refresh token"))?;

    // rotate: the presented refresh token is single-use, and only one request may claim it
    if !revoke(&state.db, &claims, user_id).await? {
        warn!(user_id, "revoked refresh token presented");
        return Err(ApiError::unauthorized("refresh token has been revoked"));
    }

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("user not found"))?;

    let tokens = issue_tokens(&keys, user.id)?;

    info!(user_id = user.id, "tokens refreshed");
    Ok(ApiResponse::ok(AuthResponse {
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user_info: UserInfo::from(&user),
    }))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.user_id))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<ApiResponse<Empty>> {
    revoke(&state.db, &auth.claims, auth.user_id).await?;

    if let Some(Json(req)) = body {
        let keys = JwtKeys::from_ref(&state);
        match keys.verify_refresh(&req.refresh_token) {
            Ok(claims) if claims.user_id() == Some(auth.user_id) => {
                revoke(&state.db, &claims, auth.user_id).await?;
            }
            Ok(_) => warn!("refresh token belongs to another user; ignored"),
            Err(e) => warn!(error = %e, "refresh token on logout not valid; ignored"),
        }
    }

    info!("user logged out");
    Ok(ApiResponse::with_message("logged out", Empty {}))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<ApiResponse<CurrentUser>> {
    let user = User::find_by_id(&state.db, auth.user_id).await?.ok_or_else(|| {
        error!("token subject has no user");
        ApiError::unauthorized("user not found")
    })?;
    Ok(ApiResponse::ok(CurrentUser::from(user)))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn update_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<CurrentUser>> {
    let changes = ProfileChanges {
        email: email_change(payload.email)?,
        avatar: payload.avatar,
        nickname: payload.nickname,
        phone: payload.phone,
        bio: payload.bio,
        location: payload.location,
        website: payload.website,
    };

    let user = User::update_profile(&state.db, auth.user_id, &changes)
        .await?
        .ok_or_else(|| ApiError::unauthorized("user not found"))?;

    info!("profile updated");
    Ok(ApiResponse::with_message("updated", CurrentUser::from(user)))
}
