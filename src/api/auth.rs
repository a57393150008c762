use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::db::models::user::User;
use crate::utils::api_response::ApiResponse;

/// Represents a request to register a new user.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// User password
    pub password: String,
}

/// Represents a successful user registration response
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
}

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// The username of the authenticated user.
    pub username: String,
    /// The role assigned to the user ("user" or "staff")
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    /// Converts `sub` (user ID) to `i32`, or returns a descriptive error.
    pub fn user_id(&self) -> Result<i32, ApiResponse<()>> {
        self.sub.parse::<i32>().map_err(|_| {
            ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "Invalid user ID format in token",
                None,
            )
        })
    }

    pub fn is_staff(&self) -> bool {
        self.role == "staff"
    }
}

/// Represents a request to log in
#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Represents a successful login response returning a JWT token.
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

/// Handles user registration.
///
/// # Returns
/// * `201 Created` - If registration is successful.
/// * `400 Bad Request` - If username or password is missing/blank.
/// * `409 Conflict` - If the username is already taken.
/// * `500 Internal Server Error` - If a database error occurs.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Authentication",
    responses(
        (status = 201, description = "Successful register", body = RegisterResponse),
        (status = 400, description = "Missing registration fields"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<RegisterResponse>, ApiResponse<()>> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiResponse::validation(
            "Username and password are required",
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let result = sqlx::query("INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3)")
        .bind(payload.username.trim())
        .bind(&password_hash)
        .bind("user")
        .execute(&pool)
        .await;

    match result {
        Ok(_) => Ok(ApiResponse::success(
            StatusCode::CREATED,
            "User registered",
            RegisterResponse {
                message: "User registered".into(),
            },
        )),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                    return Err(ApiResponse::<()>::error(
                        StatusCode::CONFLICT,
                        "Username already taken",
                        None,
                    ));
                }
            }
            Err(ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error",
                Some(json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// Handles user login.
///
/// # Returns
/// * `200 OK` - Returns a JWT token if authentication is successful.
/// * `401 Unauthorized` - If credentials are incorrect.
/// * `500 Internal Server Error` - If a database or token generation error occurs.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(
        content = LoginRequest,
        description = "User login details",
    ),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid username or password"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiResponse<()>> {
    let config = Config::get();

    let user: Option<User> = sqlx::query_as(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let Some(user) = user else {
        warn!("❌ Login attempt for non-existent user: {}", payload.username);
        return Err(ApiResponse::<()>::error(
            StatusCode::UNAUTHORIZED,
            "Invalid username or password.",
            None,
        ));
    };

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {
            let claims = Claims {
                sub: user.id.to_string(),
                username: user.username.clone(),
                role: user.role.clone(),
                exp: chrono::Utc::now().timestamp() as usize + 36000, // 10 hour expiration
            };
            let token = encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            )
            .map_err(|e| {
                ApiResponse::<()>::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Token generation failed",
                    Some(json!({ "error": e.to_string() })),
                )
            })?;

            info!("✅ Login successful for user: {}", user.username);
            Ok(Json(LoginResponse {
                token,
                role: user.role,
            }))
        }
        Ok(false) => {
            warn!("❌ Invalid password attempt for user: {}", payload.username);
            Err(ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password.",
                None,
            ))
        }
        Err(e) => Err(ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password verification error",
            Some(json!({ "error": e.to_string() })),
        )),
    }
}

/// Registers the public authentication routes for the API.
///
/// # Routes
/// - `POST /auth/register` → Register a new user.
/// - `POST /auth/login` → Authenticate a user and return a JWT token.
pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;
use utoipa::OpenApi;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login, register),
    components(
        schemas(LoginRequest, LoginResponse, RegisterRequest, RegisterResponse)
    ),
    tags(
        (name = "Authentication", description = "User Auth Endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;
