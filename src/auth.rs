#![cfg(feature = "web")]
#![cfg(not(tarpaulin_include))]

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// A registered application user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    /// Username (unique identifier for the user)
    pub username: String,

    /// Email address shown in the account dropdown
    pub email: String,

    /// Argon2 hash of the user's password
    pub password_hash: String,
}

/// Credential data for login and registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,

    /// Optional for login, required for registration
    #[serde(default)]
    pub email: String,

    /// Password in plaintext (only transmitted, never stored)
    pub password: String,
}

/// An authenticated user session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub expires_at: SystemTime,
}

lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

// Constants
const USERS_FILE: &str = "database/users.json";
const DATABASE_DIR: &str = "database";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// Create the database directory and users file if they don't exist.
/// Called once at server startup.
pub fn init_database() -> std::io::Result<()> {
    if !std::path::Path::new(DATABASE_DIR).exists() {
        create_dir_all(DATABASE_DIR)?;
    }

    let users_path = std::path::Path::new(USERS_FILE);
    if !users_path.exists() {
        let mut file = File::create(users_path)?;
        file.write_all(b"{}")?;
    }

    Ok(())
}

/// Read the users blob and return a map of all registered users.
pub fn get_users() -> Result<HashMap<String, User>, String> {
    let mut file = match File::open(USERS_FILE) {
        Ok(file) => file,
        Err(_) => return Err("Failed to open users file".to_string()),
    };

    let mut contents = String::new();
    if file.read_to_string(&mut contents).is_err() {
        return Err("Failed to read users file".to_string());
    }

    match serde_json::from_str(&contents) {
        Ok(users) => Ok(users),
        Err(_) => Err("Failed to parse users data".to_string()),
    }
}

/// Overwrite the users blob.
pub fn save_users(users: &HashMap<String, User>) -> Result<(), String> {
    let json = match serde_json::to_string_pretty(users) {
        Ok(json) => json,
        Err(_) => return Err("Failed to serialize users data".to_string()),
    };

    let mut file = match File::create(USERS_FILE) {
        Ok(file) => file,
        Err(_) => return Err("Failed to create users file".to_string()),
    };

    if file.write_all(json.as_bytes()).is_err() {
        return Err("Failed to write users data".to_string());
    }

    Ok(())
}

/// Register a new user
///
/// Creates a new account with the provided username, email, and password.
/// The password is hashed before storage.
///
/// # Errors
/// * Returns an error if any field is empty, or if the username or email is
///   already in use
pub fn register_user(username: &str, email: &str, password: &str) -> Result<(), String> {
    if username.is_empty() || password.is_empty() || email.is_empty() {
        return Err("Username, email and password cannot be empty".to_string());
    }

    let mut users = get_users()?;
    if users.contains_key(username) {
        return Err("Username already exists".to_string());
    }

    if users.values().any(|user| user.email == email) {
        return Err("Email address is already registered".to_string());
    }

    let password_hash = hash_password(password)?;

    let user = User {
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
    };

    users.insert(username.to_string(), user);
    save_users(&users)?;

    Ok(())
}

/// Check whether the provided username and password match a registered user.
pub fn verify_user(username: &str, password: &str) -> Result<bool, String> {
    let users = get_users()?;

    if let Some(user) = users.get(username) {
        verify_password(password, &user.password_hash)
    } else {
        Ok(false)
    }
}

fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Create and store a session for an authenticated user, returning the
/// session id handed to the client as a cookie.
pub fn create_session(username: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

    let session = Session {
        user_id: username.to_string(),
        expires_at,
    };

    let mut sessions = SESSIONS.write().unwrap();
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Username for a session id, if the session exists and has not expired.
pub fn validate_session(session_id: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap();

    if let Some(session) = sessions.get(session_id) {
        if session.expires_at > SystemTime::now() {
            return Some(session.user_id.clone());
        }
    }

    None
}

fn drop_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap();
    sessions.remove(session_id);
}

/// Username attached to the request's session cookie, if any. Uploads from
/// requests without a valid session are attributed to "unknown".
pub fn session_username(jar: &CookieJar) -> Option<String> {
    jar.get("session")
        .and_then(|cookie| validate_session(cookie.value()))
}

// Web handler functions below

pub async fn handle_signup(Json(credentials): Json<UserCredentials>) -> Response {
    match register_user(
        &credentials.username,
        &credentials.email,
        &credentials.password,
    ) {
        Ok(_) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(message) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "error", "message": message })),
        )
            .into_response(),
    }
}

pub async fn handle_login(jar: CookieJar, Json(credentials): Json<UserCredentials>) -> Response {
    match verify_user(&credentials.username, &credentials.password) {
        Ok(true) => {
            let session_id = create_session(&credentials.username);
            log::info!("user {} logged in", credentials.username);
            let cookie = Cookie::new("session", session_id);
            (
                jar.add(cookie),
                Json(serde_json::json!({
                    "status": "ok",
                    "username": credentials.username,
                })),
            )
                .into_response()
        }
        Ok(false) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "status": "error",
                "message": "Invalid username or password",
            })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "message": "Authentication error",
            })),
        )
            .into_response(),
    }
}

pub async fn handle_logout(jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get("session") {
        drop_session(cookie.value());
    }

    let cookie = Cookie::new("session", "");
    (jar.add(cookie), Json(serde_json::json!({ "status": "ok" }))).into_response()
}

pub async fn handle_me(jar: CookieJar) -> Response {
    if let Some(username) = session_username(&jar) {
        let email = get_users()
            .ok()
            .and_then(|users| users.get(&username).map(|user| user.email.clone()))
            .unwrap_or_default();
        return Json(serde_json::json!({
            "username": username,
            "email": email,
        }))
        .into_response();
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "status": "error",
            "message": "Not signed in",
        })),
    )
        .into_response()
}
