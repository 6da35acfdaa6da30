use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub grade: String,
    pub avatar: String,
    pub learning_goals: String,
    pub progress: String,
    pub created_at: String,
    pub last_activity: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
}

#[derive(Clone, Debug)]
struct Account {
    user: User,
    username: Option<String>,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateProfile {
    pub name: Option<String>,
    pub age: Option<i64>,
    #[serde(default)]
    pub grade: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub learning_goals: String,
}

#[derive(Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub grade: Option<String>,
    pub avatar: Option<String>,
    pub learning_goals: Option<String>,
    pub progress: Option<String>,
}

/// In-memory accounts, sessions and child profiles.
#[derive(Debug, Default)]
pub struct MockState {
    accounts: Vec<Account>,
    tokens: HashMap<String, String>,
    profiles: HashMap<String, Vec<Profile>>,
}

impl MockState {
    /// Add an account and return its user id.
    pub fn seed_user(
        &mut self,
        email: &str,
        username: Option<&str>,
        password: &str,
        full_name: &str,
    ) -> String {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            full_name: full_name.to_string(),
            phone_number: String::new(),
        };
        let id = user.id.clone();
        self.accounts.push(Account {
            user,
            username: username.map(str::to_string),
            password: password.to_string(),
        });
        id
    }

    pub fn seed_profile(&mut self, user_id: &str, name: &str, age: i64, grade: &str) -> Profile {
        self.insert_profile(user_id, name, age, grade, "default", "")
    }

    fn insert_profile(
        &mut self,
        user_id: &str,
        name: &str,
        age: i64,
        grade: &str,
        avatar: &str,
        learning_goals: &str,
    ) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            age,
            grade: grade.to_string(),
            avatar: avatar.to_string(),
            learning_goals: learning_goals.to_string(),
            progress: "{}".to_string(),
            created_at: Utc::now().to_rfc3339(),
            last_activity: None,
        };
        self.profiles
            .entry(user_id.to_string())
            .or_default()
            .push(profile.clone());
        profile
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn user(&self, user_id: &str) -> Option<&User> {
        self.accounts
            .iter()
            .map(|account| &account.user)
            .find(|user| user.id == user_id)
    }

    fn profile(&self, user_id: &str, id: &str) -> Option<&Profile> {
        self.profiles
            .get(user_id)?
            .iter()
            .find(|profile| profile.id == id)
    }

    fn profile_mut(&mut self, user_id: &str, id: &str) -> Option<&mut Profile> {
        self.profiles
            .get_mut(user_id)?
            .iter_mut()
            .find(|profile| profile.id == id)
    }
}

pub type Db = Arc<RwLock<MockState>>;

type Failure = (StatusCode, Json<Value>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "error": message })))
}

pub fn new_db() -> Db {
    Arc::new(RwLock::new(MockState::default()))
}

pub fn app() -> Router {
    app_with_state(new_db())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/user", get(current_user))
        .route("/api/auth/logout", post(logout))
        .route("/api/profiles", get(list_profiles).post(create_profile))
        .route(
            "/api/profiles/{id}",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .fallback(not_found)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, new_db()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn not_found() -> Failure {
    failure(StatusCode::NOT_FOUND, "Endpoint not found")
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "message": "Mock school API is running" }))
}

/// Resolve the bearer token in `headers` to a user id.
fn authorize(state: &MockState, headers: &HeaderMap) -> Result<String, Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Authorization token required"))?;
    state
        .tokens
        .get(token)
        .cloned()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

fn validate_age(age: i64) -> Result<(), Failure> {
    if (3..=18).contains(&age) {
        Ok(())
    } else {
        Err(failure(StatusCode::BAD_REQUEST, "Age must be between 3 and 18"))
    }
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    for (field, value) in [
        ("email", &input.email),
        ("password", &input.password),
        ("full_name", &input.full_name),
    ] {
        if value.trim().is_empty() {
            return Err(failure(StatusCode::BAD_REQUEST, &format!("{field} is required")));
        }
    }
    let email = input.email.trim().to_lowercase();
    if !email.contains('@') || !email.contains('.') {
        return Err(failure(StatusCode::BAD_REQUEST, "Invalid email format"));
    }
    if input.password.len() < 6 {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters long",
        ));
    }

    let mut state = db.write().await;
    if state.accounts.iter().any(|account| account.user.email == email) {
        return Err(failure(StatusCode::CONFLICT, "User with this email already exists"));
    }
    let user_id = state.seed_user(&email, None, &input.password, input.full_name.trim());
    if let Some(phone) = input.phone_number.as_deref().map(str::trim) {
        if let Some(account) = state.accounts.last_mut() {
            account.user.phone_number = phone.to_string();
        }
    }
    let token = state.issue_token(&user_id);
    let user = state.user(&user_id).cloned();
    info!(user_id = %user_id, "mock: user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "token": token, "user": user })),
    ))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginInput>,
) -> Result<Json<Value>, Failure> {
    let password = input.password.filter(|p| !p.is_empty());
    let email = input
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let username = input
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let Some(password) = password else {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "Email or username and password are required",
        ));
    };
    if email.is_none() && username.is_none() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "Email or username and password are required",
        ));
    }

    let mut state = db.write().await;
    let account = state
        .accounts
        .iter()
        .find(|account| match (&email, &username) {
            (Some(email), _) => &account.user.email == email,
            (None, Some(username)) => account.username.as_ref() == Some(username),
            (None, None) => false,
        })
        .filter(|account| account.password == password)
        .cloned();
    let Some(account) = account else {
        warn!("mock: rejected login");
        return Err(failure(StatusCode::UNAUTHORIZED, "Invalid email or password"));
    };
    let token = state.issue_token(&account.user.id);
    info!(user_id = %account.user.id, "mock: login successful");

    Ok(Json(json!({ "message": "Login successful", "token": token, "user": account.user })))
}

async fn current_user(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let state = db.read().await;
    let user_id = authorize(&state, &headers)?;
    let user = state
        .user(&user_id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "User not found"))?;
    Ok(Json(json!({ "user": user })))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Json<Value> {
    let mut state = db.write().await;
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if let Some(token) = token {
        state.tokens.remove(token);
    }
    Json(json!({ "message": "Logged out successfully" }))
}

async fn list_profiles(
    State(db): State<Db>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    let state = db.read().await;
    let user_id = authorize(&state, &headers)?;
    let profiles = state.profiles.get(&user_id).cloned().unwrap_or_default();
    Ok(Json(json!({ "count": profiles.len(), "profiles": profiles })))
}

async fn create_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateProfile>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut state = db.write().await;
    let user_id = authorize(&state, &headers)?;
    let (Some(name), Some(age)) = (input.name.filter(|n| !n.trim().is_empty()), input.age) else {
        return Err(failure(StatusCode::BAD_REQUEST, "Name and age are required"));
    };
    validate_age(age)?;
    let avatar = input.avatar.unwrap_or_else(|| "default".to_string());
    let profile = state.insert_profile(
        &user_id,
        name.trim(),
        age,
        input.grade.trim(),
        &avatar,
        input.learning_goals.trim(),
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Kid profile created successfully", "profile": profile })),
    ))
}

async fn get_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, Failure> {
    let state = db.read().await;
    let user_id = authorize(&state, &headers)?;
    let profile = state
        .profile(&user_id, &id)
        .cloned()
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Profile not found"))?;
    Ok(Json(json!({ "profile": profile })))
}

async fn update_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdateProfile>,
) -> Result<Json<Value>, Failure> {
    let mut state = db.write().await;
    let user_id = authorize(&state, &headers)?;
    if let Some(age) = input.age {
        validate_age(age)?;
    }
    let profile = state
        .profile_mut(&user_id, &id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Profile not found or update failed"))?;
    if let Some(name) = input.name {
        profile.name = name;
    }
    if let Some(age) = input.age {
        profile.age = age;
    }
    if let Some(grade) = input.grade {
        profile.grade = grade;
    }
    if let Some(avatar) = input.avatar {
        profile.avatar = avatar;
    }
    if let Some(learning_goals) = input.learning_goals {
        profile.learning_goals = learning_goals;
    }
    if let Some(progress) = input.progress {
        profile.progress = progress;
    }
    Ok(Json(json!({ "message": "Profile updated successfully", "profile": profile.clone() })))
}

async fn delete_profile(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, Failure> {
    let mut state = db.write().await;
    let user_id = authorize(&state, &headers)?;
    let profiles = state.profiles.entry(user_id).or_default();
    let before = profiles.len();
    profiles.retain(|profile| profile.id != id);
    if profiles.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, "Profile not found"));
    }
    Ok(Json(json!({ "message": "Profile deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_serializes_to_json() {
        let profile = Profile {
            id: "p1".to_string(),
            name: "Ada".to_string(),
            age: 7,
            grade: "2nd".to_string(),
            avatar: "owl".to_string(),
            learning_goals: "reading".to_string(),
            progress: "{}".to_string(),
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            last_activity: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "p1",
                "name": "Ada",
                "age": 7,
                "grade": "2nd",
                "avatar": "owl",
                "learning_goals": "reading",
                "progress": "{}",
                "created_at": "2024-01-01T00:00:00+00:00",
                "last_activity": null
            })
        );
    }

    #[test]
    fn login_input_accepts_either_identifier() {
        let input: LoginInput =
            serde_json::from_str(r#"{"username":"ada","password":"pw"}"#).unwrap();
        assert_eq!(input.username.as_deref(), Some("ada"));
        assert!(input.email.is_none());
    }

    #[test]
    fn seeded_profiles_belong_to_their_user() {
        let mut state = MockState::default();
        let alice = state.seed_user("alice@example.com", Some("alice"), "pw", "Alice");
        let bob = state.seed_user("bob@example.com", None, "pw", "Bob");
        let profile = state.seed_profile(&alice, "Ada", 7, "2nd");
        assert!(state.profile(&alice, &profile.id).is_some());
        assert!(state.profile(&bob, &profile.id).is_none());
        assert_eq!(profile.avatar, "default");
        assert_eq!(profile.progress, "{}");
    }

    #[test]
    fn update_profile_all_fields_optional() {
        let input: UpdateProfile = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.age.is_none());
        assert!(input.grade.is_none());
    }

    #[test]
    fn age_outside_range_is_rejected() {
        assert!(validate_age(3).is_ok());
        assert!(validate_age(18).is_ok());
        assert!(validate_age(2).is_err());
        assert!(validate_age(19).is_err());
    }
}
