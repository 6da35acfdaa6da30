//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `Session` and
//! `ApiClient` over real HTTP through `ReqwestTransport`. Validates that the
//! core's request building and response parsing agree with the server.

use std::sync::Arc;
use std::time::Duration;

use aischool_core::{
    ApiClient, ApiError, AuthFailure, ClientError, Credentials, NetworkFailure, NewProfile,
    ProfileUpdate, Registration, ReqwestTransport, SchoolClient, Session, SessionOutcome,
};
use tokio::net::{TcpListener, TcpStream};

/// Start a seeded mock server and return its base URL.
///
/// The seeded account is `ada@example.com` / `ada` with password `secret1`
/// and three child profiles.
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = mock_server::new_db();
    {
        let mut state = db.write().await;
        let user = state.seed_user("ada@example.com", Some("ada"), "secret1", "Ada Parent");
        state.seed_profile(&user, "Charlie Brown", 7, "2nd");
        state.seed_profile(&user, "Lucy van Pelt", 9, "4th");
        state.seed_profile(&user, "Linus", 5, "K");
    }
    tokio::spawn(async move {
        let _ = mock_server::run_with_state(listener, db).await;
    });
    format!("http://{addr}")
}

fn api(base_url: &str) -> ApiClient {
    api_with_timeout(base_url, Duration::from_secs(5))
}

/// Loopback-only client: ambient proxy settings must not reroute test traffic.
fn api_with_timeout(base_url: &str, timeout: Duration) -> ApiClient {
    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .unwrap();
    let transport = ReqwestTransport::from_client(http);
    ApiClient::new(SchoolClient::new(base_url), Arc::new(transport))
}

#[tokio::test]
async fn login_by_email_lists_profiles() {
    let base_url = spawn_server().await;
    let session = Session::new(api(&base_url));

    let outcome = session.login("ada@example.com", "secret1").await.unwrap();

    let list = outcome.profiles().expect("login should succeed");
    assert_eq!(list.len(), 3);
    assert!(list.count_is_consistent());
    let names: Vec<&str> = list.iter().map(|p| p.first_name()).collect();
    assert_eq!(names, ["Charlie", "Lucy", "Linus"]);
}

#[tokio::test]
async fn login_by_username_lists_profiles() {
    let base_url = spawn_server().await;
    let outcome = Session::new(api(&base_url)).login("ada", "secret1").await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let base_url = spawn_server().await;
    let outcome = Session::new(api(&base_url)).login("ada", "wrong").await.unwrap();
    assert_eq!(outcome, SessionOutcome::AuthFailure(AuthFailure::Unauthorized));
}

#[tokio::test]
async fn empty_identifier_is_bad_request() {
    let base_url = spawn_server().await;
    let outcome = Session::new(api(&base_url)).login("", "secret1").await.unwrap();
    assert_eq!(outcome, SessionOutcome::AuthFailure(AuthFailure::BadRequest));
}

#[tokio::test]
async fn wrong_base_path_is_endpoint_not_found() {
    let base_url = spawn_server().await;
    let outcome = Session::new(api(&format!("{base_url}/v2")))
        .login("ada", "secret1")
        .await
        .unwrap();
    assert_eq!(outcome, SessionOutcome::AuthFailure(AuthFailure::EndpointNotFound));
}

#[tokio::test]
async fn refused_connection_is_a_network_failure() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = Session::new(api(&format!("http://{addr}")))
        .login("ada", "secret1")
        .await
        .unwrap();
    assert!(
        matches!(outcome, SessionOutcome::NetworkFailure(NetworkFailure::Connect(_))),
        "got {outcome:?}"
    );
}

#[tokio::test]
async fn silent_server_times_out() {
    // Accepts connections and holds them open without ever answering.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let holder = tokio::spawn(async move {
        let mut held: Vec<TcpStream> = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let api = api_with_timeout(&format!("http://{addr}"), Duration::from_secs(1));
    let outcome = Session::new(api).login("ada", "secret1").await.unwrap();

    assert_eq!(outcome, SessionOutcome::NetworkFailure(NetworkFailure::Timeout));
    holder.abort();
}

#[tokio::test]
async fn sessions_on_one_transport_stay_independent() {
    let base_url = spawn_server().await;
    let shared = api(&base_url);
    let good = Session::new(shared.clone());
    let bad = Session::new(shared);

    let (good, bad) = tokio::join!(good.login("ada", "secret1"), bad.login("ada", "nope"));

    assert!(good.unwrap().is_success());
    assert_eq!(
        bad.unwrap(),
        SessionOutcome::AuthFailure(AuthFailure::Unauthorized)
    );
}

#[tokio::test]
async fn account_and_profile_lifecycle() {
    let base_url = spawn_server().await;
    let api = api(&base_url);

    // Step 1: health check.
    let health = api.health().await.unwrap();
    assert_eq!(health.status, "healthy");

    // Step 2: register a new account.
    let registration = Registration {
        email: "grace@example.com".to_string(),
        password: "hopper1".to_string(),
        full_name: "Grace Parent".to_string(),
        phone_number: None,
    };
    let registered = api.register(&registration).await.unwrap();
    assert_eq!(registered.user.email, "grace@example.com");

    // Step 3: registering twice conflicts.
    let err = api.register(&registration).await.unwrap_err();
    assert!(matches!(err, ClientError::Api(ApiError::Conflict(_))));

    // Step 4: log in and read the account back.
    let token = api
        .authenticate(&Credentials::new("grace@example.com", "hopper1"))
        .await
        .unwrap();
    let user = api.current_user(&token).await.unwrap();
    assert_eq!(user.full_name, "Grace Parent");

    // Step 5: new accounts start with no profiles.
    let list = api.fetch_profiles(&token).await.unwrap();
    assert!(list.is_empty());

    // Step 6: create, read, update.
    let created = api
        .create_profile(
            &token,
            &NewProfile {
                name: "Margaret".to_string(),
                age: 6,
                grade: "1st".to_string(),
                avatar: Some("owl".to_string()),
                learning_goals: "phonics".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.avatar, "owl");
    assert_eq!(created.learning_goals, "phonics");
    assert_eq!(created.progress, "{}");
    assert!(created.created_at.is_some());
    let fetched = api.get_profile(&token, &created.id).await.unwrap();
    assert_eq!(fetched, created);

    let updated = api
        .update_profile(
            &token,
            &created.id,
            &ProfileUpdate {
                grade: Some("2nd".to_string()),
                progress: Some(r#"{"reading":2}"#.to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.grade, "2nd");
    assert_eq!(updated.age, 6);
    assert_eq!(updated.progress, r#"{"reading":2}"#);
    assert_eq!(updated.avatar, "owl");

    // Step 7: delete, then it is gone.
    api.delete_profile(&token, &created.id).await.unwrap();
    let err = api.get_profile(&token, &created.id).await.unwrap_err();
    assert_eq!(err, ClientError::Api(ApiError::NotFound));

    // Step 8: logout revokes the token.
    api.logout(&token).await.unwrap();
    let err = api.current_user(&token).await.unwrap_err();
    assert!(matches!(err, ClientError::Api(ApiError::Unauthorized(_))));
}
