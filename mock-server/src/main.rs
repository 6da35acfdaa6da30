use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let db = mock_server::new_db();
    {
        let mut state = db.write().await;
        let demo = state.seed_user("demo@example.com", Some("demo"), "password1", "Demo Parent");
        state.seed_profile(&demo, "Ada Lovelace", 8, "3rd");
        state.seed_profile(&demo, "Alan Turing", 6, "1st");
    }
    info!("seeded demo account demo@example.com / demo (password: password1)");

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    mock_server::run_with_state(listener, db).await
}
