use anyhow::Result;

/// Find an available port for testing. Nothing listens on it once this
/// returns.
pub async fn find_available_port() -> Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Initialize tracing for tests
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("poller=debug,common=debug,info")
        .with_test_writer()
        .try_init();
}

pub fn flow_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
