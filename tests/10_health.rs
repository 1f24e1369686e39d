mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", server.base_url)).send().await?;

    // OK with a database, SERVICE_UNAVAILABLE without one
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let body = res.json::<serde_json::Value>().await?;
    assert!(body["data"]["status"].is_string());
    Ok(())
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(format!("{}/", server.base_url)).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Backoffice API");
    Ok(())
}

#[tokio::test]
async fn production_refuses_to_start_without_jwt_secret() -> Result<()> {
    let port = portpicker::pick_unused_port().expect("free port");
    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_backoffice-api"))
        .env("APP_ENV", "production")
        .env("JWT_SECRET", "")
        .env("API_PORT", port.to_string())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let output = tokio::time::timeout(std::time::Duration::from_secs(10), child.wait_with_output()).await??;
    assert!(!output.status.success());
    Ok(())
}
