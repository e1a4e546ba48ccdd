mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;

async fn me_status(server: &common::TestServer, client: &Client, token: &str) -> Result<StatusCode> {
    Ok(client.get(server.url("/users/me")).bearer_auth(token).send().await?.status())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = Client::new();

    let res = client.get(server.url("/tasks")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    assert_eq!(me_status(server, &client, "garbage.token.value").await?, StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/users/me"))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_only_the_current_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = Client::new();
    let account = common::register(server, &client, "multi").await?;

    let laptop = common::login(server, &client, &account).await?;
    let phone = common::login(server, &client, &account).await?;
    for token in [&account.token, &laptop, &phone] {
        assert_eq!(me_status(server, &client, token).await?, StatusCode::OK);
    }

    let res = client.post(server.url("/users/logout")).bearer_auth(&laptop).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert_eq!(me_status(server, &client, &laptop).await?, StatusCode::UNAUTHORIZED);
    assert_eq!(me_status(server, &client, &phone).await?, StatusCode::OK);
    assert_eq!(me_status(server, &client, &account.token).await?, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_all_revokes_every_session() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = Client::new();
    let account = common::register(server, &client, "everywhere").await?;
    let second = common::login(server, &client, &account).await?;

    let res = client.post(server.url("/users/logoutAll")).bearer_auth(&second).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert_eq!(me_status(server, &client, &account.token).await?, StatusCode::UNAUTHORIZED);
    assert_eq!(me_status(server, &client, &second).await?, StatusCode::UNAUTHORIZED);

    // logging in again still works
    let fresh = common::login(server, &client, &account).await?;
    assert_eq!(me_status(server, &client, &fresh).await?, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn profile_update_keeps_other_sessions() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = Client::new();
    let account = common::register(server, &client, "keeper").await?;
    let other = common::login(server, &client, &account).await?;

    let res = client
        .patch(server.url("/users/me"))
        .bearer_auth(&account.token)
        .json(&serde_json::json!({ "age": 50 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(me_status(server, &client, &other).await?, StatusCode::OK);
    Ok(())
}
