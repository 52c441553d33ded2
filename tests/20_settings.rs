//! Settings visibility scenarios over HTTP: the role-tier rule table for
//! creation, the ownership-or-tier rule for reads, per-user key uniqueness,
//! and orphaned settings after owner deletion.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_setting(
    server: &common::TestServer,
    token: &str,
    key: &str,
    visibility: &str,
) -> Result<reqwest::Response> {
    let client = reqwest::Client::new();
    Ok(client
        .post(format!("{}/api/settings", server.base_url))
        .bearer_auth(token)
        .json(&json!({
            "key": key,
            "value": "on",
            "visibility": visibility
        }))
        .send()
        .await?)
}

#[tokio::test]
async fn user_cannot_create_above_their_tier() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_and_login(server, &common::unique("tiers")).await?;

    for visibility in ["ADMIN", "SYSTEM"] {
        let res = create_setting(server, &token, "blocked", visibility).await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{}", visibility);
        let body: Value = res.json().await?;
        assert_eq!(body["code"], json!("FORBIDDEN"));
    }

    // Nothing was persisted by the denied attempts
    let res = client
        .get(format!("{}/api/settings", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["meta"]["total"], json!(0));
    Ok(())
}

#[tokio::test]
async fn admin_can_create_admin_but_not_system() -> Result<()> {
    let server = common::ensure_server().await?;
    let admin = common::make_admin(server, &common::unique("creator")).await?;

    let res = create_setting(server, &admin, "admin_tier", "ADMIN").await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = create_setting(server, &admin, "system_tier", "SYSTEM").await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn system_tier_readable_only_by_superadmin() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let root = common::superadmin_token(server).await?;
    let admin = common::make_admin(server, &common::unique("sysreader")).await?;

    let res = create_setting(server, &root, &common::unique("sys"), "SYSTEM").await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();

    // ADMIN is denied with the uniform forbidden, SUPERADMIN reads it
    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&root)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["visibility"], json!("SYSTEM"));
    Ok(())
}

#[tokio::test]
async fn user_tier_settings_are_private_to_their_owner() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (alice, _) = common::register_and_login(server, &common::unique("priva")).await?;
    let (bob, _) = common::register_and_login(server, &common::unique("privb")).await?;
    let admin = common::make_admin(server, &common::unique("peeker")).await?;

    let res = create_setting(server, &alice, "language", "USER").await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();

    // The owner reads it, another USER gets the uniform forbidden, and an
    // ADMIN passes through the tier path
    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&alice)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&bob)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn missing_setting_is_not_found_before_any_tier_check() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_and_login(server, &common::unique("notfound")).await?;

    let res = client
        .get(format!(
            "{}/api/settings/550e8400-e29b-41d4-a716-446655440000",
            server.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{}/api/settings/not-a-uuid", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn key_uniqueness_is_scoped_per_user() -> Result<()> {
    let server = common::ensure_server().await?;
    let (alice, _) = common::register_and_login(server, &common::unique("keya")).await?;
    let (bob, _) = common::register_and_login(server, &common::unique("keyb")).await?;

    // Two different users may both use "theme"
    let res = create_setting(server, &alice, "theme", "USER").await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = create_setting(server, &bob, "theme", "USER").await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // The same user duplicating their own key is a conflict
    let res = create_setting(server, &alice, "theme", "USER").await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], json!("CONFLICT"));
    Ok(())
}

#[tokio::test]
async fn update_cannot_retier_above_the_requester() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let (token, _) = common::register_and_login(server, &common::unique("retier")).await?;

    let res = create_setting(server, &token, "density", "USER").await?;
    let body: Value = res.json().await?;
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();

    let res = client
        .put(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&token)
        .json(&json!({ "visibility": "ADMIN" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // A value change within tier is fine
    let res = client
        .put(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&token)
        .json(&json!({ "value": "compact" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["value"], json!("compact"));
    Ok(())
}

#[tokio::test]
async fn deleting_the_owner_orphans_their_settings() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let root = common::superadmin_token(server).await?;
    let (erin_token, erin) = common::register_and_login(server, &common::unique("orphan")).await?;

    let res = create_setting(server, &erin_token, "theme", "USER").await?;
    let body: Value = res.json().await?;
    let uuid = body["data"]["uuid"].as_str().unwrap().to_string();

    let res = client
        .delete(format!(
            "{}/api/users/{}",
            server.base_url,
            erin["uuid"].as_str().unwrap()
        ))
        .bearer_auth(&root)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // The owner path is gone with the account, the tier path survives
    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&root)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["data"]["user_id"].is_null());

    let (stranger, _) = common::register_and_login(server, &common::unique("stranger")).await?;
    let res = client
        .get(format!("{}/api/settings/{}", server.base_url, uuid))
        .bearer_auth(&stranger)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn listing_shows_only_what_is_individually_readable() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let prefix = common::unique("vis");
    let root = common::superadmin_token(server).await?;
    let (user, _) = common::register_and_login(server, &common::unique("lister")).await?;

    let res = create_setting(server, &user, &format!("{}_mine", prefix), "USER").await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = create_setting(server, &root, &format!("{}_sys", prefix), "SYSTEM").await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(format!("{}/api/settings", server.base_url))
        .bearer_auth(&user)
        .query(&[("search", prefix.as_str())])
        .send()
        .await?;
    let body: Value = res.json().await?;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["key"], json!(format!("{}_mine", prefix)));

    let res = client
        .get(format!("{}/api/settings", server.base_url))
        .bearer_auth(&root)
        .query(&[("search", prefix.as_str())])
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    Ok(())
}
