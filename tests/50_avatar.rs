mod common;

use std::io::Cursor;

use anyhow::Result;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, image::Rgb([10, 120, 200])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png).expect("encode png");
    out.into_inner()
}

fn upload(bytes: Vec<u8>, file_name: &str) -> Form {
    Form::new().part("avatar", Part::bytes(bytes).file_name(file_name.to_string()))
}

#[tokio::test]
async fn upload_fetch_and_delete_avatar() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = Client::new();
    let account = common::register(server, &client, "avatar").await?;
    let avatar_url = server.url(&format!("/users/{}/avatar", account.id));

    assert_eq!(client.get(&avatar_url).send().await?.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(server.url("/users/me/avatar"))
        .bearer_auth(&account.token)
        .multipart(upload(png_bytes(), "me.PNG"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(&avatar_url).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    let stored = image::load_from_memory(&res.bytes().await?)?;
    assert_eq!(stored.dimensions(), (250, 250));

    let res = client.delete(server.url("/users/me/avatar")).bearer_auth(&account.token).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(client.get(&avatar_url).send().await?.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn rejects_wrong_type_and_oversized_files() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = Client::new();
    let account = common::register(server, &client, "strict").await?;

    let res = client
        .post(server.url("/users/me/avatar"))
        .bearer_auth(&account.token)
        .multipart(upload(png_bytes(), "me.gif"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url("/users/me/avatar"))
        .bearer_auth(&account.token)
        .multipart(upload(b"plain text".to_vec(), "notes.png"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url("/users/me/avatar"))
        .bearer_auth(&account.token)
        .multipart(upload(vec![0u8; 1_000_001], "huge.png"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}

#[tokio::test]
async fn upload_requires_authentication() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = Client::new()
        .post(server.url("/users/me/avatar"))
        .multipart(upload(png_bytes(), "me.png"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
