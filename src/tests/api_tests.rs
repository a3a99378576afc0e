use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt; // for .collect()
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{AppConfig, AuthConfig, ServerConfig, ShareConfig};
use crate::credentials::{hash_password, MemoryCredentialsStorage};
use crate::files::source::DiskFilesSource;
use crate::gallery::cache::DiskThumbnailCache;
use crate::gallery::source::DiskGallerySource;
use crate::routes;
use crate::share::store::{MemoryShareStore, ShareStore};
use crate::share::Share;
use crate::state::AppState;
use crate::types::ModuleKind;

struct TestEnv {
    app: axum::Router,
    state: AppState,
    _gallery_dir: TempDir,
    _cache_dir: TempDir,
    files_dir: TempDir,
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 8080 },
        auth: AuthConfig {
            jwt_secret: "secret".to_string(),
            users: HashMap::new(),
            token_ttl_hours: 1,
        },
        share: ShareConfig { path: "unused".to_string(), sweep_interval_secs: 3600 },
        modules: vec![ModuleKind::Gallery, ModuleKind::Files],
        gallery: None,
        files: None,
        security: None,
    }
}

fn write_jpeg(path: &Path) {
    let img =
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(4, 3, image::Rgb([120, 30, 200])));
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

fn gallery_share(slug: &str, album: &str, items: &[&str]) -> Share {
    Share {
        slug: slug.to_string(),
        kind: ModuleKind::Gallery,
        name: album.to_string(),
        items: items.iter().map(|s| s.to_string()).collect(),
        expires_at: None,
    }
}

async fn setup() -> TestEnv {
    let gallery_dir = TempDir::new().unwrap();
    std::fs::create_dir(gallery_dir.path().join("album1")).unwrap();
    std::fs::create_dir(gallery_dir.path().join("album2")).unwrap();
    write_jpeg(&gallery_dir.path().join("album1/test.jpg"));
    write_jpeg(&gallery_dir.path().join("album1/hidden.jpg"));
    write_jpeg(&gallery_dir.path().join("album2/other.jpg"));

    let cache_dir = TempDir::new().unwrap();

    let files_dir = TempDir::new().unwrap();
    std::fs::write(files_dir.path().join("foo"), b"foo\n").unwrap();
    std::fs::create_dir_all(files_dir.path().join("test1/inner")).unwrap();
    std::fs::write(files_dir.path().join("test1/inner/foo"), b"inner\n").unwrap();
    std::fs::write(files_dir.path().join("test1/secret"), b"secret\n").unwrap();

    let credentials = Arc::new(MemoryCredentialsStorage::new(
        [("test".to_string(), hash_password("changeme").unwrap())].into(),
        b"secret",
        Duration::hours(1),
    ));

    let shares: Arc<dyn ShareStore> = Arc::new(MemoryShareStore::new());
    shares.save(&gallery_share("bar", "album1", &["test.jpg"])).await.unwrap();
    shares
        .save(&Share {
            slug: "baz".to_string(),
            kind: ModuleKind::Files,
            name: "/test1".to_string(),
            items: vec!["/test1/inner".to_string()],
            expires_at: None,
        })
        .await
        .unwrap();

    let extensions = vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string()];
    let state = AppState::new(test_config(), credentials, shares)
        .with_gallery(
            Arc::new(DiskGallerySource::new(gallery_dir.path(), &extensions).unwrap()),
            Arc::new(DiskThumbnailCache::new(cache_dir.path()).unwrap()),
        )
        .with_files(Arc::new(DiskFilesSource::new(files_dir.path()).unwrap()));

    TestEnv {
        app: routes::router(state.clone()),
        state,
        _gallery_dir: gallery_dir,
        _cache_dir: cache_dir,
        files_dir,
    }
}

impl TestEnv {
    fn owner_token(&self) -> String {
        self.state.credentials.authenticate("test", "changeme").unwrap()
    }

    async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn get_auth(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Request with an empty body, optionally authenticated.
    async fn request(&self, method: &str, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, token: Option<&str>, body: &'static str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}

async fn body_json(res: Response<Body>) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn sign_in_issues_token_and_session_cookie() {
    let env = setup().await;

    let res = env
        .post_json("/api/user/sign_in", None, r#"{"username":"test","password":"changeme"}"#)
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(res).await;
    let token = body["token"].as_str().unwrap();
    assert!(!token.is_empty());
    assert_eq!(env.state.metrics.get_snapshot().sign_ins, 1);

    // The returned token opens owner routes.
    let res = env.get_auth("/api/modules", token).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn sign_in_rejects_bad_credentials() {
    let env = setup().await;

    for body in [
        r#"{"username":"test","password":"wrong"}"#,
        r#"{"username":"ghost","password":"changeme"}"#,
    ] {
        let res = env.post_json("/api/user/sign_in", None, body).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["error"], "invalid username or password");
    }
    assert_eq!(env.state.metrics.get_snapshot().auth_failures, 2);
}

#[tokio::test]
async fn owner_routes_require_a_session() {
    let env = setup().await;
    let token = env.owner_token();

    let private = [
        "/api/modules",
        "/api/shares",
        "/api/gallery",
        "/api/gallery/album1/images",
        "/api/gallery/album1/image/test.jpg",
        "/api/files",
        "/api/files/file/foo",
    ];
    for uri in private {
        let res = env.get(uri).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} without token", uri);
        let body = body_json(res).await;
        assert_eq!(body["error"], "unauthorized");

        let res = env.get_auth(uri, &token).await;
        assert_eq!(res.status(), StatusCode::OK, "{} with token", uri);
    }
}

#[tokio::test]
async fn session_is_accepted_from_cookie_and_query() {
    let env = setup().await;
    let token = env.owner_token();

    let res = env
        .send(
            Request::builder()
                .uri("/api/modules")
                .header(header::COOKIE, format!("session={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // <img> tags cannot send headers, so the token may ride in the query.
    let res = env.get(&format!("/api/gallery/album1/image/test.jpg?jwt={}", token)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = env.get("/api/modules?jwt=garbage").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn modules_lists_enabled_modules() {
    let env = setup().await;
    let res = env.get_auth("/api/modules", &env.owner_token()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, serde_json::json!({ "modules": ["gallery", "files"] }));
}

#[tokio::test]
async fn share_creation_validates_and_assigns_slugs() {
    let env = setup().await;
    let token = env.owner_token();
    let valid = r#"{"type":"gallery","name":"album2","items":["other.jpg"]}"#;

    // Missing name.
    let res = env.post_json("/api/shares", Some(&token), r#"{"type":"gallery","items":["x"]}"#).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Missing items.
    let res = env.post_json("/api/shares", Some(&token), r#"{"type":"gallery","name":"album2"}"#).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = env.post_json("/api/shares", Some(&token), valid).await;
    assert_eq!(res.status(), StatusCode::OK);
    let first = body_json(res).await;
    let first_slug = first["slug"].as_str().unwrap().to_string();
    assert!(!first_slug.is_empty());

    // A second grant over the same resource gets its own slug.
    let res = env.post_json("/api/shares", Some(&token), valid).await;
    assert_eq!(res.status(), StatusCode::OK);
    let second = body_json(res).await;
    assert_ne!(second["slug"].as_str().unwrap(), first_slug);

    // The new grant resolves publicly and is listed for the owner.
    let res = env.get(&format!("/api/share/{}", first_slug)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = env.get_auth("/api/shares", &token).await;
    let listed = body_json(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 4);
    assert_eq!(env.state.metrics.get_snapshot().shares_created, 2);
}

#[tokio::test]
async fn share_removal_is_owner_only_and_idempotently_absent() {
    let env = setup().await;
    let token = env.owner_token();

    let res = env.request("DELETE", "/api/shares/bar", None).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = env.request("DELETE", "/api/shares/bar", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = env.request("DELETE", "/api/shares/bar", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // The guest-facing slug is gone too.
    let res = env.get("/api/share/bar").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_share_metadata_is_readable_without_a_session() {
    let env = setup().await;

    let res = env.get("/api/share/bar").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["type"], "gallery");
    assert_eq!(body["name"], "album1");
    assert_eq!(body["items"], serde_json::json!(["test.jpg"]));

    let res = env.get("/api/share/unknown").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn gallery_share_grants_exactly_the_allow_listed_scope() {
    let env = setup().await;

    // Listing is filtered to the allow-list.
    let res = env.get("/share/bar/gallery/album1/images").await;
    assert_eq!(res.status(), StatusCode::OK);
    let images = body_json(res).await;
    let names: Vec<&str> =
        images.as_array().unwrap().iter().map(|i| i["path"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["test.jpg"]);

    // Allow-listed image is served; its unlisted sibling is not.
    let res = env.get("/share/bar/gallery/album1/image/test.jpg").await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = env.get("/share/bar/gallery/album1/image/hidden.jpg").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Wrong album, album index, wrong module, unknown slug: all the same 404.
    for uri in [
        "/share/bar/gallery/album2/images",
        "/share/bar/gallery",
        "/share/bar/files",
        "/share/bar/files/file/foo",
        "/share/unknown/gallery/album1/images",
    ] {
        let res = env.get(uri).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", uri);
        let body = body_json(res).await;
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn files_share_scopes_tree_and_file_access() {
    let env = setup().await;

    let res = env.get("/share/baz/files").await;
    assert_eq!(res.status(), StatusCode::OK);
    let tree = body_json(res).await;
    assert_eq!(tree["path"], "/test1");
    let children = tree["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["path"], "/test1/inner");

    // Reads inside the granted prefix work, anything else does not exist.
    let res = env.get("/share/baz/files/file/test1/inner/foo").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "application/base64");

    for uri in ["/share/baz/files/file/foo", "/share/baz/files/file/test1/secret"] {
        let res = env.get(uri).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn shares_never_gain_index_or_write_access() {
    let env = setup().await;

    let attempts = [
        ("GET", "/share/bar/gallery"),
        ("POST", "/share/baz/files/mkdir/testfoo"),
        ("POST", "/share/baz/files/rmdir/test1"),
        ("POST", "/share/baz/files/upload/test1/inner"),
        ("DELETE", "/share/baz/files/file/test1/inner/foo"),
        ("POST", "/share/bar/gallery/album1/image/test.jpg"),
    ];
    for (method, uri) in attempts {
        let res = env.request(method, uri, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);
    }

    // Nothing was written or deleted.
    assert!(env.files_dir.path().join("test1/inner/foo").exists());
    assert!(!env.files_dir.path().join("testfoo").exists());
}

#[tokio::test]
async fn expired_share_resolves_until_the_sweep_removes_it() {
    let env = setup().await;

    let mut old = gallery_share("old", "album1", &["test.jpg"]);
    old.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
    env.state.shares.save(&old).await.unwrap();

    // Deliberate: expiry is only enforced by the sweep, not on read.
    let res = env.get("/share/old/gallery/album1/images").await;
    assert_eq!(res.status(), StatusCode::OK);

    env.state.shares.expire().await.unwrap();
    let res = env.get("/share/old/gallery/album1/images").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_gallery_endpoints_serve_albums_images_and_metadata() {
    let env = setup().await;
    let token = env.owner_token();

    let res = env.get_auth("/api/gallery", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let albums = body_json(res).await;
    let names: Vec<&str> =
        albums.as_array().unwrap().iter().map(|a| a["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["album1", "album2"]);
    assert_eq!(albums[0]["items_count"], 2);

    let res = env.get_auth("/api/gallery/album1/images", &token).await;
    let images = body_json(res).await;
    assert_eq!(images.as_array().unwrap().len(), 2);

    let res = env.get_auth("/api/gallery/album1/image/test.jpg", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");

    // Thumbnails are generated on first access and cached afterwards.
    for _ in 0..2 {
        let res = env.get_auth("/api/gallery/album1/thumbnail/test.jpg", &token).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
    }

    let res = env.get_auth("/api/gallery/album1/exif/test.jpg", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let meta = body_json(res).await;
    assert_eq!(meta["width"], 4);
    assert_eq!(meta["height"], 3);

    let res = env.get_auth("/api/gallery/album1/image/missing.jpg", &token).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_files_endpoints_cover_the_full_lifecycle() {
    let env = setup().await;
    let token = env.owner_token();

    let res = env.get_auth("/api/files", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let tree = body_json(res).await;
    assert_eq!(tree["path"], "/");
    let top: Vec<&str> =
        tree["children"].as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(top, vec!["foo", "test1"]);

    let res = env.get_auth("/api/files/file/foo", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "Zm9vCg=="); // base64("foo\n")

    // mkdir, upload into it, fetch, delete, rmdir.
    let res = env.request("POST", "/api/files/mkdir/incoming", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let boundary = "XHEIMWOLKEBOUNDARY";
    let multipart = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"bar.txt\"\r\nContent-Type: text/plain\r\n\r\nbar\r\n--{b}--\r\n",
        b = boundary
    );
    let res = env
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/files/upload/incoming")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
                .body(Body::from(multipart))
                .unwrap(),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let item = body_json(res).await;
    assert_eq!(item["path"], "/incoming/bar.txt");
    assert_eq!(item["type"], "file");

    let res = env.get_auth("/api/files/file/incoming/bar.txt", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "YmFy"); // base64("bar")

    let res = env.request("DELETE", "/api/files/file/incoming/bar.txt", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = env.request("POST", "/api/files/rmdir/incoming", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!env.files_dir.path().join("incoming").exists());
}

#[tokio::test]
async fn traversal_attempts_are_neutralized() {
    let env = setup().await;
    let token = env.owner_token();

    // The sanitized path lands inside the source root, where nothing exists.
    let res = env.get_auth("/api/files/file/../../../../etc/passwd", &token).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = env.get_auth("/api/gallery/album1/image/..%2F..%2Fetc%2Fpasswd", &token).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn operational_endpoints_respond_without_a_session() {
    let env = setup().await;

    let res = env.get("/healthz").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = env.get("/readyz").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = env.get("/metrics").await;
    assert_eq!(res.status(), StatusCode::OK);
    let metrics = body_json(res).await;
    assert!(metrics["uptime_seconds"].is_u64());

    let res = env.get("/version").await;
    assert_eq!(res.status(), StatusCode::OK);
    let version = body_json(res).await;
    assert_eq!(version["name"], "heimwolke");

    // Security headers ride on every response.
    let res = env.get("/healthz").await;
    assert!(res.headers().contains_key("x-content-type-options"));
    assert!(res.headers().contains_key("x-frame-options"));
}

#[tokio::test]
async fn unknown_routes_return_a_json_error() {
    let env = setup().await;
    let res = env.get("/api/nope").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert!(body["error"].is_string());
}
