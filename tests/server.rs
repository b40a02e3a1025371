use std::net::SocketAddr;
use std::path::Path;

use httpmock::Method::GET;
use httpmock::MockServer;
use tempfile::tempdir;
use tmpl_example::server::{AppState, app};
use tmpl_example::vite::{Vite, ViteConfig};

async fn spawn(vite: Vite) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(AppState::new(vite).unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn write_dist(dist: &Path) {
    std::fs::create_dir_all(dist.join(".vite")).unwrap();
    std::fs::create_dir_all(dist.join("assets")).unwrap();
    std::fs::write(
        dist.join(".vite/manifest.json"),
        r#"{
  "app/main.ts": { "file": "assets/main-1a.js", "isEntry": true },
  "app/pages/index.ts": { "file": "assets/index-2b.js", "isEntry": true }
}"#,
    )
    .unwrap();
    std::fs::write(dist.join("assets/main-1a.js"), "console.log('main')").unwrap();
}

fn prod(dist: &Path, base: &str) -> Vite {
    Vite::new(ViteConfig {
        output: dist.to_path_buf(),
        base: base.to_string(),
        ..ViteConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn index_reads_counter_and_name_cookies() {
    let tmp = tempdir().unwrap();
    let dist = tmp.path().join("dist");
    write_dist(&dist);
    let addr = spawn(prod(&dist, "/")).await;

    let body = client()
        .get(format!("http://{addr}/"))
        .header("Cookie", "Count-State=7; Name-State=Ada")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"<span id="count">7</span>"#), "{body}");
    assert!(body.contains("Hello, Ada!"));
    assert!(body.contains(r#"src="/assets/index-2b.js""#));

    let body = client()
        .get(format!("http://{addr}/"))
        .header("Cookie", "Count-State=NaN")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"<span id="count">0</span>"#), "{body}");
}

#[tokio::test]
async fn profile_post_sets_cookie_and_redirects() {
    let tmp = tempdir().unwrap();
    let dist = tmp.path().join("dist");
    write_dist(&dist);
    let addr = spawn(prod(&dist, "/")).await;

    let resp = client()
        .post(format!("http://{addr}/profile"))
        .form(&[("name", "Ada")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::FOUND);
    assert_eq!(resp.headers()["location"], "/");
    let set_cookie = resp.headers()["set-cookie"].to_str().unwrap();
    assert!(set_cookie.starts_with("Name-State=Ada"), "{set_cookie}");
    assert!(set_cookie.contains("Path=/"), "{set_cookie}");

    let body = client()
        .get(format!("http://{addr}/profile"))
        .header("Cookie", "Name-State=Ada")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"value="Ada""#), "{body}");
}

#[tokio::test]
async fn production_serves_built_assets() {
    let tmp = tempdir().unwrap();
    let dist = tmp.path().join("dist");
    write_dist(&dist);
    let addr = spawn(prod(&dist, "/")).await;

    let resp = client()
        .get(format!("http://{addr}/assets/main-1a.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "console.log('main')");

    let resp = client()
        .get(format!("http://{addr}/assets/missing.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    // A directory without index.html is not listed.
    let resp = client()
        .get(format!("http://{addr}/assets/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let resp = client()
        .post(format!("http://{addr}/assets/main-1a.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn production_assets_live_under_base() {
    let tmp = tempdir().unwrap();
    let dist = tmp.path().join("dist");
    write_dist(&dist);
    let addr = spawn(prod(&dist, "/static/")).await;

    let resp = client()
        .get(format!("http://{addr}/static/assets/main-1a.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body = client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"src="/static/assets/main-1a.js""#), "{body}");
}

#[tokio::test]
async fn render_failure_is_500() {
    let addr = spawn(Vite::without_manifest(ViteConfig::default())).await;
    let resp = client().get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn dev_mode_proxies_assets_to_dev_server() {
    let upstream = MockServer::start();
    upstream.mock(|when, then| {
        when.method(GET).path("/app/main.ts");
        then.status(200)
            .header("Content-Type", "text/javascript")
            .body("export const x = 1");
    });

    let vite = Vite::without_manifest(ViteConfig {
        dev: true,
        port: upstream.port(),
        ..ViteConfig::default()
    });
    let addr = spawn(vite).await;

    let resp = client()
        .get(format!("http://{addr}/app/main.ts"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/javascript");
    assert_eq!(resp.text().await.unwrap(), "export const x = 1");

    let body = client()
        .get(format!("http://{addr}/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(&format!(
        "http://localhost:{}/@vite/client",
        upstream.port()
    )));

    let resp = client()
        .delete(format!("http://{addr}/app/main.ts"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dev_proxy_never_leaves_the_dev_server() {
    let upstream = MockServer::start();
    let dev_hit = upstream.mock(|when, then| {
        when.method(GET);
        then.status(200).body("dev");
    });
    let other = MockServer::start();
    let other_hit = other.mock(|when, then| {
        when.method(GET).path("/secret");
        then.status(200).body("other");
    });

    let vite = Vite::without_manifest(ViteConfig {
        dev: true,
        port: upstream.port(),
        ..ViteConfig::default()
    });
    let addr = spawn(vite).await;

    let resp = client()
        .get(format!("http://{addr}//127.0.0.1:{}/secret", other.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.text().await.unwrap(), "dev");
    dev_hit.assert_hits(1);
    other_hit.assert_hits(0);
}
