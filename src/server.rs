use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Form, Request, State};
use axum::handler::HandlerWithoutStateExt as _;
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::counter;
use crate::pages::{self, IndexPage, ProfilePage};
use crate::vite::Vite;

pub const NAME_COOKIE: &str = "Name-State";

#[derive(Clone)]
pub struct AppState {
    vite: Arc<Vite>,
    upstream: reqwest::Client,
}

impl AppState {
    pub fn new(vite: Vite) -> anyhow::Result<Self> {
        let upstream = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            vite: Arc::new(vite),
            upstream,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/profile", get(profile).post(save_profile));

    let config = state.vite.config();
    let router = if config.dev {
        router.fallback(dev_proxy)
    } else {
        let assets = ServeDir::new(&config.output)
            .call_fallback_on_method_not_allowed(true)
            .fallback(not_found.into_service());
        let base = config.base.trim_end_matches('/');
        if base.is_empty() {
            router.fallback_service(assets)
        } else {
            router.nest_service(base, assets)
        }
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn serve(addr: SocketAddr, vite: Vite) -> anyhow::Result<()> {
    let dev = vite.config().dev;
    let state = AppState::new(vite)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, dev, "listening");
    axum::serve(listener, app(state))
        .await
        .context("serve http")
}

fn render(page: &str, result: anyhow::Result<String>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            tracing::error!(page, error = %format!("{err:#}"), "render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn cookie_value(jar: &CookieJar, name: &str) -> String {
    jar.get(name)
        .map(|c| c.value().to_string())
        .unwrap_or_default()
}

/// `GET /` — greeting and counter seeded from cookies.
async fn index(State(state): State<AppState>, jar: CookieJar) -> Response {
    let name = cookie_value(&jar, NAME_COOKIE);
    let count = cookie_value(&jar, counter::COOKIE_NAME)
        .parse::<i64>()
        .unwrap_or(0);
    render(
        "index",
        pages::render_index(
            &state.vite,
            &IndexPage {
                title: "Welcome",
                name: &name,
                count,
            },
        ),
    )
}

/// `GET /profile`
async fn profile(State(state): State<AppState>, jar: CookieJar) -> Response {
    let name = cookie_value(&jar, NAME_COOKIE);
    render(
        "profile",
        pages::render_profile(
            &state.vite,
            &ProfilePage {
                title: "Profile",
                name: &name,
            },
        ),
    )
}

#[derive(Debug, Deserialize)]
struct ProfileForm {
    #[serde(default)]
    name: String,
}

/// `POST /profile` — remembers the name and goes back home.
async fn save_profile(jar: CookieJar, Form(form): Form<ProfileForm>) -> Response {
    let cookie = Cookie::build((NAME_COOKIE, form.name)).path("/");
    (
        StatusCode::FOUND,
        jar.add(cookie),
        [(header::LOCATION, "/")],
    )
        .into_response()
}

const HOP_BY_HOP: [header::HeaderName; 3] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards asset requests to the bundler's dev server.
async fn dev_proxy(State(state): State<AppState>, req: Request) -> Response {
    if req.method() != Method::GET {
        return not_found().await.into_response();
    }
    // Path and query are set on the origin, never resolved against it, so a
    // `//host/...` request path cannot change the upstream authority.
    let mut url = match Url::parse(&state.vite.dev_origin()) {
        Ok(url) => url,
        Err(err) => return (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    };
    url.set_path(req.uri().path());
    url.set_query(req.uri().query());

    let mut headers = req.headers().clone();
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }

    let resp = match state.upstream.get(url.clone()).headers(headers).send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(%url, error = %err, "dev server unreachable");
            return (StatusCode::BAD_GATEWAY, err.to_string()).into_response();
        }
    };

    let status = resp.status();
    let mut out_headers = HeaderMap::new();
    for (name, value) in resp.headers() {
        if !HOP_BY_HOP.contains(name) {
            out_headers.append(name.clone(), value.clone());
        }
    }
    match resp.bytes().await {
        Ok(body) => (status, out_headers, body).into_response(),
        Err(err) => {
            tracing::warn!(%url, error = %err, "read dev server response");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}
