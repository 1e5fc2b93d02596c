//! Scraping backend tools.
//!
//! Both tools share one [`ScraperClient`].

mod client;
mod login;
mod products;

pub use client::{Product, ScraperClient};
pub use login::{CheckTokopediaLoginParams, CheckTokopediaLoginTool};
pub use products::{ScrapeTokopediaParams, ScrapeTokopediaTool, format_products};

/// In-process stand-in for the scraping backend, used by tests.
#[cfg(test)]
pub(crate) mod stub {
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::HeaderMap,
        routing::get,
    };
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    use crate::core::session::SESSION_HEADER;

    /// Last `mcp-session-id` header the stub received.
    pub type StubState = Arc<Mutex<Option<String>>>;

    pub struct StubBackend {
        pub base_url: String,
        seen: StubState,
        handle: JoinHandle<()>,
    }

    impl StubBackend {
        pub async fn start(routes: Router<StubState>) -> Self {
            let seen = StubState::default();
            let app = routes.with_state(seen.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let handle = tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            Self {
                base_url: format!("http://{addr}"),
                seen,
                handle,
            }
        }

        pub async fn last_session(&self) -> Option<String> {
            self.seen.lock().await.clone()
        }
    }

    impl Drop for StubBackend {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    async fn record(seen: &StubState, headers: &HeaderMap) {
        let session = headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *seen.lock().await = session;
    }

    async fn products(
        State(seen): State<StubState>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        record(&seen, &headers).await;
        let keyword = query.get("keyword").cloned().unwrap_or_default();
        Json(json!({
            "source": "Tokopedia",
            "keyword": keyword,
            "results": [{
                "title": format!("{keyword} deluxe"),
                "price": "Rp1.000.000",
                "image": "https://images.example.com/1.png",
                "link": "https://www.tokopedia.com/p/1",
                "rating": "4.8",
                "store": "Toko Maju"
            }]
        }))
    }

    pub fn products_route() -> Router<StubState> {
        Router::new().route("/scraper/tokopedia", get(products))
    }

    pub fn auth_route(authenticated: bool) -> Router<StubState> {
        Router::new().route(
            "/auth/check-cookies",
            get(move |State(seen): State<StubState>, headers: HeaderMap| async move {
                record(&seen, &headers).await;
                Json(json!({ "authenticated": authenticated }))
            }),
        )
    }
}
