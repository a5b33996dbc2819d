#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The HTTP administration surface: CRUD over dependencies and proxy
//! configs, read-only instances, with filtering and pagination on the list
//! routes.

mod dependencies;
mod error;
mod filter;
mod instances;
mod io;
mod proxy_configs;

use crate::io::TimedStream;
use axum::routing::get;
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use lattice_config::{DependenciesController, InstancesController, ProxyConfigsController};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;
use tracing::{debug, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dependencies: DependenciesController,
    pub(crate) proxy_configs: ProxyConfigsController,
    pub(crate) instances: InstancesController,
}

/// Connection timeouts, all off unless configured.
///
/// `read_header_timeout` and `idle_timeout` ride on hyper's header timer,
/// which runs both while a keep-alive connection sits idle and while a
/// request's headers trickle in, so the stricter of the two applies there.
/// `read_timeout` and `write_timeout` are socket-level inactivity deadlines.
#[derive(Clone, Debug, Default)]
pub struct ServerOptions {
    pub read_timeout: Option<Duration>,
    pub read_header_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
}

/// The admin API server.
pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
    options: ServerOptions,
}

impl ApiServer {
    pub fn new(
        addr: SocketAddr,
        dependencies: DependenciesController,
        proxy_configs: ProxyConfigsController,
        instances: InstancesController,
    ) -> Self {
        Self {
            addr,
            state: AppState {
                dependencies,
                proxy_configs,
                instances,
            },
            options: ServerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Serves until the drain watch fires, then finishes in-flight requests
    /// within a short grace period.
    pub async fn serve(self, drain: drain::Watch) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %listener.local_addr()?, "admin API listening");

        let options = self.options;
        let app = router(self.state);
        let service = hyper::service::service_fn(
            move |request: hyper::Request<hyper::body::Incoming>| {
                app.clone().oneshot(request.map(axum::body::Body::new))
            },
        );

        let mut builder = auto::Builder::new(TokioExecutor::new());
        {
            let mut http1 = builder.http1();
            http1.timer(TokioTimer::new());
            if let Some(timeout) = min_timeout(options.read_header_timeout, options.idle_timeout) {
                http1.header_read_timeout(timeout);
            }
        }
        let graceful = GracefulShutdown::new();

        let signaled = drain.signaled();
        tokio::pin!(signaled);

        let handle = loop {
            tokio::select! {
                handle = &mut signaled => break handle,
                accepted = listener.accept() => {
                    let (stream, _peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(error) => {
                            debug!(%error, "failed to accept an admin connection");
                            continue;
                        }
                    };
                    let stream = TimedStream::new(
                        stream,
                        options.read_timeout,
                        options.write_timeout,
                    );
                    let conn = builder
                        .serve_connection(TokioIo::new(stream), service.clone())
                        .into_owned();
                    let conn = graceful.watch(conn);
                    tokio::spawn(async move {
                        if let Err(error) = conn.await {
                            debug!(%error, "admin connection closed with an error");
                        }
                    });
                }
            }
        };

        drop(listener);
        handle
            .release_after(async {
                tokio::select! {
                    _ = graceful.shutdown() => {}
                    _ = tokio::time::sleep(SHUTDOWN_GRACE) => {}
                }
            })
            .await;
        Ok(())
    }
}

fn min_timeout(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (timeout, None) => timeout,
        (None, timeout) => timeout,
    }
}

async fn ping() -> &'static str {
    "PONG"
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route(
            "/dependencies",
            get(dependencies::list).post(dependencies::add),
        )
        .route(
            "/dependencies/:service",
            get(dependencies::get)
                .put(dependencies::update)
                .delete(dependencies::delete),
        )
        .route(
            "/proxy-configs",
            get(proxy_configs::list).post(proxy_configs::add),
        )
        .route(
            "/proxy-configs/:service",
            get(proxy_configs::get)
                .put(proxy_configs::update)
                .delete(proxy_configs::delete),
        )
        .route("/instances", get(instances::list))
        .route("/instances/:instance", get(instances::get))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use lattice_config::{Controller, MemoryStore};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn app() -> Router {
        let controller = Controller::new(Arc::new(MemoryStore::new()));
        let state = AppState {
            dependencies: controller.dependencies(),
            proxy_configs: controller.proxy_configs(),
            instances: controller.instances(),
        };
        router(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn stricter_header_timeout_wins() {
        let a = Some(Duration::from_secs(5));
        let b = Some(Duration::from_secs(30));
        assert_eq!(min_timeout(a, b), a);
        assert_eq!(min_timeout(None, b), b);
        assert_eq!(min_timeout(a, None), a);
        assert_eq!(min_timeout(None, None), None);
    }

    #[tokio::test]
    async fn ping_pongs() {
        let response = app().oneshot(get_request("/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"PONG");
    }

    #[tokio::test]
    async fn dependency_crud_and_status_codes() {
        let app = app();

        let response = app
            .clone()
            .oneshot(get_request("/dependencies/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json!({"service_name": "svc", "dependencies": ["a", "b"]});
        let response = app
            .clone()
            .oneshot(json_request("POST", "/dependencies", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // A conflicting add is a bad request.
        let response = app
            .clone()
            .oneshot(json_request("POST", "/dependencies", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(get_request("/dependencies/svc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["service_name"], "svc");
        assert_eq!(fetched["dependencies"], json!(["a", "b"]));

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/dependencies/svc",
                json!({"service_name": "svc", "dependencies": ["c"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/dependencies/svc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/dependencies/svc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_filters_with_a_regex_and_paginates() {
        let app = app();
        for name in ["svc_1", "svc_foo"] {
            let body = json!({"service_name": name, "dependencies": []});
            let response = app
                .clone()
                .oneshot(json_request("POST", "/dependencies", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // service_name=re:svc_[0-9]+ with the regex percent-encoded.
        let response = app
            .clone()
            .oneshot(get_request("/dependencies?service_name=re%3Asvc_%5B0-9%5D%2B"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["page_num"], 0);
        assert_eq!(page["page_size"], 10);
        assert_eq!(page["total"], 1);
        assert_eq!(page["data"][0]["service_name"], "svc_1");

        // A bad regex is the caller's fault.
        let response = app
            .clone()
            .oneshot(get_request("/dependencies?service_name=re%3A%5B"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Negative paging values coerce to defaults.
        let response = app
            .clone()
            .oneshot(get_request("/dependencies?page_num=-1&page_size=-5"))
            .await
            .unwrap();
        let page = body_json(response).await;
        assert_eq!(page["page_num"], 0);
        assert_eq!(page["page_size"], 10);
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn proxy_config_validation_is_a_bad_request() {
        let app = app();
        let body = json!({
            "service_name": "svc",
            "config": {"listener": {"address": "not-an-addr"}, "protocol": "tcp"}
        });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/proxy-configs", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // An explicitly null config is legal.
        let body = json!({"service_name": "svc", "config": null});
        let response = app
            .clone()
            .oneshot(json_request("POST", "/proxy-configs", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn instances_are_read_only_routes() {
        let app = app();
        let response = app
            .clone()
            .oneshot(get_request("/instances"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page["total"], 0);

        let response = app
            .clone()
            .oneshot(get_request("/instances/i-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/instances", json!({"id": "i-1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
