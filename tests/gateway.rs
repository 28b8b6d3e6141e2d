#![allow(non_snake_case)]

use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use gamble_sui::{
    Error,
    chain::{
        ChainReader,
        ContractConfig,
    },
    gateway::{
        ChainQuery,
        GraphQlClient,
    },
    pools::MIST_PER_SUI,
    test_helpers::{
        pool_node,
        pools_response,
    },
};
use serde_json::{
    Value,
    json,
};
use std::{
    net::TcpListener,
    sync::{
        Arc,
        Mutex,
        mpsc,
    },
    thread::JoinHandle,
    time::Duration,
};

/// GraphQL endpoint answering every POST with a fixed status and body.
struct FakeEndpoint {
    url: String,
    received: Arc<Mutex<Vec<Value>>>,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl FakeEndpoint {
    fn serve(status: u16, body: Value, delay: Duration) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let url = format!("http://{}/graphql", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));
        let server_received = Arc::clone(&received);
        let (handle_tx, handle_rx) = mpsc::channel();

        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            sys.block_on(async move {
                let server = HttpServer::new(move || {
                    let body = body.clone();
                    let received = Arc::clone(&server_received);
                    App::new().route(
                        "/graphql",
                        web::post().to(move |request: web::Json<Value>| {
                            let body = body.clone();
                            let received = Arc::clone(&received);
                            async move {
                                received.lock().unwrap().push(request.into_inner());
                                actix_web::rt::time::sleep(delay).await;
                                HttpResponse::build(StatusCode::from_u16(status).unwrap()).json(body)
                            }
                        }),
                    )
                })
                .workers(1)
                .shutdown_timeout(1)
                .listen(listener)
                .unwrap()
                .run();
                let _ = handle_tx.send(server.handle());
                let _ = server.await;
            });
        });

        Self {
            url,
            received,
            server_handle: handle_rx.recv().unwrap(),
            server_thread: Some(server_thread),
        }
    }

    fn client(&self) -> GraphQlClient {
        GraphQlClient::new(self.url.clone(), Duration::from_secs(5)).unwrap()
    }

    fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for FakeEndpoint {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(false);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

#[tokio::test]
async fn query__returns_data_and_sends_variables() {
    // given
    let endpoint = FakeEndpoint::serve(200, json!({ "data": { "ok": 1 } }), Duration::ZERO);

    // when
    let data = endpoint
        .client()
        .query("query { ok }", Some(json!({ "first": 50 })))
        .await
        .unwrap();

    // then
    assert_eq!(data, json!({ "ok": 1 }));
    let received = endpoint.received();
    assert_eq!(received[0]["query"], "query { ok }");
    assert_eq!(received[0]["variables"]["first"], 50);
}

#[tokio::test]
async fn query__errors_list__is_query_error() {
    // given
    let endpoint = FakeEndpoint::serve(
        200,
        json!({ "data": null, "errors": [{ "message": "boom" }] }),
        Duration::ZERO,
    );

    // when
    let err = endpoint.client().query("query { x }", None).await.unwrap_err();

    // then
    assert!(matches!(&err, Error::Query(messages) if messages == &vec!["boom".to_string()]));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn query__http_failure__is_transport_error() {
    let endpoint = FakeEndpoint::serve(500, json!({ "error": "down" }), Duration::ZERO);
    let err = endpoint.client().query("query { x }", None).await.unwrap_err();
    assert!(matches!(err, Error::Transport { status: Some(500), .. }));
}

#[tokio::test]
async fn query__slow_endpoint__times_out() {
    // given
    let endpoint = FakeEndpoint::serve(200, json!({ "data": {} }), Duration::from_secs(3));
    let client = GraphQlClient::new(endpoint.url.clone(), Duration::from_millis(200)).unwrap();

    // when
    let err = client.query("query { x }", None).await.unwrap_err();

    // then
    assert!(matches!(err, Error::Timeout(timeout) if timeout == Duration::from_millis(200)));
}

#[tokio::test]
async fn fetch_pools__over_http__decodes_nodes() {
    // given
    let endpoint = FakeEndpoint::serve(
        200,
        json!({ "data": pools_response(vec![pool_node("0x0a", MIST_PER_SUI, 4 * MIST_PER_SUI, 1_700_000_000_000)]) }),
        Duration::ZERO,
    );
    let reader = ChainReader::new(endpoint.client(), ContractConfig::new("0xbeef".parse().unwrap()));

    // when
    let pools = reader.fetch_pools().await.unwrap();

    // then
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].pot_mist, 4 * MIST_PER_SUI);
    assert_eq!(pools[0].ticket_price_mist, MIST_PER_SUI);
    let filter_type = &endpoint.received()[0]["variables"]["type"];
    assert!(filter_type.as_str().unwrap().ends_with("::suipredict::Pool"));
}
