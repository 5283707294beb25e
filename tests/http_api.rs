use RustedIntegrals::Utils::config::Config;
use RustedIntegrals::api;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

async fn start_server() -> SocketAddr {
    let config = Config { samples: 80, ..Config::default() };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { api::serve_on(listener, &config).await });
    addr
}

async fn calculate(addr: SocketAddr, body: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{}/calculate-integral", addr))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn power_rule_and_graph() {
    let addr = start_server().await;
    let graph = reqwest::get(format!("http://{}/get-graph", addr)).await.unwrap();
    assert_eq!(graph.status(), 200);
    assert_eq!(graph.json::<Value>().await.unwrap(), json!({"error": "No hay gráfica generada."}));

    let reply = calculate(addr, json!({"expression": "x**2"})).await;
    assert_eq!(reply["indefinite_integral"], "x^3/3");
    assert_eq!(reply["defined_integral"], "No se proporcionaron límites");

    let graph = reqwest::get(format!("http://{}/get-graph", addr)).await.unwrap();
    assert_eq!(graph.headers()["content-type"], "image/png");
    let bytes = graph.bytes().await.unwrap();
    assert_eq!(bytes[..8], PNG_SIGNATURE);
}

#[tokio::test]
async fn sum_is_explained_term_by_term() {
    let addr = start_server().await;
    let reply = calculate(addr, json!({"expression": "sin(x)+x**2"})).await;
    let steps: Vec<String> = serde_json::from_value(reply["explanation"].clone()).unwrap();
    assert!(steps.iter().any(|s| s.contains("Descomponer")));
    let applied: Vec<&String> = steps.iter().filter(|s| s.starts_with("2. Aplicar")).collect();
    assert_eq!(applied.len(), 2);
    assert!(applied[0].contains("trigonométrica"));
    assert!(applied[1].contains("potencias"));
}

#[tokio::test]
async fn definite_integral_needs_both_bounds() {
    let addr = start_server().await;
    let reply = calculate(addr, json!({"expression": "x", "lower_limit": 0, "upper_limit": 1})).await;
    assert_eq!(reply["defined_integral"], "0.5");
    let reply = calculate(addr, json!({"expression": "x", "upper_limit": 1})).await;
    assert_eq!(reply["defined_integral"], "No se proporcionaron límites");
    let reply = calculate(addr, json!({"expression": "x", "lower_limit": 0, "upper_limit": null})).await;
    assert_eq!(reply["defined_integral"], "No se proporcionaron límites");
}

#[tokio::test]
async fn parse_error_leaves_graph_untouched() {
    let addr = start_server().await;
    let reply = calculate(addr, json!({"expression": "x+*"})).await;
    assert_eq!(reply, json!({"error": "Error en la expresión matemática proporcionada."}));
    let graph: Value = reqwest::get(format!("http://{}/get-graph", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graph["error"], "No hay gráfica generada.");

    calculate(addr, json!({"expression": "x"})).await;
    let before = reqwest::get(format!("http://{}/get-graph", addr)).await.unwrap().bytes().await.unwrap();
    let reply = calculate(addr, json!({"expression": "1/x**2", "lower_limit": -1, "upper_limit": 1})).await;
    assert!(reply["error"].as_str().unwrap().starts_with("Error al calcular la integral definida:"));
    let after = reqwest::get(format!("http://{}/get-graph", addr)).await.unwrap().bytes().await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn divergent_integral_is_an_error() {
    let addr = start_server().await;
    let reply = calculate(addr, json!({"expression": "1/x", "lower_limit": 0, "upper_limit": 1})).await;
    let message = reply["error"].as_str().unwrap();
    assert!(message.starts_with("Error al calcular la integral definida:"));
    assert!(reply.get("defined_integral").is_none());
    let reply = calculate(addr, json!({"expression": "1/x", "lower_limit": -2, "upper_limit": -1})).await;
    assert_eq!(reply["defined_integral"], (-(2.0_f64.ln())).to_string());
}

#[tokio::test]
async fn identical_input_identical_output() {
    let addr = start_server().await;
    let body = json!({"expression": "x*exp(x) + cos(x)", "lower_limit": 0, "upper_limit": 2});
    let first = calculate(addr, body.clone()).await;
    let first_png = reqwest::get(format!("http://{}/get-graph", addr)).await.unwrap().bytes().await.unwrap();
    let second = calculate(addr, body).await;
    let second_png = reqwest::get(format!("http://{}/get-graph", addr)).await.unwrap().bytes().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first_png, second_png);
}

#[tokio::test]
async fn exponential_shorthand() {
    let addr = start_server().await;
    let reply = calculate(addr, json!({"expression": "e**x"})).await;
    assert_eq!(reply["indefinite_integral"], "exp(x)");
}

#[tokio::test]
async fn graphs_are_kept_per_session() {
    let addr = start_server().await;
    let client = reqwest::Client::new();
    client
        .post(format!("http://{}/calculate-integral", addr))
        .header("X-Session-Id", "alice")
        .json(&json!({"expression": "x"}))
        .send()
        .await
        .unwrap();
    let alice = client
        .get(format!("http://{}/get-graph", addr))
        .header("X-Session-Id", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(alice.headers()["content-type"], "image/png");
    let shared: Value = client.get(format!("http://{}/get-graph", addr)).send().await.unwrap().json().await.unwrap();
    assert_eq!(shared["error"], "No hay gráfica generada.");
}

#[tokio::test]
async fn cors_allows_credentials() {
    let addr = start_server().await;
    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("http://{}/calculate-integral", addr))
        .header("Origin", "http://frontend.example")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://frontend.example");
    assert_eq!(headers["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn health_and_bad_body() {
    let addr = start_server().await;
    let health: Value = reqwest::get(format!("http://{}/health", addr)).await.unwrap().json().await.unwrap();
    assert_eq!(health, json!({"status": "ok"}));
    let response = reqwest::Client::new()
        .post(format!("http://{}/calculate-integral", addr))
        .json(&json!({"formula": "x"}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
