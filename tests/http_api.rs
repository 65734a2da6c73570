use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use repodesk::config::AppConfig;
use repodesk::server::{self, AppState, SESSION_HEADER};

struct TestServer {
    base: String,
    http: reqwest::Client,
    _repos: TempDir,
}

impl TestServer {
    async fn start(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let repos = TempDir::new().unwrap();
        let repo_dir = repos.path().join("octo_demo");
        std::fs::create_dir_all(repo_dir.join(".git")).unwrap();
        std::fs::create_dir_all(repo_dir.join("src")).unwrap();
        std::fs::write(repo_dir.join("README.md"), "# Demo\nfoo bar").unwrap();
        std::fs::write(repo_dir.join("src/main.py"), "print('foo')\n# FOO\n").unwrap();

        let mut config = AppConfig::default();
        config.github.repos_directory = repos.path().to_path_buf();
        configure(&mut config);

        let state = AppState::from_config(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, server::router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}/api", addr),
            http: reqwest::Client::new(),
            _repos: repos,
        }
    }

    fn get(&self, session: &str, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.base, path))
            .header(SESSION_HEADER, session)
    }

    fn post(&self, session: &str, path: &str, body: Value) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{}", self.base, path))
            .header(SESSION_HEADER, session)
            .json(&body)
    }

    fn delete(&self, session: &str, path: &str) -> reqwest::RequestBuilder {
        self.http
            .delete(format!("{}{}", self.base, path))
            .header(SESSION_HEADER, session)
    }

    async fn switch_to_demo(&self, session: &str) {
        let resp = self
            .post(session, "/repo/switch", json!({"owner": "octo", "repo": "demo"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }
}

async fn json_of(resp: reqwest::Response) -> (u16, Value) {
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn tree_paths(body: &Value) -> Vec<String> {
    body["file_tree"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_file_routes_require_a_repository() {
    let server = TestServer::start(|_| {}).await;

    let (status, body) = json_of(server.get("s1", "/files/tree").send().await.unwrap()).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No repository selected");

    let (status, body) = json_of(server.get("s1", "/repo/current").send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert!(body["current_repo"].is_null());
}

#[tokio::test]
async fn test_switch_then_list_tree() {
    let server = TestServer::start(|_| {}).await;

    let (status, body) = json_of(server.get("s1", "/repo/list").send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(body["repositories"][0]["owner"], "octo");
    assert_eq!(body["repositories"][0]["repo"], "demo");
    let modified = body["repositories"][0]["last_modified"].as_f64().unwrap();
    assert!(modified > 1_000_000_000.0);

    let (status, body) = json_of(
        server
            .post("s1", "/repo/switch", json!({"owner": "octo", "repo": "missing"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Repository not found locally");

    server.switch_to_demo("s1").await;

    let (status, body) = json_of(server.get("s1", "/files/tree").send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(tree_paths(&body), vec!["README.md", "src", "src/main.py"]);
    assert_eq!(body["file_tree"][1]["type"], "directory");
    assert_eq!(body["repository"]["owner"], "octo");

    let (_, body) = json_of(
        server
            .get("s1", "/files/tree?max_depth=0")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(tree_paths(&body), vec!["README.md", "src"]);

    // Unparsable numbers use the configured default
    let (status, body) = json_of(
        server
            .get("s1", "/files/tree?max_depth=abc")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(tree_paths(&body), vec!["README.md", "src", "src/main.py"]);

    // Another session has no repository selected
    let (status, _) = json_of(server.get("s2", "/files/tree").send().await.unwrap()).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_save_read_create_delete() {
    let server = TestServer::start(|_| {}).await;
    server.switch_to_demo("s1").await;

    let (status, body) = json_of(
        server
            .post("s1", "/files/save", json!({"path": "a/b.txt", "content": "hi"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "File saved successfully");
    assert_eq!(body["size"], 2);

    let (status, body) = json_of(
        server
            .get("s1", "/files/content?path=a/b.txt")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["content"], "hi");
    assert_eq!(body["mime_type"], "text/plain");
    assert_eq!(body["encoding"], "utf-8");

    let (status, body) = json_of(
        server
            .post("s1", "/files/create", json!({"path": "a/b.txt", "content": "other"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "File already exists");
    assert_eq!(body["details"]["kind"], "already_exists");

    let (_, body) = json_of(
        server
            .get("s1", "/files/content?path=a/b.txt")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["content"], "hi");

    let (status, body) = json_of(
        server
            .post("s1", "/files/save", json!({"path": "../escape.txt", "content": "x"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "File path outside repository");

    let (status, body) = json_of(
        server
            .delete("s1", "/files/delete?path=a/b.txt")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "File deleted successfully");

    let (status, _) = json_of(
        server
            .delete("s1", "/files/delete?path=a/b.txt")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 404);

    let (status, body) = json_of(
        server
            .post("s1", "/files/save", json!({"path": "x.txt"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "File content is required");
}

#[tokio::test]
async fn test_search_by_name_and_content() {
    let server = TestServer::start(|_| {}).await;
    server.switch_to_demo("s1").await;

    let (status, body) = json_of(
        server
            .get("s1", "/files/search?q=main")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["search_type"], "name");
    assert_eq!(body["total_found"], 1);
    assert_eq!(body["results"][0]["path"], "src/main.py");

    let (_, body) = json_of(
        server
            .get("s1", "/files/search?q=foo&type=content")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["total_found"], 2);
    assert_eq!(body["results"][0]["path"], "README.md");
    assert_eq!(body["results"][0]["matches"], 1);
    assert_eq!(body["results"][1]["matches"], 2);

    let (status, body) = json_of(
        server
            .get("s1", "/files/search?q=foo&type=regex")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Unknown search type: regex");

    let (status, _) = json_of(server.get("s1", "/files/search?q=").send().await.unwrap()).await;
    assert_eq!(status, 400);

    let (status, body) = json_of(
        server
            .get("s1", "/files/search?q=foo&type=content&max_results=-1")
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["total_found"], 2);
}

#[tokio::test]
async fn test_session_id_is_minted_and_returned() {
    let server = TestServer::start(|_| {}).await;

    let resp = server
        .http
        .get(format!("{}/repo/current", server.base))
        .send()
        .await
        .unwrap();
    let minted = resp
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(!minted.is_empty());
    let cookie = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("repodesk_session={}", minted)));

    let resp = server.get("chosen-id", "/repo/current").send().await.unwrap();
    assert_eq!(resp.headers().get(SESSION_HEADER).unwrap(), "chosen-id");
    assert!(resp.headers().get("set-cookie").is_none());
}

async fn start_mock_completion(seen: Arc<Mutex<Vec<usize>>>) -> SocketAddr {
    let app = Router::new().route(
        "/chat/completions",
        post(move |Json(body): Json<Value>| {
            let seen = seen.clone();
            async move {
                let count = body["messages"].as_array().map(|m| m.len()).unwrap_or(0);
                seen.lock().unwrap().push(count);
                Json(json!({
                    "model": "mock-model",
                    "choices": [{"message": {"role": "assistant", "content": "Hello from mock"}}],
                    "usage": {"total_tokens": 7}
                }))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_chat_history_grows_and_clears() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mock = start_mock_completion(seen.clone()).await;
    let server = TestServer::start(|config| {
        config.openrouter.api_key = "test-key".to_string();
        config.openrouter.base_url = format!("http://{}", mock);
    })
    .await;

    for _ in 0..2 {
        let (status, body) = json_of(
            server
                .post("s1", "/chat/message", json!({"message": "hello"}))
                .send()
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["response"], "Hello from mock");
        assert_eq!(body["model"], "mock-model");
        assert_eq!(body["usage"]["total_tokens"], 7);
    }
    // system + user, then system + one prior exchange + user
    assert_eq!(*seen.lock().unwrap(), vec![2, 4]);

    let (_, body) = json_of(server.get("s1", "/chat/history").send().await.unwrap()).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "assistant");

    let (_, body) = json_of(server.get("s2", "/chat/history").send().await.unwrap()).await;
    assert!(body["history"].as_array().unwrap().is_empty());

    let (status, body) = json_of(server.delete("s1", "/chat/clear").send().await.unwrap()).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Chat history cleared successfully");

    let (_, body) = json_of(server.get("s1", "/chat/history").send().await.unwrap()).await;
    assert!(body["history"].as_array().unwrap().is_empty());

    let (status, body) = json_of(
        server
            .post("s1", "/chat/message", json!({"message": "   "}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Message cannot be empty");
}

#[tokio::test]
async fn test_chat_without_api_key_fails() {
    let server = TestServer::start(|_| {}).await;

    let (status, body) = json_of(
        server
            .post("s1", "/chat/message", json!({"message": "hello"}))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("OpenRouter API key not configured"));

    let (_, body) = json_of(server.get("s1", "/chat/config").send().await.unwrap()).await;
    assert_eq!(body["current_model"], "google/gemini-2.0-flash-exp:free");
    assert_eq!(body["max_history"], 50);
}
