use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct MarkerView {
    id: String,
    label: String,
    count: i64,
}

#[derive(Debug, Deserialize)]
struct LogEntryView {
    key: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SessionView {
    owner_id: String,
    ready: bool,
    offset_ms: Option<i64>,
    markers: Vec<MarkerView>,
    total: i64,
    log: Vec<LogEntryView>,
    can_undo: bool,
    camera_number_text: String,
    error: Option<String>,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}", std::process::id(), nanos)
}

fn temp_file(name: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("timed_counter_{name}_{}", unique_suffix()));
    path.to_string_lossy().to_string()
}

fn write_marker_seed() -> String {
    let path = temp_file("markers.json");
    std::fs::write(
        &path,
        r##"[
  {"id": "A", "label": "Alpha", "color": ["#22e6d3", "#0092aa"], "order": 1},
  {"id": "Event", "label": "Event", "color": "#444444", "order": 2}
]"##,
    )
    .expect("write marker seed");
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/download")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_timed_counter"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", temp_file("store.json"))
        .env("APP_MARKERS_PATH", write_marker_seed())
        .env("APP_REFRESH_DELAY_MS", "50")
        .env("APP_REFRESH_SECS", "1")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

struct Page {
    client: Client,
    base_url: String,
    session: String,
}

impl Page {
    async fn open(server: &TestServer) -> Self {
        let client = Client::new();
        let html = client
            .get(format!("{}/timed-counter.html", server.base_url))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let marker = "const SESSION = '";
        let start = html.find(marker).expect("session id in page") + marker.len();
        let end = start + html[start..].find('\'').unwrap();
        Self {
            client,
            base_url: server.base_url.clone(),
            session: html[start..end].to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/sessions/{}{}", self.base_url, self.session, path)
    }

    async fn view(&self) -> SessionView {
        self.client.get(self.url("")).send().await.unwrap().json().await.unwrap()
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn start(&self, owner: &str, time: &str) -> SessionView {
        self.post("/start", serde_json::json!({ "owner_id": owner, "reference_time": time }))
            .await
            .json()
            .await
            .unwrap()
    }

    async fn wait_for_markers(&self) -> SessionView {
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            let view = self.view().await;
            if !view.markers.is_empty() {
                return view;
            }
            assert!(Instant::now() < deadline, "marker types never loaded");
            sleep(Duration::from_millis(50)).await;
        }
    }

    async fn download(&self) -> String {
        self.client
            .get(format!("{}/download", self.base_url))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    async fn wait_for_download(&self, accept: impl Fn(&str) -> bool) -> String {
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            let text = self.download().await;
            if accept(&text) {
                return text;
            }
            assert!(Instant::now() < deadline, "export never reached expected state:\n{text}");
            sleep(Duration::from_millis(50)).await;
        }
    }
}

fn lines_for<'a>(text: &'a str, owner: &str) -> Vec<&'a str> {
    let prefix = format!("{owner}: ");
    text.lines().filter(|line| line.starts_with(&prefix)).collect()
}

#[tokio::test]
async fn http_markers_are_recorded_and_exported() {
    let server = shared_server().await;
    let page = Page::open(&server).await;
    let owner = format!("bob{}", unique_suffix());

    let view = page.wait_for_markers().await;
    assert_eq!(view.markers[0].id, "A");
    assert_eq!(view.markers[0].label, "Alpha");

    let rejected = page.post("/markers/A", serde_json::json!({})).await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert!(page.view().await.error.is_some());

    let view = page.start(&owner, "9:00").await;
    assert!(view.ready);
    assert_eq!(view.owner_id, owner);
    assert!(view.offset_ms.is_some());

    page.post("/markers/A", serde_json::json!({})).await;
    let response = page.post("/markers/A", serde_json::json!({})).await;
    assert!(response.status().is_success());
    let view: SessionView = response.json().await.unwrap();
    assert_eq!(view.log.len(), 2);
    assert_ne!(view.log[0].key, view.log[1].key);
    assert_eq!(view.log[0].description, "Alpha");
    assert!(view.markers[0].count >= 1);
    assert!(view.total >= 1);

    let text = page
        .wait_for_download(|text| lines_for(text, &owner).len() == 2)
        .await;
    for line in lines_for(&text, &owner) {
        assert!(line.ends_with(" (Alpha)"), "unexpected line {line}");
    }
}

#[tokio::test]
async fn http_undo_removes_latest_record() {
    let server = shared_server().await;
    let page = Page::open(&server).await;
    let owner = format!("amy{}", unique_suffix());
    page.wait_for_markers().await;
    page.start(&owner, "10:30").await;

    page.post("/markers/Event", serde_json::json!({})).await;
    page.wait_for_download(|text| lines_for(text, &owner).len() == 1).await;

    let response = page.post("/undo", serde_json::json!({})).await;
    assert!(response.status().is_success());
    let view: SessionView = response.json().await.unwrap();
    assert!(view.log.is_empty());
    assert!(!view.can_undo);

    page.wait_for_download(|text| lines_for(text, &owner).is_empty()).await;

    let again = page.post("/undo", serde_json::json!({})).await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    assert_eq!(page.view().await.error.as_deref(), Some("nothing to undo"));

    let cleared = page.client.delete(page.url("/error")).send().await.unwrap();
    assert!(cleared.status().is_success());
    assert!(page.view().await.error.is_none());
}

#[tokio::test]
async fn http_comment_uses_keypad_camera_number() {
    let server = shared_server().await;
    let page = Page::open(&server).await;
    let owner = format!("cam{}", unique_suffix());
    page.start(&owner, "2:15 PM").await;

    page.post("/keypad", serde_json::json!({ "key": "4" })).await;
    let view: SessionView = page
        .post("/keypad", serde_json::json!({ "key": "2" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view.camera_number_text, "42");

    let view: SessionView = page
        .post("/comment", serde_json::json!({ "text": "gate open" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view.log.len(), 1);
    assert_eq!(view.log[0].description, "//gate open");
    assert_eq!(view.camera_number_text, "");

    let text = page
        .wait_for_download(|text| lines_for(text, &owner).len() == 1)
        .await;
    assert!(lines_for(&text, &owner)[0].ends_with(" C42 //gate open"));
}

#[tokio::test]
async fn http_blank_owner_can_retry_start() {
    let server = shared_server().await;
    let page = Page::open(&server).await;
    let owner = format!("eve{}", unique_suffix());

    let view = page.start("", "9:00").await;
    assert!(!view.ready);

    let view = page.start(&owner, "9:00").await;
    assert!(view.ready);
    assert_eq!(view.owner_id, owner);
    assert!(view.offset_ms.is_some());

    page.wait_for_markers().await;
    let response = page.post("/markers/A", serde_json::json!({})).await;
    assert!(response.status().is_success());
}

#[tokio::test]
async fn http_root_is_the_tool_launcher() {
    let server = shared_server().await;
    let html = Client::new()
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Select Tool"));
    assert!(html.contains("href=\"/timed-counter.html\""));
    assert!(!html.contains("const SESSION"));
}

#[tokio::test]
async fn http_unparseable_time_is_ignored() {
    let server = shared_server().await;
    let page = Page::open(&server).await;

    let view = page.start("dan", "banana").await;
    assert!(!view.ready);
    assert!(view.offset_ms.is_none());
    assert!(view.error.is_none());
}

#[tokio::test]
async fn http_unknown_session_is_not_found() {
    let server = shared_server().await;
    let response = Client::new()
        .get(format!(
            "{}/api/sessions/00000000-0000-0000-0000-000000000000",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_download_is_a_named_attachment() {
    let server = shared_server().await;
    let response = Client::new()
        .get(format!("{}/download", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"TimedCounterData.txt\"");
}
