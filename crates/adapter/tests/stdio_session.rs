use anyhow::Context as _;
use axum::Router;
use axum::extract::Path;
use axum::routing::get;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const SPEC: &str = r#"
openapi: "3.0.3"
info:
  title: "Users & Posts API"
  version: "2.1.0"
paths:
  /users/{userId}:
    get:
      operationId: getUser
      summary: Fetch one user
      parameters:
        - name: userId
          in: path
          required: true
          schema: { type: string }
      responses:
        "200": { description: ok }
"#;

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Session {
    fn spawn(spec_path: &std::path::Path, base_url: &str) -> anyhow::Result<Self> {
        let mut child = Command::new(env!("CARGO_BIN_EXE_openapi-mcp-adapter"))
            .arg("--spec")
            .arg(spec_path)
            .arg("--base-url")
            .arg(base_url)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("spawn adapter")?;

        let stdin = child.stdin.take().context("adapter stdin")?;
        let stdout = child.stdout.take().context("adapter stdout")?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    async fn send(&mut self, message: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn request(&mut self, id: u64, method: &str, params: Value) -> anyhow::Result<Value> {
        self.send(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await?;

        tokio::time::timeout(Duration::from_secs(20), async {
            loop {
                let line = self
                    .stdout
                    .next_line()
                    .await?
                    .context("adapter closed stdout")?;
                let msg: Value = serde_json::from_str(&line)
                    .with_context(|| format!("non-JSON line on stdout: {line}"))?;
                if msg.get("id") == Some(&json!(id)) {
                    return Ok(msg);
                }
            }
        })
        .await
        .context("timed out waiting for response")?
    }

    async fn initialize(&mut self) -> anyhow::Result<Value> {
        let resp = self
            .request(
                1,
                "initialize",
                json!({
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": {"name": "stdio-session-test", "version": "0.0.0"},
                }),
            )
            .await?;
        self.send(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await?;
        Ok(resp)
    }
}

#[tokio::test]
async fn lists_and_calls_tools_over_stdio() -> anyhow::Result<()> {
    let app = Router::new().route(
        "/users/{userId}",
        get(|Path(user_id): Path<String>| async move {
            axum::Json(json!({"id": user_id, "name": "Ada"}))
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.context("bind")?;
    let addr = listener.local_addr().context("local_addr")?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let server_handle = tokio::spawn(async move { server.await });

    let dir = tempdir().context("create temp dir")?;
    let spec_path = dir.path().join("users.yaml");
    std::fs::write(&spec_path, SPEC).context("write spec")?;

    let mut session = Session::spawn(&spec_path, &format!("http://{addr}"))?;

    let init = session.initialize().await?;
    assert_eq!(init["result"]["serverInfo"]["name"], "users_and_posts_api");
    assert_eq!(init["result"]["serverInfo"]["version"], "2.1.0");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    let list = session.request(2, "tools/list", json!({})).await?;
    let tools = list["result"]["tools"]
        .as_array()
        .context("tools/list missing result.tools")?;
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "users_and_posts_api_getuser");
    assert_eq!(
        tools[0]["description"],
        "getUser Fetch one user "
    );
    assert_eq!(
        tools[0]["inputSchema"]["properties"]["pathNames"]["required"],
        json!(["userId"])
    );
    assert_eq!(tools[0]["annotations"]["readOnlyHint"], true);

    let call = session
        .request(
            3,
            "tools/call",
            json!({
                "name": "users_and_posts_api_getuser",
                "arguments": {"pathNames": {"userId": "u-42"}},
            }),
        )
        .await?;
    assert_eq!(call["result"]["isError"], false);
    let text = call["result"]["content"][0]["text"]
        .as_str()
        .context("content[0].text")?;
    let body: Value = serde_json::from_str(text)?;
    assert_eq!(body, json!({"id": "u-42", "name": "Ada"}));

    let unknown = session
        .request(4, "tools/call", json!({"name": "nope", "arguments": {}}))
        .await?;
    assert!(unknown.get("error").is_some(), "{unknown}");

    drop(session.stdin);
    let _ = tokio::time::timeout(Duration::from_secs(10), session.child.wait()).await;

    let _ = shutdown_tx.send(());
    server_handle
        .await
        .context("join server")?
        .context("server")?;
    Ok(())
}
