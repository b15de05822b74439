//! Wire protocol tests for a full node.
//!
//! Each test runs a `NodeServer` over an in-memory duplex pipe. The test
//! harness plays both the clients and the `lin-kv` service: outbound
//! messages addressed to `lin-kv` are answered from a `MemoryStore`, and
//! everything else is handed to the test as raw JSON.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use seqlog::cluster::{CoordinationStore, KvClient, LogConfig, LogError, LogService, MemoryStore};
use seqlog::error::ErrorCode;
use seqlog::server::{Body, Message, NodeServer};

const KV: &str = "lin-kv";
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct Harness {
    input: mpsc::UnboundedSender<Option<String>>,
    replies: mpsc::UnboundedReceiver<Value>,
    server: JoinHandle<seqlog::error::Result<()>>,
    next_msg_id: u64,
}

impl Harness {
    fn start() -> Self {
        let (ours, theirs) = tokio::io::duplex(1 << 16);
        let (server_read, server_write) = tokio::io::split(theirs);
        let (our_read, mut our_write) = tokio::io::split(ours);

        let server = NodeServer::new(BufReader::new(server_read), server_write);
        let config = LogConfig::default();
        let kv = KvClient::new(server.node(), KV, config.rpc_timeout);
        let service = LogService::new(&config, Arc::new(kv)).unwrap();
        let server = tokio::spawn(server.run(Arc::new(service)));

        // Single writer for the server's input. `None` closes the stream.
        let (input, mut input_rx) = mpsc::unbounded_channel::<Option<String>>();
        tokio::spawn(async move {
            while let Some(Some(line)) = input_rx.recv().await {
                our_write.write_all(line.as_bytes()).await.unwrap();
                our_write.write_all(b"\n").await.unwrap();
            }
            let _ = our_write.shutdown().await;
        });

        let (replies_tx, replies) = mpsc::unbounded_channel();
        let kv_input = input.clone();
        tokio::spawn(async move {
            let store = MemoryStore::new();
            let mut lines = BufReader::new(our_read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let message = Message::from_line(&line).unwrap();
                if message.dest == KV {
                    let reply = answer_kv(&store, &message).await;
                    let _ = kv_input.send(Some(reply));
                } else {
                    let _ = replies_tx.send(serde_json::from_str::<Value>(&line).unwrap());
                }
            }
        });

        Self {
            input,
            replies,
            server,
            next_msg_id: 1,
        }
    }

    /// Send a raw line to the node.
    fn send_line(&self, line: impl Into<String>) {
        self.input.send(Some(line.into())).unwrap();
    }

    /// Send a client request from `c1` and return its msg_id.
    fn request(&mut self, mut body: Value) -> u64 {
        let msg_id = self.next_msg_id;
        self.next_msg_id += 1;
        body["msg_id"] = json!(msg_id);
        self.send_line(json!({"src": "c1", "dest": "n1", "body": body}).to_string());
        msg_id
    }

    async fn recv(&mut self) -> Value {
        tokio::time::timeout(RECV_TIMEOUT, self.replies.recv())
            .await
            .expect("timed out waiting for a reply")
            .expect("node output closed")
    }

    /// Send a request and return the reply body, checking the correlation.
    async fn call(&mut self, body: Value) -> Value {
        let msg_id = self.request(body);
        let reply = self.recv().await;
        assert_eq!(reply["src"], "n1");
        assert_eq!(reply["dest"], "c1");
        assert_eq!(reply["body"]["in_reply_to"], json!(msg_id));
        reply["body"].clone()
    }

    async fn init(&mut self) {
        let body = self
            .call(json!({"type": "init", "node_id": "n1", "node_ids": ["n1", "n2"]}))
            .await;
        assert_eq!(body["type"], "init_ok");
    }

    async fn shutdown(self) {
        self.input.send(None).unwrap();
        tokio::time::timeout(RECV_TIMEOUT, self.server)
            .await
            .expect("node did not stop")
            .unwrap()
            .unwrap();
    }
}

/// Answer one KV RPC from `store`, as the `lin-kv` service would.
async fn answer_kv(store: &MemoryStore, request: &Message) -> String {
    let fields = &request.body.fields;
    let key = fields["key"].as_str().unwrap_or_default();

    let result = match request.body.kind.as_str() {
        "read" => store
            .read(key)
            .await
            .map(|value| Body::encode("read_ok", &json!({"value": value})).unwrap()),
        "write" => store
            .write(key, fields["value"].clone())
            .await
            .map(|()| Body::new("write_ok")),
        "cas" => store
            .compare_and_swap(
                key,
                fields["from"].clone(),
                fields["to"].clone(),
                fields["create_if_not_exists"].as_bool().unwrap_or(false),
            )
            .await
            .map(|()| Body::new("cas_ok")),
        other => panic!("unexpected KV request {other}"),
    };

    let body = match result {
        Ok(body) => body,
        Err(LogError::KeyNotFound(_)) => Body::error(ErrorCode::KeyDoesNotExist, "not found"),
        Err(LogError::CasConflict { .. }) => {
            Body::error(ErrorCode::PreconditionFailed, "precondition failed")
        }
        Err(e) => Body::error(ErrorCode::Crash, e.to_string()),
    };

    Message {
        src: KV.to_string(),
        dest: request.src.clone(),
        body: body.with_in_reply_to(request.body.msg_id),
    }
    .to_line()
    .unwrap()
}

#[tokio::test]
async fn test_init_handshake() {
    let mut h = Harness::start();
    h.init().await;
    h.shutdown().await;
}

#[tokio::test]
async fn test_send_poll_commit_list() {
    let mut h = Harness::start();
    h.init().await;

    let reply = h.call(json!({"type": "send", "key": "a", "msg": 10})).await;
    assert_eq!(reply["type"], "send_ok");
    assert_eq!(reply["offset"], 0);

    let reply = h.call(json!({"type": "send", "key": "a", "msg": 20})).await;
    assert_eq!(reply["offset"], 1);

    let reply = h.call(json!({"type": "poll", "offsets": {"a": 0}})).await;
    assert_eq!(reply["type"], "poll_ok");
    assert_eq!(reply["msgs"], json!({"a": [[0, 10], [1, 20]]}));

    let reply = h.call(json!({"type": "poll", "offsets": {"a": 5}})).await;
    assert_eq!(reply["msgs"], json!({"a": []}));

    let reply = h
        .call(json!({"type": "commit_offsets", "offsets": {"a": 1}}))
        .await;
    assert_eq!(reply["type"], "commit_offsets_ok");

    let reply = h
        .call(json!({"type": "list_committed_offsets", "keys": ["a", "b"]}))
        .await;
    assert_eq!(reply["type"], "list_committed_offsets_ok");
    assert_eq!(reply["offsets"], json!({"a": 1, "b": 0}));

    h.shutdown().await;
}

#[tokio::test]
async fn test_unknown_request_type() {
    let mut h = Harness::start();
    h.init().await;

    let reply = h.call(json!({"type": "echo", "echo": "hi"})).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], 10);

    h.shutdown().await;
}

#[tokio::test]
async fn test_malformed_requests() {
    let mut h = Harness::start();
    h.init().await;

    let missing_msg = h.call(json!({"type": "send", "key": "a"})).await;
    assert_eq!(missing_msg["type"], "error");
    assert_eq!(missing_msg["code"], 12);

    let negative_offset = h.call(json!({"type": "poll", "offsets": {"a": -1}})).await;
    assert_eq!(negative_offset["code"], 12);


    h.shutdown().await;
}

#[tokio::test]
async fn test_empty_topic_is_an_ordinary_key() {
    let mut h = Harness::start();
    h.init().await;

    let reply = h.call(json!({"type": "send", "key": "", "msg": 1})).await;
    assert_eq!(reply["type"], "send_ok");
    assert_eq!(reply["offset"], 0);

    let reply = h.call(json!({"type": "poll", "offsets": {"": 0, "a": 0}})).await;
    assert_eq!(reply["msgs"], json!({"": [[0, 1]], "a": []}));

    h.shutdown().await;
}

#[tokio::test]
async fn test_request_before_init() {
    let mut h = Harness::start();

    let reply = h.call(json!({"type": "send", "key": "a", "msg": 1})).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["code"], 11);

    h.init().await;
    let reply = h.call(json!({"type": "send", "key": "a", "msg": 1})).await;
    assert_eq!(reply["type"], "send_ok");

    h.shutdown().await;
}

#[tokio::test]
async fn test_garbage_lines_are_skipped() {
    let mut h = Harness::start();
    h.send_line("not json at all");
    h.send_line("");
    h.send_line(r#"{"src":"c1","dest":"n1","body":{"type":"init_ok","in_reply_to":999}}"#);

    h.init().await;
    let reply = h.call(json!({"type": "poll", "offsets": {"a": 0}})).await;
    assert_eq!(reply["msgs"], json!({"a": []}));

    h.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_clients_get_distinct_offsets() {
    let mut h = Harness::start();
    h.init().await;

    for i in 0..10 {
        h.request(json!({"type": "send", "key": "a", "msg": i}));
    }

    let mut offsets = Vec::new();
    for _ in 0..10 {
        let reply = h.recv().await;
        assert_eq!(reply["body"]["type"], "send_ok");
        offsets.push(reply["body"]["offset"].as_u64().unwrap());
    }
    offsets.sort_unstable();
    assert_eq!(offsets, (0..10).collect::<Vec<u64>>());

    h.shutdown().await;
}
