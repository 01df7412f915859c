use std::time::Duration;

use chatterbox::config::ServerConfig;
use chatterbox::{init_state, serve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

struct TestClient {
    stream: TcpStream,
    buf: String,
}

impl TestClient {
    async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        TestClient { stream, buf: String::new() }
    }

    async fn send(&mut self, line: &str) {
        self.stream.write_all(line.as_bytes()).await.expect("write");
        self.stream.write_all(b"\n").await.expect("write newline");
        self.stream.flush().await.expect("flush");
    }

    /// Reads until the cumulative buffer (never cleared, so later checks can
    /// still see earlier lines that arrived in the same chunk) contains
    /// `needle`. Panics if it doesn't show up within the timeout.
    async fn recv_contains(&mut self, needle: &str) -> String {
        self.recv_occurrences(needle, 1).await
    }

    /// Reads until the cumulative buffer contains at least `count`
    /// occurrences of `needle`. Needed when the same line is expected to
    /// appear more than once (e.g. a prompt repeated after a re-prompt).
    async fn recv_occurrences(&mut self, needle: &str, count: usize) -> String {
        let mut chunk = [0u8; 4096];
        loop {
            if self.buf.matches(needle).count() >= count {
                return self.buf.clone();
            }
            let n = timeout(Duration::from_secs(2), self.stream.read(&mut chunk))
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {:?} x{}, got so far: {:?}", needle, count, self.buf))
                .expect("read");
            assert!(n > 0, "connection closed while waiting for {:?}", needle);
            self.buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    }
}

async fn spawn_server(rate_cap: u32) -> String {
    let mut config = ServerConfig::default();
    config.addr = "127.0.0.1".to_string();
    config.port = 0;
    config.rate_cap = rate_cap;

    // port 0 asks the OS for an ephemeral port; bind it ourselves so we can
    // learn which one, then hand the bound listener's address to `serve`.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr").to_string();
    drop(listener);

    let parts: Vec<&str> = addr.rsplitn(2, ':').collect();
    config.port = parts[0].parse().expect("port");

    let state = init_state(&config);
    tokio::spawn(async move {
        let _ = serve(config, state).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

async fn register(client: &mut TestClient, login: &str, password: &str) {
    client.recv_contains("register (/auth)").await;
    client.send("/auth").await;
    client.recv_contains("Input your login:").await;
    client.send(login).await;
    client.recv_contains("Input your password:").await;
    client.send(password).await;
    client.recv_contains("Login and password was set.").await;
    client.recv_contains("You are in general chat.").await;
}

async fn login(client: &mut TestClient, login_name: &str, password: &str) {
    client.recv_contains("register (/auth)").await;
    client.send("/login").await;
    client.recv_contains("Input your login:").await;
    client.send(login_name).await;
    client.recv_contains("Input your password:").await;
    client.send(password).await;
    client.recv_contains("Login successful.").await;
    client.recv_contains("You are in general chat.").await;
}

#[tokio::test]
async fn registration_then_broadcast_reaches_both_connections() {
    let addr = spawn_server(20).await;

    let mut alice = TestClient::connect(&addr).await;
    register(&mut alice, "alice", "pw").await;

    let mut bob = TestClient::connect(&addr).await;
    register(&mut bob, "bob", "pw").await;

    alice.send("/send hi").await;

    let seen_by_alice = alice.recv_contains("says: hi").await;
    let seen_by_bob = bob.recv_contains("says: hi").await;
    assert!(seen_by_alice.contains("alice  says: hi"));
    assert!(seen_by_bob.contains("alice  says: hi"));
}

#[tokio::test]
async fn login_after_exit_replays_recent_public_history() {
    let addr = spawn_server(20).await;

    let mut alice = TestClient::connect(&addr).await;
    register(&mut alice, "alice", "pw").await;
    alice.send("/send remember this").await;
    alice.recv_contains("remember this").await;
    alice.send("/exit").await;
    alice.recv_contains("disconnected from chat").await;

    let mut alice2 = TestClient::connect(&addr).await;
    login(&mut alice2, "alice", "pw").await;
    alice2.recv_contains("remember this").await;
}

#[tokio::test]
async fn rate_limit_refuses_the_cap_plus_one_send() {
    let addr = spawn_server(2).await;

    let mut alice = TestClient::connect(&addr).await;
    register(&mut alice, "alice", "pw").await;

    alice.send("/send a").await;
    alice.recv_contains("says: a").await;
    alice.send("/send b").await;
    alice.recv_contains("says: b").await;
    alice.send("/send c").await;
    let reply = alice
        .recv_contains("Sorry, but you have reached your limit of 2 per hour.")
        .await;
    assert!(reply.contains("The message not be sent."));
}

#[tokio::test]
async fn private_message_reaches_only_the_named_recipient() {
    let addr = spawn_server(20).await;

    let mut alice = TestClient::connect(&addr).await;
    register(&mut alice, "alice", "pw").await;
    let mut bob = TestClient::connect(&addr).await;
    register(&mut bob, "bob", "pw").await;
    let mut carol = TestClient::connect(&addr).await;
    register(&mut carol, "carol", "pw").await;

    alice.send("/private bob hello").await;
    let seen_by_bob = bob.recv_contains("in private says: hello").await;
    assert!(seen_by_bob.contains("alice in private says: hello"));

    carol.send("/send ping").await;
    carol.recv_contains("says: ping").await;
    assert!(!carol.buf.contains("hello"));
}

#[tokio::test]
async fn room_create_invite_join_then_send_chat_reaches_both_members() {
    let addr = spawn_server(20).await;

    let mut alice = TestClient::connect(&addr).await;
    register(&mut alice, "alice", "pw").await;
    let mut bob = TestClient::connect(&addr).await;
    register(&mut bob, "bob", "pw").await;

    alice.send("/create room1").await;
    alice.recv_contains("Chat room1 created.").await;

    bob.send("/send_chat room1 hi").await;
    bob.recv_contains("You are not member of chat room1.").await;

    alice.send("/invite bob room1").await;
    alice.recv_contains("An invitation to user bob to chat room1 has been sent.").await;
    let invite = bob.recv_contains("Your invite key is").await;
    let token = invite
        .lines()
        .find(|l| l.contains("Your invite key is"))
        .and_then(|l| l.rsplit(' ').next())
        .expect("token")
        .to_string();

    bob.send(&format!("/join room1 {}", token)).await;
    bob.recv_contains("You are join to chat room1.").await;

    bob.send("/send_chat room1 hi again").await;
    let seen_by_alice = alice.recv_contains("says: hi again").await;
    let seen_by_bob = bob.recv_contains("says: hi again").await;
    assert!(seen_by_alice.contains("bob in private says: hi again"));
    assert!(seen_by_bob.contains("bob in private says: hi again"));
}

#[tokio::test]
async fn unknown_command_gets_exact_refusal_and_session_continues() {
    let addr = spawn_server(20).await;

    let mut alice = TestClient::connect(&addr).await;
    register(&mut alice, "alice", "pw").await;

    alice.send("/nope").await;
    let reply = alice.recv_contains("Wrong command.").await;
    assert!(reply.contains("Wrong command."));

    alice.send("/send still alive").await;
    alice.recv_contains("says: still alive").await;
}

#[tokio::test]
async fn blank_login_line_during_registration_reprompts_instead_of_closing() {
    let addr = spawn_server(20).await;

    let mut alice = TestClient::connect(&addr).await;
    alice.recv_contains("register (/auth)").await;
    alice.send("/auth").await;
    alice.recv_contains("Input your login:").await;

    // A blank line is not the same as the peer closing the socket: the
    // session must re-prompt, not disconnect.
    alice.send("").await;
    alice.recv_occurrences("Input your login:", 2).await;

    alice.send("alice").await;
    alice.recv_contains("Input your password:").await;
    alice.send("pw").await;
    alice.recv_contains("Login and password was set.").await;
    alice.recv_contains("You are in general chat.").await;
}
