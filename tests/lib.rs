//! Shared harness for the end-to-end tests: a spawned [`TestServer`]
//! driving the real control (and transfer) listeners over loopback TCP,
//! plus a raw [`Client`] wrapper for the control connection's handshake
//! and transaction request/reply exchange.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use htln_accounts::{Account, AccountStore};
use htln_news::{FlatNewsStore, ThreadedNews};
use htln_proto::field::tag;
use htln_proto::{obfuscate_user_string, txn_type, AccessBits, Field, Transaction};
use htln_server::{connection, transfer, Config, Server};

/// Client's handshake magic, mirrored from `htln_server::connection`
/// (the constant itself is private to that module).
pub const HANDSHAKE_REQUEST: [u8; 12] = *b"TRTPHOTL\x00\x01\x00\x02";
/// Server's handshake reply.
pub const HANDSHAKE_REPLY: [u8; 8] = *b"TRTP\x00\x00\x00\x00";

static NEXT_PORT: AtomicU16 = AtomicU16::new(31_100);

fn next_control_port() -> u16 {
    NEXT_PORT.fetch_add(4, Ordering::Relaxed)
}

/// A real server, listening on loopback ports unique to this instance,
/// running under background `tokio` tasks for the lifetime of the test.
pub struct TestServer {
    pub server: Arc<Server>,
    pub control_port: u16,
    pub transfer_port: u16,
    _dir: TempDir,
}

impl TestServer {
    /// Spawn a fresh server: control listener, transfer subserver, and
    /// central-outbox sender, each as a background task.
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let account_store = AccountStore::open(dir.path().join("Users")).expect("open accounts");
        let news = ThreadedNews::new();
        let news_path = dir.path().join("ThreadedNews.yaml");
        let flat_news = FlatNewsStore::open(dir.path().join("MessageBoard.txt")).expect("open flat news");
        let agreement_path = dir.path().join("Agreement.txt");
        std::fs::write(&agreement_path, "Welcome. By connecting you agree to the house rules.\n").unwrap();

        let control_port = next_control_port();
        let file_root = dir.path().join("Files");
        std::fs::create_dir_all(&file_root).unwrap();

        let config = Config {
            interface: "127.0.0.1".to_string(),
            control_port,
            file_root,
            agreement_path,
            ..Config::default()
        };

        let (outbox_tx, outbox_rx) = tokio::sync::mpsc::unbounded_channel();
        let server = Arc::new(
            Server::new(config, account_store, news, news_path, flat_news, outbox_tx).expect("build server"),
        );

        {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.run_central_sender(outbox_rx).await });
        }
        {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                let _ = connection::run(server).await;
            });
        }
        {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                let _ = transfer::subserver::run(server).await;
            });
        }

        let transfer_port = control_port + 1;
        wait_for_port(control_port).await;
        wait_for_port(transfer_port).await;

        Self {
            server,
            control_port,
            transfer_port,
            _dir: dir,
        }
    }

    /// Create and persist an account directly against the running
    /// server's store, bypassing the wire `NewUser` transaction.
    pub async fn add_account(&self, login: &str, name: &str, password: &str, access: AccessBits) {
        let account = Account::new(login, name, password, access).expect("hash password");
        self.server.create_account(account).await.expect("create account");
    }

    /// Open a fresh control connection and run the handshake.
    pub async fn connect(&self) -> Client {
        Client::connect(self.control_port).await
    }

    /// Open a fresh transfer connection, ready to present a reference
    /// number.
    pub async fn connect_transfer(&self) -> TcpStream {
        TcpStream::connect(("127.0.0.1", self.transfer_port))
            .await
            .expect("connect to transfer port")
    }
}

async fn wait_for_port(port: u16) {
    for _ in 0..200 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("server never started listening on 127.0.0.1:{port}");
}

/// A control-connection client: performs the handshake on `connect`,
/// then exchanges [`Transaction`] frames over the raw socket.
pub struct Client {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl Client {
    async fn connect(port: u16) -> Self {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
        stream.write_all(&HANDSHAKE_REQUEST).await.expect("write handshake");
        let mut reply = [0u8; 8];
        stream.read_exact(&mut reply).await.expect("read handshake reply");
        assert_eq!(reply, HANDSHAKE_REPLY, "unexpected handshake reply");
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    /// Connect without consuming the handshake reply, for tests that
    /// want to inspect the raw bytes themselves.
    pub async fn connect_raw(port: u16) -> TcpStream {
        TcpStream::connect(("127.0.0.1", port)).await.expect("connect")
    }

    /// Local address this client's socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.stream.local_addr().expect("local addr")
    }

    /// Encode and send a request.
    pub async fn send(&mut self, txn: &Transaction) {
        self.stream.write_all(&txn.encode()).await.expect("write transaction");
    }

    /// Read and decode the next transaction, growing the socket buffer
    /// as needed.
    pub async fn recv(&mut self) -> Transaction {
        loop {
            if let Ok((txn, consumed)) = Transaction::decode(&self.buf) {
                self.buf.drain(..consumed);
                return txn;
            }
            let mut chunk = [0u8; 4096];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .expect("read from control connection");
            assert!(n > 0, "connection closed while awaiting a transaction");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Read transactions until one matches `pred`, discarding (not
    /// dropping — just skipping past) any that don't. Useful for
    /// ignoring server-initiated pushes that race a direct reply.
    pub async fn recv_until(&mut self, pred: impl Fn(&Transaction) -> bool) -> Transaction {
        loop {
            let txn = self.recv().await;
            if pred(&txn) {
                return txn;
            }
        }
    }

    /// Send a `Login` request and return the server's reply, having
    /// first drained (and discarded) the `UserAccess` and
    /// `ShowAgreement` pushes.
    pub async fn login(&mut self, login: &str, password: &str) -> Transaction {
        self.send(&login_txn(login, password, 1)).await;
        self.recv_until(|t| t.ttype == txn_type::LOGIN && t.is_reply).await
    }

    /// Send an `Agreed` request, committing `name` as the display name.
    pub async fn agree(&mut self, name: &str) -> Transaction {
        self.send(&agreed_txn(name, 2)).await;
        self.recv_until(|t| t.ttype == txn_type::AGREED && t.is_reply).await
    }

    /// Log in and agree in one step, returning this session's own
    /// 16-bit session ID (found by matching `name` in the user list).
    pub async fn login_and_agree(&mut self, login: &str, password: &str, name: &str) -> u16 {
        self.login(login, password).await;
        self.agree(name).await;
        self.send(&Transaction::new(txn_type::GET_USER_NAME_LIST, 3)).await;
        let reply = self
            .recv_until(|t| t.ttype == txn_type::GET_USER_NAME_LIST && t.is_reply)
            .await;
        reply
            .fields
            .chunks(4)
            .find(|chunk| {
                chunk
                    .iter()
                    .any(|f| f.id == tag::USER_NAME && f.data == name.as_bytes())
            })
            .and_then(|chunk| chunk.iter().find(|f| f.id == tag::USER_ID))
            .and_then(Field::as_u16)
            .expect("own session id in user list")
    }

    /// Whether the peer has closed the connection: true if no further
    /// complete frame arrives before EOF.
    pub async fn expect_closed(&mut self) -> bool {
        loop {
            if Transaction::decode(&self.buf).is_ok() {
                return false;
            }
            let mut chunk = [0u8; 4096];
            match self.stream.read(&mut chunk).await {
                Ok(0) => return true,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(_) => return true,
            }
        }
    }
}

/// Build a `Login` request with obfuscated login/password fields.
pub fn login_txn(login: &str, password: &str, id: u32) -> Transaction {
    Transaction::new(txn_type::LOGIN, id)
        .with_field(Field::new(tag::LOGIN, obfuscate_user_string(login.as_bytes())))
        .with_field(Field::new(tag::PASSWORD, obfuscate_user_string(password.as_bytes())))
}

/// Build an `Agreed` request committing `name` with no refuse-PM/chat
/// options and icon 0.
pub fn agreed_txn(name: &str, id: u32) -> Transaction {
    Transaction::new(txn_type::AGREED, id)
        .with_field(Field::new(tag::USER_NAME, name.as_bytes().to_vec()))
        .with_field(Field::u16(tag::USER_ICON_ID, 0))
        .with_field(Field::u16(tag::OPTIONS, 0))
}

/// Path the repo's default `Config` serves files from, joined under a
/// test server's own temp root — exposed for tests that need to write
/// fixture files directly into the served namespace.
pub fn files_root(server: &TestServer) -> PathBuf {
    server.server.config.file_root.clone()
}
