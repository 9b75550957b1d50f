//! Process-wide server state: configuration, accounts, the client
//! registry, pending transfers, news, and the central outbox.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use htln_accounts::{Account, AccountStore};
use htln_news::{FlatNewsStore, ThreadedNews};
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::Error;
use crate::fs_namespace::FsNamespace;
use crate::registry::{ClientRegistry, Outgoing};
use crate::transfer::pending::PendingTransferTable;

/// Process-wide server state.
///
/// Accounts, news, and the file namespace each carry their own lock
/// separate from the session table's, so that bcrypt hashing and news
/// disk writes never block chat fan-out or the dispatch loop — long
/// work happens outside the session-table lock.
pub struct Server {
    /// Immutable configuration loaded at startup.
    pub config: Arc<Config>,
    /// Connected-client registry.
    pub registry: ClientRegistry,
    /// Pending file-transfer table.
    pub transfers: PendingTransferTable,
    /// File namespace served under `config.file_root`.
    pub fs: FsNamespace,

    accounts: Mutex<HashMap<String, Account>>,
    account_store: AccountStore,
    news: Mutex<ThreadedNews>,
    news_path: PathBuf,
    flat_news: Mutex<FlatNewsStore>,
    next_session_counter: Mutex<u32>,
    outbox: mpsc::UnboundedSender<Outgoing>,
}

impl Server {
    /// Build the server state, loading all accounts from `account_store`
    /// up front (the in-memory map is the source of truth during a run).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if accounts cannot be enumerated or an
    /// individual account file fails to parse.
    pub fn new(
        config: Config,
        account_store: AccountStore,
        news: ThreadedNews,
        news_path: PathBuf,
        flat_news: FlatNewsStore,
        outbox: mpsc::UnboundedSender<Outgoing>,
    ) -> Result<Self, Error> {
        let mut accounts = HashMap::new();
        for login in account_store.list_logins()? {
            let account = account_store.load(&login)?;
            accounts.insert(login, account);
        }

        let fs = FsNamespace::new(config.file_root.clone());

        Ok(Self {
            config: Arc::new(config),
            registry: ClientRegistry::new(),
            transfers: PendingTransferTable::new(),
            fs,
            accounts: Mutex::new(accounts),
            account_store,
            news: Mutex::new(news),
            news_path,
            flat_news: Mutex::new(flat_news),
            next_session_counter: Mutex::new(0),
            outbox,
        })
    }

    /// Queue `bytes` for delivery to `target`'s socket.
    pub fn send(&self, target: u16, bytes: Vec<u8>) {
        if self.outbox.send(Outgoing { target, bytes }).is_err() {
            trace!(target, "central outbox closed");
        }
    }

    /// Queue `build(session)`'s bytes for every session matching
    /// `predicate`, in ascending session-ID order.
    pub async fn broadcast(
        &self,
        predicate: impl Fn(&crate::session::ClientSession) -> bool,
        build: impl FnMut(&crate::session::ClientSession) -> Vec<u8>,
    ) {
        self.registry.broadcast(&self.outbox, predicate, build).await;
    }

    /// Drain the central outbox, forwarding each frame to its target
    /// session's own writer channel. Runs until the channel closes
    /// (i.e. the server is shutting down).
    pub async fn run_central_sender(&self, mut rx: mpsc::UnboundedReceiver<Outgoing>) {
        while let Some(Outgoing { target, bytes }) = rx.recv().await {
            let delivered = self.registry.with_session(target, |s| s.send(bytes)).await;
            if delivered.is_none() {
                trace!(target, "dropped frame for vanished session");
            }
        }
    }

    /// Allocate a fresh 16-bit session ID, unique among currently live
    /// sessions.
    ///
    /// The counter is kept as a 32-bit value internally; once every
    /// non-zero 16-bit ID is in use, new connections are rejected rather
    /// than risking a wrapped collision with a still-live session.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if all 65535 IDs are currently assigned.
    pub async fn allocate_session_id(&self) -> Result<u16, Error> {
        if self.registry.session_count().await >= u16::MAX as usize {
            return Err(Error::transport("session ID space exhausted"));
        }
        let mut counter = self.next_session_counter.lock().await;
        loop {
            *counter = counter.wrapping_add(1);
            let candidate = ((*counter - 1) % u16::MAX as u32) as u16 + 1;
            if !self.registry.contains(candidate).await {
                return Ok(candidate);
            }
        }
    }

    /// Authenticate `login`/`password` against the in-memory account map.
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if the login is unknown or the password is
    /// wrong.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Account, Error> {
        let accounts = self.accounts.lock().await;
        let account = accounts
            .get(login)
            .ok_or_else(|| Error::auth("Incorrect login."))?;
        if account.verify_password(password)? {
            Ok(account.clone())
        } else {
            Err(Error::auth("Incorrect login."))
        }
    }

    /// Look up an account by login without verifying a password.
    pub async fn account(&self, login: &str) -> Option<Account> {
        self.accounts.lock().await.get(login).cloned()
    }

    /// List every account's login, in arbitrary (non-guaranteed) order;
    /// callers sort as needed.
    pub async fn account_logins(&self) -> Vec<String> {
        self.accounts.lock().await.keys().cloned().collect()
    }

    /// Create a new account and persist it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Conflict` if the login is already taken.
    pub async fn create_account(&self, account: Account) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.login) {
            return Err(Error::conflict(format!(
                "Account {:?} already exists.",
                account.login
            )));
        }
        self.account_store.create(&account)?;
        accounts.insert(account.login.clone(), account);
        Ok(())
    }

    /// Replace an existing account's record and persist it.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the login does not exist.
    pub async fn update_account(&self, account: Account) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().await;
        if !accounts.contains_key(&account.login) {
            return Err(Error::not_found("Account does not exist."));
        }
        self.account_store.save(&account)?;
        accounts.insert(account.login.clone(), account);
        Ok(())
    }

    /// Delete an account and its on-disk file.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the login does not exist.
    pub async fn delete_account(&self, login: &str) -> Result<(), Error> {
        let mut accounts = self.accounts.lock().await;
        if accounts.remove(login).is_none() {
            return Err(Error::not_found("Account does not exist."));
        }
        self.account_store.delete(login)?;
        Ok(())
    }

    /// Run `f` against the threaded-news tree, persisting afterward if
    /// `f` mutated it (`persist` says which).
    pub async fn with_news<R>(
        &self,
        persist: bool,
        f: impl FnOnce(&mut ThreadedNews) -> R,
    ) -> Result<R, Error> {
        let mut news = self.news.lock().await;
        let result = f(&mut news);
        if persist {
            news.save(&self.news_path)?;
            debug!(path = %self.news_path.display(), "persisted threaded news");
        }
        Ok(result)
    }

    /// The flat-news board's current contents.
    pub async fn flat_news_contents(&self) -> String {
        self.flat_news.lock().await.contents()
    }

    /// Prepend a post to the flat-news board and persist it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the board cannot be written.
    pub async fn post_flat_news(&self, text: impl Into<String>) -> Result<(), Error> {
        self.flat_news.lock().await.post(text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htln_proto::AccessBits;

    fn test_server() -> Server {
        let dir = tempfile::tempdir().unwrap();
        let account_store = AccountStore::open(dir.path().join("Users")).unwrap();
        let news = ThreadedNews::new();
        let flat_news = FlatNewsStore::open(dir.path().join("MessageBoard.txt")).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        Server::new(
            Config {
                file_root: dir.path().join("Files"),
                ..Config::default()
            },
            account_store,
            news,
            dir.path().join("ThreadedNews.yaml"),
            flat_news,
            tx,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn authenticate_succeeds_with_correct_password() {
        let server = test_server();
        server
            .create_account(
                htln_accounts::Account::new("alice", "Alice", "hunter2", AccessBits::all())
                    .unwrap(),
            )
            .await
            .unwrap();

        let account = server.authenticate("alice", "hunter2").await.unwrap();
        assert_eq!(account.login, "alice");
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_login() {
        let server = test_server();
        assert!(matches!(
            server.authenticate("nosuch", "x").await,
            Err(Error::Auth(_))
        ));
    }

    #[tokio::test]
    async fn create_account_rejects_duplicate_login() {
        let server = test_server();
        let account =
            htln_accounts::Account::new("alice", "Alice", "pw", AccessBits::none()).unwrap();
        server.create_account(account.clone()).await.unwrap();
        assert!(matches!(
            server.create_account(account).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn allocate_session_id_starts_at_one() {
        let server = test_server();
        assert_eq!(server.allocate_session_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn allocate_session_id_avoids_collisions() {
        let server = test_server();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = server.allocate_session_id().await.unwrap();
        server
            .registry
            .insert(crate::session::ClientSession::new(
                id,
                "127.0.0.1:1".parse().unwrap(),
                tx,
            ))
            .await;

        let next_id = server.allocate_session_id().await.unwrap();
        assert_ne!(id, next_id);
    }
}
