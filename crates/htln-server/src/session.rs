//! A single live control connection: state machine, presence attributes,
//! and its outbound byte channel.

use std::net::SocketAddr;

use htln_proto::AccessBits;
use tokio::sync::mpsc;

/// Bit positions within [`ClientSession::flags`].
pub mod flag_bit {
    /// Client is idle / away.
    pub const AWAY: u16 = 1 << 0;
    /// Client holds admin status (shown to peers, not an access check).
    pub const ADMIN: u16 = 1 << 1;
    /// Client refuses private messages.
    pub const REFUSE_PM: u16 = 1 << 2;
    /// Client refuses private chat invitations.
    pub const REFUSE_CHAT: u16 = 1 << 3;
}

/// The session lifecycle, driven by specific transaction types; any
/// protocol violation or socket error moves directly to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// TCP accepted, handshake not yet completed.
    Accepted,
    /// Handshake completed, login not yet attempted.
    Handshaken,
    /// Login succeeded; `Agreed` not yet sent.
    Authenticated,
    /// Client has committed its display name/icon/options.
    Agreed,
    /// Fully active; indistinguishable from `Agreed` except by history.
    Active,
    /// Connection torn down; the session is no longer in the registry.
    Closed,
}

impl SessionState {
    /// Whether a session in this state is shown in the peer user list.
    #[must_use]
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Agreed | Self::Active)
    }
}

/// Server-side state of one connected client.
pub struct ClientSession {
    /// 16-bit session ID, unique among currently live sessions.
    pub id: u16,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Display name as committed via Agreed/SetClientUserInfo.
    pub name: String,
    /// 2-byte icon ID.
    pub icon_id: u16,
    /// 2-byte flags bitmap; see [`flag_bit`].
    pub flags: u16,
    /// Raw client version bytes sent at login.
    pub version: Vec<u8>,
    /// Auto-reply text, set when bit 2 of the Agreed options field is set.
    pub auto_reply: Option<String>,
    /// Login of the authenticated account, once known.
    pub login: Option<String>,
    /// Access bitmap copied from the account at authentication time.
    pub access: AccessBits,
    /// Seconds since the last non-keepalive request.
    pub idle_seconds: u32,
    /// Remote address, for logging.
    pub remote_addr: SocketAddr,
    /// Channel to this session's connection-writer task.
    pub outbox: mpsc::UnboundedSender<Vec<u8>>,
}

impl ClientSession {
    /// Build a freshly accepted session with no name/account yet.
    #[must_use]
    pub fn new(id: u16, remote_addr: SocketAddr, outbox: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            id,
            state: SessionState::Accepted,
            name: String::new(),
            icon_id: 0,
            flags: 0,
            version: Vec::new(),
            auto_reply: None,
            login: None,
            access: AccessBits::none(),
            idle_seconds: 0,
            remote_addr,
            outbox,
        }
    }

    /// Whether this session currently appears in the peer user list.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    /// Whether `bit` is set in the flags bitmap.
    #[must_use]
    pub fn has_flag(&self, bit: u16) -> bool {
        self.flags & bit != 0
    }

    /// Set or clear `bit` in the flags bitmap.
    pub fn set_flag(&mut self, bit: u16, on: bool) {
        if on {
            self.flags |= bit;
        } else {
            self.flags &= !bit;
        }
    }

    /// Queue raw wire bytes for delivery to this session's socket.
    ///
    /// Returns `false` if the connection's writer task has already shut
    /// down; the caller should treat that the same as "session gone".
    pub fn send(&self, bytes: Vec<u8>) -> bool {
        self.outbox.send(bytes).is_ok()
    }
}
