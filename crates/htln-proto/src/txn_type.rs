//! Transaction type numbers for the request catalog.
//!
//! Only a handful of these are pinned by name (Login, Agreed, ChatSend,
//! …); the rest follow the numbering the legacy protocol is documented
//! to use in the wild, kept here as a single flat table the way
//! [`crate::field::tag`] holds field tags.

/// Server-side error reply type (errorCode set, no request ever carries
/// this as its own type).
pub const ERROR: u16 = 0;

/// Reply carrying the flat-news board's contents.
pub const GET_MSGS: u16 = 101;
/// Server-initiated: a new flat-news post was made.
pub const NEW_MSG: u16 = 102;
/// Prepend a post to the flat-news board.
pub const OLD_POST_NEWS: u16 = 103;
/// Server-initiated: deliver instant-message/broadcast text to a session.
pub const SERVER_MSG: u16 = 104;
/// Send a chat line, optionally to a private chat.
pub const CHAT_SEND: u16 = 105;
/// Server-initiated: deliver a formatted chat line.
pub const CHAT_MSG: u16 = 106;
/// Authenticate.
pub const LOGIN: u16 = 107;
/// Send a private instant message to another session.
pub const SEND_INSTANT_MSG: u16 = 108;
/// Server-initiated: push the login agreement text.
pub const SHOW_AGREEMENT: u16 = 109;
/// Disconnect another session.
pub const DISCONNECT_USER: u16 = 110;
/// Create a private chat and invite a session.
pub const INVITE_NEW_CHAT: u16 = 112;
/// Invite a session to an existing private chat.
pub const INVITE_TO_CHAT: u16 = 113;
/// Decline a private-chat invitation.
pub const REJECT_CHAT_INVITE: u16 = 114;
/// Join a private chat.
pub const JOIN_CHAT: u16 = 115;
/// Leave a private chat.
pub const LEAVE_CHAT: u16 = 116;
/// Server-initiated: a private chat's membership or a member's presence changed.
pub const NOTIFY_CHAT_CHANGE_USER: u16 = 117;
/// Server-initiated: a member left a private chat.
pub const NOTIFY_CHAT_DELETE_USER: u16 = 118;
/// Server-initiated: a private chat's subject changed.
pub const NOTIFY_CHAT_SUBJECT: u16 = 119;
/// Set a private chat's subject.
pub const SET_CHAT_SUBJECT: u16 = 120;
/// Commit display name/icon/options after login.
pub const AGREED: u16 = 121;

/// List a directory's contents.
pub const GET_FILE_NAME_LIST: u16 = 200;
/// Allocate a single-file download transfer.
pub const DOWNLOAD_FILE: u16 = 202;
/// Allocate a single-file upload transfer.
pub const UPLOAD_FILE: u16 = 203;
/// Delete a file or folder.
pub const DELETE_FILE: u16 = 204;
/// Create a new folder.
pub const NEW_FOLDER: u16 = 205;
/// Read a file's metadata (type, size, comment).
pub const GET_FILE_INFO: u16 = 206;
/// Rename a file or folder, or set its comment.
pub const SET_FILE_INFO: u16 = 207;
/// Move a file or folder to a new path.
pub const MOVE_FILE: u16 = 208;
/// Allocate a folder-download transfer.
pub const DOWNLOAD_FOLDER: u16 = 210;
/// Allocate a folder-upload transfer.
pub const UPLOAD_FOLDER: u16 = 213;

/// Reply with the current presence snapshot.
pub const GET_USER_NAME_LIST: u16 = 300;
/// Server-initiated: a session's presence attributes changed.
pub const NOTIFY_CHANGE_USER: u16 = 301;
/// Server-initiated: a session disconnected.
pub const NOTIFY_DELETE_USER: u16 = 302;
/// Request a target session's client-info text report.
pub const GET_CLIENT_INFO_TEXT: u16 = 303;
/// Update one's own display name/icon/options.
pub const SET_CLIENT_USER_INFO: u16 = 304;

/// Create a new account.
pub const NEW_USER: u16 = 350;
/// Delete an account.
pub const DELETE_USER: u16 = 351;
/// Read an account's record.
pub const GET_USER: u16 = 352;
/// Replace an account's record.
pub const SET_USER: u16 = 353;
/// Server-initiated: push the authenticated account's own access bitmap.
pub const USER_ACCESS: u16 = 354;
/// Broadcast a message to every connected session.
pub const USER_BROADCAST: u16 = 355;
/// List every account's login.
pub const LIST_USERS: u16 = 348;

/// List the news tree's children at a path.
pub const GET_NEWS_CAT_NAME_LIST: u16 = 370;
/// List a category's article names.
pub const GET_NEWS_ART_NAME_LIST: u16 = 371;
/// Delete a bundle, category, or article.
pub const DEL_NEWS_ITEM: u16 = 380;
/// Create a news bundle (folder).
pub const NEW_NEWS_FLDR: u16 = 381;
/// Create a news category.
pub const NEW_NEWS_CAT: u16 = 382;
/// Fetch a single article's data.
pub const GET_NEWS_ART_DATA: u16 = 400;
/// Post a new article.
pub const NEW_NEWS_ART: u16 = 410;
/// Delete a single article (without deleting its category).
pub const DEL_NEWS_ART: u16 = 411;

/// Liveness ping; reply carries no fields.
pub const KEEP_ALIVE: u16 = 500;
