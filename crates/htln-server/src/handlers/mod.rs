//! Per-transaction-type request handlers.
//!
//! Each handler takes the server, the requesting session's ID, and the
//! decoded request, and returns the direct reply to send back (or `None`
//! for transactions with no reply), propagating any [`Error`] for
//! [`crate::dispatch::dispatch`] to turn into an error reply or a closed
//! session. Side-effect broadcasts to other sessions are sent inline via
//! [`Server::send`]/[`Server::broadcast`] rather than threaded back
//! through the return value.

mod files;
mod login;
mod misc;
mod news;
mod privchat;
mod public_chat;
mod users;

use htln_proto::{txn_type, AccessBit, Field, Transaction};
use tracing::debug;

use crate::error::Error;
use crate::registry::PresenceEntry;
use crate::server::Server;

/// Dispatch `req` to its handler, or log and return `Ok(None)` for an
/// unrecognized transaction type: unknown types are logged and ignored,
/// with no reply sent.
pub async fn handle(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    match req.ttype {
        txn_type::LOGIN => login::login(server, session_id, req).await,
        txn_type::AGREED => login::agreed(server, session_id, req).await,

        txn_type::CHAT_SEND => public_chat::chat_send(server, session_id, req).await,
        txn_type::SEND_INSTANT_MSG => public_chat::send_instant_msg(server, session_id, req).await,

        txn_type::GET_MSGS => news::get_msgs(server, req).await,
        txn_type::OLD_POST_NEWS => news::old_post_news(server, session_id, req).await,
        txn_type::GET_NEWS_CAT_NAME_LIST => news::get_news_cat_name_list(server, req).await,
        txn_type::NEW_NEWS_FLDR => news::new_news_fldr(server, req).await,
        txn_type::NEW_NEWS_CAT => news::new_news_cat(server, req).await,
        txn_type::DEL_NEWS_ITEM => news::del_news_item(server, session_id, req).await,
        txn_type::GET_NEWS_ART_NAME_LIST => news::get_news_art_name_list(server, req).await,
        txn_type::GET_NEWS_ART_DATA => news::get_news_art_data(server, req).await,
        txn_type::NEW_NEWS_ART => news::new_news_art(server, session_id, req).await,
        txn_type::DEL_NEWS_ART => news::del_news_art(server, req).await,

        txn_type::GET_FILE_NAME_LIST => files::get_file_name_list(server, req).await,
        txn_type::GET_FILE_INFO => files::get_file_info(server, req).await,
        txn_type::SET_FILE_INFO => files::set_file_info(server, session_id, req).await,
        txn_type::DELETE_FILE => files::delete_file(server, session_id, req).await,
        txn_type::MOVE_FILE => files::move_file(server, req).await,
        txn_type::NEW_FOLDER => files::new_folder(server, req).await,
        txn_type::DOWNLOAD_FILE => files::download_file(server, session_id, req).await,
        txn_type::DOWNLOAD_FOLDER => files::download_folder(server, session_id, req).await,
        txn_type::UPLOAD_FILE => files::upload_file(server, session_id, req).await,
        txn_type::UPLOAD_FOLDER => files::upload_folder(server, session_id, req).await,

        txn_type::GET_USER_NAME_LIST => misc::get_user_name_list(server, req).await,
        txn_type::SET_CLIENT_USER_INFO => misc::set_client_user_info(server, session_id, req).await,
        txn_type::GET_CLIENT_INFO_TEXT => misc::get_client_info_text(server, req).await,
        txn_type::DISCONNECT_USER => misc::disconnect_user(server, session_id, req).await,
        txn_type::KEEP_ALIVE => Ok(Some(Transaction::reply_to(req))),

        txn_type::NEW_USER => users::new_user(server, req).await,
        txn_type::DELETE_USER => users::delete_user(server, req).await,
        txn_type::GET_USER => users::get_user(server, req).await,
        txn_type::SET_USER => users::set_user(server, req).await,
        txn_type::LIST_USERS => users::list_users(server, req).await,
        txn_type::USER_BROADCAST => users::user_broadcast(server, req).await,

        txn_type::INVITE_NEW_CHAT => privchat::invite_new_chat(server, session_id, req).await,
        txn_type::INVITE_TO_CHAT => privchat::invite_to_chat(server, session_id, req).await,
        txn_type::JOIN_CHAT => privchat::join_chat(server, session_id, req).await,
        txn_type::LEAVE_CHAT => privchat::leave_chat(server, session_id, req).await,
        txn_type::REJECT_CHAT_INVITE => privchat::reject_chat_invite(server, session_id, req).await,
        txn_type::SET_CHAT_SUBJECT => privchat::set_chat_subject(server, session_id, req).await,

        other => {
            debug!(ttype = other, session_id, "ignoring unrecognized transaction type");
            Ok(None)
        }
    }
}

/// The access bit a transaction type requires, or `None` if the handler
/// either always allows the request or performs its own granular check.
#[must_use]
pub fn required_access(ttype: u16) -> Option<AccessBit> {
    use AccessBit::*;
    match ttype {
        txn_type::SEND_INSTANT_MSG => Some(SendPrivateMsg),
        txn_type::OLD_POST_NEWS => Some(PostNewsArticle),
        txn_type::DOWNLOAD_FILE => Some(DownloadFile),
        txn_type::DOWNLOAD_FOLDER => Some(DownloadFile),
        txn_type::UPLOAD_FILE => Some(UploadFile),
        txn_type::UPLOAD_FOLDER => Some(UploadFile),
        txn_type::NEW_FOLDER => Some(CreateFolder),
        txn_type::MOVE_FILE => Some(RenameFile),
        txn_type::GET_CLIENT_INFO_TEXT => Some(GetClientInfo),
        txn_type::NEW_USER => Some(CreateUser),
        txn_type::DELETE_USER => Some(DeleteUser),
        txn_type::GET_USER => Some(OpenUser),
        txn_type::SET_USER => Some(ModifyUser),
        txn_type::LIST_USERS => Some(OpenUser),
        txn_type::USER_BROADCAST => Some(Broadcast),
        txn_type::NEW_NEWS_FLDR => Some(CreateNewsFolder),
        txn_type::NEW_NEWS_CAT => Some(CreateNewsCategory),
        txn_type::GET_NEWS_ART_DATA => Some(ReadNewsArticle),
        txn_type::NEW_NEWS_ART => Some(PostNewsArticle),
        txn_type::DEL_NEWS_ART => Some(DeleteNewsArticle),
        txn_type::DISCONNECT_USER => Some(DisconnectUser),
        txn_type::INVITE_NEW_CHAT
        | txn_type::INVITE_TO_CHAT
        | txn_type::JOIN_CHAT
        | txn_type::LEAVE_CHAT
        | txn_type::REJECT_CHAT_INVITE
        | txn_type::SET_CHAT_SUBJECT => Some(OpenChat),
        // CHAT_SEND, the file-listing/browsing reads, DELETE_FILE,
        // SET_FILE_INFO, and DEL_NEWS_ITEM perform a finer-grained check
        // inside their own handler (e.g. delete-file vs delete-folder).
        _ => None,
    }
}

/// Fields describing one peer's presence, in the shape the user-list
/// reply and `notifyChangeUser` both use.
pub(crate) fn presence_fields(entry: &PresenceEntry) -> Vec<Field> {
    vec![
        Field::u16(htln_proto::field::tag::USER_ID, entry.id),
        Field::u16(htln_proto::field::tag::USER_ICON_ID, entry.icon_id),
        Field::u16(htln_proto::field::tag::USER_FLAGS, entry.flags),
        Field::new(htln_proto::field::tag::USER_NAME, entry.name.clone().into_bytes()),
    ]
}

/// Broadcast `notifyChangeUser` for `session_id` to every other visible
/// session, if `session_id` is currently visible itself.
pub(crate) async fn broadcast_presence_change(server: &Server, session_id: u16) {
    let snapshot = server.registry.presence_snapshot().await;
    let Some(entry) = snapshot.iter().find(|e| e.id == session_id) else {
        return;
    };
    let fields = presence_fields(entry);
    let txn = Transaction::new(txn_type::NOTIFY_CHANGE_USER, 0);
    let bytes = fields
        .into_iter()
        .fold(txn, Transaction::with_field)
        .encode();
    server
        .broadcast(
            |s| s.is_visible() && s.id != session_id,
            move |_| bytes.clone(),
        )
        .await;
}

/// Broadcast `notifyDeleteUser` for a session that just disconnected.
pub async fn broadcast_presence_delete(server: &Server, session_id: u16) {
    let txn = Transaction::new(txn_type::NOTIFY_DELETE_USER, 0)
        .with_field(Field::u16(htln_proto::field::tag::USER_ID, session_id));
    let bytes = txn.encode();
    server
        .broadcast(|s| s.is_visible() && s.id != session_id, move |_| bytes.clone())
        .await;
}

/// Apply the `notifyChangeUser` side effect after `clear_idle` flips a
/// session's away flag back off, per [`crate::dispatch::dispatch`]'s
/// idle-tracking step.
pub async fn notify_idle_cleared(server: &Server, session_id: u16) {
    broadcast_presence_change(server, session_id).await;
}

/// Whether `bit` is set in a 2-byte options field, MSB-first as the wire
/// carries it.
pub(crate) fn option_bit(options: u16, bit: u16) -> bool {
    options & bit != 0
}

/// Bit positions within the `Agreed`/`SetClientUserInfo` options field.
pub(crate) mod opt {
    pub const REFUSE_PM: u16 = 1 << 0;
    pub const REFUSE_CHAT: u16 = 1 << 1;
    pub const HAS_AUTO_RESPONSE: u16 = 1 << 2;
}
