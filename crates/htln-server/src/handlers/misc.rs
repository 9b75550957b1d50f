//! Presence queries and mid-session updates that don't belong to login,
//! chat, files, users, or news: the user list, live name/icon/option
//! changes, client-info reports, and forced disconnects.

use htln_proto::field::tag;
use htln_proto::{AccessBit, Field, Transaction};

use crate::error::Error;
use crate::server::Server;
use crate::session::flag_bit;

/// Reply with every currently visible session's presence fields.
pub async fn get_user_name_list(
    server: &Server,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let snapshot = server.registry.presence_snapshot().await;
    let mut reply = Transaction::reply_to(req);
    for entry in &snapshot {
        for field in super::presence_fields(entry) {
            reply = reply.with_field(field);
        }
    }
    Ok(Some(reply))
}

/// Update display name/icon/options mid-session, the same fields
/// `Agreed` commits at login, and broadcast the change.
pub async fn set_client_user_info(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let name = req
        .field(tag::USER_NAME)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned());
    let icon_id = req.field(tag::USER_ICON_ID).and_then(Field::as_u16);
    let options = req.field(tag::OPTIONS).and_then(Field::as_u16);

    server
        .registry
        .with_session(session_id, |s| {
            if let Some(name) = name {
                s.name = name;
            }
            if let Some(icon_id) = icon_id {
                s.icon_id = icon_id;
            }
            if let Some(options) = options {
                s.set_flag(flag_bit::REFUSE_PM, super::option_bit(options, super::opt::REFUSE_PM));
                s.set_flag(
                    flag_bit::REFUSE_CHAT,
                    super::option_bit(options, super::opt::REFUSE_CHAT),
                );
                if !super::option_bit(options, super::opt::HAS_AUTO_RESPONSE) {
                    s.auto_reply = None;
                }
            }
            if let Some(auto_reply_field) = req.field(tag::AUTOMATIC_RESPONSE) {
                s.auto_reply = Some(String::from_utf8_lossy(&auto_reply_field.data).into_owned());
            }
        })
        .await
        .ok_or_else(|| Error::transport("session closed"))?;

    super::broadcast_presence_change(server, session_id).await;
    Ok(Some(Transaction::reply_to(req)))
}

/// Build a preformatted text report on a target session (name, login,
/// address, idle time, version).
pub async fn get_client_info_text(
    server: &Server,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let target = req
        .field(tag::USER_ID)
        .and_then(Field::as_u16)
        .ok_or_else(|| Error::protocol("missing target user id"))?;

    let text = server
        .registry
        .with_session(target, |s| {
            format!(
                "Name: {}\rLogin: {}\rAddress: {}\rIdle: {}s\rVersion: {:?}\r",
                s.name,
                s.login.as_deref().unwrap_or("<none>"),
                s.remote_addr,
                s.idle_seconds,
                s.version,
            )
        })
        .await
        .ok_or_else(|| Error::not_found("No such user."))?;

    Ok(Some(
        Transaction::reply_to(req).with_field(Field::new(tag::DATA, text.into_bytes())),
    ))
}

/// Kick a target session, unless it holds `CannotBeDisconnected`.
pub async fn disconnect_user(
    server: &Server,
    _session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let target = req
        .field(tag::USER_ID)
        .and_then(Field::as_u16)
        .ok_or_else(|| Error::protocol("missing target user id"))?;

    let immune = server
        .registry
        .with_session(target, |s| s.access.has(AccessBit::CannotBeDisconnected))
        .await
        .ok_or_else(|| Error::not_found("No such user."))?;
    if immune {
        return Err(Error::auth("That user cannot be disconnected."));
    }

    if server.registry.remove(target).await.is_some() {
        super::broadcast_presence_delete(server, target).await;
    }

    Ok(Some(Transaction::reply_to(req)))
}
