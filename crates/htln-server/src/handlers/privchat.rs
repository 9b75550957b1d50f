//! Private chats: invite/join/leave/subject transactions and the
//! membership-change notifications they fan out.

use rand::RngCore;

use htln_proto::field::tag;
use htln_proto::{txn_type, Field, Transaction};

use crate::chat::PrivateChat;
use crate::error::Error;
use crate::registry::PresenceEntry;
use crate::server::Server;

fn allocate_chat_id(server: &Server) -> u32 {
    loop {
        let id = rand::thread_rng().next_u32();
        if id != 0 {
            if let dashmap::mapref::entry::Entry::Vacant(slot) = server.registry.private_chats().entry(id) {
                slot.insert(PrivateChat::new(id, ""));
                return id;
            }
        }
    }
}

async fn notify_chat_change(server: &Server, chat_id: u32, entry: &PresenceEntry) {
    let fields = super::presence_fields(entry);
    let txn = Transaction::new(txn_type::NOTIFY_CHAT_CHANGE_USER, 0).with_field(Field::u32(tag::CHAT_ID, chat_id));
    let bytes = fields.into_iter().fold(txn, Transaction::with_field).encode();
    let members = server
        .registry
        .private_chats()
        .get(&chat_id)
        .map(|c| c.members.clone())
        .unwrap_or_default();
    for member in members {
        server.send(member, bytes.clone());
    }
}

async fn notify_chat_delete(server: &Server, chat_id: u32, left_session_id: u16) {
    let bytes = Transaction::new(txn_type::NOTIFY_CHAT_DELETE_USER, 0)
        .with_field(Field::u32(tag::CHAT_ID, chat_id))
        .with_field(Field::u16(tag::USER_ID, left_session_id))
        .encode();
    let members = server
        .registry
        .private_chats()
        .get(&chat_id)
        .map(|c| c.members.clone())
        .unwrap_or_default();
    for member in members {
        server.send(member, bytes.clone());
    }
}

/// Create a new private chat and invite `USER_ID`'s target session.
pub async fn invite_new_chat(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let target = req
        .field(tag::USER_ID)
        .and_then(Field::as_u16)
        .ok_or_else(|| Error::protocol("missing target user id"))?;

    let chat_id = allocate_chat_id(server);
    {
        let mut chat = server
            .registry
            .private_chats()
            .get_mut(&chat_id)
            .expect("just allocated");
        chat.join(session_id);
    }

    let inviter_name = server
        .registry
        .with_session(session_id, |s| s.name.clone())
        .await
        .ok_or_else(|| Error::transport("session closed before inviting"))?;

    server.send(
        target,
        Transaction::new(txn_type::INVITE_TO_CHAT, 0)
            .with_field(Field::u32(tag::CHAT_ID, chat_id))
            .with_field(Field::u16(tag::USER_ID, session_id))
            .with_field(Field::new(tag::USER_NAME, inviter_name.into_bytes()))
            .encode(),
    );

    Ok(Some(
        Transaction::reply_to(req).with_field(Field::u32(tag::CHAT_ID, chat_id)),
    ))
}

/// Invite another session to an already-existing private chat.
pub async fn invite_to_chat(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let chat_id = req
        .field(tag::CHAT_ID)
        .and_then(Field::as_u32)
        .ok_or_else(|| Error::protocol("missing chat id"))?;
    let target = req
        .field(tag::USER_ID)
        .and_then(Field::as_u16)
        .ok_or_else(|| Error::protocol("missing target user id"))?;

    if !server.registry.private_chats().contains_key(&chat_id) {
        return Err(Error::not_found("No such chat."));
    }
    let inviter_name = server
        .registry
        .with_session(session_id, |s| s.name.clone())
        .await
        .ok_or_else(|| Error::transport("session closed before inviting"))?;

    server.send(
        target,
        Transaction::new(txn_type::INVITE_TO_CHAT, 0)
            .with_field(Field::u32(tag::CHAT_ID, chat_id))
            .with_field(Field::u16(tag::USER_ID, session_id))
            .with_field(Field::new(tag::USER_NAME, inviter_name.into_bytes()))
            .encode(),
    );

    Ok(Some(Transaction::reply_to(req)))
}

/// Join a private chat, replying with its subject and current
/// membership, and notifying existing members.
pub async fn join_chat(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let chat_id = req
        .field(tag::CHAT_ID)
        .and_then(Field::as_u32)
        .ok_or_else(|| Error::protocol("missing chat id"))?;

    let subject = {
        let mut chat = server
            .registry
            .private_chats()
            .get_mut(&chat_id)
            .ok_or_else(|| Error::not_found("No such chat."))?;
        chat.join(session_id);
        chat.subject.clone()
    };

    let snapshot = server.registry.presence_snapshot().await;
    if let Some(entry) = snapshot.iter().find(|e| e.id == session_id) {
        notify_chat_change(server, chat_id, entry).await;
    }

    let members = server
        .registry
        .private_chats()
        .get(&chat_id)
        .map(|c| c.members.clone())
        .unwrap_or_default();
    let mut reply = Transaction::reply_to(req).with_field(Field::new(tag::CHAT_SUBJECT, subject.into_bytes()));
    for entry in snapshot.iter().filter(|e| members.contains(&e.id)) {
        for field in super::presence_fields(entry) {
            reply = reply.with_field(field);
        }
    }
    Ok(Some(reply))
}

/// Leave a private chat, destroying it if now empty.
pub async fn leave_chat(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let chat_id = req
        .field(tag::CHAT_ID)
        .and_then(Field::as_u32)
        .ok_or_else(|| Error::protocol("missing chat id"))?;

    let now_empty = {
        let mut chat = server
            .registry
            .private_chats()
            .get_mut(&chat_id)
            .ok_or_else(|| Error::not_found("No such chat."))?;
        chat.leave(session_id);
        chat.is_empty()
    };

    notify_chat_delete(server, chat_id, session_id).await;

    if now_empty {
        server.registry.private_chats().remove(&chat_id);
    }
    Ok(Some(Transaction::reply_to(req)))
}

/// Decline an invitation without joining.
pub async fn reject_chat_invite(
    _server: &Server,
    _session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    Ok(Some(Transaction::reply_to(req)))
}

/// Set a private chat's subject, broadcasting the change to its members.
pub async fn set_chat_subject(
    server: &Server,
    _session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let chat_id = req
        .field(tag::CHAT_ID)
        .and_then(Field::as_u32)
        .ok_or_else(|| Error::protocol("missing chat id"))?;
    let subject = req
        .field(tag::CHAT_SUBJECT)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_default();

    let members = {
        let mut chat = server
            .registry
            .private_chats()
            .get_mut(&chat_id)
            .ok_or_else(|| Error::not_found("No such chat."))?;
        chat.subject = subject.clone();
        chat.members.clone()
    };

    let bytes = Transaction::new(txn_type::NOTIFY_CHAT_SUBJECT, 0)
        .with_field(Field::u32(tag::CHAT_ID, chat_id))
        .with_field(Field::new(tag::CHAT_SUBJECT, subject.into_bytes()))
        .encode();
    for member in members {
        server.send(member, bytes.clone());
    }

    Ok(Some(Transaction::reply_to(req)))
}
