//! ChatSend and SendInstantMsg: the public chat line and the private
//! instant-message bounce.

use htln_proto::field::tag;
use htln_proto::{txn_type, AccessBit, Field, Transaction};

use crate::error::Error;
use crate::server::Server;
use crate::session::flag_bit;

/// Format and route a chat line: to a private chat's members if
/// `chatID` is present, otherwise to every session with `ReadChat`
/// access.
pub async fn chat_send(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let text = req
        .field(tag::DATA)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .ok_or_else(|| Error::protocol("missing chat text"))?;
    let is_emote = req.field(tag::CHAT_OPTIONS).is_some();

    let (name, access) = server
        .registry
        .with_session(session_id, |s| (s.name.clone(), s.access))
        .await
        .ok_or_else(|| Error::transport("session closed before chat send"))?;

    let line = if is_emote {
        format!("*** {name} {text}\r")
    } else {
        format!("{name:>13}:  {text}\r")
    };

    if let Some(chat_id_field) = req.field(tag::CHAT_ID) {
        let chat_id = chat_id_field
            .as_u32()
            .ok_or_else(|| Error::protocol("malformed chat id"))?;
        let members = server
            .registry
            .private_chats()
            .get(&chat_id)
            .map(|c| c.members.clone())
            .ok_or_else(|| Error::not_found("No such chat."))?;

        let bytes = Transaction::new(txn_type::CHAT_MSG, 0)
            .with_field(Field::u32(tag::CHAT_ID, chat_id))
            .with_field(Field::new(tag::DATA, line.into_bytes()))
            .encode();
        for member in members {
            server.send(member, bytes.clone());
        }
        return Ok(Some(Transaction::reply_to(req)));
    }

    if !access.has(AccessBit::SendChat) {
        return Err(Error::auth("Not authorized to send chat."));
    }

    let bytes = Transaction::new(txn_type::CHAT_MSG, 0)
        .with_field(Field::new(tag::DATA, line.into_bytes()))
        .encode();
    server
        .broadcast(
            |s| s.is_visible() && s.access.has(AccessBit::ReadChat),
            move |_| bytes.clone(),
        )
        .await;
    Ok(Some(Transaction::reply_to(req)))
}

/// Deliver a private instant message to `target`, bouncing back the
/// target's auto-reply text if it has one set.
pub async fn send_instant_msg(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let target = req
        .field(tag::USER_ID)
        .and_then(Field::as_u16)
        .ok_or_else(|| Error::protocol("missing target user id"))?;
    let text = req
        .field(tag::DATA)
        .map(|f| f.data.clone())
        .ok_or_else(|| Error::protocol("missing message text"))?;

    let sender_name = server
        .registry
        .with_session(session_id, |s| s.name.clone())
        .await
        .ok_or_else(|| Error::transport("session closed before sending"))?;

    let (refuses, auto_reply) = server
        .registry
        .with_session(target, |s| (s.has_flag(flag_bit::REFUSE_PM), s.auto_reply.clone()))
        .await
        .ok_or_else(|| Error::not_found("No such user."))?;

    if refuses {
        return Err(Error::not_found("User is not accepting messages."));
    }

    server.send(
        target,
        Transaction::new(txn_type::SERVER_MSG, 0)
            .with_field(Field::u16(tag::USER_ID, session_id))
            .with_field(Field::new(tag::USER_NAME, sender_name.into_bytes()))
            .with_field(Field::new(tag::DATA, text))
            .encode(),
    );

    if let Some(reply_text) = auto_reply {
        server.send(
            session_id,
            Transaction::new(txn_type::SERVER_MSG, 0)
                .with_field(Field::u16(tag::USER_ID, target))
                .with_field(Field::new(tag::AUTOMATIC_RESPONSE, reply_text.into_bytes()))
                .encode(),
        );
    }

    Ok(Some(Transaction::reply_to(req)))
}
