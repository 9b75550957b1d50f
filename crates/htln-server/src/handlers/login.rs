//! Login and Agreed: authentication and the post-login handshake that
//! commits a session's display name/icon/options.

use htln_proto::field::tag;
use htln_proto::{obfuscate_user_string, AccessBit, Field, Transaction};

use crate::error::Error;
use crate::server::Server;
use crate::session::{flag_bit, SessionState};

/// Authenticate, push the account's access bitmap and (unless the
/// account holds `NoAgreement`) the login agreement text, and reply
/// with the server name and banner ID.
pub async fn login(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let login_field = req
        .field(tag::LOGIN)
        .ok_or_else(|| Error::protocol("missing login field"))?;
    let password_field = req
        .field(tag::PASSWORD)
        .ok_or_else(|| Error::protocol("missing password field"))?;

    let login = String::from_utf8(obfuscate_user_string(&login_field.data))
        .map_err(|_| Error::protocol("login is not valid UTF-8"))?;
    let password = String::from_utf8(obfuscate_user_string(&password_field.data))
        .map_err(|_| Error::protocol("password is not valid UTF-8"))?;
    let version = req.field(tag::VERSION).map(|f| f.data.clone()).unwrap_or_default();

    let account = match server.authenticate(&login, &password).await {
        Ok(account) => account,
        Err(e) => {
            // A failed Login closes the connection right after the error
            // reply, unlike every other AuthError which just denies the
            // one request.
            server
                .registry
                .with_session(session_id, |s| s.state = SessionState::Closed)
                .await;
            let message = e.client_message().unwrap_or("Incorrect login.");
            // The bad-login reply's type is pinned to 0, unlike every
            // other error reply, which echoes the request type.
            let mut reply = Transaction::error_reply(req, message);
            reply.ttype = 0;
            return Ok(Some(reply));
        }
    };

    server
        .registry
        .with_session(session_id, |s| {
            s.login = Some(account.login.clone());
            s.access = account.access;
            s.version = version.clone();
            s.state = SessionState::Authenticated;
        })
        .await
        .ok_or_else(|| Error::transport("session closed during login"))?;

    server.send(
        session_id,
        Transaction::new(htln_proto::txn_type::USER_ACCESS, 0)
            .with_field(Field::new(tag::USER_ACCESS, account.access.0.to_be_bytes().to_vec()))
            .encode(),
    );

    if !account.access.has(AccessBit::NoAgreement) {
        if let Ok(text) = std::fs::read_to_string(&server.config.agreement_path) {
            server.send(
                session_id,
                Transaction::new(htln_proto::txn_type::SHOW_AGREEMENT, 0)
                    .with_field(Field::new(tag::DATA, text.into_bytes()))
                    .encode(),
            );
        }
    }

    Ok(Some(
        Transaction::reply_to(req)
            .with_field(Field::new(tag::SERVER_NAME, server.config.name.clone().into_bytes()))
            .with_field(Field::u16(tag::BANNER_ID, 0)),
    ))
}

/// Commit the display name, icon, and refuse-PM/refuse-chat/auto-reply
/// options, move the session into `Agreed`, and notify every other
/// visible session.
pub async fn agreed(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let name = req
        .field(tag::USER_NAME)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_default();
    let icon_id = req.field(tag::USER_ICON_ID).and_then(Field::as_u16).unwrap_or(0);
    let options = req.field(tag::OPTIONS).and_then(Field::as_u16).unwrap_or(0);
    let auto_reply = if super::option_bit(options, super::opt::HAS_AUTO_RESPONSE) {
        req.field(tag::AUTOMATIC_RESPONSE)
            .map(|f| String::from_utf8_lossy(&f.data).into_owned())
    } else {
        None
    };

    server
        .registry
        .with_session(session_id, |s| {
            s.name = name;
            s.icon_id = icon_id;
            s.set_flag(flag_bit::REFUSE_PM, super::option_bit(options, super::opt::REFUSE_PM));
            s.set_flag(
                flag_bit::REFUSE_CHAT,
                super::option_bit(options, super::opt::REFUSE_CHAT),
            );
            s.auto_reply = auto_reply;
            s.state = SessionState::Agreed;
        })
        .await
        .ok_or_else(|| Error::transport("session closed before agreeing"))?;

    super::broadcast_presence_change(server, session_id).await;

    Ok(Some(Transaction::reply_to(req)))
}
