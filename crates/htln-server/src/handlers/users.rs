//! User-account admin: NewUser, DeleteUser, GetUser, SetUser,
//! ListUsers, and the server-wide broadcast.

use htln_accounts::Account;
use htln_proto::field::tag;
use htln_proto::{obfuscate_user_string, txn_type, AccessBit, AccessBits, Field, Transaction};

use crate::error::Error;
use crate::server::Server;
use crate::session::flag_bit;

fn decode_login(field: &htln_proto::Field) -> Result<String, Error> {
    String::from_utf8(obfuscate_user_string(&field.data))
        .map_err(|_| Error::protocol("login is not valid UTF-8"))
}

/// Create a new account, rejecting a duplicate login.
pub async fn new_user(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let login = decode_login(
        req.field(tag::LOGIN).ok_or_else(|| Error::protocol("missing login"))?,
    )?;
    let password = req
        .field(tag::PASSWORD)
        .map(|f| obfuscate_user_string(&f.data))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    let name = req
        .field(tag::USER_NAME)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_else(|| login.clone());
    let access = req
        .field(tag::USER_ACCESS)
        .and_then(|f| f.data.get(0..8).map(|b| u64::from_be_bytes(b.try_into().unwrap())))
        .map(AccessBits)
        .unwrap_or_else(AccessBits::none);

    let account = Account::new(login, name, &password, access)?;
    server.create_account(account).await?;
    Ok(Some(Transaction::reply_to(req)))
}

/// Delete an account.
pub async fn delete_user(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let login = decode_login(
        req.field(tag::LOGIN).ok_or_else(|| Error::protocol("missing login"))?,
    )?;
    server.delete_account(&login).await?;
    Ok(Some(Transaction::reply_to(req)))
}

/// Read an account's display name and access bitmap.
pub async fn get_user(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let login = decode_login(
        req.field(tag::LOGIN).ok_or_else(|| Error::protocol("missing login"))?,
    )?;
    let account = server
        .account(&login)
        .await
        .ok_or_else(|| Error::not_found("No such account."))?;

    Ok(Some(
        Transaction::reply_to(req)
            .with_field(Field::new(tag::LOGIN, obfuscate_user_string(login.as_bytes())))
            .with_field(Field::new(tag::USER_NAME, account.name.into_bytes()))
            .with_field(Field::new(
                tag::USER_ACCESS,
                account.access.0.to_be_bytes().to_vec(),
            )),
    ))
}

/// Replace an account's display name/password/access, rewriting its
/// file and, if the login is currently connected, its live session
/// state and admin flag.
pub async fn set_user(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let login = decode_login(
        req.field(tag::LOGIN).ok_or_else(|| Error::protocol("missing login"))?,
    )?;
    let mut account = server
        .account(&login)
        .await
        .ok_or_else(|| Error::not_found("No such account."))?;

    if let Some(name_field) = req.field(tag::USER_NAME) {
        account.name = String::from_utf8_lossy(&name_field.data).into_owned();
    }
    if let Some(password_field) = req.field(tag::PASSWORD) {
        let password = obfuscate_user_string(&password_field.data);
        account.set_password(&String::from_utf8_lossy(&password))?;
    }
    if let Some(access_field) = req.field(tag::USER_ACCESS) {
        let bytes: [u8; 8] = access_field
            .data
            .get(0..8)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::protocol("malformed access bitmap"))?;
        account.access = AccessBits(u64::from_be_bytes(bytes));
    }

    server.update_account(account.clone()).await?;

    if let Some(session_id) = server.registry.find_by_login(&login).await {
        server
            .registry
            .with_session(session_id, |s| {
                s.access = account.access;
                s.set_flag(flag_bit::ADMIN, account.access.has(AccessBit::ModifyUser));
            })
            .await;
        super::broadcast_presence_change(server, session_id).await;
    }

    Ok(Some(Transaction::reply_to(req)))
}

/// List every account's login and display name.
pub async fn list_users(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let mut logins = server.account_logins().await;
    logins.sort();

    let mut reply = Transaction::reply_to(req);
    for login in logins {
        let Some(account) = server.account(&login).await else {
            continue;
        };
        reply = reply
            .with_field(Field::new(tag::LOGIN, obfuscate_user_string(login.as_bytes())))
            .with_field(Field::new(tag::USER_NAME, account.name.into_bytes()));
    }
    Ok(Some(reply))
}

/// Send `serverMsg` to every other visible session, marked as a
/// broadcast (`chatOptions=0`).
pub async fn user_broadcast(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let text = req
        .field(tag::DATA)
        .map(|f| f.data.clone())
        .ok_or_else(|| Error::protocol("missing broadcast text"))?;

    let bytes = Transaction::new(txn_type::SERVER_MSG, 0)
        .with_field(Field::new(tag::DATA, text))
        .with_field(Field::u16(tag::CHAT_OPTIONS, 0))
        .encode();
    server.broadcast(|s| s.is_visible(), move |_| bytes.clone()).await;

    Ok(Some(Transaction::reply_to(req)))
}
