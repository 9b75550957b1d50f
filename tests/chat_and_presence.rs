//! Public chat fan-out and presence broadcast, plus idle-state
//! away-bit behavior.

use htln_proto::field::tag;
use htln_proto::{txn_type, AccessBits, Field, Transaction};
use htln_integration_tests::TestServer;

#[tokio::test]
async fn chat_send_fans_out_to_every_session_with_read_chat() {
    let server = TestServer::spawn().await;
    server
        .add_account("abc", "abc", "pw1", AccessBits::all())
        .await;
    server
        .add_account("other", "other", "pw2", AccessBits::all())
        .await;

    let mut sender = server.connect().await;
    sender.login_and_agree("abc", "pw1", "abc").await;
    let mut listener = server.connect().await;
    listener.login_and_agree("other", "pw2", "other").await;

    sender
        .send(&Transaction::new(txn_type::CHAT_SEND, 10).with_field(Field::new(tag::DATA, b"hi".to_vec())))
        .await;

    let sender_reply = sender.recv().await;
    assert_eq!(sender_reply.ttype, txn_type::CHAT_SEND);
    assert_eq!(sender_reply.error_code, 0);

    let sender_msg = sender.recv_until(|t| t.ttype == txn_type::CHAT_MSG).await;
    assert_eq!(
        sender_msg.field(tag::DATA).unwrap().data,
        b"          abc:  hi\r".to_vec()
    );

    let listener_msg = listener.recv_until(|t| t.ttype == txn_type::CHAT_MSG).await;
    assert_eq!(
        listener_msg.field(tag::DATA).unwrap().data,
        b"          abc:  hi\r".to_vec()
    );
}

#[tokio::test]
async fn chat_send_without_send_chat_access_is_denied() {
    let server = TestServer::spawn().await;
    let mut no_chat = AccessBits::all();
    no_chat.revoke(htln_proto::AccessBit::SendChat);
    server.add_account("muted", "muted", "pw", no_chat).await;

    let mut client = server.connect().await;
    client.login_and_agree("muted", "pw", "muted").await;

    client
        .send(&Transaction::new(txn_type::CHAT_SEND, 10).with_field(Field::new(tag::DATA, b"hi".to_vec())))
        .await;
    let reply = client.recv().await;
    assert_eq!(reply.error_code, 1);
}

#[tokio::test]
async fn emote_chat_uses_the_star_format() {
    let server = TestServer::spawn().await;
    server.add_account("abc", "abc", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    client.login_and_agree("abc", "pw", "abc").await;

    client
        .send(
            &Transaction::new(txn_type::CHAT_SEND, 11)
                .with_field(Field::new(tag::DATA, b"waves".to_vec()))
                .with_field(Field::u16(tag::CHAT_OPTIONS, 1)),
        )
        .await;
    client.recv().await; // direct reply
    let msg = client.recv_until(|t| t.ttype == txn_type::CHAT_MSG).await;
    assert_eq!(msg.field(tag::DATA).unwrap().data, b"*** abc waves\r".to_vec());
}

#[tokio::test]
async fn agreeing_broadcasts_presence_to_sessions_already_present() {
    let server = TestServer::spawn().await;
    server.add_account("first", "first", "pw1", AccessBits::all()).await;
    server.add_account("second", "second", "pw2", AccessBits::all()).await;

    let mut first = server.connect().await;
    first.login_and_agree("first", "pw1", "first").await;

    let mut second = server.connect().await;
    second.login("second", "pw2").await;
    second.send(&htln_integration_tests::agreed_txn("second", 2)).await;
    second
        .recv_until(|t| t.ttype == txn_type::AGREED && t.is_reply)
        .await;

    let notify = first.recv_until(|t| t.ttype == txn_type::NOTIFY_CHANGE_USER).await;
    assert_eq!(notify.field(tag::USER_NAME).unwrap().data, b"second".to_vec());
}

#[tokio::test]
async fn disconnecting_broadcasts_a_delete_notification() {
    let server = TestServer::spawn().await;
    server.add_account("first", "first", "pw1", AccessBits::all()).await;
    server.add_account("second", "second", "pw2", AccessBits::all()).await;

    let mut first = server.connect().await;
    let first_id = first.login_and_agree("first", "pw1", "first").await;

    let mut second = server.connect().await;
    second.login_and_agree("second", "pw2", "second").await;
    drop(second);

    let notify = first
        .recv_until(|t| t.ttype == txn_type::NOTIFY_DELETE_USER)
        .await;
    let deleted_id = notify.field(tag::USER_ID).and_then(Field::as_u16).unwrap();
    assert_ne!(deleted_id, first_id);
}

#[tokio::test]
async fn idle_ticking_sets_and_clears_the_away_flag() {
    let server = TestServer::spawn().await;
    server.add_account("idler", "idler", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    let id = client.login_and_agree("idler", "pw", "idler").await;

    let changed = server.server.registry.tick_idle(30, 30).await;
    assert_eq!(changed, vec![id]);

    let cleared = server.server.registry.clear_idle(id).await;
    assert!(cleared);

    server
        .server
        .registry
        .with_session(id, |s| assert!(!s.has_flag(htln_server::session::flag_bit::AWAY)))
        .await;
}
