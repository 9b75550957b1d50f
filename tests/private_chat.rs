//! Private-chat invite/join/leave/subject flow.

use htln_proto::field::tag;
use htln_proto::{txn_type, AccessBits, Field, Transaction};
use htln_integration_tests::TestServer;

#[tokio::test]
async fn invite_join_leave_round_trip() {
    let server = TestServer::spawn().await;
    server.add_account("host", "host", "pw1", AccessBits::all()).await;
    server.add_account("guest", "guest", "pw2", AccessBits::all()).await;

    let mut host = server.connect().await;
    let host_id = host.login_and_agree("host", "pw1", "host").await;
    let mut guest = server.connect().await;
    let guest_id = guest.login_and_agree("guest", "pw2", "guest").await;

    host.send(
        &Transaction::new(txn_type::INVITE_NEW_CHAT, 20).with_field(Field::u16(tag::USER_ID, guest_id)),
    )
    .await;
    let invite_reply = host.recv().await;
    assert_eq!(invite_reply.error_code, 0);
    let chat_id = invite_reply.field(tag::CHAT_ID).and_then(Field::as_u32).unwrap();

    let invite = guest.recv_until(|t| t.ttype == txn_type::INVITE_TO_CHAT).await;
    assert_eq!(invite.field(tag::CHAT_ID).and_then(Field::as_u32), Some(chat_id));
    assert_eq!(invite.field(tag::USER_ID).and_then(Field::as_u16), Some(host_id));
    assert_eq!(invite.field(tag::USER_NAME).unwrap().data, b"host".to_vec());

    guest
        .send(&Transaction::new(txn_type::JOIN_CHAT, 21).with_field(Field::u32(tag::CHAT_ID, chat_id)))
        .await;
    let join_reply = guest.recv().await;
    assert_eq!(join_reply.error_code, 0);
    assert!(join_reply
        .fields
        .iter()
        .any(|f| f.id == tag::USER_ID && f.as_u16() == Some(host_id)));

    let change = host.recv_until(|t| t.ttype == txn_type::NOTIFY_CHAT_CHANGE_USER).await;
    assert_eq!(change.field(tag::CHAT_ID).and_then(Field::as_u32), Some(chat_id));
    assert_eq!(change.field(tag::USER_ID).and_then(Field::as_u16), Some(guest_id));

    host.send(
        &Transaction::new(txn_type::SET_CHAT_SUBJECT, 22)
            .with_field(Field::u32(tag::CHAT_ID, chat_id))
            .with_field(Field::new(tag::CHAT_SUBJECT, b"lunch plans".to_vec())),
    )
    .await;
    host.recv().await;
    let subject_notice = guest.recv_until(|t| t.ttype == txn_type::NOTIFY_CHAT_SUBJECT).await;
    assert_eq!(
        subject_notice.field(tag::CHAT_SUBJECT).unwrap().data,
        b"lunch plans".to_vec()
    );

    guest
        .send(&Transaction::new(txn_type::LEAVE_CHAT, 23).with_field(Field::u32(tag::CHAT_ID, chat_id)))
        .await;
    guest.recv().await;
    let delete_notice = host.recv_until(|t| t.ttype == txn_type::NOTIFY_CHAT_DELETE_USER).await;
    assert_eq!(
        delete_notice.field(tag::USER_ID).and_then(Field::as_u16),
        Some(guest_id)
    );
}

#[tokio::test]
async fn joining_an_unknown_chat_is_not_found() {
    let server = TestServer::spawn().await;
    server.add_account("solo", "solo", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    client.login_and_agree("solo", "pw", "solo").await;

    client
        .send(&Transaction::new(txn_type::JOIN_CHAT, 5).with_field(Field::u32(tag::CHAT_ID, 0xdead_beef)))
        .await;
    let reply = client.recv().await;
    assert_eq!(reply.error_code, 1);
}

#[tokio::test]
async fn rejecting_an_invite_just_replies() {
    let server = TestServer::spawn().await;
    server.add_account("solo", "solo", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    client.login_and_agree("solo", "pw", "solo").await;

    client
        .send(&Transaction::new(txn_type::REJECT_CHAT_INVITE, 6).with_field(Field::u32(tag::CHAT_ID, 1)))
        .await;
    let reply = client.recv().await;
    assert_eq!(reply.error_code, 0);
}
