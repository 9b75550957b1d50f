//! Handshake bytes and the Login/Agreed flow.

use htln_proto::field::tag;
use htln_proto::{txn_type, AccessBits};
use htln_integration_tests::{login_txn, Client, TestServer, HANDSHAKE_REPLY, HANDSHAKE_REQUEST};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn handshake_bytes_match_the_wire_spec() {
    let server = TestServer::spawn().await;
    let mut socket = Client::connect_raw(server.control_port).await;

    assert_eq!(
        HANDSHAKE_REQUEST,
        [
            0x54, 0x52, 0x54, 0x50, 0x48, 0x4f, 0x54, 0x4c, 0x00, 0x01, 0x00, 0x02,
        ]
    );
    assert_eq!(HANDSHAKE_REPLY, [0x54, 0x52, 0x54, 0x50, 0x00, 0x00, 0x00, 0x00]);

    socket.write_all(&HANDSHAKE_REQUEST).await.unwrap();
    let mut reply = [0u8; 8];
    socket.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, HANDSHAKE_REPLY);
}

#[tokio::test]
async fn malformed_handshake_gets_no_reply_and_the_connection_closes() {
    let server = TestServer::spawn().await;
    let mut socket = Client::connect_raw(server.control_port).await;

    socket.write_all(b"NOT A HANDSHAKE").await.unwrap();

    let mut buf = [0u8; 8];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    assert_eq!(n, 0, "server should close the connection without replying");
}

#[tokio::test]
async fn bad_login_replies_with_incorrect_login_and_closes() {
    let server = TestServer::spawn().await;
    server
        .add_account("alice", "Alice", "hunter2", AccessBits::all())
        .await;
    let mut client = server.connect().await;

    client.send(&login_txn("nosuch", "whatever", 1)).await;
    let reply = client.recv().await;

    assert_eq!(reply.ttype, txn_type::ERROR, "a bad-login reply's type is pinned to 0");
    assert_eq!(reply.error_code, 1);
    assert_eq!(
        reply.field(tag::ERROR_TEXT).unwrap().data,
        b"Incorrect login.".to_vec()
    );
    assert!(client.expect_closed().await, "connection should close after a bad login");
}

#[tokio::test]
async fn bad_password_is_also_incorrect_login_and_closes() {
    let server = TestServer::spawn().await;
    server
        .add_account("alice", "Alice", "hunter2", AccessBits::all())
        .await;
    let mut client = server.connect().await;

    client.send(&login_txn("alice", "wrongpassword", 1)).await;
    let reply = client.recv().await;

    assert_eq!(reply.ttype, txn_type::ERROR);
    assert_eq!(reply.error_code, 1);
    assert_eq!(
        reply.field(tag::ERROR_TEXT).unwrap().data,
        b"Incorrect login.".to_vec()
    );
    assert!(client.expect_closed().await);
}

#[tokio::test]
async fn successful_login_pushes_access_and_agreement_then_replies() {
    let server = TestServer::spawn().await;
    server
        .add_account("alice", "Alice", "hunter2", AccessBits::all())
        .await;
    let mut client = server.connect().await;

    let login_reply = client.login("alice", "hunter2").await;
    assert_eq!(login_reply.error_code, 0);
    assert!(login_reply.field(tag::SERVER_NAME).is_some());

    let agree_reply = client.agree("Alice").await;
    assert_eq!(agree_reply.error_code, 0);
}

#[tokio::test]
async fn login_without_password_field_is_a_protocol_error_not_a_close() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let req = htln_proto::Transaction::new(txn_type::LOGIN, 1).with_field(htln_proto::Field::new(
        tag::LOGIN,
        htln_proto::obfuscate_user_string(b"alice"),
    ));
    client.send(&req).await;
    let reply = client.recv().await;
    assert_eq!(reply.error_code, 1);

    // A malformed request (missing field) is a ProtocolError, which does
    // not close the session; a second, well-formed request still works.
    client.send(&htln_proto::Transaction::new(txn_type::KEEP_ALIVE, 2)).await;
    let keepalive_reply = client.recv().await;
    assert_eq!(keepalive_reply.error_code, 0);
}
