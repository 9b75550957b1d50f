//! Folder-download header ordering, news plumbing, and user-account
//! admin transactions.

use htln_proto::field::tag;
use htln_proto::{txn_type, AccessBits, Field, PathList, Transaction};
use htln_integration_tests::{files_root, TestServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn folder_download_sends_headers_depth_first_then_contents() {
    let server = TestServer::spawn().await;
    server.add_account("dl", "dl", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    client.login_and_agree("dl", "pw", "dl").await;

    let root = files_root(&server);
    std::fs::create_dir_all(root.join("foo/bar")).unwrap();
    std::fs::write(root.join("foo/a.txt"), b"hello").unwrap();
    std::fs::write(root.join("foo/bar/b.txt"), b"world").unwrap();

    client
        .send(&Transaction::new(txn_type::DOWNLOAD_FOLDER, 1).with_field(Field::new(
            tag::FILE_NAME,
            b"foo".to_vec(),
        )))
        .await;
    let reply = client.recv().await;
    assert_eq!(reply.error_code, 0);
    let reference = reply.field(tag::REFERENCE_NUMBER).and_then(Field::as_u32).unwrap();

    let mut transfer = server.connect_transfer().await;
    transfer.write_all(&reference.to_be_bytes()).await.unwrap();

    let mut names = Vec::new();
    // foo (dir) — still answered with a next-action to stay in lockstep
    names.push(read_header(&mut transfer).await);
    transfer.write_all(&0x0003u16.to_be_bytes()).await.unwrap();
    // foo/a.txt (file) — skip it with NEXT_FILE
    names.push(read_header(&mut transfer).await);
    transfer.write_all(&0x0003u16.to_be_bytes()).await.unwrap();
    // foo/bar (dir)
    names.push(read_header(&mut transfer).await);
    transfer.write_all(&0x0003u16.to_be_bytes()).await.unwrap();
    // foo/bar/b.txt (file) — receive it with SEND_FILE
    names.push(read_header(&mut transfer).await);
    transfer.write_all(&0x0001u16.to_be_bytes()).await.unwrap();

    assert_eq!(names, vec!["foo", "foo/a.txt", "foo/bar", "foo/bar/b.txt"]);

    let mut buf = vec![0u8; 512];
    let n = transfer.read(&mut buf).await.unwrap();
    buf.truncate(n);
    let (object, consumed) = htln_proto::FlatFileObject::decode_header(&buf).unwrap();
    assert_eq!(object.data_size, 5);
    assert_eq!(&buf[consumed..], b"world");
}

async fn read_header(stream: &mut tokio::net::TcpStream) -> String {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    let name_len = u16::from_be_bytes([header[0], header[1]]) as usize;
    let mut name = vec![0u8; name_len];
    stream.read_exact(&mut name).await.unwrap();
    String::from_utf8(name).unwrap()
}

#[tokio::test]
async fn news_category_and_article_round_trip() {
    let server = TestServer::spawn().await;
    server.add_account("poster", "poster", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    client.login_and_agree("poster", "pw", "poster").await;

    client
        .send(
            &Transaction::new(txn_type::NEW_NEWS_CAT, 1).with_field(Field::new(
                tag::NEWS_PATH,
                PathList::new(vec![b"Announcements".to_vec()]).encode(),
            )),
        )
        .await;
    assert_eq!(client.recv().await.error_code, 0);

    client
        .send(
            &Transaction::new(txn_type::NEW_NEWS_ART, 2)
                .with_field(Field::new(
                    tag::NEWS_PATH,
                    PathList::new(vec![b"Announcements".to_vec()]).encode(),
                ))
                .with_field(Field::new(tag::NEWS_ARTICLE_TITLE, b"Hello".to_vec()))
                .with_field(Field::new(tag::NEWS_ARTICLE_DATA, b"Welcome!".to_vec())),
        )
        .await;
    assert_eq!(client.recv().await.error_code, 0);

    client
        .send(
            &Transaction::new(txn_type::GET_NEWS_ART_NAME_LIST, 3).with_field(Field::new(
                tag::NEWS_PATH,
                PathList::new(vec![b"Announcements".to_vec()]).encode(),
            )),
        )
        .await;
    let list_reply = client.recv().await;
    assert_eq!(
        list_reply.field(tag::NEWS_ARTICLE_TITLE).unwrap().data,
        b"Hello".to_vec()
    );
    assert_eq!(
        list_reply.field(tag::NEWS_ARTICLE_POSTER).unwrap().data,
        b"poster".to_vec()
    );
    let article_id = list_reply
        .field(tag::NEWS_ARTICLE_ID)
        .and_then(Field::as_u32)
        .unwrap();
    assert_eq!(article_id, 1);

    client
        .send(
            &Transaction::new(txn_type::GET_NEWS_ART_DATA, 4)
                .with_field(Field::new(
                    tag::NEWS_PATH,
                    PathList::new(vec![b"Announcements".to_vec()]).encode(),
                ))
                .with_field(Field::u32(tag::NEWS_ARTICLE_ID, article_id)),
        )
        .await;
    let data_reply = client.recv().await;
    assert_eq!(
        data_reply.field(tag::NEWS_ARTICLE_DATA).unwrap().data,
        b"Welcome!".to_vec()
    );
}

#[tokio::test]
async fn user_admin_create_get_set_and_list() {
    let server = TestServer::spawn().await;
    server.add_account("admin", "Admin", "pw", AccessBits::all()).await;
    let mut client = server.connect().await;
    client.login_and_agree("admin", "pw", "Admin").await;

    client
        .send(
            &Transaction::new(txn_type::NEW_USER, 1)
                .with_field(Field::new(
                    tag::LOGIN,
                    htln_proto::obfuscate_user_string(b"newbie"),
                ))
                .with_field(Field::new(
                    tag::PASSWORD,
                    htln_proto::obfuscate_user_string(b"secret"),
                ))
                .with_field(Field::new(tag::USER_NAME, b"Newbie".to_vec()))
                .with_field(Field::u16(tag::USER_ICON_ID, 0)),
        )
        .await;
    assert_eq!(client.recv().await.error_code, 0);

    client
        .send(&Transaction::new(txn_type::GET_USER, 2).with_field(Field::new(
            tag::LOGIN,
            htln_proto::obfuscate_user_string(b"newbie"),
        )))
        .await;
    let get_reply = client.recv().await;
    assert_eq!(get_reply.field(tag::USER_NAME).unwrap().data, b"Newbie".to_vec());

    client
        .send(
            &Transaction::new(txn_type::SET_USER, 3)
                .with_field(Field::new(
                    tag::LOGIN,
                    htln_proto::obfuscate_user_string(b"newbie"),
                ))
                .with_field(Field::new(tag::USER_NAME, b"Newbie2".to_vec())),
        )
        .await;
    assert_eq!(client.recv().await.error_code, 0);

    client.send(&Transaction::new(txn_type::LIST_USERS, 4)).await;
    let list_reply = client.recv().await;
    let names: Vec<_> = list_reply
        .fields
        .iter()
        .filter(|f| f.id == tag::USER_NAME)
        .map(|f| f.data.clone())
        .collect();
    assert!(names.contains(&b"Newbie2".to_vec()));
}

#[tokio::test]
async fn user_broadcast_reaches_every_visible_session() {
    let server = TestServer::spawn().await;
    server.add_account("admin", "Admin", "pw1", AccessBits::all()).await;
    server.add_account("bystander", "bystander", "pw2", AccessBits::all()).await;

    let mut admin = server.connect().await;
    admin.login_and_agree("admin", "pw1", "Admin").await;
    let mut bystander = server.connect().await;
    bystander.login_and_agree("bystander", "pw2", "bystander").await;

    admin
        .send(
            &Transaction::new(txn_type::USER_BROADCAST, 5)
                .with_field(Field::new(tag::DATA, b"server going down".to_vec())),
        )
        .await;
    assert_eq!(admin.recv().await.error_code, 0);

    let msg = bystander.recv_until(|t| t.ttype == txn_type::SERVER_MSG).await;
    assert_eq!(msg.field(tag::DATA).unwrap().data, b"server going down".to_vec());
}
