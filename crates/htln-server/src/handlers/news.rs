//! Flat and threaded news: the message board, the bundle/category tree,
//! and article read/post/delete.
//!
//! A news path field always names the node's own position: every
//! segment but the last locates the parent bundle, the last segment is
//! the bundle/category/article-holder's own name. Listing children
//! (`GetNewsCatNameList`) is the one case with no "own name" to split
//! off — there the whole path names the bundle being listed.

use htln_proto::field::tag;
use htln_proto::{txn_type, AccessBit, Field, PathList, Transaction};

use crate::error::Error;
use crate::server::Server;

fn decode_news_path(req: &Transaction) -> Result<Vec<String>, Error> {
    let field = req
        .field(tag::NEWS_PATH)
        .ok_or_else(|| Error::protocol("missing news path"))?;
    let list = PathList::decode(&field.data)?;
    list.segments
        .iter()
        .map(|s| {
            String::from_utf8(s.clone()).map_err(|_| Error::protocol("non-UTF-8 news path segment"))
        })
        .collect()
}

fn decode_news_path_and_name(req: &Transaction) -> Result<(Vec<String>, String), Error> {
    let mut segments = decode_news_path(req)?;
    let name = segments
        .pop()
        .ok_or_else(|| Error::protocol("empty news path"))?;
    Ok((segments, name))
}

/// Return the flat-news board's entire contents.
pub async fn get_msgs(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let contents = server.flat_news_contents().await;
    Ok(Some(
        Transaction::reply_to(req).with_field(Field::new(tag::DATA, contents.into_bytes())),
    ))
}

/// Prepend a formatted post to the flat-news board and broadcast it.
pub async fn old_post_news(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let text = req
        .field(tag::DATA)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .ok_or_else(|| Error::protocol("missing post text"))?;
    let poster = server
        .registry
        .with_session(session_id, |s| s.name.clone())
        .await
        .ok_or_else(|| Error::transport("session closed before posting"))?;

    let date = chrono::Local::now().format(&server.config.news_date_format).to_string();
    let post = format!("From {poster} ({date}):\r\r{text}");
    server.post_flat_news(post.clone()).await?;

    let bytes = Transaction::new(txn_type::NEW_MSG, 0)
        .with_field(Field::new(tag::DATA, post.into_bytes()))
        .encode();
    server.broadcast(|s| s.is_visible(), move |_| bytes.clone()).await;

    Ok(Some(Transaction::reply_to(req)))
}

/// List a bundle's direct children, each as a `NEWS_CATEGORY_NAME` field
/// whose first byte is 1 for a nested bundle, 0 for a category.
pub async fn get_news_cat_name_list(
    server: &Server,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let path = decode_news_path(req)?;
    let children = server
        .with_news(false, move |news| {
            news.list_children(&path)
                .map(|v| v.into_iter().map(|(n, b)| (n.to_string(), b)).collect::<Vec<_>>())
        })
        .await??;

    let mut reply = Transaction::reply_to(req);
    for (name, is_bundle) in children {
        let mut data = vec![u8::from(is_bundle)];
        data.extend_from_slice(name.as_bytes());
        reply = reply.with_field(Field::new(tag::NEWS_CATEGORY_NAME, data));
    }
    Ok(Some(reply))
}

/// Create a nested news bundle (folder).
pub async fn new_news_fldr(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    server.with_news(true, move |news| news.create_bundle(&path, &name)).await??;
    Ok(Some(Transaction::reply_to(req)))
}

/// Create a news category.
pub async fn new_news_cat(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    server.with_news(true, move |news| news.create_category(&path, &name)).await??;
    Ok(Some(Transaction::reply_to(req)))
}

/// Delete a bundle or category, checking `DeleteNewsFolder` or
/// `DeleteNewsCategory` depending on which it is.
pub async fn del_news_item(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    let access = server
        .registry
        .with_session(session_id, |s| s.access)
        .await
        .ok_or_else(|| Error::transport("session closed"))?;

    let is_bundle = {
        let path = path.clone();
        let name = name.clone();
        server
            .with_news(false, move |news| {
                news.list_children(&path)
                    .map(|children| children.iter().any(|(n, b)| *n == name && *b))
            })
            .await??
    };

    let required = if is_bundle {
        AccessBit::DeleteNewsFolder
    } else {
        AccessBit::DeleteNewsCategory
    };
    if !access.has(required) {
        return Err(Error::auth("Not authorized to delete this news item."));
    }

    server.with_news(true, move |news| news.delete_node(&path, &name)).await??;
    Ok(Some(Transaction::reply_to(req)))
}

/// List a category's articles (ID, title, poster).
pub async fn get_news_art_name_list(
    server: &Server,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    let articles = server
        .with_news(false, move |news| {
            news.category(&path, &name).map(|cat| {
                cat.articles()
                    .map(|a| (a.id, a.title.clone(), a.poster.clone()))
                    .collect::<Vec<_>>()
            })
        })
        .await??;

    let mut reply = Transaction::reply_to(req);
    for (id, title, poster) in articles {
        reply = reply
            .with_field(Field::u32(tag::NEWS_ARTICLE_ID, id))
            .with_field(Field::new(tag::NEWS_ARTICLE_TITLE, title.into_bytes()))
            .with_field(Field::new(tag::NEWS_ARTICLE_POSTER, poster.into_bytes()));
    }
    Ok(Some(reply))
}

/// Fetch one article's title, poster, flavor, and body.
pub async fn get_news_art_data(
    server: &Server,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    let article_id = req
        .field(tag::NEWS_ARTICLE_ID)
        .and_then(Field::as_u32)
        .ok_or_else(|| Error::protocol("missing article id"))?;

    let article = server
        .with_news(false, move |news| {
            news.category(&path, &name).ok().and_then(|cat| cat.article(article_id).cloned())
        })
        .await?
        .ok_or_else(|| Error::not_found("No such article."))?;

    Ok(Some(
        Transaction::reply_to(req)
            .with_field(Field::new(tag::NEWS_ARTICLE_TITLE, article.title.into_bytes()))
            .with_field(Field::new(tag::NEWS_ARTICLE_POSTER, article.poster.into_bytes()))
            .with_field(Field::new(tag::NEWS_ARTICLE_FLAVOR, article.flavor.into_bytes()))
            .with_field(Field::new(tag::NEWS_ARTICLE_DATA, article.data)),
    ))
}

/// Post a new article, threading it under `NEWS_ARTICLE_PARENT_ID` (0
/// for a top-level post).
pub async fn new_news_art(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    let title = req
        .field(tag::NEWS_ARTICLE_TITLE)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .ok_or_else(|| Error::protocol("missing article title"))?;
    let flavor = req
        .field(tag::NEWS_ARTICLE_FLAVOR)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_else(|| "text/plain".to_string());
    let data = req.field(tag::NEWS_ARTICLE_DATA).map(|f| f.data.clone()).unwrap_or_default();
    let parent_id = req.field(tag::NEWS_ARTICLE_PARENT_ID).and_then(Field::as_u32).unwrap_or(0);

    let poster = server
        .registry
        .with_session(session_id, |s| s.name.clone())
        .await
        .ok_or_else(|| Error::transport("session closed before posting"))?;
    let date = crate::transfer::date_stamp_from_systemtime(std::time::SystemTime::now());

    server
        .with_news(true, move |news| -> Result<u32, htln_news::NewsError> {
            news.category_mut(&path, &name)?.post(title, poster, date, flavor, data, parent_id)
        })
        .await??;

    Ok(Some(Transaction::reply_to(req)))
}

/// Delete a single article (and its reply subtree) without deleting its
/// category.
pub async fn del_news_art(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let (path, name) = decode_news_path_and_name(req)?;
    let article_id = req
        .field(tag::NEWS_ARTICLE_ID)
        .and_then(Field::as_u32)
        .ok_or_else(|| Error::protocol("missing article id"))?;

    server
        .with_news(true, move |news| -> Result<(), htln_news::NewsError> {
            news.category_mut(&path, &name)?.delete(article_id)
        })
        .await??;

    Ok(Some(Transaction::reply_to(req)))
}
