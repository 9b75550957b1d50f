//! File-namespace operations: listing, info, rename, delete, move,
//! folder creation, and transfer setup. Setup handlers only allocate a
//! reference and record a pending transfer; the bytes move over the
//! paired transfer connection (`crate::transfer`).

use std::fs;
use std::time::SystemTime;

use htln_proto::field::tag;
use htln_proto::{flat_file, AccessBit, Field, PathList, Transaction};

use crate::error::Error;
use crate::server::Server;
use crate::transfer::{self, TransferKind};

fn decode_file_path(req: &Transaction) -> Result<Vec<String>, Error> {
    let Some(field) = req.field(tag::FILE_PATH) else {
        return Ok(Vec::new());
    };
    let list = PathList::decode(&field.data)?;
    list.segments
        .iter()
        .map(|s| {
            String::from_utf8(s.clone()).map_err(|_| Error::protocol("non-UTF-8 path segment"))
        })
        .collect()
}

fn decode_file_name(req: &Transaction) -> Result<String, Error> {
    req.field(tag::FILE_NAME)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .ok_or_else(|| Error::protocol("missing file name"))
}

/// Parent path segments plus the target's own leaf name, as the file
/// namespace's `resolve_segments` expects.
fn decode_file_path_and_name(req: &Transaction) -> Result<Vec<String>, Error> {
    let mut segments = decode_file_path(req)?;
    segments.push(decode_file_name(req)?);
    Ok(segments)
}

fn split_path_bytes(segments: &[String]) -> (Vec<Vec<u8>>, Vec<u8>) {
    let (parent, leaf) = segments.split_at(segments.len() - 1);
    (
        parent.iter().map(|s| s.as_bytes().to_vec()).collect(),
        leaf.first().cloned().unwrap_or_default().into_bytes(),
    )
}

fn not_found_or_io(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::not_found("No such file or folder.")
    } else {
        Error::from(e)
    }
}

fn ignored(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|p| match p.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == p,
    })
}

/// List a directory's contents, each as a `FILE_NAME_WITH_INFO` field
/// (`type(4) creator(4) size(4) nameLen(2) name`).
pub async fn get_file_name_list(
    server: &Server,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let path = decode_file_path(req)?;
    let dir = server.fs.resolve_segments(&path)?;
    let entries = server.fs.list_dir(&dir)?;

    let mut reply = Transaction::reply_to(req);
    for entry in entries {
        if ignored(&server.config.ignore_patterns, &entry.name) {
            continue;
        }
        let (creator, file_type) = if entry.is_dir {
            (*b"fldr", *b"fldr")
        } else {
            flat_file::creator_type_for(&entry.name)
        };
        let mut data = Vec::new();
        data.extend_from_slice(&file_type);
        data.extend_from_slice(&creator);
        data.extend_from_slice(&(entry.size as u32).to_be_bytes());
        data.extend_from_slice(&(entry.name.len() as u16).to_be_bytes());
        data.extend_from_slice(entry.name.as_bytes());
        reply = reply.with_field(Field::new(tag::FILE_NAME_WITH_INFO, data));
    }
    Ok(Some(reply))
}

/// Return a single file or folder's type/creator codes and size.
pub async fn get_file_info(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let name = segments.last().cloned().unwrap_or_default();
    let abs = server.fs.resolve_segments(&segments)?;
    let metadata = fs::metadata(&abs).map_err(not_found_or_io)?;

    let (creator, file_type) = if metadata.is_dir() {
        (*b"fldr", *b"fldr")
    } else {
        flat_file::creator_type_for(&name)
    };
    let mut type_field = Vec::with_capacity(8);
    type_field.extend_from_slice(&file_type);
    type_field.extend_from_slice(&creator);

    Ok(Some(
        Transaction::reply_to(req)
            .with_field(Field::new(tag::FILE_NAME, name.into_bytes()))
            .with_field(Field::new(tag::FILE_TYPE_STRING, type_field))
            .with_field(Field::u32(tag::FILE_SIZE, metadata.len() as u32)),
    ))
}

/// Rename a file or folder in place.
pub async fn set_file_info(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let mut segments = decode_file_path_and_name(req)?;
    let new_name = req
        .field(tag::FILE_NEW_NAME)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .ok_or_else(|| Error::protocol("missing new file name"))?;
    htln_proto::validate_segment(&new_name)?;

    let access = server
        .registry
        .with_session(session_id, |s| s.access)
        .await
        .ok_or_else(|| Error::transport("session closed"))?;
    if !access.has(AccessBit::RenameFile) {
        return Err(Error::auth("Not authorized to rename files."));
    }

    let old_abs = server.fs.resolve_segments(&segments)?;
    segments.pop();
    segments.push(new_name);
    let new_abs = server.fs.resolve_segments(&segments)?;
    fs::rename(&old_abs, &new_abs).map_err(not_found_or_io)?;

    Ok(Some(Transaction::reply_to(req)))
}

/// Delete a file or folder, checking `DeleteFile` or `DeleteFolder`
/// depending on which it is.
pub async fn delete_file(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let abs = server.fs.resolve_segments(&segments)?;
    let metadata = fs::metadata(&abs).map_err(not_found_or_io)?;

    let access = server
        .registry
        .with_session(session_id, |s| s.access)
        .await
        .ok_or_else(|| Error::transport("session closed"))?;
    let required = if metadata.is_dir() {
        AccessBit::DeleteFolder
    } else {
        AccessBit::DeleteFile
    };
    if !access.has(required) {
        return Err(Error::auth("Not authorized to delete this item."));
    }

    if metadata.is_dir() {
        fs::remove_dir_all(&abs)?;
    } else {
        fs::remove_file(&abs)?;
    }
    Ok(Some(Transaction::reply_to(req)))
}

/// Move a file or folder to a different directory, keeping its name.
pub async fn move_file(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let name = segments.last().cloned().unwrap_or_default();
    let old_abs = server.fs.resolve_segments(&segments)?;

    let new_path_field = req
        .field(tag::FILE_NEW_PATH)
        .ok_or_else(|| Error::protocol("missing destination path"))?;
    let new_path_list = PathList::decode(&new_path_field.data)?;
    let mut new_segments: Vec<String> = new_path_list
        .segments
        .iter()
        .map(|s| {
            String::from_utf8(s.clone())
                .map_err(|_| Error::protocol("non-UTF-8 destination path segment"))
        })
        .collect::<Result<_, _>>()?;
    new_segments.push(name);
    let new_abs = server.fs.resolve_segments(&new_segments)?;

    fs::rename(&old_abs, &new_abs).map_err(not_found_or_io)?;
    Ok(Some(Transaction::reply_to(req)))
}

/// Create a new, empty folder.
pub async fn new_folder(server: &Server, req: &Transaction) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let abs = server.fs.resolve_segments(&segments)?;
    fs::create_dir(&abs).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            Error::conflict("A file or folder with that name already exists.")
        } else {
            Error::from(e)
        }
    })?;
    Ok(Some(Transaction::reply_to(req)))
}

fn flattened_header_len(name: &str, data_size: u64, times: (SystemTime, SystemTime)) -> u64 {
    let (creator, file_type) = flat_file::creator_type_for(name);
    let info = flat_file::InfoFork {
        creator,
        file_type,
        create_date: transfer::date_stamp_from_systemtime(times.0),
        modify_date: transfer::date_stamp_from_systemtime(times.1),
        name: name.to_string(),
        comment: None,
    };
    flat_file::FlatFileObject {
        info,
        data_size: data_size as u32,
    }
    .header_bytes()
    .len() as u64
}

/// Allocate a reference for a single-file download, replying with the
/// reference, the flattened-object-plus-bytes transfer size, and the
/// raw file size.
pub async fn download_file(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let name = segments.last().cloned().unwrap_or_default();
    let abs = server.fs.resolve_segments(&segments)?;
    let metadata = fs::metadata(&abs).map_err(not_found_or_io)?;
    if metadata.is_dir() {
        return Err(Error::not_found("Not a file."));
    }

    let header_len = flattened_header_len(
        &name,
        metadata.len(),
        (
            metadata.created().unwrap_or_else(|_| SystemTime::now()),
            metadata.modified().unwrap_or_else(|_| SystemTime::now()),
        ),
    );

    let (path_bytes, name_bytes) = split_path_bytes(&segments);
    let reference = server
        .transfers
        .insert(TransferKind::FileDownload, name_bytes, path_bytes, session_id, None, None);

    Ok(Some(
        Transaction::reply_to(req)
            .with_field(Field::u32(tag::REFERENCE_NUMBER, reference))
            .with_field(Field::u32(
                tag::TRANSFER_SIZE,
                (header_len + metadata.len()) as u32,
            ))
            .with_field(Field::u32(tag::FILE_SIZE, metadata.len() as u32)),
    ))
}

/// Allocate a reference for a folder download, replying with the
/// reference, the recursive total size, and the recursive item count.
pub async fn download_folder(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let abs = server.fs.resolve_segments(&segments)?;
    if !abs.is_dir() {
        return Err(Error::not_found("Not a folder."));
    }
    let (size, count) = server.fs.recursive_size_and_count(&abs)?;

    let (path_bytes, name_bytes) = split_path_bytes(&segments);
    let reference = server.transfers.insert(
        TransferKind::FolderDownload,
        name_bytes,
        path_bytes,
        session_id,
        None,
        None,
    );

    Ok(Some(
        Transaction::reply_to(req)
            .with_field(Field::u32(tag::REFERENCE_NUMBER, reference))
            .with_field(Field::u32(tag::TRANSFER_SIZE, size as u32))
            .with_field(Field::u32(tag::FOLDER_ITEM_COUNT, count as u32))
            .with_field(Field::u32(tag::WAITING_COUNT, 0)),
    ))
}

/// Allocate a reference for a single-file upload.
pub async fn upload_file(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let (path_bytes, name_bytes) = split_path_bytes(&segments);
    let reference =
        server
            .transfers
            .insert(TransferKind::FileUpload, name_bytes, path_bytes, session_id, None, None);
    Ok(Some(
        Transaction::reply_to(req).with_field(Field::u32(tag::REFERENCE_NUMBER, reference)),
    ))
}

/// Allocate a reference for a folder upload, recording the declared
/// total size and item count the client sent up front.
pub async fn upload_folder(
    server: &Server,
    session_id: u16,
    req: &Transaction,
) -> Result<Option<Transaction>, Error> {
    let segments = decode_file_path_and_name(req)?;
    let declared_size = req.field(tag::TRANSFER_SIZE).and_then(Field::as_u32).map(u64::from);
    let declared_item_count = req.field(tag::FOLDER_ITEM_COUNT).and_then(Field::as_u32);

    let (path_bytes, name_bytes) = split_path_bytes(&segments);
    let reference = server.transfers.insert(
        TransferKind::FolderUpload,
        name_bytes,
        path_bytes,
        session_id,
        declared_size,
        declared_item_count,
    );
    Ok(Some(
        Transaction::reply_to(req).with_field(Field::u32(tag::REFERENCE_NUMBER, reference)),
    ))
}
