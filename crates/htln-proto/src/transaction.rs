//! The transaction frame: the unit of request/reply on the control
//! connection.
//!
//! Wire layout, all integers big-endian:
//!
//! ```text
//! flags(1) isReply(1) type(2) id(4) errorCode(4) totalSize(4) dataSize(4) paramCount(2) fields...
//! ```
//!
//! `totalSize` and `dataSize` both equal the on-wire byte length of the
//! field section plus 2 (the `paramCount` bytes). A full transaction is
//! `20 + dataSize` bytes: the 20-byte fixed header, then `dataSize` bytes
//! of `paramCount` + fields.

use crate::error::FrameError;
use crate::field::Field;

/// Fixed bytes before the field section: flags, isReply, type, id,
/// errorCode, totalSize, dataSize, paramCount.
const HEADER_LEN: usize = 20;
/// Minimum bytes needed to know how many fields follow.
const PREFIX_LEN: usize = HEADER_LEN + 2;

/// A framed request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Reserved flags byte, passed through unchanged.
    pub flags: u8,
    /// `true` for a server reply, `false` for a client request.
    pub is_reply: bool,
    /// 16-bit transaction type (see the request catalog in [`crate::txn_type`]).
    pub ttype: u16,
    /// Transaction ID: replies reuse the request's ID for correlation;
    /// server-initiated notifications use a fresh random ID.
    pub id: u32,
    /// `0` on success; `1` with an `error` field on failure.
    pub error_code: u32,
    /// Ordered fields. Unknown tags are preserved here untouched.
    pub fields: Vec<Field>,
}

impl Transaction {
    /// Build a bare request/notification with no fields yet.
    #[must_use]
    pub fn new(ttype: u16, id: u32) -> Self {
        Self {
            flags: 0,
            is_reply: false,
            ttype,
            id,
            error_code: 0,
            fields: Vec::new(),
        }
    }

    /// Build a reply to `request`, reusing its transaction ID.
    #[must_use]
    pub fn reply_to(request: &Transaction) -> Self {
        Self {
            flags: 0,
            is_reply: true,
            ttype: request.ttype,
            id: request.id,
            error_code: 0,
            fields: Vec::new(),
        }
    }

    /// Build an error reply to `request` with a human-readable message in
    /// the `error` field.
    #[must_use]
    pub fn error_reply(request: &Transaction, message: impl Into<Vec<u8>>) -> Self {
        let mut txn = Self::reply_to(request);
        txn.error_code = 1;
        txn.fields.push(Field::new(crate::field::tag::ERROR_TEXT, message));
        txn
    }

    /// Append a field, builder-style.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// First field matching `id`, if any.
    #[must_use]
    pub fn field(&self, id: u16) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Encode this transaction to its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut field_bytes = Vec::new();
        for f in &self.fields {
            f.encode_into(&mut field_bytes);
        }

        // dataSize/totalSize count the paramCount bytes plus the fields.
        let data_size = (field_bytes.len() + 2) as u32;

        let mut buf = Vec::with_capacity(HEADER_LEN + data_size as usize);
        buf.push(self.flags);
        buf.push(u8::from(self.is_reply));
        buf.extend_from_slice(&self.ttype.to_be_bytes());
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf.extend_from_slice(&self.error_code.to_be_bytes());
        buf.extend_from_slice(&data_size.to_be_bytes()); // totalSize
        buf.extend_from_slice(&data_size.to_be_bytes()); // dataSize
        buf.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        buf.extend_from_slice(&field_bytes);
        buf
    }

    /// Decode exactly one transaction from the front of `buf`.
    ///
    /// Returns the transaction and the number of bytes it consumed.
    ///
    /// # Errors
    ///
    /// Returns `FrameError::TooShort` if fewer than the 22-byte prefix is
    /// available, `FrameError::Incomplete` if the declared `dataSize` runs
    /// past the buffer, or a field-level error if the field section is
    /// malformed.
    pub fn decode(buf: &[u8]) -> Result<(Transaction, usize), FrameError> {
        if buf.len() < PREFIX_LEN {
            return Err(FrameError::TooShort {
                expected: PREFIX_LEN,
                actual: buf.len(),
            });
        }

        let flags = buf[0];
        let is_reply = buf[1] != 0;
        let ttype = u16::from_be_bytes([buf[2], buf[3]]);
        let id = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let error_code = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        // buf[12..16] is totalSize; redundant with dataSize, not re-validated.
        let data_size = u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]) as usize;
        let param_count = u16::from_be_bytes([buf[20], buf[21]]) as usize;

        let total_len = HEADER_LEN + data_size;
        if buf.len() < total_len {
            return Err(FrameError::Incomplete {
                data_size,
                available: buf.len() - HEADER_LEN,
            });
        }

        // The field section is dataSize - 2 bytes (paramCount already consumed).
        let field_section_len = data_size.saturating_sub(2);
        let mut cursor = PREFIX_LEN;
        let field_section_end = PREFIX_LEN + field_section_len;

        let mut fields = Vec::with_capacity(param_count);
        for _ in 0..param_count {
            if cursor + 4 > field_section_end {
                return Err(FrameError::FieldSectionMismatch {
                    declared: field_section_len,
                    actual: cursor - PREFIX_LEN,
                });
            }
            let field_id = u16::from_be_bytes([buf[cursor], buf[cursor + 1]]);
            let field_size = u16::from_be_bytes([buf[cursor + 2], buf[cursor + 3]]) as usize;
            cursor += 4;

            if cursor + field_size > field_section_end {
                return Err(FrameError::FieldOverflow {
                    field_id,
                    size: field_size,
                    available: field_section_end.saturating_sub(cursor),
                });
            }

            fields.push(Field::new(field_id, buf[cursor..cursor + field_size].to_vec()));
            cursor += field_size;
        }

        if cursor != field_section_end {
            return Err(FrameError::FieldSectionMismatch {
                declared: field_section_len,
                actual: cursor - PREFIX_LEN,
            });
        }

        let txn = Transaction {
            flags,
            is_reply,
            ttype,
            id,
            error_code,
            fields,
        };

        Ok((txn, total_len))
    }

    /// Decode as many complete transactions as `buf` contains.
    ///
    /// Returns the parsed transactions plus the byte offset of the first
    /// unconsumed (partial) byte, so the caller can carry the remainder
    /// into the next read.
    ///
    /// # Errors
    ///
    /// Returns the first decode error encountered; a malformed frame is a
    /// protocol violation and the connection should be closed.
    pub fn decode_all(buf: &[u8]) -> Result<(Vec<Transaction>, usize), FrameError> {
        let mut offset = 0;
        let mut out = Vec::new();

        loop {
            match Transaction::decode(&buf[offset..]) {
                Ok((txn, consumed)) => {
                    out.push(txn);
                    offset += consumed;
                }
                Err(FrameError::TooShort { .. }) | Err(FrameError::Incomplete { .. }) => {
                    // Partial tail; wait for more bytes.
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((out, offset))
    }
}
