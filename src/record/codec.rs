//! Record Codec
//!
//! Encoding and decoding of single records.

use std::io::Read;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TallyError};
use crate::key::{Key, KEY_SIZE};

use super::{Record, HEADER_SIZE, MAGIC, MAX_PAYLOAD_LEN, MAX_VALUE_LEN};

/// Fail with `PayloadTooLarge` if a value cannot fit in one record
pub fn check_value_len(len: usize) -> Result<()> {
    if len > MAX_VALUE_LEN {
        return Err(TallyError::PayloadTooLarge {
            size: KEY_SIZE + len,
            max: MAX_PAYLOAD_LEN as usize,
        });
    }
    Ok(())
}

/// Encode a full record, magic included
///
/// Format: MAGIC (4) + checksum (4) + payload_len (4) + key (20) + value
pub fn encode(key: &Key, value: &[u8]) -> Result<Bytes> {
    check_value_len(value.len())?;

    let payload_len = KEY_SIZE + value.len();
    let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize + payload_len);

    buf.put_slice(MAGIC);
    // Checksum placeholder, filled once the payload is in place
    buf.put_u32(0);
    buf.put_u32(payload_len as u32);
    buf.put_slice(&key.to_record_bytes());
    buf.put_slice(value);

    let checksum = adler2::adler32_slice(&buf[HEADER_SIZE as usize..]);
    buf[4..8].copy_from_slice(&checksum.to_be_bytes());

    Ok(buf.freeze())
}

/// Decode one record from `reader`
///
/// The reader must be positioned just past the magic marker; locating the
/// marker is the caller's job.
pub fn decode<R: Read>(reader: &mut R) -> Result<Record> {
    let mut header = [0u8; 8];
    let got = read_up_to(reader, &mut header)?;
    if got < header.len() {
        return Err(TallyError::TruncatedRecord {
            expected: header.len() as u64,
            actual: got as u64,
        });
    }

    let stored = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let payload_len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

    if payload_len > MAX_PAYLOAD_LEN {
        return Err(TallyError::OversizedPayload(payload_len));
    }
    if (payload_len as usize) < KEY_SIZE {
        return Err(TallyError::TruncatedRecord {
            expected: KEY_SIZE as u64,
            actual: payload_len as u64,
        });
    }

    // `take` keeps a bogus length from reading past what the file holds
    let mut payload = Vec::with_capacity((payload_len as usize).min(64 * 1024));
    reader
        .by_ref()
        .take(payload_len as u64)
        .read_to_end(&mut payload)?;
    if payload.len() < payload_len as usize {
        return Err(TallyError::TruncatedRecord {
            expected: payload_len as u64,
            actual: payload.len() as u64,
        });
    }

    let computed = adler2::adler32_slice(&payload);
    if computed != stored {
        return Err(TallyError::ChecksumMismatch { stored, computed });
    }

    let mut payload = Bytes::from(payload);
    let value = payload.split_off(KEY_SIZE);
    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(&payload);

    Ok(Record {
        key: Key::from_record_bytes(&key_bytes),
        value,
    })
}

/// Fill as much of `buf` as the reader can supply
pub(super) fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
