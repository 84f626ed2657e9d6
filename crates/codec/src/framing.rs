use sk_common::{Lsn, WalRecord};

/// Compact binary framing for in-flight WAL records (§4.2):
/// `[lsn u64][space_id u32][page_no u32][len u32][bytes]`, little endian.
/// `term` is not part of the wire frame — it is local bookkeeping assigned
/// by the receiver from the RPC context, matching the JSON path.
pub fn encode_framed(record: &WalRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20 + record.payload.len());
    buf.extend_from_slice(&record.lsn.to_le_bytes());
    buf.extend_from_slice(&record.space_id.to_le_bytes());
    buf.extend_from_slice(&record.page_no.to_le_bytes());
    buf.extend_from_slice(&(record.payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&record.payload);
    buf
}

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("frame truncated: need at least 20 header bytes, got {0}")]
    TruncatedHeader(usize),
    #[error("frame truncated: payload declares {declared} bytes, only {available} available")]
    TruncatedPayload { declared: u32, available: usize },
}

pub struct DecodedFrame {
    pub lsn: Lsn,
    pub space_id: u32,
    pub page_no: u32,
    pub payload: Vec<u8>,
}

pub fn decode_framed(bytes: &[u8]) -> Result<DecodedFrame, FramingError> {
    if bytes.len() < 20 {
        return Err(FramingError::TruncatedHeader(bytes.len()));
    }
    let lsn = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let space_id = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let page_no = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    let len = u32::from_le_bytes(bytes[16..20].try_into().unwrap());

    let available = bytes.len() - 20;
    if available < len as usize {
        return Err(FramingError::TruncatedPayload { declared: len, available });
    }

    Ok(DecodedFrame {
        lsn,
        space_id,
        page_no,
        payload: bytes[20..20 + len as usize].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_record() {
        let record = WalRecord {
            lsn: 42,
            payload: vec![1, 2, 3, 4, 5],
            space_id: 7,
            page_no: 99,
            term: 1,
        };
        let framed = encode_framed(&record);
        let decoded = decode_framed(&framed).unwrap();
        assert_eq!(decoded.lsn, record.lsn);
        assert_eq!(decoded.space_id, record.space_id);
        assert_eq!(decoded.page_no, record.page_no);
        assert_eq!(decoded.payload, record.payload);
    }

    #[test]
    fn roundtrips_empty_payload() {
        let record = WalRecord { lsn: 1, payload: vec![], space_id: 0, page_no: 0, term: 1 };
        let framed = encode_framed(&record);
        let decoded = decode_framed(&framed).unwrap();
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn rejects_truncated_header() {
        let err = decode_framed(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, FramingError::TruncatedHeader(10)));
    }

    #[test]
    fn rejects_truncated_payload() {
        let record = WalRecord { lsn: 1, payload: vec![1, 2, 3], space_id: 0, page_no: 0, term: 1 };
        let mut framed = encode_framed(&record);
        framed.truncate(framed.len() - 1);
        let err = decode_framed(&framed).unwrap_err();
        assert!(matches!(err, FramingError::TruncatedPayload { .. }));
    }
}
