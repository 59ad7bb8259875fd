use brain_core::types::JobPayload;

use crate::ProtocolError;

/// Encode a [`JobPayload`] as a length-prefixed JSON object: a 4-byte
/// big-endian length header followed by the UTF-8 JSON body. Used when the
/// scheduler's backing queue is a raw byte stream rather than a column typed
/// store.
pub fn encode_job_record(payload: &JobPayload) -> Result<Vec<u8>, ProtocolError> {
    let body = serde_json::to_vec(payload)?;
    let len = u32::try_from(body.len()).map_err(|_| ProtocolError::TooLarge(body.len()))?;
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a record produced by [`encode_job_record`]. Unknown keys inside
/// `metadata` are preserved as opaque JSON (forward-compat) rather than
/// rejected.
pub fn decode_job_record(bytes: &[u8]) -> Result<JobPayload, ProtocolError> {
    if bytes.len() < 4 {
        return Err(ProtocolError::Truncated);
    }
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let body = bytes.get(4..4 + len).ok_or(ProtocolError::Truncated)?;
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::types::{JobType, SessionId, TaskId, UserId};
    use chrono::Utc;

    #[test]
    fn round_trips() {
        let payload = JobPayload {
            job_type: JobType::TaskReminder,
            task_id: TaskId::new(),
            user_id: UserId::from("u1"),
            session_id: SessionId::new(),
            execute_at: Utc::now(),
            metadata: serde_json::json!({ "note": "hi", "future_field": 1 }),
        };
        let encoded = encode_job_record(&payload).unwrap();
        let decoded = decode_job_record(&encoded).unwrap();
        assert_eq!(decoded.task_id, payload.task_id);
        assert_eq!(decoded.metadata["future_field"], 1);
    }

    #[test]
    fn truncated_record_errors() {
        assert!(decode_job_record(&[1, 2]).is_err());
    }
}
