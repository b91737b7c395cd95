//! Length-delimited framing of the event stream.

use std::path::Path;

use prost::encoding::decode_varint;
use prost::Message;
use tracing::debug;

use super::proto::BuildEvent;
use super::Event;
use crate::error::{Result, ShipError};

/// Decode every record of a length-delimited event stream.
///
/// An empty remainder ends the stream. A truncated length prefix, a payload
/// shorter than its prefix, or a payload that fails to parse is reported as
/// [`ShipError::CorruptStream`] and nothing decoded so far is returned.
/// Event contents are not validated.
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let mut buf = bytes;

    while !buf.is_empty() {
        let offset = bytes.len() - buf.len();
        let record = events.len();
        let corrupt = |reason: String| ShipError::CorruptStream {
            record,
            offset,
            reason,
        };

        let len = decode_varint(&mut buf).map_err(|e| corrupt(e.to_string()))?;
        let len = usize::try_from(len)
            .map_err(|_| corrupt(format!("record length {len} does not fit in memory")))?;
        if buf.len() < len {
            return Err(corrupt(format!(
                "record declares {len} bytes but only {} remain",
                buf.len()
            )));
        }

        let (frame, rest) = buf.split_at(len);
        let raw = BuildEvent::decode(frame).map_err(|e| corrupt(e.to_string()))?;
        events.push(Event::from(raw));
        buf = rest;
    }

    Ok(events)
}

/// Encode events as a length-delimited stream, in order.
pub fn encode_stream(events: &[Event]) -> Vec<u8> {
    let mut out = Vec::new();
    for event in events {
        let raw = BuildEvent::from(event);
        out.extend_from_slice(&raw.encode_length_delimited_to_vec());
    }
    out
}

/// Read and decode an event file written by the build tool.
pub async fn read_event_file(path: &Path) -> Result<Vec<Event>> {
    let bytes = tokio::fs::read(path).await?;
    let events = decode_stream(&bytes)?;
    for event in &events {
        debug!(kind = event.kind(), "build event");
    }
    debug!(count = events.len(), path = %path.display(), "decoded build event stream");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bes::{ArtifactRef, TargetCompletion};

    fn sample(n: usize) -> Vec<Event> {
        let kinds = [
            Event::Started,
            Event::Progress,
            Event::Configured,
            Event::Action,
            Event::Unknown,
            Event::Completed(TargetCompletion {
                success: true,
                artifacts: vec![ArtifactRef::new("file:///out/tool", "tool")],
            }),
            Event::Finished,
        ];
        (0..n).map(|i| kinds[i % kinds.len()].clone()).collect()
    }

    #[test]
    fn test_round_trip_preserves_order() {
        for n in [0, 1, 100] {
            let events = sample(n);
            let decoded = decode_stream(&encode_stream(&events)).unwrap();
            assert_eq!(decoded, events, "round trip of {n} events");
        }
    }

    #[test]
    fn test_empty_stream_is_not_an_error() {
        assert!(decode_stream(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_payload_is_corrupt() {
        let mut bytes = encode_stream(&sample(3));
        bytes.truncate(bytes.len() - 1);

        let err = decode_stream(&bytes).unwrap_err();
        match err {
            ShipError::CorruptStream { record, .. } => assert_eq!(record, 2),
            other => panic!("expected CorruptStream, got {other:?}"),
        }
    }

    #[test]
    fn test_prefix_without_payload_is_corrupt() {
        // Length 5, then end of stream.
        let err = decode_stream(&[0x05]).unwrap_err();
        assert!(matches!(err, ShipError::CorruptStream { record: 0, offset: 0, .. }));
    }

    #[test]
    fn test_unterminated_varint_is_corrupt() {
        let err = decode_stream(&[0xff]).unwrap_err();
        assert!(matches!(err, ShipError::CorruptStream { .. }));
    }

    #[test]
    fn test_unparsable_payload_is_corrupt() {
        // Two-byte record holding field 1 with the reserved wire type 7.
        let err = decode_stream(&[0x02, 0x0f, 0x00]).unwrap_err();
        assert!(matches!(err, ShipError::CorruptStream { .. }));
    }

    #[tokio::test]
    async fn test_read_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.bin");
        std::fs::write(&path, encode_stream(&sample(7))).unwrap();

        let events = read_event_file(&path).await.unwrap();
        assert_eq!(events.len(), 7);
        assert_eq!(events[0], Event::Started);
    }
}
