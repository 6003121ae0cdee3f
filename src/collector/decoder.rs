// src/collector/decoder.rs
//
// Wire formats. One binary TCP message or one CSV text line decodes to
// one Sample.
//
// TCP message, fixed 160 bytes, little-endian:
//   u64 timestamp_ms | i32 ambient_light | 18 x i32 confidence
//   | 18 x i32 distance | 4 bytes reserved
// Confidences and distances are laid out target-major per zone:
//   index 2*zone + target.
//
// CSV line: 38 base-10 integers,
//   timestamp_ms, ambient_light, (confidence, distance) x 18.

use crate::types::{Sample, ZoneReading, NUM_TARGETS, NUM_ZONES};
use std::io::{ErrorKind, Read};
use thiserror::Error;

/// Fixed TCP message length in bytes.
pub const MESSAGE_LEN: usize = 8 + 4 + 4 * NUM_ZONES * NUM_TARGETS + 4 * NUM_ZONES * NUM_TARGETS + 4;

/// CSV fields per line.
pub const CSV_FIELDS: usize = 2 + NUM_ZONES * NUM_TARGETS * 2;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream ended inside a message. Distinct from a clean
    /// end-of-stream, which `read_message` reports as `Ok(None)`.
    #[error("stream ended mid-message after {got} of {expected} bytes")]
    TruncatedMessage { got: usize, expected: usize },

    #[error("expected {expected} CSV fields, got {got}")]
    FieldCount { expected: usize, got: usize },

    #[error("CSV field {index} is not an integer: {value:?}")]
    InvalidField { index: usize, value: String },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking accumulate-until-complete read of one message.
///
/// Returns `Ok(None)` when the peer closes the stream at a message
/// boundary; a close mid-message is a `TruncatedMessage` error.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Sample>, DecodeError> {
    let mut buf = [0u8; MESSAGE_LEN];
    let mut filled = 0;

    while filled < MESSAGE_LEN {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(DecodeError::TruncatedMessage {
                    got: filled,
                    expected: MESSAGE_LEN,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Some(decode_message(&buf)))
}

/// Decode one complete binary message.
pub fn decode_message(buf: &[u8; MESSAGE_LEN]) -> Sample {
    let timestamp_ms = le_u64(&buf[0..8]) as i64;
    let ambient_light = le_i32(&buf[8..12]);

    let confidences_at = 12;
    let distances_at = confidences_at + 4 * NUM_ZONES * NUM_TARGETS;

    let mut zones = [ZoneReading::default(); NUM_ZONES];
    for (zone_idx, zone) in zones.iter_mut().enumerate() {
        let t0 = 2 * zone_idx;
        let t1 = t0 + 1;
        *zone = ZoneReading {
            confidence0: le_i32(&buf[confidences_at + 4 * t0..]),
            confidence1: le_i32(&buf[confidences_at + 4 * t1..]),
            distance0_mm: le_i32(&buf[distances_at + 4 * t0..]),
            distance1_mm: le_i32(&buf[distances_at + 4 * t1..]),
        };
    }

    Sample {
        timestamp_ms,
        ambient_light,
        zones,
    }
}

/// Parse one CSV line. Malformed lines are recoverable per-record
/// errors; the caller skips them and keeps the stream alive.
pub fn parse_csv_line(line: &str) -> Result<Sample, DecodeError> {
    let trimmed = line.trim();
    let got = trimmed.split(',').count();
    if got != CSV_FIELDS {
        return Err(DecodeError::FieldCount {
            expected: CSV_FIELDS,
            got,
        });
    }

    let mut fields = [0i64; CSV_FIELDS];
    for (index, raw) in trimmed.split(',').enumerate() {
        fields[index] = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| DecodeError::InvalidField {
                index,
                value: raw.trim().to_string(),
            })?;
    }

    let mut zones = [ZoneReading::default(); NUM_ZONES];
    for (zone_idx, zone) in zones.iter_mut().enumerate() {
        let at = 2 + zone_idx * NUM_TARGETS * 2;
        *zone = ZoneReading {
            confidence0: fields[at] as i32,
            distance0_mm: fields[at + 1] as i32,
            confidence1: fields[at + 2] as i32,
            distance1_mm: fields[at + 3] as i32,
        };
    }

    Ok(Sample {
        timestamp_ms: fields[0],
        ambient_light: fields[1] as i32,
        zones,
    })
}

fn le_u64(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

fn le_i32(b: &[u8]) -> i32 {
    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Message where zone z target t has confidence 100 + 2z + t and
    /// distance 1000 + 10z + t.
    fn message(timestamp_ms: u64, ambient: i32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MESSAGE_LEN);
        buf.extend_from_slice(&timestamp_ms.to_le_bytes());
        buf.extend_from_slice(&ambient.to_le_bytes());
        for i in 0..(NUM_ZONES * NUM_TARGETS) as i32 {
            let (z, t) = (i / 2, i % 2);
            buf.extend_from_slice(&(100 + 2 * z + t).to_le_bytes());
        }
        for i in 0..(NUM_ZONES * NUM_TARGETS) as i32 {
            let (z, t) = (i / 2, i % 2);
            buf.extend_from_slice(&(1000 + 10 * z + t).to_le_bytes());
        }
        buf.extend_from_slice(&[0u8; 4]);
        assert_eq!(buf.len(), MESSAGE_LEN);
        buf
    }

    #[test]
    fn test_message_len_matches_wire_contract() {
        assert_eq!(MESSAGE_LEN, 160);
        assert_eq!(CSV_FIELDS, 38);
    }

    #[test]
    fn test_decode_message_layout() {
        let buf = message(1_717_278_380_123, 42);
        let sample = read_message(&mut Cursor::new(buf)).unwrap().unwrap();

        assert_eq!(sample.timestamp_ms, 1_717_278_380_123);
        assert_eq!(sample.ambient_light, 42);
        assert_eq!(sample.zones[0].confidence0, 100);
        assert_eq!(sample.zones[0].confidence1, 101);
        assert_eq!(sample.zones[0].distance0_mm, 1000);
        assert_eq!(sample.zones[0].distance1_mm, 1001);
        assert_eq!(sample.zones[8].confidence0, 116);
        assert_eq!(sample.zones[8].distance1_mm, 1081);
    }

    #[test]
    fn test_clean_end_of_stream_is_none() {
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(matches!(read_message(&mut empty), Ok(None)));

        // A full message followed by EOF: one sample, then clean end.
        let mut stream = Cursor::new(message(5, 0));
        assert!(read_message(&mut stream).unwrap().is_some());
        assert!(matches!(read_message(&mut stream), Ok(None)));
    }

    #[test]
    fn test_partial_message_is_a_distinct_error() {
        let mut truncated = Cursor::new(message(5, 0)[..100].to_vec());
        match read_message(&mut truncated) {
            Err(DecodeError::TruncatedMessage { got: 100, expected }) => {
                assert_eq!(expected, MESSAGE_LEN)
            }
            other => panic!("expected truncation error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_accumulates_across_fragmented_reads() {
        // Reader that returns one byte at a time.
        struct OneByte(Cursor<Vec<u8>>);
        impl Read for OneByte {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let len = buf.len().min(1);
                self.0.read(&mut buf[..len])
            }
        }

        let mut reader = OneByte(Cursor::new(message(7, 3)));
        let sample = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(sample.timestamp_ms, 7);
        assert_eq!(sample.ambient_light, 3);
    }

    fn csv_line() -> String {
        let mut fields = vec!["1000".to_string(), "42".to_string()];
        for z in 0..NUM_ZONES as i32 {
            for t in 0..NUM_TARGETS as i32 {
                fields.push((100 + 2 * z + t).to_string());
                fields.push((1000 + 10 * z + t).to_string());
            }
        }
        fields.join(",")
    }

    #[test]
    fn test_parse_csv_line() {
        let sample = parse_csv_line(&csv_line()).unwrap();
        assert_eq!(sample.timestamp_ms, 1000);
        assert_eq!(sample.ambient_light, 42);
        assert_eq!(sample.zones[4].confidence0, 108);
        assert_eq!(sample.zones[4].distance0_mm, 1040);
        assert_eq!(sample.zones[4].confidence1, 109);
        assert_eq!(sample.zones[4].distance1_mm, 1041);
    }

    #[test]
    fn test_parse_csv_line_with_sentinels() {
        let line = format!("2000,0{}", ",0,-1".repeat(NUM_ZONES * NUM_TARGETS));
        let sample = parse_csv_line(&line).unwrap();
        assert!(sample.zones.iter().all(|z| z.distance0_mm == -1 && z.distance1_mm == -1));
    }

    #[test]
    fn test_malformed_csv_lines_are_recoverable_errors() {
        assert!(matches!(
            parse_csv_line("1000,42,7"),
            Err(DecodeError::FieldCount { got: 3, .. })
        ));
        let bad = csv_line().replace("1040", "not-a-number");
        assert!(matches!(
            parse_csv_line(&bad),
            Err(DecodeError::InvalidField { .. })
        ));
        assert!(parse_csv_line("").is_err());
    }
}
