//! Event-stream dialect spoken by the hosted realtime database.
//!
//! The server sends `put` (replace below a relative path) and `patch`
//! (merge children below a relative path) events carrying
//! `{"path": ..., "data": ...}`, plus `keep-alive`, `cancel` and
//! `auth_revoked`. [`SseDecoder`] turns raw bytes into frames, [`RtdbEvent`]
//! interprets a frame and [`Mirror`] keeps the subscribed value current.

use serde::Deserialize;
use serde_json::Value;

use super::{StoreError, StorePath, tree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Chunks may split lines and
/// multi-byte characters anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(frame) = self.dispatch() {
                    frames.push(frame);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        frames
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);
        if event.is_none() && data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    path: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RtdbEvent {
    Put { path: StorePath, data: Value },
    Patch { path: StorePath, data: Value },
    KeepAlive,
    Cancel(String),
    AuthRevoked,
    Unknown(String),
}

impl RtdbEvent {
    pub fn from_frame(frame: &SseFrame) -> Result<Self, StoreError> {
        match frame.event.as_str() {
            "put" | "patch" => {
                let payload: Payload = serde_json::from_str(&frame.data)?;
                let path = StorePath::parse(&payload.path)?;
                if frame.event == "put" {
                    Ok(Self::Put { path, data: payload.data })
                } else {
                    Ok(Self::Patch { path, data: payload.data })
                }
            }
            "keep-alive" => Ok(Self::KeepAlive),
            "cancel" => Ok(Self::Cancel(frame.data.trim_matches('"').to_string())),
            "auth_revoked" => Ok(Self::AuthRevoked),
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}

/// Local copy of the subscribed value, rebuilt from stream events.
#[derive(Debug, Default)]
pub struct Mirror {
    root: Value,
    primed: bool,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns the new snapshot when the event changed the
    /// mirrored value (the first `put` always counts), and an error for
    /// events that end the subscription.
    pub fn apply(&mut self, event: RtdbEvent) -> Result<Option<Option<Value>>, StoreError> {
        match event {
            RtdbEvent::Put { path, data } => {
                let before = self.root.clone();
                tree::set_at(&mut self.root, &path, data);
                Ok(self.changed(before))
            }
            RtdbEvent::Patch { path, data } => {
                let before = self.root.clone();
                if let Value::Object(children) = data {
                    tree::merge_at(&mut self.root, &path, children);
                }
                Ok(self.changed(before))
            }
            RtdbEvent::KeepAlive | RtdbEvent::Unknown(_) => Ok(None),
            RtdbEvent::Cancel(reason) => Err(StoreError::Cancelled(reason)),
            RtdbEvent::AuthRevoked => {
                Err(StoreError::PermissionDenied("credential revoked".to_string()))
            }
        }
    }

    fn changed(&mut self, before: Value) -> Option<Option<Value>> {
        if self.primed && before == self.root {
            return None;
        }
        self.primed = true;
        Some(if self.root.is_null() { None } else { Some(self.root.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: put\nda").is_empty());
        let frames = decoder.push(b"ta: {\"path\":\"/\",\"data\":null}\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "put".to_string(),
                data: "{\"path\":\"/\",\"data\":null}".to_string(),
            }]
        );
    }

    #[test]
    fn decoder_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": hello\nevent: cancel\ndata: a\ndata: b\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "cancel");
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn frames_become_events() {
        let frame = SseFrame {
            event: "patch".to_string(),
            data: r#"{"path":"/g1","data":{"isDone":"achieved"}}"#.to_string(),
        };
        assert_eq!(
            RtdbEvent::from_frame(&frame).unwrap(),
            RtdbEvent::Patch {
                path: StorePath::parse("g1").unwrap(),
                data: json!({"isDone": "achieved"}),
            }
        );

        let keep_alive = SseFrame { event: "keep-alive".to_string(), data: "null".to_string() };
        assert_eq!(RtdbEvent::from_frame(&keep_alive).unwrap(), RtdbEvent::KeepAlive);
    }

    #[test]
    fn mirror_tracks_puts_and_patches() {
        let mut mirror = Mirror::new();

        let first = mirror
            .apply(RtdbEvent::Put { path: StorePath::root(), data: Value::Null })
            .unwrap();
        assert_eq!(first, Some(None));

        let put = mirror
            .apply(RtdbEvent::Put {
                path: StorePath::parse("g1").unwrap(),
                data: json!({"name": "Run", "isDone": "pending"}),
            })
            .unwrap();
        assert_eq!(put, Some(Some(json!({"g1": {"name": "Run", "isDone": "pending"}}))));

        let patch = mirror
            .apply(RtdbEvent::Patch {
                path: StorePath::parse("g1").unwrap(),
                data: json!({"isDone": "achieved"}),
            })
            .unwrap();
        assert_eq!(patch, Some(Some(json!({"g1": {"name": "Run", "isDone": "achieved"}}))));

        assert_eq!(mirror.apply(RtdbEvent::KeepAlive).unwrap(), None);
    }

    #[test]
    fn cancel_ends_the_mirror() {
        let mut mirror = Mirror::new();
        let result = mirror.apply(RtdbEvent::Cancel("Permission denied".to_string()));
        assert!(matches!(result, Err(StoreError::Cancelled(reason)) if reason == "Permission denied"));
    }
}
