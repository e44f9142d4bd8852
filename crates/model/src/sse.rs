use serde_json::Value;

/// Events of the Messages API stream that the engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ThinkingDelta(String),
    /// Cumulative output token count reported by the server.
    Usage { output_tokens: usize },
    MessageStop,
    Error { kind: String, message: String },
}

/// Incremental parser for server-sent event streams.
///
/// Bytes are buffered until a whole frame arrives, so multi-byte characters
/// split across network reads decode correctly.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    /// Feed raw bytes and drain every complete event.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(split) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = self.buffer.drain(..split + 2).collect();
            let frame = String::from_utf8_lossy(&frame[..split]);

            let Some(payload) = data_payload(&frame) else {
                continue;
            };
            match serde_json::from_str::<Value>(&payload) {
                Ok(value) => events.extend(map_event(&value)),
                Err(err) => log::warn!("Ignoring undecodable stream frame: {err}"),
            }
        }
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.iter().all(u8::is_ascii_whitespace)
    }
}

fn data_payload(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn map_event(value: &Value) -> Option<StreamEvent> {
    let str_at = |pointer: &str| value.pointer(pointer).and_then(Value::as_str);

    match str_at("/type")? {
        "content_block_delta" => match str_at("/delta/type")? {
            "text_delta" => Some(StreamEvent::TextDelta(str_at("/delta/text")?.to_owned())),
            "thinking_delta" => Some(StreamEvent::ThinkingDelta(
                str_at("/delta/thinking")?.to_owned(),
            )),
            _ => None,
        },
        "message_delta" => {
            let tokens = value.pointer("/usage/output_tokens")?.as_u64()?;
            Some(StreamEvent::Usage {
                output_tokens: usize::try_from(tokens).unwrap_or(usize::MAX),
            })
        }
        "message_stop" => Some(StreamEvent::MessageStop),
        "error" => Some(StreamEvent::Error {
            kind: str_at("/error/type").unwrap_or("error").to_owned(),
            message: str_at("/error/message")
                .unwrap_or("unknown stream error")
                .to_owned(),
        }),
        _ => None,
    }
}
