use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::EeError;

/// Outbound message understood by the client-side clipboard handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipMessage {
    pub method: &'static str,
    pub args: [String; 1],
}

impl ClipMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            method: "clip",
            args: [text.into()],
        }
    }

    pub fn text(&self) -> &str {
        &self.args[0]
    }
}

/// Fire-and-forget channel to the clipboard; no response is expected.
pub trait ClipboardBridge {
    fn send(&self, message: &ClipMessage) -> Result<(), EeError>;
}

/// Writes each message as one JSON line, e.g. to stdout for a host script.
pub struct JsonLineBridge<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> JsonLineBridge<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> ClipboardBridge for JsonLineBridge<W> {
    fn send(&self, message: &ClipMessage) -> Result<(), EeError> {
        let line =
            serde_json::to_string(message).map_err(|err| EeError::Filesystem(err.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| EeError::Filesystem("clipboard writer poisoned".to_string()))?;
        writeln!(writer, "{line}").map_err(|err| EeError::Filesystem(err.to_string()))?;
        writer
            .flush()
            .map_err(|err| EeError::Filesystem(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_shape() {
        let bridge = JsonLineBridge::new(Vec::new());
        bridge
            .send(&ClipMessage::new("projects/p/assets/img"))
            .unwrap();
        let written = String::from_utf8(bridge.into_inner()).unwrap();
        assert_eq!(
            written,
            "{\"method\":\"clip\",\"args\":[\"projects/p/assets/img\"]}\n"
        );
    }
}
