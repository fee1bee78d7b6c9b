use alloc::vec::Vec;

use super::{Error, Protocol, Result};

/// Framed-text wire encoding: one JSON object per frame.
#[derive(Debug, Default, Clone)]
pub struct JsonProtocol;

impl Protocol for JsonProtocol {
    fn serialize<T: serde::Serialize>(&self, data: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(data).map_err(|e| Error::Serialization(alloc::format!("{}", e)))
    }

    fn deserialize<T: for<'de> serde::Deserialize<'de>>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(alloc::format!("{}", e)))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ServerFrame;

    #[test]
    fn frame_survives_the_wire() {
        let protocol = JsonProtocol;
        let frame = ServerFrame::StateAck { changed: true };

        let bytes = protocol.serialize(&frame).unwrap();
        let parsed: ServerFrame = protocol.deserialize(&bytes).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn garbage_reports_deserialization_error() {
        let protocol = JsonProtocol;
        let err = protocol.deserialize::<ServerFrame>(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }
}
