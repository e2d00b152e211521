//! Property tests for packet framing.
//!
//! These tests verify that packet decoding is robust against fragmentation
//! at arbitrary byte boundaries and rejects every possible payload
//! truncation, which is critical for correct operation over a real socket.

#[cfg(test)]
mod tests {
    use crate::io::{IpcInStream, IpcOutStream};
    use crate::packet::{OpCode, Packet};
    use proptest::prelude::*;
    use serde_json::Value;

    /// A fragmenting reader that splits reads at a specific boundary.
    ///
    /// This simulates a socket delivering a frame in two chunks: only
    /// bytes up to the boundary are handed out on the first pass, the
    /// rest on subsequent reads.
    struct FragmentingReader {
        data: Vec<u8>,
        pos: usize,
        boundary: usize,
    }

    impl FragmentingReader {
        fn new(data: Vec<u8>, boundary: usize) -> Self {
            let boundary = boundary.min(data.len());
            Self {
                data,
                pos: 0,
                boundary,
            }
        }
    }

    impl tokio::io::AsyncRead for FragmentingReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.pos >= self.data.len() {
                return std::task::Poll::Ready(Ok(()));
            }

            let available = if self.pos < self.boundary {
                (self.boundary - self.pos).min(buf.remaining())
            } else {
                (self.data.len() - self.pos).min(buf.remaining())
            };

            if available == 0 {
                return std::task::Poll::Ready(Ok(()));
            }

            let data = &self.data[self.pos..self.pos + available];
            buf.put_slice(data);
            self.pos += available;

            std::task::Poll::Ready(Ok(()))
        }
    }

    // Property test strategies
    fn arbitrary_opcode() -> impl Strategy<Value = OpCode> {
        prop::sample::select(vec![
            OpCode::Handshake,
            OpCode::Frame,
            OpCode::Close,
            OpCode::Ping,
            OpCode::Pong,
        ])
    }

    fn arbitrary_payload() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(
            "[a-z_]{1,12}",
            prop_oneof![
                "[a-zA-Z0-9 ]{0,40}".prop_map(Value::from),
                any::<i32>().prop_map(Value::from),
                any::<bool>().prop_map(Value::from),
            ],
            0..8,
        )
        .prop_map(|map| Value::Object(map.into_iter().collect()))
    }

    async fn encode(packet: &Packet) -> Vec<u8> {
        let mut out = IpcOutStream::new(Vec::new());
        packet.write_to(&mut out);
        out.flush().await.unwrap();
        out.into_inner()
    }

    proptest! {
        /// Decoding an encoded packet reproduces opcode and payload, no
        /// matter where the transport fragments the frame.
        #[test]
        fn test_round_trip_with_fragmentation(
            opcode in arbitrary_opcode(),
            payload in arbitrary_payload(),
            boundary in 0usize..600
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let packet = Packet::new(opcode, payload.clone()).unwrap();
                let bytes = encode(&packet).await;

                let boundary = boundary.min(bytes.len());
                let reader = FragmentingReader::new(bytes, boundary);
                let mut input = IpcInStream::new(reader);

                let decoded = Packet::read_from(&mut input).await.unwrap();
                prop_assert_eq!(decoded.opcode(), opcode);
                prop_assert_eq!(decoded.payload(), &payload);
                Ok(())
            })?;
        }

        /// Truncating the payload by any amount yields a corrupt-frame
        /// error, never a successful decode.
        #[test]
        fn test_payload_truncation_is_corrupt(
            payload in arbitrary_payload(),
            cut in 1usize..400
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let packet = Packet::new(OpCode::Frame, payload).unwrap();
                let mut bytes = encode(&packet).await;

                // Keep the header intact, drop 1..=len payload bytes.
                let cut = cut.min(bytes.len() - 8);
                bytes.truncate(bytes.len() - cut);

                let mut input = IpcInStream::new(std::io::Cursor::new(bytes));
                let err = Packet::read_from(&mut input).await.unwrap_err();
                prop_assert!(err.is_corrupt());
                Ok(())
            })?;
        }

        /// A partial header (1..=7 bytes) is corrupt, not a clean close.
        #[test]
        fn test_partial_header_is_corrupt(
            payload in arbitrary_payload(),
            keep in 1usize..8
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let packet = Packet::new(OpCode::Frame, payload).unwrap();
                let mut bytes = encode(&packet).await;
                bytes.truncate(keep);

                let mut input = IpcInStream::new(std::io::Cursor::new(bytes));
                let err = Packet::read_from(&mut input).await.unwrap_err();
                prop_assert!(err.is_corrupt());
                Ok(())
            })?;
        }
    }
}
