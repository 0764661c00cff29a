use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use asynchronous_codec::{Decoder, Encoder};
use bytes::{Buf, BufMut, BytesMut};

use milterd_common::encoding::{ServerMessage, Writable};
use milterd_common::{InvalidData, Packet, ProtocolError};

/// Length-prefixed framing of milter packets.
///
/// Decodes raw frames into [`Packet`]s and encodes [`ServerMessage`]s
/// back. The maximum frame size starts at the protocol default; the
/// session raises it through [`MilterCodec::limit_handle`] once the MTA
/// advertises a larger maximum data size during option negotiation.
#[derive(Debug, Clone)]
pub(crate) struct MilterCodec {
    max_frame_size: Arc<AtomicUsize>,
}

impl MilterCodec {
    pub(crate) fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: Arc::new(AtomicUsize::new(max_frame_size)),
        }
    }

    /// A handle to adjust the frame limit of a codec already moved
    /// into a `Framed`.
    pub(crate) fn limit_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_frame_size)
    }

    fn max_frame_size(&self) -> usize {
        self.max_frame_size.load(Ordering::Relaxed)
    }
}

impl Decoder for MilterCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            // Not enough data to read the length marker.
            return Ok(None);
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        // A frame always carries at least the command code.
        if length < 1 {
            return Err(InvalidData::new("Received a zero length frame", src.split_to(4)).into());
        }

        // Bound the length so a broken or malicious peer cannot make
        // this session balloon its buffer.
        if length > self.max_frame_size() {
            return Err(ProtocolError::TooMuchData(length));
        }

        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(4 + length);
        frame.advance(4);
        let code = frame.get_u8();

        Ok(Some(Packet {
            code,
            payload: frame,
        }))
    }
}

impl Encoder for MilterCodec {
    type Item<'i> = &'i ServerMessage;
    type Error = ProtocolError;

    fn encode(&mut self, item: &ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload_len = item.len();
        // Never emit a frame the other end will refuse to read.
        if payload_len >= self.max_frame_size() || payload_len > u32::MAX as usize - 1 {
            return Err(ProtocolError::TooMuchData(payload_len));
        }

        let frame_len = payload_len + 1;

        dst.reserve(4 + frame_len);
        dst.extend_from_slice(&u32::to_be_bytes(frame_len as u32));
        dst.put_u8(item.code());
        item.write(dst);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;
    use milterd_common::actions::{Action, Continue};
    use pretty_assertions::assert_eq;

    use super::*;

    fn codec() -> MilterCodec {
        MilterCodec::new(2_usize.pow(16))
    }

    #[test]
    fn decode_waits_for_a_complete_frame() {
        let mut codec = codec();
        let mut buffer = BytesMut::from(&[0u8, 0, 0, 5, b'C'][..]);

        // Length says five bytes, only one arrived so far.
        assert_matches!(codec.decode(&mut buffer), Ok(None));

        buffer.extend_from_slice(b"abcd");
        let packet = codec
            .decode(&mut buffer)
            .expect("decode failed")
            .expect("frame complete");

        assert_eq!(b'C', packet.code);
        assert_eq!(&packet.payload[..], b"abcd");
        assert!(buffer.is_empty());
    }

    #[test]
    fn decode_rejects_zero_length() {
        let mut codec = codec();
        let mut buffer = BytesMut::from(&[0u8, 0, 0, 0][..]);

        assert_matches!(codec.decode(&mut buffer), Err(ProtocolError::InvalidData(_)));
    }

    #[test]
    fn decode_rejects_oversized_frames() {
        let mut codec = MilterCodec::new(16);
        let mut buffer = BytesMut::from(&[0u8, 0, 0, 17][..]);

        assert_matches!(codec.decode(&mut buffer), Err(ProtocolError::TooMuchData(17)));
    }

    #[test]
    fn raising_the_limit_through_the_handle() {
        let mut codec = MilterCodec::new(16);
        let mut buffer = BytesMut::from(&[0u8, 0, 0, 17][..]);
        buffer.extend_from_slice(&[b'B'; 17]);

        codec.limit_handle().store(1024, Ordering::Relaxed);

        let packet = codec
            .decode(&mut buffer)
            .expect("decode failed")
            .expect("frame complete");
        assert_eq!(b'B', packet.code);
        assert_eq!(16, packet.payload.len());
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut codec = codec();
        let mut buffer = BytesMut::new();

        let message = ServerMessage::Action(Action::from(Continue));
        codec.encode(&message, &mut buffer).expect("encode failed");

        assert_eq!(&buffer[..], &[0, 0, 0, 1, b'c']);

        let packet = codec
            .decode(&mut buffer)
            .expect("decode failed")
            .expect("frame complete");
        assert_eq!(Packet::new(b'c', b""), packet);
    }

    #[test]
    fn decode_consumes_frames_one_at_a_time() {
        let mut codec = codec();
        let mut buffer = BytesMut::new();
        buffer.extend_from_slice(&[0, 0, 0, 1, b'A']);
        buffer.extend_from_slice(&[0, 0, 0, 3, b'B', b'h', b'i']);

        let first = codec.decode(&mut buffer).unwrap().unwrap();
        let second = codec.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(Packet::new(b'A', b""), first);
        assert_eq!(Packet::new(b'B', b"hi"), second);
        assert_matches!(codec.decode(&mut buffer), Ok(None));
    }
}
