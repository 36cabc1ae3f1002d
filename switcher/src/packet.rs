//! The 12-byte switcher packet header and its TLV payload.

use wire::{Reader, Writer};

use crate::error::Error;

/// Size of the fixed packet header, in bytes.
pub const HEADER_LEN: usize = 12;

/// Fixed UDP port the device listens on.
pub const DEVICE_PORT: u16 = 9910;

/// The five reliability/handshake flag bits packed into the top of byte 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
	pub reliable: bool,
	pub syn: bool,
	pub retransmission: bool,
	pub request_retransmission: bool,
	pub ack: bool,
}

impl Flags {
	pub const RELIABLE: Self = Self { reliable: true, syn: false, retransmission: false, request_retransmission: false, ack: false };
	pub const SYN: Self = Self { reliable: false, syn: true, retransmission: false, request_retransmission: false, ack: false };
	pub const ACK: Self = Self { reliable: false, syn: false, retransmission: false, request_retransmission: false, ack: true };

	fn to_bits(self) -> u8 {
		(self.reliable as u8) << 4 | (self.syn as u8) << 3 | (self.retransmission as u8) << 2 | (self.request_retransmission as u8) << 1 | (self.ack as u8)
	}

	fn from_bits(bits: u8) -> Self {
		Self {
			reliable: bits & 0b10000 != 0,
			syn: bits & 0b01000 != 0,
			retransmission: bits & 0b00100 != 0,
			request_retransmission: bits & 0b00010 != 0,
			ack: bits & 0b00001 != 0,
		}
	}
}

/// A single parsed or to-be-sent switcher datagram.
#[derive(Debug, Clone, Default)]
pub struct Packet {
	pub flags: Flags,
	pub session_id: u16,
	pub ack_number: u16,
	pub remote_sequence: u16,
	pub local_sequence: u16,
	pub payload: Vec<u8>,
}

impl Packet {
	pub fn encode(&self) -> Vec<u8> {
		let total_len = HEADER_LEN + self.payload.len();
		debug_assert!(total_len <= 0x7FF, "switcher packet exceeds the 11-bit length field");

		let mut w = Writer::with_capacity(total_len);
		w.push_u8((self.flags.to_bits() << 3) | ((total_len >> 8) as u8 & 0x07));
		w.push_u8((total_len & 0xFF) as u8);
		w.push_u16(self.session_id);
		w.push_u16(self.ack_number);
		w.push_u16(0); // reserved, zero on send
		w.push_u16(self.remote_sequence);
		w.push_u16(self.local_sequence);
		w.push_bytes(&self.payload);

		w.finish()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
		if bytes.len() < HEADER_LEN {
			return Err(Error::ProtocolViolation(format!("packet shorter than header ({} bytes)", bytes.len())));
		}

		let mut r = Reader::new(bytes);
		let byte0 = r.read_u8().unwrap();
		let byte1 = r.read_u8().unwrap();

		let flags = Flags::from_bits(byte0 >> 3);
		let total_len = (((byte0 & 0x07) as usize) << 8) | byte1 as usize;

		if total_len != bytes.len() {
			return Err(Error::ProtocolViolation(format!("declared length {total_len} does not match received {} bytes", bytes.len())));
		}

		let session_id = r.read_u16().unwrap();
		let ack_number = r.read_u16().unwrap();
		let _reserved = r.read_u16().unwrap();
		let remote_sequence = r.read_u16().unwrap();
		let local_sequence = r.read_u16().unwrap();
		let payload = r.read_rest().to_vec();

		Ok(Self { flags, session_id, ack_number, remote_sequence, local_sequence, payload })
	}
}

/// One decoded TLV status field: a four-letter mnemonic plus its data bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvField {
	pub mnemonic: [u8; 4],
	pub data: Vec<u8>,
}

/// Splits a packet payload into its back-to-back TLV fields.
///
/// Fails if the fields' sizes don't sum exactly to the payload length, per
/// the packet invariant that a payload ends exactly at its last field.
pub fn decode_tlv_fields(payload: &[u8]) -> Result<Vec<TlvField>, Error> {
	let mut fields = Vec::new();
	let mut r = Reader::new(payload);

	while !r.is_empty() {
		let len = r
			.read_u16()
			.map_err(|_| Error::ProtocolViolation("truncated TLV length".into()))? as usize;

		if len < 8 {
			return Err(Error::ProtocolViolation(format!("TLV field length {len} is smaller than the 8-byte prefix")));
		}

		let _reserved = r.read_u16().map_err(|_| Error::ProtocolViolation("truncated TLV reserved field".into()))?;

		let mnemonic_bytes = r.read_bytes(4).map_err(|_| Error::ProtocolViolation("truncated TLV mnemonic".into()))?;
		let mut mnemonic = [0u8; 4];
		mnemonic.copy_from_slice(mnemonic_bytes);

		let data = r
			.read_bytes(len - 8)
			.map_err(|_| Error::ProtocolViolation("TLV data runs past the end of the payload".into()))?
			.to_vec();

		fields.push(TlvField { mnemonic, data });
	}

	Ok(fields)
}

/// Encodes a single TLV field with the standard 8-byte prefix.
pub fn encode_tlv(mnemonic: &[u8; 4], data: &[u8]) -> Vec<u8> {
	let mut w = Writer::with_capacity(8 + data.len());
	w.push_u16((8 + data.len()) as u16);
	w.push_u16(0);
	w.push_bytes(mnemonic);
	w.push_bytes(data);
	w.finish()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn header_round_trips() {
		let p = Packet {
			flags: Flags::RELIABLE,
			session_id: 42,
			ack_number: 0,
			remote_sequence: 0,
			local_sequence: 7,
			payload: encode_tlv(b"DCut", &[0, 0, 0, 0]),
		};

		let bytes = p.encode();
		let decoded = Packet::decode(&bytes).unwrap();

		assert_eq!(decoded.flags, p.flags);
		assert_eq!(decoded.session_id, 42);
		assert_eq!(decoded.local_sequence, 7);
		assert_eq!(decoded.payload, p.payload);
	}

	#[test]
	fn mismatched_length_is_a_protocol_violation() {
		let mut bytes = Packet::default().encode();
		bytes.push(0); // now the trailing declared length no longer matches
		assert!(Packet::decode(&bytes).is_err());
	}

	#[test]
	fn tlv_encode_decode_is_the_identity() {
		let raw = encode_tlv(b"PrgI", &[0, 0, 0, 3]);
		let fields = decode_tlv_fields(&raw).unwrap();

		assert_eq!(fields.len(), 1);
		assert_eq!(&fields[0].mnemonic, b"PrgI");
		assert_eq!(fields[0].data, vec![0, 0, 0, 3]);
	}

	#[test]
	fn multiple_tlv_fields_pack_back_to_back() {
		let mut payload = encode_tlv(b"PrgI", &[0, 0, 0, 3]);
		payload.extend(encode_tlv(b"PrvI", &[0, 0, 0, 4]));

		let fields = decode_tlv_fields(&payload).unwrap();
		assert_eq!(fields.len(), 2);
		assert_eq!(&fields[1].mnemonic, b"PrvI");
	}

	#[test]
	fn truncated_tlv_is_malformed() {
		let mut payload = encode_tlv(b"PrgI", &[0, 0, 0, 3]);
		payload.pop();
		assert!(decode_tlv_fields(&payload).is_err());
	}
}
