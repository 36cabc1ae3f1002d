//! TLV status-field decoders and command-field encoders (User Layer).

use crate::packet::TlvField;
use crate::state::{Event, SwitcherState, TallyFlags};

/// Decodes one TLV field into a state-change event. Unknown mnemonics are
/// passed through as [`Event::UnknownField`] rather than dropped, so a host
/// application can special-case firmware extensions without touching the
/// core.
pub fn decode_field(field: &TlvField, audio_floor_db: f32) -> Event {
	let d = &field.data;

	match &field.mnemonic {
		b"CONN" => Event::Connected(d.first().copied().unwrap_or(0) != 0),
		b"PrgI" => Event::ProgramInput(be16(d, 2)),
		b"PrvI" => Event::PreviewInput(be16(d, 2)),
		b"AuxS" => Event::AuxInput(be16(d, 2)),
		b"KeOn" => Event::KeyerOnAir(d.get(2).copied().unwrap_or(0) != 0),
		b"FtbS" => Event::FadeToBlack {
			active: d.get(1).copied().unwrap_or(0) != 0,
			transitioning: d.get(2).copied().unwrap_or(0) != 0,
		},
		b"TrPs" => Event::Transition {
			in_progress: d.get(1).copied().unwrap_or(0) != 0,
			position: be16(d, 4),
		},
		b"TlIn" => Event::Tally(decode_tally(d)),
		b"AMLv" => {
			let left = be32(d, 4);
			let right = be32(d, 8);
			Event::AudioLevels {
				left_db: raw_to_db(left, audio_floor_db),
				right_db: raw_to_db(right, audio_floor_db),
			}
		}
		_ => Event::UnknownField { mnemonic: field.mnemonic, data: d.clone() },
	}
}

fn decode_tally(d: &[u8]) -> std::collections::HashMap<u16, TallyFlags> {
	let mut table = std::collections::HashMap::new();

	let count = be16(d, 0) as usize;
	for i in 0..count {
		if let Some(&bits) = d.get(2 + i) {
			table.insert(i as u16, TallyFlags::from_bits(bits));
		}
	}

	table
}

fn be16(d: &[u8], at: usize) -> u16 {
	match d.get(at..at + 2) {
		Some([hi, lo]) => u16::from_be_bytes([*hi, *lo]),
		_ => 0,
	}
}

fn be32(d: &[u8], at: usize) -> u32 {
	match d.get(at..at + 4) {
		Some([a, b, c, e]) => u32::from_be_bytes([*a, *b, *c, *e]),
		_ => 0,
	}
}

/// `db = 20*log10(raw / (128*65536))`, floored at `audio_floor_db` when `raw == 0`.
fn raw_to_db(raw: u32, audio_floor_db: f32) -> f32 {
	if raw == 0 {
		audio_floor_db
	} else {
		20.0 * (raw as f64 / (128.0 * 65536.0)).log10() as f32
	}
}

/// Applies a decoded event onto the cached observable state. Does not
/// itself decide whether to re-emit the event to subscribers — callers
/// always forward every event in arrival order.
pub fn apply(state: &mut SwitcherState, event: &Event) {
	match event.clone() {
		Event::Connected(connected) => state.connected = connected,
		Event::ProgramInput(idx) => state.program_input = Some(idx),
		Event::PreviewInput(idx) => state.preview_input = Some(idx),
		Event::AuxInput(idx) => state.aux_input = Some(idx),
		Event::KeyerOnAir(on) => state.keyer_on_air = on,
		Event::FadeToBlack { active, transitioning } => {
			state.fade_to_black_active = active;
			state.fade_to_black_transitioning = transitioning;
		}
		Event::Transition { in_progress, position } => {
			state.transition_in_progress = in_progress;
			state.transition_position = position;
		}
		Event::Tally(table) => state.tally = table,
		Event::AudioLevels { left_db, right_db } => {
			state.audio_left_db = left_db;
			state.audio_right_db = right_db;
		}
		Event::UnknownField { .. } => {}
	}
}

/// Splits a 16-bit value into the big-endian `(hi, lo)` bytes most command
/// encoders pack at the tail of a 4-byte argument.
fn hi_lo(v: u16) -> (u8, u8) {
	let b = v.to_be_bytes();
	(b[0], b[1])
}

pub fn set_program(idx: u16) -> ([u8; 4], Vec<u8>) {
	let (hi, lo) = hi_lo(idx);
	(*b"CPgI", vec![0, 0, hi, lo])
}

pub fn set_preview(idx: u16) -> ([u8; 4], Vec<u8>) {
	let (hi, lo) = hi_lo(idx);
	(*b"CPvI", vec![0, 0, hi, lo])
}

pub fn cut() -> ([u8; 4], Vec<u8>) {
	(*b"DCut", vec![0, 0, 0, 0])
}

pub fn auto_transition() -> ([u8; 4], Vec<u8>) {
	(*b"DAut", vec![0, 0, 0, 0])
}

pub fn set_transition_position(value: u16) -> ([u8; 4], Vec<u8>) {
	let (hi, lo) = hi_lo(value);
	(*b"CTPs", vec![0, 0, hi, lo])
}

pub fn set_keyer_on_air(on: bool) -> ([u8; 4], Vec<u8>) {
	(*b"CKOn", vec![0, 0, on as u8, 0])
}

pub fn enable_live_audio(on: bool) -> ([u8; 4], Vec<u8>) {
	(*b"SALN", vec![on as u8, 0, 0, 0])
}

/// `percent` in `[0.0, 1.0]`, scaled to `[0, 52000]` and clamped.
pub fn set_master_audio(percent: f32) -> ([u8; 4], Vec<u8>) {
	let level = (percent * 52000.0).round().clamp(0.0, 52000.0) as u16;
	let (hi, lo) = hi_lo(level);
	(*b"CAMM", vec![0x01, 0x1E, hi, lo, 0, 0, 0, 0])
}

pub fn fade_to_black() -> ([u8; 4], Vec<u8>) {
	(*b"FtbA", vec![0, 0, 0, 0])
}

pub fn set_aux(idx: u16) -> ([u8; 4], Vec<u8>) {
	let (hi, lo) = hi_lo(idx);
	(*b"CAuS", vec![0x01, 0x00, hi, lo])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::packet::TlvField;

	fn field(mnemonic: &[u8; 4], data: &[u8]) -> TlvField {
		TlvField { mnemonic: *mnemonic, data: data.to_vec() }
	}

	#[test]
	fn decodes_program_input() {
		let ev = decode_field(&field(b"PrgI", &[0, 0, 0, 3]), -65.0);
		assert_eq!(ev, Event::ProgramInput(3));
	}

	#[test]
	fn decodes_audio_levels_per_spec_example() {
		let mut data = vec![0u8; 12];
		data[4..8].copy_from_slice(&0x0080_0000u32.to_be_bytes());
		data[8..12].copy_from_slice(&0u32.to_be_bytes());

		let ev = decode_field(&field(b"AMLv", &data), -65.0);
		match ev {
			Event::AudioLevels { left_db, right_db } => {
				// raw = 0x00800000 == 128*65536, so the ratio is exactly 1.0.
				assert!((left_db - 0.0).abs() < 0.01);
				assert_eq!(right_db, -65.0);
			}
			_ => panic!("expected AudioLevels"),
		}
	}

	#[test]
	fn unknown_mnemonic_passes_through() {
		let ev = decode_field(&field(b"_pin", &[1, 2, 3]), -65.0);
		assert!(matches!(ev, Event::UnknownField { .. }));
	}

	#[test]
	fn master_audio_scale_matches_spec_boundaries() {
		assert_eq!(set_master_audio(0.0).1, vec![0x01, 0x1E, 0x00, 0x00, 0, 0, 0, 0]);
		assert_eq!(set_master_audio(1.0).1, vec![0x01, 0x1E, 0xCB, 0x20, 0, 0, 0, 0]);
		assert_eq!(set_master_audio(0.5).1, vec![0x01, 0x1E, 0x65, 0x90, 0, 0, 0, 0]);
	}

	#[test]
	fn master_audio_half_percent_is_26000() {
		let (_, data) = set_master_audio(0.5);
		assert_eq!(&data[2..4], &26000u16.to_be_bytes());
	}

	#[test]
	fn command_encode_decode_preserves_mnemonic_mapping() {
		let (mnemonic, data) = cut();
		let raw = crate::packet::encode_tlv(&mnemonic, &data);
		let fields = crate::packet::decode_tlv_fields(&raw).unwrap();
		assert_eq!(&fields[0].mnemonic, b"DCut");
		assert_eq!(fields[0].data, data);
	}
}
