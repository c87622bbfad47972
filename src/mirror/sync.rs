//! The reverse-sync wire format: `<id>:<v0>,<v1>,…;` records, ending at the first empty record.
//!
//! `Infinity` and `-Infinity` are literal tokens. Everything else is a decimal float, formatted as the shortest
//! representation that parses back to the same `f32`, so formatting then parsing is the identity.

use super::{MirrorId, SyncRejection};
use core::fmt::Write as _;

pub fn format_float(value: f32, out: &mut String) {
	if value == f32::INFINITY {
		out.push_str("Infinity")
	} else if value == f32::NEG_INFINITY {
		out.push_str("-Infinity")
	} else if value.is_nan() {
		out.push_str("NaN")
	} else {
		let _ = write!(out, "{}", value);
	}
}

#[must_use]
pub fn parse_float(token: &str) -> Option<f32> {
	match token {
		"Infinity" => Some(f32::INFINITY),
		"-Infinity" => Some(f32::NEG_INFINITY),
		// Rust also accepts spellings like `inf`, which aren't part of the format.
		token if token.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) && token != "NaN" => None,
		token => token.parse().ok(),
	}
}

/// Appends one record.
pub fn format_record(id: MirrorId, values: &[f32], out: &mut String) {
	let _ = write!(out, "{}:", id);
	for (i, &value) in values.iter().enumerate() {
		if i > 0 {
			out.push(',')
		}
		format_float(value, out)
	}
	out.push(';')
}

/// Parses `payload` record by record. A malformed record doesn't stop the records after it.
pub fn parse(payload: &str) -> impl '_ + Iterator<Item = Result<(MirrorId, Vec<f32>), SyncRejection>> {
	payload.split(';').take_while(|record| !record.is_empty()).enumerate().map(|(index, record)| {
		let malformed = || SyncRejection::Malformed {
			index,
			record: record.to_owned(),
		};
		let colon = record.find(':').ok_or_else(malformed)?;
		let (id, values) = (&record[..colon], &record[colon + 1..]);
		let id = MirrorId(id.trim().parse().map_err(|_| malformed())?);
		let values = if values.is_empty() {
			Vec::new()
		} else {
			values.split(',').map(|token| parse_float(token.trim())).collect::<Option<Vec<_>>>().ok_or_else(malformed)?
		};
		Ok((id, values))
	})
}
