//! `Field`: a named, typed bit-string of a declared length (spec §3, §4.2).

use crate::error::{BinstructError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthType {
    Fixed,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Unsigned,
    Signed,
    StringKind,
    HexString,
    OctetString,
    BitString,
    /// User-registered kind (spec §3: "plus user-added kinds registered in
    /// the mutation tables").
    Custom(String),
}

/// A field's content as the raw sequence of bit symbols (spec §3), MSB
/// first. `bool` rather than `0`/`1` chars — cheaper to manipulate, same
/// ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub length_bits: usize,
    pub length_type: LengthType,
    pub endianness: Endianness,
    pub kind: FieldKind,
    bits: Vec<bool>,
    pub description: String,
}

fn bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

fn bits_to_unsigned(bits: &[bool]) -> u128 {
    bits.iter().fold(0u128, |acc, &b| (acc << 1) | b as u128)
}

fn unsigned_to_bits(value: u128, width: usize) -> Vec<bool> {
    (0..width)
        .rev()
        .map(|i| (value >> i) & 1 == 1)
        .collect()
}

/// Byte-swap a bit vector whose length is a whole number of bytes.
fn byte_swap(bits: &[bool]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bits.len());
    for chunk in bits.chunks(8).rev() {
        out.extend_from_slice(chunk);
    }
    out
}

fn bits_to_bytes_padded(bits: &[bool]) -> Vec<u8> {
    let mut out = Vec::with_capacity((bits.len() + 7) / 8);
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &b) in chunk.iter().enumerate() {
            if b {
                byte |= 1 << (7 - i);
            }
        }
        out.push(byte);
    }
    out
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in (0..8).rev() {
            out.push((byte >> i) & 1 == 1);
        }
    }
    out
}

impl Field {
    fn raw(
        name: &str,
        length_bits: usize,
        length_type: LengthType,
        endianness: Endianness,
        kind: FieldKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            length_bits,
            length_type,
            endianness,
            kind,
            bits: vec![false; length_bits],
            description: String::new(),
        }
    }

    pub fn unsigned(name: &str, length_bits: usize, endianness: Endianness) -> Self {
        Self::raw(name, length_bits, LengthType::Fixed, endianness, FieldKind::Unsigned)
    }

    pub fn signed(name: &str, length_bits: usize, endianness: Endianness) -> Self {
        Self::raw(name, length_bits, LengthType::Fixed, endianness, FieldKind::Signed)
    }

    pub fn string(name: &str, max_length_bits: usize, endianness: Endianness) -> Self {
        let mut f = Self::raw(
            name,
            max_length_bits,
            LengthType::Variable,
            endianness,
            FieldKind::StringKind,
        );
        f.bits.clear();
        f
    }

    pub fn hexstring(name: &str, max_length_bits: usize, endianness: Endianness) -> Self {
        let mut f = Self::raw(
            name,
            max_length_bits,
            LengthType::Variable,
            endianness,
            FieldKind::HexString,
        );
        f.bits.clear();
        f
    }

    pub fn octetstring(name: &str, length_bits: usize, endianness: Endianness) -> Result<Self> {
        if length_bits % 8 != 0 {
            return Err(BinstructError::FieldInput {
                field: name.to_string(),
                reason: "octetstring length_bits must be a multiple of 8".into(),
            });
        }
        Ok(Self::raw(
            name,
            length_bits,
            LengthType::Fixed,
            endianness,
            FieldKind::OctetString,
        ))
    }

    pub fn bitstring(name: &str, length_bits: usize, endianness: Endianness) -> Self {
        Self::raw(name, length_bits, LengthType::Fixed, endianness, FieldKind::BitString)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn bitstring_text(&self) -> String {
        bits_to_string(&self.bits)
    }

    fn swaps_bytes(&self) -> bool {
        matches!(self.kind, FieldKind::Unsigned | FieldKind::Signed)
            && self.endianness == Endianness::Little
            && self.length_bits > 8
            && self.length_bits % 8 == 0
    }

    /// Bits as they appear on the wire: byte-swapped for little-endian
    /// unsigned/signed fields wider than a byte (spec §4.2).
    pub fn encode_bits(&self) -> Vec<bool> {
        if self.swaps_bytes() {
            byte_swap(&self.bits)
        } else {
            self.bits.clone()
        }
    }

    pub fn set_raw_bits(&mut self, bits: Vec<bool>) -> Result<()> {
        match self.length_type {
            LengthType::Fixed => {
                if bits.len() != self.length_bits {
                    return Err(BinstructError::FieldInput {
                        field: self.name.clone(),
                        reason: format!(
                            "fixed field expects {} bits, got {}",
                            self.length_bits,
                            bits.len()
                        ),
                    });
                }
            }
            LengthType::Variable => {
                if bits.len() > self.length_bits {
                    return Err(BinstructError::FieldInput {
                        field: self.name.clone(),
                        reason: format!(
                            "variable field exceeds max length {} bits",
                            self.length_bits
                        ),
                    });
                }
            }
        }
        self.bits = bits;
        Ok(())
    }

    /// Set from the last `length_bits` bits of `bits`, left-truncating
    /// longer inputs (spec §4.3 replace-phase semantics).
    pub fn set_truncated_bits(&mut self, bits: &[bool]) -> Result<()> {
        let width = self.length_bits;
        let truncated = if bits.len() > width {
            bits[bits.len() - width..].to_vec()
        } else {
            let mut padded = vec![false; width - bits.len()];
            padded.extend_from_slice(bits);
            padded
        };
        self.set_raw_bits(truncated)
    }

    pub fn set_unsigned(&mut self, value: i128) -> Result<()> {
        if !matches!(self.kind, FieldKind::Unsigned) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "set_unsigned on non-unsigned field".into(),
            });
        }
        let modulus = if self.length_bits >= 128 {
            u128::MAX
        } else {
            (1u128 << self.length_bits) - 1
        };
        let wrapped = (value.rem_euclid(modulus as i128 + 1)) as u128;
        self.bits = unsigned_to_bits(wrapped, self.length_bits);
        Ok(())
    }

    pub fn get_unsigned(&self) -> Result<u128> {
        if !matches!(self.kind, FieldKind::Unsigned) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "get_unsigned on non-unsigned field".into(),
            });
        }
        Ok(bits_to_unsigned(&self.bits))
    }

    pub fn set_signed(&mut self, value: i128) -> Result<()> {
        if !matches!(self.kind, FieldKind::Signed) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "set_signed on non-signed field".into(),
            });
        }
        let modulus = 1i128 << self.length_bits;
        let wrapped = value.rem_euclid(modulus) as u128;
        self.bits = unsigned_to_bits(wrapped, self.length_bits);
        Ok(())
    }

    pub fn get_signed(&self) -> Result<i128> {
        if !matches!(self.kind, FieldKind::Signed) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "get_signed on non-signed field".into(),
            });
        }
        let unsigned = bits_to_unsigned(&self.bits) as i128;
        let sign_bit = 1i128 << (self.length_bits - 1);
        if unsigned & sign_bit != 0 {
            Ok(unsigned - (1i128 << self.length_bits))
        } else {
            Ok(unsigned)
        }
    }

    pub fn set_string_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if !matches!(self.kind, FieldKind::StringKind) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "set_string_bytes on non-string field".into(),
            });
        }
        self.set_raw_bits(bytes_to_bits(bytes))
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        bits_to_bytes_padded(&self.bits)
    }

    /// Accepts an integer (`"0x1a"`/`"26"`) or hex text (`"1a"`) on set;
    /// `get_hex` always returns lowercase hex (spec §4.2).
    pub fn set_hex(&mut self, input: &str) -> Result<()> {
        if !matches!(self.kind, FieldKind::HexString) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "set_hex on non-hexstring field".into(),
            });
        }
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let padded = if stripped.len() % 2 == 1 {
            format!("0{stripped}")
        } else {
            stripped.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|e| BinstructError::FieldInput {
            field: self.name.clone(),
            reason: format!("invalid hex: {e}"),
        })?;
        self.set_raw_bits(bytes_to_bits(&bytes))
    }

    pub fn get_hex(&self) -> String {
        hex::encode(self.get_bytes())
    }

    /// `a.b.c.d` dotted-octet input (spec §4.2, scenario S6).
    pub fn set_octets(&mut self, input: &str) -> Result<()> {
        if !matches!(self.kind, FieldKind::OctetString) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "set_octets on non-octetstring field".into(),
            });
        }
        let parts: Vec<&str> = input.split('.').collect();
        let expected = self.length_bits / 8;
        if parts.len() != expected {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: format!("expected {expected} dotted octets, got {}", parts.len()),
            });
        }
        let mut bytes = Vec::with_capacity(expected);
        for part in parts {
            let v: u16 = part.parse().map_err(|_| BinstructError::FieldInput {
                field: self.name.clone(),
                reason: format!("octet {part:?} is not an integer"),
            })?;
            if v > 255 {
                return Err(BinstructError::FieldInput {
                    field: self.name.clone(),
                    reason: format!("octet {v} out of range [0,255]"),
                });
            }
            bytes.push(v as u8);
        }
        self.set_raw_bits(bytes_to_bits(&bytes))
    }

    pub fn get_octets(&self) -> String {
        self.get_bytes()
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Literal `0`/`1` text (spec §4.2).
    pub fn set_bitstring_text(&mut self, text: &str) -> Result<()> {
        if !matches!(self.kind, FieldKind::BitString) {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "set_bitstring_text on non-bitstring field".into(),
            });
        }
        let mut bits = Vec::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                other => {
                    return Err(BinstructError::FieldInput {
                        field: self.name.clone(),
                        reason: format!("invalid bitstring symbol {other:?}"),
                    })
                }
            }
        }
        self.set_raw_bits(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s4_little_endian_unsigned() {
        let mut f = Field::unsigned("len", 16, Endianness::Little);
        f.set_unsigned(0x1234).unwrap();
        let bytes = bits_to_bytes_padded(&f.encode_bits());
        assert_eq!(bytes, vec![0x34, 0x12]);
    }

    #[test]
    fn scenario_s6_octetstring() {
        let mut f = Field::octetstring("ip", 32, Endianness::Big).unwrap();
        f.set_octets("1.2.3.4").unwrap();
        assert_eq!(f.get_bytes(), vec![1, 2, 3, 4]);

        let mut bad = Field::octetstring("ip2", 32, Endianness::Big).unwrap();
        assert!(bad.set_octets("1.2.3").is_err());
    }

    #[test]
    fn invariant_2_unsigned_mod_round_trip() {
        for l in [1usize, 4, 8, 16, 32] {
            let mut f = Field::unsigned("v", l, Endianness::Big);
            let modulus = 1i128 << l;
            for v in [-modulus / 2, -1, 0, 1, modulus - 1] {
                f.set_unsigned(v).unwrap();
                let got = f.get_unsigned().unwrap();
                let expected = v.rem_euclid(modulus) as u128;
                assert_eq!(got, expected, "L={l} v={v}");
            }
        }
    }

    #[test]
    fn hexstring_round_trip() {
        let mut f = Field::hexstring("h", 32, Endianness::Big);
        f.set_hex("0x1a2b").unwrap();
        assert_eq!(f.get_hex(), "1a2b");
    }

    #[test]
    fn bitstring_literal() {
        let mut f = Field::bitstring("b", 4, Endianness::Big);
        f.set_bitstring_text("1010").unwrap();
        assert_eq!(f.bitstring_text(), "1010");
    }

    #[test]
    fn set_truncated_bits_left_truncates_longer_input() {
        let mut f = Field::unsigned("v", 4, Endianness::Big);
        let long = vec![true, true, true, true, false, false]; // 6 bits
        f.set_truncated_bits(&long).unwrap();
        assert_eq!(f.bitstring_text(), "1100");
    }
}
