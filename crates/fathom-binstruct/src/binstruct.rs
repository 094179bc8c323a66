//! `Binstruct`: an ordered sequence of fields and nested Binstructs
//! (spec §3, §4.2).

use std::collections::HashMap;

use crate::error::{BinstructError, Result};
use crate::field::{Endianness, Field};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Field(Field),
    Struct(Binstruct),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Field(f) => &f.name,
            Node::Struct(s) => &s.name,
        }
    }
}

/// A bitfield is a nested Binstruct with `is_bitfield = true`: in
/// little-endian mode it's byte-swapped as a whole on serialization but
/// otherwise behaves as an invisible container for sub-byte fields
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binstruct {
    pub name: String,
    pub endian: Endianness,
    pub is_bitfield: bool,
    children: Vec<Node>,
    groups: HashMap<String, Vec<String>>,
}

impl Binstruct {
    pub fn new(name: &str, endian: Endianness) -> Self {
        Self {
            name: name.to_string(),
            endian,
            is_bitfield: false,
            children: Vec::new(),
            groups: HashMap::new(),
        }
    }

    pub fn bitfield(name: &str, endian: Endianness) -> Self {
        let mut s = Self::new(name, endian);
        s.is_bitfield = true;
        s
    }

    fn assert_unique_name(&self, name: &str) -> Result<()> {
        if self.children.iter().any(|c| c.name() == name) {
            return Err(BinstructError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub fn push_field(mut self, field: Field) -> Result<Self> {
        self.assert_unique_name(&field.name)?;
        self.children.push(Node::Field(field));
        Ok(self)
    }

    pub fn push_struct(mut self, child: Binstruct) -> Result<Self> {
        self.assert_unique_name(&child.name)?;
        self.children.push(Node::Struct(child));
        Ok(self)
    }

    /// Group members must resolve to existing direct field names, else
    /// construction fails with `UnknownField` (spec §4.2).
    pub fn add_group(&mut self, group_name: &str, field_names: Vec<String>) -> Result<()> {
        for fname in &field_names {
            if !self.children.iter().any(|c| matches!(c, Node::Field(f) if &f.name == fname)) {
                return Err(BinstructError::UnknownField(fname.clone()));
            }
        }
        self.groups.insert(group_name.to_string(), field_names);
        Ok(())
    }

    pub fn groups(&self) -> &HashMap<String, Vec<String>> {
        &self.groups
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// `each`: every direct field, descending exactly one level into
    /// bitfields, but not into plain nested structs (spec §4.2).
    pub fn each(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                Node::Field(f) => out.push(f),
                Node::Struct(s) if s.is_bitfield => {
                    for c in &s.children {
                        if let Node::Field(f) = c {
                            out.push(f);
                        }
                    }
                }
                Node::Struct(_) => {}
            }
        }
        out
    }

    fn deep_each_into<'a>(&'a self, out: &mut Vec<&'a Field>) {
        for child in &self.children {
            match child {
                Node::Field(f) => out.push(f),
                Node::Struct(s) => s.deep_each_into(out),
            }
        }
    }

    /// `deep_each`: every leaf field across all nesting.
    pub fn deep_each(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        self.deep_each_into(&mut out);
        out
    }

    /// `flatten`: the list of leaves (spec §4.2) — identical traversal to
    /// `deep_each`, distinct name for call sites that want "the leaves"
    /// rather than "a traversal".
    pub fn flatten(&self) -> Vec<&Field> {
        self.deep_each()
    }

    pub fn find_field(&self, name: &str) -> Result<&Field> {
        for child in &self.children {
            match child {
                Node::Field(f) if f.name == name => return Ok(f),
                Node::Struct(s) => {
                    if let Ok(f) = s.find_field(name) {
                        return Ok(f);
                    }
                }
                _ => {}
            }
        }
        Err(BinstructError::NoSuchField(name.to_string()))
    }

    pub fn find_field_mut(&mut self, name: &str) -> Result<&mut Field> {
        for child in &mut self.children {
            match child {
                Node::Field(f) if f.name == name => return Ok(f),
                Node::Struct(s) => {
                    if s.find_field_mut(name).is_ok() {
                        return s.find_field_mut(name);
                    }
                }
                _ => {}
            }
        }
        Err(BinstructError::NoSuchField(name.to_string()))
    }

    /// Substitute one node for another anywhere in the tree, preserving
    /// the name-to-reference mapping (spec §4.2) — the replacement's own
    /// name is used for subsequent lookups.
    pub fn replace(&mut self, old_name: &str, new: Node) -> Result<()> {
        for child in &mut self.children {
            let matches_name = child.name() == old_name;
            if matches_name {
                *child = new;
                return Ok(());
            }
            if let Node::Struct(s) = child {
                if s.replace(old_name, new.clone()).is_ok() {
                    return Ok(());
                }
            }
        }
        Err(BinstructError::NoSuchField(old_name.to_string()))
    }

    fn assembled_bits(&self) -> Vec<bool> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                Node::Field(f) => out.extend(f.encode_bits()),
                Node::Struct(s) => out.extend(s.encode_bits_container()),
            }
        }
        out
    }

    fn encode_bits_container(&self) -> Vec<bool> {
        let assembled = self.assembled_bits();
        if self.is_bitfield && self.endian == Endianness::Little {
            assembled.chunks(8).rev().flat_map(|c| c.to_vec()).collect()
        } else {
            assembled
        }
    }

    /// Concatenate field bitstrings in declaration order; pad to a byte
    /// boundary on the right with zeros (spec §4.2).
    pub fn encode(&self) -> Vec<u8> {
        let mut bits = self.assembled_bits();
        while bits.len() % 8 != 0 {
            bits.push(false);
        }
        let mut out = Vec::with_capacity(bits.len() / 8);
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

    /// Decode `bytes` back into a structure shaped like `self`, consuming
    /// each current field's existing bit width in declaration order
    /// (spec §3 round-trip invariant: `decode(encode(s)) == s` for
    /// byte-aligned structures, where each field's *current* content
    /// length — not its declared maximum — defines its width on the
    /// wire, matching what `encode` just produced).
    pub fn decode(&self, bytes: &[u8]) -> Result<Binstruct> {
        let total_bits = self.deep_each().iter().map(|f| f.bits().len()).sum::<usize>();
        if bytes.len() * 8 < total_bits {
            return Err(BinstructError::FieldInput {
                field: self.name.clone(),
                reason: "insufficient bytes to decode structure".into(),
            });
        }
        let mut bitstream = Vec::with_capacity(bytes.len() * 8);
        for &byte in bytes {
            for i in (0..8).rev() {
                bitstream.push((byte >> i) & 1 == 1);
            }
        }
        let mut cursor = 0usize;
        self.decode_from(&bitstream, &mut cursor)
    }

    fn decode_from(&self, bitstream: &[bool], cursor: &mut usize) -> Result<Binstruct> {
        let mut clone = self.clone();
        if self.is_bitfield && self.endian == Endianness::Little {
            let width = self.assembled_bits().len();
            let window = &bitstream[*cursor..*cursor + width];
            let unswapped: Vec<bool> = window.chunks(8).rev().flat_map(|c| c.to_vec()).collect();
            *cursor += width;
            let mut inner_cursor = 0usize;
            for child in &mut clone.children {
                match child {
                    Node::Field(f) => {
                        let w = f.bits().len();
                        let slice = unswapped[inner_cursor..inner_cursor + w].to_vec();
                        f.set_raw_bits(slice)?;
                        inner_cursor += w;
                    }
                    Node::Struct(_) => unreachable!("bitfields hold only fields (spec §3)"),
                }
            }
        } else {
            for child in &mut clone.children {
                match child {
                    Node::Field(f) => {
                        let w = f.bits().len();
                        let slice = bitstream[*cursor..*cursor + w].to_vec();
                        f.set_raw_bits(slice)?;
                        *cursor += w;
                    }
                    Node::Struct(s) => {
                        *child = Node::Struct(s.decode_from(bitstream, cursor)?);
                    }
                }
            }
        }
        Ok(clone)
    }
}
