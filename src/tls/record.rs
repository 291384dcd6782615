//! Record-layer framing, covering both TLS's implicit per-connection
//! sequence number and DTLS's explicit `Epoch`/`SequenceNumber` fields.

use bytes::Bytes;

use crate::codec::{write_u16, write_u24, write_u48, write_u8, Reader};
use crate::errors::*;

pub const TLS_1_2_VERSION: u16 = 0x0303;
pub const DTLS_1_2_VERSION: u16 = 0xfefd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Unknown(u8),
}

impl ContentType {
    pub fn to_u8(&self) -> u8 {
        match self {
            ContentType::ChangeCipherSpec => 20,
            ContentType::Alert => 21,
            ContentType::Handshake => 22,
            ContentType::ApplicationData => 23,
            ContentType::Unknown(v) => *v,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            20 => ContentType::ChangeCipherSpec,
            21 => ContentType::Alert,
            22 => ContentType::Handshake,
            23 => ContentType::ApplicationData,
            _ => ContentType::Unknown(v),
        }
    }
}

/// A single framed record, still carrying (if encryption is active) the
/// raw ciphertext fragment -- record-layer decryption happens one level up
/// in `record_stream`, which owns the per-epoch cipher state.
#[derive(Debug, Clone)]
pub struct Record {
    pub typ: ContentType,
    pub version: u16,
    /// `None` for TLS (the sequence number is an implicit per-connection
    /// counter); `Some((epoch, seq))` for DTLS.
    pub epoch_seq: Option<(u16, u64)>,
    pub fragment: Bytes,
}

impl Record {
    /// Parses one record header + fragment from the front of `reader`.
    /// `is_dtls` selects the wire shape.
    pub fn parse(reader: &mut Reader, is_dtls: bool) -> Result<Self> {
        let typ = ContentType::from_u8(reader.read_u8()?);
        let version = reader.read_u16()?;

        let epoch_seq = if is_dtls {
            let epoch = reader.read_u16()?;
            let seq = reader.read_u48()?;
            Some((epoch, seq))
        } else {
            None
        };

        let fragment = reader.read_opaque16()?;

        Ok(Self {
            typ,
            version,
            epoch_seq,
            fragment,
        })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_u8(out, self.typ.to_u8());
        write_u16(out, self.version);
        if let Some((epoch, seq)) = self.epoch_seq {
            write_u16(out, epoch);
            write_u48(out, seq);
        }
        write_u16(out, self.fragment.len() as u16);
        out.extend_from_slice(&self.fragment);
    }
}

/// DTLS handshake fragment header: `{Type, Length, MessageSeq,
/// FragmentOffset, FragmentLength}`. TLS carries only `{Type, Length}`; see
/// `HandshakeHeader::serialize_tls`.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeHeader {
    pub typ: u8,
    pub length: u32,
    pub message_seq: u16,
    pub fragment_offset: u32,
    pub fragment_length: u32,
}

impl HandshakeHeader {
    pub fn parse_dtls(reader: &mut Reader) -> Result<Self> {
        let typ = reader.read_u8()?;
        let length = reader.read_u24()?;
        let message_seq = reader.read_u16()?;
        let fragment_offset = reader.read_u24()?;
        let fragment_length = reader.read_u24()?;
        Ok(Self {
            typ,
            length,
            message_seq,
            fragment_offset,
            fragment_length,
        })
    }

    pub fn parse_tls(reader: &mut Reader) -> Result<Self> {
        let typ = reader.read_u8()?;
        let length = reader.read_u24()?;
        Ok(Self {
            typ,
            length,
            message_seq: 0,
            fragment_offset: 0,
            fragment_length: length,
        })
    }

    pub fn serialize_dtls(&self, out: &mut Vec<u8>) {
        write_u8(out, self.typ);
        write_u24(out, self.length);
        write_u16(out, self.message_seq);
        write_u24(out, self.fragment_offset);
        write_u24(out, self.fragment_length);
    }

    pub fn serialize_tls(&self, out: &mut Vec<u8>) {
        write_u8(out, self.typ);
        write_u24(out, self.length);
    }
}
