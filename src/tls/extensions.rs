//! Extension codec (`{Type:u16, Data:opaque<u16>}`), covering exactly the
//! extensions this handshake engine negotiates on: supported elliptic
//! curves and `extended_master_secret` (RFC 7627). Unrecognized extensions
//! round-trip as opaque data so a ClientHello/ServerHello carrying extras
//! this crate doesn't interpret still parses and re-serializes losslessly.

use bytes::Bytes;

use crate::codec::{write_u16, with_u16_length_prefix, Reader};
use crate::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    EllipticCurves,
    ExtendedMasterSecret,
    Unknown(u16),
}

impl ExtensionType {
    pub const ELLIPTIC_CURVES: u16 = 10;
    pub const EXTENDED_MASTER_SECRET: u16 = 23;

    pub fn to_u16(&self) -> u16 {
        match self {
            ExtensionType::EllipticCurves => Self::ELLIPTIC_CURVES,
            ExtensionType::ExtendedMasterSecret => Self::EXTENDED_MASTER_SECRET,
            ExtensionType::Unknown(v) => *v,
        }
    }

    pub fn from_u16(v: u16) -> Self {
        match v {
            Self::ELLIPTIC_CURVES => ExtensionType::EllipticCurves,
            Self::EXTENDED_MASTER_SECRET => ExtensionType::ExtendedMasterSecret,
            _ => ExtensionType::Unknown(v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extension {
    pub typ: ExtensionType,
    pub data: Bytes,
}

impl Extension {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let typ = ExtensionType::from_u16(reader.read_u16()?);
        let data = reader.read_opaque16()?;
        Ok(Self { typ, data })
    }

    pub fn serialize(&self, out: &mut Vec<u8>) {
        write_u16(out, self.typ.to_u16());
        with_u16_length_prefix(out, |inner| inner.extend_from_slice(&self.data));
    }

    pub fn elliptic_curves(groups: &[u16]) -> Self {
        let mut data = Vec::with_capacity(2 + groups.len() * 2);
        with_u16_length_prefix(&mut data, |inner| {
            for g in groups {
                write_u16(inner, *g);
            }
        });
        Self {
            typ: ExtensionType::EllipticCurves,
            data: Bytes::from(data),
        }
    }

    pub fn extended_master_secret() -> Self {
        Self {
            typ: ExtensionType::ExtendedMasterSecret,
            data: Bytes::new(),
        }
    }

    pub fn parse_elliptic_curves(&self) -> Result<Vec<u16>> {
        let mut reader = Reader::new(self.data.clone());
        let mut list_reader = reader.read_nested(reader.read_u16()? as usize)?;
        let mut groups = Vec::new();
        while !list_reader.is_empty() {
            groups.push(list_reader.read_u16()?);
        }
        Ok(groups)
    }
}

/// True if `extensions` contains `extended_master_secret` (RFC 7627),
/// toggling which label/seed the key schedule uses for the master secret.
pub fn has_extended_master_secret(extensions: &[Extension]) -> bool {
    extensions
        .iter()
        .any(|e| e.typ == ExtensionType::ExtendedMasterSecret)
}

pub fn find_elliptic_curves(extensions: &[Extension]) -> Result<Vec<u16>> {
    for e in extensions {
        if e.typ == ExtensionType::EllipticCurves {
            return e.parse_elliptic_curves();
        }
    }
    Ok(Vec::new())
}
