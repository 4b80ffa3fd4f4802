//! BGP path attributes (RFC 4271 Section 4.3)
//!
//! Attribute category (well-known vs optional, transitive vs not) is a
//! property of the *type*, not a free choice of the sender: RFC 4271
//! Section 5 fixes it per attribute. [`Value::from_bytes`] checks the flags
//! on the wire against the expected category for the decoded type and
//! rejects a mismatch with `UpdateMessageErrorSubcode::AttributeFlagsError`,
//! the same check a conformant BGP speaker runs before accepting an UPDATE.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{
    capability::{Afi, Safi},
    endec::Component,
    UpdateMessageErrorSubcode,
};
use crate::bgpls::NlriList;
use crate::Error;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::Deref,
};

/// BGP path attributes
#[derive(Clone, Debug, Default, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct PathAttributes(pub Vec<Value>);

impl Component for PathAttributes {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut attributes = Vec::new();
        while src.has_remaining() {
            attributes.push(Value::from_bytes(src)?);
        }
        Ok(Self(attributes))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        for attribute in self.0 {
            len += attribute.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(Value::encoded_len).sum()
    }
}

impl Deref for PathAttributes {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// BGP path attribute
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub flags: Flags,
    pub data: Data,
}

/// A wire-notifiable malformation of one path attribute
fn attribute_error(subcode: UpdateMessageErrorSubcode, data: Bytes) -> Error {
    Error::Notification(super::NotificationErrorCode::UpdateMessageError, subcode as u8, data)
}

/// The flag category a type is required to carry (RFC 4271 Section 5)
fn expected_category(type_: Type) -> Flags {
    match type_ {
        Type::Origin | Type::AsPath | Type::NextHop => Flags::WELL_KNOWN_COMPLETE,
        Type::LocalPref => Flags::WELL_KNOWN_COMPLETE,
        Type::AtomicAggregate => Flags::WELL_KNOWN_COMPLETE,
        Type::MultiExitDisc => Flags::OPTIONAL_NON_TRANSITIVE,
        Type::Aggregator => Flags::OPTIONAL_TRANSITIVE,
        Type::MpReachNlri | Type::MpUnreachNlri => Flags::OPTIONAL_NON_TRANSITIVE,
        Type::As4Path => Flags::OPTIONAL_TRANSITIVE,
        Type::LinkState => Flags::OPTIONAL_NON_TRANSITIVE,
    }
}

impl Component for Value {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() < 2 {
            return Err(Error::InternalLength("path attribute header", std::cmp::Ordering::Less));
        }
        let flags = Flags(src.get_u8());
        let type_ = src.get_u8();
        let len = if flags.is_extended_length() {
            if src.remaining() < 2 {
                return Err(Error::InternalLength("path attribute extended length", std::cmp::Ordering::Less));
            }
            src.get_u16() as usize
        } else {
            if src.is_empty() {
                return Err(Error::InternalLength("path attribute length", std::cmp::Ordering::Less));
            }
            src.get_u8() as usize
        };
        if src.remaining() < len {
            return Err(Error::InternalLength("path attribute value", std::cmp::Ordering::Less));
        }
        let mut attr_src = src.split_to(len);

        if let Some(known_type) = Type::from_u8(type_) {
            let expected = expected_category(known_type);
            if flags.is_optional() != expected.is_optional()
                || flags.is_transitive() != expected.is_transitive()
            {
                let mut data = BytesMut::with_capacity(2);
                data.put_u8(flags.0);
                data.put_u8(type_);
                return Err(attribute_error(
                    UpdateMessageErrorSubcode::AttributeFlagsError,
                    data.freeze(),
                ));
            }
        }

        let data = match Type::from_u8(type_) {
            Some(Type::Origin) => Data::Origin(Origin::from_bytes(&mut attr_src)?),
            Some(Type::AsPath) => Data::AsPath(AsPath::from_bytes(&mut attr_src)?),
            Some(Type::NextHop) => Data::NextHop(Ipv4Addr::from_bytes(&mut attr_src)?),
            Some(Type::MultiExitDisc) => {
                if attr_src.remaining() != 4 {
                    return Err(attribute_error(
                        UpdateMessageErrorSubcode::AttributeLengthError,
                        Bytes::new(),
                    ));
                }
                Data::MultiExitDisc(attr_src.get_u32())
            }
            Some(Type::LocalPref) => {
                if attr_src.remaining() != 4 {
                    return Err(attribute_error(
                        UpdateMessageErrorSubcode::AttributeLengthError,
                        Bytes::new(),
                    ));
                }
                Data::LocalPref(attr_src.get_u32())
            }
            Some(Type::AtomicAggregate) => Data::AtomicAggregate,
            Some(Type::Aggregator) => Data::Aggregator(Aggregator::from_bytes(&mut attr_src)?),
            Some(Type::MpReachNlri) => Data::MpReachNlri(MpReachNlri::from_bytes(&mut attr_src)?),
            Some(Type::MpUnreachNlri) => {
                Data::MpUnreachNlri(MpUnreachNlri::from_bytes(&mut attr_src)?)
            }
            Some(Type::As4Path) => Data::As4Path(AsPath::from_bytes(&mut attr_src)?),
            Some(Type::LinkState) => {
                Data::LinkState(crate::bgpls::attribute::LinkStateAttribute::from_bytes(&mut attr_src)?)
            }
            None => Data::Unsupported(type_, attr_src),
        };
        Ok(Self { flags, data })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u8(self.flags.0); // Flags
        len += 1;
        dst.put_u8(u8::from(&self.data)); // Type
        len += 1;
        let len_pos = dst.len();
        let two_byte_len = if self.flags.is_extended_length() {
            dst.put_u16(0); // Placeholder for the length
            len += 2;
            true
        } else {
            dst.put_u8(0); // Placeholder for the length
            len += 1;
            false
        };
        let data_len = match self.data {
            Data::Origin(origin) => origin.to_bytes(dst),
            Data::AsPath(as_path) | Data::As4Path(as_path) => as_path.to_bytes(dst),
            Data::NextHop(next_hop) => next_hop.to_bytes(dst),
            Data::MultiExitDisc(med) => med.to_bytes(dst),
            Data::LocalPref(local_pref) => local_pref.to_bytes(dst),
            Data::AtomicAggregate => 0,
            Data::Aggregator(agg) => agg.to_bytes(dst),
            Data::MpReachNlri(mp_reach_nlri) => mp_reach_nlri.to_bytes(dst),
            Data::MpUnreachNlri(mp_unreach_nlri) => mp_unreach_nlri.to_bytes(dst),
            Data::LinkState(link_state) => link_state.to_bytes(dst),
            Data::Unsupported(_, data) => {
                let len = data.len();
                dst.unsplit(data.into());
                len
            }
        };
        if two_byte_len {
            dst[len_pos..len_pos + 2].copy_from_slice(
                &(u16::try_from(data_len)
                    .expect("Path attribute length overflow")
                    .to_be_bytes()),
            );
        } else {
            dst[len_pos] = u8::try_from(data_len).expect("Path attribute length overflow");
        }
        len + data_len
    }

    fn encoded_len(&self) -> usize {
        1 + 1
            + if self.flags.is_extended_length() {
                2
            } else {
                1
            }
            + match &self.data {
                Data::Origin(origin) => origin.encoded_len(),
                Data::AsPath(as_path) | Data::As4Path(as_path) => as_path.encoded_len(),
                Data::NextHop(next_hop) => next_hop.encoded_len(),
                Data::MultiExitDisc(_) | Data::LocalPref(_) => 4,
                Data::AtomicAggregate => 0,
                Data::Aggregator(agg) => agg.encoded_len(),
                Data::MpReachNlri(mp_reach_nlri) => mp_reach_nlri.encoded_len(),
                Data::MpUnreachNlri(mp_unreach_nlri) => mp_unreach_nlri.encoded_len(),
                Data::LinkState(link_state) => link_state.encoded_len(),
                Data::Unsupported(_, data) => data.len(),
            }
    }
}

/// BGP path attribute flags
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    /// Transitive, well-known, complete
    pub const WELL_KNOWN_COMPLETE: Flags = Flags(0b0100_0000);
    /// Optional, transitive, complete
    pub const OPTIONAL_TRANSITIVE: Flags = Flags(0b1100_0000);
    /// Optional, non-transitive, complete
    pub const OPTIONAL_NON_TRANSITIVE: Flags = Flags(0b1000_0000);
    /// Optional, Extended Length, Non-transitive, Complete
    pub const OPTIONAL_TRANSITIVE_EXTENDED: Flags = Flags(0b1001_0000);

    /// Check if the attribute is optional
    pub const fn is_optional(self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Check if the attribute is transitive
    pub const fn is_transitive(self) -> bool {
        self.0 & 0x40 != 0
    }

    /// Check if the attribute is partial
    pub const fn is_partial(self) -> bool {
        self.0 & 0x20 != 0
    }

    /// Check if the attribute is extended length
    pub const fn is_extended_length(self) -> bool {
        self.0 & 0x10 != 0
    }
}

/// BGP path attribute data
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Data {
    Origin(Origin),
    AsPath(AsPath),
    /// BGP next hop (RFC 4271 Section 5.1.3)
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(Aggregator),
    MpReachNlri(MpReachNlri),     // RFC 4760
    MpUnreachNlri(MpUnreachNlri), // RFC 4760
    As4Path(AsPath),              // RFC 4893/6793
    /// BGP-LS attribute (RFC 7752 Section 3.3)
    LinkState(crate::bgpls::attribute::LinkStateAttribute),
    Unsupported(u8, Bytes),
}

// It does not make sense to implement Component for Data because its length is given by the Flags

#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum Type {
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,
    MpReachNlri = 14,
    MpUnreachNlri = 15,
    As4Path = 17,
    /// BGP-LS attribute (RFC 7752 Section 3.3)
    LinkState = 29,
}

impl From<&Data> for u8 {
    fn from(data: &Data) -> u8 {
        match data {
            Data::Origin(_) => Type::Origin as u8,
            Data::AsPath(_) => Type::AsPath as u8,
            Data::NextHop(_) => Type::NextHop as u8,
            Data::MultiExitDisc(_) => Type::MultiExitDisc as u8,
            Data::LocalPref(_) => Type::LocalPref as u8,
            Data::AtomicAggregate => Type::AtomicAggregate as u8,
            Data::Aggregator(_) => Type::Aggregator as u8,
            Data::MpReachNlri(_) => Type::MpReachNlri as u8,
            Data::MpUnreachNlri(_) => Type::MpUnreachNlri as u8,
            Data::As4Path(_) => Type::As4Path as u8,
            Data::LinkState(_) => Type::LinkState as u8,
            Data::Unsupported(type_, _) => *type_,
        }
    }
}

/// BGP origin
#[derive(Copy, Clone, Debug, PartialEq, Primitive)]
#[repr(u8)]
pub enum Origin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl Component for Origin {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() != 1 {
            return Err(attribute_error(
                UpdateMessageErrorSubcode::AttributeLengthError,
                Bytes::new(),
            ));
        }
        let value = src.get_u8();
        Self::from_u8(value).ok_or_else(|| {
            attribute_error(UpdateMessageErrorSubcode::InvalidOriginAttribute, Bytes::copy_from_slice(&[value]))
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u8(self as u8);
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        1
    }
}

/// BGP AS path
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AsPath(pub Vec<AsSegment>);

impl Component for AsPath {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut segments = Vec::new();
        while src.has_remaining() {
            segments.push(AsSegment::from_bytes(src)?);
        }
        Ok(Self(segments))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        for segment in self.0 {
            len += segment.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(AsSegment::encoded_len).sum()
    }
}

impl Deref for AsPath {
    type Target = Vec<AsSegment>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// BGP AS path segment (RFC 4271 Section 5.1.2, RFC 6793 Section 4)
#[derive(Clone, Debug, PartialEq)]
pub struct AsSegment {
    pub type_: AsSegmentType,
    pub asns: Vec<u32>,
    /// Extra member to indicate that this structure was created from a 4-byte AS path
    /// or that it should be encoded as a 4-byte AS path
    pub as4: bool,
}

/// BGP AS path segment type
///
/// RFC 5065's `AS_CONFED_SEQUENCE`/`AS_CONFED_SET` segment types are not
/// accepted here: this speaker does not run BGP confederations, and a
/// segment type outside this set is rejected with `MalformedAsPath` rather
/// than silently represented.
#[derive(Copy, Clone, Debug, PartialEq, Primitive)]
#[repr(u8)]
pub enum AsSegmentType {
    AsSet = 1,
    AsSequence = 2,
}

impl Component for AsSegment {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() < 2 {
            return Err(attribute_error(UpdateMessageErrorSubcode::MalformedAsPath, Bytes::new()));
        }
        let type_ = src.get_u8();
        let len = src.get_u8() as usize;
        if len == 0 {
            return Err(attribute_error(UpdateMessageErrorSubcode::MalformedAsPath, Bytes::new()));
        }
        let remaining_len = src.remaining();
        // RFC 6793 Section 4 updates the AS path segment length to 2 or 4 bytes (when both peers support 4-byte ASNs)
        let per_asn_len = remaining_len / len;
        let mut asns = Vec::with_capacity(len);
        let as4 = if per_asn_len == 2 {
            for _ in 0..len {
                asns.push(u32::from(src.get_u16()));
            }
            false
        } else if per_asn_len == 4 {
            for _ in 0..len {
                asns.push(src.get_u32());
            }
            true
        } else {
            return Err(attribute_error(UpdateMessageErrorSubcode::MalformedAsPath, Bytes::new()));
        };
        Ok(Self {
            type_: AsSegmentType::from_u8(type_)
                .ok_or_else(|| attribute_error(UpdateMessageErrorSubcode::MalformedAsPath, Bytes::new()))?,
            asns,
            as4,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let encoded_len = self.encoded_len();
        dst.put_u8(self.type_ as u8);
        let asns_len = self.asns.len();
        dst.put_u8(u8::try_from(asns_len).expect("AS segment length overflow"));
        for asn in self.asns {
            if self.as4 {
                dst.put_u32(asn);
            } else {
                dst.put_u16(u16::try_from(asn).expect("4-byte ASN in 2-byte AS path"));
            }
        }
        encoded_len
    }

    fn encoded_len(&self) -> usize {
        2 + self.asns.len() * if self.as4 { 4 } else { 2 }
    }
}

/// BGP aggregator (RFC 4271 Section 5.1.7)
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Aggregator {
    pub asn: u16,
    pub ip: Ipv4Addr,
}

impl Component for Aggregator {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() != 6 {
            return Err(attribute_error(
                UpdateMessageErrorSubcode::AttributeLengthError,
                Bytes::new(),
            ));
        }
        let asn = src.get_u16();
        let ip = Ipv4Addr::from_bytes(src)?;
        Ok(Self { asn, ip })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u16(self.asn);
        self.ip.to_bytes(dst) + 2 // 2 bytes for ASN
    }

    fn encoded_len(&self) -> usize {
        4 + 2
    }
}

/// BGP MP_REACH_NLRI (RFC 4760 Section 7), carrying a BGP-LS NLRI list
#[derive(Clone, Debug, PartialEq)]
pub struct MpReachNlri {
    pub afi: Afi,
    pub safi: Safi,
    pub next_hop: MpNextHop,
    pub nlri: NlriList,
}

impl Component for MpReachNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() < 4 {
            return Err(Error::InternalLength("MP_REACH_NLRI header", std::cmp::Ordering::Less));
        }
        let afi = src.get_u16();
        let afi = Afi::try_from(afi).map_err(|_| Error::InternalType("MP_REACH_NLRI AFI", afi))?;
        let safi = src.get_u8();
        let safi = Safi::try_from(u16::from(safi))
            .map_err(|_| Error::InternalType("MP_REACH_NLRI SAFI", u16::from(safi)))?;
        let nh_len = src.get_u8() as usize;
        if src.remaining() < nh_len + 1 {
            return Err(Error::InternalLength("MP_REACH_NLRI next hop", std::cmp::Ordering::Less));
        }
        let mut nh_src = src.split_to(nh_len);
        let next_hop = MpNextHop::from_bytes(&mut nh_src)?;
        let _ = src.get_u8(); // Reserved
        let nlri = NlriList::from_bytes(src)?;
        Ok(Self {
            afi,
            safi,
            next_hop,
            nlri,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u16(self.afi as u16);
        len += 2;
        dst.put_u8(u8::try_from(self.safi as u16).expect("MP_REACH_NLRI SAFI out of range"));
        len += 1;
        dst.put_u8(
            u8::try_from(self.next_hop.encoded_len())
                .expect("MP_REACH_NLRI next hop length overflow"),
        );
        len += 1;
        len += self.next_hop.to_bytes(dst);
        dst.put_u8(0); // Reserved
        len += 1;
        len += self.nlri.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        2 + 1 + 1 + self.next_hop.encoded_len() + 1 + self.nlri.encoded_len()
    }
}

/// Next hop for MP_REACH_NLRI
#[derive(Clone, Debug, PartialEq)]
pub enum MpNextHop {
    Single(IpAddr),
    V6AndLL(Ipv6Addr, Ipv6Addr),
    /// Zero-length next hop: legal for some SAFIs (e.g. RTC, BGP-LS over an
    /// already-converged IGP adjacency) where the NLRI itself is the only
    /// reachability information needed.
    Empty,
}

impl Component for MpNextHop {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        match src.remaining() {
            0 => Ok(MpNextHop::Empty),
            4 | 16 => Ok(MpNextHop::Single(IpAddr::from_bytes(src)?)),
            32 => {
                let v6local = Ipv6Addr::from_bytes(src)?;
                let v6ll = Ipv6Addr::from_bytes(src)?;
                Ok(MpNextHop::V6AndLL(v6local, v6ll))
            }
            _ => Err(Error::InternalLength("MP_NEXT_HOP", std::cmp::Ordering::Equal)),
        }
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        match self {
            MpNextHop::Single(ip) => {
                ip.to_bytes(dst);
            }
            MpNextHop::V6AndLL(v6local, v6ll) => {
                v6local.to_bytes(dst);
                v6ll.to_bytes(dst);
            }
            MpNextHop::Empty => {}
        };
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        match self {
            MpNextHop::Single(IpAddr::V4(_)) => 4,
            MpNextHop::Single(IpAddr::V6(_)) => 16,
            MpNextHop::V6AndLL(_, _) => 32,
            MpNextHop::Empty => 0,
        }
    }
}

impl From<IpAddr> for MpNextHop {
    fn from(ip: IpAddr) -> Self {
        MpNextHop::Single(ip)
    }
}

/// BGP MP_UNREACH_NLRI (RFC 4760 Section 7), carrying a BGP-LS NLRI list
#[derive(Clone, Debug, PartialEq)]
pub struct MpUnreachNlri {
    pub afi: Afi,
    pub safi: Safi,
    pub withdrawn_routes: NlriList,
}

impl Component for MpUnreachNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() < 3 {
            return Err(Error::InternalLength("MP_UNREACH_NLRI header", std::cmp::Ordering::Less));
        }
        let afi = src.get_u16();
        let afi = Afi::try_from(afi).map_err(|_| Error::InternalType("MP_UNREACH_NLRI AFI", afi))?;
        let safi = src.get_u8();
        let safi = Safi::try_from(u16::from(safi))
            .map_err(|_| Error::InternalType("MP_UNREACH_NLRI SAFI", u16::from(safi)))?;
        let withdrawn_routes = NlriList::from_bytes(src)?;
        Ok(Self {
            afi,
            safi,
            withdrawn_routes,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u16(self.afi as u16);
        len += 2;
        dst.put_u8(u8::try_from(self.safi as u16).expect("MP_UNREACH_NLRI SAFI out of range"));
        len += 1;
        len += self.withdrawn_routes.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        3 + self.withdrawn_routes.encoded_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_to_bytes;

    #[test]
    fn test_origin() {
        let mut src = hex_to_bytes("40 01 01 00");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::Origin(Origin::Igp),
            }
        );
    }

    #[test]
    fn test_as2_aspath() {
        let mut src = hex_to_bytes("40 0204 0201 fd7d");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::AsPath(AsPath(vec![AsSegment {
                    type_: AsSegmentType::AsSequence,
                    asns: vec![0xfd7d],
                    as4: false
                }])),
            }
        );
    }

    #[test]
    fn test_as4_aspath() {
        let mut src = hex_to_bytes("40 02 0e 0203 fcde39d1 fcde3880 fcde3122");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::AsPath(AsPath(vec![AsSegment {
                    type_: AsSegmentType::AsSequence,
                    asns: vec![0xfcde39d1, 0xfcde3880, 0xfcde3122],
                    as4: true
                }])),
            }
        );
    }

    #[test]
    fn test_next_hop() {
        let mut src = hex_to_bytes("40 03 04 7f000001");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::NextHop(Ipv4Addr::new(127, 0, 0, 1)),
            }
        );
    }

    #[test]
    fn test_as4path() {
        let mut src = hex_to_bytes("c0 11 06 0201 0000fd7d");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0xc0),
                data: Data::As4Path(AsPath(vec![AsSegment {
                    type_: AsSegmentType::AsSequence,
                    asns: vec![0xfd7d],
                    as4: true
                }])),
            }
        );
    }

    #[test]
    fn test_bad_flags_rejected() {
        // ORIGIN (well-known, 0x40) sent as optional (0x80) is malformed
        let mut src = hex_to_bytes("80 01 01 00");
        let err = Value::from_bytes(&mut src).unwrap_err();
        assert!(matches!(
            err,
            Error::Notification(crate::NotificationErrorCode::UpdateMessageError, subcode, _)
                if subcode == UpdateMessageErrorSubcode::AttributeFlagsError as u8
        ));
    }

    #[test]
    fn test_confederation_segment_type_rejected() {
        // AS_CONFED_SEQUENCE (type 3) is not a recognized segment type here
        let mut src = hex_to_bytes("40 02 04 0301 fd7d");
        let err = Value::from_bytes(&mut src).unwrap_err();
        assert!(matches!(
            err,
            Error::Notification(_, subcode, _) if subcode == UpdateMessageErrorSubcode::MalformedAsPath as u8
        ));
    }

    #[test]
    fn test_empty_next_hop_in_mp_reach() {
        let mut src = hex_to_bytes("90 0e 000b 4004 47 00 00 0009 0002 abcd");
        let pa = Value::from_bytes(&mut src).unwrap();
        let Data::MpReachNlri(mp_reach) = pa.data else {
            panic!("expected MpReachNlri");
        };
        assert_eq!(mp_reach.next_hop, MpNextHop::Empty);
        assert_eq!(mp_reach.nlri.0.len(), 1);
    }
}
