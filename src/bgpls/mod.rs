//! BGP Link-State (BGP-LS) NLRI tree (RFC 7752)
//!
//! This module carries the address family this speaker exists to move:
//! `AFI=16388/SAFI=71` NLRI describing IGP topology (nodes, links, prefixes)
//! as TLV trees instead of classic IP prefixes. [`Nlri`] is what travels in
//! `MP_REACH_NLRI`/`MP_UNREACH_NLRI` ([`crate::path::MpReachNlri`],
//! [`crate::path::MpUnreachNlri`]); [`attribute::LinkStateAttribute`] is the
//! path attribute (type 29) that rides alongside it in an UPDATE carrying
//! reachable NLRI.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod attribute;
pub mod descriptor;

use crate::endec::Component;
use crate::Error;
use bytes::{Buf, BufMut, Bytes};
use descriptor::{
    read_descriptors_tlv, write_descriptors_tlv, LinkDescriptors, NodeDescriptors,
    PrefixDescriptors,
};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::ops::Deref;

const TLV_LOCAL_NODE_DESCRIPTORS: u16 = 256;
const TLV_REMOTE_NODE_DESCRIPTORS: u16 = 257;

/// The IGP or protocol that originated a BGP-LS NLRI (RFC 7752 Section 3.2.1.1)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum ProtocolId {
    IsIsLevel1 = 1,
    IsIsLevel2 = 2,
    Ospfv2 = 3,
    Direct = 4,
    Static = 5,
    Ospfv3 = 6,
    Bgp = 7,
}

/// BGP-LS NLRI type (RFC 7752 Section 3.2)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u16)]
pub enum NlriType {
    Node = 1,
    Link = 2,
    Ipv4Prefix = 3,
    Ipv6Prefix = 4,
}

/// A single BGP-LS NLRI: a node, a link, or an IPv4/IPv6 topology prefix
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Nlri {
    Node(NodeNlri),
    Link(LinkNlri),
    Ipv4Prefix(PrefixNlri),
    Ipv6Prefix(PrefixNlri),
    /// An NLRI type this speaker does not recognize, preserved opaquely
    Unsupported(u16, Bytes),
}

impl Component for Nlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() < 4 {
            return Err(Error::InternalLength("BGP-LS NLRI header", std::cmp::Ordering::Less));
        }
        let type_ = src.get_u16();
        let len = src.get_u16() as usize;
        if src.remaining() < len {
            return Err(Error::InternalLength("BGP-LS NLRI body", std::cmp::Ordering::Less));
        }
        let mut body = src.split_to(len);
        Ok(match NlriType::from_u16(type_) {
            Some(NlriType::Node) => Self::Node(NodeNlri::from_bytes(&mut body)?),
            Some(NlriType::Link) => Self::Link(LinkNlri::from_bytes(&mut body)?),
            Some(NlriType::Ipv4Prefix) => Self::Ipv4Prefix(PrefixNlri::from_bytes(&mut body)?),
            Some(NlriType::Ipv6Prefix) => Self::Ipv6Prefix(PrefixNlri::from_bytes(&mut body)?),
            None => Self::Unsupported(type_, body),
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let type_ = match &self {
            Self::Node(_) => NlriType::Node as u16,
            Self::Link(_) => NlriType::Link as u16,
            Self::Ipv4Prefix(_) => NlriType::Ipv4Prefix as u16,
            Self::Ipv6Prefix(_) => NlriType::Ipv6Prefix as u16,
            Self::Unsupported(t, _) => *t,
        };
        dst.put_u16(type_);
        let len_pos = dst.len();
        dst.put_u16(0); // Placeholder
        let body_len = match self {
            Self::Node(node) => node.to_bytes(dst),
            Self::Link(link) => link.to_bytes(dst),
            Self::Ipv4Prefix(prefix) | Self::Ipv6Prefix(prefix) => prefix.to_bytes(dst),
            Self::Unsupported(_, body) => {
                let len = body.len();
                dst.put_slice(&body);
                len
            }
        };
        dst[len_pos..len_pos + 2]
            .copy_from_slice(&(u16::try_from(body_len).expect("BGP-LS NLRI length overflow").to_be_bytes()));
        4 + body_len
    }

    fn encoded_len(&self) -> usize {
        4 + match self {
            Self::Node(node) => node.encoded_len(),
            Self::Link(link) => link.encoded_len(),
            Self::Ipv4Prefix(prefix) | Self::Ipv6Prefix(prefix) => prefix.encoded_len(),
            Self::Unsupported(_, body) => body.len(),
        }
    }
}

/// A list of [`Nlri`], as carried directly (without an outer length field) in
/// `MP_REACH_NLRI`/`MP_UNREACH_NLRI` when AFI/SAFI is BGP-LS.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NlriList(pub Vec<Nlri>);

impl Component for NlriList {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut nlris = Vec::new();
        while src.has_remaining() {
            nlris.push(Nlri::from_bytes(src)?);
        }
        Ok(Self(nlris))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        self.0.into_iter().map(|nlri| nlri.to_bytes(dst)).sum()
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(Nlri::encoded_len).sum()
    }
}

impl Deref for NlriList {
    type Target = Vec<Nlri>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Node NLRI (RFC 7752 Section 3.2): identifies one IGP/BGP node
#[derive(Clone, Debug, PartialEq)]
pub struct NodeNlri {
    pub protocol_id: ProtocolId,
    /// Opaque 64-bit value distinguishing topology instances from the same protocol
    pub identifier: u64,
    pub local_node: NodeDescriptors,
}

fn read_protocol_and_identifier(src: &mut Bytes, label: &'static str) -> Result<(ProtocolId, u64), Error> {
    if src.remaining() < 9 {
        return Err(Error::InternalLength(label, std::cmp::Ordering::Less));
    }
    let raw_protocol_id = src.get_u8();
    let protocol_id = ProtocolId::from_u8(raw_protocol_id)
        .ok_or(Error::InternalType(label, u16::from(raw_protocol_id)))?;
    let identifier = src.get_u64();
    Ok((protocol_id, identifier))
}

impl Component for NodeNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let (protocol_id, identifier) = read_protocol_and_identifier(src, "Node NLRI")?;
        let local_node = read_descriptors_tlv(src, TLV_LOCAL_NODE_DESCRIPTORS)?;
        Ok(Self { protocol_id, identifier, local_node })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u8(self.protocol_id as u8);
        dst.put_u64(self.identifier);
        9 + write_descriptors_tlv(dst, TLV_LOCAL_NODE_DESCRIPTORS, self.local_node)
    }

    fn encoded_len(&self) -> usize {
        9 + 4 + self.local_node.encoded_len()
    }
}

/// Link NLRI (RFC 7752 Section 3.2): identifies one directional link between two nodes
#[derive(Clone, Debug, PartialEq)]
pub struct LinkNlri {
    pub protocol_id: ProtocolId,
    pub identifier: u64,
    pub local_node: NodeDescriptors,
    pub remote_node: NodeDescriptors,
    pub link_descriptors: LinkDescriptors,
}

impl Component for LinkNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let (protocol_id, identifier) = read_protocol_and_identifier(src, "Link NLRI")?;
        let local_node = read_descriptors_tlv(src, TLV_LOCAL_NODE_DESCRIPTORS)?;
        let remote_node = read_descriptors_tlv(src, TLV_REMOTE_NODE_DESCRIPTORS)?;
        let link_descriptors = LinkDescriptors::from_bytes(src)?;
        Ok(Self { protocol_id, identifier, local_node, remote_node, link_descriptors })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u8(self.protocol_id as u8);
        dst.put_u64(self.identifier);
        let mut len = 9;
        len += write_descriptors_tlv(dst, TLV_LOCAL_NODE_DESCRIPTORS, self.local_node);
        len += write_descriptors_tlv(dst, TLV_REMOTE_NODE_DESCRIPTORS, self.remote_node);
        len += self.link_descriptors.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        9 + 4
            + self.local_node.encoded_len()
            + 4
            + self.remote_node.encoded_len()
            + self.link_descriptors.encoded_len()
    }
}

/// IPv4/IPv6 Topology Prefix NLRI (RFC 7752 Section 3.2): identifies one advertised prefix
#[derive(Clone, Debug, PartialEq)]
pub struct PrefixNlri {
    pub protocol_id: ProtocolId,
    pub identifier: u64,
    pub local_node: NodeDescriptors,
    pub prefix_descriptors: PrefixDescriptors,
}

impl Component for PrefixNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let (protocol_id, identifier) = read_protocol_and_identifier(src, "Prefix NLRI")?;
        let local_node = read_descriptors_tlv(src, TLV_LOCAL_NODE_DESCRIPTORS)?;
        let prefix_descriptors = PrefixDescriptors::from_bytes(src)?;
        Ok(Self { protocol_id, identifier, local_node, prefix_descriptors })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u8(self.protocol_id as u8);
        dst.put_u64(self.identifier);
        let mut len = 9;
        len += write_descriptors_tlv(dst, TLV_LOCAL_NODE_DESCRIPTORS, self.local_node);
        len += self.prefix_descriptors.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        9 + 4 + self.local_node.encoded_len() + self.prefix_descriptors.encoded_len()
    }
}
