//! The BGP-LS path attribute (RFC 7752 Section 3.3): type 29 in the UPDATE's
//! path attribute list, carrying TLVs that describe the node/link/prefix
//! named by the accompanying NLRI.
//!
//! Which subset of TLVs is meaningful depends on whether the NLRI is a node,
//! link, or prefix, but the attribute's own encoding does not distinguish
//! them -- it is one flat TLV list, same as [`crate::bgpls::descriptor`]'s
//! node descriptors. We decode every TLV we recognize and keep the rest as
//! [`LinkStateTlv::Unsupported`] so a relaying speaker never silently drops
//! information a peer attached.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::endec::Component;
use crate::Error;
use bytes::{Buf, BufMut, Bytes};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::Deref;

/// One TLV inside a [`LinkStateAttribute`]
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum LinkStateTlv {
    /// Node Flag Bits (TLV 1024)
    NodeFlagBits(u8),
    /// Opaque Node Attribute (TLV 1025)
    OpaqueNodeAttribute(Bytes),
    /// Node Name (TLV 1026)
    NodeName(Bytes),
    /// IS-IS Area Identifier (TLV 1027)
    IsisAreaIdentifier(Bytes),
    /// IPv4 Router-ID of Local Node (TLV 1028)
    Ipv4RouterIdOfLocalNode(Ipv4Addr),
    /// IPv6 Router-ID of Local Node (TLV 1029)
    Ipv6RouterIdOfLocalNode(Ipv6Addr),
    /// IPv4 Router-ID of Remote Node (TLV 1030)
    Ipv4RouterIdOfRemoteNode(Ipv4Addr),
    /// IPv6 Router-ID of Remote Node (TLV 1031)
    Ipv6RouterIdOfRemoteNode(Ipv6Addr),
    /// Administrative Group / Color (TLV 1088)
    AdminGroup(u32),
    /// Maximum Link Bandwidth (TLV 1089), IEEE 754 bytes/second
    MaxLinkBandwidth(u32),
    /// Maximum Reservable Link Bandwidth (TLV 1090), IEEE 754 bytes/second
    MaxReservableBandwidth(u32),
    /// Unreserved Bandwidth (TLV 1091): one IEEE 754 bytes/second value per priority 0..7
    UnreservedBandwidth([u32; 8]),
    /// TE Default Metric (TLV 1092)
    TeDefaultMetric(u32),
    /// Link Protection Type (TLV 1093): protection capability bitmask + reserved octet
    LinkProtectionType(u8),
    /// MPLS Protocol Mask (TLV 1094): LDP/RSVP-TE capability bits
    MplsProtocolMask(u8),
    /// IGP Metric (TLV 1095): 1 to 3 octets depending on the originating IGP
    IgpMetric(Bytes),
    /// Shared Risk Link Group (TLV 1096)
    SharedRiskLinkGroup(Vec<u32>),
    /// Opaque Link Attribute (TLV 1097)
    OpaqueLinkAttribute(Bytes),
    /// Link Name (TLV 1098)
    LinkName(Bytes),
    /// Peer Node SID (TLV 1101, RFC 9086): flags, weight, and a 3- or 4-octet SID/label/index
    PeerNodeSid { flags: u8, weight: u8, sid: Bytes },
    /// Peer Adjacency SID (TLV 1102, RFC 9086)
    PeerAdjSid { flags: u8, weight: u8, sid: Bytes },
    /// Peer Set SID (TLV 1103, RFC 9086)
    PeerSetSid { flags: u8, weight: u8, sid: Bytes },
    /// IGP Flags (TLV 1152)
    IgpFlags(u8),
    /// IGP Route Tag (TLV 1153)
    IgpRouteTag(u32),
    /// IGP Extended Route Tag (TLV 1154)
    IgpExtendedRouteTag(u64),
    /// Prefix Metric (TLV 1155)
    PrefixMetric(u32),
    /// OSPF Forwarding Address (TLV 1156)
    OspfForwardingAddress(IpAddr),
    /// Opaque Prefix Attribute (TLV 1157)
    OpaquePrefixAttribute(Bytes),
    /// Any TLV this speaker does not assign semantics to, preserved verbatim
    Unsupported(u16, Bytes),
}

impl LinkStateTlv {
    const TYPE_NODE_FLAG_BITS: u16 = 1024;
    const TYPE_OPAQUE_NODE_ATTRIBUTE: u16 = 1025;
    const TYPE_NODE_NAME: u16 = 1026;
    const TYPE_ISIS_AREA_IDENTIFIER: u16 = 1027;
    const TYPE_IPV4_ROUTER_ID_LOCAL: u16 = 1028;
    const TYPE_IPV6_ROUTER_ID_LOCAL: u16 = 1029;
    const TYPE_IPV4_ROUTER_ID_REMOTE: u16 = 1030;
    const TYPE_IPV6_ROUTER_ID_REMOTE: u16 = 1031;
    const TYPE_ADMIN_GROUP: u16 = 1088;
    const TYPE_MAX_LINK_BANDWIDTH: u16 = 1089;
    const TYPE_MAX_RESERVABLE_BANDWIDTH: u16 = 1090;
    const TYPE_UNRESERVED_BANDWIDTH: u16 = 1091;
    const TYPE_TE_DEFAULT_METRIC: u16 = 1092;
    const TYPE_LINK_PROTECTION_TYPE: u16 = 1093;
    const TYPE_MPLS_PROTOCOL_MASK: u16 = 1094;
    const TYPE_IGP_METRIC: u16 = 1095;
    const TYPE_SHARED_RISK_LINK_GROUP: u16 = 1096;
    const TYPE_OPAQUE_LINK_ATTRIBUTE: u16 = 1097;
    const TYPE_LINK_NAME: u16 = 1098;
    const TYPE_PEER_NODE_SID: u16 = 1101;
    const TYPE_PEER_ADJ_SID: u16 = 1102;
    const TYPE_PEER_SET_SID: u16 = 1103;
    const TYPE_IGP_FLAGS: u16 = 1152;
    const TYPE_IGP_ROUTE_TAG: u16 = 1153;
    const TYPE_IGP_EXTENDED_ROUTE_TAG: u16 = 1154;
    const TYPE_PREFIX_METRIC: u16 = 1155;
    const TYPE_OSPF_FORWARDING_ADDRESS: u16 = 1156;
    const TYPE_OPAQUE_PREFIX_ATTRIBUTE: u16 = 1157;

    fn type_(&self) -> u16 {
        match self {
            Self::NodeFlagBits(_) => Self::TYPE_NODE_FLAG_BITS,
            Self::OpaqueNodeAttribute(_) => Self::TYPE_OPAQUE_NODE_ATTRIBUTE,
            Self::NodeName(_) => Self::TYPE_NODE_NAME,
            Self::IsisAreaIdentifier(_) => Self::TYPE_ISIS_AREA_IDENTIFIER,
            Self::Ipv4RouterIdOfLocalNode(_) => Self::TYPE_IPV4_ROUTER_ID_LOCAL,
            Self::Ipv6RouterIdOfLocalNode(_) => Self::TYPE_IPV6_ROUTER_ID_LOCAL,
            Self::Ipv4RouterIdOfRemoteNode(_) => Self::TYPE_IPV4_ROUTER_ID_REMOTE,
            Self::Ipv6RouterIdOfRemoteNode(_) => Self::TYPE_IPV6_ROUTER_ID_REMOTE,
            Self::AdminGroup(_) => Self::TYPE_ADMIN_GROUP,
            Self::MaxLinkBandwidth(_) => Self::TYPE_MAX_LINK_BANDWIDTH,
            Self::MaxReservableBandwidth(_) => Self::TYPE_MAX_RESERVABLE_BANDWIDTH,
            Self::UnreservedBandwidth(_) => Self::TYPE_UNRESERVED_BANDWIDTH,
            Self::TeDefaultMetric(_) => Self::TYPE_TE_DEFAULT_METRIC,
            Self::LinkProtectionType(_) => Self::TYPE_LINK_PROTECTION_TYPE,
            Self::MplsProtocolMask(_) => Self::TYPE_MPLS_PROTOCOL_MASK,
            Self::IgpMetric(_) => Self::TYPE_IGP_METRIC,
            Self::SharedRiskLinkGroup(_) => Self::TYPE_SHARED_RISK_LINK_GROUP,
            Self::OpaqueLinkAttribute(_) => Self::TYPE_OPAQUE_LINK_ATTRIBUTE,
            Self::LinkName(_) => Self::TYPE_LINK_NAME,
            Self::PeerNodeSid { .. } => Self::TYPE_PEER_NODE_SID,
            Self::PeerAdjSid { .. } => Self::TYPE_PEER_ADJ_SID,
            Self::PeerSetSid { .. } => Self::TYPE_PEER_SET_SID,
            Self::IgpFlags(_) => Self::TYPE_IGP_FLAGS,
            Self::IgpRouteTag(_) => Self::TYPE_IGP_ROUTE_TAG,
            Self::IgpExtendedRouteTag(_) => Self::TYPE_IGP_EXTENDED_ROUTE_TAG,
            Self::PrefixMetric(_) => Self::TYPE_PREFIX_METRIC,
            Self::OspfForwardingAddress(_) => Self::TYPE_OSPF_FORWARDING_ADDRESS,
            Self::OpaquePrefixAttribute(_) => Self::TYPE_OPAQUE_PREFIX_ATTRIBUTE,
            Self::Unsupported(t, _) => *t,
        }
    }
}

/// Read the fixed `{flags(1), weight(1), reserved(2), sid}` shape shared by
/// the Peer-Node/Peer-Adj/Peer-Set SID TLVs (RFC 9086 Sections 4-6).
fn read_peer_sid(mut value: Bytes) -> Result<(u8, u8, Bytes), Error> {
    if value.remaining() < 4 {
        return Err(Error::InternalLength("peer SID TLV", std::cmp::Ordering::Less));
    }
    let flags = value.get_u8();
    let weight = value.get_u8();
    value.advance(2); // Reserved
    Ok((flags, weight, value))
}

fn write_peer_sid(dst: &mut bytes::BytesMut, flags: u8, weight: u8, sid: &Bytes) -> usize {
    dst.put_u8(flags);
    dst.put_u8(weight);
    dst.put_u16(0); // Reserved
    dst.put_slice(sid);
    4 + sid.len()
}

impl Component for LinkStateTlv {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        if src.remaining() < 4 {
            return Err(Error::InternalLength("BGP-LS attribute TLV header", std::cmp::Ordering::Less));
        }
        let type_ = src.get_u16();
        let len = src.get_u16() as usize;
        if src.remaining() < len {
            return Err(Error::InternalLength("BGP-LS attribute TLV value", std::cmp::Ordering::Less));
        }
        let mut value = src.split_to(len);
        Ok(match type_ {
            Self::TYPE_NODE_FLAG_BITS if value.remaining() == 1 => Self::NodeFlagBits(value.get_u8()),
            Self::TYPE_OPAQUE_NODE_ATTRIBUTE => Self::OpaqueNodeAttribute(value),
            Self::TYPE_NODE_NAME => Self::NodeName(value),
            Self::TYPE_ISIS_AREA_IDENTIFIER => Self::IsisAreaIdentifier(value),
            Self::TYPE_IPV4_ROUTER_ID_LOCAL if value.remaining() == 4 => {
                Self::Ipv4RouterIdOfLocalNode(Ipv4Addr::from_bytes(&mut value)?)
            }
            Self::TYPE_IPV6_ROUTER_ID_LOCAL if value.remaining() == 16 => {
                Self::Ipv6RouterIdOfLocalNode(Ipv6Addr::from_bytes(&mut value)?)
            }
            Self::TYPE_IPV4_ROUTER_ID_REMOTE if value.remaining() == 4 => {
                Self::Ipv4RouterIdOfRemoteNode(Ipv4Addr::from_bytes(&mut value)?)
            }
            Self::TYPE_IPV6_ROUTER_ID_REMOTE if value.remaining() == 16 => {
                Self::Ipv6RouterIdOfRemoteNode(Ipv6Addr::from_bytes(&mut value)?)
            }
            Self::TYPE_ADMIN_GROUP if value.remaining() == 4 => Self::AdminGroup(value.get_u32()),
            Self::TYPE_MAX_LINK_BANDWIDTH if value.remaining() == 4 => {
                Self::MaxLinkBandwidth(value.get_u32())
            }
            Self::TYPE_MAX_RESERVABLE_BANDWIDTH if value.remaining() == 4 => {
                Self::MaxReservableBandwidth(value.get_u32())
            }
            Self::TYPE_UNRESERVED_BANDWIDTH if value.remaining() == 32 => {
                let mut bw = [0u32; 8];
                for slot in &mut bw {
                    *slot = value.get_u32();
                }
                Self::UnreservedBandwidth(bw)
            }
            Self::TYPE_TE_DEFAULT_METRIC if value.remaining() == 4 => {
                Self::TeDefaultMetric(value.get_u32())
            }
            Self::TYPE_LINK_PROTECTION_TYPE if value.remaining() == 2 => {
                Self::LinkProtectionType(value.get_u8())
            }
            Self::TYPE_MPLS_PROTOCOL_MASK if value.remaining() == 1 => {
                Self::MplsProtocolMask(value.get_u8())
            }
            Self::TYPE_IGP_METRIC if (1..=3).contains(&value.remaining()) => Self::IgpMetric(value),
            Self::TYPE_SHARED_RISK_LINK_GROUP if value.remaining() % 4 == 0 => {
                let mut groups = Vec::with_capacity(value.remaining() / 4);
                while value.has_remaining() {
                    groups.push(value.get_u32());
                }
                Self::SharedRiskLinkGroup(groups)
            }
            Self::TYPE_OPAQUE_LINK_ATTRIBUTE => Self::OpaqueLinkAttribute(value),
            Self::TYPE_LINK_NAME => Self::LinkName(value),
            Self::TYPE_PEER_NODE_SID => {
                let (flags, weight, sid) = read_peer_sid(value)?;
                Self::PeerNodeSid { flags, weight, sid }
            }
            Self::TYPE_PEER_ADJ_SID => {
                let (flags, weight, sid) = read_peer_sid(value)?;
                Self::PeerAdjSid { flags, weight, sid }
            }
            Self::TYPE_PEER_SET_SID => {
                let (flags, weight, sid) = read_peer_sid(value)?;
                Self::PeerSetSid { flags, weight, sid }
            }
            Self::TYPE_IGP_FLAGS if value.remaining() == 1 => Self::IgpFlags(value.get_u8()),
            Self::TYPE_IGP_ROUTE_TAG if value.remaining() == 4 => Self::IgpRouteTag(value.get_u32()),
            Self::TYPE_IGP_EXTENDED_ROUTE_TAG if value.remaining() == 8 => {
                Self::IgpExtendedRouteTag(value.get_u64())
            }
            Self::TYPE_PREFIX_METRIC if value.remaining() == 4 => Self::PrefixMetric(value.get_u32()),
            Self::TYPE_OSPF_FORWARDING_ADDRESS if value.remaining() == 4 || value.remaining() == 16 => {
                Self::OspfForwardingAddress(IpAddr::from_bytes(&mut value)?)
            }
            Self::TYPE_OPAQUE_PREFIX_ATTRIBUTE => Self::OpaquePrefixAttribute(value),
            _ => Self::Unsupported(type_, value),
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let type_ = self.type_();
        dst.put_u16(type_);
        let len_pos = dst.len();
        dst.put_u16(0); // Placeholder
        let value_len = match self {
            Self::NodeFlagBits(flags) | Self::MplsProtocolMask(flags) | Self::IgpFlags(flags) => {
                dst.put_u8(flags);
                1
            }
            Self::LinkProtectionType(cap) => {
                dst.put_u8(cap);
                dst.put_u8(0); // Reserved
                2
            }
            Self::AdminGroup(v)
            | Self::MaxLinkBandwidth(v)
            | Self::MaxReservableBandwidth(v)
            | Self::TeDefaultMetric(v)
            | Self::IgpRouteTag(v)
            | Self::PrefixMetric(v) => {
                dst.put_u32(v);
                4
            }
            Self::IgpExtendedRouteTag(v) => {
                dst.put_u64(v);
                8
            }
            Self::Ipv4RouterIdOfLocalNode(ip) | Self::Ipv4RouterIdOfRemoteNode(ip) => ip.to_bytes(dst),
            Self::Ipv6RouterIdOfLocalNode(ip) | Self::Ipv6RouterIdOfRemoteNode(ip) => ip.to_bytes(dst),
            Self::OspfForwardingAddress(ip) => ip.to_bytes(dst),
            Self::UnreservedBandwidth(priorities) => {
                for bw in priorities {
                    dst.put_u32(bw);
                }
                32
            }
            Self::SharedRiskLinkGroup(groups) => {
                for group in &groups {
                    dst.put_u32(*group);
                }
                groups.len() * 4
            }
            Self::PeerNodeSid { flags, weight, sid }
            | Self::PeerAdjSid { flags, weight, sid }
            | Self::PeerSetSid { flags, weight, sid } => write_peer_sid(dst, flags, weight, &sid),
            Self::NodeName(data)
            | Self::OpaqueNodeAttribute(data)
            | Self::IsisAreaIdentifier(data)
            | Self::IgpMetric(data)
            | Self::OpaqueLinkAttribute(data)
            | Self::LinkName(data)
            | Self::OpaquePrefixAttribute(data)
            | Self::Unsupported(_, data) => {
                let len = data.len();
                dst.put_slice(&data);
                len
            }
        };
        dst[len_pos..len_pos + 2].copy_from_slice(
            &(u16::try_from(value_len).expect("BGP-LS attribute TLV length overflow").to_be_bytes()),
        );
        4 + value_len
    }

    fn encoded_len(&self) -> usize {
        4 + match self {
            Self::NodeFlagBits(_)
            | Self::MplsProtocolMask(_)
            | Self::IgpFlags(_) => 1,
            Self::LinkProtectionType(_) => 2,
            Self::AdminGroup(_)
            | Self::MaxLinkBandwidth(_)
            | Self::MaxReservableBandwidth(_)
            | Self::TeDefaultMetric(_)
            | Self::IgpRouteTag(_)
            | Self::PrefixMetric(_) => 4,
            Self::IgpExtendedRouteTag(_) => 8,
            Self::Ipv4RouterIdOfLocalNode(_) | Self::Ipv4RouterIdOfRemoteNode(_) => 4,
            Self::Ipv6RouterIdOfLocalNode(_) | Self::Ipv6RouterIdOfRemoteNode(_) => 16,
            Self::OspfForwardingAddress(ip) => ip.encoded_len(),
            Self::UnreservedBandwidth(_) => 32,
            Self::SharedRiskLinkGroup(groups) => groups.len() * 4,
            Self::PeerNodeSid { sid, .. } | Self::PeerAdjSid { sid, .. } | Self::PeerSetSid { sid, .. } => {
                4 + sid.len()
            }
            Self::NodeName(data)
            | Self::OpaqueNodeAttribute(data)
            | Self::IsisAreaIdentifier(data)
            | Self::IgpMetric(data)
            | Self::OpaqueLinkAttribute(data)
            | Self::LinkName(data)
            | Self::OpaquePrefixAttribute(data)
            | Self::Unsupported(_, data) => data.len(),
        }
    }
}

/// The BGP-LS path attribute body: a flat list of [`LinkStateTlv`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkStateAttribute(pub Vec<LinkStateTlv>);

impl Component for LinkStateAttribute {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut tlvs = Vec::new();
        while src.has_remaining() {
            tlvs.push(LinkStateTlv::from_bytes(src)?);
        }
        Ok(Self(tlvs))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        self.0.into_iter().map(|tlv| tlv.to_bytes(dst)).sum()
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(LinkStateTlv::encoded_len).sum()
    }
}

impl Deref for LinkStateAttribute {
    type Target = Vec<LinkStateTlv>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl LinkStateAttribute {
    /// The IGP Metric TLV value, if present
    #[must_use]
    pub fn igp_metric(&self) -> Option<&Bytes> {
        self.0.iter().find_map(|tlv| match tlv {
            LinkStateTlv::IgpMetric(metric) => Some(metric),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_to_bytes;

    #[test]
    fn test_link_state_attribute_roundtrip() {
        let mut src = hex_to_bytes(
            "0400 0001 01
             0447 0003 00000a",
        );
        let attr = LinkStateAttribute::from_bytes(&mut src).unwrap();
        assert_eq!(attr.0[0], LinkStateTlv::NodeFlagBits(1));
        assert_eq!(attr.igp_metric(), Some(&hex_to_bytes("00000a")));
        let mut dst = bytes::BytesMut::new();
        attr.to_bytes(&mut dst);
        assert_eq!(
            dst.freeze(),
            hex_to_bytes(
                "0400 0001 01
                 0447 0003 00000a",
            )
        );
    }

    #[test]
    fn test_unsupported_attribute_tlv_preserved() {
        let mut src = hex_to_bytes("2710 0002 cafe"); // type 10000
        let attr = LinkStateAttribute::from_bytes(&mut src).unwrap();
        assert_eq!(attr.0[0], LinkStateTlv::Unsupported(10000, hex_to_bytes("cafe")));
    }

    #[test]
    fn test_peer_adj_sid_roundtrip() {
        // TLV 1102 (0x044e): flags=0x30, weight=0, reserved=0000, 3-octet label 000a1b
        let mut src = hex_to_bytes("044e 0007 30 00 0000 000a1b");
        let attr = LinkStateAttribute::from_bytes(&mut src).unwrap();
        assert_eq!(
            attr.0[0],
            LinkStateTlv::PeerAdjSid { flags: 0x30, weight: 0, sid: hex_to_bytes("000a1b") }
        );
        let mut dst = bytes::BytesMut::new();
        attr.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), hex_to_bytes("044e 0007 30 00 0000 000a1b"));
    }

    #[test]
    fn test_unreserved_bandwidth_and_router_ids() {
        let mut bw_hex = String::new();
        for _ in 0..8 {
            bw_hex.push_str("3f800000"); // 1.0f32 in each priority slot
        }
        let src_hex = format!("0404 0004 0a000001 0443 0020 {bw_hex}");
        let mut src = hex_to_bytes(&src_hex);
        let attr = LinkStateAttribute::from_bytes(&mut src).unwrap();
        assert_eq!(
            attr.0[0],
            LinkStateTlv::Ipv4RouterIdOfLocalNode(std::net::Ipv4Addr::new(10, 0, 0, 1))
        );
        assert_eq!(
            attr.0[1],
            LinkStateTlv::UnreservedBandwidth([0x3f80_0000; 8])
        );
        let mut dst = bytes::BytesMut::new();
        attr.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), hex_to_bytes(&src_hex));
    }
}
