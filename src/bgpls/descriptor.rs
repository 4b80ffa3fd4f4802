//! BGP-LS Node/Link/Prefix Descriptor TLVs (RFC 7752 Section 3.2)

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::endec::Component;
use crate::route::n_prefix_octets;
use crate::Error;
use bytes::{Buf, BufMut, Bytes};
use std::ops::Deref;

/// Read a `{type: u16, length: u16, value}` TLV header and split off its value
fn read_tlv_header(src: &mut Bytes) -> Result<(u16, Bytes), Error> {
    if src.remaining() < 4 {
        return Err(Error::InternalLength("BGP-LS TLV header", std::cmp::Ordering::Less));
    }
    let type_ = src.get_u16();
    let len = src.get_u16() as usize;
    if src.remaining() < len {
        return Err(Error::InternalLength("BGP-LS TLV value", std::cmp::Ordering::Less));
    }
    Ok((type_, src.split_to(len)))
}

fn write_tlv_header(dst: &mut bytes::BytesMut, type_: u16) -> usize {
    dst.put_u16(type_);
    let len_pos = dst.len();
    dst.put_u16(0); // Placeholder
    len_pos
}

fn patch_tlv_len(dst: &mut bytes::BytesMut, len_pos: usize, value_len: usize) {
    dst[len_pos..len_pos + 2].copy_from_slice(
        &(u16::try_from(value_len).expect("BGP-LS TLV length overflow").to_be_bytes()),
    );
}

/// The IGP Router-ID sub-TLV value (RFC 7752 Section 3.2.1.4): which of the
/// four shapes a TLV 515 value takes is determined purely by its length, not
/// by a discriminant byte, so this speaker distinguishes pseudonode from
/// non-pseudonode IS-IS/OSPF router-IDs the same way the wire does.
#[derive(Clone, Debug, PartialEq)]
pub enum IgpRouterId {
    /// IS-IS non-pseudonode: a 6-octet System-ID
    IsisNonPseudonode(Bytes),
    /// IS-IS pseudonode: a 6-octet System-ID plus a 1-octet Pseudonode-ID
    IsisPseudonode { system_id: Bytes, pseudonode_id: u8 },
    /// OSPFv2/v3 non-pseudonode: the router's own Router-ID
    OspfNonPseudonode(std::net::Ipv4Addr),
    /// OSPFv2/v3 pseudonode: the Designated Router's Router-ID plus the DR's interface address
    OspfPseudonode { dr_router_id: std::net::Ipv4Addr, dr_interface_address: std::net::Ipv4Addr },
}

impl IgpRouterId {
    fn from_bytes(mut value: Bytes) -> Self {
        match value.remaining() {
            6 => Self::IsisNonPseudonode(value),
            7 => {
                let system_id = value.split_to(6);
                Self::IsisPseudonode { system_id, pseudonode_id: value.get_u8() }
            }
            4 => Self::OspfNonPseudonode(std::net::Ipv4Addr::from(value.get_u32())),
            8 => Self::OspfPseudonode {
                dr_router_id: std::net::Ipv4Addr::from(value.get_u32()),
                dr_interface_address: std::net::Ipv4Addr::from(value.get_u32()),
            },
            _ => unreachable!("caller only dispatches here for lengths 4, 6, 7, or 8"),
        }
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        match self {
            Self::IsisNonPseudonode(system_id) => {
                dst.put_slice(&system_id);
                6
            }
            Self::IsisPseudonode { system_id, pseudonode_id } => {
                dst.put_slice(&system_id);
                dst.put_u8(pseudonode_id);
                7
            }
            Self::OspfNonPseudonode(router_id) => {
                dst.put_slice(&router_id.octets());
                4
            }
            Self::OspfPseudonode { dr_router_id, dr_interface_address } => {
                dst.put_slice(&dr_router_id.octets());
                dst.put_slice(&dr_interface_address.octets());
                8
            }
        }
    }
}

/// Node Descriptor sub-TLV (used inside both Local and Remote Node Descriptors)
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum NodeDescriptorTlv {
    /// Autonomous System (TLV 512)
    AutonomousSystem(u32),
    /// BGP-LS Identifier (TLV 513)
    BgpLsIdentifier(u32),
    /// OSPF Area-ID (TLV 514)
    OspfAreaId(u32),
    /// IGP Router-ID (TLV 515)
    IgpRouterId(IgpRouterId),
    /// BGP Router Identifier (TLV 516, RFC 9086): identifies a BGP-only node
    BgpRouterId(std::net::Ipv4Addr),
    /// Member-AS Number (TLV 517, RFC 9086): the AS a BGP confederation member belongs to
    MemberAsNumber(u32),
    Unsupported(u16, Bytes),
}

impl NodeDescriptorTlv {
    const TYPE_AUTONOMOUS_SYSTEM: u16 = 512;
    const TYPE_BGP_LS_IDENTIFIER: u16 = 513;
    const TYPE_OSPF_AREA_ID: u16 = 514;
    const TYPE_IGP_ROUTER_ID: u16 = 515;
    const TYPE_BGP_ROUTER_ID: u16 = 516;
    const TYPE_MEMBER_AS_NUMBER: u16 = 517;

    fn type_(&self) -> u16 {
        match self {
            Self::AutonomousSystem(_) => Self::TYPE_AUTONOMOUS_SYSTEM,
            Self::BgpLsIdentifier(_) => Self::TYPE_BGP_LS_IDENTIFIER,
            Self::OspfAreaId(_) => Self::TYPE_OSPF_AREA_ID,
            Self::IgpRouterId(_) => Self::TYPE_IGP_ROUTER_ID,
            Self::BgpRouterId(_) => Self::TYPE_BGP_ROUTER_ID,
            Self::MemberAsNumber(_) => Self::TYPE_MEMBER_AS_NUMBER,
            Self::Unsupported(t, _) => *t,
        }
    }
}

impl Component for NodeDescriptorTlv {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let (type_, mut value) = read_tlv_header(src)?;
        Ok(match type_ {
            Self::TYPE_AUTONOMOUS_SYSTEM if value.remaining() == 4 => {
                Self::AutonomousSystem(value.get_u32())
            }
            Self::TYPE_BGP_LS_IDENTIFIER if value.remaining() == 4 => {
                Self::BgpLsIdentifier(value.get_u32())
            }
            Self::TYPE_OSPF_AREA_ID if value.remaining() == 4 => Self::OspfAreaId(value.get_u32()),
            Self::TYPE_IGP_ROUTER_ID if matches!(value.remaining(), 4 | 6 | 7 | 8) => {
                Self::IgpRouterId(IgpRouterId::from_bytes(value))
            }
            Self::TYPE_BGP_ROUTER_ID if value.remaining() == 4 => {
                Self::BgpRouterId(std::net::Ipv4Addr::from(value.get_u32()))
            }
            Self::TYPE_MEMBER_AS_NUMBER if value.remaining() == 4 => {
                Self::MemberAsNumber(value.get_u32())
            }
            _ => Self::Unsupported(type_, value),
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let type_ = self.type_();
        let len_pos = write_tlv_header(dst, type_);
        let value_len = match self {
            Self::AutonomousSystem(asn)
            | Self::BgpLsIdentifier(asn)
            | Self::OspfAreaId(asn)
            | Self::MemberAsNumber(asn) => {
                dst.put_u32(asn);
                4
            }
            Self::BgpRouterId(id) => {
                dst.put_slice(&id.octets());
                4
            }
            Self::IgpRouterId(id) => id.to_bytes(dst),
            Self::Unsupported(_, id) => {
                let len = id.len();
                dst.put_slice(&id);
                len
            }
        };
        patch_tlv_len(dst, len_pos, value_len);
        4 + value_len
    }

    fn encoded_len(&self) -> usize {
        4 + match self {
            Self::AutonomousSystem(_)
            | Self::BgpLsIdentifier(_)
            | Self::OspfAreaId(_)
            | Self::MemberAsNumber(_)
            | Self::BgpRouterId(_) => 4,
            Self::IgpRouterId(id) => match id {
                IgpRouterId::IsisNonPseudonode(_) => 6,
                IgpRouterId::OspfNonPseudonode(_) => 4,
                IgpRouterId::IsisPseudonode { .. } => 7,
                IgpRouterId::OspfPseudonode { .. } => 8,
            },
            Self::Unsupported(_, id) => id.len(),
        }
    }
}

/// Local/Remote Node Descriptors (TLV 256/257): a list of [`NodeDescriptorTlv`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeDescriptors(pub Vec<NodeDescriptorTlv>);

impl Component for NodeDescriptors {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut tlvs = Vec::new();
        while src.has_remaining() {
            tlvs.push(NodeDescriptorTlv::from_bytes(src)?);
        }
        Ok(Self(tlvs))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        self.0.into_iter().map(|tlv| tlv.to_bytes(dst)).sum()
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(NodeDescriptorTlv::encoded_len).sum()
    }
}

impl Deref for NodeDescriptors {
    type Target = Vec<NodeDescriptorTlv>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl NodeDescriptors {
    /// The Autonomous System sub-TLV value, if present
    #[must_use]
    pub fn autonomous_system(&self) -> Option<u32> {
        self.0.iter().find_map(|tlv| match tlv {
            NodeDescriptorTlv::AutonomousSystem(asn) => Some(*asn),
            _ => None,
        })
    }
}

pub(crate) fn read_descriptors_tlv(
    src: &mut Bytes,
    expected_type: u16,
) -> Result<NodeDescriptors, Error> {
    let (type_, mut value) = read_tlv_header(src)?;
    if type_ != expected_type {
        return Err(Error::InternalType("node descriptors TLV", type_));
    }
    NodeDescriptors::from_bytes(&mut value)
}

pub(crate) fn write_descriptors_tlv(
    dst: &mut bytes::BytesMut,
    type_: u16,
    descriptors: NodeDescriptors,
) -> usize {
    let len_pos = write_tlv_header(dst, type_);
    let value_len = descriptors.to_bytes(dst);
    patch_tlv_len(dst, len_pos, value_len);
    4 + value_len
}

/// Link Descriptor sub-TLV (RFC 7752 Section 3.3.2)
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum LinkDescriptorTlv {
    /// Link Local/Remote Identifiers (TLV 258, RFC 5307)
    LocalRemoteIdentifiers { local: u32, remote: u32 },
    /// IPv4 Interface Address (TLV 259)
    Ipv4InterfaceAddress(std::net::Ipv4Addr),
    /// IPv4 Neighbor Address (TLV 260)
    Ipv4NeighborAddress(std::net::Ipv4Addr),
    /// IPv6 Interface Address (TLV 261)
    Ipv6InterfaceAddress(std::net::Ipv6Addr),
    /// IPv6 Neighbor Address (TLV 262)
    Ipv6NeighborAddress(std::net::Ipv6Addr),
    /// Multi-Topology ID (TLV 263, shared with prefix descriptors)
    MultiTopologyId(Vec<u16>),
    Unsupported(u16, Bytes),
}

impl LinkDescriptorTlv {
    const TYPE_LOCAL_REMOTE_IDENTIFIERS: u16 = 258;
    const TYPE_IPV4_INTERFACE_ADDRESS: u16 = 259;
    const TYPE_IPV4_NEIGHBOR_ADDRESS: u16 = 260;
    const TYPE_IPV6_INTERFACE_ADDRESS: u16 = 261;
    const TYPE_IPV6_NEIGHBOR_ADDRESS: u16 = 262;
    const TYPE_MULTI_TOPOLOGY_ID: u16 = 263;
}

impl Component for LinkDescriptorTlv {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let (type_, mut value) = read_tlv_header(src)?;
        Ok(match type_ {
            Self::TYPE_LOCAL_REMOTE_IDENTIFIERS if value.remaining() == 8 => {
                Self::LocalRemoteIdentifiers { local: value.get_u32(), remote: value.get_u32() }
            }
            Self::TYPE_IPV4_INTERFACE_ADDRESS if value.remaining() == 4 => {
                Self::Ipv4InterfaceAddress(std::net::Ipv4Addr::from(value.get_u32()))
            }
            Self::TYPE_IPV4_NEIGHBOR_ADDRESS if value.remaining() == 4 => {
                Self::Ipv4NeighborAddress(std::net::Ipv4Addr::from(value.get_u32()))
            }
            Self::TYPE_IPV6_INTERFACE_ADDRESS if value.remaining() == 16 => {
                Self::Ipv6InterfaceAddress(std::net::Ipv6Addr::from(value.get_u128()))
            }
            Self::TYPE_IPV6_NEIGHBOR_ADDRESS if value.remaining() == 16 => {
                Self::Ipv6NeighborAddress(std::net::Ipv6Addr::from(value.get_u128()))
            }
            Self::TYPE_MULTI_TOPOLOGY_ID if value.remaining() % 2 == 0 => {
                let mut ids = Vec::with_capacity(value.remaining() / 2);
                while value.has_remaining() {
                    ids.push(value.get_u16() & 0x0fff);
                }
                Self::MultiTopologyId(ids)
            }
            _ => Self::Unsupported(type_, value),
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let type_ = match &self {
            Self::LocalRemoteIdentifiers { .. } => Self::TYPE_LOCAL_REMOTE_IDENTIFIERS,
            Self::Ipv4InterfaceAddress(_) => Self::TYPE_IPV4_INTERFACE_ADDRESS,
            Self::Ipv4NeighborAddress(_) => Self::TYPE_IPV4_NEIGHBOR_ADDRESS,
            Self::Ipv6InterfaceAddress(_) => Self::TYPE_IPV6_INTERFACE_ADDRESS,
            Self::Ipv6NeighborAddress(_) => Self::TYPE_IPV6_NEIGHBOR_ADDRESS,
            Self::MultiTopologyId(_) => Self::TYPE_MULTI_TOPOLOGY_ID,
            Self::Unsupported(t, _) => *t,
        };
        let len_pos = write_tlv_header(dst, type_);
        let value_len = match self {
            Self::LocalRemoteIdentifiers { local, remote } => {
                dst.put_u32(local);
                dst.put_u32(remote);
                8
            }
            Self::Ipv4InterfaceAddress(ip) | Self::Ipv4NeighborAddress(ip) => {
                dst.put_slice(&ip.octets());
                4
            }
            Self::Ipv6InterfaceAddress(ip) | Self::Ipv6NeighborAddress(ip) => {
                dst.put_slice(&ip.octets());
                16
            }
            Self::MultiTopologyId(ids) => {
                for id in &ids {
                    dst.put_u16(id & 0x0fff);
                }
                ids.len() * 2
            }
            Self::Unsupported(_, value) => {
                let len = value.len();
                dst.put_slice(&value);
                len
            }
        };
        patch_tlv_len(dst, len_pos, value_len);
        4 + value_len
    }

    fn encoded_len(&self) -> usize {
        4 + match self {
            Self::LocalRemoteIdentifiers { .. } => 8,
            Self::Ipv4InterfaceAddress(_) | Self::Ipv4NeighborAddress(_) => 4,
            Self::Ipv6InterfaceAddress(_) | Self::Ipv6NeighborAddress(_) => 16,
            Self::MultiTopologyId(ids) => ids.len() * 2,
            Self::Unsupported(_, value) => value.len(),
        }
    }
}

/// Link Descriptors: a list of [`LinkDescriptorTlv`] that together address one link
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkDescriptors(pub Vec<LinkDescriptorTlv>);

impl Component for LinkDescriptors {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut tlvs = Vec::new();
        while src.has_remaining() {
            tlvs.push(LinkDescriptorTlv::from_bytes(src)?);
        }
        Ok(Self(tlvs))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        self.0.into_iter().map(|tlv| tlv.to_bytes(dst)).sum()
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(LinkDescriptorTlv::encoded_len).sum()
    }
}

impl Deref for LinkDescriptors {
    type Target = Vec<LinkDescriptorTlv>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Prefix Descriptor sub-TLV (RFC 7752 Section 3.2.4)
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum PrefixDescriptorTlv {
    /// Multi-Topology ID (TLV 263, shared with link descriptors)
    MultiTopologyId(Vec<u16>),
    /// OSPF Route Type (TLV 264)
    OspfRouteType(u8),
    /// IP Reachability Information (TLV 265): a compact prefix, as in [`crate::route::Value`]
    IpReachability { prefix_len: u8, prefix: Bytes },
    Unsupported(u16, Bytes),
}

impl PrefixDescriptorTlv {
    const TYPE_MULTI_TOPOLOGY_ID: u16 = 263;
    const TYPE_OSPF_ROUTE_TYPE: u16 = 264;
    const TYPE_IP_REACHABILITY: u16 = 265;
}

impl Component for PrefixDescriptorTlv {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let (type_, mut value) = read_tlv_header(src)?;
        Ok(match type_ {
            Self::TYPE_MULTI_TOPOLOGY_ID if value.remaining() % 2 == 0 => {
                let mut ids = Vec::with_capacity(value.remaining() / 2);
                while value.has_remaining() {
                    ids.push(value.get_u16() & 0x0fff);
                }
                Self::MultiTopologyId(ids)
            }
            Self::TYPE_OSPF_ROUTE_TYPE if value.remaining() == 1 => {
                Self::OspfRouteType(value.get_u8())
            }
            Self::TYPE_IP_REACHABILITY if value.has_remaining() => {
                let prefix_len = value.get_u8();
                let octets = n_prefix_octets(prefix_len);
                if value.remaining() < octets {
                    return Err(Error::InternalLength(
                        "IP Reachability prefix",
                        std::cmp::Ordering::Less,
                    ));
                }
                Self::IpReachability { prefix_len, prefix: value.split_to(octets) }
            }
            _ => Self::Unsupported(type_, value),
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let type_ = match &self {
            Self::MultiTopologyId(_) => Self::TYPE_MULTI_TOPOLOGY_ID,
            Self::OspfRouteType(_) => Self::TYPE_OSPF_ROUTE_TYPE,
            Self::IpReachability { .. } => Self::TYPE_IP_REACHABILITY,
            Self::Unsupported(t, _) => *t,
        };
        let len_pos = write_tlv_header(dst, type_);
        let value_len = match self {
            Self::MultiTopologyId(ids) => {
                for id in &ids {
                    dst.put_u16(id & 0x0fff);
                }
                ids.len() * 2
            }
            Self::OspfRouteType(route_type) => {
                dst.put_u8(route_type);
                1
            }
            Self::IpReachability { prefix_len, prefix } => {
                dst.put_u8(prefix_len);
                dst.put_slice(&prefix);
                1 + prefix.len()
            }
            Self::Unsupported(_, value) => {
                let len = value.len();
                dst.put_slice(&value);
                len
            }
        };
        patch_tlv_len(dst, len_pos, value_len);
        4 + value_len
    }

    fn encoded_len(&self) -> usize {
        4 + match self {
            Self::MultiTopologyId(ids) => ids.len() * 2,
            Self::OspfRouteType(_) => 1,
            Self::IpReachability { prefix, .. } => 1 + prefix.len(),
            Self::Unsupported(_, value) => value.len(),
        }
    }
}

/// Prefix Descriptors: a list of [`PrefixDescriptorTlv`] that together address one prefix
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrefixDescriptors(pub Vec<PrefixDescriptorTlv>);

impl Component for PrefixDescriptors {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let mut tlvs = Vec::new();
        while src.has_remaining() {
            tlvs.push(PrefixDescriptorTlv::from_bytes(src)?);
        }
        Ok(Self(tlvs))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        self.0.into_iter().map(|tlv| tlv.to_bytes(dst)).sum()
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(PrefixDescriptorTlv::encoded_len).sum()
    }
}

impl Deref for PrefixDescriptors {
    type Target = Vec<PrefixDescriptorTlv>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex_to_bytes;

    #[test]
    fn test_node_descriptors_roundtrip() {
        // AS 512=65000, BGP-LS ID 513=1, IGP Router-ID 515=4 octets
        let mut src = hex_to_bytes(
            "0200 0004 0000fde8
             0201 0004 00000001
             0203 0004 0a000001",
        );
        let descriptors = NodeDescriptors::from_bytes(&mut src).unwrap();
        assert_eq!(descriptors.autonomous_system(), Some(65000));
        assert_eq!(descriptors.0.len(), 3);
        let mut dst = bytes::BytesMut::new();
        descriptors.to_bytes(&mut dst);
        assert_eq!(
            dst.freeze(),
            hex_to_bytes(
                "0200 0004 0000fde8
                 0201 0004 00000001
                 0203 0004 0a000001",
            )
        );
    }

    #[test]
    fn test_unsupported_descriptor_tlv_preserved() {
        let mut src = hex_to_bytes("03e8 0002 abcd"); // type 1000, not recognized
        let descriptors = NodeDescriptors::from_bytes(&mut src).unwrap();
        assert_eq!(
            descriptors.0[0],
            NodeDescriptorTlv::Unsupported(1000, hex_to_bytes("abcd"))
        );
    }

    #[test]
    fn test_isis_pseudonode_router_id() {
        // TLV 515, 7 octets: 6-octet system-id + 1-octet pseudonode-id
        let mut src = hex_to_bytes("0203 0007 00199a1b2c3d 05");
        let descriptors = NodeDescriptors::from_bytes(&mut src).unwrap();
        assert_eq!(
            descriptors.0[0],
            NodeDescriptorTlv::IgpRouterId(IgpRouterId::IsisPseudonode {
                system_id: hex_to_bytes("00199a1b2c3d"),
                pseudonode_id: 5,
            })
        );
        let mut dst = bytes::BytesMut::new();
        descriptors.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), hex_to_bytes("0203 0007 00199a1b2c3d 05"));
    }

    #[test]
    fn test_ospf_pseudonode_router_id() {
        // TLV 515, 8 octets: DR router-id + DR interface address
        let mut src = hex_to_bytes("0203 0008 0a000001 0a000002");
        let descriptors = NodeDescriptors::from_bytes(&mut src).unwrap();
        assert_eq!(
            descriptors.0[0],
            NodeDescriptorTlv::IgpRouterId(IgpRouterId::OspfPseudonode {
                dr_router_id: std::net::Ipv4Addr::new(10, 0, 0, 1),
                dr_interface_address: std::net::Ipv4Addr::new(10, 0, 0, 2),
            })
        );
        let mut dst = bytes::BytesMut::new();
        descriptors.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), hex_to_bytes("0203 0008 0a000001 0a000002"));
    }

    #[test]
    fn test_bgp_router_id_and_member_as_number() {
        // TLV 516 (BGP Router-ID) and TLV 517 (Member-AS Number), RFC 9086
        let mut src = hex_to_bytes("0204 0004 0a0000ff 0205 0004 0000fde8");
        let descriptors = NodeDescriptors::from_bytes(&mut src).unwrap();
        assert_eq!(
            descriptors.0[0],
            NodeDescriptorTlv::BgpRouterId(std::net::Ipv4Addr::new(10, 0, 0, 255))
        );
        assert_eq!(descriptors.0[1], NodeDescriptorTlv::MemberAsNumber(65000));
        let mut dst = bytes::BytesMut::new();
        descriptors.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), hex_to_bytes("0204 0004 0a0000ff 0205 0004 0000fde8"));
    }

    #[test]
    fn test_ip_reachability_roundtrip() {
        let mut src = hex_to_bytes("0109 0004 18 c0a80a"); // /24 prefix 192.168.10.0/24
        let descriptors = PrefixDescriptors::from_bytes(&mut src).unwrap();
        assert_eq!(
            descriptors.0[0],
            PrefixDescriptorTlv::IpReachability { prefix_len: 24, prefix: hex_to_bytes("c0a80a") }
        );
        let mut dst = bytes::BytesMut::new();
        descriptors.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), hex_to_bytes("0109 0004 18 c0a80a"));
    }
}
