//! OPEN message validation
//!
//! RFC 4271 Section 6.2 lists the checks a BGP speaker applies to a received
//! OPEN message before accepting a peer. This module applies that set,
//! narrowed to what a BGP-LS-only speaker needs: version, peer AS (2-octet
//! or 4-octet), hold time, BGP Identifier, and the mandatory BGP-LS
//! multiprotocol capability.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::capability::{Afi, OptionalParameterValue, Safi, Value as CapabilityValue};
use crate::{
    CeaseSubcode, NotificationErrorCode, Open, OpenMessageErrorSubcode, AS_TRANS, BGP_VERSION,
};
use bytes::{BufMut, Bytes, BytesMut};

/// A validation failure, carrying the wire `{code, subcode, data}` triple the
/// SSM must send back to the peer in a NOTIFICATION before tearing the
/// session down.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid OPEN: {subcode:?}")]
pub struct ValidationError {
    pub subcode: OpenMessageErrorSubcode,
    pub data: Bytes,
}

impl ValidationError {
    fn new(subcode: OpenMessageErrorSubcode, data: Bytes) -> Self {
        Self { subcode, data }
    }

    /// The NOTIFICATION error code this validation failure always carries
    #[must_use]
    pub const fn error_code(&self) -> NotificationErrorCode {
        NotificationErrorCode::OpenMessageError
    }
}

/// Validate a received OPEN message against the expected peer ASN.
///
/// Applies RFC 4271 6.2 checks in the order the wire protocol expects them
/// to be diagnosed, plus the BGP-LS-specific requirement that the peer
/// advertise the BGP-LS multiprotocol capability.
pub fn validate(msg: &Open, neighbor_asn: u32) -> Result<(), ValidationError> {
    if msg.version != BGP_VERSION {
        let mut data = BytesMut::with_capacity(2);
        data.put_u16(u16::from(BGP_VERSION));
        return Err(ValidationError::new(
            OpenMessageErrorSubcode::UnsupportedVersionNumber,
            data.freeze(),
        ));
    }

    let four_octet_expected = msg.asn == AS_TRANS;
    if !four_octet_expected {
        let expected_16 = u16::try_from(neighbor_asn).unwrap_or(AS_TRANS);
        if msg.asn != expected_16 {
            return Err(ValidationError::new(
                OpenMessageErrorSubcode::BadPeerAs,
                Bytes::new(),
            ));
        }
    }

    if msg.hold_time != 0 && msg.hold_time < 3 {
        return Err(ValidationError::new(
            OpenMessageErrorSubcode::UnacceptableHoldTime,
            Bytes::new(),
        ));
    }

    if msg.bgp_id.is_unspecified() {
        return Err(ValidationError::new(
            OpenMessageErrorSubcode::BadBgpIdentifier,
            Bytes::new(),
        ));
    }

    let mut four_octet_asn = None;
    let mut has_bgp_ls_mp = false;
    for param in msg.opt_params.iter() {
        let caps = match param {
            OptionalParameterValue::Capabilities(caps) => caps,
            OptionalParameterValue::Unknown(..) => {
                return Err(ValidationError::new(
                    OpenMessageErrorSubcode::UnsupportedOptionalParameter,
                    Bytes::new(),
                ));
            }
        };
        for cap in caps.iter() {
            match cap {
                CapabilityValue::MultiProtocol(mp) if mp.afi == Afi::BgpLs && mp.safi == Safi::LinkState => {
                    has_bgp_ls_mp = true;
                }
                CapabilityValue::FourOctetAsNumber(four) => {
                    four_octet_asn = Some(four.asn);
                }
                _ => {}
            }
        }
    }

    if let Some(asn) = four_octet_asn {
        if asn != neighbor_asn {
            return Err(ValidationError::new(
                OpenMessageErrorSubcode::BadPeerAs,
                Bytes::new(),
            ));
        }
    }

    if !has_bgp_ls_mp {
        let mut data = BytesMut::new();
        data.put_u8(1); // capability code: MultiProtocol
        data.put_u8(4); // capability length
        data.put_u16(Afi::BgpLs as u16);
        data.put_u8(0);
        data.put_u8(Safi::LinkState as u8);
        return Err(ValidationError::new(
            OpenMessageErrorSubcode::UnsupportedCapability,
            data.freeze(),
        ));
    }

    if four_octet_expected && four_octet_asn.is_none() {
        return Err(ValidationError::new(
            OpenMessageErrorSubcode::BadPeerAs,
            Bytes::new(),
        ));
    }

    Ok(())
}

/// Subcode the SSM uses when it tears a session down on its own initiative
/// rather than in response to a peer's message.
#[must_use]
pub fn administrative_cease() -> CeaseSubcode {
    CeaseSubcode::AdministrativeShutdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilitiesBuilder, OptionalParameterValue};
    use std::net::Ipv4Addr;

    fn open_with(caps: crate::capability::Capabilities, asn: u16, hold_time: u16) -> Open {
        Open {
            version: BGP_VERSION,
            asn,
            hold_time,
            bgp_id: Ipv4Addr::new(10, 0, 0, 1),
            opt_params: vec![OptionalParameterValue::Capabilities(caps)].into(),
        }
    }

    fn bgp_ls_caps() -> crate::capability::Capabilities {
        CapabilitiesBuilder::new().mp_bgp_ls().build()
    }

    #[test]
    fn test_valid_open() {
        let open = open_with(bgp_ls_caps(), 64512, 90);
        assert!(validate(&open, 64512).is_ok());
    }

    #[test]
    fn test_bad_version() {
        let mut open = open_with(bgp_ls_caps(), 64512, 90);
        open.version = 3;
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::UnsupportedVersionNumber);
        assert_eq!(err.data, Bytes::from_static(&[0, 4]));
    }

    #[test]
    fn test_bad_peer_as() {
        let open = open_with(bgp_ls_caps(), 64513, 90);
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::BadPeerAs);
    }

    #[test]
    fn test_unacceptable_hold_time() {
        let open = open_with(bgp_ls_caps(), 64512, 2);
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::UnacceptableHoldTime);
    }

    #[test]
    fn test_zero_hold_time_is_acceptable() {
        let open = open_with(bgp_ls_caps(), 64512, 0);
        assert!(validate(&open, 64512).is_ok());
    }

    #[test]
    fn test_bad_bgp_id() {
        let mut open = open_with(bgp_ls_caps(), 64512, 90);
        open.bgp_id = Ipv4Addr::UNSPECIFIED;
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::BadBgpIdentifier);
    }

    #[test]
    fn test_missing_bgp_ls_capability() {
        let open = open_with(CapabilitiesBuilder::new().mp_ipv4_unicast().build(), 64512, 90);
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::UnsupportedCapability);
    }

    #[test]
    fn test_as_trans_without_four_octet_capability() {
        let open = open_with(bgp_ls_caps(), AS_TRANS, 90);
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::BadPeerAs);
    }

    #[test]
    fn test_unsupported_optional_parameter() {
        let mut open = open_with(bgp_ls_caps(), 64512, 90);
        open.opt_params.0.push(OptionalParameterValue::Unknown(99, Bytes::new()));
        let err = validate(&open, 64512).unwrap_err();
        assert_eq!(err.subcode, OpenMessageErrorSubcode::UnsupportedOptionalParameter);
    }

    #[test]
    fn test_as_trans_with_four_octet_capability() {
        let caps = CapabilitiesBuilder::new()
            .mp_bgp_ls()
            .four_octet_as_number(70000)
            .build();
        let open = open_with(caps, AS_TRANS, 90);
        assert!(validate(&open, 70000).is_ok());
    }
}
