//! Legacy (non-BGP-LS) BGP route encoding
//!
//! These structures do not contain information about the address family of
//! the route as they correspond to BGP's NLRI fields. To determine the address
//! family, the caller must know the context (BGP.nlri, MP_REACH_NLRI, etc).
//!
//! This speaker never originates routes through these fields (no outbound
//! UPDATE generation), but it must still decode and round-trip them when a
//! peer sends legacy withdrawn-routes/NLRI bytes alongside BGP-LS content.

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::endec::Component;
use bytes::{Buf, BufMut, Bytes};
use std::ops::Deref;

/// Compute the number of prefix octets from the prefix length
pub(crate) fn n_prefix_octets(prefix_len: u8) -> usize {
    #[allow(clippy::verbose_bit_mask)]
    let result = if prefix_len & 0x07 == 0 {
        prefix_len >> 3
    } else {
        (prefix_len >> 3) + 1
    };
    usize::from(result)
}

/// BGP route CIDR blocks
///
/// Corresponding to a compact representation of a u8 prefix length and the
/// minimum number of octets to represent the prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub prefix_len: u8,
    pub prefix: Bytes,
}

/// BGP routes
///
/// Corresponding to a compact list of CIDR blocks without a length field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Routes(pub Vec<Value>);

impl Component for Routes {
    fn from_bytes(src: &mut bytes::Bytes) -> Result<Self, super::Error> {
        let mut routes = Vec::new();
        while src.has_remaining() {
            let prefix_len = src.get_u8();
            let n_prefix_octets = n_prefix_octets(prefix_len);
            let prefix = src.split_to(n_prefix_octets);
            routes.push(Value { prefix_len, prefix });
        }
        Ok(Self(routes))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        for route in self.0 {
            dst.put_u8(route.prefix_len);
            dst.put_slice(&route.prefix);
            len += 1 + route.prefix.len();
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(|r| 1 + r.prefix.len()).sum()
    }
}

impl Deref for Routes {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
