//! Peer address whitelist
//!
//! An input module only acts on commands from peers contained in one of its
//! configured CIDR blocks. Blocks are compiled once at module init; a
//! malformed entry aborts init before any socket is bound.

use gpio_types::{GpioError, Result};
use std::fmt;
use std::net::IpAddr;

/// CIDR network block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrBlock {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrBlock {
    /// Parse `addr/prefix`, or a bare address as a single-host block
    ///
    /// Host bits set beyond the prefix make the block malformed.
    pub fn parse(cidr: &str) -> Result<Self> {
        let cidr = cidr.trim();
        let malformed = || {
            GpioError::configuration(format!("Malformed whitelist entry \"{}\"", cidr)).into_fatal()
        };

        let (addr, prefix) = match cidr.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr, None),
        };

        let network: IpAddr = addr.parse().map_err(|_| malformed())?;
        let max_prefix = max_prefix(&network);

        let prefix_len = match prefix {
            Some(prefix) => prefix.parse::<u8>().map_err(|_| malformed())?,
            None => max_prefix,
        };

        if prefix_len > max_prefix {
            return Err(malformed());
        }

        let block = Self {
            network,
            prefix_len,
        };
        if block.host_bits(&network) != 0 {
            return Err(malformed());
        }

        Ok(block)
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// True if `ip` lies inside this block
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, canonical(ip)) {
            (IpAddr::V4(network), IpAddr::V4(addr)) => {
                let mask = mask_v4(self.prefix_len);
                (u32::from(*network) & mask) == (u32::from(addr) & mask)
            }
            (IpAddr::V6(network), IpAddr::V6(addr)) => {
                let mask = mask_v6(self.prefix_len);
                (u128::from(*network) & mask) == (u128::from(addr) & mask)
            }
            _ => false,
        }
    }

    fn host_bits(&self, ip: &IpAddr) -> u128 {
        match ip {
            IpAddr::V4(addr) => u128::from(u32::from(*addr) & !mask_v4(self.prefix_len)),
            IpAddr::V6(addr) => u128::from(*addr) & !mask_v6(self.prefix_len),
        }
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask_v4(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        !0u32 << (32 - u32::from(prefix_len))
    }
}

fn mask_v6(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        !0u128 << (128 - u32::from(prefix_len))
    }
}

/// IPv4-mapped IPv6 peers compare as IPv4
fn canonical(ip: &IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(*v6)),
        v4 => *v4,
    }
}

/// Set of CIDR blocks allowed to address an input module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    blocks: Vec<CidrBlock>,
}

impl Whitelist {
    /// Compile the configured entries, failing on the first malformed one
    pub fn compile<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let blocks = entries
            .iter()
            .map(|entry| CidrBlock::parse(entry.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks })
    }

    /// True if `ip` is contained in any block; an empty whitelist allows nobody
    pub fn allows(&self, ip: &IpAddr) -> bool {
        self.blocks.iter().any(|block| block.contains(ip))
    }

    pub fn blocks(&self) -> &[CidrBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_block_membership() {
        let block = CidrBlock::parse("192.168.0.0/16").unwrap();
        assert!(block.contains(&ip("192.168.44.7")));
        assert!(!block.contains(&ip("192.169.0.1")));
        assert!(!block.contains(&ip("::1")));
    }

    #[test]
    fn test_bare_address_is_single_host() {
        let block = CidrBlock::parse("10.0.0.5").unwrap();
        assert_eq!(block.prefix_len(), 32);
        assert!(block.contains(&ip("10.0.0.5")));
        assert!(!block.contains(&ip("10.0.0.6")));
    }

    #[test]
    fn test_zero_prefix_matches_everything_in_family() {
        let block = CidrBlock::parse("0.0.0.0/0").unwrap();
        assert!(block.contains(&ip("203.0.113.9")));
        assert!(!block.contains(&ip("2001:db8::1")));
    }

    #[test]
    fn test_ipv6_block() {
        let block = CidrBlock::parse("2001:db8::/32").unwrap();
        assert!(block.contains(&ip("2001:db8:1::42")));
        assert!(!block.contains(&ip("2001:db9::1")));
    }

    #[test]
    fn test_mapped_ipv4_peer_is_canonicalized() {
        let block = CidrBlock::parse("127.0.0.0/8").unwrap();
        assert!(block.contains(&ip("::ffff:127.0.0.1")));
    }

    #[test]
    fn test_malformed_entries_are_fatal() {
        for entry in [
            "192.168.1.1/24",
            "10.0.0.0/33",
            "not-an-ip",
            "10.0.0.0/abc",
            "",
            "10.0.0.0/8/1",
        ] {
            let err = CidrBlock::parse(entry).unwrap_err();
            assert!(err.is_fatal(), "{} should be fatal", entry);
            assert_eq!(err.category(), "configuration");
        }
    }

    #[test]
    fn test_whitelist_compile_and_allow() {
        let whitelist = Whitelist::compile(&["127.0.0.0/8", "10.1.0.0/16"]).unwrap();
        assert!(whitelist.allows(&ip("127.0.0.1")));
        assert!(whitelist.allows(&ip("10.1.200.3")));
        assert!(!whitelist.allows(&ip("10.2.0.1")));
        assert_eq!(whitelist.blocks()[1].to_string(), "10.1.0.0/16");
    }

    #[test]
    fn test_whitelist_stops_at_first_malformed_entry() {
        assert!(Whitelist::compile(&["127.0.0.0/8", "300.0.0.0/8"]).is_err());
    }

    #[test]
    fn test_empty_whitelist_allows_nobody() {
        let whitelist = Whitelist::compile::<&str>(&[]).unwrap();
        assert!(whitelist.is_empty());
        assert!(!whitelist.allows(&ip("127.0.0.1")));
    }
}
