//! IP range classification.
//!
//! Extends a basic private-IP check with the multicast/broadcast/reserved
//! ranges and IPv6 documentation/benchmarking ranges the action core also
//! needs to reject.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// `true` if `ip` falls in any private, loopback, link-local, CGNAT,
/// reserved, multicast, or broadcast range — the set of addresses an
/// outbound action request must never reach.
pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_multicast()
        || is_v4_shared_address(ip)
        || is_v4_documentation(ip)
        || is_v4_benchmarking(ip)
        || is_v4_reserved(ip)
}

fn is_blocked_v6(ip: &Ipv6Addr) -> bool {
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || is_v6_unique_local(ip)
        || is_v6_link_local(ip)
        || is_v6_documentation(ip)
        || is_v6_mapped_blocked_v4(ip)
}

/// 100.64.0.0/10 — Shared address space (RFC 6598 / CGNAT).
fn is_v4_shared_address(ip: &Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] == 100 && (o[1] & 0xC0) == 64
}

/// 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24.
fn is_v4_documentation(ip: &Ipv4Addr) -> bool {
    let o = ip.octets();
    (o[0] == 192 && o[1] == 0 && o[2] == 2)
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
}

/// 198.18.0.0/15 — benchmarking.
fn is_v4_benchmarking(ip: &Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] == 198 && (o[1] & 0xFE) == 18
}

/// 240.0.0.0/4 (reserved "future use") and 192.0.0.0/24 (IETF protocol
/// assignments).
fn is_v4_reserved(ip: &Ipv4Addr) -> bool {
    let o = ip.octets();
    o[0] >= 240 || (o[0] == 192 && o[1] == 0 && o[2] == 0)
}

/// fc00::/7 unique-local (in practice almost always fd00::/8).
fn is_v6_unique_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xFE00) == 0xFC00
}

/// fe80::/10 link-local.
fn is_v6_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xFFC0) == 0xFE80
}

/// 2001:db8::/32 — documentation range.
fn is_v6_documentation(ip: &Ipv6Addr) -> bool {
    let s = ip.segments();
    s[0] == 0x2001 && s[1] == 0x0db8
}

/// IPv4-mapped (::ffff:a.b.c.d) and IPv4-compatible addresses are only
/// as safe as the IPv4 address they carry; classify the embedded address.
fn is_v6_mapped_blocked_v4(ip: &Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_v4(&v4);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> IpAddr {
        s.parse().unwrap()
    }
    fn v6(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn blocks_loopback_and_rfc1918() {
        assert!(is_blocked_ip(&v4("127.0.0.1")));
        assert!(is_blocked_ip(&v4("10.1.2.3")));
        assert!(is_blocked_ip(&v4("172.16.0.1")));
        assert!(is_blocked_ip(&v4("192.168.1.1")));
    }

    #[test]
    fn blocks_cloud_metadata_link_local() {
        assert!(is_blocked_ip(&v4("169.254.169.254")));
    }

    #[test]
    fn blocks_cgnat_and_reserved() {
        assert!(is_blocked_ip(&v4("100.64.0.1")));
        assert!(is_blocked_ip(&v4("240.0.0.1")));
        assert!(is_blocked_ip(&v4("255.255.255.255")));
    }

    #[test]
    fn blocks_multicast() {
        assert!(is_blocked_ip(&v4("224.0.0.1")));
        assert!(is_blocked_ip(&v6("ff02::1")));
    }

    #[test]
    fn allows_public_v4() {
        assert!(!is_blocked_ip(&v4("8.8.8.8")));
        assert!(!is_blocked_ip(&v4("1.1.1.1")));
    }

    #[test]
    fn blocks_v6_loopback_unique_local_link_local() {
        assert!(is_blocked_ip(&v6("::1")));
        assert!(is_blocked_ip(&v6("fd12:3456:789a::1")));
        assert!(is_blocked_ip(&v6("fe80::1")));
    }

    #[test]
    fn allows_public_v6() {
        assert!(!is_blocked_ip(&v6("2607:f8b0:4004:800::200e")));
    }

    #[test]
    fn blocks_v4_mapped_v6_private() {
        assert!(is_blocked_ip(&v6("::ffff:10.0.0.1")));
    }
}
