//! Textual address validation for the Wake-on-LAN fields.

use once_cell::sync::Lazy;
use regex::Regex;
use std::net::Ipv4Addr;

// Each separator is matched on its own, so "A1:B2-C3:D4-E5:F6" is accepted.
static MAC_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").unwrap());

/// True iff `input` is a dotted-quad IPv4 address.
pub fn is_valid_ipv4(input: &str) -> bool {
    input.parse::<Ipv4Addr>().is_ok()
}

/// True iff `input` is six 2-digit hex groups separated by `:` or `-`.
pub fn is_valid_mac(input: &str) -> bool {
    MAC_ADDRESS.is_match(input)
}
