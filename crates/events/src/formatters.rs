// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

/// Write bytes as a `0x` prefixed hex string, truncating long values.
pub fn hexf(data: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    write!(
        f,
        "{}",
        truncate(data.iter().map(|b| format!("{:02x}", b)).collect::<String>())
    )
}

fn truncate(s: String) -> String {
    let threshold = 100;
    let limit = 50;
    let cutoff = limit / 2;
    if s.len() <= threshold {
        format!("0x{}", s)
    } else {
        let start = &s[..cutoff];
        let end = &s[s.len() - (limit - cutoff)..];
        format!("<bytes({}):0x{}..{}>", s.len(), start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::hexf;
    use std::fmt;

    struct Hex(Vec<u8>);

    impl fmt::Display for Hex {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            hexf(&self.0, f)
        }
    }

    #[test]
    fn short_values_are_printed_whole() {
        assert_eq!(Hex(vec![0xde, 0xad, 0xbe, 0xef]).to_string(), "0xdeadbeef");
    }

    #[test]
    fn long_values_are_truncated() {
        let printed = Hex(vec![0xab; 64]).to_string();
        assert!(printed.starts_with("<bytes(128):0xabab"));
        assert!(printed.ends_with("abab>"));
    }
}
