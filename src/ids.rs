//! Sequential, prefix-based identifiers (`P009`, `C014`, `#0042`).

use std::collections::HashSet;

/// Returns the next free id of the form `{prefix}{n:0width$}`.
///
/// `n` starts one past the highest numeric suffix among `existing` ids with
/// the same prefix, so deleting an entity never causes its id to be reused
/// by the next insert. When the highest suffix is `u64::MAX`, the lowest
/// unused number is taken instead.
pub fn next_id<'a, I>(prefix: &str, width: usize, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<u64> = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .collect();

    let highest = taken.iter().copied().max().unwrap_or(0);
    let seq = match highest.checked_add(1) {
        Some(seq) => seq,
        None => (1..).find(|n| !taken.contains(n)).unwrap_or(highest),
    };
    format_id(prefix, width, seq)
}

/// Formats a sequence number as a zero-padded id.
pub fn format_id(prefix: &str, width: usize, seq: u64) -> String {
    format!("{prefix}{seq:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_skips_past_highest() {
        let ids = ["P001", "P008", "P003", "X999"];
        assert_eq!(next_id("P", 3, ids), "P009");
    }

    #[test]
    fn test_next_id_empty() {
        assert_eq!(next_id("C", 3, []), "C001");
    }

    #[test]
    fn test_next_id_ignores_non_numeric_suffix() {
        let ids = ["C1700000000000-0", "C002"];
        assert_eq!(next_id("C", 3, ids), "C003");
    }

    #[test]
    fn test_next_id_after_maximal_suffix() {
        let ids = ["P18446744073709551615", "P001", "P003"];
        assert_eq!(next_id("P", 3, ids), "P002");
    }

    #[test]
    fn test_format_id_pads() {
        assert_eq!(format_id("#", 4, 7), "#0007");
        assert_eq!(format_id("#", 4, 12345), "#12345");
    }
}
