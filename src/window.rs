//! Sequence-window policy
//!
//! The backend model only accepts a fixed set of input sequence lengths.
//! These functions map an arbitrary requested width onto that catalog.

/// Supported sequence lengths (in base pairs) and their display labels,
/// strictly increasing.
pub const SEQUENCE_LENGTHS: [(u64, &str); 4] = [
    (16_384, "16KB"),
    (131_072, "128KB"),
    (524_288, "512KB"),
    (1_048_576, "1MB"),
];

/// All supported window widths, smallest first
pub fn catalog() -> impl Iterator<Item = u64> {
    SEQUENCE_LENGTHS.iter().map(|(width, _)| *width)
}

/// The smallest supported window
pub fn smallest_window() -> u64 {
    SEQUENCE_LENGTHS[0].0
}

/// The largest supported window
pub fn largest_window() -> u64 {
    SEQUENCE_LENGTHS[SEQUENCE_LENGTHS.len() - 1].0
}

/// Select the smallest supported window that contains `requested_width`
///
/// Widths larger than the largest window are clamped to it.
pub fn select_window(requested_width: u64) -> u64 {
    catalog()
        .find(|&width| requested_width <= width)
        .unwrap_or_else(largest_window)
}

/// Human-readable label for a window width (e.g. "128KB"), or `"{width}bp"`
/// for widths outside the catalog
pub fn label_for(width: u64) -> String {
    SEQUENCE_LENGTHS
        .iter()
        .find(|(w, _)| *w == width)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("{}bp", width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 16_384)]
    #[case(16_384, 16_384)]
    #[case(16_385, 131_072)]
    #[case(100_000, 131_072)]
    #[case(500_000, 524_288)]
    #[case(524_289, 1_048_576)]
    #[case(1_048_576, 1_048_576)]
    #[case(2_000_000, 1_048_576)]
    fn test_select_window(#[case] requested: u64, #[case] expected: u64) {
        assert_eq!(select_window(requested), expected);
    }

    #[test]
    fn test_label_for_catalog_widths() {
        assert_eq!(label_for(16_384), "16KB");
        assert_eq!(label_for(131_072), "128KB");
        assert_eq!(label_for(524_288), "512KB");
        assert_eq!(label_for(1_048_576), "1MB");
    }

    #[test]
    fn test_label_for_fallback() {
        assert_eq!(label_for(1000), "1000bp");
        assert_eq!(label_for(16_383), "16383bp");
    }

    #[test]
    fn test_catalog_strictly_increasing() {
        let widths: Vec<u64> = catalog().collect();
        assert!(widths.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(smallest_window(), 16_384);
        assert_eq!(largest_window(), 1_048_576);
    }

    proptest! {
        #[test]
        fn prop_select_window_smallest_containing(requested in 0u64..3_000_000) {
            let selected = select_window(requested);
            prop_assert!(catalog().any(|w| w == selected));
            if requested <= largest_window() {
                prop_assert!(selected >= requested);
                prop_assert!(catalog().filter(|&w| w < selected).all(|w| w < requested));
            } else {
                prop_assert_eq!(selected, largest_window());
            }
        }

        #[test]
        fn prop_select_window_monotonic(a in 0u64..3_000_000, b in 0u64..3_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(select_window(lo) <= select_window(hi));
        }
    }
}
