//! Tests for per-year crop history writes
//! Verifies that a field carries at most one crop entry per year and that
//! later writes for the same year overwrite rather than append.

use shared::{apply_crop_write, clean_varieties, CropHistoryEntry};

mod crop_history {
    use super::*;

    #[test]
    fn writes_for_distinct_years_accumulate() {
        let mut history = vec![];
        apply_crop_write(&mut history, 2024, "soy", "");
        apply_crop_write(&mut history, 2025, "wheat", "norin 61");
        apply_crop_write(&mut history, 2026, "rice", "koshihikari");

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].year, 2024);
        assert_eq!(history[2].crop, "rice");
    }

    #[test]
    fn same_year_write_overwrites_in_place() {
        let mut history = vec![CropHistoryEntry::new(2026, "rice", "koshihikari")];
        apply_crop_write(&mut history, 2026, "wheat", "norin 61");

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].crop, "wheat");
        assert_eq!(history[0].variety, "norin 61");
    }

    #[test]
    fn blank_variety_keeps_previous_variety_for_that_year() {
        let mut history = vec![CropHistoryEntry::new(2026, "rice", "koshihikari")];
        apply_crop_write(&mut history, 2026, "rice", "");

        assert_eq!(history[0].variety, "koshihikari");
    }

    #[test]
    fn year_uniqueness_holds_across_repeated_writes() {
        let mut history = vec![];
        for crop in ["rice", "wheat", "soy", "rice"] {
            apply_crop_write(&mut history, 2026, crop, "");
        }
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].crop, "rice");
    }
}

mod varieties {
    use super::*;

    #[test]
    fn cleaning_trims_and_drops_blanks() {
        let raw = vec![
            "  koshihikari ".to_string(),
            "".to_string(),
            "   ".to_string(),
            "norin 61".to_string(),
        ];
        assert_eq!(clean_varieties(&raw), vec!["koshihikari", "norin 61"]);
    }
}
