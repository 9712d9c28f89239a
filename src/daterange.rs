use chrono::{Days, NaiveDate};

/// Maximum gap (in days) between two dates that still belong to the same
/// query window.
const MAX_GAP_DAYS: u64 = 3;

/// An inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Group a set of dates into contiguous ranges, merging across gaps of at
/// most three days. Used to scope the vendor's POD search to a few windows
/// instead of one query per create date.
///
/// Ranges come back ascending and non-overlapping; duplicates in the input
/// are collapsed first.
pub fn cluster(dates: &[NaiveDate]) -> Vec<DateRange> {
    let mut sorted: Vec<NaiveDate> = dates.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut ranges = Vec::new();
    let mut current: Option<DateRange> = None;

    for date in sorted {
        match current {
            None => {
                current = Some(DateRange {
                    start: date,
                    end: date,
                });
            }
            Some(range) if date <= range.end + Days::new(MAX_GAP_DAYS) => {
                current = Some(DateRange {
                    start: range.start,
                    end: date,
                });
            }
            Some(range) => {
                ranges.push(range);
                current = Some(DateRange {
                    start: date,
                    end: date,
                });
            }
        }
    }

    if let Some(range) = current {
        ranges.push(range);
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn empty_input_yields_no_ranges() {
        assert!(cluster(&[]).is_empty());
    }

    #[test]
    fn single_date_yields_degenerate_range() {
        let ranges = cluster(&[d(1, 15)]);
        assert_eq!(
            ranges,
            vec![DateRange {
                start: d(1, 15),
                end: d(1, 15)
            }]
        );
    }

    #[test]
    fn three_day_gap_merges_four_day_gap_splits() {
        // 1/2 -> 1/5 is a 3-day gap: same range
        let merged = cluster(&[d(1, 2), d(1, 5)]);
        assert_eq!(
            merged,
            vec![DateRange {
                start: d(1, 2),
                end: d(1, 5)
            }]
        );

        // 1/2 -> 1/6 is a 4-day gap: split
        let split = cluster(&[d(1, 2), d(1, 6)]);
        assert_eq!(
            split,
            vec![
                DateRange {
                    start: d(1, 2),
                    end: d(1, 2)
                },
                DateRange {
                    start: d(1, 6),
                    end: d(1, 6)
                },
            ]
        );
    }

    #[test]
    fn mixed_dates_cluster_and_cover_input() {
        let input = [d(1, 10), d(1, 1), d(1, 2), d(1, 5), d(1, 2)];
        let ranges = cluster(&input);
        assert_eq!(
            ranges,
            vec![
                DateRange {
                    start: d(1, 1),
                    end: d(1, 5)
                },
                DateRange {
                    start: d(1, 10),
                    end: d(1, 10)
                },
            ]
        );

        // Every distinct input date is covered by exactly one range
        for date in input {
            let covering = ranges
                .iter()
                .filter(|r| r.start <= date && date <= r.end)
                .count();
            assert_eq!(covering, 1, "{date} should be covered once");
        }

        // Ranges are sorted and non-overlapping
        for pair in ranges.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn adjacent_dates_share_a_range_iff_gap_within_limit() {
        let input = [d(3, 1), d(3, 4), d(3, 9), d(3, 10)];
        let ranges = cluster(&input);
        assert_eq!(
            ranges,
            vec![
                DateRange {
                    start: d(3, 1),
                    end: d(3, 4)
                },
                DateRange {
                    start: d(3, 9),
                    end: d(3, 10)
                },
            ]
        );
    }
}
