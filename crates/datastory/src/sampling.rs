//! Deterministic, evenly spaced downsampling.
//!
//! Used twice per upload: once for the stored sample that charts render from
//! and once to bound the rows embedded in the LLM prompt.

/// Select `min(rows.len(), max)` rows spread evenly by position.
///
/// The first and last rows are always kept when the input is longer than
/// `max`. Indices are `round(i * step)` with `step = (len - 1) / (max - 1)`;
/// duplicates are possible when `max` is close to `len` and are kept.
pub fn downsample_evenly<T: Clone>(rows: &[T], max: usize) -> Vec<T> {
    if rows.len() <= max {
        return rows.to_vec();
    }
    match max {
        0 => Vec::new(),
        1 => rows[..1].to_vec(),
        _ => {
            let last = rows.len() - 1;
            let step = last as f64 / (max - 1) as f64;
            (0..max)
                .map(|i| {
                    let idx = ((i as f64) * step).round() as usize;
                    rows[idx.min(last)].clone()
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_unchanged() {
        let rows = vec![3, 1, 2];
        assert_eq!(downsample_evenly(&rows, 3), rows);
        assert_eq!(downsample_evenly(&rows, 10), rows);
    }

    #[test]
    fn test_keeps_endpoints_and_size() {
        for len in [11usize, 57, 1000, 12345] {
            for max in [2usize, 3, 10, 60] {
                if len <= max {
                    continue;
                }
                let rows: Vec<usize> = (0..len).collect();
                let sample = downsample_evenly(&rows, max);
                assert_eq!(sample.len(), max);
                assert_eq!(sample[0], 0);
                assert_eq!(sample[max - 1], len - 1);
            }
        }
    }

    #[test]
    fn test_evenly_spaced() {
        let rows: Vec<usize> = (0..101).collect();
        assert_eq!(downsample_evenly(&rows, 5), vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn test_deterministic() {
        let rows: Vec<usize> = (0..999).collect();
        assert_eq!(downsample_evenly(&rows, 60), downsample_evenly(&rows, 60));
    }

    #[test]
    fn test_degenerate_max() {
        let rows = vec![1, 2, 3];
        assert!(downsample_evenly(&rows, 0).is_empty());
        assert_eq!(downsample_evenly(&rows, 1), vec![1]);
        assert!(downsample_evenly::<i32>(&[], 5).is_empty());
    }

    #[test]
    fn test_step_of_three() {
        let rows: Vec<usize> = (0..10).collect();
        assert_eq!(downsample_evenly(&rows, 4), vec![0, 3, 6, 9]);
    }
}
