//! Column detection. Two-column scientific layouts show a bimodal word
//! x-center distribution with a wide vertical gutter between the modes; we
//! split at the largest gap when it is wide and roughly centered.

use crate::config::NormalizerConfig;
use crate::geometry::Word;

/// Partition a page's words into reading-order columns. Returns one vec per
/// column; a page that does not look two-column comes back as a single
/// column containing every word.
pub fn split_columns(words: &[Word], page_width: f64, config: &NormalizerConfig) -> Vec<Vec<Word>> {
    if words.len() < 8 || page_width <= 0.0 {
        return vec![words.to_vec()];
    }

    let mut centers: Vec<f64> = words.iter().map(|w| (w.x0 + w.x1) / 2.0).collect();
    centers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // Largest gap between consecutive sorted centers.
    let mut best_gap = 0.0;
    let mut split_at = 0.0;
    for pair in centers.windows(2) {
        let gap = pair[1] - pair[0];
        if gap > best_gap {
            best_gap = gap;
            split_at = (pair[0] + pair[1]) / 2.0;
        }
    }

    if best_gap < config.min_column_gap_ratio * page_width {
        return vec![words.to_vec()];
    }

    // The gutter of a true two-column layout sits near the middle of the
    // page. A gap far off-center is usually a figure or margin artifact.
    let center_ratio = split_at / page_width;
    if !(0.35..=0.65).contains(&center_ratio) {
        return vec![words.to_vec()];
    }

    let (mut left, mut right): (Vec<Word>, Vec<Word>) = (vec![], vec![]);
    for w in words {
        if (w.x0 + w.x1) / 2.0 < split_at {
            left.push(w.clone());
        } else {
            right.push(w.clone());
        }
    }

    // Each side must carry a real share of the text.
    let min_side = (words.len() as f64 * 0.25).ceil() as usize;
    if left.len() < min_side || right.len() < min_side {
        return vec![words.to_vec()];
    }

    vec![left, right]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(x0: f64, top: f64) -> Word {
        Word {
            text: "w".into(),
            x0,
            x1: x0 + 40.0,
            top,
            bottom: top + 10.0,
        }
    }

    fn two_column_words() -> Vec<Word> {
        let mut words = vec![];
        for i in 0..10 {
            words.push(word(100.0, 50.0 + i as f64 * 14.0));
            words.push(word(400.0, 50.0 + i as f64 * 14.0));
        }
        words
    }

    #[test]
    fn detects_central_gutter() {
        let cols = split_columns(&two_column_words(), 600.0, &NormalizerConfig::default());
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].len(), 10);
        assert_eq!(cols[1].len(), 10);
    }

    #[test]
    fn narrow_gap_keeps_one_column() {
        let mut words = vec![];
        for i in 0..10 {
            words.push(word(100.0 + (i % 3) as f64 * 45.0, 50.0 + i as f64 * 14.0));
        }
        let cols = split_columns(&words, 600.0, &NormalizerConfig::default());
        assert_eq!(cols.len(), 1);
    }

    #[test]
    fn off_center_gap_keeps_one_column() {
        // Wide gap, but its midpoint sits at a third of the page width,
        // outside the accepted gutter band.
        let mut words = vec![];
        for i in 0..6 {
            words.push(word(30.0, 50.0 + i as f64 * 14.0));
        }
        for i in 0..12 {
            words.push(word(330.0 + (i % 4) as f64 * 30.0, 50.0 + i as f64 * 14.0));
        }
        let cols = split_columns(&words, 600.0, &NormalizerConfig::default());
        assert_eq!(cols.len(), 1);
    }

    #[test]
    fn lopsided_split_keeps_one_column() {
        // Central-ish gap but one side holds almost nothing.
        let mut words = vec![];
        for i in 0..20 {
            words.push(word(100.0, 50.0 + i as f64 * 14.0));
        }
        words.push(word(420.0, 50.0));
        words.push(word(420.0, 64.0));
        let cols = split_columns(&words, 600.0, &NormalizerConfig::default());
        assert_eq!(cols.len(), 1);
    }

    #[test]
    fn tiny_pages_are_not_split() {
        let words: Vec<Word> = two_column_words().into_iter().take(4).collect();
        let cols = split_columns(&words, 600.0, &NormalizerConfig::default());
        assert_eq!(cols.len(), 1);
    }
}
