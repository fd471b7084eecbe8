/// Tunable layout thresholds for the normalizer.
///
/// The defaults are tuned against mixed-quality journal PDFs; override them
/// through [`NormalizerConfigBuilder`] when a corpus needs different
/// geometry assumptions.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Max vertical distance (pt) between word tops merged into one line.
    pub line_merge_tolerance: f64,
    /// Min vertical gap (pt) between lines that starts a new paragraph.
    pub paragraph_gap: f64,
    /// Min inter-center gap, as a fraction of page width, to split columns.
    pub min_column_gap_ratio: f64,
    /// Fraction of one-letter tokens above which word geometry is rebuilt
    /// from character boxes.
    pub singleton_rebuild_ratio: f64,
    /// Max length of a short trailing-colon line merged into the next line.
    pub inline_heading_max_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            line_merge_tolerance: 2.5,
            paragraph_gap: 12.0,
            min_column_gap_ratio: 0.15,
            singleton_rebuild_ratio: 0.30,
            inline_heading_max_len: 80,
        }
    }
}

#[derive(Debug, Default)]
pub struct NormalizerConfigBuilder {
    line_merge_tolerance: Option<f64>,
    paragraph_gap: Option<f64>,
    min_column_gap_ratio: Option<f64>,
    singleton_rebuild_ratio: Option<f64>,
    inline_heading_max_len: Option<usize>,
}

impl NormalizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_merge_tolerance(mut self, v: f64) -> Self {
        self.line_merge_tolerance = Some(v);
        self
    }

    pub fn paragraph_gap(mut self, v: f64) -> Self {
        self.paragraph_gap = Some(v);
        self
    }

    pub fn min_column_gap_ratio(mut self, v: f64) -> Self {
        self.min_column_gap_ratio = Some(v);
        self
    }

    pub fn singleton_rebuild_ratio(mut self, v: f64) -> Self {
        self.singleton_rebuild_ratio = Some(v);
        self
    }

    pub fn inline_heading_max_len(mut self, v: usize) -> Self {
        self.inline_heading_max_len = Some(v);
        self
    }

    pub fn build(self) -> NormalizerConfig {
        let d = NormalizerConfig::default();
        NormalizerConfig {
            line_merge_tolerance: self.line_merge_tolerance.unwrap_or(d.line_merge_tolerance),
            paragraph_gap: self.paragraph_gap.unwrap_or(d.paragraph_gap),
            min_column_gap_ratio: self
                .min_column_gap_ratio
                .unwrap_or(d.min_column_gap_ratio),
            singleton_rebuild_ratio: self
                .singleton_rebuild_ratio
                .unwrap_or(d.singleton_rebuild_ratio),
            inline_heading_max_len: self
                .inline_heading_max_len
                .unwrap_or(d.inline_heading_max_len),
        }
    }
}
