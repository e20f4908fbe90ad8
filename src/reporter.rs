use bstr::ByteSlice;

use crate::parser::{ContentSignal, LineMetadata, RequestRate, RobotsParseHandler};

/// A passive [`RobotsParseHandler`] that collects per-line metadata and
/// document-level statistics instead of making fetch decisions.
///
/// Useful for linting a `robots.txt` body: which lines carried
/// directives, which were truncated or mis-spelled, how many keys were
/// unknown, and which sitemaps were announced.
///
/// ```rust
/// use repkit::{parse_robotstxt, LineMetadataReporter};
///
/// let body = b"user-agent: FooBot\ndisalow: /private\nsitemap: https://example.com/s.xml\n";
/// let mut reporter = LineMetadataReporter::default();
/// parse_robotstxt(body, &mut reporter);
///
/// assert_eq!(reporter.last_line_seen(), 3);
/// assert_eq!(reporter.valid_directives(), 3);
/// assert!(reporter.lines()[1].1.is_acceptable_typo);
/// assert_eq!(reporter.sitemaps(), ["https://example.com/s.xml"]);
/// ```
#[derive(Debug, Default)]
pub struct LineMetadataReporter {
    lines: Vec<(u32, LineMetadata)>,
    last_line_seen: u32,
    valid_directives: u32,
    unknown_directives: u32,
    sitemaps: Vec<String>,
}

impl LineMetadataReporter {
    /// Per-line metadata in source order, paired with line numbers.
    pub fn lines(&self) -> &[(u32, LineMetadata)] {
        &self.lines
    }

    /// Number of the last line emitted by the parser.
    pub fn last_line_seen(&self) -> u32 {
        self.last_line_seen
    }

    /// Count of lines that produced a recognized directive callback.
    pub fn valid_directives(&self) -> u32 {
        self.valid_directives
    }

    /// Count of lines whose key no known directive matched.
    pub fn unknown_directives(&self) -> u32 {
        self.unknown_directives
    }

    /// Sitemap URLs in source order, lossily decoded.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    fn digest(&mut self, line_num: u32) {
        self.last_line_seen = line_num;
        self.valid_directives += 1;
    }
}

impl RobotsParseHandler for LineMetadataReporter {
    fn handle_robots_start(&mut self) {
        self.lines.clear();
        self.last_line_seen = 0;
        self.valid_directives = 0;
        self.unknown_directives = 0;
        self.sitemaps.clear();
    }

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, line_num: u32, _value: &[u8]) {
        self.digest(line_num);
    }

    fn handle_allow(&mut self, line_num: u32, _value: &[u8]) {
        self.digest(line_num);
    }

    fn handle_disallow(&mut self, line_num: u32, _value: &[u8]) {
        self.digest(line_num);
    }

    fn handle_sitemap(&mut self, line_num: u32, value: &[u8]) {
        self.digest(line_num);
        self.sitemaps.push(value.to_str_lossy().into_owned());
    }

    fn handle_crawl_delay(&mut self, line_num: u32, _delay: f64) {
        self.digest(line_num);
    }

    fn handle_request_rate(&mut self, line_num: u32, _rate: RequestRate) {
        self.digest(line_num);
    }

    fn handle_content_signal(&mut self, line_num: u32, _signal: ContentSignal) {
        self.digest(line_num);
    }

    fn handle_unknown_action(&mut self, line_num: u32, _action: &[u8], _value: &[u8]) {
        self.last_line_seen = line_num;
        self.unknown_directives += 1;
    }

    fn report_line_metadata(&mut self, line_num: u32, metadata: &LineMetadata) {
        self.last_line_seen = line_num;
        self.lines.push((line_num, *metadata));
    }
}
