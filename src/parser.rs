use std::borrow::Cow;

use bstr::ByteSlice;

use nom::bytes::complete::{tag, take_while};
use nom::combinator::opt;
use nom::IResult;

use percent_encoding::percent_encode_byte;

/// Maximum length of a logical line in bytes. Longer lines are truncated
/// at this bound and flagged via [`LineMetadata::is_line_too_long`].
///
/// Derived from the common 2083-byte browser URL limit, with room for
/// every byte of the URL to be percent-encoded several times over.
pub const MAX_LINE_LEN: usize = 2083 * 8;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// A parsed `Request-rate` directive: at most `requests` requests per
/// `seconds` seconds. Both fields are always positive; directives that
/// fail to parse to positive numbers are dropped by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRate {
    pub requests: u32,
    pub seconds: u32,
}

/// A parsed `Content-Signal` directive.
///
/// Each field is a tri-state: `None` when the signal was not present (or
/// its value was unrecognized), otherwise the parsed boolean. Unknown
/// signal names are skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContentSignal {
    pub ai_train: Option<bool>,
    pub ai_input: Option<bool>,
    pub search: Option<bool>,
}

/// Lexical metadata for a single line of `robots.txt`.
///
/// Every line receives a metadata record, whether or not it carried a
/// directive, via [`RobotsParseHandler::report_line_metadata`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineMetadata {
    /// Line is empty after comment stripping and whitespace trimming.
    pub is_empty: bool,
    /// A `#` comment appeared somewhere on the line.
    pub has_comment: bool,
    /// The line consists of nothing but a comment.
    pub is_comment: bool,
    /// A key/value pair was extracted and a handler callback considered.
    pub has_directive: bool,
    /// The key matched a well-known misspelling (e.g. `disalow`).
    pub is_acceptable_typo: bool,
    /// The line exceeded [`MAX_LINE_LEN`] and was truncated.
    pub is_line_too_long: bool,
    /// Whitespace stood in for the missing `:` separator.
    pub is_missing_colon_separator: bool,
}

/// Handler for directives found in `robots.txt`.
///
/// The parser does not own its consumer: implement this trait to receive
/// one callback per recognized directive, bracketed by
/// [`handle_robots_start`](RobotsParseHandler::handle_robots_start) and
/// [`handle_robots_end`](RobotsParseHandler::handle_robots_end). Values
/// are byte slices borrowed from the input (or from a small
/// normalization buffer when escaping changed them) and are only valid
/// for the duration of the callback.
pub trait RobotsParseHandler {
    fn handle_robots_start(&mut self);
    fn handle_robots_end(&mut self);
    fn handle_user_agent(&mut self, line_num: u32, value: &[u8]);
    fn handle_allow(&mut self, line_num: u32, value: &[u8]);
    fn handle_disallow(&mut self, line_num: u32, value: &[u8]);
    fn handle_sitemap(&mut self, line_num: u32, value: &[u8]);
    /// `Crawl-delay` with the delay already parsed; unparseable or
    /// negative values arrive as `0.0`.
    fn handle_crawl_delay(&mut self, line_num: u32, delay: f64);
    /// `Request-rate` with a valid positive rate; malformed directives
    /// never reach the handler.
    fn handle_request_rate(&mut self, line_num: u32, rate: RequestRate);
    fn handle_content_signal(&mut self, line_num: u32, signal: ContentSignal);
    /// Any other name/value pair, with the original key text preserved.
    fn handle_unknown_action(&mut self, line_num: u32, action: &[u8], value: &[u8]);
    /// Lexical metadata for every line, directive-bearing or not.
    fn report_line_metadata(&mut self, line_num: u32, metadata: &LineMetadata) {
        let _ = (line_num, metadata);
    }
}

/// The directive kind a key classifies as. Unparsable keys keep their
/// original text.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ParseKeyKind<'a> {
    UserAgent,
    Allow,
    Disallow,
    Sitemap,
    CrawlDelay,
    RequestRate,
    ContentSignal,
    Unknown(&'a [u8]),
}

fn starts_with_ignore_case(key: &[u8], target: &str) -> bool {
    let target = target.as_bytes();
    key.len() >= target.len() && key[..target.len()].eq_ignore_ascii_case(target)
}

/// Matches `key` against the canonical spellings and the accepted
/// misspellings. Returns `Some(is_typo)` on a hit.
///
/// Matching is prefix-based to mirror the behavior webmasters rely on:
/// `disallowed-paths` still counts as `disallow`.
fn validate_key(key: &[u8], targets: &[&str], typo_targets: &[&str]) -> Option<bool> {
    if targets.iter().any(|t| starts_with_ignore_case(key, t)) {
        return Some(false);
    }
    if typo_targets.iter().any(|t| starts_with_ignore_case(key, t)) {
        return Some(true);
    }
    None
}

/// Classifies a whitespace-stripped key token, reporting whether the
/// match went through the typo list.
pub(crate) fn classify_key(key: &[u8]) -> (ParseKeyKind<'_>, bool) {
    if let Some(typo) = validate_key(key, &["user-agent"], &["useragent", "user agent"]) {
        (ParseKeyKind::UserAgent, typo)
    } else if let Some(typo) = validate_key(key, &["allow"], &[]) {
        (ParseKeyKind::Allow, typo)
    } else if let Some(typo) = validate_key(
        key,
        &["disallow"],
        &["dissallow", "dissalow", "disalow", "diasllow", "disallaw"],
    ) {
        (ParseKeyKind::Disallow, typo)
    } else if let Some(typo) = validate_key(key, &["sitemap"], &["site-map"]) {
        (ParseKeyKind::Sitemap, typo)
    } else if let Some(typo) = validate_key(key, &["crawl-delay"], &["crawldelay", "crawl delay"]) {
        (ParseKeyKind::CrawlDelay, typo)
    } else if let Some(typo) = validate_key(key, &["request-rate"], &[]) {
        (ParseKeyKind::RequestRate, typo)
    } else if let Some(typo) =
        validate_key(key, &["content-signal"], &["contentsignal", "content signal"])
    {
        (ParseKeyKind::ContentSignal, typo)
    } else {
        (ParseKeyKind::Unknown(key), false)
    }
}

fn needs_escape(value: &[u8]) -> bool {
    let mut i = 0;
    while i < value.len() {
        let b = value[i];
        if b >= 0x80 {
            return true;
        }
        if b == b'%'
            && i + 2 < value.len()
            && value[i + 1].is_ascii_hexdigit()
            && value[i + 2].is_ascii_hexdigit()
        {
            if value[i + 1].is_ascii_lowercase() || value[i + 2].is_ascii_lowercase() {
                return true;
            }
            i += 3;
            continue;
        }
        i += 1;
    }
    false
}

/// Canonicalizes an allow/disallow path pattern: hex digits of existing
/// `%HH` escapes are uppercased and bytes outside the ASCII range are
/// percent-encoded.
///
/// For example `/SanJoséSellers` becomes `/SanJos%C3%A9Sellers` and
/// `%aa` becomes `%AA`. An already adequately escaped pattern is passed
/// through unchanged, without allocating.
pub(crate) fn maybe_escape_pattern(value: &[u8]) -> Cow<'_, [u8]> {
    if !needs_escape(value) {
        return Cow::Borrowed(value);
    }
    let mut escaped = Vec::with_capacity(value.len() + 8);
    let mut i = 0;
    while i < value.len() {
        let b = value[i];
        if b == b'%'
            && i + 2 < value.len()
            && value[i + 1].is_ascii_hexdigit()
            && value[i + 2].is_ascii_hexdigit()
        {
            escaped.push(b'%');
            escaped.push(value[i + 1].to_ascii_uppercase());
            escaped.push(value[i + 2].to_ascii_uppercase());
            i += 3;
        } else if b >= 0x80 {
            escaped.extend_from_slice(percent_encode_byte(b).as_bytes());
            i += 1;
        } else {
            escaped.push(b);
            i += 1;
        }
    }
    Cow::Owned(escaped)
}

fn parse_crawl_delay(value: &[u8]) -> f64 {
    std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|delay| *delay >= 0.0)
        .unwrap_or(0.0)
}

/// Parses `"R/S"`, `"R/Ss"`, or a bare `"R"` (one-second window).
/// Returns `None` when either number is missing, malformed, or zero.
fn parse_request_rate(value: &[u8]) -> Option<RequestRate> {
    let value = std::str::from_utf8(value).ok()?;
    let (requests, seconds) = match value.split_once('/') {
        Some((requests, seconds)) => {
            let seconds = seconds.trim();
            let seconds = seconds
                .strip_suffix('s')
                .or_else(|| seconds.strip_suffix('S'))
                .unwrap_or(seconds);
            (requests.trim(), seconds)
        }
        None => (value.trim(), "1"),
    };
    let requests: u32 = requests.parse().ok()?;
    let seconds: u32 = seconds.parse().ok()?;
    if requests == 0 || seconds == 0 {
        return None;
    }
    Some(RequestRate { requests, seconds })
}

fn parse_content_signal(value: &[u8]) -> ContentSignal {
    let mut signal = ContentSignal::default();
    for entry in value.split(|&b| b == b',') {
        let (key, raw) = match entry.find_byte(b'=') {
            Some(eq) => (entry[..eq].trim(), entry[eq + 1..].trim()),
            None => continue,
        };
        let parsed = if raw.eq_ignore_ascii_case(b"yes")
            || raw.eq_ignore_ascii_case(b"true")
            || raw.eq_ignore_ascii_case(b"1")
        {
            Some(true)
        } else if raw.eq_ignore_ascii_case(b"no")
            || raw.eq_ignore_ascii_case(b"false")
            || raw.eq_ignore_ascii_case(b"0")
        {
            Some(false)
        } else {
            continue;
        };
        if key.eq_ignore_ascii_case(b"ai-train") {
            signal.ai_train = parsed;
        } else if key.eq_ignore_ascii_case(b"ai-input") {
            signal.ai_input = parsed;
        } else if key.eq_ignore_ascii_case(b"search") {
            signal.search = parsed;
        }
    }
    signal
}

fn not_line_ending(c: u8) -> bool {
    c != b'\n' && c != b'\r'
}

/// Consumes one logical line and its terminator. `LF`, `CR`, and `CRLF`
/// all end a line; a `CR` directly followed by `LF` is a single ending.
fn take_line(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, line) = take_while(not_line_ending)(input)?;
    let (input, _) = opt(tag(b"\r"))(input)?;
    let (input, _) = opt(tag(b"\n"))(input)?;
    Ok((input, line))
}

/// Strips a leading UTF-8 byte order mark, full or partial. Only the
/// bytes that actually match the `EF BB BF` prefix are skipped, so a
/// corrupted mark such as `EF 11 BF` keeps everything after `EF`.
fn strip_bom(body: &[u8]) -> &[u8] {
    let matched = body.iter().zip(UTF8_BOM).take_while(|(a, b)| a == b).count();
    &body[matched..]
}

fn split_key_value<'a>(
    line: &'a [u8],
    metadata: &mut LineMetadata,
) -> Option<(&'a [u8], &'a [u8])> {
    if let Some(sep) = line.find_byte(b':') {
        let key = line[..sep].trim_end();
        if key.is_empty() {
            return None;
        }
        Some((key, line[sep + 1..].trim_start()))
    } else {
        // No colon: accept whitespace as the separator, but only for
        // lines that split into exactly two tokens.
        let mut tokens = line
            .split(|&b| b == b' ' || b == b'\t')
            .filter(|token| !token.is_empty());
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(key), Some(value), None) => {
                metadata.is_missing_colon_separator = true;
                Some((key, value))
            }
            _ => None,
        }
    }
}

fn parse_and_emit_line<H: RobotsParseHandler>(line_num: u32, raw: &[u8], handler: &mut H) {
    let mut metadata = LineMetadata::default();
    let mut line = raw;
    if line.len() > MAX_LINE_LEN {
        metadata.is_line_too_long = true;
        line = &line[..MAX_LINE_LEN];
    }
    let line = match line.find_byte(b'#') {
        Some(comment) => {
            metadata.has_comment = true;
            &line[..comment]
        }
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        if metadata.has_comment {
            metadata.is_comment = true;
        } else {
            metadata.is_empty = true;
        }
        handler.report_line_metadata(line_num, &metadata);
        return;
    }
    let (key, value) = match split_key_value(line, &mut metadata) {
        Some(pair) => pair,
        None => {
            handler.report_line_metadata(line_num, &metadata);
            return;
        }
    };
    metadata.has_directive = true;
    let (kind, is_typo) = classify_key(key);
    metadata.is_acceptable_typo = is_typo;
    match kind {
        ParseKeyKind::UserAgent => handler.handle_user_agent(line_num, value),
        ParseKeyKind::Allow => handler.handle_allow(line_num, &maybe_escape_pattern(value)),
        ParseKeyKind::Disallow => handler.handle_disallow(line_num, &maybe_escape_pattern(value)),
        ParseKeyKind::Sitemap => handler.handle_sitemap(line_num, value),
        ParseKeyKind::CrawlDelay => handler.handle_crawl_delay(line_num, parse_crawl_delay(value)),
        ParseKeyKind::RequestRate => {
            if let Some(rate) = parse_request_rate(value) {
                handler.handle_request_rate(line_num, rate);
            }
        }
        ParseKeyKind::ContentSignal => {
            handler.handle_content_signal(line_num, parse_content_signal(value))
        }
        ParseKeyKind::Unknown(action) => {
            handler.handle_unknown_action(line_num, action, &maybe_escape_pattern(value))
        }
    }
    handler.report_line_metadata(line_num, &metadata);
}

/// Drives `handler` over the raw bytes of a `robots.txt` body.
///
/// The body is treated as opaque bytes rather than UTF-8 text; a leading
/// byte order mark is skipped, lines are split on any of `LF`, `CR`, or
/// `CRLF`, and the final line is emitted whether or not the input ends
/// with a terminator. Parsing never fails: malformed lines degrade to
/// metadata-only reports.
pub fn parse_robotstxt<H: RobotsParseHandler>(body: &[u8], handler: &mut H) {
    handler.handle_robots_start();
    let mut input = strip_bom(body);
    let mut line_num: u32 = 0;
    while !input.is_empty() {
        line_num += 1;
        match take_line(input) {
            Ok((rest, line)) => {
                parse_and_emit_line(line_num, line, handler);
                input = rest;
            }
            Err(_) => break,
        }
    }
    handler.handle_robots_end();
}
