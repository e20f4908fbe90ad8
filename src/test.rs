use bstr::ByteSlice;

use crate::parser::{
    classify_key, parse_robotstxt, ContentSignal, LineMetadata, ParseKeyKind, RequestRate,
    RobotsParseHandler, MAX_LINE_LEN,
};

/// Records every callback as a formatted string, plus the per-line
/// metadata, so scanner behavior can be asserted wholesale.
#[derive(Default)]
struct EventLog {
    events: Vec<String>,
    metadata: Vec<(u32, LineMetadata)>,
}

impl EventLog {
    fn parse(body: &[u8]) -> Self {
        let mut log = EventLog::default();
        parse_robotstxt(body, &mut log);
        log
    }

    fn meta(&self, line_num: u32) -> LineMetadata {
        self.metadata
            .iter()
            .find(|(line, _)| *line == line_num)
            .map(|(_, m)| *m)
            .unwrap()
    }
}

impl RobotsParseHandler for EventLog {
    fn handle_robots_start(&mut self) {
        self.events.push("start".to_string());
    }

    fn handle_robots_end(&mut self) {
        self.events.push("end".to_string());
    }

    fn handle_user_agent(&mut self, line_num: u32, value: &[u8]) {
        self.events.push(format!("{} user-agent: {}", line_num, value.as_bstr()));
    }

    fn handle_allow(&mut self, line_num: u32, value: &[u8]) {
        self.events.push(format!("{} allow: {}", line_num, value.as_bstr()));
    }

    fn handle_disallow(&mut self, line_num: u32, value: &[u8]) {
        self.events.push(format!("{} disallow: {}", line_num, value.as_bstr()));
    }

    fn handle_sitemap(&mut self, line_num: u32, value: &[u8]) {
        self.events.push(format!("{} sitemap: {}", line_num, value.as_bstr()));
    }

    fn handle_crawl_delay(&mut self, line_num: u32, delay: f64) {
        self.events.push(format!("{} crawl-delay: {}", line_num, delay));
    }

    fn handle_request_rate(&mut self, line_num: u32, rate: RequestRate) {
        self.events.push(format!(
            "{} request-rate: {}/{}",
            line_num, rate.requests, rate.seconds
        ));
    }

    fn handle_content_signal(&mut self, line_num: u32, signal: ContentSignal) {
        self.events.push(format!(
            "{} content-signal: {:?} {:?} {:?}",
            line_num, signal.ai_train, signal.ai_input, signal.search
        ));
    }

    fn handle_unknown_action(&mut self, line_num: u32, action: &[u8], value: &[u8]) {
        self.events.push(format!(
            "{} unknown {}: {}",
            line_num,
            action.as_bstr(),
            value.as_bstr()
        ));
    }

    fn report_line_metadata(&mut self, line_num: u32, metadata: &LineMetadata) {
        self.metadata.push((line_num, *metadata));
    }
}

#[test]
fn basic_directives_and_line_numbers() {
    let log = EventLog::parse(
        b"user-agent: FooBot\n\
          disallow: /private\n\
          allow: /private/exception\n\
          sitemap: https://example.com/sitemap.xml\n",
    );
    assert_eq!(
        log.events,
        [
            "start",
            "1 user-agent: FooBot",
            "2 disallow: /private",
            "3 allow: /private/exception",
            "4 sitemap: https://example.com/sitemap.xml",
            "end",
        ]
    );
}

#[test]
fn line_endings_are_equivalent() {
    let unix = EventLog::parse(b"user-agent: FooBot\ndisallow: /a\n\nallow: /a/b\n");
    let dos = EventLog::parse(b"user-agent: FooBot\r\ndisallow: /a\r\n\r\nallow: /a/b\r\n");
    let mac = EventLog::parse(b"user-agent: FooBot\rdisallow: /a\r\rallow: /a/b\r");
    let mixed = EventLog::parse(b"user-agent: FooBot\ndisallow: /a\r\n\rallow: /a/b");

    assert_eq!(unix.events, dos.events);
    assert_eq!(unix.events, mac.events);
    assert_eq!(unix.events, mixed.events);
    assert_eq!(unix.metadata, dos.metadata);
    assert_eq!(unix.metadata, mac.metadata);
    assert_eq!(unix.metadata, mixed.metadata);
}

#[test]
fn utf8_bom_is_skipped() {
    let log = EventLog::parse(b"\xef\xbb\xbfuser-agent: FooBot\n");
    assert_eq!(log.events, ["start", "1 user-agent: FooBot", "end"]);
}

#[test]
fn partial_bom_is_skipped() {
    let log = EventLog::parse(b"\xef\xbbuser-agent: FooBot\n");
    assert_eq!(log.events, ["start", "1 user-agent: FooBot", "end"]);

    let log = EventLog::parse(b"\xefuser-agent: FooBot\n");
    assert_eq!(log.events, ["start", "1 user-agent: FooBot", "end"]);
}

#[test]
fn broken_bom_is_line_content() {
    // Only the leading 0xEF matches the mark; the rest garbles the key.
    let log = EventLog::parse(b"\xef\x11\xbfuser-agent: FooBot\n");
    assert_eq!(log.events.len(), 3);
    assert!(log.events[1].starts_with("1 unknown"));
    assert!(log.meta(1).has_directive);
}

#[test]
fn comment_and_blank_line_metadata() {
    let log = EventLog::parse(b"# preamble\n\nuser-agent: FooBot # trailing\ndisallow: /a#frag\n");

    let m = log.meta(1);
    assert!(m.is_comment && m.has_comment && !m.is_empty && !m.has_directive);
    let m = log.meta(2);
    assert!(m.is_empty && !m.has_comment && !m.is_comment);
    let m = log.meta(3);
    assert!(m.has_comment && m.has_directive && !m.is_comment);

    // Everything from `#` is stripped, even inside a value.
    assert!(log.events.contains(&"3 user-agent: FooBot".to_string()));
    assert!(log.events.contains(&"4 disallow: /a".to_string()));
}

#[test]
fn whitespace_separator_fallback() {
    let log = EventLog::parse(b"disallow /a\nuser-agent\tFooBot\ndisallow /a /b\n");

    assert!(log.events.contains(&"1 disallow: /a".to_string()));
    assert!(log.meta(1).is_missing_colon_separator);
    assert!(log.events.contains(&"2 user-agent: FooBot".to_string()));
    assert!(log.meta(2).is_missing_colon_separator);

    // Three tokens cannot be split unambiguously; the line is dropped.
    assert!(!log.meta(3).has_directive);
    assert_eq!(log.events.len(), 4);
}

#[test]
fn empty_key_is_not_a_directive() {
    let log = EventLog::parse(b": /value\n:\n");
    assert_eq!(log.events, ["start", "end"]);
    assert!(!log.meta(1).has_directive);
    assert!(!log.meta(2).has_directive);
}

#[test]
fn acceptable_typos_classify() {
    let log = EventLog::parse(
        b"useragent: FooBot\n\
          disalow: /a\n\
          dissallow: /b\n\
          site-map: https://example.com/s.xml\n\
          crawldelay: 2\n\
          contentsignal: search=yes\n",
    );
    assert_eq!(
        log.events,
        [
            "start",
            "1 user-agent: FooBot",
            "2 disallow: /a",
            "3 disallow: /b",
            "4 sitemap: https://example.com/s.xml",
            "5 crawl-delay: 2",
            "6 content-signal: None None Some(true)",
            "end",
        ]
    );
    for line in 1..=6 {
        assert!(log.meta(line).is_acceptable_typo, "line {}", line);
        assert!(log.meta(line).has_directive, "line {}", line);
    }
}

#[test]
fn keys_match_by_prefix() {
    let log = EventLog::parse(b"disallowed-paths: /a\nUser-Agent-Here: FooBot\n");
    assert!(log.events.contains(&"1 disallow: /a".to_string()));
    assert!(log.events.contains(&"2 user-agent: FooBot".to_string()));
    assert!(!log.meta(1).is_acceptable_typo);
}

#[test]
fn classify_key_directly() {
    assert_eq!(classify_key(b"Allow"), (ParseKeyKind::Allow, false));
    assert_eq!(classify_key(b"DISALLOW"), (ParseKeyKind::Disallow, false));
    assert_eq!(classify_key(b"diasllow"), (ParseKeyKind::Disallow, true));
    assert_eq!(classify_key(b"User Agent"), (ParseKeyKind::UserAgent, true));
    assert_eq!(classify_key(b"Sitemap"), (ParseKeyKind::Sitemap, false));
    assert_eq!(classify_key(b"request-rate"), (ParseKeyKind::RequestRate, false));
    assert_eq!(classify_key(b"Content-Signal"), (ParseKeyKind::ContentSignal, false));
    assert_eq!(classify_key(b"crawl delay"), (ParseKeyKind::CrawlDelay, true));
    assert_eq!(
        classify_key(b"refresh-rate"),
        (ParseKeyKind::Unknown(b"refresh-rate"), false)
    );
}

#[test]
fn overlong_line_is_truncated() {
    let mut line = b"disallow: /x/".to_vec();
    while line.len() < MAX_LINE_LEN + 10 {
        line.push(b'a');
    }
    line.push(b'\n');
    let mut body = b"user-agent: FooBot\n".to_vec();
    body.extend_from_slice(&line);

    let log = EventLog::parse(&body);
    assert!(!log.meta(1).is_line_too_long);
    assert!(log.meta(2).is_line_too_long);

    // The emitted pattern is cut at the cap, key included.
    let value_len = MAX_LINE_LEN - "disallow: ".len();
    let expected = format!("2 disallow: /x/{}", "a".repeat(value_len - 3));
    assert_eq!(log.events[2], expected);
}

#[test]
fn line_at_cap_is_kept_whole() {
    let mut line = b"disallow: /".to_vec();
    while line.len() < MAX_LINE_LEN {
        line.push(b'a');
    }
    line.push(b'\n');

    let log = EventLog::parse(&line);
    assert!(!log.meta(1).is_line_too_long);
    let value_len = MAX_LINE_LEN - "disallow: ".len();
    assert_eq!(log.events[1], format!("1 disallow: /{}", "a".repeat(value_len - 1)));
}

#[test]
fn patterns_are_escaped() {
    let log = EventLog::parse("allow: /Sanjos%c3%a9/park\ndisallow: /SanJosé\n".as_bytes());
    assert!(log.events.contains(&"1 allow: /Sanjos%C3%A9/park".to_string()));
    assert!(log.events.contains(&"2 disallow: /SanJos%C3%A9".to_string()));
}

#[test]
fn adequately_escaped_patterns_pass_through() {
    let log = EventLog::parse(b"allow: /a%2F*b$\n");
    assert_eq!(log.events[1], "1 allow: /a%2F*b$");
}

#[test]
fn sitemap_values_are_not_escaped() {
    let log = EventLog::parse(b"sitemap: https://example.com/%aa\n");
    assert!(log.events.contains(&"1 sitemap: https://example.com/%aa".to_string()));
}

#[test]
fn crawl_delay_parsing() {
    let log = EventLog::parse(b"crawl-delay: 4.5\ncrawl-delay: later\ncrawl-delay: -2\n");
    assert_eq!(
        log.events,
        [
            "start",
            "1 crawl-delay: 4.5",
            "2 crawl-delay: 0",
            "3 crawl-delay: 0",
            "end",
        ]
    );
}

#[test]
fn request_rate_parsing() {
    let log = EventLog::parse(
        b"request-rate: 100/24\n\
          request-rate: 9\n\
          request-rate: 1/10s\n\
          request-rate: 0/5\n\
          request-rate: sometimes\n",
    );
    assert_eq!(
        log.events,
        [
            "start",
            "1 request-rate: 100/24",
            "2 request-rate: 9/1",
            "3 request-rate: 1/10",
            "end",
        ]
    );
    // Invalid rates are dropped, but the directive itself was there.
    assert!(log.meta(4).has_directive);
    assert!(log.meta(5).has_directive);
}

#[test]
fn content_signal_parsing() {
    let log = EventLog::parse(b"content-signal: AI-Train=NO, ai-input=1, search=maybe, quality=high\n");
    assert_eq!(
        log.events,
        ["start", "1 content-signal: Some(false) Some(true) None", "end"]
    );
}

#[test]
fn empty_body_emits_no_lines() {
    let log = EventLog::parse(b"");
    assert_eq!(log.events, ["start", "end"]);
    assert!(log.metadata.is_empty());
}

#[test]
fn final_line_without_terminator() {
    let log = EventLog::parse(b"user-agent: FooBot\ndisallow: /a");
    assert!(log.events.contains(&"2 disallow: /a".to_string()));
}

#[test]
fn garbage_does_not_panic() {
    let log = EventLog::parse(b"\x00\x00allow\x00: /\xff\xfe\n%%%%%\n");
    assert_eq!(log.events.len(), 3);
    assert!(log.events[1].starts_with("1 unknown"));
    assert!(!log.meta(2).has_directive);
}
