use crate::{is_valid_user_agent_to_obey, RobotsMatcher};

fn allowed(body: &str, agent: &str, url: &str) -> bool {
    let mut matcher = RobotsMatcher::new();
    matcher.one_agent_allowed(body.as_bytes(), agent, url)
}

#[test]
fn disallow_all_for_named_agent() {
    let body = "user-agent: FooBot\ndisallow: /\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/x/y"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/"));
    // Anyone else is untouched.
    assert!(allowed(body, "BarBot", "http://foo.bar/x/y"));
}

#[test]
fn longest_match_wins() {
    let body = "user-agent: FooBot\nallow: /x/page.html\ndisallow: /x/\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/x/page.html"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/x/"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/x/other.html"));
}

#[test]
fn equal_priority_ties_go_to_allow() {
    let body = "user-agent: FooBot\ndisallow: /page\nallow: /page\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/page"));
}

#[test]
fn empty_disallow_allows_everything() {
    let body = "user-agent: FooBot\ndisallow:\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/"));
    assert!(allowed(body, "FooBot", "http://foo.bar/anything"));
}

#[test]
fn empty_body_allows_everything() {
    assert!(allowed("", "FooBot", "http://foo.bar/x/y"));
    assert!(allowed("", "FooBot", ""));

    let mut matcher = RobotsMatcher::new();
    assert!(matcher.allowed(b"", &["FooBot", "BarBot"], "http://foo.bar/"));
    assert_eq!(matcher.matching_line(), 0);
    assert_eq!(matcher.crawl_delay(), None);
}

#[test]
fn unmatched_agents_without_global_group_allow() {
    let body = "user-agent: BarBot\ndisallow: /\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/x/y"));
}

#[test]
fn rules_before_any_group_are_ignored() {
    let body = "disallow: /\nallow: /x\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/"));
}

#[test]
fn wildcard_rules_and_case_sensitive_paths() {
    let body = "user-agent: FooBot\ndisallow: /\nallow: /fish*.php\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/fishheads/catfish.php?parameters"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/Fish.PHP"));
}

#[test]
fn escaped_star_matches_literal_star() {
    let body = "User-agent: FooBot\nDisallow: /path/file-with-%2A.html\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/path/file-with-*.html"));
    assert!(allowed(body, "FooBot", "http://foo.bar/path/file-with-other.html"));
}

#[test]
fn percent_encoded_paths_compare_decoded() {
    let body = "user-agent: FooBot\ndisallow: /a%62c\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/abc"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/a%62c"));
    assert!(allowed(body, "FooBot", "http://foo.bar/abd"));
}

#[test]
fn end_anchor_rules() {
    let body = "user-agent: FooBot\ndisallow: /*.gif$\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/funny.gif"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/a/b/c.gif"));
    assert!(allowed(body, "FooBot", "http://foo.bar/funny.gifs"));
    assert!(allowed(body, "FooBot", "http://foo.bar/funny.gif?tracking=1"));
}

#[test]
fn agent_names_are_case_insensitive() {
    let body = "user-agent: FOOBOT\ndisallow: /\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/x"));
    assert!(!allowed(body, "foobot", "http://foo.bar/x"));
}

#[test]
fn agent_product_version_is_ignored() {
    let body = "user-agent: FooBot/2.1\ndisallow: /\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/x"));
}

#[test]
fn global_star_group() {
    let body = "user-agent: *\ndisallow: /private\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/private/x"));
    assert!(allowed(body, "FooBot", "http://foo.bar/public"));

    // `*` followed by whitespace and more characters is still global.
    let body = "user-agent: * baz\ndisallow: /private\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/private/x"));

    // `*foo` is not a global record and matches no agent either.
    let body = "user-agent: *foo\ndisallow: /private\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/private/x"));
}

#[test]
fn specific_group_shadows_global_rules() {
    let body = "user-agent: *\ndisallow: /\n\nuser-agent: FooBot\nallow: /\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/x/y"));
    assert!(!allowed(body, "BarBot", "http://foo.bar/x/y"));
}

#[test]
fn empty_specific_group_allows_by_default() {
    let body = "user-agent: *\ndisallow: /\n\nuser-agent: FooBot\n";
    let mut matcher = RobotsMatcher::new();
    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/x/y"));
    assert!(matcher.ever_seen_specific_agent());
}

#[test]
fn consecutive_agent_lines_share_a_group() {
    let body = "user-agent: BarBot\nuser-agent: FooBot\ndisallow: /secret\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/secret/x"));
    assert!(!allowed(body, "BarBot", "http://foo.bar/secret/x"));
    assert!(allowed(body, "FooBot", "http://foo.bar/open"));
}

#[test]
fn rules_close_a_group() {
    let body = "user-agent: FooBot\ndisallow: /a\nuser-agent: BarBot\ndisallow: /b\n";
    assert!(!allowed(body, "FooBot", "http://foo.bar/a"));
    assert!(allowed(body, "FooBot", "http://foo.bar/b"));
    assert!(allowed(body, "BarBot", "http://foo.bar/a"));
    assert!(!allowed(body, "BarBot", "http://foo.bar/b"));
}

#[test]
fn sitemap_closes_a_group() {
    let body = "user-agent: FooBot\nsitemap: https://example.com/s.xml\nuser-agent: BarBot\ndisallow: /\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/x"));
    assert!(!allowed(body, "BarBot", "http://foo.bar/x"));
}

#[test]
fn unknown_directive_closes_a_group() {
    let body = "user-agent: FooBot\nnoarchive: /\nuser-agent: BarBot\ndisallow: /\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/x"));
    assert!(!allowed(body, "BarBot", "http://foo.bar/x"));
}

#[test]
fn crawl_delay_does_not_close_a_group() {
    let body = "user-agent: FooBot\ncrawl-delay: 2\nuser-agent: BarBot\ndisallow: /secret\n";
    // BarBot's agent line continues the same group, so the rule binds
    // both agents.
    assert!(!allowed(body, "FooBot", "http://foo.bar/secret"));
    assert!(!allowed(body, "BarBot", "http://foo.bar/secret"));
}

#[test]
fn most_specific_agent_wins() {
    let body = "user-agent: FooBot\ndisallow: /images/\n\nuser-agent: FooBot-Images\nallow: /images/thumbs/\n";

    let mut matcher = RobotsMatcher::new();
    // Both tokens are ours; the longer matched agent discards the rules
    // collected for the shorter one.
    assert!(matcher.allowed(
        body.as_bytes(),
        &["FooBot", "FooBot-Images"],
        "http://foo.bar/images/photo.jpg"
    ));
    assert!(matcher.allowed(
        body.as_bytes(),
        &["FooBot", "FooBot-Images"],
        "http://foo.bar/images/thumbs/photo.jpg"
    ));
    // Queried alone, the shorter token sticks with its own group.
    assert!(!matcher.allowed(body.as_bytes(), &["FooBot"], "http://foo.bar/images/photo.jpg"));
}

#[test]
fn index_html_is_equivalent_to_directory() {
    let body = "user-agent: *\nallow: /allowed-slash/index.html\ndisallow: /\n";
    assert!(allowed(body, "FooBot", "http://foo.bar/allowed-slash/"));
    assert!(allowed(body, "FooBot", "http://foo.bar/allowed-slash/index.html"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/allowed-slash/index.htm"));
    assert!(!allowed(body, "FooBot", "http://foo.bar/anyother-url"));
}

#[test]
fn matching_line_reports_the_winning_rule() {
    let body = "user-agent: FooBot\nallow: /x/page.html\ndisallow: /x/\n";
    let mut matcher = RobotsMatcher::new();

    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/x/page.html"));
    assert_eq!(matcher.matching_line(), 2);

    assert!(!matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/x/other"));
    assert_eq!(matcher.matching_line(), 3);

    // On a tie the verdict goes to allow, the reported line to disallow.
    let body = "user-agent: FooBot\nallow: /page\ndisallow: /page\n";
    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/page"));
    assert_eq!(matcher.matching_line(), 3);
}

#[test]
fn crawl_delay_prefers_the_specific_scope() {
    let body = "User-agent: *\nCrawl-delay: 10\n\nUser-agent: FooBot\nCrawl-delay: 5\n";
    let mut matcher = RobotsMatcher::new();

    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://example.com/"));
    assert_eq!(matcher.crawl_delay(), Some(5.0));

    assert!(matcher.one_agent_allowed(body.as_bytes(), "OtherBot", "http://example.com/"));
    assert_eq!(matcher.crawl_delay(), Some(10.0));
}

#[test]
fn crawl_delay_falls_back_to_global_scope() {
    let body = "user-agent: *\ncrawl-delay: 10\ndisallow: /\n\nuser-agent: FooBot\nallow: /\n";
    let mut matcher = RobotsMatcher::new();

    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/x"));
    assert!(matcher.ever_seen_specific_agent());
    assert_eq!(matcher.crawl_delay(), Some(10.0));
}

#[test]
fn first_crawl_delay_in_a_scope_wins() {
    let body = "user-agent: FooBot\ncrawl-delay: 2\ncrawl-delay: 9\n";
    let mut matcher = RobotsMatcher::new();
    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/"));
    assert_eq!(matcher.crawl_delay(), Some(2.0));
}

#[test]
fn side_channels_before_any_group_are_ignored() {
    let body = "crawl-delay: 2\nuser-agent: FooBot\ncrawl-delay: 5\n";
    let mut matcher = RobotsMatcher::new();
    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/"));
    assert_eq!(matcher.crawl_delay(), Some(5.0));
}

#[test]
fn request_rate_scoping() {
    let body = "user-agent: *\nrequest-rate: 1/5\n\nuser-agent: FooBot\nrequest-rate: 10/60s\n";
    let mut matcher = RobotsMatcher::new();

    assert!(matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/"));
    let rate = matcher.request_rate().unwrap();
    assert_eq!((rate.requests, rate.seconds), (10, 60));

    assert!(matcher.one_agent_allowed(body.as_bytes(), "OtherBot", "http://foo.bar/"));
    let rate = matcher.request_rate().unwrap();
    assert_eq!((rate.requests, rate.seconds), (1, 5));
}

#[test]
fn content_signal_retrieval() {
    let body = "User-agent: *\nContent-Signal: ai-train=no, search=yes\nDisallow:\n";
    let mut matcher = RobotsMatcher::new();

    assert!(matcher.one_agent_allowed(body.as_bytes(), "Googlebot", "http://example.com/"));
    let signal = matcher.content_signal().unwrap();
    assert_eq!(signal.ai_train, Some(false));
    assert_eq!(signal.search, Some(true));
    assert_eq!(signal.ai_input, None);
}

#[test]
fn queries_are_idempotent_and_matchers_reusable() {
    let body = "user-agent: FooBot\ndisallow: /x/\n";
    let mut matcher = RobotsMatcher::new();

    let first = matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/x/y");
    let second = matcher.one_agent_allowed(body.as_bytes(), "FooBot", "http://foo.bar/x/y");
    assert_eq!(first, second);

    // A different body on the same matcher starts from scratch.
    assert!(matcher.one_agent_allowed(b"", "FooBot", "http://foo.bar/x/y"));
    assert_eq!(matcher.crawl_delay(), None);
    assert!(!matcher.ever_seen_specific_agent());
}

#[test]
fn relative_and_odd_urls() {
    let body = "user-agent: FooBot\ndisallow: /secret\n";
    assert!(!allowed(body, "FooBot", "/secret/plans"));
    assert!(!allowed(body, "FooBot", "//foo.bar/secret/plans"));
    assert!(allowed(body, "FooBot", "not a url at all"));
    assert!(allowed(body, "FooBot", ""));
}

#[test]
fn valid_user_agents_to_obey() {
    assert!(is_valid_user_agent_to_obey("Googlebot"));
    assert!(is_valid_user_agent_to_obey("My-Bot"));
    assert!(is_valid_user_agent_to_obey("Foo_Bar"));
    assert!(!is_valid_user_agent_to_obey(""));
    assert!(!is_valid_user_agent_to_obey("Foobot/2.1"));
    assert!(!is_valid_user_agent_to_obey("Foobot Bar"));
    assert!(!is_valid_user_agent_to_obey("Foobot*"));
}
