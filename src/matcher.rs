use std::cmp::Ordering;

use crate::parser::{parse_robotstxt, ContentSignal, RequestRate, RobotsParseHandler};
use crate::{get_path_params_query, pattern};

/// Instead of a boolean "matched", we keep the maximum number of pattern
/// bytes matched by a rule as its priority, plus the line the rule came
/// from. The priority starts below zero so that a zero-length match
/// still outranks no match at all.
#[derive(Debug, Clone, Copy)]
struct Match {
    priority: i32,
    line: u32,
}

impl Default for Match {
    fn default() -> Self {
        Match {
            priority: pattern::NO_MATCH_PRIORITY,
            line: 0,
        }
    }
}

impl Match {
    fn set(&mut self, priority: i32, line: u32) {
        self.priority = priority;
        self.line = line;
    }

    fn clear(&mut self) {
        self.set(pattern::NO_MATCH_PRIORITY, 0);
    }
}

/// One [`Match`] per scope: rules under `*` and rules under the most
/// specific queried agent.
#[derive(Debug, Default, Clone, Copy)]
struct MatchHierarchy {
    global: Match,
    specific: Match,
}

impl MatchHierarchy {
    fn clear(&mut self) {
        self.global.clear();
        self.specific.clear();
    }
}

/// Per-scope storage for the side-channel directives (`Crawl-delay`,
/// `Request-rate`, `Content-Signal`). The first value seen in a scope
/// wins.
#[derive(Debug, Clone, Copy)]
struct PerScope<T> {
    global: Option<T>,
    specific: Option<T>,
}

impl<T> Default for PerScope<T> {
    fn default() -> Self {
        PerScope {
            global: None,
            specific: None,
        }
    }
}

impl<T: Copy> PerScope<T> {
    fn clear(&mut self) {
        self.global = None;
        self.specific = None;
    }

    fn record(&mut self, specific: bool, value: T) {
        let slot = if specific {
            &mut self.specific
        } else {
            &mut self.global
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn resolve(&self, prefer_specific: bool) -> Option<T> {
        if prefer_specific {
            if let Some(value) = self.specific {
                return Some(value);
            }
        }
        self.global
    }
}

/// Extracts the matchable prefix of a `User-agent` product token: the
/// leading run of `[A-Za-z_-]` bytes. `FooBot/2.1` yields `FooBot`.
fn extract_user_agent(user_agent: &[u8]) -> &[u8] {
    let end = user_agent
        .iter()
        .position(|&b| !(b.is_ascii_alphabetic() || b == b'-' || b == b'_'))
        .unwrap_or(user_agent.len());
    &user_agent[..end]
}

/// Returns true if `user_agent` is a valid token to match robots.txt
/// groups against: non-empty and containing only `[A-Za-z_-]`.
///
/// ```rust
/// use repkit::is_valid_user_agent_to_obey;
///
/// assert!(is_valid_user_agent_to_obey("Googlebot"));
/// assert!(is_valid_user_agent_to_obey("My-Bot"));
/// assert!(!is_valid_user_agent_to_obey(""));
/// assert!(!is_valid_user_agent_to_obey("Foobot/2.1"));
/// ```
pub fn is_valid_user_agent_to_obey(user_agent: &str) -> bool {
    !user_agent.is_empty() && extract_user_agent(user_agent.as_bytes()) == user_agent.as_bytes()
}

/// Matches `robots.txt` bodies against URLs on behalf of a set of
/// user-agents.
///
/// A matcher implements [`RobotsParseHandler`]: each
/// [`allowed`](RobotsMatcher::allowed) call re-parses the body, folding
/// rules into the two scopes that matter for the query (the `*` group
/// and the most specific named group), then resolves the verdict by
/// longest-match priority with ties going to Allow.
///
/// The matcher can be reused across bodies and URLs but is not thread
/// safe: a query resets and then mutates internal state throughout.
#[derive(Debug, Default)]
pub struct RobotsMatcher {
    /// Bytes of the query path matched by Allow rules.
    allow: MatchHierarchy,
    /// Bytes of the query path matched by Disallow rules.
    disallow: MatchHierarchy,
    /// True while the current group is a `*` group.
    seen_global_agent: bool,
    /// True while the current group names one of our agents.
    seen_specific_agent: bool,
    /// True if any group ever named one of our agents.
    ever_seen_specific_agent: bool,
    /// True once the current group has seen a rule line, so that a
    /// following `User-agent` starts a fresh group.
    seen_separator: bool,
    /// Length of the longest queried agent matched so far; growing it
    /// discards the less specific group's rules.
    best_specific_agent_length: usize,
    crawl_delay: PerScope<f64>,
    request_rate: PerScope<RequestRate>,
    content_signal: PerScope<ContentSignal>,
    path: String,
    user_agents: Vec<String>,
}

impl RobotsMatcher {
    /// Creates a matcher using the default longest-match strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `url` may be fetched by any member of
    /// `user_agents` according to `robots_body`. The URL must already be
    /// %-encoded per RFC 3986.
    pub fn allowed(&mut self, robots_body: &[u8], user_agents: &[&str], url: &str) -> bool {
        self.path = get_path_params_query(url);
        self.user_agents = user_agents.iter().map(|ua| ua.to_string()).collect();
        parse_robotstxt(robots_body, self);
        !self.disallow()
    }

    /// Robots check for the single-agent case. The URL must already be
    /// %-encoded per RFC 3986.
    pub fn one_agent_allowed(&mut self, robots_body: &[u8], user_agent: &str, url: &str) -> bool {
        self.allowed(robots_body, &[user_agent], url)
    }

    /// Returns true if crawling the queried URL is disallowed.
    fn disallow(&self) -> bool {
        if self.allow.specific.priority > 0 || self.disallow.specific.priority > 0 {
            return self.disallow.specific.priority > self.allow.specific.priority;
        }

        if self.ever_seen_specific_agent {
            // A matching group existed but matched nothing beyond the
            // empty pattern: allowed by default.
            return false;
        }

        if self.disallow.global.priority > 0 || self.allow.global.priority > 0 {
            return self.disallow.global.priority > self.allow.global.priority;
        }

        false
    }

    /// The line number of the rule that decided the last query, within
    /// the scope that won. When Allow and Disallow tie, the Disallow
    /// line is reported.
    pub fn matching_line(&self) -> u32 {
        let (allow, disallow) = if self.ever_seen_specific_agent {
            (self.allow.specific, self.disallow.specific)
        } else {
            (self.allow.global, self.disallow.global)
        };
        if allow.priority > disallow.priority {
            allow.line
        } else {
            disallow.line
        }
    }

    /// True if any group in the last parsed body named one of the
    /// queried agents.
    pub fn ever_seen_specific_agent(&self) -> bool {
        self.ever_seen_specific_agent
    }

    /// The `Crawl-delay` applicable to the queried agents, in seconds:
    /// the matching group's value if it set one, otherwise the `*`
    /// group's.
    pub fn crawl_delay(&self) -> Option<f64> {
        self.crawl_delay.resolve(self.ever_seen_specific_agent)
    }

    /// The `Request-rate` applicable to the queried agents, with the
    /// same scope preference as [`crawl_delay`](RobotsMatcher::crawl_delay).
    pub fn request_rate(&self) -> Option<RequestRate> {
        self.request_rate.resolve(self.ever_seen_specific_agent)
    }

    /// The `Content-Signal` applicable to the queried agents, with the
    /// same scope preference as [`crawl_delay`](RobotsMatcher::crawl_delay).
    pub fn content_signal(&self) -> Option<ContentSignal> {
        self.content_signal.resolve(self.ever_seen_specific_agent)
    }

    fn seen_any_agent(&self) -> bool {
        self.seen_global_agent || self.seen_specific_agent
    }

    fn store_match(&mut self, is_allow: bool, priority: i32, line_num: u32) {
        let hierarchy = if is_allow {
            &mut self.allow
        } else {
            &mut self.disallow
        };
        let slot = if self.seen_specific_agent {
            &mut hierarchy.specific
        } else {
            &mut hierarchy.global
        };
        if slot.priority < priority {
            slot.set(priority, line_num);
        }
    }
}

impl RobotsParseHandler for RobotsMatcher {
    fn handle_robots_start(&mut self) {
        // A fresh robots.txt body: reset everything accumulated by any
        // previous parse, in declaration order.
        self.allow.clear();
        self.disallow.clear();

        self.seen_global_agent = false;
        self.seen_specific_agent = false;
        self.ever_seen_specific_agent = false;
        self.seen_separator = false;
        self.best_specific_agent_length = 0;

        self.crawl_delay.clear();
        self.request_rate.clear();
        self.content_signal.clear();
    }

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, value: &[u8]) {
        if self.seen_separator {
            self.seen_specific_agent = false;
            self.seen_global_agent = false;
            self.seen_separator = false;
        }

        // A `*` followed by whitespace and more characters is still a
        // global record.
        if value.first() == Some(&b'*') && (value.len() == 1 || value[1].is_ascii_whitespace()) {
            self.seen_global_agent = true;
            return;
        }

        let name = extract_user_agent(value);
        for agent in &self.user_agents {
            if !name.eq_ignore_ascii_case(agent.as_bytes()) {
                continue;
            }
            match agent.len().cmp(&self.best_specific_agent_length) {
                Ordering::Greater => {
                    // A more specific agent takes over: rules collected
                    // for the shorter one no longer apply.
                    self.best_specific_agent_length = agent.len();
                    self.allow.specific.clear();
                    self.disallow.specific.clear();
                    self.seen_specific_agent = true;
                    self.ever_seen_specific_agent = true;
                }
                Ordering::Equal => {
                    self.seen_specific_agent = true;
                    self.ever_seen_specific_agent = true;
                }
                Ordering::Less => {}
            }
            break;
        }
    }

    fn handle_allow(&mut self, line_num: u32, value: &[u8]) {
        if !self.seen_any_agent() {
            return;
        }

        self.seen_separator = true;
        let priority = pattern::match_priority(self.path.as_bytes(), value);
        if priority >= 0 {
            self.store_match(true, priority, line_num);
            return;
        }

        // `index.htm` and `index.html` address the same resource as the
        // bare directory: retry with the pattern cut at the final slash
        // and anchored there.
        if let Some(slash) = value.iter().rposition(|&b| b == b'/') {
            let tail = &value[slash..];
            if tail == b"/index.htm" || tail == b"/index.html" {
                let mut folder = Vec::with_capacity(slash + 2);
                folder.extend_from_slice(&value[..=slash]);
                folder.push(b'$');
                self.handle_allow(line_num, &folder);
            }
        }
    }

    fn handle_disallow(&mut self, line_num: u32, value: &[u8]) {
        if !self.seen_any_agent() {
            return;
        }
        self.seen_separator = true;
        let priority = pattern::match_priority(self.path.as_bytes(), value);
        if priority >= 0 {
            self.store_match(false, priority, line_num);
        }
    }

    fn handle_sitemap(&mut self, _line_num: u32, _value: &[u8]) {
        self.seen_separator = true;
    }

    fn handle_crawl_delay(&mut self, _line_num: u32, delay: f64) {
        if !self.seen_any_agent() {
            return;
        }
        self.crawl_delay.record(self.seen_specific_agent, delay);
    }

    fn handle_request_rate(&mut self, _line_num: u32, rate: RequestRate) {
        if !self.seen_any_agent() {
            return;
        }
        self.request_rate.record(self.seen_specific_agent, rate);
    }

    fn handle_content_signal(&mut self, _line_num: u32, signal: ContentSignal) {
        if !self.seen_any_agent() {
            return;
        }
        self.content_signal.record(self.seen_specific_agent, signal);
    }

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &[u8], _value: &[u8]) {
        self.seen_separator = true;
    }
}
