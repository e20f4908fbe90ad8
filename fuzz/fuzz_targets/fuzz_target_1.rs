#![no_main]
extern crate libfuzzer_sys;

extern crate repkit;
use repkit::RobotsMatcher;

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut matcher = RobotsMatcher::new();
    let _allowed = matcher.one_agent_allowed(data, "FuzzBot", "https://example.com/a/b?c=d");
});
