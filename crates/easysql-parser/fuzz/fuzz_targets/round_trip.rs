//! Fuzz target: Round-trip testing
//!
//! This fuzz target verifies that any input can be:
//! 1. Parsed into a node list
//! 2. Joined back to text identical to the input
//!
//! This ensures the tree is lossless for arbitrary, even malformed, input.

#![no_main]

use libfuzzer_sys::fuzz_target;
use easysql_parser::{join_nodes, parse};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (if possible)
    if let Ok(text) = std::str::from_utf8(data) {
        let nodes = parse(text);
        let joined = join_nodes(&nodes);

        // Losing even one byte is a bug in the parser
        if joined != text {
            panic!(
                "Round-trip failed!\nOriginal: {:?}\nJoined: {:?}",
                text, joined
            );
        }
    }
});
