//! Property-based round-trip tests
//!
//! These tests use proptest to generate thousands of EasySQL documents and
//! verify that:
//! 1. The parser never panics
//! 2. Joining every token of the result reproduces the input exactly
//! 3. Token offsets are monotonic and cover the whole input
//! 4. Re-parsing is idempotent

use proptest::prelude::*;
use easysql_parser::{flatten_tokens, join_nodes, parse};

use proptest_generators::*;

/// Helper: parse, then check the three structural invariants.
fn assert_round_trip(text: &str) {
    let nodes = parse(text);

    let joined = join_nodes(&nodes);
    if joined != text {
        panic!(
            "Round-trip failed!\nOriginal: {:?}\nJoined:   {:?}",
            text, joined
        );
    }

    // Tokens must tile the input: monotonic, disjoint, fully covering.
    let mut last_end = 0;
    for token in flatten_tokens(&nodes) {
        assert!(
            token.start() >= last_end,
            "token at {} overlaps previous end {} in {:?}",
            token.start(),
            last_end,
            text
        );
        last_end = token.end();
    }
    assert_eq!(last_end, text.len(), "tokens do not cover {:?}", text);
}

// ===== Property tests for round-trip preservation =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: bare references round-trip
    #[test]
    fn prop_reference_round_trip(text in arb_reference()) {
        assert_round_trip(&text);
    }

    /// Property: function and template calls round-trip
    #[test]
    fn prop_call_round_trip(text in prop_oneof![arb_var_func_call(), arb_tpl_func_call()]) {
        assert_round_trip(&text);
    }

    /// Property: single body lines round-trip
    #[test]
    fn prop_body_line_round_trip(text in arb_body_line()) {
        assert_round_trip(&text);
    }

    /// Property: directive lines round-trip
    #[test]
    fn prop_directive_round_trip(text in arb_directive()) {
        assert_round_trip(&text);
    }

    /// Property: full documents round-trip
    #[test]
    fn prop_document_round_trip(text in arb_document()) {
        assert_round_trip(&text);
    }

    /// Property: parsing is idempotent
    #[test]
    fn prop_idempotent_reparse(text in arb_document()) {
        prop_assert_eq!(parse(&text), parse(&text));
    }
}

// ===== Property tests for parser robustness =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Property: the round-trip invariants hold for arbitrary strings too,
    /// not just well-formed documents
    #[test]
    fn prop_arbitrary_strings_round_trip(text in "\\PC{0,200}") {
        assert_round_trip(&text);
    }

    /// Property: arbitrary strings with newlines and DSL fragments mixed in
    #[test]
    fn prop_adversarial_fragments_round_trip(
        parts in prop::collection::vec(
            prop_oneof![
                Just("\n".to_string()),
                Just("-- target=".to_string()),
                Just("${".to_string()),
                Just("@{".to_string()),
                Just("#{".to_string()),
                Just("}".to_string()),
                Just("'".to_string()),
                Just("\"".to_string()),
                Just("(".to_string()),
                Just(")".to_string()),
                Just(",".to_string()),
                Just("if=".to_string()),
                "[a-z ]{0,5}".prop_map(|s| s),
            ],
            0..30,
        )
    ) {
        assert_round_trip(&parts.concat());
    }
}

// ===== Specific edge case tests =====

#[test]
fn test_round_trip_full_document() {
    assert_round_trip(
        "-- backend: spark\n\
         -- target=variables\n\
         select 'prod' as env\n\
         -- target=temp.stage, if=equal(${env}, prod)\n\
         select * from ${db}.events -- raw\n\
         -- target=output.db.schema.table\n\
         select @{enrich(tbl=${stage})} from stage\n",
    );
}

#[test]
fn test_round_trip_unterminated_constructs() {
    assert_round_trip("select '${x} from t");
    assert_round_trip("select ${x from t");
    assert_round_trip("-- target=func.f(a");
    assert_round_trip("@{t(a=1");
}

#[test]
fn test_round_trip_unrecognized_target() {
    assert_round_trip("-- target=outputs.db.t\nselect 1");
}

#[test]
fn test_round_trip_crlf_ish_and_blank_lines() {
    assert_round_trip("\n\n-- target=log.x\n\n\n");
    assert_round_trip("select 1\r\nselect 2");
}

#[test]
fn test_round_trip_nested_quotes_and_comments() {
    assert_round_trip("select '--not a comment', \"it's\" -- real comment");
}
