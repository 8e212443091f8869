//! End-to-end splitting behaviour for the `GO` separator with a `"\n"`
//! terminator.

use sqlbatch_core::{
    BatchError, BatchEvent, BatchParser, Directive, LinesSource, ReaderSource, SplitOptions,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parser() -> BatchParser {
    BatchParser::new("\n").unwrap()
}

fn split(input: &str) -> Vec<BatchEvent> {
    parser()
        .split(ReaderSource::new(input.as_bytes()), SplitOptions::default())
        .unwrap()
}

fn split_stripped(input: &str) -> Vec<BatchEvent> {
    parser()
        .split(ReaderSource::new(input.as_bytes()), SplitOptions::stripped())
        .unwrap()
}

fn batch(sql: &str) -> BatchEvent {
    BatchEvent::Batch(sql.to_string())
}

fn go(token: &str, count: Option<u32>) -> BatchEvent {
    BatchEvent::Directive(Directive {
        token: token.to_string(),
        count,
    })
}

// ---------------------------------------------------------------------------
// Plain scripts
// ---------------------------------------------------------------------------

#[test]
fn nothing_yields_no_events() {
    let events = parser()
        .split(LinesSource::new(Vec::<String>::new()), SplitOptions::default())
        .unwrap();
    assert!(events.is_empty());
}

#[test]
fn sql_without_go() {
    let events = parser()
        .split(LinesSource::new(["asd"]), SplitOptions::default())
        .unwrap();
    assert_eq!(events, vec![batch("asd\n")]);
}

#[test]
fn empty_sql_without_go() {
    let events = parser()
        .split(LinesSource::new([""]), SplitOptions::default())
        .unwrap();
    assert!(events.is_empty());
}

#[test]
fn empty_line_without_go() {
    assert!(split("\n").is_empty());
}

#[test]
fn sql_after_empty_line_without_go() {
    assert_eq!(split("\nasd"), vec![batch("\nasd\n")]);
}

// ---------------------------------------------------------------------------
// Separators
// ---------------------------------------------------------------------------

#[test]
fn sql_with_go() {
    assert_eq!(split("asd\ngo"), vec![batch("asd\n"), go("go", None)]);
}

#[test]
fn empty_sql_with_go_keeps_case() {
    assert_eq!(split("gO"), vec![batch(""), go("gO", None)]);
}

#[test]
fn empty_line_with_indented_go() {
    assert_eq!(split("\n  go"), vec![batch("\n"), go("go", None)]);
}

#[test]
fn go_with_count_and_trailing_space() {
    assert_eq!(
        split("\nasd\ngo 1 "),
        vec![batch("\nasd\n"), go("go 1", Some(1))]
    );
}

#[test]
fn multiple_go_flush_empty_batches() {
    assert_eq!(
        split("go\nGO"),
        vec![batch(""), go("go", None), batch(""), go("GO", None)]
    );
}

#[test]
fn trailing_sql_after_go_is_final_batch() {
    assert_eq!(
        split("a\nGO\nb\nGO 3\nc"),
        vec![
            batch("a\n"),
            go("GO", None),
            batch("b\n"),
            go("GO 3", Some(3)),
            batch("c\n"),
        ]
    );
}

#[test]
fn near_miss_separator_is_content() {
    assert_eq!(split("go go\ngo;"), vec![batch("go go\ngo;\n")]);
}

// ---------------------------------------------------------------------------
// Comments, retained
// ---------------------------------------------------------------------------

#[test]
fn sql_comment_with_go() {
    assert_eq!(
        split("/* test */\nasd\ngo"),
        vec![batch("/* test */\nasd\n"), go("go", None)]
    );
}

#[test]
fn sql_multi_line_comment_with_go() {
    assert_eq!(
        split("/* test\n * blah */\nasd\ngo"),
        vec![batch("/* test\n * blah */\nasd\n"), go("go", None)]
    );
}

#[test]
fn sql_comment_without_go() {
    assert_eq!(split("/* test */"), vec![batch("/* test */\n")]);
}

#[test]
fn go_inside_block_comment_is_not_a_separator() {
    assert_eq!(
        split("/*\ngo\n*/\nselect 1"),
        vec![batch("/*\ngo\n*/\nselect 1\n")]
    );
}

#[test]
fn unclosed_multi_line_comment_fails() {
    let mut events = Vec::new();
    let result = parser().process(
        ReaderSource::new("/* test\n * blah".as_bytes()),
        SplitOptions::default(),
        |event| events.push(event),
    );
    assert!(matches!(
        result,
        Err(BatchError::UnterminatedComment { line: 1 })
    ));
    assert!(events.is_empty());
}

#[test]
fn unclosed_comment_keeps_earlier_batches_delivered() {
    let mut events = Vec::new();
    let result = parser().process(
        ReaderSource::new("select 1\ngo\n/* dangling".as_bytes()),
        SplitOptions::default(),
        |event| events.push(event),
    );
    assert!(matches!(
        result,
        Err(BatchError::UnterminatedComment { line: 3 })
    ));
    assert_eq!(events, vec![batch("select 1\n"), go("go", None)]);
}

// ---------------------------------------------------------------------------
// Comments, stripped
// ---------------------------------------------------------------------------

#[test]
fn stripped_comment_without_go() {
    assert!(split_stripped("/* test */").is_empty());
}

#[test]
fn stripped_multi_line_comment_without_go() {
    assert!(split_stripped("/* t \n est */").is_empty());
}

#[test]
fn stripped_multi_line_comment_and_sql() {
    assert_eq!(split_stripped("/* t \n est */qweqwe"), vec![batch("qweqwe\n")]);
    assert_eq!(
        split_stripped("/* t \n est */\nqweqwe"),
        vec![batch("\nqweqwe\n")]
    );
}

#[test]
fn stripped_single_line_comment_and_sql() {
    assert_eq!(split_stripped("-- blah\nqweqwe"), vec![batch("\nqweqwe\n")]);
}

#[test]
fn hash_is_never_a_comment() {
    assert_eq!(
        split_stripped("qwe # blah\nqweqwe"),
        vec![batch("qwe # blah\nqweqwe\n")]
    );
    assert_eq!(
        split_stripped("# blah\nqweqwe"),
        vec![batch("# blah\nqweqwe\n")]
    );
}

#[test]
fn separator_with_trailing_comment() {
    assert_eq!(
        split("select 1\nGO -- next\nselect 2"),
        vec![batch("select 1\n"), go("GO", None), batch("select 2\n")]
    );
    assert_eq!(
        split_stripped("select 1\nGO /* c */ 2"),
        vec![batch("select 1\n"), go("GO 2", Some(2))]
    );
}

#[test]
fn comment_closing_on_separator_line_stays_in_batch() {
    assert_eq!(
        split("/* a\n*/ GO\nselect 1"),
        vec![batch("/* a\n*/ GO\nselect 1\n")]
    );
    assert_eq!(
        split_stripped("/* a\n*/ GO\nselect 1"),
        vec![batch(""), go("GO", None), batch("select 1\n")]
    );
}

#[test]
fn keyword_split_by_comment_is_content() {
    assert_eq!(
        split("select 1\nG/* x */O"),
        vec![batch("select 1\nG/* x */O\n")]
    );
}

#[test]
fn count_after_inline_comment_needs_stripping() {
    assert_eq!(
        split("select 1\nGO /* c */ 2"),
        vec![batch("select 1\nGO /* c */ 2\n")]
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn lossless_without_separators_or_block_comments() {
    let lines = [
        "create table t (",
        "    id int -- key",
        "",
        "    # not a comment",
        ")",
    ];
    let events = parser()
        .split(LinesSource::new(lines), SplitOptions::default())
        .unwrap();
    let [BatchEvent::Batch(sql)] = events.as_slice() else {
        panic!("expected a single batch, got {events:?}");
    };
    let rebuilt: Vec<&str> = sql.strip_suffix('\n').unwrap().split('\n').collect();
    assert_eq!(rebuilt, lines);
}

#[test]
fn every_directive_follows_exactly_one_batch() {
    let events = split("a\ngo\n\ngo 2\nb\n/* x */\nGO\nc");
    let directives = events
        .iter()
        .filter(|e| matches!(e, BatchEvent::Directive(_)))
        .count();
    assert_eq!(directives, 3);
    for (i, event) in events.iter().enumerate() {
        if matches!(event, BatchEvent::Directive(_)) {
            assert!(matches!(events[i - 1], BatchEvent::Batch(_)));
        }
    }
}

#[test]
fn splitting_twice_is_identical() {
    let script = "/* a */\nselect 1\ngo 2\n-- b\nselect 2\n";
    assert_eq!(split(script), split(script));
    assert_eq!(split_stripped(script), split_stripped(script));
}

#[test]
fn crlf_scripts_split_like_lf() {
    assert_eq!(split("asd\r\ngo\r\nqwe"), split("asd\ngo\nqwe"));
}
