/*!
# Integration Tests for the alignment engine

End-to-end runs through `AlignmentEngine`: degradation under the line budget,
grouping locality, idempotence of converged output and config loading.
*/

use pretty_assertions::assert_eq;
use ruby_aligner::ast_core::Tree;
use ruby_aligner::{parse, AlignConfig, AlignmentEngine, Policy};
use std::fs;
use tempfile::TempDir;

fn engine(width: usize) -> AlignmentEngine {
    AlignmentEngine::new(AlignConfig::default().with_max_line_length(width)).unwrap()
}

fn converge(width: usize, source: &str) -> String {
    let result = engine(width).converge(source).unwrap();
    assert!(result.converged, "no fixed point for {source:?}");
    result.output
}

/// Node kinds with leaf texts in preorder; layout-only rewrites keep it intact.
fn shape(tree: &Tree) -> Vec<String> {
    tree.descendants(tree.root())
        .map(|id| {
            if tree.children(id).next().is_none() {
                format!("{:?} {}", tree.kind(id), tree.text(id))
            } else {
                format!("{:?}", tree.kind(id))
            }
        })
        .collect()
}

fn case_of(branches: &[(&str, &str)]) -> String {
    let mut source = String::from("case x\n");
    for (value, body) in branches {
        source.push_str(&format!("when {value}\n  {body}\n"));
    }
    source.push_str("end\n");
    source
}

#[test]
fn test_branches_padded_to_common_column() {
    let source = case_of(&[("1", "one"), ("123", "two"), ("12345678901", "three")]);
    let expected = format!(
        "case x\n{:<17}then one\n{:<17}then two\n{:<17}then three\nend\n",
        "when 1", "when 123", "when 12345678901"
    );
    assert_eq!(converge(80, &source), expected);
}

#[test]
fn test_padding_overflow_falls_back_to_unaligned() {
    // 7 + 70 fits in 80, 17 + 70 does not
    let long = "a".repeat(65);
    let source = case_of(&[("1", &long), ("123", "two"), ("12345678901", "three")]);
    let expected = format!(
        "case x\nwhen 1 then {long}\nwhen 123 then two\nwhen 12345678901 then three\nend\n"
    );
    let output = converge(80, &source);
    assert_eq!(output, expected);
    assert!(output.lines().all(|line| line.len() <= 80));
}

#[test]
fn test_overflowing_branch_stays_multiline() {
    let long = "a".repeat(80);
    let source = case_of(&[("1", &long), ("123", "two"), ("12345678901", "three")]);
    let expected = format!(
        "case x\nwhen 1\n  {long}\n{:<17}then two\n{:<17}then three\nend\n",
        "when 123", "when 12345678901"
    );
    assert_eq!(converge(80, &source), expected);
}

#[test]
fn test_literal_condition_uses_equals_spelling() {
    let output = converge(80, "def some_method\n  number if true\nend\n");
    assert_eq!(output, "def some_method = number if true\n");
}

#[test]
fn test_call_in_condition_uses_trailing_clause() {
    let output = converge(80, "def some_method\n  maybe_call if call_guard()\nend\n");
    assert_eq!(output, "def some_method(); maybe_call if call_guard(); end\n");
}

#[test]
fn test_predicate_call_uses_trailing_clause() {
    let output = converge(80, "def ccc\n  go if ready?\nend\n");
    assert_eq!(output, "def ccc(); go if ready?; end\n");
}

#[test]
fn test_branch_aligns_to_existing_then() {
    let output = converge(80, "case x\nwhen 1   then a\nwhen 22\n  b\nend\n");
    assert_eq!(output, "case x\nwhen 1   then a\nwhen 22  then b\nend\n");
}

#[test]
fn test_assignments_aligned_within_blank_line_groups() {
    let output = converge(80, "a = 1\nbbb = 2\n\ncc = 3\n");
    assert_eq!(output, "a   = 1\nbbb = 2\n\ncc = 3\n");
}

#[test]
fn test_groups_split_by_comment_and_category() {
    let source = "a = 1\n# note\nbbb = 2\nCONST = 3\nxy = 4\n";
    assert_eq!(converge(80, source), source);
}

#[test]
fn test_groups_split_by_nested_scope() {
    let source = "def run\n  a = 1\n  bbb = 2\n  if ok\n    c = 3\n  end\n  dd = 4\nend\n";
    let expected = "def run\n  a   = 1\n  bbb = 2\n  if ok\n    c = 3\n  end\n  dd = 4\nend\n";
    assert_eq!(converge(80, source), expected);
}

#[test]
fn test_assignment_group_left_alone_when_padding_overflows() {
    let source = format!("a = {}\n{} = 2222\n", "1".repeat(20), "b".repeat(20));
    assert_eq!(converge(30, &source), source);
}

#[test]
fn test_endless_defs_aligned() {
    let output = converge(80, "def a = 1\ndef bbb = 2\n");
    assert_eq!(output, "def a   = 1\ndef bbb = 2\n");
}

#[test]
fn test_converged_output_is_stable() {
    let sources = [
        case_of(&[("1", "one"), ("22", "foo(a,\n    b)")]),
        "x = 1\nyy = 2\nzzz += 3\n".to_string(),
        "class Point\n  def x\n    @x\n  end\n\n  def y_value\n    @y\n  end\nend\n".to_string(),
        "case kind\nwhen :a, :b\n  left\nwhen :c\n  right\nelse\n  other\nend\n".to_string(),
    ];
    let engine = engine(80);
    for source in &sources {
        let result = engine.converge(source).unwrap();
        assert!(result.converged);
        let tree = parse(&result.output).unwrap();
        let pass = engine.run_pass(&tree).unwrap();
        assert!(pass.edits.is_empty(), "second pass changed {:?}", result.output);
    }
}

#[test]
fn test_layout_rewrites_keep_tree_shape() {
    let sources = [
        case_of(&[("1", "one"), ("123", "two(a)")]),
        "a = 1\nbbb = 2\n@c ||= 3\n".to_string(),
        "def a = 1\ndef bbb = 2\n".to_string(),
    ];
    for source in &sources {
        let before = parse(source).unwrap();
        let after = parse(&converge(80, source)).unwrap();
        assert_eq!(shape(&before), shape(&after));
    }
}

#[test]
fn test_rewritten_lines_stay_within_budget() {
    let sources = [
        case_of(&[("1", &"a".repeat(30)), ("123456", "b"), ("7", "c")]),
        "short = 1\nlonger_name = call(arg)\nx = 2\n".to_string(),
        "def value\n  compute(first_argument, second_argument)\nend\n".to_string(),
    ];
    for width in [30, 40, 60] {
        for source in &sources {
            let output = converge(width, source);
            for line in output.lines() {
                let untouched = source.lines().any(|original| original == line);
                assert!(untouched || line.len() <= width, "{line:?} exceeds {width}");
            }
        }
    }
}

#[test]
fn test_parse_error_is_reported() {
    assert!(engine(80).fix("def broken(\n").is_err());
}

#[test]
fn test_config_file_disables_policy() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("aligner.toml");
    fs::write(
        &path,
        "max_line_length = 80\n\n[rules.\"Layout/AlignAssignments\"]\nenabled = false\n",
    )
    .unwrap();

    let config = AlignConfig::load_from_file(&path).unwrap();
    assert_eq!(config.max_line_length, 80);
    assert!(!config.is_enabled(Policy::AlignAssignments));

    let engine = AlignmentEngine::new(config).unwrap();
    assert!(!engine.policies().contains(&Policy::AlignAssignments));
    let source = "a = 1\nbbb = 2\n";
    assert_eq!(engine.converge(source).unwrap().output, source);
}

#[test]
fn test_fix_files_reads_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("point.rb");
    fs::write(&path, "a = 1\nbbb = 2\n").unwrap();

    let results = engine(80).fix_files(&[&path]);
    assert_eq!(results.len(), 1);
    let (reported, result) = &results[0];
    assert_eq!(reported, &path);
    assert_eq!(result.as_ref().unwrap().output, "a   = 1\nbbb = 2\n");
    assert_eq!(fs::read_to_string(&path).unwrap(), "a = 1\nbbb = 2\n");
}
