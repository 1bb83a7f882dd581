mod common;

use covgate::config::{Config, SortBy, SortOrder};
use covgate::engine::{Engine, HistoryOptions};
use covgate::error::CovgateError;
use covgate::model::EntityKind;

use common::{block, profile, FakeGit, RecordingReporter};

/// A file at 50% against a 70% statement threshold fails the gate.
#[test]
fn gate_fails_below_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        statement_threshold: 70.0,
        block_threshold: 50.0,
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile(
        "foo.go",
        vec![block(1, 1, 1, 1), block(2, 2, 1, 0)],
    )];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file.len(), 1);
    let file = &outcome.results.by_file[0];
    assert_eq!(file.file, "foo.go");
    assert_eq!(file.statements_coverage, "1/2");
    assert_eq!(file.blocks_coverage, "1/2");
    assert_eq!(file.statement_pct, 50.0);
    assert_eq!(file.block_pct, 50.0);
    assert!(file.failed);

    let totals = &outcome.results.by_total;
    assert_eq!(totals.statements.coverage, "1/2");
    assert!(totals.statements.failed); // 50 < 70
    assert!(!totals.blocks.failed); // 50 is not strictly below 50

    assert!(outcome.has_failure);
    assert_eq!(outcome.exit_code(), 1);
    // The reporter saw exactly one emission with the failing verdict.
    assert_eq!(reporter.emitted.len(), 1);
    assert!(reporter.emitted[0].1);
}

/// Meeting every threshold exits zero.
#[test]
fn passing_run_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        statement_threshold: 70.0,
        block_threshold: 50.0,
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile(
        "foo.go",
        vec![block(1, 1, 1, 3), block(2, 2, 1, 1)],
    )];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert!(!outcome.has_failure);
    assert_eq!(outcome.exit_code(), 0);
}

/// Uncovered single lines and runs compress to `a,b-c` form. The source file
/// does not exist under the root, so no reviewability filtering applies.
#[test]
fn uncovered_ranges_compressed() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile(
        "foo.go",
        vec![
            block(1, 1, 1, 0),
            block(2, 2, 1, 1),
            block(3, 3, 1, 0),
            block(5, 7, 2, 0),
        ],
    )];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file[0].uncovered_lines, "1,3,5-7");
}

/// Overlapping zero-hit blocks merge into one range.
#[test]
fn overlapping_uncovered_blocks_merge() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile(
        "foo.go",
        vec![block(1, 3, 2, 0), block(2, 4, 1, 0), block(6, 6, 1, 0)],
    )];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file[0].uncovered_lines, "1-4,6");
}

/// Descending statement-percent sort, names breaking ties ascending.
#[test]
fn sort_desc_by_statement_percent() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        sort_by: SortBy::StatementPercent,
        sort_order: SortOrder::Desc,
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![
        profile("a.go", vec![block(1, 1, 1, 1), block(2, 2, 1, 0)]), // 50%
        profile("b.go", vec![block(1, 1, 2, 1)]),                    // 100%
        profile("c.go", vec![block(1, 1, 2, 0)]),                    // 0%
    ];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    let order: Vec<&str> = outcome
        .results
        .by_file
        .iter()
        .map(|f| f.file.as_str())
        .collect();
    assert_eq!(order, vec!["b.go", "a.go", "c.go"]);
}

/// An explicit module name is stripped from every profile path.
#[test]
fn module_prefix_stripped() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        module_name: "example.com/m".to_string(),
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile("example.com/m/pkg/foo.go", vec![block(1, 1, 1, 1)])];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file[0].file, "pkg/foo.go");
    assert_eq!(outcome.results.by_package[0].package, "pkg");
}

/// Without an explicit module name the shared path prefix is inferred.
#[test]
fn inferred_prefix_from_common_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![
        profile("example.com/m/pkg/a.go", vec![block(1, 1, 1, 1)]),
        profile("example.com/m/util/b.go", vec![block(1, 1, 1, 1)]),
    ];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    let names: Vec<&str> = outcome
        .results
        .by_file
        .iter()
        .map(|f| f.file.as_str())
        .collect();
    assert_eq!(names, vec!["pkg/a.go", "util/b.go"]);
}

/// Skip patterns drop matching files before aggregation.
#[test]
fn skip_patterns_drop_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        skip: vec![r"_test\.go$".to_string(), r"\.pb\.go$".to_string()],
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![
        profile("pkg/foo.go", vec![block(1, 1, 1, 1)]),
        profile("pkg/foo_test.go", vec![block(1, 1, 1, 1)]),
        profile("cmd/api.pb.go", vec![block(1, 1, 1, 1)]),
    ];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file.len(), 1);
    assert_eq!(outcome.results.by_file[0].file, "pkg/foo.go");
}

/// When the git port fails, diff scoping degrades to checking everything.
#[test]
fn diff_warning_keeps_all_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        diff_from: "main".to_string(),
        ..Config::default()
    };
    let git = FakeGit::down();
    let mut reporter = RecordingReporter::default();

    let profiles = vec![
        profile("pkg/foo.go", vec![block(1, 1, 1, 1)]),
        profile("cmd/main.go", vec![block(1, 1, 1, 1)]),
    ];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file.len(), 2);
    assert!(reporter.notices[0].starts_with("warning:"));
}

/// An empty change set keeps nothing, and the empty totals pass.
#[test]
fn diff_with_no_changes_keeps_none() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        diff_from: "main".to_string(),
        statement_threshold: 70.0,
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile("pkg/foo.go", vec![block(1, 1, 1, 0)])];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert!(outcome.results.by_file.is_empty());
    // Zero totals count as fully covered.
    assert_eq!(outcome.results.by_total.statements.percentage, 100.0);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(reporter.notices, vec!["no-changes".to_string()]);
}

/// Diff scoping keeps only profiles whose file appears in the change set.
#[test]
fn diff_scope_keeps_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        diff_from: "main".to_string(),
        ..Config::default()
    };
    let git = FakeGit::with_changes(&["pkg/foo.go", "docs/readme.md"]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![
        profile("pkg/foo.go", vec![block(1, 1, 1, 1)]),
        profile("cmd/main.go", vec![block(1, 1, 1, 1)]),
    ];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert_eq!(outcome.results.by_file.len(), 1);
    assert_eq!(outcome.results.by_file[0].file, "pkg/foo.go");
    assert_eq!(reporter.notices, vec!["diff-mode 1/2".to_string()]);
}

/// A per-file override tightens the gate for that file only.
#[test]
fn per_file_override_applies() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        statement_threshold: 50.0,
        block_threshold: 50.0,
        ..Config::default()
    };
    config
        .per_file
        .statements
        .insert("foo.go".to_string(), 80.0);
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![
        profile("foo.go", vec![block(1, 1, 3, 1), block(2, 2, 1, 0)]), // 75%
        profile("bar.go", vec![block(1, 1, 3, 1), block(2, 2, 2, 0)]), // 60%
    ];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    let foo = outcome
        .results
        .by_file
        .iter()
        .find(|f| f.file == "foo.go")
        .unwrap();
    let bar = outcome
        .results
        .by_file
        .iter()
        .find(|f| f.file == "bar.go")
        .unwrap();
    assert_eq!(foo.statement_threshold, 80.0);
    assert!(foo.failed); // 75 < 80
    assert!(!bar.failed); // 60 against the 50 default
    assert!(outcome.has_failure);
}

/// The whole-project override can fail a run whose files all pass.
#[test]
fn total_override_applies() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.total.statements = Some(80.0);
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let profiles = vec![profile(
        "foo.go",
        vec![block(1, 1, 3, 1), block(2, 2, 1, 0)],
    )];
    let outcome = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut reporter)
        .unwrap();

    assert!(!outcome.results.by_file[0].failed);
    assert_eq!(outcome.results.by_total.statements.threshold, 80.0);
    assert!(outcome.results.by_total.statements.failed); // 75 < 80
    assert_eq!(outcome.exit_code(), 1);
}

/// Saving a run and comparing a later one reports the movement per entity.
#[test]
fn history_compare_reports_movement() {
    let dir = tempfile::tempdir().unwrap();
    let history_path = dir.path().join("history.json");
    let config = Config::default();
    let git = FakeGit::at_commit("0123456789abcdef0123456789abcdef01234567", "main");

    let mut reporter = RecordingReporter::default();
    let save = HistoryOptions {
        path: history_path.clone(),
        limit: 0,
        save: true,
        label: String::new(),
        compare_with: None,
    };
    // First run: 1/2 statements and blocks.
    Engine::new(&config, &git, dir.path())
        .run(
            vec![profile("foo.go", vec![block(1, 1, 1, 1), block(2, 2, 1, 0)])],
            Some(&save),
            &mut reporter,
        )
        .unwrap();

    // Second run: 3/4, compared against the saved entry by branch name.
    let compare = HistoryOptions {
        path: history_path,
        limit: 0,
        save: false,
        label: String::new(),
        compare_with: Some("main".to_string()),
    };
    let outcome = Engine::new(&config, &git, dir.path())
        .run(
            vec![profile(
                "foo.go",
                vec![
                    block(1, 1, 1, 1),
                    block(2, 2, 1, 1),
                    block(3, 3, 1, 1),
                    block(4, 4, 1, 0),
                ],
            )],
            Some(&compare),
            &mut reporter,
        )
        .unwrap();

    let comparison = outcome.results.comparison.expect("comparison present");
    let total = comparison
        .rows
        .iter()
        .find(|row| row.kind == EntityKind::Total)
        .expect("total row");
    assert_eq!(total.delta.statements_delta, 25.0);
    assert_eq!(total.delta.blocks_delta, 25.0);
    let file = comparison
        .rows
        .iter()
        .find(|row| row.kind == EntityKind::File)
        .expect("file row");
    assert_eq!(file.name, "foo.go");
    assert_eq!(file.delta.statements_delta, 25.0);
}

/// An unknown --compare-with reference is a hard error, not a warning.
#[test]
fn compare_with_unknown_ref_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default();
    let git = FakeGit::with_changes(&[]);
    let mut reporter = RecordingReporter::default();

    let options = HistoryOptions {
        path: dir.path().join("history.json"),
        limit: 0,
        save: false,
        label: String::new(),
        compare_with: Some("nope".to_string()),
    };
    let err = Engine::new(&config, &git, dir.path())
        .run(
            vec![profile("foo.go", vec![block(1, 1, 1, 1)])],
            Some(&options),
            &mut reporter,
        )
        .unwrap_err();

    assert!(matches!(err, CovgateError::RefNotFound(_)));
}

/// Identical inputs produce byte-identical serialized results.
#[test]
fn identical_runs_serialize_identically() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        statement_threshold: 70.0,
        ..Config::default()
    };
    let git = FakeGit::with_changes(&[]);

    let profiles = vec![
        profile("pkg/a.go", vec![block(1, 2, 2, 1), block(4, 6, 3, 0)]),
        profile("cmd/b.go", vec![block(1, 1, 1, 5)]),
    ];

    let mut first_reporter = RecordingReporter::default();
    let first = Engine::new(&config, &git, dir.path())
        .run(profiles.clone(), None, &mut first_reporter)
        .unwrap();
    let mut second_reporter = RecordingReporter::default();
    let second = Engine::new(&config, &git, dir.path())
        .run(profiles, None, &mut second_reporter)
        .unwrap();

    let first_json = serde_json::to_string(&first.results).unwrap();
    let second_json = serde_json::to_string(&second.results).unwrap();
    assert_eq!(first_json, second_json);
}
