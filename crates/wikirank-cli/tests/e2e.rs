//! E2E tests for `wr rank`, `wr graph` and `wr redirects`.
//!
//! Covers: the redirect-collapse scenario end to end, JSON report shapes,
//! the graph cache, config files, and structured error codes.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test harness helpers
// ---------------------------------------------------------------------------

const REDIRECTS: &str = "\
<http://dbpedia.org/resource/A> <http://dbpedia.org/ontology/wikiPageRedirects> <http://dbpedia.org/resource/B> .
<http://dbpedia.org/resource/B> <http://dbpedia.org/ontology/wikiPageRedirects> <http://dbpedia.org/resource/C> .
";

const LINKS: &str = "\
# links dump
<http://dbpedia.org/resource/A> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/X> .
<http://dbpedia.org/resource/B> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/X> .
this line is not a triple
<http://dbpedia.org/resource/C> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/Y> .
";

const CYCLE_LINKS: &str = "\
<http://dbpedia.org/resource/P> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/Q> .
<http://dbpedia.org/resource/Q> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/R> .
<http://dbpedia.org/resource/R> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/P> .
";

fn wr_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wr"));
    cmd.current_dir(dir);
    cmd.env("WIKIRANK_LOG", "error");
    cmd.env_remove("WIKIRANK_FORMAT");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env("XDG_CACHE_HOME", dir.join(".cache"));
    cmd
}

fn write_inputs(dir: &Path, redirects: &str, links: &str) {
    fs::write(dir.join("redirects.nt"), redirects).expect("write redirects");
    fs::write(dir.join("links.nt"), links).expect("write links");
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("wr should not crash");
    assert!(
        output.status.success(),
        "wr failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout must be valid JSON")
}

fn rank_json(dir: &Path, extra: &[&str]) -> Value {
    let mut cmd = wr_cmd(dir);
    cmd.args([
        "rank",
        "--redirects",
        "redirects.nt",
        "--links",
        "links.nt",
        "--no-cache",
        "--format",
        "json",
    ])
    .args(extra);
    json_stdout(&mut cmd)
}

fn top_names(report: &Value) -> Vec<String> {
    report["top"]
        .as_array()
        .expect("top must be an array")
        .iter()
        .map(|row| row["name"].as_str().expect("name").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// wr rank
// ---------------------------------------------------------------------------

#[test]
fn rank_collapses_redirects_before_ranking() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let report = rank_json(dir.path(), &[]);

    assert_eq!(report["nodes"], 3);
    assert_eq!(report["edges"], 2);
    assert_eq!(report["dangling"], 2);
    assert_eq!(report["stop"], "converged");
    assert_eq!(report["order"], "descending");
    assert_eq!(report["redirects"]["redirects"], 2);

    let names = top_names(&report);
    assert_eq!(names.len(), 3);
    assert!(!names.iter().any(|n| n == "A" || n == "B"), "redirect sources must vanish");
    assert_eq!(names.last().map(String::as_str), Some("C"), "the linking page ranks lowest");
}

#[test]
fn rank_three_cycle_is_uniform() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), "", CYCLE_LINKS);

    let report = rank_json(dir.path(), &[]);

    assert_eq!(report["stop"], "converged");
    for row in report["top"].as_array().expect("top") {
        let score = row["score"].as_f64().expect("score");
        assert!((score - 1.0 / 3.0).abs() < 1e-9, "score {score}");
    }
    // Equal scores fall back to first-seen order.
    assert_eq!(top_names(&report), ["P", "Q", "R"]);
}

#[test]
fn rank_top_and_ascending_flags() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let strongest = rank_json(dir.path(), &["-k", "1"]);
    assert_eq!(top_names(&strongest), ["X"]);

    let report = rank_json(dir.path(), &["-k", "3", "--ascending"]);
    assert_eq!(report["order"], "ascending");
    assert_eq!(top_names(&report), ["C", "Y", "X"]);
}

#[test]
fn rank_limit_truncates_the_link_stream() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let report = rank_json(dir.path(), &["--limit", "1"]);

    assert_eq!(report["nodes"], 2);
    assert_eq!(report["edges"], 1);
}

#[test]
fn rank_dump_lists_every_score() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let mut cmd = wr_cmd(dir.path());
    cmd.args([
        "rank",
        "--redirects",
        "redirects.nt",
        "--links",
        "links.nt",
        "--no-cache",
        "--dump",
        "-",
    ]);
    let dump = json_stdout(&mut cmd);

    let names = dump["names"].as_array().expect("names");
    let scores = dump["scores"].as_array().expect("scores");
    assert_eq!(names.len(), 3);
    assert_eq!(scores.len(), 3);
    let total: f64 = scores.iter().map(|s| s.as_f64().expect("score")).sum();
    assert!((total - 1.0).abs() < 1e-9, "scores sum to {total}");
}

#[test]
fn rank_dump_to_file_keeps_the_report() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), "", CYCLE_LINKS);

    let report = rank_json(dir.path(), &["--dump", "scores.json"]);
    assert_eq!(report["nodes"], 3);

    let raw = fs::read(dir.path().join("scores.json")).expect("dump file");
    let dump: Value = serde_json::from_slice(&raw).expect("dump must be JSON");
    assert_eq!(dump["names"], serde_json::json!(["P", "Q", "R"]));
    assert_eq!(dump["stop"], "converged");
}

#[test]
fn rank_svd_reports_hubs_and_authorities() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let report = rank_json(dir.path(), &["--svd"]);

    let svd = &report["svd"];
    let sigma = svd["singular_value"].as_f64().expect("singular value");
    assert!((sigma - 2f64.sqrt()).abs() < 1e-9, "sigma {sigma}");
    assert_eq!(svd["hubs"][0]["name"], "C");
}

#[test]
fn rank_text_output_is_tab_separated() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), "", CYCLE_LINKS);

    wr_cmd(dir.path())
        .args([
            "rank",
            "--redirects",
            "redirects.nt",
            "--links",
            "links.nt",
            "--no-cache",
            "--format",
            "text",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("nodes 3 edges 3"))
        .stdout(predicate::str::contains("1\tP\t"));
}

#[test]
fn rank_rejects_invalid_damping() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    wr_cmd(dir.path())
        .args([
            "rank",
            "--redirects",
            "redirects.nt",
            "--links",
            "links.nt",
            "--no-cache",
            "--damping",
            "1.5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"))
        .stderr(predicate::str::contains("damping"));
}

#[test]
fn rank_invalid_damping_json_error() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let output = wr_cmd(dir.path())
        .args([
            "rank",
            "--redirects",
            "redirects.nt",
            "--links",
            "links.nt",
            "--damping",
            "0",
            "--format",
            "json",
        ])
        .output()
        .expect("wr should not crash");

    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).expect("stderr must be JSON");
    assert_eq!(err["error"]["error_code"], "E2001");
}

#[test]
fn zero_limit_from_config_fails_before_reading_inputs() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("wikirank.toml"), "[input]\nlimit = 0\n").expect("write config");

    // Neither input exists; the limit must be rejected first.
    wr_cmd(dir.path())
        .args(["graph", "--redirects", "nope.nt", "--links", "gone.nt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"))
        .stderr(predicate::str::contains("limit"))
        .stderr(predicate::str::contains("nope.nt").not());
}

#[test]
fn rank_missing_input_fails_cleanly() {
    let dir = TempDir::new().expect("tempdir");

    wr_cmd(dir.path())
        .args([
            "rank",
            "--redirects",
            "nope.nt",
            "--links",
            "links.nt",
            "--no-cache",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.nt"));
}

// ---------------------------------------------------------------------------
// Cache and config
// ---------------------------------------------------------------------------

#[test]
fn second_run_is_served_from_cache() {
    let dir = TempDir::new().expect("tempdir");
    let cache = TempDir::new().expect("cache dir");
    write_inputs(dir.path(), REDIRECTS, LINKS);
    let cache_dir = cache.path().to_str().expect("utf8 path");

    let args = [
        "rank",
        "--redirects",
        "redirects.nt",
        "--links",
        "links.nt",
        "--cache-dir",
        cache_dir,
        "--format",
        "json",
    ];

    let first = json_stdout(wr_cmd(dir.path()).args(args));
    let second = json_stdout(wr_cmd(dir.path()).args(args));

    assert_eq!(first["from_cache"], false);
    assert_eq!(second["from_cache"], true);
    assert_eq!(first["top"], second["top"]);
    assert!(second.get("redirects").is_none());
}

#[test]
fn changed_input_misses_the_cache() {
    let dir = TempDir::new().expect("tempdir");
    let cache = TempDir::new().expect("cache dir");
    write_inputs(dir.path(), REDIRECTS, LINKS);
    let cache_dir = cache.path().to_str().expect("utf8 path");

    let args = [
        "graph",
        "--redirects",
        "redirects.nt",
        "--links",
        "links.nt",
        "--cache-dir",
        cache_dir,
        "--format",
        "json",
    ];

    json_stdout(wr_cmd(dir.path()).args(args));
    write_inputs(dir.path(), REDIRECTS, CYCLE_LINKS);
    let report = json_stdout(wr_cmd(dir.path()).args(args));

    assert_eq!(report["from_cache"], false);
    assert_eq!(report["edges"], 3);
}

#[test]
fn project_config_sets_defaults() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);
    fs::write(
        dir.path().join("wikirank.toml"),
        "[report]\ntop_k = 1\n\n[cache]\nenabled = false\n",
    )
    .expect("write config");

    let report = rank_json(dir.path(), &[]);
    assert_eq!(top_names(&report).len(), 1);
}

#[test]
fn explicit_config_flag_wins() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);
    fs::write(dir.path().join("wikirank.toml"), "[report]\ntop_k = 1\n").expect("write");
    fs::write(dir.path().join("two.toml"), "[report]\ntop_k = 2\n").expect("write");

    let report = rank_json(dir.path(), &["--config", "two.toml"]);
    assert_eq!(top_names(&report).len(), 2);
}

#[test]
fn malformed_config_reports_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);
    fs::write(dir.path().join("wikirank.toml"), "[report\ntop_k = ").expect("write");

    wr_cmd(dir.path())
        .args(["graph", "--redirects", "redirects.nt", "--links", "links.nt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

// ---------------------------------------------------------------------------
// wr graph / wr redirects
// ---------------------------------------------------------------------------

#[test]
fn graph_reports_ingest_counts() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, LINKS);

    let mut cmd = wr_cmd(dir.path());
    cmd.args([
        "graph",
        "--redirects",
        "redirects.nt",
        "--links",
        "links.nt",
        "--no-cache",
        "--format",
        "json",
    ]);
    let report = json_stdout(&mut cmd);

    assert_eq!(report["nodes"], 3);
    assert_eq!(report["edges"], 2);
    assert_eq!(report["ingest"]["edges_read"], 3);
    assert_eq!(report["ingest"]["truncated"], false);
    assert_eq!(report["ingest"]["stream"]["malformed"], 1);
    assert_eq!(report["redirects"]["stream"]["triples"], 2);
}

#[test]
fn links_can_be_read_from_stdin() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, "");

    let mut cmd = wr_cmd(dir.path());
    cmd.args([
        "graph",
        "--redirects",
        "redirects.nt",
        "--links",
        "-",
        "--format",
        "json",
    ])
    .write_stdin(LINKS);
    let report = json_stdout(&mut cmd);

    assert_eq!(report["nodes"], 3);
    assert_eq!(report["from_cache"], false);
}

#[test]
fn redirects_resolves_chains() {
    let dir = TempDir::new().expect("tempdir");
    write_inputs(dir.path(), REDIRECTS, "");

    let mut cmd = wr_cmd(dir.path());
    cmd.args([
        "redirects",
        "--redirects",
        "redirects.nt",
        "A",
        "Z",
        "--format",
        "json",
    ]);
    let report = json_stdout(&mut cmd);

    assert_eq!(report["redirects"], 2);
    assert_eq!(report["cycle_breaks"], 0);
    assert_eq!(report["resolutions"][0]["target"], "C");
    assert_eq!(report["resolutions"][1]["target"], "Z");
}

#[test]
fn redirects_lists_cycles() {
    let dir = TempDir::new().expect("tempdir");
    let cyclic = "\
<http://dbpedia.org/resource/A> <r> <http://dbpedia.org/resource/B> .
<http://dbpedia.org/resource/B> <r> <http://dbpedia.org/resource/C> .
<http://dbpedia.org/resource/C> <r> <http://dbpedia.org/resource/A> .
";
    write_inputs(dir.path(), cyclic, "");

    let mut cmd = wr_cmd(dir.path());
    cmd.args([
        "redirects",
        "--redirects",
        "redirects.nt",
        "--cycles",
        "A",
        "--format",
        "json",
    ]);
    let report = json_stdout(&mut cmd);

    assert_eq!(report["cycle_breaks"], 3);
    assert_eq!(report["resolutions"][0]["target"], "C");
    assert_eq!(report["resolutions"][0]["cycle"], true);
    assert_eq!(report["cycles"].as_array().expect("cycles").len(), 1);
}
