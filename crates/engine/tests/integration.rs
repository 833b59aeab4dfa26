//! End-to-end tests for discovery, filtering and concurrent evaluation.
//!
//! Fixtures are written to temporary directories and loaded through the
//! real loader, evaluated by the default evaluator.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use stx_engine::{
    COMMAND_LINE_ARGUMENTS, CollectingSink, Concurrency, ExcludeFilter, Instance, InstanceState,
    Evaluator, LoadConfig, Loader, Scheduler, UnifyEvaluator,
};
use stx_eval::EvalError;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn stack(name: &str) -> String {
    format!("package cfn\n\nStacks: {name}: {{\n    Name: \"{name}\"\n    Size: 1\n}}\n")
}

fn tree(dirs: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for dir in dirs {
        write(tmp.path(), &format!("{dir}/{dir}.cue"), &stack(dir));
    }
    tmp
}

fn loader(root: &Path) -> Loader {
    Loader::new(LoadConfig::default().with_root(root))
}

fn scheduler(sink: &Arc<CollectingSink>) -> Scheduler {
    Scheduler::new(Arc::new(UnifyEvaluator), sink.clone())
}

/// Handler that records every display path it sees.
fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&Instance, &Value) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let collector = Arc::clone(&seen);
    let handler = move |instance: &Instance, _: &Value| {
        collector.lock().push(instance.display_path().to_string());
    };
    (seen, handler)
}

/// Default evaluator that also records every display path it evaluates.
fn tracking_evaluator() -> (Arc<Mutex<Vec<String>>>, Arc<dyn Evaluator>) {
    let evaluated = Arc::new(Mutex::new(Vec::new()));
    let collector = Arc::clone(&evaluated);
    let evaluator: Arc<dyn Evaluator> = Arc::new(move |instance: &Instance| -> Result<Value, EvalError> {
        collector.lock().push(instance.display_path().to_string());
        UnifyEvaluator.evaluate(instance)
    });
    (evaluated, evaluator)
}

fn sorted(paths: &Mutex<Vec<String>>) -> Vec<String> {
    let mut paths = paths.lock().clone();
    paths.sort();
    paths
}

fn display_paths(instances: &[Instance]) -> Vec<&str> {
    instances.iter().map(Instance::display_path).collect()
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn every_instance_is_handled_exactly_once() {
    let tmp = tree(&["a", "b", "c", "d", "e"]);
    let sink = Arc::new(CollectingSink::new());
    let (seen, handler) = recorder();

    let instances = loader(tmp.path()).load::<&str>(&[]);
    let report = scheduler(&sink)
        .process(instances, &ExcludeFilter::none(), handler)
        .await;

    assert_eq!(sorted(&seen), vec!["./a", "./b", "./c", "./d", "./e"]);
    assert_eq!(report.succeeded(), 5);
    assert!(report.is_success());
    assert!(sink.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn excluded_instances_are_never_evaluated() {
    let tmp = tree(&["a", "b", "c", "d", "e"]);
    let sink = Arc::new(CollectingSink::new());
    let (seen, handler) = recorder();

    let (evaluated, evaluator) = tracking_evaluator();

    let filter = ExcludeFilter::compile(Some(r"^\./(b|d)$"), &*sink);
    let instances = loader(tmp.path()).load(&["./..."]);
    let report = Scheduler::new(evaluator, sink.clone())
        .process(instances, &filter, handler)
        .await;

    assert_eq!(sorted(&evaluated), vec!["./a", "./c", "./e"]);
    assert_eq!(sorted(&seen), vec!["./a", "./c", "./e"]);
    assert_eq!(report.excluded(), 2);
    assert_eq!(report.state_of("./d"), Some(InstanceState::Excluded));
    assert!(sink.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_pattern_warns_once_and_filters_nothing() {
    let tmp = tree(&["a", "b", "c"]);
    let sink = Arc::new(CollectingSink::new());
    let (seen, handler) = recorder();

    let filter = ExcludeFilter::compile(Some("(b"), &*sink);
    let instances = loader(tmp.path()).load(&["./..."]);
    let report = scheduler(&sink).process(instances, &filter, handler).await;

    assert_eq!(sorted(&seen), vec!["./a", "./b", "./c"]);
    assert_eq!(report.excluded(), 0);
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].is_warning());
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_is_isolated_to_its_instance() {
    let tmp = tree(&["a", "c"]);
    write(
        tmp.path(),
        "b/b.cue",
        "package cfn\n\nStacks: b: Size: 1\nStacks: b: Size: 2\n",
    );
    let sink = Arc::new(CollectingSink::new());
    let (seen, handler) = recorder();

    let instances = loader(tmp.path()).load(&["./..."]);
    let report = scheduler(&sink)
        .process(instances, &ExcludeFilter::none(), handler)
        .await;

    assert_eq!(sorted(&seen), vec!["./a", "./c"]);
    assert_eq!(report.state_of("./b"), Some(InstanceState::Failed));
    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(
        lines[0].starts_with("Stacks.b.Size: conflicting values 1 and 2 b/b.cue:"),
        "unexpected diagnostic: {}",
        lines[0]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn deeply_nested_source_fails_only_its_instance() {
    let tmp = tree(&["a"]);
    let depth = 5000;
    write(
        tmp.path(),
        "deep/deep.cue",
        &format!("package cfn

x: {}1{}
", "[".repeat(depth), "]".repeat(depth)),
    );
    let sink = Arc::new(CollectingSink::new());
    let (seen, handler) = recorder();

    let instances = loader(tmp.path()).load(&["./..."]);
    assert_eq!(display_paths(&instances), vec!["./a", "./deep"]);
    assert_eq!(instances[1].errors()[0].code(), "LOAD_PARSE");

    let report = scheduler(&sink)
        .process(instances, &ExcludeFilter::none(), handler)
        .await;

    assert_eq!(sorted(&seen), vec!["./a"]);
    assert_eq!(report.state_of("./a"), Some(InstanceState::Succeeded));
    assert_eq!(report.state_of("./deep"), Some(InstanceState::Failed));
    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(
        lines[0].starts_with("nesting too deep") && lines[0].contains(" deep/deep.cue:3:"),
        "unexpected diagnostic: {}",
        lines[0]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_handlers_lose_nothing() {
    let names: Vec<String> = (0..100).map(|i| format!("s{i:03}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let tmp = tree(&refs);
    let sink = Arc::new(CollectingSink::new());
    let (seen, handler) = recorder();

    let instances = loader(tmp.path()).load(&["./..."]);
    assert_eq!(instances.len(), 100);
    let report = scheduler(&sink)
        .process(instances, &ExcludeFilter::none(), handler)
        .await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 100);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 100);
    assert_eq!(report.succeeded(), 100);
    assert!(sink.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn valid_invalid_and_excluded_side_by_side() {
    let tmp = tree(&["a", "c"]);
    write(tmp.path(), "b/b.cue", "package cfn\n\nStacks: b: {\n    Name: \"b\"\n");
    let sink = Arc::new(CollectingSink::new());
    let values = Arc::new(Mutex::new(Vec::new()));
    let collector = Arc::clone(&values);
    let (evaluated, evaluator) = tracking_evaluator();

    let filter = ExcludeFilter::compile(Some("c$"), &*sink);
    let instances = loader(tmp.path()).load(&["./..."]);
    let report = Scheduler::new(evaluator, sink.clone())
        .process(instances, &filter, move |instance: &Instance, value: &Value| {
            collector
                .lock()
                .push((instance.display_path().to_string(), value.clone()));
        })
        .await;

    assert_eq!(
        *values.lock(),
        vec![(
            "./a".to_string(),
            json!({"Stacks": {"a": {"Name": "a", "Size": 1}}})
        )]
    );
    assert_eq!(report.state_of("./a"), Some(InstanceState::Succeeded));
    assert_eq!(report.state_of("./b"), Some(InstanceState::Failed));
    assert_eq!(report.state_of("./c"), Some(InstanceState::Excluded));
    assert_eq!(sorted(&evaluated), vec!["./a", "./b"]);

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].display_path(), Some("./b"));
    assert!(sink.lines()[0].contains(" b/b.cue:"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bounded_concurrency_caps_evaluations_in_flight() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let evaluator = {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        move |_: &Instance| -> Result<Value, EvalError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({}))
        }
    };
    let instances = (0..8)
        .map(|i| Instance::new(format!("./i{i}"), "cfn"))
        .collect();
    let sink = Arc::new(CollectingSink::new());

    let report = Scheduler::new(Arc::new(evaluator), sink)
        .with_concurrency(Concurrency::from_limit(Some(2)))
        .process(instances, &ExcludeFilter::none(), |_: &Instance, _: &Value| {})
        .await;

    assert_eq!(report.succeeded(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_handler_aborts_only_its_instance() {
    let evaluator = |_: &Instance| -> Result<Value, EvalError> { Ok(json!({})) };
    let instances = ["./a", "./b", "./c"]
        .into_iter()
        .map(|path| Instance::new(path, "cfn"))
        .collect();
    let sink = Arc::new(CollectingSink::new());

    let report = Scheduler::new(Arc::new(evaluator), sink.clone())
        .process(instances, &ExcludeFilter::none(), |instance: &Instance, _: &Value| {
            assert_ne!(instance.display_path(), "./b", "handler rejects ./b");
        })
        .await;

    assert_eq!(report.state_of("./a"), Some(InstanceState::Succeeded));
    assert_eq!(report.state_of("./b"), Some(InstanceState::Aborted));
    assert_eq!(report.state_of("./c"), Some(InstanceState::Succeeded));
    assert!(sink.is_empty());
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[test]
fn ancestor_files_join_child_instances() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "base.cue", "package cfn\n\nRegion: \"eu-west-1\"\n");
    write(tmp.path(), "a/a.cue", "package cfn\n\nStacks: a: Region: Region\n");

    let instances = loader(tmp.path()).load(&["./..."]);

    assert_eq!(display_paths(&instances), vec![".", "./a"]);
    let files: Vec<_> = instances[1]
        .files()
        .iter()
        .map(|f| f.path().to_path_buf())
        .collect();
    assert_eq!(files, vec![Path::new("base.cue"), Path::new("a/a.cue")]);
    assert!(Arc::ptr_eq(&instances[0].files()[0], &instances[1].files()[0]));
}

#[test]
fn hidden_underscore_and_module_dirs_are_skipped() {
    let tmp = TempDir::new().unwrap();
    for dir in ["_tmp", ".git", "cue.mod", "ok"] {
        write(tmp.path(), &format!("{dir}/x.cue"), &stack("x"));
    }
    write(tmp.path(), "ok/_ignored.cue", "package cfn\nbroken: {\n");

    let instances = loader(tmp.path()).load(&["./..."]);

    assert_eq!(display_paths(&instances), vec!["./ok"]);
    assert_eq!(instances[0].files().len(), 1);
    assert!(instances[0].is_valid());
}

#[test]
fn other_packages_are_ignored_during_walks() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a/x.cue", "package other\n\nStacks: a: Size: 1\n");
    write(tmp.path(), "b/y.cue", "Stacks: b: Size: 1\n");

    let instances = loader(tmp.path()).load(&["./..."]);

    assert_eq!(display_paths(&instances), vec!["./..."]);
    assert_eq!(instances[0].errors()[0].code(), "LOAD_NO_MATCH");
}

#[test]
fn missing_and_empty_directories_carry_errors() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("empty")).unwrap();

    let instances = loader(tmp.path()).load(&["./nope", "./empty"]);

    assert_eq!(display_paths(&instances), vec!["./nope", "./empty"]);
    assert_eq!(instances[0].errors()[0].code(), "LOAD_NOT_FOUND");
    assert_eq!(
        instances[0].errors()[0].to_string(),
        "cannot find package \"./nope\""
    );
    assert_eq!(instances[1].errors()[0].code(), "LOAD_NO_FILES");
}

#[test]
fn file_arguments_form_one_instance() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a/x.cue", &stack("x"));
    write(tmp.path(), "b/y.cue", &stack("y"));
    write(tmp.path(), "c/z.cue", "package other\n");

    let instances = loader(tmp.path()).load(&["a/x.cue", "./b", "b/y.cue", "c/z.cue"]);

    assert_eq!(display_paths(&instances), vec![COMMAND_LINE_ARGUMENTS, "./b"]);
    let grouped = &instances[0];
    assert_eq!(grouped.files().len(), 2);
    assert_eq!(grouped.errors().len(), 1);
    assert_eq!(grouped.errors()[0].code(), "LOAD_PACKAGE_MISMATCH");
}

#[test]
fn repeated_directories_load_once() {
    let tmp = tree(&["a", "b"]);

    let instances = loader(tmp.path()).load(&["./a", "./...", "a"]);

    assert_eq!(display_paths(&instances), vec!["./a", "./b"]);
}

#[test]
fn parse_errors_do_not_stop_discovery() {
    let tmp = tree(&["a", "c"]);
    write(tmp.path(), "b/b.cue", "package cfn\n\nStacks: b: {\n");

    let instances = loader(tmp.path()).load(&["./..."]);

    assert_eq!(display_paths(&instances), vec!["./a", "./b", "./c"]);
    assert!(instances[0].is_valid());
    assert_eq!(instances[1].errors()[0].code(), "LOAD_PARSE");
    assert!(instances[1].errors()[0].position().is_some());
    assert!(instances[2].is_valid());
}
