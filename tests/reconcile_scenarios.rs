// tests/reconcile_scenarios.rs

use std::sync::Arc;

use distwatch::fs::RealFileSystem;
use distwatch::reconcile::{CacheInvalidator, CacheOutcome, ExtensionMap, Reconciler};
use distwatch::types::EntryKind;
use distwatch_test_utils::fixtures::TreeFixture;
use distwatch_test_utils::init_tracing;

fn reconciler(fx: &TreeFixture) -> Reconciler {
    Reconciler::new(Arc::new(RealFileSystem), &fx.paths(), ExtensionMap::default())
}

fn cache(fx: &TreeFixture) -> CacheInvalidator {
    CacheInvalidator::new(Arc::new(RealFileSystem), fx.paths().cache_file)
}

#[test]
fn full_reconcile_deletes_only_the_orphan() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write_all(&["src/a.ts", "src/b.ts"]);
    fx.write_all(&["dist/a.js", "dist/a.d.ts", "dist/b.js", "dist/b.d.ts", "dist/c.js"]);

    let report = reconciler(&fx).reconcile_all().unwrap();

    assert_eq!(report.removed.len(), 1);
    assert!(report.removed[0].ends_with("dist/c.js"));
    assert_eq!(
        fx.files_under("dist"),
        vec!["a.d.ts", "a.js", "b.d.ts", "b.js"]
    );
    assert_eq!(fx.files_under("src"), vec!["a.ts", "b.ts"]);
}

#[test]
fn targeted_clean_after_removal_deletes_counterparts_and_cache() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write_all(&["src/a.ts", "src/b.ts"]);
    fx.write_all(&[
        "dist/a.js",
        "dist/a.d.ts",
        "dist/b.js",
        "dist/b.d.ts",
        "dist/b.js.map",
        "dist/b.d.ts.map",
        "dist/dts/b.d.ts",
        "dist/dts/a.d.ts",
        ".tsbuildinfo",
    ]);

    fx.remove("src/b.ts");
    let removed = fx.paths().source_root.join("b.ts");
    let report = reconciler(&fx).clean_removed(&removed, EntryKind::File);
    let cache_outcome = cache(&fx).invalidate();

    assert_eq!(report.removed.len(), 5);
    assert!(report.failures.is_empty());
    assert_eq!(fx.files_under("dist"), vec!["a.d.ts", "a.js", "dts/a.d.ts"]);
    assert_eq!(cache_outcome, CacheOutcome::Removed);
    assert!(!fx.exists(".tsbuildinfo"));
}

#[test]
fn targeted_clean_matches_full_reconcile_end_state() {
    init_tracing();
    let layout = [
        "src/a.ts",
        "src/lib/x.ts",
        "src/lib/y.tsx",
        "dist/a.js",
        "dist/lib/x.js",
        "dist/lib/x.d.ts",
        "dist/lib/y.js",
        "dist/lib/y.js.map",
    ];

    let targeted = TreeFixture::new();
    targeted.write_all(&layout);
    targeted.remove("src/lib/y.tsx");
    let removed = targeted.paths().source_root.join("lib/y.tsx");
    reconciler(&targeted).clean_removed(&removed, EntryKind::File);

    let full = TreeFixture::new();
    full.write_all(&layout);
    full.remove("src/lib/y.tsx");
    reconciler(&full).reconcile_all().unwrap();

    assert_eq!(targeted.files_under("dist"), full.files_under("dist"));
    assert_eq!(targeted.files_under("dist"), vec!["a.js", "lib/x.d.ts", "lib/x.js"]);
}

#[test]
fn deleting_last_file_prunes_empty_ancestors_but_not_the_root() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write_all(&["src/keep.ts", "src/deep/er/only.ts"]);
    fx.write_all(&["dist/keep.js", "dist/deep/er/only.js", "dist/deep/er/only.d.ts"]);

    fx.remove("src/deep/er/only.ts");
    let removed = fx.paths().source_root.join("deep/er/only.ts");
    let report = reconciler(&fx).clean_removed(&removed, EntryKind::File);

    assert_eq!(report.removed.len(), 2);
    assert_eq!(report.pruned.len(), 2);
    assert!(!fx.exists("dist/deep"));
    assert!(fx.exists("dist"));
    assert_eq!(fx.files_under("dist"), vec!["keep.js"]);
}

#[test]
fn removed_directory_takes_its_output_subtree() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write_all(&["src/index.ts", "src/widgets/button.tsx", "src/widgets/icons/star.ts"]);
    fx.write_all(&[
        "dist/index.js",
        "dist/widgets/button.js",
        "dist/widgets/icons/star.js",
        "dist/dts/widgets/button.d.ts",
        "dist/dts/index.d.ts",
    ]);

    fx.remove("src/widgets");
    let removed = fx.paths().source_root.join("widgets");
    let report = reconciler(&fx).clean_removed(&removed, EntryKind::Directory);

    assert_eq!(report.removed.len(), 2);
    assert_eq!(fx.files_under("dist"), vec!["dts/index.d.ts", "index.js"]);
}

#[test]
fn second_pass_is_a_no_op() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write_all(&["src/a.ts", "src/lib/b.ts"]);
    fx.write_all(&["dist/a.js", "dist/old.js", "dist/gone/x.js", "dist/lib/b.js", "dist/lib/c.d.ts"]);

    let rec = reconciler(&fx);
    let first = rec.reconcile_all().unwrap();
    assert!(!first.is_noop());

    let plans = rec.plan_all().unwrap();
    assert!(plans.iter().all(|p| p.is_empty()));
    assert!(rec.reconcile_all().unwrap().is_noop());
}

#[test]
fn missing_output_tree_is_not_an_error() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write("src/a.ts");

    let report = reconciler(&fx).reconcile_all().unwrap();
    assert!(report.is_noop());
    assert_eq!(cache(&fx).invalidate(), CacheOutcome::Absent);
}

#[test]
fn assets_with_a_same_named_source_survive() {
    init_tracing();
    let fx = TreeFixture::new();
    fx.write_all(&["src/a.ts", "src/styles.css"]);
    fx.write_all(&["dist/a.js", "dist/styles.css", "dist/stale.css"]);

    reconciler(&fx).reconcile_all().unwrap();
    assert_eq!(fx.files_under("dist"), vec!["a.js", "styles.css"]);
}
