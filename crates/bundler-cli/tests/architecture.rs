use std::path::Path;

use arch_lint::rules::{NoErrorSwallowing, NoSilentResultDrop};
use arch_lint::{Analyzer, Severity};

const CRATES: &[&str] = &[
    "bundler-core",
    "bundler-tools",
    "bundler-engine",
    "bundler-cli",
];

/// Library and binary sources must propagate or log every error: no
/// swallowed `Err` arms and no `let _ =` on a `Result`.
#[test]
fn crate_sources_do_not_drop_errors() {
    let crates_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates directory");

    let mut reports = Vec::new();
    for name in CRATES {
        let src = crates_dir.join(name).join("src");
        assert!(src.is_dir(), "{} is not a directory", src.display());

        let analyzer = Analyzer::builder()
            .root(src.as_path())
            .rule(NoErrorSwallowing::new())
            .rule(NoSilentResultDrop::new())
            .build()
            .expect("build analyzer");
        let result = analyzer.analyze().expect("analyze");

        if result.has_violations_at(Severity::Warning) {
            reports.push(format!(
                "{name}:\n{}",
                result.format_test_report(Severity::Warning)
            ));
        }
    }

    assert!(reports.is_empty(), "{}", reports.join("\n"));
}
