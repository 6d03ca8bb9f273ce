//! Parse, print, reparse, print over the fixtures in `tests/fixtures`.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::fs;
use std::path::PathBuf;

use fir_ir::verify_abstraction;
use fir_syntax::{parse_module, print_module};
use pretty_assertions::assert_eq;

fn fixtures() -> Vec<(String, String)> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut found: Vec<(String, String)> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "fir"))
        .map(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read_to_string(&path).unwrap())
        })
        .collect();
    found.sort();
    assert!(!found.is_empty(), "no fixtures in {}", dir.display());
    found
}

#[test]
fn printing_is_a_fixed_point() {
    for (name, text) in fixtures() {
        let first = print_module(&parse_module(&text).unwrap_or_else(|e| panic!("{name}: {e}")));
        let reparsed = parse_module(&first).unwrap_or_else(|e| panic!("{name} reprint: {e}"));
        assert_eq!(print_module(&reparsed), first, "{name}");
    }
}

#[test]
fn fixtures_are_well_formed() {
    for (name, text) in fixtures() {
        let module = parse_module(&text).unwrap();
        for abstraction in module.abstractions() {
            assert_eq!(verify_abstraction(abstraction, None), vec![], "{name}");
        }
    }
}

#[test]
fn reparsed_modules_are_structurally_equal() {
    for (name, text) in fixtures() {
        let first = parse_module(&text).unwrap();
        let second = parse_module(&print_module(&first)).unwrap();
        let first_functions: Vec<_> = first.functions().collect();
        let second_functions: Vec<_> = second.functions().collect();
        assert_eq!(first_functions.len(), second_functions.len(), "{name}");
        for (f, g) in first_functions.into_iter().zip(second_functions) {
            assert_eq!(f.name(), g.name(), "{name}");
            let pairs = first.versions(f.id()).zip(second.versions(g.id()));
            for (a, b) in pairs {
                assert_eq!(a.params(), b.params(), "{name}");
                assert_eq!(a.locals(), b.locals(), "{name}");
                assert_eq!(a.signature(), b.signature(), "{name}");
                assert_eq!(a.cfg().len(), b.cfg().len(), "{name}");
            }
        }
    }
}

fn version_headers(text: &str) -> Vec<String> {
    let module = parse_module(text).unwrap();
    let function = module.function_by_name("g").unwrap();
    module
        .versions(function.id())
        .map(|version| version.signature().to_string())
        .collect()
}

#[test]
fn dispatch_order_does_not_depend_on_source_order() {
    let versions = [
        "(a: int, b: p(* +), c: V) --> * { | entry: unreachable; }",
        "(a: V, b: int, c: int) --> * { | entry: unreachable; }",
        "(a: p(* +), b: V, c: int) --> * { | entry: unreachable; }",
    ];
    let forward = format!("fun g {{ {} }}", versions.join(" "));
    let backward = format!(
        "fun g {{ {} {} {} }}",
        versions[2], versions[0], versions[1]
    );
    let expected = version_headers(&forward);
    assert_eq!(version_headers(&backward), expected);
    assert_eq!(version_headers(&print_module(&parse_module(&forward).unwrap())), expected);
}
