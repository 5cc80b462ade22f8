//! Integration tests for the compilation driver's fallback ladder.
//!
//! Runs the full attempt loop against a scripted compiler and checks call
//! counts, returned artifacts and the diagnostic trail.

mod common;

use common::{init_tracing, scripted_driver, PIXEL_SHADER};
use shader_driver::{
    AttemptConfiguration, AttemptOutcome, CompileFlags, DiagnosticLog, DriverError, EntryKind,
    HResult, Invocation, ENTRY_POINT, SOURCE_PATH_LABEL,
};

fn ladder(labels: &[&str]) -> Vec<AttemptConfiguration> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| AttemptConfiguration::new(*label, CompileFlags::from_bits(1 << i)))
        .collect()
}

/// Test: `fast` fails, `safe` compiles, so the second blob comes back
#[test]
fn test_fast_fails_safe_succeeds() {
    init_tracing();
    let (driver, calls) = scripted_driver(vec![
        Invocation::failed(HResult::E_FAIL)
            .with_diagnostics("C:\\fakepath(3,5): error X3511: unable to unroll loop"),
        Invocation::compiled(b"DXBC-safe".to_vec()),
    ]);
    let configs = vec![
        AttemptConfiguration::new("fast", CompileFlags::OPTIMIZATION_LEVEL3),
        AttemptConfiguration::new("safe", CompileFlags::SKIP_OPTIMIZATION),
    ];
    let mut log = DiagnosticLog::new();

    let artifact = driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &configs)
        .unwrap()
        .expect("safe configuration should compile");

    assert_eq!(artifact.blob.as_bytes(), b"DXBC-safe");
    assert_eq!(artifact.configuration, "safe");
    assert_eq!(calls.borrow().len(), 2);

    let warnings: Vec<&str> = log
        .entries_of(EntryKind::Warning)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(warnings, vec!["Warning: D3D shader compilation failed with fast flags."]);

    let retries: Vec<&str> = log
        .entries_of(EntryKind::Retry)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(retries, vec!["Retrying with safe."]);
}

/// Test: every call carries the fixed label, entry point and zero flags2
#[test]
fn test_requests_use_fixed_arguments() {
    let (driver, calls) = scripted_driver(vec![
        Invocation::failed(HResult::E_FAIL),
        Invocation::compiled(vec![1]),
    ]);
    let configs = AttemptConfiguration::standard_ladder(CompileFlags::OPTIMIZATION_LEVEL2);
    let mut log = DiagnosticLog::new();

    driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_3_0", &configs)
        .unwrap();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 2);
    for (call, config) in calls.iter().zip(&configs) {
        assert_eq!(call.source, PIXEL_SHADER);
        assert_eq!(call.source_name, SOURCE_PATH_LABEL);
        assert_eq!(call.entry_point, ENTRY_POINT);
        assert_eq!(call.target, "ps_3_0");
        assert_eq!(call.flags1, config.flags);
        assert_eq!(call.flags2, 0);
    }
}

/// Test: empty source never reaches the compiler
#[test]
fn test_empty_source_is_a_noop() {
    let (driver, calls) = scripted_driver(vec![]);
    let mut log = DiagnosticLog::new();

    let result = driver
        .compile_to_binary(&mut log, "", "vs_4_0", &ladder(&["a", "b", "c"]))
        .unwrap();

    assert!(result.is_none());
    assert!(calls.borrow().is_empty());
    assert!(log.is_empty());
}

/// Test: first success means exactly one call and no mention of later tiers
#[test]
fn test_first_configuration_success() {
    let (driver, calls) = scripted_driver(vec![
        Invocation::compiled(vec![0x44, 0x58, 0x42, 0x43]).with_diagnostics("warning X3206: implicit truncation"),
    ]);
    let mut log = DiagnosticLog::new();

    let artifact = driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &ladder(&["first", "second", "third"]))
        .unwrap()
        .unwrap();

    assert_eq!(artifact.blob.as_bytes(), &[0x44, 0x58, 0x42, 0x43]);
    assert_eq!(artifact.attempt, 0);
    assert_eq!(calls.borrow().len(), 1);

    // Warnings accompanying a success are still kept.
    assert!(log.contains("implicit truncation"));
    assert!(!log.contains("second"));
    assert!(!log.contains("third"));
    assert_eq!(log.count(EntryKind::Warning), 0);
}

/// Test: N non-fatal failures give N warnings, N-1 retry notes, no artifact
#[test]
fn test_all_configurations_fail() {
    for n in 1..=4 {
        let script = (0..n).map(|_| Invocation::failed(HResult::E_FAIL)).collect();
        let (driver, calls) = scripted_driver(script);
        let labels: Vec<String> = (0..n).map(|i| format!("tier{i}")).collect();
        let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        let mut log = DiagnosticLog::new();

        let result = driver
            .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &ladder(&label_refs))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(calls.borrow().len(), n);
        assert_eq!(log.count(EntryKind::Warning), n);
        assert_eq!(log.count(EntryKind::Retry), n - 1);
        assert_eq!(log.attempts().len(), n);
    }
}

/// Test: out of memory at index i stops after i+1 calls
#[test]
fn test_out_of_memory_aborts_remaining_tiers() {
    for oom_at in 0..3 {
        let mut script: Vec<Invocation> = (0..oom_at)
            .map(|_| Invocation::failed(HResult::E_FAIL))
            .collect();
        script.push(Invocation::out_of_memory());
        let (driver, calls) = scripted_driver(script);
        let mut log = DiagnosticLog::new();

        let err = driver
            .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &ladder(&["a", "b", "c", "d"]))
            .unwrap_err();

        match err {
            DriverError::OutOfMemory { attempt, .. } => assert_eq!(attempt, oom_at),
            other => panic!("expected OutOfMemory, got {other}"),
        }
        assert_eq!(calls.borrow().len(), oom_at + 1);
        assert_eq!(log.count(EntryKind::Warning), oom_at);
        assert_eq!(
            log.attempts().last().map(|a| a.outcome.clone()),
            Some(AttemptOutcome::OutOfMemory)
        );
    }
}

/// Test: compiler messages appear sanitized and in call order
#[test]
fn test_diagnostics_keep_invocation_order() {
    let (driver, _calls) = scripted_driver(vec![
        Invocation::failed(HResult::E_FAIL).with_diagnostics("C:\\fakepath(1,1): first"),
        Invocation::failed(HResult::E_FAIL).with_diagnostics("C:\\fakepath(2,2): second"),
        Invocation::failed(HResult::E_FAIL).with_diagnostics("C:\\fakepath(3,3): third"),
    ]);
    let mut log = DiagnosticLog::new();

    driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &ladder(&["a", "b", "c"]))
        .unwrap();

    let compiler_output: Vec<&str> = log
        .entries_of(EntryKind::Compiler)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(compiler_output, vec!["(1,1): first", "(2,2): second", "(3,3): third"]);
    assert!(!log.render().contains("fakepath"));

    // Each compiler message precedes the warning for its own attempt.
    let kinds: Vec<EntryKind> = log.entries().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntryKind::Compiler,
            EntryKind::Warning,
            EntryKind::Retry,
            EntryKind::Compiler,
            EntryKind::Warning,
            EntryKind::Retry,
            EntryKind::Compiler,
            EntryKind::Warning,
        ]
    );
}

/// Test: one log shared across calls only ever grows
#[test]
fn test_log_accumulates_across_calls() {
    let (driver, _calls) = scripted_driver(vec![
        Invocation::failed(HResult::E_FAIL),
        Invocation::failed(HResult::E_FAIL),
        Invocation::compiled(vec![9]),
    ]);
    let mut log = DiagnosticLog::new();
    let configs = ladder(&["only"]);

    driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &configs)
        .unwrap();
    let after_first = log.entry_count();
    driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &configs)
        .unwrap();
    assert!(log.entry_count() > after_first);

    let artifact = driver
        .compile_to_binary(&mut log, PIXEL_SHADER, "ps_4_0", &configs)
        .unwrap();
    assert!(artifact.is_some());
    assert_eq!(log.attempts().len(), 3);
}
