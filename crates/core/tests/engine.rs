mod common;

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{Annotated, GiveUp, Never, Raw, ReadOnlyFs, Slow, Text, Workspace};
use refsnap::{SnapshotCall, SnapshotConfig, SnapshotError};

fn call(ws: &Workspace) -> SnapshotCall {
    SnapshotCall::new("renders_header", ws.source_file())
}

#[test]
fn test_missing_reference_is_recorded_then_matches() {
    let ws = Workspace::new();
    let engine = ws.engine();

    let err = engine
        .verify(|| "hello".to_string(), &Text, &call(&ws))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::NoReference { .. }), "{err}");
    assert!(err.to_string().contains("No reference was found on disk"));

    let reference = ws.snapshot_dir().join("renders_header.1.txt");
    assert_eq!(fs::read_to_string(&reference).unwrap(), "hello");

    // A fresh engine starts counting from 1 again, like a new test run.
    let engine = ws.engine();
    engine
        .verify(|| "hello".to_string(), &Text, &call(&ws))
        .unwrap();
}

#[test]
fn test_record_mode_overwrites_and_reports_previous_diff() {
    let ws = Workspace::new();
    let named = call(&ws).named("greeting");

    let _ = ws.engine().verify(|| "before".to_string(), &Text, &named);

    let err = ws
        .engine()
        .verify(|| "after".to_string(), &Text, &named.clone().record(true))
        .unwrap_err();
    assert!(err.is_recording());
    let message = err.to_string();
    assert!(message.starts_with("Record mode is on."), "{message}");
    assert!(message.contains("\u{2212} before"), "{message}");
    assert!(message.contains("+ after"), "{message}");

    let reference = ws.snapshot_dir().join("renders_header.greeting.txt");
    assert_eq!(fs::read_to_string(reference).unwrap(), "after");
}

#[test]
fn test_global_record_mode_fails_even_when_matching() {
    let ws = Workspace::new();
    let named = call(&ws).named("same");
    let _ = ws.engine().verify(|| "same".to_string(), &Text, &named);

    let engine = ws.engine_with(SnapshotConfig {
        record: true,
        ..ws.config()
    });
    let err = engine
        .verify(|| "same".to_string(), &Text, &named)
        .unwrap_err();
    assert!(matches!(err, SnapshotError::RecordMode { .. }));
    assert!(err.to_string().contains("Recorded snapshot: \u{2026}"));
}

#[test]
fn test_mismatch_writes_failed_artifact() {
    let ws = Workspace::new();
    let _ = ws.engine().verify(|| "expected".to_string(), &Text, &call(&ws));

    let err = ws
        .engine()
        .verify(|| "actual".to_string(), &Text, &call(&ws))
        .unwrap_err();
    let SnapshotError::Mismatch {
        reference,
        failed,
        command,
        diff,
        attachments,
    } = &err
    else {
        panic!("expected mismatch, got {err}");
    };

    assert_eq!(*reference, ws.snapshot_dir().join("renders_header.1.txt"));
    assert_eq!(*failed, ws.artifacts_dir().join("render").join("renders_header.1.txt"));
    assert_eq!(fs::read_to_string(failed).unwrap(), "actual");
    assert_eq!(fs::read_to_string(reference).unwrap(), "expected");
    assert_eq!(
        *command,
        format!("@\u{2212}\n\"{}\"\n@+\n\"{}\"", reference.display(), failed.display())
    );
    assert!(diff.contains("+ actual"));
    assert!(attachments.is_empty());
    assert!(err.to_string().starts_with("Snapshot does not match reference."));
}

#[test]
fn test_mismatch_uses_configured_diff_tool() {
    let ws = Workspace::new();
    let _ = ws.engine().verify(|| "a".to_string(), &Text, &call(&ws));

    let engine = ws.engine_with(SnapshotConfig {
        diff_tool: Some("ksdiff".to_string()),
        ..ws.config()
    });
    let err = engine.verify(|| "b".to_string(), &Text, &call(&ws)).unwrap_err();
    let SnapshotError::Mismatch {
        reference,
        failed,
        command,
        ..
    } = err
    else {
        panic!("expected mismatch");
    };
    assert_eq!(
        command,
        format!("ksdiff \"{}\" \"{}\"", reference.display(), failed.display())
    );
}

#[test]
fn test_mismatch_writes_attachments_next_to_failed_artifact() {
    let ws = Workspace::new();
    let _ = ws.engine().verify(|| "abc".to_string(), &Annotated, &call(&ws));

    let err = ws
        .engine()
        .verify(|| "abcdef".to_string(), &Annotated, &call(&ws))
        .unwrap_err();
    let SnapshotError::Mismatch { attachments, .. } = &err else {
        panic!("expected mismatch, got {err}");
    };

    let expected = ws
        .artifacts_dir()
        .join("render")
        .join("renders_header.1.lengths.txt");
    assert_eq!(attachments, &vec![expected.clone()]);
    assert_eq!(fs::read_to_string(&expected).unwrap(), "3 6");
    assert!(err.to_string().contains("Attachments:"));
}

#[test]
fn test_deferred_render_within_timeout() {
    let ws = Workspace::new();
    let err = ws
        .engine()
        .verify(
            || "late".to_string(),
            &Slow(Duration::from_millis(20)),
            &call(&ws).timeout(Duration::from_secs(5)),
        )
        .unwrap_err();
    assert!(matches!(err, SnapshotError::NoReference { .. }));
    assert_eq!(
        fs::read_to_string(ws.snapshot_dir().join("renders_header.1.txt")).unwrap(),
        "late"
    );
}

#[test]
fn test_render_timeout() {
    let ws = Workspace::new();
    let engine = ws.engine();

    let started = Instant::now();
    let err = engine
        .verify(
            || "never".to_string(),
            &Never,
            &call(&ws).timeout(Duration::from_millis(100)),
        )
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        err,
        SnapshotError::Timeout { timeout } if timeout == Duration::from_millis(100)
    ));
    assert_eq!(
        err.to_string(),
        "Exceeded timeout of 0.1 seconds waiting for snapshot"
    );
}

#[test]
fn test_timed_out_render_never_writes() {
    let ws = Workspace::new();
    let engine = ws.engine();

    let err = engine
        .verify(
            || "slow".to_string(),
            &Slow(Duration::from_millis(200)),
            &call(&ws).named("slow").timeout(Duration::from_millis(20)),
        )
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Timeout { .. }));

    // Later assertions on the same engine are unaffected.
    let err = engine
        .verify(|| "next".to_string(), &Text, &call(&ws))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::NoReference { .. }));

    std::thread::sleep(Duration::from_millis(300));
    assert!(!ws.snapshot_dir().join("renders_header.slow").exists());
}

#[test]
fn test_render_without_artifact() {
    let ws = Workspace::new();
    let err = ws
        .engine()
        .verify(|| "x".to_string(), &GiveUp, &call(&ws))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::RenderFailed));
    assert_eq!(err.to_string(), "Couldn't snapshot value");
}

#[test]
fn test_value_failure_still_marks_reference_checked() {
    let ws = Workspace::new();
    let engine = ws.engine();

    let err = engine
        .try_verify(|| Err::<String, _>("database unavailable"), &Text, &call(&ws))
        .unwrap_err();
    assert_eq!(err.to_string(), "Couldn't evaluate value: database unavailable");

    let err = engine
        .verify(|| -> String { panic!("exploded") }, &Text, &call(&ws))
        .unwrap_err();
    assert!(matches!(&err, SnapshotError::Value(message) if message == "exploded"));

    let dir = ws.snapshot_dir();
    assert!(engine.checked().is_checked(&dir, &dir.join("renders_header.1.txt")));
    assert!(engine.checked().is_checked(&dir, &dir.join("renders_header.2.txt")));
    assert!(!dir.join("renders_header.1.txt").exists());
}

#[test]
fn test_io_failure_is_reported() {
    let ws = Workspace::new();
    let engine = ws.engine().with_file_system(Arc::new(ReadOnlyFs));

    let err = engine
        .verify(|| "x".to_string(), &Text, &call(&ws))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Io { .. }));
    assert!(err.to_string().contains("read-only filesystem"), "{err}");
    assert!(engine.checked().checked(&ws.snapshot_dir()).is_empty());
}

#[test]
fn test_undecodable_reference() {
    let ws = Workspace::new();
    let dir = ws.snapshot_dir();
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("renders_header.1.txt"), [0xff, 0xfe, 0x00]).unwrap();

    let err = ws
        .engine()
        .verify(|| "x".to_string(), &Text, &call(&ws))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Decode { .. }), "{err}");
}

#[test]
fn test_unnamed_calls_are_numbered_per_test() {
    let ws = Workspace::new();
    let engine = ws.engine();

    for value in ["one", "two"] {
        let _ = engine.verify(|| value.to_string(), &Text, &call(&ws));
    }
    let _ = engine.verify(
        || "other".to_string(),
        &Text,
        &SnapshotCall::new("renders footer!", ws.source_file()),
    );
    let _ = engine.verify(|| "named".to_string(), &Text, &call(&ws).named("Dark Mode"));

    let dir = ws.snapshot_dir();
    assert_eq!(fs::read_to_string(dir.join("renders_header.1.txt")).unwrap(), "one");
    assert_eq!(fs::read_to_string(dir.join("renders_header.2.txt")).unwrap(), "two");
    assert_eq!(fs::read_to_string(dir.join("renders-footer.1.txt")).unwrap(), "other");
    assert_eq!(
        fs::read_to_string(dir.join("renders_header.Dark-Mode.txt")).unwrap(),
        "named"
    );
}

#[test]
fn test_strategy_without_extension() {
    let ws = Workspace::new();
    let engine = ws.engine();
    let _ = engine.verify(|| "x".to_string(), &GiveUp, &call(&ws));

    let dir = ws.snapshot_dir();
    assert!(engine.checked().is_checked(&dir, &dir.join("renders_header.1")));
}

#[test]
fn test_extensionless_attachments_keep_identifier() {
    let ws = Workspace::new();
    let recording = ws.engine();
    let _ = recording.verify(|| "a1".to_string(), &Raw, &call(&ws));
    let _ = recording.verify(|| "a2".to_string(), &Raw, &call(&ws));

    let engine = ws.engine();
    for value in ["b1", "b2"] {
        let err = engine.verify(|| value.to_string(), &Raw, &call(&ws)).unwrap_err();
        assert!(err.is_mismatch(), "{err}");
    }

    let dir = ws.artifacts_dir().join("render");
    let mut names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        [
            "renders_header.1",
            "renders_header.1.note",
            "renders_header.2",
            "renders_header.2.note"
        ]
    );
    assert_eq!(fs::read_to_string(dir.join("renders_header.1.note")).unwrap(), "b1");
    assert_eq!(fs::read_to_string(dir.join("renders_header.2.note")).unwrap(), "b2");
}

#[tokio::test]
async fn test_engine_drops_inside_async_context() {
    let ws = Workspace::new();
    let engine = ws.engine();
    let err = engine
        .verify(|| "async".to_string(), &Slow(Duration::from_millis(5)), &call(&ws))
        .unwrap_err();
    assert!(matches!(err, SnapshotError::NoReference { .. }), "{err}");
    drop(engine);

    ws.engine()
        .verify(|| "async".to_string(), &Slow(Duration::from_millis(5)), &call(&ws))
        .unwrap();
}

#[test]
fn test_concurrent_unnamed_calls_get_distinct_files() {
    let ws = Workspace::new();
    let engine = ws.engine();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let engine = &engine;
            let ws = &ws;
            scope.spawn(move || {
                let _ = engine.verify(|| format!("value {i}"), &Text, &call(ws));
            });
        }
    });

    let files = fs::read_dir(ws.snapshot_dir()).unwrap().count();
    assert_eq!(files, 8);
    for n in 1..=8 {
        assert!(ws.snapshot_dir().join(format!("renders_header.{n}.txt")).exists());
    }
}
