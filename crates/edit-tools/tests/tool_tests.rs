//! Tool-layer tests: dispatch, input validation, and the end-to-end
//! editing scenarios driven through the registry.

use std::sync::Arc;

use anyhow::Result;
use edit_engine::EditEngine;
use edit_tools::{ToolError, ToolOutput, ToolRegistry};
use serde_json::json;

fn setup() -> Result<(tempfile::TempDir, Arc<EditEngine>, ToolRegistry)> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let dir = tempfile::tempdir()?;
    let engine = Arc::new(EditEngine::new(dir.path())?);
    let registry = ToolRegistry::with_default_tools(engine.clone());
    Ok((dir, engine, registry))
}

fn output(value: serde_json::Value) -> ToolOutput {
    serde_json::from_value(value).expect("tool output shape")
}

// ---------------------------------------------------------------------------
// Registry & validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registry_exposes_the_canonical_toolset() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    let names: Vec<String> = registry.definitions().iter().map(|d| d.name.clone()).collect();
    for expected in [
        "ApplyEditBlock",
        "ApplyRangedEdit",
        "ApplyUnifiedDiff",
        "ApplyWholeFileEdit",
        "CompareFiles",
        "CreateDirectory",
        "Delete",
        "ListSnapshots",
        "MergeSnapshots",
        "ReadFile",
        "ReverseDiff",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {expected}");
    }
    assert!(registry.contains("ConsolidateSnapshots"), "alias missing");
    Ok(())
}

#[tokio::test]
async fn unknown_tool_is_rejected() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    let err = registry.invoke("NoSuchTool", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(_)));
    assert_eq!(err.kind_code(), "unknown_tool");
    Ok(())
}

#[tokio::test]
async fn unknown_fields_fail_before_any_side_effect() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    let err = registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "f.txt", "content": "x", "surprise": true}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind_code(), "invalid_input");
    assert!(!dir.path().join("f.txt").exists(), "side effect leaked");
    Ok(())
}

#[tokio::test]
async fn missing_required_field_is_invalid_input() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    let err = registry
        .invoke("ApplyEditBlock", json!({"path": "f.txt", "search": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput { .. }));
    Ok(())
}

#[tokio::test]
async fn engine_errors_carry_stable_kind_codes() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    let err = registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "../outside.txt", "content": "x"}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind_code(), "path_outside_workspace");
    let folded = ToolOutput::from_error(&err);
    assert!(!folded.success);
    assert_eq!(folded.error_kind.as_deref(), Some("path_outside_workspace"));
    Ok(())
}

// ---------------------------------------------------------------------------
// Editing tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whole_file_edit_records_a_snapshot() -> Result<()> {
    let (dir, engine, registry) = setup()?;
    let out = output(
        registry
            .invoke(
                "ApplyWholeFileEdit",
                json!({
                    "path": "text.txt",
                    "content": "agi is coming\n",
                    "description": "seed file",
                    "goal": "demo"
                }),
            )
            .await?,
    );
    assert!(out.success);
    assert!(out.snapshot_id.is_some());
    assert_eq!(out.affected_files, vec!["text.txt"]);
    assert!(out.diff.unwrap().contains("@@ -1,0 +1,1 @@"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("text.txt"))?,
        "agi is coming\n"
    );
    assert_eq!(engine.snapshots().len().await, 1);
    Ok(())
}

#[tokio::test]
async fn edit_block_and_ranged_edit_round_trip() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "f.txt", "content": "alpha\nbeta\ngamma\n"}),
        )
        .await?;
    let out = output(
        registry
            .invoke(
                "ApplyEditBlock",
                json!({"path": "f.txt", "search": "beta", "replace": "BETA"}),
            )
            .await?,
    );
    assert!(out.success);
    assert_eq!(out.changes_applied, 1);

    let out = output(
        registry
            .invoke(
                "ApplyRangedEdit",
                json!({"path": "f.txt", "content": "GAMMA\n", "start_line": 3, "end_line": 3}),
            )
            .await?,
    );
    assert!(out.success);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("f.txt"))?,
        "alpha\nBETA\nGAMMA\n"
    );
    Ok(())
}

#[tokio::test]
async fn multi_file_diff_apply_is_one_snapshot() -> Result<()> {
    let (dir, engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "src/a.js", "content": "let a = 1;\n"}),
        )
        .await?;

    let diff = "--- a/src/a.js\n+++ b/src/a.js\n@@ -1,1 +1,1 @@\n-let a = 1;\n+let a = 2;\n\
                --- /dev/null\n+++ b/src/b.js\n@@ -1,0 +1,1 @@\n+export {};\n";
    let before = engine.snapshots().len().await;
    let out = output(
        registry
            .invoke(
                "ApplyUnifiedDiff",
                json!({"diff": diff, "description": "update a, create b"}),
            )
            .await?,
    );
    assert!(out.success, "{}", out.message);
    assert!(out.is_multi_file);
    assert_eq!(out.affected_files, vec!["src/a.js", "src/b.js"]);
    assert_eq!(out.per_file_results.len(), 2);
    assert_eq!(engine.snapshots().len().await, before + 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/a.js"))?,
        "let a = 2;\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/b.js"))?,
        "export {};\n"
    );
    Ok(())
}

#[tokio::test]
async fn reverse_diff_tool_undoes_an_edit() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "text.txt", "content": "agi is coming\n"}),
        )
        .await?;
    let update = output(
        registry
            .invoke(
                "ApplyWholeFileEdit",
                json!({"path": "text.txt", "content": "agi is here\n", "mode": "overwrite"}),
            )
            .await?,
    );

    let out = output(
        registry
            .invoke(
                "ReverseDiff",
                json!({"diff": update.diff.unwrap(), "description": "undo"}),
            )
            .await?,
    );
    assert!(out.success, "{}", out.message);
    assert!(out.snapshot_id.is_some());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("text.txt"))?,
        "agi is coming\n"
    );
    Ok(())
}

#[tokio::test]
async fn reverse_diff_without_apply_only_computes() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "f.txt", "content": "after\n"}),
        )
        .await?;
    let diff = "--- a/f.txt\n+++ b/f.txt\n@@ -1,1 +1,1 @@\n-before\n+after\n";
    let out = output(
        registry
            .invoke("ReverseDiff", json!({"diff": diff, "apply": false}))
            .await?,
    );
    assert!(out.success);
    assert!(out.snapshot_id.is_none());
    assert!(out.diff.unwrap().contains("-after"));
    // Nothing applied.
    assert_eq!(std::fs::read_to_string(dir.path().join("f.txt"))?, "after\n");
    Ok(())
}

// ---------------------------------------------------------------------------
// Delete & directories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn directory_delete_emits_concatenated_deletion_diffs() -> Result<()> {
    let (dir, engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "pkg/one.txt", "content": "1\n"}),
        )
        .await?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "pkg/two.txt", "content": "2\n"}),
        )
        .await?;

    let out = output(
        registry
            .invoke(
                "Delete",
                json!({"path": "pkg", "recursive": true, "description": "drop pkg"}),
            )
            .await?,
    );
    assert!(out.success);
    assert_eq!(out.affected_files, vec!["pkg/one.txt", "pkg/two.txt"]);
    let diff = out.diff.unwrap();
    assert_eq!(diff.matches("+++ /dev/null").count(), 2);
    assert!(!dir.path().join("pkg").exists());

    let snap = engine
        .snapshots()
        .get(out.snapshot_id.as_deref().unwrap())
        .await?;
    assert_eq!(snap.tool.to_string(), "directory_delete");
    Ok(())
}

#[tokio::test]
async fn non_empty_directory_needs_recursive_flag() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "pkg/keep.txt", "content": "x\n"}),
        )
        .await?;
    let err = registry
        .invoke("Delete", json!({"path": "pkg"}))
        .await
        .unwrap_err();
    assert_eq!(err.kind_code(), "invalid_path");
    assert!(dir.path().join("pkg/keep.txt").exists());
    Ok(())
}

#[tokio::test]
async fn delete_single_file_through_the_tool() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "gone.txt", "content": "bye\n"}),
        )
        .await?;
    let out = output(registry.invoke("Delete", json!({"path": "gone.txt"})).await?);
    assert!(out.success);
    assert!(out.diff.unwrap().contains("+++ /dev/null"));
    assert!(!dir.path().join("gone.txt").exists());
    Ok(())
}

#[tokio::test]
async fn create_directory_tool_is_idempotent() -> Result<()> {
    let (dir, _engine, registry) = setup()?;
    let out = output(
        registry
            .invoke("CreateDirectory", json!({"path": "a/b/c"}))
            .await?,
    );
    assert!(out.success);
    assert!(out.snapshot_id.is_none());
    assert!(dir.path().join("a/b/c").is_dir());
    let again = output(
        registry
            .invoke("CreateDirectory", json!({"path": "a/b/c"}))
            .await?,
    );
    assert!(again.success);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read & compare
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_file_supports_line_slices() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "f.txt", "content": "1\n2\n3\n4\n"}),
        )
        .await?;
    let value = registry
        .invoke("ReadFile", json!({"path": "f.txt", "start_line": 2, "end_line": 3}))
        .await?;
    assert_eq!(value["content"], "2\n3\n");
    Ok(())
}

#[tokio::test]
async fn compare_files_reports_identical_and_different() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    registry
        .invoke("ApplyWholeFileEdit", json!({"path": "a.txt", "content": "x\n"}))
        .await?;
    registry
        .invoke("ApplyWholeFileEdit", json!({"path": "b.txt", "content": "y\n"}))
        .await?;
    let out = output(
        registry
            .invoke("CompareFiles", json!({"path_a": "a.txt", "path_b": "b.txt"}))
            .await?,
    );
    assert!(out.success);
    assert!(out.diff.unwrap().contains("+y"));

    registry
        .invoke(
            "ApplyWholeFileEdit",
            json!({"path": "b.txt", "content": "x\n", "mode": "overwrite"}),
        )
        .await?;
    let same = output(
        registry
            .invoke("CompareFiles", json!({"path_a": "a.txt", "path_b": "b.txt"}))
            .await?,
    );
    assert!(same.diff.is_none());
    Ok(())
}

// ---------------------------------------------------------------------------
// Snapshot tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_snapshots_and_consolidate_through_tools() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    for content in ["a\n", "ab\n", "abc\n"] {
        registry
            .invoke(
                "ApplyWholeFileEdit",
                json!({"path": "x.txt", "content": content}),
            )
            .await?;
    }

    let listed = registry
        .invoke("ListSnapshots", json!({"include_diffs": true}))
        .await?;
    assert_eq!(listed["total"], 3);
    let snapshots = listed["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0]["sequence_number"], 1);
    assert!(snapshots[2]["diff"].as_str().unwrap().contains("abc"));

    // Alias resolves to the same tool.
    let merged = registry
        .invoke(
            "ConsolidateSnapshots",
            json!({
                "start_sequence": 1,
                "end_sequence": 3,
                "title": "squash all",
                "goal": "tidy"
            }),
        )
        .await?;
    assert_eq!(merged["sequence_number"], 1);
    assert_eq!(merged["tool"], "consolidation");

    let after = registry.invoke("ListSnapshots", json!({})).await?;
    assert_eq!(after["total"], 1);
    Ok(())
}

#[tokio::test]
async fn consolidating_a_bad_range_is_invalid_range() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    registry
        .invoke("ApplyWholeFileEdit", json!({"path": "x.txt", "content": "a\n"}))
        .await?;
    let err = registry
        .invoke(
            "MergeSnapshots",
            json!({"start_sequence": 1, "end_sequence": 9, "title": "bad"}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind_code(), "invalid_range");
    Ok(())
}

#[tokio::test]
async fn limited_listing_keeps_most_recent() -> Result<()> {
    let (_dir, _engine, registry) = setup()?;
    for content in ["1\n", "2\n", "3\n"] {
        registry
            .invoke(
                "ApplyWholeFileEdit",
                json!({"path": "f.txt", "content": content}),
            )
            .await?;
    }
    let listed = registry.invoke("ListSnapshots", json!({"limit": 2})).await?;
    let snapshots = listed["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0]["sequence_number"], 2);
    assert_eq!(listed["total"], 3);
    Ok(())
}
