use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use runway_core::{
    archive::{default_output_dir, strip_archive_suffix, supported_extensions, ArchiveInfo},
    RunwayResult,
};
use runway_events::{ArchiveStage, OperationId, RunwayEvent};

use crate::{
    parallel::{run_parallel, ParallelTask},
    progress::next_op_id,
    types::ParallelReport,
    RunwayContext,
};

fn emit(ctx: &RunwayContext, op_id: OperationId, path: &Path, stage: ArchiveStage) {
    ctx.events().emit(RunwayEvent::Archive {
        op_id,
        path: path.to_path_buf(),
        stage,
    });
}

/// Extracts one archive, into `out` or a sibling directory named after it.
pub fn extract(ctx: &RunwayContext, path: &Path, out: Option<&Path>) -> RunwayResult<PathBuf> {
    let op_id = next_op_id();
    let output = out.map_or_else(|| default_output_dir(path), Path::to_path_buf);
    emit(
        ctx,
        op_id,
        path,
        ArchiveStage::Extracting {
            output: output.clone(),
        },
    );

    match ctx.archive_manager().extract(path, Some(&output)) {
        Ok(output) => {
            emit(
                ctx,
                op_id,
                path,
                ArchiveStage::Complete {
                    output: output.clone(),
                },
            );
            Ok(output)
        }
        Err(err) => {
            emit(ctx, op_id, path, ArchiveStage::Failed(err.to_string()));
            Err(err)
        }
    }
}

/// Extracts every archive into `<out>/<name without suffix>`, several at a
/// time. One bad archive does not stop the others.
pub async fn extract_all(
    ctx: &RunwayContext,
    archives: &[PathBuf],
    out: &Path,
) -> RunwayResult<ParallelReport> {
    let tasks = archives
        .iter()
        .map(|archive| {
            let ctx = ctx.clone();
            let archive = archive.clone();
            let target = out.join(strip_archive_suffix(&archive));
            ParallelTask::new(archive.display().to_string(), move || {
                extract(&ctx, &archive, Some(&target)).map(|_| ())
            })
        })
        .collect();

    run_parallel(ctx, tasks, "extracting archives").await
}

pub fn create(ctx: &RunwayContext, files: &[PathBuf], out: &Path, format: &str) -> RunwayResult<()> {
    let op_id = next_op_id();
    emit(
        ctx,
        op_id,
        out,
        ArchiveStage::Creating { files: files.len() },
    );

    match ctx.archive_manager().create(files, out, format) {
        Ok(()) => {
            emit(
                ctx,
                op_id,
                out,
                ArchiveStage::Complete {
                    output: out.to_path_buf(),
                },
            );
            Ok(())
        }
        Err(err) => {
            emit(ctx, op_id, out, ArchiveStage::Failed(err.to_string()));
            Err(err)
        }
    }
}

pub fn info(ctx: &RunwayContext, path: &Path) -> RunwayResult<ArchiveInfo> {
    ctx.archive_manager().info(path)
}

/// Archive tools and whether each is on the PATH.
pub fn tools(ctx: &RunwayContext) -> BTreeMap<&'static str, bool> {
    ctx.archive_manager().check_tools()
}

pub fn formats() -> Vec<&'static str> {
    supported_extensions()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use runway_config::config::Config;
    use runway_core::{
        command::{CommandOutput, RecordingExecutor},
        error::RunwayError,
    };

    use super::*;
    use crate::context::test_support::test_context;

    #[test]
    fn test_extract_emits_stages() {
        let t = test_context(Config::default_config(), RecordingExecutor::new().with_tools(&["tar"]));
        let archive = t.root.path().join("site.tar.gz");
        fs::write(&archive, "not really gzip").unwrap();

        let output = extract(&t.ctx, &archive, None).unwrap();
        assert_eq!(output, t.root.path().join("site"));
        assert!(output.is_dir());

        let events = t.events.events();
        assert!(matches!(
            &events[0],
            RunwayEvent::Archive { stage: ArchiveStage::Extracting { output }, .. } if output.ends_with("site")
        ));
        assert!(matches!(
            &events[1],
            RunwayEvent::Archive { stage: ArchiveStage::Complete { .. }, .. }
        ));
    }

    #[test]
    fn test_extract_unsupported_reports_failure() {
        let t = test_context(Config::default_config(), RecordingExecutor::new());
        let file = t.root.path().join("notes.txt");

        assert!(matches!(
            extract(&t.ctx, &file, None),
            Err(RunwayError::UnsupportedArchive(_))
        ));
        assert!(matches!(
            &t.events.events()[1],
            RunwayEvent::Archive { stage: ArchiveStage::Failed(_), .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_extract_all_collects_failures() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new().with_tools(&["tar", "unzip"]),
        );
        let good = t.root.path().join("a.tar.xz");
        let also_good = t.root.path().join("b.zip");
        let missing = t.root.path().join("gone.tar.gz");
        fs::write(&good, "x").unwrap();
        fs::write(&also_good, "x").unwrap();
        let out = t.root.path().join("out");

        let report = extract_all(&t.ctx, &[good, also_good, missing.clone()], &out)
            .await
            .unwrap();
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, missing.display().to_string());
        assert!(out.join("a").is_dir());
        assert!(out.join("b").is_dir());

        let calls = t.exec.calls();
        assert!(calls.iter().any(|c| c.starts_with("tar -xJf")));
        assert!(calls.iter().any(|c| c.starts_with("unzip -o")));
    }

    #[test]
    fn test_create_checks_format() {
        let t = test_context(Config::default_config(), RecordingExecutor::new().with_tools(&["zip"]));
        let file = t.root.path().join("index.html");
        fs::write(&file, "<html>").unwrap();
        let out = t.root.path().join("site.zip");

        create(&t.ctx, &[file.clone()], &out, "zip").unwrap();
        assert!(t.exec.calls()[0].starts_with("zip -r"));

        assert!(matches!(
            create(&t.ctx, &[file], &out, "cab"),
            Err(RunwayError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_info_and_tools() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new()
                .with_tools(&["tar"])
                .reply("tar -tf", CommandOutput::ok("site/\nsite/index.html\n")),
        );
        let archive = t.root.path().join("site.tar");
        fs::write(&archive, "tar bytes").unwrap();

        let info = info(&t.ctx, &archive).unwrap();
        assert!(info.is_valid);
        assert_eq!(info.contents, vec!["site/", "site/index.html"]);
        assert_eq!(info.size, 9);

        let tools = tools(&t.ctx);
        assert_eq!(tools.get("tar"), Some(&true));
        assert_eq!(tools.get("unzip"), Some(&false));
        assert!(formats().contains(&".tar.gz"));
    }
}
