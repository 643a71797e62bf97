//! Archive extraction and creation through the system's compression tools.

use std::{
    collections::BTreeMap,
    fmt, fs,
    os::unix::fs::DirBuilderExt,
    path::{Path, PathBuf},
    sync::Arc,
};

use runway_utils::fs::write_file;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    command::CommandExecutor,
    error::{ErrorContext, RunwayError},
    RunwayResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    TarLz4,
    Tar,
    Gz,
    Bz2,
    Xz,
    Zip,
    Rar,
    SevenZ,
    Lz4,
    Zst,
    Lzop,
}

use ArchiveFormat::*;

/// Recognised suffixes. Compound suffixes come before their tails so that
/// `.tar.gz` wins over `.gz`.
const SUFFIXES: [(&str, ArchiveFormat); 18] = [
    (".tar.gz", TarGz),
    (".tgz", TarGz),
    (".tar.bz2", TarBz2),
    (".tbz2", TarBz2),
    (".tar.xz", TarXz),
    (".txz", TarXz),
    (".tar.zst", TarZst),
    (".tar.lz4", TarLz4),
    (".tar", Tar),
    (".gz", Gz),
    (".bz2", Bz2),
    (".xz", Xz),
    (".zip", Zip),
    (".rar", Rar),
    (".7z", SevenZ),
    (".lz4", Lz4),
    (".zst", Zst),
    (".lzop", Lzop),
];

/// Tools reported by [`ArchiveManager::check_tools`].
const TOOLS: [&str; 11] = [
    "tar", "gzip", "bzip2", "xz", "unzip", "unrar", "7z", "lz4", "zstd", "lzop", "gunzip",
];

impl ArchiveFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TarGz => "tar.gz",
            TarBz2 => "tar.bz2",
            TarXz => "tar.xz",
            TarZst => "tar.zst",
            TarLz4 => "tar.lz4",
            Tar => "tar",
            Gz => "gz",
            Bz2 => "bz2",
            Xz => "xz",
            Zip => "zip",
            Rar => "rar",
            SevenZ => "7z",
            Lz4 => "lz4",
            Zst => "zst",
            Lzop => "lzop",
        }
    }

    fn detect_with_suffix(path: &Path) -> Option<(Self, &'static str)> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|&(suffix, format)| (format, suffix))
    }

    pub fn detect<P: AsRef<Path>>(path: P) -> Option<Self> {
        Self::detect_with_suffix(path.as_ref()).map(|(format, _)| format)
    }

    /// Whether `tar -t` can list and validate the archive.
    fn is_classic_tar(self) -> bool {
        matches!(self, TarGz | TarBz2 | TarXz | Tar)
    }

    /// Formats that can be unpacked in-process when the CLI tool is missing.
    fn has_builtin_fallback(self) -> bool {
        matches!(self, TarGz | TarBz2 | TarXz | TarZst | Tar | Zip)
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ArchiveFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn supported_extensions() -> Vec<&'static str> {
    SUFFIXES.iter().map(|(suffix, _)| *suffix).collect()
}

pub fn is_archive<P: AsRef<Path>>(path: P) -> bool {
    ArchiveFormat::detect(path).is_some()
}

/// File name with its archive suffix removed, e.g. `site.tar.gz` -> `site`.
pub fn strip_archive_suffix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match ArchiveFormat::detect_with_suffix(path) {
        Some((_, suffix)) if name.len() > suffix.len() => {
            name[..name.len() - suffix.len()].to_string()
        }
        _ => name,
    }
}

/// Sibling directory named after the archive without its suffix.
pub fn default_output_dir(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    parent.join(strip_archive_suffix(path))
}

/// Output format accepted by [`ArchiveManager::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFormat {
    TarGz,
    TarBz2,
    TarXz,
    Zip,
    SevenZ,
}

impl std::str::FromStr for CreateFormat {
    type Err = RunwayError;

    fn from_str(s: &str) -> RunwayResult<Self> {
        match s.to_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            "tar.bz2" | "tbz2" => Ok(Self::TarBz2),
            "tar.xz" | "txz" => Ok(Self::TarXz),
            "zip" => Ok(Self::Zip),
            "7z" => Ok(Self::SevenZ),
            _ => Err(RunwayError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size: u64,
    pub format: Option<ArchiveFormat>,
    pub is_valid: bool,
    pub contents: Vec<String>,
}

/// Entry names from `unzip -l` output, without header and footer.
pub fn parse_unzip_listing(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.split('\n').collect();
    if lines.len() < 6 {
        return Vec::new();
    }
    lines[3..lines.len() - 3]
        .iter()
        .map(|line| line.split_whitespace().skip(3).collect::<Vec<_>>().join(" "))
        .filter(|name| !name.is_empty())
        .collect()
}

pub struct ArchiveManager {
    executor: Arc<dyn CommandExecutor>,
    dry_run: bool,
}

impl ArchiveManager {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn check_tools(&self) -> BTreeMap<&'static str, bool> {
        TOOLS
            .iter()
            .map(|tool| (*tool, self.executor.exists(tool)))
            .collect()
    }

    fn succeeds(&self, program: &str, args: &[&str]) -> bool {
        self.executor
            .run(program, args)
            .map(|out| out.success)
            .unwrap_or(false)
    }

    fn is_valid(&self, path: &str, format: Option<ArchiveFormat>) -> bool {
        match format {
            Some(f) if f.is_classic_tar() => self.succeeds("tar", &["-tf", path]),
            Some(Gz) => self.succeeds("gunzip", &["-t", path]),
            Some(Zip) => self.succeeds("unzip", &["-t", path]),
            Some(Rar) if self.executor.exists("unrar") => self.succeeds("unrar", &["t", path]),
            _ => true,
        }
    }

    fn list_contents(&self, path: &str, format: Option<ArchiveFormat>) -> Vec<String> {
        let listing = match format {
            Some(f) if f.is_classic_tar() => self.executor.run("tar", &["-tf", path]),
            Some(Zip) => self.executor.run("unzip", &["-l", path]),
            _ => return Vec::new(),
        };

        match listing {
            Ok(out) if out.success && format == Some(Zip) => parse_unzip_listing(&out.stdout),
            Ok(out) if out.success => out.lines().map(String::from).collect(),
            _ => Vec::new(),
        }
    }

    pub fn info(&self, path: &Path) -> RunwayResult<ArchiveInfo> {
        let metadata = fs::metadata(path).map_err(|_| RunwayError::NotFound(path.to_path_buf()))?;
        let format = ArchiveFormat::detect(path);
        let path_str = path.to_string_lossy();

        let is_valid = self.is_valid(&path_str, format);
        let contents = if is_valid {
            self.list_contents(&path_str, format)
        } else {
            Vec::new()
        };

        Ok(ArchiveInfo {
            path: path.to_path_buf(),
            size: metadata.len(),
            format,
            is_valid,
            contents,
        })
    }

    fn create_output_dir(&self, out: &Path) -> RunwayResult<()> {
        if self.dry_run || out.is_dir() {
            return Ok(());
        }
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o750)
            .create(out)
            .with_context(|| format!("creating directory {}", out.display()))
    }

    /// Extracts `path` into `out` (or the default sibling directory) and
    /// returns the directory used.
    pub fn extract(&self, path: &Path, out: Option<&Path>) -> RunwayResult<PathBuf> {
        let format =
            ArchiveFormat::detect(path).ok_or_else(|| RunwayError::UnsupportedArchive(path.to_path_buf()))?;
        if !self.dry_run && !path.exists() {
            return Err(RunwayError::NotFound(path.to_path_buf()));
        }

        let out = out.map_or_else(|| default_output_dir(path), Path::to_path_buf);
        self.create_output_dir(&out)?;

        debug!(format = %format, "extracting {} to {}", path.display(), out.display());
        self.extract_with_tools(path, format, &out)?;
        info!("Extracted {} to {}", path.display(), out.display());
        Ok(out)
    }

    fn required_tool(format: ArchiveFormat) -> &'static str {
        match format {
            TarGz | TarBz2 | TarXz | TarZst | TarLz4 | Tar => "tar",
            Gz => "gunzip",
            Bz2 => "bunzip2",
            Xz => "xz",
            Zip => "unzip",
            Rar => "unrar",
            SevenZ => "7z",
            Lz4 => "lz4",
            Zst => "zstd",
            Lzop => "lzop",
        }
    }

    fn extract_with_tools(&self, path: &Path, format: ArchiveFormat, out: &Path) -> RunwayResult<()> {
        let tool = Self::required_tool(format);
        if !self.executor.exists(tool) {
            if format.has_builtin_fallback() {
                warn!("{} not found, extracting {} in-process", tool, path.display());
                if !self.dry_run {
                    compak::extract_archive(path, out)?;
                }
                return Ok(());
            }
            return Err(RunwayError::ToolMissing(tool.to_string()));
        }

        let archive = path.to_string_lossy();
        let out_str = out.to_string_lossy();
        let single = out.join(strip_archive_suffix(path));
        let single = single.to_string_lossy();

        match format {
            TarGz => self.tar(&["-xzf", &archive, "-C", &out_str]),
            TarBz2 => self.tar(&["-xjf", &archive, "-C", &out_str]),
            TarXz => self.tar(&["-xJf", &archive, "-C", &out_str]),
            Tar => self.tar(&["-xf", &archive, "-C", &out_str]),
            TarZst => self.tar(&["--zstd", "-xf", &archive, "-C", &out_str]),
            TarLz4 => self.tar(&["--lz4", "-xf", &archive, "-C", &out_str]),
            Gz => self.decompress_stream(path, out, "gunzip", &["-c"]),
            Bz2 => self.decompress_stream(path, out, "bunzip2", &["-c"]),
            Xz => self.decompress_stream(path, out, "xz", &["-d", "-c"]),
            Zip => self.check("unzip", &["-o", &archive, "-d", &out_str]),
            Rar => self.check("unrar", &["x", &archive, &out_str]),
            SevenZ => self.check("7z", &["x", &archive, &format!("-o{out_str}")]),
            Lz4 => self.check("lz4", &["-d", &archive, &single]),
            Zst => self.check("zstd", &["-d", &archive, "-o", &single]),
            Lzop => self.check("lzop", &["-d", &archive, "-o", &single]),
        }
    }

    fn check(&self, program: &str, args: &[&str]) -> RunwayResult<()> {
        self.executor.check(program, args)?;
        Ok(())
    }

    fn tar(&self, args: &[&str]) -> RunwayResult<()> {
        self.check("tar", args)
    }

    /// Decompresses a single-stream file to stdout and writes the result to
    /// `<out>/<name without suffix>`. The source is never touched and nothing
    /// is written when the tool fails.
    fn decompress_stream(
        &self,
        path: &Path,
        out: &Path,
        program: &str,
        flags: &[&str],
    ) -> RunwayResult<()> {
        let target = out.join(strip_archive_suffix(path));
        if target == path {
            return Err(RunwayError::UnsupportedArchive(path.to_path_buf()));
        }

        let archive = path.to_string_lossy();
        let mut args = flags.to_vec();
        args.push(&archive);
        let data = self.executor.check_raw(program, &args)?;

        if self.dry_run {
            return Ok(());
        }
        write_file(&target, &data, Some(0o644))?;
        debug!("wrote {} bytes to {}", data.len(), target.display());
        Ok(())
    }

    pub fn create(&self, files: &[PathBuf], out: &Path, format: &str) -> RunwayResult<()> {
        let format: CreateFormat = format.parse()?;
        if !self.dry_run {
            if let Some(missing) = files.iter().find(|f| !f.exists()) {
                return Err(RunwayError::NotFound(missing.clone()));
            }
        }

        let out_str = out.to_string_lossy().into_owned();
        let file_strs: Vec<String> = files
            .iter()
            .map(|f| f.to_string_lossy().into_owned())
            .collect();

        let (program, flag) = match format {
            CreateFormat::TarGz => ("tar", "-czf"),
            CreateFormat::TarBz2 => ("tar", "-cjf"),
            CreateFormat::TarXz => ("tar", "-cJf"),
            CreateFormat::Zip => ("zip", "-r"),
            CreateFormat::SevenZ => ("7z", "a"),
        };
        let mut args = vec![flag, out_str.as_str()];
        args.extend(file_strs.iter().map(String::as_str));

        if !self.executor.exists(program) {
            return Err(RunwayError::ToolMissing(program.to_string()));
        }
        self.check(program, &args)?;
        info!("Created {} from {} files", out.display(), files.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, RecordingExecutor};

    fn manager(exec: &Arc<RecordingExecutor>) -> ArchiveManager {
        ArchiveManager::new(exec.clone())
    }

    #[test]
    fn test_detect() {
        assert_eq!(ArchiveFormat::detect("site.tar.gz"), Some(TarGz));
        assert_eq!(ArchiveFormat::detect("/backups/SITE.TGZ"), Some(TarGz));
        assert_eq!(ArchiveFormat::detect("db.sql.gz"), Some(Gz));
        assert_eq!(ArchiveFormat::detect("x.tar.zst"), Some(TarZst));
        assert_eq!(ArchiveFormat::detect("x.zst"), Some(Zst));
        assert_eq!(ArchiveFormat::detect("x.lzop"), Some(Lzop));
        assert_eq!(ArchiveFormat::detect("notes.txt"), None);
        assert!(is_archive("a.7z"));
        assert!(!is_archive("a.7z.part"));
        assert_eq!(supported_extensions().len(), 18);
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/srv/backups/site.tar.gz")),
            PathBuf::from("/srv/backups/site")
        );
        assert_eq!(
            default_output_dir(Path::new("dump.sql.xz")),
            PathBuf::from("dump.sql")
        );
        assert_eq!(strip_archive_suffix(Path::new(".tar")), ".tar");
    }

    #[test]
    fn test_parse_unzip_listing() {
        let output = "Archive:  site.zip
  Length      Date    Time    Name
---------  ---------- -----   ----
      120  2024-05-01 10:00   index.html
     2048  2024-05-01 10:00   assets/app.js
---------                     -------
     2168                     2 files
";
        assert_eq!(
            parse_unzip_listing(output),
            vec!["index.html", "assets/app.js"]
        );
        assert!(parse_unzip_listing("Archive: x\n").is_empty());
    }

    #[test]
    fn test_extract_tar_gz() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("site.tar.gz");
        fs::write(&archive, b"x").unwrap();
        let exec = Arc::new(RecordingExecutor::new().with_tools(&["tar"]));

        let out = manager(&exec).extract(&archive, None).unwrap();
        assert_eq!(out, dir.path().join("site"));
        assert!(out.is_dir());
        assert_eq!(
            exec.calls(),
            vec![format!(
                "tar -xzf {} -C {}",
                archive.display(),
                out.display()
            )]
        );
    }

    #[test]
    fn test_extract_single_stream_into_own_dir_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dump.sql.gz");
        fs::write(&archive, b"gz").unwrap();
        let exec = Arc::new(
            RecordingExecutor::new()
                .with_tools(&["gunzip"])
                .reply("gunzip -c", CommandOutput::ok("CREATE TABLE t;")),
        );

        manager(&exec).extract(&archive, Some(dir.path())).unwrap();
        assert_eq!(fs::read(&archive).unwrap(), b"gz");
        assert_eq!(
            fs::read_to_string(dir.path().join("dump.sql")).unwrap(),
            "CREATE TABLE t;"
        );
        assert_eq!(
            exec.calls(),
            vec![format!("gunzip -c {}", archive.display())]
        );
    }

    #[test]
    fn test_extract_single_stream_failure_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("app.log.xz");
        fs::write(&archive, b"xz").unwrap();
        let out = dir.path().join("out");
        let exec = Arc::new(
            RecordingExecutor::new()
                .with_tools(&["xz"])
                .reply("xz -d -c", CommandOutput::failed(1, "File format not recognized")),
        );

        let err = manager(&exec).extract(&archive, Some(&out)).unwrap_err();
        assert!(matches!(err, RunwayError::CommandFailed { .. }));
        assert!(archive.exists());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_builtin_fallback_covers_plain_tar() {
        let exec = Arc::new(RecordingExecutor::new().with_tools(&[]));
        let m = manager(&exec).dry_run(true);

        let out = m.extract(Path::new("/srv/backups/site.tar"), None).unwrap();
        assert_eq!(out, PathBuf::from("/srv/backups/site"));
        assert!(m.extract(Path::new("/srv/backups/site.tar.zst"), None).is_ok());
        assert!(matches!(
            m.extract(Path::new("/srv/backups/site.tar.lz4"), None),
            Err(RunwayError::ToolMissing(ref t)) if t == "tar"
        ));
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_extract_7z_and_zst_args() {
        let dir = tempfile::tempdir().unwrap();
        let seven = dir.path().join("a.7z");
        let zst = dir.path().join("b.log.zst");
        fs::write(&seven, b"").unwrap();
        fs::write(&zst, b"").unwrap();
        let out = dir.path().join("o");
        let exec = Arc::new(RecordingExecutor::new().with_tools(&["7z", "zstd"]));
        let m = manager(&exec);

        m.extract(&seven, Some(&out)).unwrap();
        m.extract(&zst, Some(&out)).unwrap();
        let calls = exec.calls();
        assert_eq!(calls[0], format!("7z x {} -o{}", seven.display(), out.display()));
        assert_eq!(
            calls[1],
            format!("zstd -d {} -o {}", zst.display(), out.join("b.log").display())
        );
    }

    #[test]
    fn test_extract_errors() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Arc::new(RecordingExecutor::new().with_tools(&[]));
        let m = manager(&exec);

        assert!(matches!(
            m.extract(Path::new("notes.txt"), None),
            Err(RunwayError::UnsupportedArchive(_))
        ));
        assert!(matches!(
            m.extract(&dir.path().join("missing.zip"), None),
            Err(RunwayError::NotFound(_))
        ));

        let rar = dir.path().join("a.rar");
        fs::write(&rar, b"").unwrap();
        assert!(matches!(
            m.extract(&rar, None),
            Err(RunwayError::ToolMissing(ref t)) if t == "unrar"
        ));
    }

    #[test]
    fn test_create() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("www");
        fs::create_dir(&file).unwrap();
        let out = dir.path().join("www.zip");
        let exec = Arc::new(RecordingExecutor::new().with_tools(&["zip", "tar"]));
        let m = manager(&exec);

        m.create(&[file.clone()], &out, "zip").unwrap();
        assert_eq!(
            exec.calls(),
            vec![format!("zip -r {} {}", out.display(), file.display())]
        );

        assert!(matches!(
            m.create(&[file.clone()], &out, "rar"),
            Err(RunwayError::UnsupportedFormat(ref f)) if f == "rar"
        ));
        assert!(matches!(
            m.create(&[dir.path().join("nope")], &out, "tar.gz"),
            Err(RunwayError::NotFound(_))
        ));
    }

    #[test]
    fn test_info() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("site.tar.gz");
        fs::write(&archive, b"12345").unwrap();
        let exec = Arc::new(RecordingExecutor::new().reply(
            "tar -tf",
            CommandOutput::ok("site/\nsite/index.html\n"),
        ));

        let info = manager(&exec).info(&archive).unwrap();
        assert_eq!(info.size, 5);
        assert_eq!(info.format, Some(TarGz));
        assert!(info.is_valid);
        assert_eq!(info.contents, vec!["site/", "site/index.html"]);

        let exec = Arc::new(
            RecordingExecutor::new().reply("tar -tf", CommandOutput::failed(2, "not in gzip format")),
        );
        let info = manager(&exec).info(&archive).unwrap();
        assert!(!info.is_valid);
        assert!(info.contents.is_empty());
    }

    #[test]
    fn test_rar_valid_without_unrar() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.rar");
        fs::write(&archive, b"").unwrap();
        let exec = Arc::new(RecordingExecutor::new().with_tools(&[]));
        assert!(manager(&exec).info(&archive).unwrap().is_valid);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_check_tools_is_ordered() {
        let exec = Arc::new(RecordingExecutor::new().with_tools(&["tar", "xz"]));
        let tools = manager(&exec).check_tools();
        assert_eq!(tools.len(), 11);
        assert_eq!(tools.keys().next(), Some(&"7z"));
        assert!(tools["tar"]);
        assert!(!tools["unzip"]);
    }
}
