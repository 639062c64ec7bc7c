//! Two-pass sort between the main directory and its quarantine.
//!
//! The restoration pass runs first so that a single invocation both
//! reclaims quarantined images that now qualify and demotes new low
//! resolution images, leaving the directory pair at a fixed point.

use crate::operations::{move_file, resolve_destination, CollisionPolicy, MoveError};
use crate::probe::{DimensionSource, Dimensions};
use crate::resolution::ResolutionTarget;
use crate::scanner::{default_extensions, has_image_extension, list_regular_files};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the quarantine directory created inside the main directory.
pub const DEFAULT_QUARANTINE_DIR_NAME: &str = "low_res";

/// Everything a sort run needs; nothing is read from globals.
#[derive(Clone, Debug)]
pub struct SortConfig {
    pub main_dir: PathBuf,
    pub quarantine_dir: PathBuf,
    pub target: ResolutionTarget,
    /// Lowercase extensions eligible for quarantine. The restoration pass
    /// ignores this list.
    pub extensions: Vec<String>,
    pub collision: CollisionPolicy,
    /// When true, decisions are recorded but no file is moved and no
    /// directory is created.
    pub dry_run: bool,
}

impl SortConfig {
    pub fn new(main_dir: impl Into<PathBuf>) -> Self {
        let main_dir = main_dir.into();
        Self {
            quarantine_dir: main_dir.join(DEFAULT_QUARANTINE_DIR_NAME),
            main_dir,
            target: ResolutionTarget::default(),
            extensions: default_extensions(),
            collision: CollisionPolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = dir.into();
        self
    }

    pub fn with_target(mut self, target: ResolutionTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// A single move decided during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAction {
    pub file_name: String,
    pub dimensions: Dimensions,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Result of a completed run.
#[derive(Debug, Clone, Default)]
pub struct SortOutcome {
    pub restored: Vec<FileAction>,
    pub quarantined: Vec<FileAction>,
    /// Files whose dimensions could not be determined; left in place.
    pub probe_failures: Vec<PathBuf>,
    /// Files left in place because the destination name was taken.
    pub skipped_collisions: Vec<PathBuf>,
    /// Regular files found in the main directory by the quarantine pass,
    /// before extension filtering.
    pub scanned: usize,
    pub dry_run: bool,
}

impl SortOutcome {
    pub fn restored_count(&self) -> usize {
        self.restored.len()
    }

    pub fn moved_count(&self) -> usize {
        self.quarantined.len()
    }
}

#[derive(Debug, Error)]
pub enum SortError {
    #[error("directory not found: {}", .0.display())]
    MissingMainDirectory(PathBuf),
    #[error("quarantine directory must differ from the main directory ({})", .0.display())]
    SameDirectory(PathBuf),
    #[error("failed to create quarantine directory {}: {source}", .path.display())]
    CreateQuarantine { source: io::Error, path: PathBuf },
    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDirectory { source: io::Error, path: PathBuf },
    #[error(transparent)]
    Move(#[from] MoveError),
}

#[derive(Clone, Copy)]
enum Pass {
    Restore,
    Quarantine,
}

/// Runs the restoration pass then the quarantine pass.
///
/// Moves applied before a failing move stay applied.
pub fn sort<S>(
    config: &SortConfig,
    source: &S,
    progress_bar: &ProgressBar,
) -> Result<SortOutcome, SortError>
where
    S: DimensionSource + ?Sized,
{
    if !config.main_dir.is_dir() {
        return Err(SortError::MissingMainDirectory(config.main_dir.clone()));
    }
    if config.quarantine_dir == config.main_dir {
        return Err(SortError::SameDirectory(config.main_dir.clone()));
    }

    if !config.dry_run {
        fs::create_dir_all(&config.quarantine_dir).map_err(|source| {
            SortError::CreateQuarantine {
                source,
                path: config.quarantine_dir.clone(),
            }
        })?;
    }
    if resolves_to_same_dir(&config.quarantine_dir, &config.main_dir) {
        return Err(SortError::SameDirectory(config.main_dir.clone()));
    }

    let mut outcome = SortOutcome {
        dry_run: config.dry_run,
        ..SortOutcome::default()
    };

    announce(progress_bar, "Checking for redeemable images in quarantine...");
    restore(config, source, progress_bar, &mut outcome)?;
    announce(
        progress_bar,
        &format!("Restored {} images.\n", outcome.restored_count()),
    );

    quarantine(config, source, progress_bar, &mut outcome)?;

    Ok(outcome)
}

/// Sorts with the default extensions and collision policy, returning
/// `(restored, moved)` counts. No progress bar is drawn.
pub fn run<S>(
    main_dir: &Path,
    quarantine_dir: &Path,
    target: ResolutionTarget,
    source: &S,
) -> Result<(usize, usize), SortError>
where
    S: DimensionSource + ?Sized,
{
    let config = SortConfig::new(main_dir)
        .with_quarantine_dir(quarantine_dir)
        .with_target(target);
    let outcome = sort(&config, source, &library_bar())?;
    Ok((outcome.restored_count(), outcome.moved_count()))
}

fn restore<S>(
    config: &SortConfig,
    source: &S,
    progress_bar: &ProgressBar,
    outcome: &mut SortOutcome,
) -> Result<(), SortError>
where
    S: DimensionSource + ?Sized,
{
    // Only reachable in dry-run mode.
    if !config.quarantine_dir.is_dir() {
        return Ok(());
    }

    let files = read_files(&config.quarantine_dir)?;
    start_pass(progress_bar, files.len(), "Restoring");

    for path in files {
        progress_bar.inc(1);
        let Some(dimensions) = probe(source, &path, outcome) else {
            continue;
        };
        if config.target.is_low_res(dimensions) {
            continue;
        }
        let action = relocate(
            config,
            &path,
            dimensions,
            Pass::Restore,
            progress_bar,
            outcome,
        )?;
        if let Some(action) = action {
            outcome.restored.push(action);
        }
    }

    progress_bar.finish_and_clear();
    Ok(())
}

fn quarantine<S>(
    config: &SortConfig,
    source: &S,
    progress_bar: &ProgressBar,
    outcome: &mut SortOutcome,
) -> Result<(), SortError>
where
    S: DimensionSource + ?Sized,
{
    let listed = read_files(&config.main_dir)?;
    outcome.scanned = listed.len();

    announce(
        progress_bar,
        &format!(
            "Scanning {} files in {}...",
            listed.len(),
            config.main_dir.display()
        ),
    );

    let files: Vec<PathBuf> = listed
        .into_iter()
        .filter(|path| has_image_extension(path, &config.extensions))
        .collect();
    start_pass(progress_bar, files.len(), "Scanning");

    for path in files {
        progress_bar.inc(1);
        let Some(dimensions) = probe(source, &path, outcome) else {
            continue;
        };
        if !config.target.is_low_res(dimensions) {
            continue;
        }
        let action = relocate(
            config,
            &path,
            dimensions,
            Pass::Quarantine,
            progress_bar,
            outcome,
        )?;
        if let Some(action) = action {
            outcome.quarantined.push(action);
        }
    }

    progress_bar.finish_and_clear();
    Ok(())
}

fn probe<S>(source: &S, path: &Path, outcome: &mut SortOutcome) -> Option<Dimensions>
where
    S: DimensionSource + ?Sized,
{
    let dimensions = source.probe(path);
    if dimensions.is_none() {
        tracing::debug!(
            path = %path.display(),
            "could not determine dimensions, leaving file in place"
        );
        outcome.probe_failures.push(path.to_path_buf());
    }
    dimensions
}

fn relocate(
    config: &SortConfig,
    path: &Path,
    dimensions: Dimensions,
    pass: Pass,
    progress_bar: &ProgressBar,
    outcome: &mut SortOutcome,
) -> Result<Option<FileAction>, SortError> {
    let target_dir = match pass {
        Pass::Restore => &config.main_dir,
        Pass::Quarantine => &config.quarantine_dir,
    };
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(destination) = resolve_destination(target_dir, path, config.collision)? else {
        tracing::warn!(
            path = %path.display(),
            target = %target_dir.display(),
            "destination already exists, skipping"
        );
        outcome.skipped_collisions.push(path.to_path_buf());
        return Ok(None);
    };

    let message = match pass {
        Pass::Restore => format!(
            "Restoring {} ({}) - close enough to {}x{}",
            file_name, dimensions, config.target.width, config.target.height
        ),
        Pass::Quarantine => format!(
            "Moving {} ({}) to {}",
            file_name,
            dimensions,
            target_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| target_dir.display().to_string())
        ),
    };
    progress_bar.set_message(file_name.clone());

    if config.dry_run {
        announce(progress_bar, &format!("[dry run] {}", message));
    } else {
        announce(progress_bar, &message);
        move_file(path, &destination)?;
    }
    tracing::info!(
        from = %path.display(),
        to = %destination.display(),
        %dimensions,
        dry_run = config.dry_run,
        "relocated image"
    );

    Ok(Some(FileAction {
        file_name,
        dimensions,
        from: path.to_path_buf(),
        to: destination,
    }))
}

/// Compares canonical forms so `main/sub/..` or a symlink to `main` is
/// caught. Paths that cannot be resolved (dry run, missing quarantine) only
/// compare as written.
fn resolves_to_same_dir(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}

fn read_files(dir: &Path) -> Result<Vec<PathBuf>, SortError> {
    list_regular_files(dir).map_err(|source| SortError::ReadDirectory {
        source,
        path: dir.to_path_buf(),
    })
}

/// Callers embedding the library opt into drawing by passing their own bar
/// to [`sort`].
fn library_bar() -> ProgressBar {
    ProgressBar::hidden()
}

fn start_pass(progress_bar: &ProgressBar, total: usize, label: &'static str) {
    progress_bar.reset();
    progress_bar.set_length(total as u64);
    progress_bar.set_prefix(label);
}

fn announce(progress_bar: &ProgressBar, line: &str) {
    progress_bar.suspend(|| println!("{}", line));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticDimensions;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempdir().unwrap(),
            }
        }

        fn main_dir(&self) -> &Path {
            self.dir.path()
        }

        fn quarantine_dir(&self) -> PathBuf {
            self.dir.path().join(DEFAULT_QUARANTINE_DIR_NAME)
        }

        fn config(&self) -> SortConfig {
            SortConfig::new(self.main_dir())
        }

        fn add_main(&self, name: &str) -> PathBuf {
            let path = self.main_dir().join(name);
            fs::write(&path, name.as_bytes()).unwrap();
            path
        }

        fn add_quarantined(&self, name: &str) -> PathBuf {
            fs::create_dir_all(self.quarantine_dir()).unwrap();
            let path = self.quarantine_dir().join(name);
            fs::write(&path, name.as_bytes()).unwrap();
            path
        }
    }

    fn sort_with(config: &SortConfig, source: &StaticDimensions) -> SortOutcome {
        sort(config, source, &ProgressBar::hidden()).unwrap()
    }

    #[test]
    fn missing_main_directory_is_an_error() {
        let fixture = Fixture::new();
        let config = SortConfig::new(fixture.main_dir().join("missing"));
        let result = sort(&config, &StaticDimensions::new(), &ProgressBar::hidden());
        assert!(matches!(result, Err(SortError::MissingMainDirectory(_))));
        assert!(!config.quarantine_dir.exists());
    }

    #[test]
    fn same_directory_is_rejected() {
        let fixture = Fixture::new();
        let config = fixture.config().with_quarantine_dir(fixture.main_dir());
        let result = sort(&config, &StaticDimensions::new(), &ProgressBar::hidden());
        assert!(matches!(result, Err(SortError::SameDirectory(_))));
    }

    #[test]
    fn aliased_same_directory_is_rejected() {
        let fixture = Fixture::new();
        let big = fixture.add_main("big.png");
        let small = fixture.add_main("small.png");
        fs::create_dir(fixture.main_dir().join("sub")).unwrap();
        let alias = fixture.main_dir().join("sub").join("..");
        let source = StaticDimensions::new()
            .with("big.png", 1920, 1080)
            .with("small.png", 10, 10);

        for _ in 0..2 {
            let result = run(fixture.main_dir(), &alias, ResolutionTarget::default(), &source);
            assert!(matches!(result, Err(SortError::SameDirectory(_))));
        }
        assert!(big.exists());
        assert!(small.exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_quarantine_to_main_is_rejected() {
        let fixture = Fixture::new();
        let outside = tempdir().unwrap();
        let link = outside.path().join("walls");
        std::os::unix::fs::symlink(fixture.main_dir(), &link).unwrap();
        let config = fixture.config().with_quarantine_dir(&link);

        let result = sort(&config, &StaticDimensions::new(), &ProgressBar::hidden());

        assert!(matches!(result, Err(SortError::SameDirectory(_))));
    }

    #[test]
    fn library_run_draws_no_bar() {
        assert!(library_bar().is_hidden());
    }

    #[test]
    fn scan_count_includes_unfiltered_files() {
        let fixture = Fixture::new();
        fixture.add_main("readme.txt");
        fixture.add_main("notes.md");
        fixture.add_main("wall.png");
        let source = StaticDimensions::new().with("wall.png", 1920, 1080);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.scanned, 3);
        assert_eq!(outcome.moved_count(), 0);
    }

    #[test]
    fn creates_quarantine_directory() {
        let fixture = Fixture::new();
        let nested = fixture.main_dir().join("a").join("b");
        let config = fixture.config().with_quarantine_dir(&nested);
        let outcome = sort_with(&config, &StaticDimensions::new());
        assert!(nested.is_dir());
        assert_eq!(outcome.restored_count(), 0);
        assert_eq!(outcome.moved_count(), 0);
    }

    #[test]
    fn quarantines_low_resolution_images() {
        let fixture = Fixture::new();
        let small = fixture.add_main("small.jpg");
        let big = fixture.add_main("big.png");
        let source = StaticDimensions::new()
            .with("small.jpg", 1280, 720)
            .with("big.png", 3840, 2160);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.moved_count(), 1);
        assert_eq!(outcome.scanned, 2);
        assert!(!small.exists());
        assert!(fixture.quarantine_dir().join("small.jpg").exists());
        assert!(big.exists());
        assert_eq!(outcome.quarantined[0].dimensions, Dimensions::new(1280, 720));
    }

    #[test]
    fn restores_images_that_now_qualify() {
        let fixture = Fixture::new();
        let close = fixture.add_quarantined("close.png");
        let tiny = fixture.add_quarantined("tiny.png");
        let source = StaticDimensions::new()
            .with("close.png", 1900, 1070)
            .with("tiny.png", 640, 480);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.restored_count(), 1);
        assert_eq!(outcome.moved_count(), 0);
        assert!(!close.exists());
        assert!(fixture.main_dir().join("close.png").exists());
        assert!(tiny.exists());
    }

    #[test]
    fn restoration_ignores_extension_filter() {
        let fixture = Fixture::new();
        fixture.add_quarantined("notes.txt");
        let source = StaticDimensions::new().with("notes.txt", 1920, 1080);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.restored_count(), 1);
        assert!(fixture.main_dir().join("notes.txt").exists());
    }

    #[test]
    fn quarantine_pass_applies_extension_filter() {
        let fixture = Fixture::new();
        let notes = fixture.add_main("notes.txt");
        let shouty = fixture.add_main("SHOUTY.JPG");
        let source = StaticDimensions::new()
            .with("notes.txt", 10, 10)
            .with("SHOUTY.JPG", 10, 10);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.moved_count(), 1);
        assert!(notes.exists());
        assert!(!shouty.exists());
        assert_eq!(outcome.scanned, 2);
    }

    #[test]
    fn probe_failures_are_left_in_place() {
        let fixture = Fixture::new();
        let unknown_main = fixture.add_main("unknown.png");
        let unknown_quarantined = fixture.add_quarantined("broken.webp");

        let outcome = sort_with(&fixture.config(), &StaticDimensions::new());

        assert_eq!(outcome.restored_count(), 0);
        assert_eq!(outcome.moved_count(), 0);
        assert!(unknown_main.exists());
        assert!(unknown_quarantined.exists());
        assert_eq!(outcome.probe_failures.len(), 2);
    }

    #[test]
    fn restored_files_are_not_requarantined_in_same_run() {
        let fixture = Fixture::new();
        fixture.add_quarantined("ok.png");
        let source = StaticDimensions::new().with("ok.png", 1920, 1080);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.restored_count(), 1);
        assert_eq!(outcome.moved_count(), 0);
        assert_eq!(outcome.scanned, 1);
        assert!(fixture.main_dir().join("ok.png").exists());
    }

    #[test]
    fn tolerance_change_moves_images_back() {
        let fixture = Fixture::new();
        let path = fixture.add_main("edge.png");
        let source = StaticDimensions::new().with("edge.png", 1800, 1000);

        let strict = fixture
            .config()
            .with_target(ResolutionTarget::new(1920, 1080, 0.0).unwrap());
        assert_eq!(sort_with(&strict, &source).moved_count(), 1);
        assert!(!path.exists());

        let relaxed = fixture
            .config()
            .with_target(ResolutionTarget::new(1920, 1080, 0.1).unwrap());
        assert_eq!(sort_with(&relaxed, &source).restored_count(), 1);
        assert!(path.exists());
    }

    #[test]
    fn overwrite_on_restore_collision() {
        let fixture = Fixture::new();
        fs::write(fixture.main_dir().join("dup.png"), b"stale").unwrap();
        let quarantined = fixture.quarantine_dir().join("dup.png");
        fs::create_dir_all(fixture.quarantine_dir()).unwrap();
        fs::write(&quarantined, b"fresh").unwrap();
        let source = StaticDimensions::new().with("dup.png", 1920, 1080);

        let outcome = sort_with(&fixture.config(), &source);

        assert_eq!(outcome.restored_count(), 1);
        assert!(!quarantined.exists());
        assert_eq!(fs::read(fixture.main_dir().join("dup.png")).unwrap(), b"fresh");
    }

    #[test]
    fn skip_policy_records_collision() {
        let fixture = Fixture::new();
        let main_copy = fixture.add_main("dup.png");
        let quarantined = fixture.add_quarantined("dup.png");
        let source = StaticDimensions::new().with("dup.png", 100, 100);

        let config = fixture.config().with_collision_policy(CollisionPolicy::Skip);
        let outcome = sort_with(&config, &source);

        assert_eq!(outcome.moved_count(), 0);
        assert_eq!(outcome.skipped_collisions, vec![main_copy.clone()]);
        assert!(main_copy.exists());
        assert!(quarantined.exists());
    }

    #[test]
    fn dry_run_moves_nothing() {
        let fixture = Fixture::new();
        let small = fixture.add_main("small.png");
        let source = StaticDimensions::new().with("small.png", 100, 100);

        let config = fixture.config().with_dry_run(true);
        let outcome = sort_with(&config, &source);

        assert!(outcome.dry_run);
        assert_eq!(outcome.moved_count(), 1);
        assert_eq!(
            outcome.quarantined[0].to,
            fixture.quarantine_dir().join("small.png")
        );
        assert!(small.exists());
        assert!(!fixture.quarantine_dir().exists());
    }

    #[test]
    fn custom_extensions_are_normalised() {
        let config = SortConfig::new("/tmp").with_extensions(vec![
            String::from(".GIF"),
            String::from("Tiff"),
        ]);
        assert_eq!(config.extensions, vec![String::from("gif"), String::from("tiff")]);
    }
}
