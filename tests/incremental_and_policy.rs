use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use assetpipe::config::Flags;
use assetpipe::pipeline::Pipeline;
use assetpipe::tasks::TaskKind;

type TestResult = Result<(), Box<dyn Error>>;

fn write(path: &Path, content: &str) -> TestResult {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

fn pages(root: &Path) -> TestResult {
    write(
        &root.join("src/index.tera"),
        "{% include \"tera/nav.tera\" %}<p>home</p>",
    )?;
    write(&root.join("src/about.tera"), "<h1>about</h1>")?;
    write(&root.join("src/tera/nav.tera"), "<nav>menu</nav>")?;
    Ok(())
}

#[tokio::test]
async fn partial_edit_recompiles_only_its_dependents() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    pages(root)?;

    let pipeline = Arc::new(Pipeline::new(root, Flags::default())?);
    pipeline.run_task(TaskKind::Templates, None).await?;
    assert!(root.join("build/index.html").is_file());
    assert!(root.join("build/about.html").is_file());

    std::fs::remove_file(root.join("build/index.html"))?;
    std::fs::remove_file(root.join("build/about.html"))?;
    write(&root.join("src/tera/nav.tera"), "<nav>menu v2</nav>")?;

    let changed = root.join("src/tera/nav.tera");
    pipeline.run_task(TaskKind::Templates, Some(changed)).await?;

    let index = std::fs::read_to_string(root.join("build/index.html"))?;
    assert!(index.contains("menu v2"));
    // about does not depend on the partial and stays untouched
    assert!(!root.join("build/about.html").exists());
    Ok(())
}

#[tokio::test]
async fn incremental_runs_follow_the_current_dependencies() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(&root.join("src/index.tera"), "<p>home</p>")?;
    write(&root.join("src/about.tera"), "<h1>about</h1>")?;
    write(&root.join("src/tera/nav.tera"), "<nav>menu</nav>")?;

    let pipeline = Arc::new(Pipeline::new(root, Flags::default())?);
    pipeline.run_task(TaskKind::Templates, None).await?;

    // index picks up a dependency on the partial after the first run; the
    // next partial edit must rebuild it from a fresh scan.
    write(
        &root.join("src/index.tera"),
        "{% include \"tera/nav.tera\" %}<p>home</p>",
    )?;
    pipeline
        .run_task(TaskKind::Templates, Some(root.join("src/index.tera")))
        .await?;

    std::fs::remove_file(root.join("build/index.html"))?;
    std::fs::remove_file(root.join("build/about.html"))?;
    write(&root.join("src/tera/nav.tera"), "<nav>menu v3</nav>")?;
    pipeline
        .run_task(TaskKind::Templates, Some(root.join("src/tera/nav.tera")))
        .await?;

    let index = std::fs::read_to_string(root.join("build/index.html"))?;
    assert!(index.contains("menu v3"));
    assert!(!root.join("build/about.html").exists());
    Ok(())
}

#[tokio::test]
async fn missing_changed_path_forces_a_full_rebuild() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    pages(root)?;

    let pipeline = Arc::new(Pipeline::new(root, Flags::default())?);
    pipeline.run_task(TaskKind::Templates, None).await?;
    std::fs::remove_file(root.join("build/index.html"))?;
    std::fs::remove_file(root.join("build/about.html"))?;

    // A deletion is reported without a changed path.
    pipeline.run_task(TaskKind::Templates, None).await?;
    assert!(root.join("build/index.html").is_file());
    assert!(root.join("build/about.html").is_file());
    Ok(())
}

#[tokio::test]
async fn copy_cache_skips_current_files() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(&root.join("src/resources/data.json"), "{\"v\":1}")?;

    let pipeline = Arc::new(Pipeline::new(root, Flags::default())?);
    pipeline.run_task(TaskKind::Copy, None).await?;

    // Make the destination newer than the source, then poison it; a
    // cached run must leave it alone.
    let dest = root.join("build/data.json");
    std::fs::write(&dest, "sentinel")?;
    pipeline.run_task(TaskKind::Copy, None).await?;
    assert_eq!(std::fs::read_to_string(&dest)?, "sentinel");

    // Without caching, the source always wins.
    let no_cache = Arc::new(Pipeline::new(
        root,
        Flags {
            cache: false,
            ..Flags::default()
        },
    )?);
    no_cache.run_task(TaskKind::Copy, None).await?;
    assert_eq!(std::fs::read_to_string(&dest)?, "{\"v\":1}");
    Ok(())
}

#[tokio::test]
async fn broken_template_only_fails_a_strict_run() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(&root.join("src/ok.tera"), "fine")?;
    write(&root.join("src/bad.tera"), "{{ no_such_function() }}")?;

    let lenient = Arc::new(Pipeline::new(root, Flags::default())?);
    lenient.run_task(TaskKind::Templates, None).await?;
    assert!(root.join("build/ok.html").is_file());

    let strict = Arc::new(Pipeline::new(
        root,
        Flags {
            throw_errors: true,
            ..Flags::default()
        },
    )?);
    assert!(strict.run_task(TaskKind::Templates, None).await.is_err());
    Ok(())
}

#[tokio::test]
async fn strict_build_reports_the_failure_but_finishes_siblings() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(&root.join("src/scss/broken.scss"), "body { color: ")?;
    write(&root.join("src/resources/keep.txt"), "kept")?;

    let strict = Arc::new(Pipeline::new(
        root,
        Flags {
            throw_errors: true,
            ..Flags::default()
        },
    )?);
    assert!(strict.build().await.is_err());
    // the copy task is independent and still ran
    assert!(root.join("build/keep.txt").is_file());
    Ok(())
}
