//! Install hooks and extension builds.

use anyhow::Result;
use std::fs;

use crate::common::{TestGit, TestProject, git_package};

#[test]
fn test_hooks_run_around_each_package() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&format!(
        "{}[hooks]\npre-install = [\"echo Ran pre-install hook: $GITPIN_PACKAGE_FULL_NAME\"]\n\
         post-install = [\"echo Ran post-install hook: $GITPIN_PACKAGE_NAME in $(basename $GITPIN_PACKAGE_DIR)\"]\n",
        git_package("rack", &repo, &[])
    ))?;

    let output = project.run_gitpin(&["install"])?;
    output
        .assert_success()
        .assert_stdout_contains("Ran pre-install hook: rack-1.0")
        .assert_stdout_contains("Ran post-install hook: rack in ");

    let pre = output.stdout.find("Ran pre-install hook").unwrap_or(usize::MAX);
    let post = output.stdout.find("Ran post-install hook").unwrap_or(0);
    assert!(pre < post, "pre-install hook must run first:\n{}", output.stdout);
    Ok(())
}

#[test]
fn test_failing_hook_aborts_install() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&format!(
        "{}[hooks]\npre-install = [\"echo refusing >&2; exit 3\"]\n",
        git_package("rack", &repo, &[])
    ))?;

    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("pre-install hook failed for rack-1.0")
        .assert_stderr_contains("refusing");
    assert!(!project.lockfile_path().exists());
    Ok(())
}

#[test]
fn test_extension_build_failure_reports_output() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project.sources_path().join("native");
    let git = TestGit::new(&repo);
    git.init()?;
    git.config_user()?;
    fs::write(
        repo.join("package.toml"),
        "name = \"native\"\nversion = \"0.3\"\nextensions = [\"echo compiling native; echo missing header >&2; exit 1\"]\n",
    )?;
    git.commit_all("native package")?;
    project.write_manifest(&git_package("native", &repo, &[]))?;

    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("An error occurred while installing native (0.3), and the extension build failed")
        .assert_stderr_contains("compiling native")
        .assert_stderr_contains("missing header");
    Ok(())
}

#[test]
fn test_extensions_build_once_per_revision() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project.sources_path().join("native");
    let counter = project.root().join("builds.log");
    let git = TestGit::new(&repo);
    git.init()?;
    git.config_user()?;
    fs::write(
        repo.join("package.toml"),
        format!(
            "name = \"native\"\nversion = \"0.3\"\nextensions = [\"echo built >> {} && touch $GITPIN_EXTENSION_DIR/native.so\"]\n",
            counter.display()
        ),
    )?;
    git.commit_all("native package")?;
    project.write_manifest(&git_package("native", &repo, &[]))?;

    project.run_gitpin(&["install"])?.assert_success();
    project.run_gitpin(&["install"])?.assert_success();

    assert_eq!(fs::read_to_string(&counter)?.lines().count(), 1);
    let built: Vec<_> = fs::read_dir(project.cache_path().join("extensions"))?.collect();
    assert_eq!(built.len(), 1);
    Ok(())
}
