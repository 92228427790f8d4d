//! `gitpin install --frozen` never writes the lockfile.

use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use crate::common::{TestProject, git_package};

#[test]
fn test_frozen_without_lockfile_fails() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;

    project
        .gitpin()
        .args(["install", "--frozen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("The lockfile is out of date"));
    assert!(!project.lockfile_path().exists());
    Ok(())
}

#[test]
fn test_frozen_with_current_lockfile_succeeds() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();
    let before = fs::read(project.lockfile_path())?;

    project
        .run_gitpin(&["install", "--frozen"])?
        .assert_success()
        .assert_stdout_contains("Using rack 1.0");
    assert_eq!(fs::read(project.lockfile_path())?, before);
    Ok(())
}

#[test]
fn test_frozen_rejects_manifest_changes() -> Result<()> {
    let project = TestProject::new()?;
    let (rack, _) = project.create_package_repo("rack", "1.0")?;
    let (sinatra, _) = project.create_package_repo("sinatra", "2.0")?;
    project.write_manifest(&git_package("rack", &rack, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();
    let before = fs::read(project.lockfile_path())?;

    // New package
    project.write_manifest(&format!(
        "{}{}",
        git_package("rack", &rack, &[]),
        git_package("sinatra", &sinatra, &[])
    ))?;
    project.run_gitpin(&["install", "--frozen"])?.assert_failure();
    assert_eq!(fs::read(project.lockfile_path())?, before);

    // Changed reference
    project.write_manifest(&git_package("rack", &rack, &["branch = \"master\""]))?;
    project
        .run_gitpin(&["install", "--frozen"])?
        .assert_failure()
        .assert_stderr_contains("has no matching entry in gitpin.lock");
    assert_eq!(fs::read(project.lockfile_path())?, before);
    Ok(())
}
