//! `gitpin cache` and `gitpin config`.

use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use crate::common::{TestProject, git_package};

#[test]
fn test_cache_info_lists_clones() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();

    project
        .gitpin()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains(project.cache_path().display().to_string()))
        .stdout(predicate::str::contains("Repositories (1):"))
        .stdout(predicate::str::contains("rack-"));
    Ok(())
}

#[test]
fn test_cache_clean_forces_a_fresh_clone() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();

    project.run_gitpin(&["cache", "clean"])?.assert_success().assert_stdout_contains("Cache cleaned:");
    assert!(!project.cache_path().join("sources").exists());
    assert!(!project.cache_path().join("worktrees").exists());

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains(&format!("Fetching {}", repo.display()));
    Ok(())
}

#[test]
fn test_cache_info_on_empty_cache() -> Result<()> {
    let project = TestProject::new()?;
    project.run_gitpin(&["cache"])?.assert_success().assert_stdout_contains("The cache is empty.");
    Ok(())
}

#[test]
fn test_config_set_and_unset_local() -> Result<()> {
    let project = TestProject::new()?;
    let (local, _) = project.create_package_repo("rack", "1.0")?;
    let local = local.display().to_string();

    project
        .run_gitpin(&["config", "set-local", "rack", &local])?
        .assert_success()
        .assert_stdout_contains("Local override set: rack");
    project
        .run_gitpin(&["config", "show"])?
        .assert_success()
        .assert_stdout_contains("[local]")
        .assert_stdout_contains(&local);

    project.run_gitpin(&["config", "unset-local", "rack"])?.assert_success();
    project
        .run_gitpin(&["config", "unset-local", "rack"])?
        .assert_success()
        .assert_stdout_contains("No local override for rack");
    Ok(())
}

#[test]
fn test_config_branch_check_toggle() -> Result<()> {
    let project = TestProject::new()?;
    project.run_gitpin(&["config", "branch-check", "off"])?.assert_success();

    let config_path = project.root().join(".gitpin").join("config.toml");
    assert!(fs::read_to_string(&config_path)?.contains("disable_local_branch_check = true"));

    project.run_gitpin(&["config", "branch-check", "on"])?.assert_success();
    assert!(!fs::read_to_string(&config_path)?.contains("disable_local_branch_check"));
    Ok(())
}

#[test]
fn test_config_path_honors_environment() -> Result<()> {
    let project = TestProject::new()?;
    project
        .run_gitpin(&["config", "path"])?
        .assert_success()
        .assert_stdout_contains(".gitpin/config.toml");
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.write_config("local = 5\n")?;

    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("Configuration error");
    Ok(())
}
