//! End-to-end `gitpin install` behavior.

use anyhow::Result;
use predicates::prelude::*;
use std::fs;

use crate::common::{TestGit, TestProject, create_package_repo, git_package};

#[test]
fn test_install_reports_sources_and_packages() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, sha) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &["branch = \"master\""]))?;

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains(&format!("Fetching {}", repo.display()))
        .assert_stdout_contains(&format!(
            "Using rack 1.0 from {} (at master@{})",
            repo.display(),
            &sha[..7]
        ))
        .assert_stdout_contains("Install complete! 1 package installed.");

    let lockfile = project.read_lockfile()?;
    assert!(lockfile.starts_with("# Auto-generated by gitpin"));
    assert!(lockfile.contains(&format!("revision = \"{sha}\"")));
    assert!(lockfile.contains("branch = \"master\""));
    Ok(())
}

#[test]
fn test_install_without_manifest_fails() -> Result<()> {
    let project = TestProject::new()?;
    project
        .gitpin()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("gitpin.toml not found"));
    Ok(())
}

#[test]
fn test_install_twice_is_byte_identical() -> Result<()> {
    let project = TestProject::new()?;
    let (rack, _) = project.create_package_repo("rack", "1.0")?;
    let (sinatra, _) = project.create_package_repo("sinatra", "2.1")?;
    project.write_manifest(&format!(
        "{}{}",
        git_package("sinatra", &sinatra, &[]),
        git_package("rack", &rack, &["branch = \"master\""])
    ))?;

    project.run_gitpin(&["install"])?.assert_success();
    let first = fs::read(project.lockfile_path())?;

    project.run_gitpin(&["install"])?.assert_success();
    assert_eq!(fs::read(project.lockfile_path())?, first);
    Ok(())
}

#[test]
fn test_repository_declared_twice_is_locked_once() -> Result<()> {
    let project = TestProject::new()?;
    let root = project.sources_path().join("monorepo");
    let git = TestGit::new(&root);
    git.init()?;
    git.config_user()?;
    for name in ["alpha", "beta"] {
        fs::create_dir_all(root.join(name))?;
        fs::write(
            root.join(name).join("package.toml"),
            format!("name = \"{name}\"\nversion = \"1.0\"\n"),
        )?;
    }
    git.commit_all("two packages")?;

    // Same repository written two ways
    project.write_manifest(&format!(
        "[packages.alpha]\ngit = \"{0}\"\n\n[packages.beta]\ngit = \"{0}/\"\n",
        root.display()
    ))?;

    let output = project.run_gitpin(&["install"])?;
    output.assert_success();
    assert_eq!(output.stdout.matches("Fetching").count(), 1);

    let lockfile = project.read_lockfile()?;
    assert_eq!(lockfile.matches("[[git]]").count(), 1);
    assert_eq!(lockfile.matches("[[packages]]").count(), 2);
    Ok(())
}

#[test]
fn test_reinstall_does_not_fetch() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();

    // Without the origin any fetch would fail
    fs::remove_dir_all(&repo)?;

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains(&format!("Using cached copy of {}", repo.display()));
    Ok(())
}

#[test]
fn test_moving_the_project_reuses_the_cache() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();
    let lockfile = project.read_lockfile()?;

    let moved = project.root().join("moved");
    fs::create_dir_all(&moved)?;
    fs::copy(project.manifest_path(), moved.join("gitpin.toml"))?;
    fs::copy(project.lockfile_path(), moved.join("gitpin.lock"))?;
    fs::remove_dir_all(&repo)?;

    project
        .gitpin_in(&moved)
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using cached copy of"));
    assert_eq!(fs::read_to_string(moved.join("gitpin.lock"))?, lockfile);
    Ok(())
}

#[test]
fn test_switching_between_path_and_git_relocks() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, sha) = project.create_package_repo("rack", "1.0")?;

    project.write_manifest(&format!("[packages.rack]\npath = \"{}\"\n", repo.display()))?;
    project.run_gitpin(&["install"])?.assert_success();
    let as_path = project.read_lockfile()?;
    assert!(as_path.contains("source = \"path+"));
    assert!(!as_path.contains(&sha));

    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();
    let as_git = project.read_lockfile()?;
    assert_ne!(as_git, as_path);
    assert!(as_git.contains("source = \"git+"));
    assert!(as_git.contains(&sha));

    project.write_manifest(&format!("[packages.rack]\npath = \"{}\"\n", repo.display()))?;
    project.run_gitpin(&["install"])?.assert_success();
    assert_eq!(project.read_lockfile()?, as_path);
    Ok(())
}

#[test]
fn test_locked_revision_is_kept_on_install() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, first) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &["branch = \"master\""]))?;
    project.run_gitpin(&["install"])?.assert_success();

    let newer = project.commit_change(&repo, "NEWS", "newer")?;
    project.run_gitpin(&["install"])?.assert_success();

    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&first));
    assert!(!lockfile.contains(&newer));
    Ok(())
}

#[test]
fn test_git_environment_variables_are_ignored() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;

    project
        .gitpin()
        .env("GIT_DIR", project.root().join("bogus.git"))
        .env("GIT_WORK_TREE", project.root().join("bogus"))
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("Using rack 1.0"));
    Ok(())
}

#[test]
fn test_missing_git_reports_remediation() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;

    project
        .gitpin()
        .env("PATH", "")
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("You need to install git"));
    assert!(!project.lockfile_path().exists());
    Ok(())
}

#[test]
fn test_unknown_branch_names_repository() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &["branch = \"nope\""]))?;

    project
        .gitpin()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Revision nope does not exist in the repository"))
        .stderr(predicate::str::contains(repo.canonicalize()?.display().to_string()));
    Ok(())
}

#[test]
fn test_version_mismatch_lists_available_versions() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("foo", "1.0")?;
    project.write_manifest(&git_package("foo", &repo, &["version = \"1.1\""]))?;

    project
        .gitpin()
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not find package 'foo' (1.1)"))
        .stderr(predicate::str::contains("Source contains 'foo' at: 1.0"));
    Ok(())
}

#[test]
fn test_relative_repository_path_resolves_from_manifest() -> Result<()> {
    let project = TestProject::new()?;
    project.create_package_repo("rack", "1.0")?;
    project.write_manifest("[packages.rack]\ngit = \"../sources/rack\"\n")?;

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains("Using rack 1.0 from ../sources/rack");
    Ok(())
}

#[test]
fn test_repository_path_with_spaces() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project.sources_path().join("my repos").join("rack");
    let sha = create_package_repo(&repo, "rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains(&format!("Using rack 1.0 from {}", repo.display()));
    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&sha));
    assert!(lockfile.contains("my repos"));

    // Second run works from the cache
    project.run_gitpin(&["install"])?.assert_success().assert_stdout_contains("Using cached copy of");
    Ok(())
}

#[test]
fn test_relative_cache_dir_survives_repeat_installs() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, sha) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;

    for expected in ["Fetching", "Using cached copy of"] {
        project
            .gitpin()
            .env("GITPIN_CACHE_DIR", "relcache")
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains(expected))
            .stdout(predicate::str::contains("Using rack 1.0"));
    }

    let cache = project.project_path().join("relcache");
    assert_eq!(fs::read_dir(cache.join("sources"))?.count(), 1);
    assert_eq!(fs::read_dir(cache.join("worktrees"))?.count(), 1);
    assert!(project.read_lockfile()?.contains(&sha));
    Ok(())
}

#[test]
fn test_repository_without_metadata_serves_each_project() -> Result<()> {
    let project = TestProject::new()?;
    let repo = project.sources_path().join("plainrepo");
    let git = TestGit::new(&repo);
    git.init()?;
    git.config_user()?;
    fs::write(repo.join("README"), "no package metadata here")?;
    git.commit_all("plain repository")?;

    let mut apps = Vec::new();
    for name in ["alpha", "beta"] {
        let dir = project.root().join(format!("app-{name}"));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("gitpin.toml"), git_package(name, &repo, &[]))?;
        apps.push((name, dir));
    }

    // Both projects share the cache, and with it the metadata of the revision
    for (name, dir) in &apps {
        project
            .gitpin_in(dir)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("Using {name} 0")));
    }
    Ok(())
}
