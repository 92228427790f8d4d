//! Local overrides configured in the global config.

use anyhow::Result;
use std::path::Path;

use crate::common::{TestGit, TestProject};

const REMOTE: &str = "https://example.invalid/rack/rack.git";

fn override_config(key: &str, path: &Path, disable_branch_check: bool) -> String {
    format!(
        "disable_local_branch_check = {disable_branch_check}\n\n[local]\n\"{key}\" = \"{}\"\n",
        path.display()
    )
}

#[test]
fn test_override_replaces_remote_checkout() -> Result<()> {
    let project = TestProject::new()?;
    let (local, head) = project.create_package_repo("rack", "1.1")?;
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\nbranch = \"master\"\n"))?;
    project.write_config(&override_config("rack", &local, false))?;

    let output = project.run_gitpin(&["install"])?;
    output.assert_success().assert_stdout_contains(&format!(
        "Using rack 1.1 from {REMOTE} (at {})",
        local.canonicalize()?.display()
    ));
    assert!(!output.stdout.contains("Fetching"));

    // The remote is locked at the override's HEAD
    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&format!("remote = \"{REMOTE}\"")));
    assert!(lockfile.contains(&head));
    Ok(())
}

#[test]
fn test_override_keyed_by_url() -> Result<()> {
    let project = TestProject::new()?;
    let (local, _) = project.create_package_repo("rack", "1.1")?;
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\nbranch = \"master\"\n"))?;
    project.write_config(&override_config("https://EXAMPLE.invalid/rack/rack", &local, false))?;

    project.run_gitpin(&["install"])?.assert_success().assert_stdout_contains("Using rack 1.1");
    Ok(())
}

#[test]
fn test_override_branch_mismatch_names_both_branches() -> Result<()> {
    let project = TestProject::new()?;
    let (local, _) = project.create_package_repo("rack", "1.1")?;
    TestGit::new(&local).create_branch("feature")?;
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\nbranch = \"master\"\n"))?;
    project.write_config(&override_config("rack", &local, false))?;

    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("is using branch feature but the manifest specifies master")
        .assert_stderr_contains(REMOTE);
    assert!(!project.lockfile_path().exists());
    Ok(())
}

#[test]
fn test_override_requires_branch_unless_check_disabled() -> Result<()> {
    let project = TestProject::new()?;
    let (local, head) = project.create_package_repo("rack", "1.1")?;
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\n"))?;

    project.write_config(&override_config("rack", &local, false))?;
    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("because no branch is specified");

    project.write_config(&override_config("rack", &local, true))?;
    project.run_gitpin(&["install"])?.assert_success();
    assert!(project.read_lockfile()?.contains(&head));
    Ok(())
}

#[test]
fn test_override_path_must_exist() -> Result<()> {
    let project = TestProject::new()?;
    let missing = project.root().join("nowhere");
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\nbranch = \"master\"\n"))?;
    project.write_config(&override_config("rack", &missing, false))?;

    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("Cannot use local override for rack because")
        .assert_stderr_contains("does not exist")
        .assert_stderr_contains(REMOTE);
    Ok(())
}

#[test]
fn test_override_at_other_revision_warns() -> Result<()> {
    let project = TestProject::new()?;
    let (local, first) = project.create_package_repo("rack", "1.1")?;
    let newer = project.commit_change(&local, "NEWS", "local work")?;
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\nref = \"{first}\"\n"))?;
    project.write_config(&override_config("rack", &local, true))?;

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stderr_contains("Using the local checkout");
    assert!(project.read_lockfile()?.contains(&newer));
    Ok(())
}

#[test]
fn test_branch_with_ref_warns_under_default_branch_check() -> Result<()> {
    let project = TestProject::new()?;
    let (local, first) = project.create_package_repo("rack", "1.1")?;
    let newer = project.commit_change(&local, "NEWS", "local work")?;
    project.write_manifest(&format!(
        "[packages.rack]\ngit = \"{REMOTE}\"\nbranch = \"master\"\nref = \"{first}\"\n"
    ))?;
    project.write_config(&override_config("rack", &local, false))?;

    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stderr_contains("warning:")
        .assert_stderr_contains(&format!("the manifest specifies {first}. Using the local checkout"));

    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&format!("revision = \"{newer}\"")));
    assert!(lockfile.contains("branch = \"master\""));
    assert!(lockfile.contains(&format!("ref = \"{first}\"")));

    // A repeat install reproduces the same lock entry
    project.run_gitpin(&["install"])?.assert_success();
    assert_eq!(project.read_lockfile()?, lockfile);
    Ok(())
}

#[test]
fn test_locked_revision_missing_from_override_fails() -> Result<()> {
    let project = TestProject::new()?;
    let (local, _) = project.create_package_repo("rack", "1.1")?;
    project.write_manifest(&format!("[packages.rack]\ngit = \"{REMOTE}\"\nbranch = \"master\"\n"))?;
    project.write_config(&override_config("rack", &local, false))?;
    std::fs::write(
        project.lockfile_path(),
        format!(
            "version = 1\n\n[[git]]\nremote = \"{REMOTE}\"\nrevision = \"{}\"\nbranch = \"master\"\n\n\
             [[packages]]\nname = \"rack\"\nversion = \"1.1\"\nsource = \"git+{REMOTE}\"\n",
            "1".repeat(40)
        ),
    )?;

    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("The lockfile is pointing to revision");

    // update re-resolves from the override
    project.run_gitpin(&["update"])?.assert_success();
    Ok(())
}
