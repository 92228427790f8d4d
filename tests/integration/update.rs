//! `gitpin update` always reflects the current remote state.

use anyhow::Result;

use crate::common::{TestGit, TestProject, git_package};

#[test]
fn test_update_follows_force_pushed_branch() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, first) = project.create_package_repo("rack", "1.0")?;
    let second = project.commit_change(&repo, "NEWS", "second")?;
    project.write_manifest(&git_package("rack", &repo, &["branch = \"master\""]))?;

    project.run_gitpin(&["install"])?.assert_success();
    assert!(project.read_lockfile()?.contains(&second));

    // Move the branch backward
    let git = TestGit::new(&repo);
    git.reset_hard(&first)?;
    project.run_gitpin(&["update"])?.assert_success().assert_stdout_contains("Fetching");
    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&first));
    assert!(!lockfile.contains(&second));

    // And forward again
    git.reset_hard(&second)?;
    project.run_gitpin(&["update"])?.assert_success();
    assert!(project.read_lockfile()?.contains(&second));
    Ok(())
}

#[test]
fn test_update_picks_up_new_commits() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, first) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;
    project.run_gitpin(&["install"])?.assert_success();

    let newer = project.commit_change(&repo, "NEWS", "newer")?;
    project
        .run_gitpin(&["update"])?
        .assert_success()
        .assert_stdout_contains(&format!("(at HEAD@{})", &newer[..7]))
        .assert_stdout_contains("Update complete!");

    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&newer));
    assert!(!lockfile.contains(&first));
    Ok(())
}

#[test]
fn test_selective_update_keeps_other_pins() -> Result<()> {
    let project = TestProject::new()?;
    let (rack, rack_first) = project.create_package_repo("rack", "1.0")?;
    let (sinatra, sinatra_first) = project.create_package_repo("sinatra", "2.0")?;
    project.write_manifest(&format!(
        "{}{}",
        git_package("rack", &rack, &[]),
        git_package("sinatra", &sinatra, &[])
    ))?;
    project.run_gitpin(&["install"])?.assert_success();

    let rack_next = project.commit_change(&rack, "NEWS", "more")?;
    project.commit_change(&sinatra, "NEWS", "more")?;

    project.run_gitpin(&["update", "rack"])?.assert_success();
    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&rack_next));
    assert!(!lockfile.contains(&rack_first));
    assert!(lockfile.contains(&sinatra_first));
    Ok(())
}

#[test]
fn test_update_of_undeclared_package_fails() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, _) = project.create_package_repo("rack", "1.0")?;
    project.write_manifest(&git_package("rack", &repo, &[]))?;

    project
        .run_gitpin(&["update", "sinatra"])?
        .assert_failure()
        .assert_stderr_contains("cannot update 'sinatra'");
    Ok(())
}

#[test]
fn test_branch_and_ref_with_same_name_resolve_alike() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, sha) = project.create_package_repo("rack", "1.0")?;

    project.write_manifest(&git_package("rack", &repo, &["branch = \"master\""]))?;
    project.run_gitpin(&["install"])?.assert_success();
    assert!(project.read_lockfile()?.contains(&sha));

    project.write_manifest(&git_package("rack", &repo, &["ref = \"master\""]))?;
    project.run_gitpin(&["update"])?.assert_success();
    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&sha));
    assert!(lockfile.contains("ref = \"master\""));
    Ok(())
}

#[test]
fn test_tag_pins_tagged_commit() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, tagged) = project.create_package_repo("rack", "1.0")?;
    TestGit::new(&repo).tag("v1.0")?;
    project.commit_change(&repo, "NEWS", "after the tag")?;

    project.write_manifest(&git_package("rack", &repo, &["tag = \"v1.0\""]))?;
    project
        .run_gitpin(&["update"])?
        .assert_success()
        .assert_stdout_contains(&format!("(at v1.0@{})", &tagged[..7]));
    assert!(project.read_lockfile()?.contains(&tagged));
    Ok(())
}
