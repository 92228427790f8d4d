//! Packages inside submodules are only visible with `submodules = true`.

use anyhow::Result;

use crate::common::{TestGit, TestProject, create_package_repo};

#[test]
fn test_submodule_packages_need_the_flag() -> Result<()> {
    let project = TestProject::new()?;
    let inner = project.sources_path().join("inner");
    create_package_repo(&inner, "inner", "2.0")?;

    let (outer, outer_head) = project.create_package_repo("outer", "1.0")?;
    let git = TestGit::new(&outer);
    git.add_submodule(&inner.display().to_string(), "vendor/inner")?;
    git.commit("Add inner as a submodule")?;
    let pinned = git.rev_parse_head()?;
    assert_ne!(pinned, outer_head);

    project.write_manifest(&format!(
        "[packages.outer]\ngit = \"{0}\"\n\n[packages.inner]\ngit = \"{0}\"\n",
        outer.display()
    ))?;
    project
        .run_gitpin(&["install"])?
        .assert_failure()
        .assert_stderr_contains("Could not find package 'inner'");

    project.write_manifest(&format!(
        "[packages.outer]\ngit = \"{0}\"\nsubmodules = true\n\n[packages.inner]\ngit = \"{0}\"\nsubmodules = true\n",
        outer.display()
    ))?;
    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains("Using inner 2.0")
        .assert_stdout_contains("Using outer 1.0");

    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&pinned));
    assert!(lockfile.contains("submodules = true"));
    Ok(())
}

#[test]
fn test_enabling_submodules_keeps_pinned_revision() -> Result<()> {
    let project = TestProject::new()?;
    let inner = project.sources_path().join("inner");
    create_package_repo(&inner, "inner", "2.0")?;

    let (outer, _) = project.create_package_repo("outer", "1.0")?;
    let git = TestGit::new(&outer);
    git.add_submodule(&inner.display().to_string(), "vendor/inner")?;
    git.commit("Add inner as a submodule")?;
    let pinned = git.rev_parse_head()?;

    project.write_manifest(&format!("[packages.outer]\ngit = \"{}\"\n", outer.display()))?;
    project.run_gitpin(&["install"])?.assert_success();
    assert!(project.read_lockfile()?.contains(&pinned));

    // Upstream moves on, but the lockfile pin holds
    project.commit_change(&outer, "NEWS", "later")?;

    project.write_manifest(&format!(
        "[packages.outer]\ngit = \"{0}\"\nsubmodules = true\n\n[packages.inner]\ngit = \"{0}\"\nsubmodules = true\n",
        outer.display()
    ))?;
    project
        .run_gitpin(&["install"])?
        .assert_success()
        .assert_stdout_contains("Using inner 2.0");

    let lockfile = project.read_lockfile()?;
    assert!(lockfile.contains(&pinned));
    assert!(lockfile.contains("submodules = true"));
    Ok(())
}
