//! Parallel resolution and processes sharing one cache.

use anyhow::Result;
use std::fs;
use std::thread;

use crate::common::{CommandOutput, TestProject, git_package};

#[test]
fn test_distinct_repositories_resolve_in_parallel() -> Result<()> {
    let project = TestProject::new()?;
    let mut manifest = String::new();
    let mut heads = Vec::new();
    for i in 0..6 {
        let name = format!("pkg{i}");
        let (repo, sha) = project.create_package_repo(&name, &format!("1.{i}"))?;
        manifest.push_str(&git_package(&name, &repo, &[]));
        heads.push(sha);
    }
    project.write_manifest(&manifest)?;

    let output = project.run_gitpin(&["install", "--max-parallel", "6"])?;
    output.assert_success().assert_stdout_contains("Install complete! 6 packages installed.");
    assert_eq!(output.stdout.matches("Fetching").count(), 6);

    let lockfile = project.read_lockfile()?;
    for sha in &heads {
        assert!(lockfile.contains(sha));
    }

    // Same result when resolved one at a time
    fs::remove_file(project.lockfile_path())?;
    project.run_gitpin(&["install", "--max-parallel", "1"])?.assert_success();
    assert_eq!(project.read_lockfile()?, lockfile);
    Ok(())
}

#[test]
fn test_processes_sharing_a_cache_serialize() -> Result<()> {
    let project = TestProject::new()?;
    let (repo, sha) = project.create_package_repo("rack", "1.0")?;

    let mut dirs = Vec::new();
    for i in 0..4 {
        let dir = project.root().join(format!("app{i}"));
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("gitpin.toml"), git_package("rack", &repo, &["branch = \"master\""]))?;
        dirs.push(dir);
    }

    let outputs: Vec<CommandOutput> = thread::scope(|scope| {
        let handles: Vec<_> = dirs
            .iter()
            .map(|dir| {
                let mut cmd = project.gitpin_in(dir);
                cmd.arg("install");
                scope.spawn(move || cmd.output().map(CommandOutput::from))
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("thread panicked")).collect::<Vec<_>>()
    })
    .into_iter()
    .collect::<std::io::Result<_>>()?;

    for output in &outputs {
        output.assert_success().assert_stdout_contains("Using rack 1.0");
    }
    for dir in &dirs {
        assert!(fs::read_to_string(dir.join("gitpin.lock"))?.contains(&sha));
    }

    // One bare clone and one checkout, whoever got there first
    let sources: Vec<_> = fs::read_dir(project.cache_path().join("sources"))?.collect();
    assert_eq!(sources.len(), 1);
    let worktrees: Vec<_> = fs::read_dir(project.cache_path().join("worktrees"))?.collect();
    assert_eq!(worktrees.len(), 1);
    Ok(())
}
