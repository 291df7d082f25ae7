//! End-to-end tests of the mmu-sim binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INPUT: &str = "\
#process/vma/page reference generator
1
#### process 0
2
0 31 0 0
32 47 1 1
c 0
r 0
w 1
r 2
w 40
r 60
e 0
";

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn mmu_sim() -> Command {
    Command::cargo_bin("mmu-sim").unwrap()
}

#[test]
fn test_summary_output() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);

    // c 0: 130
    // r 0: 1 + ZERO 150 + MAP 350
    // w 1: 1 + ZERO 150 + MAP 350
    // r 2: 1 + UNMAP 0:0 410 + ZERO 150 + MAP 350
    // w 40: 1 + UNMAP 0:1 410 + OUT 2750 + FIN 2350 + MAP 350 + SEGPROT 410
    // r 60: 1 + SEGV 440
    // e 0: 1230 + UNMAP 410 + UNMAP 410
    mmu_sim()
        .args(["-f2", "-af", "-oS"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("PROC[0]: U=4 M=4 I=0 O=1 FI=1 FO=0 Z=3 SV=1 SP=1"))
        .stdout(predicate::str::starts_with("EXIT current process 0\n"))
        .stdout(predicate::str::contains("TOTALCOST 7 1 1 10805 4"));
}

#[test]
fn test_current_page_table_skips_segv() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);

    let output = mmu_sim().args(["-f2", "-ox"]).arg(&input).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let tables: Vec<_> = stdout.lines().filter(|l| l.starts_with("PT[0]:")).collect();

    // r 0, w 1, r 2, w 40 print a table; r 60 is a SEGV
    assert_eq!(tables.len(), 4);
    assert!(tables[0].starts_with("PT[0]:  0:R-- *"));
    assert!(stdout.starts_with("PT[0]:"));
    assert!(stdout.ends_with("EXIT current process 0\n"));
}

#[test]
fn test_trace_output() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);

    mmu_sim()
        .args(["-f2", "-oO"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0: ==> c 0\n1: ==> r 0\n ZERO\n MAP 0\n"))
        .stdout(predicate::str::contains("4: ==> w 40\n UNMAP 0:1\n OUT\n FIN\n MAP 1\n SEGPROT\n"))
        .stdout(predicate::str::contains("5: ==> r 60\n SEGV\n"))
        .stdout(predicate::str::contains("EXIT current process 0\n UNMAP 0:2\n UNMAP 0:40\n"));
}

#[test]
fn test_random_algorithm_reads_random_file() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);
    let rfile = write_file(&dir, "rfile", "3\n1\n0\n1\n");

    mmu_sim()
        .args(["-f2", "-ar", "-oa"])
        .arg(&input)
        .arg(&rfile)
        .assert()
        .success()
        // the random pager prints no selection detail
        .stdout("EXIT current process 0\n");
}

#[test]
fn test_random_algorithm_requires_random_file() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);

    mmu_sim()
        .args(["-ar"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("random algorithm requires a random file"));
}

#[test]
fn test_rejects_zero_frames() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);

    mmu_sim()
        .args(["-f0"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("frame count 0"));
}

#[test]
fn test_rejects_unknown_algorithm_and_option() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "in1", INPUT);

    mmu_sim()
        .args(["-az"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown replacement algorithm: <z>"));

    mmu_sim()
        .args(["-oOZ"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown output option: <Z>"));
}

#[test]
fn test_missing_input_file() {
    mmu_sim()
        .arg("/nonexistent/mmu-sim-input")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open"));
}
