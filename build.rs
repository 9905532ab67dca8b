use std::process::Command;

fn git_revision() -> String {
    let rev = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

    match rev {
        Some(hash) => {
            let clean = Command::new("git")
                .args(["diff", "--quiet"])
                .output()
                .map(|o| o.status.success())
                .unwrap_or(true);
            if clean { hash } else { format!("{}-dirty", hash) }
        }
        None => "unknown".to_string(),
    }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", git_revision());
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
