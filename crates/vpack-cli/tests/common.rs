#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const PYTHON_VERSION: &str = "python3.11";

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write fixture file");
}

/// Builds a fake interpreter install and a `venv` environment named `simple`
/// that points at it. Returns the tempdir and the environment prefix.
pub fn prepare_env() -> (TempDir, PathBuf) {
    let temp = tempfile::Builder::new()
        .prefix("venv-pack-cli")
        .tempdir()
        .expect("tempdir");
    let base = temp.path().join("base");
    write(&base.join("bin").join(PYTHON_VERSION), b"\x7fELF fake\n");

    let env = temp.path().join("simple");
    let site = env.join("lib").join(PYTHON_VERSION).join("site-packages");
    write(
        &env.join("pyvenv.cfg"),
        format!("home = {}/bin\nversion = 3.11.4\n", base.display()).as_bytes(),
    );
    let pip = env.join("bin").join("pip");
    write(
        &pip,
        format!("#!{}/bin/python\nimport pip\n", env.display()).as_bytes(),
    );
    fs::set_permissions(&pip, fs::Permissions::from_mode(0o755)).expect("chmod");
    symlink(
        base.join("bin").join(PYTHON_VERSION),
        env.join("bin").join("python"),
    )
    .expect("python link");
    write(&env.join("bin").join("activate"), b"# stale\n");
    write(&site.join("toolz").join("__init__.py"), b"\n");
    write(&site.join("toolz").join("itertoolz.py"), b"\n");
    write(&site.join("toolz").join("compat.pyc"), b"\0");
    (temp, env)
}

pub fn tar_names(path: &Path) -> Vec<String> {
    let file = fs::File::open(path).expect("open archive");
    let mut archive = tar::Archive::new(file);
    archive
        .entries()
        .expect("entries")
        .map(|entry| {
            let entry = entry.expect("entry");
            let name = entry.path().expect("path").to_string_lossy().into_owned();
            name
        })
        .collect()
}

pub fn site(name: &str) -> String {
    format!("lib/{PYTHON_VERSION}/site-packages/{name}")
}
