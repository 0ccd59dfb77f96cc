use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub(crate) const PYTHON_VERSION: &str = "python3.11";

/// A fake interpreter installation plus one environment created from it.
pub(crate) struct Fixture {
    pub(crate) temp: TempDir,
    pub(crate) base: PathBuf,
    pub(crate) env: PathBuf,
}

impl Fixture {
    pub(crate) fn lib(&self) -> PathBuf {
        self.env.join("lib").join(PYTHON_VERSION)
    }

    pub(crate) fn site_packages(&self) -> PathBuf {
        self.lib().join("site-packages")
    }

    pub(crate) fn out(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }
}

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write fixture file");
}

fn write_executable(path: &Path, contents: &[u8]) {
    write(path, contents);
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

fn base_install(root: &Path) -> PathBuf {
    let base = root.join("base");
    write_executable(
        &base.join("bin").join(PYTHON_VERSION),
        b"\x7fELF fake interpreter\n",
    );
    write(
        &base.join("lib").join(PYTHON_VERSION).join("os.py"),
        b"# stdlib os\n",
    );
    write(
        &base.join("include").join(PYTHON_VERSION).join("Python.h"),
        b"/* header */\n",
    );
    base
}

fn common_tree(env: &Path) {
    let bin = env.join("bin");
    let site = env.join("lib").join(PYTHON_VERSION).join("site-packages");
    write_executable(
        &bin.join("pip"),
        format!(
            "#!{}/bin/python\n# -*- coding: utf-8 -*-\nimport sys\nfrom pip._internal.cli.main import main\n",
            env.display()
        )
        .as_bytes(),
    );
    write_executable(&bin.join("activate"), b"# hardcoded activate\n");
    write_executable(&bin.join("activate.fish"), b"# hardcoded activate.fish\n");
    write(&site.join("toolz").join("__init__.py"), b"from .itertoolz import *\n");
    write(&site.join("toolz").join("itertoolz.py"), b"def first(seq): ...\n");
    write(
        &site
            .join("toolz")
            .join("__pycache__")
            .join("__init__.cpython-311.pyc"),
        b"\x00\x01pyc",
    );
    write(
        &site.join("distutils-precedence.pth"),
        b"import os; var = 'SETUPTOOLS_USE_DISTUTILS'\n",
    );
    fs::create_dir_all(site.join("empty_pkg")).expect("empty dir");
    symlink("toolz", site.join("linked_pkg")).expect("dir symlink");
    write(&env.join("README~"), b"backup\n");
}

/// A stdlib `venv` layout whose `home` points at the fake base install.
pub(crate) fn venv_fixture(name: &str) -> Fixture {
    let temp = tempfile::tempdir().expect("tempdir");
    let base = base_install(temp.path());
    let env = temp.path().join("envs").join(name);
    common_tree(&env);
    write(
        &env.join("pyvenv.cfg"),
        format!(
            "home = {}/bin\ninclude-system-site-packages = false\nversion = 3.11.4\n",
            base.display()
        )
        .as_bytes(),
    );
    let bin = env.join("bin");
    symlink(base.join("bin").join(PYTHON_VERSION), bin.join("python")).expect("python link");
    symlink("python", bin.join("python3")).expect("python3 link");
    fs::create_dir_all(env.join("include")).expect("include dir");
    Fixture { temp, base, env }
}

/// A legacy `virtualenv` layout recording its base in `orig-prefix.txt`.
pub(crate) fn virtualenv_fixture(name: &str) -> Fixture {
    let temp = tempfile::tempdir().expect("tempdir");
    let base = base_install(temp.path());
    let env = temp.path().join("envs").join(name);
    common_tree(&env);
    let lib = env.join("lib").join(PYTHON_VERSION);
    write(
        &lib.join("orig-prefix.txt"),
        base.display().to_string().as_bytes(),
    );
    symlink(
        base.join("lib").join(PYTHON_VERSION).join("os.py"),
        lib.join("os.py"),
    )
    .expect("stdlib link");
    fs::create_dir_all(env.join("include")).expect("include dir");
    symlink(
        base.join("include").join(PYTHON_VERSION),
        env.join("include").join(PYTHON_VERSION),
    )
    .expect("include link");
    write_executable(
        &env.join("bin").join("python"),
        b"\x7fELF copied interpreter\n",
    );
    Fixture { temp, base, env }
}
