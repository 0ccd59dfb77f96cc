use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use anyhow::Result;
use filetime::FileTime;
use tempfile::{tempdir, TempDir};
use vpack_domain::ArchiveFormat;

use super::{open_archive, Archive, ArchiveOptions, ZipArchive};

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Source tree with plain files, an empty dir, and links to each.
fn source_tree() -> Result<(TempDir, Vec<&'static str>)> {
    let temp = tempdir()?;
    let root = temp.path();
    fs::create_dir(root.join("empty_dir"))?;
    symlink("empty_dir", root.join("link_to_empty_dir"))?;
    fs::create_dir(root.join("dir"))?;
    fs::write(root.join("dir").join("one"), b"one")?;
    fs::write(root.join("dir").join("two"), b"two")?;
    symlink("dir", root.join("link_to_dir"))?;
    fs::write(root.join("file"), b"file")?;
    fs::set_permissions(root.join("file"), fs::Permissions::from_mode(0o755))?;
    symlink("file", root.join("link_to_file"))?;
    let paths = vec![
        "empty_dir",
        "link_to_empty_dir",
        "dir/one",
        "dir/two",
        "link_to_dir",
        "file",
        "link_to_file",
    ];
    Ok((temp, paths))
}

fn write_archive(
    root: &Path,
    paths: &[&str],
    out: &Path,
    format: ArchiveFormat,
    options: &ArchiveOptions,
    manual_links: bool,
) -> Result<()> {
    let mut archive = open_archive(File::create(out)?, format, options);
    for rel in paths {
        archive.add(&root.join(rel), rel)?;
    }
    archive.add_bytes(&root.join("file"), b"foo bar", "dir/from_bytes")?;
    if manual_links {
        archive.add_link(&root.join("link_to_file"), "dir/one", "manual_link_to_file")?;
        archive.add_link(&root.join("link_to_dir"), "empty_dir", "manual_link_to_dir")?;
    }
    archive.finish()?;
    Ok(())
}

#[derive(Debug)]
struct TarMember {
    kind: ::tar::EntryType,
    link: Option<PathBuf>,
    mode: u32,
    mtime: u64,
    data: Vec<u8>,
}

fn read_tar(path: &Path, format: ArchiveFormat) -> Result<BTreeMap<String, TarMember>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match format {
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
        ArchiveFormat::TarBz2 => Box::new(bzip2::read::BzDecoder::new(file)),
        _ => Box::new(file),
    };
    let mut archive = ::tar::Archive::new(reader);
    let mut members = BTreeMap::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().trim_end_matches('/').to_string();
        let kind = entry.header().entry_type();
        let link = entry.link_name()?.map(|link| link.into_owned());
        let mode = entry.header().mode()?;
        let mtime = entry.header().mtime()?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        members.insert(
            name,
            TarMember {
                kind,
                link,
                mode,
                mtime,
                data,
            },
        );
    }
    Ok(members)
}

#[test]
fn tar_formats_store_links_natively() -> Result<()> {
    let (src, paths) = source_tree()?;
    for format in [ArchiveFormat::Tar, ArchiveFormat::TarGz, ArchiveFormat::TarBz2] {
        let out_dir = tempdir()?;
        let out = out_dir.path().join(format!("test.{format}"));
        write_archive(src.path(), &paths, &out, format, &ArchiveOptions::default(), true)?;
        let members = read_tar(&out, format)?;

        assert_eq!(members["empty_dir"].kind, ::tar::EntryType::Directory);
        assert!(
            !members.contains_key("dir"),
            "directory entries are added explicitly, not implied"
        );
        assert_eq!(members["dir/one"].data, b"one");
        for (link, target) in [
            ("link_to_dir", "dir"),
            ("link_to_file", "file"),
            ("link_to_empty_dir", "empty_dir"),
            ("manual_link_to_file", "dir/one"),
            ("manual_link_to_dir", "empty_dir"),
        ] {
            let member = &members[link];
            assert_eq!(member.kind, ::tar::EntryType::Symlink, "{format}: {link}");
            assert_eq!(member.link.as_deref(), Some(Path::new(target)));
        }
        let from_bytes = &members["dir/from_bytes"];
        assert_eq!(from_bytes.data, b"foo bar");
        assert_eq!(from_bytes.mode & 0o777, 0o755, "metadata comes from source");
        for name in members.keys() {
            assert!(!name.starts_with('/') && !name.starts_with(".."));
        }
    }
    Ok(())
}

#[test]
fn uncompressed_tar_ignores_level_and_bzip2_accepts_zero() -> Result<()> {
    let (src, paths) = source_tree()?;
    let out_dir = tempdir()?;
    let options = ArchiveOptions {
        compress_level: 0,
        ..ArchiveOptions::default()
    };
    for format in [ArchiveFormat::Tar, ArchiveFormat::TarBz2, ArchiveFormat::TarGz] {
        let out = out_dir.path().join(format!("level0.{format}"));
        write_archive(src.path(), &paths, &out, format, &options, false)?;
        assert!(read_tar(&out, format)?.contains_key("dir/from_bytes"));
    }
    Ok(())
}

fn read_zip(path: &Path) -> Result<BTreeMap<String, (Option<u32>, Vec<u8>)>> {
    let mut archive = ::zip::ZipArchive::new(File::open(path)?)?;
    let mut members = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        members.insert(entry.name().to_string(), (entry.unix_mode(), data));
    }
    Ok(members)
}

#[test]
fn zip_dereferences_links_by_default() -> Result<()> {
    let (src, paths) = source_tree()?;
    let out_dir = tempdir()?;
    let out = out_dir.path().join("test.zip");
    write_archive(
        src.path(),
        &paths,
        &out,
        ArchiveFormat::Zip,
        &ArchiveOptions::default(),
        true,
    )?;
    let members = read_zip(&out)?;

    assert!(members.contains_key("empty_dir/"));
    assert!(members.contains_key("link_to_empty_dir/"));
    assert_eq!(members["link_to_dir/one"].1, b"one");
    assert_eq!(members["link_to_dir/two"].1, b"two");
    assert_eq!(members["link_to_file"].1, b"file");
    assert_eq!(members["dir/from_bytes"].1, b"foo bar");
    // without link support, manual links store what the source resolves to
    assert_eq!(members["manual_link_to_file"].1, b"file");
    assert_eq!(members["manual_link_to_dir/one"].1, b"one");
    for (name, (mode, _)) in &members {
        if let Some(mode) = mode {
            assert_ne!(mode & S_IFMT, S_IFLNK, "{name} should not be a link");
        }
    }
    Ok(())
}

#[test]
fn zip_symlinks_store_link_entries() -> Result<()> {
    let (src, paths) = source_tree()?;
    let out_dir = tempdir()?;
    let out = out_dir.path().join("links.zip");
    let options = ArchiveOptions {
        zip_symlinks: true,
        ..ArchiveOptions::default()
    };
    write_archive(src.path(), &paths, &out, ArchiveFormat::Zip, &options, true)?;
    let members = read_zip(&out)?;

    for (link, target) in [
        ("link_to_dir", "dir"),
        ("link_to_file", "file"),
        ("link_to_empty_dir", "empty_dir"),
        ("manual_link_to_file", "dir/one"),
        ("manual_link_to_dir", "empty_dir"),
    ] {
        let (mode, data) = &members[link];
        let mode = mode.expect("unix mode recorded");
        assert_eq!(mode & S_IFMT, S_IFLNK, "{link}");
        assert_eq!(data.as_slice(), target.as_bytes());
    }
    assert!(!members.contains_key("link_to_dir/one"));
    let (mode, _) = members["file"];
    assert_eq!(mode.expect("mode") & 0o777, 0o755);
    Ok(())
}

fn many_entries(
    count: usize,
    zip_64: bool,
    limit: usize,
) -> Result<(TempDir, Result<(), crate::PackError>)> {
    let temp = tempdir()?;
    let source = temp.path().join("source.txt");
    fs::write(&source, b"0")?;
    let out = temp.path().join("large.zip");
    let mut archive = ZipArchive::new(File::create(&out)?, false, zip_64).with_entry_limit(limit);
    let mut result = Ok(());
    for index in 0..count {
        if let Err(err) = archive.add(&source, &format!("foo{index}")) {
            result = Err(err);
            break;
        }
    }
    if result.is_ok() {
        result = Box::new(archive).finish();
    }
    Ok((temp, result))
}

#[test]
fn zip64_disabled_rejects_entry_overflow() -> Result<()> {
    let (_temp, result) = many_entries(9, false, 8)?;
    let err = result.expect_err("entry limit exceeded");
    assert_eq!(err.code(), Some("VP301"));
    assert!(err.message().contains("ZIP64"));

    let (_temp, result) = many_entries(8, false, 8)?;
    result?;
    Ok(())
}

#[test]
fn zip64_enabled_allows_entry_overflow() -> Result<()> {
    let (temp, result) = many_entries(9, true, 8)?;
    result?;
    let archive = ::zip::ZipArchive::new(File::open(temp.path().join("large.zip"))?)?;
    assert_eq!(archive.len(), 9);
    Ok(())
}

#[test]
fn modification_times_come_from_source() -> Result<()> {
    const STAMP: i64 = 1_600_000_000; // 2020-09-13T12:26:40Z
    let (src, _) = source_tree()?;
    let file = src.path().join("file");
    filetime::set_file_mtime(&file, FileTime::from_unix_time(STAMP, 0))?;
    let out_dir = tempdir()?;

    let tar_out = out_dir.path().join("stamped.tar");
    let mut archive = open_archive(
        File::create(&tar_out)?,
        ArchiveFormat::Tar,
        &ArchiveOptions::default(),
    );
    archive.add(&file, "file")?;
    archive.add_bytes(&file, b"rewritten", "copy")?;
    archive.finish()?;
    let members = read_tar(&tar_out, ArchiveFormat::Tar)?;
    assert_eq!(members["file"].mtime, STAMP as u64);
    assert_eq!(members["copy"].mtime, STAMP as u64);

    let zip_out = out_dir.path().join("stamped.zip");
    let mut archive = open_archive(
        File::create(&zip_out)?,
        ArchiveFormat::Zip,
        &ArchiveOptions::default(),
    );
    archive.add(&file, "file")?;
    archive.finish()?;
    let mut zip = ::zip::ZipArchive::new(File::open(&zip_out)?)?;
    let stamp = zip.by_name("file")?.last_modified();
    assert_eq!((stamp.year(), stamp.month(), stamp.day()), (2020, 9, 13));
    assert_eq!((stamp.hour(), stamp.minute()), (12, 26));
    Ok(())
}
