//! File system helpers: post-order directory crawl, whole-file reads and line counts.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use walkdir::WalkDir;

/// Visits every entry below `root` (the root itself excluded). Directories are visited after
/// their contents. Unreadable entries are an error.
pub fn crawl<F>(root: &Path, mut callback: F) -> std::io::Result<()>
where
    F: FnMut(&Path),
{
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::other)?;
        callback(entry.path());
    }
    Ok(())
}

pub fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

/// Number of lines as a line reader sees them: a trailing newline does not start a new line.
pub fn line_count(path: &Path) -> std::io::Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for segment in reader.split(b'\n') {
        segment?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn crawl_is_post_order() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.java"), "class C {}").unwrap();
        fs::write(dir.path().join("a/d.java"), "class D {}").unwrap();

        let mut visited = Vec::new();
        crawl(dir.path(), |p| {
            visited.push(
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/"),
            )
        })
        .unwrap();

        let pos = |name: &str| visited.iter().position(|v| v == name).unwrap();
        assert_eq!(visited.len(), 4);
        assert!(pos("a/b/c.java") < pos("a/b"));
        assert!(pos("a/b") < pos("a"));
        assert!(pos("a/d.java") < pos("a"));
    }

    #[test]
    fn crawl_missing_root_fails() {
        assert!(crawl(Path::new("/definitely/not/here"), |_| {}).is_err());
    }

    #[test]
    fn counts_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.java");
        fs::write(&path, "a\nb\r\nc\n").unwrap();
        assert_eq!(line_count(&path).unwrap(), 3);
        fs::write(&path, "a\nb").unwrap();
        assert_eq!(line_count(&path).unwrap(), 2);
        fs::write(&path, "").unwrap();
        assert_eq!(line_count(&path).unwrap(), 0);
    }
}
