//! Copies a project into a fresh temporary directory so concurrent sandbox calls never
//! interfere with each other or with the caller's working tree.

use std::path::Path;

pub fn copy_project(source: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in walkdir::WalkDir::new(source).into_iter().filter_map(Result::ok) {
        let relative = entry.path().strip_prefix(source).expect("entry under source");
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_nested_files_preserving_structure() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("tests")).unwrap();
        std::fs::write(src.path().join("tests/test_a.py"), "def test_a(): pass").unwrap();
        std::fs::write(src.path().join("requirements.txt"), "").unwrap();

        let dest = tempfile::tempdir().unwrap();
        copy_project(src.path(), dest.path()).unwrap();

        assert!(dest.path().join("tests/test_a.py").exists());
        assert!(dest.path().join("requirements.txt").exists());
    }
}
