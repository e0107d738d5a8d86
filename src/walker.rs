//! 站点目录遍历模块
//!
//! 递归列出源目录下的所有条目，并按扩展名区分待翻译文档（`.html`）与静态资源。
//! 遍历顺序取决于文件系统返回的顺序，不做排序，不同平台之间不保证一致。
//! 遍历不跟随符号链接，因此不会出现符号链接循环；符号链接按自身名称分类。

// 标准库导入
use std::fmt;
use std::path::{Component, Path, PathBuf};

// 第三方crate导入
use walkdir::WalkDir;

// 本地模块导入
use crate::api_constants::site_config;
use crate::error::{Result, TranslationError};

/// 相对源目录的路径
///
/// 统一使用 `/` 分隔，作为进度日志中的标识以及映射到输出目录的依据。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

impl RelativePath {
    /// 计算 `path` 相对 `root` 的路径
    pub fn from_paths(root: &Path, path: &Path) -> Result<Self> {
        let relative = path.strip_prefix(root).map_err(|_| TranslationError::FileOperation {
            path: path.to_path_buf(),
            operation: "计算相对路径".to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("路径不在根目录 {} 之下", root.display()),
            ),
        })?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => {
                    let segment = segment.to_str().ok_or_else(|| TranslationError::FileOperation {
                        path: path.to_path_buf(),
                        operation: "计算相对路径".to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "文件名不是有效的UTF-8",
                        ),
                    })?;
                    segments.push(segment);
                }
                Component::CurDir => {}
                _ => {
                    return Err(TranslationError::FileOperation {
                        path: path.to_path_buf(),
                        operation: "计算相对路径".to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::InvalidInput,
                            "相对路径包含非法组成部分",
                        ),
                    })
                }
            }
        }

        Ok(Self(segments.join("/")))
    }

    /// 以字符串形式获取
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 映射到给定根目录下的实际路径
    pub fn under(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelativePath {
    fn from(value: &str) -> Self {
        Self(value.trim_matches('/').to_string())
    }
}

impl From<String> for RelativePath {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// 条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// 目录，遍历时自动深入
    Directory,
    /// 待翻译的HTML文档
    Document,
    /// 其他文件，由静态资源复制步骤负责
    Asset,
}

/// 遍历得到的单个条目
#[derive(Debug, Clone)]
pub struct SiteEntry {
    /// 相对源目录的路径
    pub relative: RelativePath,
    /// 源文件的完整路径
    pub path: PathBuf,
    /// 条目类型
    pub kind: EntryKind,
}

impl SiteEntry {
    /// 是否为待翻译文档
    pub fn is_document(&self) -> bool {
        self.kind == EntryKind::Document
    }
}

/// 判断文件名是否为待翻译文档（`.html`，区分大小写）
pub fn is_document_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == site_config::DOCUMENT_EXTENSION)
        .unwrap_or(false)
}

/// 遍历站点目录
///
/// 返回惰性迭代器，不包含根目录本身。`exclude` 指定的子树（通常是位于源目录内的
/// 输出目录）会被整体跳过。
pub fn walk<'a>(
    root: &'a Path,
    exclude: Option<&'a Path>,
) -> impl Iterator<Item = Result<SiteEntry>> + 'a {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| match exclude {
            Some(excluded) => !entry.path().starts_with(excluded),
            None => true,
        })
        .map(move |entry| {
            let entry = entry?;
            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else if is_document_path(entry.path()) {
                EntryKind::Document
            } else {
                EntryKind::Asset
            };

            Ok(SiteEntry {
                relative: RelativePath::from_paths(root, entry.path())?,
                path: entry.into_path(),
                kind,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html></html>").unwrap();
    }

    fn collect(root: &Path, exclude: Option<&Path>) -> Vec<SiteEntry> {
        walk(root, exclude).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_classifies_entries() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "a/b.html");
        touch(dir.path(), "a/c/d.html");
        touch(dir.path(), "a/style.css");
        touch(dir.path(), "UPPER.HTML");
        touch(dir.path(), "page.htm");
        touch(dir.path(), ".html");

        let entries = collect(dir.path(), None);

        let documents: HashSet<&str> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Document)
            .map(|e| e.relative.as_str())
            .collect();
        assert_eq!(
            documents,
            HashSet::from(["index.html", "a/b.html", "a/c/d.html"])
        );

        let directories: HashSet<&str> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .map(|e| e.relative.as_str())
            .collect();
        assert_eq!(directories, HashSet::from(["a", "a/c"]));

        let assets: HashSet<&str> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Asset)
            .map(|e| e.relative.as_str())
            .collect();
        assert_eq!(
            assets,
            HashSet::from(["a/style.css", "UPPER.HTML", "page.htm", ".html"])
        );
    }

    #[test]
    fn test_empty_directory_yields_no_documents() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();

        let entries = collect(dir.path(), None);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_document()));
    }

    #[test]
    fn test_excluded_subtree_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "out/ms/index.html");

        let excluded = dir.path().join("out");
        let entries = collect(dir.path(), Some(&excluded));
        let relatives: Vec<&str> = entries.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(relatives, vec!["index.html"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let first = walk(&missing, None).next().unwrap();
        assert!(matches!(first, Err(TranslationError::FileOperation { .. })));
    }

    #[test]
    fn test_relative_path_mapping() {
        let root = Path::new("/srv/site");
        let relative = RelativePath::from_paths(root, &root.join("a").join("c").join("d.html")).unwrap();
        assert_eq!(relative.as_str(), "a/c/d.html");
        assert_eq!(
            relative.under(Path::new("/srv/out/ms")),
            Path::new("/srv/out/ms").join("a").join("c").join("d.html")
        );

        assert!(RelativePath::from_paths(root, Path::new("/elsewhere/x.html")).is_err());
        assert_eq!(RelativePath::from("/a/b.html/").as_str(), "a/b.html");
    }
}
