//! 翻译进度日志模块
//!
//! 进度日志记录已经翻译并写入输出目录的文档相对路径，持久化为JSON字符串数组。
//! 每完成一个文档就整体重写一次文件（写穿而非延迟写），崩溃时最多丢失正在处理的那个文档。
//! 删除该文件即可强制全部重新翻译。

// 标准库导入
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// 第三方crate导入
use tempfile::NamedTempFile;
use tracing::{debug, warn};

// 本地模块导入
use crate::error::{Result, TranslationError};
use crate::walker::RelativePath;

/// 已完成文档的持久化集合
#[derive(Debug)]
pub struct ProgressLedger {
    path: PathBuf,
    /// 按完成顺序保存
    entries: Vec<RelativePath>,
    index: HashSet<RelativePath>,
}

impl ProgressLedger {
    /// 从磁盘加载进度日志
    ///
    /// 文件不存在时返回空日志；内容不是字符串数组时报错。
    /// 文件中的重复项只保留第一次出现。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut ledger = Self {
            path: path.clone(),
            entries: Vec::new(),
            index: HashSet::new(),
        };

        if !path.exists() {
            debug!("进度日志不存在，从头开始: {}", path.display());
            return Ok(ledger);
        }

        let content = fs::read_to_string(&path).map_err(|source| TranslationError::FileOperation {
            path: path.clone(),
            operation: "读取".to_string(),
            source,
        })?;

        let raw: Vec<String> =
            serde_json::from_str(&content).map_err(|e| TranslationError::LedgerCorrupt {
                path: path.clone(),
                details: e.to_string(),
            })?;

        let total = raw.len();
        for item in raw {
            let relative = RelativePath::from(item);
            if ledger.index.insert(relative.clone()) {
                ledger.entries.push(relative);
            }
        }

        if ledger.entries.len() < total {
            warn!(
                "⚠️  进度日志包含 {} 个重复条目，已忽略",
                total - ledger.entries.len()
            );
        }
        debug!("已加载进度日志: {} 条记录", ledger.entries.len());

        Ok(ledger)
    }

    /// 是否已经完成
    pub fn contains(&self, relative: &RelativePath) -> bool {
        self.index.contains(relative)
    }

    /// 记录完成并立即整体重写进度日志
    ///
    /// 必须在对应的输出文件已经写入磁盘之后调用。重复记录不会产生重复条目，
    /// 但仍会重写文件。
    pub fn record_and_persist(&mut self, relative: RelativePath) -> Result<()> {
        if self.index.insert(relative.clone()) {
            self.entries.push(relative);
        }
        self.persist()
    }

    /// 已完成条目，按完成顺序
    pub fn entries(&self) -> &[RelativePath] {
        &self.entries
    }

    /// 已完成条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 进度日志文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 原子地写入磁盘：先写同目录临时文件并刷盘，再重命名覆盖
    fn persist(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_error = |operation: &str, source: std::io::Error| TranslationError::FileOperation {
            path: self.path.clone(),
            operation: operation.to_string(),
            source,
        };

        fs::create_dir_all(&parent).map_err(|e| io_error("创建目录", e))?;

        let items: Vec<&str> = self.entries.iter().map(RelativePath::as_str).collect();
        let json = serde_json::to_string_pretty(&items)
            .map_err(|e| io_error("序列化", std::io::Error::other(e)))?;

        let mut temp_file = NamedTempFile::new_in(&parent).map_err(|e| io_error("创建临时文件", e))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| io_error("写入", e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| io_error("刷盘", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| io_error("替换", e.error))?;

        debug!("进度日志已更新: {} 条记录", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ProgressLedger::load(dir.path().join("translated-files.json")).unwrap();
        assert!(ledger.is_empty());
        assert!(!ledger.contains(&RelativePath::from("index.html")));
    }

    #[test]
    fn test_record_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ms").join("translated-files.json");

        let mut ledger = ProgressLedger::load(&path).unwrap();
        ledger.record_and_persist(RelativePath::from("index.html")).unwrap();
        ledger.record_and_persist(RelativePath::from("a/b.html")).unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["index.html", "a/b.html"]);

        let reloaded = ProgressLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&RelativePath::from("a/b.html")));
        assert_eq!(reloaded.path(), path.as_path());
    }

    #[test]
    fn test_entries_stay_unique() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translated-files.json");
        fs::write(&path, r#"["a.html", "b.html", "a.html"]"#).unwrap();

        let mut ledger = ProgressLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);

        ledger.record_and_persist(RelativePath::from("b.html")).unwrap();
        let on_disk: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["a.html", "b.html"]);
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translated-files.json");

        fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(matches!(
            ProgressLedger::load(&path),
            Err(TranslationError::LedgerCorrupt { .. })
        ));

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            ProgressLedger::load(&path),
            Err(TranslationError::LedgerCorrupt { .. })
        ));
    }

    #[test]
    fn test_persisted_file_is_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translated-files.json");
        let mut ledger = ProgressLedger::load(&path).unwrap();
        ledger.record_and_persist(RelativePath::from("x.html")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  \"x.html\"\n]");
        // 不残留临时文件
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
