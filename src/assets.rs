//! 静态资源复制模块
//!
//! 把白名单中的非文档目录（如 `src`、`assets`）原样复制到输出目录的同名位置，
//! 覆盖已有内容。不经过进度日志和译文校验，在文档流水线结束后执行一次。
//! 单个目录缺失或复制失败只记录在报告中，不中断运行。

// 标准库导入
use std::fs;
use std::path::{Path, PathBuf};

// 第三方crate导入
use tracing::{debug, info, warn};
use walkdir::WalkDir;

// 本地模块导入
use crate::error::{Result, TranslationError};
use crate::utils::resolve_path;

/// 单个目录的复制结果
#[derive(Debug)]
pub enum AssetOutcome {
    /// 复制成功
    Copied {
        /// 目录名
        folder: String,
        /// 复制的文件数量
        files: usize,
    },
    /// 源目录中不存在
    Missing {
        /// 目录名
        folder: String,
    },
    /// 复制失败
    Failed {
        /// 目录名
        folder: String,
        /// 失败原因
        error: TranslationError,
    },
}

/// 静态资源复制报告
#[derive(Debug, Default)]
pub struct AssetReport {
    /// 每个目录的结果，按配置顺序
    pub outcomes: Vec<AssetOutcome>,
}

impl AssetReport {
    /// 成功复制的文件总数
    pub fn files_copied(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                AssetOutcome::Copied { files, .. } => *files,
                _ => 0,
            })
            .sum()
    }

    /// 是否有目录复制失败
    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, AssetOutcome::Failed { .. }))
    }
}

/// 静态资源复制器
#[derive(Debug, Clone)]
pub struct StaticAssetCopier {
    source_root: PathBuf,
    dest_root: PathBuf,
    folders: Vec<String>,
}

impl StaticAssetCopier {
    /// 创建复制器
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(source_root: P, dest_root: Q, folders: Vec<String>) -> Self {
        Self {
            source_root: source_root.as_ref().to_path_buf(),
            dest_root: dest_root.as_ref().to_path_buf(),
            folders,
        }
    }

    /// 依次复制所有配置的目录
    ///
    /// 输出目录位于被复制的目录之内时，复制过程中跳过输出目录本身。
    pub fn copy_all(&self) -> AssetReport {
        let mut report = AssetReport::default();
        let dest_root = resolve_path(&self.dest_root);

        for folder in &self.folders {
            let source = self.source_root.join(folder);
            let target = self.dest_root.join(folder);

            if !source.exists() {
                warn!("⚠️  目录 '{}' 在 {} 中不存在", folder, self.source_root.display());
                report.outcomes.push(AssetOutcome::Missing {
                    folder: folder.clone(),
                });
                continue;
            }

            match copy_recursive(&resolve_path(&source), &target, &dest_root) {
                Ok(files) => {
                    info!("✔ 已复制 '{}' 到 '{}' ({} 个文件)", folder, target.display(), files);
                    report.outcomes.push(AssetOutcome::Copied {
                        folder: folder.clone(),
                        files,
                    });
                }
                Err(error) => {
                    warn!("✖ 复制 '{}' 失败: {}", folder, error);
                    report.outcomes.push(AssetOutcome::Failed {
                        folder: folder.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}

/// 递归复制目录（或单个文件），覆盖目标中的同名文件，返回复制的文件数量
///
/// `exclude` 下的子树不复制。
fn copy_recursive(source: &Path, target: &Path, exclude: &Path) -> Result<usize> {
    let io_error = |path: &Path, operation: &str, source: std::io::Error| {
        TranslationError::FileOperation {
            path: path.to_path_buf(),
            operation: operation.to_string(),
            source,
        }
    };

    if source.is_file() {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, "创建目录", e))?;
        }
        fs::copy(source, target).map_err(|e| io_error(source, "复制", e))?;
        return Ok(1);
    }

    let mut files = 0;
    let entries = WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(exclude));
    for entry in entries {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| io_error(entry.path(), "复制", std::io::Error::other("路径不在源目录之下")))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| io_error(&destination, "创建目录", e))?;
        } else {
            fs::copy(entry.path(), &destination).map_err(|e| io_error(entry.path(), "复制", e))?;
            debug!("复制: {} -> {}", entry.path().display(), destination.display());
            files += 1;
        }
    }

    Ok(files)
}
