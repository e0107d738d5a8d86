use std::path::{Path, PathBuf};

use crate::error::{Result, TranslationError};

/// 初始化日志系统
pub fn init_logging(verbose: bool, quiet: bool) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// 日志级别：静默模式只保留错误，失败的文档和原因仍会输出
pub fn log_level(verbose: bool, quiet: bool) -> tracing::Level {
    if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    }
}

/// 验证源站点目录
pub fn validate_source_root(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(TranslationError::Configuration {
            field: "source".to_string(),
            reason: format!("源目录不存在: {}", path.display()),
        });
    }

    if !path.is_dir() {
        return Err(TranslationError::Configuration {
            field: "source".to_string(),
            reason: format!("源路径不是目录: {}", path.display()),
        });
    }

    Ok(())
}

/// 生成默认输出目录: `<译文根目录>/<语言>`
pub fn generate_dest_root(output_root: &Path, dest: &Option<PathBuf>, lang: &str) -> PathBuf {
    if let Some(dest) = dest {
        return dest.clone();
    }

    output_root.join(lang)
}

/// 解析为绝对路径，尽量消除符号链接
///
/// 路径尚不存在时，规范化最近的已存在祖先再拼接剩余部分。
pub fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            resolve_path(parent).join(name)
        }
        _ => path.to_path_buf(),
    }
}

/// 静态资源目录名必须是源目录下的普通相对路径
pub fn is_safe_folder_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.trim().is_empty()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(false, false), tracing::Level::INFO);
        assert_eq!(log_level(true, false), tracing::Level::DEBUG);
        // 静默模式仍输出错误
        assert_eq!(log_level(false, true), tracing::Level::ERROR);
        assert_eq!(log_level(true, true), tracing::Level::ERROR);
    }

    #[test]
    fn test_generate_dest_root() {
        assert_eq!(
            generate_dest_root(Path::new("translated-sites"), &None, "ms"),
            PathBuf::from("translated-sites").join("ms")
        );
        assert_eq!(
            generate_dest_root(Path::new("translated-sites"), &Some(PathBuf::from("out")), "ms"),
            PathBuf::from("out")
        );
    }

    #[test]
    fn test_validate_source_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_source_root(dir.path()).is_ok());
        assert!(validate_source_root(&dir.path().join("missing")).is_err());

        let file = dir.path().join("index.html");
        std::fs::write(&file, "<html></html>").unwrap();
        assert!(matches!(
            validate_source_root(&file),
            Err(TranslationError::Configuration { .. })
        ));
    }

    #[test]
    fn test_resolve_path_for_missing_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path(&dir.path().join("not").join("yet")),
            canonical.join("not").join("yet")
        );
        assert!(resolve_path(Path::new("relative-missing")).is_absolute());
    }

    #[test]
    fn test_safe_folder_names() {
        assert!(is_safe_folder_name("src"));
        assert!(is_safe_folder_name("assets/img"));
        assert!(!is_safe_folder_name("../etc"));
        assert!(!is_safe_folder_name("/abs"));
        assert!(!is_safe_folder_name(""));
        assert!(!is_safe_folder_name("."));
    }
}
