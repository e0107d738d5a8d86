use std::time::Duration;

use crate::assets::{AssetOutcome, AssetReport};
use crate::pipeline::RunReport;

/// 打印运行统计
pub fn print_run_summary(report: &RunReport, assets: Option<&AssetReport>, total_duration: Duration) {
    println!("\n📊 翻译统计报告:");
    println!("═══════════════════════════════════════");

    // 文档统计
    println!("📄 文档统计:");
    println!("   发现文档: {} 个", report.documents_found);
    println!("   本次翻译: {} 个", report.translated.len());
    println!("   已跳过: {} 个", report.skipped);
    println!("   失败: {} 个", report.failures.len());

    if !report.failures.is_empty() {
        println!("\n❌ 失败文档:");
        for failure in &report.failures {
            println!("   [{}] {}: {}", failure.state, failure.path, failure.error);
        }
    }

    // 静态资源统计
    if let Some(assets) = assets {
        println!("\n📁 静态资源:");
        for outcome in &assets.outcomes {
            match outcome {
                AssetOutcome::Copied { folder, files } => {
                    println!("   ✔ {}: {} 个文件", folder, files)
                }
                AssetOutcome::Missing { folder } => println!("   ⚠ {}: 不存在", folder),
                AssetOutcome::Failed { folder, error } => println!("   ✖ {}: {}", folder, error),
            }
        }
    }

    // 时间
    println!("\n⏱️  时间:");
    println!("   文档流水线: {}", format_duration(report.elapsed));
    println!("   总耗时: {}", format_duration(total_duration));
    if !report.translated.is_empty() {
        println!(
            "   平均每个文档: {}",
            format_duration(report.elapsed / report.translated.len() as u32)
        );
    }
}

/// 格式化持续时间
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else if duration.as_secs() < 120 {
        format!("{:.3}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(185)), "3m05s");
    }
}
