//! Site Translation CLI - 可断点续跑的静态网站翻译工具库
//! 
//! 这个库提供了站点遍历、进度日志、翻译服务调用、译文校验和静态资源复制等核心功能。

pub mod api_constants;
pub mod assets;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod stats;
pub mod translator;
pub mod utils;
pub mod validator;
pub mod walker;
