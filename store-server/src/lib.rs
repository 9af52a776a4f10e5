//! Store Server - 商品目录与订单服务
//!
//! # 架构概述
//!
//! 本模块是商店服务的主入口，提供以下核心功能：
//!
//! - **目录引擎** (`catalog`): 变体组合生成、虚拟 id 编解码、列表投影、单品解析
//! - **订单** (`orders`): 幂等、价格校验、原子持久化的订单创建
//! - **数据库** (`db`): SQLite 连接池与仓储层
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! store-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── api/           # HTTP 路由和处理器
//! ├── catalog/       # 变体引擎 (纯函数)
//! ├── orders/        # 订单完整性构建器
//! ├── db/            # 数据库层
//! └── utils/         # 错误、日志等工具
//! ```

pub mod api;
pub mod catalog;
pub mod core;
pub mod db;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use crate::utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use crate::utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), None);
}

pub fn print_banner() {
    println!(
        r#"
   _____ __
  / ___// /_____  ________
  \__ \/ __/ __ \/ ___/ _ \
 ___/ / /_/ /_/ / /  /  __/
/____/\__/\____/_/   \___/
    "#
    );
}
