use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;
use crate::orders::IdentityClient;
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// ServerState 是商店服务的核心数据结构。
/// 使用连接池的浅拷贝，所有权成本极低；没有任何全局单例，
/// 仓储函数都显式接收 `&SqlitePool`。
///
/// # 组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | identity | Option<IdentityClient> | 身份服务客户端 (邮箱补全) |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// 身份服务客户端 (可选, 尽力而为)
    pub identity: Option<IdentityClient>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/store.db, 自动迁移)
    /// 3. 身份服务客户端 (仅当配置了 IDENTITY_API_URL)
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work directory: {e}")))?;

        // 1. Initialize DB
        let db_path = config.database_dir().join("store.db");
        let db_service = DbService::new(&db_path.to_string_lossy()).await?;

        // 2. Identity client (optional)
        let identity = config
            .identity_api_url
            .as_deref()
            .map(|url| IdentityClient::new(url, config.request_timeout_ms));

        Ok(Self {
            config: config.clone(),
            pool: db_service.pool,
            identity,
        })
    }

    /// 基于现有连接池构造状态 (测试用)
    pub fn with_pool(config: Config, pool: SqlitePool) -> Self {
        let identity = config
            .identity_api_url
            .as_deref()
            .map(|url| IdentityClient::new(url, config.request_timeout_ms));
        Self {
            config,
            pool,
            identity,
        }
    }
}
