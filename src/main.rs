use anyhow::{Context, Result};
use privchat_manager::{
    cli::{Cli, Commands},
    config::{self, ServerConfig},
    logging, ManagerServer,
};
use std::fs;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    if let Some(command) = &cli.command {
        match command {
            Commands::Migrate => {
                return run_migrate(&cli).await;
            }
            Commands::GenerateConfig { path } => {
                return generate_config(path);
            }
            Commands::ValidateConfig { path } => {
                return validate_config(path);
            }
            Commands::ShowConfig => {
                return show_config(&cli);
            }
        }
    }

    // 快速读取 config.toml 的 [logging] 段（不加载完整配置）
    let early_log = config::load_early_logging_config(cli.config_file.as_deref());

    // 合并日志配置（优先级：CLI > config.toml > 默认值）
    let log_level = cli
        .get_log_level()
        .or(early_log.level)
        .unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format().or(early_log.format);
    let log_file = cli.log_file.clone().or(early_log.file);

    let _log_guard =
        logging::init_logging(&log_level, log_format.as_deref(), log_file.as_deref(), cli.quiet)?;

    tracing::info!("🚀 PrivChat Manager starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let config = ServerConfig::load(&cli).context("加载配置失败")?;

    if cli.dev {
        tracing::info!("🔧 开发模式已启用");
    }

    // 显示配置信息
    tracing::info!("📊 Server Configuration:");
    tracing::info!("  - RPC: {}", config.bind_address());
    tracing::info!("  - Advertised: {}", config.advertised_rpc_addr());
    tracing::info!(
        "  - Counter Store: {}",
        privchat_manager::infra::mask_database_url(&config.counter_store.url)
    );
    tracing::info!(
        "  - Inbox Store: {}",
        privchat_manager::infra::mask_database_url(&config.inbox_store.url)
    );
    tracing::info!(
        "  - Column Store: {} (tree={})",
        config.column_store.path,
        config.column_store.tree
    );
    tracing::info!("  - Exception TTL: {}s", config.cache.exception_ttl_secs);
    tracing::info!("  - Sync Concurrency: {}", config.sync.concurrency);
    tracing::info!(
        "  - Service Discovery: {}",
        if config.service_discovery.enabled {
            config.service_discovery.etcd_addr.as_str()
        } else {
            "disabled"
        }
    );
    tracing::info!("  - Log Level: {}", config.log_level);
    tracing::info!(
        "  - Log Format: {:?}",
        log_format.as_deref().unwrap_or("compact")
    );
    if let Some(f) = &log_file {
        tracing::info!("  - Log File: {}", f);
    }

    // 创建服务器（监听、存储、服务注册任一失败都直接退出）
    let server = match ManagerServer::new(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("❌ 服务器初始化失败: {}", e);
            tracing::error!("💡 请检查配置、数据库/Redis/etcd 连接及列存储目录后重试");
            process::exit(1);
        }
    };

    // 运行服务器
    if let Err(e) = server.run().await {
        tracing::error!("❌ 服务器运行失败: {}", e);
        process::exit(1);
    }

    Ok(())
}

/// 生成默认配置文件
fn generate_config(path: &str) -> Result<()> {
    fs::write(path, config::DEFAULT_CONFIG_TOML)
        .with_context(|| format!("无法写入配置文件: {}", path))?;

    println!("✅ 配置文件已生成: {}", path);
    Ok(())
}

/// 验证配置文件
fn validate_config(path: &str) -> Result<()> {
    let config = ServerConfig::from_toml_file(path)
        .with_context(|| format!("配置文件验证失败: {}", path))?;
    config
        .validate()
        .with_context(|| format!("配置文件验证失败: {}", path))?;

    println!("✅ 配置文件有效: {}", path);
    println!("📊 配置摘要:");
    println!("  - RPC: {}", config.bind_address());
    println!("  - Column Store: {}", config.column_store.path);
    println!("  - Sync Concurrency: {}", config.sync.concurrency);
    println!(
        "  - Service Discovery: {}",
        if config.service_discovery.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

// build.rs 生成的 MANAGER_MIGRATIONS
include!(concat!(env!("OUT_DIR"), "/manager_migrations.rs"));

/// 执行数据库迁移（计数器表与离线收件箱表）
async fn run_migrate(cli: &Cli) -> Result<()> {
    // 获取数据库 URL（CLI > 环境变量 > 配置文件）
    let config = ServerConfig::load(cli).context("加载配置失败")?;
    let mut urls = vec![config.counter_store.url.clone()];
    if config.inbox_store.url != config.counter_store.url {
        urls.push(config.inbox_store.url.clone());
    }

    for database_url in urls {
        println!(
            "🔌 连接数据库: {}",
            privchat_manager::infra::mask_database_url(&database_url)
        );
        let pool = sqlx::PgPool::connect(&database_url)
            .await
            .context("数据库连接失败，请检查 DATABASE_URL")?;

        // 创建迁移记录表（如果不存在）
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS manager_migrations (
                id SERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&pool)
        .await
        .context("创建迁移记录表失败")?;

        // 查询已执行的迁移
        let applied: Vec<String> =
            sqlx::query_scalar("SELECT name FROM manager_migrations ORDER BY id")
                .fetch_all(&pool)
                .await
                .context("查询迁移记录失败")?;

        let mut count = 0;
        for (version, name, sql) in MANAGER_MIGRATIONS {
            if applied.iter().any(|a| a == name) {
                println!("  ⏭ {} (已执行，跳过)", name);
                continue;
            }

            println!("  ▶ 执行 #{} {}...", version, name);
            sqlx::raw_sql(sql)
                .execute(&pool)
                .await
                .with_context(|| format!("执行迁移失败: {}", name))?;

            // 记录迁移
            sqlx::query("INSERT INTO manager_migrations (name) VALUES ($1)")
                .bind(*name)
                .execute(&pool)
                .await
                .with_context(|| format!("记录迁移状态失败: {}", name))?;

            println!("  ✅ {} 完成", name);
            count += 1;
        }

        if count == 0 {
            println!("✅ 数据库已是最新，无需迁移");
        } else {
            println!("✅ 成功执行 {} 个迁移", count);
        }

        pool.close().await;
    }
    Ok(())
}

/// 显示最终配置（合并后的配置）
fn show_config(cli: &Cli) -> Result<()> {
    // 初始化基本日志（用于显示配置）
    let _guard = logging::init_logging("info", None, None, false)?;

    let config = ServerConfig::load(cli).context("加载配置失败")?;

    println!("📊 最终配置（合并后的配置）:");
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}
