use clap::{Parser, Subcommand};

impl Cli {
    /// 解析命令行参数
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// PrivChat Manager - 离线消息同步与异常消息管理服务
#[derive(Parser, Debug, Default)]
#[command(name = "privchat-manager")]
#[command(version)]
#[command(about = "离线消息同步与异常消息管理服务", long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, value_name = "FILE", help = "指定配置文件路径")]
    pub config_file: Option<String>,

    /// 服务器监听地址
    #[arg(long, value_name = "ADDRESS", help = "服务器监听地址")]
    pub host: Option<String>,

    /// RPC 端口
    #[arg(long, value_name = "PORT", help = "RPC 监听端口")]
    pub port: Option<u16>,

    /// 对外公布的 RPC 地址
    #[arg(long, value_name = "ADDR", help = "注册到服务发现的 RPC 地址")]
    pub rpc_addr: Option<String>,

    /// 日志级别
    #[arg(
        long,
        value_name = "LEVEL",
        help = "日志级别: trace, debug, info, warn, error"
    )]
    pub log_level: Option<String>,

    /// 日志格式
    #[arg(long, value_name = "FORMAT", help = "日志格式: pretty, json, compact")]
    pub log_format: Option<String>,

    /// 日志文件路径
    #[arg(long, value_name = "PATH", help = "日志输出文件路径")]
    pub log_file: Option<String>,

    /// 数据库连接 URL
    #[arg(long, value_name = "URL", help = "计数器/收件箱数据库连接字符串")]
    pub database_url: Option<String>,

    /// Redis 连接 URL
    #[arg(long, value_name = "URL", help = "Redis 连接字符串")]
    pub redis_url: Option<String>,

    /// 列存储目录
    #[arg(long, value_name = "PATH", help = "列存储（sled）数据目录")]
    pub column_store_path: Option<String>,

    /// etcd 地址
    #[arg(long, value_name = "URL", help = "服务发现 etcd 地址")]
    pub etcd_addr: Option<String>,

    /// 不注册到服务发现
    #[arg(long, help = "跳过服务发现注册（本地调试）")]
    pub no_register: bool,

    /// 详细输出（可重复使用：-v, -vv, -vvv）
    #[arg(short, action = clap::ArgAction::Count, help = "详细输出级别")]
    pub verbose: u8,

    /// 静默模式
    #[arg(long, short = 'q', help = "静默模式（只输出错误）")]
    pub quiet: bool,

    /// 开发模式（等同于 --log-level debug --log-format pretty）
    #[arg(long, help = "启用开发模式")]
    pub dev: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 执行数据库迁移
    Migrate,
    /// 生成默认配置文件
    GenerateConfig {
        /// 输出文件路径
        #[arg(value_name = "PATH", default_value = "config.toml")]
        path: String,
    },
    /// 验证配置文件
    ValidateConfig {
        /// 配置文件路径
        #[arg(value_name = "PATH", default_value = "config.toml")]
        path: String,
    },
    /// 显示最终配置（合并后的配置）
    ShowConfig,
}

impl Cli {
    /// 获取日志级别（考虑 verbose 和 quiet）
    pub fn get_log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }

        if self.dev {
            return Some("debug".to_string());
        }

        if let Some(level) = &self.log_level {
            return Some(level.clone());
        }

        match self.verbose {
            0 => None,
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    /// 获取日志格式
    pub fn get_log_format(&self) -> Option<String> {
        if self.dev {
            return Some("pretty".to_string());
        }
        self.log_format.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        let cli = Cli::try_parse_from(["privchat-manager", "-q", "-vv"]).unwrap();
        assert_eq!(cli.get_log_level().as_deref(), Some("error"));
    }

    #[test]
    fn test_verbose_levels() {
        let cli = Cli::try_parse_from(["privchat-manager", "-vv"]).unwrap();
        assert_eq!(cli.get_log_level().as_deref(), Some("debug"));
    }

    #[test]
    fn test_subcommand_default_path() {
        let cli = Cli::try_parse_from(["privchat-manager", "validate-config"]).unwrap();
        match cli.command {
            Some(Commands::ValidateConfig { path }) => assert_eq!(path, "config.toml"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
