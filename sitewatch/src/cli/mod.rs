//! CLIインターフェース
//!
//! すべての操作は環境変数で設定する。フラグは-h/--helpと-V/--versionのみ。

use clap::Parser;

/// Sitewatch - HTTP endpoint uptime monitor
#[derive(Parser, Debug)]
#[command(name = "sitewatch")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    SITEWATCH_DATABASE_URL       Database URL (default: sqlite:~/.sitewatch/monitor.db)
    SITEWATCH_LOG_FILE           Log file path (default: stdout only)
    SITEWATCH_BOT_TOKEN          Telegram bot token (log-only notifications if unset)
    SITEWATCH_CHAT_ID            Telegram chat ID for notifications
    SITEWATCH_REPORT_WEEKDAY     Weekly report weekday (default: mon)
    SITEWATCH_REPORT_HOUR        Weekly report hour, 0-23 (default: 10)
    SITEWATCH_REPORT_MINUTE      Weekly report minute, 0-59 (default: 0)
    RUST_LOG                     Log filter (default: info)
"#)]
pub struct Cli;
