/// 実行環境とログ設定
pub mod environment;

/// フォーム・撮影・送信の設定
pub mod field_log;

// 便利な再エクスポート
pub use environment::{
    get_environment, initialize_logging_system, load_environment_variables, Environment,
    EnvironmentConfig,
};
pub use field_log::{ConfigError, FieldLogConfig};
