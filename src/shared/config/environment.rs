// 実行環境の判定とログ初期化

/// 実行環境
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// 環境名を解釈する（"production" 以外は開発環境）
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// LOG_LEVEL 未設定時のログレベル
    fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Production => "info",
        }
    }

    /// 読み込む .env ファイル名
    pub fn env_file(&self) -> &'static str {
        match self {
            Environment::Development => ".env",
            Environment::Production => ".env.production",
        }
    }
}

/// ログ出力に関する実行時設定
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    pub environment: Environment,
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        Self::resolve(get_environment(), std::env::var("LOG_LEVEL").ok())
    }

    /// 環境と LOG_LEVEL の値から設定を組み立てる
    ///
    /// # 引数
    /// * `environment` - 実行環境
    /// * `log_level` - LOG_LEVEL の値（未設定はNone）
    pub fn resolve(environment: Environment, log_level: Option<String>) -> Self {
        let log_level = log_level
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| environment.default_log_level().to_string());

        Self {
            environment,
            log_level,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// ログレベルをフィルターに変換する（不明な値は Info）
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .trim()
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}

/// 現在の実行環境を判定する
///
/// コンパイル時埋め込み値 → 実行時の ENVIRONMENT → ビルド種別 の順に参照する。
pub fn get_environment() -> Environment {
    let environment = resolve_environment(
        option_env!("EMBEDDED_ENVIRONMENT"),
        std::env::var("ENVIRONMENT").ok().as_deref(),
        cfg!(debug_assertions),
    );
    log::debug!("実行環境: {}", environment.as_str());
    environment
}

fn resolve_environment(
    embedded: Option<&str>,
    runtime: Option<&str>,
    debug_build: bool,
) -> Environment {
    match embedded.or(runtime) {
        Some(value) => Environment::parse(value),
        None if debug_build => Environment::Development,
        None => Environment::Production,
    }
}

/// 実行環境に対応する .env ファイルを読み込む
///
/// ファイルがなければ警告のみ出し、直接設定された環境変数を使う。
pub fn load_environment_variables() {
    if let Some(embedded) = option_env!("EMBEDDED_ENVIRONMENT") {
        log::info!("コンパイル時埋め込みの環境設定を使用します: {embedded}");
        return;
    }

    let environment = get_environment();
    let env_file = environment.env_file();

    if dotenv::from_filename(env_file).is_ok() {
        log::info!("{env_file}ファイルを読み込みました");
    } else if env_file != ".env" && dotenv::dotenv().is_ok() {
        log::warn!("{env_file}が見つからないため .env を読み込みました");
    } else {
        log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
    }
}

/// ログシステムを初期化する
///
/// 既に初期化済みの場合は何もしない（テストから複数回呼ばれるため）。
pub fn initialize_logging_system(env_config: &EnvironmentConfig) {
    let result = env_logger::Builder::from_default_env()
        .filter_level(env_config.level_filter())
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    match result {
        Ok(()) => log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment.as_str()
        ),
        Err(_) => log::debug!("ログシステムは既に初期化されています"),
    }
}
