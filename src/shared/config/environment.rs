use crate::shared::errors::{AppError, AppResult};
use std::path::PathBuf;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
        }
    }

    /// プロダクション環境かどうかを判定
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 開発環境かどうかを判定
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// 現在の実行環境を判定する
///
/// # 戻り値
/// 現在の実行環境（Development または Production）
///
/// # 判定ロジック
/// 1. 実行時環境変数 ENVIRONMENT を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    // フォールバック: ビルド設定に基づく判定
    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # 引数
/// * `env` - 実行環境
///
/// # 戻り値
/// データベースファイル名
pub fn get_database_filename(env: &Environment) -> &'static str {
    match env {
        Environment::Development => "dev_spend_entries.db",
        Environment::Production => "spend_entries.db",
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// # 処理内容
/// 1. ENVIRONMENT変数に応じた.envファイルを決定
/// 2. 環境固有のファイルがない場合はデフォルトの.envを試行
pub fn load_environment_variables() {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    log::info!("環境: {environment}, 読み込み対象: {env_file}");

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// # 処理内容
/// 1. 環境設定を取得
/// 2. ログレベルを設定
/// 3. env_loggerを初期化
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .init();

    log::info!(
        "ログシステムを初期化しました: level={}, environment={}",
        env_config.log_level,
        env_config.environment
    );
}

/// Google Drive APIのデフォルトベースURL
const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive アップロードAPIのデフォルトベースURL
const DEFAULT_DRIVE_UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
/// リモートバックアップの固定ファイル名
const DEFAULT_BACKUP_FILENAME: &str = "spend-analyzer-backup.json";
/// リモート操作のデフォルトタイムアウト（秒）
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;

/// アプリケーション設定を管理する構造体
///
/// データ配置・リモートAPIエンドポイント・同期タイムアウトをまとめて保持する。
/// リモートのベースURLは環境変数で差し替え可能（テスト時にローカルのダミー
/// サーバーを指す用途）。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// アプリケーションデータの配置ディレクトリ
    pub data_dir: PathBuf,
    /// データベースファイル名
    pub database_filename: String,
    /// Drive APIのベースURL
    pub drive_api_base: String,
    /// DriveアップロードAPIのベースURL
    pub drive_upload_api_base: String,
    /// リモートバックアップのファイル名
    pub backup_filename: String,
    /// リモート操作のタイムアウト（秒）
    pub sync_timeout_secs: u64,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// アプリケーション設定、またはデータディレクトリが解決できない場合はエラー
    pub fn from_env() -> AppResult<Self> {
        let data_dir = match std::env::var("SPEND_ANALYZER_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_dir()
                .ok_or_else(|| {
                    AppError::configuration("アプリケーションデータディレクトリが解決できません")
                })?
                .join("spend-analyzer"),
        };

        let environment = get_environment();

        let sync_timeout_secs = std::env::var("SYNC_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS);

        Ok(Self {
            data_dir,
            database_filename: get_database_filename(&environment).to_string(),
            drive_api_base: std::env::var("DRIVE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_DRIVE_API_BASE.to_string()),
            drive_upload_api_base: std::env::var("DRIVE_UPLOAD_API_BASE")
                .unwrap_or_else(|_| DEFAULT_DRIVE_UPLOAD_API_BASE.to_string()),
            backup_filename: std::env::var("BACKUP_FILENAME")
                .unwrap_or_else(|_| DEFAULT_BACKUP_FILENAME.to_string()),
            sync_timeout_secs,
        })
    }

    /// データベースファイルのパスを取得する
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// デバイスソルトファイルのパスを取得する
    pub fn device_salt_path(&self) -> PathBuf {
        self.data_dir.join("device_salt")
    }
}

/// Google OAuth 2.0の設定を管理する構造体
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    /// GoogleクライアントID
    pub client_id: String,
    /// Googleクライアントシークレット
    pub client_secret: String,
    /// OAuth2リダイレクトURI
    pub redirect_uri: String,
}

impl GoogleOAuthConfig {
    /// 環境変数からGoogle OAuth設定を読み込む
    ///
    /// # 戻り値
    /// Google OAuth設定、または設定が不完全な場合はNone
    pub fn from_env() -> Option<Self> {
        log::debug!("GoogleOAuthConfig::from_env() - 環境変数の読み込みを開始");

        let client_id = match std::env::var("GOOGLE_CLIENT_ID") {
            Ok(val) => {
                log::debug!(
                    "GOOGLE_CLIENT_ID が見つかりました: {}****",
                    &val[..8.min(val.len())]
                );
                val
            }
            Err(_) => {
                log::error!("GOOGLE_CLIENT_ID が見つかりません");
                return None;
            }
        };

        let client_secret = match std::env::var("GOOGLE_CLIENT_SECRET") {
            Ok(val) => val,
            Err(_) => {
                log::error!("GOOGLE_CLIENT_SECRET が見つかりません");
                return None;
            }
        };

        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://127.0.0.1:8765/callback".to_string());

        log::debug!("GoogleOAuthConfig::from_env() - 設定の読み込みが完了しました");

        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}
