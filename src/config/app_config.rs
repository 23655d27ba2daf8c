// ==========================================
// 指标数据处理系统 - 应用配置
// ==========================================
// 职责: 读取 config.json（目录、端口、日志级别），不存在时写入默认配置
// 路径规则: 空 → <程序目录>/<默认名>；绝对路径原样；相对路径基于程序目录
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};

/// 应用配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 数据库文件名
pub const DB_FILE_NAME: &str = "Data.db";

/// 默认端口
pub const DEFAULT_PORT: u16 = 8000;

/// 默认日志级别
pub const DEFAULT_LOG_LEVEL: &str = "critical";

/// 允许的日志级别
const VALID_LOG_LEVELS: &[&str] = &["critical", "error", "warning", "info", "debug", "trace"];

/// 基础目录环境变量（便于调试/测试）
pub const HOME_ENV: &str = "METRIC_HANDEL_HOME";

// ==========================================
// 配置文件结构
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfigFile {
    #[serde(rename = "Paths", default)]
    pub paths: PathsSection,

    #[serde(rename = "Server", default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    #[serde(rename = "Data", default)]
    pub data: String,

    #[serde(rename = "DB", default)]
    pub db: String,

    #[serde(rename = "Models", default)]
    pub models: String,

    #[serde(rename = "Scripts", default)]
    pub scripts: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(rename = "Port", default = "default_port")]
    pub port: i64,

    #[serde(rename = "LogLevel", default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: i64::from(DEFAULT_PORT),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn default_port() -> i64 {
    i64::from(DEFAULT_PORT)
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

// ==========================================
// AppConfig - 解析后的应用配置
// ==========================================
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_file: PathBuf,
    pub base_path: PathBuf,
    pub data_path: PathBuf,
    pub db_path: PathBuf,
    pub models_path: PathBuf,
    pub scripts_path: PathBuf,
    pub port: u16,
    pub log_level: String,
    /// 加载时的回退提示（日志初始化之后由 log_warnings 输出）
    pub warnings: Vec<String>,
}

impl AppConfig {
    /// 从指定配置文件加载（不存在时写入默认配置）
    ///
    /// # 参数
    /// - config_file: 配置文件路径
    /// - base: 相对路径的基准目录
    pub fn load(config_file: &Path, base: &Path) -> Result<Self, Box<dyn Error>> {
        let created = !config_file.exists();
        if created {
            write_default_config(config_file)?;
        }

        let text = std::fs::read_to_string(config_file)?;
        let file: AppConfigFile = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        let mut config = Self::from_file(config_file, base, file);
        if created {
            config
                .warnings
                .insert(0, "配置文件不存在，已生成默认配置".to_string());
        }
        Ok(config)
    }

    /// 从已解析的配置结构构建
    pub fn from_file(config_file: &Path, base: &Path, file: AppConfigFile) -> Self {
        let mut warnings = Vec::new();

        let port = match u16::try_from(file.server.port) {
            Ok(p) if p >= 1 => p,
            _ => {
                warnings.push(format!(
                    "端口号无效 ({})，使用默认端口 {}",
                    file.server.port, DEFAULT_PORT
                ));
                DEFAULT_PORT
            }
        };

        let log_level = file.server.log_level.trim().to_lowercase();
        let log_level = if VALID_LOG_LEVELS.contains(&log_level.as_str()) {
            log_level
        } else {
            warnings.push(format!(
                "日志级别无效 ({})，使用默认级别 {}",
                log_level, DEFAULT_LOG_LEVEL
            ));
            DEFAULT_LOG_LEVEL.to_string()
        };

        Self {
            config_file: config_file.to_path_buf(),
            base_path: base.to_path_buf(),
            data_path: normalize_path(base, &file.paths.data, "Data"),
            db_path: normalize_path(base, &file.paths.db, "DB"),
            models_path: normalize_path(base, &file.paths.models, "Models"),
            scripts_path: normalize_path(base, &file.paths.scripts, "Scripts"),
            port,
            log_level,
            warnings,
        }
    }

    /// 输出加载阶段积累的回退提示
    ///
    /// 加载配置时日志系统尚未初始化，需在 logging::init 之后调用
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(config = %self.config_file.display(), "{}", warning);
        }
    }

    /// 数据库文件完整路径
    pub fn db_file_path(&self) -> PathBuf {
        self.db_path.join(DB_FILE_NAME)
    }

    /// 确保所有必要的目录存在
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            &self.data_path,
            &self.db_path,
            &self.models_path,
            &self.scripts_path,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// 写入默认配置文件
fn write_default_config(config_file: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = config_file.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let text = serde_json::to_string_pretty(&AppConfigFile::default())?;
    std::fs::write(config_file, text)?;
    Ok(())
}

/// 规范化配置中的目录
pub fn normalize_path(base: &Path, raw: &str, default_name: &str) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return base.join(default_name);
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || looks_like_windows_drive(trimmed) {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn looks_like_windows_drive(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// 获取应用基础目录
///
/// 顺序: 环境变量 → 可执行文件所在目录 → 用户数据目录 → 当前目录
pub fn base_path() -> PathBuf {
    if let Ok(path) = std::env::var(HOME_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        return dir;
    }

    dirs::data_dir()
        .map(|d| d.join("metric-handel"))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path_rules() {
        let base = Path::new("/opt/app");
        assert_eq!(normalize_path(base, "", "Data"), PathBuf::from("/opt/app/Data"));
        assert_eq!(normalize_path(base, "  ", "DB"), PathBuf::from("/opt/app/DB"));
        assert_eq!(
            normalize_path(base, "./Models", "Models"),
            PathBuf::from("/opt/app/./Models")
        );
        assert_eq!(normalize_path(base, "/srv/data", "Data"), PathBuf::from("/srv/data"));
        assert_eq!(normalize_path(base, "C:\\Data", "Data"), PathBuf::from("C:\\Data"));
    }

    #[test]
    fn test_load_creates_default_config() {
        let dir = TempDir::new().unwrap();
        let cfg_path = dir.path().join(CONFIG_FILE_NAME);

        let config = AppConfig::load(&cfg_path, dir.path()).unwrap();

        assert!(cfg_path.exists());
        assert_eq!(config.warnings, vec!["配置文件不存在，已生成默认配置"]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_level, "critical");
        assert_eq!(config.db_file_path(), dir.path().join("DB").join("Data.db"));
    }

    #[test]
    fn test_invalid_port_and_level_fall_back() {
        let dir = TempDir::new().unwrap();
        let cfg_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &cfg_path,
            r#"{ "Server": { "Port": 70000, "LogLevel": "loud" }, "Paths": { "Data": "in" } }"#,
        )
        .unwrap();

        let config = AppConfig::load(&cfg_path, dir.path()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.data_path, dir.path().join("in"));
        assert_eq!(config.warnings.len(), 2);
        assert!(config.warnings[0].contains("70000"));
        assert!(config.warnings[1].contains("loud"));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fallback_warnings_logged_after_init() {
        let mut file = AppConfigFile::default();
        file.server.port = 0;
        let config = AppConfig::from_file(Path::new(CONFIG_FILE_NAME), Path::new("/opt/app"), file);

        let captured = CapturedLog::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || config.log_warnings());

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("端口号无效 (0)"));
    }

    #[test]
    fn test_valid_config_has_no_warnings() {
        let config = AppConfig::from_file(
            Path::new(CONFIG_FILE_NAME),
            Path::new("/opt/app"),
            AppConfigFile::default(),
        );
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_ensure_directories() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::from_file(
            &dir.path().join(CONFIG_FILE_NAME),
            dir.path(),
            AppConfigFile::default(),
        );
        config.ensure_directories().unwrap();
        assert!(dir.path().join("Data").is_dir());
        assert!(dir.path().join("Models").is_dir());
        assert!(dir.path().join("Scripts").is_dir());
    }
}
