//! 配置模块，负责加载JSON配置文件

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 网格配置错误
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "配置错误: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// 网格核心的配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// 记录主键字段, 去重与负向求值都按这个字段识别记录
    pub key_field: String,
    /// 多值字段到其标签键的映射, 例如 FirstName -> fsname
    ///
    /// 多值字段的值是子对象数组, 相等比较匹配任意一个子对象的标签
    pub alias_fields: HashMap<String, String>,
    /// 客户端分页的每页行数
    pub page_size: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        let mut alias_fields = HashMap::new();
        alias_fields.insert("FirstName".to_string(), "fsname".to_string());

        Self {
            key_field: "ID".to_string(),
            alias_fields,
            page_size: 20,
        }
    }
}

impl GridConfig {
    /// 从JSON文件加载网格配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::new(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|e| {
            ConfigError::new(format!("无法读取配置文件 {}: {}", path_ref.display(), e))
        })?;

        // 解析JSON
        let config: GridConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::new(format!("无法解析JSON配置文件 {}: {}", path_ref.display(), e))
        })?;

        Ok(config)
    }

    /// 获取多值字段的标签键, 非多值字段返回 None
    pub fn alias_tag(&self, field: &str) -> Option<&str> {
        self.alias_fields.get(field).map(String::as_str)
    }
}
