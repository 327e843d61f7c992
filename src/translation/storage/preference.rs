//! 偏好存储
//!
//! 只保存一项用户偏好：最近选择的目标语言。
//! 启动时读一次，切换语言时写一次。

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::translation::error::{helpers, TranslationResult};

/// 持久化的键值偏好
pub trait PreferenceStore {
    fn get(&self, key: &str) -> TranslationResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TranslationResult<()>;
}

/// 进程内偏好存储
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RefCell<HashMap<String, String>>,
    writes: RefCell<usize>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// 累计写入次数
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TranslationResult<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}

/// 以 JSON 对象文件保存的偏好
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// 路径支持 `~` 展开，文件在第一次写入时创建
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(shellexpand::tilde(path).as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> TranslationResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| helpers::preference_error(e).with_context(self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| helpers::preference_error(e).with_context(self.path.display()))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> TranslationResult<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| helpers::preference_error(e).with_context(parent.display()))?;
            }
        }

        let content = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, content)
            .map_err(|e| helpers::preference_error(e).with_context(self.path.display()))?;

        tracing::debug!("偏好已写入 {}: {} = {}", self.path.display(), key, value);
        Ok(())
    }
}
