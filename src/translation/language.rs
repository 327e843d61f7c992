//! 语言标签
//!
//! 采用 BCP 47 的简化子集：主语言 2-3 个字母，后接若干以 `-` 分隔的子标签。
//! 解析时统一大小写（`zh-cn` → `zh-CN`，`zh-hant-tw` → `zh-Hant-TW`），
//! 因此标签的相等比较就是字符串比较。

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{TranslationError, TranslationResult};

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{1,8})*$").expect("语言标签正则无效")
    })
}

/// 规范化后的语言标签
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// 解析并规范化语言标签，`_` 视同 `-`
    pub fn parse(value: &str) -> TranslationResult<Self> {
        let candidate = value.trim().replace('_', "-");
        if !tag_pattern().is_match(&candidate) {
            return Err(TranslationError::InvalidLanguage(value.to_string()));
        }

        let normalized = candidate
            .split('-')
            .enumerate()
            .map(|(i, part)| match (i, part.len()) {
                (0, _) => part.to_ascii_lowercase(),
                (_, 2) => part.to_ascii_uppercase(),
                (_, 4) if part.chars().all(|c| c.is_ascii_alphabetic()) => {
                    let mut chars = part.chars();
                    let head = chars.next().map(|c| c.to_ascii_uppercase());
                    head.into_iter()
                        .chain(chars.map(|c| c.to_ascii_lowercase()))
                        .collect()
                }
                _ => part.to_ascii_lowercase(),
            })
            .collect::<Vec<_>>()
            .join("-");

        Ok(Self(normalized))
    }

    /// 从 POSIX locale（如 `zh_CN.UTF-8`）提取语言标签
    pub fn from_posix_locale(value: &str) -> Option<Self> {
        let base = value.split(['.', '@']).next().unwrap_or_default().trim();
        if base.is_empty() || base.eq_ignore_ascii_case("C") || base.eq_ignore_ascii_case("POSIX") {
            return None;
        }
        Self::parse(base).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 主语言子标签，如 `zh-CN` 的 `zh`
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LanguageTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for LanguageTag {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = TranslationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}
