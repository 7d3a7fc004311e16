use std::collections::HashMap;

/// 只读的环境变量来源
pub trait EnvSource: Send + Sync {
    fn vars(&self) -> Vec<(String, String)>;
}

// 进程环境变量
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn vars(&self) -> Vec<(String, String)> {
        // 跳过非 UTF-8 的条目
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }
}

impl EnvSource for HashMap<String, String> {
    fn vars(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// 按前缀扫描环境变量，返回按 key 排序后的取值
///
/// 取值会去除首尾空白，空白取值的条目不产生实例。
pub fn scan_prefix(source: &dyn EnvSource, prefix: &str) -> Vec<String> {
    let mut matches: Vec<(String, String)> = source
        .vars()
        .into_iter()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0));

    matches
        .into_iter()
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_scan_prefix_sorted_by_key() {
        let source = env(&[
            ("API_2", "host2"),
            ("API_1", "host1"),
            ("OTHER_1", "other"),
        ]);
        assert_eq!(scan_prefix(&source, "API_"), vec!["host1", "host2"]);
    }

    #[test]
    fn test_scan_prefix_no_match() {
        let source = env(&[("OTHER_1", "other")]);
        assert!(scan_prefix(&source, "API_").is_empty());
    }

    #[test]
    fn test_scan_prefix_skips_blank_values() {
        let source = env(&[("API_1", "  "), ("API_2", " host2 ")]);
        assert_eq!(scan_prefix(&source, "API_"), vec!["host2"]);
    }
}
