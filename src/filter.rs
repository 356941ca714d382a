// 国家多选过滤：候选列表 / 已选标签 / 搜索框，以及据此派生的可见卡片集合

use std::collections::BTreeSet;

use tracing::debug;

use crate::data::Record;

#[derive(Debug, Default)]
pub struct CountryFilter {
    countries: Vec<String>,
    selected: BTreeSet<String>,
    search: String,
    open: bool,
    highlight: usize,
}

impl CountryFilter {
    pub fn new(records: &[Record]) -> Self {
        let countries: BTreeSet<&str> = records
            .iter()
            .map(|r| r.country.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            countries: countries.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// 全部国家，按字典序
    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// 匹配搜索词（不区分大小写的子串）且尚未选中的国家
    pub fn options(&self) -> Vec<&str> {
        let needle = self.search.to_lowercase();
        self.countries
            .iter()
            .filter(|c| !self.selected.contains(*c))
            .filter(|c| c.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    /// 选中后清空搜索词；未知国家忽略
    pub fn select(&mut self, country: &str) -> bool {
        if !self.countries.iter().any(|c| c == country) {
            return false;
        }
        let added = self.selected.insert(country.to_string());
        self.search.clear();
        self.highlight = 0;
        if added {
            debug!(country, "选中国家");
        }
        added
    }

    pub fn deselect(&mut self, country: &str) -> bool {
        let removed = self.selected.remove(country);
        if removed {
            debug!(country, "取消选中国家");
        }
        removed
    }

    /// 搜索词为空时按退格：移除最后一个标签
    pub fn deselect_last(&mut self) -> bool {
        match self.selected.pop_last() {
            Some(country) => {
                debug!(country = %country, "取消选中国家");
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&mut self) -> bool {
        if self.selected.is_empty() {
            return false;
        }
        self.selected.clear();
        debug!("清空已选国家");
        true
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// 输入字符；下拉框关闭时顺带打开
    pub fn push_char(&mut self, ch: char) {
        self.search.push(ch);
        self.highlight = 0;
        self.open = true;
    }

    pub fn pop_char(&mut self) {
        self.search.pop();
        self.highlight = 0;
    }

    pub fn highlight_index(&self) -> usize {
        self.highlight.min(self.options().len().saturating_sub(1))
    }

    pub fn move_highlight(&mut self, delta: isize) {
        let n = self.options().len();
        if n == 0 {
            self.highlight = 0;
            return;
        }
        let cur = self.highlight_index() as isize;
        self.highlight = (cur + delta).clamp(0, n as isize - 1) as usize;
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.options().get(self.highlight_index()).copied()
    }

    pub fn select_highlighted(&mut self) -> bool {
        match self.highlighted().map(str::to_string) {
            Some(country) => self.select(&country),
            None => false,
        }
    }
}

/// 选择为空时返回全部下标，否则只保留国家在选择中的记录（保持原顺序）
pub fn filtered_indices(records: &[Record], selection: &BTreeSet<String>) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| selection.is_empty() || selection.contains(&r.country))
        .map(|(i, _)| i)
        .collect()
}
