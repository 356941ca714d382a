// 单词卡片：收起（原文 + 国家）/ 展开（六个字段），以及卡片网格的几何布局

use std::collections::HashSet;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
};

use crate::{
    config::{Theme, ViewSettings},
    data::{Record, RecordId},
};

/// 展开状态按记录身份保存，而不是按网格位置
#[derive(Debug, Default)]
pub struct CardStates {
    expanded: HashSet<RecordId>,
}

impl CardStates {
    pub fn is_expanded(&self, id: RecordId) -> bool {
        self.expanded.contains(&id)
    }

    /// 返回切换后的状态
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if !self.expanded.insert(id) {
            self.expanded.remove(&id);
            return false;
        }
        true
    }

    /// 离开可见集合的卡片丢弃其状态
    pub fn retain_visible(&mut self, visible: &HashSet<RecordId>) {
        self.expanded.retain(|id| visible.contains(id));
    }

    pub fn clear(&mut self) {
        self.expanded.clear();
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.len()
    }
}

pub const FIELD_LABELS: [&str; 5] = [
    "Pronunciation",
    "Language",
    "Country",
    "Literal Meaning",
    "Actual Meaning",
];

fn field_values(r: &Record) -> [&str; 5] {
    [
        &r.pronunciation,
        &r.language,
        &r.country,
        &r.literal_meaning,
        &r.actual_meaning,
    ]
}

pub fn card_lines(r: &Record, expanded: bool, th: Theme) -> Vec<Line<'static>> {
    let phrase = Span::styled(
        r.phrase.clone(),
        Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
    );
    if !expanded {
        return vec![
            Line::from(phrase),
            Line::from(""),
            Line::from(Span::styled(r.country.clone(), Style::default().fg(th.muted))),
        ];
    }
    let mut lines = vec![Line::from(phrase)];
    for (label, value) in FIELD_LABELS.iter().zip(field_values(r)) {
        lines.push(Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(th.muted)),
            Span::styled(value.to_string(), Style::default().fg(th.fg)),
        ]));
    }
    lines
}

/// 卡片先画进独立 buffer，再按视口裁剪拷贝，这样半露在外的卡片也能正确显示
pub fn render_card(r: &Record, expanded: bool, th: Theme, width: u16, height: u16) -> Buffer {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    let border = if expanded { th.accent } else { th.muted };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(th.card_bg));
    let mut lines = card_lines(r, expanded, th);
    let alignment = if expanded {
        Alignment::Left
    } else {
        // 收起时内容大致垂直居中
        let pad = height.saturating_sub(2).saturating_sub(lines.len() as u16) / 2;
        let mut padded = vec![Line::from(""); pad as usize];
        padded.append(&mut lines);
        lines = padded;
        Alignment::Center
    };
    Paragraph::new(lines)
        .block(block)
        .alignment(alignment)
        .wrap(Wrap { trim: true })
        .render(area, &mut buf);
    buf
}

/// 卡片网格在虚拟画布上的几何布局（单位：终端格）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub count: usize,
    pub cols: u32,
    pub rows: u32,
    pub card_w: u32,
    pub card_h: u32,
    pub gap_x: u32,
    pub gap_y: u32,
}

impl GridLayout {
    /// 列数取 ceil(sqrt(n))，网格在两个方向上都可滚动
    pub fn for_count(count: usize, view: &ViewSettings) -> Self {
        let cols = (1..).find(|c: &u32| (*c as usize) * (*c as usize) >= count).unwrap_or(1);
        let cols = cols.max(1);
        let rows = (count as u32).div_ceil(cols);
        Self {
            count,
            cols,
            rows,
            card_w: view.card_width as u32,
            card_h: view.card_height as u32,
            gap_x: view.gap_x as u32,
            gap_y: view.gap_y as u32,
        }
    }

    pub fn content_width(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        self.cols * self.card_w + (self.cols - 1) * self.gap_x
    }

    pub fn content_height(&self) -> u32 {
        if self.count == 0 {
            return 0;
        }
        self.rows * self.card_h + self.rows.saturating_sub(1) * self.gap_y
    }

    /// 第 slot 张卡片左上角的画布坐标
    pub fn origin(&self, slot: usize) -> (u32, u32) {
        let col = slot as u32 % self.cols;
        let row = slot as u32 / self.cols;
        (
            col * (self.card_w + self.gap_x),
            row * (self.card_h + self.gap_y),
        )
    }

    /// 画布坐标命中的卡片；落在间隙里返回 None
    pub fn slot_at(&self, x: u32, y: u32) -> Option<usize> {
        let pitch_x = self.card_w + self.gap_x;
        let pitch_y = self.card_h + self.gap_y;
        let (col, row) = (x / pitch_x, y / pitch_y);
        if col >= self.cols || x % pitch_x >= self.card_w || y % pitch_y >= self.card_h {
            return None;
        }
        let slot = (row * self.cols + col) as usize;
        (slot < self.count).then_some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{theme_of, ThemeKind};

    fn france() -> Record {
        Record {
            id: RecordId(3),
            country: "FR".into(),
            phrase: "zut".into(),
            pronunciation: "/zyt/".into(),
            language: "French".into(),
            literal_meaning: "literal-y".into(),
            actual_meaning: "actual-y".into(),
        }
    }

    fn text_of(buf: &Buffer) -> String {
        let area = buf.area;
        let mut out = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn toggle_twice_is_identity() {
        let mut states = CardStates::default();
        let id = RecordId(3);
        assert!(!states.is_expanded(id));
        assert!(states.toggle(id));
        assert!(!states.toggle(id));
        assert!(!states.is_expanded(id));
    }

    #[test]
    fn state_follows_identity_not_position() {
        let mut states = CardStates::default();
        states.toggle(RecordId(3));
        states.toggle(RecordId(9));
        let visible: HashSet<RecordId> = [RecordId(3), RecordId(4)].into_iter().collect();
        states.retain_visible(&visible);
        assert!(states.is_expanded(RecordId(3)));
        assert!(!states.is_expanded(RecordId(9)));
        assert_eq!(states.expanded_count(), 1);
    }

    #[test]
    fn compact_card_shows_phrase_and_country_only() {
        let th = theme_of(ThemeKind::Dark);
        let text = text_of(&render_card(&france(), false, th, 30, 9));
        assert!(text.contains("zut"));
        assert!(text.contains("FR"));
        assert!(!text.contains("Pronunciation"));
    }

    #[test]
    fn expanded_card_shows_all_labeled_fields() {
        let th = theme_of(ThemeKind::Dark);
        let text = text_of(&render_card(&france(), true, th, 40, 9));
        for needle in [
            "zut",
            "Pronunciation: /zyt/",
            "Language: French",
            "Country: FR",
            "Literal Meaning: literal-y",
            "Actual Meaning: actual-y",
        ] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn grid_geometry_and_hit_testing() {
        let view = ViewSettings {
            card_width: 10,
            card_height: 4,
            gap_x: 2,
            gap_y: 1,
            ..ViewSettings::default()
        };
        let grid = GridLayout::for_count(5, &view);
        assert_eq!((grid.cols, grid.rows), (3, 2));
        assert_eq!(grid.content_width(), 34);
        assert_eq!(grid.content_height(), 9);
        assert_eq!(grid.origin(4), (12, 5));
        assert_eq!(grid.slot_at(0, 0), Some(0));
        assert_eq!(grid.slot_at(10, 0), None);
        assert_eq!(grid.slot_at(13, 6), Some(4));
        assert_eq!(grid.slot_at(25, 6), None);
        assert_eq!(grid.slot_at(0, 4), None);
    }

    #[test]
    fn empty_grid_has_no_extent() {
        let grid = GridLayout::for_count(0, &ViewSettings::default());
        assert_eq!(grid.content_width(), 0);
        assert_eq!(grid.content_height(), 0);
        assert_eq!(grid.slot_at(0, 0), None);
    }
}
