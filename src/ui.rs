// 界面绘制：顶栏 / 国家筛选栏 / 卡片网格（视口）/ 底栏，以及下拉框与方向提示

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, LayoutAreas, LoadState},
    card::render_card,
    config::Theme,
    scroll::Direction,
};

const PLACEHOLDER: &str = "Search or select countries...";
const CLEAR_ALL: &str = " Clear all ";
const DROPDOWN_ROWS: u16 = 8;
const CREDIT: &str = " Made with ♥ by Milindi Kodikara ";

pub fn draw(f: &mut Frame, app: &mut App) {
    let v = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let mut layout = LayoutAreas {
        filter_bar: v[1],
        grid: v[2],
        ..LayoutAreas::default()
    };
    draw_header(f, v[0], app);
    draw_filter_bar(f, v[1], app, &mut layout);
    draw_grid(f, v[2], app, &mut layout);
    draw_footer(f, v[3], app);
    // 下拉框浮在网格之上，最后画
    if app.filter.is_open() {
        draw_dropdown(f, v[1], app, &mut layout);
    }
    app.layout = layout;
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let th = app.theme;
    let title = Style::default().fg(th.accent).add_modifier(Modifier::BOLD);
    let noise = Style::default().fg(th.ink).add_modifier(Modifier::BOLD);
    let status = match app.load_state {
        LoadState::Loading => "loading".to_string(),
        LoadState::Failed => "load failed".to_string(),
        LoadState::Ready => format!(
            "{}/{} cards · {} open",
            app.visible.len(),
            app.records.len(),
            app.cards.expanded_count()
        ),
    };
    let mut segs = vec![
        Span::styled(" ColOUrFuL ", title),
        Span::styled("@#$%^#&$^*%", noise),
        Span::styled(" LAnguaGe", title),
        Span::styled("!!1!1 ", noise),
        Span::styled(" | ", Style::default().fg(th.muted)),
        Span::styled(status, Style::default().fg(th.fg)),
        Span::styled(" | src:", Style::default().fg(th.muted)),
        Span::styled(app.source_label.clone(), Style::default().fg(th.fg)),
    ];
    if app.scroll.is_dragging() {
        segs.push(Span::styled(
            " [DRAG] ",
            Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
        ));
    }
    let para = Paragraph::new(Line::from(segs)).style(Style::default().bg(th.bar_bg).fg(th.fg));
    f.render_widget(para, area);
}

fn draw_filter_bar(f: &mut Frame, area: Rect, app: &App, layout: &mut LayoutAreas) {
    let th = app.theme;
    let open = app.filter.is_open();
    let block = Block::default()
        .title(Span::styled(
            format!(" Countries ({}) ", app.filter.countries().len()),
            Style::default().fg(th.accent),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if open { th.accent } else { th.muted }));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let selection = app.filter.selection();
    let clear_w = CLEAR_ALL.width() as u16;
    // 右侧留给 “Clear all” 与下拉箭头
    let reserved = if selection.is_empty() { 2 } else { clear_w + 3 };
    let limit = inner.right().saturating_sub(reserved);

    let tag = Style::default().bg(th.tag_bg).fg(th.fg);
    let mut spans = Vec::new();
    let mut x = inner.x;
    let total = selection.len();
    let mut hidden = 0;
    for (i, country) in selection.iter().enumerate() {
        let label = format!(" {country} ");
        let w = label.width() as u16;
        // 后面还有标签时给 “+N” 留位
        let more_w = if i + 1 < total {
            format!("+{total} ").width() as u16
        } else {
            0
        };
        if x + w + 1 + more_w > limit {
            hidden = total - i;
            break;
        }
        layout
            .tag_removers
            .push((Rect::new(x + w, inner.y, 1, 1), country.clone()));
        spans.push(Span::styled(label, tag));
        spans.push(Span::styled("×", tag.add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
        x += w + 2;
    }
    if hidden > 0 {
        spans.push(Span::styled(
            format!("+{hidden} "),
            Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
        ));
    }
    if app.filter.search().is_empty() && selection.is_empty() && !open {
        spans.push(Span::styled(PLACEHOLDER, Style::default().fg(th.muted)));
    } else {
        spans.push(Span::styled(
            app.filter.search().to_string(),
            Style::default().fg(th.fg),
        ));
        if open {
            spans.push(Span::styled("▏", Style::default().fg(th.accent)));
        }
    }
    let text_area = Rect::new(inner.x, inner.y, limit.saturating_sub(inner.x), 1);
    f.render_widget(Paragraph::new(Line::from(spans)), text_area);

    if !selection.is_empty() {
        let r = Rect::new(limit + 1, inner.y, clear_w.min(inner.right() - limit - 1), 1);
        f.render_widget(
            Paragraph::new(Span::styled(
                CLEAR_ALL,
                Style::default().fg(th.accent).add_modifier(Modifier::UNDERLINED),
            )),
            r,
        );
        layout.clear_all = Some(r);
    }
    let arrow = Rect::new(inner.right().saturating_sub(1), inner.y, 1, 1);
    f.render_widget(
        Paragraph::new(Span::styled(
            if open { "▴" } else { "▾" },
            Style::default().fg(th.muted),
        )),
        arrow,
    );
}

fn draw_dropdown(f: &mut Frame, bar: Rect, app: &App, layout: &mut LayoutAreas) {
    let th = app.theme;
    let screen = f.area();
    let options = app.filter.options();
    let rows = (options.len() as u16).clamp(1, DROPDOWN_ROWS);
    let widest = options.iter().map(|c| c.width()).max().unwrap_or(0).max(18) as u16;
    let area = Rect::new(
        bar.x,
        bar.bottom(),
        (widest + 4).min(screen.right().saturating_sub(bar.x)),
        (rows + 2).min(screen.bottom().saturating_sub(bar.bottom())),
    );
    if area.width < 3 || area.height < 3 {
        return;
    }
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(th.accent))
        .style(Style::default().bg(th.bar_bg));
    let inner = block.inner(area);
    f.render_widget(block, area);
    layout.dropdown = Some(area);

    if options.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("No countries found", Style::default().fg(th.muted))),
            inner,
        );
        return;
    }
    let hl = app.filter.highlight_index();
    // 高亮项始终在可视窗口内
    let first = (hl + 1).saturating_sub(inner.height as usize);
    for (i, country) in options
        .iter()
        .enumerate()
        .skip(first)
        .take(inner.height as usize)
    {
        let r = Rect::new(inner.x, inner.y + (i - first) as u16, inner.width, 1);
        let style = if i == hl {
            Style::default()
                .bg(th.selection_bg)
                .fg(th.fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(th.fg)
        };
        f.render_widget(Paragraph::new(format!(" {country}")).style(style), r);
        layout.options.push((r, country.to_string()));
    }
}

fn draw_grid(f: &mut Frame, area: Rect, app: &mut App, layout: &mut LayoutAreas) {
    let th = app.theme;
    let grid = app.grid();
    app.scroll.set_extents(
        area.width as u32,
        area.height as u32,
        grid.content_width(),
        grid.content_height(),
    );
    if app.visible.is_empty() {
        let msg = match app.load_state {
            LoadState::Loading => "Loading…",
            LoadState::Ready | LoadState::Failed => "No cards",
        };
        let y = area.y + area.height / 2;
        f.render_widget(
            Paragraph::new(Span::styled(msg, Style::default().fg(th.muted)))
                .alignment(Alignment::Center),
            Rect::new(area.x, y, area.width, 1),
        );
        return;
    }

    let (ox, oy) = app.scroll.offset();
    let (vw, vh) = (area.width as u32, area.height as u32);
    for (slot, r) in app.visible_records().enumerate() {
        let (cx, cy) = grid.origin(slot);
        // 完全在视口外的卡片不画
        if cx + grid.card_w <= ox || cx >= ox + vw || cy + grid.card_h <= oy || cy >= oy + vh {
            continue;
        }
        let card = render_card(
            r,
            app.cards.is_expanded(r.id),
            th,
            grid.card_w as u16,
            grid.card_h as u16,
        );
        blit(
            f.buffer_mut(),
            &card,
            area,
            cx as i64 - ox as i64,
            cy as i64 - oy as i64,
        );
    }
    draw_affordances(f, area, app, layout);
}

/// 把卡片 buffer 拷进视口，超出视口的部分裁掉
fn blit(dst: &mut Buffer, src: &Buffer, viewport: Rect, dx: i64, dy: i64) {
    for sy in 0..src.area.height {
        let ty = viewport.y as i64 + dy + sy as i64;
        if ty < viewport.top() as i64 || ty >= viewport.bottom() as i64 {
            continue;
        }
        for sx in 0..src.area.width {
            let tx = viewport.x as i64 + dx + sx as i64;
            if tx < viewport.left() as i64 || tx >= viewport.right() as i64 {
                continue;
            }
            if let Some(cell) = dst.cell_mut((tx as u16, ty as u16)) {
                *cell = src[(sx, sy)].clone();
            }
        }
    }
}

fn draw_affordances(f: &mut Frame, area: Rect, app: &App, layout: &mut LayoutAreas) {
    let th = app.theme;
    let aff = app.scroll.affordances();
    let style = Style::default()
        .bg(th.accent)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);
    let mid_x = area.x + area.width.saturating_sub(3) / 2;
    let mid_y = area.y + area.height / 2;
    let spots = [
        (Direction::Up, " ▲ ", Rect::new(mid_x, area.y, 3, 1)),
        (Direction::Down, " ▼ ", Rect::new(mid_x, area.bottom().saturating_sub(1), 3, 1)),
        (Direction::Left, " ◀ ", Rect::new(area.x, mid_y, 3, 1)),
        (Direction::Right, " ▶ ", Rect::new(area.right().saturating_sub(3), mid_y, 3, 1)),
    ];
    for (dir, label, r) in spots {
        if !aff.shows(dir) {
            continue;
        }
        let r = r.intersection(area);
        if r.is_empty() {
            continue;
        }
        f.render_widget(Paragraph::new(Span::styled(label, style)), r);
        layout.affordances.push((r, dir));
    }
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let th: Theme = app.theme;
    let tips = if app.filter.is_open() {
        " [输入]搜索  [↑/↓]选择  [Enter]选中  [Backspace]删除  [Esc]关闭 "
    } else {
        " [q]退出  [点击]翻牌  [拖拽空白]平移  [/]筛选  [x]清空  [hjkl/方向键]滚动  [c]居中  [r]原点  [z]全部收起 "
    };
    let help = Paragraph::new(Line::from(Span::styled(tips, Style::default().fg(th.muted))))
        .style(Style::default().bg(th.bar_bg));
    f.render_widget(help, area);

    // 右下角署名，放不下时让位给按键提示
    let credit_w = CREDIT.width() as u16;
    if area.width >= tips.width() as u16 + credit_w {
        let r = Rect::new(area.right() - credit_w, area.y, credit_w, 1);
        f.render_widget(
            Paragraph::new(Span::styled(CREDIT, Style::default().fg(th.accent))),
            r,
        );
    }
}
