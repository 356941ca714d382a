// 基于 ratatui + crossterm 的多语种粗口卡片浏览 TUI
// 功能：
// - 启动时载入一次 TSV（本地文件或 http(s) URL），洗牌后铺成二维卡片网格
// - 国家多选筛选（搜索 / 标签移除 / 一键清空）
// - 点击卡片翻面；拖拽空白处平移，方向提示可点击翻页

mod app;
mod card;
mod config;
mod data;
mod filter;
mod logging;
mod scroll;
mod ui;

use std::{io, path::PathBuf, time::Instant};

use anyhow::Result;
use clap::{ArgAction, Parser};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::{rngs::SmallRng, SeedableRng};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, warn};

use crate::{
    app::App,
    config::{theme_of, Config, ThemeKind},
    data::DataSource,
};

const DATA_ENV: &str = "COLOURFUL_DATA";
const DATA_CANDIDATES: [&str; 3] = ["data.tsv", "public/data.tsv", "data/data.tsv"];

#[derive(Debug, Clone, Parser)]
#[command(name = "colourful-language", about = "多语种粗口卡片浏览器", version)]
struct Cli {
    /// 数据来源：TSV 文件路径或 http(s) URL，默认读取环境变量 COLOURFUL_DATA 或向上探测 data.tsv
    source: Option<String>,

    /// 同 SOURCE
    #[arg(long, short = 'f', conflicts_with = "source")]
    file: Option<String>,

    /// 洗牌种子（固定后顺序可复现）
    #[arg(long)]
    seed: Option<u64>,

    /// 主题（外观）：dark | light
    #[arg(long, value_enum, default_value_t = ThemeKind::Dark)]
    theme: ThemeKind,

    /// 配置文件路径，默认向上探测 colourful.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// 日志文件路径，默认写到系统临时目录
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// 日志详细程度（-v debug，-vv trace）
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_source(cli: &Cli) -> DataSource {
    if let Some(s) = cli.source.as_ref().or(cli.file.as_ref()) {
        return DataSource::parse(s);
    }
    if let Ok(envp) = std::env::var(DATA_ENV) {
        return DataSource::parse(&envp);
    }

    // 自动探测：从当前目录向上查找常见路径
    if let Ok(cwd) = std::env::current_dir() {
        for anc in cwd.ancestors() {
            for rel in DATA_CANDIDATES {
                let c = anc.join(rel);
                if c.exists() {
                    return DataSource::File(c);
                }
            }
        }
    }
    // 最后返回默认路径（可能不存在，载入失败会写日志）
    DataSource::File(PathBuf::from(DATA_CANDIDATES[0]))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::init_logging(cli.verbose, &log_path)?;

    let source = default_source(&cli);
    let config = config::load_config(cli.config.as_deref()).unwrap_or_else(|err| {
        warn!("{err:#}，改用默认配置");
        Config::default()
    });
    let rng = match cli.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    info!(source = %source, seed = ?cli.seed, "启动");
    let loader = data::spawn_loader(source.clone(), rng);
    let mut app = App::new(source.to_string(), config, theme_of(cli.theme), Some(loader));

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // 退出还原
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;
    if let Err(err) = &res {
        error!("{err:#}");
    }
    info!("退出");
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui::draw(f, app))?;
        if event::poll(app.poll_interval())? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(k) => {
                    if app.handle_key(k, now) {
                        break;
                    }
                }
                Event::Mouse(m) => app.handle_mouse(m, now),
                Event::FocusLost => app.handle_focus_lost(),
                // 尺寸变化在下一帧布局时处理
                _ => {}
            }
        }
    }
    Ok(())
}
