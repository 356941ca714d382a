// 数据载入：读取 TSV（本地文件或 URL），解析为卡片记录，载入时只洗牌一次

use std::{
    fmt, fs, io,
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    thread,
};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 每行固定六列：国家、原文、发音、语言/口音、字面意思、实际意思
pub const FIELD_COUNT: usize = 6;

/// 记录在源文件中的行号（从 1 开始），解析时分配，用作稳定身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub country: String,
    pub phrase: String,
    pub pronunciation: String,
    pub language: String,
    pub literal_meaning: String,
    pub actual_meaning: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("读取数据文件失败: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("请求数据失败: {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("数据请求返回 {status}: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

pub type LoadOutcome = Result<Vec<Record>, LoadError>;

pub fn fetch_text(source: &DataSource) -> Result<String, LoadError> {
    match source {
        DataSource::File(path) => fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        }),
        DataSource::Url(url) => {
            let http = |source: reqwest::Error| LoadError::Http {
                url: url.clone(),
                source,
            };
            // 只请求一次：不重试，也不设超时
            let client = reqwest::blocking::Client::builder()
                .timeout(None::<std::time::Duration>)
                .build()
                .map_err(http)?;
            let resp = client.get(url).send().map_err(http)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(LoadError::Status {
                    url: url.clone(),
                    status,
                });
            }
            resp.text().map_err(http)
        }
    }
}

/// 第一行是表头；其余非空行按 Tab 切分并去掉首尾空白。
/// 列数不足时以空串补齐，多余的列丢弃，两种情况都会记一条 warn。
pub fn parse_records(text: &str) -> Vec<Record> {
    let mut out = Vec::new();
    for (idx, raw) in text.split('\n').enumerate().skip(1) {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let mut fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
        if fields.len() < FIELD_COUNT {
            warn!(line = line_no, found = fields.len(), "字段不足，以空串补齐");
            fields.resize(FIELD_COUNT, String::new());
        } else if fields.len() > FIELD_COUNT {
            warn!(line = line_no, found = fields.len(), "字段过多，忽略多余列");
            fields.truncate(FIELD_COUNT);
        }
        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();
        out.push(Record {
            id: RecordId(line_no),
            country: next(),
            phrase: next(),
            pronunciation: next(),
            language: next(),
            literal_meaning: next(),
            actual_meaning: next(),
        });
    }
    debug!(count = out.len(), "解析完成");
    out
}

/// Fisher–Yates：i 从末尾到 1，与 [0, i] 中均匀选出的 j 交换
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

pub fn load_records<R: Rng + ?Sized>(source: &DataSource, rng: &mut R) -> LoadOutcome {
    let text = fetch_text(source)?;
    let mut records = parse_records(&text);
    shuffle(&mut records, rng);
    info!(source = %source, count = records.len(), "数据载入完成");
    Ok(records)
}

/// 后台线程载入一次，结果经 channel 交给界面线程
pub fn spawn_loader<R>(source: DataSource, mut rng: R) -> Receiver<LoadOutcome>
where
    R: Rng + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let outcome = load_records(&source, &mut rng);
        // 接收端已退出时结果无人关心
        let _ = tx.send(outcome);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};
    use std::io::Write;

    const SAMPLE: &str = "country\tphrase\tpronunciation\taccent\tliteral\tactual\n\
AU\tbugger\t/ˈbʌɡə/\tEnglish\tliteral-x\tactual-x\n\
FR\tzut\t/zyt/\tFrench\tliteral-y\tactual-y\n";

    #[test]
    fn header_is_skipped_and_fields_are_mapped_in_order() {
        let records = parse_records(SAMPLE);
        assert_eq!(records.len(), 2);
        let fr = &records[1];
        assert_eq!(fr.id, RecordId(3));
        assert_eq!(fr.country, "FR");
        assert_eq!(fr.phrase, "zut");
        assert_eq!(fr.pronunciation, "/zyt/");
        assert_eq!(fr.language, "French");
        assert_eq!(fr.literal_meaning, "literal-y");
        assert_eq!(fr.actual_meaning, "actual-y");
    }

    #[test]
    fn fields_are_trimmed_and_crlf_tolerated() {
        let text = "h\r\n  DE \t Mist\t/mɪst/\tGerman\tmanure\t damn \r\n\r\n";
        let records = parse_records(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country, "DE");
        assert_eq!(records[0].phrase, "Mist");
        assert_eq!(records[0].actual_meaning, "damn");
    }

    #[test]
    fn blank_lines_are_skipped_but_keep_line_numbers() {
        let text = "h\n\nIT\tmannaggia\t-\tItalian\t-\tdarn\n   \n";
        let records = parse_records(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, RecordId(3));
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_truncated() {
        let text = "h\nES\tcaramba\nPT\ta\tb\tc\td\te\textra\n";
        let records = parse_records(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].phrase, "caramba");
        assert_eq!(records[0].pronunciation, "");
        assert_eq!(records[0].actual_meaning, "");
        assert_eq!(records[1].actual_meaning, "e");
    }

    #[test]
    fn header_only_yields_nothing() {
        assert!(parse_records("country\tphrase").is_empty());
        assert!(parse_records("").is_empty());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = SmallRng::seed_from_u64(7);
        for n in [0usize, 1, 2, 5, 64] {
            let original: Vec<usize> = (0..n).collect();
            let mut shuffled = original.clone();
            shuffle(&mut shuffled, &mut rng);
            let mut sorted = shuffled.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, original, "n = {n}");
        }
    }

    #[test]
    fn shuffle_is_reproducible_with_a_seed() {
        let mut a: Vec<u32> = (0..32).collect();
        let mut b = a.clone();
        shuffle(&mut a, &mut SmallRng::seed_from_u64(42));
        shuffle(&mut b, &mut SmallRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_reaches_every_position() {
        // 三个元素共 6 种排列，足够多次后都应出现
        let mut rng = SmallRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let mut v = [0u8, 1, 2];
            shuffle(&mut v, &mut rng);
            seen.insert(v);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn source_kind_is_detected_from_prefix() {
        assert_eq!(
            DataSource::parse("https://example.org/data.tsv"),
            DataSource::Url("https://example.org/data.tsv".into())
        );
        assert_eq!(
            DataSource::parse("public/data.tsv"),
            DataSource::File(PathBuf::from("public/data.tsv"))
        );
    }

    #[test]
    fn load_from_file_parses_and_keeps_every_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let source = DataSource::File(file.path().to_path_buf());
        let mut records = load_records(&source, &mut SmallRng::seed_from_u64(3)).unwrap();
        records.sort_by_key(|r| r.id);
        let countries: Vec<&str> = records.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, ["AU", "FR"]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DataSource::File(dir.path().join("absent.tsv"));
        let err = load_records(&source, &mut SmallRng::seed_from_u64(0)).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn spawned_loader_reports_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        fs::write(&path, SAMPLE).unwrap();
        let rx = spawn_loader(DataSource::File(path), SmallRng::seed_from_u64(9));
        let records = rx.recv().unwrap().unwrap();
        assert_eq!(records.len(), 2);
        assert!(rx.recv().is_err());
    }
}
