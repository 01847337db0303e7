//! 数据源: 把文件路径、文本或行迭代器统一转换为逐行读取的流。
//!
//! 这里只负责产生原始行，不做任何格式校验。

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;

use crate::error::SourceError;

/// 逐行读取的流，文件句柄随流一起释放
pub type LineStream<'a> = Box<dyn Iterator<Item = io::Result<String>> + 'a>;

/// cube 数据的来源
pub enum Source<'a> {
    /// 文件路径，扩展名为 `gz` 时按 gzip 解压
    Path(PathBuf),
    /// 完整文本，按行切分
    Text(&'a str),
    /// 已经按行切分的数据
    Lines(Box<dyn Iterator<Item = String> + 'a>),
    /// 任意带缓冲的读取器，例如标准输入
    Reader(Box<dyn BufRead + 'a>),
}

impl<'a> Source<'a> {
    /// 如果字符串指向一个存在的文件则按路径读取，否则当作文本内容
    pub fn detect(value: &'a str) -> Self {
        let path = Path::new(value);
        if !value.contains('\n') && path.is_file() {
            Source::Path(path.to_path_buf())
        } else {
            Source::Text(value)
        }
    }

    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'a,
        S: Into<String> + 'a,
    {
        Source::Lines(Box::new(lines.into_iter().map(Into::into)))
    }

    pub fn reader<R: BufRead + 'a>(reader: R) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// 来源对应的文件路径（仅 `Path` 有）
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Path(path) => Some(path),
            _ => None,
        }
    }

    /// 打开数据源，得到逐行读取的流
    pub fn open(self) -> Result<LineStream<'a>, SourceError> {
        match self {
            Source::Path(path) => open_path(&path),
            Source::Text(text) => Ok(Box::new(
                text.lines().map(|line| Ok::<_, io::Error>(line.to_string())),
            )),
            Source::Lines(lines) => Ok(Box::new(lines.map(Ok::<String, io::Error>))),
            Source::Reader(reader) => Ok(Box::new(reader.lines())),
        }
    }
}

impl From<PathBuf> for Source<'_> {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source<'_> {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}

/// 字符串先按文件路径尝试，见 [`Source::detect`]
impl<'a> From<&'a str> for Source<'a> {
    fn from(value: &'a str) -> Self {
        Source::detect(value)
    }
}

fn open_path<'a>(path: &Path) -> Result<LineStream<'a>, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotAFile(path.to_path_buf()));
    }

    let file = File::open(path)?;
    let compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    debug!("打开文件 {} (gzip: {})", path.display(), compressed);

    if compressed {
        Ok(Box::new(BufReader::new(GzDecoder::new(file)).lines()))
    } else {
        Ok(Box::new(BufReader::new(file).lines()))
    }
}
