//! 出力（CSV・リンクファイル・JSONスナップショット）

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ScraperError;
use crate::record::{ProductRecord, CSV_HEADER};

/// 商品レコードの書き出し先
pub trait RecordSink: Send + Sync {
    /// 書き出したら true。空の入力は書かずに false
    fn write_records(&self, records: &[ProductRecord]) -> Result<bool, ScraperError>;

    /// ログ用の出力先表示
    fn destination(&self) -> String;
}

/// CSVファイルへの書き出し
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn write_records(&self, records: &[ProductRecord]) -> Result<bool, ScraperError> {
        if records.is_empty() {
            warn!("No products to save");
            return Ok(false);
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(CSV_HEADER)?;
        for record in records {
            writer.write_record(record.to_csv_record())?;
        }
        writer.flush()?;

        info!(
            "Successfully saved {} products to {:?}",
            records.len(),
            self.path
        );
        Ok(true)
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// 1行1URLで保存
pub fn save_links(path: impl AsRef<Path>, links: &[String]) -> Result<(), ScraperError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    for link in links {
        writeln!(writer, "{}", link)?;
    }
    writer.flush()?;
    info!("Links saved to {:?} ({} links)", path, links.len());
    Ok(())
}

/// 1行1URLのファイルを読む（空行は無視）
pub fn load_links(path: impl AsRef<Path>) -> Result<Vec<String>, ScraperError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut links = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            links.push(line.to_string());
        }
    }
    Ok(links)
}

/// リンク収集結果のスナップショット
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_links: usize,
    pub links: Vec<String>,
}

pub fn save_links_snapshot(
    path: impl AsRef<Path>,
    links: &[String],
) -> Result<LinkSnapshot, ScraperError> {
    let path = path.as_ref();
    let snapshot = LinkSnapshot {
        timestamp: Utc::now(),
        total_links: links.len(),
        links: links.to_vec(),
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &snapshot)?;
    info!("Final results saved to {:?}", path);
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> ProductRecord {
        ProductRecord {
            title: title.to_string(),
            price: "Rs. 4,500.00".to_string(),
            description: "Soft, with \"berry\" notes, and oak".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("wine_products.csv"));

        assert!(sink.write_records(&[record("Merlot"), record("Malbec")]).unwrap());

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Title,Price,Description,Origin,Weight,Size,Category")
        );
        assert_eq!(
            lines.next(),
            Some("Merlot,\"Rs. 4,500.00\",\"Soft, with \"\"berry\"\" notes, and oak\",-,-,Unspecified,Uncategorized")
        );
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_empty_records_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("empty.csv"));

        assert!(!sink.write_records(&[]).unwrap());
        assert!(!sink.path().exists());
    }

    #[test]
    fn test_links_file_roundtrip_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wine_links.txt");
        let links = vec![
            "https://wineworld.lk/product/a/".to_string(),
            "https://wineworld.lk/product/b/".to_string(),
        ];

        save_links(&path, &links).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"\n   \n")
            .unwrap();

        assert_eq!(load_links(&path).unwrap(), links);
    }

    #[test]
    fn test_missing_links_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_links(dir.path().join("missing.txt")),
            Err(ScraperError::FileIO(_))
        ));
    }

    #[test]
    fn test_snapshot_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wine_links_final.json");
        let links = vec!["https://wineworld.lk/product/a/".to_string()];

        save_links_snapshot(&path, &links).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total_links"], 1);
        assert_eq!(json["links"][0], "https://wineworld.lk/product/a/");
        assert!(json["timestamp"].is_string());
    }
}
