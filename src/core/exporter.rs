use crate::domain::model::{ExportTable, HarvestReport, OutputFormat, Record};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeSet;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

impl ExportTable {
    /// 欄位為所有記錄鍵值的聯集，排序後固定下來
    pub fn from_records(rows: Vec<Record>) -> Self {
        let columns: BTreeSet<&String> = rows.iter().flat_map(|r| r.data.keys()).collect();
        let columns = columns.into_iter().cloned().collect();
        Self { columns, rows }
    }

    /// 依欄位順序展開一列，缺少的欄位留空
    pub fn row_cells(&self, row: &Record) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| render_cell(row.data.get(column)))
            .collect()
    }
}

pub fn render_cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TabularExporter {
    format: OutputFormat,
}

impl TabularExporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render(&self, table: &ExportTable, report: &HarvestReport) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Csv => write_delimited(table, b','),
            OutputFormat::Tsv => write_delimited(table, b'\t'),
            OutputFormat::Zip => write_bundle(table, report),
        }
    }

    /// 轉成檔案內容並寫入 storage；任何失敗都是致命錯誤
    pub async fn export<S: Storage>(
        &self,
        storage: &S,
        filename: &str,
        table: &ExportTable,
        report: &HarvestReport,
    ) -> Result<usize> {
        let export_error = |e: EtlError| EtlError::ExportError {
            path: filename.to_string(),
            message: e.to_string(),
        };

        let data = self.render(table, report).map_err(export_error)?;
        tracing::debug!(
            "💾 Writing {} ({} bytes, {} columns, {} rows)",
            filename,
            data.len(),
            table.columns.len(),
            table.rows.len()
        );
        storage
            .write_file(filename, &data)
            .await
            .map_err(export_error)?;

        Ok(data.len())
    }
}

fn write_delimited(table: &ExportTable, delimiter: u8) -> Result<Vec<u8>> {
    // 沒有任何欄位時輸出空檔
    if table.columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(table.row_cells(row))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

fn write_bundle(table: &ExportTable, report: &HarvestReport) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    zip.start_file("output.csv", options)?;
    zip.write_all(&write_delimited(table, b',')?)?;

    zip.start_file("output.tsv", options)?;
    zip.write_all(&write_delimited(table, b'\t')?)?;

    zip.start_file("records.json", options)?;
    let records: Vec<_> = table.rows.iter().map(|r| &r.data).collect();
    zip.write_all(serde_json::to_string_pretty(&records)?.as_bytes())?;

    zip.start_file("report.json", options)?;
    zip.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
