use rust_xlsxwriter::{Workbook, XlsxError};

use crate::db::models::analytics::ProductSnapshot;

/// Row of the richer per-product sheet in the spreadsheet export.
#[derive(Debug, Clone)]
pub struct ProductAnalyticsRow {
    pub id: i32,
    pub name: String,
    pub common_words: String,
    pub low_rated_count: i64,
    pub pending_count: i64,
}

/// Errors that can occur while rendering an export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV rendering failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    CsvBuffer(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),

    #[error("Workbook rendering failed: {0}")]
    Xlsx(#[from] XlsxError),
}

const SNAPSHOT_HEADER: [&str; 4] = ["id", "name", "average_rating", "review_count"];

/// Delimited-text snapshot: header plus one row per product.
pub fn products_csv(snapshots: &[ProductSnapshot]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(SNAPSHOT_HEADER)?;
    for snapshot in snapshots {
        writer.write_record([
            snapshot.id.to_string(),
            snapshot.name.clone(),
            format!("{:.2}", snapshot.average_rating),
            snapshot.review_count.to_string(),
        ])?;
    }

    Ok(writer.into_inner()?)
}

/// Spreadsheet snapshot: a product sheet mirroring the CSV, plus an
/// analytics sheet with common words and moderation counts per product.
pub fn products_workbook(
    snapshots: &[ProductSnapshot],
    details: &[ProductAnalyticsRow],
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Products")?;
        for (col, title) in SNAPSHOT_HEADER.iter().enumerate() {
            sheet.write_string(0, col as u16, *title)?;
        }
        for (i, snapshot) in snapshots.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_number(row, 0, snapshot.id as f64)?;
            sheet.write_string(row, 1, &snapshot.name)?;
            sheet.write_number(row, 2, snapshot.average_rating)?;
            sheet.write_number(row, 3, snapshot.review_count as f64)?;
        }
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Review Analytics")?;
        for (col, title) in ["id", "name", "common_words", "low_rated_reviews", "pending_reviews"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *title)?;
        }
        for (i, detail) in details.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_number(row, 0, detail.id as f64)?;
            sheet.write_string(row, 1, &detail.name)?;
            sheet.write_string(row, 2, &detail.common_words)?;
            sheet.write_number(row, 3, detail.low_rated_count as f64)?;
            sheet.write_number(row, 4, detail.pending_count as f64)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshots() -> Vec<ProductSnapshot> {
        vec![
            ProductSnapshot {
                id: 1,
                name: "Walnut Desk".to_string(),
                average_rating: 4.5,
                review_count: 2,
            },
            ProductSnapshot {
                id: 2,
                name: "Desk Lamp".to_string(),
                average_rating: 0.0,
                review_count: 0,
            },
        ]
    }

    #[test]
    fn csv_has_header_and_two_decimal_averages() {
        let bytes = products_csv(&snapshots()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,name,average_rating,review_count"));
        assert_eq!(lines.next(), Some("1,Walnut Desk,4.50,2"));
        assert_eq!(lines.next(), Some("2,Desk Lamp,0.00,0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn workbook_renders_to_a_zip_container() {
        let details = vec![ProductAnalyticsRow {
            id: 1,
            name: "Walnut Desk".to_string(),
            common_words: "sturdy (3), finish (2)".to_string(),
            low_rated_count: 1,
            pending_count: 2,
        }];
        let bytes = products_workbook(&snapshots(), &details).unwrap();
        // XLSX is a zip archive
        assert_eq!(&bytes[..2], b"PK");
    }
}
