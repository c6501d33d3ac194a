//! Tabular product catalog backed by CSV.
//!
//! Columns are kept as read so every stage can append its own output column
//! and write the table back without losing anything upstream produced.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::color::ToneCell;
use crate::error::CatalogError;
use crate::types::ProductRecord;

/// Representative image values that mean "no image".
const INVALID_IMAGE_MARKERS: [&str; 3] = [
    ToneCell::NOT_PROCESSED,
    ToneCell::INVALID_URL,
    ToneCell::ERROR,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub product_id: String,
    pub price: String,
    pub product_url: String,
    pub model_image_url: String,
    /// Semicolon (or comma) separated list of extra product photos.
    pub additional_images: String,
    pub representative_image_url: String,
    pub skin_tone: String,
    pub gender: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            product_id: "product_id".to_string(),
            price: "price".to_string(),
            product_url: "product_url".to_string(),
            model_image_url: "model_image_url".to_string(),
            additional_images: "additional_images".to_string(),
            representative_image_url: "new_model_image_url".to_string(),
            skin_tone: "detected_skin_color_rgb".to_string(),
            gender: "detected_gender_freq".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Catalog {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self::new(headers, rows))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), CatalogError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Resolve every named column, failing with the full list of missing ones.
    pub fn require(&self, names: &[&str]) -> Result<Vec<usize>, CatalogError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| self.column(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::MissingColumns(missing));
        }
        Ok(names.iter().filter_map(|name| self.column(name)).collect())
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Cell value by column name; blank when the column is absent.
    pub fn value(&self, row: usize, name: &str) -> &str {
        match self.column(name) {
            Some(col) => self.cell(row, col),
            None => "",
        }
    }

    /// Replace (or append) the named column with `values`, one per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        let col = match self.column(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[col] = value;
        }
    }
}

/// Candidate photo URLs for one product: the model image first, then the
/// additional images, trimmed and deduplicated in first-seen order.
pub fn candidate_urls(model_image_url: &str, additional_images: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let extra = additional_images.split([';', ',']);
    for url in std::iter::once(model_image_url).chain(extra) {
        let url = url.trim();
        if !url.is_empty() && !urls.iter().any(|u| u == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Turn a processed catalog into recommendable product records.
///
/// Rows with no usable representative image, or whose tone cell is blank, a
/// sentinel or unparsable, are dropped.
pub fn clean(catalog: &Catalog, columns: &ColumnConfig) -> Result<Vec<ProductRecord>, CatalogError> {
    let cols = catalog.require(&[
        columns.representative_image_url.as_str(),
        columns.skin_tone.as_str(),
        columns.gender.as_str(),
        columns.product_url.as_str(),
        columns.price.as_str(),
    ])?;
    let (image_col, tone_col, gender_col, url_col, price_col) =
        (cols[0], cols[1], cols[2], cols[3], cols[4]);
    let id_col = catalog.column(&columns.product_id);

    let initial = catalog.len();
    let with_image: Vec<usize> = (0..initial)
        .filter(|&row| {
            let url = catalog.cell(row, image_col).trim();
            !url.is_empty() && !INVALID_IMAGE_MARKERS.contains(&url)
        })
        .collect();
    info!(rows = with_image.len(), "rows after removing invalid model urls");

    let mut sentinel_free = 0usize;
    let mut products = Vec::new();
    for row in with_image {
        let text = catalog.cell(row, tone_col).trim();
        if text.is_empty() {
            continue;
        }
        let cell = ToneCell::read(text);
        if matches!(cell, Some(c) if c.tone().is_none()) {
            continue;
        }
        sentinel_free += 1;
        let Some(tone) = cell.and_then(|c| c.tone()) else {
            continue;
        };
        products.push(ProductRecord {
            id: match id_col {
                Some(col) => catalog.cell(row, col).to_string(),
                None => row.to_string(),
            },
            gender: catalog.cell(row, gender_col).to_string(),
            price: catalog.cell(row, price_col).to_string(),
            representative_image_url: catalog.cell(row, image_col).trim().to_string(),
            skin_tone: Some(tone),
            source_url: catalog.cell(row, url_col).to_string(),
        });
    }
    info!(rows = sentinel_free, "rows after removing invalid skin colors");
    info!(rows = products.len(), "rows after parsing skin colors");
    info!(removed = initial - products.len(), "catalog cleaning complete");

    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::SkinTone;

    const CSV: &str = "\
product_id,price,product_url,new_model_image_url,detected_skin_color_rgb,detected_gender_freq
p1,499,https://shop/p1,https://img/p1.jpg,\"(10, 20, 30)\",Men
p2,599,https://shop/p2,,\"(1, 2, 3)\",Men
p3,699,https://shop/p3,Invalid URL,\"(1, 2, 3)\",Women
p4,799,https://shop/p4,https://img/p4.jpg,Not Detected,Women
p5,899,https://shop/p5,https://img/p5.jpg,\"(300, 0, 0)\",Women
p6,999,https://shop/p6,https://img/p6.jpg,\"(4,5,6)\",Women
";

    #[test]
    fn candidate_urls_dedupe_in_order() {
        let urls = candidate_urls(
            "https://img/a.jpg",
            " https://img/b.jpg;https://img/a.jpg, https://img/c.jpg;;https://img/b.jpg ",
        );
        assert_eq!(
            urls,
            vec!["https://img/a.jpg", "https://img/b.jpg", "https://img/c.jpg"]
        );
        assert_eq!(candidate_urls("", ""), Vec::<String>::new());
    }

    #[test]
    fn clean_drops_unusable_rows() {
        let catalog = Catalog::from_reader(CSV.as_bytes()).unwrap();
        let products = clean(&catalog, &ColumnConfig::default()).unwrap();
        let ids: Vec<_> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p6"]);
        assert_eq!(products[1].skin_tone, Some(SkinTone::new(4, 5, 6)));
        assert_eq!(products[0].source_url, "https://shop/p1");
    }

    #[test]
    fn missing_columns_are_fatal() {
        let catalog = Catalog::from_reader("product_id,price\np1,10\n".as_bytes()).unwrap();
        match clean(&catalog, &ColumnConfig::default()) {
            Err(CatalogError::MissingColumns(missing)) => {
                assert_eq!(missing.len(), 4);
                assert!(missing.contains(&"detected_skin_color_rgb".to_string()));
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn set_column_appends_and_round_trips() {
        let mut catalog = Catalog::from_reader("id,name\n1,a\n2,b\n".as_bytes()).unwrap();
        catalog.set_column("tone", vec!["(1, 2, 3)".into(), "Not Detected".into()]);
        catalog.set_column("name", vec!["x".into(), "y".into()]);

        let mut out = Vec::new();
        catalog.to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,name,tone\n1,x,\"(1, 2, 3)\"\n2,y,Not Detected\n");

        let reread = Catalog::from_reader(text.as_bytes()).unwrap();
        assert_eq!(reread.value(0, "tone"), "(1, 2, 3)");
        assert_eq!(reread.value(1, "missing"), "");
    }

    #[test]
    fn short_rows_are_padded() {
        let catalog = Catalog::from_reader("a,b,c\n1\n".as_bytes()).unwrap();
        assert_eq!(catalog.cell(0, 2), "");
        assert_eq!(catalog.len(), 1);
    }
}
