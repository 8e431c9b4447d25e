//! Rendering of grouped translations.

use std::io::Write;

use crate::{error::Error, types::ExportRow};

pub struct Exporter;

impl Exporter {
    /// One `<lang>|<value>` line per row, in input order.
    ///
    /// # Example
    /// ```rust
    /// use stringdex::{export::Exporter, types::ExportRow};
    /// let rows = vec![ExportRow { lang: "de".into(), value: "Weiter".into() }];
    /// assert_eq!(Exporter::render(&rows), vec!["de|Weiter"]);
    /// ```
    pub fn render(rows: &[ExportRow]) -> Vec<String> {
        rows.iter()
            .map(|row| format!("{}|{}", row.lang, row.value))
            .collect()
    }

    /// Writes `lang,value` CSV. The header row is written with the first record.
    pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), Error> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
