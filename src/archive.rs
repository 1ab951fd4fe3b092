//! Bulk download packing
//!
//! Packs every completed item's output into one zip archive. Outputs are
//! already PNG-compressed, so entries are stored without recompression.

use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    tracing_config::spans,
    types::ProcessingItem,
};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A finished archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBundle {
    /// Download name (`<prefix>_<epochMillis>.zip`)
    pub file_name: String,
    /// Encoded zip bytes
    pub bytes: Vec<u8>,
    /// Entry names in archive order
    pub entry_names: Vec<String>,
}

/// Builds bulk-download archives from completed items
#[derive(Debug, Clone)]
pub struct ArchiveExporter {
    archive_prefix: String,
}

impl ArchiveExporter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            archive_prefix: config.archive_prefix.clone(),
        }
    }

    /// Archive file name for the given timestamp
    #[must_use]
    pub fn archive_name(&self, epoch_millis: i64) -> String {
        format!("{}_{}.zip", self.archive_prefix, epoch_millis)
    }

    /// Pack all completed items, named after the current time
    pub fn build_archive(&self, items: &[ProcessingItem]) -> Result<ArchiveBundle> {
        self.build_archive_at(items, chrono::Utc::now().timestamp_millis())
    }

    /// Pack all completed items with a fixed timestamp
    ///
    /// Failed and unfinished items are skipped. Entries follow batch order;
    /// colliding output names are disambiguated with `_1`, `_2`, ...
    ///
    /// # Errors
    /// - `DownloadUnavailable` when no item is completed
    /// - `Archive` when the zip writer fails
    pub fn build_archive_at(&self, items: &[ProcessingItem], epoch_millis: i64) -> Result<ArchiveBundle> {
        let completed: Vec<_> = items.iter().filter_map(ProcessingItem::completed).collect();
        if completed.is_empty() {
            return Err(PipelineError::download_unavailable(
                "No completed items to archive",
            ));
        }

        let _span = spans::archive_export(completed.len()).entered();

        let entry_names = unique_entry_names(completed.iter().map(|output| output.output_name.as_str()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (name, output) in entry_names.iter().zip(&completed) {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&output.output_blob)?;
            debug!(entry = %name, size_bytes = output.output_blob.len(), "Added archive entry");
        }

        let bytes = writer.finish()?.into_inner();
        let file_name = self.archive_name(epoch_millis);
        info!(archive = %file_name, entries = entry_names.len(), size_bytes = bytes.len(), "Archive built");

        Ok(ArchiveBundle {
            file_name,
            bytes,
            entry_names,
        })
    }
}

/// Make names unique, keeping the first occurrence of each as-is
///
/// ```rust
/// use unmark_batch::archive::unique_entry_names;
///
/// let names = unique_entry_names(["clean_x.png", "clean_x.png", "clean_y.png"]);
/// assert_eq!(names, ["clean_x.png", "clean_x_1.png", "clean_y.png"]);
/// ```
pub fn unique_entry_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken = HashSet::new();
    let mut unique = Vec::new();

    for name in names {
        let mut candidate = name.to_string();
        if taken.contains(&candidate) {
            let (stem, extension) = split_extension(name);
            let mut counter = 1usize;
            loop {
                candidate = format!("{}_{}{}", stem, counter, extension);
                if !taken.contains(&candidate) {
                    break;
                }
                counter += 1;
            }
        }
        taken.insert(candidate.clone());
        unique.push(candidate);
    }

    unique
}

/// Split `name` into stem and extension (extension keeps its dot)
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name.split_at(dot),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ResourceHandle;
    use crate::types::{CompletedOutput, ItemState};
    use std::io::Read;
    use std::sync::Arc;
    use uuid::Uuid;
    use zip::ZipArchive;

    fn completed(index: usize, output_name: &str, bytes: &[u8]) -> ProcessingItem {
        let mut item = ProcessingItem::queued(index, format!("source{index}.jpg"));
        item.state = ItemState::Completed(CompletedOutput {
            output_name: output_name.to_string(),
            output_blob: Arc::from(bytes),
            download_handle: ResourceHandle::new(Uuid::new_v4(), "blob:test"),
            width: 1,
            height: 1,
        });
        item
    }

    fn failed(index: usize) -> ProcessingItem {
        let mut item = ProcessingItem::queued(index, format!("broken{index}.jpg"));
        item.state = ItemState::Failed("boom".to_string());
        item
    }

    fn read_entries(bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut content = Vec::new();
                file.read_to_end(&mut content).unwrap();
                (file.name().to_string(), content)
            })
            .collect()
    }

    fn exporter() -> ArchiveExporter {
        ArchiveExporter::new(&PipelineConfig::default())
    }

    #[test]
    fn test_archive_contains_only_completed_items() {
        let items = vec![
            completed(0, "clean_a.png", b"AAA"),
            failed(1),
            completed(2, "clean_c.png", b"CCC"),
        ];

        let bundle = exporter().build_archive_at(&items, 1_700_000_000_000).unwrap();
        assert_eq!(bundle.file_name, "cleaned_images_1700000000000.zip");
        assert_eq!(bundle.entry_names, vec!["clean_a.png", "clean_c.png"]);

        let entries = read_entries(bundle.bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("clean_a.png".to_string(), b"AAA".to_vec()));
        assert_eq!(entries[1], ("clean_c.png".to_string(), b"CCC".to_vec()));
    }

    #[test]
    fn test_colliding_names_are_disambiguated() {
        let items = vec![
            completed(0, "clean_x.png", b"first"),
            completed(1, "clean_x.png", b"second"),
        ];

        let bundle = exporter().build_archive_at(&items, 0).unwrap();
        let entries = read_entries(bundle.bytes);
        assert_eq!(entries[0], ("clean_x.png".to_string(), b"first".to_vec()));
        assert_eq!(entries[1], ("clean_x_1.png".to_string(), b"second".to_vec()));
    }

    #[test]
    fn test_unique_names_skip_taken_suffixes() {
        let names = unique_entry_names(["a.png", "a_1.png", "a.png", "a.png"]);
        assert_eq!(names, vec!["a.png", "a_1.png", "a_2.png", "a_3.png"]);

        let names = unique_entry_names(["noext", "noext"]);
        assert_eq!(names, vec!["noext", "noext_1"]);
    }

    #[test]
    fn test_collision_suffix_goes_before_any_extension() {
        let names = unique_entry_names([".png", ".png", "trailing.", "trailing."]);
        assert_eq!(names, [".png", "_1.png", "trailing.", "trailing._1"]);
    }

    #[test]
    fn test_no_completed_items_is_unavailable() {
        let err = exporter().build_archive_at(&[failed(0)], 0).unwrap_err();
        assert!(matches!(err, PipelineError::DownloadUnavailable(_)));

        assert!(exporter().build_archive(&[]).is_err());
    }

    #[test]
    fn test_archive_build_is_deterministic() {
        let items = vec![completed(0, "clean_a.png", b"A"), completed(1, "clean_b.png", b"B")];
        let first = exporter().build_archive_at(&items, 42).unwrap();
        let second = exporter().build_archive_at(&items, 42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_archive_prefix_is_configurable() {
        let config = PipelineConfig::builder().archive_prefix("batch").build().unwrap();
        let exporter = ArchiveExporter::new(&config);
        assert_eq!(exporter.archive_name(5), "batch_5.zip");
    }
}
