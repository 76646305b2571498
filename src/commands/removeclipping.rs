use crate::alignment_record::AlignmentFormat;
use crate::clipping::ClippingNormalizer;
use log::{debug, info};
use rust_htslib::bam::{self, Read};
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;

/// Check the input exists and the output may be written
fn check_paths(input: &str, output: &str, force: bool) -> io::Result<()> {
    if !Path::new(input).exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("File: {} not found!", input),
        ));
    }
    if !force && Path::new(output).exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("File: {} exists! Not overwriting without -f force.", output),
        ));
    }
    Ok(())
}

/// Rewrite `input` to `output` with all soft and hard clipping removed.
///
/// The output keeps the input's format unless its extension names another one.
///
/// Returns the number of records written and the number altered.
pub fn run_remove_clipping(
    input: &str,
    output: &str,
    force: bool,
    threads: NonZeroUsize,
) -> io::Result<(u64, u64)> {
    check_paths(input, output, force)?;

    let mut reader = bam::Reader::from_path(input).map_err(|e| {
        io::Error::other(format!("Failed to open alignment file '{input}': {e}"))
    })?;
    let header = bam::Header::from_template(reader.header());
    let format = AlignmentFormat::for_output(input, output).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to detect the format of '{input}': {e}"))
    })?;
    debug!("Writing {:?} output to {}", format, output);
    let mut writer = bam::Writer::from_path(output, &header, format.htslib_format())
        .map_err(|e| io::Error::other(format!("Failed to create '{output}': {e}")))?;

    reader
        .set_threads(threads.get())
        .map_err(|e| io::Error::other(format!("Failed to set reader threads: {e}")))?;
    writer
        .set_threads(threads.get())
        .map_err(|e| io::Error::other(format!("Failed to set writer threads: {e}")))?;

    let mut normalizer = ClippingNormalizer::new();
    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result.map_err(|e| io::Error::other(format!("Failed to read from '{input}': {e}")))?;
        normalizer.process(&mut record).map_err(|e| {
            io::Error::other(format!(
                "Failed to update read '{}': {e}",
                String::from_utf8_lossy(record.qname())
            ))
        })?;
        writer
            .write(&record)
            .map_err(|e| io::Error::other(format!("Failed to write to '{output}': {e}")))?;
    }

    info!("Finished writing {}", output);
    eprintln!(
        "Wrote: {} reads\nAltered: {}",
        normalizer.total(),
        normalizer.altered()
    );
    Ok((normalizer.total(), normalizer.altered()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_missing_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("missing.bam");
        let output = dir.path().join("out.bam");
        let err = check_paths(input.to_str().unwrap(), output.to_str().unwrap(), false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_existing_output_needs_force() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.bam");
        let output = dir.path().join("out.bam");
        File::create(&input).unwrap();
        File::create(&output).unwrap();

        let input = input.to_str().unwrap();
        let output = output.to_str().unwrap();
        let err = check_paths(input, output, false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(check_paths(input, output, true).is_ok());
    }
}
