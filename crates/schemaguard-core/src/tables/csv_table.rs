use csv::ReaderBuilder;

use crate::errors::IngestError;
use crate::tables::RawTable;

/// Decode an uploaded CSV file into its data rows.
///
/// The payload must be UTF-8. The first record is the header and is
/// discarded without being looked at. Records may have differing lengths;
/// shape is the validator's concern, not the decoder's.
pub fn decode_csv(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| IngestError::DecodeError(format!("file is not valid UTF-8: {}", e)))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    match records.next() {
        Some(header) => {
            header.map_err(|e| IngestError::DecodeError(e.to_string()))?;
        }
        None => {
            return Err(IngestError::DecodeError(
                "file is empty, expected a header row".to_string(),
            ))
        }
    }

    let rows = records
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IngestError::DecodeError(e.to_string()))?;

    Ok(RawTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_header_is_discarded() {
        let table = decode_csv(b"x,y\n1,2.5\nfoo,3.0\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), Some("1"));
        assert_eq!(table.cell(1, 0), Some("foo"));
        assert_eq!(table.cell(1, 1), Some("3.0"));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let table = decode_csv(b"x,y\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_quoted_fields_keep_separators() {
        let table = decode_csv(b"name,amount\n\"Doe, John\",12\n").unwrap();
        assert_eq!(table.cell(0, 0), Some("Doe, John"));
        assert_eq!(table.width(), Some(2));
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let table = decode_csv(b"a,b\n1,2\n3\n").unwrap();
        assert_eq!(table.rows()[1].len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_a_decode_error() {
        let err = decode_csv(&[b'a', b'\n', 0xff, 0xfe, b'\n']).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_empty_file_is_a_decode_error() {
        let err = decode_csv(b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeError);
    }
}
