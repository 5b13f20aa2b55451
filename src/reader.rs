//! Read records from flat files and streams.
//!
//! [`RecordReader`] handles the common case of one record per line. When a
//! record arrives in pieces that do not line up with field boundaries (e.g.
//! from a socket or a reader with a small buffer), [`ChunkedDecoder`] decodes
//! each field as soon as all of its bytes are available.
use std::io::BufRead;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::de::{decode_custom, estimate_decodable_fields, DecodeSettings, FieldRange};
use crate::decode_error::{DResult, DecodeError};
use crate::schema::Record;

/// Reads one record per line from a buffered reader.
///
/// Lines may end in `\n` or `\r\n`; the terminator is not part of the record.
///
/// ```
/// use std::io::BufReader;
/// use flatfile::{Record, Schema};
/// use flatfile::reader::RecordReader;
///
/// #[derive(Debug, Default)]
/// struct Row { id: u16, label: String }
///
/// impl Record for Row {
///     fn schema() -> Schema<Self> {
///         Schema::<Self>::builder()
///             .field("id", "1,3", |r| &mut r.id)
///             .field("label", "4,5", |r| &mut r.label)
///             .build()
///     }
/// }
///
/// let data = "001alpha\n002beta \n";
/// let rows: Vec<Row> = RecordReader::new(BufReader::new(data.as_bytes()))
///     .records()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1].label, "beta ");
/// ```
pub struct RecordReader<B: BufRead> {
    inner: B,
    line_num: usize,
    line: Vec<u8>,
    settings: DecodeSettings,
}

impl<B: BufRead> RecordReader<B> {
    pub fn new(inner: B) -> Self {
        Self::with_settings(inner, DecodeSettings::default())
    }

    pub fn with_settings(inner: B, settings: DecodeSettings) -> Self {
        Self { inner, line_num: 0, line: vec![], settings }
    }

    /// The 1-indexed number of the last line read, 0 before the first read.
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    /// Read the next line into the internal buffer, returning `false` at the end of input.
    fn next_line(&mut self) -> DResult<bool> {
        self.line.clear();
        let n = self.inner.read_until(b'\n', &mut self.line)
            .map_err(|e| DecodeError::Read(e, self.line_num + 1))?;

        if n == 0 {
            return Ok(false);
        }

        self.line_num += 1;
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        Ok(true)
    }

    /// Decode the next line into `target`.
    ///
    /// Returns `Ok(false)`, leaving `target` untouched, once the input is
    /// exhausted. Fields not covered by a short line keep their previous values.
    pub fn read_into<R: Record>(&mut self, target: &mut R) -> DResult<bool> {
        if !self.next_line()? {
            debug!("end of input after {} lines", self.line_num);
            return Ok(false);
        }

        trace!("decoding line {} ({} bytes)", self.line_num, self.line.len());
        decode_custom(&self.line, target, FieldRange::all(), &self.settings)?;
        Ok(true)
    }

    /// Iterate over the remaining lines, decoding each into a new record.
    pub fn records<R: Record>(self) -> Records<B, R> {
        Records { reader: self, marker: PhantomData }
    }
}

/// Iterator over the records of a [`RecordReader`].
pub struct Records<B: BufRead, R> {
    reader: RecordReader<B>,
    marker: PhantomData<fn() -> R>,
}

impl<B: BufRead, R: Record> Iterator for Records<B, R> {
    type Item = DResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = R::default();
        match self.reader.read_into(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Decodes one record from pieces of arbitrary size.
///
/// Each call to [`feed`](ChunkedDecoder::feed) appends to the bytes held back
/// from earlier calls and decodes every following field that is now complete.
/// [`finish`](ChunkedDecoder::finish) decodes whatever is left (truncating the
/// last field if needed) and hands back the record.
///
/// Field boundaries are found with [`estimate_decodable_fields`], so the
/// record layout must be contiguous and free of overlapping fields.
///
/// ```
/// # use flatfile::{Record, Schema};
/// use flatfile::reader::ChunkedDecoder;
/// # #[derive(Debug, Default)]
/// # struct Row { id: u16, label: String }
/// # impl Record for Row {
/// #     fn schema() -> Schema<Self> {
/// #         Schema::<Self>::builder()
/// #             .field("id", "1,3", |r| &mut r.id)
/// #             .field("label", "4,5", |r| &mut r.label)
/// #             .build()
/// #     }
/// # }
/// let mut dec = ChunkedDecoder::<Row>::new();
/// assert_eq!(dec.feed(b"00").unwrap(), 0);
/// assert_eq!(dec.feed(b"7al").unwrap(), 1);
/// assert_eq!(dec.feed(b"pha").unwrap(), 1);
/// let row = dec.finish().unwrap();
/// assert_eq!((row.id, row.label.as_str()), (7, "alpha"));
/// ```
pub struct ChunkedDecoder<R> {
    record: R,
    next_field: usize,
    pending: Vec<u8>,
    settings: DecodeSettings,
}

impl<R: Record> ChunkedDecoder<R> {
    pub fn new() -> Self {
        Self::with_settings(DecodeSettings::default())
    }

    pub fn with_settings(settings: DecodeSettings) -> Self {
        Self { record: R::default(), next_field: 0, pending: vec![], settings }
    }

    /// The index of the first field not yet decoded.
    pub fn next_field(&self) -> usize {
        self.next_field
    }

    /// Bytes received but not yet decoded.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Add `chunk` to the record and decode every field it completes.
    ///
    /// Returns the number of field indices consumed (untagged fields included).
    pub fn feed(&mut self, chunk: &[u8]) -> DResult<usize> {
        self.pending.extend_from_slice(chunk);

        let est = estimate_decodable_fields::<R>(&self.pending, self.next_field)?;
        let count = est.count;
        if count == 0 {
            return Ok(0);
        }

        let range = FieldRange::starting_at(self.next_field).take(count).continuation(true);
        decode_custom(&self.pending, &mut self.record, range, &self.settings)?;

        let remainder = est.remainder.to_vec();
        trace!("decoded fields {}..{}, holding back {} bytes", self.next_field, self.next_field + count, remainder.len());
        self.pending = remainder;
        self.next_field += count;
        Ok(count)
    }

    /// Decode any held back bytes and return the record.
    ///
    /// The decoder is reset afterwards, ready for the next record, even if the
    /// final decode fails.
    pub fn finish(&mut self) -> DResult<R> {
        let res = if self.pending.is_empty() {
            Ok(())
        } else {
            let range = FieldRange::starting_at(self.next_field).continuation(true);
            decode_custom(&self.pending, &mut self.record, range, &self.settings)
        };

        let record = std::mem::take(&mut self.record);
        self.next_field = 0;
        self.pending.clear();
        res.map(|_| record)
    }
}

impl<R: Record> Default for ChunkedDecoder<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Read};

    use stringreader::StringReader;

    use super::*;
    use crate::schema::Schema;

    #[derive(Debug, Default, PartialEq, Clone)]
    struct Customer {
        name: String,
        open_date: String,
        age: u32,
        address: String,
        country_code: String,
    }

    impl Record for Customer {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .field("name", "1,3", |c| &mut c.name)
                .field("open_date", "4,10", |c| &mut c.open_date)
                .field("age", "14,3", |c| &mut c.age)
                .field("address", "17,15", |c| &mut c.address)
                .field("country_code", "32,2", |c| &mut c.country_code)
                .build()
        }
    }

    const AMY: &str = "AMY1900-01-01025123 FAKE ST    CA";
    const BOB: &str = "BOB1999-12-31040742 EVERGREEN  US";

    fn amy() -> Customer {
        Customer {
            name: "AMY".to_string(),
            open_date: "1900-01-01".to_string(),
            age: 25,
            address: "123 FAKE ST    ".to_string(),
            country_code: "CA".to_string(),
        }
    }

    #[test]
    fn test_read_lines() -> DResult<()> {
        let file = StringReader::new("AMY1900-01-01025123 FAKE ST    CA\r\nBOB1999-12-31040742 EVERGREEN  US\n");
        let mut reader = RecordReader::new(BufReader::new(file));

        let mut c = Customer::default();
        assert!(reader.read_into(&mut c)?);
        assert_eq!(c, amy());
        assert!(reader.read_into(&mut c)?);
        assert_eq!(c.name, "BOB");
        assert_eq!(c.address, "742 EVERGREEN  ");
        assert_eq!(c.country_code, "US");
        assert_eq!(reader.line_num(), 2);

        assert!(!reader.read_into(&mut c)?, "Reading past the last line should return false");
        assert_eq!(c.name, "BOB");
        Ok(())
    }

    #[test]
    fn test_records_iter() -> DResult<()> {
        let file = StringReader::new("AMY1900-01-01025123 FAKE ST    CA\nBOB1999-12-31040742 EVERGREEN  US");
        let customers: Vec<Customer> = RecordReader::new(BufReader::new(file)).records().collect::<DResult<_>>()?;
        assert_eq!(customers.len(), 2, "A final line without a newline should still be read");
        assert_eq!(customers[0], amy());
        assert_eq!(customers[1].age, 40);
        Ok(())
    }

    #[test]
    fn test_records_short_line() -> DResult<()> {
        let file = StringReader::new("AMY1900-01-01025\n");
        let customers: Vec<Customer> = RecordReader::new(BufReader::new(file)).records().collect::<DResult<_>>()?;
        assert_eq!(customers[0].age, 25);
        assert_eq!(customers[0].address, "");
        Ok(())
    }

    #[test]
    fn test_records_decode_error() {
        let file = StringReader::new("AMY1900-01-01025123 FAKE ST    CA\nBOB1999-12-31abc\n");
        let mut records = RecordReader::new(BufReader::new(file)).records::<Customer>();
        assert!(matches!(records.next(), Some(Ok(_))));
        let e = records.next().expect("second line should be read").unwrap_err();
        assert_eq!(e.field_path(), ["age"]);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_read_error() {
        let mut reader = RecordReader::new(BufReader::new(Broken));
        let e = reader.read_into(&mut Customer::default()).unwrap_err();
        if let DecodeError::Read(_, line_num) = e {
            assert_eq!(line_num, 1);
        } else {
            assert!(false, "Wrong error type: {e:?}");
        }
    }

    #[test]
    fn test_chunked_any_size() -> DResult<()> {
        for size in 1..=AMY.len() {
            let mut dec = ChunkedDecoder::<Customer>::new();
            let mut total = 0;
            for chunk in AMY.as_bytes().chunks(size) {
                total += dec.feed(chunk)?;
            }
            assert_eq!(total, 5, "Chunk size {size} did not decode every field");
            assert!(dec.pending().is_empty());
            assert_eq!(dec.finish()?, amy(), "Chunk size {size} gave the wrong record");
        }
        Ok(())
    }

    #[test]
    fn test_chunked_progress() -> DResult<()> {
        let mut dec = ChunkedDecoder::<Customer>::new();
        assert_eq!(dec.feed(b"AMY19")?, 1);
        assert_eq!(dec.pending(), b"19");
        assert_eq!(dec.feed(b"00-01")?, 0);
        assert_eq!(dec.feed(b"-01025")?, 2);
        assert_eq!(dec.next_field(), 3);
        assert!(dec.pending().is_empty());
        Ok(())
    }

    #[test]
    fn test_chunked_finish_truncates() -> DResult<()> {
        let mut dec = ChunkedDecoder::<Customer>::new();
        assert_eq!(dec.feed(b"AMY1900-01-01025123 FAKE")?, 3);
        assert_eq!(dec.pending(), b"123 FAKE");

        let c = dec.finish()?;
        assert_eq!(c.address, "123 FAKE");
        assert_eq!(c.country_code, "");

        // the decoder starts over after finishing
        assert_eq!(dec.next_field(), 0);
        for chunk in BOB.as_bytes().chunks(7) {
            dec.feed(chunk)?;
        }
        assert_eq!(dec.finish()?.name, "BOB");
        Ok(())
    }

    #[test]
    fn test_chunked_error_resets() {
        let mut dec = ChunkedDecoder::<Customer>::new();
        assert!(dec.feed(b"AMY1900-01-01").is_ok());
        assert!(dec.feed(b"xx").is_ok(), "age is not complete yet");
        assert!(dec.finish().is_err());
        assert_eq!(dec.next_field(), 0);
        assert!(dec.pending().is_empty());
    }
}
