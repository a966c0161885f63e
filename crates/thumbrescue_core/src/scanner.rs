use crate::types::Segment;
use memchr::memmem::Finder;

pub const START_MARKER: &[u8] = &[0xFF, 0xD8];
pub const END_MARKER: &[u8] = &[0xFF, 0xD9];

/// Advance distance past a start marker whose candidate failed validation.
/// Guarantees forward progress on adversarial data.
pub const FALSE_START_SKIP: usize = 2;

#[derive(Debug, Clone)]
pub struct MarkerScanner {
    start_finder: Finder<'static>,
    end_finder: Finder<'static>,
}

impl MarkerScanner {
    #[must_use]
    pub fn jpeg() -> Self {
        Self {
            start_finder: Finder::new(START_MARKER),
            end_finder: Finder::new(END_MARKER),
        }
    }

    /// Finds the next candidate segment at or after `from`, scanning strictly
    /// forward. Returns `None` when no start marker remains, or when a start
    /// marker has no subsequent end marker (truncated tail).
    ///
    /// The end-marker search begins past the start marker so an overlapping
    /// match cannot produce an empty body.
    #[must_use]
    pub fn next_segment(&self, buffer: &[u8], from: usize) -> Option<Segment> {
        if from >= buffer.len() {
            return None;
        }
        let start = from + self.start_finder.find(&buffer[from..])?;
        let body = start + START_MARKER.len();
        let end = body + self.end_finder.find(&buffer[body..])? + END_MARKER.len();
        Some(Segment { start, end })
    }
}

impl Default for MarkerScanner {
    fn default() -> Self {
        Self::jpeg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_segment() {
        let scanner = MarkerScanner::jpeg();

        let buffer: Vec<u8> = [
            &[0x00, 0x11, 0x22][..],
            &[0xFF, 0xD8][..],
            &[0xE0, 0x00, 0x10][..],
            &[0xFF, 0xD9][..],
            &[0xAA, 0xBB][..],
        ]
        .concat();

        let segment = scanner.next_segment(&buffer, 0).unwrap();
        assert_eq!(segment, Segment { start: 3, end: 10 });
    }

    #[test]
    fn resumes_from_offset() {
        let scanner = MarkerScanner::jpeg();

        let buffer: Vec<u8> = [
            &[0xFF, 0xD8][..],
            &[0x01, 0x02][..],
            &[0xFF, 0xD9][..],
            &[0x00][..],
            &[0xFF, 0xD8][..],
            &[0x03][..],
            &[0xFF, 0xD9][..],
        ]
        .concat();

        let first = scanner.next_segment(&buffer, 0).unwrap();
        assert_eq!(first, Segment { start: 0, end: 6 });

        let second = scanner.next_segment(&buffer, first.end).unwrap();
        assert_eq!(second, Segment { start: 7, end: 12 });

        assert_eq!(scanner.next_segment(&buffer, second.end), None);
    }

    #[test]
    fn start_without_end_is_absent() {
        let scanner = MarkerScanner::jpeg();
        let buffer: Vec<u8> = [&[0x00][..], &[0xFF, 0xD8][..], &[0x01, 0x02, 0x03][..]].concat();
        assert_eq!(scanner.next_segment(&buffer, 0), None);
    }

    #[test]
    fn no_start_marker() {
        let scanner = MarkerScanner::jpeg();
        let buffer = vec![0x00, 0x11, 0x22, 0x33, 0xFF, 0xD9];
        assert_eq!(scanner.next_segment(&buffer, 0), None);
    }

    #[test]
    fn empty_buffer() {
        let scanner = MarkerScanner::jpeg();
        assert_eq!(scanner.next_segment(&[], 0), None);
    }

    #[test]
    fn offset_past_end_of_buffer() {
        let scanner = MarkerScanner::jpeg();
        let buffer = vec![0xFF, 0xD8, 0xFF, 0xD9];
        assert_eq!(scanner.next_segment(&buffer, 100), None);
    }

    #[test]
    fn adjacent_marker_pair_has_no_body() {
        let scanner = MarkerScanner::jpeg();
        let buffer = vec![0xFF, 0xD8, 0xFF, 0xD9];
        let segment = scanner.next_segment(&buffer, 0).unwrap();
        assert_eq!(segment, Segment { start: 0, end: 4 });
        assert_eq!(segment.len(), 4);
    }

    #[test]
    fn end_marker_before_start_is_ignored() {
        let scanner = MarkerScanner::jpeg();

        let buffer: Vec<u8> = [
            &[0xFF, 0xD9][..],
            &[0x00][..],
            &[0xFF, 0xD8][..],
            &[0x01][..],
            &[0xFF, 0xD9][..],
        ]
        .concat();

        let segment = scanner.next_segment(&buffer, 0).unwrap();
        assert_eq!(segment, Segment { start: 3, end: 8 });
    }

    #[test]
    fn scanner_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MarkerScanner>();
    }
}
