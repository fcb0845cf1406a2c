/// Collapses OCR output into a single line.
///
/// Tesseract emits one line per detected text line with blank lines between
/// blocks; a spreadsheet cell reads better as one paragraph. Runs of
/// whitespace become a single space and the result is trimmed.
pub fn normalize_ocr_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
