//! Recognized text cleanup and search query building

/// Characters OCR tends to pick up around a circled word
const OCR_TRIM: &[char] = &['.', ',', '\'', '"', '[', ']', '-', ':', ';'];

/// Strip surrounding punctuation and whitespace from an OCR result.
pub fn clean_ocr_text(raw: &str) -> String {
    raw.trim().trim_matches(OCR_TRIM).trim().to_string()
}

/// Academic-search expression for free text: `And(W='a',W='b')`.
///
/// Each word keeps only its letters and digits, lowercased; words of one
/// character or less are dropped. Returns `None` when no word survives.
pub fn build_search_query(text: &str) -> Option<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| word.chars().count() > 1)
        .map(|word| format!("W='{}'", word))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(format!("And({})", words.join(",")))
    }
}
