use std::sync::{Arc, Mutex, PoisonError};

use leptess::LepTess;

use crate::error::ProcessError;
use crate::processor::image::normalize_for_ocr;
use crate::processor::text::normalize_ocr_text;
use crate::processor::TextExtractor;

/// ISO 639-1 codes users commonly pass, mapped to Tesseract traineddata names.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("ar", "ara"),
    ("be", "bel"),
    ("bg", "bul"),
    ("cs", "ces"),
    ("de", "deu"),
    ("en", "eng"),
    ("es", "spa"),
    ("fr", "fra"),
    ("he", "heb"),
    ("it", "ita"),
    ("ja", "jpn"),
    ("kk", "kaz"),
    ("ko", "kor"),
    ("nl", "nld"),
    ("pl", "pol"),
    ("pt", "por"),
    ("ro", "ron"),
    ("ru", "rus"),
    ("tr", "tur"),
    ("uk", "ukr"),
    ("zh", "chi_sim"),
];

/// Maps a user-facing language code to the Tesseract name.
/// Unknown codes pass through unchanged.
pub fn tesseract_language(code: &str) -> String {
    let lower = code.trim().to_ascii_lowercase();
    LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, name)| name.to_string())
        .unwrap_or(lower)
}

#[derive(Clone)]
pub struct OcrProcessor {
    inner: Arc<OcrProcessorInner>,
}

struct OcrProcessorInner {
    languages: String,
    dpi: u32,
    // Loaded on first use and reused; images are recognized one at a time.
    engine: Mutex<Option<LepTess>>,
}

impl OcrProcessor {
    pub fn new(languages: &[String], dpi: u32) -> Self {
        let mut names: Vec<String> = Vec::new();
        for lang in languages.iter().map(|l| tesseract_language(l)) {
            if !lang.is_empty() && !names.contains(&lang) {
                names.push(lang);
            }
        }

        let lang_str = if names.is_empty() {
            "eng".to_string()
        } else {
            names.join("+")
        };

        Self {
            inner: Arc::new(OcrProcessorInner {
                languages: lang_str,
                dpi,
                engine: Mutex::new(None),
            }),
        }
    }

    pub fn languages(&self) -> &str {
        &self.inner.languages
    }

    pub fn dpi(&self) -> u32 {
        self.inner.dpi
    }

    /// Checks that Tesseract can load every configured language.
    ///
    /// Run once before scanning so a missing traineddata file fails the run
    /// up front instead of failing every image. The loaded engine is kept for
    /// the images that follow.
    pub fn verify(&self) -> Result<(), ProcessError> {
        let mut engine = self.lock_engine();
        if engine.is_none() {
            *engine = Some(self.load_engine()?);
        }
        Ok(())
    }

    pub fn process_image_bytes(&self, image_data: &[u8]) -> Result<String, ProcessError> {
        let _span = tracing::info_span!("processor.ocr", languages = %self.inner.languages).entered();

        let png_data = normalize_for_ocr(image_data)?;

        let mut engine = self.lock_engine();
        let text = match engine.as_mut() {
            Some(lt) => self.recognize(lt, &png_data)?,
            None => {
                let lt = engine.insert(self.load_engine()?);
                self.recognize(lt, &png_data)?
            }
        };

        Ok(normalize_ocr_text(&text))
    }

    fn recognize(&self, lt: &mut LepTess, png_data: &[u8]) -> Result<String, ProcessError> {
        lt.set_image_from_mem(png_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;
        // Telegram strips DPI metadata; without a hint Tesseract guesses badly.
        lt.set_source_resolution(self.inner.dpi as i32);

        lt.get_utf8_text()
            .map_err(|e| ProcessError::OcrFailed(format!("OCR failed: {}", e)))
    }

    fn load_engine(&self) -> Result<LepTess, ProcessError> {
        tracing::debug!(languages = %self.inner.languages, "Loading Tesseract");
        LepTess::new(None, &self.inner.languages).map_err(|e| {
            ProcessError::OcrFailed(format!(
                "Failed to initialize Tesseract with '{}': {}",
                self.inner.languages, e
            ))
        })
    }

    // Each image replaces the engine state, so a poisoned lock is still usable.
    fn lock_engine(&self) -> std::sync::MutexGuard<'_, Option<LepTess>> {
        self.inner
            .engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextExtractor for OcrProcessor {
    fn extract(&self, image_data: &[u8]) -> Result<String, ProcessError> {
        self.process_image_bytes(image_data)
    }
}
