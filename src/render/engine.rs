//! HTML-to-PDF print engine.
//!
//! Loads the quote template once at startup (embedding the logo as a base64
//! data URI), substitutes `{{field}}` placeholders per record, writes the
//! page to a temporary directory, and invokes a headless browser to print it
//! to PDF.

use std::fs;
use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tempfile::tempdir;

use super::{QuoteRenderer, RenderError};
use crate::quote::models::QuoteRecord;

const TEMPLATE_FILE: &str = "mbi-quote.html";
const LOGO_FILE: &str = "autosure-logo.png";

/// Renders quote documents by printing an HTML page with a headless browser.
pub struct HtmlPrintEngine {
    template: String,
    browser_bin: String,
}

impl HtmlPrintEngine {
    /// Load the template and logo from `template_dir`.
    ///
    /// The template is required; the logo is optional and, when present, is
    /// embedded into the template as a data URI so the printed page has no
    /// external references.
    pub fn new(template_dir: &Path, browser_bin: &str) -> Result<Self, RenderError> {
        let template_path = template_dir.join(TEMPLATE_FILE);
        let mut template =
            fs::read_to_string(&template_path).map_err(RenderError::TemplateIo)?;

        let logo_path = template_dir.join(LOGO_FILE);
        if logo_path.exists() {
            let logo = fs::read(&logo_path).map_err(RenderError::LogoIo)?;
            let data_uri = format!("data:image/png;base64,{}", BASE64.encode(logo));
            template = template.replace(
                &format!("src=\"{LOGO_FILE}\""),
                &format!("src=\"{data_uri}\""),
            );
            log::info!("Loaded quote template with embedded logo from {template_path:?}");
        } else {
            log::warn!("Logo {logo_path:?} not found, rendering without it");
        }

        Ok(Self {
            template,
            browser_bin: browser_bin.to_string(),
        })
    }

    /// Substitute every `{{field}}` placeholder with the record's value,
    /// HTML-escaped. Field names are the camelCase wire names.
    fn fill_template(&self, record: &QuoteRecord) -> String {
        let mut html = self.template.clone();
        // QuoteRecord serializes to a flat map of strings, so this walks
        // exactly the 30 known fields.
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(record) {
            for (name, value) in fields {
                if let serde_json::Value::String(value) = value {
                    html = html.replace(&format!("{{{{{name}}}}}"), &escape_html(&value));
                }
            }
        }
        html
    }
}

#[async_trait]
impl QuoteRenderer for HtmlPrintEngine {
    async fn render(&self, record: &QuoteRecord) -> Result<Vec<u8>, RenderError> {
        log::info!(
            "Generating quote PDF for quotation: {}",
            record.quotation_number
        );

        let html = self.fill_template(record);
        let browser_bin = self.browser_bin.clone();

        // The browser invocation blocks on a child process, so it runs on the
        // blocking pool rather than stalling the consumer's fan-out.
        let pdf = tokio::task::spawn_blocking(move || print_html_to_pdf(&browser_bin, &html))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;

        log::info!(
            "Successfully generated PDF for quotation: {}",
            record.quotation_number
        );
        Ok(pdf)
    }
}

/// Escape a value for interpolation into HTML text content.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Write `html` to a scratch directory and print it to PDF with a headless
/// browser.
fn print_html_to_pdf(browser_bin: &str, html: &str) -> Result<Vec<u8>, RenderError> {
    let temp_dir = tempdir().map_err(RenderError::TempDir)?;
    let html_path = temp_dir.path().join("quote.html");
    let pdf_path = temp_dir.path().join("quote.pdf");

    fs::write(&html_path, html).map_err(RenderError::WriteHtml)?;

    let status = Command::new(browser_bin)
        .arg("--headless")
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--no-pdf-header-footer")
        .arg(format!("--print-to-pdf={}", pdf_path.display()))
        .arg(&html_path)
        .current_dir(temp_dir.path())
        .status()
        .map_err(RenderError::BrowserIo)?;

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        return Err(RenderError::BrowserExit(code));
    }

    fs::read(&pdf_path).map_err(RenderError::ReadPdf)
}
