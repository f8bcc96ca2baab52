//! Result-page inspection.
//!
//! The upstream exposes no API: everything is read back out of rendered
//! HTML. A human-readable record-count banner, a maintenance notice in the
//! body text, selection popups full of `eklecikar(...)` links, and form
//! `<select>` options. The integration is best-effort and must tolerate
//! markup drift, so every extraction here fails loudly instead of guessing.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::crawling::executor::RecordCountParser;
use crate::domain::dimensions::DimensionValue;
use crate::error::{HarvestError, Result};

static RECORD_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+) kayıt").expect("record count pattern is valid")
});

static DIMENSION_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"eklecikar\('(.+?)','(\d+)'").expect("dimension link pattern is valid")
});

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::PageParse(format!("bad selector {css:?}: {e}")))
}

/// Whole-document text content with whitespace collapsed to single spaces,
/// matching what a browser's `body.textContent` normalization would yield.
pub fn normalized_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let joined = document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when any configured maintenance marker appears in the body text.
pub fn is_maintenance_page(body_text: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| body_text.contains(marker.as_str()))
}

/// Default record-count extraction: the site's "N kayıt" banner.
#[derive(Debug, Default, Clone, Copy)]
pub struct KayitBannerParser;

impl RecordCountParser for KayitBannerParser {
    fn record_count(&self, body_text: &str) -> Option<u64> {
        RECORD_COUNT_RE
            .captures(body_text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Parses the `{id, name}` pairs out of a selection popup's
/// `eklecikar('<name>','<id>')` links.
pub fn parse_dimension_links(html: &str) -> Result<Vec<DimensionValue>> {
    let document = Html::parse_document(html);
    let links = selector(r#"a[href*="eklecikar"]"#)?;

    let mut values = Vec::new();
    for link in document.select(&links) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(caps) = DIMENSION_LINK_RE.captures(href) {
            values.push(DimensionValue::new(&caps[2], &caps[1]));
        }
    }
    Ok(values)
}

/// Available years from the search form, newest first. Years below
/// `min_year` are dropped; `0` disables the filter.
pub fn parse_year_options(html: &str, min_year: u32) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let options = selector(r#"select[name="yil1"] option"#)?;

    let mut years: Vec<u32> = document
        .select(&options)
        .filter_map(|option| option.value().attr("value"))
        .filter(|value| *value != "0")
        .filter_map(|value| value.parse().ok())
        .filter(|year| min_year == 0 || *year >= min_year)
        .collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    Ok(years.into_iter().map(|y| y.to_string()).collect())
}

/// Thesis types from the search form's `Tur` select.
pub fn parse_thesis_type_options(html: &str) -> Result<Vec<DimensionValue>> {
    let document = Html::parse_document(html);
    let options = selector(r#"select[name="Tur"] option"#)?;

    let mut types = Vec::new();
    for option in document.select(&options) {
        let Some(id) = option.value().attr("value") else {
            continue;
        };
        let name = option.text().collect::<String>().trim().to_string();
        if id != "0" && !name.is_empty() {
            types.push(DimensionValue::new(id, name));
        }
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_record_count_from_banner() {
        let parser = KayitBannerParser;
        let text = normalized_body_text(
            "<html><body><div>Sonuç:   1234\n kayıt bulundu</div></body></html>",
        );
        assert_eq!(parser.record_count(&text), Some(1234));
    }

    #[test]
    fn missing_banner_yields_none_not_zero() {
        let parser = KayitBannerParser;
        assert_eq!(parser.record_count("no results banner here"), None);
    }

    #[test]
    fn detects_maintenance_markers() {
        let markers = vec!["BAKIM CALISMASI".to_string()];
        let text = normalized_body_text("<body><p>BAKIM CALISMASI devam ediyor</p></body>");
        assert!(is_maintenance_page(&text, &markers));
        assert!(!is_maintenance_page("all good", &markers));
    }

    #[test]
    fn parses_popup_dimension_links() {
        let html = r#"
            <table id="sf">
              <tr><td><a href="javascript:eklecikar('ANKARA ÜNİVERSİTESİ','12')">ANKARA</a></td></tr>
              <tr><td><a href="javascript:eklecikar('EGE ÜNİVERSİTESİ','34')">EGE</a></td></tr>
              <tr><td><a href="nothing-here">skip</a></td></tr>
            </table>
        "#;
        let values = parse_dimension_links(html).unwrap();
        assert_eq!(
            values,
            vec![
                DimensionValue::new("12", "ANKARA ÜNİVERSİTESİ"),
                DimensionValue::new("34", "EGE ÜNİVERSİTESİ"),
            ]
        );
    }

    #[test]
    fn years_come_back_newest_first_and_filtered() {
        let html = r#"
            <select name="yil1">
              <option value="0">Tümü</option>
              <option value="2019">2019</option>
              <option value="2021">2021</option>
              <option value="2020">2020</option>
              <option value="1975">1975</option>
            </select>
        "#;
        let years = parse_year_options(html, 2000).unwrap();
        assert_eq!(years, vec!["2021", "2020", "2019"]);

        let all = parse_year_options(html, 0).unwrap();
        assert_eq!(all, vec!["2021", "2020", "2019", "1975"]);
    }

    #[test]
    fn thesis_types_skip_the_placeholder_option() {
        let html = r#"
            <select name="Tur">
              <option value="0">Seçiniz</option>
              <option value="1">Yüksek Lisans</option>
              <option value="2">Doktora</option>
            </select>
        "#;
        let types = parse_thesis_type_options(html).unwrap();
        assert_eq!(
            types,
            vec![
                DimensionValue::new("1", "Yüksek Lisans"),
                DimensionValue::new("2", "Doktora"),
            ]
        );
    }
}
