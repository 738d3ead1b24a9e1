//! Page extractors: HTML in, catalog entities out.
//!
//! Everything here is pure. Fetching and caching live in the parent module.

use std::collections::BTreeSet;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use super::types::{
    DefaultedReason, Extracted, Site, SiteField, StateIndex, DEFAULT_CITY, DEFAULT_PHONE,
    DEFAULT_REGION, DEFAULT_ZIPCODE,
};
use crate::error::{NpsError, Result};

const STATE_MENU: &str = "ul.SearchBar-keywordSearch";
const HERO: &str = "div.Hero-titleContainer";
const HERO_TITLE: &str = "a.Hero-title";
const HERO_DESIGNATION: &str = "span.Hero-designation";
const MAILING_ADDRESS: &str = "div.mailing-address";
const LOCALITY: &str = "span[itemprop=\"addressLocality\"]";
const REGION: &str = "span.region";
const REGION_ITEMPROP: &str = "span[itemprop=\"addressRegion\"]";
const POSTAL_CODE: &str = "span[itemprop=\"postalCode\"]";
const TELEPHONE: &str = "div.vcard span[itemprop=\"telephone\"]";
const PAGE_TITLE: &str = "h1.page-title";
const SITE_LISTING: &str = "div.list_left";

/// Title and site links of one state catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePage {
    pub name: String,
    /// Site hrefs as they appear on the page, in document order.
    pub site_paths: Vec<String>,
}

fn sel(css: &str) -> Option<Selector> {
    Selector::parse(css)
        .map_err(|e| warn!(selector = css, error = %e, "selector rejected"))
        .ok()
}

fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    scope.select(&sel(css)?).next()
}

fn first_in_doc<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    doc.select(&sel(css)?).next()
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Resolve an href against the catalog origin. Unparseable hrefs fall back to plain
/// concatenation so the result is still a stable cache key.
pub fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", base.as_str().trim_end_matches('/'), href))
}

/// Parse the top-level catalog page into a state index.
///
/// The state menu is the one structure with no fallback: if it is absent the page is
/// rejected.
pub fn parse_state_index(html: &str, base: &Url, catalog_url: &str) -> Result<StateIndex> {
    let doc = Html::parse_document(html);
    let menu = first_in_doc(&doc, STATE_MENU).ok_or_else(|| NpsError::MalformedCatalog {
        url: catalog_url.to_string(),
        detail: format!("no {} element", STATE_MENU),
    })?;

    let anchor = sel("a").ok_or_else(|| NpsError::MalformedCatalog {
        url: catalog_url.to_string(),
        detail: "selector".to_string(),
    })?;

    let mut index = StateIndex::new();
    for li in menu
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
    {
        let Some(a) = li.select(&anchor).next() else {
            warn!(url = catalog_url, "state menu entry without a link, skipping");
            continue;
        };
        let Some(href) = a.value().attr("href") else {
            warn!(url = catalog_url, "state menu link without href, skipping");
            continue;
        };
        let name = text_of(a).trim().to_lowercase();
        index.insert(name, resolve(base, href));
    }

    if index.is_empty() {
        return Err(NpsError::MalformedCatalog {
            url: catalog_url.to_string(),
            detail: "state menu has no entries".to_string(),
        });
    }
    Ok(index)
}

/// Parse a state page: display title plus ordered site hrefs.
pub fn parse_state_page(html: &str, state_url: &str) -> StatePage {
    let doc = Html::parse_document(html);

    let name = first_in_doc(&doc, PAGE_TITLE)
        .map(|el| text_of(el).trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            warn!(url = state_url, "state page has no title, using its URL");
            state_url.to_string()
        });

    let mut site_paths = Vec::new();
    if let (Some(listing), Some(anchor)) = (sel(SITE_LISTING), sel("a[href]")) {
        for block in doc.select(&listing) {
            match block.select(&anchor).next().and_then(|a| a.value().attr("href")) {
                Some(href) => site_paths.push(href.to_string()),
                None => warn!(url = state_url, "site listing block without link, skipping"),
            }
        }
    }

    StatePage { name, site_paths }
}

fn category(hero: ElementRef<'_>) -> Extracted {
    first(hero, HERO_DESIGNATION)
        .map(text_of)
        .map(|s| s.trim().to_string())
        .ok_or(DefaultedReason::MissingElement(HERO_DESIGNATION))
}

fn city(address: Option<ElementRef<'_>>) -> Extracted {
    let address = address.ok_or(DefaultedReason::MissingSection(MAILING_ADDRESS))?;
    let el = first(address, LOCALITY).ok_or(DefaultedReason::MissingElement(LOCALITY))?;
    non_empty(text_of(el), LOCALITY)
}

fn region(address: Option<ElementRef<'_>>) -> Extracted {
    let address = address.ok_or(DefaultedReason::MissingSection(MAILING_ADDRESS))?;
    let el = first(address, REGION)
        .or_else(|| first(address, REGION_ITEMPROP))
        .ok_or(DefaultedReason::MissingElement(REGION_ITEMPROP))?;
    non_empty(text_of(el), REGION_ITEMPROP)
}

fn zipcode(address: Option<ElementRef<'_>>) -> Extracted {
    let address = address.ok_or(DefaultedReason::MissingSection(MAILING_ADDRESS))?;
    let el = first(address, POSTAL_CODE).ok_or(DefaultedReason::MissingElement(POSTAL_CODE))?;
    non_empty(text_of(el), POSTAL_CODE)
}

/// The telephone span starts with a formatting character (a newline on the live site)
/// which is dropped before trimming.
fn phone(doc: &Html) -> Extracted {
    let el = first_in_doc(doc, TELEPHONE).ok_or(DefaultedReason::MissingElement(TELEPHONE))?;
    let raw = text_of(el);
    let mut chars = raw.chars();
    chars.next();
    non_empty(chars.as_str().to_string(), TELEPHONE)
}

fn non_empty(text: String, what: &'static str) -> Extracted {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(DefaultedReason::Empty(what))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve an extracted field, recording it as defaulted when it fell back.
fn or_default(
    field: SiteField,
    value: Extracted,
    fallback: &str,
    defaulted: &mut BTreeSet<SiteField>,
    site_url: &str,
) -> String {
    match value {
        Ok(v) => v,
        Err(reason) => {
            warn!(url = site_url, %field, %reason, fallback, "site field defaulted");
            defaulted.insert(field);
            fallback.to_string()
        }
    }
}

/// Parse a site detail page.
///
/// Only the title block is required. Every other field degrades to its placeholder.
pub fn parse_site(html: &str, site_url: &str) -> Result<Site> {
    let doc = Html::parse_document(html);
    let missing = |detail: &str| NpsError::MalformedPage {
        url: site_url.to_string(),
        detail: detail.to_string(),
    };

    let hero = first_in_doc(&doc, HERO).ok_or_else(|| missing("no title block"))?;
    let name = first(hero, HERO_TITLE)
        .map(|el| text_of(el).trim().to_string())
        .ok_or_else(|| missing("no site title"))?;

    let mut defaulted = BTreeSet::new();

    let category = match category(hero) {
        Ok(c) => Some(c),
        Err(reason) => {
            warn!(url = site_url, field = %SiteField::Category, %reason, "site field absent");
            defaulted.insert(SiteField::Category);
            None
        }
    };

    let address = first_in_doc(&doc, MAILING_ADDRESS);
    let city = or_default(SiteField::City, city(address), DEFAULT_CITY, &mut defaulted, site_url);
    let region = or_default(
        SiteField::Region,
        region(address),
        DEFAULT_REGION,
        &mut defaulted,
        site_url,
    );
    let zipcode = or_default(
        SiteField::Zipcode,
        zipcode(address),
        DEFAULT_ZIPCODE,
        &mut defaulted,
        site_url,
    );
    let phone = or_default(SiteField::Phone, phone(&doc), DEFAULT_PHONE, &mut defaulted, site_url);

    Ok(Site {
        name,
        category,
        address: format!("{}, {}", city, region),
        zipcode,
        phone,
        defaulted,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.nps.gov").unwrap()
    }

    #[test]
    fn test_all_selectors_parse() {
        let selectors = [
            STATE_MENU,
            HERO,
            HERO_TITLE,
            HERO_DESIGNATION,
            MAILING_ADDRESS,
            LOCALITY,
            REGION,
            REGION_ITEMPROP,
            POSTAL_CODE,
            TELEPHONE,
            PAGE_TITLE,
            SITE_LISTING,
            "a",
            "a[href]",
        ];
        for css in selectors {
            if let Err(e) = Selector::parse(css) {
                panic!("selector {:?} does not parse: {}", css, e);
            }
        }
    }

    #[test]
    fn test_parse_site_full_page() {
        let html = site_page(
            "Isle Royale",
            Some("National Park"),
            &mailing_address(
                "Houghton",
                r#"<span itemprop="addressRegion">MI</span>"#,
                " 49931 ",
            ),
            "\n906-482-0984\n",
        );
        let site = parse_site(&html, "https://www.nps.gov/isro/index.htm").unwrap();
        assert_eq!(site.name, "Isle Royale");
        assert_eq!(site.category.as_deref(), Some("National Park"));
        assert_eq!(site.address, "Houghton, MI");
        assert_eq!(site.zipcode, "49931");
        assert_eq!(site.phone, "906-482-0984");
        assert!(site.defaulted.is_empty());
    }

    #[test]
    fn test_region_class_wins_over_itemprop() {
        let html = site_page(
            "Sleeping Bear Dunes",
            Some("National Lakeshore"),
            &mailing_address(
                "Empire",
                r#"<span class="region">MI</span><span itemprop="addressRegion">XX</span>"#,
                "49630",
            ),
            " 231-326-4700",
        );
        let site = parse_site(&html, "u").unwrap();
        assert_eq!(site.address, "Empire, MI");
    }

    #[test]
    fn test_missing_region_defaults() {
        let html = site_page(
            "Pictured Rocks",
            Some("National Lakeshore"),
            &mailing_address("Munising", "", "49862"),
            "\n906-387-3700",
        );
        let site = parse_site(&html, "u").unwrap();
        assert_eq!(site.address, format!("Munising, {}", DEFAULT_REGION));
        assert!(site.is_defaulted(SiteField::Region));
        assert!(!site.is_defaulted(SiteField::City));
    }

    #[test]
    fn test_missing_address_block_defaults_city_region_zip() {
        let html = site_page("Keweenaw", None, "", "\n906-337-3168");
        let site = parse_site(&html, "u").unwrap();
        assert_eq!(site.address, format!("{}, {}", DEFAULT_CITY, DEFAULT_REGION));
        assert_eq!(site.zipcode, DEFAULT_ZIPCODE);
        assert_eq!(site.category, None);
        for f in [SiteField::Category, SiteField::City, SiteField::Region, SiteField::Zipcode] {
            assert!(site.is_defaulted(f), "{} should be defaulted", f);
        }
        assert!(!site.is_defaulted(SiteField::Phone));
    }

    #[test]
    fn test_blank_designation_is_kept_not_defaulted() {
        let html = site_page("Motor Cities", Some(""), "", "\n313-259-3425");
        let site = parse_site(&html, "u").unwrap();
        assert_eq!(site.category.as_deref(), Some(""));
        assert!(!site.is_defaulted(SiteField::Category));
    }

    #[test]
    fn test_missing_phone_defaults_non_empty() {
        let html = r#"<div class="Hero-titleContainer"><a class="Hero-title">X</a></div>"#;
        let site = parse_site(html, "u").unwrap();
        assert_eq!(site.phone, DEFAULT_PHONE);
        assert!(!site.zipcode.is_empty());
    }

    #[test]
    fn test_missing_title_is_fatal() {
        let html = r#"<html><body><div class="vcard"></div></body></html>"#;
        assert!(matches!(
            parse_site(html, "u"),
            Err(NpsError::MalformedPage { .. })
        ));
    }

    #[test]
    fn test_parse_state_index() {
        let html = catalog_page(&[
            ("Alabama", "/state/al/index.htm"),
            ("Michigan", "/state/mi/index.htm"),
        ]);
        let index = parse_state_index(&html, &base(), "https://www.nps.gov/index.htm").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("michigan").map(String::as_str),
            Some("https://www.nps.gov/state/mi/index.htm")
        );
        assert!(index.contains_key("alabama"));
    }

    #[test]
    fn test_state_index_without_menu_is_malformed() {
        let err = parse_state_index("<html></html>", &base(), "c").unwrap_err();
        assert!(matches!(err, NpsError::MalformedCatalog { .. }));
    }

    #[test]
    fn test_parse_state_page_keeps_document_order() {
        let html = state_page("Michigan", &["/isro/index.htm", "/piro/index.htm", "/slbe/index.htm"]);
        let page = parse_state_page(&html, "s");
        assert_eq!(page.name, "Michigan");
        assert_eq!(
            page.site_paths,
            vec!["/isro/index.htm", "/piro/index.htm", "/slbe/index.htm"]
        );
    }

    #[test]
    fn test_state_page_without_title_uses_url() {
        let page = parse_state_page("<html><body></body></html>", "https://www.nps.gov/state/xx/");
        assert_eq!(page.name, "https://www.nps.gov/state/xx/");
        assert!(page.site_paths.is_empty());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(resolve(&base(), "/isle-royale/"), "https://www.nps.gov/isle-royale/");
        assert_eq!(
            resolve(&base(), "https://other.test/x"),
            "https://other.test/x"
        );
    }
}
