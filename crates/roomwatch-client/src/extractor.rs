use roomwatch_core::error::AppError;
use roomwatch_core::models::EntryIdentity;
use scraper::{ElementRef, Html, Selector};

pub const DEFAULT_ITEM_SELECTOR: &str = "li.object-list__item";
pub const DEFAULT_NAME_SELECTOR: &str = "h2.object-list__headline";
pub const DEFAULT_ADDRESS_SELECTOR: &str = "div.object-list__address p";

/// CSS selectors locating listings in a results page.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub item: String,
    pub name: String,
    pub address: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: DEFAULT_ITEM_SELECTOR.into(),
            name: DEFAULT_NAME_SELECTOR.into(),
            address: DEFAULT_ADDRESS_SELECTOR.into(),
        }
    }
}

/// Turns a results page into entry identities.
///
/// Each item element must contain a name element and an address element;
/// items missing either are skipped.
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    item: Selector,
    name: Selector,
    address: Selector,
}

impl ListingExtractor {
    pub fn new(selectors: &ListingSelectors) -> Result<Self, AppError> {
        Ok(Self {
            item: parse_selector(&selectors.item)?,
            name: parse_selector(&selectors.name)?,
            address: parse_selector(&selectors.address)?,
        })
    }

    pub fn extract(&self, html: &str) -> Vec<EntryIdentity> {
        let document = Html::parse_document(html);
        let items: Vec<ElementRef<'_>> = document.select(&self.item).collect();
        tracing::debug!(count = items.len(), "Found listing elements");

        let mut entries = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let name = item.select(&self.name).next().map(element_text);
            let address = item.select(&self.address).next().map(element_lines);

            match (name, address) {
                (Some(name), Some(address)) => match EntryIdentity::from_parts(&name, &address) {
                    Some(entry) => {
                        tracing::trace!(%entry, "Listing found");
                        entries.push(entry);
                    }
                    None => tracing::debug!(element = i + 1, "Listing has an empty name or address"),
                },
                _ => tracing::debug!(element = i + 1, "Incomplete listing element skipped"),
            }
        }
        entries
    }
}

fn parse_selector(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Text of an element with each text node on its own line.
///
/// `<br>`-separated address parts end up as separate lines that
/// [`EntryIdentity::from_parts`] joins with `", "`.
fn element_lines(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><ul>
          <li class="object-list__item">
            <h2 class="object-list__headline">  Helle 2-Zimmer-Wohnung </h2>
            <div class="object-list__address"><p>Hauptstr. 1<br>10115 Berlin</p></div>
          </li>
          <li class="object-list__item">
            <h2 class="object-list__headline">Ohne Adresse</h2>
          </li>
          <li class="object-list__item">
            <div class="object-list__address"><p>Nur Adresse 5</p></div>
          </li>
          <li class="object-list__item">
            <h2 class="object-list__headline">Altbau</h2>
            <div class="object-list__address"><p>Ringstr.   7
               12345 Berlin</p></div>
          </li>
        </ul></body></html>
    "#;

    fn extractor() -> ListingExtractor {
        ListingExtractor::new(&ListingSelectors::default()).unwrap()
    }

    fn names(entries: &[EntryIdentity]) -> Vec<&str> {
        entries.iter().map(EntryIdentity::as_str).collect()
    }

    #[test]
    fn test_extracts_complete_listings_only() {
        let entries = extractor().extract(PAGE);
        assert_eq!(
            names(&entries),
            vec![
                "Helle 2-Zimmer-Wohnung - Hauptstr. 1, 10115 Berlin",
                "Altbau - Ringstr. 7, 12345 Berlin",
            ]
        );
    }

    #[test]
    fn test_empty_page_has_no_entries() {
        let entries = extractor().extract("<html><body></body></html>");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_blank_name_is_skipped() {
        let html = r#"<li class="object-list__item">
            <h2 class="object-list__headline">   </h2>
            <div class="object-list__address"><p>Addr 1</p></div></li>"#;
        assert!(extractor().extract(html).is_empty());
    }

    #[test]
    fn test_custom_selectors() {
        let selectors = ListingSelectors {
            item: "article.flat".into(),
            name: ".title".into(),
            address: ".where".into(),
        };
        let html = r#"<article class="flat"><span class="title">Loft</span>
            <span class="where">Dock 3</span></article>"#;
        let entries = ListingExtractor::new(&selectors).unwrap().extract(html);
        assert_eq!(names(&entries), vec!["Loft - Dock 3"]);
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let selectors = ListingSelectors {
            item: "li[".into(),
            ..ListingSelectors::default()
        };
        let err = ListingExtractor::new(&selectors).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
