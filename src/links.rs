//! 一覧ページからの商品リンク抽出

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::selector::{Selector, SelectorCascade};
use crate::traits::PageSource;

/// 商品URLを示すパス上の目印
const PRODUCT_MARKER: &str = "product";

/// 相対URLを解決し、同一ホストの商品URLであれば正規化済みURLを返す
pub fn normalize_product_url(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let base = Url::parse(base_url).ok()?;
    // 絶対URL・スキーム相対・文書相対のいずれも join で解決できる
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);

    if !resolved.path().to_lowercase().contains(PRODUCT_MARKER) {
        return None;
    }
    if resolved.host_str() != base.host_str() {
        return None;
    }
    Some(resolved.to_string())
}

pub fn is_valid_product_url(href: &str, base_url: &str) -> bool {
    normalize_product_url(href, base_url).is_some()
}

/// 挿入順を保持する重複なしのURL集合
#[derive(Debug, Clone)]
pub struct LinkSet {
    base_url: String,
    links: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            links: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// 正規化・検証のうえ未登録なら追加。追加したら true
    pub fn admit(&mut self, href: &str) -> bool {
        let Some(url) = normalize_product_url(href, &self.base_url) else {
            debug!("Rejected non-product link: {}", href);
            return false;
        };
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.links.push(url);
        true
    }

    /// 追加できた件数を返す
    pub fn extend<I, S>(&mut self, hrefs: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut admitted = 0;
        for href in hrefs {
            if self.admit(href.as_ref()) {
                admitted += 1;
            }
        }
        admitted
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.links
    }

    pub fn into_vec(self) -> Vec<String> {
        self.links
    }
}

/// 収集リンクの重複統計
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkStats {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub duplicate_percentage: f64,
}

impl LinkStats {
    pub fn new(total: usize, unique: usize) -> Self {
        let duplicates = total.saturating_sub(unique);
        let duplicate_percentage = if total > 0 {
            duplicates as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total,
            unique,
            duplicates,
            duplicate_percentage,
        }
    }

    pub fn from_links(links: &[String]) -> Self {
        let unique = links.iter().collect::<HashSet<_>>().len();
        Self::new(links.len(), unique)
    }

    pub fn log(&self) {
        info!("=== LINK SCRAPING RESULTS ===");
        info!("Total links found: {}", self.total);
        info!("Unique links: {}", self.unique);
        info!("Duplicates removed: {}", self.duplicates);
        info!("Duplicate percentage: {:.1}%", self.duplicate_percentage);
    }
}

/// 一覧ページの商品アイテムからリンクを取り出す（ページ間の重複排除はしない）
#[derive(Debug, Clone)]
pub struct LinkCollector {
    base_url: String,
    item_selectors: Vec<Selector>,
    link_selectors: Vec<Selector>,
}

impl LinkCollector {
    pub fn new(
        base_url: impl Into<String>,
        item_selectors: Vec<Selector>,
        link_selectors: Vec<Selector>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            item_selectors,
            link_selectors,
        }
    }

    /// 現在ページの商品URLを文書順で返す。失敗はログに残して空を返す
    pub async fn collect<S: PageSource>(&self, source: &S) -> Vec<String> {
        let items = self.find_items(source).await;
        if items.is_empty() {
            warn!("No product items found with any selector");
            return Vec::new();
        }

        let mut links = Vec::with_capacity(items.len());
        for item in &items {
            let Some(href) = self.item_href(source, item).await else {
                continue;
            };
            match normalize_product_url(&href, &self.base_url) {
                Some(url) => {
                    debug!("Extracted link: {}", url);
                    links.push(url);
                }
                None => debug!("Skipped non-product link: {}", href),
            }
        }
        links
    }

    /// 1件以上ヒットした最初のセレクタの結果だけを使う
    async fn find_items<S: PageSource>(&self, source: &S) -> Vec<S::Element> {
        for selector in &self.item_selectors {
            match source.find_all(None, selector).await {
                Ok(items) if !items.is_empty() => {
                    debug!("Found {} items using selector: {}", items.len(), selector);
                    return items;
                }
                Ok(_) => debug!("Selector {} matched no items", selector),
                Err(e) => debug!("Selector {} failed: {}", selector, e),
            }
        }
        Vec::new()
    }

    async fn item_href<S: PageSource>(&self, source: &S, item: &S::Element) -> Option<String> {
        let cascade = SelectorCascade::new(&self.link_selectors, Duration::ZERO);
        let (anchor, _) = cascade.element(source, Some(item)).await?;
        match source.attribute(&anchor, "href").await {
            Ok(href) => href,
            Err(e) => {
                debug!("Error reading href from item: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::selectors;
    use crate::testing::{FixtureElement, FixturePage, FixtureSource};

    const BASE: &str = "https://wineworld.lk";
    const LISTING: &str = "https://wineworld.lk/product-category/wines/";

    fn collector() -> LinkCollector {
        LinkCollector::new(
            BASE,
            selectors(["//ul[@class='products column-3']/li", ".products li"]),
            selectors(["a", "a[href*='product']"]),
        )
    }

    #[test]
    fn test_relative_product_url_resolves_against_base() {
        assert_eq!(
            normalize_product_url("/product/foo", BASE).as_deref(),
            Some("https://wineworld.lk/product/foo")
        );
        assert!(is_valid_product_url("/product/foo", BASE));
    }

    #[test]
    fn test_document_relative_and_scheme_relative_urls_resolve() {
        assert_eq!(
            normalize_product_url("product/foo/", BASE).as_deref(),
            Some("https://wineworld.lk/product/foo/")
        );
        assert_eq!(
            normalize_product_url("../product/x/", "https://wineworld.lk/shop/").as_deref(),
            Some("https://wineworld.lk/product/x/")
        );
        assert_eq!(
            normalize_product_url("//wineworld.lk/product/y/", BASE).as_deref(),
            Some("https://wineworld.lk/product/y/")
        );
        assert!(!is_valid_product_url("//evil.example/product/y/", BASE));
    }

    #[test]
    fn test_fragment_is_dropped() {
        assert_eq!(
            normalize_product_url("/product/a/#reviews", BASE).as_deref(),
            Some("https://wineworld.lk/product/a/")
        );

        let mut set = LinkSet::new(BASE);
        assert!(set.admit("https://wineworld.lk/product/a/"));
        assert!(!set.admit("/product/a/#reviews"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_foreign_domain_rejected_even_with_product_marker() {
        assert!(!is_valid_product_url("https://evil.example/product/foo", BASE));
        assert!(!is_valid_product_url(
            "https://evil.example/?next=https://wineworld.lk/product/foo",
            BASE
        ));
    }

    #[test]
    fn test_non_product_or_empty_url_rejected() {
        assert!(!is_valid_product_url("https://wineworld.lk/about-us/", BASE));
        assert!(!is_valid_product_url("", BASE));
        assert!(!is_valid_product_url("   ", BASE));
        assert!(!is_valid_product_url("javascript:void(0)", BASE));
    }

    #[test]
    fn test_link_set_dedup_preserves_order() {
        let a = "https://wineworld.lk/product/a/";
        let b = "https://wineworld.lk/product/b/";
        let c = "https://wineworld.lk/product/c/";
        let mut set = LinkSet::new(BASE);

        let admitted = set.extend([a, b, a, c, b]);

        assert_eq!(admitted, 3);
        assert_eq!(set.as_slice(), &[a, b, c]);
        assert!(set.contains(b));
    }

    #[test]
    fn test_link_set_dedups_relative_against_absolute() {
        let mut set = LinkSet::new(BASE);
        assert!(set.admit("https://wineworld.lk/product/a/"));
        assert!(!set.admit("/product/a/"));
        assert!(!set.admit("https://other.example/product/a/"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_link_stats() {
        let links: Vec<String> = ["a", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        let stats = LinkStats::from_links(&links);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.unique, 3);
        assert_eq!(stats.duplicates, 1);
        assert!((stats.duplicate_percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(LinkStats::new(0, 0).duplicate_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_collect_uses_first_matching_item_selector() {
        let page = FixturePage::new()
            .with("//ul[@class='products column-3']/li", FixtureElement::item("/product/a/"))
            .with(
                "//ul[@class='products column-3']/li",
                FixtureElement::item("https://wineworld.lk/product/b/"),
            )
            .with(".products li", FixtureElement::item("/product/ignored/"));
        let source = FixtureSource::new().with_page(LISTING, page);
        source.open(LISTING);

        let links = collector().collect(&source).await;

        assert_eq!(
            links,
            vec![
                "https://wineworld.lk/product/a/".to_string(),
                "https://wineworld.lk/product/b/".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_falls_back_and_keeps_duplicates() {
        let qualified = FixtureElement::default()
            .with_child("a[href*='product']", FixtureElement::link("/product/c/"));
        let page = FixturePage::new()
            .failing("//ul[@class='products column-3']/li")
            .with(".products li", FixtureElement::item("/product/a/"))
            .with(".products li", FixtureElement::item("/product/a/"))
            .with(".products li", FixtureElement::item("https://facebook.com/share"))
            .with(".products li", FixtureElement::default())
            .with(".products li", qualified);
        let source = FixtureSource::new().with_page(LISTING, page);
        source.open(LISTING);

        let links = collector().collect(&source).await;

        assert_eq!(
            links,
            vec![
                "https://wineworld.lk/product/a/".to_string(),
                "https://wineworld.lk/product/a/".to_string(),
                "https://wineworld.lk/product/c/".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_empty_page() {
        let source = FixtureSource::new().with_page(LISTING, FixturePage::new());
        source.open(LISTING);
        assert!(collector().collect(&source).await.is_empty());
    }
}
