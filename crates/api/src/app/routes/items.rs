//! `GET /items`: filtered, ordered and paginated product listing.
//!
//! Response shape and link format follow page-number pagination:
//! `{count, next, previous, results}` where `next`/`previous` are absolute URLs
//! that keep every other query parameter. The link back to page 1 drops `page`.

use std::sync::Arc;

use axum::{
    extract::{Extension, OriginalUri, Query},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use thiserror::Error;
use url::Url;

use prodstats_core::Decimal;
use prodstats_products::{Ordering, PriceBound, ProductFilter};

use crate::app::dto::{Page, ProductDto};
use crate::app::errors;
use crate::app::services::AppServices;

const PAGE_PARAM: &str = "page";
const LAST_PAGE: &str = "last";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0}: Enter a number.")]
    InvalidNumber(&'static str),

    #[error("Invalid page.")]
    InvalidPage,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> axum::response::Response {
        match self {
            QueryError::InvalidNumber(_) => {
                errors::json_error(StatusCode::BAD_REQUEST, "validation_error", self.to_string())
            }
            QueryError::InvalidPage => errors::invalid_page(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u64),
    Last,
}

/// Parsed listing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsQuery {
    pub filter: ProductFilter,
    pub ordering: Ordering,
    pub page: PageRequest,
}

impl ItemsQuery {
    /// Parse raw query pairs. A repeated parameter takes its last value and
    /// empty values count as absent.
    pub fn parse(params: &[(String, String)]) -> Result<Self, QueryError> {
        let mut filter = ProductFilter::default();
        if let Some(category) = param(params, "category") {
            filter = filter.with_category(category);
        }
        if let Some(raw) = param(params, "price_min") {
            filter = filter.with_price_min(PriceBound::at_least(&decimal("price_min", raw)?));
        }
        if let Some(raw) = param(params, "price_max") {
            filter = filter.with_price_max(PriceBound::at_most(&decimal("price_max", raw)?));
        }

        let ordering = param(params, "ordering")
            .map(Ordering::parse)
            .unwrap_or_default();

        let page = match param(params, PAGE_PARAM) {
            None => PageRequest::Number(1),
            Some(raw) if raw.trim() == LAST_PAGE => PageRequest::Last,
            Some(raw) => PageRequest::Number(raw.trim().parse().map_err(|_| QueryError::InvalidPage)?),
        };

        Ok(Self {
            filter,
            ordering,
            page,
        })
    }
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn decimal(field: &'static str, raw: &str) -> Result<Decimal, QueryError> {
    raw.trim().parse().map_err(|_| QueryError::InvalidNumber(field))
}

/// Page arithmetic for a listing of `count` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
}

impl PageWindow {
    /// Resolve a requested page. An empty listing still has a (empty) first page.
    pub fn resolve(request: PageRequest, count: u64, page_size: u64) -> Result<Self, QueryError> {
        let page_size = page_size.max(1);
        let num_pages = count.div_ceil(page_size).max(1);
        let number = match request {
            PageRequest::Last => num_pages,
            PageRequest::Number(n) => n,
        };
        if number == 0 || number > num_pages {
            return Err(QueryError::InvalidPage);
        }
        Ok(Self {
            number,
            num_pages,
            offset: (number - 1) * page_size,
        })
    }

    pub fn next(&self) -> Option<u64> {
        (self.number < self.num_pages).then_some(self.number + 1)
    }

    pub fn previous(&self) -> Option<u64> {
        (self.number > 1).then_some(self.number - 1)
    }
}

/// Absolute link to another page of the same listing.
///
/// Other parameters are kept (sorted by name); page 1 is addressed without `page`.
pub fn page_link(base: &Url, params: &[(String, String)], page: u64) -> String {
    let mut pairs: Vec<(&str, String)> = params
        .iter()
        .filter(|(k, _)| k != PAGE_PARAM)
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    if page > 1 {
        pairs.push((PAGE_PARAM, page.to_string()));
    }
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut url = base.clone();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}

fn request_base(headers: &HeaderMap, path: &str) -> Option<Url> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    Url::parse(&format!("http://{host}{path}")).ok()
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> axum::response::Response {
    let query = match ItemsQuery::parse(&params) {
        Ok(q) => q,
        Err(e) => return e.into_response(),
    };

    let count = match services.store.count_products(&query.filter).await {
        Ok(c) => c,
        Err(e) => return errors::store_error_to_response(e),
    };

    let page_size = services.page_size as u64;
    let window = match PageWindow::resolve(query.page, count, page_size) {
        Ok(w) => w,
        Err(e) => return e.into_response(),
    };

    let products = match services
        .store
        .list_products(
            &query.filter,
            &query.ordering,
            services.page_size,
            usize::try_from(window.offset).unwrap_or(usize::MAX),
        )
        .await
    {
        Ok(p) => p,
        Err(e) => return errors::store_error_to_response(e),
    };

    let base = request_base(&headers, uri.path());
    if base.is_none() {
        tracing::warn!(path = %uri.path(), "cannot build absolute page links from Host header");
    }
    let link = |page: Option<u64>| match (&base, page) {
        (Some(base), Some(page)) => Some(page_link(base, &params, page)),
        _ => None,
    };

    let body = Page {
        count,
        next: link(window.next()),
        previous: link(window.previous()),
        results: products.into_iter().map(ProductDto::from).collect(),
    };

    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodstats_products::{OrderField, SortDirection};

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_filters_and_ignores_empty_values() {
        let q = ItemsQuery::parse(&pairs(&[
            ("category", "Books"),
            ("price_min", "10.001"),
            ("price_max", ""),
            ("ordering", "price"),
        ]))
        .unwrap();

        assert_eq!(q.filter.category.as_deref(), Some("Books"));
        assert_eq!(q.filter.price_min, Some(PriceBound::from_cents(1001)));
        assert_eq!(q.filter.price_max, None);
        assert_eq!(q.ordering.keys(), &[(OrderField::Price, SortDirection::Asc)]);
        assert_eq!(q.page, PageRequest::Number(1));
    }

    #[test]
    fn last_value_of_repeated_parameter_wins() {
        let q = ItemsQuery::parse(&pairs(&[("category", "Books"), ("category", "Toys")])).unwrap();
        assert_eq!(q.filter.category.as_deref(), Some("Toys"));
    }

    #[test]
    fn rejects_non_numeric_price() {
        let err = ItemsQuery::parse(&pairs(&[("price_max", "cheap")])).unwrap_err();
        assert_eq!(err, QueryError::InvalidNumber("price_max"));
        assert_eq!(err.to_string(), "price_max: Enter a number.");
    }

    #[test]
    fn page_parameter_forms() {
        let page = |raw: &str| ItemsQuery::parse(&pairs(&[("page", raw)])).map(|q| q.page);
        assert_eq!(page("3"), Ok(PageRequest::Number(3)));
        assert_eq!(page(""), Ok(PageRequest::Number(1)));
        assert_eq!(page("last"), Ok(PageRequest::Last));
        assert_eq!(page("two"), Err(QueryError::InvalidPage));
        assert_eq!(page("-1"), Err(QueryError::InvalidPage));
    }

    #[test]
    fn window_bounds() {
        let w = PageWindow::resolve(PageRequest::Number(2), 45, 20).unwrap();
        assert_eq!((w.number, w.num_pages, w.offset), (2, 3, 20));
        assert_eq!((w.previous(), w.next()), (Some(1), Some(3)));

        let last = PageWindow::resolve(PageRequest::Last, 45, 20).unwrap();
        assert_eq!((last.number, last.next()), (3, None));

        assert_eq!(PageWindow::resolve(PageRequest::Number(4), 45, 20), Err(QueryError::InvalidPage));
        assert_eq!(PageWindow::resolve(PageRequest::Number(0), 45, 20), Err(QueryError::InvalidPage));
    }

    #[test]
    fn empty_listing_has_a_first_page() {
        let w = PageWindow::resolve(PageRequest::Number(1), 0, 20).unwrap();
        assert_eq!((w.num_pages, w.offset, w.next(), w.previous()), (1, 0, None, None));
        assert!(PageWindow::resolve(PageRequest::Number(2), 0, 20).is_err());
    }

    #[test]
    fn links_keep_other_parameters_sorted() {
        let base = Url::parse("http://testserver/api/items").unwrap();
        let params = pairs(&[("page", "2"), ("ordering", "-price"), ("category", "Home Office")]);

        assert_eq!(
            page_link(&base, &params, 3),
            "http://testserver/api/items?category=Home+Office&ordering=-price&page=3"
        );
        assert_eq!(
            page_link(&base, &params, 1),
            "http://testserver/api/items?category=Home+Office&ordering=-price"
        );
        assert_eq!(page_link(&base, &[], 1), "http://testserver/api/items");
    }
}
