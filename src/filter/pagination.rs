use crate::config::FilterConfig;

/// `limit` value meaning "no limit"
pub const UNBOUNDED: i64 = -1;

/// Canonical (limit, offset, page) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
    pub page: i64,
}

/// Query shape a pagination spec compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWindow {
    /// `LIMIT limit OFFSET offset`, with a total count
    Paged { limit: i64, offset: i64 },
    /// No limit or offset clause
    Unbounded,
    /// `OFFSET offset` without a limit
    UnboundedFrom { offset: i64 },
}

impl Pagination {
    /// Build the triple from raw query values. Explicit values always win
    /// over derived ones.
    pub fn from_params(
        limit: Option<&str>,
        offset: Option<&str>,
        page: Option<&str>,
        config: &FilterConfig,
    ) -> Self {
        let limit = match parse(limit) {
            Some(UNBOUNDED) => UNBOUNDED,
            Some(l) if l >= 0 => l,
            _ => config.default_limit,
        };

        if limit == UNBOUNDED {
            return Self { limit, offset: parse(offset).unwrap_or(0).max(0), page: 0 };
        }

        let limit = match config.max_limit {
            Some(max) if limit > max => {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                max
            }
            _ => limit,
        };

        let explicit_offset = parse(offset).map(|o| o.max(0));
        let explicit_page = parse(page).map(|p| p.max(0));

        let (offset, explicit_page) = match explicit_offset {
            Some(offset) => (offset, explicit_page),
            None => match explicit_page.unwrap_or(0).checked_mul(limit) {
                Some(offset) => (offset, explicit_page),
                None => {
                    tracing::warn!("Page {:?} overflows the offset, using the first page", explicit_page);
                    (0, None)
                }
            },
        };
        let page = match explicit_page {
            Some(page) => page,
            None if limit > 0 => offset / limit,
            None => 0,
        };

        Self { limit, offset, page }
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit == UNBOUNDED
    }

    pub fn window(&self) -> PageWindow {
        match (self.is_unbounded(), self.offset) {
            (true, 0) => PageWindow::Unbounded,
            (true, offset) => PageWindow::UnboundedFrom { offset },
            (false, offset) => PageWindow::Paged { limit: self.limit, offset },
        }
    }
}

impl PageWindow {
    pub fn to_sql(&self) -> String {
        match self {
            PageWindow::Paged { limit, offset } => format!("LIMIT {} OFFSET {}", limit, offset),
            PageWindow::Unbounded => String::new(),
            PageWindow::UnboundedFrom { offset } => format!("OFFSET {}", offset),
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, PageWindow::Paged { .. })
    }
}

fn parse(value: Option<&str>) -> Option<i64> {
    value.map(str::trim).filter(|v| !v.is_empty()).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginate(limit: Option<&str>, offset: Option<&str>, page: Option<&str>) -> Pagination {
        Pagination::from_params(limit, offset, page, &FilterConfig::default())
    }

    #[test]
    fn defaults_to_first_page_of_twenty() {
        assert_eq!(paginate(None, None, None), Pagination { limit: 20, offset: 0, page: 0 });
    }

    #[test]
    fn page_derives_offset() {
        assert_eq!(paginate(Some("10"), None, Some("3")), Pagination { limit: 10, offset: 30, page: 3 });
    }

    #[test]
    fn offset_derives_page() {
        assert_eq!(paginate(Some("10"), Some("25"), None), Pagination { limit: 10, offset: 25, page: 2 });
    }

    #[test]
    fn explicit_offset_and_page_both_win() {
        assert_eq!(paginate(Some("10"), Some("5"), Some("7")), Pagination { limit: 10, offset: 5, page: 7 });
    }

    #[test]
    fn unbounded_without_offset_has_no_clause() {
        let p = paginate(Some("-1"), None, Some("4"));
        assert_eq!(p, Pagination { limit: -1, offset: 0, page: 0 });
        assert_eq!(p.window(), PageWindow::Unbounded);
        assert_eq!(p.window().to_sql(), "");
    }

    #[test]
    fn unbounded_with_offset_keeps_offset_only() {
        let p = paginate(Some("-1"), Some("5"), None);
        assert_eq!(p, Pagination { limit: -1, offset: 5, page: 0 });
        assert_eq!(p.window(), PageWindow::UnboundedFrom { offset: 5 });
        assert_eq!(p.window().to_sql(), "OFFSET 5");
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        assert_eq!(paginate(Some("abc"), Some("x"), Some("")), Pagination { limit: 20, offset: 0, page: 0 });
        assert_eq!(paginate(Some("-7"), Some("-3"), None), Pagination { limit: 20, offset: 0, page: 0 });
    }

    #[test]
    fn zero_limit_stays_on_page_zero() {
        assert_eq!(paginate(Some("0"), Some("9"), None), Pagination { limit: 0, offset: 9, page: 0 });
    }

    #[test]
    fn max_limit_caps_bounded_pages_only() {
        let config = FilterConfig { max_limit: Some(50), ..FilterConfig::default() };
        let capped = Pagination::from_params(Some("500"), None, Some("2"), &config);
        assert_eq!(capped, Pagination { limit: 50, offset: 100, page: 2 });
        let unbounded = Pagination::from_params(Some("-1"), None, None, &config);
        assert!(unbounded.is_unbounded());
    }

    #[test]
    fn overflowing_page_falls_back_to_first_page() {
        assert_eq!(
            paginate(Some("20"), None, Some("922337203685477580")),
            Pagination { limit: 20, offset: 0, page: 0 }
        );
        let huge = i64::MAX.to_string();
        assert_eq!(
            paginate(Some(&huge), None, Some("2")),
            Pagination { limit: i64::MAX, offset: 0, page: 0 }
        );
    }

    #[test]
    fn paged_window_renders_limit_and_offset() {
        assert_eq!(paginate(Some("10"), None, Some("1")).window().to_sql(), "LIMIT 10 OFFSET 10");
    }
}
