//! Query string construction and shared pagination loops

use std::future::Future;

use super::error::ApiError;

/// Builder for URL query parameters with proper encoding
#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn add_optional(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.params.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Render as `?k=v&...`, empty string when no parameters were added
    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let encoded: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("?{}", encoded.join("&"))
    }
}

/// Collect every page of an offset/limit listing. The callback fetches one
/// page at the given offset; a page shorter than `limit` is the last one.
/// Pages are fetched sequentially and failures are not retried.
pub async fn collect_offset_pages<T, F, Fut>(limit: usize, mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
    let mut items = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch(offset, limit).await?;
        let count = page.len();
        items.extend(page);
        if count < limit {
            return Ok(items);
        }
        offset += count;
    }
}

/// Collect every page of a continuation-marker listing. The callback fetches
/// the page after the given marker and returns it with the next marker; a
/// missing or empty next marker ends the walk.
pub async fn collect_marker_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>), ApiError>>,
{
    let mut items = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let (page, next) = fetch(marker.take()).await?;
        items.extend(page);
        match next {
            Some(next) if !next.is_empty() => marker = Some(next),
            _ => return Ok(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn query_params_encode_values() {
        let query = ApiQueryParams::new()
            .add("log_transfer_id", "id with space")
            .add_optional("marker", None::<String>)
            .add_optional("limit", Some(50))
            .to_query_string();
        assert_eq!(query, "?log_transfer_id=id%20with%20space&limit=50");

        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[tokio::test]
    async fn offset_pager_stops_on_short_page() {
        let calls = AtomicUsize::new(0);
        let items = collect_offset_pages(2, |offset, limit| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_eq!(limit, 2);
                let all = vec![10, 20, 30];
                Ok(all.into_iter().skip(offset).take(limit).collect())
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![10, 20, 30]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn offset_pager_handles_empty_listing() {
        let items: Vec<i32> = collect_offset_pages(10, |_, _| async { Ok(Vec::new()) })
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn marker_pager_follows_continuations_until_empty() {
        let items = collect_marker_pages(|marker| async move {
            match marker.as_deref() {
                None => Ok((vec!["a", "b"], Some("m1".to_string()))),
                Some("m1") => Ok((vec!["c"], Some(String::new()))),
                other => panic!("unexpected marker: {other:?}"),
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec!["a", "b", "c"]);
    }
}
