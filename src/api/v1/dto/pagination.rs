/*
 * Responsibility
 * - ?page=N を受け取り LIMIT/OFFSET に変換する
 * - page は 1 始まり (省略時、数値でない場合は 1)
 */
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(1)
    }

    /// `(limit, offset)` for the requested page.
    pub fn window(&self, rows_per_page: i64) -> Result<(i64, i64), &'static str> {
        let page = self.page();
        if page < 1 {
            return Err("page must be >= 1");
        }

        let offset = (page - 1)
            .checked_mul(rows_per_page)
            .ok_or("page out of range")?;

        Ok((rows_per_page, offset))
    }
}
