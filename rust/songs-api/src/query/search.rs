use super::contains_pattern;
use crate::{
    error::{Result, ServiceError},
    models::SongRow,
    schema::songs::dsl::{id as col_id, songs, text as col_text},
};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

fn matching_rows_query(needle: &str) -> crate::schema::songs::BoxedQuery<'static, Pg> {
    songs
        .filter(col_text.ilike(contains_pattern(needle)))
        .order(col_id.asc())
        .into_boxed()
}

/// Coarse storage-side filter: every song whose lyrics contain `needle`
/// anywhere, including across line breaks. Callers refine per line.
pub async fn load_matching_rows(conn: &mut AsyncPgConnection, needle: &str) -> Result<Vec<SongRow>> {
    matching_rows_query(needle)
        .load::<SongRow>(conn)
        .await
        .map_err(ServiceError::database("failed to search song text"))
}

pub fn search_query_sql(needle: &str) -> String {
    diesel::debug_query::<Pg, _>(&matching_rows_query(needle)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_uses_single_ilike_bind() {
        let sql = search_query_sql("Night");
        let lower = sql.to_lowercase();
        assert!(lower.contains("\"songs\".\"text\" ilike $1"), "{sql}");
        assert!(lower.contains("order by \"songs\".\"id\" asc"), "{sql}");
        assert!(sql.contains("binds: [\"%Night%\"]"), "{sql}");
    }
}
