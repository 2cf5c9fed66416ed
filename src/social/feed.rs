use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, Consultant, Post};
use crate::error::AppResult;
use crate::social::relations;

/// Filters for the public feed. Empty strings count as "no filter".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    /// Free text matched against consultant name, bio, specialization and
    /// post content.
    #[serde(rename = "q")]
    pub search: Option<String>,
    pub specialization: Option<String>,
}

impl FeedQuery {
    fn search_pattern(&self) -> Option<String> {
        non_empty(self.search.as_deref()).map(like_pattern)
    }

    fn specialization_pattern(&self) -> Option<String> {
        non_empty(self.specialization.as_deref()).map(like_pattern)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedEntry {
    pub post: Post,
    pub consultant: Consultant,
    pub like_count: i64,
    pub comments: Vec<Comment>,
    pub follower_count: i64,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `%text%` with LIKE wildcards in the input escaped, so the match is a
/// literal substring test.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// All posts joined with their consultant, newest first.
///
/// SQLite's LIKE is case-insensitive for ASCII, which gives the
/// case-insensitive substring semantics for both filters.
pub fn list_feed(conn: &Connection, query: &FeedQuery) -> AppResult<Vec<FeedEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {},
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id),
                (SELECT COUNT(*) FROM followers f WHERE f.consultant_id = c.id)
         FROM consultant_posts p
         JOIN consultants c ON c.id = p.consultant_id
         WHERE (?1 IS NULL OR c.specialization LIKE ?1 ESCAPE '\\')
           AND (?2 IS NULL
                OR c.name LIKE ?2 ESCAPE '\\'
                OR IFNULL(c.bio, '') LIKE ?2 ESCAPE '\\'
                OR p.content LIKE ?2 ESCAPE '\\'
                OR c.specialization LIKE ?2 ESCAPE '\\')
         ORDER BY p.created_at DESC, p.id DESC",
        Post::COLUMNS,
        Consultant::COLUMNS
    ))?;

    let counts_at = Post::WIDTH + Consultant::WIDTH;
    let rows = stmt
        .query_map(
            params![query.specialization_pattern(), query.search_pattern()],
            |row| {
                Ok((
                    Post::from_row_at(row, 0)?,
                    Consultant::from_row_at(row, Post::WIDTH)?,
                    row.get::<_, i64>(counts_at)?,
                    row.get::<_, i64>(counts_at + 1)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(post, consultant, like_count, follower_count)| {
            Ok(FeedEntry {
                comments: relations::comments_for_post(conn, post.id)?,
                post,
                consultant,
                like_count,
                follower_count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO consultants (id, name, email, specialization, bio) VALUES (1, 'Nina', 'n@x.io', 'Nutrition', 'Plant based meals');
             INSERT INTO consultants (id, name, email, specialization, bio) VALUES (2, 'Carl', 'c@x.io', 'Cardiology', NULL);
             INSERT INTO consultant_posts (id, consultant_id, content, created_at) VALUES (1, 1, 'Eat more fiber', '2025-01-01 08:00:00');
             INSERT INTO consultant_posts (id, consultant_id, content, created_at) VALUES (2, 2, 'Walk 30 minutes', '2025-01-02 08:00:00');
             INSERT INTO consultant_posts (id, consultant_id, content, created_at) VALUES (3, 1, '100% whole grain', '2025-01-03 08:00:00');",
        )
        .unwrap();
    }

    fn ids(entries: &[FeedEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.post.id).collect()
    }

    fn query(search: Option<&str>, specialization: Option<&str>) -> FeedQuery {
        FeedQuery {
            search: search.map(String::from),
            specialization: specialization.map(String::from),
        }
    }

    #[test]
    fn unfiltered_feed_is_newest_first() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);
        let feed = list_feed(&conn, &FeedQuery::default()).unwrap();
        assert_eq!(ids(&feed), vec![3, 2, 1]);
    }

    #[test]
    fn specialization_filter_is_case_insensitive_substring() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        let feed = list_feed(&conn, &query(None, Some("NUTRI"))).unwrap();
        assert_eq!(ids(&feed), vec![3, 1]);
        assert!(feed
            .iter()
            .all(|e| e.consultant.specialization.to_lowercase().contains("nutri")));

        assert!(list_feed(&conn, &query(None, Some("derm")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn search_matches_name_bio_content_or_specialization() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);

        assert_eq!(ids(&list_feed(&conn, &query(Some("carl"), None)).unwrap()), vec![2]);
        assert_eq!(ids(&list_feed(&conn, &query(Some("plant"), None)).unwrap()), vec![3, 1]);
        assert_eq!(ids(&list_feed(&conn, &query(Some("FIBER"), None)).unwrap()), vec![1]);
        assert_eq!(ids(&list_feed(&conn, &query(Some("cardio"), None)).unwrap()), vec![2]);
    }

    #[test]
    fn wildcards_in_search_are_literal() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);
        assert_eq!(ids(&list_feed(&conn, &query(Some("100%"), None)).unwrap()), vec![3]);
        assert!(list_feed(&conn, &query(Some("_x_"), None)).unwrap().is_empty());
    }

    #[test]
    fn empty_filters_are_ignored() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);
        assert_eq!(list_feed(&conn, &query(Some(""), Some(""))).unwrap().len(), 3);
    }

    #[test]
    fn both_filters_combine_with_and() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);
        let feed = list_feed(&conn, &query(Some("grain"), Some("nutrition"))).unwrap();
        assert_eq!(ids(&feed), vec![3]);
        assert!(list_feed(&conn, &query(Some("grain"), Some("cardio")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn entries_carry_counts_and_comments() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        seed(&conn);
        conn.execute_batch(
            "INSERT INTO likes (post_id, consultant_id) VALUES (1, 1);
             INSERT INTO followers (consultant_id, user_id) VALUES (1, NULL);
             INSERT INTO comments (post_id, consultant_id, body) VALUES (1, 1, 'Great tip!');",
        )
        .unwrap();

        let feed = list_feed(&conn, &query(Some("fiber"), None)).unwrap();
        let entry = &feed[0];
        assert_eq!(entry.like_count, 1);
        assert_eq!(entry.follower_count, 1);
        assert_eq!(entry.comments[0].body, "Great tip!");
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
