use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::models::{profile_path, Post, PostId, UserId};
use crate::social::emoji::Emoji;
use crate::social::error::{ServiceError, ServiceResult};
use crate::social::identity::like_pattern;
use crate::state::DbPool;

/// Breakdowns keep at most this many emoji with non-zero counts.
pub const BREAKDOWN_TOP_N: u32 = 3;

/// Posts on the combo board need this many distinct emoji.
pub const COMBO_MIN_DISTINCT: i64 = 3;

/// `/top` ranking variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopFilter {
    All,
    Combo,
    Emoji(Emoji),
}

impl TopFilter {
    /// Unrecognised values rank everything.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("combo") => TopFilter::Combo,
            Some(s) => Emoji::parse(s).map_or(TopFilter::All, TopFilter::Emoji),
            None => TopFilter::All,
        }
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            TopFilter::All => "all",
            TopFilter::Combo => "combo",
            TopFilter::Emoji(e) => e.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    /// Posts by accounts the viewer follows, newest first.
    Following(UserId),
    /// Every post, newest first.
    Recent,
    Top(TopFilter),
    /// One author's posts, newest first.
    Author(UserId),
    /// Posts whose text contains the query, newest first.
    Search(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionCount {
    pub emoji: Emoji,
    pub count: i64,
}

/// Per-emoji counts for one post. Every allowed emoji is present; only the
/// most frequent [`BREAKDOWN_TOP_N`] can be non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionBreakdown {
    counts: Vec<ReactionCount>,
}

impl ReactionBreakdown {
    /// Zero-filled breakdown from already-truncated grouped counts.
    pub fn from_top(top: &[(Emoji, i64)]) -> Self {
        let counts = Emoji::ALL
            .into_iter()
            .map(|emoji| ReactionCount {
                emoji,
                count: top
                    .iter()
                    .find(|(e, _)| *e == emoji)
                    .map_or(0, |(_, n)| *n),
            })
            .collect();
        Self { counts }
    }

    /// Counts in display order.
    pub fn counts(&self) -> &[ReactionCount] {
        &self.counts
    }

    pub fn get(&self, emoji: Emoji) -> i64 {
        self.counts
            .iter()
            .find(|c| c.emoji == emoji)
            .map_or(0, |c| c.count)
    }

    pub fn total(&self) -> i64 {
        self.counts.iter().map(|c| c.count).sum()
    }
}

/// A post as the feed pages render it.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub username: String,
    pub profile_image: String,
    pub viewer_reaction: Option<Emoji>,
    pub breakdown: ReactionBreakdown,
    pub can_delete: bool,
}

impl PostView {
    pub fn author_path(&self) -> String {
        profile_path(&self.username)
    }

    pub fn display_time(&self) -> String {
        format_timestamp(&self.post.timestamp)
    }

    /// Whether the viewer's current reaction is `emoji`.
    pub fn reacted_with(&self, emoji: &Emoji) -> bool {
        self.viewer_reaction == Some(*emoji)
    }
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    /// The following feed was empty and discovery posts were shown instead.
    pub fallback: bool,
}

/// List posts for `mode`, annotated for `viewer`.
pub fn compose(
    pool: &DbPool,
    viewer: Option<UserId>,
    mode: &FeedMode,
    limit: u32,
) -> ServiceResult<Vec<PostView>> {
    if let FeedMode::Search(q) = mode {
        if q.trim().is_empty() {
            return Ok(Vec::new());
        }
    }

    let (join, filter, order, arg) = match mode {
        FeedMode::Following(follower) => (
            "JOIN follows ON follows.followed_id = posts.user_id",
            "WHERE follows.follower_id = ?3",
            RECENT,
            Some(Value::Integer(*follower)),
        ),
        FeedMode::Recent => ("", "", RECENT, None),
        FeedMode::Top(TopFilter::All) => ("", "", BY_SMILES, None),
        FeedMode::Top(TopFilter::Emoji(e)) => (
            "JOIN (SELECT post_id, COUNT(*) AS n FROM post_smiles
                   WHERE reaction_emoji = ?3 GROUP BY post_id) ranked
             ON ranked.post_id = posts.id",
            "",
            BY_RANKED,
            Some(Value::Text(e.as_str().to_string())),
        ),
        FeedMode::Top(TopFilter::Combo) => (
            "JOIN (SELECT post_id, COUNT(DISTINCT reaction_emoji) AS n FROM post_smiles
                   GROUP BY post_id HAVING COUNT(DISTINCT reaction_emoji) >= ?3) ranked
             ON ranked.post_id = posts.id",
            "",
            BY_RANKED,
            Some(Value::Integer(COMBO_MIN_DISTINCT)),
        ),
        FeedMode::Author(author) => (
            "",
            "WHERE posts.user_id = ?3",
            RECENT,
            Some(Value::Integer(*author)),
        ),
        FeedMode::Search(q) => (
            "",
            "WHERE posts.content LIKE ?3 ESCAPE '\\'",
            RECENT,
            Some(Value::Text(like_pattern(q.trim()))),
        ),
    };

    let sql = format!(
        "{} {} {} ORDER BY {} LIMIT ?2",
        view_select(),
        join,
        filter,
        order
    );

    let mut args = vec![viewer.map_or(Value::Null, Value::Integer), Value::Integer(limit.into())];
    args.extend(arg);

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| view_from_row(row, viewer))?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|mut view| {
            view.breakdown = breakdown(&conn, view.post.id)?;
            Ok(view)
        })
        .collect()
}

/// The viewer's following feed, optionally falling back to recent posts
/// from everyone when it would be empty.
pub fn following(
    pool: &DbPool,
    viewer: UserId,
    limit: u32,
    discovery_fallback: bool,
) -> ServiceResult<FeedPage> {
    let posts = compose(pool, Some(viewer), &FeedMode::Following(viewer), limit)?;
    if posts.is_empty() && discovery_fallback {
        let posts = compose(pool, Some(viewer), &FeedMode::Recent, limit)?;
        return Ok(FeedPage {
            fallback: !posts.is_empty(),
            posts,
        });
    }
    Ok(FeedPage {
        posts,
        fallback: false,
    })
}

/// One post with the same annotation as the listings.
pub fn single(pool: &DbPool, viewer: Option<UserId>, id: PostId) -> ServiceResult<PostView> {
    let conn = pool.get()?;
    let sql = format!("{} WHERE posts.id = ?2", view_select());
    let view = conn
        .query_row(
            &sql,
            params![viewer, id],
            |row| view_from_row(row, viewer),
        )
        .optional()?;

    let mut view = view.ok_or_else(|| ServiceError::NotFound("Post not found".into()))?;
    view.breakdown = breakdown(&conn, id)?;
    Ok(view)
}

/// Group a post's reactions by emoji, count each group and keep the most
/// frequent few. Ties break on the emoji text.
pub fn breakdown(conn: &Connection, post: PostId) -> ServiceResult<ReactionBreakdown> {
    let mut stmt = conn.prepare_cached(
        "SELECT reaction_emoji, COUNT(*) AS n FROM post_smiles
         WHERE post_id = ?1
         GROUP BY reaction_emoji
         ORDER BY n DESC, reaction_emoji
         LIMIT ?2",
    )?;
    let top = stmt
        .query_map(params![post, BREAKDOWN_TOP_N], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let top: Vec<(Emoji, i64)> = top
        .into_iter()
        .filter_map(|(raw, n)| Emoji::parse(&raw).map(|e| (e, n)))
        .collect();
    Ok(ReactionBreakdown::from_top(&top))
}

/// Render a stored `YYYY-MM-DD HH:MM:SS` timestamp as `mm/dd/yy, h:mmam`.
pub fn format_timestamp(raw: &str) -> String {
    let trimmed = raw.split('.').next().unwrap_or(raw);
    match NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        Ok(dt) => dt
            .format("%m/%d/%y, %I:%M%p")
            .to_string()
            .replace(" 0", " ")
            .to_lowercase(),
        Err(_) => raw.to_string(),
    }
}

const RECENT: &str = "posts.timestamp DESC, posts.id DESC";
const BY_SMILES: &str = "posts.smiles DESC, posts.timestamp DESC, posts.id DESC";
const BY_RANKED: &str = "ranked.n DESC, posts.smiles DESC, posts.timestamp DESC, posts.id DESC";

// ?1 is always the viewer id (NULL when anonymous)
fn view_select() -> String {
    format!(
        "SELECT {}, users.username, users.profile_image,
            (SELECT reaction_emoji FROM post_smiles
             WHERE post_smiles.post_id = posts.id AND post_smiles.user_id = ?1) AS viewer_reaction
         FROM posts
         JOIN users ON users.id = posts.user_id",
        Post::COLUMNS
    )
}

fn view_from_row(row: &Row<'_>, viewer: Option<UserId>) -> rusqlite::Result<PostView> {
    let post = Post::from_row(row)?;
    let viewer_reaction: Option<String> = row.get(9)?;
    Ok(PostView {
        can_delete: viewer == Some(post.user_id),
        post,
        username: row.get(7)?,
        profile_image: row.get(8)?,
        viewer_reaction: viewer_reaction.as_deref().and_then(Emoji::parse),
        breakdown: ReactionBreakdown::from_top(&[]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_zero_fills_every_emoji() {
        let b = ReactionBreakdown::from_top(&[(Emoji::Joy, 4), (Emoji::Party, 1)]);
        assert_eq!(b.counts().len(), Emoji::ALL.len());
        assert_eq!(b.get(Emoji::Joy), 4);
        assert_eq!(b.get(Emoji::Party), 1);
        assert_eq!(b.get(Emoji::Smile), 0);
        assert_eq!(b.total(), 5);
        let order: Vec<Emoji> = b.counts().iter().map(|c| c.emoji).collect();
        assert_eq!(order, Emoji::ALL.to_vec());
    }

    #[test]
    fn reacted_with_matches_only_the_viewer_emoji() {
        let view = PostView {
            post: Post {
                id: 1,
                user_id: 2,
                content: "hi".into(),
                image: String::new(),
                link: String::new(),
                smiles: 1,
                timestamp: "2024-03-05 21:07:09".into(),
            },
            username: "bob".into(),
            profile_image: String::new(),
            viewer_reaction: Some(Emoji::Joy),
            breakdown: ReactionBreakdown::from_top(&[(Emoji::Joy, 1)]),
            can_delete: false,
        };
        assert!(view.reacted_with(&Emoji::Joy));
        assert!(!view.reacted_with(&Emoji::Smile));

        let anonymous = PostView {
            viewer_reaction: None,
            ..view
        };
        assert!(!anonymous.reacted_with(&Emoji::Joy));
    }

    #[test]
    fn top_filter_parses_known_values() {
        assert_eq!(TopFilter::parse(None), TopFilter::All);
        assert_eq!(TopFilter::parse(Some("all")), TopFilter::All);
        assert_eq!(TopFilter::parse(Some("combo")), TopFilter::Combo);
        assert_eq!(TopFilter::parse(Some("🤩")), TopFilter::Emoji(Emoji::StarStruck));
        assert_eq!(TopFilter::parse(Some("🔥")), TopFilter::All);
    }

    #[test]
    fn timestamps_render_like_the_site() {
        assert_eq!(format_timestamp("2024-03-05 21:07:09"), "03/05/24, 9:07pm");
        assert_eq!(format_timestamp("2024-11-15 10:30:00.123"), "11/15/24, 10:30am");
        assert_eq!(format_timestamp("garbage"), "garbage");
    }
}
