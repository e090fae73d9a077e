use askama::Template;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::models::User;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Flash, MaybeUser};
use crate::routes::home::{page, Nav};
use crate::social::feed::{self, FeedMode, PostView, TopFilter};
use crate::social::{identity, Emoji};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/feed.html")]
pub struct FeedTemplate {
    pub nav: Nav,
    pub title: String,
    pub tabs: Vec<Tab>,
    pub fallback: bool,
    pub posts: Vec<PostView>,
    pub empty_message: String,
}

#[derive(Template)]
#[template(path = "pages/search.html")]
pub struct SearchTemplate {
    pub nav: Nav,
    pub q: String,
    pub users: Vec<User>,
    pub posts: Vec<PostView>,
}

/// A ranking choice on the top page.
#[derive(Debug, Clone)]
pub struct Tab {
    pub label: String,
    pub href: String,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct TopQuery {
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(following))
        .route("/top", get(top))
        .route("/search", get(search))
}

/// GET /feed
pub async fn following(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
) -> AppResult<Response> {
    let feed_config = &state.config.feed;
    let feed_page = feed::following(
        &state.db,
        user.id,
        feed_config.page_size,
        feed_config.discovery_fallback,
    )?;

    let template = FeedTemplate {
        nav: Nav::new(Some(&user), &flash),
        title: "Following Feed".to_string(),
        tabs: Vec::new(),
        fallback: feed_page.fallback,
        posts: feed_page.posts,
        empty_message: "Nothing here yet. Follow someone or share a post!".to_string(),
    };
    Ok(page(template, &flash))
}

/// GET /top?filter=all|combo|<emoji>
pub async fn top(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    flash: Flash,
    Query(query): Query<TopQuery>,
) -> AppResult<Response> {
    let filter = TopFilter::parse(query.filter.as_deref());
    let posts = feed::compose(
        &state.db,
        maybe_user.id(),
        &FeedMode::Top(filter),
        state.config.feed.page_size,
    )?;

    let template = FeedTemplate {
        nav: Nav::for_maybe(&maybe_user, &flash),
        title: "Top Smiled Posts".to_string(),
        tabs: top_tabs(filter),
        fallback: false,
        posts,
        empty_message: "No posts to show yet.".to_string(),
    };
    Ok(page(template, &flash))
}

/// GET /search?q=
pub async fn search(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    flash: Flash,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let q = query.q.trim().to_string();
    let limit = state.config.feed.page_size;
    let users = identity::search_users(&state.db, &q, limit)?;
    let posts = feed::compose(
        &state.db,
        maybe_user.id(),
        &FeedMode::Search(q.clone()),
        limit,
    )?;

    let template = SearchTemplate {
        nav: Nav::for_maybe(&maybe_user, &flash),
        q,
        users,
        posts,
    };
    Ok(page(template, &flash))
}

fn top_tabs(current: TopFilter) -> Vec<Tab> {
    let mut filters = vec![TopFilter::All, TopFilter::Combo];
    filters.extend(Emoji::ALL.into_iter().map(TopFilter::Emoji));

    filters
        .into_iter()
        .map(|filter| Tab {
            label: match filter {
                TopFilter::All => "All".to_string(),
                TopFilter::Combo => "Combo".to_string(),
                TopFilter::Emoji(e) => e.to_string(),
            },
            href: format!(
                "/top?filter={}",
                url::form_urlencoded::byte_serialize(filter.as_param().as_bytes())
                    .collect::<String>()
            ),
            active: filter == current,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Post;
    use crate::social::feed::ReactionBreakdown;

    fn card(viewer_reaction: Option<Emoji>) -> PostView {
        PostView {
            post: Post {
                id: 7,
                user_id: 1,
                content: "sunny day".to_string(),
                image: String::new(),
                link: String::new(),
                smiles: 2,
                timestamp: "2024-03-05 21:07:09".to_string(),
            },
            username: "alice".to_string(),
            profile_image: String::new(),
            viewer_reaction,
            breakdown: ReactionBreakdown::from_top(&[(Emoji::Party, 2)]),
            can_delete: false,
        }
    }

    fn render(logged_in: bool, posts: Vec<PostView>) -> String {
        FeedTemplate {
            nav: Nav {
                logged_in,
                ..Nav::default()
            },
            title: "Top Smiled Posts".to_string(),
            tabs: top_tabs(TopFilter::All),
            fallback: false,
            posts,
            empty_message: String::new(),
        }
        .render()
        .unwrap()
    }

    #[test]
    fn viewer_reaction_is_highlighted() {
        let body = render(true, vec![card(Some(Emoji::Party))]);
        assert_eq!(body.matches("react mine").count(), 1);
        assert!(body.contains("action=\"/smile/7\""));
    }

    #[test]
    fn anonymous_cards_have_no_reaction_forms() {
        let body = render(false, vec![card(Some(Emoji::Party))]);
        assert!(!body.contains("/smile/"));
        assert!(!body.contains(" mine"));
        assert!(body.contains("🥳 2"));
    }

    #[test]
    fn top_tabs_cover_every_filter_once() {
        let tabs = top_tabs(TopFilter::Combo);
        assert_eq!(tabs.len(), 2 + Emoji::ALL.len());
        assert_eq!(tabs.iter().filter(|t| t.active).count(), 1);
        assert_eq!(tabs[1].label, "Combo");
        assert!(tabs[1].active);
    }

    #[test]
    fn emoji_tab_links_are_url_encoded() {
        let tabs = top_tabs(TopFilter::All);
        let smile = tabs.iter().find(|t| t.label == "😊").unwrap();
        assert_eq!(smile.href, "/top?filter=%F0%9F%98%8A");
        assert_eq!(tabs[0].href, "/top?filter=all");
    }
}
