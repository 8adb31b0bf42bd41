use crate::models::{Post, PostWithTags};
use crate::services::error::ServiceResult;
use crate::services::posts::{enrich_posts, published_posts};
use crate::services::text::{lexical_rank, query_terms, same_words, Trigrams};
use crate::Database;
use serde::Serialize;
use std::cmp::Ordering;

/// Minimum score on any of the three signals for a post to be returned.
pub const SEARCH_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub post: Post,
    /// The query and the title are the same words.
    pub exact_title: bool,
    pub rank: f64,
    pub title_similarity: f64,
    pub body_similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub post: PostWithTags,
    pub rank: f64,
    pub title_similarity: f64,
    pub body_similarity: f64,
}

/// Scores and orders candidate posts against a query.
///
/// A post is kept when its lexical rank reaches the threshold or either
/// trigram similarity exceeds it. A post whose title is exactly the query
/// comes before everything else; lexical rank orders the rest, title then
/// body similarity break ties, and the incoming order breaks the remainder.
pub fn rank_posts(query: &str, posts: Vec<Post>) -> Vec<Scored> {
    let query = query.trim();
    if query.is_empty() {
        return vec![];
    }

    let terms = query_terms(query);
    let query_trigrams = Trigrams::new(query);

    let mut scored: Vec<Scored> = posts
        .into_iter()
        .map(|post| {
            let exact_title = same_words(query, &post.title);
            let rank = lexical_rank(&terms, &post.title, &post.body);
            let title_similarity = query_trigrams.similarity(&Trigrams::new(&post.title));
            let body_similarity = query_trigrams.similarity(&Trigrams::new(&post.body));
            Scored {
                post,
                exact_title,
                rank,
                title_similarity,
                body_similarity,
            }
        })
        .filter(|s| {
            s.rank >= SEARCH_THRESHOLD
                || s.title_similarity > SEARCH_THRESHOLD
                || s.body_similarity > SEARCH_THRESHOLD
        })
        .collect();

    // Stable sort: equal scores keep the newest-first store order.
    scored.sort_by(|a, b| {
        b.exact_title
            .cmp(&a.exact_title)
            .then_with(|| desc(a.rank, b.rank))
            .then_with(|| desc(a.title_similarity, b.title_similarity))
            .then_with(|| desc(a.body_similarity, b.body_similarity))
    });
    scored
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Full search over published posts, ranked but not yet enriched. An empty
/// query returns nothing without touching the store.
pub fn search_posts(db: &Database, query: &str) -> ServiceResult<Vec<Scored>> {
    if query.trim().is_empty() {
        return Ok(vec![]);
    }

    let scored = rank_posts(query, published_posts(db)?);
    tracing::debug!(query, hits = scored.len(), "Search ranked");
    Ok(scored)
}

/// Attaches tags, comment counts and URLs to ranked posts, usually one page
/// of them.
pub fn enrich_hits(db: &Database, scored: Vec<Scored>) -> ServiceResult<Vec<SearchHit>> {
    let mut scores = Vec::with_capacity(scored.len());
    let mut posts = Vec::with_capacity(scored.len());
    for s in scored {
        scores.push((s.rank, s.title_similarity, s.body_similarity));
        posts.push(s.post);
    }

    let conn = db.get()?;
    let enriched = enrich_posts(&conn, posts)?;

    Ok(enriched
        .into_iter()
        .zip(scores)
        .map(|(post, (rank, title_similarity, body_similarity))| SearchHit {
            post,
            rank,
            title_similarity,
            body_similarity,
        })
        .collect())
}
