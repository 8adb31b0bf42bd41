use crate::models::{Post, PostWithTags, Tag, TagWithCount};
use crate::services::forms::{CommentForm, ContactForm, FieldErrors, SearchForm, ShareForm};
use crate::services::mail::{ContactRequest, ShareRequest};
use crate::services::pagination::{paginate, Page, Paginator};
use crate::services::tags::SIMILAR_POSTS_LIMIT;
use crate::services::{comments, contact, images, posts, search, tags, BlogError, ServiceResult};
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::Context;

fn make_context(state: &AppState) -> Context {
    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    ctx
}

fn render(state: &AppState, template: &str, ctx: &Context) -> AppResult<Response> {
    let html = state.templates.render(template, ctx)?;
    Ok(Html(html).into_response())
}

fn not_found_page(state: &AppState) -> AppResult<Response> {
    let html = state.templates.render("404.html", &make_context(state))?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

/// Unwraps a lookup, turning `NotFound` into the 404 page.
fn found<T>(state: &AppState, result: ServiceResult<T>) -> AppResult<Result<T, Response>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_not_found() => Ok(Err(not_found_page(state)?)),
        Err(e) => Err(e.into()),
    }
}

/// A listed post with its plain-text excerpt.
#[derive(Serialize)]
struct PostCard {
    #[serde(flatten)]
    post: PostWithTags,
    excerpt: String,
}

fn cards(state: &AppState, posts: Vec<PostWithTags>) -> Vec<PostCard> {
    let words = state.config.content.excerpt_words;
    posts
        .into_iter()
        .map(|post| PostCard {
            excerpt: state.markdown.generate_excerpt(&post.post.body, words),
            post,
        })
        .collect()
}

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

pub async fn root() -> Redirect {
    Redirect::permanent("/blog/")
}

pub async fn not_found(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    not_found_page(&state)
}

pub async fn post_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let count = posts::count_published_posts(&state.db)?;
    let window = Paginator::new(count, state.config.content.posts_per_page)
        .resolve(query.page.as_deref());
    let listed = posts::list_published_posts(&state.db, window.limit(), window.offset())?;
    let tag_counts = tags::tag_counts_over_published(&state.db)?;

    let page = Page::from_window(cards(&state, listed), window);
    render_post_list(&state, None, page, &tag_counts)
}

pub async fn post_list_by_tag(
    State(state): State<Arc<AppState>>,
    Path(tag_slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let tagged = match found(&state, tags::posts_for_tag(&state.db, &tag_slug))? {
        Ok(tagged) => tagged,
        Err(response) => return Ok(response),
    };
    let tag_counts = tags::tag_counts_over(&state.db, &tagged.post_ids())?;

    let page = paginate(
        tagged.posts,
        state.config.content.posts_per_page,
        query.page.as_deref(),
    )
    .try_map(|items| posts::enrich(&state.db, items).map(|listed| cards(&state, listed)))?;
    render_post_list(&state, Some(tagged.tag), page, &tag_counts)
}

fn render_post_list(
    state: &AppState,
    tag: Option<Tag>,
    page: Page<PostCard>,
    tag_counts: &[TagWithCount],
) -> AppResult<Response> {
    let mut ctx = make_context(state);
    ctx.insert("page", &page);
    ctx.insert("tag", &tag);
    ctx.insert("tag_counts", tag_counts);
    render(state, "blog/list.html", &ctx)
}

pub async fn post_detail(
    State(state): State<Arc<AppState>>,
    Path((year, month, day, slug)): Path<(String, String, String, String)>,
) -> AppResult<Response> {
    let (Ok(year), Ok(month), Ok(day)) =
        (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>())
    else {
        return not_found_page(&state);
    };
    let post = match found(
        &state,
        posts::get_published_post_by_date(&state.db, year, month, day, &slug),
    )? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };

    render_detail(&state, post, &CommentForm::default(), &FieldErrors::new())
}

fn render_detail(
    state: &AppState,
    post: Post,
    form: &CommentForm,
    errors: &FieldErrors,
) -> AppResult<Response> {
    let body_html = state.markdown.render(&post.body);
    let active = comments::active_comments(&state.db, post.id)?;
    let similar = tags::similar_posts(&state.db, &post, SIMILAR_POSTS_LIMIT)?;
    let post_images = images::list_images(&state.db, post.id)?;
    let sidebar = tags::tag_counts_over_published(&state.db)?;
    let post = posts::enrich(&state.db, vec![post])?
        .pop()
        .ok_or(BlogError::NotFound("post"))?;

    let mut ctx = make_context(state);
    ctx.insert("post", &post);
    ctx.insert("body_html", &body_html);
    ctx.insert("comments", &active);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("similar_posts", &similar);
    ctx.insert("images", &post_images);
    ctx.insert("tag_counts", &sidebar);
    render(state, "blog/detail.html", &ctx)
}

fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}

pub async fn share_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found_page(&state);
    };
    let post = match found(&state, posts::get_published_post(&state.db, post_id))? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };
    render_share(&state, &post, &ShareForm::default(), &FieldErrors::new(), false)
}

pub async fn share_submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<ShareForm>,
) -> AppResult<Response> {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found_page(&state);
    };
    let post = match found(&state, posts::get_published_post(&state.db, post_id))? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };

    match form.validate() {
        Ok(cleaned) => {
            let request = ShareRequest {
                sender_name: cleaned.name,
                sender_email: cleaned.email,
                recipient_email: cleaned.to,
                post_title: post.title.clone(),
                post_url: state.config.site.absolute_url(&post.absolute_url()),
                comment: cleaned.comments,
            };
            let sent = state.notifier.send_share(&request).await;
            render_share(&state, &post, &form, &FieldErrors::new(), sent)
        }
        Err(errors) => render_share(&state, &post, &form, &errors, false),
    }
}

fn render_share(
    state: &AppState,
    post: &Post,
    form: &ShareForm,
    errors: &FieldErrors,
    sent: bool,
) -> AppResult<Response> {
    let sidebar = tags::tag_counts_over_published(&state.db)?;

    let mut ctx = make_context(state);
    ctx.insert("post", post);
    ctx.insert("post_url", &post.absolute_url());
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("sent", &sent);
    ctx.insert("tag_counts", &sidebar);
    render(state, "blog/share.html", &ctx)
}

pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let Some(post_id) = parse_post_id(&id) else {
        return not_found_page(&state);
    };

    let (comment, errors) = match comments::submit_comment(&state.db, post_id, &form) {
        Ok(comment) => (Some(comment), FieldErrors::new()),
        Err(BlogError::Validation(errors)) => (None, errors),
        Err(e) if e.is_not_found() => return not_found_page(&state),
        Err(e) => return Err(e.into()),
    };

    let post = match found(&state, posts::get_published_post(&state.db, post_id))? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };

    let mut ctx = make_context(&state);
    ctx.insert("post", &post);
    ctx.insert("post_url", &post.absolute_url());
    ctx.insert("comment", &comment);
    ctx.insert("form", &form);
    ctx.insert("errors", &errors);
    render(&state, "blog/comment.html", &ctx)
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(form): Query<SearchForm>,
) -> AppResult<Response> {
    let mut ctx = make_context(&state);
    ctx.insert("form", &form);

    if form.submitted() {
        match form.validate() {
            Ok(query) => {
                let ranked = search::search_posts(&state.db, &query)?;
                let page = paginate(
                    ranked,
                    state.config.content.search_results_per_page,
                    form.page.as_deref(),
                )
                .try_map(|items| search::enrich_hits(&state.db, items))?;
                ctx.insert("query", &query);
                ctx.insert("page", &page);
                ctx.insert("errors", &FieldErrors::new());
            }
            Err(errors) => {
                ctx.insert("query", "");
                ctx.insert("errors", &errors);
            }
        }
    } else {
        ctx.insert("query", "");
        ctx.insert("errors", &FieldErrors::new());
    }

    render(&state, "blog/search.html", &ctx)
}

pub async fn contact_form(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    render_contact(&state, &ContactForm::default(), &FieldErrors::new(), false)
}

pub async fn contact_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ContactForm>,
) -> AppResult<Response> {
    match form.validate() {
        Ok(message) => {
            let record = contact::record_contact_message(&state.db, &message)?;
            let sent = state
                .notifier
                .send_contact(&ContactRequest {
                    sender_name: record.name,
                    sender_email: record.email,
                    body: record.body,
                })
                .await;
            render_contact(&state, &ContactForm::default(), &FieldErrors::new(), sent)
        }
        Err(errors) => render_contact(&state, &form, &errors, false),
    }
}

fn render_contact(
    state: &AppState,
    form: &ContactForm,
    errors: &FieldErrors,
    sent: bool,
) -> AppResult<Response> {
    let mut ctx = make_context(state);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("sent", &sent);
    render(state, "blog/contact.html", &ctx)
}

pub async fn about(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    render(&state, "blog/about.html", &make_context(&state))
}

pub async fn feed(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let latest = posts::latest_published_posts(&state.db, state.config.content.feed_items)?;
    let site = &state.config.site;
    let words = state.config.content.excerpt_words;

    let mut items = String::new();
    for post in latest {
        let link = site.absolute_url(&post.url);
        let pub_date = DateTime::parse_from_rfc3339(&post.post.published_at)
            .map(|dt| dt.to_rfc2822())
            .unwrap_or_default();
        items.push_str(&format!(
            r#"
    <item>
      <title>{}</title>
      <link>{}</link>
      <description>{}</description>
      <pubDate>{}</pubDate>
      <guid>{}</guid>
    </item>"#,
            xml_escape(&post.post.title),
            xml_escape(&link),
            xml_escape(&state.markdown.generate_excerpt(&post.post.body, words)),
            pub_date,
            xml_escape(&link),
        ));
    }

    let rss = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>{}</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>{}
  </channel>
</rss>"#,
        xml_escape(&site.title),
        xml_escape(&site.absolute_url("/blog/")),
        xml_escape(&site.description),
        xml_escape(&site.language),
        xml_escape(&site.absolute_url("/blog/feed/")),
        items
    );

    Ok((
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        rss,
    )
        .into_response())
}

fn xml_escape(s: &str) -> String {
    quick_xml::escape::escape(s).into_owned()
}

pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return not_found_page(&state);
    }

    let file_path = state.media_dir.join(&filename);
    let canonical_media = match state.media_dir.canonicalize() {
        Ok(p) => p,
        Err(_) => return not_found_page(&state),
    };
    let canonical_file = match file_path.canonicalize() {
        Ok(p) => p,
        Err(_) => return not_found_page(&state),
    };
    if !canonical_file.starts_with(&canonical_media) {
        return not_found_page(&state);
    }

    let content = tokio::fs::read(&canonical_file).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok(([(header::CONTENT_TYPE, mime.as_ref().to_string())], content).into_response())
}
